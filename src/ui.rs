pub mod charting;

use itertools::Itertools;
use ratatui::{
    buffer::Buffer,
    layout::{Alignment, Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Axis, Chart, Dataset, GraphType, Paragraph, Widget, Wrap},
    Frame,
};
use unicode_width::UnicodeWidthStr;

use bookstroke::{
    app::{App, AppState},
    time_series::{chart_points, peak_wpm},
    CharState, CharStatus,
};

const HORIZONTAL_MARGIN: u16 = 5;
const VERTICAL_MARGIN: u16 = 2;

pub fn draw(app: &App, f: &mut Frame) {
    f.render_widget(AppView(app), f.area());
}

/// Renders whichever screen the app is on
pub struct AppView<'a>(pub &'a App);

impl Widget for AppView<'_> {
    fn render(self, area: Rect, buf: &mut Buffer) {
        match self.0.state {
            AppState::Typing => render_typing(self.0, area, buf),
            AppState::Results => render_results(self.0, area, buf),
        }
    }
}

fn bold() -> Style {
    Style::default().add_modifier(Modifier::BOLD)
}

fn style_for(state: CharState) -> Style {
    let dim_bold = bold().add_modifier(Modifier::DIM);
    match state {
        CharState::Correct => bold().fg(Color::Green),
        CharState::Incorrect => bold().fg(Color::Red),
        CharState::Current => dim_bold.add_modifier(Modifier::UNDERLINED),
        CharState::Upcoming => dim_bold,
    }
}

/// Reference text as spans, one per run of equally-scored characters
fn status_spans(statuses: &[CharStatus]) -> Vec<Span<'static>> {
    statuses
        .iter()
        .chunk_by(|s| s.state)
        .into_iter()
        .map(|(state, run)| {
            let text: String = run
                .map(|s| match (state, s.char) {
                    // Make missed spaces visible
                    (CharState::Incorrect, ' ') => '·',
                    (_, c) => c,
                })
                .collect();
            Span::styled(text, style_for(state))
        })
        .collect()
}

fn header_line(app: &App) -> String {
    match (&app.selection().custom_prompt, app.book()) {
        (Some(_), _) => "custom prompt".to_string(),
        (None, Some(book)) => format!(
            "{} by {}   [{}]",
            book.title,
            book.author,
            app.selection().difficulty
        ),
        (None, None) => app.selection().difficulty.to_string(),
    }
}

fn stats_line(app: &App) -> String {
    let stats = app.session().stats();
    format!(
        "{} wpm   {}% acc   {}   {}/{} chars",
        stats.wpm,
        stats.accuracy,
        stats.elapsed,
        stats.correct_chars,
        app.session().statuses().len()
    )
}

fn render_typing(app: &App, area: Rect, buf: &mut Buffer) {
    let session = app.session();
    let max_chars_per_line = area.width.saturating_sub(HORIZONTAL_MARGIN * 2).max(1);
    let text_width = u16::try_from(session.reference_text().width()).unwrap_or(u16::MAX);
    let prompt_lines = if text_width <= max_chars_per_line {
        1
    } else {
        text_width.div_ceil(max_chars_per_line).saturating_add(1)
    };
    let padding = area.height.saturating_sub(prompt_lines.saturating_add(4)) / 2;

    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .horizontal_margin(HORIZONTAL_MARGIN)
        .constraints([
            Constraint::Length(padding),
            Constraint::Length(2), // header
            Constraint::Length(prompt_lines),
            Constraint::Length(2), // stats
            Constraint::Min(0),
            Constraint::Length(1), // legend
        ])
        .split(area);

    Paragraph::new(Span::styled(header_line(app), bold().fg(Color::Cyan)))
        .alignment(Alignment::Center)
        .render(chunks[1], buf);

    Paragraph::new(Line::from(status_spans(session.statuses())))
        .alignment(if prompt_lines == 1 {
            Alignment::Center
        } else {
            Alignment::Left
        })
        .wrap(Wrap { trim: false })
        .render(chunks[2], buf);

    let stats_style = if session.is_started() {
        bold()
    } else {
        bold().add_modifier(Modifier::DIM)
    };
    Paragraph::new(Span::styled(stats_line(app), stats_style))
        .alignment(Alignment::Center)
        .render(chunks[3], buf);

    render_legend(app, "(tab) restart / (→) next book / (esc) quit", chunks[5], buf);
}

fn render_results(app: &App, area: Rect, buf: &mut Buffer) {
    let session = app.session();
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .horizontal_margin(HORIZONTAL_MARGIN)
        .vertical_margin(VERTICAL_MARGIN)
        .constraints([
            Constraint::Length(1), // header
            Constraint::Min(1),    // chart
            Constraint::Length(1), // stats
            Constraint::Length(1), // best
            Constraint::Length(1), // padding
            Constraint::Length(1), // legend
        ])
        .split(area);

    Paragraph::new(Span::styled(header_line(app), bold().fg(Color::Cyan)))
        .alignment(Alignment::Center)
        .render(chunks[0], buf);

    let points = chart_points(session.wpm_samples());
    let (duration, y_max) = charting::compute_chart_params(&points, session.elapsed().as_secs_f64());
    let datasets = vec![Dataset::default()
        .marker(ratatui::symbols::Marker::Braille)
        .style(Style::default().fg(Color::Magenta))
        .graph_type(GraphType::Line)
        .data(&points)];

    Chart::new(datasets)
        .x_axis(
            Axis::default()
                .title("seconds")
                .bounds([0.0, duration])
                .labels(vec![
                    Span::styled("0", bold()),
                    Span::styled(charting::format_label(duration), bold()),
                ]),
        )
        .y_axis(
            Axis::default()
                .title("wpm")
                .bounds([0.0, y_max])
                .labels(vec![
                    Span::styled("0", bold()),
                    Span::styled(charting::format_label(y_max), bold()),
                ]),
        )
        .render(chunks[1], buf);

    Paragraph::new(Span::styled(stats_line(app), bold()))
        .alignment(Alignment::Center)
        .render(chunks[2], buf);

    let peak = peak_wpm(session.wpm_samples());
    let mut best = match app.personal_best() {
        Some(best) if app.is_new_best() => format!("new personal best: {best} wpm"),
        Some(best) => format!("personal best: {best} wpm"),
        None => String::new(),
    };
    if peak > 0 {
        if !best.is_empty() {
            best.push_str("   ");
        }
        best.push_str(&format!("peak {peak} wpm"));
    }
    Paragraph::new(Span::styled(
        best,
        Style::default()
            .fg(Color::Yellow)
            .add_modifier(Modifier::ITALIC),
    ))
    .alignment(Alignment::Center)
    .render(chunks[3], buf);

    let legend = format!(
        "(r)etry / (n)ext book / (d)ifficulty: {} / (esc)ape",
        app.selection().difficulty.next()
    );
    render_legend(app, &legend, chunks[5], buf);
}

fn render_legend(app: &App, legend: &str, area: Rect, buf: &mut Buffer) {
    let mut spans = vec![Span::styled(
        legend.to_string(),
        Style::default().add_modifier(Modifier::ITALIC),
    )];
    if let Some(notice) = &app.notice {
        spans.push(Span::raw("   "));
        spans.push(Span::styled(notice.clone(), Style::default().fg(Color::Red)));
    }
    Paragraph::new(Line::from(spans)).render(area, buf);
}

#[cfg(test)]
mod tests {
    use super::*;
    use bookstroke::{
        app::{Control, Selection},
        clock::ManualClock,
        content::{BuiltinLibrary, Difficulty},
        refresh::ManualScheduler,
        runtime::AppEvent,
    };
    use std::sync::Arc;
    use std::time::Duration;

    fn create_test_app(prompt: Option<&str>) -> App {
        App::new(
            Box::new(BuiltinLibrary::load().unwrap()),
            Selection {
                book_id: 2,
                difficulty: Difficulty::Intermediate,
                custom_prompt: prompt.map(str::to_owned),
            },
            Arc::new(ManualClock::new()),
            Box::new(ManualScheduler::new()),
            Duration::from_secs(1),
        )
        .unwrap()
    }

    fn buffer_text(buf: &Buffer) -> String {
        buf.content().iter().map(|c| c.symbol()).collect()
    }

    #[test]
    fn test_status_spans_group_runs() {
        let statuses = [
            CharStatus { char: 'a', state: CharState::Correct },
            CharStatus { char: 'b', state: CharState::Correct },
            CharStatus { char: ' ', state: CharState::Incorrect },
            CharStatus { char: 'c', state: CharState::Current },
            CharStatus { char: 'd', state: CharState::Upcoming },
        ];
        let spans = status_spans(&statuses);

        let texts: Vec<&str> = spans.iter().map(|s| s.content.as_ref()).collect();
        assert_eq!(texts, vec!["ab", "·", "c", "d"]);
        assert_eq!(spans[0].style.fg, Some(Color::Green));
        assert_eq!(spans[1].style.fg, Some(Color::Red));
        assert!(spans[2].style.add_modifier.contains(Modifier::UNDERLINED));
    }

    #[test]
    fn test_render_typing_screen() {
        let mut app = create_test_app(None);
        app.input("The bo");

        let area = Rect::new(0, 0, 120, 30);
        let mut buf = Buffer::empty(area);
        AppView(&app).render(area, &mut buf);

        let text = buffer_text(&buf);
        assert!(text.contains("The Alchemist"));
        assert!(text.contains("[intermediate]"));
        assert!(text.contains("100% acc"));
        assert!(text.contains("(tab) restart"));
    }

    #[test]
    fn test_render_results_screen() {
        let mut app = create_test_app(Some("hi"));
        app.input("hx");
        assert_eq!(app.state, AppState::Results);

        let area = Rect::new(0, 0, 100, 30);
        let mut buf = Buffer::empty(area);
        AppView(&app).render(area, &mut buf);

        let text = buffer_text(&buf);
        assert!(text.contains("custom prompt"));
        assert!(text.contains("50% acc"));
        assert!(text.contains("(r)etry"));
    }

    #[test]
    fn test_results_show_peak_wpm() {
        let mut app = create_test_app(Some("hello"));
        app.input("he");
        let epoch = app.session().epoch();
        assert_eq!(app.on_event(AppEvent::Refresh(epoch)), Control::Continue);
        app.input("hello");
        assert_eq!(app.state, AppState::Results);

        let peak = peak_wpm(app.session().wpm_samples());
        assert!(peak > 0);

        let area = Rect::new(0, 0, 100, 30);
        let mut buf = Buffer::empty(area);
        AppView(&app).render(area, &mut buf);
        assert!(buffer_text(&buf).contains(&format!("peak {peak} wpm")));
    }

    #[test]
    fn test_render_very_long_prompt() {
        let prompt = "x".repeat(usize::from(u16::MAX) + 10);
        let app = create_test_app(Some(&prompt));
        let area = Rect::new(0, 0, 80, 24);
        let mut buf = Buffer::empty(area);
        AppView(&app).render(area, &mut buf);
        assert!(buffer_text(&buf).contains("xxxx"));
    }

    #[test]
    fn test_render_tiny_area_does_not_panic() {
        let app = create_test_app(None);
        let area = Rect::new(0, 0, 8, 3);
        let mut buf = Buffer::empty(area);
        AppView(&app).render(area, &mut buf);
    }
}
