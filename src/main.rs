mod ui;

use std::{
    error::Error,
    fs::File,
    io::{self, stdin},
    path::PathBuf,
    sync::Arc,
    time::Duration,
};

use bookstroke::{
    app::{App, Control, Selection},
    clock::SystemClock,
    config::{Config, ConfigStore, FileConfigStore},
    content::{random_book_id, BuiltinLibrary, ContentProvider, Difficulty},
    logging,
    refresh::ThreadScheduler,
    runtime::{CrosstermEventSource, EventSource, FixedTicker, Runner, Ticker},
    stats::{humanize_age, StatsDb},
};
use chrono::Local;
use clap::{error::ErrorKind, CommandFactory, Parser};
use crossterm::{
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
    tty::IsTty,
};
use itertools::Itertools;
use ratatui::{
    backend::{Backend, CrosstermBackend},
    Terminal,
};

const TICK_RATE_MS: u64 = 100;

/// typing practice against book excerpts, with live wpm and accuracy
#[derive(Parser, Debug, Clone)]
#[clap(
    version,
    about,
    long_about = "Type excerpts from books at three difficulty levels. Tracks per-character correctness, words per minute and accuracy as you type, and keeps a history of completed sessions."
)]
pub struct Cli {
    /// book to practise on (see --list-books)
    #[clap(short = 'b', long)]
    book: Option<u32>,

    /// start on a random book other than the last one
    #[clap(short = 'r', long, conflicts_with = "book")]
    random: bool,

    /// excerpt difficulty
    #[clap(short = 'd', long, value_enum)]
    difficulty: Option<Difficulty>,

    /// custom text to type instead of a book excerpt
    #[clap(short = 'p', long)]
    prompt: Option<String>,

    /// list the available books and exit
    #[clap(long)]
    list_books: bool,

    /// print the most recent sessions and exit
    #[clap(long, value_name = "N", num_args = 0..=1, default_missing_value = "10")]
    history: Option<usize>,

    /// export every recorded session as csv and exit
    #[clap(long, value_name = "PATH")]
    export: Option<PathBuf>,

    /// don't record completed sessions
    #[clap(long)]
    no_record: bool,

    /// debug level logging to the log file
    #[clap(short = 'v', long)]
    verbose: bool,
}

fn main() -> Result<(), Box<dyn Error>> {
    let cli = Cli::parse();
    let log_file = logging::init_logging(cli.verbose);
    tracing::info!(?log_file, "starting");

    let library = BuiltinLibrary::load()?;
    let config_store = FileConfigStore::new();
    let config = config_store.load();

    if cli.list_books {
        print_books(&library);
        return Ok(());
    }
    if let Some(limit) = cli.history {
        return print_history(&library, limit);
    }
    if let Some(path) = &cli.export {
        let written = StatsDb::open_default()?.export_csv(File::create(path)?)?;
        println!("exported {written} sessions to {}", path.display());
        return Ok(());
    }

    if !stdin().is_tty() {
        let mut cmd = Cli::command();
        cmd.error(ErrorKind::Io, "stdin must be a tty").exit();
    }

    let book_id = match cli.book {
        Some(id) => id,
        None if cli.random => random_book_id(library.books(), config.book_id, &mut rand::thread_rng()),
        None => config.book_id,
    };
    let selection = Selection {
        book_id,
        difficulty: cli.difficulty.unwrap_or(config.difficulty),
        custom_prompt: cli.prompt.clone(),
    };
    let refresh_interval = Duration::from_millis(config.refresh_interval_ms.max(50));
    let runner = Runner::new(
        CrosstermEventSource::new(),
        FixedTicker::new(Duration::from_millis(TICK_RATE_MS)),
    );

    let mut app = App::new(
        Box::new(library),
        selection,
        Arc::new(SystemClock),
        Box::new(ThreadScheduler::new(runner.sender())),
        refresh_interval,
    )?;
    if config.record_stats && !cli.no_record {
        match StatsDb::open_default() {
            Ok(db) => app = app.with_sink(Box::new(db)),
            Err(err) => tracing::warn!(%err, "stats database unavailable, not recording"),
        }
    }

    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    let result = start_tui(&mut terminal, &mut app, &runner);

    disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen)?;
    terminal.show_cursor()?;

    if app.selection().custom_prompt.is_none() {
        let updated = Config {
            book_id: app.selection().book_id,
            difficulty: app.selection().difficulty,
            ..config
        };
        if let Err(err) = config_store.save(&updated) {
            tracing::warn!(%err, "could not save config");
        }
    }

    result
}

fn start_tui<B: Backend, E: EventSource, T: Ticker>(
    terminal: &mut Terminal<B>,
    app: &mut App,
    runner: &Runner<E, T>,
) -> Result<(), Box<dyn Error>> {
    loop {
        terminal.draw(|f| ui::draw(app, f))?;

        if app.on_event(runner.step()) == Control::Quit {
            break;
        }
    }
    Ok(())
}

fn print_books(library: &BuiltinLibrary) {
    for book in library.books() {
        println!(
            "{:>3}  {} by {} ({})",
            book.id, book.title, book.author, book.genre
        );
    }
    println!(
        "\ndifficulties: {}",
        Difficulty::ALL.iter().join(", ")
    );
}

fn print_history(library: &BuiltinLibrary, limit: usize) -> Result<(), Box<dyn Error>> {
    let db = StatsDb::open_default()?;
    let records = db.recent(limit)?;
    if records.is_empty() {
        println!("no sessions recorded yet");
        return Ok(());
    }

    let now = Local::now();
    for stored in &records {
        let record = &stored.record;
        let title = library
            .book(record.book_id)
            .map_or("unknown book", |b| b.title.as_str());
        println!(
            "{:>4} wpm  {:>3}% acc  {:<12}  {}  ({})",
            record.wpm,
            record.accuracy,
            record.difficulty,
            title,
            humanize_age(record.timestamp, now)
        );
    }

    let summary = db.summary()?;
    println!(
        "\n{} sessions, avg {:.0} wpm at {:.0}% accuracy, best {} wpm",
        summary.sessions, summary.avg_wpm, summary.avg_accuracy, summary.best_wpm
    );
    Ok(())
}
