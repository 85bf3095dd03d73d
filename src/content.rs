use std::collections::HashMap;

use clap::ValueEnum;
use include_dir::{include_dir, Dir};
use rand::seq::SliceRandom;
use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::error::ContentError;

static LIBRARY_DIR: Dir = include_dir!("src/library");

/// Books past this id ship without hand-picked excerpts
const CURATED_BOOKS: u32 = 3;

#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    Default,
    Serialize,
    Deserialize,
    ValueEnum,
    strum_macros::Display,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum Difficulty {
    #[default]
    Beginner,
    Intermediate,
    Advanced,
}

impl Difficulty {
    pub const ALL: [Difficulty; 3] = [
        Difficulty::Beginner,
        Difficulty::Intermediate,
        Difficulty::Advanced,
    ];

    /// Cycles beginner -> intermediate -> advanced -> beginner
    pub fn next(self) -> Self {
        match self {
            Difficulty::Beginner => Difficulty::Intermediate,
            Difficulty::Intermediate => Difficulty::Advanced,
            Difficulty::Advanced => Difficulty::Beginner,
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "beginner" => Some(Difficulty::Beginner),
            "intermediate" => Some(Difficulty::Intermediate),
            "advanced" => Some(Difficulty::Advanced),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Book {
    pub id: u32,
    pub title: String,
    pub author: String,
    pub genre: String,
}

#[derive(Debug, Clone, Deserialize)]
struct Excerpt {
    book_id: u32,
    difficulty: Difficulty,
    content: String,
}

/// Supplies reference texts for a book at a difficulty level
pub trait ContentProvider {
    fn books(&self) -> &[Book];

    fn book(&self, id: u32) -> Option<&Book> {
        self.books().iter().find(|b| b.id == id)
    }

    fn excerpt(&self, book_id: u32, difficulty: Difficulty) -> Result<String, ContentError>;

    /// Next book id after `current`, wrapping around to the first
    fn next_book_id(&self, current: u32) -> u32 {
        let mut ids: Vec<u32> = self.books().iter().map(|b| b.id).collect();
        ids.sort_unstable();
        ids.iter()
            .copied()
            .find(|&id| id > current)
            .or_else(|| ids.first().copied())
            .unwrap_or(current)
    }
}

/// Book catalogue compiled into the binary
#[derive(Debug, Clone)]
pub struct BuiltinLibrary {
    books: Vec<Book>,
    excerpts: HashMap<(u32, Difficulty), String>,
}

impl BuiltinLibrary {
    pub fn load() -> Result<Self, ContentError> {
        let books: Vec<Book> = serde_json::from_str(read_data("books.json")?)?;
        let excerpts: Vec<Excerpt> = serde_json::from_str(read_data("excerpts.json")?)?;

        let mut by_key: HashMap<(u32, Difficulty), String> = excerpts
            .into_iter()
            .map(|e| ((e.book_id, e.difficulty), e.content))
            .collect();

        for book in books.iter().filter(|b| b.id > CURATED_BOOKS) {
            for difficulty in Difficulty::ALL {
                by_key
                    .entry((book.id, difficulty))
                    .or_insert_with(|| placeholder_excerpt(book.id, difficulty));
            }
        }

        tracing::debug!(books = books.len(), excerpts = by_key.len(), "library loaded");
        Ok(Self {
            books,
            excerpts: by_key,
        })
    }
}

impl ContentProvider for BuiltinLibrary {
    fn books(&self) -> &[Book] {
        &self.books
    }

    fn excerpt(&self, book_id: u32, difficulty: Difficulty) -> Result<String, ContentError> {
        if self.book(book_id).is_none() {
            return Err(ContentError::UnknownBook(book_id));
        }
        self.excerpts
            .get(&(book_id, difficulty))
            .cloned()
            .ok_or(ContentError::MissingExcerpt {
                book_id,
                difficulty,
            })
    }
}

/// Any book other than `current`, or `current` when it is the only one
pub fn random_book_id<R: Rng + ?Sized>(books: &[Book], current: u32, rng: &mut R) -> u32 {
    let others: Vec<u32> = books.iter().map(|b| b.id).filter(|&id| id != current).collect();
    others.choose(rng).copied().unwrap_or(current)
}

fn read_data(file: &'static str) -> Result<&'static str, ContentError> {
    LIBRARY_DIR
        .get_file(file)
        .and_then(|f| f.contents_utf8())
        .ok_or(ContentError::MissingData { file })
}

fn placeholder_excerpt(book_id: u32, difficulty: Difficulty) -> String {
    format!(
        "This is a sample text for book {book_id} at {difficulty} level. This text would be replaced with actual content from the book that matches the appropriate difficulty level. For beginner levels, sentences are shorter and simpler. For intermediate levels, more complexity is added. For advanced levels, full punctuation, varied sentence structure, and a broader vocabulary is used."
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;

    #[test]
    fn test_library_loads_all_books() {
        let library = BuiltinLibrary::load().unwrap();
        assert_eq!(library.books().len(), 10);
        assert_eq!(library.book(2).unwrap().title, "The Alchemist");
    }

    #[test]
    fn test_every_book_has_every_difficulty() {
        let library = BuiltinLibrary::load().unwrap();
        for book in library.books() {
            for difficulty in Difficulty::ALL {
                let text = library.excerpt(book.id, difficulty).unwrap();
                assert!(!text.is_empty(), "book {} {}", book.id, difficulty);
            }
        }
    }

    #[test]
    fn test_curated_excerpt() {
        let library = BuiltinLibrary::load().unwrap();
        let text = library.excerpt(2, Difficulty::Beginner).unwrap();
        assert!(text.starts_with("The boy was a shepherd."));
    }

    #[test]
    fn test_placeholder_excerpt_mentions_book_and_level() {
        let library = BuiltinLibrary::load().unwrap();
        let text = library.excerpt(7, Difficulty::Advanced).unwrap();
        assert!(text.starts_with("This is a sample text for book 7 at advanced level."));
    }

    #[test]
    fn test_unknown_book() {
        let library = BuiltinLibrary::load().unwrap();
        assert_matches!(
            library.excerpt(42, Difficulty::Beginner),
            Err(ContentError::UnknownBook(42))
        );
    }

    #[test]
    fn test_next_book_wraps() {
        let library = BuiltinLibrary::load().unwrap();
        assert_eq!(library.next_book_id(1), 2);
        assert_eq!(library.next_book_id(10), 1);
    }

    #[test]
    fn test_random_book_skips_current() {
        use rand::rngs::StdRng;
        use rand::SeedableRng;

        let library = BuiltinLibrary::load().unwrap();
        let mut rng = StdRng::seed_from_u64(7);
        for _ in 0..50 {
            let id = random_book_id(library.books(), 3, &mut rng);
            assert_ne!(id, 3);
            assert!(library.book(id).is_some());
        }
        assert_eq!(random_book_id(&library.books()[..1], 1, &mut rng), 1);
    }

    #[test]
    fn test_difficulty_display_and_parse() {
        assert_eq!(Difficulty::Intermediate.to_string(), "intermediate");
        assert_eq!(Difficulty::parse("ADVANCED"), Some(Difficulty::Advanced));
        assert_eq!(Difficulty::parse("expert"), None);
        assert_eq!(Difficulty::Advanced.next(), Difficulty::Beginner);
    }

    #[test]
    fn test_difficulty_serde_lowercase() {
        let json = serde_json::to_string(&Difficulty::Beginner).unwrap();
        assert_eq!(json, "\"beginner\"");
    }
}
