use anyhow::{Context, Result};
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;
use tracing::info;

/// A candidate phrase is always this many words
pub const PHRASE_WORDS: usize = 12;

/// The vocabulary must at least cover one full phrase
pub const MIN_WORDS: usize = PHRASE_WORDS;

/// The sampling vocabulary, read-only after load.
///
/// Shared across the producer and all workers without locking.
#[derive(Debug, Clone)]
pub struct Wordlist {
    words: Vec<String>,
}

impl Wordlist {
    /// Load the vocabulary from a line-oriented text file, one word per line.
    ///
    /// Refuses to start with fewer than [`MIN_WORDS`] usable entries.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let file = File::open(path)
            .context(format!("Failed to open wordlist: {}", path.display()))?;

        let reader = BufReader::new(file);
        let mut words = Vec::new();

        for line in reader.lines() {
            let line = line?;
            let trimmed = line.trim();
            if !trimmed.is_empty() {
                words.push(trimmed.to_string());
            }
        }

        let wordlist = Self::from_words(words)?;
        info!("Loaded {} words from {}", wordlist.len(), path.display());
        Ok(wordlist)
    }

    /// Build a vocabulary from an in-memory word set, applying the same
    /// minimum-size rule as [`Wordlist::load`].
    pub fn from_words(words: Vec<String>) -> Result<Self> {
        if words.len() < MIN_WORDS {
            anyhow::bail!(
                "Wordlist too small: {} words, need at least {}",
                words.len(),
                MIN_WORDS
            );
        }
        Ok(Self { words })
    }

    pub fn len(&self) -> usize {
        self.words.len()
    }

    pub fn is_empty(&self) -> bool {
        self.words.is_empty()
    }

    pub fn word(&self, index: usize) -> &str {
        &self.words[index]
    }

    pub fn contains(&self, word: &str) -> bool {
        self.words.iter().any(|w| w == word)
    }
}
