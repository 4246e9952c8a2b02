use bip39::{Language, Mnemonic};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};

use crate::wordlist::{Wordlist, PHRASE_WORDS};

/// Draws candidate 12-word phrases uniformly from the vocabulary and keeps
/// only those passing the BIP39 checksum.
///
/// The sequence is infinite and makes no uniqueness guarantee: the same
/// phrase can come up again at any time. This is a brute-force sampler, not
/// a keyspace enumerator; it uses a plain seedable RNG and provides no
/// cryptographic randomness guarantee.
pub struct PhraseSampler {
    words: Arc<Wordlist>,
    rng: StdRng,
}

impl PhraseSampler {
    /// Sampler seeded from the system clock.
    pub fn new(words: Arc<Wordlist>) -> Self {
        let nanos = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_nanos() as u64)
            .unwrap_or(0);
        Self::with_seed(words, nanos)
    }

    /// Sampler with a fixed seed, for reproducible tests.
    pub fn with_seed(words: Arc<Wordlist>, seed: u64) -> Self {
        Self {
            words,
            rng: StdRng::seed_from_u64(seed),
        }
    }

    /// One draw attempt: 12 uniform picks joined by single spaces.
    ///
    /// Returns `None` when the draw fails the checksum predicate. The
    /// producer loop calls this directly so cancellation can be checked
    /// between attempts even if the vocabulary never yields a valid phrase.
    pub fn try_draw(&mut self) -> Option<String> {
        let mut phrase = String::new();
        for i in 0..PHRASE_WORDS {
            if i > 0 {
                phrase.push(' ');
            }
            let index = self.rng.gen_range(0..self.words.len());
            phrase.push_str(self.words.word(index));
        }

        if Self::is_valid(&phrase) {
            Some(phrase)
        } else {
            None
        }
    }

    /// The scheme validity predicate: full BIP39 wordlist membership plus
    /// checksum, exactly what downstream derivation will accept.
    pub fn is_valid(phrase: &str) -> bool {
        Mnemonic::parse_in_normalized(Language::English, phrase).is_ok()
    }
}

/// The lazy infinite stream of valid phrases; invalid draws are redrawn.
impl Iterator for PhraseSampler {
    type Item = String;

    fn next(&mut self) -> Option<String> {
        loop {
            if let Some(phrase) = self.try_draw() {
                return Some(phrase);
            }
        }
    }
}
