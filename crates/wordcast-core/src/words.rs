//! Word sources for the broadcast scheduler

use crate::{Error, Result};
use rand::seq::SliceRandom;
use rand::Rng;

/// Produces one word per broadcast tick
pub trait WordSource: Send + Sync {
    fn next_word(&self) -> Result<String>;
}

impl<F> WordSource for F
where
    F: Fn() -> Result<String> + Send + Sync,
{
    fn next_word(&self) -> Result<String> {
        self()
    }
}

const ENGLISH_WORDS: &[&str] = &[
    "anchor", "amber", "harbor", "lantern", "meadow", "orbit", "pebble", "quiver", "ripple",
    "saddle", "thimble", "velvet", "willow", "zephyr", "canyon", "ember", "falcon", "glacier",
    "hollow", "island", "jigsaw", "kettle", "ledger", "marble", "nectar", "oyster", "parcel",
    "quartz", "rocket", "summit", "tundra", "umbrella", "violet", "walnut", "yonder", "basket",
    "candle", "drizzle", "feather", "garden", "horizon", "imprint", "jungle", "kingdom", "lumber",
    "mosaic", "nimble", "outpost", "puzzle", "rustle", "shadow", "timber", "uplift", "vessel",
    "whisper", "bramble", "cobalt", "dapple", "everest", "fathom",
];

const TELUGU_WORDS: &[&str] = &[
    "నమస్కారం", "ఇల్లు", "నీరు", "పుస్తకం", "అమ్మ", "నాన్న", "చెట్టు", "పువ్వు", "ఆకాశం",
    "సూర్యుడు", "చంద్రుడు", "నక్షత్రం", "నది", "సముద్రం", "పాట", "కథ", "స్నేహితుడు", "బడి",
    "రైలు", "వర్షం", "గాలి", "మట్టి", "పండు", "అన్నం", "పాలు", "కలం", "కాగితం", "దారి", "ఊరు",
    "సంతోషం",
];

/// Picks an English or a Telugu word at random.
///
/// Each tick chooses English with probability `english_ratio`, then draws
/// uniformly from that language's list. An empty list falls back to the
/// other one.
#[derive(Debug, Clone)]
pub struct RandomWords {
    english: Vec<String>,
    telugu: Vec<String>,
    english_ratio: f64,
}

impl RandomWords {
    /// Built-in word lists
    pub fn new(english_ratio: f64) -> Self {
        Self::with_lists(
            ENGLISH_WORDS.iter().map(|w| w.to_string()).collect(),
            TELUGU_WORDS.iter().map(|w| w.to_string()).collect(),
            english_ratio,
        )
    }

    pub fn with_lists(english: Vec<String>, telugu: Vec<String>, english_ratio: f64) -> Self {
        let english_ratio = if english_ratio.is_finite() {
            english_ratio.clamp(0.0, 1.0)
        } else {
            0.5
        };
        Self {
            english,
            telugu,
            english_ratio,
        }
    }

    pub fn english_ratio(&self) -> f64 {
        self.english_ratio
    }
}

impl Default for RandomWords {
    fn default() -> Self {
        Self::new(0.5)
    }
}

impl WordSource for RandomWords {
    fn next_word(&self) -> Result<String> {
        let mut rng = rand::thread_rng();
        let (preferred, fallback) = if rng.gen_bool(self.english_ratio) {
            (&self.english, &self.telugu)
        } else {
            (&self.telugu, &self.english)
        };

        preferred
            .choose(&mut rng)
            .or_else(|| fallback.choose(&mut rng))
            .cloned()
            .ok_or_else(|| Error::source_unavailable("word lists are empty"))
    }
}
