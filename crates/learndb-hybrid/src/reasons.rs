//! Recommendation reasons.
//!
//! Similarity above 0.8, 0.6 and 0.4 maps to templates 0, 1 and 2. Anything
//! lower (including NaN) draws a template uniformly at random from the whole
//! bank; the random source is injectable so callers can seed it.

use rand::rngs::StdRng;
use rand::{Rng, RngCore, SeedableRng};
use std::sync::Mutex;

pub const REASON_TEMPLATES: [&str; 5] = [
    "Similar in content and concepts to what you just completed",
    "Builds upon the concepts you just learned",
    "Complements your recent learning",
    "A natural next step in your learning path",
    "Explores related ideas from a new angle",
];

pub struct ReasonPicker {
    rng: Mutex<Box<dyn RngCore + Send>>,
}

impl ReasonPicker {
    pub fn from_entropy() -> Self { Self::with_rng(StdRng::from_entropy()) }

    pub fn seeded(seed: u64) -> Self { Self::with_rng(StdRng::seed_from_u64(seed)) }

    pub fn with_rng(rng: impl RngCore + Send + 'static) -> Self { Self { rng: Mutex::new(Box::new(rng)) } }

    pub fn reason_for(&self, similarity: f32) -> &'static str {
        if similarity > 0.8 {
            REASON_TEMPLATES[0]
        } else if similarity > 0.6 {
            REASON_TEMPLATES[1]
        } else if similarity > 0.4 {
            REASON_TEMPLATES[2]
        } else {
            let mut rng = self.rng.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
            REASON_TEMPLATES[rng.gen_range(0..REASON_TEMPLATES.len())]
        }
    }
}

impl Default for ReasonPicker {
    fn default() -> Self { Self::from_entropy() }
}
