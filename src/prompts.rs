//! Prompt-pair sourcing.
//!
//! Each round needs two related prompts: the common one shown to the
//! group and the variant shown only to the liar. Where the pairs come
//! from is pluggable; the built-in source ships a static list.

use async_trait::async_trait;
use rand::Rng;

/// One round's pair of prompts.
#[derive(Debug, Clone, PartialEq)]
pub struct PromptPair {
    /// Shown to everyone except the liar
    pub common: String,
    /// Shown only to the liar
    pub liar: String,
}

/// Trait that all prompt sources must implement
#[async_trait]
pub trait PromptSource: Send + Sync {
    /// Draw the prompt pair for the next round
    async fn draw_pair(&self) -> PromptPair;

    /// Get the name of this source
    fn name(&self) -> &str;
}

/// (common, liar) pairs. Kept close enough that answers overlap and the
/// liar is not given away by topic alone.
const PAIRS: &[(&str, &str)] = &[
    ("What is your favorite book?", "What is your favorite movie?"),
    (
        "What would you cook for a dinner party?",
        "What did you eat for breakfast today?",
    ),
    (
        "Which country would you most like to visit?",
        "Which country would you never move to?",
    ),
    (
        "What was your favorite subject in school?",
        "What subject did you struggle with most in school?",
    ),
    (
        "What job did you dream of as a child?",
        "What job would you refuse no matter the pay?",
    ),
    (
        "What song do you play to cheer yourself up?",
        "What song do you secretly dislike?",
    ),
    (
        "What is the best gift you ever received?",
        "What is the worst gift you ever received?",
    ),
    (
        "Which animal would you keep as a pet?",
        "Which animal are you most afraid of?",
    ),
    (
        "What ability would you pick as a superpower?",
        "What everyday skill do you wish you were better at?",
    ),
    (
        "Where would you go on your ideal weekend trip?",
        "Where did you go on your last trip?",
    ),
    (
        "What food could you eat every day?",
        "What food can you not stand?",
    ),
    (
        "What hobby would you pick up with unlimited free time?",
        "What hobby did you give up on?",
    ),
];

/// Built-in prompt source backed by the static pair list.
#[derive(Default)]
pub struct BuiltinPrompts;

impl BuiltinPrompts {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl PromptSource for BuiltinPrompts {
    async fn draw_pair(&self) -> PromptPair {
        let (common, liar) = {
            let mut rng = rand::rng();
            PAIRS[rng.random_range(0..PAIRS.len())]
        };
        PromptPair {
            common: common.to_string(),
            liar: liar.to_string(),
        }
    }

    fn name(&self) -> &str {
        "builtin"
    }
}

/// Fixed prompt source for deterministic tests.
pub struct FixedPrompts {
    pub pair: PromptPair,
}

#[async_trait]
impl PromptSource for FixedPrompts {
    async fn draw_pair(&self) -> PromptPair {
        self.pair.clone()
    }

    fn name(&self) -> &str {
        "fixed"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn builtin_draws_a_known_pair() {
        let source = BuiltinPrompts::new();
        let pair = source.draw_pair().await;
        assert!(PAIRS
            .iter()
            .any(|(c, l)| *c == pair.common && *l == pair.liar));
        assert_ne!(pair.common, pair.liar);
    }

    #[test]
    fn pairs_are_all_distinct_within_each_pair() {
        for (common, liar) in PAIRS {
            assert_ne!(common, liar);
        }
    }
}
