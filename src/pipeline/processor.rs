//! Hand processor — turns one inbound message into at most one reply.
//!
//! Flow:
//! 1. Classifier (cheap) → drop ordinary chat traffic
//! 2. Parser → error report if the blinds line is unusable
//! 3. Validator → violation list, no advice
//! 4. Advice provider → advice appended, or a degraded note on failure

use std::sync::Arc;

use tracing::{debug, info, warn};

use crate::advice::AdviceProvider;
use crate::hand::formatter::{ADVICE_UNAVAILABLE, render_advice, render_parse_error};
use crate::hand::{RuleSet, looks_like_hand_history, parse, render_report};
use crate::pipeline::types::{Outcome, Reply};

/// The hand pipeline. Depends only on the advice capability, not on a backend.
pub struct HandPipeline {
    advisor: Arc<dyn AdviceProvider>,
    rules: RuleSet,
}

impl HandPipeline {
    pub fn new(advisor: Arc<dyn AdviceProvider>, rules: RuleSet) -> Self {
        Self { advisor, rules }
    }

    /// Process one message. `None` means the text is not a hand history
    /// and nothing should be sent back.
    pub async fn process(&self, text: &str) -> Option<Reply> {
        if !looks_like_hand_history(text) {
            debug!("Message does not look like a hand history; dropping");
            return None;
        }

        let hand = match parse(text) {
            Ok(hand) => hand,
            Err(e) => {
                info!(error = %e, "Hand history failed to parse");
                return Some(Reply {
                    text: render_parse_error(&e),
                    outcome: Outcome::ParseFailed,
                    markdown: true,
                });
            }
        };

        let violations = self.rules.validate(&hand);
        let mut text_out = render_report(&hand, &violations);

        if !violations.is_empty() {
            info!(
                hand_id = %hand.hand_id,
                violations = violations.len(),
                "Hand is not compliant; skipping advice"
            );
            return Some(Reply {
                text: text_out,
                outcome: Outcome::NonCompliant {
                    violations: violations.len(),
                },
                markdown: true,
            });
        }

        // The raw transcript goes to the provider, not the parsed record.
        let outcome = match self.advisor.advise(text).await {
            Ok(advice) => {
                info!(
                    hand_id = %hand.hand_id,
                    provider = self.advisor.name(),
                    "Advice received"
                );
                text_out.push_str(&render_advice(&advice));
                Outcome::Advised
            }
            Err(e) => {
                warn!(
                    hand_id = %hand.hand_id,
                    provider = self.advisor.name(),
                    error = %e,
                    "Advice request failed"
                );
                text_out.push_str(ADVICE_UNAVAILABLE);
                Outcome::AdviceFailed
            }
        };

        Some(Reply {
            text: text_out,
            outcome,
            markdown: true,
        })
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicU32, Ordering};

    use async_trait::async_trait;

    use super::*;
    use crate::error::{AdviceError, CredentialError};

    /// Advisor that counts calls and answers from a fixed script.
    struct StubAdvisor {
        calls: AtomicU32,
        fail: bool,
    }

    impl StubAdvisor {
        fn ok() -> Arc<Self> {
            Arc::new(Self {
                calls: AtomicU32::new(0),
                fail: false,
            })
        }

        fn failing() -> Arc<Self> {
            Arc::new(Self {
                calls: AtomicU32::new(0),
                fail: true,
            })
        }

        fn calls(&self) -> u32 {
            self.calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl AdviceProvider for StubAdvisor {
        fn name(&self) -> &str {
            "stub"
        }

        async fn advise(&self, _hand_history: &str) -> Result<String, AdviceError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if self.fail {
                Err(AdviceError::Credential(CredentialError::Transport(
                    "connection refused".into(),
                )))
            } else {
                Ok("Open wider from the button\nFold the turn".into())
            }
        }
    }

    const COMPLIANT: &str = "\
Hand #12345 Mystery Battle Royale Tournament #T1- Level 5
Blinds: 1,000/2,000 (Ante 200)
Mystery Elements: [Bounty, Boost]
*** HOLE CARDS ***
Dealt to Hero [Ah Kd]
Hero raises to 4,000
Villain folds";

    fn pipeline(advisor: Arc<StubAdvisor>) -> HandPipeline {
        HandPipeline::new(advisor, RuleSet::default())
    }

    #[tokio::test]
    async fn ordinary_chat_is_dropped_without_advice() {
        let advisor = StubAdvisor::ok();
        let p = pipeline(advisor.clone());
        assert!(p.process("gg everyone, see you tomorrow").await.is_none());
        assert!(p.process("Hand #1 was brutal").await.is_none());
        assert_eq!(advisor.calls(), 0);
    }

    #[tokio::test]
    async fn compliant_hand_gets_advice() {
        let advisor = StubAdvisor::ok();
        let reply = pipeline(advisor.clone()).process(COMPLIANT).await.unwrap();

        assert_eq!(reply.outcome, Outcome::Advised);
        assert!(reply.markdown);
        assert!(reply.text.starts_with("🃏 *Hand #12345 analysis*"));
        assert!(reply.text.contains("Tournament: `T1`"));
        assert!(reply.text.contains("Blinds: 1,000/2,000"));
        assert!(reply.text.contains("Ante: 200"));
        assert!(reply.text.contains("✅ *Hand is compliant*"));
        assert!(reply.text.ends_with("Open wider from the button\n• Fold the turn"));
        assert_eq!(advisor.calls(), 1);
    }

    #[tokio::test]
    async fn advice_failure_degrades_reply() {
        let advisor = StubAdvisor::failing();
        let reply = pipeline(advisor.clone()).process(COMPLIANT).await.unwrap();

        assert_eq!(reply.outcome, Outcome::AdviceFailed);
        assert!(reply.text.contains("✅ *Hand is compliant*"));
        assert!(reply.text.ends_with("⚠️ Advice unavailable right now"));
        assert_eq!(advisor.calls(), 1);
    }

    #[tokio::test]
    async fn violations_suppress_advice() {
        let advisor = StubAdvisor::ok();
        let text = COMPLIANT.replace("(Ante 200)", "(Ante 50)");
        let reply = pipeline(advisor.clone()).process(&text).await.unwrap();

        assert_eq!(reply.outcome, Outcome::NonCompliant { violations: 1 });
        assert!(reply.text.contains("❌ *Violations:*"));
        assert!(reply.text.contains("• invalid ante size"));
        assert_eq!(advisor.calls(), 0);
    }

    #[tokio::test]
    async fn unparsable_blinds_report_error() {
        let advisor = StubAdvisor::ok();
        let text = COMPLIANT.replace("Blinds: 1,000/2,000 (Ante 200)", "Blinds: unknown");
        let reply = pipeline(advisor.clone()).process(&text).await.unwrap();

        assert_eq!(reply.outcome, Outcome::ParseFailed);
        assert_eq!(reply.text, "❌ Parse error: blinds unparsable");
        assert_eq!(advisor.calls(), 0);
    }
}
