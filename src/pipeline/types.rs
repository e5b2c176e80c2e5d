//! Shared types for the hand pipeline.

/// Terminal state of one accepted message.
///
/// Messages rejected by the classifier never get this far; the pipeline
/// returns no reply for them at all.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    /// The blinds line could not be parsed; an error report was produced.
    ParseFailed,
    /// At least one rule was broken; advice was not requested.
    NonCompliant { violations: usize },
    /// Compliant hand with advice appended.
    Advised,
    /// Compliant hand, but the advice request failed.
    AdviceFailed,
}

impl Outcome {
    /// Short label for logs.
    pub fn label(&self) -> &'static str {
        match self {
            Self::ParseFailed => "parse_failed",
            Self::NonCompliant { .. } => "non_compliant",
            Self::Advised => "advised",
            Self::AdviceFailed => "advice_failed",
        }
    }

    /// Whether the advice step ran.
    pub fn requested_advice(&self) -> bool {
        matches!(self, Self::Advised | Self::AdviceFailed)
    }
}

/// Text to send back for one message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Reply {
    pub text: String,
    pub outcome: Outcome,
    /// Render with the transport's lightweight markup.
    pub markdown: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn outcome_labels() {
        assert_eq!(Outcome::ParseFailed.label(), "parse_failed");
        assert_eq!(Outcome::NonCompliant { violations: 2 }.label(), "non_compliant");
        assert_eq!(Outcome::Advised.label(), "advised");
        assert_eq!(Outcome::AdviceFailed.label(), "advice_failed");
    }

    #[test]
    fn advice_only_for_compliant_outcomes() {
        assert!(Outcome::Advised.requested_advice());
        assert!(Outcome::AdviceFailed.requested_advice());
        assert!(!Outcome::ParseFailed.requested_advice());
        assert!(!Outcome::NonCompliant { violations: 1 }.requested_advice());
    }
}
