//! Mystery Battle Royale rule checks.
//!
//! Rules are evaluated independently and every violation is collected;
//! an empty vector means the hand is compliant.

use std::fmt;
use std::time::Duration;

use tracing::debug;

use crate::hand::model::HandRecord;

/// Keywords that identify a mystery-format element.
pub const MYSTERY_KEYWORDS: &[&str] = &["Bounty", "Progressive", "Mystery", "Boost"];

/// One rule break.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Violation {
    InvalidAnte { ante: u64, min: u64, max: u64 },
    MissingMysteryElements,
    InvalidBigBlind { big_blind: u64 },
    BlindIntervalTooShort { interval: Duration, min: Duration },
}

impl Violation {
    pub fn message(&self) -> &'static str {
        match self {
            Self::InvalidAnte { .. } => "invalid ante size",
            Self::MissingMysteryElements => "missing mystery elements",
            Self::InvalidBigBlind { .. } => "invalid big blind size for mystery format",
            Self::BlindIntervalTooShort { .. } => "blind increase interval too short",
        }
    }
}

impl fmt::Display for Violation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.message())
    }
}

/// Format limits checked by [`RuleSet::validate`].
#[derive(Debug, Clone)]
pub struct RuleSet {
    /// Lower ante bound. The upper bound is always `big_blind / 2`.
    pub ante_min: u64,
    pub big_blind_min: u64,
    pub big_blind_max: u64,
    pub mystery_keywords: Vec<String>,
    /// Off unless set; hands without a parsed interval are not checked.
    pub min_blind_interval: Option<Duration>,
}

impl Default for RuleSet {
    fn default() -> Self {
        Self {
            ante_min: 100,
            big_blind_min: 2_000,
            big_blind_max: 100_000,
            mystery_keywords: MYSTERY_KEYWORDS.iter().map(|k| k.to_string()).collect(),
            min_blind_interval: None,
        }
    }
}

impl RuleSet {
    pub fn with_min_blind_interval(mut self, interval: Duration) -> Self {
        self.min_blind_interval = Some(interval);
        self
    }

    /// Check a parsed hand against every rule.
    pub fn validate(&self, hand: &HandRecord) -> Vec<Violation> {
        let mut violations = Vec::new();

        let ante_max = hand.big_blind / 2;
        if hand.ante < self.ante_min || hand.ante > ante_max {
            violations.push(Violation::InvalidAnte {
                ante: hand.ante,
                min: self.ante_min,
                max: ante_max,
            });
        }

        if !self.has_mystery_elements(hand) {
            violations.push(Violation::MissingMysteryElements);
        }

        if hand.big_blind < self.big_blind_min || hand.big_blind > self.big_blind_max {
            violations.push(Violation::InvalidBigBlind {
                big_blind: hand.big_blind,
            });
        }

        if let (Some(min), Some(interval)) = (self.min_blind_interval, hand.blind_increase_interval)
        {
            if interval < min {
                violations.push(Violation::BlindIntervalTooShort { interval, min });
            }
        }

        debug!(
            hand_id = %hand.hand_id,
            violations = violations.len(),
            "Validated hand"
        );

        violations
    }

    /// At least one element must mention a mystery keyword.
    fn has_mystery_elements(&self, hand: &HandRecord) -> bool {
        hand.mystery_elements.iter().any(|element| {
            let element = element.to_lowercase();
            self.mystery_keywords
                .iter()
                .any(|keyword| element.contains(&keyword.to_lowercase()))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn hand(ante: u64, big_blind: u64, elements: &[&str]) -> HandRecord {
        HandRecord {
            hand_id: "1".into(),
            small_blind: big_blind / 2,
            big_blind,
            ante,
            mystery_elements: elements.iter().map(|e| e.to_string()).collect(),
            ..Default::default()
        }
    }

    fn messages(violations: &[Violation]) -> Vec<&'static str> {
        violations.iter().map(Violation::message).collect()
    }

    #[test]
    fn compliant_hand() {
        let rules = RuleSet::default();
        assert!(rules.validate(&hand(200, 2000, &["Bounty"])).is_empty());
    }

    #[test]
    fn ante_below_minimum() {
        let violations = RuleSet::default().validate(&hand(50, 2000, &["Bounty"]));
        assert_eq!(messages(&violations), vec!["invalid ante size"]);
        assert_eq!(
            violations[0],
            Violation::InvalidAnte {
                ante: 50,
                min: 100,
                max: 1000
            }
        );
    }

    #[test]
    fn ante_above_half_big_blind() {
        let violations = RuleSet::default().validate(&hand(1001, 2000, &["Bounty"]));
        assert_eq!(messages(&violations), vec!["invalid ante size"]);
        assert!(RuleSet::default().validate(&hand(1000, 2000, &["Bounty"])).is_empty());
    }

    #[test]
    fn big_blind_range() {
        let rules = RuleSet::default();
        assert!(messages(&rules.validate(&hand(200, 1500, &["Bounty"])))
            .contains(&"invalid big blind size for mystery format"));
        assert!(!messages(&rules.validate(&hand(200, 50_000, &["Bounty"])))
            .contains(&"invalid big blind size for mystery format"));
        assert!(messages(&rules.validate(&hand(200, 100_002, &["Bounty"])))
            .contains(&"invalid big blind size for mystery format"));
    }

    #[test]
    fn mystery_keyword_match_is_case_insensitive() {
        let rules = RuleSet::default();
        assert!(rules.validate(&hand(200, 2000, &["progressive KO"])).is_empty());
        assert!(rules.validate(&hand(200, 2000, &["BOOST x2"])).is_empty());
    }

    #[test]
    fn elements_without_keyword_are_missing() {
        let violations = RuleSet::default().validate(&hand(200, 2000, &["Turbo"]));
        assert_eq!(messages(&violations), vec!["missing mystery elements"]);
    }

    #[test]
    fn violations_accumulate() {
        let violations = RuleSet::default().validate(&hand(0, 0, &[]));
        assert_eq!(
            messages(&violations),
            vec![
                "invalid ante size",
                "missing mystery elements",
                "invalid big blind size for mystery format",
            ]
        );
    }

    #[test]
    fn blind_interval_rule_is_opt_in() {
        let mut record = hand(200, 2000, &["Bounty"]);
        record.blind_increase_interval = Some(Duration::from_secs(3 * 60));

        assert!(RuleSet::default().validate(&record).is_empty());

        let strict = RuleSet::default().with_min_blind_interval(Duration::from_secs(5 * 60));
        assert_eq!(
            messages(&strict.validate(&record)),
            vec!["blind increase interval too short"]
        );

        record.blind_increase_interval = None;
        assert!(strict.validate(&record).is_empty());
    }
}
