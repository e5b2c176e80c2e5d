//! Report rendering (Telegram-flavoured Markdown).
//!
//! Pure string building: no I/O, never fails. The only non-determinism is
//! the "checked at" timestamp, which `render_report_at` takes explicitly.

use std::fmt::Write as _;

use chrono::{Local, NaiveDateTime};

use crate::error::ParseError;
use crate::hand::model::HandRecord;
use crate::hand::validator::Violation;

/// Timestamp layout for the trailing "checked" line.
pub const CHECKED_AT_FORMAT: &str = "%Y-%m-%d %H:%M";

/// Appended when the advice step fails.
pub const ADVICE_UNAVAILABLE: &str = "\n\n⚠️ Advice unavailable right now";

/// Group digits in threes with `,`; zero renders as `N/A`.
pub fn format_number(n: u64) -> String {
    if n == 0 {
        return "N/A".to_string();
    }

    let digits = n.to_string();
    let mut out = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, ch) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push(',');
        }
        out.push(ch);
    }
    out
}

/// Render the report using the local wall clock.
pub fn render_report(hand: &HandRecord, violations: &[Violation]) -> String {
    render_report_at(hand, violations, Local::now().naive_local())
}

/// Render the report with an explicit "checked at" time.
pub fn render_report_at(
    hand: &HandRecord,
    violations: &[Violation],
    checked_at: NaiveDateTime,
) -> String {
    let mut out = String::new();

    // Writing into a String cannot fail.
    let _ = writeln!(out, "🃏 *Hand #{} analysis*", hand.hand_id);
    if !hand.tournament_id.is_empty() {
        let _ = writeln!(out, "Tournament: `{}`", hand.tournament_id);
    }
    let _ = writeln!(
        out,
        "Blinds: {}/{}",
        format_number(hand.small_blind),
        format_number(hand.big_blind)
    );
    let _ = writeln!(out, "Ante: {}", format_number(hand.ante));

    if let Some(interval) = hand.blind_increase_interval {
        let _ = writeln!(out, "Blind levels: {} min", interval.as_secs() / 60);
    }

    if !hand.mystery_elements.is_empty() {
        let _ = writeln!(
            out,
            "Mystery elements: [{}]",
            hand.mystery_elements.join(", ")
        );
    }

    if violations.is_empty() {
        out.push_str("\n✅ *Hand is compliant*");
    } else {
        out.push_str("\n❌ *Violations:*\n");
        for violation in violations {
            let _ = writeln!(out, "• {violation}");
        }
    }

    let _ = write!(
        out,
        "\n_Checked: {}_",
        checked_at.format(CHECKED_AT_FORMAT)
    );

    out
}

/// Report for a transcript that could not be parsed.
pub fn render_parse_error(err: &ParseError) -> String {
    format!("❌ Parse error: {err}")
}

/// Advice section appended to a compliant report.
pub fn render_advice(advice: &str) -> String {
    format!("\n\n🎓 *Coach advice:*\n{}", advice.trim().replace('\n', "\n• "))
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use chrono::NaiveDate;

    use super::*;
    use crate::hand::parser::parse_blinds;

    fn checked_at() -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2024, 3, 9)
            .unwrap()
            .and_hms_opt(7, 5, 0)
            .unwrap()
    }

    fn sample_hand() -> HandRecord {
        HandRecord {
            hand_id: "12345".into(),
            tournament_id: "T1".into(),
            small_blind: 1000,
            big_blind: 2000,
            ante: 200,
            mystery_elements: vec!["Bounty".into(), "Boost".into()],
            ..Default::default()
        }
    }

    #[test]
    fn number_grouping() {
        assert_eq!(format_number(0), "N/A");
        assert_eq!(format_number(7), "7");
        assert_eq!(format_number(999), "999");
        assert_eq!(format_number(2000), "2,000");
        assert_eq!(format_number(12_345), "12,345");
        assert_eq!(format_number(100_000), "100,000");
        assert_eq!(format_number(1_000_000), "1,000,000");
    }

    #[test]
    fn blinds_line_round_trips_through_parser() {
        for source in ["1,000/2,000", "25,000/50,000", "500/1,000", "100,000/200,000"] {
            let blinds = parse_blinds(&format!("Blinds: {source} (Ante 100)")).unwrap();
            let rendered = format!(
                "{}/{}",
                format_number(blinds.small),
                format_number(blinds.big)
            );
            assert_eq!(rendered, source);
        }
    }

    #[test]
    fn compliant_report() {
        let report = render_report_at(&sample_hand(), &[], checked_at());
        assert_eq!(
            report,
            "🃏 *Hand #12345 analysis*\n\
             Tournament: `T1`\n\
             Blinds: 1,000/2,000\n\
             Ante: 200\n\
             Mystery elements: [Bounty, Boost]\n\
             \n✅ *Hand is compliant*\n\
             _Checked: 2024-03-09 07:05_"
        );
    }

    #[test]
    fn violation_report_lists_each_message() {
        let mut hand = sample_hand();
        hand.tournament_id.clear();
        hand.mystery_elements.clear();
        hand.ante = 0;
        hand.blind_increase_interval = Some(Duration::from_secs(600));

        let violations = vec![
            Violation::InvalidAnte {
                ante: 0,
                min: 100,
                max: 1000,
            },
            Violation::MissingMysteryElements,
        ];
        let report = render_report_at(&hand, &violations, checked_at());

        assert!(!report.contains("Tournament"));
        assert!(!report.contains("Mystery elements"));
        assert!(report.contains("Ante: N/A\n"));
        assert!(report.contains("Blind levels: 10 min\n"));
        assert!(report.contains(
            "❌ *Violations:*\n• invalid ante size\n• missing mystery elements\n"
        ));
        assert!(!report.contains("compliant"));
        assert!(report.ends_with("_Checked: 2024-03-09 07:05_"));
    }

    #[test]
    fn parse_error_report() {
        assert_eq!(
            render_parse_error(&ParseError::BlindsUnparsable),
            "❌ Parse error: blinds unparsable"
        );
    }

    #[test]
    fn advice_lines_become_bullets() {
        assert_eq!(
            render_advice("Fold preflop.\nNever call here.\n"),
            "\n\n🎓 *Coach advice:*\nFold preflop.\n• Never call here."
        );
    }
}
