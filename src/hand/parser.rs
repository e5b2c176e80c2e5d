//! Hand history parser.
//!
//! Every field has its own pattern and failure mode. Only the blinds line
//! is mandatory; everything else is best-effort and missing pieces are
//! simply left empty.

use std::sync::LazyLock;
use std::time::Duration;

use regex::Regex;
use tracing::debug;

use crate::error::ParseError;
use crate::hand::model::{Action, HandRecord, Player, Street};

static HAND_ANCHOR: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?mi)^Hand #(\d+).*Tournament #(\S+)").unwrap());

static MYSTERY_ELEMENTS: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)Mystery Elements:\s*\[([^\]]+)\]").unwrap());

static BLINDS: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"Blinds: ([\d,]+)/([\d,]+).*Ante ([\d,]+)").unwrap());

static BLIND_LEVELS: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"Blind Levels: (\d+) minutes").unwrap());

// Transcript line grammar, tried in order by `classify_line`.
static STREET_LINE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\*\*\* (.+?) \*\*\*((?:\s*\[[^\]]*\])*)$").unwrap());

static SEAT_LINE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^Seat \d+: (.+?) \(([\d,]+) in chips\)").unwrap());

static BOARD_LINE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^Board \[([^\]]*)\]").unwrap());

static ACTION_LINE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(\w+)\s+(\w+)(?:\s+to)?(?:\s+([\d,]+))?$").unwrap());

static CARD_GROUP: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\[([^\]]*)\]").unwrap());

/// Verbs that mark the acting player as a pot winner.
const WINNING_VERBS: &[&str] = &["collected", "wins"];

/// Small blind, big blind, and ante parsed from the blinds line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Blinds {
    pub small: u64,
    pub big: u64,
    pub ante: u64,
}

/// Shape of a single transcript line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Line {
    /// `*** LABEL ***`, optionally followed by bracketed card groups.
    Street { label: String, cards: Vec<String> },
    /// `Seat N: name (stack in chips)`
    Seat { name: String, stack: u64 },
    /// `Board [cards]`
    Board { cards: Vec<String> },
    /// `player verb [to] [amount]`
    Action {
        player: String,
        verb: String,
        amount: u64,
    },
    Unrecognized,
}

/// Parse a hand history transcript into a [`HandRecord`].
///
/// Fails only when the blinds line cannot be found.
pub fn parse(text: &str) -> Result<HandRecord, ParseError> {
    let blinds = parse_blinds(text)?;

    let (hand_id, tournament_id) = parse_ids(text).unwrap_or_default();

    let mut record = HandRecord {
        hand_id,
        tournament_id,
        small_blind: blinds.small,
        big_blind: blinds.big,
        ante: blinds.ante,
        blind_increase_interval: parse_blind_interval(text),
        mystery_elements: parse_mystery_elements(text),
        ..Default::default()
    };

    scan_transcript(text, &mut record);

    debug!(
        hand_id = %record.hand_id,
        players = record.players.len(),
        actions = record.actions.len(),
        "Parsed hand history"
    );

    Ok(record)
}

/// Hand and tournament ids from the first `Hand #.. Tournament #..` line.
///
/// One trailing separator is trimmed from the tournament id.
pub fn parse_ids(text: &str) -> Option<(String, String)> {
    let caps = HAND_ANCHOR.captures(text)?;
    let hand_id = caps[1].to_string();
    let raw = &caps[2];
    let tournament_id = raw
        .strip_suffix(['-', ',', ':'])
        .unwrap_or(raw)
        .to_string();
    Some((hand_id, tournament_id))
}

/// Items of a `Mystery Elements: [a, b, c]` list, trimmed. Empty when absent.
pub fn parse_mystery_elements(text: &str) -> Vec<String> {
    let Some(caps) = MYSTERY_ELEMENTS.captures(text) else {
        return Vec::new();
    };
    caps[1]
        .split(',')
        .map(str::trim)
        .filter(|item| !item.is_empty())
        .map(String::from)
        .collect()
}

/// The mandatory `Blinds: <sb>/<bb> ... Ante <ante>` line.
pub fn parse_blinds(text: &str) -> Result<Blinds, ParseError> {
    let caps = BLINDS.captures(text).ok_or(ParseError::BlindsUnparsable)?;
    let number = |i: usize| parse_chips(&caps[i]).ok_or(ParseError::BlindsUnparsable);
    Ok(Blinds {
        small: number(1)?,
        big: number(2)?,
        ante: number(3)?,
    })
}

/// Optional `Blind Levels: <n> minutes` interval. Values too large to
/// express in seconds count as absent.
pub fn parse_blind_interval(text: &str) -> Option<Duration> {
    let caps = BLIND_LEVELS.captures(text)?;
    let minutes: u64 = caps[1].parse().ok()?;
    minutes.checked_mul(60).map(Duration::from_secs)
}

/// Parse a chip count that may contain `,` thousands separators.
pub fn parse_chips(raw: &str) -> Option<u64> {
    let digits: String = raw.chars().filter(|c| *c != ',').collect();
    digits.parse().ok()
}

/// Classify one trimmed transcript line.
pub fn classify_line(line: &str) -> Line {
    if let Some(caps) = STREET_LINE.captures(line) {
        let cards = CARD_GROUP
            .captures_iter(&caps[2])
            .last()
            .map(|group| split_cards(&group[1]))
            .unwrap_or_default();
        return Line::Street {
            label: caps[1].to_string(),
            cards,
        };
    }

    if let Some(caps) = SEAT_LINE.captures(line) {
        return Line::Seat {
            name: caps[1].to_string(),
            stack: parse_chips(&caps[2]).unwrap_or(0),
        };
    }

    if let Some(caps) = BOARD_LINE.captures(line) {
        return Line::Board {
            cards: split_cards(&caps[1]),
        };
    }

    if let Some(caps) = ACTION_LINE.captures(line) {
        return Line::Action {
            player: caps[1].to_string(),
            verb: caps[2].to_string(),
            amount: caps
                .get(3)
                .and_then(|m| parse_chips(m.as_str()))
                .unwrap_or(0),
        };
    }

    Line::Unrecognized
}

fn split_cards(raw: &str) -> Vec<String> {
    raw.split_whitespace().map(String::from).collect()
}

/// Walk the transcript and fill players, actions, community and winners.
fn scan_transcript(text: &str, record: &mut HandRecord) {
    let mut current_street: Option<Street> = None;
    let mut board: Vec<String> = Vec::new();

    for line in text.lines().map(str::trim) {
        match classify_line(line) {
            Line::Street { label, cards } => {
                let street = Street::from_label(&label);
                record.community.extend(cards);
                record.actions.push(Action::street_marker(street.clone()));
                current_street = Some(street);
            }
            Line::Seat { name, stack } => {
                if !record.players.iter().any(|p| p.name == name) {
                    record.players.push(Player { name, stack });
                }
            }
            Line::Board { cards } => board = cards,
            Line::Action {
                player,
                verb,
                amount,
            } => {
                if WINNING_VERBS.contains(&verb.as_str()) && !record.winners.contains(&player) {
                    record.winners.push(player.clone());
                }
                record.actions.push(Action {
                    street: current_street.clone(),
                    player,
                    verb,
                    amount,
                });
            }
            Line::Unrecognized => {}
        }
    }

    // Summary board only fills in when street markers carried no cards.
    if record.community.is_empty() {
        record.community = board;
    }
}
