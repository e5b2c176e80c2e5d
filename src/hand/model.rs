//! Typed record of one dealt tournament hand.

use std::fmt;
use std::time::Duration;

use serde::{Deserialize, Serialize};

/// A betting round marker.
///
/// Known labels map to named variants; anything else found between
/// `***` markers is kept verbatim in `Other`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Street {
    HoleCards,
    Flop,
    Turn,
    River,
    ShowDown,
    Summary,
    Other(String),
}

impl Street {
    pub fn from_label(label: &str) -> Self {
        match label.to_ascii_uppercase().as_str() {
            "HOLE CARDS" => Self::HoleCards,
            "FLOP" => Self::Flop,
            "TURN" => Self::Turn,
            "RIVER" => Self::River,
            "SHOW DOWN" | "SHOWDOWN" => Self::ShowDown,
            "SUMMARY" => Self::Summary,
            _ => Self::Other(label.to_string()),
        }
    }

    pub fn label(&self) -> &str {
        match self {
            Self::HoleCards => "HOLE CARDS",
            Self::Flop => "FLOP",
            Self::Turn => "TURN",
            Self::River => "RIVER",
            Self::ShowDown => "SHOW DOWN",
            Self::Summary => "SUMMARY",
            Self::Other(label) => label,
        }
    }
}

impl fmt::Display for Street {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// A seated player.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Player {
    pub name: String,
    /// Chip count at the start of the hand, 0 when not present.
    pub stack: u64,
}

/// One transcript entry: either a street marker or a player action.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Action {
    /// For markers, the street being opened. For player actions, the
    /// most recent street seen before the line (if any).
    pub street: Option<Street>,
    /// Empty for a street marker.
    pub player: String,
    /// Verb such as `raises`, `calls`, `folds`. Empty for a street marker.
    pub verb: String,
    /// 0 when the line carries no amount.
    pub amount: u64,
}

impl Action {
    pub fn street_marker(street: Street) -> Self {
        Self {
            street: Some(street),
            ..Default::default()
        }
    }

    pub fn is_street_marker(&self) -> bool {
        self.player.is_empty() && self.verb.is_empty()
    }
}

/// Structured hand history.
///
/// Numeric stake fields use 0 for "not parsed"; `parse` refuses to
/// produce a record at all when the blinds line is missing.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct HandRecord {
    pub hand_id: String,
    pub tournament_id: String,
    pub small_blind: u64,
    pub big_blind: u64,
    pub ante: u64,
    pub blind_increase_interval: Option<Duration>,
    pub players: Vec<Player>,
    pub actions: Vec<Action>,
    pub community: Vec<String>,
    pub winners: Vec<String>,
    pub mystery_elements: Vec<String>,
}

impl HandRecord {
    /// Player actions only, skipping street markers.
    pub fn player_actions(&self) -> impl Iterator<Item = &Action> {
        self.actions.iter().filter(|a| !a.is_street_marker())
    }
}
