//! Shapes exchanged with the remote poker service.
//!
//! Snapshots are deserialized with snake_case as the canonical field name and
//! camelCase accepted as an alias, so the rest of the crate only ever sees one
//! name per field regardless of which convention the service speaks.

use derive_more::{Display, From, Into};
use serde::{Deserialize, Deserializer, Serialize};

/// Table identifier. Kept as a string because the on-chain id space does not
/// fit a 53-bit integer.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Display, From, Into, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TableId(#[serde(deserialize_with = "string_or_number")] pub String);

impl From<&str> for TableId {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

/// Tournament identifier, same representation as [`TableId`].
#[derive(Debug, Clone, PartialEq, Eq, Hash, Display, From, Into, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TournamentId(#[serde(deserialize_with = "string_or_number")] pub String);

impl From<&str> for TournamentId {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WireCard {
    /// Long-form rank word, e.g. "Ace" or "Ten"
    pub rank: String,

    /// Long-form suit word, e.g. "Spades"
    pub suit: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WirePlayer {
    #[serde(alias = "playerId")]
    pub player_id: u64,

    #[serde(alias = "displayName")]
    pub display_name: String,

    #[serde(alias = "seatIndex")]
    pub seat_index: u8,

    pub stack: u64,

    #[serde(alias = "currentBet")]
    pub current_bet: u64,

    /// Free-text status, e.g. "Active", "Folded", "AllIn"
    pub status: String,

    /// Only present when the service lets the viewer see them
    #[serde(default, alias = "holeCards")]
    pub hole_cards: Option<Vec<WireCard>>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WireTable {
    #[serde(alias = "tableId")]
    pub table_id: TableId,

    pub name: String,

    #[serde(alias = "maxSeats")]
    pub max_seats: u8,

    #[serde(alias = "smallBlind")]
    pub small_blind: u64,

    #[serde(alias = "bigBlind")]
    pub big_blind: u64,

    #[serde(default)]
    pub ante: u64,

    pub street: String,

    #[serde(default, alias = "dealerButton")]
    pub dealer_button: Option<u8>,

    #[serde(alias = "totalPot")]
    pub total_pot: u64,

    #[serde(default)]
    pub board: Vec<WireCard>,

    #[serde(default)]
    pub players: Vec<WirePlayer>,

    #[serde(alias = "handInProgress")]
    pub hand_in_progress: bool,

    #[serde(default, alias = "currentActorSeat")]
    pub current_actor_seat: Option<u8>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WireTournament {
    #[serde(alias = "tournamentId")]
    pub tournament_id: TournamentId,

    pub name: String,

    /// "Registering", "Running", "Finished", ...
    pub status: String,

    #[serde(alias = "currentLevel")]
    pub current_level: u32,

    #[serde(alias = "playersRegistered")]
    pub players_registered: u32,

    #[serde(alias = "tablesRunning")]
    pub tables_running: u32,
}

/// Forced-bet scheme as the service names it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AnteType {
    None,
    Classic,
    BigBlind,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BlindLevel {
    pub level: u32,
    pub small_blind: u64,
    pub big_blind: u64,
    pub ante: u64,
    pub ante_type: AnteType,
    pub duration_minutes: u32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BlindStructure {
    pub levels: Vec<BlindLevel>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TournamentSchedule {
    /// Microseconds since the Unix epoch
    pub start_time: u64,
    pub allow_early_start: bool,
    pub break_every_minutes: u32,
    pub break_duration_minutes: u32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TableBalancing {
    pub enabled: bool,
    pub max_seat_difference: u8,
}

/// Payload of the `createTournament` mutation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TournamentConfig {
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub starting_stack: u64,
    pub max_players: u32,
    pub min_players_to_start: u32,
    pub table_size: u8,
    pub freezeout: bool,
    pub reentry_allowed: bool,
    pub max_entries_per_player: u32,
    pub late_registration_level: u32,
    pub blind_structure: BlindStructure,
    pub schedule: TournamentSchedule,
    pub balancing: TableBalancing,
}

/// The service's action vocabulary for `playerAction`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, Serialize, Deserialize)]
pub enum WireAction {
    Fold,
    Check,
    Call,
    Bet,
    Raise,
    AllIn,
}

fn string_or_number<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Raw {
        Text(String),
        Number(serde_json::Number),
    }

    Ok(match Raw::deserialize(deserializer)? {
        Raw::Text(text) => text,
        Raw::Number(number) => number.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn table_accepts_both_casings() {
        let snake = json!({
            "table_id": "18446744073709551617",
            "name": "Main",
            "max_seats": 6,
            "small_blind": 5,
            "big_blind": 10,
            "ante": 0,
            "street": "Flop",
            "dealer_button": 2,
            "total_pot": 30,
            "board": [{"rank": "Ace", "suit": "Spades"}],
            "players": [{
                "player_id": 7,
                "display_name": "alice",
                "seat_index": 3,
                "stack": 990,
                "current_bet": 10,
                "status": "Active",
                "hole_cards": null
            }],
            "hand_in_progress": true,
            "current_actor_seat": 3
        });
        let camel = json!({
            "tableId": "18446744073709551617",
            "name": "Main",
            "maxSeats": 6,
            "smallBlind": 5,
            "bigBlind": 10,
            "street": "Flop",
            "dealerButton": 2,
            "totalPot": 30,
            "board": [{"rank": "Ace", "suit": "Spades"}],
            "players": [{
                "playerId": 7,
                "displayName": "alice",
                "seatIndex": 3,
                "stack": 990,
                "currentBet": 10,
                "status": "Active"
            }],
            "handInProgress": true,
            "currentActorSeat": 3
        });
        let a: WireTable = serde_json::from_value(snake).unwrap();
        let b: WireTable = serde_json::from_value(camel).unwrap();
        assert_eq!(a, b);
        assert_eq!(a.table_id.to_string(), "18446744073709551617");
    }

    #[test]
    fn numeric_ids_are_stringified() {
        let tournament: WireTournament = serde_json::from_value(json!({
            "tournamentId": 42,
            "name": "Sunday",
            "status": "Registering",
            "currentLevel": 0,
            "playersRegistered": 3,
            "tablesRunning": 0
        }))
        .unwrap();
        assert_eq!(tournament.tournament_id, TournamentId::from("42"));

        let id: TableId = serde_json::from_str("18446744073709551615").unwrap();
        assert_eq!(id, TableId::from("18446744073709551615"));
        let id: TableId = serde_json::from_str("\"18446744073709551616\"").unwrap();
        assert_eq!(id.to_string(), "18446744073709551616");
        assert!(serde_json::from_str::<TableId>("true").is_err());
    }

    #[test]
    fn actions_use_service_names() {
        assert_eq!(serde_json::to_value(WireAction::AllIn).unwrap(), json!("AllIn"));
        assert_eq!(serde_json::to_value(AnteType::BigBlind).unwrap(), json!("BigBlind"));
    }
}
