//! UI-facing models served on the JSON surface.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ViewCard {
    /// Display token: "2".."10", "J", "Q", "K", "A". Empty when hidden.
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub rank: String,

    /// Lowercase suit name. Empty when hidden.
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub suit: String,

    /// The card exists but its value is withheld from this viewer
    pub hidden: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ViewPlayer {
    pub id: String,
    pub name: String,
    pub position: u8,
    pub stack: u64,
    pub current_bet: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cards: Option<Vec<ViewCard>>,
    pub is_dealer: bool,
    pub is_small_blind: bool,
    pub is_big_blind: bool,
    pub is_folded: bool,
    pub is_all_in: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GameState {
    pub pot: u64,
    pub current_bet: u64,
    pub min_raise: u64,
    pub board_texture: String,
    /// Empty when nobody is to act
    pub current_player_id: String,
    pub time_remaining: u64,
    pub street: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TableView {
    pub table_id: String,
    pub name: String,
    pub max_seats: u8,
    pub small_blind: u64,
    pub big_blind: u64,
    pub ante: u64,
    pub hand_in_progress: bool,
    pub players: Vec<ViewPlayer>,
    pub community_cards: Vec<ViewCard>,
    pub game_state: GameState,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TournamentSummary {
    pub id: String,
    pub name: String,
    pub status: String,
    pub current_level: u32,
    pub players_registered: u32,
    pub tables_running: u32,
}
