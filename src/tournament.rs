//! Tournament creation form as the UI submits it, and its wire translation.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::wire::{
    AnteType, BlindLevel, BlindStructure, TableBalancing, TournamentConfig, TournamentSchedule,
};

/// Ante choice offered by the UI.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UiAnteType {
    None,
    Ante,
    Bba,
}

impl From<UiAnteType> for AnteType {
    fn from(value: UiAnteType) -> Self {
        match value {
            UiAnteType::None => AnteType::None,
            UiAnteType::Ante => AnteType::Classic,
            UiAnteType::Bba => AnteType::BigBlind,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LevelForm {
    pub level: u32,
    pub small_blind: u64,
    pub big_blind: u64,
    #[serde(default)]
    pub ante: u64,
    pub ante_type: UiAnteType,
    pub duration_minutes: u32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TournamentForm {
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    pub starting_stack: u64,
    pub max_players: u32,
    pub min_players_to_start: u32,
    pub table_size: u8,
    #[serde(default)]
    pub freezeout: bool,
    #[serde(default)]
    pub reentry_allowed: bool,
    #[serde(default = "one")]
    pub max_entries_per_player: u32,
    #[serde(default)]
    pub late_registration_level: u32,
    pub levels: Vec<LevelForm>,
    pub start_time: DateTime<Utc>,
    #[serde(default)]
    pub allow_early_start: bool,
    #[serde(default)]
    pub break_every_minutes: u32,
    #[serde(default)]
    pub break_duration_minutes: u32,
    #[serde(default)]
    pub balancing_enabled: bool,
    #[serde(default = "one_seat")]
    pub max_seat_difference: u8,
}

fn one() -> u32 {
    1
}

fn one_seat() -> u8 {
    1
}

impl TournamentForm {
    #[must_use]
    pub fn to_wire(&self) -> TournamentConfig {
        let levels = self
            .levels
            .iter()
            .map(|level| BlindLevel {
                level: level.level,
                small_blind: level.small_blind,
                big_blind: level.big_blind,
                ante: level.ante,
                ante_type: level.ante_type.into(),
                duration_minutes: level.duration_minutes,
            })
            .collect();

        TournamentConfig {
            name: self.name.clone(),
            description: self.description.clone().filter(|d| !d.trim().is_empty()),
            starting_stack: self.starting_stack,
            max_players: self.max_players,
            min_players_to_start: self.min_players_to_start,
            table_size: self.table_size,
            freezeout: self.freezeout,
            reentry_allowed: self.reentry_allowed,
            max_entries_per_player: self.max_entries_per_player,
            late_registration_level: self.late_registration_level,
            blind_structure: BlindStructure { levels },
            schedule: TournamentSchedule {
                // timestamps before the epoch make no sense for a schedule
                start_time: u64::try_from(self.start_time.timestamp_micros()).unwrap_or_default(),
                allow_early_start: self.allow_early_start,
                break_every_minutes: self.break_every_minutes,
                break_duration_minutes: self.break_duration_minutes,
            },
            balancing: TableBalancing {
                enabled: self.balancing_enabled,
                max_seat_difference: self.max_seat_difference,
            },
        }
    }
}
