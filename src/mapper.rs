//! Wire snapshot to view model translation.
//!
//! Everything here is pure and total: no I/O, no errors. A new [`TableView`]
//! is built from scratch on every fetch.

use crate::{
    cards::map_card,
    view::{GameState, TableView, TournamentSummary, ViewPlayer},
    wire::{WirePlayer, WireTable, WireTournament},
};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StatusFlags {
    pub folded: bool,
    pub all_in: bool,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BlindSeats {
    pub small_blind: Option<u8>,
    pub big_blind: Option<u8>,
}

/// Case-insensitive substring inspection of a free-text player status.
#[must_use]
pub fn derive_status_flags(status: &str) -> StatusFlags {
    let status = status.to_lowercase();
    StatusFlags {
        folded: status.contains("fold"),
        all_in: status.contains("allin") || status.contains("all_in"),
    }
}

/// Derive the blind seats from the dealer button.
///
/// The small blind is the first occupied seat strictly after the dealer and
/// the big blind the first occupied seat strictly after the small blind, both
/// walking seats modulo `capacity`. Each search stops after one full lap.
#[must_use]
pub fn compute_blind_seats(dealer: Option<u8>, players: &[WirePlayer], capacity: u8) -> BlindSeats {
    let Some(dealer) = dealer else {
        return BlindSeats::default();
    };
    if players.is_empty() || capacity == 0 {
        return BlindSeats::default();
    }

    let mut occupied = vec![false; usize::from(capacity)];
    for player in players {
        if let Some(seat) = occupied.get_mut(usize::from(player.seat_index)) {
            *seat = true;
        }
    }
    let next_occupied = |from: u8| {
        (1..=u16::from(capacity))
            .map(|step| {
                let seat = (u16::from(from) + step) % u16::from(capacity);
                u8::try_from(seat).unwrap_or_default()
            })
            .find(|seat| occupied[usize::from(*seat)])
    };

    let small_blind = next_occupied(dealer);
    let big_blind = small_blind.and_then(next_occupied);
    BlindSeats {
        small_blind,
        big_blind,
    }
}

/// Map one seated player. Hole cards are hidden unless `viewer_id` is the
/// player's own id.
#[must_use]
pub fn map_player(
    player: &WirePlayer,
    dealer: Option<u8>,
    blinds: BlindSeats,
    viewer_id: &str,
) -> ViewPlayer {
    let id = player.player_id.to_string();
    let hidden = id != viewer_id;
    let flags = derive_status_flags(&player.status);
    let seat = Some(player.seat_index);
    ViewPlayer {
        cards: player
            .hole_cards
            .as_ref()
            .map(|cards| cards.iter().map(|card| map_card(card, hidden)).collect()),
        id,
        name: player.display_name.clone(),
        position: player.seat_index,
        stack: player.stack,
        current_bet: player.current_bet,
        is_dealer: dealer == seat,
        is_small_blind: blinds.small_blind == seat,
        is_big_blind: blinds.big_blind == seat,
        is_folded: flags.folded,
        is_all_in: flags.all_in,
    }
}

#[must_use]
pub fn map_table_to_ui(table: &WireTable, viewer_id: &str) -> TableView {
    let blinds = compute_blind_seats(table.dealer_button, &table.players, table.max_seats);
    let players = table
        .players
        .iter()
        .map(|p| map_player(p, table.dealer_button, blinds, viewer_id))
        .collect();
    let community_cards = table.board.iter().map(|c| map_card(c, false)).collect();

    let current_bet = table
        .players
        .iter()
        .map(|p| p.current_bet)
        .max()
        .unwrap_or_default();
    let current_player_id = table
        .current_actor_seat
        .and_then(|seat| table.players.iter().find(|p| p.seat_index == seat))
        .map(|p| p.player_id.to_string())
        .unwrap_or_default();

    TableView {
        table_id: table.table_id.to_string(),
        name: table.name.clone(),
        max_seats: table.max_seats,
        small_blind: table.small_blind,
        big_blind: table.big_blind,
        ante: table.ante,
        hand_in_progress: table.hand_in_progress,
        players,
        community_cards,
        game_state: GameState {
            pot: table.total_pot,
            current_bet,
            // not the service's rule, just a floor for the raise slider
            min_raise: table.big_blind.saturating_mul(2),
            board_texture: table.street.clone(),
            current_player_id,
            time_remaining: 0,
            street: table.street.clone(),
        },
    }
}

#[must_use]
pub fn map_tournament_to_ui(tournament: &WireTournament) -> TournamentSummary {
    TournamentSummary {
        id: tournament.tournament_id.to_string(),
        name: tournament.name.clone(),
        status: tournament.status.clone(),
        current_level: tournament.current_level,
        players_registered: tournament.players_registered,
        tables_running: tournament.tables_running,
    }
}
