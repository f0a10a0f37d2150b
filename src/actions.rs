//! UI gestures to the service's action vocabulary.

use serde::{Deserialize, Serialize};

use crate::wire::WireAction;

/// The four buttons the table UI offers. All-in is never offered directly.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UiAction {
    Fold,
    CheckOrCall,
    Bet,
    Raise,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TranslatedAction {
    pub action: WireAction,
    pub amount: Option<u64>,
}

/// Parse a user-typed chip amount. Anything that is not a non-negative
/// number becomes 0; the service decides whether 0 is acceptable.
#[must_use]
#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
pub fn parse_amount(input: &str) -> u64 {
    let input = input.trim();
    if let Ok(amount) = input.parse::<u64>() {
        return amount;
    }
    match input.parse::<f64>() {
        Ok(amount) if amount.is_finite() && amount >= 0.0 => amount.trunc() as u64,
        _ => 0,
    }
}

/// Resolve a UI gesture against the table's aggregate current bet.
#[must_use]
pub fn translate(intent: UiAction, current_bet: u64, amount_input: &str) -> TranslatedAction {
    let (action, amount) = match intent {
        UiAction::Fold => (WireAction::Fold, None),
        UiAction::CheckOrCall if current_bet > 0 => (WireAction::Call, None),
        UiAction::CheckOrCall => (WireAction::Check, None),
        UiAction::Bet => (WireAction::Bet, Some(parse_amount(amount_input))),
        UiAction::Raise => (WireAction::Raise, Some(parse_amount(amount_input))),
    };
    TranslatedAction { action, amount }
}
