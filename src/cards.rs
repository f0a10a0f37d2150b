//! Card vocabulary: service words to display tokens.
//!
//! Unknown words never fail. They degrade to the ace of spades so the view
//! keeps rendering, and every occurrence is logged and counted.

use std::sync::atomic::{AtomicU64, Ordering};

use rs_poker::core::{Suit, Value};
use tracing::warn;

use crate::{view::ViewCard, wire::WireCard};

static FALLBACKS: AtomicU64 = AtomicU64::new(0);

/// Number of unknown rank or suit words seen since the process started.
#[must_use]
pub fn fallback_count() -> u64 {
    FALLBACKS.load(Ordering::Relaxed)
}

fn note_fallback(kind: &'static str, word: &str) {
    FALLBACKS.fetch_add(1, Ordering::Relaxed);
    warn!(kind, word, "unknown card word, using fallback");
}

#[must_use]
pub fn parse_rank(word: &str) -> Option<Value> {
    let value = match word {
        "Two" => Value::Two,
        "Three" => Value::Three,
        "Four" => Value::Four,
        "Five" => Value::Five,
        "Six" => Value::Six,
        "Seven" => Value::Seven,
        "Eight" => Value::Eight,
        "Nine" => Value::Nine,
        "Ten" => Value::Ten,
        "Jack" => Value::Jack,
        "Queen" => Value::Queen,
        "King" => Value::King,
        "Ace" => Value::Ace,
        _ => return None,
    };
    Some(value)
}

#[must_use]
pub fn parse_suit(word: &str) -> Option<Suit> {
    let suit = match word {
        "Clubs" => Suit::Club,
        "Diamonds" => Suit::Diamond,
        "Hearts" => Suit::Heart,
        "Spades" => Suit::Spade,
        _ => return None,
    };
    Some(suit)
}

#[must_use]
pub fn rank_token(value: Value) -> &'static str {
    match value {
        Value::Two => "2",
        Value::Three => "3",
        Value::Four => "4",
        Value::Five => "5",
        Value::Six => "6",
        Value::Seven => "7",
        Value::Eight => "8",
        Value::Nine => "9",
        Value::Ten => "10",
        Value::Jack => "J",
        Value::Queen => "Q",
        Value::King => "K",
        Value::Ace => "A",
    }
}

#[must_use]
pub fn suit_name(suit: Suit) -> &'static str {
    match suit {
        Suit::Club => "clubs",
        Suit::Diamond => "diamonds",
        Suit::Heart => "hearts",
        Suit::Spade => "spades",
    }
}

/// Rank word to display token, "A" when the word is unknown.
#[must_use]
pub fn map_rank(word: &str) -> &'static str {
    let value = parse_rank(word).unwrap_or_else(|| {
        note_fallback("rank", word);
        Value::Ace
    });
    rank_token(value)
}

/// Suit word to lowercase name, "spades" when the word is unknown.
#[must_use]
pub fn map_suit(word: &str) -> &'static str {
    let suit = parse_suit(word).unwrap_or_else(|| {
        note_fallback("suit", word);
        Suit::Spade
    });
    suit_name(suit)
}

/// A hidden card keeps its place in the hand but carries no rank or suit.
#[must_use]
pub fn map_card(card: &WireCard, hidden: bool) -> ViewCard {
    if hidden {
        return ViewCard {
            rank: String::new(),
            suit: String::new(),
            hidden,
        };
    }
    ViewCard {
        rank: map_rank(&card.rank).to_string(),
        suit: map_suit(&card.suit).to_string(),
        hidden,
    }
}
