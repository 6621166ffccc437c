//! Hand ranking for up to seven cards.

use serde::{Deserialize, Serialize};
use std::fmt;

use super::entities::{Card, Suit, Value};

#[derive(Clone, Copy, Debug, Deserialize, Eq, Hash, Ord, PartialEq, PartialOrd, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum HandCategory {
    HighCard,
    OnePair,
    TwoPair,
    ThreeOfAKind,
    Straight,
    Flush,
    FullHouse,
    FourOfAKind,
    StraightFlush,
    RoyalFlush,
}

impl fmt::Display for HandCategory {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let repr = match self {
            Self::HighCard => "high card",
            Self::OnePair => "one pair",
            Self::TwoPair => "two pair",
            Self::ThreeOfAKind => "three of a kind",
            Self::Straight => "straight",
            Self::Flush => "flush",
            Self::FullHouse => "full house",
            Self::FourOfAKind => "four of a kind",
            Self::StraightFlush => "straight flush",
            Self::RoyalFlush => "royal flush",
        };
        write!(f, "{repr}")
    }
}

/// Category plus tiebreak values, high to low. Ordering compares the
/// category first and then the kickers lexicographically.
#[derive(Clone, Debug, Deserialize, Eq, Hash, Ord, PartialEq, PartialOrd, Serialize)]
pub struct HandRank {
    pub category: HandCategory,
    pub kickers: Vec<Value>,
}

impl HandRank {
    fn new(category: HandCategory, kickers: Vec<Value>) -> Self {
        Self { category, kickers }
    }
}

impl fmt::Display for HandRank {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{} {:?}", self.category, self.kickers)
    }
}

/// Ranks the best five-card hand available in `cards`. Fewer than five
/// cards are ranked on what is there (pairs and high cards only).
pub fn rank_hand(cards: &[Card]) -> HandRank {
    let mut counts = [0u8; 15];
    let mut suit_masks = [0u16; 4];
    for card in cards {
        counts[card.value() as usize] += 1;
        suit_masks[suit_index(card.suit())] |= 1 << card.value();
    }

    if let Some(mask) = suit_masks.iter().copied().find(|mask| mask.count_ones() >= 5) {
        if let Some(high) = straight_high(mask) {
            return if high == Card::ACE {
                HandRank::new(HandCategory::RoyalFlush, vec![high])
            } else {
                HandRank::new(HandCategory::StraightFlush, vec![high])
            };
        }
    }

    // (count, value) with the biggest groups first, then the highest values.
    let mut groups: Vec<(u8, Value)> = (Card::MIN_VALUE..=Card::ACE)
        .filter(|&v| counts[v as usize] > 0)
        .map(|v| (counts[v as usize], v))
        .collect();
    groups.sort_unstable_by(|a, b| b.cmp(a));

    let kickers_after = |skip: usize, take: usize| -> Vec<Value> {
        let mut rest: Vec<Value> = groups.iter().skip(skip).map(|&(_, v)| v).collect();
        rest.sort_unstable_by(|a, b| b.cmp(a));
        rest.truncate(take);
        rest
    };

    match groups.as_slice() {
        [(4, quad), ..] => {
            let mut kickers = vec![*quad];
            kickers.extend(kickers_after(1, 1));
            return HandRank::new(HandCategory::FourOfAKind, kickers);
        }
        [(3, trips), (pair, paired), ..] if *pair >= 2 => {
            return HandRank::new(HandCategory::FullHouse, vec![*trips, *paired]);
        }
        _ => {}
    }

    if let Some(mask) = suit_masks.iter().copied().find(|mask| mask.count_ones() >= 5) {
        let kickers = (Card::MIN_VALUE..=Card::ACE)
            .rev()
            .filter(|v| mask & (1 << v) != 0)
            .take(5)
            .collect();
        return HandRank::new(HandCategory::Flush, kickers);
    }

    let all_values = suit_masks.iter().fold(0u16, |acc, mask| acc | mask);
    if let Some(high) = straight_high(all_values) {
        return HandRank::new(HandCategory::Straight, vec![high]);
    }

    match groups.as_slice() {
        [(3, trips), ..] => {
            let mut kickers = vec![*trips];
            kickers.extend(kickers_after(1, 2));
            HandRank::new(HandCategory::ThreeOfAKind, kickers)
        }
        [(2, high), (2, low), ..] => {
            let mut kickers = vec![*high, *low];
            kickers.extend(kickers_after(2, 1));
            HandRank::new(HandCategory::TwoPair, kickers)
        }
        [(2, pair), ..] => {
            let mut kickers = vec![*pair];
            kickers.extend(kickers_after(1, 3));
            HandRank::new(HandCategory::OnePair, kickers)
        }
        _ => HandRank::new(HandCategory::HighCard, kickers_after(0, 5)),
    }
}

/// Highest card of the best straight in a value bitmask (bit n = value n).
/// The ace also plays low, below the deuce.
fn straight_high(mask: u16) -> Option<Value> {
    let mask = if mask & (1 << Card::ACE) != 0 {
        mask | (1 << 1)
    } else {
        mask
    };
    (5..=Card::ACE).rev().find(|&high| {
        let window = 0b1_1111u16 << (high - 4);
        mask & window == window
    })
}

fn suit_index(suit: Suit) -> usize {
    match suit {
        Suit::Club => 0,
        Suit::Diamond => 1,
        Suit::Heart => 2,
        Suit::Spade => 3,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::game::entities::Suit::{Club, Diamond, Heart, Spade};

    fn rank(cards: &[(Value, Suit)]) -> HandRank {
        let cards: Vec<Card> = cards.iter().map(|&(v, s)| Card(v, s)).collect();
        rank_hand(&cards)
    }

    #[test]
    fn test_royal_flush() {
        let r = rank(&[(10, Heart), (11, Heart), (12, Heart), (13, Heart), (14, Heart), (2, Club), (3, Spade)]);
        assert_eq!(r.category, HandCategory::RoyalFlush);
    }

    #[test]
    fn test_wheel_straight_flush() {
        let r = rank(&[(14, Club), (2, Club), (3, Club), (4, Club), (5, Club), (13, Heart), (13, Spade)]);
        assert_eq!(r, HandRank::new(HandCategory::StraightFlush, vec![5]));
    }

    #[test]
    fn test_wheel_straight_loses_to_six_high() {
        let wheel = rank(&[(14, Club), (2, Diamond), (3, Club), (4, Heart), (5, Spade)]);
        let six = rank(&[(6, Club), (2, Diamond), (3, Club), (4, Heart), (5, Spade)]);
        assert_eq!(wheel.category, HandCategory::Straight);
        assert!(six > wheel);
    }

    #[test]
    fn test_quads_with_best_kicker() {
        let r = rank(&[(9, Club), (9, Diamond), (9, Heart), (9, Spade), (13, Club), (13, Heart), (2, Club)]);
        assert_eq!(r, HandRank::new(HandCategory::FourOfAKind, vec![9, 13]));
    }

    #[test]
    fn test_two_trips_make_full_house() {
        let r = rank(&[(8, Club), (8, Diamond), (8, Heart), (4, Spade), (4, Club), (4, Heart), (14, Club)]);
        assert_eq!(r, HandRank::new(HandCategory::FullHouse, vec![8, 4]));
    }

    #[test]
    fn test_flush_beats_straight() {
        let flush = rank(&[(2, Spade), (6, Spade), (9, Spade), (11, Spade), (13, Spade), (10, Club), (12, Heart)]);
        assert_eq!(flush.category, HandCategory::Flush);
        assert_eq!(flush.kickers, vec![13, 11, 9, 6, 2]);
    }

    #[test]
    fn test_three_pairs_use_best_two_and_kicker() {
        let r = rank(&[(12, Club), (12, Heart), (7, Club), (7, Heart), (5, Spade), (5, Diamond), (3, Club)]);
        assert_eq!(r, HandRank::new(HandCategory::TwoPair, vec![12, 7, 5]));
    }

    #[test]
    fn test_kicker_breaks_pair_tie() {
        let a = rank(&[(10, Club), (10, Heart), (14, Spade), (7, Club), (3, Diamond)]);
        let b = rank(&[(10, Diamond), (10, Spade), (13, Spade), (7, Heart), (3, Club)]);
        assert!(a > b);
    }

    #[test]
    fn test_fewer_than_five_cards() {
        assert_eq!(rank(&[(14, Club), (14, Heart)]), HandRank::new(HandCategory::OnePair, vec![14]));
        assert_eq!(rank(&[(9, Club), (4, Heart)]), HandRank::new(HandCategory::HighCard, vec![9, 4]));
        assert_eq!(rank(&[]).category, HandCategory::HighCard);
    }

    #[test]
    fn test_category_order() {
        assert!(HandCategory::RoyalFlush > HandCategory::StraightFlush);
        assert!(HandCategory::FullHouse > HandCategory::Flush);
        assert!(HandCategory::TwoPair > HandCategory::OnePair);
    }
}
