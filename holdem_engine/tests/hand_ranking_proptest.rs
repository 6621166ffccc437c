/// Property-based tests for hand ranking
///
/// Seven-card ranking is checked against a brute force over every
/// five-card subset.
use holdem_engine::game::{
    HandCategory, rank_hand,
    entities::{Card, Suit, standard_cards},
};
use proptest::prelude::*;

// Distinct cards in random order
fn unique_cards_strategy(count: usize) -> impl Strategy<Value = Vec<Card>> {
    prop::sample::subsequence(standard_cards(), count).prop_shuffle()
}

fn best_of_five(cards: &[Card]) -> holdem_engine::game::HandRank {
    let mut best = None;
    for a in 0..cards.len() {
        for b in a + 1..cards.len() {
            for c in b + 1..cards.len() {
                for d in c + 1..cards.len() {
                    for e in d + 1..cards.len() {
                        let rank = rank_hand(&[cards[a], cards[b], cards[c], cards[d], cards[e]]);
                        if best.as_ref().is_none_or(|current| rank > *current) {
                            best = Some(rank);
                        }
                    }
                }
            }
        }
    }
    best.unwrap_or_else(|| rank_hand(cards))
}

proptest! {
    #[test]
    fn test_seven_cards_rank_as_best_five(cards in unique_cards_strategy(7)) {
        prop_assert_eq!(rank_hand(&cards), best_of_five(&cards));
    }

    #[test]
    fn test_six_cards_rank_as_best_five(cards in unique_cards_strategy(6)) {
        prop_assert_eq!(rank_hand(&cards), best_of_five(&cards));
    }

    #[test]
    fn test_ranking_ignores_card_order(cards in unique_cards_strategy(7)) {
        let mut reversed = cards.clone();
        reversed.reverse();
        prop_assert_eq!(rank_hand(&cards), rank_hand(&reversed));
    }

    #[test]
    fn test_adding_cards_never_lowers_rank(cards in unique_cards_strategy(7)) {
        let five = rank_hand(&cards[..5]);
        let seven = rank_hand(&cards);
        prop_assert!(seven >= five);
    }

    #[test]
    fn test_kickers_at_most_five(cards in unique_cards_strategy(7)) {
        let rank = rank_hand(&cards);
        prop_assert!(rank.kickers.len() <= 5);
        prop_assert!(rank.kickers.iter().all(|&v| (2..=14).contains(&v)));
    }
}

#[test]
fn test_wheel_is_five_high_straight() {
    let wheel = [
        Card(14, Suit::Club),
        Card(2, Suit::Diamond),
        Card(3, Suit::Heart),
        Card(4, Suit::Spade),
        Card(5, Suit::Club),
    ];
    let rank = rank_hand(&wheel);
    assert_eq!(rank.category, HandCategory::Straight);
    assert_eq!(rank.kickers, vec![5]);

    let six_high = [
        Card(2, Suit::Diamond),
        Card(3, Suit::Heart),
        Card(4, Suit::Spade),
        Card(5, Suit::Club),
        Card(6, Suit::Club),
    ];
    assert!(rank_hand(&six_high) > rank);
}

#[test]
fn test_royal_flush_tops_everything() {
    let royal = [
        Card(10, Suit::Heart),
        Card(11, Suit::Heart),
        Card(12, Suit::Heart),
        Card(13, Suit::Heart),
        Card(14, Suit::Heart),
        Card(14, Suit::Spade),
        Card(14, Suit::Club),
    ];
    assert_eq!(rank_hand(&royal).category, HandCategory::RoyalFlush);
}

#[test]
fn test_pair_kickers_break_ties() {
    let board = [
        Card(9, Suit::Club),
        Card(9, Suit::Diamond),
        Card(4, Suit::Heart),
        Card(7, Suit::Spade),
        Card(2, Suit::Club),
    ];
    let mut ace = board.to_vec();
    ace.extend([Card(14, Suit::Spade), Card(3, Suit::Heart)]);
    let mut king = board.to_vec();
    king.extend([Card(13, Suit::Spade), Card(3, Suit::Diamond)]);
    assert!(rank_hand(&ace) > rank_hand(&king));
}
