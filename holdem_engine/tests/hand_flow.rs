//! Full hands driven through the state machine, from the deal to the
//! audit record.

use holdem_engine::game::{
    DeckService, HandCategory, HandConfig, HandStateMachine, OddChipRule, RakePolicy,
    ReplayError, SeatedPlayer, StackedRandomness,
    entities::{Action, Blinds, Card, Chips, PlayerId, RecordedAction, Round, Suit},
};
use std::collections::BTreeSet;
use uuid::Uuid;

fn seats(stacks: &[Chips]) -> Vec<SeatedPlayer> {
    stacks
        .iter()
        .enumerate()
        .map(|(i, &stack)| SeatedPlayer {
            player_id: i as PlayerId + 1,
            seat: i,
            stack,
        })
        .collect()
}

fn config(post_blinds: bool) -> HandConfig {
    HandConfig {
        blinds: Blinds { small: 5, big: 10 },
        post_blinds,
        ..HandConfig::default()
    }
}

/// Hole cards for seats 1, 2 and 0 (dealing starts left of the button at
/// seat 0), then burn, flop, burn, turn, burn, river.
fn rigged_three_way() -> DeckService {
    DeckService::new(StackedRandomness::new(vec![
        Card(13, Suit::Spade),
        Card(12, Suit::Spade),
        Card(14, Suit::Spade),
        Card(13, Suit::Heart),
        Card(12, Suit::Heart),
        Card(14, Suit::Heart),
        Card(2, Suit::Club),
        Card(7, Suit::Diamond),
        Card(8, Suit::Club),
        Card(3, Suit::Heart),
        Card(2, Suit::Diamond),
        Card(9, Suit::Spade),
        Card(2, Suit::Heart),
        Card(4, Suit::Diamond),
    ]))
}

/// Heads-up with the button at seat 0: seat 1 is dealt kings, seat 0 aces.
fn rigged_heads_up() -> DeckService {
    DeckService::new(StackedRandomness::new(vec![
        Card(13, Suit::Spade),
        Card(14, Suit::Spade),
        Card(13, Suit::Heart),
        Card(14, Suit::Heart),
        Card(2, Suit::Club),
        Card(7, Suit::Diamond),
        Card(8, Suit::Club),
        Card(3, Suit::Heart),
        Card(2, Suit::Diamond),
        Card(9, Suit::Spade),
        Card(2, Suit::Heart),
        Card(4, Suit::Diamond),
    ]))
}

/// Low unpaired hole cards under a broadway board: every showdown ties.
fn broadway_board() -> DeckService {
    DeckService::new(StackedRandomness::new(vec![
        Card(2, Suit::Club),
        Card(3, Suit::Club),
        Card(4, Suit::Club),
        Card(5, Suit::Diamond),
        Card(6, Suit::Diamond),
        Card(7, Suit::Diamond),
        Card(8, Suit::Spade),
        Card(14, Suit::Spade),
        Card(13, Suit::Heart),
        Card(12, Suit::Spade),
        Card(8, Suit::Heart),
        Card(11, Suit::Heart),
        Card(8, Suit::Diamond),
        Card(10, Suit::Diamond),
    ]))
}

/// Three-handed: 11 to open and two calls, 10 on the flop called by the
/// other survivor while player 1 folds, then checked down. Pot 53.
fn split_pot(button: usize, odd_chip: OddChipRule) -> HandStateMachine {
    let service = broadway_board();
    let mut hand = HandStateMachine::start(
        Uuid::new_v4(),
        1,
        &seats(&[200, 200, 200]),
        button,
        service.generate_seed(),
        &service,
        HandConfig {
            odd_chip,
            ..config(false)
        },
    )
    .unwrap();

    let opener = hand.state().action_on.unwrap();
    hand.act(opener, Action::Bet(11)).unwrap();
    while hand.state().round == Round::Preflop {
        let player_id = hand.state().action_on.unwrap();
        hand.act(player_id, Action::Call).unwrap();
    }

    let opener = hand.state().action_on.unwrap();
    assert_ne!(opener, 1);
    hand.act(opener, Action::Bet(10)).unwrap();
    while hand.state().round == Round::Flop {
        let player_id = hand.state().action_on.unwrap();
        let action = if player_id == 1 { Action::Fold } else { Action::Call };
        hand.act(player_id, action).unwrap();
    }
    while let Some(player_id) = hand.state().action_on {
        hand.act(player_id, Action::Check).unwrap();
    }
    assert!(hand.is_complete());
    assert_eq!(hand.state().pot, 53);
    hand
}

#[test]
fn test_heads_up_bet_call_then_check_down() {
    let service = DeckService::default();
    let mut hand = HandStateMachine::start(
        Uuid::new_v4(),
        1,
        &seats(&[100, 100]),
        1,
        service.generate_seed(),
        &service,
        config(false),
    )
    .unwrap();

    // The button acts first heads-up.
    assert_eq!(hand.state().action_on, Some(2));
    hand.act(2, Action::Bet(10)).unwrap();
    hand.act(1, Action::Call).unwrap();
    assert_eq!(hand.state().round, Round::Flop);
    assert_eq!(hand.state().pot, 20);
    assert_eq!(hand.state().action_on, Some(1));

    for _ in 0..3 {
        hand.act(1, Action::Check).unwrap();
        hand.act(2, Action::Check).unwrap();
    }

    assert!(hand.is_complete());
    assert_eq!(hand.state().community_cards.len(), 5);
    let total: Chips = hand.final_stacks().iter().map(|(_, stack)| stack).sum();
    assert_eq!(total, 200);
}

#[test]
fn test_three_way_all_in_builds_side_pot() {
    let service = rigged_three_way();
    let mut hand = HandStateMachine::start(
        Uuid::new_v4(),
        1,
        &seats(&[50, 200, 200]),
        0,
        service.generate_seed(),
        &service,
        config(false),
    )
    .unwrap();

    // Three-handed the button acts first preflop.
    assert_eq!(hand.state().action_on, Some(1));
    hand.act(1, Action::AllIn).unwrap();
    hand.act(2, Action::Call).unwrap();
    hand.act(3, Action::Call).unwrap();
    assert_eq!(hand.state().round, Round::Flop);

    hand.act(2, Action::Bet(20)).unwrap();
    hand.act(3, Action::Call).unwrap();
    for _ in 0..2 {
        hand.act(2, Action::Check).unwrap();
        hand.act(3, Action::Check).unwrap();
    }
    assert!(hand.is_complete());

    let settlement = hand.settlement().unwrap();
    assert_eq!(settlement.pots.len(), 2);

    let main = &settlement.pots[0];
    assert_eq!(main.amount, 150);
    assert_eq!(main.eligible.iter().copied().collect::<BTreeSet<_>>(), BTreeSet::from([1, 2, 3]));
    assert_eq!(main.winners, vec![1]);

    let side = &settlement.pots[1];
    assert_eq!(side.amount, 40);
    assert_eq!(side.eligible.iter().copied().collect::<BTreeSet<_>>(), BTreeSet::from([2, 3]));
    assert_eq!(side.winners, vec![2]);
    assert_eq!(
        side.winning_rank.as_ref().map(|rank| rank.category),
        Some(HandCategory::OnePair)
    );

    assert_eq!(settlement.distribution.values().sum::<Chips>(), 190);
    assert_eq!(hand.final_stacks(), vec![(1, 150), (2, 170), (3, 130)]);
}

#[test]
fn test_completed_hand_replays() {
    let service = rigged_three_way();
    let mut hand = HandStateMachine::start(
        Uuid::new_v4(),
        9,
        &seats(&[300, 300, 300]),
        0,
        service.generate_seed(),
        &service,
        HandConfig {
            rake: RakePolicy {
                basis_points: 500,
                cap: Some(20),
                no_flop_no_drop: true,
            },
            ..config(true)
        },
    )
    .unwrap();

    hand.act(1, Action::Raise(30)).unwrap();
    hand.act(2, Action::Call).unwrap();
    hand.act(3, Action::Fold).unwrap();
    while let Some(player_id) = hand.state().action_on {
        hand.act(player_id, Action::Check).unwrap();
    }

    let record = hand.into_completed(chrono::Utc::now()).unwrap();
    assert!(record.went_to_showdown);
    assert_eq!(record.winners, vec![1]);
    assert_eq!(record.pot, 70);
    assert_eq!(record.rake, 3);
    assert_eq!(record.pot_distribution.get(&1), Some(&67));
    assert_eq!(record.contributions().values().sum::<Chips>(), record.pot);
    assert!(record.verify(&service).is_ok());

    let json = serde_json::to_string(&record).unwrap();
    let restored: holdem_engine::CompletedHand = serde_json::from_str(&json).unwrap();
    assert!(restored.verify(&service).is_ok());
}

#[test]
fn test_tampered_record_fails_verification() {
    let service = DeckService::default();
    let mut hand = HandStateMachine::start(
        Uuid::new_v4(),
        1,
        &seats(&[100, 100]),
        0,
        service.generate_seed(),
        &service,
        config(true),
    )
    .unwrap();
    hand.act(1, Action::Fold).unwrap();
    let record = hand.into_completed(chrono::Utc::now()).unwrap();
    assert!(record.verify(&service).is_ok());

    let mut reseeded = record.clone();
    reseeded.shuffle_seed = service.generate_seed();
    assert!(matches!(
        reseeded.verify(&service),
        Err(ReplayError::CommitmentMismatch)
    ));

    let mut skimmed = record.clone();
    if let Some(amount) = skimmed.pot_distribution.get_mut(&2) {
        *amount -= 1;
    }
    assert!(matches!(
        skimmed.verify(&service),
        Err(ReplayError::Diverged("pot distribution"))
    ));

    let mut rewritten = record;
    rewritten.all_actions.retain(|r| r.action != RecordedAction::Fold);
    assert!(rewritten.verify(&service).is_err());
}

#[test]
fn test_odd_chip_goes_clockwise_from_button() {
    let hand = split_pot(0, OddChipRule::ClockwiseFromButton);
    let settlement = hand.settlement().unwrap();
    assert_eq!(settlement.pots.len(), 1);
    assert_eq!(settlement.pots[0].winners.len(), 2);
    assert_eq!(
        settlement.pots[0].winning_rank.as_ref().map(|rank| rank.category),
        Some(HandCategory::Straight)
    );
    // Seat 1 is first after the button at seat 0.
    assert_eq!(settlement.distribution.get(&2), Some(&27));
    assert_eq!(settlement.distribution.get(&3), Some(&26));
    assert_eq!(settlement.distribution.get(&1), None);

    // With the button at seat 1, seat 2 is first.
    let hand = split_pot(1, OddChipRule::ClockwiseFromButton);
    let settlement = hand.settlement().unwrap();
    assert_eq!(settlement.distribution.get(&3), Some(&27));
    assert_eq!(settlement.distribution.get(&2), Some(&26));
}

#[test]
fn test_odd_chip_to_lowest_seat() {
    let hand = split_pot(1, OddChipRule::LowestSeat);
    let settlement = hand.settlement().unwrap();
    assert_eq!(settlement.distribution.get(&2), Some(&27));
    assert_eq!(settlement.distribution.get(&3), Some(&26));
    assert_eq!(hand.final_stacks(), vec![(1, 189), (2, 206), (3, 205)]);

    let record = hand.into_completed(chrono::Utc::now()).unwrap();
    assert!(record.verify(&broadway_board()).is_ok());
}

#[test]
fn test_departed_all_in_player_keeps_claim_on_pot() {
    let service = rigged_heads_up();
    let mut hand = HandStateMachine::start(
        Uuid::new_v4(),
        1,
        &seats(&[50, 200]),
        0,
        service.generate_seed(),
        &service,
        config(false),
    )
    .unwrap();

    assert_eq!(hand.state().action_on, Some(1));
    hand.act(1, Action::AllIn).unwrap();
    assert_eq!(hand.depart(1).unwrap(), 0);
    assert!(!hand.is_complete());
    assert!(!hand.state().player(1).unwrap().folded);

    hand.act(2, Action::Call).unwrap();
    assert!(hand.is_complete());
    assert_eq!(hand.state().community_cards.len(), 5);
    assert!(
        !hand
            .state()
            .betting_history
            .iter()
            .any(|r| r.action == RecordedAction::Forfeit)
    );

    let settlement = hand.settlement().unwrap();
    assert_eq!(settlement.winners(), vec![1]);
    assert_eq!(hand.final_stacks(), vec![(1, 100), (2, 150)]);

    let record = hand.into_completed(chrono::Utc::now()).unwrap();
    assert!(record.participants.iter().any(|p| p.player_id == 1 && p.departed));
    assert!(record.verify(&service).is_ok());
}

#[test]
fn test_departed_player_with_chips_behind_is_folded() {
    let service = rigged_heads_up();
    let mut hand = HandStateMachine::start(
        Uuid::new_v4(),
        1,
        &seats(&[50, 200, 200]),
        0,
        service.generate_seed(),
        &service,
        config(false),
    )
    .unwrap();

    hand.act(1, Action::AllIn).unwrap();
    hand.act(2, Action::Call).unwrap();
    // Player 2 leaves with 150 behind while player 3 still has to act.
    assert_eq!(hand.depart(2).unwrap(), 150);
    hand.act(3, Action::Call).unwrap();

    assert!(hand.is_complete());
    assert!(hand.state().player(2).unwrap().folded);
    assert!(!hand.settlement().unwrap().distribution.contains_key(&2));
    let total: Chips = hand.final_stacks().iter().map(|(_, stack)| stack).sum();
    assert_eq!(total, 450);
}
