//! No-limit betting rules as pure functions over [`HandState`].
//!
//! Nothing here mutates its input: an accepted action yields a new state and
//! a rejected one leaves the caller's state untouched.

use super::{
    entities::{Action, ActionChoice, ActionChoices, BettingRecord, Chips, PlayerId, RecordedAction},
    errors::{HandResult, IllegalReason},
    hand::{HandPlayer, HandState},
};

/// Chips the player must add to match the current street's highest commitment.
pub fn amount_to_call(state: &HandState, player: &HandPlayer) -> Chips {
    state
        .highest_street_commitment()
        .saturating_sub(player.street_committed)
}

/// The actions available to `player_id`. Empty unless it is their turn.
pub fn legal_actions(state: &HandState, player_id: PlayerId) -> ActionChoices {
    if !state.round.is_betting() || state.action_on != Some(player_id) {
        return ActionChoices::default();
    }
    let Some(player) = state.player(player_id) else {
        return ActionChoices::default();
    };

    let highest = state.highest_street_commitment();
    let to_call = amount_to_call(state, player);
    let mut choices = vec![ActionChoice::Fold];

    if to_call == 0 {
        choices.push(ActionChoice::Check);
    } else if player.stack > to_call {
        choices.push(ActionChoice::Call(to_call));
    }

    if player.stack <= to_call {
        // Calling for everything behind.
        choices.push(ActionChoice::AllIn(player.stack));
    } else if !state.acted.contains(&player_id) {
        // Betting is open to this player: either nobody has acted since the
        // last full raise, or this is their first decision on the street.
        if highest == 0 {
            let min = state.config.blinds.big.max(1);
            if player.stack > min {
                choices.push(ActionChoice::Bet {
                    min,
                    max: player.stack,
                });
            }
        } else {
            let min = to_call.saturating_add(state.min_raise);
            if player.stack > min {
                choices.push(ActionChoice::Raise {
                    min,
                    max: player.stack,
                });
            }
        }
        choices.push(ActionChoice::AllIn(player.stack));
    }

    choices.into()
}

fn needs_to_act(state: &HandState, player: &HandPlayer, highest: Chips, able: usize) -> bool {
    player.can_act()
        && (player.street_committed < highest
            || (able > 1 && !state.acted.contains(&player.player_id)))
}

/// Whether the current betting round is over: every contender has matched
/// the highest commitment or is all-in, and everyone able to act has done so
/// since the last full bet or raise.
pub fn round_complete(state: &HandState) -> bool {
    if !state.round.is_betting() {
        return false;
    }
    if state.contender_count() <= 1 {
        return true;
    }
    let highest = state.highest_street_commitment();
    let able = state.able_count();
    !state
        .players
        .iter()
        .any(|p| needs_to_act(state, p, highest, able))
}

/// First player, scanning clockwise from `start` inclusive, who still owes a
/// decision on this street.
pub(crate) fn next_to_act_from(state: &HandState, start: usize) -> Option<PlayerId> {
    if !state.round.is_betting() || state.contender_count() <= 1 || state.players.is_empty() {
        return None;
    }
    let highest = state.highest_street_commitment();
    let able = state.able_count();
    let count = state.players.len();
    (0..count)
        .map(|offset| &state.players[(start + offset) % count])
        .find(|p| needs_to_act(state, p, highest, able))
        .map(|p| p.player_id)
}

/// Validates `action` for `player_id` and returns the resulting state.
///
/// # Errors
///
/// * `HandError::IllegalAction` - Not the player's turn, action not offered,
///   amount above the stack or below the minimum
pub fn apply_action(state: &HandState, player_id: PlayerId, action: Action) -> HandResult<HandState> {
    if !state.round.is_betting() {
        return Err(IllegalReason::RoundClosed(state.round).into());
    }
    let index = state
        .index_of(player_id)
        .ok_or(IllegalReason::NotInHand(player_id))?;
    if state.action_on != Some(player_id) {
        return Err(IllegalReason::OutOfTurn(player_id).into());
    }

    let player = &state.players[index];
    let choice = legal_actions(state, player_id)
        .get(&action)
        .ok_or_else(|| IllegalReason::NotOffered(action.to_string()))?;

    let (moved, recorded) = match (action, choice) {
        (Action::Fold, _) => (0, RecordedAction::Fold),
        (Action::Check, _) => (0, RecordedAction::Check),
        (Action::Call, ActionChoice::Call(amount)) => (amount, RecordedAction::Call),
        (Action::AllIn, ActionChoice::AllIn(amount)) => (amount, RecordedAction::AllIn),
        (Action::Bet(amount), ActionChoice::Bet { min, max })
        | (Action::Raise(amount), ActionChoice::Raise { min, max }) => {
            if amount > max {
                return Err(IllegalReason::AmountExceedsStack {
                    amount,
                    stack: player.stack,
                }
                .into());
            }
            if amount == max {
                (amount, RecordedAction::AllIn)
            } else if amount < min {
                return Err(IllegalReason::BelowMinimum {
                    amount,
                    minimum: min,
                }
                .into());
            } else if matches!(action, Action::Bet(_)) {
                (amount, RecordedAction::Bet)
            } else {
                (amount, RecordedAction::Raise)
            }
        }
        _ => return Err(IllegalReason::NotOffered(action.to_string()).into()),
    };

    let highest_before = state.highest_street_commitment();
    let mut next = state.clone();
    next.commit(index, moved)?;
    if recorded == RecordedAction::Fold {
        next.players[index].folded = true;
    }

    let street_total = next.players[index].street_committed;
    if street_total > highest_before {
        let increment = street_total - highest_before;
        next.last_aggressor = Some(player_id);
        if increment >= state.min_raise {
            // A full bet or raise reopens the betting for everyone else.
            next.min_raise = increment;
            next.acted.clear();
        }
    }
    next.acted.insert(player_id);
    next.betting_history.push(BettingRecord {
        player_id,
        round: state.round,
        action: recorded,
        amount: moved,
    });
    next.action_on = next_to_act_from(&next, index + 1);
    Ok(next)
}

/// Folds `player_id` out of turn on behalf of a player who left. Records a
/// `Forfeit` entry. Folded players are left as they are.
pub fn forfeit(state: &HandState, player_id: PlayerId) -> HandResult<HandState> {
    let index = state
        .index_of(player_id)
        .ok_or(IllegalReason::NotInHand(player_id))?;
    let mut next = state.clone();
    if next.players[index].folded {
        return Ok(next);
    }
    next.players[index].folded = true;
    next.players[index].all_in = false;
    next.betting_history.push(BettingRecord {
        player_id,
        round: state.round,
        action: RecordedAction::Forfeit,
        amount: 0,
    });
    next.action_on = match state.action_on.and_then(|actor| state.index_of(actor)) {
        Some(actor_index) => next_to_act_from(&next, actor_index),
        None => None,
    };
    Ok(next)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::game::{
        deck::ShuffleSeed,
        entities::{Blinds, Round},
        errors::HandError,
        hand::{HandConfig, HandPlayer},
    };
    use std::collections::BTreeSet;
    use uuid::Uuid;

    fn state(stacks: &[u64]) -> HandState {
        let players = stacks
            .iter()
            .enumerate()
            .map(|(i, &stack)| HandPlayer::new(i as i64 + 1, i, stack))
            .collect();
        HandState {
            hand_id: Uuid::new_v4(),
            table_id: 1,
            config: HandConfig {
                blinds: Blinds { small: 5, big: 10 },
                post_blinds: false,
                ..HandConfig::default()
            },
            button: 0,
            players,
            community_cards: vec![],
            pot: 0,
            round: Round::Flop,
            action_on: Some(2),
            last_aggressor: None,
            min_raise: 10,
            acted: BTreeSet::new(),
            betting_history: vec![],
            shuffle_seed: ShuffleSeed::from_bytes([7; 32]),
            deck_commitment: String::new(),
        }
    }

    fn illegal(result: HandResult<HandState>) -> IllegalReason {
        match result {
            Err(HandError::IllegalAction(reason)) => reason,
            other => panic!("expected illegal action, got {other:?}"),
        }
    }

    #[test]
    fn test_unopened_street_choices() {
        let s = state(&[100, 100, 100]);
        let choices = legal_actions(&s, 2);
        assert!(choices.contains(&Action::Check));
        assert!(choices.contains(&Action::Bet(0)));
        assert!(choices.contains(&Action::AllIn));
        assert!(!choices.contains(&Action::Call));
        assert!(!choices.contains(&Action::Raise(0)));
        assert!(legal_actions(&s, 1).is_empty());
    }

    #[test]
    fn test_out_of_turn_rejected() {
        let s = state(&[100, 100, 100]);
        assert_eq!(illegal(apply_action(&s, 3, Action::Check)), IllegalReason::OutOfTurn(3));
        assert_eq!(illegal(apply_action(&s, 9, Action::Check)), IllegalReason::NotInHand(9));
    }

    #[test]
    fn test_bet_limits() {
        let s = state(&[100, 100, 100]);
        assert_eq!(
            illegal(apply_action(&s, 2, Action::Bet(5))),
            IllegalReason::BelowMinimum { amount: 5, minimum: 10 }
        );
        assert_eq!(
            illegal(apply_action(&s, 2, Action::Bet(150))),
            IllegalReason::AmountExceedsStack { amount: 150, stack: 100 }
        );
        assert!(matches!(
            illegal(apply_action(&s, 2, Action::Call)),
            IllegalReason::NotOffered(_)
        ));
    }

    #[test]
    fn test_bet_then_raise_minimum() {
        let s = state(&[100, 100, 100]);
        let s = apply_action(&s, 2, Action::Bet(20)).unwrap();
        assert_eq!(s.action_on, Some(3));
        assert_eq!(s.pot, 20);
        assert_eq!(s.min_raise, 20);
        match legal_actions(&s, 3).get(&Action::Raise(0)) {
            Some(ActionChoice::Raise { min, max }) => assert_eq!((min, max), (40, 100)),
            other => panic!("unexpected {other:?}"),
        }
        assert_eq!(
            illegal(apply_action(&s, 3, Action::Raise(30))),
            IllegalReason::BelowMinimum { amount: 30, minimum: 40 }
        );
    }

    #[test]
    fn test_bet_of_whole_stack_is_all_in() {
        let s = state(&[100, 100, 100]);
        let s = apply_action(&s, 2, Action::Bet(100)).unwrap();
        let p = s.player(2).unwrap();
        assert!(p.all_in);
        assert_eq!(s.betting_history[0].action, RecordedAction::AllIn);
    }

    #[test]
    fn test_round_completes_when_action_returns() {
        let s = state(&[100, 100, 100]);
        let s = apply_action(&s, 2, Action::Check).unwrap();
        let s = apply_action(&s, 3, Action::Bet(10)).unwrap();
        assert!(!round_complete(&s));
        assert_eq!(s.action_on, Some(1));
        let s = apply_action(&s, 1, Action::Call).unwrap();
        assert_eq!(s.action_on, Some(2));
        let s = apply_action(&s, 2, Action::Call).unwrap();
        assert!(round_complete(&s));
        assert_eq!(s.action_on, None);
        assert_eq!(s.pot, 30);
        s.check_invariants().unwrap();
    }

    #[test]
    fn test_short_all_in_does_not_reopen_raising() {
        let s = state(&[100, 100, 25]);
        let s = apply_action(&s, 2, Action::Bet(20)).unwrap();
        // Player 3 shoves 25: a raise of 5, short of the 20 minimum.
        let s = apply_action(&s, 3, Action::AllIn).unwrap();
        assert_eq!(s.min_raise, 20);
        let s = apply_action(&s, 1, Action::Call).unwrap();
        assert_eq!(s.action_on, Some(2));
        let choices = legal_actions(&s, 2);
        assert!(choices.contains(&Action::Call));
        assert!(!choices.contains(&Action::Raise(0)));
        assert!(!choices.contains(&Action::AllIn));
    }

    #[test]
    fn test_fold_always_offered_and_rejection_leaves_state() {
        let s = state(&[100, 100]);
        let before = s.clone();
        let _ = apply_action(&s, 2, Action::Raise(10));
        assert_eq!(s, before);
        let s = apply_action(&s, 2, Action::Fold).unwrap();
        assert!(round_complete(&s));
        assert_eq!(s.folded(), BTreeSet::from([2]));
    }

    #[test]
    fn test_forfeit_moves_action_on() {
        let s = state(&[100, 100, 100]);
        let s = forfeit(&s, 2).unwrap();
        assert_eq!(s.action_on, Some(3));
        assert_eq!(s.betting_history[0].action, RecordedAction::Forfeit);
        let again = forfeit(&s, 2).unwrap();
        assert_eq!(again.betting_history.len(), 1);
    }
}
