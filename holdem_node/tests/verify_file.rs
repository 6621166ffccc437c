//! Verifying hand records written to disk.

use holdem_engine::{
    CompletedHand, DeckService,
    game::{HandConfig, HandStateMachine, SeatedPlayer, entities::Action},
};
use holdem_node::audit::verify_file;
use std::path::PathBuf;

fn record_hand() -> CompletedHand {
    let service = DeckService::default();
    let seats: Vec<SeatedPlayer> = (0..3)
        .map(|i| SeatedPlayer {
            player_id: i + 1,
            seat: i as usize,
            stack: 2_000,
        })
        .collect();
    let mut hand = HandStateMachine::start(
        uuid::Uuid::new_v4(),
        11,
        &seats,
        2,
        service.generate_seed(),
        &service,
        HandConfig::default(),
    )
    .unwrap();
    while let Some(player_id) = hand.state().action_on {
        let action = if hand.legal_actions(player_id).contains(&Action::Check) {
            Action::Check
        } else {
            Action::Call
        };
        hand.act(player_id, action).unwrap();
    }
    hand.into_completed(chrono::Utc::now()).unwrap()
}

fn write_temp(name: &str, contents: &str) -> PathBuf {
    let path = std::env::temp_dir().join(format!("{}-{}.json", name, uuid::Uuid::new_v4()));
    std::fs::write(&path, contents).unwrap();
    path
}

#[test]
fn test_verify_file_accepts_recorded_hand() {
    let hand = record_hand();
    let path = write_temp("hand", &serde_json::to_string_pretty(&hand).unwrap());

    let verified = verify_file(&path).unwrap();
    assert_eq!(verified.table_id, 11);
    assert_eq!(verified.pot, 300);
    assert_eq!(verified.actions, hand.all_actions.len());

    std::fs::remove_file(path).unwrap();
}

#[test]
fn test_verify_file_rejects_swapped_board() {
    let mut hand = record_hand();
    hand.community_cards.swap(0, 4);
    let path = write_temp("tampered", &serde_json::to_string(&hand).unwrap());

    assert!(verify_file(&path).is_err());

    std::fs::remove_file(path).unwrap();
}

#[test]
fn test_verify_file_reports_missing_file() {
    let err = verify_file(&PathBuf::from("/nonexistent/hand.json")).unwrap_err();
    assert!(err.to_string().contains("Failed to read"));
}
