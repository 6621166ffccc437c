//! Offline verification of recorded hands.

use anyhow::{Context, Error};
use holdem_engine::{CompletedHand, DeckService};
use std::path::Path;

/// Summary of a hand that passed verification
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VerifiedHand {
    pub hand_id: String,
    pub table_id: i64,
    pub pot: u64,
    pub rake: u64,
    pub actions: usize,
    pub winners: Vec<i64>,
}

/// Parse a hand record and replay it from its shuffle seed.
///
/// # Errors
///
/// Fails when the JSON does not describe a hand or the replay disagrees
/// with the record.
pub fn verify_json(json: &str) -> Result<VerifiedHand, Error> {
    let hand: CompletedHand = serde_json::from_str(json).context("Not a completed hand record")?;
    hand.verify(&DeckService::default())
        .with_context(|| format!("Hand {} failed verification", hand.hand_id))?;
    Ok(VerifiedHand {
        hand_id: hand.hand_id.to_string(),
        table_id: hand.table_id,
        pot: hand.pot,
        rake: hand.rake,
        actions: hand.all_actions.len(),
        winners: hand.winners,
    })
}

/// Like [`verify_json`], reading the record from a file
pub fn verify_file(path: &Path) -> Result<VerifiedHand, Error> {
    let json = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read {}", path.display()))?;
    verify_json(&json)
}

#[cfg(test)]
mod tests {
    use super::*;
    use holdem_engine::game::{HandConfig, HandStateMachine, SeatedPlayer, entities::Action};

    fn recorded_hand() -> CompletedHand {
        let service = DeckService::default();
        let seats = [
            SeatedPlayer {
                player_id: 1,
                seat: 0,
                stack: 1_000,
            },
            SeatedPlayer {
                player_id: 2,
                seat: 1,
                stack: 1_000,
            },
        ];
        let mut hand = HandStateMachine::start(
            uuid::Uuid::new_v4(),
            3,
            &seats,
            0,
            service.generate_seed(),
            &service,
            HandConfig::default(),
        )
        .unwrap();
        hand.act(1, Action::Call).unwrap();
        while let Some(player_id) = hand.state().action_on {
            hand.act(player_id, Action::Check).unwrap();
        }
        hand.into_completed(chrono::Utc::now()).unwrap()
    }

    #[test]
    fn test_verify_recorded_hand() {
        let hand = recorded_hand();
        let json = serde_json::to_string_pretty(&hand).unwrap();
        let verified = verify_json(&json).unwrap();
        assert_eq!(verified.table_id, 3);
        assert_eq!(verified.pot, 200);
        assert_eq!(verified.hand_id, hand.hand_id.to_string());
    }

    #[test]
    fn test_verify_rejects_altered_payout() {
        let mut hand = recorded_hand();
        hand.rake += 1;
        let json = serde_json::to_string(&hand).unwrap();
        let err = verify_json(&json).unwrap_err();
        assert!(err.to_string().contains("failed verification"));
    }

    #[test]
    fn test_verify_rejects_garbage() {
        assert!(verify_json("{\"hand_id\": 4}").is_err());
    }
}
