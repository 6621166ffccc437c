//! Deterministic deck production.
//!
//! A hand's deck is a pure function of its [`ShuffleSeed`] and the
//! [`RandomnessProvider`] that shuffled it, so any recorded hand can be
//! re-dealt for audit.

use enum_dispatch::enum_dispatch;
use rand::{SeedableRng, seq::SliceRandom};
use rand_chacha::ChaCha20Rng;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::fmt;
use thiserror::Error;

use super::entities::{Card, standard_cards};

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum DeckError {
    #[error("invalid shuffle seed: {0}")]
    InvalidSeed(String),
    #[error("deck exhausted")]
    Exhausted,
}

/// 32 bytes of shuffle entropy, written as 64 lowercase hex characters.
#[derive(Clone, Debug, Deserialize, Eq, Hash, PartialEq, Serialize)]
#[serde(try_from = "String", into = "String")]
pub struct ShuffleSeed {
    bytes: [u8; ShuffleSeed::LEN],
}

impl ShuffleSeed {
    pub const LEN: usize = 32;

    pub fn from_bytes(bytes: [u8; Self::LEN]) -> Self {
        Self { bytes }
    }

    pub fn parse(seed: &str) -> Result<Self, DeckError> {
        let seed = seed.trim();
        if seed.is_empty() {
            return Err(DeckError::InvalidSeed("seed is empty".to_string()));
        }
        let decoded = hex::decode(seed)
            .map_err(|e| DeckError::InvalidSeed(format!("not hex: {e}")))?;
        let bytes: [u8; Self::LEN] = decoded.try_into().map_err(|v: Vec<u8>| {
            DeckError::InvalidSeed(format!("expected {} bytes, got {}", Self::LEN, v.len()))
        })?;
        Ok(Self { bytes })
    }

    pub fn as_bytes(&self) -> &[u8; Self::LEN] {
        &self.bytes
    }

    pub fn to_hex(&self) -> String {
        hex::encode(self.bytes)
    }
}

impl fmt::Display for ShuffleSeed {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_hex())
    }
}

impl TryFrom<String> for ShuffleSeed {
    type Error = DeckError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<ShuffleSeed> for String {
    fn from(value: ShuffleSeed) -> Self {
        value.to_hex()
    }
}

/// Source of shuffle entropy and the algorithm that turns a seed into a
/// card order.
#[enum_dispatch]
pub trait RandomnessProvider {
    /// A fresh seed for the next hand.
    fn generate_seed(&self) -> ShuffleSeed;

    /// Reorder `cards` as a pure function of `seed`.
    fn shuffle_cards(&self, cards: &mut [Card], seed: &ShuffleSeed);

    /// Name recorded with every hand so audits can pick the same algorithm.
    fn algorithm(&self) -> &'static str;
}

/// ChaCha20 keyed by the seed bytes, driving a Fisher-Yates shuffle.
#[derive(Clone, Debug, Default)]
pub struct ChaChaRandomness;

impl RandomnessProvider for ChaChaRandomness {
    fn generate_seed(&self) -> ShuffleSeed {
        ShuffleSeed::from_bytes(rand::random())
    }

    fn shuffle_cards(&self, cards: &mut [Card], seed: &ShuffleSeed) {
        let mut rng = ChaCha20Rng::from_seed(*seed.as_bytes());
        cards.shuffle(&mut rng);
    }

    fn algorithm(&self) -> &'static str {
        "chacha20"
    }
}

/// Puts a preset sequence on top of the deck, the remaining cards following
/// in their standard order. Used for scripted tables.
#[derive(Clone, Debug, Default)]
pub struct StackedRandomness {
    top: Vec<Card>,
}

impl StackedRandomness {
    pub fn new(top: Vec<Card>) -> Self {
        Self { top }
    }
}

impl RandomnessProvider for StackedRandomness {
    fn generate_seed(&self) -> ShuffleSeed {
        ShuffleSeed::from_bytes([0; ShuffleSeed::LEN])
    }

    fn shuffle_cards(&self, cards: &mut [Card], _seed: &ShuffleSeed) {
        let mut ordered: Vec<Card> = self
            .top
            .iter()
            .filter(|card| cards.contains(card))
            .copied()
            .collect();
        ordered.extend(cards.iter().filter(|card| !self.top.contains(card)));
        cards.copy_from_slice(&ordered);
    }

    fn algorithm(&self) -> &'static str {
        "stacked"
    }
}

#[enum_dispatch(RandomnessProvider)]
#[derive(Clone, Debug)]
pub enum Randomness {
    ChaChaRandomness,
    StackedRandomness,
}

impl Default for Randomness {
    fn default() -> Self {
        ChaChaRandomness.into()
    }
}

/// The cards of one hand in dealing order.
#[derive(Clone, Debug)]
pub struct Deck {
    cards: Vec<Card>,
    position: usize,
}

impl Deck {
    pub fn new(cards: Vec<Card>) -> Self {
        Self { cards, position: 0 }
    }

    pub fn deal_card(&mut self) -> Result<Card, DeckError> {
        let card = *self.cards.get(self.position).ok_or(DeckError::Exhausted)?;
        self.position += 1;
        Ok(card)
    }

    pub fn burn_card(&mut self) -> Result<(), DeckError> {
        self.deal_card().map(|_| ())
    }

    pub fn remaining(&self) -> usize {
        self.cards.len() - self.position
    }

    /// The full order, including cards already dealt.
    pub fn cards(&self) -> &[Card] {
        &self.cards
    }
}

/// Shuffles decks for every table. Holds no per-hand state.
#[derive(Clone, Debug, Default)]
pub struct DeckService {
    randomness: Randomness,
}

impl DeckService {
    pub fn new(randomness: impl Into<Randomness>) -> Self {
        Self {
            randomness: randomness.into(),
        }
    }

    pub fn generate_seed(&self) -> ShuffleSeed {
        self.randomness.generate_seed()
    }

    /// Returns the 52-card order for `seed`.
    ///
    /// # Errors
    ///
    /// * `DeckError::InvalidSeed` - Seed is empty, not hex or not 32 bytes
    pub fn shuffle(&self, seed: &str) -> Result<Vec<Card>, DeckError> {
        let seed = ShuffleSeed::parse(seed)?;
        Ok(self.shuffled_deck(&seed).cards)
    }

    pub fn shuffled_deck(&self, seed: &ShuffleSeed) -> Deck {
        let mut cards = standard_cards();
        self.randomness.shuffle_cards(&mut cards, seed);
        Deck::new(cards)
    }

    pub fn algorithm(&self) -> &'static str {
        self.randomness.algorithm()
    }
}

/// Hex SHA-256 digest of a deck order.
pub fn deck_commitment(cards: &[Card]) -> String {
    let mut hasher = Sha256::new();
    for card in cards {
        hasher.update([card.value(), card.suit() as u8]);
    }
    hex::encode(hasher.finalize())
}
