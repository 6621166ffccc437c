use serde::{Deserialize, Serialize};
use std::{
    collections::HashSet,
    fmt::{self},
    hash::{Hash, Hasher},
    mem::discriminant,
};
use uuid::Uuid;

/// Type alias for chip amounts. Stacks, bets and pots are whole chips and
/// can never go negative.
pub type Chips = u64;

/// Durable player identifier (the wallet owner).
pub type PlayerId = i64;

/// Table identifier.
pub type TableId = i64;

/// Identifier of a single dealt hand.
pub type HandId = Uuid;

/// Type alias for seat positions at a table.
pub type SeatIndex = usize;

#[derive(Clone, Copy, Debug, Deserialize, Eq, Hash, Ord, PartialEq, PartialOrd, Serialize)]
pub enum Suit {
    Club,
    Diamond,
    Heart,
    Spade,
}

impl Suit {
    pub const ALL: [Suit; 4] = [Suit::Club, Suit::Diamond, Suit::Heart, Suit::Spade];
}

impl fmt::Display for Suit {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let repr = match self {
            Self::Club => "♣",
            Self::Diamond => "♦",
            Self::Heart => "♥",
            Self::Spade => "♠",
        };
        write!(f, "{repr}")
    }
}

/// Placeholder for card values.
pub type Value = u8;

/// A card is a tuple of a value (deuce=2u8 ... ace=14u8) and a suit.
#[derive(Clone, Copy, Debug, Deserialize, Eq, Hash, Ord, PartialEq, PartialOrd, Serialize)]
pub struct Card(pub Value, pub Suit);

impl Card {
    pub const MIN_VALUE: Value = 2;
    pub const ACE: Value = 14;

    pub fn value(&self) -> Value {
        self.0
    }

    pub fn suit(&self) -> Suit {
        self.1
    }
}

impl fmt::Display for Card {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let value = match self.0 {
            14 => "A",
            13 => "K",
            12 => "Q",
            11 => "J",
            10 => "T",
            v => &v.to_string(),
        };
        write!(f, "{value}{}", self.1)
    }
}

/// The 52 distinct cards, ordered by suit and then by value.
pub fn standard_cards() -> Vec<Card> {
    Suit::ALL
        .iter()
        .flat_map(|&suit| (Card::MIN_VALUE..=Card::ACE).map(move |value| Card(value, suit)))
        .collect()
}

/// Hand lifecycle. The first four are betting rounds.
#[derive(Clone, Copy, Debug, Deserialize, Eq, Hash, Ord, PartialEq, PartialOrd, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Round {
    Preflop,
    Flop,
    Turn,
    River,
    Showdown,
    Complete,
}

impl Round {
    pub fn is_betting(self) -> bool {
        matches!(self, Self::Preflop | Self::Flop | Self::Turn | Self::River)
    }

    /// The betting round that follows this one, if any.
    pub fn next_street(self) -> Option<Round> {
        match self {
            Self::Preflop => Some(Self::Flop),
            Self::Flop => Some(Self::Turn),
            Self::Turn => Some(Self::River),
            Self::River | Self::Showdown | Self::Complete => None,
        }
    }

    /// Community cards revealed when entering this round.
    pub fn cards_revealed(self) -> usize {
        match self {
            Self::Flop => 3,
            Self::Turn | Self::River => 1,
            _ => 0,
        }
    }
}

impl fmt::Display for Round {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let repr = match self {
            Self::Preflop => "preflop",
            Self::Flop => "flop",
            Self::Turn => "turn",
            Self::River => "river",
            Self::Showdown => "showdown",
            Self::Complete => "complete",
        };
        write!(f, "{repr}")
    }
}

#[derive(Clone, Copy, Debug, Deserialize, Eq, PartialEq, Serialize)]
pub struct Blinds {
    pub small: Chips,
    pub big: Chips,
}

impl fmt::Display for Blinds {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}/{}", self.small, self.big)
    }
}

/// A player's decision. Amounts on `Bet` and `Raise` are the chips moved
/// from the player's stack by this action.
#[derive(Clone, Copy, Debug, Deserialize, Eq, PartialEq, Serialize)]
pub enum Action {
    AllIn,
    Bet(Chips),
    Call,
    Check,
    Fold,
    Raise(Chips),
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let repr = match self {
            Self::AllIn => "all-ins",
            Self::Bet(amount) => &format!("bets {amount}"),
            Self::Call => "calls",
            Self::Check => "checks",
            Self::Fold => "folds",
            Self::Raise(amount) => &format!("raises {amount}"),
        };
        write!(f, "{repr}")
    }
}

#[derive(Clone, Copy, Debug, Deserialize, Serialize)]
pub enum ActionChoice {
    AllIn(Chips),
    Bet { min: Chips, max: Chips },
    Call(Chips),
    Check,
    Fold,
    Raise { min: Chips, max: Chips },
}

impl ActionChoice {
    fn key(action: &Action) -> Self {
        match action {
            Action::AllIn => Self::AllIn(0),
            Action::Bet(_) => Self::Bet { min: 0, max: 0 },
            Action::Call => Self::Call(0),
            Action::Check => Self::Check,
            Action::Fold => Self::Fold,
            Action::Raise(_) => Self::Raise { min: 0, max: 0 },
        }
    }
}

impl fmt::Display for ActionChoice {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let repr = match self {
            Self::AllIn(amount) => format!("all-in ({amount})"),
            Self::Bet { min, max } => format!("bet ({min}..={max})"),
            Self::Call(amount) => format!("call ({amount})"),
            Self::Check => "check".to_string(),
            Self::Fold => "fold".to_string(),
            Self::Raise { min, max } => format!("raise ({min}..={max})"),
        };
        write!(f, "{repr}")
    }
}

// Choices compare by variant only so a submitted action can be looked up
// in the offered set regardless of amounts; the stored choice carries the
// actual limits.
impl Eq for ActionChoice {}

impl Hash for ActionChoice {
    fn hash<H: Hasher>(&self, state: &mut H) {
        discriminant(self).hash(state);
    }
}

impl PartialEq for ActionChoice {
    fn eq(&self, other: &Self) -> bool {
        discriminant(self) == discriminant(other)
    }
}

/// Set of actions offered to the player in turn.
#[derive(Clone, Debug, Default, Deserialize, PartialEq, Serialize)]
pub struct ActionChoices(pub HashSet<ActionChoice>);

impl ActionChoices {
    pub fn contains(&self, action: &Action) -> bool {
        self.0.contains(&ActionChoice::key(action))
    }

    /// The offered choice matching the action's variant, with its limits.
    pub fn get(&self, action: &Action) -> Option<ActionChoice> {
        self.0.get(&ActionChoice::key(action)).copied()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Display for ActionChoices {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut reprs: Vec<String> = self.0.iter().map(ToString::to_string).collect();
        reprs.sort();
        write!(f, "{}", reprs.join(", "))
    }
}

impl<I> From<I> for ActionChoices
where
    I: IntoIterator<Item = ActionChoice>,
{
    fn from(iter: I) -> Self {
        Self(iter.into_iter().collect::<HashSet<_>>())
    }
}

/// What an entry in the betting history records.
#[derive(Clone, Copy, Debug, Deserialize, Eq, PartialEq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RecordedAction {
    SmallBlind,
    BigBlind,
    Fold,
    Check,
    Call,
    Bet,
    Raise,
    AllIn,
    /// Fold applied on behalf of a player who left the table.
    Forfeit,
    /// Player left the table mid-hand, taking their uncommitted chips.
    Departure,
}

impl RecordedAction {
    pub fn is_blind(self) -> bool {
        matches!(self, Self::SmallBlind | Self::BigBlind)
    }

    /// Entries the hand produces on its own rather than from a request.
    pub fn is_automatic(self) -> bool {
        matches!(self, Self::SmallBlind | Self::BigBlind | Self::Forfeit)
    }
}

/// One append-only entry of a hand's betting history. `amount` is the
/// number of chips the entry moved: into the pot, or back to the player
/// for a departure.
#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
pub struct BettingRecord {
    pub player_id: PlayerId,
    pub round: Round,
    pub action: RecordedAction,
    pub amount: Chips,
}

impl fmt::Display for BettingRecord {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(
            f,
            "[{}] player {} {:?} {}",
            self.round, self.player_id, self.action, self.amount
        )
    }
}
