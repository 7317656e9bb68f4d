//! Error types: storage failures and loyalty-domain outcomes.

use crate::model::{RewardId, UserId};

/// Things that can go wrong when reading or writing a collection.
#[non_exhaustive]
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Error {
    /// File system problem (read, write, rename, copy).
    Io(String),
    /// Failed to serialize the collection to bytes.
    Serialize(String),
    /// The file exists but is not a well-formed collection. Treated as data
    /// corruption: never replaced with an empty collection.
    Deserialize(String),
    /// Bad configuration (invalid path, clashing collections, etc.).
    Config(String),
}

impl std::fmt::Display for Error {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Error::Io(msg) => write!(f, "i/o error: {msg}"),
            Error::Serialize(msg) => write!(f, "serialization error: {msg}"),
            Error::Deserialize(msg) => write!(f, "deserialization error: {msg}"),
            Error::Config(msg) => write!(f, "config error: {msg}"),
        }
    }
}

impl std::error::Error for Error {}

impl From<std::io::Error> for Error {
    fn from(err: std::io::Error) -> Self {
        Error::Io(err.to_string())
    }
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        if err.is_io() {
            Error::Io(err.to_string())
        } else if err.is_syntax() || err.is_eof() || err.is_data() {
            Error::Deserialize(err.to_string())
        } else {
            Error::Serialize(err.to_string())
        }
    }
}

/// Result alias using our [`Error`] type.
pub type Result<T> = std::result::Result<T, Error>;

/// Outcomes of the loyalty operations that are not plain data.
///
/// `RewardNotFound` and `InsufficientPoints` are expected business results the
/// caller can act on. `Unauthorized` and `MissingParameter` come from input
/// validation at the service boundary. Everything else is a [`Error`] from
/// the storage layer.
#[non_exhaustive]
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LoyaltyError {
    /// No user id was supplied.
    Unauthorized,
    /// A required request parameter was missing or zero.
    MissingParameter(&'static str),
    /// The reward catalog has no entry with this id.
    RewardNotFound(RewardId),
    /// The user's balance does not cover the reward.
    InsufficientPoints {
        /// User whose balance was checked.
        user_id: UserId,
        /// Current balance.
        available: u64,
        /// Cost of the reward.
        required: u64,
    },
    /// Reading or writing a collection failed.
    Store(Error),
}

impl std::fmt::Display for LoyaltyError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            LoyaltyError::Unauthorized => write!(f, "unauthorized"),
            LoyaltyError::MissingParameter(name) => write!(f, "missing parameter: {name}"),
            LoyaltyError::RewardNotFound(id) => write!(f, "reward {id} not found"),
            LoyaltyError::InsufficientPoints {
                user_id,
                available,
                required,
            } => write!(
                f,
                "not enough points: user {user_id} has {available}, reward costs {required}"
            ),
            LoyaltyError::Store(err) => write!(f, "store error: {err}"),
        }
    }
}

impl std::error::Error for LoyaltyError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            LoyaltyError::Store(err) => Some(err),
            _ => None,
        }
    }
}

impl From<Error> for LoyaltyError {
    fn from(err: Error) -> Self {
        LoyaltyError::Store(err)
    }
}

/// Result alias for loyalty-domain operations.
pub type LoyaltyResult<T> = std::result::Result<T, LoyaltyError>;
