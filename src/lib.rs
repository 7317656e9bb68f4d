//! Crash-safe JSON collections with per-file write queues, and a loyalty
//! ledger built on them.
//!
//! Each collection is one JSON array on disk. Every mutation reads the file,
//! changes it, and writes the whole thing back through a temp file + rename,
//! inside the file's write queue so concurrent read-modify-write cycles line
//! up one after another instead of losing updates.
//!
//! ```rust,no_run
//! use loyalty_store::{LoyaltyStore, Reward};
//!
//! let store = LoyaltyStore::open("database").unwrap();
//! store.catalog().upsert(Reward::new(1, 500)).unwrap();
//! let receipt = store.redeem_reward(Some(42), Some(1)).unwrap();
//! assert_eq!(receipt.new_points, 780);
//! ```
//!
//! **Single-process only.** The queues serialize writers inside one process.
//! Two processes writing the same file will still clobber each other's
//! updates (each write stays atomic, but one of them is lost).

#![deny(missing_docs)]
#![warn(clippy::all)]

pub mod catalog;
pub mod document;
pub mod error;
pub mod ledger;
pub mod model;
pub mod persist;
pub mod queue;
pub mod serializer;
pub mod store;

pub use catalog::RewardCatalog;
pub use document::{Collection, CollectionBuilder, Outcome};
pub use error::{Error, LoyaltyError, LoyaltyResult, Result};
pub use ledger::{LoyaltyLedger, Redeemed};
pub use model::{LoyaltyRecord, RecordTemplate, RedemptionEntry, Reward, RewardId, UserId};
pub use queue::WriteQueues;
pub use store::{Dashboard, LoyaltyStore, LoyaltyStoreBuilder, RedeemReceipt};
