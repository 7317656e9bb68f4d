//! The reward catalog: read-mostly, edited by admins.

use crate::document::{Collection, Outcome};
use crate::error::Result;
use crate::model::{Reward, RewardId};
use std::path::Path;
use tracing::debug;

/// Rewards that points can be spent on.
///
/// Edits go through the catalog file's own queue. Redemptions run on the
/// loyalty file's queue and read the catalog without joining its queue, so a
/// cost change racing a redemption may or may not be seen by it.
#[derive(Debug, Clone)]
pub struct RewardCatalog {
    rewards: Collection<Reward>,
}

impl RewardCatalog {
    /// Wrap an existing collection.
    pub fn new(rewards: Collection<Reward>) -> Self {
        Self { rewards }
    }

    /// Path to the catalog file.
    #[must_use]
    pub fn path(&self) -> &Path {
        self.rewards.path()
    }

    /// Every reward, in file order.
    pub fn list(&self) -> Result<Vec<Reward>> {
        self.rewards.load()
    }

    /// The reward with `id`, if any. Linear scan.
    pub fn find(&self, id: RewardId) -> Result<Option<Reward>> {
        Ok(self.rewards.load()?.into_iter().find(|r| r.id == id))
    }

    /// Insert `reward`, or replace the entry with the same id in place.
    /// Returns the replaced entry.
    pub fn upsert(&self, reward: Reward) -> Result<Option<Reward>> {
        self.rewards.transact(|rewards| {
            let prev = match rewards.iter_mut().find(|r| r.id == reward.id) {
                Some(slot) => Some(std::mem::replace(slot, reward)),
                None => {
                    rewards.push(reward);
                    None
                }
            };
            Ok(Outcome::Modified(prev))
        })
    }

    /// Drop the reward with `id`. Returns it if it was there.
    pub fn remove(&self, id: RewardId) -> Result<Option<Reward>> {
        self.rewards.transact(|rewards| {
            match rewards.iter().position(|r| r.id == id) {
                Some(idx) => {
                    debug!(reward_id = id, "reward removed");
                    Ok(Outcome::Modified(Some(rewards.remove(idx))))
                }
                None => Ok(Outcome::Unchanged(None)),
            }
        })
    }
}
