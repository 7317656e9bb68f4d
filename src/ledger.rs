//! Loyalty records: find-or-create and redemption.
//!
//! Both operations are a single queued cycle on the loyalty
//! file, so the lookup, the default-record insert and the debit all see the
//! latest committed state and can't interleave with another writer.

use crate::catalog::RewardCatalog;
use crate::document::{Collection, Outcome};
use crate::error::{LoyaltyError, LoyaltyResult, Result};
use crate::model::{LoyaltyRecord, RecordTemplate, RedemptionEntry, Reward, RewardId, UserId};
use chrono::{DateTime, Utc};
use std::path::Path;
use tracing::{debug, info};

/// A committed redemption.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Redeemed {
    /// Whose points were spent.
    pub user_id: UserId,
    /// What they were spent on.
    pub reward_id: RewardId,
    /// Points debited.
    pub cost: u64,
    /// Balance after the debit.
    pub new_points: u64,
    /// Timestamp stored in the record's history.
    pub at: DateTime<Utc>,
}

/// The collection of [`LoyaltyRecord`]s, one per user.
#[derive(Debug, Clone)]
pub struct LoyaltyLedger {
    records: Collection<LoyaltyRecord>,
    template: RecordTemplate,
}

impl LoyaltyLedger {
    /// Ledger over `records`, creating missing users from `template`.
    pub fn new(records: Collection<LoyaltyRecord>, template: RecordTemplate) -> Self {
        Self { records, template }
    }

    /// Path to the loyalty file.
    #[must_use]
    pub fn path(&self) -> &Path {
        self.records.path()
    }

    /// Template used for first-time users.
    #[must_use]
    pub fn template(&self) -> &RecordTemplate {
        &self.template
    }

    /// The underlying collection.
    #[must_use]
    pub fn collection(&self) -> &Collection<LoyaltyRecord> {
        &self.records
    }

    /// Look up a record without creating it. Not queued, so it may miss a
    /// write that is in flight.
    pub fn record(&self, user_id: UserId) -> Result<Option<LoyaltyRecord>> {
        Ok(self
            .records
            .load()?
            .into_iter()
            .find(|r| r.user_id == user_id))
    }

    /// Return the record for `user_id`, creating and persisting a default one
    /// first if there is none. An existing record is returned without a write.
    pub fn ensure_record(&self, user_id: UserId) -> Result<LoyaltyRecord> {
        self.records.transact(|records| {
            let (idx, created) = find_or_create(records, user_id, &self.template);
            let record = records[idx].clone();
            Ok(if created {
                Outcome::Modified(record)
            } else {
                Outcome::Unchanged(record)
            })
        })
    }

    /// Spend `user_id`'s points on `reward_id`.
    ///
    /// The catalog is checked before the loyalty file is read. Fails with
    /// [`LoyaltyError::RewardNotFound`] if the catalog has no such reward and with [`LoyaltyError::InsufficientPoints`] if the balance
    /// doesn't cover it. Neither failure writes anything, not even the default
    /// record for a first-time user. On success the debit and the history
    /// entry land in one write.
    pub fn redeem(
        &self,
        catalog: &RewardCatalog,
        user_id: UserId,
        reward_id: RewardId,
    ) -> LoyaltyResult<Redeemed> {
        let lookup = || -> LoyaltyResult<Reward> {
            match catalog.find(reward_id)? {
                Some(r) => Ok(r),
                None => {
                    debug!(user_id, reward_id, "reward not found");
                    Err(LoyaltyError::RewardNotFound(reward_id))
                }
            }
        };
        self.records.transact_with(lookup, |reward, records| {
            let (idx, _) = find_or_create(records, user_id, &self.template);
            let record = &mut records[idx];
            if record.points < reward.cost {
                debug!(user_id, reward_id, points = record.points, cost = reward.cost, "not enough points");
                return Err(LoyaltyError::InsufficientPoints {
                    user_id,
                    available: record.points,
                    required: reward.cost,
                });
            }

            let at = Utc::now();
            record.points -= reward.cost;
            record.redeemed.push(RedemptionEntry { reward_id, at });
            info!(user_id, reward_id, new_points = record.points, "reward redeemed");

            Ok(Outcome::Modified(Redeemed {
                user_id,
                reward_id,
                cost: reward.cost,
                new_points: record.points,
                at,
            }))
        })
    }
}

/// Index of `user_id`'s record, appending one built from `template` if the
/// scan comes up empty. The flag is `true` when a record was appended.
pub fn find_or_create(
    records: &mut Vec<LoyaltyRecord>,
    user_id: UserId,
    template: &RecordTemplate,
) -> (usize, bool) {
    if let Some(idx) = records.iter().position(|r| r.user_id == user_id) {
        return (idx, false);
    }
    let record = template.build(user_id);
    debug!(user_id, member_id = %record.member_id, "creating loyalty record");
    records.push(record);
    (records.len() - 1, true)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn finds_existing_record() {
        let t = RecordTemplate::default();
        let mut records = vec![t.build(1), t.build(2)];
        assert_eq!(find_or_create(&mut records, 2, &t), (1, false));
        assert_eq!(records.len(), 2);
    }

    #[test]
    fn appends_missing_record() {
        let t = RecordTemplate::default();
        let mut records = vec![t.build(1)];
        assert_eq!(find_or_create(&mut records, 9, &t), (1, true));
        assert_eq!(records[1].user_id, 9);
        assert_eq!(records[1].member_id, "BL-2026-0009");
        assert_eq!(records[1].points, 1280);
    }
}
