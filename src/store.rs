//! The loyalty store: ledger + reward catalog, its builder, and the two
//! operations the transport layer calls.

use crate::catalog::RewardCatalog;
use crate::document::Collection;
use crate::error::{Error, LoyaltyError, LoyaltyResult, Result};
use crate::ledger::LoyaltyLedger;
use crate::model::{RecordTemplate, Reward, RewardId, UserId};
use crate::queue::WriteQueues;
use serde::Serialize;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::error;

/// Default file name of the loyalty collection inside the data directory.
pub const LOYALTY_FILE: &str = "loyalty.json";
/// Default file name of the reward catalog inside the data directory.
pub const REWARDS_FILE: &str = "rewards.json";

/// Loyalty ledger and reward catalog living side by side on disk.
///
/// Cheap to clone; clones share the same write queues. Authentication is the
/// caller's job: pass the id of an already-authenticated user, or `None`.
#[derive(Debug, Clone)]
pub struct LoyaltyStore {
    ledger: LoyaltyLedger,
    catalog: RewardCatalog,
}

/// What the dashboard shows a signed-in customer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Dashboard {
    /// Name to greet the customer with.
    pub customer_name: String,
    /// Membership number printed on the card.
    pub member_id: String,
    /// Current balance.
    pub points: u64,
    /// Current tier.
    pub tier: String,
    /// Tier being worked towards.
    pub next_tier: String,
    /// Points left until `next_tier`.
    pub points_to_next_tier: i64,
    /// Threshold of `next_tier`.
    pub tier_goal: i64,
    /// The whole reward catalog.
    pub rewards: Vec<Reward>,
}

/// Reply to a successful redemption.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RedeemReceipt {
    /// Always `"Redeemed"`.
    pub message: String,
    /// Balance after the debit.
    pub new_points: u64,
}

impl LoyaltyStore {
    /// Store with both files in `data_dir` and default settings.
    pub fn open(data_dir: impl AsRef<Path>) -> Result<Self> {
        Self::builder(data_dir).build()
    }

    /// Start configuring a store rooted at `data_dir`.
    pub fn builder(data_dir: impl AsRef<Path>) -> LoyaltyStoreBuilder {
        LoyaltyStoreBuilder::new(data_dir)
    }

    /// The loyalty records.
    #[must_use]
    pub fn ledger(&self) -> &LoyaltyLedger {
        &self.ledger
    }

    /// The reward catalog.
    #[must_use]
    pub fn catalog(&self) -> &RewardCatalog {
        &self.catalog
    }

    /// Everything the dashboard needs for `user_id`. First-time users get a
    /// default record created on the way.
    ///
    /// The catalog part is a plain read and may lag an in-flight catalog edit.
    pub fn dashboard(&self, user_id: Option<UserId>) -> LoyaltyResult<Dashboard> {
        let user_id = signed_in(user_id)?;
        let record = self
            .ledger
            .ensure_record(user_id)
            .map_err(|e| surfaced("dashboard", e.into()))?;
        let rewards = self
            .catalog
            .list()
            .map_err(|e| surfaced("dashboard", e.into()))?;

        Ok(Dashboard {
            customer_name: record.customer_name,
            member_id: record.member_id,
            points: record.points,
            tier: record.tier,
            next_tier: record.next_tier,
            points_to_next_tier: record.points_to_next_tier,
            tier_goal: record.tier_goal,
            rewards,
        })
    }

    /// Redeem `reward_id` for `user_id`.
    ///
    /// A missing user is [`LoyaltyError::Unauthorized`]; a missing or zero
    /// reward id is [`LoyaltyError::MissingParameter`]. The user is checked
    /// first.
    pub fn redeem_reward(
        &self,
        user_id: Option<UserId>,
        reward_id: Option<RewardId>,
    ) -> LoyaltyResult<RedeemReceipt> {
        let user_id = signed_in(user_id)?;
        let reward_id = match reward_id {
            Some(id) if id != 0 => id,
            _ => return Err(LoyaltyError::MissingParameter("rewardId")),
        };
        let redeemed = self
            .ledger
            .redeem(&self.catalog, user_id, reward_id)
            .map_err(|e| surfaced("redeem", e))?;

        Ok(RedeemReceipt {
            message: "Redeemed".into(),
            new_points: redeemed.new_points,
        })
    }
}

fn signed_in(user_id: Option<UserId>) -> LoyaltyResult<UserId> {
    match user_id {
        Some(id) if id != 0 => Ok(id),
        _ => Err(LoyaltyError::Unauthorized),
    }
}

/// Storage failures get logged here, once, on their way out. Business
/// outcomes pass through quietly.
fn surfaced(operation: &'static str, err: LoyaltyError) -> LoyaltyError {
    if let LoyaltyError::Store(inner) = &err {
        error!(operation, error = %inner, "loyalty store failure");
    }
    err
}

// ---------------------------------------------------------------------------
// Builder
// ---------------------------------------------------------------------------

/// Configures and opens a [`LoyaltyStore`].
///
/// ```rust,no_run
/// use loyalty_store::{LoyaltyStore, RecordTemplate};
///
/// let store = LoyaltyStore::builder("database")
///     .rewards_path("config/rewards.json")
///     .template(RecordTemplate { points: 0, ..RecordTemplate::default() })
///     .build()
///     .unwrap();
/// ```
#[derive(Debug)]
pub struct LoyaltyStoreBuilder {
    data_dir: PathBuf,
    loyalty_path: Option<PathBuf>,
    rewards_path: Option<PathBuf>,
    pretty: bool,
    template: RecordTemplate,
    queues: Option<Arc<WriteQueues>>,
}

impl LoyaltyStoreBuilder {
    fn new(data_dir: impl AsRef<Path>) -> Self {
        Self {
            data_dir: data_dir.as_ref().to_path_buf(),
            loyalty_path: None,
            rewards_path: None,
            pretty: true,
            template: RecordTemplate::default(),
            queues: None,
        }
    }

    /// Loyalty file location (default: `<data_dir>/loyalty.json`).
    pub fn loyalty_path(mut self, path: impl AsRef<Path>) -> Self {
        self.loyalty_path = Some(path.as_ref().to_path_buf());
        self
    }

    /// Reward catalog location (default: `<data_dir>/rewards.json`).
    pub fn rewards_path(mut self, path: impl AsRef<Path>) -> Self {
        self.rewards_path = Some(path.as_ref().to_path_buf());
        self
    }

    /// Indented JSON (default) or compact single-line JSON.
    pub fn pretty(mut self, yes: bool) -> Self {
        self.pretty = yes;
        self
    }

    /// Starting values for first-time users.
    pub fn template(mut self, template: RecordTemplate) -> Self {
        self.template = template;
        self
    }

    /// Queue writes on `queues` instead of the process-wide registry.
    pub fn queues(mut self, queues: Arc<WriteQueues>) -> Self {
        self.queues = Some(queues);
        self
    }

    /// Check the paths, create missing parent directories and return the
    /// store. Existing files are not read until first use.
    pub fn build(self) -> Result<LoyaltyStore> {
        let loyalty_path = self
            .loyalty_path
            .unwrap_or_else(|| self.data_dir.join(LOYALTY_FILE));
        let rewards_path = self
            .rewards_path
            .unwrap_or_else(|| self.data_dir.join(REWARDS_FILE));
        let queues = self.queues.unwrap_or_else(WriteQueues::process);
        let records = Collection::builder(&loyalty_path)
            .pretty(self.pretty)
            .queues(Arc::clone(&queues))
            .build()?;
        let rewards = Collection::<Reward>::builder(&rewards_path)
            .pretty(self.pretty)
            .queues(queues)
            .build()?;
        if records.path() == rewards.path() {
            return Err(Error::Config(format!(
                "loyalty records and rewards can't share {}",
                records.path().display()
            )));
        }

        for path in [records.path(), rewards.path()] {
            if let Some(dir) = path.parent() {
                std::fs::create_dir_all(dir)
                    .map_err(|e| Error::Io(format!("{}: {e}", dir.display())))?;
            }
        }

        Ok(LoyaltyStore {
            ledger: LoyaltyLedger::new(records, self.template),
            catalog: RewardCatalog::new(rewards),
        })
    }
}
