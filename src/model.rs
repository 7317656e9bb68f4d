//! Records stored in the loyalty and reward collections.
//!
//! Field names on disk are camelCase. Ids are accepted as JSON numbers or
//! numeric strings and always written back as numbers.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};

/// Key of a [`LoyaltyRecord`].
pub type UserId = u64;

/// Key of a [`Reward`].
pub type RewardId = u64;

/// One customer's balance, tier and redemption history.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LoyaltyRecord {
    /// Unique within the collection.
    #[serde(deserialize_with = "lenient_id")]
    pub user_id: UserId,
    /// Current balance.
    pub points: u64,
    /// Current tier label.
    pub tier: String,
    /// Tier the customer is working towards.
    pub next_tier: String,
    /// Points still missing for `next_tier`.
    pub points_to_next_tier: i64,
    /// Points needed for `next_tier` in total.
    pub tier_goal: i64,
    /// Display name.
    pub customer_name: String,
    /// Card number, derived from `user_id` when the record is created.
    pub member_id: String,
    /// Redemption history, oldest first. Append-only.
    #[serde(default)]
    pub redeemed: Vec<RedemptionEntry>,
    /// Fields we don't model, kept as-is across rewrites.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// A single redemption in a record's history.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RedemptionEntry {
    /// Reward that was redeemed.
    #[serde(deserialize_with = "lenient_id")]
    pub reward_id: RewardId,
    /// When it was redeemed.
    pub at: DateTime<Utc>,
}

/// An entry in the reward catalog. Only `id` and `cost` mean anything here;
/// the rest (title, image, description...) passes through untouched.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Reward {
    /// Unique within the catalog.
    #[serde(deserialize_with = "lenient_id")]
    pub id: RewardId,
    /// Points needed to redeem.
    pub cost: u64,
    /// Everything else in the catalog entry.
    #[serde(flatten)]
    pub details: Map<String, Value>,
}

impl Reward {
    /// Reward with no descriptive fields.
    pub fn new(id: RewardId, cost: u64) -> Self {
        Self {
            id,
            cost,
            details: Map::new(),
        }
    }

    /// Attach a descriptive field.
    pub fn with_detail(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.details.insert(key.into(), value.into());
        self
    }
}

/// Starting values for records created on first access.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordTemplate {
    /// Opening balance.
    pub points: u64,
    /// Tier a new member starts in.
    pub tier: String,
    /// The tier after that.
    pub next_tier: String,
    /// Points still needed for `next_tier`.
    pub points_to_next_tier: i64,
    /// Points threshold of `next_tier`.
    pub tier_goal: i64,
    /// Display name shown on the dashboard.
    pub customer_name: String,
    /// `memberId` is this prefix followed by the user id, zero-padded to
    /// four digits.
    pub member_id_prefix: String,
}

impl Default for RecordTemplate {
    fn default() -> Self {
        Self {
            points: 1280,
            tier: "Gold".into(),
            next_tier: "Platinum".into(),
            points_to_next_tier: 720,
            tier_goal: 2000,
            customer_name: "Marina".into(),
            member_id_prefix: "BL-2026-".into(),
        }
    }
}

impl RecordTemplate {
    /// Same user id, same member id. Always.
    pub fn member_id(&self, user_id: UserId) -> String {
        format!("{}{user_id:04}", self.member_id_prefix)
    }

    /// Fresh record for `user_id` with an empty history.
    pub fn build(&self, user_id: UserId) -> LoyaltyRecord {
        LoyaltyRecord {
            user_id,
            points: self.points,
            tier: self.tier.clone(),
            next_tier: self.next_tier.clone(),
            points_to_next_tier: self.points_to_next_tier,
            tier_goal: self.tier_goal,
            customer_name: self.customer_name.clone(),
            member_id: self.member_id(user_id),
            redeemed: Vec::new(),
            extra: Map::new(),
        }
    }
}

fn lenient_id<'de, D>(deserializer: D) -> Result<u64, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum NumberOrString {
        Number(u64),
        String(String),
    }

    match NumberOrString::deserialize(deserializer)? {
        NumberOrString::Number(n) => Ok(n),
        NumberOrString::String(s) => s
            .trim()
            .parse()
            .map_err(|_| serde::de::Error::custom(format!("invalid id {s:?}"))),
    }
}
