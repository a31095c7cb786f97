use std::collections::BTreeMap;
use std::fmt;

use alloy::primitives::U256;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Image shown when a market has no metadata image
pub const DEFAULT_IMAGE: &str = "/bitcoin-concept.png";

/// Image for markets seeded with the placeholder test cId
pub const TEST_IMAGE: &str = "/super-bowl-atmosphere.png";

const TEST_IMAGE_MARKER: &str = "TestImageCid";

/// Market as stored on chain, decoded from the `markets(id)` getter
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MarketRecord {
    pub exists: bool,

    /// LMSR liquidity parameter `b`, in payment-token units
    pub liquidity: U256,

    /// Outstanding YES shares
    pub q_yes: U256,

    /// Outstanding NO shares
    pub q_no: U256,

    /// Unix seconds
    pub start_time: u64,

    /// Unix seconds
    pub end_time: u64,

    pub resolved: bool,
    pub yes_won: bool,
    pub question: String,

    /// Content identifier of the off-chain metadata document
    pub cid: String,
}

/// Off-chain market description stored in the content-addressed store
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MarketMetadata {
    #[serde(default)]
    pub question: String,

    #[serde(default)]
    pub description: String,

    /// Image URL or `ipfs://` reference
    #[serde(default)]
    pub image: String,

    #[serde(default)]
    pub image_source: String,

    #[serde(default)]
    pub category: String,

    #[serde(default)]
    pub resolution_source: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Outcome {
    Yes,
    No,
}

impl Outcome {
    pub fn as_str(&self) -> &'static str {
        match self {
            Outcome::Yes => "YES",
            Outcome::No => "NO",
        }
    }
}

/// YES/NO probabilities in whole percent. Always sums to 100.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Probabilities {
    yes: u8,
    no: u8,
}

impl Probabilities {
    /// Used when the price read is unavailable
    pub fn even() -> Self {
        Self { yes: 50, no: 50 }
    }

    /// Derive from an 18-decimal fixed-point YES price in `[0, 1]`.
    /// Rounds half up to whole percent; prices above 1 clamp to 100.
    pub fn from_price(price: U256) -> Self {
        let scale = U256::from(10u64).pow(U256::from(18u64));
        let half = scale / U256::from(2u64);

        let percent = price
            .saturating_mul(U256::from(100u64))
            .saturating_add(half)
            / scale;
        let yes = u8::try_from(percent.min(U256::from(100u64))).unwrap_or(100);

        Self { yes, no: 100 - yes }
    }

    pub fn yes(&self) -> u8 {
        self.yes
    }

    pub fn no(&self) -> u8 {
        self.no
    }

    pub fn for_outcome(&self, outcome: Outcome) -> u8 {
        match outcome {
            Outcome::Yes => self.yes,
            Outcome::No => self.no,
        }
    }
}

/// Which claim-winnings paths are open for a market
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ClaimAffordance {
    pub yes: bool,
    pub no: bool,
}

impl ClaimAffordance {
    pub fn for_market(resolved: bool, yes_won: bool) -> Self {
        if !resolved {
            return Self {
                yes: false,
                no: false,
            };
        }
        Self {
            yes: yes_won,
            no: !yes_won,
        }
    }

    pub fn allows(&self, outcome: Outcome) -> bool {
        match outcome {
            Outcome::Yes => self.yes,
            Outcome::No => self.no,
        }
    }

    pub fn any(&self) -> bool {
        self.yes || self.no
    }
}

/// Countdown to a market's end
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct TimeLeft {
    pub days: i64,
    pub hours: i64,
    pub minutes: i64,
    pub seconds: i64,
}

impl TimeLeft {
    /// `None` once `end` has passed
    pub fn until(end: DateTime<Utc>, now: DateTime<Utc>) -> Option<Self> {
        let total = (end - now).num_seconds();
        if total <= 0 {
            return None;
        }

        Some(Self {
            days: total / 86_400,
            hours: (total % 86_400) / 3_600,
            minutes: (total % 3_600) / 60,
            seconds: total % 60,
        })
    }
}

impl fmt::Display for TimeLeft {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.days > 0 {
            write!(f, "{}d {}h left", self.days, self.hours)
        } else if self.hours > 0 {
            write!(f, "{}h {}m left", self.hours, self.minutes)
        } else {
            write!(f, "{}m {}s left", self.minutes, self.seconds)
        }
    }
}

/// Display-ready market assembled from fresh reads
#[derive(Debug, Clone, Serialize)]
pub struct Market {
    /// Contract-assigned id, starting at 1
    pub id: u64,
    pub title: String,
    pub image: String,
    pub probabilities: Probabilities,
    pub tag: String,
    pub description: String,
    pub resolution_source: String,
    pub start_time: Option<DateTime<Utc>>,
    pub end_time: Option<DateTime<Utc>>,
    pub resolved: bool,
    pub yes_won: bool,
}

impl Market {
    /// Combine the on-chain record with the price and metadata reads.
    /// Missing reads fall back to 50/50 and the default image.
    pub fn assemble(
        id: u64,
        record: &MarketRecord,
        price: Option<U256>,
        metadata: Option<&MarketMetadata>,
        resolve_image: impl Fn(&str) -> String,
    ) -> Self {
        let probabilities = price
            .map(Probabilities::from_price)
            .unwrap_or_else(Probabilities::even);

        let image = match metadata {
            Some(m) if !m.image.is_empty() => resolve_image(&m.image),
            _ if record.cid.contains(TEST_IMAGE_MARKER) => TEST_IMAGE.to_string(),
            _ => DEFAULT_IMAGE.to_string(),
        };

        Self {
            id,
            title: record.question.clone(),
            image,
            probabilities,
            tag: metadata.map(|m| m.category.clone()).unwrap_or_default(),
            description: metadata.map(|m| m.description.clone()).unwrap_or_default(),
            resolution_source: metadata
                .map(|m| m.resolution_source.clone())
                .unwrap_or_default(),
            start_time: timestamp(record.start_time),
            end_time: timestamp(record.end_time),
            resolved: record.resolved,
            yes_won: record.yes_won,
        }
    }

    pub fn claim_affordance(&self) -> ClaimAffordance {
        ClaimAffordance::for_market(self.resolved, self.yes_won)
    }

    pub fn time_left(&self, now: DateTime<Utc>) -> Option<TimeLeft> {
        self.end_time.and_then(|end| TimeLeft::until(end, now))
    }
}

fn timestamp(secs: u64) -> Option<DateTime<Utc>> {
    if secs == 0 {
        return None;
    }
    i64::try_from(secs)
        .ok()
        .and_then(|s| DateTime::from_timestamp(s, 0))
}

/// Markets indexed by contract id
pub type ActiveMarkets = BTreeMap<u64, Market>;
