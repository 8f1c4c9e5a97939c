use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

/// Identifier wrapper for rated prop firms.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct FirmId(pub String);

impl fmt::Display for FirmId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Identifier wrapper for user reviews (complaints).
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ReviewId(pub String);

impl fmt::Display for ReviewId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// The three top-level trust dimensions of the index.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Pillar {
    Credibility,
    TradingExperience,
    PayoutPaymentExperience,
}

impl Pillar {
    pub const ALL: [Pillar; 3] = [
        Pillar::Credibility,
        Pillar::TradingExperience,
        Pillar::PayoutPaymentExperience,
    ];

    pub fn key(&self) -> &'static str {
        match self {
            Pillar::Credibility => "credibility",
            Pillar::TradingExperience => "trading_experience",
            Pillar::PayoutPaymentExperience => "payout_payment_experience",
        }
    }

    /// Field name of the pillar subtree inside a stored score record.
    pub fn record_field(&self) -> &'static str {
        match self {
            Pillar::Credibility => "credibilityTransparency",
            Pillar::TradingExperience => "tradingExperience",
            Pillar::PayoutPaymentExperience => "payoutPaymentReliability",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Pillar::Credibility => "Credibility & Transparency",
            Pillar::TradingExperience => "Trading Experience",
            Pillar::PayoutPaymentExperience => "Payout & Payment Experience",
        }
    }
}

impl fmt::Display for Pillar {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.key())
    }
}

/// Fully resolved location of a sub-factor inside a score record.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SubFactorPath {
    pub pillar: Pillar,
    pub category: String,
    pub sub_factor: String,
}

impl fmt::Display for SubFactorPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}.{}.{}",
            self.pillar.record_field(),
            self.category,
            self.sub_factor
        )
    }
}

/// Financial snapshot of a firm, owned by the firm directory.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FirmProfile {
    pub firm_id: FirmId,
    #[serde(default)]
    pub name: String,
    #[serde(default, deserialize_with = "deserialize_lenient_amount")]
    pub total_payout: Option<f64>,
}

impl FirmProfile {
    pub fn new(firm_id: FirmId, name: impl Into<String>, total_payout: f64) -> Self {
        Self {
            firm_id,
            name: name.into(),
            total_payout: Some(total_payout),
        }
    }

    /// Lifetime payout volume used for slab selection.
    ///
    /// Missing, non-finite and negative amounts count as zero, which places the
    /// firm in the strictest slab.
    pub fn payout_volume(&self) -> f64 {
        match self.total_payout {
            Some(amount) if amount.is_finite() && amount > 0.0 => amount,
            _ => 0.0,
        }
    }
}

/// Accepts numbers and numeric strings; anything else becomes `None`.
fn deserialize_lenient_amount<'de, D>(deserializer: D) -> Result<Option<f64>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = Option::<Value>::deserialize(deserializer)?;
    Ok(match raw {
        Some(Value::Number(number)) => number.as_f64(),
        Some(Value::String(text)) => {
            let trimmed = text.trim();
            if trimmed.is_empty() {
                Some(0.0)
            } else {
                trimmed.parse::<f64>().ok()
            }
        }
        _ => None,
    })
}

/// Moderation state of a review.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReviewStatus {
    Pending,
    Approved,
    Rejected,
}

impl ReviewStatus {
    pub fn label(&self) -> &'static str {
        match self {
            ReviewStatus::Pending => "pending",
            ReviewStatus::Approved => "approved",
            ReviewStatus::Rejected => "rejected",
        }
    }
}

/// A user complaint against a firm, optionally tagged with the sub-factor it impacts.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Review {
    pub id: ReviewId,
    pub firm_id: FirmId,
    #[serde(default)]
    pub related_sub_factor: Option<String>,
    pub status: ReviewStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reviewed_at: Option<DateTime<Utc>>,
}
