use serde::{Deserialize, Serialize};

use super::domain::Pillar;
use super::model::PillarWeights;
use super::record::ScoreRecord;

/// Pillar totals and the weighted index, rounded for storage.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CompositeScores {
    pub credibility_total: f64,
    pub trading_total: f64,
    pub payout_total: f64,
    pub pti_score: f64,
}

pub fn round3(value: f64) -> f64 {
    (value * 1000.0).round() / 1000.0
}

/// Recompute every aggregate from the record's current leaves.
///
/// The index is weighted from the unrounded pillar sums; all four outputs are
/// then rounded to three decimals.
pub fn recalculate_composite(record: &ScoreRecord, weights: &PillarWeights) -> CompositeScores {
    let credibility = record.pillar(Pillar::Credibility).leaf_total();
    let trading = record.pillar(Pillar::TradingExperience).leaf_total();
    let payout = record.pillar(Pillar::PayoutPaymentExperience).leaf_total();

    let pti = weights.credibility * credibility
        + weights.trading_experience * trading
        + weights.payout_payment_experience * payout;

    CompositeScores {
        credibility_total: round3(credibility),
        trading_total: round3(trading),
        payout_total: round3(payout),
        pti_score: round3(pti),
    }
}
