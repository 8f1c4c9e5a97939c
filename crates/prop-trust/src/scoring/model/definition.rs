use serde::{Deserialize, Serialize};

use super::super::domain::Pillar;
use super::slab::{DeductionSchedule, SlabThreshold};

/// Serializable description of a score model, as shipped or loaded from disk.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoreModelDefinition {
    pub pillar_weights: PillarWeights,
    pub categories: Vec<CategoryEntry>,
    #[serde(default = "standard_slabs")]
    pub slabs: Vec<SlabThreshold>,
}

/// Composite weights per pillar.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PillarWeights {
    pub credibility: f64,
    pub trading_experience: f64,
    pub payout_payment_experience: f64,
}

impl PillarWeights {
    pub fn weight(&self, pillar: Pillar) -> f64 {
        match pillar {
            Pillar::Credibility => self.credibility,
            Pillar::TradingExperience => self.trading_experience,
            Pillar::PayoutPaymentExperience => self.payout_payment_experience,
        }
    }

    pub fn total(&self) -> f64 {
        self.credibility + self.trading_experience + self.payout_payment_experience
    }
}

impl Default for PillarWeights {
    fn default() -> Self {
        Self {
            credibility: 0.35,
            trading_experience: 0.30,
            payout_payment_experience: 0.35,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CategoryEntry {
    pub name: String,
    pub pillar: Pillar,
    pub max_points: f64,
    pub sub_factors: Vec<SubFactorEntry>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SubFactorEntry {
    pub name: String,
    pub max_points: f64,
}

fn standard_slabs() -> Vec<SlabThreshold> {
    DeductionSchedule::standard().thresholds().to_vec()
}

fn category(name: &str, pillar: Pillar, max_points: f64, sub_factors: &[(&str, f64)]) -> CategoryEntry {
    CategoryEntry {
        name: name.to_string(),
        pillar,
        max_points,
        sub_factors: sub_factors
            .iter()
            .map(|(name, max_points)| SubFactorEntry {
                name: (*name).to_string(),
                max_points: *max_points,
            })
            .collect(),
    }
}

impl ScoreModelDefinition {
    /// The production rubric: ten categories across three 10-point pillars.
    pub fn standard() -> Self {
        use Pillar::*;

        Self {
            pillar_weights: PillarWeights::default(),
            categories: vec![
                category(
                    "physical_legal_presence",
                    Credibility,
                    3.0,
                    &[
                        ("registered_company", 1.0),
                        ("physical_office", 1.0),
                        ("regulatory_license", 1.0),
                    ],
                ),
                category(
                    "ownership_transparency",
                    Credibility,
                    2.5,
                    &[
                        ("public_founders", 1.0),
                        ("verified_team", 0.75),
                        ("company_history", 0.75),
                    ],
                ),
                category(
                    "rules_transparency",
                    Credibility,
                    2.5,
                    &[
                        ("clear_rules", 1.0),
                        ("published_terms", 0.75),
                        ("no_hidden_clauses", 0.75),
                    ],
                ),
                category(
                    "track_record",
                    Credibility,
                    2.0,
                    &[("years_in_operation", 1.0), ("community_standing", 1.0)],
                ),
                category(
                    "trading_conditions",
                    TradingExperience,
                    3.0,
                    &[
                        ("fair_spreads", 1.0),
                        ("low_commissions", 1.0),
                        ("execution_quality", 1.0),
                    ],
                ),
                category(
                    "platform_reliability",
                    TradingExperience,
                    3.5,
                    &[
                        ("platform_stability", 1.5),
                        ("platform_choice", 1.0),
                        ("data_feed_quality", 1.0),
                    ],
                ),
                category(
                    "customer_support",
                    TradingExperience,
                    3.5,
                    &[
                        ("response_time", 1.5),
                        ("support_channels", 1.0),
                        ("issue_resolution", 1.0),
                    ],
                ),
                category(
                    "payout_reliability",
                    PayoutPaymentExperience,
                    3.0,
                    &[
                        ("payout_cycle", 1.0),
                        ("payout_on_time", 1.0),
                        ("payout_denial_rate", 1.0),
                    ],
                ),
                category(
                    "payout_behavior",
                    PayoutPaymentExperience,
                    4.0,
                    &[
                        ("no_arbitrary_denials", 1.5),
                        ("consistent_rule_enforcement", 1.5),
                        ("refund_policy", 1.0),
                    ],
                ),
                category(
                    "payment_methods",
                    PayoutPaymentExperience,
                    3.0,
                    &[
                        ("payment_options", 1.0),
                        ("withdrawal_fees", 1.0),
                        ("processing_speed", 1.0),
                    ],
                ),
            ],
            slabs: standard_slabs(),
        }
    }
}
