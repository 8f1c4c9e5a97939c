use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

use super::aggregate::CompositeScores;
use super::domain::{FirmId, Pillar, SubFactorPath};
use super::model::ScoreModel;

/// A node in a pillar subtree: a scored leaf, a nested group, or a value that
/// does not hold points (corrupted or foreign data).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ScoreNode {
    Points(f64),
    Group(BTreeMap<String, ScoreNode>),
    Unscored(Value),
}

impl ScoreNode {
    /// Sum of every numeric leaf below this node. Non-numeric and non-finite
    /// leaves contribute nothing.
    pub fn total(&self) -> f64 {
        match self {
            ScoreNode::Points(points) if points.is_finite() => *points,
            ScoreNode::Points(_) | ScoreNode::Unscored(_) => 0.0,
            ScoreNode::Group(children) => children.values().map(ScoreNode::total).sum(),
        }
    }

    pub fn points(&self) -> Option<f64> {
        match self {
            ScoreNode::Points(points) if points.is_finite() => Some(*points),
            _ => None,
        }
    }
}

/// One pillar subtree plus its cached total.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PillarScores {
    #[serde(default, deserialize_with = "deserialize_cached_total")]
    pub score: f64,
    #[serde(flatten)]
    pub categories: BTreeMap<String, ScoreNode>,
}

impl PillarScores {
    /// Current (unrounded) sum of all category leaves, ignoring the cached score.
    pub fn leaf_total(&self) -> f64 {
        self.categories.values().map(ScoreNode::total).sum()
    }
}

/// Cached totals are rewritten on every recompute, so anything that is not a
/// finite number reads as zero instead of rejecting the whole document.
fn deserialize_cached_total<'de, D>(deserializer: D) -> Result<f64, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = Option::<Value>::deserialize(deserializer)?;
    Ok(raw
        .as_ref()
        .and_then(Value::as_f64)
        .filter(|total| total.is_finite())
        .unwrap_or(0.0))
}

/// Persisted per-firm score document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScoreRecord {
    pub firm_id: FirmId,
    #[serde(default)]
    pub credibility_transparency: PillarScores,
    #[serde(default)]
    pub trading_experience: PillarScores,
    #[serde(default)]
    pub payout_payment_reliability: PillarScores,
    #[serde(default, deserialize_with = "deserialize_cached_total")]
    pub pti_score: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<DateTime<Utc>>,
}

impl ScoreRecord {
    pub fn empty(firm_id: FirmId) -> Self {
        Self {
            firm_id,
            credibility_transparency: PillarScores::default(),
            trading_experience: PillarScores::default(),
            payout_payment_reliability: PillarScores::default(),
            pti_score: 0.0,
            updated_at: None,
        }
    }

    /// Seed a record with every sub-factor at its ceiling and fresh totals.
    pub fn full_marks(firm_id: FirmId, model: &ScoreModel) -> Self {
        let mut record = Self::empty(firm_id);
        for category in model.categories() {
            for name in &category.sub_factors {
                if let Some(definition) = model.sub_factor(name) {
                    let path = SubFactorPath {
                        pillar: category.pillar,
                        category: category.name.clone(),
                        sub_factor: name.clone(),
                    };
                    record.set_sub_factor(&path, definition.max_points);
                }
            }
        }
        let composite = super::aggregate::recalculate_composite(&record, model.weights());
        record.apply_composite(&composite);
        record
    }

    pub fn pillar(&self, pillar: Pillar) -> &PillarScores {
        match pillar {
            Pillar::Credibility => &self.credibility_transparency,
            Pillar::TradingExperience => &self.trading_experience,
            Pillar::PayoutPaymentExperience => &self.payout_payment_reliability,
        }
    }

    pub fn pillar_mut(&mut self, pillar: Pillar) -> &mut PillarScores {
        match pillar {
            Pillar::Credibility => &mut self.credibility_transparency,
            Pillar::TradingExperience => &mut self.trading_experience,
            Pillar::PayoutPaymentExperience => &mut self.payout_payment_reliability,
        }
    }

    /// Numeric value at `path`, or `None` when absent or not a number.
    pub fn sub_factor(&self, path: &SubFactorPath) -> Option<f64> {
        match self.pillar(path.pillar).categories.get(&path.category)? {
            ScoreNode::Group(children) => children.get(&path.sub_factor)?.points(),
            _ => None,
        }
    }

    /// Write a leaf value, creating the category group when missing. A category
    /// slot holding a non-group value is replaced by a group.
    pub fn set_sub_factor(&mut self, path: &SubFactorPath, value: f64) {
        let categories = &mut self.pillar_mut(path.pillar).categories;
        let node = categories
            .entry(path.category.clone())
            .or_insert_with(|| ScoreNode::Group(BTreeMap::new()));
        if !matches!(node, ScoreNode::Group(_)) {
            *node = ScoreNode::Group(BTreeMap::new());
        }
        if let ScoreNode::Group(children) = node {
            children.insert(path.sub_factor.clone(), ScoreNode::Points(value));
        }
    }

    /// Subtract `amount` from the leaf at `path`, flooring at zero. Returns the
    /// previous and new values; a missing or non-numeric leaf counts as zero.
    pub fn deduct(&mut self, path: &SubFactorPath, amount: f64) -> SubFactorChange {
        let previous = self.sub_factor(path).unwrap_or(0.0);
        let current = (previous - amount).max(0.0);
        self.set_sub_factor(path, current);
        SubFactorChange { previous, current }
    }

    pub fn apply_composite(&mut self, composite: &CompositeScores) {
        self.credibility_transparency.score = composite.credibility_total;
        self.trading_experience.score = composite.trading_total;
        self.payout_payment_reliability.score = composite.payout_total;
        self.pti_score = composite.pti_score;
    }
}

/// Before/after values of a single sub-factor write.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SubFactorChange {
    pub previous: f64,
    pub current: f64,
}

impl SubFactorChange {
    pub fn applied(&self) -> f64 {
        self.previous - self.current
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn payout_cycle() -> SubFactorPath {
        SubFactorPath {
            pillar: Pillar::PayoutPaymentExperience,
            category: "payout_reliability".to_string(),
            sub_factor: "payout_cycle".to_string(),
        }
    }

    #[test]
    fn deserializes_document_shape_and_tolerates_corrupt_leaves() {
        let record: ScoreRecord = serde_json::from_value(json!({
            "firmId": "firm-1",
            "credibilityTransparency": {
                "score": 2.5,
                "physical_legal_presence": { "registered_company": 1, "physical_office": "n/a" }
            },
            "payoutPaymentReliability": {
                "payout_reliability": { "payout_cycle": 0.75 }
            },
            "ptiScore": 1.0
        }))
        .expect("record parses");

        assert_eq!(record.credibility_transparency.score, 2.5);
        assert_eq!(record.credibility_transparency.leaf_total(), 1.0);
        assert_eq!(record.sub_factor(&payout_cycle()), Some(0.75));
        assert!(record.trading_experience.categories.is_empty());
    }

    #[test]
    fn corrupt_cached_totals_read_as_zero() {
        let record: ScoreRecord = serde_json::from_value(json!({
            "firmId": "firm-5",
            "credibilityTransparency": {
                "score": null,
                "physical_legal_presence": { "registered_company": 1 }
            },
            "tradingExperience": {
                "score": "9.5",
                "trading_conditions": { "fair_spreads": 0.5 }
            },
            "payoutPaymentReliability": {
                "score": { "stale": true },
                "payout_reliability": { "payout_cycle": 0.75 }
            },
            "ptiScore": null
        }))
        .expect("record with corrupt cached totals parses");

        assert_eq!(record.credibility_transparency.score, 0.0);
        assert_eq!(record.trading_experience.score, 0.0);
        assert_eq!(record.payout_payment_reliability.score, 0.0);
        assert_eq!(record.pti_score, 0.0);
        assert_eq!(record.credibility_transparency.leaf_total(), 1.0);
        assert_eq!(record.sub_factor(&payout_cycle()), Some(0.75));
        assert!(!record.payout_payment_reliability.categories.contains_key("score"));
    }

    #[test]
    fn deduct_floors_at_zero_and_treats_missing_leaf_as_zero() {
        let mut record = ScoreRecord::empty(FirmId("firm-2".to_string()));
        record.set_sub_factor(&payout_cycle(), 0.03);

        let change = record.deduct(&payout_cycle(), 0.048);
        assert_eq!(change.previous, 0.03);
        assert_eq!(change.current, 0.0);

        let missing = SubFactorPath {
            sub_factor: "payout_on_time".to_string(),
            ..payout_cycle()
        };
        let change = record.deduct(&missing, 0.048);
        assert_eq!(change.previous, 0.0);
        assert_eq!(record.sub_factor(&missing), Some(0.0));
    }

    #[test]
    fn set_sub_factor_replaces_corrupt_category_slot() {
        let mut record = ScoreRecord::empty(FirmId("firm-3".to_string()));
        record
            .payout_payment_reliability
            .categories
            .insert("payout_reliability".to_string(), ScoreNode::Unscored(json!("broken")));

        record.set_sub_factor(&payout_cycle(), 0.5);
        assert_eq!(record.sub_factor(&payout_cycle()), Some(0.5));
    }

    #[test]
    fn serialized_record_keeps_document_field_names() {
        let record = ScoreRecord::empty(FirmId("firm-4".to_string()));
        let value = serde_json::to_value(&record).expect("serializes");
        assert!(value.get("credibilityTransparency").is_some());
        assert!(value.get("tradingExperience").is_some());
        assert!(value.get("payoutPaymentReliability").is_some());
        assert!(value.get("ptiScore").is_some());
    }
}
