mod definition;
mod slab;

pub use definition::{CategoryEntry, PillarWeights, ScoreModelDefinition, SubFactorEntry};
pub use slab::{DeductionSchedule, DeductionSlab, SlabThreshold};

use std::collections::{BTreeMap, HashMap};
use std::fs::File;
use std::io::{BufReader, Read};
use std::path::Path;

use serde::Serialize;

use super::domain::{Pillar, SubFactorPath};

/// Every pillar is budgeted this many points.
pub const PILLAR_MAX_POINTS: f64 = 10.0;

const CLOSURE_TOLERANCE: f64 = 1e-9;

/// Fallback ceiling when a category is missing from the model.
const DEFAULT_CATEGORY_MAX_POINTS: f64 = 1.0;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CategoryDefinition {
    pub name: String,
    pub pillar: Pillar,
    pub max_points: f64,
    pub sub_factors: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SubFactorDefinition {
    pub name: String,
    pub pillar: Pillar,
    pub category: String,
    pub max_points: f64,
}

/// Immutable scoring rubric: hierarchy, ceilings, weights and slab table.
///
/// Built once at start-up and shared behind an `Arc`.
#[derive(Debug, Clone)]
pub struct ScoreModel {
    weights: PillarWeights,
    categories: BTreeMap<String, CategoryDefinition>,
    sub_factors: HashMap<String, SubFactorDefinition>,
    schedule: DeductionSchedule,
}

/// What one approved complaint against a sub-factor would cost a firm.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DeductionQuote {
    pub path: SubFactorPath,
    pub slab: DeductionSlab,
    pub rate: f64,
    pub category_max_points: f64,
    pub amount: f64,
}

/// Error raised when a score model cannot be loaded or is internally inconsistent.
#[derive(Debug, thiserror::Error)]
pub enum ScoreModelError {
    #[error("unable to read score model: {0}")]
    Io(#[from] std::io::Error),
    #[error("unable to parse score model: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("pillar weights sum to {total:.6}, expected 1.0")]
    WeightClosure { total: f64 },
    #[error("pillar {pillar} categories sum to {total:.6}, expected {expected:.1}")]
    PillarClosure {
        pillar: Pillar,
        total: f64,
        expected: f64,
    },
    #[error("category {category} sub-factors sum to {total:.6}, expected {expected:.6}")]
    CategoryClosure {
        category: String,
        total: f64,
        expected: f64,
    },
    #[error("{kind} {name} is defined more than once")]
    Duplicate { kind: &'static str, name: String },
    #[error("{kind} {name} has ceiling {max_points}, expected a finite value >= 0")]
    InvalidCeiling {
        kind: &'static str,
        name: String,
        max_points: f64,
    },
    #[error("slab table is invalid: {0}")]
    Slabs(String),
}

impl ScoreModel {
    pub fn standard() -> Self {
        Self::build(ScoreModelDefinition::standard())
    }

    /// Build and validate a model from a definition.
    pub fn from_definition(definition: ScoreModelDefinition) -> Result<Self, ScoreModelError> {
        check_duplicates(&definition)?;
        let model = Self::build(definition);
        model.validate()?;
        Ok(model)
    }

    pub fn from_reader<R: Read>(reader: R) -> Result<Self, ScoreModelError> {
        let definition: ScoreModelDefinition = serde_json::from_reader(reader)?;
        Self::from_definition(definition)
    }

    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, ScoreModelError> {
        let file = File::open(path)?;
        Self::from_reader(BufReader::new(file))
    }

    fn build(definition: ScoreModelDefinition) -> Self {
        let mut categories = BTreeMap::new();
        let mut sub_factors = HashMap::new();

        for entry in definition.categories {
            for sub_factor in &entry.sub_factors {
                sub_factors.insert(
                    sub_factor.name.clone(),
                    SubFactorDefinition {
                        name: sub_factor.name.clone(),
                        pillar: entry.pillar,
                        category: entry.name.clone(),
                        max_points: sub_factor.max_points,
                    },
                );
            }
            categories.insert(
                entry.name.clone(),
                CategoryDefinition {
                    name: entry.name,
                    pillar: entry.pillar,
                    max_points: entry.max_points,
                    sub_factors: entry.sub_factors.into_iter().map(|s| s.name).collect(),
                },
            );
        }

        Self {
            weights: definition.pillar_weights,
            categories,
            sub_factors,
            schedule: DeductionSchedule::new(definition.slabs),
        }
    }

    /// Check ceilings, weight, pillar and category closure plus the slab table.
    pub fn validate(&self) -> Result<(), ScoreModelError> {
        let total = self.weights.total();
        if (total - 1.0).abs() > CLOSURE_TOLERANCE {
            return Err(ScoreModelError::WeightClosure { total });
        }

        // A negative ceiling would turn a deduction into a credit.
        let ceilings = self
            .categories
            .values()
            .map(|category| ("category", &category.name, category.max_points))
            .chain(
                self.sub_factors
                    .values()
                    .map(|sub_factor| ("sub-factor", &sub_factor.name, sub_factor.max_points)),
            );
        for (kind, name, max_points) in ceilings {
            if !(max_points.is_finite() && max_points >= 0.0) {
                return Err(ScoreModelError::InvalidCeiling {
                    kind,
                    name: name.clone(),
                    max_points,
                });
            }
        }

        for pillar in Pillar::ALL {
            let total: f64 = self
                .categories_in(pillar)
                .map(|category| category.max_points)
                .sum();
            if (total - PILLAR_MAX_POINTS).abs() > CLOSURE_TOLERANCE {
                return Err(ScoreModelError::PillarClosure {
                    pillar,
                    total,
                    expected: PILLAR_MAX_POINTS,
                });
            }
        }

        for category in self.categories.values() {
            let total: f64 = category
                .sub_factors
                .iter()
                .filter_map(|name| self.sub_factors.get(name))
                .map(|sub_factor| sub_factor.max_points)
                .sum();
            if (total - category.max_points).abs() > CLOSURE_TOLERANCE {
                return Err(ScoreModelError::CategoryClosure {
                    category: category.name.clone(),
                    total,
                    expected: category.max_points,
                });
            }
        }

        let thresholds = self.schedule.thresholds();
        match thresholds.last() {
            None => return Err(ScoreModelError::Slabs("no slabs defined".to_string())),
            Some(floor) if floor.min_payout != 0.0 => {
                return Err(ScoreModelError::Slabs(format!(
                    "lowest slab {} starts at {} instead of 0",
                    floor.slab.label(),
                    floor.min_payout
                )))
            }
            Some(_) => {}
        }
        if let Some(bad) = thresholds
            .iter()
            .find(|threshold| !(threshold.rate > 0.0 && threshold.rate <= 1.0))
        {
            return Err(ScoreModelError::Slabs(format!(
                "slab {} rate {} outside (0, 1]",
                bad.slab.label(),
                bad.rate
            )));
        }

        Ok(())
    }

    pub fn weights(&self) -> &PillarWeights {
        &self.weights
    }

    pub fn schedule(&self) -> &DeductionSchedule {
        &self.schedule
    }

    pub fn categories(&self) -> impl Iterator<Item = &CategoryDefinition> {
        self.categories.values()
    }

    pub fn categories_in(&self, pillar: Pillar) -> impl Iterator<Item = &CategoryDefinition> {
        self.categories
            .values()
            .filter(move |category| category.pillar == pillar)
    }

    pub fn sub_factor(&self, name: &str) -> Option<&SubFactorDefinition> {
        self.sub_factors.get(name)
    }

    /// Locate a sub-factor by name. Unknown or legacy tags resolve to `None`.
    pub fn resolve_sub_factor_path(&self, name: &str) -> Option<SubFactorPath> {
        self.sub_factors.get(name.trim()).map(|definition| SubFactorPath {
            pillar: definition.pillar,
            category: definition.category.clone(),
            sub_factor: definition.name.clone(),
        })
    }

    pub fn category_max_points(&self, category: &str) -> Option<f64> {
        self.categories
            .get(category)
            .map(|definition| definition.max_points)
    }

    pub fn deduction_rate_for_slab(&self, total_payout: f64) -> f64 {
        self.schedule.deduction_rate_for_slab(total_payout)
    }

    /// Price a complaint against an already resolved path.
    pub fn quote_for_path(&self, path: &SubFactorPath, total_payout: f64) -> DeductionQuote {
        let SlabThreshold { slab, rate, .. } = self.schedule.threshold_for(total_payout);
        let category_max_points = self
            .category_max_points(&path.category)
            .unwrap_or(DEFAULT_CATEGORY_MAX_POINTS);
        let amount = rate * (category_max_points / PILLAR_MAX_POINTS);

        DeductionQuote {
            path: path.clone(),
            slab,
            rate,
            category_max_points,
            amount,
        }
    }

    pub fn quote(&self, sub_factor: &str, total_payout: f64) -> Option<DeductionQuote> {
        self.resolve_sub_factor_path(sub_factor)
            .map(|path| self.quote_for_path(&path, total_payout))
    }
}

impl Default for ScoreModel {
    fn default() -> Self {
        Self::standard()
    }
}

fn check_duplicates(definition: &ScoreModelDefinition) -> Result<(), ScoreModelError> {
    let mut categories = std::collections::HashSet::new();
    let mut sub_factors = std::collections::HashSet::new();

    for category in &definition.categories {
        if !categories.insert(category.name.as_str()) {
            return Err(ScoreModelError::Duplicate {
                kind: "category",
                name: category.name.clone(),
            });
        }
        for sub_factor in &category.sub_factors {
            if !sub_factors.insert(sub_factor.name.as_str()) {
                return Err(ScoreModelError::Duplicate {
                    kind: "sub-factor",
                    name: sub_factor.name.clone(),
                });
            }
        }
    }

    Ok(())
}
