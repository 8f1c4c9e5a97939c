//! Prop Trust Index scoring: the rubric, per-firm score records, and the
//! complaint deduction engine driven by review approvals.

pub mod aggregate;
pub mod deduction;
pub mod domain;
pub mod model;
pub mod record;
pub mod repository;
pub mod router;
pub mod service;

#[cfg(test)]
mod tests;

pub use aggregate::{recalculate_composite, round3, CompositeScores};
pub use deduction::{DeductionEngine, DeductionError, DeductionOutcome};
pub use domain::{FirmId, FirmProfile, Pillar, Review, ReviewId, ReviewStatus, SubFactorPath};
pub use model::{
    CategoryDefinition, DeductionQuote, DeductionSchedule, DeductionSlab, PillarWeights,
    ScoreModel, ScoreModelDefinition, ScoreModelError, SlabThreshold, SubFactorDefinition,
    PILLAR_MAX_POINTS,
};
pub use record::{PillarScores, ScoreNode, ScoreRecord, SubFactorChange};
pub use repository::{FirmDirectory, RepositoryError, ReviewRepository, ScoreStore};
pub use router::scoring_router;
pub use service::{ReviewService, ReviewServiceError, ReviewTransition};
