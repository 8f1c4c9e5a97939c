use super::aggregate::CompositeScores;
use super::domain::{FirmId, FirmProfile, Review, ReviewId, SubFactorPath};
use super::record::{ScoreRecord, SubFactorChange};

/// Read-only access to firm financial profiles.
pub trait FirmDirectory: Send + Sync {
    fn firm_profile(&self, firm_id: &FirmId) -> Result<Option<FirmProfile>, RepositoryError>;
}

/// Storage abstraction for per-firm score records.
pub trait ScoreStore: Send + Sync {
    fn score_record(&self, firm_id: &FirmId) -> Result<Option<ScoreRecord>, RepositoryError>;

    /// Single leaf write. Fails with `NotFound` when the firm has no record.
    fn update_score_record_path(
        &self,
        firm_id: &FirmId,
        path: &SubFactorPath,
        value: f64,
    ) -> Result<(), RepositoryError>;

    /// Store recomputed pillar totals and the composite index.
    fn update_score_record_aggregates(
        &self,
        firm_id: &FirmId,
        composite: &CompositeScores,
    ) -> Result<(), RepositoryError>;

    /// Subtract `amount` from one leaf, flooring at zero. Returns `None` when the
    /// firm has no record.
    ///
    /// The provided implementation is a read followed by a path write and can
    /// lose updates under concurrent deductions for the same firm. Stores that
    /// can subtract-and-floor in one step should override it.
    fn deduct_sub_factor(
        &self,
        firm_id: &FirmId,
        path: &SubFactorPath,
        amount: f64,
    ) -> Result<Option<SubFactorChange>, RepositoryError> {
        let Some(mut record) = self.score_record(firm_id)? else {
            return Ok(None);
        };
        let change = record.deduct(path, amount);
        self.update_score_record_path(firm_id, path, change.current)?;
        Ok(Some(change))
    }
}

/// Storage abstraction for moderated reviews.
pub trait ReviewRepository: Send + Sync {
    fn insert(&self, review: Review) -> Result<Review, RepositoryError>;
    fn update(&self, review: Review) -> Result<(), RepositoryError>;
    fn fetch(&self, id: &ReviewId) -> Result<Option<Review>, RepositoryError>;
}

/// Error enumeration for repository failures.
#[derive(Debug, thiserror::Error)]
pub enum RepositoryError {
    #[error("record already exists")]
    Conflict,
    #[error("record not found")]
    NotFound,
    #[error("repository unavailable: {0}")]
    Unavailable(String),
}
