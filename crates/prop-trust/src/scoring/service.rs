use std::sync::Arc;

use chrono::Utc;
use serde::Serialize;
use tracing::info;

use super::deduction::{DeductionEngine, DeductionOutcome};
use super::domain::{FirmId, Review, ReviewId, ReviewStatus};
use super::repository::{FirmDirectory, RepositoryError, ReviewRepository, ScoreStore};

/// Review moderation workflow; the only caller of the deduction engine.
pub struct ReviewService<R, F, S> {
    reviews: Arc<R>,
    engine: Arc<DeductionEngine<F, S>>,
}

/// Persisted review after a status change, with the deduction it triggered.
#[derive(Debug, Clone, Serialize)]
pub struct ReviewTransition {
    pub review: Review,
    pub previous_status: ReviewStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub deduction: Option<DeductionOutcome>,
}

impl<R, F, S> ReviewService<R, F, S>
where
    R: ReviewRepository + 'static,
    F: FirmDirectory + 'static,
    S: ScoreStore + 'static,
{
    pub fn new(reviews: Arc<R>, engine: Arc<DeductionEngine<F, S>>) -> Self {
        Self { reviews, engine }
    }

    pub fn engine(&self) -> &DeductionEngine<F, S> {
        &self.engine
    }

    /// Register a new review in the pending state.
    pub fn submit(
        &self,
        id: ReviewId,
        firm_id: FirmId,
        related_sub_factor: Option<String>,
    ) -> Result<Review, ReviewServiceError> {
        let review = Review {
            id,
            firm_id,
            related_sub_factor,
            status: ReviewStatus::Pending,
            reviewed_at: None,
        };
        Ok(self.reviews.insert(review)?)
    }

    /// Move a review to `status`. Entering the approved state from any other
    /// state triggers one best-effort deduction; the status change is stored
    /// first and survives a failed deduction.
    pub fn update_status(
        &self,
        id: &ReviewId,
        status: ReviewStatus,
    ) -> Result<ReviewTransition, ReviewServiceError> {
        let mut review = self.reviews.fetch(id)?.ok_or(RepositoryError::NotFound)?;
        let previous_status = review.status;

        review.status = status;
        if status != previous_status {
            review.reviewed_at = Some(Utc::now());
        }
        self.reviews.update(review.clone())?;

        info!(
            review = %review.id,
            firm = %review.firm_id,
            from = previous_status.label(),
            to = status.label(),
            "review status updated"
        );

        let entering_approved =
            status == ReviewStatus::Approved && previous_status != ReviewStatus::Approved;
        let deduction = match (&review.related_sub_factor, entering_approved) {
            (Some(sub_factor), true) => self
                .engine
                .apply_complaint_deduction_or_log(&review.firm_id, sub_factor),
            _ => None,
        };

        Ok(ReviewTransition {
            review,
            previous_status,
            deduction,
        })
    }

    pub fn get(&self, id: &ReviewId) -> Result<Review, ReviewServiceError> {
        Ok(self.reviews.fetch(id)?.ok_or(RepositoryError::NotFound)?)
    }
}

/// Error raised by the review service.
#[derive(Debug, thiserror::Error)]
pub enum ReviewServiceError {
    #[error(transparent)]
    Repository(#[from] RepositoryError),
}
