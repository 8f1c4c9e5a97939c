use std::sync::Arc;

use serde::Serialize;
use tracing::{debug, error, info, warn};

use super::aggregate::{recalculate_composite, CompositeScores};
use super::domain::{FirmId, SubFactorPath};
use super::model::{DeductionSlab, ScoreModel};
use super::repository::{FirmDirectory, RepositoryError, ScoreStore};

/// Applies complaint-driven deductions to score records and keeps the
/// aggregates consistent with the leaves.
pub struct DeductionEngine<F, S> {
    model: Arc<ScoreModel>,
    firms: Arc<F>,
    scores: Arc<S>,
}

/// Result of one applied deduction.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DeductionOutcome {
    pub firm_id: FirmId,
    pub path: SubFactorPath,
    pub slab: DeductionSlab,
    pub rate: f64,
    pub deduction: f64,
    pub previous_score: f64,
    pub new_score: f64,
    pub composite: CompositeScores,
}

/// Reasons a deduction was not applied.
#[derive(Debug, thiserror::Error)]
pub enum DeductionError {
    #[error("unknown sub-factor '{0}'")]
    UnknownSubFactor(String),
    #[error("firm {0} not found")]
    FirmNotFound(FirmId),
    #[error("firm {0} has no score record yet")]
    ScoreRecordMissing(FirmId),
    #[error(transparent)]
    Repository(#[from] RepositoryError),
}

impl DeductionError {
    /// Data conditions that leave the record untouched, as opposed to storage faults.
    pub fn is_skip(&self) -> bool {
        !matches!(self, DeductionError::Repository(_))
    }
}

impl<F, S> DeductionEngine<F, S>
where
    F: FirmDirectory + 'static,
    S: ScoreStore + 'static,
{
    pub fn new(model: Arc<ScoreModel>, firms: Arc<F>, scores: Arc<S>) -> Self {
        Self {
            model,
            firms,
            scores,
        }
    }

    pub fn model(&self) -> &ScoreModel {
        &self.model
    }

    pub fn scores(&self) -> &S {
        &self.scores
    }

    /// Deduct points from the sub-factor an approved complaint is tagged with.
    ///
    /// Each call deducts once; callers must only invoke it on the transition
    /// into the approved state.
    pub fn apply_complaint_deduction(
        &self,
        firm_id: &FirmId,
        related_sub_factor: &str,
    ) -> Result<DeductionOutcome, DeductionError> {
        let path = self
            .model
            .resolve_sub_factor_path(related_sub_factor)
            .ok_or_else(|| DeductionError::UnknownSubFactor(related_sub_factor.to_string()))?;

        let firm = self
            .firms
            .firm_profile(firm_id)?
            .ok_or_else(|| DeductionError::FirmNotFound(firm_id.clone()))?;

        let quote = self.model.quote_for_path(&path, firm.payout_volume());

        let change = self
            .scores
            .deduct_sub_factor(firm_id, &path, quote.amount)?
            .ok_or_else(|| DeductionError::ScoreRecordMissing(firm_id.clone()))?;

        let composite = self.refresh_aggregates(firm_id)?;

        info!(
            firm = %firm_id,
            path = %path,
            slab = quote.slab.label(),
            rate = quote.rate,
            deduction = quote.amount,
            previous = change.previous,
            current = change.current,
            pti = composite.pti_score,
            "complaint deduction applied"
        );

        Ok(DeductionOutcome {
            firm_id: firm_id.clone(),
            path,
            slab: quote.slab,
            rate: quote.rate,
            deduction: quote.amount,
            previous_score: change.previous,
            new_score: change.current,
            composite,
        })
    }

    /// Best-effort boundary: failures are logged and swallowed so the caller's
    /// own state transition is never aborted.
    pub fn apply_complaint_deduction_or_log(
        &self,
        firm_id: &FirmId,
        related_sub_factor: &str,
    ) -> Option<DeductionOutcome> {
        match self.apply_complaint_deduction(firm_id, related_sub_factor) {
            Ok(outcome) => Some(outcome),
            Err(err) if err.is_skip() => {
                warn!(firm = %firm_id, sub_factor = related_sub_factor, error = %err, "complaint deduction skipped");
                None
            }
            Err(err) => {
                error!(firm = %firm_id, sub_factor = related_sub_factor, error = %err, "complaint deduction failed");
                None
            }
        }
    }

    /// Recompute totals and the index from the stored leaves and persist them.
    pub fn refresh_aggregates(&self, firm_id: &FirmId) -> Result<CompositeScores, DeductionError> {
        let record = self
            .scores
            .score_record(firm_id)?
            .ok_or_else(|| DeductionError::ScoreRecordMissing(firm_id.clone()))?;

        let composite = recalculate_composite(&record, self.model.weights());
        self.scores
            .update_score_record_aggregates(firm_id, &composite)?;

        debug!(
            firm = %firm_id,
            credibility = composite.credibility_total,
            trading = composite.trading_total,
            payout = composite.payout_total,
            pti = composite.pti_score,
            "score aggregates refreshed"
        );

        Ok(composite)
    }
}
