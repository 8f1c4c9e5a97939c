use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use axum::response::Response;
use serde_json::Value;

use crate::scoring::aggregate::CompositeScores;
use crate::scoring::deduction::DeductionEngine;
use crate::scoring::domain::{FirmId, FirmProfile, Review, ReviewId, SubFactorPath};
use crate::scoring::model::ScoreModel;
use crate::scoring::record::{ScoreRecord, SubFactorChange};
use crate::scoring::repository::{FirmDirectory, RepositoryError, ReviewRepository, ScoreStore};
use crate::scoring::service::ReviewService;

pub(super) fn firm_id(raw: &str) -> FirmId {
    FirmId(raw.to_string())
}

pub(super) fn model() -> Arc<ScoreModel> {
    Arc::new(ScoreModel::standard())
}

pub(super) fn path(model: &ScoreModel, sub_factor: &str) -> SubFactorPath {
    model
        .resolve_sub_factor_path(sub_factor)
        .expect("sub-factor defined in the standard model")
}

pub(super) fn assert_close(actual: f64, expected: f64) {
    assert!(
        (actual - expected).abs() < 1e-9,
        "expected {expected}, got {actual}"
    );
}

#[derive(Default)]
pub(super) struct MemoryFirms {
    profiles: Mutex<HashMap<FirmId, FirmProfile>>,
}

impl MemoryFirms {
    pub(super) fn with(profiles: Vec<FirmProfile>) -> Self {
        let firms = Self::default();
        {
            let mut guard = firms.profiles.lock().expect("firm mutex poisoned");
            for profile in profiles {
                guard.insert(profile.firm_id.clone(), profile);
            }
        }
        firms
    }
}

impl FirmDirectory for MemoryFirms {
    fn firm_profile(&self, firm_id: &FirmId) -> Result<Option<FirmProfile>, RepositoryError> {
        let guard = self.profiles.lock().expect("firm mutex poisoned");
        Ok(guard.get(firm_id).cloned())
    }
}

#[derive(Default)]
pub(super) struct MemoryScores {
    pub(super) records: Mutex<HashMap<FirmId, ScoreRecord>>,
}

impl MemoryScores {
    pub(super) fn seed(&self, record: ScoreRecord) {
        self.records
            .lock()
            .expect("score mutex poisoned")
            .insert(record.firm_id.clone(), record);
    }

    pub(super) fn record(&self, firm_id: &FirmId) -> ScoreRecord {
        self.records
            .lock()
            .expect("score mutex poisoned")
            .get(firm_id)
            .cloned()
            .expect("record seeded")
    }
}

impl ScoreStore for MemoryScores {
    fn score_record(&self, firm_id: &FirmId) -> Result<Option<ScoreRecord>, RepositoryError> {
        let guard = self.records.lock().expect("score mutex poisoned");
        Ok(guard.get(firm_id).cloned())
    }

    fn update_score_record_path(
        &self,
        firm_id: &FirmId,
        path: &SubFactorPath,
        value: f64,
    ) -> Result<(), RepositoryError> {
        let mut guard = self.records.lock().expect("score mutex poisoned");
        let record = guard.get_mut(firm_id).ok_or(RepositoryError::NotFound)?;
        record.set_sub_factor(path, value);
        Ok(())
    }

    fn update_score_record_aggregates(
        &self,
        firm_id: &FirmId,
        composite: &CompositeScores,
    ) -> Result<(), RepositoryError> {
        let mut guard = self.records.lock().expect("score mutex poisoned");
        let record = guard.get_mut(firm_id).ok_or(RepositoryError::NotFound)?;
        record.apply_composite(composite);
        Ok(())
    }

    fn deduct_sub_factor(
        &self,
        firm_id: &FirmId,
        path: &SubFactorPath,
        amount: f64,
    ) -> Result<Option<SubFactorChange>, RepositoryError> {
        let mut guard = self.records.lock().expect("score mutex poisoned");
        Ok(guard.get_mut(firm_id).map(|record| record.deduct(path, amount)))
    }
}

/// Store whose writes always fail after reads succeed.
pub(super) struct ReadOnlyScores {
    pub(super) record: ScoreRecord,
}

impl ScoreStore for ReadOnlyScores {
    fn score_record(&self, _firm_id: &FirmId) -> Result<Option<ScoreRecord>, RepositoryError> {
        Ok(Some(self.record.clone()))
    }

    fn update_score_record_path(
        &self,
        _firm_id: &FirmId,
        _path: &SubFactorPath,
        _value: f64,
    ) -> Result<(), RepositoryError> {
        Err(RepositoryError::Unavailable("read only".to_string()))
    }

    fn update_score_record_aggregates(
        &self,
        _firm_id: &FirmId,
        _composite: &CompositeScores,
    ) -> Result<(), RepositoryError> {
        Err(RepositoryError::Unavailable("read only".to_string()))
    }
}

#[derive(Default)]
pub(super) struct MemoryReviews {
    reviews: Mutex<HashMap<ReviewId, Review>>,
}

impl ReviewRepository for MemoryReviews {
    fn insert(&self, review: Review) -> Result<Review, RepositoryError> {
        let mut guard = self.reviews.lock().expect("review mutex poisoned");
        if guard.contains_key(&review.id) {
            return Err(RepositoryError::Conflict);
        }
        guard.insert(review.id.clone(), review.clone());
        Ok(review)
    }

    fn update(&self, review: Review) -> Result<(), RepositoryError> {
        let mut guard = self.reviews.lock().expect("review mutex poisoned");
        if !guard.contains_key(&review.id) {
            return Err(RepositoryError::NotFound);
        }
        guard.insert(review.id.clone(), review);
        Ok(())
    }

    fn fetch(&self, id: &ReviewId) -> Result<Option<Review>, RepositoryError> {
        let guard = self.reviews.lock().expect("review mutex poisoned");
        Ok(guard.get(id).cloned())
    }
}

pub(super) struct Harness {
    pub(super) model: Arc<ScoreModel>,
    pub(super) scores: Arc<MemoryScores>,
    pub(super) engine: Arc<DeductionEngine<MemoryFirms, MemoryScores>>,
}

/// One firm per `(id, total_payout)` pair, each seeded with full marks.
pub(super) fn harness(firms: &[(&str, f64)]) -> Harness {
    let model = model();
    let profiles = firms
        .iter()
        .map(|(id, payout)| FirmProfile::new(firm_id(id), format!("Firm {id}"), *payout))
        .collect();
    let scores = Arc::new(MemoryScores::default());
    for (id, _) in firms {
        scores.seed(ScoreRecord::full_marks(firm_id(id), &model));
    }
    let engine = Arc::new(DeductionEngine::new(
        model.clone(),
        Arc::new(MemoryFirms::with(profiles)),
        scores.clone(),
    ));
    Harness {
        model,
        scores,
        engine,
    }
}

pub(super) fn review_service(
    harness: &Harness,
) -> (
    ReviewService<MemoryReviews, MemoryFirms, MemoryScores>,
    Arc<MemoryReviews>,
) {
    let reviews = Arc::new(MemoryReviews::default());
    let service = ReviewService::new(reviews.clone(), harness.engine.clone());
    (service, reviews)
}

pub(super) async fn read_json_body(response: Response) -> Value {
    let body = axum::body::to_bytes(response.into_body(), 64 * 1024)
        .await
        .expect("read body");
    serde_json::from_slice(&body).expect("json payload")
}
