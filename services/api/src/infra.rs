use metrics_exporter_prometheus::PrometheusHandle;
use prop_trust::scoring::{
    CompositeScores, FirmDirectory, FirmId, FirmProfile, RepositoryError, Review, ReviewId,
    ReviewRepository, ScoreRecord, ScoreStore, SubFactorChange, SubFactorPath,
};
use std::collections::HashMap;
use std::sync::atomic::AtomicBool;
use std::sync::{Arc, Mutex};
use tracing::debug;

#[derive(Clone)]
pub(crate) struct AppState {
    pub(crate) readiness: Arc<AtomicBool>,
    pub(crate) metrics: Arc<PrometheusHandle>,
}

/// Process-local firm directory.
#[derive(Default, Clone)]
pub(crate) struct InMemoryFirmDirectory {
    profiles: Arc<Mutex<HashMap<FirmId, FirmProfile>>>,
}

impl InMemoryFirmDirectory {
    pub(crate) fn upsert(&self, profile: FirmProfile) {
        let mut guard = self.profiles.lock().expect("firm mutex poisoned");
        guard.insert(profile.firm_id.clone(), profile);
    }
}

impl FirmDirectory for InMemoryFirmDirectory {
    fn firm_profile(&self, firm_id: &FirmId) -> Result<Option<FirmProfile>, RepositoryError> {
        let guard = self.profiles.lock().expect("firm mutex poisoned");
        Ok(guard.get(firm_id).cloned())
    }
}

/// Score documents keyed by firm. Deductions subtract and floor under a single
/// lock, so concurrent approvals for one firm serialize.
#[derive(Default, Clone)]
pub(crate) struct InMemoryScoreStore {
    records: Arc<Mutex<HashMap<FirmId, ScoreRecord>>>,
}

impl InMemoryScoreStore {
    pub(crate) fn insert(&self, record: ScoreRecord) -> Result<(), RepositoryError> {
        let mut guard = self.records.lock().expect("score mutex poisoned");
        if guard.contains_key(&record.firm_id) {
            return Err(RepositoryError::Conflict);
        }
        guard.insert(record.firm_id.clone(), record);
        Ok(())
    }
}

impl ScoreStore for InMemoryScoreStore {
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
        record.updated_at = Some(chrono::Utc::now());
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
        record.updated_at = Some(chrono::Utc::now());
        Ok(())
    }

    fn deduct_sub_factor(
        &self,
        firm_id: &FirmId,
        path: &SubFactorPath,
        amount: f64,
    ) -> Result<Option<SubFactorChange>, RepositoryError> {
        let mut guard = self.records.lock().expect("score mutex poisoned");
        let Some(record) = guard.get_mut(firm_id) else {
            return Ok(None);
        };
        let change = record.deduct(path, amount);
        record.updated_at = Some(chrono::Utc::now());
        debug!(firm = %firm_id, path = %path, previous = change.previous, current = change.current, "sub-factor deducted");
        Ok(Some(change))
    }
}

#[derive(Default, Clone)]
pub(crate) struct InMemoryReviewRepository {
    reviews: Arc<Mutex<HashMap<ReviewId, Review>>>,
}

impl ReviewRepository for InMemoryReviewRepository {
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
        if guard.contains_key(&review.id) {
            guard.insert(review.id.clone(), review);
            Ok(())
        } else {
            Err(RepositoryError::NotFound)
        }
    }

    fn fetch(&self, id: &ReviewId) -> Result<Option<Review>, RepositoryError> {
        let guard = self.reviews.lock().expect("review mutex poisoned");
        Ok(guard.get(id).cloned())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use prop_trust::scoring::{DeductionEngine, ScoreModel};

    #[test]
    fn parallel_deductions_serialize_on_one_firm() {
        let model = Arc::new(ScoreModel::standard());
        let firms = InMemoryFirmDirectory::default();
        let firm_id = FirmId("parallel".to_string());
        firms.upsert(FirmProfile::new(firm_id.clone(), "Parallel Prop", 15_000_000.0));
        let scores = InMemoryScoreStore::default();
        scores
            .insert(ScoreRecord::full_marks(firm_id.clone(), &model))
            .expect("seeded");
        let engine = Arc::new(DeductionEngine::new(
            model.clone(),
            Arc::new(firms),
            Arc::new(scores.clone()),
        ));

        std::thread::scope(|scope| {
            for _ in 0..4 {
                let engine = engine.clone();
                let firm_id = firm_id.clone();
                scope.spawn(move || {
                    for _ in 0..5 {
                        engine
                            .apply_complaint_deduction(&firm_id, "no_arbitrary_denials")
                            .expect("deduction applies");
                    }
                });
            }
        });

        let record = scores
            .score_record(&firm_id)
            .expect("read succeeds")
            .expect("record present");
        let path = model
            .resolve_sub_factor_path("no_arbitrary_denials")
            .expect("known sub-factor");
        let expected = 1.5 - 20.0 * 0.12 * 0.4;
        let actual = record.sub_factor(&path).expect("leaf present");
        assert!((actual - expected).abs() < 1e-9, "got {actual}");
        assert!(record.updated_at.is_some());
    }

    #[test]
    fn duplicate_score_record_is_a_conflict() {
        let model = ScoreModel::standard();
        let scores = InMemoryScoreStore::default();
        let firm_id = FirmId("dup".to_string());
        scores
            .insert(ScoreRecord::full_marks(firm_id.clone(), &model))
            .expect("first insert");
        assert!(matches!(
            scores.insert(ScoreRecord::full_marks(firm_id, &model)),
            Err(RepositoryError::Conflict)
        ));
    }
}
