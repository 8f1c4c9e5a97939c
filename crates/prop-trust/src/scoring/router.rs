use std::sync::Arc;

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, patch, post},
    Router,
};
use serde::{Deserialize, Serialize};
use serde_json::json;

use super::deduction::DeductionError;
use super::domain::{FirmId, ReviewId, ReviewStatus};
use super::model::{CategoryDefinition, PillarWeights, ScoreModel, SlabThreshold};
use super::repository::{FirmDirectory, RepositoryError, ReviewRepository, ScoreStore};
use super::service::{ReviewService, ReviewServiceError};

/// Router builder exposing score lookups and review moderation.
pub fn scoring_router<R, F, S>(service: Arc<ReviewService<R, F, S>>) -> Router
where
    R: ReviewRepository + 'static,
    F: FirmDirectory + 'static,
    S: ScoreStore + 'static,
{
    Router::new()
        .route("/api/v1/score-model", get(model_handler::<R, F, S>))
        .route(
            "/api/v1/firms/:firm_id/score",
            get(score_handler::<R, F, S>),
        )
        .route(
            "/api/v1/firms/:firm_id/score/refresh",
            post(refresh_handler::<R, F, S>),
        )
        .route("/api/v1/reviews", post(submit_review_handler::<R, F, S>))
        .route(
            "/api/v1/reviews/:review_id",
            get(review_handler::<R, F, S>),
        )
        .route(
            "/api/v1/reviews/:review_id/status",
            patch(review_status_handler::<R, F, S>),
        )
        .with_state(service)
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct ReviewSubmission {
    pub(crate) id: String,
    pub(crate) firm_id: String,
    #[serde(default)]
    pub(crate) related_sub_factor: Option<String>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct StatusUpdate {
    pub(crate) status: ReviewStatus,
}

#[derive(Debug, Serialize)]
pub(crate) struct ScoreModelView<'a> {
    pub(crate) weights: &'a PillarWeights,
    pub(crate) categories: Vec<&'a CategoryDefinition>,
    pub(crate) slabs: &'a [SlabThreshold],
}

impl<'a> ScoreModelView<'a> {
    pub(crate) fn from_model(model: &'a ScoreModel) -> Self {
        Self {
            weights: model.weights(),
            categories: model.categories().collect(),
            slabs: model.schedule().thresholds(),
        }
    }
}

fn error_response(status: StatusCode, message: impl Into<String>) -> Response {
    let payload = json!({ "error": message.into() });
    (status, axum::Json(payload)).into_response()
}

fn repository_error_response(error: &RepositoryError) -> Response {
    match error {
        RepositoryError::NotFound => error_response(StatusCode::NOT_FOUND, error.to_string()),
        RepositoryError::Conflict => error_response(StatusCode::CONFLICT, error.to_string()),
        RepositoryError::Unavailable(_) => {
            error_response(StatusCode::SERVICE_UNAVAILABLE, error.to_string())
        }
    }
}

pub(crate) async fn model_handler<R, F, S>(
    State(service): State<Arc<ReviewService<R, F, S>>>,
) -> Response
where
    R: ReviewRepository + 'static,
    F: FirmDirectory + 'static,
    S: ScoreStore + 'static,
{
    let view = ScoreModelView::from_model(service.engine().model());
    (StatusCode::OK, axum::Json(view)).into_response()
}

pub(crate) async fn score_handler<R, F, S>(
    State(service): State<Arc<ReviewService<R, F, S>>>,
    Path(firm_id): Path<String>,
) -> Response
where
    R: ReviewRepository + 'static,
    F: FirmDirectory + 'static,
    S: ScoreStore + 'static,
{
    let firm_id = FirmId(firm_id);
    match service.engine().scores().score_record(&firm_id) {
        Ok(Some(record)) => (StatusCode::OK, axum::Json(record)).into_response(),
        Ok(None) => error_response(
            StatusCode::NOT_FOUND,
            format!("firm {firm_id} has no score record"),
        ),
        Err(err) => repository_error_response(&err),
    }
}

pub(crate) async fn refresh_handler<R, F, S>(
    State(service): State<Arc<ReviewService<R, F, S>>>,
    Path(firm_id): Path<String>,
) -> Response
where
    R: ReviewRepository + 'static,
    F: FirmDirectory + 'static,
    S: ScoreStore + 'static,
{
    let firm_id = FirmId(firm_id);
    match service.engine().refresh_aggregates(&firm_id) {
        Ok(composite) => (StatusCode::OK, axum::Json(composite)).into_response(),
        Err(DeductionError::Repository(err)) => repository_error_response(&err),
        Err(err @ DeductionError::ScoreRecordMissing(_)) => {
            error_response(StatusCode::NOT_FOUND, err.to_string())
        }
        Err(err) => error_response(StatusCode::UNPROCESSABLE_ENTITY, err.to_string()),
    }
}

pub(crate) async fn submit_review_handler<R, F, S>(
    State(service): State<Arc<ReviewService<R, F, S>>>,
    axum::Json(submission): axum::Json<ReviewSubmission>,
) -> Response
where
    R: ReviewRepository + 'static,
    F: FirmDirectory + 'static,
    S: ScoreStore + 'static,
{
    let ReviewSubmission {
        id,
        firm_id,
        related_sub_factor,
    } = submission;

    match service.submit(ReviewId(id), FirmId(firm_id), related_sub_factor) {
        Ok(review) => (StatusCode::CREATED, axum::Json(review)).into_response(),
        Err(ReviewServiceError::Repository(err)) => repository_error_response(&err),
    }
}

pub(crate) async fn review_handler<R, F, S>(
    State(service): State<Arc<ReviewService<R, F, S>>>,
    Path(review_id): Path<String>,
) -> Response
where
    R: ReviewRepository + 'static,
    F: FirmDirectory + 'static,
    S: ScoreStore + 'static,
{
    match service.get(&ReviewId(review_id)) {
        Ok(review) => (StatusCode::OK, axum::Json(review)).into_response(),
        Err(ReviewServiceError::Repository(err)) => repository_error_response(&err),
    }
}

pub(crate) async fn review_status_handler<R, F, S>(
    State(service): State<Arc<ReviewService<R, F, S>>>,
    Path(review_id): Path<String>,
    axum::Json(update): axum::Json<StatusUpdate>,
) -> Response
where
    R: ReviewRepository + 'static,
    F: FirmDirectory + 'static,
    S: ScoreStore + 'static,
{
    match service.update_status(&ReviewId(review_id), update.status) {
        Ok(transition) => (StatusCode::OK, axum::Json(transition)).into_response(),
        Err(ReviewServiceError::Repository(err)) => repository_error_response(&err),
    }
}
