use crate::cli::ServeArgs;
use crate::demo::seed_demo_firms;
use crate::infra::{AppState, InMemoryFirmDirectory, InMemoryReviewRepository, InMemoryScoreStore};
use crate::routes::with_scoring_routes;
use axum::Extension;
use axum_prometheus::PrometheusMetricLayer;
use prop_trust::config::AppConfig;
use prop_trust::error::AppError;
use prop_trust::scoring::{DeductionEngine, ReviewService};
use std::sync::atomic::Ordering;
use std::sync::Arc;
use tracing::info;

pub(crate) async fn run(mut config: AppConfig, mut args: ServeArgs) -> Result<(), AppError> {
    if let Some(host) = args.host.take() {
        config.server.host = host;
    }
    if let Some(port) = args.port.take() {
        config.server.port = port;
    }

    let model = Arc::new(config.scoring.load_model()?);
    let model_source = config
        .scoring
        .model_path
        .as_ref()
        .map(|path| path.display().to_string())
        .unwrap_or_else(|| "built-in".to_string());
    info!(
        source = %model_source,
        categories = model.categories().count(),
        "score model loaded"
    );

    let (prometheus_layer, prometheus_handle) = PrometheusMetricLayer::pair();
    let readiness_flag = Arc::new(std::sync::atomic::AtomicBool::new(false));
    let app_state = AppState {
        readiness: readiness_flag.clone(),
        metrics: Arc::new(prometheus_handle),
    };

    let firms = InMemoryFirmDirectory::default();
    let scores = InMemoryScoreStore::default();
    if args.seed_demo {
        let seeded = seed_demo_firms(&model, &firms, &scores);
        info!(firms = seeded, "demo firms seeded");
    }

    let engine = Arc::new(DeductionEngine::new(
        model,
        Arc::new(firms),
        Arc::new(scores),
    ));
    let review_service = Arc::new(ReviewService::new(
        Arc::new(InMemoryReviewRepository::default()),
        engine,
    ));

    let app = with_scoring_routes(review_service)
        .layer(Extension(app_state))
        .layer(prometheus_layer);

    let addr = config.server.socket_addr()?;
    let listener = tokio::net::TcpListener::bind(addr).await?;
    readiness_flag.store(true, Ordering::Release);

    info!(?config.environment, %addr, "prop trust index service ready");

    axum::serve(listener, app).await?;
    Ok(())
}
