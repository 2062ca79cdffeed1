use crate::cli::ServeArgs;
use crate::infra::{seed_demo_profiles, AppState, LoggingNotificationPublisher};
use crate::routes::with_sponsorship_routes;
use axum::Extension;
use axum_prometheus::PrometheusMetricLayer;
use sponsor_match::config::AppConfig;
use sponsor_match::error::AppError;
use sponsor_match::telemetry;
use sponsor_match::workflows::sponsorship::{InMemoryStore, SponsorshipMatchingService};
use std::sync::atomic::Ordering;
use std::sync::Arc;
use tracing::info;

pub(crate) async fn run(mut args: ServeArgs) -> Result<(), AppError> {
    let mut config = AppConfig::load()?;

    if let Some(host) = args.host.take() {
        config.server.host = host;
    }
    if let Some(port) = args.port.take() {
        config.server.port = port;
    }

    telemetry::init(&config.telemetry)?;

    let (prometheus_layer, prometheus_handle) = PrometheusMetricLayer::pair();
    let readiness_flag = Arc::new(std::sync::atomic::AtomicBool::new(false));
    let app_state = AppState {
        readiness: readiness_flag.clone(),
        metrics: Arc::new(prometheus_handle),
    };

    let store = Arc::new(InMemoryStore::new());
    if args.seed_demo {
        seed_demo_profiles(&store).map_err(|err| AppError::Sponsorship(err.into()))?;
        info!("demo student and sponsor profiles loaded");
    }

    let notifier = Arc::new(LoggingNotificationPublisher::default());
    let service = SponsorshipMatchingService::new(store, notifier, config.matching.clone());
    let rules = service.initialize_rules();
    info!(rules = rules.len(), "matching rules loaded");

    let app = with_sponsorship_routes(Arc::new(service))
        .layer(Extension(app_state))
        .layer(prometheus_layer);

    let addr = config.server.socket_addr()?;
    let listener = tokio::net::TcpListener::bind(addr).await?;
    readiness_flag.store(true, Ordering::Release);

    info!(?config.environment, %addr, "sponsorship matching service ready");

    axum::serve(listener, app).await?;
    Ok(())
}
