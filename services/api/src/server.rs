use crate::cli::ServeArgs;
use crate::infra::{sample_project_context, sample_worksheet, AppState, SettlementDesk};
use crate::routes::with_settlement_routes;
use axum::Extension;
use axum_prometheus::PrometheusMetricLayer;
use std::sync::atomic::Ordering;
use std::sync::Arc;
use subcontract_settlement::config::AppConfig;
use subcontract_settlement::error::AppError;
use subcontract_settlement::telemetry;
use subcontract_settlement::workflows::risk_audit::{gateway_from_config, RiskAuditService};
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

    let gateway = gateway_from_config(&config.narration)?;
    let audit = RiskAuditService::new(Arc::from(gateway));
    let desk = SettlementDesk::new(sample_project_context(), sample_worksheet(), audit);

    let app = with_settlement_routes(desk)
        .layer(Extension(app_state))
        .layer(prometheus_layer);

    let addr = config.server.socket_addr()?;
    let listener = tokio::net::TcpListener::bind(addr).await?;
    readiness_flag.store(true, Ordering::Release);

    info!(
        ?config.environment,
        %addr,
        narration_enabled = config.narration.is_enabled(),
        "settlement calculator ready"
    );

    axum::serve(listener, app).await?;
    Ok(())
}
