use crate::cli::ServeArgs;
use crate::infra::{
    AppState, SharedStore, StubStore, DEMO_ADMIN_EMAIL, DEMO_OTP, DEMO_STUDENT_EMAIL,
    DEMO_STUDENT_ID,
};
use crate::routes::portal_router;
use axum::Extension;
use axum_prometheus::PrometheusMetricLayer;
use excuse_portal::config::AppConfig;
use excuse_portal::error::AppError;
use excuse_portal::telemetry;
use std::sync::atomic::{AtomicBool, Ordering};
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
    let readiness_flag = Arc::new(AtomicBool::new(false));
    let app_state = AppState {
        readiness: readiness_flag.clone(),
        metrics: Arc::new(prometheus_handle),
    };

    let store = SharedStore::new(StubStore::seeded());
    let app = portal_router(store)
        .layer(Extension(app_state))
        .layer(prometheus_layer);

    let addr = config.server.socket_addr()?;
    let listener = tokio::net::TcpListener::bind(addr).await?;
    readiness_flag.store(true, Ordering::Release);

    info!(?config.environment, %addr, "stub portal backend ready");
    println!("Stub backend listening on http://{addr}/");
    println!("  student: {DEMO_STUDENT_EMAIL} / password {DEMO_STUDENT_ID}");
    println!("  admin:   {DEMO_ADMIN_EMAIL} / one-time code {DEMO_OTP}");

    axum::serve(listener, app).await?;
    Ok(())
}
