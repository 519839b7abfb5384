use std::sync::{Arc, Mutex};

use axum::routing::{delete, get, post, put};
use axum::Router;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing_subscriber::EnvFilter;

use salonbook::config::AppConfig;
use salonbook::db;
use salonbook::handlers;
use salonbook::services::clock::SystemClock;
use salonbook::services::loyalty::ConsoleLoyalty;
use salonbook::state::AppState;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let _ = dotenvy::dotenv();

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .init();

    let config = AppConfig::from_env();

    let conn = db::init_db(&config.database_url)?;

    let state = Arc::new(AppState {
        db: Arc::new(Mutex::new(conn)),
        config: config.clone(),
        clock: Box::new(SystemClock),
        loyalty: Box::new(ConsoleLoyalty),
    });

    let app = router(state);

    let addr = format!("0.0.0.0:{}", config.port);
    tracing::info!("starting server on {addr}");

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/health", get(handlers::health::health))
        .route("/api/treatments", get(handlers::slots::list_treatments))
        .route("/api/slots", get(handlers::slots::get_slots))
        .route("/api/slots/range", get(handlers::slots::get_slots_range))
        .route(
            "/api/appointments",
            get(handlers::appointments::list_my_appointments)
                .post(handlers::appointments::create_appointment),
        )
        .route(
            "/api/appointments/:id",
            delete(handlers::appointments::cancel_appointment),
        )
        .route(
            "/api/admin/appointments",
            get(handlers::admin::list_appointments),
        )
        .route(
            "/api/admin/appointments/pending",
            get(handlers::admin::list_pending),
        )
        .route("/api/admin/schedule", get(handlers::admin::get_schedule))
        .route(
            "/api/admin/appointments/:id/confirm",
            post(handlers::admin::confirm_appointment),
        )
        .route(
            "/api/admin/appointments/:id/reject",
            post(handlers::admin::reject_appointment),
        )
        .route(
            "/api/admin/appointments/:id/complete",
            post(handlers::admin::complete_appointment),
        )
        .route(
            "/api/admin/appointments/:id/no-show",
            post(handlers::admin::mark_no_show),
        )
        .route(
            "/api/admin/availability/weekly",
            get(handlers::availability::list_weekly).post(handlers::availability::create_weekly),
        )
        .route(
            "/api/admin/availability/weekly/:id",
            put(handlers::availability::update_weekly)
                .delete(handlers::availability::delete_weekly),
        )
        .route(
            "/api/admin/availability/weekly/day/:day",
            put(handlers::availability::replace_weekly_day),
        )
        .route(
            "/api/admin/availability/dates",
            get(handlers::availability::list_dates).post(handlers::availability::create_date),
        )
        .route(
            "/api/admin/availability/dates/:id",
            put(handlers::availability::update_date).delete(handlers::availability::delete_date),
        )
        .route(
            "/api/admin/availability/dates/date/:date",
            put(handlers::availability::replace_date),
        )
        .route(
            "/api/admin/availability/blocked",
            get(handlers::availability::list_blocked).post(handlers::availability::create_blocked),
        )
        .route(
            "/api/admin/availability/blocked/:id",
            delete(handlers::availability::delete_blocked),
        )
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}
