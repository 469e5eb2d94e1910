use actix_web::{web, HttpResponse};
use sea_orm::{ConnectionTrait, DatabaseBackend, Statement};
use tracing::warn;

use crate::error::AppError;
use crate::state::AppState;

async fn health() -> Result<HttpResponse, AppError> {
    Ok(HttpResponse::Ok().body("ok"))
}

/// Readiness probe: a round trip through the pool.
async fn health_db(state: web::Data<AppState>) -> Result<HttpResponse, AppError> {
    let stmt = Statement::from_string(DatabaseBackend::Postgres, "SELECT 1 AS alive");
    state.db.query_one(stmt).await.map_err(|e| {
        warn!(error = %e, "database ping failed");
        AppError::db_unavailable(format!("database ping failed: {e}"))
    })?;
    Ok(HttpResponse::Ok().body("ok"))
}

pub fn configure_routes(cfg: &mut actix_web::web::ServiceConfig) {
    cfg.route("/health", web::get().to(health))
        .route("/health/db", web::get().to(health_db));
}
