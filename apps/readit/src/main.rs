use actix_web::{web, App, HttpServer};
use db_infra::config::db::RuntimeEnv;
use db_infra::infra::db::build_app_pool;
use readit::routes;
use readit::state::AppState;
use readit::telemetry;

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    telemetry::init_tracing();

    // Environment variables must be set by the runtime environment:
    // - Docker: Set via compose env_file or docker run --env-file
    // - Local dev: Source env files manually (e.g., set -a; . ./.env; set +a)
    let host = std::env::var("READIT_HOST").unwrap_or_else(|_| "0.0.0.0".to_string());
    let port = std::env::var("READIT_PORT")
        .unwrap_or_else(|_| "8080".to_string())
        .parse::<u16>()
        .unwrap_or_else(|_| {
            eprintln!("❌ READIT_PORT must be a valid port number");
            std::process::exit(1);
        });

    println!("🚀 Starting readit on http://{}:{}", host, port);

    let db = match build_app_pool(RuntimeEnv::Prod).await {
        Ok(db) => db,
        Err(e) => {
            eprintln!("❌ Failed to connect to the database: {e}");
            std::process::exit(1);
        }
    };

    println!("✅ Database connected");

    let data = web::Data::new(AppState::new(db));

    HttpServer::new(move || {
        App::new()
            .app_data(data.clone())
            .configure(routes::configure)
    })
    .bind((host.as_str(), port))?
    .run()
    .await
}
