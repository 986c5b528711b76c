use actix_cors::Cors;
use actix_web::dev::Service;
use actix_web::{middleware, web, App, HttpServer};
use anyhow::Context;
use credit_core::CreditStore;
use dotenv::dotenv;
use lending_service::{
    config::Config,
    database::Database,
    handlers,
    metrics::{self, HTTP_REQUESTS_TOTAL, HTTP_REQUEST_DURATION},
    services::LendingService,
};
use std::sync::Arc;
use std::time::Instant;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[actix_web::main]
async fn main() -> anyhow::Result<()> {
    dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_file(true)
        .with_line_number(true)
        .with_thread_ids(true)
        .with_target(false)
        .json()
        .init();

    let config = Config::from_env().context("Failed to load configuration")?;
    config
        .validate()
        .map_err(|e| anyhow::anyhow!("Invalid configuration: {}", e))?;

    metrics::register_metrics(&metrics::REGISTRY)
        .map_err(|e| anyhow::anyhow!("Failed to register metrics: {}", e))?;

    info!("Starting Lending Service on port {}", config.server.port);

    let db = Database::new(
        &config.database.url,
        config.database.max_connections,
        config.database.min_connections,
    )
    .await
    .context("Failed to connect to database")?;

    if config.database.run_migrations {
        db.run_migrations().await.context("Failed to run migrations")?;
    }

    let store: Arc<dyn CreditStore> = Arc::new(db);
    let policy = config.lending.policy();
    info!(
        "Lending policy: count_inactive_transactions={}, installment_scale={}",
        policy.count_inactive_transactions, policy.installment_scale
    );
    let lending_service = Arc::new(LendingService::new(store, policy));

    let auth = config.auth.clone();
    HttpServer::new(move || {
        let cors = Cors::permissive();
        let auth = auth.clone();

        App::new()
            .wrap_fn(|req, srv| {
                let method = req.method().to_string();
                let path = req.match_pattern().unwrap_or_else(|| req.path().to_string());
                let started = Instant::now();
                let fut = srv.call(req);

                async move {
                    let res = fut.await?;
                    HTTP_REQUESTS_TOTAL
                        .with_label_values(&[&method, &path, res.status().as_str()])
                        .inc();
                    HTTP_REQUEST_DURATION
                        .with_label_values(&[&method, &path])
                        .observe(started.elapsed().as_secs_f64());
                    Ok(res)
                }
            })
            .wrap(cors)
            .wrap(middleware::Logger::default())
            .wrap(middleware::NormalizePath::trim())
            .app_data(web::Data::new(lending_service.clone()))
            .configure(move |cfg| handlers::configure_routes(cfg, &auth))
    })
    .workers(config.server.workers)
    .bind((config.server.host.as_str(), config.server.port))?
    .run()
    .await?;

    Ok(())
}
