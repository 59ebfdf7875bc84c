use std::sync::Arc;

use actix_web::middleware::NormalizePath;
use actix_web::web::Data;
use actix_web::{App, HttpServer};
use anyhow::Context;
use dotenvy::dotenv;

mod api;
mod auth;
mod config;
mod db;
mod docs;
mod error;
mod model;
mod models;
mod routes;
mod service;
mod store;
mod utils;

use config::Config;
use db::init_db;

use crate::auth::authz::{Authorizer, RoleAuthorizer};
use crate::docs::ApiDoc;
use crate::service::entitlement::EntitlementService;
use crate::service::leave_request::LeaveRequestService;
use crate::store::mysql::MySqlStore;
use tracing::info;
use tracing_appender::rolling;
use utoipa::OpenApi; // ← needed for ApiDoc::openapi()
use utoipa_swagger_ui::SwaggerUi;

#[actix_web::main]
async fn main() -> anyhow::Result<()> {
    dotenv().ok();

    let config = Config::from_env()?;

    // Rolling daily log
    let file_appender = rolling::daily("logs", "app.log");
    let (non_blocking, _guard) = tracing_appender::non_blocking(file_appender);

    tracing_subscriber::fmt()
        .with_writer(non_blocking)
        .with_max_level(tracing::Level::DEBUG)
        .with_ansi(false)
        .with_target(false) // removes module path
        .with_level(true)
        .with_thread_ids(false)
        .with_thread_names(false)
        .pretty()
        .init();

    info!(
        api_prefix = %config.api_prefix,
        strict_transitions = config.strict_transitions,
        balance_policy = %config.balance_policy,
        "Server starting..."
    );

    let pool = init_db(&config.database_url).await?;

    let store = Arc::new(MySqlStore::new(pool));
    let authz: Arc<dyn Authorizer> = Arc::new(RoleAuthorizer);
    let entitlements = EntitlementService::new(store.clone(), store.clone(), authz.clone());
    let requests = LeaveRequestService::new(store.clone(), store, authz, config.workflow());

    let limiter = Arc::new(
        routes::build_limiter(config.rate_protected_per_min)
            .context("RATE_PROTECTED_PER_MIN does not yield a valid quota")?,
    );

    // Clone values for the closure (avoid move issues)
    let server_addr = config.server_addr.clone();

    HttpServer::new(move || {
        App::new()
            .wrap(actix_web::middleware::Logger::default())
            .wrap(NormalizePath::trim())
            .service(
                SwaggerUi::new("/swagger-ui/{_:.*}") // ← important: wildcard {_:.*} to match JS/CSS files
                    .url("/api-doc/openapi.json", ApiDoc::openapi()),
            )
            .app_data(Data::new(config.clone()))
            .app_data(Data::new(entitlements.clone()))
            .app_data(Data::new(requests.clone()))
            // Configure protected routes with rate limiting
            .configure(|cfg| routes::configure(cfg, &config, limiter.clone()))
    })
    .bind(&server_addr)
    .with_context(|| format!("Failed to bind {}", server_addr))?
    .run()
    .await?;

    Ok(())
}
