use std::sync::Arc;

use actix_web::middleware::NormalizePath;
use actix_web::web::Data;
use actix_web::{App, HttpServer, Responder, get};
use anyhow::Context;

mod api;
mod auth;
mod config;
mod db;
mod docs;
mod engine;
mod error;
mod model;
mod models;
mod notify;
mod routes;
mod store;

use config::Config;
use db::init_db;

use crate::docs::ApiDoc;
use crate::notify::{EventSink, HttpPushDispatcher, LogDispatcher, PushDispatcher, PushNotifier};
use crate::store::{MySqlStore, SchoolStore};
use tracing::{info, warn};
use tracing_appender::rolling;
use utoipa::OpenApi; // ← needed for ApiDoc::openapi()
use utoipa_swagger_ui::SwaggerUi;

#[get("/")]
async fn index() -> impl Responder {
    "School ledger is running"
}

#[actix_web::main]
async fn main() -> anyhow::Result<()> {
    let config = Config::from_env()?;

    // Rolling daily log
    let file_appender = rolling::daily(&config.log_dir, "app.log");
    let (non_blocking, _guard) = tracing_appender::non_blocking(file_appender);

    let level: tracing::Level = config
        .log_level
        .parse()
        .with_context(|| format!("LOG_LEVEL has an invalid value: {}", config.log_level))?;

    tracing_subscriber::fmt()
        .with_writer(non_blocking)
        .with_max_level(level)
        .with_ansi(false)
        .with_target(false) // removes module path
        .with_level(true)
        .with_thread_ids(false)
        .with_thread_names(false)
        .pretty()
        .init();

    info!("Server starting...");

    let pool = init_db(&config).await?;
    let store: Arc<dyn SchoolStore> = Arc::new(MySqlStore::new(pool));

    let dispatcher: Arc<dyn PushDispatcher> = match &config.push_endpoint {
        Some(endpoint) => Arc::new(HttpPushDispatcher::new(endpoint.clone(), config.push_timeout)?),
        None => {
            warn!("PUSH_ENDPOINT not set; notifications will only be logged");
            Arc::new(LogDispatcher)
        }
    };
    let sink: Arc<dyn EventSink> = Arc::new(PushNotifier::new(store.clone(), dispatcher));

    let server_addr = config.server_addr.clone();
    let store_data: Data<dyn SchoolStore> = Data::from(store);
    let sink_data: Data<dyn EventSink> = Data::from(sink);

    HttpServer::new(move || {
        App::new()
            .wrap(actix_web::middleware::Logger::default())
            .wrap(NormalizePath::trim())
            .service(
                SwaggerUi::new("/swagger-ui/{_:.*}") // ← important: wildcard {_:.*} to match JS/CSS files
                    .url("/api-doc/openapi.json", ApiDoc::openapi()),
            )
            .app_data(store_data.clone())
            .app_data(sink_data.clone())
            .app_data(Data::new(config.clone()))
            .service(index)
            // protected routes with rate limiting
            .configure(|cfg| routes::configure(cfg, config.clone()))
    })
    .bind(&server_addr)
    .with_context(|| format!("failed to bind {server_addr}"))?
    .run()
    .await?;

    Ok(())
}
