use actix_web::middleware::NormalizePath;
use actix_web::web::Data;
use actix_web::{App, HttpServer, Responder, get};
use dotenvy::dotenv;
use std::sync::Arc;

mod api;
mod auth;
mod config;
mod db;
mod docs;
mod errors;
mod model;
mod models;
mod repo;
mod report;
mod routes;
mod sync;
#[cfg(test)]
mod testutil;
mod utils;

use config::Config;
use db::init_db;

use crate::docs::ApiDoc;
use crate::repo::attendance::{AttendanceStore, SqlAttendanceRepo};
use crate::repo::employee::{EmployeeDirectory, SqlEmployeeDirectory};
use crate::sync::client::{TimeDoctorClient, TimesheetProvider};
use crate::sync::reconciler::Reconciler;
use crate::sync::scheduler;
use tracing::info;
use tracing_appender::rolling;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

#[get("/")]
async fn index() -> impl Responder {
    "HRM Attendance Service"
}

#[actix_web::main]
async fn main() -> anyhow::Result<()> {
    dotenv().ok();

    let config = Config::from_env();

    // Rolling daily log
    let file_appender = rolling::daily("logs", "app.log");
    let (non_blocking, _guard) = tracing_appender::non_blocking(file_appender);

    tracing_subscriber::fmt()
        .with_writer(non_blocking)
        .with_max_level(tracing::Level::DEBUG)
        .with_ansi(false)
        .with_target(false)
        .with_level(true)
        .with_thread_ids(false)
        .with_thread_names(false)
        .pretty()
        .init();

    info!("Attendance service starting...");

    let pool = init_db(&config.database_url).await;

    let provider: Arc<dyn TimesheetProvider> = Arc::new(TimeDoctorClient::new(&config)?);
    let store: Arc<dyn AttendanceStore> = Arc::new(SqlAttendanceRepo::new(pool.clone()));
    let directory: Arc<dyn EmployeeDirectory> = Arc::new(SqlEmployeeDirectory::new(pool.clone()));
    let reconciler = Arc::new(Reconciler::new(
        provider,
        directory.clone(),
        store.clone(),
    ));

    // Periodic provider sync runs on the server's runtime; no request blocks on it.
    scheduler::spawn(reconciler.clone(), config.sync_interval_secs);

    let server_addr = config.server_addr.clone();
    let config_data = config.clone();

    HttpServer::new(move || {
        App::new()
            .wrap(actix_web::middleware::Logger::default())
            .wrap(NormalizePath::trim())
            .service(
                SwaggerUi::new("/swagger-ui/{_:.*}")
                    .url("/api-doc/openapi.json", ApiDoc::openapi()),
            )
            .app_data(Data::new(config.clone()))
            .app_data(Data::from(store.clone()))
            .app_data(Data::from(directory.clone()))
            .app_data(Data::from(reconciler.clone()))
            .service(index)
            .configure(|cfg| routes::configure(cfg, config_data.clone()))
    })
    .bind(server_addr)?
    .run()
    .await?;

    Ok(())
}
