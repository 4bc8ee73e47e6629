use std::path::Path;

use crate::auth::hash_password;
use crate::cache::SharedCache;
use crate::market::SharedMarketData;
use crate::model::entity::{UserEntity, UserEntityCreateUpdate};
use crate::model::{DbConnection, ModelManager};
use crate::utils::signal::shutdown_signal;
use crate::web::{AuthenticatedUser, UserRole};
use crate::{error::AppResult, web::AppState};
use axum::Router;
use sqlx::migrate::Migrator;
use tokio::net::TcpListener;

pub mod config;
pub use config::{Config, ConfigError, ConfigResult};

pub mod auth;
pub mod cache;
pub mod domain;
pub mod error;
pub mod market;
pub mod model;
pub mod utils;
pub mod web;

static APPLICATION_NAME: &str = "flf";

pub async fn build_server() -> AppResult<(AppState, Router)> {
    let use_local = cfg!(debug_assertions);
    let config = Config::get_or_init(use_local).await;
    let db = DbConnection::connect(config.app().database_uri())?;

    let migrator = Migrator::new(Path::new("./migrations"))
        .await
        .map_err(model::DatabaseError::from)?;
    tracing::debug!("applying migrations...");
    migrator
        .run(db.pool())
        .await
        .map_err(model::DatabaseError::from)?;

    let cache = cache::connect(config).await?;
    let market = market::build_provider(config, cache.clone())?;

    let mm = ModelManager::new(db);
    ensure_admin(&mm, config).await?;

    build_server_with(mm, cache, market, config)
}

pub fn build_server_with(
    mm: ModelManager,
    cache: SharedCache,
    market: SharedMarketData,
    config: &'static Config,
) -> AppResult<(AppState, Router)> {
    let state = AppState::new(mm, cache, market, config);
    let app = web::routes::build_app(state.clone());
    Ok((state, app))
}

/// Creates the configured admin account unless its email is already registered.
pub async fn ensure_admin(mm: &ModelManager, config: &Config) -> AppResult<()> {
    let Some((email, password)) = config.app().admin_credentials() else {
        return Ok(());
    };

    let system = AuthenticatedUser::admin();
    if UserEntity::find_by_email(mm, &system, email).await?.is_some() {
        return Ok(());
    }

    let username = email.split('@').next().unwrap_or(email).to_string();
    let data = UserEntityCreateUpdate {
        username,
        email: email.to_string(),
        password_hash: hash_password(password)?,
        first_name: None,
        last_name: None,
    };
    let admin = UserEntity::create_with_role(mm, &system, data, UserRole::Admin).await?;

    tracing::info!(user = %admin.id(), "admin account created");
    Ok(())
}

#[tracing::instrument]
pub async fn setup_workers() -> AppResult<()> {
    let (_, app) = build_server().await?;
    let config = Config::get_or_init(false).await;
    let listener = TcpListener::bind(config.host().bindto()).await?;

    tracing::info!("axum is starting at: {}", config.host().bindto());
    let axum_handle = axum::serve(listener, app).with_graceful_shutdown(shutdown_signal());

    axum_handle.await?;
    Ok(())
}

fn setup_trace() {
    use tracing_error::ErrorLayer;
    use tracing_subscriber::{filter::EnvFilter, fmt, prelude::*};

    // load .env file for RUST_LOG etc.
    let _ = dotenvy::dotenv();

    tracing_subscriber::registry()
        .with(fmt::layer())
        .with(EnvFilter::from_default_env())
        .with(ErrorLayer::default())
        .init();

    tracing::debug!("tracing initialized.");
}

#[tracing::instrument]
pub async fn run() -> AppResult<()> {
    setup_trace();
    setup_workers().await?;
    Ok(())
}
