mod authentication;
mod cache;
pub mod config;
mod csrf;
mod data_formats;
mod db_helpers;
mod errors;
mod handlers;
mod media;
mod models;
mod pagination;

use std::{net::TcpListener, str::FromStr, sync::Arc};

use anyhow::Context;
pub use anyhow::Result;
use axum::{middleware, routing::*, Extension, Router};
pub use cache::PageCache;
pub use config::Config;
use handlers::*;
use media::MediaStore;
use sqlx::{
    sqlite::{SqliteConnectOptions, SqlitePoolOptions},
    SqlitePool,
};
use tower_http::{services::ServeDir, trace::TraceLayer};
use tracing::info;

/// Everything a handler needs, shared through an `Extension` layer.
#[derive(Clone)]
pub struct AppState {
    pub pool: SqlitePool,
    pub config: Arc<Config>,
    pub page_cache: PageCache,
    pub(crate) media: MediaStore,
}

impl AppState {
    pub async fn new(config: Config) -> Result<Self> {
        let pool = init_db(&config.database_url).await?;
        let media = MediaStore::new(config.media_root.clone())
            .await
            .with_context(|| format!("Failed to create media root {:?}", config.media_root))?;
        Ok(Self {
            pool,
            page_cache: PageCache::new(config.index_cache_ttl),
            media,
            config: Arc::new(config),
        })
    }
}

pub async fn init_db(db_url: &str) -> Result<SqlitePool> {
    let options = SqliteConnectOptions::from_str(db_url)
        .with_context(|| format!("Invalid DATABASE_URL {db_url}"))?
        .create_if_missing(true)
        .foreign_keys(true);
    let pool = SqlitePoolOptions::new()
        .connect_with(options)
        .await
        .with_context(|| format!("Failed to open database {db_url}"))?;
    info!(url = db_url, "Running migrations");
    sqlx::migrate!("./migrations")
        .run(&pool)
        .await
        .context("Failed to run migrations")?;
    info!("Migrations completed");
    Ok(pool)
}

pub fn make_router(state: AppState) -> Router {
    let media = ServeDir::new(state.media.root());
    Router::new()
        .route("/check_health", get(alive))
        .route("/", get(index))
        .route("/group/:slug/", get(group_posts))
        .route("/profile/:username/", get(profile))
        .route("/profile/:username/follow", get(profile_follow))
        .route("/profile/:username/unfollow", get(profile_unfollow))
        .route("/follow/", get(follow_index))
        .route("/posts/:post_id/", get(post_detail))
        .route("/posts/:post_id/edit/", get(post_edit_form).post(post_edit))
        .route("/posts/:post_id/comment", post(add_comment))
        .route("/create/", get(post_create_form).post(post_create))
        .route("/create/group/", get(group_create_form).post(group_create))
        .route("/auth/signup/", get(signup_form).post(signup))
        .route("/auth/login/", get(login_form).post(login))
        .route("/auth/logout/", get(logout).post(logout))
        .route("/about/author/", get(about_author))
        .route("/about/tech/", get(about_tech))
        .nest_service("/media", media)
        .fallback(not_found)
        .layer(middleware::from_fn(errors::not_found_with_path))
        .layer(middleware::from_fn(csrf::csrf_guard))
        .layer(Extension(state))
        .layer(TraceLayer::new_for_http())
}

pub async fn run_app(app: Router, listener: TcpListener) -> Result<()> {
    info!(address = ?listener.local_addr()?, "Server listening");
    axum::Server::from_tcp(listener)?
        .serve(app.into_make_service())
        .await?;
    Ok(())
}
