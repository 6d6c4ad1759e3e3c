//! Jolli server: multi-tenant documentation platform.
//!
//! One process serves every tenant. The registry database maps slugs to
//! tenants; each tenant's content lives in its own SQLite file. Routes are
//! tenant-scoped through the [`tenancy::TenantCtx`] extractor.

mod error;
mod events;
mod routes;
mod sitegen;
mod storage;
mod tenancy;

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use axum::extract::FromRef;
use axum::routing::{delete, get, post, put};
use axum::Router;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing_subscriber::EnvFilter;

use crate::events::EventHub;
use crate::tenancy::TenantRegistry;

/// Seconds since the Unix epoch.
pub fn now_unix() -> u64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0)
}

// ── Configuration ─────────────────────────────────────────────────────────

#[derive(Clone)]
pub struct AppConfig {
    pub data_dir: PathBuf,
    pub jwt_secret: String,
    /// Shared secret for `/admin/bootstrap`. Empty disables the endpoint.
    pub manager_secret: String,
    pub multi_tenancy: bool,
    pub bootstrap_tolerance_secs: u64,
    pub deploy_hook_url: Option<String>,
    pub admin_email: String,
    pub port: u16,
}

fn env_or(key: &str, default: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| default.to_string())
}

impl AppConfig {
    fn from_env() -> Result<Self> {
        let jwt_secret = match std::env::var("JOLLI_JWT_SECRET") {
            Ok(secret) if !secret.is_empty() => secret,
            _ => {
                // Sessions will not survive a restart without a configured secret.
                tracing::warn!("JOLLI_JWT_SECRET is not set; using an ephemeral secret");
                jolli_api::crypto::generate_token()
                    .map_err(|e| anyhow::anyhow!("{e}"))
                    .context("generating ephemeral JWT secret")?
            }
        };
        Ok(Self {
            data_dir: PathBuf::from(env_or("JOLLI_DATA_DIR", "data")),
            jwt_secret,
            manager_secret: env_or("JOLLI_MANAGER_SECRET", ""),
            multi_tenancy: env_or("JOLLI_MULTI_TENANCY", "false") == "true",
            bootstrap_tolerance_secs: env_or("JOLLI_BOOTSTRAP_TOLERANCE_SECS", "300")
                .parse()
                .context("parsing JOLLI_BOOTSTRAP_TOLERANCE_SECS")?,
            deploy_hook_url: std::env::var("JOLLI_DEPLOY_HOOK_URL")
                .ok()
                .filter(|v| !v.is_empty()),
            admin_email: env_or("JOLLI_ADMIN_EMAIL", "admin@localhost"),
            port: env_or("PORT", "8080").parse().context("parsing PORT")?,
        })
    }
}

// ── State ─────────────────────────────────────────────────────────────────

#[derive(Clone, FromRef)]
pub struct AppState {
    pub registry: TenantRegistry,
    pub config: AppConfig,
    pub hub: Arc<EventHub>,
    pub http: reqwest::Client,
}

// ── Router ────────────────────────────────────────────────────────────────

fn api_router() -> Router<AppState> {
    Router::new()
        .route("/health", get(routes::health::health))
        // Auth
        .route("/auth/register", post(routes::auth::register))
        .route("/auth/login", post(routes::auth::login))
        .route("/auth/refresh", post(routes::auth::refresh))
        .route("/auth/logout", post(routes::auth::logout))
        .route("/auth/password", put(routes::auth::change_password))
        .route("/auth/me", get(routes::auth::me))
        .route("/auth/verify-email", post(routes::auth::verify_email))
        // Members
        .route("/users", get(routes::users::list_members))
        .route("/users/{id}", get(routes::users::get_member))
        .route("/users/{id}/archive", post(routes::users::archive_member))
        .route("/users/{id}/restore", post(routes::users::restore_member))
        .route("/users/{id}/role", put(routes::users::update_member_role))
        // Invitations
        .route(
            "/invitations",
            post(routes::users::create_invitation).get(routes::users::list_invitations),
        )
        .route(
            "/invitations/{id}/revoke",
            post(routes::users::revoke_invitation),
        )
        // Roles and permissions
        .route(
            "/roles",
            get(routes::roles::list_roles).post(routes::roles::create_role),
        )
        .route("/roles/{id}", delete(routes::roles::delete_role))
        .route(
            "/roles/{id}/permissions",
            post(routes::roles::grant_permission),
        )
        .route(
            "/roles/{id}/permissions/{key}",
            delete(routes::roles::revoke_permission),
        )
        .route("/permissions", get(routes::roles::list_permissions))
        // Spaces
        .route(
            "/spaces",
            post(routes::spaces::create_space).get(routes::spaces::list_spaces),
        )
        // Documents
        .route(
            "/docs",
            post(routes::docs::create_doc).get(routes::docs::list_docs),
        )
        .route("/docs/trash", get(routes::docs::list_trash))
        .route(
            "/docs/{id}",
            get(routes::docs::get_doc)
                .put(routes::docs::update_doc)
                .delete(routes::docs::delete_doc),
        )
        .route("/docs/{id}/move", post(routes::docs::move_doc))
        .route("/docs/{id}/restore", post(routes::docs::restore_doc))
        // Assets
        .route(
            "/assets",
            post(routes::assets::upload_asset).get(routes::assets::list_assets),
        )
        .route("/assets/sweep", post(routes::assets::sweep_assets))
        .route(
            "/assets/{id}",
            get(routes::assets::get_asset).delete(routes::assets::delete_asset),
        )
        .route("/assets/{id}/download", get(routes::assets::download_asset))
        // Integrations and webhooks
        .route(
            "/integrations",
            post(routes::integrations::create_integration)
                .get(routes::integrations::list_integrations),
        )
        .route(
            "/integrations/{id}",
            delete(routes::integrations::delete_integration),
        )
        .route("/webhooks/github", post(routes::webhooks::github))
        // Docsites
        .route(
            "/sites",
            post(routes::sites::create_site).get(routes::sites::list_sites),
        )
        .route("/sites/{id}", get(routes::sites::get_site))
        .route("/sites/{id}/builds", post(routes::sites::start_build))
        .route("/sites/{id}/events", get(routes::sites::build_events))
        // Chat
        .route(
            "/chat/messages",
            post(routes::chat::post_message).get(routes::chat::list_messages),
        )
        .route("/chat/events", get(routes::chat::org_events))
}

fn app(state: AppState) -> Router {
    Router::new()
        .nest("/api", api_router())
        .route("/admin/bootstrap", post(routes::admin::bootstrap))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}

/// In single-tenant mode the `default` tenant must exist before the first
/// request; its admin invitation token is surfaced in the log once.
fn ensure_default_tenant(registry: &TenantRegistry, config: &AppConfig) -> Result<()> {
    if config.multi_tenancy || registry.resolve("default").is_some() {
        return Ok(());
    }
    let out = registry
        .provision("default", "Jolli", &config.admin_email)
        .map_err(|e| anyhow::anyhow!("{e}"))?;
    tracing::info!(
        "created default tenant; admin invitation token for {}: {}",
        config.admin_email,
        out.invitation_token
    );
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("jolli_server=info,tower_http=info")),
        )
        .init();

    let config = AppConfig::from_env()?;
    let registry = TenantRegistry::open(&config.data_dir)?;
    ensure_default_tenant(&registry, &config)?;

    let state = AppState {
        registry,
        config: config.clone(),
        hub: Arc::new(EventHub::new()),
        http: reqwest::Client::new(),
    };

    let addr = format!("0.0.0.0:{}", config.port);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("binding {addr}"))?;
    tracing::info!("listening on {addr}");
    axum::serve(listener, app(state)).await?;
    Ok(())
}
