pub mod auth;
pub mod config;
pub mod generative;
pub mod logging;
pub mod response;
pub mod routes;
pub mod services;
pub mod state;
pub mod store;

use std::sync::Arc;

use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::auth::{CredentialStore, DocumentCredentialStore, SessionSigner};
use crate::config::Config;
use crate::generative::{ContentGenerator, GeminiClient, MockGenerator};
use crate::state::AppState;
use crate::store::{DocPaths, MemoryStore, StoreError, StoreProxy};

/// Wires the store, generator, credentials and session signer from `config`.
pub async fn build_state(config: &Config) -> Result<AppState, StoreError> {
    let store = match &config.snapshot_path {
        Some(path) => MemoryStore::open(path).await?,
        None => MemoryStore::new(),
    };
    let proxy = StoreProxy::new(Arc::new(store), DocPaths::new(&config.app_id));

    let generator: Arc<dyn ContentGenerator> = if config.llm_mock {
        tracing::info!("LLM_MOCK enabled, using canned content");
        Arc::new(MockGenerator::demo())
    } else {
        let client = GeminiClient::from_env();
        if !client.is_available() {
            tracing::warn!("GEMINI_API_KEY not set; generation requests will fall back");
        }
        Arc::new(client)
    };

    let secret = match &config.session_secret {
        Some(secret) => secret.clone(),
        None => {
            tracing::warn!("SESSION_SECRET not set; sessions will not survive a restart");
            format!("{}{}", uuid::Uuid::new_v4().simple(), uuid::Uuid::new_v4().simple())
        }
    };
    let sessions = Arc::new(SessionSigner::new(
        secret,
        chrono::Duration::hours(config.session_ttl_hours),
    ));

    let credentials: Arc<dyn CredentialStore> =
        Arc::new(DocumentCredentialStore::new(proxy.clone(), config.bcrypt_cost));
    seed_credentials(config, &credentials).await;

    Ok(AppState::new(proxy, generator, credentials, sessions))
}

async fn seed_credentials(config: &Config, credentials: &Arc<dyn CredentialStore>) {
    let mut seeds = Vec::new();
    if let Some(path) = &config.accounts_file {
        match auth::load_account_seeds(path).await {
            Ok(loaded) => seeds.extend(loaded),
            Err(err) => tracing::error!(error = %err, "failed to load accounts file"),
        }
    }
    if config.seed_demo_accounts {
        seeds.extend(auth::demo_account_seeds());
    }
    if seeds.is_empty() {
        return;
    }

    let created = auth::seed_accounts(credentials, seeds).await;
    tracing::info!(created, "account seeding finished");
}

pub fn create_app(state: AppState) -> axum::Router {
    routes::router(state)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
}
