//! services/api/src/bin/api.rs

use api_lib::{
    adapters::{DbAdapter, GoogleIdentityAdapter, MemoryStore, OpenAiChatAdapter},
    config::Config,
    error::ApiError,
    web::{rest::ApiDoc, router, state::AppState},
};
use async_openai::{config::OpenAIConfig, Client};
use axum::{
    http::{
        header::{ACCEPT, AUTHORIZATION, CONTENT_TYPE},
        HeaderValue, Method,
    },
    Router,
};
use emotionverse_core::{
    conversation::ConversationController,
    identity::IdentityService,
    ports::{AuthStore, SessionStore},
};
use sqlx::postgres::PgPoolOptions;
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

#[tokio::main]
async fn main() -> Result<(), ApiError> {
    // --- 1. Load Configuration & Set Up Logging ---
    let config = Arc::new(Config::from_env()?);
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(config.log_level.to_string()))
        .with(tracing_subscriber::fmt::layer())
        .init();
    info!("Configuration loaded. Starting server...");

    // --- 2. Connect to the Message Store ---
    let (store, auth): (Arc<dyn SessionStore>, Arc<dyn AuthStore>) = match &config.database_url {
        Some(database_url) => {
            info!("Connecting to database...");
            let db_pool = PgPoolOptions::new()
                .max_connections(5)
                .connect(database_url)
                .await?;
            let db_adapter = Arc::new(DbAdapter::new(db_pool));
            info!("Running database migrations...");
            db_adapter.run_migrations().await?;
            info!("Database migrations complete.");
            (db_adapter.clone() as Arc<dyn SessionStore>, db_adapter as Arc<dyn AuthStore>)
        }
        None => {
            warn!("DATABASE_URL not set; chat history will only live in memory.");
            let memory = Arc::new(MemoryStore::new());
            (memory.clone() as Arc<dyn SessionStore>, memory as Arc<dyn AuthStore>)
        }
    };

    // --- 3. Initialize Service Adapters ---
    let openai_config = OpenAIConfig::new().with_api_key(
        config
            .openai_api_key
            .as_ref()
            .ok_or_else(|| ApiError::Internal("OPENAI_API_KEY is required".to_string()))?,
    );
    let openai_client = Client::with_config(openai_config);
    let model = Arc::new(OpenAiChatAdapter::new(
        openai_client,
        config.chat_model.clone(),
        config.single_shot_model.clone(),
    ));

    let google = Arc::new(GoogleIdentityAdapter::new(
        reqwest::Client::new(),
        config
            .google_client_id
            .clone()
            .ok_or_else(|| ApiError::Internal("GOOGLE_CLIENT_ID is required".to_string()))?,
        config
            .google_client_secret
            .clone()
            .ok_or_else(|| ApiError::Internal("GOOGLE_CLIENT_SECRET is required".to_string()))?,
        config.google_redirect_uri.clone(),
    ));
    let identity = Arc::new(IdentityService::new(
        google,
        config.sign_in_environments.clone(),
    ));

    let conversations = Arc::new(ConversationController::new(
        store,
        model,
        config.request_style,
    ));
    info!("Model request style: {}", config.request_style);

    // --- 4. Build the Shared AppState ---
    let app_state = Arc::new(AppState {
        config: config.clone(),
        auth,
        identity,
        conversations,
    });

    let cors_origin = config.cors_origin.parse::<HeaderValue>().map_err(|e| {
        ApiError::Internal(format!("Invalid CORS_ORIGIN '{}': {}", config.cors_origin, e))
    })?;
    let cors = CorsLayer::new()
        .allow_origin(cors_origin)
        .allow_credentials(true)
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers([AUTHORIZATION, CONTENT_TYPE, ACCEPT]);

    // --- 5. Create the Web Router ---
    // Merge the API router with the Swagger UI router for a complete application.
    let app = Router::new()
        .merge(router(app_state).layer(cors))
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()));

    // --- 6. Start the Server ---
    info!("Starting server on {}", config.bind_address);
    info!(
        "Swagger UI available at http://{}/swagger-ui",
        config.bind_address
    );
    let listener = tokio::net::TcpListener::bind(&config.bind_address).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
