use axum::{Extension, Router};
use std::sync::Arc;
use tower_http::cors::CorsLayer;

mod cloudconvert_client;
mod cloudinary_client;
mod config;
mod did_client;
mod error;
mod fish_audio_client;
mod handlers;
mod job_store;
mod middleware;
mod models;
mod openai_client;
mod pipeline;
mod stability_client;
mod tmpfiles_client;
mod youtube_client;

use job_store::JobStore;
use pipeline::{Pipeline, PollPolicy, Providers};

/// Shared application state: the pipeline plus the concrete provider
/// clients the narrow endpoints call directly.
pub struct AppState {
    pub providers: Providers,
    pub pipeline: Pipeline,
    pub did_client: did_client::DidClient,
    pub fish_audio_client: fish_audio_client::FishAudioClient,
    pub stability_client: stability_client::StabilityClient,
    pub cloudconvert_client: cloudconvert_client::CloudConvertClient,
    pub youtube_client: youtube_client::YouTubeClient,
}

#[tokio::main]
async fn main() {
    // Load environment variables from .env file
    dotenvy::dotenv().ok();

    init_logging().expect("Failed to initialize logging");

    // Load-time providers are required; the process refuses to start
    // without their credentials.
    let config = match config::Config::from_env() {
        Ok(config) => config,
        Err(e) => {
            tracing::error!("configuration error: {}", e);
            std::process::exit(1);
        }
    };

    let did_client = did_client::DidClient::new(config.d_id_api_key.clone());
    let fish_audio_client = fish_audio_client::FishAudioClient::new(config.fish_audio_api_key.clone());
    let stability_client = stability_client::StabilityClient::new(config.hugging_face_api_key.clone());
    let cloudconvert_client = cloudconvert_client::CloudConvertClient::new(config.cloudconvert_api_key.clone());
    let tmpfiles_client = tmpfiles_client::TmpFilesClient::new();
    let youtube_client = youtube_client::YouTubeClient::new();

    // Lazily wired providers degrade to a logged no-op or a call-time
    // upstream error instead of refusing to start.
    if config.openai_api_key.is_none() {
        tracing::warn!("OPENAI_API_KEY not found. Prompt-to-video script generation will fail.");
    }
    let openai_client = openai_client::OpenAiClient::new(config.openai_api_key.clone());

    let publisher: Arc<dyn pipeline::providers::PublishVideo> = match config.cloudinary.clone() {
        Some(cloudinary) => {
            tracing::info!("Initializing Cloudinary video storage...");
            Arc::new(cloudinary_client::CloudinaryClient::new(
                cloudinary.cloud_name,
                cloudinary.api_key,
                cloudinary.api_secret,
            ))
        }
        None => {
            tracing::warn!("Cloudinary credentials not found. Video publishing will fail.");
            Arc::new(cloudinary_client::UnconfiguredPublisher)
        }
    };

    let store: Arc<dyn JobStore> = match config.supabase.clone() {
        Some(supabase) => {
            tracing::info!("Initializing Supabase job store...");
            Arc::new(job_store::SupabaseStore::new(supabase))
        }
        None => {
            tracing::warn!("SUPABASE_URL or SUPABASE_KEY not set. Job records will not be saved.");
            Arc::new(job_store::NoopStore)
        }
    };

    let providers = Providers {
        script: Arc::new(openai_client),
        avatar: Arc::new(stability_client.clone()),
        speech: Arc::new(fish_audio_client.clone()),
        animator: Arc::new(did_client.clone()),
        publisher,
        media: Arc::new(tmpfiles_client),
        store,
    };
    let pipeline = Pipeline::new(providers.clone(), PollPolicy::default());

    let shared_state = Arc::new(AppState {
        providers,
        pipeline,
        did_client,
        fish_audio_client,
        stability_client,
        cloudconvert_client,
        youtube_client,
    });

    let app = Router::new()
        .merge(handlers::animation::animation_routes())
        .merge(handlers::voice::voice_routes())
        .merge(handlers::storage::storage_routes())
        .merge(handlers::video::video_routes())
        .merge(handlers::generate::generate_routes())
        .merge(handlers::prompt::prompt_routes())
        .merge(handlers::youtube::youtube_routes())
        .route("/api/status", axum::routing::get(api_status))
        .layer(axum::middleware::from_fn(middleware::logging::request_logging_middleware))
        .layer(CorsLayer::permissive())
        .layer(Extension(shared_state.clone()));

    let listener = tokio::net::TcpListener::bind(&config.bind_addr)
        .await
        .expect("Failed to bind listener");
    tracing::info!("listening on {}", listener.local_addr().unwrap());
    axum::serve(listener, app).await.expect("server error");
}

fn init_logging() -> Result<(), Box<dyn std::error::Error>> {
    use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer};

    let log_level = std::env::var("RUST_LOG").unwrap_or_else(|_| {
        if cfg!(debug_assertions) {
            "debug,promptcast=trace,reqwest=info,hyper=info,tower=info".to_string()
        } else {
            "info,promptcast=info,reqwest=warn,hyper=warn,tower=warn".to_string()
        }
    });

    let env_filter = EnvFilter::try_from_default_env().or_else(|_| EnvFilter::try_new(&log_level))?;

    let fmt_layer = if std::env::var("LOG_FORMAT").as_deref() == Ok("json") {
        fmt::layer()
            .json()
            .with_current_span(true)
            .with_span_list(false)
            .with_target(true)
            .boxed()
    } else {
        fmt::layer()
            .with_target(true)
            .with_file(true)
            .with_line_number(true)
            .boxed()
    };

    tracing_subscriber::registry()
        .with(env_filter)
        .with(fmt_layer)
        .init();

    tracing::info!("PromptCast starting up...");
    tracing::info!("Version: {}", env!("CARGO_PKG_VERSION"));
    tracing::info!(
        "Build mode: {}",
        if cfg!(debug_assertions) { "development" } else { "production" }
    );

    Ok(())
}

async fn api_status() -> axum::response::Json<serde_json::Value> {
    use serde_json::json;

    axum::response::Json(json!({
        "status": "operational",
        "version": env!("CARGO_PKG_VERSION"),
        "endpoints": {
            "status": "/api/status",
            "generate": "/api/generate",
            "prompt_to_video": "/api/prompt-to-video",
            "animation": "/animation/*",
            "voice": "/voice/*",
            "storage": "/storage/upload-video",
            "video": "/video/*",
            "youtube": "/youtube/upload"
        }
    }))
}
