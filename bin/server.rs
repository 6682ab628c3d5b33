// Saham - Web Lookup Server
// One form page, one JSON endpoint

use axum::{
    extract::{Query, State},
    response::{Html, IntoResponse, Json},
    routing::get,
    Router,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tracing_subscriber::EnvFilter;

use saham::{store, Config, LookupOutcome, LookupService};

/// Shared application state
#[derive(Clone)]
struct AppState {
    lookups: Arc<LookupService>,
}

/// API Response wrapper
#[derive(Serialize)]
struct ApiResponse<T> {
    success: bool,
    data: T,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
}

impl<T> ApiResponse<T> {
    fn ok(data: T) -> Self {
        Self {
            success: true,
            data,
            error: None,
        }
    }
}

#[derive(Deserialize)]
struct LookupParams {
    #[serde(default)]
    code: String,
}

/// Lookup response: `status` is one of "found", "not_found", "invalid"
#[derive(Serialize)]
struct LookupResponse {
    status: &'static str,
    national_code: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    total_shares: Option<i64>,
}

// ============================================================================
// API Handlers
// ============================================================================

/// GET /api/health - Health check
async fn health_check() -> impl IntoResponse {
    Json(ApiResponse::ok("OK"))
}

/// GET /api/lookup?code=... - Share count for one national code
async fn lookup_shares(
    State(state): State<AppState>,
    Query(params): Query<LookupParams>,
) -> impl IntoResponse {
    let code = params.code.trim().to_string();

    let response = match state.lookups.lookup(&code).await {
        LookupOutcome::Found(total_shares) => LookupResponse {
            status: "found",
            national_code: code,
            total_shares: Some(total_shares),
        },
        LookupOutcome::NotFound => LookupResponse {
            status: "not_found",
            national_code: code,
            total_shares: None,
        },
        LookupOutcome::InvalidFormat => LookupResponse {
            status: "invalid",
            national_code: code,
            total_shares: None,
        },
    };

    Json(ApiResponse::ok(response))
}

/// GET / - Serve the lookup form
async fn serve_index() -> impl IntoResponse {
    Html(include_str!("../web/index.html"))
}

// ============================================================================
// Main Server
// ============================================================================

#[tokio::main]
async fn main() {
    println!("🌐 Saham - Share Lookup Server");
    println!("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");

    dotenvy::dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive("saham=info".parse().unwrap()))
        .with_target(false)
        .init();

    let config = Config::from_env();

    // An embedded store only exists after the first import; refuse to
    // serve an empty register.
    if let Some(path) = store::sqlite_file(&config.database_url) {
        if !path.exists() {
            eprintln!("❌ Database file '{}' not found.", path.display());
            eprintln!("   Run: saham import");
            eprintln!("   to load the register first.");
            std::process::exit(1);
        }
    }

    let share_store = store::connect(&config.database_url)
        .await
        .expect("Failed to open the share store");
    println!("✓ Store opened: {}", config.database_url);

    let state = AppState {
        lookups: Arc::new(LookupService::new(Arc::from(share_store))),
    };

    // Build API routes
    let api_routes = Router::new()
        .route("/health", get(health_check))
        .route("/lookup", get(lookup_shares))
        .with_state(state);

    // Build main router
    let app = Router::new()
        .route("/", get(serve_index))
        .nest("/api", api_routes)
        .layer(CorsLayer::permissive());

    // Start server
    let listener = tokio::net::TcpListener::bind(&config.bind_addr)
        .await
        .expect("Failed to bind to address");

    println!("\n🚀 Server running on http://{}", config.bind_addr);
    println!("   API: http://{}/api/lookup?code=...", config.bind_addr);
    println!("\n   Press Ctrl+C to stop\n");

    axum::serve(listener, app)
        .await
        .expect("Failed to start server");
}
