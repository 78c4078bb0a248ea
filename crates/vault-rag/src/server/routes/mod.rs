//! API routes

pub mod ask;
pub mod ingest;
pub mod status;

use axum::{
    extract::DefaultBodyLimit,
    routing::{delete, get, post},
    Router,
};

use crate::server::state::AppState;

/// Build all API routes
pub fn api_routes(max_upload_size: usize) -> Router<AppState> {
    Router::new()
        // Ingestion, with a larger body limit for uploads
        .route(
            "/ingest",
            post(ingest::ingest_files).layer(DefaultBodyLimit::max(max_upload_size)),
        )
        .route("/ask", post(ask::ask_question))
        .route("/status", get(status::session_status))
        .route("/knowledge", delete(status::reset_knowledge))
        .route("/info", get(info))
}

/// API info endpoint
async fn info() -> axum::Json<serde_json::Value> {
    axum::Json(serde_json::json!({
        "name": "vault-rag",
        "version": env!("CARGO_PKG_VERSION"),
        "description": "Question answering over uploaded PDFs, grounded in the documents",
        "endpoints": {
            "GET /": "Upload and question page",
            "POST /api/ingest": "Upload PDFs (multipart `files`, optional `options` JSON) and rebuild the knowledge base",
            "POST /api/ask": "Ask a question: {\"question\": \"...\"}",
            "GET /api/status": "Knowledge base state, chunk count and sources",
            "DELETE /api/knowledge": "Discard the knowledge base",
            "GET /health": "Liveness",
            "GET /ready": "200 once a knowledge base exists"
        }
    }))
}
