//! Document ingestion endpoint

use axum::{
    extract::{Multipart, State},
    Json,
};

use crate::error::{Error, Result};
use crate::server::state::AppState;
use crate::types::{IngestOptions, IngestReport, UploadedFile};

/// POST /api/ingest - Upload PDFs and rebuild the knowledge base
pub async fn ingest_files(
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> Result<Json<IngestReport>> {
    let mut files = Vec::new();
    let mut options = IngestOptions::default();

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| Error::InvalidInput(format!("Failed to read multipart field: {}", e)))?
    {
        let name = field.name().unwrap_or("").to_string();

        if name == "options" {
            let data = field
                .bytes()
                .await
                .map_err(|e| Error::InvalidInput(format!("Failed to read options: {}", e)))?;
            options = serde_json::from_slice(&data)
                .map_err(|e| Error::InvalidInput(format!("Invalid options: {}", e)))?;
            continue;
        }

        let filename = field
            .file_name()
            .map(|s| s.to_string())
            .unwrap_or_else(|| format!("upload_{}.pdf", files.len() + 1));

        let data = field.bytes().await.map_err(|e| {
            Error::InvalidInput(format!("Failed to read file '{}': {}", filename, e))
        })?;

        tracing::debug!("Received {} ({} bytes)", filename, data.len());
        files.push(UploadedFile::new(filename, data));
    }

    let report = state.session().ingest(files, options).await?;
    Ok(Json(report))
}
