use axum::{
    body::Body,
    extract::{Path, Query, State},
    http::{header, StatusCode},
    response::Response,
};
use futures_util::StreamExt;
use tokio_util::io::ReaderStream;
use tracing::{info, warn};

use crate::api::errors::{ApiError, SNAPSHOT_UNAVAILABLE_MESSAGE};
use crate::api::router::AppState;
use crate::application::dto::{SnapshotQuery, SnapshotRequest};

const CSV_SUFFIX: &str = ".csv";

/// GET /{database}/{schema}/{view}.csv
/// Stream a CSV snapshot of a view
#[utoipa::path(
    get,
    path = "/{database}/{schema}/{file}",
    tag = "snapshots",
    params(
        ("database" = String, Path, description = "Database (catalog) name"),
        ("schema" = String, Path, description = "Schema name"),
        ("file" = String, Path, description = "View name followed by .csv"),
        SnapshotQuery
    ),
    responses(
        (status = 200, description = "CSV snapshot", body = String, content_type = "text/csv"),
        (status = 400, description = "A name is not a valid identifier"),
        (status = 404, description = "View not found or failed to generate CSV"),
        (status = 429, description = "Rate limit exceeded")
    )
)]
pub async fn snapshot_handler(
    State(state): State<AppState>,
    Path((database, schema, file)): Path<(String, String, String)>,
    Query(query): Query<SnapshotQuery>,
) -> Result<Response, ApiError> {
    let Some(view) = file.strip_suffix(CSV_SUFFIX) else {
        return Err(ApiError::not_found(SNAPSHOT_UNAVAILABLE_MESSAGE));
    };

    let request = SnapshotRequest {
        database,
        schema,
        view: view.to_string(),
        credential: query.motherduck_token,
    };

    let served = match tokio::time::timeout(
        state.request_timeout,
        state.materialize_use_case.execute(request),
    )
    .await
    {
        Ok(Ok(served)) => served,
        Ok(Err(e)) => {
            warn!(error = %e, "Snapshot request failed");
            return Err(e.into());
        }
        Err(_) => {
            warn!(
                timeout_secs = state.request_timeout.as_secs(),
                "Snapshot request timed out"
            );
            return Err(ApiError::not_found(SNAPSHOT_UNAVAILABLE_MESSAGE));
        }
    };

    info!(
        file = %served.file_name,
        size_bytes = served.size_bytes,
        cache = served.cache_status.as_str(),
        "Streaming CSV"
    );

    // The cleanup guard rides along with the body and fires once the stream
    // is finished or dropped.
    let cleanup = served.cleanup;
    let stream = ReaderStream::new(served.reader).map(move |chunk| {
        let _ = &cleanup;
        if let Err(e) = &chunk {
            warn!(error = %e, "Artifact stream failed");
        }
        chunk
    });

    Response::builder()
        .status(StatusCode::OK)
        .header(header::CONTENT_TYPE, served.content_type)
        .header(
            header::CONTENT_DISPOSITION,
            format!("attachment; filename=\"{}\"", served.file_name),
        )
        .header(header::CONTENT_LENGTH, served.size_bytes.to_string())
        .header("X-Cache", served.cache_status.as_str())
        .body(Body::from_stream(stream))
        .map_err(|e| ApiError::internal_error(format!("Failed to build response: {}", e)))
}
