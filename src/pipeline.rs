use std::io::Write;
use std::path::Path;
use std::time::Duration;

use tempfile::NamedTempFile;
use tracing::info;
use uuid::Uuid;

use crate::db::AppState;
use crate::error::{PipelineError, RunError, Step};
use crate::source::{wait_until_available, UserApi};
use crate::users::dto::UserRow;
use crate::users::repo;

/// Linear run states. A run either reaches `Loaded` or fails in whatever
/// state it was in; nothing done so far is rolled back.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunState {
    Pending,
    SchemaReady,
    ApiAvailable,
    Extracted,
    Transformed,
    Loaded,
}

/// Outcome of a successful run.
#[derive(Debug)]
pub struct RunReport {
    pub run_id: Uuid,
    pub rows_loaded: u64,
}

/// Probe the source until it answers, then extract once.
///
/// The probe is a pure readiness gate: when it times out, no fetch is
/// ever attempted.
pub async fn extract_when_available(
    api: &dyn UserApi,
    interval: Duration,
    max_wait: Duration,
) -> Result<serde_json::Value, RunError> {
    wait_until_available(api, interval, max_wait)
        .await
        .map_err(|e| RunError::new(Step::ProbeApi, e))?;
    info!(state = ?RunState::ApiAvailable, "source api answered");
    api.fetch()
        .await
        .map_err(|e| RunError::new(Step::Extract, e))
}

/// Transform: project the payload into one row and stage it in a
/// run-unique delimited buffer.
///
/// The file is deleted when the returned handle drops, so a failed load
/// still cleans up after itself.
pub fn stage_user(
    payload: serde_json::Value,
    buffer_dir: Option<&str>,
) -> Result<NamedTempFile, PipelineError> {
    let row = UserRow::from_payload(payload)?;
    let line = row.encode()?;

    let dir = buffer_dir
        .map(|d| Path::new(d).to_path_buf())
        .unwrap_or_else(std::env::temp_dir);
    let mut buffer = tempfile::Builder::new()
        .prefix("user-row-")
        .suffix(".csv")
        .tempfile_in(dir)
        .map_err(|e| PipelineError::Connectivity(format!("create transfer buffer: {e}")))?;
    writeln!(buffer, "{line}")
        .map_err(|e| PipelineError::Connectivity(format!("write transfer buffer: {e}")))?;
    buffer
        .flush()
        .map_err(|e| PipelineError::Connectivity(format!("flush transfer buffer: {e}")))?;
    Ok(buffer)
}

/// Execute the five steps strictly in sequence, failing the whole run on
/// the first error.
pub async fn run(state: &AppState, api: &dyn UserApi) -> Result<RunReport, RunError> {
    let run_id = Uuid::new_v4();
    info!(%run_id, state = ?RunState::Pending, "pipeline run started");

    repo::ensure_users_table(&state.db)
        .await
        .map_err(|e| RunError::new(Step::EnsureSchema, e))?;
    info!(%run_id, state = ?RunState::SchemaReady, "destination schema ensured");

    let interval = Duration::from_secs(state.config.probe.interval_secs);
    let max_wait = Duration::from_secs(state.config.probe.max_wait_secs);
    let payload = extract_when_available(api, interval, max_wait).await?;
    info!(%run_id, state = ?RunState::Extracted, "source record fetched");

    let buffer = stage_user(payload, state.config.buffer_dir.as_deref())
        .map_err(|e| RunError::new(Step::Transform, e))?;
    info!(%run_id, state = ?RunState::Transformed, buffer = %buffer.path().display(), "row staged");

    repo::verify_users_schema(&state.db)
        .await
        .map_err(|e| RunError::new(Step::Load, e))?;
    let rows_loaded = repo::copy_user_rows(&state.db, buffer.path())
        .await
        .map_err(|e| RunError::new(Step::Load, e))?;
    info!(%run_id, state = ?RunState::Loaded, rows_loaded, "pipeline run finished");

    Ok(RunReport {
        run_id,
        rows_loaded,
    })
}
