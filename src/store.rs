//! Snapshot merge and persistence.

use chrono::{DateTime, Utc};
use std::io;
use std::path::{Path, PathBuf};
use tokio::fs;
use tokio::io::AsyncWriteExt;
use tracing::{debug, info, warn};

use crate::error::{TickError, TickResult};
use crate::models::{CheckResult, Snapshot, StatusRecord};
use crate::target::TargetDescriptor;

/// Builds the next snapshot from this tick's results.
///
/// One record per valid id in `targets`; ids that are no longer listed are
/// dropped. `players`/`version` come only from the fresh result. `prev` is
/// read solely to log state transitions.
pub fn merge(
    prev: &Snapshot,
    targets: &[TargetDescriptor],
    results: &[CheckResult],
    now: DateTime<Utc>,
) -> Snapshot {
    let mut next = Snapshot::new();

    for (target, cur) in targets.iter().zip(results) {
        let Some(id) = target.id.as_deref() else {
            continue;
        };

        let record = if cur.is_disabled() || cur.is_skipped() {
            StatusRecord { online: false, last_check_at: now, players: None, version: None }
        } else {
            StatusRecord {
                online: cur.online,
                last_check_at: now,
                players: cur.players,
                version: cur.version.clone(),
            }
        };

        log_transition(id, prev.get(id), &record);
        if next.insert(id.to_string(), record).is_some() {
            warn!(id, "duplicate target id, keeping the last entry");
        }
    }

    let dropped = prev.keys().filter(|id| !next.contains_key(*id)).count();
    if dropped > 0 {
        debug!(count = dropped, "dropping records for targets no longer listed");
    }
    next
}

fn log_transition(id: &str, prev: Option<&StatusRecord>, next: &StatusRecord) {
    match prev {
        Some(old) if old.online && !next.online => warn!(id, "[CHANGE] online -> offline"),
        Some(old) if !old.online && next.online => info!(id, "[CHANGE] offline -> online"),
        None => debug!(id, online = next.online, "first observation"),
        _ => {}
    }
}

/// Loads the previous snapshot. A missing file is an empty snapshot; a file
/// that exists but does not parse is fatal.
pub async fn load_snapshot(path: &Path) -> TickResult<Snapshot> {
    let bytes = match fs::read(path).await {
        Ok(bytes) => bytes,
        Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(Snapshot::new()),
        Err(source) => {
            return Err(TickError::SnapshotUnreadable { path: path.to_path_buf(), source })
        }
    };
    serde_json::from_slice(&bytes).map_err(|e| TickError::SnapshotCorrupt {
        path: path.to_path_buf(),
        reason: e.to_string(),
    })
}

fn temp_sibling(path: &Path) -> PathBuf {
    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| "snapshot".into());
    let suffix = rand::random::<u64>();
    path.with_file_name(format!(".{}.{}.{:016x}.tmp", name, std::process::id(), suffix))
}

/// Writes `snapshot` so readers only ever see the old or the new file:
/// uniquely named sibling, fsync, then rename over `path`.
pub async fn persist(path: &Path, snapshot: &Snapshot) -> TickResult<()> {
    let write_err = |source| TickError::SnapshotWrite { path: path.to_path_buf(), source };

    let mut body = serde_json::to_vec_pretty(snapshot).map_err(|e| write_err(io::Error::other(e)))?;
    body.push(b'\n');

    if let Some(dir) = path.parent().filter(|d| !d.as_os_str().is_empty()) {
        fs::create_dir_all(dir).await.map_err(write_err)?;
    }

    let tmp = temp_sibling(path);
    let result = async {
        let mut file = fs::File::create(&tmp).await?;
        file.write_all(&body).await?;
        file.flush().await?;
        file.sync_all().await?;
        drop(file);
        fs::rename(&tmp, path).await
    }
    .await;

    if let Err(source) = result {
        let _ = fs::remove_file(&tmp).await;
        return Err(write_err(source));
    }
    debug!(path = %path.display(), records = snapshot.len(), "snapshot written");
    Ok(())
}
