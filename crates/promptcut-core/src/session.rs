//! Session store - the versioned, undoable history state machine
//!
//! A session is EMPTY until ingest creates version 0, then always AT(i)
//! for some retained index i. `edit` creates version i+1 from AT(i),
//! destroying any versions beyond i first (branching rewrites the future);
//! `undo` only moves the pointer and destroys nothing. Exactly one
//! `preview.mp4` alias always denotes the version at the pointer.
//!
//! Per-session serialization: every mutating operation holds that session's
//! async mutex for its whole duration, so concurrent edits of one session
//! cannot interleave their read-modify-write of `history.json`.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use chrono::Utc;
use dashmap::DashMap;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use promptcut_plugins::PluginRegistry;

use crate::error::{EditError, SessionError};
use crate::orchestrator::Orchestrator;
use crate::planner::Planner;
use crate::types::{History, HistoryEntry, SessionId};

const HISTORY_FILE: &str = "history.json";
const PREVIEW_LINK: &str = "preview.mp4";

/// Result of a (possibly no-op) edit.
#[derive(Debug)]
pub struct EditReport {
    /// The session edited
    pub session: SessionId,
    /// The index the session points at after the edit
    pub index: usize,
    /// Artifact filename at that index
    pub artifact: String,
    /// True when the plan was empty and no version was created
    pub no_op: bool,
}

/// Stores sessions under a root directory and serializes access per session.
pub struct SessionStore {
    root: PathBuf,
    locks: DashMap<SessionId, Arc<Mutex<()>>>,
}

impl SessionStore {
    /// Store rooted at `root`. The directory is created on first ingest.
    #[must_use]
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            locks: DashMap::new(),
        }
    }

    /// Directory of one session.
    #[must_use]
    pub fn session_dir(&self, id: SessionId) -> PathBuf {
        self.root.join(id.to_string())
    }

    fn lock_for(&self, id: SessionId) -> Arc<Mutex<()>> {
        self.locks
            .entry(id)
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .value()
            .clone()
    }

    /// EMPTY → AT(0): create a session whose version 0 is a copy of
    /// `source`.
    pub async fn ingest(&self, source: &Path) -> Result<SessionId, SessionError> {
        let id = SessionId::new();
        let dir = self.session_dir(id);
        std::fs::create_dir_all(&dir)?;

        let original = "proxy0.mp4";
        std::fs::copy(source, dir.join(original))?;
        let history = History::initial(original);
        persist(&dir, &history)?;
        repoint_preview(&dir, original)?;

        info!(session = %id, source = %source.display(), "session ingested");
        Ok(id)
    }

    /// Load a session's history without taking its lock.
    pub fn history(&self, id: SessionId) -> Result<History, SessionError> {
        load(&self.session_dir(id), id)
    }

    /// AT(i) → AT(max(0, i-k)): move the pointer back `k` versions.
    ///
    /// Destroys nothing; every version stays redoable by editing from a
    /// base index or undone further.
    pub async fn undo(&self, id: SessionId, k: usize) -> Result<usize, SessionError> {
        let lock = self.lock_for(id);
        let _guard = lock.lock().await;

        let dir = self.session_dir(id);
        let mut history = load(&dir, id)?;
        let target = history.current_index.saturating_sub(k);
        history.current_index = target;
        let artifact = history
            .current()
            .map(|e| e.output.clone())
            .ok_or(SessionError::InvalidIndex {
                index: target,
                tip: history.tip(),
            })?;
        persist(&dir, &history)?;
        repoint_preview(&dir, &artifact)?;

        info!(session = %id, index = target, "undo");
        Ok(target)
    }

    /// AT(i) → AT(i+1): plan and execute one edit instruction.
    ///
    /// `base_index` edits from an arbitrary retained version, equivalent to
    /// undoing to it first. Versions beyond the base are destroyed before
    /// planning; on any pipeline failure no new version is created.
    pub async fn edit(
        &self,
        id: SessionId,
        prompt: &str,
        base_index: Option<usize>,
        planner: &dyn Planner,
        registry: &PluginRegistry,
        orchestrator: &Orchestrator,
    ) -> Result<EditReport, EditError> {
        let lock = self.lock_for(id);
        let _guard = lock.lock().await;

        let dir = self.session_dir(id);
        let mut history = load(&dir, id)?;

        if let Some(base) = base_index {
            if base > history.tip() {
                return Err(EditError::Session(SessionError::InvalidIndex {
                    index: base,
                    tip: history.tip(),
                }));
            }
            history.current_index = base;
        }

        truncate_beyond_pointer(&dir, &mut history)?;
        persist(&dir, &history).map_err(EditError::Session)?;

        let current = history
            .current()
            .ok_or(EditError::Session(SessionError::InvalidIndex {
                index: history.current_index,
                tip: history.tip(),
            }))?;
        let current_artifact = current.output.clone();
        let next_index = history.current_index + 1;
        // The pointer may have moved (and the old target been truncated);
        // the preview alias must track it even if the pipeline fails below.
        repoint_preview(&dir, &current_artifact).map_err(EditError::Session)?;

        let plan = planner.plan(prompt, registry).await?;
        let outcome = orchestrator
            .run_plan(&plan, prompt, &dir, &current_artifact, next_index)
            .await?;

        let Some(outcome) = outcome else {
            debug!(session = %id, "no-op edit");
            return Ok(EditReport {
                session: id,
                index: history.current_index,
                artifact: current_artifact,
                no_op: true,
            });
        };

        history.history.push(HistoryEntry {
            index: next_index,
            script: Some(format!("edit{}.py", next_index - 1)),
            prompt: prompt.to_string(),
            output: outcome.artifact.clone(),
            created_at: Utc::now(),
            steps: outcome.steps,
        });
        history.current_index = next_index;
        if let Err(e) = persist(&dir, &history) {
            discard_unrecorded(&dir, next_index);
            return Err(EditError::Session(e));
        }
        repoint_preview(&dir, &outcome.artifact).map_err(EditError::Session)?;

        info!(session = %id, index = next_index, artifact = %outcome.artifact, "edit recorded");
        Ok(EditReport {
            session: id,
            index: next_index,
            artifact: outcome.artifact,
            no_op: false,
        })
    }
}

/// Destroy every version past the pointer: artifact file, script file, and
/// history entry. A no-op at the tip.
fn truncate_beyond_pointer(dir: &Path, history: &mut History) -> Result<(), SessionError> {
    let pointer = history.current_index;
    if pointer >= history.tip() {
        return Ok(());
    }
    for entry in history.history.iter().filter(|e| e.index > pointer) {
        remove_quietly(&dir.join(&entry.output));
        if entry.index > 0 {
            remove_quietly(&dir.join(format!("edit{}.py", entry.index - 1)));
        }
    }
    history.history.retain(|e| e.index <= pointer);
    debug!(pointer, "history truncated");
    Ok(())
}

/// Remove a promoted artifact and script that no history entry records.
/// Called when persisting the entry for version `index` failed after the
/// orchestrator had already written both files into the session dir.
fn discard_unrecorded(dir: &Path, index: usize) {
    remove_quietly(&dir.join(format!("proxy{index}.mp4")));
    if index > 0 {
        remove_quietly(&dir.join(format!("edit{}.py", index - 1)));
    }
}

fn remove_quietly(path: &Path) {
    if let Err(e) = std::fs::remove_file(path) {
        if e.kind() != std::io::ErrorKind::NotFound {
            warn!(path = %path.display(), error = %e, "could not remove stale file");
        }
    }
}

fn load(dir: &Path, id: SessionId) -> Result<History, SessionError> {
    if !dir.is_dir() {
        return Err(SessionError::UnknownSession(id.to_string()));
    }
    let raw = std::fs::read_to_string(dir.join(HISTORY_FILE)).map_err(|e| {
        SessionError::CorruptHistory {
            session: id.to_string(),
            detail: format!("cannot read {HISTORY_FILE}: {e}"),
        }
    })?;
    serde_json::from_str(&raw).map_err(|e| SessionError::CorruptHistory {
        session: id.to_string(),
        detail: e.to_string(),
    })
}

fn persist(dir: &Path, history: &History) -> Result<(), SessionError> {
    let raw = serde_json::to_string_pretty(history).map_err(|e| SessionError::CorruptHistory {
        session: dir.display().to_string(),
        detail: e.to_string(),
    })?;
    std::fs::write(dir.join(HISTORY_FILE), raw)?;
    Ok(())
}

#[cfg(unix)]
fn repoint_preview(dir: &Path, artifact: &str) -> Result<(), SessionError> {
    let link = dir.join(PREVIEW_LINK);
    remove_quietly(&link);
    std::os::unix::fs::symlink(artifact, &link)?;
    Ok(())
}

#[cfg(not(unix))]
fn repoint_preview(dir: &Path, artifact: &str) -> Result<(), SessionError> {
    let link = dir.join(PREVIEW_LINK);
    remove_quietly(&link);
    std::fs::copy(dir.join(artifact), &link)?;
    Ok(())
}
