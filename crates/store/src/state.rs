//! Per-thread snapshot store.
//!
//! One JSON file per thread under `<dir>/threads/`. A snapshot that no
//! longer parses is quarantined: the file is renamed aside and the
//! thread refuses further turns until an operator intervenes.

use std::path::{Path, PathBuf};

use wd_domain::error::{Error, Result};
use wd_domain::graph::GraphState;
use wd_domain::trace::TraceEvent;

const CORRUPT_SUFFIX: &str = "corrupt";

pub struct StateStore {
    dir: PathBuf,
}

impl StateStore {
    pub fn new(state_dir: &Path) -> Result<Self> {
        let dir = state_dir.join("threads");
        std::fs::create_dir_all(&dir).map_err(Error::Io)?;
        Ok(Self { dir })
    }

    /// Persist a snapshot atomically (temp sibling + rename).
    pub fn save(&self, state: &GraphState) -> Result<()> {
        crate::validate_id(&state.thread_id)?;
        let json = serde_json::to_string(state)
            .map_err(|e| Error::Other(format!("serializing state snapshot: {e}")))?;

        let path = self.snapshot_path(&state.thread_id);
        let tmp = path.with_extension("json.tmp");
        std::fs::write(&tmp, &json).map_err(Error::Io)?;
        std::fs::rename(&tmp, &path).map_err(Error::Io)?;

        TraceEvent::SnapshotPersisted {
            thread_id: state.thread_id.clone(),
            bytes: json.len(),
        }
        .emit();
        Ok(())
    }

    /// Load a thread's snapshot.
    ///
    /// `Ok(None)` when the thread has no snapshot yet. A snapshot that
    /// fails schema validation is renamed aside and the call returns
    /// [`Error::StateCorruption`]; the thread is quarantined from then on.
    pub fn load(&self, thread_id: &str) -> Result<Option<GraphState>> {
        crate::validate_id(thread_id)?;
        if self.is_quarantined(thread_id) {
            return Err(Error::StateCorruption(format!(
                "thread '{thread_id}' is quarantined"
            )));
        }

        let path = self.snapshot_path(thread_id);
        if !path.exists() {
            return Ok(None);
        }

        let raw = std::fs::read_to_string(&path).map_err(Error::Io)?;
        match serde_json::from_str::<GraphState>(&raw) {
            Ok(state) if state.thread_id == thread_id => Ok(Some(state)),
            Ok(state) => {
                self.quarantine(thread_id)?;
                Err(Error::StateCorruption(format!(
                    "snapshot for '{thread_id}' claims thread '{}'",
                    state.thread_id
                )))
            }
            Err(e) => {
                self.quarantine(thread_id)?;
                Err(Error::StateCorruption(format!(
                    "snapshot for '{thread_id}' failed validation: {e}"
                )))
            }
        }
    }

    /// Whether a thread has been quarantined by a failed load.
    pub fn is_quarantined(&self, thread_id: &str) -> bool {
        self.corrupt_path(thread_id).exists()
    }

    /// Remove a thread's snapshot (and any quarantine marker).
    pub fn delete(&self, thread_id: &str) -> Result<()> {
        crate::validate_id(thread_id)?;
        for path in [self.snapshot_path(thread_id), self.corrupt_path(thread_id)] {
            if path.exists() {
                std::fs::remove_file(&path).map_err(Error::Io)?;
            }
        }
        Ok(())
    }

    /// Thread ids with a live snapshot, sorted.
    pub fn list(&self) -> Result<Vec<String>> {
        let mut ids = Vec::new();
        for entry in std::fs::read_dir(&self.dir).map_err(Error::Io)? {
            let entry = entry.map_err(Error::Io)?;
            let name = entry.file_name().to_string_lossy().into_owned();
            if let Some(id) = name.strip_suffix(".json") {
                ids.push(id.to_owned());
            }
        }
        ids.sort();
        Ok(ids)
    }

    fn snapshot_path(&self, thread_id: &str) -> PathBuf {
        self.dir.join(format!("{thread_id}.json"))
    }

    fn corrupt_path(&self, thread_id: &str) -> PathBuf {
        self.dir.join(format!("{thread_id}.json.{CORRUPT_SUFFIX}"))
    }

    fn quarantine(&self, thread_id: &str) -> Result<()> {
        let from = self.snapshot_path(thread_id);
        let to = self.corrupt_path(thread_id);
        std::fs::rename(&from, &to).map_err(Error::Io)?;
        TraceEvent::ThreadQuarantined {
            thread_id: thread_id.to_owned(),
            reason: "snapshot failed validation".into(),
        }
        .emit();
        Ok(())
    }
}
