use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::process::Command;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use super::domain::{EventId, SeismicEvent};
use super::scml::{self, ScmlError};

/// Storage key for one event: its identifier plus the origin-time folder it lives in.
///
/// Only the identifier decides whether an event was already recorded; the origin
/// time places the record on disk.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct CatalogKey {
    pub event_id: EventId,
    pub origin_time: DateTime<Utc>,
}

impl CatalogKey {
    pub fn new(event_id: EventId, origin_time: DateTime<Utc>) -> Self {
        Self {
            event_id,
            origin_time,
        }
    }

    pub fn for_event(event: &SeismicEvent) -> Option<Self> {
        event
            .event_id()
            .map(|event_id| Self::new(event_id, event.origin_time))
    }

    /// `<YYYYmmddHHMMSS>/<event id>.json`
    pub fn relative_path(&self) -> PathBuf {
        PathBuf::from(self.origin_time.format("%Y%m%d%H%M%S").to_string())
            .join(format!("{}.json", self.event_id))
    }
}

/// Durable record of processed events. `exists` is the authoritative dedup check
/// and answers by event identifier alone.
pub trait EventCatalog: Send + Sync {
    fn exists(&self, key: &CatalogKey) -> Result<bool, CatalogError>;
    fn persist(&self, key: &CatalogKey, event: &SeismicEvent) -> Result<(), CatalogError>;
}

#[derive(Debug, thiserror::Error)]
pub enum CatalogError {
    #[error("catalog io failure at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("unable to encode catalog record: {0}")]
    Encode(#[from] serde_json::Error),
    #[error(transparent)]
    Scml(#[from] ScmlError),
    #[error("dispatch command `{command}` failed: {detail}")]
    Dispatch { command: String, detail: String },
    #[error("catalog unavailable: {0}")]
    Unavailable(String),
}

impl CatalogError {
    fn io(path: &Path, source: std::io::Error) -> Self {
        Self::Io {
            path: path.to_path_buf(),
            source,
        }
    }
}

/// Body written for every recorded event.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CatalogRecord {
    pub event_id: EventId,
    pub recorded_at: DateTime<Utc>,
    pub event: SeismicEvent,
}

/// External program run against each freshly written SCML record, e.g. `scdb -i`.
/// The record path is appended as the final argument.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DispatchCommand {
    program: String,
    args: Vec<String>,
}

impl DispatchCommand {
    /// Splits on whitespace; `None` for a blank command line.
    pub fn parse(raw: &str) -> Option<Self> {
        let mut parts = raw.split_whitespace().map(str::to_string);
        let program = parts.next()?;
        Some(Self {
            program,
            args: parts.collect(),
        })
    }

    pub fn display(&self) -> String {
        if self.args.is_empty() {
            self.program.clone()
        } else {
            format!("{} {}", self.program, self.args.join(" "))
        }
    }

    fn run(&self, record: &Path) -> Result<(), CatalogError> {
        let output = Command::new(&self.program)
            .args(&self.args)
            .arg(record)
            .output()
            .map_err(|err| CatalogError::Dispatch {
                command: self.display(),
                detail: err.to_string(),
            })?;

        if output.status.success() {
            Ok(())
        } else {
            let stderr = String::from_utf8_lossy(&output.stderr);
            Err(CatalogError::Dispatch {
                command: self.display(),
                detail: format!("{} {}", output.status, stderr.trim()),
            })
        }
    }
}

/// Filesystem catalog below `root`:
///
/// - `<YYYYmmddHHMMSS>/<id>.json` holds the internal record.
/// - `<YYYYmmddHHMMSS>/<id>.xml` holds the SCML handed to the dispatch command.
/// - `ids/<id>` marks the identifier as recorded and points at the JSON record.
///
/// The index marker is written last, so an event whose dispatch fails is retried
/// on the next poll.
#[derive(Debug, Clone)]
pub struct FileCatalog {
    root: PathBuf,
    dispatch: Option<DispatchCommand>,
}

const INDEX_DIR: &str = "ids";

impl FileCatalog {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            dispatch: None,
        }
    }

    pub fn with_dispatch(mut self, dispatch: DispatchCommand) -> Self {
        self.dispatch = Some(dispatch);
        self
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn record_path(&self, key: &CatalogKey) -> PathBuf {
        self.root.join(key.relative_path())
    }

    pub fn scml_path(&self, key: &CatalogKey) -> PathBuf {
        self.record_path(key).with_extension("xml")
    }

    pub fn index_path(&self, event_id: &EventId) -> PathBuf {
        self.root.join(INDEX_DIR).join(event_id.as_str())
    }

    fn dispatch_record(
        &self,
        dispatch: &DispatchCommand,
        key: &CatalogKey,
        event: &SeismicEvent,
    ) -> Result<(), CatalogError> {
        let body = scml::to_scml(event, &key.event_id)?;
        let path = self.scml_path(key);
        write_atomic(&key.event_id, &path, &body)?;

        debug!(event_id = %key.event_id, command = %dispatch.display(), "dispatching record");
        dispatch.run(&path)?;
        info!(event_id = %key.event_id, path = %path.display(), "finished dispatching");
        Ok(())
    }

    fn discard(&self, key: &CatalogKey) {
        for path in [self.record_path(key), self.scml_path(key)] {
            match fs::remove_file(&path) {
                Ok(()) => {}
                Err(err) if err.kind() == ErrorKind::NotFound => {}
                Err(err) => warn!(
                    event_id = %key.event_id,
                    path = %path.display(),
                    error = %err,
                    "failed to remove catalog record after dispatch failure"
                ),
            }
        }
    }
}

impl EventCatalog for FileCatalog {
    fn exists(&self, key: &CatalogKey) -> Result<bool, CatalogError> {
        let path = self.index_path(&key.event_id);
        match fs::metadata(&path) {
            Ok(metadata) => Ok(metadata.is_file()),
            Err(err) if err.kind() == ErrorKind::NotFound => Ok(false),
            Err(err) => Err(CatalogError::io(&path, err)),
        }
    }

    fn persist(&self, key: &CatalogKey, event: &SeismicEvent) -> Result<(), CatalogError> {
        let path = self.record_path(key);
        ensure_dir(&path)?;

        let record = CatalogRecord {
            event_id: key.event_id.clone(),
            recorded_at: Utc::now(),
            event: event.clone(),
        };
        let body = serde_json::to_vec_pretty(&record)?;
        write_atomic(&key.event_id, &path, &body)?;

        if let Some(dispatch) = &self.dispatch {
            if let Err(err) = self.dispatch_record(dispatch, key, event) {
                self.discard(key);
                return Err(err);
            }
        }

        let index = self.index_path(&key.event_id);
        ensure_dir(&index)?;
        let pointer = key.relative_path().to_string_lossy().into_owned();
        write_atomic(&key.event_id, &index, pointer.as_bytes())
    }
}

fn ensure_dir(path: &Path) -> Result<(), CatalogError> {
    match path.parent() {
        Some(dir) if !dir.is_dir() => {
            fs::create_dir_all(dir).map_err(|err| CatalogError::io(dir, err))?;
            info!(folder = %dir.display(), "created catalog folder");
            Ok(())
        }
        _ => Ok(()),
    }
}

/// Writes `body` to `<path>.partial` and renames it into place. The staging file
/// never outlives a failed write.
fn write_atomic(event_id: &EventId, path: &Path, body: &[u8]) -> Result<(), CatalogError> {
    let mut staging = path.as_os_str().to_owned();
    staging.push(".partial");
    let staging = PathBuf::from(staging);

    let result = fs::write(&staging, body)
        .map_err(|err| CatalogError::io(&staging, err))
        .and_then(|()| fs::rename(&staging, path).map_err(|err| CatalogError::io(path, err)));

    if result.is_err() {
        match fs::remove_file(&staging) {
            Ok(()) => {}
            Err(err) if err.kind() == ErrorKind::NotFound => {}
            Err(err) => warn!(
                event_id = %event_id,
                path = %staging.display(),
                error = %err,
                "failed to remove staging file"
            ),
        }
    }
    result
}
