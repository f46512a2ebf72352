//! Saved, partially completed forms.

use std::collections::BTreeMap;
use std::fmt;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::sync::Mutex;

use chrono::{DateTime, Duration, Utc};
use rand::Rng;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::FormState;

const ID_PREFIX: &str = "draft-";
const RANDOM_LEN: usize = 9;
const BASE36: &[u8; 36] = b"0123456789abcdefghijklmnopqrstuvwxyz";

/// Identifier of a saved draft, e.g. `draft-1718000000000-k3j9x0q2m`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct DraftId(String);

impl DraftId {
    /// A fresh id from the save time in milliseconds and nine random base-36 digits.
    #[must_use]
    pub fn generate(now: DateTime<Utc>) -> Self {
        let mut rng = rand::thread_rng();
        let random: String = (0..RANDOM_LEN)
            .map(|_| char::from(BASE36[rng.gen_range(0..BASE36.len())]))
            .collect();
        Self(format!("{ID_PREFIX}{}-{random}", now.timestamp_millis()))
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for DraftId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for DraftId {
    type Err = DraftError;

    /// Only ids that are safe to use as file names are accepted.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let body = s
            .strip_prefix(ID_PREFIX)
            .ok_or_else(|| DraftError::InvalidId(s.to_owned()))?;
        let valid = !body.is_empty()
            && body
                .chars()
                .all(|c| c.is_ascii_digit() || c.is_ascii_lowercase() || c == '-');
        if valid {
            Ok(Self(s.to_owned()))
        } else {
            Err(DraftError::InvalidId(s.to_owned()))
        }
    }
}

impl TryFrom<String> for DraftId {
    type Error = DraftError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        s.parse()
    }
}

impl From<DraftId> for String {
    fn from(id: DraftId) -> Self {
        id.0
    }
}

/// A form snapshot and when it was saved.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Draft {
    pub id: DraftId,
    pub form: FormState,
    pub saved_at: DateTime<Utc>,
}

impl Draft {
    #[must_use]
    pub fn new(form: FormState, now: DateTime<Utc>) -> Self {
        Self {
            id: DraftId::generate(now),
            form,
            saved_at: now,
        }
    }

    /// Whether the draft was saved more than `max_age` before `now`.
    #[must_use]
    pub fn is_expired(&self, now: DateTime<Utc>, max_age: Duration) -> bool {
        now.signed_duration_since(self.saved_at) > max_age
    }
}

#[cfg(feature = "binary-drafts")]
impl Draft {
    /// Encode into the checksummed binary envelope.
    ///
    /// # Errors
    ///
    /// Returns [`SerializeError`](crate::serial::SerializeError) if encoding fails.
    pub fn to_bytes(&self) -> Result<Vec<u8>, crate::serial::SerializeError> {
        crate::serial::encode(self)
    }

    /// Decode a draft previously produced by [`to_bytes`](Self::to_bytes).
    ///
    /// # Errors
    ///
    /// Returns [`DeserializeError`](crate::serial::DeserializeError) on
    /// format, integrity, or validation failure.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, crate::serial::DeserializeError> {
        crate::serial::decode(bytes)
    }
}

#[derive(Debug, Error)]
pub enum DraftError {
    #[error("invalid draft id '{0}'")]
    InvalidId(String),

    #[error("draft store lock poisoned")]
    Poisoned,

    #[error("draft I/O error: {0}")]
    Io(#[from] io::Error),

    #[error("malformed draft: {0}")]
    Json(#[from] serde_json::Error),

    #[cfg(feature = "binary-drafts")]
    #[error(transparent)]
    Encode(#[from] crate::serial::SerializeError),

    #[cfg(feature = "binary-drafts")]
    #[error(transparent)]
    Decode(#[from] crate::serial::DeserializeError),
}

/// Persistence for drafts. Implementations decide where drafts live; expiry
/// is applied by the caller.
pub trait DraftStore: Send + Sync {
    /// Insert or replace the draft with the same id.
    ///
    /// # Errors
    ///
    /// Returns [`DraftError`] if the draft cannot be written.
    fn save(&self, draft: &Draft) -> Result<(), DraftError>;

    /// # Errors
    ///
    /// Returns [`DraftError`] if the draft exists but cannot be read.
    fn load(&self, id: &DraftId) -> Result<Option<Draft>, DraftError>;

    /// Delete a draft. Returns whether it existed.
    ///
    /// # Errors
    ///
    /// Returns [`DraftError`] if the draft cannot be deleted.
    fn remove(&self, id: &DraftId) -> Result<bool, DraftError>;

    /// The most recently saved draft, if any.
    ///
    /// # Errors
    ///
    /// Returns [`DraftError`] if the store cannot be listed.
    fn latest(&self) -> Result<Option<Draft>, DraftError>;
}

/// Drafts kept in process memory.
#[derive(Debug, Default)]
pub struct MemoryDraftStore {
    drafts: Mutex<BTreeMap<DraftId, Draft>>,
}

impl MemoryDraftStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

impl DraftStore for MemoryDraftStore {
    fn save(&self, draft: &Draft) -> Result<(), DraftError> {
        let mut drafts = self.drafts.lock().map_err(|_| DraftError::Poisoned)?;
        drafts.insert(draft.id.clone(), draft.clone());
        Ok(())
    }

    fn load(&self, id: &DraftId) -> Result<Option<Draft>, DraftError> {
        let drafts = self.drafts.lock().map_err(|_| DraftError::Poisoned)?;
        Ok(drafts.get(id).cloned())
    }

    fn remove(&self, id: &DraftId) -> Result<bool, DraftError> {
        let mut drafts = self.drafts.lock().map_err(|_| DraftError::Poisoned)?;
        Ok(drafts.remove(id).is_some())
    }

    fn latest(&self) -> Result<Option<Draft>, DraftError> {
        let drafts = self.drafts.lock().map_err(|_| DraftError::Poisoned)?;
        Ok(drafts.values().max_by_key(|d| d.saved_at).cloned())
    }
}

/// On-disk encoding used by [`FileDraftStore`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DraftFormat {
    #[default]
    Json,
    #[cfg(feature = "binary-drafts")]
    Binary,
}

impl DraftFormat {
    fn extension(self) -> &'static str {
        match self {
            DraftFormat::Json => "json",
            #[cfg(feature = "binary-drafts")]
            DraftFormat::Binary => "draft",
        }
    }

    fn encode(self, draft: &Draft) -> Result<Vec<u8>, DraftError> {
        match self {
            DraftFormat::Json => Ok(serde_json::to_vec_pretty(draft)?),
            #[cfg(feature = "binary-drafts")]
            DraftFormat::Binary => Ok(draft.to_bytes()?),
        }
    }

    fn decode(self, bytes: &[u8]) -> Result<Draft, DraftError> {
        match self {
            DraftFormat::Json => Ok(serde_json::from_slice(bytes)?),
            #[cfg(feature = "binary-drafts")]
            DraftFormat::Binary => Ok(Draft::from_bytes(bytes)?),
        }
    }
}

/// One file per draft in a directory.
#[derive(Debug, Clone)]
pub struct FileDraftStore {
    dir: PathBuf,
    format: DraftFormat,
}

impl FileDraftStore {
    /// Open (and create if needed) a JSON draft directory.
    ///
    /// # Errors
    ///
    /// Returns [`DraftError::Io`] if the directory cannot be created.
    pub fn new(dir: impl Into<PathBuf>) -> Result<Self, DraftError> {
        Self::with_format(dir, DraftFormat::Json)
    }

    /// # Errors
    ///
    /// Returns [`DraftError::Io`] if the directory cannot be created.
    pub fn with_format(dir: impl Into<PathBuf>, format: DraftFormat) -> Result<Self, DraftError> {
        let dir = dir.into();
        fs::create_dir_all(&dir)?;
        Ok(Self { dir, format })
    }

    #[must_use]
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn path_for(&self, id: &DraftId) -> PathBuf {
        self.dir.join(format!("{id}.{}", self.format.extension()))
    }

    fn read(&self, path: &Path) -> Result<Option<Draft>, DraftError> {
        match fs::read(path) {
            Ok(bytes) => Ok(Some(self.format.decode(&bytes)?)),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }
}

impl DraftStore for FileDraftStore {
    fn save(&self, draft: &Draft) -> Result<(), DraftError> {
        let bytes = self.format.encode(draft)?;
        let path = self.path_for(&draft.id);
        let staging = path.with_extension("tmp");
        fs::write(&staging, bytes)?;
        fs::rename(&staging, &path)?;
        tracing::debug!(id = %draft.id, path = %path.display(), "saved draft");
        Ok(())
    }

    fn load(&self, id: &DraftId) -> Result<Option<Draft>, DraftError> {
        self.read(&self.path_for(id))
    }

    fn remove(&self, id: &DraftId) -> Result<bool, DraftError> {
        match fs::remove_file(self.path_for(id)) {
            Ok(()) => Ok(true),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(false),
            Err(e) => Err(e.into()),
        }
    }

    fn latest(&self) -> Result<Option<Draft>, DraftError> {
        let extension = self.format.extension();
        let mut latest: Option<Draft> = None;
        for entry in fs::read_dir(&self.dir)? {
            let path = entry?.path();
            if path.extension().and_then(|e| e.to_str()) != Some(extension) {
                continue;
            }
            let draft = match self.read(&path) {
                Ok(Some(draft)) => draft,
                Ok(None) => continue,
                Err(e) => {
                    tracing::warn!(path = %path.display(), error = %e, "skipping unreadable draft");
                    continue;
                }
            };
            if latest.as_ref().map_or(true, |l| draft.saved_at > l.saved_at) {
                latest = Some(draft);
            }
        }
        Ok(latest)
    }
}
