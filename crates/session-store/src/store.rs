use std::collections::{BTreeMap, HashMap};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use harufilm_protocol::Part;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::backend::KvBackend;
use crate::clock::{Clock, SystemClock};
use crate::session::UploadSession;
use crate::StoreError;

/// Fixed backend key holding the whole session map.
pub const STORAGE_KEY: &str = "upload-session-storage";

type SessionMap = HashMap<String, UploadSession>;

/// On-disk document. Version-less; readers drop what they cannot parse.
#[derive(Serialize)]
struct StoredDocument<'a> {
    sessions: BTreeMap<&'a str, &'a UploadSession>,
}

#[derive(Deserialize)]
struct RawDocument {
    #[serde(default)]
    sessions: serde_json::Map<String, serde_json::Value>,
}

/// Repository of upload sessions keyed by file key.
///
/// The backend document is the source of truth. Every read and mutation
/// reloads it first, so changes made by another store over the same
/// backend (a second process on the same file) are seen and merged rather
/// than overwritten. Within a process each mutation (including the
/// check-then-append of [`add_completed_part`](Self::add_completed_part))
/// runs its reload, change and write under one lock.
pub struct SessionStore {
    backend: Box<dyn KvBackend>,
    clock: Arc<dyn Clock>,
    sessions: Mutex<SessionMap>,
}

impl SessionStore {
    /// Opens a store over `backend` using the wall clock.
    pub fn open(backend: impl KvBackend + 'static) -> Result<Self, StoreError> {
        Self::with_clock(backend, Arc::new(SystemClock))
    }

    /// Opens a store with an explicit clock.
    pub fn with_clock(
        backend: impl KvBackend + 'static,
        clock: Arc<dyn Clock>,
    ) -> Result<Self, StoreError> {
        let sessions = load_sessions(&backend)?;
        Ok(Self {
            backend: Box::new(backend),
            clock,
            sessions: Mutex::new(sessions),
        })
    }

    /// The clock used for `last_updated` stamps.
    pub fn clock(&self) -> &Arc<dyn Clock> {
        &self.clock
    }

    /// Returns the session for `file_key`, if any.
    pub fn get_session(&self, file_key: &str) -> Option<UploadSession> {
        self.read_lock().get(file_key).cloned()
    }

    /// Returns every session, sorted by file key.
    pub fn sessions(&self) -> Vec<(String, UploadSession)> {
        let map = self.read_lock();
        let mut all: Vec<_> = map.iter().map(|(k, s)| (k.clone(), s.clone())).collect();
        all.sort_by(|a, b| a.0.cmp(&b.0));
        all
    }

    /// Creates or replaces the session for `file_key`.
    pub fn save_session(
        &self,
        file_key: &str,
        session: UploadSession,
    ) -> Result<UploadSession, StoreError> {
        let mut map = self.write_lock()?;
        let mut next = map.clone();
        next.insert(file_key.to_string(), session.clone());
        self.commit(&mut map, next)?;
        debug!(file_key, transfer_id = %session.transfer_id, "session saved");
        Ok(session)
    }

    /// Records a completed part.
    ///
    /// No-op when the session is absent or already holds `part.part_number`.
    /// Returns the session as stored after the call.
    pub fn add_completed_part(
        &self,
        file_key: &str,
        part: Part,
    ) -> Result<Option<UploadSession>, StoreError> {
        self.record_part(file_key, None, part)
    }

    /// Records a completed part only if the session still belongs to
    /// `transfer_id`.
    ///
    /// A part finishing after its session was replaced by a new transfer
    /// is dropped; its entity tag is meaningless to the new transfer.
    pub fn add_transfer_part(
        &self,
        file_key: &str,
        transfer_id: &str,
        part: Part,
    ) -> Result<Option<UploadSession>, StoreError> {
        self.record_part(file_key, Some(transfer_id), part)
    }

    fn record_part(
        &self,
        file_key: &str,
        transfer_id: Option<&str>,
        part: Part,
    ) -> Result<Option<UploadSession>, StoreError> {
        let mut map = self.write_lock()?;
        let Some(current) = map.get(file_key) else {
            debug!(file_key, part = part.part_number, "no session, part not recorded");
            return Ok(None);
        };
        if let Some(expected) = transfer_id
            && current.transfer_id != expected
        {
            debug!(
                file_key,
                part = part.part_number,
                stale = expected,
                "session belongs to another transfer, part not recorded"
            );
            return Ok(Some(current.clone()));
        }
        if current.has_part(part.part_number) {
            return Ok(Some(current.clone()));
        }

        let mut updated = current.clone();
        let part_number = part.part_number;
        updated.completed_parts.push(part);
        updated.last_updated = self.clock.now_ms();

        let mut next = map.clone();
        next.insert(file_key.to_string(), updated.clone());
        self.commit(&mut map, next)?;
        debug!(
            file_key,
            part = part_number,
            completed = updated.completed_count(),
            total = updated.part_count,
            "part recorded"
        );
        Ok(Some(updated))
    }

    /// Deletes the session for `file_key`. No-op if absent.
    pub fn remove_session(&self, file_key: &str) -> Result<Option<UploadSession>, StoreError> {
        let mut map = self.write_lock()?;
        if !map.contains_key(file_key) {
            return Ok(None);
        }
        let mut next = map.clone();
        let removed = next.remove(file_key);
        self.commit(&mut map, next)?;
        debug!(file_key, "session removed");
        Ok(removed)
    }

    /// Deletes every session idle for longer than `expiration`.
    ///
    /// Returns the purged file keys. Nothing is written when nothing expired.
    pub fn clear_expired_sessions(&self, expiration: Duration) -> Result<Vec<String>, StoreError> {
        let now = self.clock.now_ms();
        let mut map = self.write_lock()?;
        let mut expired: Vec<String> = map
            .iter()
            .filter(|(_, s)| s.is_expired(now, expiration))
            .map(|(k, _)| k.clone())
            .collect();
        if expired.is_empty() {
            return Ok(expired);
        }
        expired.sort();

        let mut next = map.clone();
        for key in &expired {
            next.remove(key);
        }
        self.commit(&mut map, next)?;
        info!(count = expired.len(), "purged expired upload sessions");
        Ok(expired)
    }

    /// Persists `next`, then makes it the in-memory state.
    fn commit(&self, current: &mut MutexGuard<'_, SessionMap>, next: SessionMap) -> Result<(), StoreError> {
        if next.is_empty() {
            self.backend.remove(STORAGE_KEY)?;
        } else {
            let doc = StoredDocument {
                sessions: next.iter().map(|(k, s)| (k.as_str(), s)).collect(),
            };
            let json = serde_json::to_string(&doc)?;
            self.backend.write(STORAGE_KEY, &json)?;
        }
        **current = next;
        Ok(())
    }

    fn lock(&self) -> MutexGuard<'_, SessionMap> {
        self.sessions.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Locks and reloads from the backend before a mutation.
    fn write_lock(&self) -> Result<MutexGuard<'_, SessionMap>, StoreError> {
        let mut map = self.lock();
        *map = load_sessions(self.backend.as_ref())?;
        Ok(map)
    }

    /// Locks and reloads for a read. A backend error serves the last
    /// loaded state.
    fn read_lock(&self) -> MutexGuard<'_, SessionMap> {
        let mut map = self.lock();
        match load_sessions(self.backend.as_ref()) {
            Ok(fresh) => *map = fresh,
            Err(e) => warn!(error = %e, "session reload failed, using cached state"),
        }
        map
    }
}

/// Reads the stored document, dropping anything that does not parse.
fn load_sessions(backend: &dyn KvBackend) -> Result<SessionMap, StoreError> {
    let Some(data) = backend.read(STORAGE_KEY)? else {
        return Ok(SessionMap::new());
    };

    let raw: RawDocument = match serde_json::from_str(&data) {
        Ok(doc) => doc,
        Err(e) => {
            warn!(error = %e, "unreadable session document, starting empty");
            return Ok(SessionMap::new());
        }
    };

    let mut sessions = SessionMap::new();
    for (key, value) in raw.sessions {
        match serde_json::from_value::<UploadSession>(value) {
            Ok(session) if session.is_consistent() => {
                sessions.insert(key, session);
            }
            Ok(_) => warn!(file_key = %key, "dropping inconsistent session record"),
            Err(e) => warn!(file_key = %key, error = %e, "dropping malformed session record"),
        }
    }
    debug!("loaded {} upload session(s)", sessions.len());
    Ok(sessions)
}
