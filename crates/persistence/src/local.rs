//! JSON-file store for single-client deployments.
//!
//! Invites live in one JSON document that is rewritten on every issue: the
//! new document goes to a temporary file, is synced and renamed over the
//! previous one. Ledger events go to a sibling JSON Lines file
//! (`<data_file stem>.ledger.jsonl`), one synced append per event, so the
//! cost of recording an attempt does not grow with the ledger.
//!
//! The in-memory state only changes after the write succeeds, so a failed
//! write leaves both untouched.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use domain::models::{CheckinEvent, EntryPolicy, Invite, LedgerStats, NewCheckinEvent, ScanSource};
use domain::services::{CheckinLedger, GrantDecision, InviteStore, MemoryState};
use domain::StoreError;
use serde::{Deserialize, Serialize};
use tokio::fs;
use tokio::io::AsyncWriteExt;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use crate::metrics::QueryTimer;

#[derive(Debug, Default, Serialize, Deserialize)]
struct InviteDocument {
    #[serde(default)]
    invites: Vec<Invite>,
}

#[derive(Debug)]
pub struct JsonFileStore {
    path: PathBuf,
    ledger_path: PathBuf,
    state: Mutex<MemoryState>,
}

impl JsonFileStore {
    /// Opens the store at `path`, creating an empty one if the file is missing.
    pub async fn open(path: impl AsRef<Path>) -> Result<Self, StoreError> {
        let path = path.as_ref().to_path_buf();
        let ledger_path = path.with_extension("ledger.jsonl");
        let mut state = MemoryState::default();

        let created = match fs::read(&path).await {
            Ok(bytes) => {
                let document = serde_json::from_slice::<InviteDocument>(&bytes).map_err(|e| {
                    StoreError::Corrupt(format!("{}: {}", path.display(), e))
                })?;
                for invite in &document.invites {
                    state.insert_invite(invite)?;
                }
                false
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
                    fs::create_dir_all(parent).await?;
                }
                true
            }
            Err(e) => return Err(e.into()),
        };

        replay_ledger(&ledger_path, &mut state).await?;

        let store = Self {
            path,
            ledger_path,
            state: Mutex::new(state),
        };
        if created {
            store.write_invites(&InviteDocument::default()).await?;
        }

        {
            let state = store.state.lock().await;
            let stats = state.ledger_stats();
            info!(
                path = %store.path.display(),
                invites = state.invite_count(),
                events = stats.granted_events + stats.denied_events,
                created,
                "Opened local data file"
            );
        }
        Ok(store)
    }

    async fn write_invites(&self, document: &InviteDocument) -> Result<(), StoreError> {
        let data = serde_json::to_vec_pretty(document)
            .map_err(|e| StoreError::Corrupt(format!("failed to serialize invites: {}", e)))?;

        let temp_path = self.path.with_extension("tmp");
        let mut file = fs::File::create(&temp_path).await?;
        file.write_all(&data).await?;
        file.sync_all().await?;
        fs::rename(&temp_path, &self.path).await?;

        debug!(path = %self.path.display(), bytes = data.len(), "Local data file written");
        Ok(())
    }

    async fn append_line(&self, event: &CheckinEvent) -> Result<(), StoreError> {
        let mut line = serde_json::to_vec(event)
            .map_err(|e| StoreError::Corrupt(format!("failed to serialize event: {}", e)))?;
        line.push(b'\n');

        let mut file = fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.ledger_path)
            .await?;
        let start_len = file.metadata().await?.len();

        let written = match file.write_all(&line).await {
            Ok(()) => file.sync_data().await,
            Err(e) => Err(e),
        };
        if let Err(e) = written {
            // Keep the next append on a line of its own.
            if let Err(truncate_err) = file.set_len(start_len).await {
                warn!(error = %truncate_err, "Failed to trim partial ledger entry");
            }
            return Err(e.into());
        }
        Ok(())
    }

    /// Persists `event` and records it in memory once the append succeeded.
    async fn record(
        &self,
        state: &mut MemoryState,
        event: NewCheckinEvent,
    ) -> Result<CheckinEvent, StoreError> {
        let event = state.prepare_event(event);
        self.append_line(&event).await?;
        state.push_event(event.clone())?;
        Ok(event)
    }
}

/// Loads ledger events into `state`.
///
/// A final line without a newline is a torn append from a crash; it is
/// dropped and the file truncated so later appends start on a clean line.
/// Any other unreadable line is corruption.
async fn replay_ledger(path: &Path, state: &mut MemoryState) -> Result<(), StoreError> {
    let bytes = match fs::read(path).await {
        Ok(bytes) => bytes,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(()),
        Err(e) => return Err(e.into()),
    };

    let complete_len = bytes
        .iter()
        .rposition(|b| *b == b'\n')
        .map(|i| i + 1)
        .unwrap_or(0);

    for (number, line) in bytes[..complete_len].split(|b| *b == b'\n').enumerate() {
        if line.iter().all(u8::is_ascii_whitespace) {
            continue;
        }
        let event = serde_json::from_slice::<CheckinEvent>(line).map_err(|e| {
            StoreError::Corrupt(format!("{} line {}: {}", path.display(), number + 1, e))
        })?;
        state.push_event(event)?;
    }

    if complete_len < bytes.len() {
        warn!(
            path = %path.display(),
            dropped_bytes = bytes.len() - complete_len,
            "Discarding incomplete ledger entry"
        );
        let file = fs::OpenOptions::new().write(true).open(path).await?;
        file.set_len(complete_len as u64).await?;
        file.sync_all().await?;
    }
    Ok(())
}

#[async_trait]
impl InviteStore for JsonFileStore {
    async fn insert(&self, invite: &Invite) -> Result<(), StoreError> {
        let timer = QueryTimer::file("insert_invite");
        let mut state = self.state.lock().await;

        let result = if state.find_invite(&invite.code).is_some() {
            Err(StoreError::DuplicateCode(invite.code.clone()))
        } else {
            let document = InviteDocument {
                invites: state
                    .invites()
                    .cloned()
                    .chain(std::iter::once(invite.clone()))
                    .collect(),
            };
            match self.write_invites(&document).await {
                Ok(()) => state.insert_invite(invite),
                Err(e) => Err(e),
            }
        };
        timer.finish(result)
    }

    async fn find_by_code(&self, code: &str) -> Result<Option<Invite>, StoreError> {
        Ok(self.state.lock().await.find_invite(code))
    }

    async fn count(&self) -> Result<i64, StoreError> {
        Ok(self.state.lock().await.invite_count())
    }

    async fn ping(&self) -> Result<(), StoreError> {
        fs::metadata(&self.path).await?;
        Ok(())
    }
}

#[async_trait]
impl CheckinLedger for JsonFileStore {
    async fn append(&self, event: NewCheckinEvent) -> Result<CheckinEvent, StoreError> {
        let timer = QueryTimer::file("append_checkin_event");
        let mut state = self.state.lock().await;
        let result = self.record(&mut state, event).await;
        timer.finish(result)
    }

    async fn record_grant(
        &self,
        code: &str,
        observed_at: DateTime<Utc>,
        source: ScanSource,
        policy: EntryPolicy,
    ) -> Result<GrantDecision, StoreError> {
        let timer = QueryTimer::file("record_grant");
        let mut state = self.state.lock().await;

        let first_grant = state.first_grant(code, policy);
        let event = NewCheckinEvent::grant_attempt(code, observed_at, source, first_grant.is_none());
        let result = self
            .record(&mut state, event)
            .await
            .map(|event| GrantDecision::new(event, first_grant));
        timer.finish(result)
    }

    async fn stats(&self) -> Result<LedgerStats, StoreError> {
        Ok(self.state.lock().await.ledger_stats())
    }

    async fn recent(&self, limit: usize) -> Result<Vec<CheckinEvent>, StoreError> {
        Ok(self.state.lock().await.recent_events(limit))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use domain::models::CheckinOutcome;
    use tempfile::TempDir;

    fn invite(code: &str, name: &str) -> Invite {
        Invite {
            code: code.to_string(),
            invitee_name: name.to_string(),
            issued_at: Utc::now(),
        }
    }

    fn unknown(code: &str) -> NewCheckinEvent {
        NewCheckinEvent {
            code: code.to_string(),
            observed_at: Utc::now(),
            outcome: CheckinOutcome::DeniedUnknownCode,
            source: ScanSource::Manual,
        }
    }

    #[tokio::test]
    async fn test_open_missing_file_starts_empty() {
        let dir = TempDir::new().unwrap();
        let store = JsonFileStore::open(dir.path().join("nested/data.json"))
            .await
            .unwrap();
        assert_eq!(store.count().await.unwrap(), 0);
        assert!(store.recent(10).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_state_survives_reopen() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("data.json");

        {
            let store = JsonFileStore::open(&path).await.unwrap();
            store.insert(&invite("ARD_ABCDEFGH23", "Alex")).await.unwrap();
            let decision = store
                .record_grant("ARD_ABCDEFGH23", Utc::now(), ScanSource::Camera, EntryPolicy::SingleEntry)
                .await
                .unwrap();
            assert!(matches!(decision, GrantDecision::Granted(_)));
        }

        let reopened = JsonFileStore::open(&path).await.unwrap();
        let found = reopened.find_by_code("ARD_ABCDEFGH23").await.unwrap().unwrap();
        assert_eq!(found.invitee_name, "Alex");

        let decision = reopened
            .record_grant("ARD_ABCDEFGH23", Utc::now(), ScanSource::Manual, EntryPolicy::SingleEntry)
            .await
            .unwrap();
        match decision {
            GrantDecision::AlreadyUsed { event, .. } => {
                assert_eq!(event.id, 2);
                assert_eq!(event.outcome, CheckinOutcome::DeniedAlreadyUsed);
            }
            other => panic!("expected AlreadyUsed, got {:?}", other),
        }
        assert_eq!(reopened.stats().await.unwrap().granted_codes, 1);
    }

    #[tokio::test]
    async fn test_denials_append_without_rewriting_invites() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("data.json");
        let store = JsonFileStore::open(&path).await.unwrap();
        store.insert(&invite("ARD_ABCDEFGH23", "Alex")).await.unwrap();
        let document = std::fs::read(&path).unwrap();
        let modified = std::fs::metadata(&path).unwrap().modified().unwrap();

        for i in 0..50 {
            store.append(unknown(&format!("ARD_RANDOM{:04}", i))).await.unwrap();
        }

        assert_eq!(std::fs::read(&path).unwrap(), document);
        assert_eq!(std::fs::metadata(&path).unwrap().modified().unwrap(), modified);

        let ledger = std::fs::read_to_string(dir.path().join("data.ledger.jsonl")).unwrap();
        assert_eq!(ledger.lines().count(), 50);
        assert!(ledger.lines().last().unwrap().contains("ARD_RANDOM0049"));

        let reopened = JsonFileStore::open(&path).await.unwrap();
        assert_eq!(reopened.stats().await.unwrap().denied_events, 50);
        assert_eq!(reopened.recent(1).await.unwrap()[0].id, 50);
    }

    #[tokio::test]
    async fn test_torn_ledger_tail_is_discarded() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("data.json");
        let ledger_path = dir.path().join("data.ledger.jsonl");
        {
            let store = JsonFileStore::open(&path).await.unwrap();
            store.append(unknown("ARD_FIRST")).await.unwrap();
        }

        let mut contents = std::fs::read(&ledger_path).unwrap();
        let intact_len = contents.len();
        contents.extend_from_slice(br#"{"id":2,"code":"ARD_SEC"#);
        std::fs::write(&ledger_path, &contents).unwrap();

        let store = JsonFileStore::open(&path).await.unwrap();
        assert_eq!(std::fs::metadata(&ledger_path).unwrap().len(), intact_len as u64);

        let event = store.append(unknown("ARD_SECOND")).await.unwrap();
        assert_eq!(event.id, 2);

        let reopened = JsonFileStore::open(&path).await.unwrap();
        let codes: Vec<_> = reopened
            .recent(5)
            .await
            .unwrap()
            .into_iter()
            .map(|e| e.code)
            .collect();
        assert_eq!(codes, vec!["ARD_SECOND", "ARD_FIRST"]);
    }

    #[tokio::test]
    async fn test_damaged_ledger_line_is_reported() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("data.json");
        std::fs::write(dir.path().join("data.ledger.jsonl"), b"not json\n").unwrap();

        let result = JsonFileStore::open(&path).await;
        assert!(matches!(result, Err(StoreError::Corrupt(_))));
    }

    #[tokio::test]
    async fn test_duplicate_insert_leaves_file_unchanged() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("data.json");
        let store = JsonFileStore::open(&path).await.unwrap();
        store.insert(&invite("ARD_ABCDEFGH23", "Alex")).await.unwrap();
        let before = std::fs::read(&path).unwrap();

        let result = store.insert(&invite("ARD_ABCDEFGH23", "Sam")).await;
        assert!(matches!(result, Err(StoreError::DuplicateCode(_))));
        assert_eq!(std::fs::read(&path).unwrap(), before);
    }

    #[tokio::test]
    async fn test_corrupt_file_is_reported() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("data.json");
        std::fs::write(&path, b"{ not json").unwrap();

        let result = JsonFileStore::open(&path).await;
        assert!(matches!(result, Err(StoreError::Corrupt(_))));
    }

    #[tokio::test]
    async fn test_ping_checks_data_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("data.json");
        let store = JsonFileStore::open(&path).await.unwrap();
        assert!(path.exists());
        tokio_test::assert_ok!(store.ping().await);

        std::fs::remove_file(&path).unwrap();
        tokio_test::assert_err!(store.ping().await);
    }
}
