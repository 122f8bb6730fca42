//! Storage seams for the invite registry and the check-in ledger.
//!
//! Backends implement [`InviteStore`] and [`CheckinLedger`]. [`MemoryState`]
//! holds the reference semantics shared by the in-process backends.

use std::collections::{BTreeMap, HashSet};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::Mutex;

use crate::error::StoreError;
use crate::models::{
    CheckinEvent, EntryPolicy, Invite, LedgerStats, NewCheckinEvent, ScanSource,
};

/// Durable mapping from code to invite. Creation is append-only.
#[async_trait]
pub trait InviteStore: Send + Sync {
    /// Persists a new invite. Fails with [`StoreError::DuplicateCode`] if the
    /// code is already taken.
    async fn insert(&self, invite: &Invite) -> Result<(), StoreError>;

    /// Exact, case-sensitive lookup.
    async fn find_by_code(&self, code: &str) -> Result<Option<Invite>, StoreError>;

    async fn count(&self) -> Result<i64, StoreError>;

    /// Checks that the backend is reachable.
    async fn ping(&self) -> Result<(), StoreError> {
        Ok(())
    }
}

/// Result of an atomic grant attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GrantDecision {
    /// A GRANTED event was appended.
    Granted(CheckinEvent),
    /// The code had already been granted; a DENIED_ALREADY_USED event was appended.
    AlreadyUsed {
        event: CheckinEvent,
        first_granted_at: DateTime<Utc>,
    },
}

/// Append-only, ordered log of validation attempts.
#[async_trait]
pub trait CheckinLedger: Send + Sync {
    /// Appends an event and returns it with its ledger position.
    async fn append(&self, event: NewCheckinEvent) -> Result<CheckinEvent, StoreError>;

    /// Records a grant for a known code.
    ///
    /// Under [`EntryPolicy::SingleEntry`] the check for an earlier grant and
    /// the append happen atomically per code, so concurrent attempts on the
    /// same code produce exactly one GRANTED event.
    async fn record_grant(
        &self,
        code: &str,
        observed_at: DateTime<Utc>,
        source: ScanSource,
        policy: EntryPolicy,
    ) -> Result<GrantDecision, StoreError>;

    async fn stats(&self) -> Result<LedgerStats, StoreError>;

    /// Most recent events, newest first.
    async fn recent(&self, limit: usize) -> Result<Vec<CheckinEvent>, StoreError>;
}

impl GrantDecision {
    /// Builds the decision for an appended event, given the time of the
    /// earlier grant that blocked it, if any.
    pub fn new(event: CheckinEvent, first_granted_at: Option<DateTime<Utc>>) -> Self {
        match first_granted_at {
            Some(first_granted_at) => GrantDecision::AlreadyUsed {
                event,
                first_granted_at,
            },
            None => GrantDecision::Granted(event),
        }
    }
}

/// Registry and ledger contents for in-process backends.
///
/// Durable backends use the two-step form: [`MemoryState::prepare_event`]
/// numbers an event without recording it, and [`MemoryState::push_event`]
/// records it once it has been persisted.
#[derive(Debug, Clone, Default)]
pub struct MemoryState {
    invites: BTreeMap<String, Invite>,
    events: Vec<CheckinEvent>,
}

impl MemoryState {
    pub fn insert_invite(&mut self, invite: &Invite) -> Result<(), StoreError> {
        if self.invites.contains_key(&invite.code) {
            return Err(StoreError::DuplicateCode(invite.code.clone()));
        }
        self.invites.insert(invite.code.clone(), invite.clone());
        Ok(())
    }

    pub fn find_invite(&self, code: &str) -> Option<Invite> {
        self.invites.get(code).cloned()
    }

    pub fn invite_count(&self) -> i64 {
        self.invites.len() as i64
    }

    pub fn invites(&self) -> impl Iterator<Item = &Invite> {
        self.invites.values()
    }

    /// Assigns the next ledger position without recording the event.
    pub fn prepare_event(&self, event: NewCheckinEvent) -> CheckinEvent {
        let id = self.events.last().map(|e| e.id + 1).unwrap_or(1);
        CheckinEvent {
            id,
            code: event.code,
            observed_at: event.observed_at,
            outcome: event.outcome,
            source: event.source,
        }
    }

    /// Records an event that already carries its ledger position.
    pub fn push_event(&mut self, event: CheckinEvent) -> Result<(), StoreError> {
        let expected = self.events.last().map(|e| e.id + 1).unwrap_or(1);
        if event.id != expected {
            return Err(StoreError::Corrupt(format!(
                "ledger event {} out of order, expected {}",
                event.id, expected
            )));
        }
        self.events.push(event);
        Ok(())
    }

    pub fn append_event(&mut self, event: NewCheckinEvent) -> CheckinEvent {
        let event = self.prepare_event(event);
        self.events.push(event.clone());
        event
    }

    /// Time of the grant that blocks a new one under `policy`, if any.
    pub fn first_grant(&self, code: &str, policy: EntryPolicy) -> Option<DateTime<Utc>> {
        match policy {
            EntryPolicy::SingleEntry => self
                .events
                .iter()
                .find(|e| e.code == code && e.outcome.is_granted())
                .map(|e| e.observed_at),
            EntryPolicy::Unlimited => None,
        }
    }

    pub fn record_grant(
        &mut self,
        code: &str,
        observed_at: DateTime<Utc>,
        source: ScanSource,
        policy: EntryPolicy,
    ) -> GrantDecision {
        let first_grant = self.first_grant(code, policy);
        let event = self.append_event(NewCheckinEvent::grant_attempt(
            code,
            observed_at,
            source,
            first_grant.is_none(),
        ));
        GrantDecision::new(event, first_grant)
    }

    pub fn ledger_stats(&self) -> LedgerStats {
        let mut granted_codes = HashSet::new();
        let mut stats = LedgerStats::default();
        for event in &self.events {
            if event.outcome.is_granted() {
                granted_codes.insert(event.code.as_str());
                stats.granted_events += 1;
            } else {
                stats.denied_events += 1;
            }
        }
        stats.granted_codes = granted_codes.len() as i64;
        stats
    }

    pub fn recent_events(&self, limit: usize) -> Vec<CheckinEvent> {
        self.events.iter().rev().take(limit).cloned().collect()
    }
}

/// Ephemeral backend. State lives for the lifetime of the process.
#[derive(Debug, Default)]
pub struct InMemoryStore {
    state: Mutex<MemoryState>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl InviteStore for InMemoryStore {
    async fn insert(&self, invite: &Invite) -> Result<(), StoreError> {
        self.state.lock().await.insert_invite(invite)
    }

    async fn find_by_code(&self, code: &str) -> Result<Option<Invite>, StoreError> {
        Ok(self.state.lock().await.find_invite(code))
    }

    async fn count(&self) -> Result<i64, StoreError> {
        Ok(self.state.lock().await.invite_count())
    }
}

#[async_trait]
impl CheckinLedger for InMemoryStore {
    async fn append(&self, event: NewCheckinEvent) -> Result<CheckinEvent, StoreError> {
        Ok(self.state.lock().await.append_event(event))
    }

    async fn record_grant(
        &self,
        code: &str,
        observed_at: DateTime<Utc>,
        source: ScanSource,
        policy: EntryPolicy,
    ) -> Result<GrantDecision, StoreError> {
        Ok(self
            .state
            .lock()
            .await
            .record_grant(code, observed_at, source, policy))
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
    use crate::models::CheckinOutcome;
    use std::sync::Arc;

    fn invite(code: &str, name: &str) -> Invite {
        Invite {
            code: code.to_string(),
            invitee_name: name.to_string(),
            issued_at: Utc::now(),
        }
    }

    #[tokio::test]
    async fn test_insert_and_find() {
        let store = InMemoryStore::new();
        store.insert(&invite("ARD_AAAAAA", "Alex")).await.unwrap();

        let found = store.find_by_code("ARD_AAAAAA").await.unwrap().unwrap();
        assert_eq!(found.invitee_name, "Alex");
        assert!(store.find_by_code("ard_aaaaaa").await.unwrap().is_none());
        assert_eq!(store.count().await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_duplicate_code_rejected() {
        let store = InMemoryStore::new();
        store.insert(&invite("ARD_AAAAAA", "Alex")).await.unwrap();

        let result = store.insert(&invite("ARD_AAAAAA", "Sam")).await;
        assert!(matches!(result, Err(StoreError::DuplicateCode(code)) if code == "ARD_AAAAAA"));
        let kept = store.find_by_code("ARD_AAAAAA").await.unwrap().unwrap();
        assert_eq!(kept.invitee_name, "Alex");
        assert_eq!(store.count().await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_event_ids_follow_arrival_order() {
        let store = InMemoryStore::new();
        for code in ["ARD_ZZZZZZ", "ARD_AAAAAA", "ARD_MMMMMM"] {
            store
                .append(NewCheckinEvent {
                    code: code.to_string(),
                    observed_at: Utc::now(),
                    outcome: CheckinOutcome::DeniedUnknownCode,
                    source: ScanSource::Manual,
                })
                .await
                .unwrap();
        }

        let recent = store.recent(10).await.unwrap();
        let ids: Vec<i64> = recent.iter().map(|e| e.id).collect();
        assert_eq!(ids, vec![3, 2, 1]);
        assert_eq!(recent[2].code, "ARD_ZZZZZZ");
        assert_eq!(store.recent(1).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_single_entry_grants_once() {
        let store = InMemoryStore::new();
        let first = store
            .record_grant("ARD_AAAAAA", Utc::now(), ScanSource::Camera, EntryPolicy::SingleEntry)
            .await
            .unwrap();
        assert!(matches!(first, GrantDecision::Granted(_)));

        let second = store
            .record_grant("ARD_AAAAAA", Utc::now(), ScanSource::Manual, EntryPolicy::SingleEntry)
            .await
            .unwrap();
        match second {
            GrantDecision::AlreadyUsed { event, .. } => {
                assert_eq!(event.outcome, CheckinOutcome::DeniedAlreadyUsed);
                assert_eq!(event.source, ScanSource::Manual);
            }
            other => panic!("expected AlreadyUsed, got {:?}", other),
        }

        let stats = store.stats().await.unwrap();
        assert_eq!(stats.granted_codes, 1);
        assert_eq!(stats.granted_events, 1);
        assert_eq!(stats.denied_events, 1);
    }

    #[tokio::test]
    async fn test_unlimited_grants_every_time() {
        let store = InMemoryStore::new();
        for _ in 0..3 {
            let decision = store
                .record_grant("ARD_AAAAAA", Utc::now(), ScanSource::Camera, EntryPolicy::Unlimited)
                .await
                .unwrap();
            assert!(matches!(decision, GrantDecision::Granted(_)));
        }

        let stats = store.stats().await.unwrap();
        assert_eq!(stats.granted_codes, 1);
        assert_eq!(stats.granted_events, 3);
    }

    #[tokio::test]
    async fn test_concurrent_single_entry_grants_exactly_one() {
        let store = Arc::new(InMemoryStore::new());
        let mut handles = Vec::new();
        for _ in 0..16 {
            let store = store.clone();
            handles.push(tokio::spawn(async move {
                store
                    .record_grant(
                        "ARD_RACE22",
                        Utc::now(),
                        ScanSource::Camera,
                        EntryPolicy::SingleEntry,
                    )
                    .await
                    .unwrap()
            }));
        }

        let mut granted = 0;
        for handle in handles {
            if matches!(handle.await.unwrap(), GrantDecision::Granted(_)) {
                granted += 1;
            }
        }
        assert_eq!(granted, 1);
    }

    #[test]
    fn test_prepared_events_are_pushed_in_order() {
        let mut state = MemoryState::default();
        let first = state.prepare_event(NewCheckinEvent::grant_attempt(
            "ARD_AAAAAA",
            Utc::now(),
            ScanSource::Upload,
            true,
        ));
        assert_eq!(first.id, 1);
        assert!(state.recent_events(5).is_empty());

        state.push_event(first.clone()).unwrap();
        assert_eq!(state.first_grant("ARD_AAAAAA", EntryPolicy::SingleEntry), Some(first.observed_at));
        assert_eq!(state.first_grant("ARD_AAAAAA", EntryPolicy::Unlimited), None);

        // Replaying the same position twice means the log is damaged.
        assert!(matches!(state.push_event(first), Err(StoreError::Corrupt(_))));
        assert_eq!(state.ledger_stats().granted_events, 1);
    }
}
