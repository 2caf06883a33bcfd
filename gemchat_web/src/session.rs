use chrono::{DateTime, Utc};
use gemchat_core::Transcript;
use std::{collections::HashMap, sync::Arc, time::Duration};
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tracing::{debug, info};
use uuid::Uuid;

/// Cookie carrying the session identifier.
pub const SESSION_COOKIE: &str = "gemchat_session";

/// State kept for one browser session.
#[derive(Debug, Clone)]
pub struct SessionSlot {
    pub transcript: Transcript,
    pub last_seen: DateTime<Utc>,
}

impl SessionSlot {
    fn new() -> Self {
        Self {
            transcript: Transcript::new(),
            last_seen: Utc::now(),
        }
    }

    pub fn touch(&mut self) {
        self.last_seen = Utc::now();
    }
}

/// In-memory session map: `session_id` -> slot.
///
/// The map lock is only held for lookups. Each slot has its own lock, held by
/// the request working on that session, so a slow answer for one session
/// never blocks another.
#[derive(Clone, Default)]
pub struct SessionRegistry {
    slots: Arc<Mutex<HashMap<Uuid, Arc<Mutex<SessionSlot>>>>>,
}

impl SessionRegistry {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Slot for `id`, created with an empty transcript on first access.
    pub async fn slot(&self, id: Uuid) -> Arc<Mutex<SessionSlot>> {
        let mut slots = self.slots.lock().await;
        Arc::clone(slots.entry(id).or_insert_with(|| {
            debug!("Creating session {id}");
            Arc::new(Mutex::new(SessionSlot::new()))
        }))
    }

    /// Slot for `id` if the session already exists.
    pub async fn existing(&self, id: Uuid) -> Option<Arc<Mutex<SessionSlot>>> {
        self.slots.lock().await.get(&id).cloned()
    }

    /// Copy of the transcript for `id`, if the session exists.
    pub async fn transcript(&self, id: Uuid) -> Option<Transcript> {
        let slot = self.existing(id).await?;
        let slot = slot.lock().await;
        Some(slot.transcript.clone())
    }

    pub async fn len(&self) -> usize {
        self.slots.lock().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.slots.lock().await.is_empty()
    }

    /// Drop sessions idle for longer than `idle_ttl` as of `now`.
    ///
    /// Slots still held or locked by a request are kept.
    pub async fn sweep(&self, idle_ttl: Duration, now: DateTime<Utc>) -> usize {
        let ttl = chrono::Duration::from_std(idle_ttl).unwrap_or(chrono::Duration::MAX);
        let mut slots = self.slots.lock().await;
        let before = slots.len();

        slots.retain(|_, slot| {
            Arc::strong_count(slot) > 1
                || !slot
                    .try_lock()
                    .is_ok_and(|guard| now.signed_duration_since(guard.last_seen) > ttl)
        });

        let removed = before - slots.len();
        if removed > 0 {
            info!("Expired {removed} idle session(s), {} remaining", slots.len());
        }
        removed
    }

    /// Run [`Self::sweep`] every `interval` until the task is aborted.
    #[must_use]
    pub fn spawn_sweeper(&self, idle_ttl: Duration, interval: Duration) -> JoinHandle<()> {
        let registry = self.clone();
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            ticker.tick().await;
            loop {
                ticker.tick().await;
                registry.sweep(idle_ttl, Utc::now()).await;
            }
        })
    }
}
