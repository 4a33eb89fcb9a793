//! In-memory chat sessions.
//!
//! A [`SessionStore`] maps session ids to [`Session`]s, creating them on
//! first use. Each session owns its conversation behind a single-writer
//! async lock: a turn holds the guard from the moment the user message is
//! appended until the assistant reply is recorded, so two requests for the
//! same session id are serialized rather than interleaved.

use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use dashmap::DashMap;
use tokio::sync::{Mutex as AsyncMutex, OwnedMutexGuard};
use tracing::{debug, info};

use crate::Message;

// ── Conversation ───────────────────────────────────────────────────

/// The message history of one session, oldest first.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Conversation {
    messages: Vec<Message>,
}

impl Conversation {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    pub fn push(&mut self, message: Message) {
        self.messages.push(message);
    }

    /// Replace the history, e.g. with the output of context management.
    pub fn replace(&mut self, messages: Vec<Message>) {
        self.messages = messages;
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }
}

// ── Session ────────────────────────────────────────────────────────

/// One chat session.
#[derive(Debug)]
pub struct Session {
    id: String,
    conversation: Arc<AsyncMutex<Conversation>>,
    last_used: Mutex<Instant>,
}

impl Session {
    fn new(id: &str) -> Self {
        Self {
            id: id.to_string(),
            conversation: Arc::new(AsyncMutex::new(Conversation::new())),
            last_used: Mutex::new(Instant::now()),
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    /// Wait for exclusive access to the conversation. The guard is owned so
    /// it can live inside a spawned streaming task.
    pub async fn lock(&self) -> OwnedMutexGuard<Conversation> {
        self.touch();
        let guard = Arc::clone(&self.conversation).lock_owned().await;
        self.touch();
        guard
    }

    /// Whether a turn currently holds the conversation.
    pub fn is_busy(&self) -> bool {
        self.conversation.try_lock().is_err()
    }

    /// Copy of the current history, or `None` while a turn holds the lock.
    pub fn snapshot(&self) -> Option<Vec<Message>> {
        self.conversation.try_lock().ok().map(|c| c.messages().to_vec())
    }

    pub fn touch(&self) {
        *self.last_used.lock().unwrap_or_else(|e| e.into_inner()) = Instant::now();
    }

    pub fn idle_for(&self) -> Duration {
        self.last_used.lock().unwrap_or_else(|e| e.into_inner()).elapsed()
    }
}

// ── SessionStore ───────────────────────────────────────────────────

/// Concurrent session map. Cloning shares the same sessions.
#[derive(Debug, Clone, Default)]
pub struct SessionStore {
    sessions: Arc<DashMap<String, Arc<Session>>>,
}

impl SessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fetch a session, creating an empty one if the id is new.
    ///
    /// The session is touched while the map entry is still held, so an
    /// [`evict_idle`](Self::evict_idle) sweep cannot drop it before the caller
    /// takes the lock.
    pub fn get_or_create(&self, id: &str) -> Arc<Session> {
        let session = self.sessions.entry(id.to_string()).or_insert_with(|| {
            debug!(session = id, "Creating session");
            Arc::new(Session::new(id))
        });
        session.touch();
        Arc::clone(&session)
    }

    pub fn get(&self, id: &str) -> Option<Arc<Session>> {
        self.sessions.get(id).map(|s| Arc::clone(&s))
    }

    /// Drop a session. Returns whether it existed.
    pub fn remove(&self, id: &str) -> bool {
        self.sessions.remove(id).is_some()
    }

    /// Drop sessions idle for at least `ttl` that are not mid-turn. Returns
    /// the number removed.
    pub fn evict_idle(&self, ttl: Duration) -> usize {
        let before = self.sessions.len();
        self.sessions
            .retain(|_, session| session.is_busy() || session.idle_for() < ttl);
        let evicted = before.saturating_sub(self.sessions.len());
        if evicted > 0 {
            info!(evicted, remaining = self.sessions.len(), "Evicted idle sessions");
        }
        evicted
    }

    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }

    /// Ids of all live sessions, sorted.
    pub fn ids(&self) -> Vec<String> {
        let mut ids: Vec<String> = self.sessions.iter().map(|e| e.key().clone()).collect();
        ids.sort();
        ids
    }
}
