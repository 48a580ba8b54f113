//! Per-caller state: query cache, pending toasts and picture load failures.
//!
//! The anonymous principal stands for every signed-out visitor, so its session
//! only carries the query cache. Toasts and picture failures are per visitor
//! and are never stored for it.

use dashmap::DashMap;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::time::interval;

use crate::cache::{QueryCache, Resource};
use crate::config::SessionsConfig;
use crate::models::Principal;
use crate::notify::{Toast, ToastLevel, ToastQueue};
use crate::pictures::{PictureGallery, VisiblePicture};

/// Rooms whose picture failures one session remembers
const MAX_GALLERIES: usize = 64;

pub struct Session {
    pub caller: Principal,
    pub cache: QueryCache,
    toasts: Mutex<ToastQueue>,
    galleries: Mutex<HashMap<String, PictureGallery>>,
    last_seen: Mutex<Instant>,
}

impl Session {
    fn new(caller: Principal, stale_after: Duration, max_toasts: usize) -> Self {
        Self {
            caller,
            cache: QueryCache::new(stale_after),
            toasts: Mutex::new(ToastQueue::new(max_toasts)),
            galleries: Mutex::new(HashMap::new()),
            last_seen: Mutex::new(Instant::now()),
        }
    }

    fn touch(&self) {
        *self.last_seen.lock() = Instant::now();
    }

    fn idle_for(&self) -> Duration {
        self.last_seen.lock().elapsed()
    }

    pub fn notify(&self, level: ToastLevel, message: impl Into<String>) {
        if self.caller.is_anonymous() {
            return;
        }
        self.toasts.lock().push(Toast::new(level, message));
    }

    pub fn take_toasts(&self) -> Vec<Toast> {
        self.toasts.lock().drain()
    }

    /// Visible pictures of a room, keeping the failures recorded for the same list.
    pub fn room_pictures(&self, room_id: &str, pictures: &[String]) -> Vec<VisiblePicture> {
        if self.caller.is_anonymous() {
            return PictureGallery::new(pictures.to_vec()).visible();
        }

        let mut galleries = self.galleries.lock();
        if !galleries.contains_key(room_id) && galleries.len() >= MAX_GALLERIES {
            if let Some(evicted) = galleries.keys().next().cloned() {
                galleries.remove(&evicted);
            }
        }
        let gallery = galleries
            .entry(room_id.to_string())
            .or_insert_with(|| PictureGallery::new(pictures.to_vec()));
        gallery.set_pictures(pictures.to_vec());
        gallery.visible()
    }

    /// Record a failed picture of a room this session has rendered.
    /// Returns whether anything was recorded.
    pub fn mark_picture_failed(&self, room_id: &str, url: &str) -> bool {
        if self.caller.is_anonymous() {
            return false;
        }
        self.galleries
            .lock()
            .get_mut(room_id)
            .is_some_and(|gallery| gallery.mark_failed(url))
    }

    pub fn gallery_count(&self) -> usize {
        self.galleries.lock().len()
    }
}

pub struct SessionRegistry {
    sessions: DashMap<Principal, Arc<Session>>,
    stale_after: Duration,
    max_toasts: usize,
    idle_after: Duration,
    max_sessions: usize,
}

impl SessionRegistry {
    pub fn new(stale_after: Duration, max_toasts: usize) -> Self {
        let limits = SessionsConfig::default();
        Self {
            sessions: DashMap::new(),
            stale_after,
            max_toasts,
            idle_after: limits.idle_after(),
            max_sessions: limits.max_sessions,
        }
    }

    pub fn with_limits(mut self, limits: &SessionsConfig) -> Self {
        self.idle_after = limits.idle_after();
        self.max_sessions = limits.max_sessions.max(1);
        self
    }

    pub fn for_caller(&self, caller: &Principal) -> Arc<Session> {
        if let Some(session) = self.sessions.get(caller).map(|entry| entry.value().clone()) {
            session.touch();
            return session;
        }

        if self.sessions.len() >= self.max_sessions {
            self.make_room();
        }
        self.sessions
            .entry(caller.clone())
            .or_insert_with(|| {
                tracing::debug!(principal = %caller, "Opening session");
                Arc::new(Session::new(caller.clone(), self.stale_after, self.max_toasts))
            })
            .clone()
    }

    /// Drop the given buckets in every session. Backend writes can change what
    /// other callers see, and all sessions share the same bucket names.
    pub fn invalidate(&self, resources: &[Resource]) {
        for session in self.sessions.iter() {
            session.cache.invalidate(resources);
        }
    }

    /// Close sessions that have not been used for `idle_after`.
    pub fn sweep_idle(&self) -> usize {
        let before = self.sessions.len();
        self.sessions.retain(|_, session| session.idle_for() < self.idle_after);
        let closed = before.saturating_sub(self.sessions.len());
        if closed > 0 {
            tracing::debug!(closed, open = self.sessions.len(), "Closed idle sessions");
        }
        closed
    }

    fn make_room(&self) {
        if self.sweep_idle() > 0 && self.sessions.len() < self.max_sessions {
            return;
        }
        let longest_idle = self
            .sessions
            .iter()
            .max_by_key(|entry| entry.value().idle_for())
            .map(|entry| entry.key().clone());
        if let Some(principal) = longest_idle {
            tracing::debug!(principal = %principal, "Session limit reached, closing session");
            self.sessions.remove(&principal);
        }
    }

    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }
}

/// Periodically close idle sessions for the lifetime of the process.
pub fn spawn_session_sweeper(sessions: Arc<SessionRegistry>) {
    let every = (sessions.idle_after / 4).max(Duration::from_secs(1));
    tracing::info!(interval_secs = every.as_secs(), "Starting idle session sweeper");

    tokio::spawn(async move {
        let mut tick = interval(every);
        tick.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);

        loop {
            tick.tick().await;
            sessions.sweep_idle();
        }
    });
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::QueryKey;
    use tokio_test::assert_ok;

    #[tokio::test]
    async fn test_sessions_are_isolated_but_invalidated_together() {
        let registry = SessionRegistry::new(Duration::from_secs(60), 10);
        let a = registry.for_caller(&Principal::parse("aaaaa-aa").unwrap());
        let b = registry.for_caller(&Principal::parse("bbbbb-bb").unwrap());

        assert_ok!(
            a.cache
                .get_or_fetch(QueryKey::new(Resource::Bookings), || async { Ok::<_, String>(1u8) })
                .await
        );
        assert!(!b.cache.contains(&QueryKey::new(Resource::Bookings)));

        assert_ok!(
            b.cache
                .get_or_fetch(QueryKey::new(Resource::Bookings), || async { Ok::<_, String>(2u8) })
                .await
        );
        registry.invalidate(&[Resource::Bookings]);
        assert!(a.cache.is_empty());
        assert!(b.cache.is_empty());
        assert_eq!(registry.len(), 2);
    }

    #[test]
    fn test_same_caller_same_session() {
        let registry = SessionRegistry::new(Duration::from_secs(60), 10);
        let caller = Principal::parse("aaaaa-aa").unwrap();
        let first = registry.for_caller(&caller);
        first.notify(ToastLevel::Success, "saved");
        let second = registry.for_caller(&caller);
        assert_eq!(second.take_toasts().len(), 1);
    }

    fn numbered(i: usize) -> Principal {
        let letter = (b'a' + i as u8) as char;
        Principal::parse(&format!("aaaa{}-aa", letter)).unwrap()
    }

    fn pictures() -> Vec<String> {
        vec!["https://a".to_string(), "https://b".to_string()]
    }

    #[test]
    fn test_room_picture_failures() {
        let registry = SessionRegistry::new(Duration::from_secs(60), 10);
        let session = registry.for_caller(&Principal::parse("aaaaa-aa").unwrap());

        assert_eq!(session.room_pictures("r1", &pictures()).len(), 2);
        assert!(session.mark_picture_failed("r1", "https://a"));
        let visible = session.room_pictures("r1", &pictures());
        assert_eq!(visible.len(), 1);
        assert_eq!(visible[0].index, 1);
    }

    #[test]
    fn test_failures_for_unrendered_rooms_are_ignored() {
        let registry = SessionRegistry::new(Duration::from_secs(60), 10);
        let session = registry.for_caller(&Principal::parse("aaaaa-aa").unwrap());

        for i in 0..100 {
            assert!(!session.mark_picture_failed(&format!("junk-{}", i), "https://a"));
        }
        assert_eq!(session.gallery_count(), 0);
    }

    #[test]
    fn test_gallery_count_is_capped() {
        let registry = SessionRegistry::new(Duration::from_secs(60), 10);
        let session = registry.for_caller(&Principal::parse("aaaaa-aa").unwrap());

        for i in 0..MAX_GALLERIES + 10 {
            session.room_pictures(&format!("room-{}", i), &pictures());
        }
        assert_eq!(session.gallery_count(), MAX_GALLERIES);
    }

    #[test]
    fn test_anonymous_session_keeps_no_visitor_state() {
        let registry = SessionRegistry::new(Duration::from_secs(60), 10);
        let session = registry.for_caller(&Principal::anonymous());

        session.room_pictures("r1", &pictures());
        assert!(!session.mark_picture_failed("r1", "https://a"));
        assert_eq!(session.room_pictures("r1", &pictures()).len(), 2);
        assert_eq!(session.gallery_count(), 0);

        session.notify(ToastLevel::Error, "nope");
        assert!(session.take_toasts().is_empty());
    }

    #[test]
    fn test_idle_sessions_are_swept() {
        let limits = SessionsConfig {
            idle_seconds: 0,
            max_sessions: 1_000,
        };
        let registry = SessionRegistry::new(Duration::from_secs(60), 10).with_limits(&limits);
        for i in 0..5 {
            registry.for_caller(&numbered(i));
        }
        assert_eq!(registry.len(), 5);
        assert_eq!(registry.sweep_idle(), 5);
        assert!(registry.is_empty());
    }

    #[test]
    fn test_session_limit_closes_longest_idle() {
        let limits = SessionsConfig {
            idle_seconds: 3600,
            max_sessions: 3,
        };
        let registry = SessionRegistry::new(Duration::from_secs(60), 10).with_limits(&limits);
        let first = numbered(0);
        registry.for_caller(&first);
        std::thread::sleep(Duration::from_millis(5));
        for i in 1..10 {
            registry.for_caller(&numbered(i));
        }
        assert_eq!(registry.len(), 3);
        assert!(!registry.sessions.contains_key(&first));
    }
}
