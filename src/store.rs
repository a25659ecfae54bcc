//! Request-scoped session persistence.
//!
//! [`CookieSessionStore`] binds the codec to an inbound cookie jar and a
//! staged set of outbound cookies. `set`/`clear` only *schedule* header
//! writes; the inbound view is never mutated, and the staged set is flushed
//! atomically with the response by the guard layer. [`MemorySessionStore`]
//! is the process-local counterpart for non-request contexts.

use std::collections::BTreeMap;

use axum_extra::extract::cookie::{Cookie, CookieJar};
use time::OffsetDateTime;

use crate::codec::CookieCodec;
use crate::middleware::cookies;
use crate::types::Session;

/// The seam the refresher, the guard, and the session client are generic
/// over. `get` never raises: an unreadable session is no session.
pub trait SessionPersistence: Send {
    fn get(&self) -> Option<Session>;
    fn set(&mut self, session: &Session);
    fn clear(&mut self);
}

/// Cookie-backed store for one inbound request.
///
/// Construct a fresh one per request; never cache it, or the session it
/// decodes, in process-wide memory.
pub struct CookieSessionStore {
    codec: CookieCodec,
    secure_cookies: bool,
    ttl_days: i64,
    inbound: BTreeMap<u32, String>,
    staged: BTreeMap<String, Cookie<'static>>,
    staged_expiry: Option<OffsetDateTime>,
}

impl CookieSessionStore {
    /// Build a store over the request's cookie jar, collecting every chunk
    /// of the codec's cookie family.
    #[must_use]
    pub fn from_jar(codec: CookieCodec, jar: &CookieJar) -> Self {
        let mut inbound = BTreeMap::new();
        for cookie in jar.iter() {
            if let Some(index) = codec.chunk_index(cookie.name()) {
                inbound.insert(index, cookie.value().to_owned());
            }
        }
        Self {
            codec,
            secure_cookies: true,
            ttl_days: 30,
            inbound,
            staged: BTreeMap::new(),
            staged_expiry: None,
        }
    }

    /// Disable the Secure attribute (plain-HTTP local development only).
    #[must_use]
    pub fn with_secure_cookies(mut self, secure: bool) -> Self {
        self.secure_cookies = secure;
        self
    }

    /// Cookie lifetime; sessions outlive the access token via refresh.
    #[must_use]
    pub fn with_ttl_days(mut self, days: i64) -> Self {
        self.ttl_days = days;
        self
    }

    /// Drain the staged cookie writes for application to the response.
    #[must_use]
    pub fn take_cookies(&mut self) -> Vec<Cookie<'static>> {
        self.staged_expiry = None;
        std::mem::take(&mut self.staged).into_values().collect()
    }

    /// Whether any writes are currently staged.
    #[must_use]
    pub fn has_staged_cookies(&self) -> bool {
        !self.staged.is_empty()
    }

    fn unstage_family(&mut self) {
        let codec = &self.codec;
        self.staged.retain(|name, _| codec.chunk_index(name).is_none());
    }
}

impl SessionPersistence for CookieSessionStore {
    fn get(&self) -> Option<Session> {
        self.codec.decode(&self.inbound)
    }

    fn set(&mut self, session: &Session) {
        // Within one response cycle the most recently *obtained* session
        // wins: a late-arriving result of an older refresh must not clobber
        // a newer one already staged.
        if let Some(staged_expiry) = self.staged_expiry {
            if staged_expiry > session.expires_at() {
                tracing::warn!("dropping session write staled by a newer refresh");
                return;
            }
        }

        self.unstage_family();

        let chunks = self.codec.encode(session);
        let chunk_count = chunks.len() as u32;
        for (name, value) in chunks {
            let cookie =
                cookies::chunk_cookie(name.clone(), value, self.secure_cookies, self.ttl_days);
            self.staged.insert(name, cookie);
        }

        // A previous, longer encoding may have left higher-index chunks on
        // the client; expire them or decode will see a corrupt set.
        for &index in self.inbound.keys() {
            if index >= chunk_count {
                let name = self.codec.chunk_name(index);
                self.staged.insert(name.clone(), cookies::removal_cookie(name));
            }
        }

        self.staged_expiry = Some(session.expires_at());
    }

    fn clear(&mut self) {
        self.unstage_family();

        let mut indices: Vec<u32> = self.inbound.keys().copied().collect();
        if !indices.contains(&0) {
            indices.push(0);
        }
        for index in indices {
            let name = self.codec.chunk_name(index);
            self.staged.insert(name.clone(), cookies::removal_cookie(name));
        }
        self.staged_expiry = None;
    }
}

/// Process-local store: the stand-in for the browser side's persistent
/// storage, used by the session client outside a request context and in
/// tests.
#[derive(Debug, Default)]
pub struct MemorySessionStore {
    current: Option<Session>,
}

impl MemorySessionStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

impl SessionPersistence for MemorySessionStore {
    fn get(&self) -> Option<Session> {
        self.current.clone()
    }

    fn set(&mut self, session: &Session) {
        self.current = Some(session.clone());
    }

    fn clear(&mut self) {
        self.current = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testutil;

    fn codec() -> CookieCodec {
        CookieCodec::new("session")
    }

    fn jar_with(chunks: Vec<(String, String)>) -> CookieJar {
        let mut jar = CookieJar::new();
        for (name, value) in chunks {
            jar = jar.add(Cookie::new(name, value));
        }
        jar
    }

    fn store_with_session(session: &Session) -> CookieSessionStore {
        let jar = jar_with(codec().encode(session));
        CookieSessionStore::from_jar(codec(), &jar)
    }

    #[test]
    fn get_decodes_inbound_cookies() {
        let session = testutil::session_expiring_in(3600);
        let store = store_with_session(&session);
        assert_eq!(store.get(), Some(session));
    }

    #[test]
    fn get_returns_none_for_empty_jar() {
        let store = CookieSessionStore::from_jar(codec(), &CookieJar::new());
        assert!(store.get().is_none());
    }

    #[test]
    fn get_returns_none_for_corrupt_cookie_not_an_error() {
        let jar = jar_with(vec![("session.0".into(), "garbage".into())]);
        let store = CookieSessionStore::from_jar(codec(), &jar);
        assert!(store.get().is_none());
    }

    #[test]
    fn set_twice_stages_one_write_per_chunk() {
        let session = testutil::session_expiring_in(3600);
        let mut store = CookieSessionStore::from_jar(codec(), &CookieJar::new());
        store.set(&session);
        store.set(&session);

        let cookies = store.take_cookies();
        assert_eq!(cookies.len(), 1);
        assert_eq!(cookies[0].name(), "session.0");
    }

    #[test]
    fn set_does_not_mutate_inbound_view() {
        let old = testutil::session_expiring_in(120);
        let new = testutil::session_with("refresh-2", 3600);
        let mut store = store_with_session(&old);
        store.set(&new);
        // the inbound request still sees what the client actually sent
        assert_eq!(store.get(), Some(old));
    }

    #[test]
    fn newer_session_is_kept_over_a_stale_write() {
        let newer = testutil::session_with("refresh-2", 3600);
        let older = testutil::session_with("refresh-1", 600);
        let mut store = CookieSessionStore::from_jar(codec(), &CookieJar::new());

        store.set(&newer);
        store.set(&older);

        let codec = codec();
        let chunks: BTreeMap<u32, String> = store
            .take_cookies()
            .into_iter()
            .filter_map(|c| {
                codec
                    .chunk_index(c.name())
                    .map(|i| (i, c.value().to_owned()))
            })
            .collect();
        assert_eq!(codec.decode(&chunks), Some(newer));
    }

    #[test]
    fn set_expires_stale_higher_index_chunks() {
        // inbound session was chunked small; the rewrite fits one cookie
        let session = testutil::session_expiring_in(3600);
        let small = codec().with_chunk_bytes(64);
        let jar = jar_with(small.encode(&session));
        let mut store = CookieSessionStore::from_jar(codec(), &jar);

        store.set(&session);
        let cookies = store.take_cookies();

        let fresh: Vec<_> = cookies.iter().filter(|c| !c.value().is_empty()).collect();
        let removed: Vec<_> = cookies.iter().filter(|c| c.value().is_empty()).collect();
        assert_eq!(fresh.len(), 1);
        assert!(!removed.is_empty());
        assert!(removed.iter().all(|c| c.name() != "session.0"));
    }

    #[test]
    fn clear_expires_every_inbound_chunk() {
        let session = testutil::session_expiring_in(3600);
        let small = codec().with_chunk_bytes(64);
        let chunk_count = small.encode(&session).len();
        let jar = jar_with(small.encode(&session));
        let mut store = CookieSessionStore::from_jar(codec(), &jar);

        store.clear();
        let cookies = store.take_cookies();
        assert_eq!(cookies.len(), chunk_count);
        assert!(cookies.iter().all(|c| c.value().is_empty()));
    }

    #[test]
    fn clear_on_empty_jar_still_expires_first_chunk() {
        let mut store = CookieSessionStore::from_jar(codec(), &CookieJar::new());
        store.clear();
        let cookies = store.take_cookies();
        assert_eq!(cookies.len(), 1);
        assert_eq!(cookies[0].name(), "session.0");
    }

    #[test]
    fn clear_after_set_wins() {
        let mut store = CookieSessionStore::from_jar(codec(), &CookieJar::new());
        store.set(&testutil::session_expiring_in(3600));
        store.clear();
        let cookies = store.take_cookies();
        assert!(cookies.iter().all(|c| c.value().is_empty()));
    }

    #[test]
    fn memory_store_round_trip() {
        let session = testutil::session_expiring_in(3600);
        let mut store = MemorySessionStore::new();
        assert!(store.get().is_none());
        store.set(&session);
        assert_eq!(store.get(), Some(session));
        store.clear();
        assert!(store.get().is_none());
    }
}
