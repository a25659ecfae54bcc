//! Cookie framing for sessions: a versioned JSON envelope, base64url
//! encoded and split into numbered chunks under a per-cookie byte budget.
//!
//! Purely a transport concern — no cryptography happens here. Decoding is
//! defensive: any missing chunk, malformed framing, or unknown version
//! yields `None`, which callers treat exactly like "no session".

use std::collections::BTreeMap;

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use serde::{Deserialize, Serialize};

use crate::types::{Session, UserRecord};

/// Bumped when the envelope shape changes; older readers treat unknown
/// versions as invalid rather than misparsing them.
const FORMAT_VERSION: u8 = 1;

/// Default per-cookie value budget, in bytes. Driven by browser and proxy
/// header-size limits (4 KiB per cookie including name and attributes).
pub const DEFAULT_CHUNK_BYTES: usize = 3180;

/// Serialized session payload. `expires_at` is deliberately absent: it is
/// re-derived from the access token on decode, so the cookie cannot claim
/// a longer lifetime than the token grants.
#[derive(Serialize, Deserialize)]
struct Envelope {
    v: u8,
    access_token: String,
    refresh_token: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    provider_token: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    provider_refresh_token: Option<String>,
    user: UserRecord,
}

impl Envelope {
    fn from_session(session: &Session) -> Self {
        Self {
            v: FORMAT_VERSION,
            access_token: session.access_token().to_owned(),
            refresh_token: session.refresh_token().to_owned(),
            provider_token: session.provider_token().map(str::to_owned),
            provider_refresh_token: session.provider_refresh_token().map(str::to_owned),
            user: session.user().clone(),
        }
    }

    fn into_session(self) -> Option<Session> {
        let mut session = Session::new(self.access_token, self.refresh_token, self.user).ok()?;
        if let Some(token) = self.provider_token {
            session = session.with_provider_token(token);
        }
        if let Some(token) = self.provider_refresh_token {
            session = session.with_provider_refresh_token(token);
        }
        Some(session)
    }
}

/// Serializes sessions to a family of numbered cookies `<base>.0 .. <base>.N`
/// and reassembles them on the way back in.
#[derive(Debug, Clone)]
pub struct CookieCodec {
    base_name: String,
    chunk_bytes: usize,
}

impl CookieCodec {
    #[must_use]
    pub fn new(base_name: impl Into<String>) -> Self {
        Self {
            base_name: base_name.into(),
            chunk_bytes: DEFAULT_CHUNK_BYTES,
        }
    }

    /// Override the per-cookie value budget.
    #[must_use]
    pub fn with_chunk_bytes(mut self, chunk_bytes: usize) -> Self {
        debug_assert!(chunk_bytes > 0);
        self.chunk_bytes = chunk_bytes;
        self
    }

    #[must_use]
    pub fn base_name(&self) -> &str {
        &self.base_name
    }

    #[must_use]
    pub fn chunk_name(&self, index: u32) -> String {
        format!("{}.{index}", self.base_name)
    }

    /// Parse a cookie name of this family back to its chunk index.
    #[must_use]
    pub fn chunk_index(&self, name: &str) -> Option<u32> {
        name.strip_prefix(&self.base_name)?
            .strip_prefix('.')?
            .parse()
            .ok()
    }

    /// Encode a session into its cookie chunk set, in index order.
    ///
    /// Chunk count is deterministic from payload size alone; even a payload
    /// that fits one cookie is written as `<base>.0`.
    #[must_use]
    pub fn encode(&self, session: &Session) -> Vec<(String, String)> {
        let envelope = Envelope::from_session(session);
        let json = serde_json::to_vec(&envelope).expect("envelope has no non-serializable fields");
        let encoded = URL_SAFE_NO_PAD.encode(json);

        encoded
            .as_bytes()
            .chunks(self.chunk_bytes)
            .enumerate()
            .map(|(index, piece)| {
                // base64 output is ASCII, so byte boundaries are char boundaries
                let value = std::str::from_utf8(piece)
                    .expect("base64 output is ASCII")
                    .to_owned();
                (self.chunk_name(index as u32), value)
            })
            .collect()
    }

    /// Decode a reassembled chunk set.
    ///
    /// Fails closed: a gap in the chunk indices, malformed base64, truncated
    /// JSON, an unknown format version, or an access token no expiry can be
    /// derived from all return `None` — never a partial session, never a
    /// panic into the caller's request flow.
    #[must_use]
    pub fn decode(&self, chunks: &BTreeMap<u32, String>) -> Option<Session> {
        if chunks.is_empty() {
            return None;
        }
        for (expected, actual) in chunks.keys().enumerate() {
            if *actual != expected as u32 {
                return None;
            }
        }

        let joined: String = chunks.values().map(String::as_str).collect();
        let bytes = URL_SAFE_NO_PAD.decode(joined.as_bytes()).ok()?;
        let envelope: Envelope = serde_json::from_slice(&bytes).ok()?;
        if envelope.v != FORMAT_VERSION {
            return None;
        }
        envelope.into_session()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testutil;

    fn codec() -> CookieCodec {
        CookieCodec::new("session")
    }

    fn to_map(chunks: Vec<(String, String)>, codec: &CookieCodec) -> BTreeMap<u32, String> {
        chunks
            .into_iter()
            .map(|(name, value)| (codec.chunk_index(&name).unwrap(), value))
            .collect()
    }

    #[test]
    fn round_trip() {
        let codec = codec();
        let session = testutil::session_expiring_in(3600)
            .with_provider_token("gh-token")
            .with_provider_refresh_token("gh-refresh");
        let chunks = to_map(codec.encode(&session), &codec);
        assert_eq!(codec.decode(&chunks), Some(session));
    }

    #[test]
    fn small_payload_still_gets_numbered_chunk() {
        let codec = codec();
        let chunks = codec.encode(&testutil::session_expiring_in(3600));
        assert_eq!(chunks.len(), 1);
        assert_eq!(chunks[0].0, "session.0");
    }

    #[test]
    fn large_payload_is_chunked_and_round_trips() {
        let codec = codec().with_chunk_bytes(64);
        let session = testutil::session_expiring_in(3600);
        let chunks = codec.encode(&session);
        assert!(chunks.len() > 1);
        for (index, (name, value)) in chunks.iter().enumerate() {
            assert_eq!(*name, format!("session.{index}"));
            assert!(value.len() <= 64);
        }
        assert_eq!(codec.decode(&to_map(chunks, &codec)), Some(session));
    }

    #[test]
    fn losing_any_chunk_invalidates_the_set() {
        let codec = codec().with_chunk_bytes(64);
        let full = to_map(codec.encode(&testutil::session_expiring_in(3600)), &codec);
        assert!(full.len() > 1);

        for missing in full.keys() {
            let mut partial = full.clone();
            partial.remove(missing);
            assert_eq!(codec.decode(&partial), None, "chunk {missing} missing");
        }
    }

    #[test]
    fn corrupted_chunk_invalidates_the_set() {
        let codec = codec();
        let mut chunks = to_map(codec.encode(&testutil::session_expiring_in(3600)), &codec);
        let value = chunks.get_mut(&0).unwrap();
        value.replace_range(..4, "!!!!");
        assert_eq!(codec.decode(&chunks), None);
    }

    #[test]
    fn truncated_payload_invalidates_the_set() {
        let codec = codec();
        let mut chunks = to_map(codec.encode(&testutil::session_expiring_in(3600)), &codec);
        let value = chunks.get_mut(&0).unwrap();
        value.truncate(value.len() / 2);
        assert_eq!(codec.decode(&chunks), None);
    }

    #[test]
    fn unknown_version_is_invalid_not_fatal() {
        let codec = codec();
        let envelope = serde_json::json!({
            "v": 99,
            "access_token": testutil::jwt_expiring_at(1_900_000_000),
            "refresh_token": "refresh-1",
            "user": {"id": "user-1"},
        });
        let encoded = URL_SAFE_NO_PAD.encode(serde_json::to_vec(&envelope).unwrap());
        let chunks = BTreeMap::from([(0, encoded)]);
        assert_eq!(codec.decode(&chunks), None);
    }

    #[test]
    fn empty_set_is_invalid() {
        assert_eq!(codec().decode(&BTreeMap::new()), None);
    }

    #[test]
    fn chunk_names_outside_the_family_are_not_indices() {
        let codec = codec();
        assert_eq!(codec.chunk_index("session.0"), Some(0));
        assert_eq!(codec.chunk_index("session.12"), Some(12));
        assert_eq!(codec.chunk_index("session"), None);
        assert_eq!(codec.chunk_index("session.x"), None);
        assert_eq!(codec.chunk_index("other.0"), None);
    }
}
