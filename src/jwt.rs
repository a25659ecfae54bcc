//! Unverified claim extraction from JWT access tokens.
//!
//! Signature verification is the identity provider's job; this crate only
//! needs the `exp` claim to know when to schedule a refresh. Nothing read
//! here is ever used for an authorization decision.

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use serde_json::Value as JsonValue;
use time::OffsetDateTime;

use crate::error::Error;

/// Extracts the expiry instant from a JWT's `exp` claim.
///
/// # Errors
///
/// Returns [`Error::Token`] if the token is not three dot-separated
/// base64url segments, the payload is not JSON, or `exp` is absent.
pub(crate) fn expiry(token: &str) -> Result<OffsetDateTime, Error> {
    let claims = decode_claims(token)?;
    let exp = claims
        .get("exp")
        .and_then(JsonValue::as_i64)
        .ok_or_else(|| Error::Token("missing claim: exp".into()))?;
    OffsetDateTime::from_unix_timestamp(exp)
        .map_err(|_| Error::Token(format!("exp out of range: {exp}")))
}

pub(crate) fn decode_claims(token: &str) -> Result<JsonValue, Error> {
    let mut segments = token.split('.');
    let payload = match (segments.next(), segments.next(), segments.next(), segments.next()) {
        (Some(_), Some(payload), Some(_), None) => payload,
        _ => return Err(Error::Token("invalid token format".into())),
    };

    let bytes = URL_SAFE_NO_PAD
        .decode(payload)
        .map_err(|_| Error::Token("invalid payload encoding".into()))?;
    serde_json::from_slice(&bytes).map_err(|_| Error::Token("invalid payload".into()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testutil;

    #[test]
    fn extracts_exp_claim() {
        let token = testutil::jwt_expiring_at(1_800_000_000);
        assert_eq!(expiry(&token).unwrap().unix_timestamp(), 1_800_000_000);
    }

    #[test]
    fn rejects_wrong_segment_count() {
        assert!(expiry("only-one-segment").is_err());
        assert!(expiry("two.segments").is_err());
        assert!(expiry("a.b.c.d").is_err());
    }

    #[test]
    fn rejects_bad_base64_payload() {
        assert!(expiry("aGVhZGVy.!!!not-base64!!!.c2ln").is_err());
    }

    #[test]
    fn rejects_non_json_payload() {
        use base64::engine::general_purpose::URL_SAFE_NO_PAD;
        use base64::Engine;
        let payload = URL_SAFE_NO_PAD.encode(b"not json");
        assert!(expiry(&format!("h.{payload}.s")).is_err());
    }

    #[test]
    fn other_claims_are_readable() {
        let token = testutil::jwt_expiring_at(1_800_000_000);
        let claims = decode_claims(&token).unwrap();
        assert_eq!(claims.get("sub").and_then(|v| v.as_str()), Some("user-1"));
    }
}
