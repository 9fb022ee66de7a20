//! Stateless signed bearer tokens.
//!
//! A token is `base64url(json_claims) "." base64url(hmac_sha256(secret, encoded_claims))`,
//! both parts unpadded. Two flavours exist: a reservation-edit token bound to
//! one reservation id, and an admin-session token bound to the admin role.
//! Every verification failure maps to the same [`TokenError`].

use std::fmt;

use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD as B64URL;
use chrono::{DateTime, Utc};
use hmac::{Hmac, Mac};
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use sha2::Sha256;
use subtle::ConstantTimeEq;
use thiserror::Error;
use zeroize::{Zeroize, ZeroizeOnDrop};

type HmacSha256 = Hmac<Sha256>;

/// Reservation-edit token lifetime (10 minutes).
pub const RESERVATION_TOKEN_TTL_SECS: i64 = 10 * 60;

/// Admin-session token lifetime (12 hours).
pub const ADMIN_TOKEN_TTL_SECS: i64 = 12 * 60 * 60;

const ADMIN_ROLE: &str = "admin";

/// The single error every token failure collapses into.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("인증 토큰이 유효하지 않거나 만료되었습니다.")]
pub struct TokenError;

#[derive(Debug, Serialize, Deserialize)]
struct Claims {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    rid: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    role: Option<String>,
    exp: i64,
}

/// HMAC key material, zeroized on drop.
#[derive(Clone, Zeroize, ZeroizeOnDrop)]
struct SigningKey(Vec<u8>);

impl fmt::Debug for SigningKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("SigningKey([REDACTED])")
    }
}

/// Issues and verifies both token flavours with one server-held secret.
///
/// A codec built without a secret (or with an empty one) refuses to issue
/// and rejects every token.
#[derive(Debug, Clone)]
pub struct TokenCodec {
    key: Option<SigningKey>,
}

impl TokenCodec {
    pub fn new(secret: Option<&SecretString>) -> Self {
        let key = secret
            .map(|s| s.expose_secret().as_bytes().to_vec())
            .filter(|bytes| !bytes.is_empty())
            .map(SigningKey);
        Self { key }
    }

    /// Whether a signing secret is present.
    pub fn is_configured(&self) -> bool {
        self.key.is_some()
    }

    /// Issue a token authorizing one update or delete of `reservation_id`.
    pub fn issue_reservation_token(
        &self,
        reservation_id: &str,
        now: DateTime<Utc>,
    ) -> Result<String, TokenError> {
        self.sign(&Claims {
            rid: Some(reservation_id.to_owned()),
            role: None,
            exp: now.timestamp() + RESERVATION_TOKEN_TTL_SECS,
        })
    }

    /// Issue an admin-session token.
    pub fn issue_admin_token(&self, now: DateTime<Utc>) -> Result<String, TokenError> {
        self.sign(&Claims {
            rid: None,
            role: Some(ADMIN_ROLE.to_owned()),
            exp: now.timestamp() + ADMIN_TOKEN_TTL_SECS,
        })
    }

    /// Accept only an unexpired token naming exactly `reservation_id`.
    pub fn verify_reservation_token(
        &self,
        token: &str,
        reservation_id: &str,
        now: DateTime<Utc>,
    ) -> Result<(), TokenError> {
        let claims = self.verify(token, now)?;
        match claims.rid.as_deref() {
            Some(rid) if rid == reservation_id => Ok(()),
            _ => Err(TokenError),
        }
    }

    /// Accept only an unexpired token carrying the admin role.
    pub fn verify_admin_token(&self, token: &str, now: DateTime<Utc>) -> Result<(), TokenError> {
        let claims = self.verify(token, now)?;
        match claims.role.as_deref() {
            Some(ADMIN_ROLE) => Ok(()),
            _ => Err(TokenError),
        }
    }

    fn sign(&self, claims: &Claims) -> Result<String, TokenError> {
        let key = self.key.as_ref().ok_or(TokenError)?;
        let payload = serde_json::to_vec(claims).map_err(|_| TokenError)?;
        let encoded = B64URL.encode(payload);
        let signature = Self::digest(key, &encoded)?;
        Ok(format!("{encoded}.{signature}"))
    }

    fn verify(&self, token: &str, now: DateTime<Utc>) -> Result<Claims, TokenError> {
        let key = self.key.as_ref().ok_or(TokenError)?;

        let mut parts = token.split('.');
        let (Some(encoded), Some(provided), None) = (parts.next(), parts.next(), parts.next())
        else {
            return Err(TokenError);
        };
        if encoded.is_empty() || provided.is_empty() {
            return Err(TokenError);
        }

        let expected = Self::digest(key, encoded)?;
        if !bool::from(expected.as_bytes().ct_eq(provided.as_bytes())) {
            return Err(TokenError);
        }

        let payload = B64URL.decode(encoded).map_err(|_| TokenError)?;
        let claims: Claims = serde_json::from_slice(&payload).map_err(|_| TokenError)?;
        if now.timestamp() >= claims.exp {
            return Err(TokenError);
        }
        Ok(claims)
    }

    fn digest(key: &SigningKey, encoded: &str) -> Result<String, TokenError> {
        let mut mac = HmacSha256::new_from_slice(&key.0).map_err(|_| TokenError)?;
        mac.update(encoded.as_bytes());
        Ok(B64URL.encode(mac.finalize().into_bytes()))
    }
}

#[cfg(test)]
mod tests {
    use chrono::{Duration, TimeZone};

    use super::*;

    fn codec() -> TokenCodec {
        TokenCodec::new(Some(&SecretString::new("test-signing-secret".into())))
    }

    fn t0() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 6, 10, 9, 0, 0).unwrap()
    }

    #[test]
    fn reservation_token_round_trip() {
        let c = codec();
        let token = c.issue_reservation_token("abc123", t0()).unwrap();
        assert_eq!(token.split('.').count(), 2);
        assert!(c.verify_reservation_token(&token, "abc123", t0()).is_ok());
        assert!(
            c.verify_reservation_token(&token, "abc123", t0() + Duration::seconds(599))
                .is_ok()
        );
    }

    #[test]
    fn reservation_token_is_bound_to_id() {
        let c = codec();
        let token = c.issue_reservation_token("abc123", t0()).unwrap();
        assert_eq!(
            c.verify_reservation_token(&token, "other", t0()),
            Err(TokenError)
        );
        assert_eq!(c.verify_admin_token(&token, t0()), Err(TokenError));
    }

    #[test]
    fn reservation_token_expires_after_ten_minutes() {
        let c = codec();
        let token = c.issue_reservation_token("abc123", t0()).unwrap();
        assert_eq!(
            c.verify_reservation_token(&token, "abc123", t0() + Duration::seconds(600)),
            Err(TokenError)
        );
    }

    #[test]
    fn admin_token_lifetime() {
        let c = codec();
        let token = c.issue_admin_token(t0()).unwrap();
        assert!(c.verify_admin_token(&token, t0() + Duration::hours(11)).is_ok());
        assert_eq!(
            c.verify_admin_token(&token, t0() + Duration::hours(12)),
            Err(TokenError)
        );
        assert_eq!(
            c.verify_reservation_token(&token, "abc123", t0()),
            Err(TokenError)
        );
    }

    #[test]
    fn any_single_signature_change_is_rejected() {
        let c = codec();
        let token = c.issue_admin_token(t0()).unwrap();
        let (payload, sig) = token.split_once('.').unwrap();
        for i in 0..sig.len() {
            let mut bytes = sig.as_bytes().to_vec();
            bytes[i] = if bytes[i] == b'A' { b'B' } else { b'A' };
            let tampered = format!("{payload}.{}", String::from_utf8(bytes).unwrap());
            assert_eq!(c.verify_admin_token(&tampered, t0()), Err(TokenError));
        }
    }

    #[test]
    fn payload_tampering_is_rejected() {
        let c = codec();
        let token = c.issue_reservation_token("abc123", t0()).unwrap();
        let (_, sig) = token.split_once('.').unwrap();
        let forged = B64URL.encode(br#"{"role":"admin","exp":9999999999}"#);
        assert_eq!(
            c.verify_admin_token(&format!("{forged}.{sig}"), t0()),
            Err(TokenError)
        );
    }

    #[test]
    fn malformed_tokens_are_rejected() {
        let c = codec();
        for bad in ["", ".", "abc", "a.b.c", "abc.", ".abc", "not-base64!.sig"] {
            assert_eq!(c.verify_admin_token(bad, t0()), Err(TokenError), "{bad}");
        }
    }

    #[test]
    fn missing_secret_rejects_everything() {
        let signed = codec().issue_admin_token(t0()).unwrap();
        let unsigned = TokenCodec::new(None);
        assert!(!unsigned.is_configured());
        assert_eq!(unsigned.issue_admin_token(t0()), Err(TokenError));
        assert_eq!(unsigned.verify_admin_token(&signed, t0()), Err(TokenError));
        let empty = TokenCodec::new(Some(&SecretString::new(String::new())));
        assert!(!empty.is_configured());
    }

    #[test]
    fn different_secret_rejects() {
        let token = codec().issue_admin_token(t0()).unwrap();
        let other = TokenCodec::new(Some(&SecretString::new("another".into())));
        assert_eq!(other.verify_admin_token(&token, t0()), Err(TokenError));
    }

    #[test]
    fn debug_redacts_key() {
        let dbg = format!("{:?}", codec());
        assert!(!dbg.contains("test-signing-secret"));
    }
}
