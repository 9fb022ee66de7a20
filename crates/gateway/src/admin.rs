//! Admin authorization.
//!
//! Two ways to prove admin rights coexist: a locally configured code
//! exchanged for a signed admin token, or trust delegated to the legacy
//! backend. A deployment with a local code never asks the legacy backend.

use std::sync::Arc;

use roombook_core::{GatewayAction, Reply, Verb};
use roombook_crypto::{ExposeSecret, SecretString, TokenCodec, constant_time_eq};
use tracing::{debug, warn};

use crate::clock::Clock;
use crate::error::GatewayError;
use crate::legacy::LegacyForwarder;
use crate::messages;

/// Decides whether a caller holds admin rights.
#[derive(Debug)]
pub struct AdminAuthority {
    codec: TokenCodec,
    admin_code: Option<SecretString>,
    legacy: Arc<LegacyForwarder>,
    clock: Arc<dyn Clock>,
}

impl AdminAuthority {
    pub fn new(
        codec: TokenCodec,
        admin_code: Option<SecretString>,
        legacy: Arc<LegacyForwarder>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        let admin_code = admin_code.filter(|c| !c.expose_secret().trim().is_empty());
        Self {
            codec,
            admin_code,
            legacy,
            clock,
        }
    }

    /// Whether admin rights are decided locally.
    pub fn is_local(&self) -> bool {
        self.admin_code.is_some()
    }

    /// Check an admin token.
    ///
    /// 1. A token that verifies locally is accepted.
    /// 2. Otherwise, with a local admin code configured, the answer is no.
    /// 3. Otherwise the legacy backend is asked with a privileged read
    ///    (`getRooms` including inactive rooms) carrying the token.
    pub async fn verify_admin_access(&self, token: Option<&str>) -> Result<bool, GatewayError> {
        let token = token.map(str::trim).unwrap_or_default();

        if !token.is_empty() && self.codec.verify_admin_token(token, self.clock.now()).is_ok() {
            return Ok(true);
        }
        if self.is_local() || token.is_empty() {
            return Ok(false);
        }

        let probe = vec![
            (
                "action".to_owned(),
                GatewayAction::GetRooms.as_str().to_owned(),
            ),
            ("includeInactive".to_owned(), "1".to_owned()),
            ("adminToken".to_owned(), token.to_owned()),
        ];
        let reply = self.legacy.call(Verb::Get, probe).await?;
        debug!(granted = reply.success, "admin check delegated to legacy backend");
        Ok(reply.success)
    }

    /// Exchange the local admin code for an admin token.
    ///
    /// Returns `None` when no local code is configured.
    pub fn exchange_code(&self, code: &str) -> Option<Result<Reply, GatewayError>> {
        let expected = self.admin_code.as_ref()?;
        if !constant_time_eq(code.trim(), expected.expose_secret().trim()) {
            warn!("admin code rejected");
            return Some(Ok(Reply::fail(messages::ADMIN_CODE_MISMATCH)));
        }
        Some(
            self.codec
                .issue_admin_token(self.clock.now())
                .map(Reply::token)
                .map_err(|_| {
                    GatewayError::Misconfiguration("signing secret is not set.".to_owned())
                }),
        )
    }
}

#[cfg(test)]
mod tests {
    use chrono::{Duration, TimeZone, Utc};
    use tokio::io::{AsyncReadExt, AsyncWriteExt};

    use super::*;
    use crate::clock::ManualClock;
    use crate::legacy::LegacyConfig;

    fn codec() -> TokenCodec {
        TokenCodec::new(Some(&SecretString::new("sign".into())))
    }

    fn clock() -> Arc<ManualClock> {
        Arc::new(ManualClock::new(
            Utc.with_ymd_and_hms(2025, 6, 10, 9, 0, 0).unwrap(),
        ))
    }

    fn legacy(url: Option<String>) -> Arc<LegacyForwarder> {
        Arc::new(
            LegacyForwarder::new(&LegacyConfig {
                url,
                ..LegacyConfig::default()
            })
            .unwrap(),
        )
    }

    #[tokio::test]
    async fn local_token_is_accepted_without_legacy() {
        let clock = clock();
        let auth = AdminAuthority::new(
            codec(),
            Some(SecretString::new("123456".into())),
            legacy(None),
            clock.clone(),
        );
        let token = codec().issue_admin_token(clock.now()).unwrap();
        assert!(auth.verify_admin_access(Some(&token)).await.unwrap());

        clock.advance(Duration::hours(13));
        assert!(!auth.verify_admin_access(Some(&token)).await.unwrap());
    }

    #[tokio::test]
    async fn local_mode_never_falls_back() {
        // No legacy URL: any delegation attempt would be a misconfiguration error.
        let auth = AdminAuthority::new(
            codec(),
            Some(SecretString::new("123456".into())),
            legacy(None),
            clock(),
        );
        assert!(!auth.verify_admin_access(Some("forged.token")).await.unwrap());
        assert!(!auth.verify_admin_access(None).await.unwrap());
    }

    #[tokio::test]
    async fn delegates_to_legacy_without_local_code() {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();
        let server = tokio::spawn(async move {
            let (mut stream, _) = listener.accept().await.unwrap();
            let mut buf = vec![0u8; 8192];
            let n = stream.read(&mut buf).await.unwrap();
            let body = r#"{"success":true,"data":[]}"#;
            let resp = format!(
                "HTTP/1.1 200 OK\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{body}",
                body.len()
            );
            stream.write_all(resp.as_bytes()).await.unwrap();
            String::from_utf8_lossy(&buf[..n]).into_owned()
        });

        let auth = AdminAuthority::new(
            codec(),
            None,
            legacy(Some(format!("http://127.0.0.1:{port}/exec"))),
            clock(),
        );
        assert!(auth.verify_admin_access(Some("legacy-token")).await.unwrap());
        let seen = server.await.unwrap();
        assert!(seen.contains("action=getRooms"));
        assert!(seen.contains("includeInactive=1"));
        assert!(seen.contains("adminToken=legacy-token"));
    }

    #[test]
    fn code_exchange() {
        let clock = clock();
        let auth = AdminAuthority::new(
            codec(),
            Some(SecretString::new("123456".into())),
            legacy(None),
            clock.clone(),
        );
        let ok = auth.exchange_code("123456").unwrap().unwrap();
        assert!(ok.success);
        let token = ok.token.unwrap();
        assert!(codec().verify_admin_token(&token, clock.now()).is_ok());

        let bad = auth.exchange_code("000000").unwrap().unwrap();
        assert!(!bad.success);
        assert!(bad.token.is_none());

        let delegated = AdminAuthority::new(codec(), None, legacy(None), clock);
        assert!(delegated.exchange_code("123456").is_none());
    }
}
