use roombook_core::PolicyViolation;
use thiserror::Error;

/// Generic message returned to clients for any backend failure.
pub const UPSTREAM_FAILED: &str = "Upstream request failed.";

/// Errors that abort a gateway request with a non-200 status.
///
/// Business-rule rejections are not errors; they are ordinary replies with
/// `success: false`.
#[derive(Debug, Error)]
pub enum GatewayError {
    /// The action name or its required fields failed the policy check.
    #[error(transparent)]
    Policy(#[from] PolicyViolation),

    /// A required setting (legacy URL, signing secret) is missing.
    #[error("server misconfiguration: {0}")]
    Misconfiguration(String),

    /// The legacy backend or a webhook could not be reached or answered badly.
    #[error("transport error: {0}")]
    Transport(String),

    /// The managed datastore failed.
    #[error("state error: {0}")]
    State(#[from] roombook_state::StateError),
}

impl GatewayError {
    /// HTTP status for this error.
    pub fn status(&self) -> u16 {
        match self {
            Self::Policy(v) => v.status(),
            Self::Misconfiguration(_) => 500,
            Self::Transport(_) | Self::State(_) => 502,
        }
    }

    /// The message safe to show a client. Backend detail is never included.
    pub fn public_message(&self) -> String {
        match self {
            Self::Policy(v) => v.to_string(),
            Self::Misconfiguration(detail) => format!("Server misconfiguration: {detail}"),
            Self::Transport(_) | Self::State(_) => UPSTREAM_FAILED.to_owned(),
        }
    }
}

#[cfg(test)]
mod tests {
    use roombook_core::Verb;

    use super::*;

    #[test]
    fn statuses_follow_taxonomy() {
        let policy = GatewayError::Policy(PolicyViolation::NotAllowed {
            verb: Verb::Get,
            action: "x".into(),
        });
        assert_eq!(policy.status(), 400);
        assert_eq!(GatewayError::Misconfiguration("x".into()).status(), 500);
        assert_eq!(GatewayError::Transport("x".into()).status(), 502);
        assert_eq!(
            GatewayError::State(roombook_state::StateError::Backend("x".into())).status(),
            502
        );
    }

    #[test]
    fn backend_detail_is_hidden() {
        let err = GatewayError::Transport("connect refused at 10.0.0.3:443".into());
        assert_eq!(err.public_message(), UPSTREAM_FAILED);
        let err = GatewayError::State(roombook_state::StateError::Backend("pg: boom".into()));
        assert!(!err.public_message().contains("pg"));
    }
}
