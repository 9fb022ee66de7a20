//! Action policy validation.
//!
//! Runs before any backend is touched and decides whether an action name is
//! recognised for the verb and whether its required fields are present.
//! Every failure is an HTTP 400 and is deterministic for a given input.

use thiserror::Error;

use crate::action::{GatewayAction, Verb};
use crate::params::Params;

/// HTTP status used for every policy violation.
pub const POLICY_STATUS: u16 = 400;

/// Reasons a request fails the action policy.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PolicyViolation {
    /// The action name is missing, unknown, or not allowed on this verb.
    #[error("허용되지 않은 {verb} 액션입니다.")]
    NotAllowed { verb: Verb, action: String },

    /// A POST body without a usable `action` field.
    #[error("POST 요청 본문에 action이 필요합니다.")]
    MissingAction,

    /// The first required field (in declaration order) that is absent or blank.
    #[error("{action} 요청에는 {field} 값이 필요합니다.")]
    MissingField {
        action: GatewayAction,
        field: &'static str,
    },
}

impl PolicyViolation {
    /// HTTP status for this violation.
    pub fn status(&self) -> u16 {
        POLICY_STATUS
    }
}

/// Validate a GET request. Returns the parsed action when allowed.
pub fn validate_get(action: &str, query: &Params) -> Result<GatewayAction, PolicyViolation> {
    validate(Verb::Get, action, query)
}

/// Validate a POST request. Returns the parsed action when allowed.
pub fn validate_post(action: &str, body: &Params) -> Result<GatewayAction, PolicyViolation> {
    if action.trim().is_empty() {
        return Err(PolicyViolation::MissingAction);
    }
    validate(Verb::Post, action, body)
}

fn validate(verb: Verb, action: &str, params: &Params) -> Result<GatewayAction, PolicyViolation> {
    let name = action.trim();
    let parsed = name
        .parse::<GatewayAction>()
        .ok()
        .filter(|a| a.verb() == verb)
        .ok_or_else(|| PolicyViolation::NotAllowed {
            verb,
            action: name.to_owned(),
        })?;

    if let Some(field) = parsed
        .required_fields()
        .iter()
        .find(|field| !params.has(field))
    {
        return Err(PolicyViolation::MissingField {
            action: parsed,
            field,
        });
    }

    Ok(parsed)
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    fn body(v: serde_json::Value) -> Params {
        match v {
            serde_json::Value::Object(m) => Params::from_object(m),
            _ => unreachable!(),
        }
    }

    #[test]
    fn get_accepts_read_actions() {
        let q = Params::default();
        assert_eq!(validate_get("getRooms", &q), Ok(GatewayAction::GetRooms));
        assert_eq!(
            validate_get(" getReservations ", &q),
            Ok(GatewayAction::GetReservations)
        );
    }

    #[test]
    fn get_rejects_write_action_and_unknown_names() {
        let q = Params::default();
        let err = validate_get("createReservation", &q).unwrap_err();
        assert!(matches!(err, PolicyViolation::NotAllowed { verb: Verb::Get, .. }));
        assert_eq!(err.status(), 400);
        assert!(validate_get("", &q).is_err());
        assert!(validate_get("exportReservationHashes", &q).is_err());
    }

    #[test]
    fn post_rejects_read_action() {
        let b = body(json!({"action": "getRooms"}));
        let err = validate_post("getRooms", &b).unwrap_err();
        assert!(matches!(err, PolicyViolation::NotAllowed { verb: Verb::Post, .. }));
    }

    #[test]
    fn post_without_action_is_missing_action() {
        assert_eq!(
            validate_post("  ", &Params::default()),
            Err(PolicyViolation::MissingAction)
        );
    }

    #[test]
    fn first_missing_field_is_reported_in_order() {
        let b = body(json!({
            "date": "2025-06-10",
            "floor": "6F",
            "startTime": "",
            "teamName": "Eng",
        }));
        let err = validate_post("createReservation", &b).unwrap_err();
        assert_eq!(
            err,
            PolicyViolation::MissingField {
                action: GatewayAction::CreateReservation,
                field: "startTime",
            }
        );
        assert_eq!(err.to_string(), "createReservation 요청에는 startTime 값이 필요합니다.");
    }

    #[test]
    fn complete_create_passes() {
        let b = body(json!({
            "date": "2025-06-10",
            "floor": "6F",
            "startTime": "10:00",
            "endTime": "11:00",
            "teamName": "Eng",
            "userName": "Kim",
            "password": "1234",
        }));
        assert_eq!(
            validate_post("createReservation", &b),
            Ok(GatewayAction::CreateReservation)
        );
    }

    #[test]
    fn verify_admin_needs_code() {
        let err = validate_get("verifyAdmin", &Params::default()).unwrap_err();
        assert!(matches!(err, PolicyViolation::MissingField { field: "code", .. }));
        let q = Params::from_pairs([("code", "123456")]);
        assert_eq!(validate_get("verifyAdmin", &q), Ok(GatewayAction::VerifyAdmin));
    }
}
