use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// HTTP verb an action is allowed on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Verb {
    Get,
    Post,
}

impl Verb {
    /// The canonical upper-case method name.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Get => "GET",
            Self::Post => "POST",
        }
    }
}

impl fmt::Display for Verb {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Every operation name the gateway recognises.
///
/// The set is closed: an action name that does not parse into one of these
/// variants is rejected before any backend is contacted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum GatewayAction {
    GetReservations,
    GetReservationById,
    GetRooms,
    VerifyAdmin,
    GetSecurityAlerts,
    GetOperationalChecks,
    GetOperationalMetrics,
    GetOperationalMetricsReport,
    GetOperationalMetricsTrend,
    CreateReservation,
    UpdateReservation,
    DeleteReservation,
    VerifyPassword,
    AddRoom,
    UpdateRoom,
    DeleteRoom,
    SendOperationalMetricsReport,
}

/// Read allowlist, in declaration order.
pub const GET_ACTIONS: &[GatewayAction] = &[
    GatewayAction::GetReservations,
    GatewayAction::GetReservationById,
    GatewayAction::GetRooms,
    GatewayAction::VerifyAdmin,
    GatewayAction::GetSecurityAlerts,
    GatewayAction::GetOperationalChecks,
    GatewayAction::GetOperationalMetrics,
    GatewayAction::GetOperationalMetricsReport,
    GatewayAction::GetOperationalMetricsTrend,
];

/// Write allowlist, in declaration order.
pub const POST_ACTIONS: &[GatewayAction] = &[
    GatewayAction::CreateReservation,
    GatewayAction::UpdateReservation,
    GatewayAction::DeleteReservation,
    GatewayAction::VerifyPassword,
    GatewayAction::AddRoom,
    GatewayAction::UpdateRoom,
    GatewayAction::DeleteRoom,
    GatewayAction::SendOperationalMetricsReport,
];

impl GatewayAction {
    /// The wire name used in `?action=` and in POST bodies.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::GetReservations => "getReservations",
            Self::GetReservationById => "getReservationById",
            Self::GetRooms => "getRooms",
            Self::VerifyAdmin => "verifyAdmin",
            Self::GetSecurityAlerts => "getSecurityAlerts",
            Self::GetOperationalChecks => "getOperationalChecks",
            Self::GetOperationalMetrics => "getOperationalMetrics",
            Self::GetOperationalMetricsReport => "getOperationalMetricsReport",
            Self::GetOperationalMetricsTrend => "getOperationalMetricsTrend",
            Self::CreateReservation => "createReservation",
            Self::UpdateReservation => "updateReservation",
            Self::DeleteReservation => "deleteReservation",
            Self::VerifyPassword => "verifyPassword",
            Self::AddRoom => "addRoom",
            Self::UpdateRoom => "updateRoom",
            Self::DeleteRoom => "deleteRoom",
            Self::SendOperationalMetricsReport => "sendOperationalMetricsReport",
        }
    }

    /// The only verb this action is accepted on.
    pub fn verb(self) -> Verb {
        if GET_ACTIONS.contains(&self) {
            Verb::Get
        } else {
            Verb::Post
        }
    }

    /// Fields that must be present and non-empty, in scan order.
    pub fn required_fields(self) -> &'static [&'static str] {
        match self {
            Self::GetReservationById => &["id"],
            Self::VerifyAdmin => &["code"],
            Self::CreateReservation => &[
                "date",
                "floor",
                "startTime",
                "endTime",
                "teamName",
                "userName",
                "password",
            ],
            Self::UpdateReservation => &[
                "id",
                "date",
                "floor",
                "startTime",
                "endTime",
                "teamName",
                "userName",
            ],
            Self::DeleteReservation => &["id"],
            Self::VerifyPassword => &["id", "password"],
            Self::AddRoom => &["floor", "name"],
            Self::UpdateRoom | Self::DeleteRoom => &["roomId"],
            Self::GetReservations
            | Self::GetRooms
            | Self::GetSecurityAlerts
            | Self::GetOperationalChecks
            | Self::GetOperationalMetrics
            | Self::GetOperationalMetricsReport
            | Self::GetOperationalMetricsTrend
            | Self::SendOperationalMetricsReport => &[],
        }
    }

    /// Whether the action mutates reservations or rooms.
    pub fn is_write(self) -> bool {
        matches!(
            self,
            Self::CreateReservation
                | Self::UpdateReservation
                | Self::DeleteReservation
                | Self::VerifyPassword
                | Self::AddRoom
                | Self::UpdateRoom
                | Self::DeleteRoom
        )
    }

    /// Whether the action belongs to the operational (admin dashboard) family.
    pub fn is_operational(self) -> bool {
        matches!(
            self,
            Self::GetSecurityAlerts
                | Self::GetOperationalChecks
                | Self::GetOperationalMetrics
                | Self::GetOperationalMetricsReport
                | Self::GetOperationalMetricsTrend
                | Self::SendOperationalMetricsReport
        )
    }
}

impl fmt::Display for GatewayAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Returned when an action name is not part of the closed action set.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnknownAction(pub String);

impl FromStr for GatewayAction {
    type Err = UnknownAction;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        GET_ACTIONS
            .iter()
            .chain(POST_ACTIONS)
            .copied()
            .find(|a| a.as_str() == s)
            .ok_or_else(|| UnknownAction(s.to_owned()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn names_round_trip_through_from_str() {
        for action in GET_ACTIONS.iter().chain(POST_ACTIONS) {
            let parsed: GatewayAction = action.as_str().parse().unwrap();
            assert_eq!(parsed, *action);
        }
    }

    #[test]
    fn unknown_name_is_rejected() {
        let err = "exportReservationHashes".parse::<GatewayAction>().unwrap_err();
        assert_eq!(err, UnknownAction("exportReservationHashes".into()));
        assert!("GETROOMS".parse::<GatewayAction>().is_err());
    }

    #[test]
    fn verbs_follow_allowlists() {
        assert_eq!(GatewayAction::GetRooms.verb(), Verb::Get);
        assert_eq!(GatewayAction::VerifyAdmin.verb(), Verb::Get);
        assert_eq!(GatewayAction::CreateReservation.verb(), Verb::Post);
        assert_eq!(GatewayAction::SendOperationalMetricsReport.verb(), Verb::Post);
    }

    #[test]
    fn allowlists_are_disjoint() {
        for a in GET_ACTIONS {
            assert!(!POST_ACTIONS.contains(a), "{a} appears in both allowlists");
        }
        assert_eq!(GET_ACTIONS.len() + POST_ACTIONS.len(), 17);
    }
}
