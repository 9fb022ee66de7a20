//! Backend selection.
//!
//! [`route`] is a pure function of the action, the feature flags, and the
//! request's shape. All backend choice happens here.

use roombook_core::{GatewayAction, Params};

/// Flags that decide which backend is authoritative.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RoutingFlags {
    /// A managed datastore is configured.
    pub db_configured: bool,
    /// Managed reads are switched on.
    pub read_enabled: bool,
    /// Managed writes are switched on.
    pub write_enabled: bool,
    /// A local admin code is configured (self-contained admin mode).
    pub local_admin: bool,
}

impl RoutingFlags {
    fn managed_reads(self) -> bool {
        self.db_configured && self.read_enabled
    }

    fn managed_writes(self) -> bool {
        self.db_configured && self.write_enabled
    }
}

/// Where a request is served.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Backend {
    /// The managed datastore, with business rules applied in the gateway.
    Managed,
    /// Forward verbatim to the legacy backend.
    Legacy,
    /// Answered by the gateway alone (admin code exchange).
    Local,
}

pub fn route(action: GatewayAction, flags: RoutingFlags, params: &Params) -> Backend {
    use GatewayAction as A;

    match action {
        A::VerifyAdmin if flags.local_admin => Backend::Local,
        A::VerifyAdmin => Backend::Legacy,

        A::GetReservations | A::GetReservationById | A::GetRooms => {
            if flags.managed_reads() {
                Backend::Managed
            } else {
                Backend::Legacy
            }
        }

        A::GetSecurityAlerts
        | A::GetOperationalChecks
        | A::GetOperationalMetrics
        | A::GetOperationalMetricsReport
        | A::GetOperationalMetricsTrend
        | A::SendOperationalMetricsReport => {
            if flags.managed_reads() {
                Backend::Managed
            } else {
                Backend::Legacy
            }
        }

        // Locally issued admin tokens mean nothing to the legacy backend, so
        // admin edits go to the managed store even before writes are cut over.
        A::UpdateReservation | A::DeleteReservation => {
            if flags.managed_writes()
                || (flags.db_configured && flags.local_admin && params.has("adminToken"))
            {
                Backend::Managed
            } else {
                Backend::Legacy
            }
        }

        A::CreateReservation | A::VerifyPassword | A::AddRoom | A::UpdateRoom | A::DeleteRoom => {
            if flags.managed_writes() {
                Backend::Managed
            } else {
                Backend::Legacy
            }
        }
    }
}
