/// Route component constants shared across crates
pub const API_ROUTE_COMPONENT: &str = "api";
pub const ORGANIZATIONS_ROUTE_COMPONENT: &str = "organizations";
pub const APPOINTMENTS_ROUTE_COMPONENT: &str = "appointments";
pub const AGENTS_ROUTE_COMPONENT: &str = "agents";

/// Header carrying the acting identity, set by the authenticating gateway.
pub const ACTOR_HEADER: &str = "x-actor-id";

/// Cancellation reason recorded on the replaced side of a reschedule.
pub const RESCHEDULED_REASON: &str = "rescheduled";
