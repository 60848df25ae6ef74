mod agents;
mod app_specific;
mod appointments;
mod organizations;
mod params;

use salvo::Router;

use crate::middleware::actor::ActorMiddleware;

// Re-export route constants from core
pub use rendezvous_core::constants::{
    AGENTS_ROUTE_COMPONENT, API_ROUTE_COMPONENT, APPOINTMENTS_ROUTE_COMPONENT,
    ORGANIZATIONS_ROUTE_COMPONENT,
};

/// ## Summary
/// Constructs the main API router.
#[must_use]
pub fn routes() -> Router {
    Router::with_path(API_ROUTE_COMPONENT)
        .hoop(ActorMiddleware)
        .push(app_specific::routes())
        .push(organizations::routes())
        .push(agents::routes())
        .push(appointments::routes())
}

#[cfg(test)]
mod test_support;
