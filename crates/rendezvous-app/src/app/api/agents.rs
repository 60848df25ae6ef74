use salvo::prelude::Json;
use salvo::{Depot, Request, Router, handler};

use rendezvous_core::appointment::Appointment;

use super::AGENTS_ROUTE_COMPONENT;
use super::params::{RangeQuery, parse_query, path_id};
use crate::engine_handler::get_engine_from_depot;
use crate::error::AppResult;

/// ## Summary
/// GET `/agents/{agent_id}/appointments`, the agent's calendar in every state.
#[handler]
async fn calendar(req: &mut Request, depot: &mut Depot) -> AppResult<Json<Vec<Appointment>>> {
    let engine = get_engine_from_depot(depot)?;
    let agent_id = path_id(req, "agent_id")?;
    let range = parse_query::<RangeQuery>(req)?.range()?;

    Ok(Json(engine.agent_calendar(agent_id, range).await?))
}

#[must_use]
pub fn routes() -> Router {
    Router::with_path(AGENTS_ROUTE_COMPONENT)
        .push(Router::with_path("{agent_id}/appointments").get(calendar))
}
