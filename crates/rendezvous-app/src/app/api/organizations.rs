use chrono::{NaiveDate, Utc};
use salvo::prelude::Json;
use salvo::{Depot, Request, Router, handler};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use rendezvous_core::appointment::Appointment;
use rendezvous_core::interval::DateRange;
use rendezvous_service::availability::Slot;
use rendezvous_service::engine::SlotQuery;

use super::ORGANIZATIONS_ROUTE_COMPONENT;
use super::params::{RangeQuery, parse_query, path_id};
use crate::engine_handler::get_engine_from_depot;
use crate::error::AppResult;

#[derive(Debug, Deserialize)]
struct SlotsQuery {
    from: NaiveDate,
    to: NaiveDate,
    country: Option<String>,
    #[serde(default)]
    available_only: bool,
}

#[derive(Debug, Serialize)]
struct SlotsResponse {
    organization_id: Uuid,
    service_id: Uuid,
    /// Time zone the slot times are local to.
    timezone: &'static str,
    slots: Vec<Slot>,
}

/// ## Summary
/// GET `/organizations/{organization_id}/services/{service_id}/slots`
///
/// Slots that already started, in the organization's time zone, are never
/// listed. With `available_only=true` slots nobody can take are dropped too.
///
/// ## Errors
/// Returns HTTP 400 for malformed parameters or an oversized range and
/// HTTP 404 for unknown organizations or services.
#[handler]
async fn list_slots(req: &mut Request, depot: &mut Depot) -> AppResult<Json<SlotsResponse>> {
    let engine = get_engine_from_depot(depot)?;
    let organization_id = path_id(req, "organization_id")?;
    let service_id = path_id(req, "service_id")?;
    let query: SlotsQuery = parse_query(req)?;

    let listing = engine
        .list_available_slots(&SlotQuery {
            organization_id,
            service_id,
            range: DateRange::new(query.from, query.to)?,
            country_code: query.country,
            not_before: Some(Utc::now()),
        })
        .await?;

    let slots: Vec<Slot> = listing
        .slots
        .filter(|slot| !query.available_only || slot.is_available())
        .collect();
    tracing::debug!(count = slots.len(), "Slots listed");

    Ok(Json(SlotsResponse {
        organization_id,
        service_id,
        timezone: listing.timezone.name(),
        slots,
    }))
}

/// ## Summary
/// GET `/organizations/{organization_id}/appointments`, every state included.
#[handler]
async fn list_appointments(
    req: &mut Request,
    depot: &mut Depot,
) -> AppResult<Json<Vec<Appointment>>> {
    let engine = get_engine_from_depot(depot)?;
    let organization_id = path_id(req, "organization_id")?;
    let range = parse_query::<RangeQuery>(req)?.range()?;

    Ok(Json(
        engine
            .organization_appointments(organization_id, range)
            .await?,
    ))
}

#[must_use]
pub fn routes() -> Router {
    Router::with_path(ORGANIZATIONS_ROUTE_COMPONENT).push(
        Router::with_path("{organization_id}")
            .push(Router::with_path("services/{service_id}/slots").get(list_slots))
            .push(Router::with_path("appointments").get(list_appointments)),
    )
}
