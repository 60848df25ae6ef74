mod types;

use chrono::Utc;
use salvo::http::StatusCode;
use salvo::prelude::Json;
use salvo::{Depot, Request, Response, Router, handler};
use uuid::Uuid;

use rendezvous_core::appointment::Appointment;
use rendezvous_core::constants::ACTOR_HEADER;
use rendezvous_service::error::ServiceError;

use super::APPOINTMENTS_ROUTE_COMPONENT;
use super::params::{parse_body, parse_optional_body, path_id};
use crate::engine_handler::get_engine_from_depot;
use crate::error::AppResult;
use crate::middleware::actor::actor_from_depot;
use types::{BookAppointmentBody, CancelBody, RescheduleBody};

/// ## Summary
/// POST `/appointments` - Book a slot.
///
/// ## Side Effects
/// Stores a confirmed appointment and publishes `AppointmentBooked`.
///
/// ## Errors
/// Returns HTTP 400 for intervals the schedule does not offer or that have
/// already started, HTTP 404 for
/// unknown organizations or services and HTTP 409 when no agent is free.
#[handler]
async fn book(
    req: &mut Request,
    depot: &mut Depot,
    res: &mut Response,
) -> AppResult<Json<Appointment>> {
    let engine = get_engine_from_depot(depot)?;
    let request = parse_body::<BookAppointmentBody>(req)
        .await?
        .into_request(Utc::now())?;

    let appointment = engine.book(&request).await?;
    res.status_code(StatusCode::CREATED);
    Ok(Json(appointment))
}

/// GET `/appointments/{id}`
#[handler]
async fn show(req: &mut Request, depot: &mut Depot) -> AppResult<Json<Appointment>> {
    let engine = get_engine_from_depot(depot)?;
    let id = path_id(req, "id")?;
    Ok(Json(engine.get_appointment(id).await?))
}

/// GET `/appointments/{id}/chain` - The appointment and those it replaced,
/// newest first.
#[handler]
async fn chain(req: &mut Request, depot: &mut Depot) -> AppResult<Json<Vec<Appointment>>> {
    let engine = get_engine_from_depot(depot)?;
    let id = path_id(req, "id")?;
    Ok(Json(engine.reschedule_chain(id).await?))
}

/// ## Summary
/// POST `/appointments/{id}/cancel`, with an optional `{"reason": ...}` body.
///
/// ## Errors
/// Returns HTTP 409 unless the appointment is confirmed.
#[handler]
async fn cancel(req: &mut Request, depot: &mut Depot) -> AppResult<Json<Appointment>> {
    let engine = get_engine_from_depot(depot)?;
    let id = path_id(req, "id")?;
    let body = parse_optional_body::<CancelBody>(req).await?;
    Ok(Json(engine.cancel(id, body.reason.as_deref()).await?))
}

/// ## Summary
/// POST `/appointments/{id}/reschedule` - Returns the replacement appointment.
///
/// ## Errors
/// Returns HTTP 409 if the appointment is final or the new slot is taken; the
/// original appointment is unchanged in both cases.
#[handler]
async fn reschedule(req: &mut Request, depot: &mut Depot) -> AppResult<Json<Appointment>> {
    let engine = get_engine_from_depot(depot)?;
    let id = path_id(req, "id")?;
    let request = parse_body::<RescheduleBody>(req)
        .await?
        .into_request(id, Utc::now())?;
    Ok(Json(engine.reschedule(&request).await?))
}

/// ## Summary
/// POST `/appointments/{id}/complete`, by the assigned agent.
///
/// ## Errors
/// Returns HTTP 403 without an actor or when the actor is another agent.
#[handler]
async fn complete(req: &mut Request, depot: &mut Depot) -> AppResult<Json<Appointment>> {
    let engine = get_engine_from_depot(depot)?;
    let id = path_id(req, "id")?;
    let actor_id = require_actor(depot)?;
    Ok(Json(engine.complete(id, actor_id).await?))
}

/// ## Summary
/// POST `/appointments/{id}/missed`, by the assigned agent.
///
/// ## Errors
/// Same as `complete`.
#[handler]
async fn missed(req: &mut Request, depot: &mut Depot) -> AppResult<Json<Appointment>> {
    let engine = get_engine_from_depot(depot)?;
    let id = path_id(req, "id")?;
    let actor_id = require_actor(depot)?;
    Ok(Json(engine.mark_missed(id, actor_id).await?))
}

fn require_actor(depot: &Depot) -> AppResult<Uuid> {
    actor_from_depot(depot).ok_or_else(|| {
        ServiceError::Unauthorized(format!("the {ACTOR_HEADER} header is required")).into()
    })
}

#[must_use]
pub fn routes() -> Router {
    Router::with_path(APPOINTMENTS_ROUTE_COMPONENT)
        .post(book)
        .push(
            Router::with_path("{id}")
                .get(show)
                .push(Router::with_path("chain").get(chain))
                .push(Router::with_path("cancel").post(cancel))
                .push(Router::with_path("reschedule").post(reschedule))
                .push(Router::with_path("complete").post(complete))
                .push(Router::with_path("missed").post(missed)),
        )
}
