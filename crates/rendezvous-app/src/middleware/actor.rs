use salvo::{Depot, Writer};
use uuid::Uuid;

use crate::error::AppError;
use rendezvous_core::constants::ACTOR_HEADER;

/// Depot key of the acting identity.
pub const ACTOR_ID: &str = "actor_id";

/// ## Summary
/// Reads the acting identity from the `X-Actor-Id` header.
///
/// Authentication happens upstream; the gateway forwards the id of whoever
/// it authenticated. Requests without the header continue anonymously.
///
/// ## Side Effects
/// Inserts the actor id into the depot under [`ACTOR_ID`].
///
/// ## Errors
/// Returns HTTP 400 if the header is present but not a UUID.
pub struct ActorMiddleware;

#[salvo::async_trait]
impl salvo::Handler for ActorMiddleware {
    #[tracing::instrument(skip(self, req, depot, res, ctrl), fields(
        method = %req.method(),
        path = %req.uri().path()
    ))]
    async fn handle(
        &self,
        req: &mut salvo::Request,
        depot: &mut Depot,
        res: &mut salvo::Response,
        ctrl: &mut salvo::FlowCtrl,
    ) {
        let Some(value) = req.headers().get(ACTOR_HEADER) else {
            tracing::trace!("No actor header, continuing anonymously");
            return;
        };

        match value.to_str().ok().and_then(|raw| Uuid::parse_str(raw.trim()).ok()) {
            Some(actor_id) => {
                tracing::debug!(%actor_id, "Actor identified");
                depot.insert(ACTOR_ID, actor_id);
            }
            None => {
                tracing::warn!("Malformed actor header");
                AppError::BadRequest(format!("{ACTOR_HEADER} must be a UUID"))
                    .write(req, depot, res)
                    .await;
                ctrl.skip_rest();
            }
        }
    }
}

/// The actor set by [`ActorMiddleware`], if the request carried one.
#[must_use]
pub fn actor_from_depot(depot: &Depot) -> Option<Uuid> {
    depot.get::<Uuid>(ACTOR_ID).ok().copied()
}
