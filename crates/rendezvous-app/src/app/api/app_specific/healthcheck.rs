use salvo::prelude::Json;
use salvo::{Depot, Router, handler};
use serde::Serialize;

use crate::config::{StorageBackend, get_config_from_depot};
use crate::error::AppResult;

#[derive(Debug, Serialize)]
struct Health {
    status: &'static str,
    storage: StorageBackend,
}

#[handler]
async fn healthcheck(depot: &Depot) -> AppResult<Json<Health>> {
    let settings = get_config_from_depot(depot)?;
    Ok(Json(Health {
        status: "ok",
        storage: settings.storage.backend,
    }))
}

#[must_use]
pub fn routes() -> Router {
    Router::with_path("healthcheck").get(healthcheck)
}
