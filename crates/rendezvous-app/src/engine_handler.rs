use salvo::async_trait;

use crate::error::AppResult;
use rendezvous_core::error::CoreError;
use rendezvous_service::SchedulingEngine;

pub struct EngineHandler {
    pub engine: SchedulingEngine,
}

#[async_trait]
impl salvo::Handler for EngineHandler {
    #[tracing::instrument(skip(self, _req, depot, _res, _ctrl))]
    async fn handle(
        &self,
        _req: &mut salvo::Request,
        depot: &mut salvo::Depot,
        _res: &mut salvo::Response,
        _ctrl: &mut salvo::FlowCtrl,
    ) {
        depot.inject(self.engine.clone());
    }
}

/// ## Summary
/// Retrieves the scheduling engine from the depot.
///
/// ## Errors
/// Returns an error if the engine is not found in the depot.
pub fn get_engine_from_depot(depot: &salvo::Depot) -> AppResult<SchedulingEngine> {
    depot
        .obtain::<SchedulingEngine>()
        .cloned()
        .map_err(|_err| CoreError::InvariantViolation("Scheduling engine not found in depot").into())
}
