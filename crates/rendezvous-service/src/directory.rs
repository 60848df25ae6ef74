//! Reference data the engine reads on every call.
//!
//! Organizations, their opening hours and their services live outside the
//! engine. Implementations must return fresh, validated data; the engine keeps
//! no cache.

use chrono::TimeDelta;
use chrono_tz::Tz;
use futures::future::BoxFuture;
use uuid::Uuid;

use rendezvous_core::schedule::Schedule;

use crate::error::ServiceResult;

/// Opening hours of an organization and the time zone they are expressed in.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrganizationSchedule {
    pub schedule: Schedule,
    pub timezone: Tz,
}

/// A service offered at one organization.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServiceInfo {
    pub service_id: Uuid,
    pub organization_id: Uuid,
    pub duration: TimeDelta,
    /// Active agents qualified for the service, ascending by id.
    pub qualified_agent_ids: Vec<Uuid>,
}

impl ServiceInfo {
    #[must_use]
    pub fn is_qualified(&self, agent_id: Uuid) -> bool {
        self.qualified_agent_ids.binary_search(&agent_id).is_ok()
    }
}

pub trait ScheduleSource: Send + Sync {
    /// ## Summary
    /// The schedule that applies to `organization_id`, using the
    /// country-specific variant when one exists for `country_code`.
    ///
    /// ## Errors
    /// `NotFound` for an unknown organization, `InvalidSchedule` when the
    /// stored schedule is malformed.
    fn schedule_for<'a>(
        &'a self,
        organization_id: Uuid,
        country_code: Option<&'a str>,
    ) -> BoxFuture<'a, ServiceResult<OrganizationSchedule>>;
}

pub trait ServiceDirectory: Send + Sync {
    /// ## Errors
    /// `NotFound` when the organization does not offer `service_id`.
    fn service(
        &self,
        service_id: Uuid,
        organization_id: Uuid,
    ) -> BoxFuture<'_, ServiceResult<ServiceInfo>>;
}
