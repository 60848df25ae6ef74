//! Reference data loaded from a configuration file.
//!
//! A catalog lists organizations with their time zone, opening hours,
//! country-specific schedule variants, services and agents. Files are parsed
//! with the `config` crate, so TOML, JSON and YAML are all accepted.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use chrono::TimeDelta;
use chrono_tz::Tz;
use config::{Config, File, FileFormat};
use futures::future::{self, BoxFuture};
use serde::Deserialize;
use uuid::Uuid;

use rendezvous_core::error::{CoreError, CoreResult};
use rendezvous_core::schedule::{Schedule, ScheduleSpec};

use crate::directory::{OrganizationSchedule, ScheduleSource, ServiceDirectory, ServiceInfo};
use crate::error::{ServiceError, ServiceResult};

#[derive(Debug, Clone, Deserialize)]
pub struct CatalogSpec {
    #[serde(default)]
    pub organizations: Vec<OrganizationSpec>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct OrganizationSpec {
    pub id: Uuid,
    #[serde(default)]
    pub name: String,
    /// IANA time zone name, e.g. `Europe/Vienna`.
    pub timezone: String,
    pub schedule: ScheduleSpec,
    #[serde(default)]
    pub country_schedules: Vec<CountryScheduleSpec>,
    #[serde(default)]
    pub services: Vec<ServiceSpec>,
    #[serde(default)]
    pub agents: Vec<AgentSpec>,
}

/// Opening hours that replace the organization default for one country.
#[derive(Debug, Clone, Deserialize)]
pub struct CountryScheduleSpec {
    pub country: String,
    pub schedule: ScheduleSpec,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServiceSpec {
    pub id: Uuid,
    #[serde(default)]
    pub name: String,
    pub duration_minutes: u32,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AgentSpec {
    pub id: Uuid,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub qualified_services: Vec<Uuid>,
    #[serde(default = "default_active")]
    pub active: bool,
}

const fn default_active() -> bool {
    true
}

#[derive(Debug, Clone)]
struct Organization {
    name: String,
    schedule: OrganizationSchedule,
    country_schedules: HashMap<String, Schedule>,
    services: HashMap<Uuid, ServiceInfo>,
}

/// ## Summary
/// Validated, in-memory reference data.
#[derive(Debug, Clone, Default)]
pub struct Catalog {
    organizations: HashMap<Uuid, Organization>,
}

impl Catalog {
    /// ## Summary
    /// Validates a parsed catalog.
    ///
    /// ## Errors
    /// `InvalidSchedule` for malformed opening hours, `ConfigError` for
    /// unknown time zones, duplicate ids, zero durations and agents that
    /// reference services the organization does not offer.
    pub fn from_spec(spec: &CatalogSpec) -> CoreResult<Self> {
        let mut organizations = HashMap::with_capacity(spec.organizations.len());
        for org in &spec.organizations {
            let organization = Organization::from_spec(org)?;
            if organizations.insert(org.id, organization).is_some() {
                return Err(CoreError::ConfigError(format!(
                    "duplicate organization id {}",
                    org.id
                )));
            }
        }
        Ok(Self { organizations })
    }

    /// ## Errors
    /// Returns `ConfigError` if `contents` cannot be parsed as `format`, or
    /// any validation error of [`Catalog::from_spec`].
    pub fn parse(contents: &str, format: FileFormat) -> CoreResult<Self> {
        let spec: CatalogSpec = Config::builder()
            .add_source(File::from_str(contents, format))
            .build()
            .and_then(Config::try_deserialize)
            .map_err(|e| CoreError::ConfigError(format!("failed to parse catalog: {e}")))?;
        Self::from_spec(&spec)
    }

    /// ## Summary
    /// Reads and validates the catalog at `path`. The format follows the
    /// file extension.
    ///
    /// ## Errors
    /// Returns `ConfigError` if the file is missing or unreadable, or any
    /// validation error of [`Catalog::from_spec`].
    pub fn load(path: &Path) -> CoreResult<Self> {
        let contents = std::fs::read_to_string(path).map_err(|e| {
            CoreError::ConfigError(format!("failed to read catalog {}: {e}", path.display()))
        })?;
        Self::parse(&contents, format_for(path)?)
    }

    #[must_use]
    pub fn organization_count(&self) -> usize {
        self.organizations.len()
    }

    #[must_use]
    pub fn organization_name(&self, organization_id: Uuid) -> Option<&str> {
        self.organizations
            .get(&organization_id)
            .map(|org| org.name.as_str())
    }

    fn organization(&self, organization_id: Uuid) -> ServiceResult<&Organization> {
        self.organizations
            .get(&organization_id)
            .ok_or_else(|| ServiceError::NotFound(format!("organization {organization_id}")))
    }

    fn lookup_schedule(
        &self,
        organization_id: Uuid,
        country_code: Option<&str>,
    ) -> ServiceResult<OrganizationSchedule> {
        let org = self.organization(organization_id)?;
        let variant = country_code
            .and_then(|code| org.country_schedules.get(&code.to_ascii_uppercase()));
        Ok(match variant {
            Some(schedule) => OrganizationSchedule {
                schedule: schedule.clone(),
                timezone: org.schedule.timezone,
            },
            None => org.schedule.clone(),
        })
    }

    fn lookup_service(&self, service_id: Uuid, organization_id: Uuid) -> ServiceResult<ServiceInfo> {
        self.organization(organization_id)?
            .services
            .get(&service_id)
            .cloned()
            .ok_or_else(|| {
                ServiceError::NotFound(format!(
                    "service {service_id} at organization {organization_id}"
                ))
            })
    }
}

impl Organization {
    fn from_spec(spec: &OrganizationSpec) -> CoreResult<Self> {
        let timezone: Tz = spec.timezone.parse().map_err(|e| {
            CoreError::ConfigError(format!(
                "organization {}: unknown time zone '{}': {e}",
                spec.id, spec.timezone
            ))
        })?;

        let mut country_schedules = HashMap::with_capacity(spec.country_schedules.len());
        for variant in &spec.country_schedules {
            let code = variant.country.to_ascii_uppercase();
            let schedule = Schedule::try_from(&variant.schedule)?;
            if country_schedules.insert(code, schedule).is_some() {
                return Err(CoreError::ConfigError(format!(
                    "organization {}: duplicate schedule for country {}",
                    spec.id, variant.country
                )));
            }
        }

        let mut services = HashMap::with_capacity(spec.services.len());
        for service in &spec.services {
            if service.duration_minutes == 0 {
                return Err(CoreError::ConfigError(format!(
                    "service {}: duration must be positive",
                    service.id
                )));
            }
            let info = ServiceInfo {
                service_id: service.id,
                organization_id: spec.id,
                duration: TimeDelta::minutes(i64::from(service.duration_minutes)),
                qualified_agent_ids: Vec::new(),
            };
            if services.insert(service.id, info).is_some() {
                return Err(CoreError::ConfigError(format!(
                    "organization {}: duplicate service id {}",
                    spec.id, service.id
                )));
            }
        }

        for agent in &spec.agents {
            for service_id in &agent.qualified_services {
                let info = services.get_mut(service_id).ok_or_else(|| {
                    CoreError::ConfigError(format!(
                        "agent {} is qualified for unknown service {service_id}",
                        agent.id
                    ))
                })?;
                if agent.active {
                    info.qualified_agent_ids.push(agent.id);
                }
            }
        }
        for info in services.values_mut() {
            info.qualified_agent_ids.sort_unstable();
            info.qualified_agent_ids.dedup();
        }

        Ok(Self {
            name: spec.name.clone(),
            schedule: OrganizationSchedule {
                schedule: Schedule::try_from(&spec.schedule)?,
                timezone,
            },
            country_schedules,
            services,
        })
    }
}

fn format_for(path: &Path) -> CoreResult<FileFormat> {
    match path.extension().and_then(|ext| ext.to_str()) {
        Some("toml") => Ok(FileFormat::Toml),
        Some("json") => Ok(FileFormat::Json),
        Some("yaml" | "yml") => Ok(FileFormat::Yaml),
        _ => Err(CoreError::ConfigError(format!(
            "unsupported catalog format: {}",
            path.display()
        ))),
    }
}

impl ScheduleSource for Catalog {
    fn schedule_for<'a>(
        &'a self,
        organization_id: Uuid,
        country_code: Option<&'a str>,
    ) -> BoxFuture<'a, ServiceResult<OrganizationSchedule>> {
        Box::pin(future::ready(
            self.lookup_schedule(organization_id, country_code),
        ))
    }
}

impl ServiceDirectory for Catalog {
    fn service(
        &self,
        service_id: Uuid,
        organization_id: Uuid,
    ) -> BoxFuture<'_, ServiceResult<ServiceInfo>> {
        Box::pin(future::ready(
            self.lookup_service(service_id, organization_id),
        ))
    }
}

/// ## Summary
/// A catalog file that is re-read on every lookup, so edits take effect
/// without a restart.
#[derive(Debug, Clone)]
pub struct FileCatalog {
    path: PathBuf,
}

impl FileCatalog {
    #[must_use]
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// ## Errors
    /// `Unavailable` when the file cannot be read, `InvalidSchedule` when its
    /// contents do not validate.
    #[tracing::instrument(skip(self), fields(path = %self.path.display()))]
    pub async fn current(&self) -> ServiceResult<Catalog> {
        let contents = tokio::fs::read_to_string(&self.path).await.map_err(|e| {
            tracing::error!(error = %e, "Failed to read catalog");
            ServiceError::Unavailable("reference data temporarily unavailable".to_owned())
        })?;
        let catalog = Catalog::parse(&contents, format_for(&self.path)?)?;
        tracing::trace!(
            organizations = catalog.organization_count(),
            "Catalog loaded"
        );
        Ok(catalog)
    }
}

impl ScheduleSource for FileCatalog {
    fn schedule_for<'a>(
        &'a self,
        organization_id: Uuid,
        country_code: Option<&'a str>,
    ) -> BoxFuture<'a, ServiceResult<OrganizationSchedule>> {
        Box::pin(async move {
            self.current()
                .await?
                .lookup_schedule(organization_id, country_code)
        })
    }
}

impl ServiceDirectory for FileCatalog {
    fn service(
        &self,
        service_id: Uuid,
        organization_id: Uuid,
    ) -> BoxFuture<'_, ServiceResult<ServiceInfo>> {
        Box::pin(async move {
            self.current()
                .await?
                .lookup_service(service_id, organization_id)
        })
    }
}

#[cfg(test)]
#[path = "catalog_tests.rs"]
mod tests;
