//! In-memory application wiring for handler tests.

use std::sync::Arc;

use config::FileFormat;
use salvo::{Router, Service};
use uuid::Uuid;

use rendezvous_db::db::memory::MemoryStore;
use rendezvous_service::SchedulingEngine;
use rendezvous_service::catalog::Catalog;
use rendezvous_service::events::LogEventSink;

use super::routes;
use crate::config::{
    BookingConfig, CatalogConfig, ConfigHandler, DatabaseConfig, LoggingConfig, ServerConfig,
    Settings, StorageBackend, StorageConfig,
};
use crate::engine_handler::EngineHandler;

pub const BASE: &str = "http://127.0.0.1:8699/api";

pub const ORG: Uuid = Uuid::from_u128(1);
/// 30 minutes, Alice and Bob.
pub const PASSPORT: Uuid = Uuid::from_u128(10);
/// 60 minutes, Alice only.
pub const INTERVIEW: Uuid = Uuid::from_u128(11);
pub const ALICE: Uuid = Uuid::from_u128(100);
pub const BOB: Uuid = Uuid::from_u128(101);
pub const ATTENDEE: Uuid = Uuid::from_u128(500);

/// A Monday far enough ahead that none of its slots have started.
pub const MONDAY: &str = "2099-03-02";
pub const TUESDAY: &str = "2099-03-03";

const CATALOG: &str = r#"
[[organizations]]
id = "00000000-0000-0000-0000-000000000001"
name = "Consulate"
timezone = "UTC"

[organizations.schedule.weekly]
monday = { open = true, windows = [{ start = "09:00", end = "17:00" }] }
tuesday = { open = true, windows = [{ start = "09:00", end = "17:00" }] }
wednesday = { open = true, windows = [{ start = "09:00", end = "17:00" }] }
thursday = { open = true, windows = [{ start = "09:00", end = "17:00" }] }
friday = { open = true, windows = [{ start = "09:00", end = "17:00" }] }
saturday = { open = false }
sunday = { open = false }

[[organizations.country_schedules]]
country = "NO"

[organizations.country_schedules.schedule.weekly]
monday = { open = true, windows = [{ start = "09:00", end = "11:00" }] }
tuesday = { open = false }
wednesday = { open = false }
thursday = { open = false }
friday = { open = false }
saturday = { open = false }
sunday = { open = false }

[[organizations.services]]
id = "00000000-0000-0000-0000-00000000000a"
name = "Passport renewal"
duration_minutes = 30

[[organizations.services]]
id = "00000000-0000-0000-0000-00000000000b"
name = "Visa interview"
duration_minutes = 60

[[organizations.agents]]
id = "00000000-0000-0000-0000-000000000064"
name = "Alice"
qualified_services = ["00000000-0000-0000-0000-00000000000a", "00000000-0000-0000-0000-00000000000b"]

[[organizations.agents]]
id = "00000000-0000-0000-0000-000000000065"
name = "Bob"
qualified_services = ["00000000-0000-0000-0000-00000000000a"]
"#;

pub fn settings() -> Settings {
    Settings {
        database: DatabaseConfig {
            url: "postgres://unused".to_string(),
            max_connections: 1,
        },
        server: ServerConfig {
            host: "127.0.0.1".to_string(),
            port: 8699,
        },
        logging: LoggingConfig {
            level: "debug".to_string(),
        },
        storage: StorageConfig {
            backend: StorageBackend::Memory,
        },
        catalog: CatalogConfig {
            path: "catalog.toml".to_string(),
        },
        booking: BookingConfig {
            timeout_ms: 5_000,
            max_range_days: 31,
        },
    }
}

pub fn service() -> Service {
    let catalog = Arc::new(Catalog::parse(CATALOG, FileFormat::Toml).unwrap());
    let settings = settings();
    let engine = SchedulingEngine::new(
        catalog.clone(),
        catalog,
        Arc::new(MemoryStore::new()),
        Arc::new(LogEventSink),
        settings.booking.clone(),
    );

    Service::new(
        Router::new()
            .hoop(ConfigHandler { settings })
            .hoop(EngineHandler { engine })
            .push(routes()),
    )
}

pub fn booking(service_id: Uuid, date: &str, start: &str, end: &str) -> serde_json::Value {
    serde_json::json!({
        "organization_id": ORG,
        "service_id": service_id,
        "attendee_id": ATTENDEE,
        "date": date,
        "start_time": start,
        "end_time": end,
    })
}
