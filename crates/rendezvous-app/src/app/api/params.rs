//! Path and query extraction shared by the handlers.

use chrono::NaiveDate;
use salvo::Request;
use serde::Deserialize;
use uuid::Uuid;

use rendezvous_core::interval::DateRange;

use crate::error::{AppError, AppResult};

/// `?from=YYYY-MM-DD&to=YYYY-MM-DD`, `to` exclusive.
#[derive(Debug, Deserialize)]
pub struct RangeQuery {
    pub from: NaiveDate,
    pub to: NaiveDate,
}

impl RangeQuery {
    /// ## Errors
    /// `InvalidInput` if `to` is before `from`.
    pub fn range(&self) -> AppResult<DateRange> {
        Ok(DateRange::new(self.from, self.to)?)
    }
}

/// ## Errors
/// `BadRequest` if the path segment is missing or not a UUID.
pub fn path_id(req: &Request, name: &str) -> AppResult<Uuid> {
    req.param::<Uuid>(name)
        .ok_or_else(|| AppError::BadRequest(format!("path parameter {name} must be a UUID")))
}

/// ## Errors
/// `BadRequest` if the query string does not deserialize into `T`.
pub fn parse_query<'de, T: Deserialize<'de>>(req: &'de mut Request) -> AppResult<T> {
    req.parse_queries::<T>()
        .map_err(|e| AppError::BadRequest(format!("invalid query: {e}")))
}

/// ## Errors
/// `BadRequest` if the body is not JSON or does not deserialize into `T`.
pub async fn parse_body<T>(req: &mut Request) -> AppResult<T>
where
    T: for<'de> Deserialize<'de>,
{
    req.parse_json::<T>()
        .await
        .map_err(|e| AppError::BadRequest(format!("invalid body: {e}")))
}

/// Like [`parse_body`], but an empty body yields `T::default()`.
///
/// ## Errors
/// `BadRequest` if a body is present and does not deserialize into `T`.
pub async fn parse_optional_body<T>(req: &mut Request) -> AppResult<T>
where
    T: for<'de> Deserialize<'de> + Default,
{
    if req.content_type().is_none() {
        return Ok(T::default());
    }
    parse_body(req).await
}
