//! One-time import of an expedition from page URL parameters.
//!
//! `?start=2025-01-01T00:00:00&end=2025-01-08T00:00:00[&optimistic=...]`

use chrono::{DateTime, Utc};

use crate::Error;

use super::record::{ExpeditionRecord, ValidationError, parse_datetime};

/// Raw query parameters, present only when both `start` and `end` are.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UrlParams {
    pub start: String,
    pub end: String,
    pub optimistic: Option<String>,
}

/// A validated import and the address to show once the query is dropped.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UrlImport {
    pub record: ExpeditionRecord,
    pub clean_url: String,
}

/// Extract the expedition parameters from a page address.
pub fn parse_params(address: &url::Url) -> Option<UrlParams> {
    let mut start = None;
    let mut end = None;
    let mut optimistic = None;
    for (key, value) in address.query_pairs() {
        match key.as_ref() {
            "start" if !value.is_empty() => start = Some(value.into_owned()),
            "end" if !value.is_empty() => end = Some(value.into_owned()),
            "optimistic" if !value.is_empty() => optimistic = Some(value.into_owned()),
            _ => {}
        }
    }
    Some(UrlParams { start: start?, end: end?, optimistic })
}

/// Path and fragment of `address`, without the query.
pub fn clean_url(address: &url::Url) -> String {
    match address.fragment() {
        Some(fragment) => format!("{}#{fragment}", address.path()),
        None => address.path().to_string(),
    }
}

/// URL dates must carry a time component.
fn parse_url_date(field: &'static str, value: &str) -> Result<DateTime<Utc>, ValidationError> {
    if !value.contains('T') || !value.contains(':') {
        return Err(ValidationError::InvalidDate { field, value: value.to_string() });
    }
    parse_datetime(field, value)
}

/// Validate URL parameters with the same rules as form creation.
///
/// `Ok(None)` when the address carries no complete parameter set.
pub fn import_from_url(address: &str, now: DateTime<Utc>) -> Result<Option<UrlImport>, Error> {
    let parsed = url::Url::parse(address).map_err(|e| Error::InvalidUrl(format!("{address}: {e}")))?;
    let Some(params) = parse_params(&parsed) else {
        return Ok(None);
    };

    let start = parse_url_date("start", &params.start)?;
    let end = parse_url_date("end", &params.end)?;
    let optimistic = params.optimistic.as_deref().map(|value| parse_url_date("optimistic", value)).transpose()?;
    let record = ExpeditionRecord::create(start, end, optimistic, now)?;

    tracing::info!(start = %record.start, end = %record.end, "expedition imported from URL");
    Ok(Some(UrlImport { record, clean_url: clean_url(&parsed) }))
}
