//! The expedition record and its validation rules.

use chrono::{DateTime, NaiveDateTime, TimeDelta, Utc};
use serde::{Deserialize, Serialize};

use super::countdown::Mode;

/// Shortest expedition accepted at creation time.
pub const MIN_EXPEDITION_SECS: i64 = 60 * 60;

/// Naive date-time layouts accepted from forms, URLs and storage.
const NAIVE_FORMATS: &[&str] = &["%Y-%m-%dT%H:%M:%S", "%Y-%m-%dT%H:%M", "%Y-%m-%d %H:%M:%S", "%Y-%m-%d %H:%M"];

/// Reasons expedition dates are rejected. One variant per violated bound.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ValidationError {
    #[error("please fill in the required field: {0}")]
    MissingField(&'static str),

    #[error("invalid {field} date {value:?}, expected YYYY-MM-DDTHH:MM:SS")]
    InvalidDate { field: &'static str, value: String },

    #[error("end date must be later than the start date")]
    EndNotAfterStart,

    #[error("end date must be in the future")]
    EndInPast,

    #[error("expedition must last at least 1 hour")]
    TooShort,

    #[error("optimistic date must be later than the start date")]
    OptimisticNotAfterStart,

    #[error("optimistic date must be earlier than the end date")]
    OptimisticNotBeforeEnd,

    #[error("optimistic date must be in the future")]
    OptimisticInPast,
}

/// Parse a date-time as entered by a user or carried in a URL.
///
/// Naive layouts are read as UTC; RFC 3339 input keeps its offset.
pub fn parse_datetime(field: &'static str, value: &str) -> Result<DateTime<Utc>, ValidationError> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(ValidationError::MissingField(field));
    }

    if let Ok(dt) = DateTime::parse_from_rfc3339(trimmed) {
        return Ok(dt.with_timezone(&Utc));
    }

    NAIVE_FORMATS
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(trimmed, fmt).ok())
        .map(|naive| naive.and_utc())
        .ok_or_else(|| ValidationError::InvalidDate { field, value: trimmed.to_string() })
}

/// Stored dates go through the same layouts as form input.
mod stored_date {
    use chrono::{DateTime, Utc};
    use serde::{Deserialize, Deserializer, de::Error as _};

    use super::parse_datetime;

    pub fn required<'de, D: Deserializer<'de>>(deserializer: D) -> Result<DateTime<Utc>, D::Error> {
        let raw = String::deserialize(deserializer)?;
        parse_datetime("date", &raw).map_err(D::Error::custom)
    }

    pub fn optional<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<DateTime<Utc>>, D::Error> {
        match Option::<String>::deserialize(deserializer)? {
            Some(raw) if !raw.trim().is_empty() => parse_datetime("optimistic date", &raw)
                .map(Some)
                .map_err(D::Error::custom),
            _ => Ok(None),
        }
    }
}

/// The user's configured start, end and optional optimistic end.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExpeditionRecord {
    #[serde(rename = "start_date", deserialize_with = "stored_date::required")]
    pub start: DateTime<Utc>,

    #[serde(rename = "end_date", deserialize_with = "stored_date::required")]
    pub end: DateTime<Utc>,

    #[serde(
        rename = "optimistic_end_date",
        default,
        deserialize_with = "stored_date::optional",
        skip_serializing_if = "Option::is_none"
    )]
    pub optimistic_end: Option<DateTime<Utc>>,
}

impl ExpeditionRecord {
    /// Build a new record, enforcing every creation-time invariant.
    pub fn create(
        start: DateTime<Utc>, end: DateTime<Utc>, optimistic_end: Option<DateTime<Utc>>, now: DateTime<Utc>,
    ) -> Result<Self, ValidationError> {
        if end <= start {
            return Err(ValidationError::EndNotAfterStart);
        }
        if end <= now {
            return Err(ValidationError::EndInPast);
        }
        if end - start < TimeDelta::seconds(MIN_EXPEDITION_SECS) {
            return Err(ValidationError::TooShort);
        }
        if let Some(optimistic) = optimistic_end {
            check_optimistic_bounds(start, end, optimistic)?;
            if optimistic <= now {
                return Err(ValidationError::OptimisticInPast);
            }
        }
        Ok(Self { start, end, optimistic_end })
    }

    /// Build a record from an edit of existing settings.
    ///
    /// Only ordering is enforced; an in-progress expedition may already
    /// have a start in the past and is not held to the minimum duration.
    pub fn edit(
        start: DateTime<Utc>, end: DateTime<Utc>, optimistic_end: Option<DateTime<Utc>>,
    ) -> Result<Self, ValidationError> {
        if end <= start {
            return Err(ValidationError::EndNotAfterStart);
        }
        if let Some(optimistic) = optimistic_end {
            check_optimistic_bounds(start, end, optimistic)?;
        }
        Ok(Self { start, end, optimistic_end })
    }

    /// Parse and validate form input for a new expedition.
    pub fn from_form(
        start: &str, end: &str, optimistic_end: Option<&str>, now: DateTime<Utc>,
    ) -> Result<Self, ValidationError> {
        let (start, end, optimistic_end) = parse_fields(start, end, optimistic_end)?;
        Self::create(start, end, optimistic_end, now)
    }

    /// Parse and validate form input that edits an existing expedition.
    pub fn from_settings(start: &str, end: &str, optimistic_end: Option<&str>) -> Result<Self, ValidationError> {
        let (start, end, optimistic_end) = parse_fields(start, end, optimistic_end)?;
        Self::edit(start, end, optimistic_end)
    }

    /// Copy of this record with an optimistic end accepted from the prompt.
    pub fn with_optimistic_end(&self, optimistic: DateTime<Utc>, now: DateTime<Utc>) -> Result<Self, ValidationError> {
        check_optimistic_bounds(self.start, self.end, optimistic)?;
        if optimistic <= now {
            return Err(ValidationError::OptimisticInPast);
        }
        Ok(Self { optimistic_end: Some(optimistic), ..*self })
    }

    /// Active target for a display mode.
    pub fn target(&self, mode: Mode) -> DateTime<Utc> {
        match (mode, self.optimistic_end) {
            (Mode::Optimistic, Some(optimistic)) => optimistic,
            _ => self.end,
        }
    }

    /// Midpoint between start and end, offered as the prompt's default.
    pub fn suggested_optimistic_end(&self) -> DateTime<Utc> {
        self.start + (self.end - self.start) / 2
    }
}

fn check_optimistic_bounds(
    start: DateTime<Utc>, end: DateTime<Utc>, optimistic: DateTime<Utc>,
) -> Result<(), ValidationError> {
    if optimistic <= start {
        return Err(ValidationError::OptimisticNotAfterStart);
    }
    if optimistic >= end {
        return Err(ValidationError::OptimisticNotBeforeEnd);
    }
    Ok(())
}

type ParsedFields = (DateTime<Utc>, DateTime<Utc>, Option<DateTime<Utc>>);

fn parse_fields(start: &str, end: &str, optimistic_end: Option<&str>) -> Result<ParsedFields, ValidationError> {
    let start = parse_datetime("start", start)?;
    let end = parse_datetime("end", end)?;
    let optimistic_end = match optimistic_end.map(str::trim) {
        Some(value) if !value.is_empty() => Some(parse_datetime("optimistic", value)?),
        _ => None,
    };
    Ok((start, end, optimistic_end))
}
