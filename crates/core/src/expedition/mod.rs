//! Expedition countdown domain.
//!
//! - [`record`]: the start/end/optimistic record and its validation
//! - [`countdown`]: tick-driven controller rendering into a surface
//! - [`store`]: persistence in the local key/value store
//! - [`import`]: one-time import from page URL parameters
//! - [`app`]: application state tying the above together

pub mod app;
pub mod countdown;
pub mod import;
pub mod quotes;
pub mod record;
pub mod store;

pub use app::{ExpeditionApp, StartOutcome, Status, View};
pub use countdown::{
    CompleteFrame, CountdownController, CountdownError, CountdownFrame, Frame, LastFrame, Mode, ModeChange, Surface,
    TickOutcome, TimeParts, Timing,
};
pub use import::{UrlImport, import_from_url};
pub use quotes::QuoteRotator;
pub use record::{ExpeditionRecord, ValidationError, parse_datetime};
pub use store::ExpeditionStore;
