//! vb-core: Villa Gateway Core Library
//!
//! Process-wide configuration (calendar feeds, HTTP settings, villa
//! timezone) and the shared error type.

pub mod config;
pub mod error;

pub use config::{ApiConfig, AvailabilityConfig, CalendarSource, Config};
pub use error::{Error, Result};
