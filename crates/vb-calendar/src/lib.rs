//! vb-calendar: Calendar availability for villa-gateway
//!
//! This crate decides whether a stay is free by merging several published
//! iCalendar feeds (the master calendar plus one export per OTA).
//!
//! ## Features
//!
//! - Concurrent feed fetching with per-source failure isolation
//! - iCalendar VEVENT parsing with timezone resolution
//! - Half-open overlap checks with `TRANSP:TRANSPARENT` events ignored
//!
//! ## Usage
//!
//! ```rust,ignore
//! use vb_calendar::AvailabilityAggregator;
//!
//! let config = vb_core::Config::load()?;
//! let aggregator = AvailabilityAggregator::from_config(&config)?;
//!
//! let verdict = aggregator.check_availability("2026-05-20", "2026-05-23").await?;
//! if !verdict.available {
//!     println!("Blocked by: {:?}", verdict.blocked_by);
//! }
//! ```

pub mod aggregator;
pub mod client;
pub mod error;
pub mod ical;
pub mod models;

pub use aggregator::AvailabilityAggregator;
pub use client::{CalendarFetcher, IcsClient};
pub use error::{CalendarError, Result};
pub use models::{AvailabilityVerdict, CalendarEvent, CalendarFetchResult, DateRange, Transparency};
