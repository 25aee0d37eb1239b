//! Data models for availability checks

use chrono::{DateTime, Duration, LocalResult, NaiveDate, NaiveDateTime, TimeZone, Utc};
use chrono_tz::Tz;
use serde::{Deserialize, Serialize};

use crate::error::{CalendarError, Result};

/// Whether an event occupies time (iCalendar `TRANSP`)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Transparency {
    /// A real reservation or owner block
    #[default]
    Opaque,
    /// Informational only
    Transparent,
}

impl Transparency {
    /// Interpret a raw `TRANSP` value.
    ///
    /// Anything other than `TRANSPARENT`, including a missing property,
    /// is treated as opaque.
    pub fn from_ical(value: Option<&str>) -> Self {
        match value {
            Some(v) if v.trim().eq_ignore_ascii_case("TRANSPARENT") => Self::Transparent,
            _ => Self::Opaque,
        }
    }
}

/// A single VEVENT resolved to UTC instants
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CalendarEvent {
    /// Event UID, when the feed provides one
    #[serde(default)]
    pub uid: Option<String>,
    /// Event summary
    #[serde(default)]
    pub summary: Option<String>,
    /// Start instant (inclusive)
    pub start: DateTime<Utc>,
    /// End instant (exclusive)
    pub end: DateTime<Utc>,
    /// Transparency
    #[serde(default)]
    pub transparency: Transparency,
}

impl CalendarEvent {
    /// Create an opaque event
    pub fn new(start: DateTime<Utc>, end: DateTime<Utc>) -> Self {
        Self {
            uid: None,
            summary: None,
            start,
            end,
            transparency: Transparency::Opaque,
        }
    }

    /// Set the transparency
    pub fn with_transparency(mut self, transparency: Transparency) -> Self {
        self.transparency = transparency;
        self
    }

    /// Set the summary
    pub fn with_summary(mut self, summary: impl Into<String>) -> Self {
        self.summary = Some(summary.into());
        self
    }

    /// Half-open intersection with `[start, end)`.
    ///
    /// Touching boundaries (this event ends exactly when the range starts,
    /// or starts exactly when it ends) do not overlap.
    pub fn overlaps(&self, start: DateTime<Utc>, end: DateTime<Utc>) -> bool {
        self.start < end && self.end > start
    }

    /// Whether the event occupies the villa
    pub fn blocks(&self) -> bool {
        self.transparency == Transparency::Opaque
    }
}

/// Outcome of fetching one calendar source
#[derive(Debug, Clone)]
pub struct CalendarFetchResult {
    pub source_name: String,
    pub events: Vec<CalendarEvent>,
    /// `false` when the source was unreachable or unparsable
    pub ok: bool,
}

impl CalendarFetchResult {
    pub fn fetched(source_name: impl Into<String>, events: Vec<CalendarEvent>) -> Self {
        Self {
            source_name: source_name.into(),
            events,
            ok: true,
        }
    }

    pub fn failed(source_name: impl Into<String>) -> Self {
        Self {
            source_name: source_name.into(),
            events: Vec::new(),
            ok: false,
        }
    }
}

/// Requested stay, check-in to check-out (exclusive)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DateRange {
    pub check_in: NaiveDate,
    pub check_out: NaiveDate,
}

impl DateRange {
    /// Build a range, rejecting `check_in >= check_out`
    pub fn new(check_in: NaiveDate, check_out: NaiveDate) -> Result<Self> {
        if check_in >= check_out {
            return Err(CalendarError::InvalidRange(
                "Check-out must be after check-in".to_string(),
            ));
        }
        Ok(Self {
            check_in,
            check_out,
        })
    }

    /// Parse `YYYY-MM-DD` stay dates
    pub fn parse(check_in: &str, check_out: &str) -> Result<Self> {
        let (check_in, check_out) = (check_in.trim(), check_out.trim());
        if check_in.is_empty() || check_out.is_empty() {
            return Err(CalendarError::InvalidRange("Missing dates".to_string()));
        }

        let parse = |s: &str| {
            NaiveDate::parse_from_str(s, "%Y-%m-%d")
                .map_err(|_| CalendarError::InvalidRange("Invalid date format".to_string()))
        };

        Self::new(parse(check_in)?, parse(check_out)?)
    }

    /// Number of nights in the stay
    pub fn nights(&self) -> i64 {
        (self.check_out - self.check_in).num_days()
    }

    /// Resolve to UTC instants at local midnight in `tz`
    pub fn resolve(&self, tz: Tz) -> (DateTime<Utc>, DateTime<Utc>) {
        (local_midnight(self.check_in, tz), local_midnight(self.check_out, tz))
    }
}

/// Availability result for one query
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AvailabilityVerdict {
    pub available: bool,
    /// Sources with an overlapping opaque event, deduplicated, first-seen order
    pub blocked_by: Vec<String>,
    /// Sources that could not be fetched or parsed and were left out
    #[serde(default)]
    pub failed_sources: Vec<String>,
}

impl AvailabilityVerdict {
    /// True when the verdict was computed from every configured source
    pub fn is_complete(&self) -> bool {
        self.failed_sources.is_empty()
    }
}

/// Resolve a wall-clock time in `tz` to UTC.
///
/// Ambiguous times take the earlier instant; times inside a DST gap are
/// shifted forward by one hour.
pub(crate) fn resolve_local(naive: NaiveDateTime, tz: Tz) -> DateTime<Utc> {
    let local = match tz.from_local_datetime(&naive) {
        LocalResult::Single(dt) => Some(dt),
        LocalResult::Ambiguous(earliest, _) => Some(earliest),
        LocalResult::None => tz.from_local_datetime(&(naive + Duration::hours(1))).earliest(),
    };

    match local {
        Some(dt) => dt.with_timezone(&Utc),
        None => naive.and_utc(),
    }
}

pub(crate) fn local_midnight(date: NaiveDate, tz: Tz) -> DateTime<Utc> {
    resolve_local(date.and_time(chrono::NaiveTime::MIN), tz)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn utc(y: i32, m: u32, d: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(y, m, d, 0, 0, 0).unwrap()
    }

    #[test]
    fn test_transparency_from_ical() {
        assert_eq!(Transparency::from_ical(Some("TRANSPARENT")), Transparency::Transparent);
        assert_eq!(Transparency::from_ical(Some(" transparent ")), Transparency::Transparent);
        assert_eq!(Transparency::from_ical(Some("OPAQUE")), Transparency::Opaque);
        assert_eq!(Transparency::from_ical(Some("X-FREE")), Transparency::Opaque);
        assert_eq!(Transparency::from_ical(None), Transparency::Opaque);
    }

    #[test]
    fn test_overlap_is_half_open() {
        let (check_in, check_out) = (utc(2026, 5, 20), utc(2026, 5, 21));

        // Ends exactly at check-in
        assert!(!CalendarEvent::new(utc(2026, 5, 19), utc(2026, 5, 20)).overlaps(check_in, check_out));
        // Starts exactly at check-out
        assert!(!CalendarEvent::new(utc(2026, 5, 21), utc(2026, 5, 23)).overlaps(check_in, check_out));
        // Covers the night
        assert!(CalendarEvent::new(utc(2026, 5, 20), utc(2026, 5, 22)).overlaps(check_in, check_out));
        // Strictly contains the stay
        assert!(CalendarEvent::new(utc(2026, 5, 1), utc(2026, 6, 1)).overlaps(check_in, check_out));
        // Strictly inside the stay
        let inside = CalendarEvent::new(
            Utc.with_ymd_and_hms(2026, 5, 20, 10, 0, 0).unwrap(),
            Utc.with_ymd_and_hms(2026, 5, 20, 12, 0, 0).unwrap(),
        );
        assert!(inside.overlaps(check_in, check_out));
    }

    #[test]
    fn test_blocks() {
        let event = CalendarEvent::new(utc(2026, 5, 20), utc(2026, 5, 22));
        assert!(event.blocks());
        assert!(!event.with_transparency(Transparency::Transparent).blocks());
    }

    #[test]
    fn test_date_range_parse() {
        let range = DateRange::parse("2026-05-20", " 2026-05-23 ").unwrap();
        assert_eq!(range.check_in, NaiveDate::from_ymd_opt(2026, 5, 20).unwrap());
        assert_eq!(range.nights(), 3);
    }

    #[test]
    fn test_date_range_rejects_equal_and_reversed() {
        let err = DateRange::parse("2026-05-20", "2026-05-20").unwrap_err();
        assert!(matches!(err, CalendarError::InvalidRange(ref m) if m == "Check-out must be after check-in"));

        assert!(DateRange::parse("2026-05-21", "2026-05-20").is_err());
    }

    #[test]
    fn test_date_range_rejects_missing_and_malformed() {
        let err = DateRange::parse("", "2026-05-20").unwrap_err();
        assert_eq!(err.to_string(), "Missing dates");

        let err = DateRange::parse("20/05/2026", "2026-05-21").unwrap_err();
        assert_eq!(err.to_string(), "Invalid date format");

        assert!(DateRange::parse("2026-02-30", "2026-03-02").is_err());
        assert!(err.is_client_error());
    }

    #[test]
    fn test_date_range_resolve_in_villa_timezone() {
        let range = DateRange::parse("2026-05-20", "2026-05-21").unwrap();

        let (start, end) = range.resolve(chrono_tz::UTC);
        assert_eq!(start, utc(2026, 5, 20));
        assert_eq!(end, utc(2026, 5, 21));

        // Bali is UTC+8
        let (start, _) = range.resolve(chrono_tz::Asia::Makassar);
        assert_eq!(start, Utc.with_ymd_and_hms(2026, 5, 19, 16, 0, 0).unwrap());
    }

    #[test]
    fn test_resolve_local_dst_gap() {
        // 02:30 does not exist in New York on 2026-03-08
        let naive = NaiveDate::from_ymd_opt(2026, 3, 8)
            .unwrap()
            .and_hms_opt(2, 30, 0)
            .unwrap();
        let resolved = resolve_local(naive, chrono_tz::America::New_York);
        assert_eq!(resolved, Utc.with_ymd_and_hms(2026, 3, 8, 7, 30, 0).unwrap());
    }

    #[test]
    fn test_verdict_serializes_camel_case() {
        let verdict = AvailabilityVerdict {
            available: false,
            blocked_by: vec!["Airbnb".to_string()],
            failed_sources: vec![],
        };
        let json = serde_json::to_value(&verdict).unwrap();
        assert_eq!(json["blockedBy"][0], "Airbnb");
        assert!(verdict.is_complete());
    }
}
