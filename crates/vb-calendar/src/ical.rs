//! iCalendar feed parsing
//!
//! Turns a raw `.ics` export into [`CalendarEvent`]s resolved to UTC.
//! Only VEVENT components are read; DATE values and floating times are
//! interpreted in the villa timezone.

use chrono::{DateTime, Duration, NaiveDate, Utc};
use chrono_tz::Tz;
use icalendar::{
    Calendar, CalendarComponent, CalendarDateTime, Component, DatePerhapsTime, Event, EventLike,
};
use tracing::debug;

use crate::error::{CalendarError, Result};
use crate::models::{local_midnight, resolve_local, CalendarEvent, Transparency};

/// Parse an iCalendar document into events
pub fn parse_feed(body: &str, tz: Tz) -> Result<Vec<CalendarEvent>> {
    let body = body.trim_start_matches('\u{feff}').trim_start();
    if !body.starts_with("BEGIN:VCALENDAR") {
        return Err(CalendarError::ParseError(
            "response is not an iCalendar document".to_string(),
        ));
    }

    let calendar = body
        .parse::<Calendar>()
        .map_err(|e| CalendarError::ParseError(e.to_string()))?;

    let mut events = Vec::new();
    for component in &calendar.components {
        let CalendarComponent::Event(event) = component else {
            continue;
        };

        let uid = event.property_value("UID").map(str::to_string);

        let Some(start) = date_property(event, "DTSTART", event.get_start())? else {
            debug!("Skipping event without DTSTART: {:?}", uid);
            continue;
        };
        let start_utc = to_utc(&start, tz);

        let end_utc = match date_property(event, "DTEND", event.get_end())? {
            Some(end) => to_utc(&end, tz),
            None => match event.property_value("DURATION") {
                Some(raw) => parse_duration(raw)
                    .and_then(|duration| start_utc.checked_add_signed(duration))
                    .ok_or_else(|| {
                        CalendarError::ParseError(format!("unusable DURATION {:?} in event {:?}", raw, uid))
                    })?,
                None => default_end(&start, start_utc, tz),
            },
        };

        events.push(CalendarEvent {
            uid,
            summary: event.property_value("SUMMARY").map(str::to_string),
            start: start_utc,
            end: end_utc,
            transparency: Transparency::from_ical(event.property_value("TRANSP")),
        });
    }

    debug!("Parsed {} events", events.len());
    Ok(events)
}

/// A DTSTART/DTEND value, falling back to a bare `YYYYMMDD` date when the
/// property lacks `VALUE=DATE`.
///
/// `Ok(None)` only when the property is absent; a present but unreadable
/// value fails the whole feed so a reservation is never silently dropped.
fn date_property(
    event: &Event,
    name: &str,
    parsed: Option<DatePerhapsTime>,
) -> Result<Option<DatePerhapsTime>> {
    if parsed.is_some() {
        return Ok(parsed);
    }

    let Some(raw) = event.property_value(name) else {
        return Ok(None);
    };

    NaiveDate::parse_from_str(raw.trim(), "%Y%m%d")
        .map(|date| Some(DatePerhapsTime::Date(date)))
        .map_err(|_| CalendarError::ParseError(format!("unreadable {} value {:?}", name, raw)))
}

fn to_utc(value: &DatePerhapsTime, tz: Tz) -> DateTime<Utc> {
    match value {
        DatePerhapsTime::Date(date) => local_midnight(*date, tz),
        DatePerhapsTime::DateTime(CalendarDateTime::Utc(dt)) => *dt,
        DatePerhapsTime::DateTime(CalendarDateTime::Floating(naive)) => resolve_local(*naive, tz),
        DatePerhapsTime::DateTime(CalendarDateTime::WithTimezone { date_time, tzid }) => {
            let zone = tzid.parse::<Tz>().unwrap_or_else(|_| {
                debug!("Unknown TZID {}, using villa timezone", tzid);
                tz
            });
            resolve_local(*date_time, zone)
        }
    }
}

/// End of an event that has neither DTEND nor DURATION: one day for a
/// DATE start, zero length otherwise.
fn default_end(start: &DatePerhapsTime, start_utc: DateTime<Utc>, tz: Tz) -> DateTime<Utc> {
    match start {
        DatePerhapsTime::Date(date) => date
            .succ_opt()
            .map(|next| local_midnight(next, tz))
            .unwrap_or(start_utc),
        DatePerhapsTime::DateTime(_) => start_utc,
    }
}

/// Parse a non-negative iCalendar DURATION such as `P1D`, `P2W` or `PT1H30M`.
///
/// Out-of-range values yield `None`.
fn parse_duration(value: &str) -> Option<Duration> {
    let value = value.trim();
    let rest = value.strip_prefix('+').unwrap_or(value).strip_prefix('P')?;

    let mut total = Duration::zero();
    let mut number = String::new();
    let mut in_time = false;

    for c in rest.chars() {
        match c {
            '0'..='9' => number.push(c),
            'T' if number.is_empty() => in_time = true,
            'W' | 'D' | 'H' | 'M' | 'S' => {
                let n: i64 = number.parse().ok()?;
                number.clear();
                let part = match (c, in_time) {
                    ('W', false) => Duration::try_weeks(n),
                    ('D', false) => Duration::try_days(n),
                    ('H', true) => Duration::try_hours(n),
                    ('M', true) => Duration::try_minutes(n),
                    ('S', true) => Duration::try_seconds(n),
                    _ => None,
                }?;
                total = total.checked_add(&part)?;
            }
            _ => return None,
        }
    }

    number.is_empty().then_some(total)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn utc(y: i32, m: u32, d: u32, h: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(y, m, d, h, 0, 0).unwrap()
    }

    fn feed(events: &str) -> String {
        format!(
            "BEGIN:VCALENDAR\r\nVERSION:2.0\r\nPRODID:-//Test//Villa//EN\r\n{}END:VCALENDAR\r\n",
            events
        )
    }

    #[test]
    fn test_parse_all_day_reservation() {
        let body = feed(
            "BEGIN:VEVENT\r\nUID:abc@airbnb.com\r\nDTSTART;VALUE=DATE:20260520\r\nDTEND;VALUE=DATE:20260522\r\nSUMMARY:Reserved\r\nEND:VEVENT\r\n",
        );

        let events = parse_feed(&body, chrono_tz::UTC).unwrap();
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].uid.as_deref(), Some("abc@airbnb.com"));
        assert_eq!(events[0].summary.as_deref(), Some("Reserved"));
        assert_eq!(events[0].start, utc(2026, 5, 20, 0));
        assert_eq!(events[0].end, utc(2026, 5, 22, 0));
        assert_eq!(events[0].transparency, Transparency::Opaque);
    }

    #[test]
    fn test_parse_bare_date_without_value_param() {
        let body = feed(
            "BEGIN:VEVENT\r\nDTSTART:20260520\r\nDTEND:20260522\r\nSUMMARY:Blocked\r\nEND:VEVENT\r\n",
        );

        let events = parse_feed(&body, chrono_tz::UTC).unwrap();
        assert_eq!(
            events,
            vec![CalendarEvent::new(utc(2026, 5, 20, 0), utc(2026, 5, 22, 0)).with_summary("Blocked")]
        );
        assert!(events[0].blocks());
    }

    #[test]
    fn test_unreadable_dtstart_fails_feed() {
        let body = feed("BEGIN:VEVENT\r\nDTSTART:next tuesday\r\nDTEND:20260522\r\nEND:VEVENT\r\n");

        let err = parse_feed(&body, chrono_tz::UTC).unwrap_err();
        assert!(matches!(err, CalendarError::ParseError(_)));
    }

    #[test]
    fn test_oversized_duration_fails_feed_without_panicking() {
        for duration in ["P100000000D", "P9999999999999999W"] {
            let body = feed(&format!(
                "BEGIN:VEVENT\r\nDTSTART:20260520T100000Z\r\nDURATION:{}\r\nEND:VEVENT\r\n",
                duration
            ));

            let err = parse_feed(&body, chrono_tz::UTC).unwrap_err();
            assert!(matches!(err, CalendarError::ParseError(_)), "{}", duration);
        }
    }

    #[test]
    fn test_all_day_dates_use_villa_timezone() {
        let body = feed("BEGIN:VEVENT\r\nDTSTART;VALUE=DATE:20260520\r\nDTEND;VALUE=DATE:20260521\r\nEND:VEVENT\r\n");

        let events = parse_feed(&body, chrono_tz::Asia::Makassar).unwrap();
        assert_eq!(events[0].start, utc(2026, 5, 19, 16));
        assert_eq!(events[0].end, utc(2026, 5, 20, 16));
    }

    #[test]
    fn test_parse_utc_and_tzid_datetimes() {
        let body = feed(concat!(
            "BEGIN:VEVENT\r\nDTSTART:20260520T140000Z\r\nDTEND:20260521T100000Z\r\nEND:VEVENT\r\n",
            "BEGIN:VEVENT\r\nDTSTART;TZID=Asia/Makassar:20260601T140000\r\nDTEND;TZID=Asia/Makassar:20260602T120000\r\nEND:VEVENT\r\n",
        ));

        let events = parse_feed(&body, chrono_tz::UTC).unwrap();
        assert_eq!(events.len(), 2);
        assert_eq!(events[0].start, utc(2026, 5, 20, 14));
        assert_eq!(events[0].end, utc(2026, 5, 21, 10));
        assert_eq!(events[1].start, utc(2026, 6, 1, 6));
        assert_eq!(events[1].end, utc(2026, 6, 2, 4));
    }

    #[test]
    fn test_transparent_event() {
        let body = feed(
            "BEGIN:VEVENT\r\nDTSTART;VALUE=DATE:20260520\r\nDTEND;VALUE=DATE:20260521\r\nTRANSP:TRANSPARENT\r\nEND:VEVENT\r\n",
        );

        let events = parse_feed(&body, chrono_tz::UTC).unwrap();
        assert_eq!(events[0].transparency, Transparency::Transparent);
        assert!(!events[0].blocks());
    }

    #[test]
    fn test_missing_dtend_defaults() {
        let body = feed(concat!(
            "BEGIN:VEVENT\r\nDTSTART;VALUE=DATE:20260520\r\nEND:VEVENT\r\n",
            "BEGIN:VEVENT\r\nDTSTART:20260520T100000Z\r\nDURATION:P2DT3H\r\nEND:VEVENT\r\n",
            "BEGIN:VEVENT\r\nDTSTART:20260520T100000Z\r\nEND:VEVENT\r\n",
        ));

        let events = parse_feed(&body, chrono_tz::UTC).unwrap();
        assert_eq!(events[0].end, utc(2026, 5, 21, 0));
        assert_eq!(events[1].end, utc(2026, 5, 22, 13));
        assert_eq!(events[2].end, events[2].start);
    }

    #[test]
    fn test_skips_events_without_start_and_other_components() {
        let body = feed(concat!(
            "BEGIN:VEVENT\r\nSUMMARY:No dates\r\nEND:VEVENT\r\n",
            "BEGIN:VTODO\r\nSUMMARY:Clean pool\r\nEND:VTODO\r\n",
            "BEGIN:VEVENT\r\nDTSTART;VALUE=DATE:20260520\r\nDTEND;VALUE=DATE:20260521\r\nEND:VEVENT\r\n",
        ));

        let events = parse_feed(&body, chrono_tz::UTC).unwrap();
        assert_eq!(events.len(), 1);
    }

    #[test]
    fn test_empty_calendar() {
        let events = parse_feed(&feed(""), chrono_tz::UTC).unwrap();
        assert!(events.is_empty());
    }

    #[test]
    fn test_rejects_non_calendar_body() {
        let err = parse_feed("<html><body>Not found</body></html>", chrono_tz::UTC).unwrap_err();
        assert!(matches!(err, CalendarError::ParseError(_)));
    }

    #[test]
    fn test_parse_duration() {
        assert_eq!(parse_duration("P1D"), Some(Duration::days(1)));
        assert_eq!(parse_duration("P2W"), Some(Duration::weeks(2)));
        assert_eq!(parse_duration("PT1H30M"), Some(Duration::minutes(90)));
        assert_eq!(parse_duration("P1DT12H"), Some(Duration::hours(36)));
        assert_eq!(parse_duration("-P1D"), None);
        assert_eq!(parse_duration("P1H"), None);
        assert_eq!(parse_duration("P1"), None);
        assert_eq!(parse_duration("garbage"), None);
        assert_eq!(parse_duration("P9999999999999999W"), None);
        assert_eq!(parse_duration("PT9223372036854775807S"), None);
    }
}
