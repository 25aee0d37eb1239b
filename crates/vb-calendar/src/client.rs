//! iCalendar feed client

use async_trait::async_trait;
use chrono_tz::Tz;
use reqwest::Client;
use std::time::Duration;
use tracing::{debug, error};
use vb_core::CalendarSource;

use crate::error::{CalendarError, Result};
use crate::ical::parse_feed;
use crate::models::CalendarEvent;

/// Retrieves and parses the events of one calendar source
#[async_trait]
pub trait CalendarFetcher: Send + Sync {
    async fn fetch(&self, source: &CalendarSource) -> Result<Vec<CalendarEvent>>;
}

/// HTTP client for published `.ics` feeds
pub struct IcsClient {
    client: Client,
    timezone: Tz,
}

impl IcsClient {
    /// Create a new feed client
    pub fn new(timezone: Tz, timeout: Duration) -> Result<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .user_agent(concat!("villa-gateway/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| CalendarError::Configuration(e.to_string()))?;

        Ok(Self { client, timezone })
    }

    /// `webcal://` is plain HTTPS for our purposes
    fn request_url(url: &str) -> String {
        match url.get(..9) {
            Some(scheme) if scheme.eq_ignore_ascii_case("webcal://") => {
                format!("https://{}", &url[9..])
            }
            _ => url.to_string(),
        }
    }
}

#[async_trait]
impl CalendarFetcher for IcsClient {
    async fn fetch(&self, source: &CalendarSource) -> Result<Vec<CalendarEvent>> {
        let url = Self::request_url(&source.url);
        debug!("Fetching calendar {}", source.name);

        let response = self
            .client
            .get(&url)
            .header(reqwest::header::ACCEPT, "text/calendar, */*;q=0.5")
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    CalendarError::Timeout(source.name.clone())
                } else {
                    CalendarError::Connection(e.to_string())
                }
            })?;

        if !response.status().is_success() {
            let status = response.status();
            error!("Calendar {} request failed: {}", source.name, status);
            return Err(CalendarError::Status(format!("{} returned {}", source.name, status)));
        }

        let text = response
            .text()
            .await
            .map_err(|e| CalendarError::HttpError(e.to_string()))?;

        parse_feed(&text, self.timezone)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_url_rewrites_webcal() {
        assert_eq!(
            IcsClient::request_url("webcal://ical.example.com/export.ics"),
            "https://ical.example.com/export.ics"
        );
        assert_eq!(
            IcsClient::request_url("WEBCAL://ical.example.com/export.ics"),
            "https://ical.example.com/export.ics"
        );
        assert_eq!(
            IcsClient::request_url("http://www.vrbo.com/icalendar/x.ics?nonTentative"),
            "http://www.vrbo.com/icalendar/x.ics?nonTentative"
        );
    }

    #[tokio::test]
    async fn test_unreachable_source_is_an_error() {
        let client = IcsClient::new(chrono_tz::UTC, Duration::from_secs(2)).unwrap();
        let source = CalendarSource::new("Nowhere", "http://127.0.0.1:9/calendar.ics");

        let result = client.fetch(&source).await;
        assert!(result.is_err());
    }
}
