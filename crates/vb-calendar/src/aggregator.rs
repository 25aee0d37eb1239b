//! Availability aggregation across calendar feeds
//!
//! Every check fans out one fetch per configured source, waits for all of
//! them to settle, and reduces the results into a single verdict. A source
//! that fails or times out is left out of the verdict instead of failing the
//! check; the names of such sources travel with the verdict so callers can
//! log or surface them.

use chrono::{DateTime, Utc};
use chrono_tz::Tz;
use futures::future::join_all;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};
use vb_core::{CalendarSource, Config};

use crate::client::{CalendarFetcher, IcsClient};
use crate::error::{CalendarError, Result};
use crate::models::{AvailabilityVerdict, CalendarFetchResult, DateRange};

/// Decides whether a stay is free across all configured calendars
pub struct AvailabilityAggregator {
    sources: Vec<CalendarSource>,
    fetcher: Arc<dyn CalendarFetcher>,
    timezone: Tz,
    fetch_timeout: Duration,
}

impl AvailabilityAggregator {
    /// Create an aggregator over `sources`
    pub fn new(
        sources: Vec<CalendarSource>,
        fetcher: Arc<dyn CalendarFetcher>,
        timezone: Tz,
        fetch_timeout: Duration,
    ) -> Self {
        Self {
            sources,
            fetcher,
            timezone,
            fetch_timeout,
        }
    }

    /// Build an aggregator that fetches feeds over HTTP
    pub fn from_config(config: &Config) -> Result<Self> {
        let timezone = config
            .timezone()
            .map_err(|e| CalendarError::Configuration(e.to_string()))?;
        let client = IcsClient::new(timezone, config.fetch_timeout())?;

        Ok(Self::new(
            config.calendars.clone(),
            Arc::new(client),
            timezone,
            config.fetch_timeout(),
        ))
    }

    /// Configured calendar sources
    pub fn sources(&self) -> &[CalendarSource] {
        &self.sources
    }

    /// Villa timezone used to resolve stay dates
    pub fn timezone(&self) -> Tz {
        self.timezone
    }

    /// Check `YYYY-MM-DD` stay dates.
    ///
    /// The range is validated before any feed is fetched.
    pub async fn check_availability(
        &self,
        check_in: &str,
        check_out: &str,
    ) -> Result<AvailabilityVerdict> {
        let range = DateRange::parse(check_in, check_out)?;
        self.check_range(&range).await
    }

    /// Check an already validated range
    pub async fn check_range(&self, range: &DateRange) -> Result<AvailabilityVerdict> {
        let (start, end) = range.resolve(self.timezone);
        debug!(
            "Checking {} to {} ({} nights) against {} calendars",
            range.check_in,
            range.check_out,
            range.nights(),
            self.sources.len()
        );

        let results = self.fetch_all().await?;
        let verdict = reduce(&results, start, end);

        if !verdict.is_complete() {
            warn!(
                "{} of {} calendars could not be checked: {:?}",
                verdict.failed_sources.len(),
                results.len(),
                verdict.failed_sources
            );
        }
        info!(
            "Availability {} to {}: available={} blocked_by={:?}",
            range.check_in, range.check_out, verdict.available, verdict.blocked_by
        );

        Ok(verdict)
    }

    /// Fetch every source concurrently and wait for all of them to settle.
    ///
    /// Results are returned in configured source order. Individual fetch
    /// failures become `ok = false` results; only a task that panics or is
    /// cancelled fails the whole call.
    pub async fn fetch_all(&self) -> Result<Vec<CalendarFetchResult>> {
        let handles: Vec<_> = self
            .sources
            .iter()
            .cloned()
            .map(|source| {
                let fetcher = Arc::clone(&self.fetcher);
                let timeout = self.fetch_timeout;
                tokio::spawn(async move { fetch_source(fetcher.as_ref(), &source, timeout).await })
            })
            .collect();

        join_all(handles)
            .await
            .into_iter()
            .map(|joined| {
                joined.map_err(|e| CalendarError::Aggregation(format!("calendar fetch task failed: {}", e)))
            })
            .collect()
    }
}

async fn fetch_source(
    fetcher: &dyn CalendarFetcher,
    source: &CalendarSource,
    timeout: Duration,
) -> CalendarFetchResult {
    match tokio::time::timeout(timeout, fetcher.fetch(source)).await {
        Ok(Ok(events)) => {
            debug!("Fetched {} events from {}", events.len(), source.name);
            CalendarFetchResult::fetched(&source.name, events)
        }
        Ok(Err(e)) => {
            warn!("Failed to fetch {}: {}", source.name, e);
            CalendarFetchResult::failed(&source.name)
        }
        Err(_) => {
            warn!("Failed to fetch {}: timed out after {:?}", source.name, timeout);
            CalendarFetchResult::failed(&source.name)
        }
    }
}

/// Reduce per-source results for the stay `[start, end)` into a verdict.
///
/// A source blocks when at least one of its events overlaps the stay and is
/// opaque. Failed sources are skipped and reported in `failed_sources`.
pub fn reduce(
    results: &[CalendarFetchResult],
    start: DateTime<Utc>,
    end: DateTime<Utc>,
) -> AvailabilityVerdict {
    let mut blocked_by: Vec<String> = Vec::new();
    let mut failed_sources = Vec::new();

    for result in results {
        if !result.ok {
            failed_sources.push(result.source_name.clone());
            continue;
        }

        let blocking = result
            .events
            .iter()
            .any(|event| event.overlaps(start, end) && event.blocks());

        if blocking && !blocked_by.contains(&result.source_name) {
            blocked_by.push(result.source_name.clone());
        }
    }

    AvailabilityVerdict {
        available: blocked_by.is_empty(),
        blocked_by,
        failed_sources,
    }
}
