// meteoswiss_exporter - Weather and sensor entities from MeteoSwiss
//
// Copyright 2022 Nick Pillitteri
//
// This program is free software: you can redistribute it and/or modify
// it under the terms of the GNU General Public License as published by
// the Free Software Foundation, either version 3 of the License, or
// (at your option) any later version.
//
// This program is distributed in the hope that it will be useful,
// but WITHOUT ANY WARRANTY; without even the implied warranty of
// MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the
// GNU General Public License for more details.
//
// You should have received a copy of the GNU General Public License
// along with this program.  If not, see <http://www.gnu.org/licenses/>.
//

use crate::client::{ClientError, ClientResult, Forecast, StationRecord, WeatherSource};
use crate::config::CoordinatorConfig;
use crate::issues::{Issue, IssueRegistry};
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::error;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;

/// Upper bound on a single fetch of forecast and station data.
pub const FETCH_TIMEOUT: Duration = Duration::from_secs(15);

/// How long a station may report nothing before an issue is raised for it.
pub const MAX_CONTINUOUS_ERROR_SECS: i64 = 60 * 60;

#[derive(Debug)]
pub enum RefreshError {
    Timeout(Duration),
    Client(ClientError),
}

impl fmt::Display for RefreshError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Timeout(d) => write!(f, "fetch did not complete within {:?}", d),
            Self::Client(e) => write!(f, "fetch failed: {}", e),
        }
    }
}

impl error::Error for RefreshError {
    fn source(&self) -> Option<&(dyn error::Error + 'static)> {
        match self {
            Self::Client(e) => Some(e),
            _ => None,
        }
    }
}

impl From<ClientError> for RefreshError {
    fn from(e: ClientError) -> Self {
        RefreshError::Client(e)
    }
}

/// Optional real-time sources the coordinator tracks failures for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Source {
    Weather,
    Precipitation,
}

impl Source {
    pub fn key(&self) -> &'static str {
        match self {
            Self::Weather => "real_time_name",
            Self::Precipitation => "real_time_precipitation_name",
        }
    }
}

impl fmt::Display for Source {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Weather => f.write_str("weather"),
            Self::Precipitation => f.write_str("precipitation"),
        }
    }
}

/// Failure bookkeeping for one real-time source.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SourceErrorState {
    no_data: bool,
    first_error: Option<DateTime<Utc>>,
    raised: bool,
}

impl SourceErrorState {
    /// `true` if the most recent refresh had no data for this source.
    pub fn no_data(&self) -> bool {
        self.no_data
    }

    /// Start of the current run of refreshes without data, if any.
    pub fn first_error(&self) -> Option<DateTime<Utc>> {
        self.first_error
    }

    /// `true` if an issue has been raised and not yet retracted.
    pub fn raised(&self) -> bool {
        self.raised
    }
}

#[derive(Debug)]
struct TrackedSource {
    source: Source,
    station: String,
    state: SourceErrorState,
}

impl TrackedSource {
    fn new(source: Source, station: &str) -> Self {
        TrackedSource {
            source,
            station: station.to_owned(),
            state: SourceErrorState::default(),
        }
    }

    fn issue_id(&self) -> String {
        Issue::station_no_data_id(&self.station, self.source.key())
    }

    fn observe(&mut self, by_station: &HashMap<String, StationRecord>, now: DateTime<Utc>, issues: &IssueRegistry) {
        let has_data = by_station.get(&self.station).map(|r| !r.is_empty()).unwrap_or(false);

        if has_data {
            if self.state.raised {
                issues.retract(&self.issue_id());
                tracing::info!(
                    message = "station provides real-time data again",
                    station = %self.station,
                    source = %self.source,
                );
            }

            self.state = SourceErrorState::default();
            return;
        }

        tracing::warn!(
            message = "station provided no real-time data",
            station = %self.station,
            source = %self.source,
        );

        self.state.no_data = true;
        let first_error = *self.state.first_error.get_or_insert(now);
        let max = chrono::Duration::seconds(MAX_CONTINUOUS_ERROR_SECS);

        if !self.state.raised && now - first_error > max {
            issues.raise(Issue::station_no_data(&self.station, self.source.key(), now));
            self.state.raised = true;
        }
    }
}

/// Complete result of one successful refresh. Never modified once published.
#[derive(Debug, Clone, PartialEq)]
pub struct Snapshot {
    pub forecast: Forecast,
    pub condition_by_station: HashMap<String, StationRecord>,
    pub post_code: String,
    pub forecast_name: String,
    pub weather_station: Option<String>,
    pub real_time_name: Option<String>,
    pub precipitation_station: Option<String>,
    pub real_time_precipitation_name: Option<String>,
}

impl Snapshot {
    pub fn new(data: ClientResult, config: &CoordinatorConfig) -> Self {
        Snapshot {
            forecast: data.forecast,
            condition_by_station: data.condition_by_station,
            post_code: config.post_code.clone(),
            forecast_name: config.forecast_name.clone(),
            weather_station: config.weather_station.clone(),
            real_time_name: config.real_time_name.clone(),
            precipitation_station: config.precipitation_station.clone(),
            real_time_precipitation_name: config.real_time_precipitation_name.clone(),
        }
    }

    /// Non-empty record of a station, if it reported anything.
    pub fn station(&self, station: &str) -> Option<&StationRecord> {
        self.condition_by_station.get(station).filter(|r| !r.is_empty())
    }

    pub fn weather_record(&self) -> Option<&StationRecord> {
        self.weather_station.as_deref().and_then(|s| self.station(s))
    }

    pub fn precipitation_record(&self) -> Option<&StationRecord> {
        self.precipitation_station.as_deref().and_then(|s| self.station(s))
    }

    /// Records of the configured stations that reported data, weather station first.
    pub fn conditions(&self) -> Vec<&StationRecord> {
        self.weather_record().into_iter().chain(self.precipitation_record()).collect()
    }
}

/// Runs the fetch, tracks real-time station outages and publishes snapshots.
///
/// Refreshing takes `&mut self` so only one refresh can be in flight. Readers get
/// snapshots through [`Coordinator::subscribe`] or [`Coordinator::latest`] and never
/// see a partially built one.
pub struct Coordinator<S> {
    client: S,
    config: CoordinatorConfig,
    tracked: Vec<TrackedSource>,
    issues: Arc<IssueRegistry>,
    timeout: Duration,
    sender: watch::Sender<Option<Arc<Snapshot>>>,
}

impl<S> Coordinator<S>
where
    S: WeatherSource,
{
    pub fn new(client: S, config: CoordinatorConfig, issues: Arc<IssueRegistry>) -> Self {
        let mut tracked = Vec::new();
        if let Some(station) = &config.weather_station {
            tracing::debug!(
                message = "real-time weather will be updated from station",
                station = %station,
                name = ?config.real_time_name,
                interval = ?config.update_interval,
            );
            tracked.push(TrackedSource::new(Source::Weather, station));
        }

        if let Some(station) = &config.precipitation_station {
            tracing::debug!(
                message = "real-time precipitation will be updated from station",
                station = %station,
                name = ?config.real_time_precipitation_name,
                interval = ?config.update_interval,
            );
            tracked.push(TrackedSource::new(Source::Precipitation, station));
        }

        let (sender, _) = watch::channel(None);
        Coordinator {
            client,
            config,
            tracked,
            issues,
            timeout: FETCH_TIMEOUT,
            sender,
        }
    }

    pub fn config(&self) -> &CoordinatorConfig {
        &self.config
    }

    /// Receiver that always holds the most recently published snapshot.
    pub fn subscribe(&self) -> watch::Receiver<Option<Arc<Snapshot>>> {
        self.sender.subscribe()
    }

    pub fn latest(&self) -> Option<Arc<Snapshot>> {
        self.sender.borrow().clone()
    }

    /// Failure state of a configured source, `None` if that source isn't configured.
    pub fn error_state(&self, source: Source) -> Option<&SourceErrorState> {
        self.tracked.iter().find(|t| t.source == source).map(|t| &t.state)
    }

    pub async fn refresh(&mut self) -> Result<Arc<Snapshot>, RefreshError> {
        self.refresh_at(Utc::now()).await
    }

    /// Refresh as though the current time were `now`.
    ///
    /// A failed fetch publishes nothing and leaves station failure tracking untouched.
    /// A station without data is not a failure, it only counts towards raising an
    /// issue for that station.
    pub async fn refresh_at(&mut self, now: DateTime<Utc>) -> Result<Arc<Snapshot>, RefreshError> {
        let data = match tokio::time::timeout(self.timeout, self.client.fetch(&self.config.post_code)).await {
            Ok(Ok(data)) => data,
            Ok(Err(e)) => {
                tracing::error!(message = "failed getting data", post_code = %self.config.post_code, error = %e);
                return Err(RefreshError::Client(e));
            }
            Err(_) => {
                tracing::error!(
                    message = "timed out getting data",
                    post_code = %self.config.post_code,
                    timeout = ?self.timeout,
                );
                return Err(RefreshError::Timeout(self.timeout));
            }
        };

        for tracked in self.tracked.iter_mut() {
            tracked.observe(&data.condition_by_station, now, &self.issues);
        }

        let snapshot = Arc::new(Snapshot::new(data, &self.config));
        self.sender.send_replace(Some(Arc::clone(&snapshot)));
        Ok(snapshot)
    }
}
