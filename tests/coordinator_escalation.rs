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

use async_trait::async_trait;
use chrono::{DateTime, Duration, TimeZone, Utc};
use meteoswiss_exporter::client::{
    ClientError, ClientResult, CurrentWeather, Forecast, RawValue, StationRecord, WeatherSource,
};
use meteoswiss_exporter::config::CoordinatorConfig;
use meteoswiss_exporter::coordinator::{Coordinator, Source};
use meteoswiss_exporter::issues::{Issue, IssueRegistry};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};

/// Reports data only for the stations in `reporting`.
#[derive(Clone, Default)]
struct Stations {
    reporting: Arc<Mutex<Vec<&'static str>>>,
}

impl Stations {
    fn set(&self, stations: &[&'static str]) {
        *self.reporting.lock().unwrap() = stations.to_vec();
    }
}

#[async_trait]
impl WeatherSource for Stations {
    async fn fetch(&self, _post_code: &str) -> Result<ClientResult, ClientError> {
        let condition_by_station: HashMap<String, StationRecord> = self
            .reporting
            .lock()
            .unwrap()
            .iter()
            .map(|s| {
                let mut record = StationRecord::new();
                record.insert("tre200s0".to_owned(), RawValue::from("18.2"));
                (s.to_string(), record)
            })
            .collect();

        Ok(ClientResult {
            forecast: Forecast {
                current: CurrentWeather {
                    time: None,
                    icon: Some(1),
                    temperature: None,
                },
                daily: vec![],
                hourly: vec![],
            },
            condition_by_station,
        })
    }
}

fn start() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 1, 15, 8, 0, 0).unwrap()
}

fn minutes(m: i64) -> DateTime<Utc> {
    start() + Duration::minutes(m)
}

fn setup() -> (Stations, Coordinator<Stations>, Arc<IssueRegistry>) {
    let config = CoordinatorConfig::new("3011", "Bern", 5)
        .and_then(|c| c.with_weather_station("BER", Some("Bern / Zollikofen")))
        .and_then(|c| c.with_precipitation_station("BLA", None))
        .unwrap();

    let stations = Stations::default();
    let issues = Arc::new(IssueRegistry::new());
    let coordinator = Coordinator::new(stations.clone(), config, Arc::clone(&issues));
    (stations, coordinator, issues)
}

#[tokio::test]
async fn test_issue_raised_once_after_an_hour() {
    let (stations, mut coordinator, issues) = setup();
    let id = Issue::station_no_data_id("BER", Source::Weather.key());
    stations.set(&["BLA"]);

    // 13 cycles, five minutes apart, covering exactly one hour
    for m in (0..=60).step_by(5) {
        coordinator.refresh_at(minutes(m)).await.unwrap();
        assert!(!issues.contains(&id), "raised too early at minute {}", m);
    }

    coordinator.refresh_at(minutes(61)).await.unwrap();
    assert!(issues.contains(&id));
    assert_eq!(1, issues.len());

    let state = coordinator.error_state(Source::Weather).unwrap();
    assert!(state.raised());
    assert_eq!(Some(minutes(0)), state.first_error());

    coordinator.refresh_at(minutes(66)).await.unwrap();
    assert_eq!(1, issues.len());
    assert_eq!(minutes(61), issues.list()[0].created_at);

    // The precipitation station reported all along
    assert!(!coordinator.error_state(Source::Precipitation).unwrap().no_data());
}

#[tokio::test]
async fn test_issue_retracted_on_recovery() {
    let (stations, mut coordinator, issues) = setup();
    let id = Issue::station_no_data_id("BER", Source::Weather.key());
    stations.set(&[]);

    coordinator.refresh_at(minutes(0)).await.unwrap();
    coordinator.refresh_at(minutes(90)).await.unwrap();
    assert!(issues.contains(&id));
    assert!(issues.contains(&Issue::station_no_data_id("BLA", Source::Precipitation.key())));

    stations.set(&["BER"]);
    coordinator.refresh_at(minutes(95)).await.unwrap();

    assert!(!issues.contains(&id));
    let state = coordinator.error_state(Source::Weather).unwrap();
    assert!(!state.no_data());
    assert!(!state.raised());
    assert_eq!(None, state.first_error());

    // A new outage starts a new hour
    stations.set(&[]);
    coordinator.refresh_at(minutes(100)).await.unwrap();
    coordinator.refresh_at(minutes(150)).await.unwrap();
    assert!(!issues.contains(&id));
    coordinator.refresh_at(minutes(161)).await.unwrap();
    assert!(issues.contains(&id));
}

#[tokio::test]
async fn test_intermittent_data_never_escalates() {
    let (stations, mut coordinator, issues) = setup();

    for m in (0..240).step_by(5) {
        if m % 30 == 0 {
            stations.set(&["BER", "BLA"]);
        } else {
            stations.set(&["BLA"]);
        }

        coordinator.refresh_at(minutes(m)).await.unwrap();
    }

    assert!(issues.is_empty());
}
