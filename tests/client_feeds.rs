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

use axum::http::StatusCode;
use axum::routing::get;
use axum::Router;
use meteoswiss_exporter::client::MeteoSwissClient;
use meteoswiss_exporter::config::CoordinatorConfig;
use meteoswiss_exporter::coordinator::{Coordinator, Source};
use meteoswiss_exporter::issues::IssueRegistry;
use reqwest::Client;
use std::net::SocketAddr;
use std::sync::Arc;

const PLZ_DETAIL: &str = r#"{
    "currentWeather": {"time": 1724414400000, "icon": 2, "temperature": 21.3},
    "forecast": [
        {"dayDate": "2024-08-23", "iconDay": 2, "temperatureMax": 27.0, "temperatureMin": 15.0, "precipitation": 0.0}
    ]
}"#;

const WEATHER_FEED: &str = "Station/Location;Date;tre200s0;rre150z0\n\
    KLO;202408231200;21.4;0.0\n";

const PRECIPITATION_FEED: &str = "Station/Location;Date;rre150z0\n\
    SMA;202408231200;0.4\n";

/// Serve the upstream endpoints locally, `failing` paths answer with a 500.
async fn upstream(failing: &'static [&'static str]) -> String {
    let respond = move |path: &'static str, body: &'static str| {
        get(move || async move {
            if failing.contains(&path) {
                (StatusCode::INTERNAL_SERVER_ERROR, "unavailable")
            } else {
                (StatusCode::OK, body)
            }
        })
    };

    let app = Router::new()
        .route("/v1/plzDetail", respond("plzDetail", PLZ_DETAIL))
        .route(
            "/ch.meteoschweiz.messwerte-aktuell/VQHA80.csv",
            respond("VQHA80.csv", WEATHER_FEED),
        )
        .route(
            "/ch.meteoschweiz.messwerte-aktuell/VQHA98.csv",
            respond("VQHA98.csv", PRECIPITATION_FEED),
        );

    let addr: SocketAddr = ([127, 0, 0, 1], 0).into();
    let server = axum::Server::bind(&addr).serve(app.into_make_service());
    let base = format!("http://{}/", server.local_addr());
    tokio::spawn(server);
    base
}

async fn coordinator(failing: &'static [&'static str]) -> Coordinator<MeteoSwissClient> {
    let base = upstream(failing).await;
    let client = MeteoSwissClient::new(Client::new(), &base, &base).unwrap();
    let config = CoordinatorConfig::new("8001", "Zurich", 5)
        .and_then(|c| c.with_weather_station("KLO", Some("Kloten")))
        .and_then(|c| c.with_precipitation_station("SMA", Some("Fluntern")))
        .unwrap();

    Coordinator::new(client, config, Arc::new(IssueRegistry::new()))
}

#[tokio::test]
async fn test_all_feeds_available() {
    let mut coordinator = coordinator(&[]).await;

    let snapshot = coordinator.refresh().await.unwrap();

    assert_eq!(1, snapshot.forecast.daily.len());
    assert!(snapshot.weather_record().is_some());
    assert!(snapshot.precipitation_record().is_some());
    assert!(!coordinator.error_state(Source::Weather).unwrap().no_data());
    assert!(!coordinator.error_state(Source::Precipitation).unwrap().no_data());
}

#[tokio::test]
async fn test_weather_feed_unavailable_is_station_without_data() {
    let mut coordinator = coordinator(&["VQHA80.csv"]).await;

    let snapshot = coordinator.refresh().await.unwrap();

    assert!(coordinator.latest().is_some());
    assert_eq!(1, snapshot.forecast.daily.len());
    assert!(snapshot.weather_record().is_none());
    assert!(coordinator.error_state(Source::Weather).unwrap().no_data());
    assert!(coordinator.error_state(Source::Weather).unwrap().first_error().is_some());
    assert!(!coordinator.error_state(Source::Precipitation).unwrap().no_data());
}

#[tokio::test]
async fn test_forecast_unavailable_fails_refresh() {
    let mut coordinator = coordinator(&["plzDetail"]).await;

    assert!(coordinator.refresh().await.is_err());
    assert!(coordinator.latest().is_none());
    assert!(!coordinator.error_state(Source::Weather).unwrap().no_data());
}
