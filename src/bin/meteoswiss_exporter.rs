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

use chrono::Utc;
use clap::Parser;
use meteoswiss_exporter::client::MeteoSwissClient;
use meteoswiss_exporter::config::{ConfigError, CoordinatorConfig, DEFAULT_UPDATE_INTERVAL_MINS};
use meteoswiss_exporter::coordinator::Coordinator;
use meteoswiss_exporter::entity::{SensorEntity, WeatherEntity};
use meteoswiss_exporter::http::RequestContext;
use meteoswiss_exporter::issues::IssueRegistry;
use meteoswiss_exporter::metrics::WeatherMetrics;
use prometheus_client::registry::Registry;
use reqwest::Client;
use std::error::Error;
use std::io;
use std::net::SocketAddr;
use std::process;
use std::sync::Arc;
use std::time::Duration;
use tokio::signal::unix::{self, SignalKind};
use tokio::time::MissedTickBehavior;
use tracing::{Instrument, Level};

const DEFAULT_LOG_LEVEL: Level = Level::INFO;
const DEFAULT_BIND_ADDR: ([u8; 4], u16) = ([0, 0, 0, 0], 9783);
const DEFAULT_TIMEOUT_MILLIS: u64 = 10000;
const DEFAULT_APP_URL: &str = "https://app-prod-ws.meteoswiss-app.ch/";
const DEFAULT_DATA_URL: &str = "https://data.geo.admin.ch/";

#[derive(Debug, Parser)]
#[clap(name = "meteoswiss_exporter", version = clap::crate_version!())]
struct MeteoSwissExporterApplication {
    /// Swiss postal code (four digits) to fetch forecasts for
    #[clap(long)]
    postcode: String,

    /// Name of the weather entity. Defaults to the postal code.
    #[clap(long)]
    forecast_name: Option<String>,

    /// Three character code of the SwissMetNet station to use for current conditions
    /// and sensors. Use `meteoswiss_stations` to find one close to you.
    #[clap(long)]
    station: Option<String>,

    /// Display name of the weather station. Defaults to the station code.
    #[clap(long)]
    station_name: Option<String>,

    /// Three character code of the station to prefer for precipitation
    #[clap(long)]
    precipitation_station: Option<String>,

    /// Display name of the precipitation station. Defaults to the station code.
    #[clap(long)]
    precipitation_station_name: Option<String>,

    /// Fetch forecasts and current conditions at this interval, in minutes.
    #[clap(long, default_value_t = DEFAULT_UPDATE_INTERVAL_MINS)]
    update_interval_mins: u64,

    /// ID used to build unique IDs of entities. Defaults to the postal code.
    #[clap(long)]
    entry_id: Option<String>,

    /// Base URL for the MeteoSwiss app API (forecasts)
    #[clap(long, default_value_t = DEFAULT_APP_URL.into())]
    app_url: String,

    /// Base URL for MeteoSwiss open data (current conditions)
    #[clap(long, default_value_t = DEFAULT_DATA_URL.into())]
    data_url: String,

    /// Timeout for each HTTP request to MeteoSwiss, in milliseconds.
    #[clap(long, default_value_t = DEFAULT_TIMEOUT_MILLIS)]
    timeout_millis: u64,

    /// Logging verbosity. Allowed values are 'trace', 'debug', 'info', 'warn', and 'error'
    /// (case insensitive)
    #[clap(long, default_value_t = DEFAULT_LOG_LEVEL)]
    log_level: Level,

    /// Address to bind to. By default, meteoswiss_exporter will bind to public address
    /// since the purpose is to expose metrics and entities to an external system.
    #[clap(long, default_value_t = DEFAULT_BIND_ADDR.into())]
    bind: SocketAddr,
}

impl MeteoSwissExporterApplication {
    fn coordinator_config(&self) -> Result<CoordinatorConfig, ConfigError> {
        let name = self.forecast_name.as_deref().unwrap_or(&self.postcode);
        let mut config = CoordinatorConfig::new(&self.postcode, name, self.update_interval_mins)?;

        if let Some(station) = &self.station {
            config = config.with_weather_station(station, self.station_name.as_deref())?;
        }

        if let Some(station) = &self.precipitation_station {
            config = config.with_precipitation_station(station, self.precipitation_station_name.as_deref())?;
        }

        Ok(config)
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error + Send + Sync>> {
    let opts = MeteoSwissExporterApplication::parse();
    tracing::subscriber::set_global_default(
        tracing_subscriber::FmtSubscriber::builder()
            .with_max_level(opts.log_level)
            .finish(),
    )
    .expect("failed to set tracing subscriber");

    let config = opts.coordinator_config().unwrap_or_else(|e| {
        tracing::error!(message = "invalid configuration", error = %e);
        process::exit(1)
    });

    let timeout = Duration::from_millis(opts.timeout_millis);
    let http_client = Client::builder().timeout(timeout).build().unwrap_or_else(|e| {
        tracing::error!(message = "unable to initialize HTTP client", error = %e);
        process::exit(1)
    });

    let client = MeteoSwissClient::new(http_client, &opts.app_url, &opts.data_url).unwrap_or_else(|e| {
        tracing::error!(message = "unable to initialize MeteoSwiss client", error = %e);
        process::exit(1)
    });

    // Make an initial forecast request so that an unknown postal code or an unreachable
    // API shows up in the logs right away instead of after the first interval.
    match client.forecast(&config.post_code).await {
        Ok(f) if f.daily.is_empty() => {
            tracing::warn!(message = "no daily forecast for postal code", post_code = %config.post_code);
        }
        Ok(f) => {
            tracing::debug!(message = "verified postal code", post_code = %config.post_code, days = f.daily.len());
        }
        Err(e) => {
            tracing::warn!(message = "failed to fetch initial forecast", post_code = %config.post_code, error = %e);
        }
    }

    let entry_id = opts.entry_id.clone().unwrap_or_else(|| config.post_code.clone());
    let update_interval = config.update_interval;
    let issues = Arc::new(IssueRegistry::new());
    let mut coordinator = Coordinator::new(client, config, Arc::clone(&issues));
    let snapshots = coordinator.subscribe();

    let mut registry = Registry::with_prefix("meteoswiss");
    let metrics = WeatherMetrics::new(&mut registry);
    let mut interval = tokio::time::interval(update_interval);
    interval.set_missed_tick_behavior(MissedTickBehavior::Skip);

    let app_url = opts.app_url.clone();
    let data_url = opts.data_url.clone();
    let task_entry_id = entry_id.clone();
    let task_issues = Arc::clone(&issues);
    tokio::spawn(async move {
        tracing::info!(
            message = "forecast polling started",
            app_url = %app_url,
            data_url = %data_url,
            post_code = %coordinator.config().post_code,
            interval = ?update_interval,
        );

        loop {
            let _ = interval.tick().await;
            match coordinator
                .refresh()
                .instrument(tracing::span!(Level::DEBUG, "meteoswiss_refresh"))
                .await
            {
                Ok(snapshot) => {
                    let weather = WeatherEntity::from_snapshot(&snapshot, &task_entry_id, Utc::now());
                    let sensors = SensorEntity::all_from_snapshot(&snapshot, &task_entry_id);
                    metrics.weather(&snapshot.post_code, &weather, snapshot.forecast.current.icon);
                    metrics.sensors(&sensors);
                    metrics.refresh_success();

                    tracing::info!(
                        message = "fetched new forecast",
                        post_code = %snapshot.post_code,
                        condition = ?weather.condition,
                        stations = snapshot.condition_by_station.len(),
                    );
                }
                Err(e) => {
                    metrics.refresh_failure();
                    tracing::error!(message = "failed to refresh forecast", error = %e);
                }
            }

            metrics.active_issues(task_issues.len());
        }
    });

    let context = Arc::new(RequestContext::new(registry, snapshots, issues, &entry_id));
    let app = meteoswiss_exporter::http::app(context);
    let server = axum::Server::try_bind(&opts.bind)
        .unwrap_or_else(|e| {
            tracing::error!(message = "error binding to address", address = %opts.bind, error = %e);
            process::exit(1)
        })
        .serve(app.into_make_service());

    tracing::info!(message = "server started", address = %server.local_addr());
    server
        .with_graceful_shutdown(async {
            // Wait for either SIGTERM or SIGINT to shutdown
            tokio::select! {
                _ = sigterm() => {}
                _ = sigint() => {}
            }
        })
        .await?;

    tracing::info!("server shutdown");
    Ok(())
}

/// Return after the first SIGTERM signal received by this process
async fn sigterm() -> io::Result<()> {
    unix::signal(SignalKind::terminate())?.recv().await;
    Ok(())
}

/// Return after the first SIGINT signal received by this process
async fn sigint() -> io::Result<()> {
    unix::signal(SignalKind::interrupt())?.recv().await;
    Ok(())
}
