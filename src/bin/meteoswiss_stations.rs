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

use clap::Parser;
use meteoswiss_exporter::client::MeteoSwissClient;
use meteoswiss_exporter::config;
use meteoswiss_exporter::stations::{self, Station, StationType};
use reqwest::Client;
use std::error::Error;
use std::process;
use std::time::Duration;
use tracing::Level;

const DEFAULT_LOG_LEVEL: Level = Level::WARN;
const DEFAULT_LIMIT: usize = 5;
const DEFAULT_TIMEOUT_MILLIS: u64 = 10000;
const DEFAULT_APP_URL: &str = "https://app-prod-ws.meteoswiss-app.ch/";
const DEFAULT_DATA_URL: &str = "https://data.geo.admin.ch/";

/// List the MeteoSwiss stations closest to a location
#[derive(Debug, Parser)]
#[clap(name = "meteoswiss_stations", version = clap::crate_version!())]
struct MeteoSwissStationsApplication {
    /// Latitude of your location, in decimal degrees
    #[clap(long, allow_hyphen_values = true)]
    latitude: f64,

    /// Longitude of your location, in decimal degrees
    #[clap(long, allow_hyphen_values = true)]
    longitude: f64,

    /// Postal code to check for an available forecast
    #[clap(long)]
    postcode: Option<String>,

    /// Number of stations of each type to list
    #[clap(long, default_value_t = DEFAULT_LIMIT)]
    limit: usize,

    /// Base URL for the MeteoSwiss app API (forecasts)
    #[clap(long, default_value_t = DEFAULT_APP_URL.into())]
    app_url: String,

    /// Base URL for MeteoSwiss open data (station catalogues)
    #[clap(long, default_value_t = DEFAULT_DATA_URL.into())]
    data_url: String,

    /// Timeout for each HTTP request to MeteoSwiss, in milliseconds.
    #[clap(long, default_value_t = DEFAULT_TIMEOUT_MILLIS)]
    timeout_millis: u64,

    /// Logging verbosity. Allowed values are 'trace', 'debug', 'info', 'warn', and 'error'
    /// (case insensitive)
    #[clap(long, default_value_t = DEFAULT_LOG_LEVEL)]
    log_level: Level,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error + Send + Sync>> {
    let opts = MeteoSwissStationsApplication::parse();
    tracing::subscriber::set_global_default(
        tracing_subscriber::FmtSubscriber::builder()
            .with_max_level(opts.log_level)
            .finish(),
    )
    .expect("failed to set tracing subscriber");

    if let Err(e) = config::validate_coordinates(opts.latitude, opts.longitude) {
        tracing::error!(message = "invalid location", error = %e);
        process::exit(1)
    }

    let http_client = Client::builder()
        .timeout(Duration::from_millis(opts.timeout_millis))
        .build()
        .unwrap_or_else(|e| {
            tracing::error!(message = "unable to initialize HTTP client", error = %e);
            process::exit(1)
        });

    let client = MeteoSwissClient::new(http_client, &opts.app_url, &opts.data_url).unwrap_or_else(|e| {
        tracing::error!(message = "unable to initialize MeteoSwiss client", error = %e);
        process::exit(1)
    });

    if let Some(postcode) = &opts.postcode {
        let post_code = config::validate_post_code(postcode).unwrap_or_else(|e| {
            tracing::error!(message = "invalid postal code", error = %e);
            process::exit(1)
        });

        match client.forecast(&post_code).await {
            Ok(f) if !f.daily.is_empty() => println!("Forecast available for postal code {}\n", post_code),
            Ok(_) => {
                tracing::error!(message = "no forecast for postal code", post_code = %post_code);
                process::exit(1)
            }
            Err(e) => {
                tracing::error!(message = "unable to fetch forecast", post_code = %post_code, error = %e);
                process::exit(1)
            }
        }
    }

    let (weather, precipitation) = tokio::try_join!(
        client.stations(StationType::Weather),
        client.stations(StationType::Precipitation),
    )?;

    print_closest(StationType::Weather, &weather, &opts);
    print_closest(StationType::Precipitation, &precipitation, &opts);
    Ok(())
}

fn print_closest(kind: StationType, all: &[Station], opts: &MeteoSwissStationsApplication) {
    println!("Closest {} stations:", kind);
    for (s, distance) in stations::by_distance(all, opts.latitude, opts.longitude)
        .into_iter()
        .take(opts.limit)
    {
        println!("  {}  {:<40} {:>6.1} km", s.code, s.name, distance);
    }
    println!();
}
