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

//! Weather and sensor entities from MeteoSwiss
//!
//! ## Features
//!
//! `meteoswiss_exporter` periodically fetches the [MeteoSwiss] forecast for a Swiss postal code
//! along with current conditions from the SwissMetNet network of automatic stations. It turns
//! them into a weather entity (current condition, measurements, daily and hourly forecast) and a
//! set of sensor entities for a single real-time station, served as JSON and as Prometheus metrics.
//!
//! Real-time stations regularly stop reporting. When a configured station hasn't provided any
//! data for more than an hour an issue is raised for it, and retracted once it reports again.
//!
//! The following metrics are emitted, values that are currently unavailable are `NaN`.
//!
//! * `meteoswiss_weather_available{post_code=$POST_CODE}` - 1 if a daily forecast is available.
//! * `meteoswiss_weather_icon{post_code=$POST_CODE}` - Current MeteoSwiss icon code.
//! * `meteoswiss_weather_temperature_degrees{post_code=$POST_CODE}` - Temperature, in degrees celsius.
//! * `meteoswiss_weather_pressure_hpa{post_code=$POST_CODE}` - Station pressure, in hectopascals.
//! * `meteoswiss_weather_pressure_qff_hpa{post_code=$POST_CODE}` - QFF pressure, in hectopascals.
//! * `meteoswiss_weather_pressure_qnh_hpa{post_code=$POST_CODE}` - QNH pressure, in hectopascals.
//! * `meteoswiss_weather_relative_humidity{post_code=$POST_CODE}` - Relative humidity (0-100).
//! * `meteoswiss_weather_wind_speed_kph{post_code=$POST_CODE}` - Wind speed, in km/h.
//! * `meteoswiss_weather_wind_bearing_degrees{post_code=$POST_CODE}` - Wind direction, in degrees.
//! * `meteoswiss_weather_precipitation_mm{post_code=$POST_CODE}` - Ten minute precipitation, in mm.
//! * `meteoswiss_forecast_temperature_min_degrees{post_code=$POST_CODE, day=$DAY}` - Forecast low.
//! * `meteoswiss_forecast_temperature_max_degrees{post_code=$POST_CODE, day=$DAY}` - Forecast high.
//! * `meteoswiss_forecast_precipitation_mm{post_code=$POST_CODE, day=$DAY}` - Forecast precipitation.
//! * `meteoswiss_sensor{station=$STATION, sensor=$SENSOR}` - Real-time station measurements.
//! * `meteoswiss_refreshes_total{outcome=$OUTCOME}` - Refreshes that succeeded or failed.
//! * `meteoswiss_active_issues` - Currently raised issues.
//!
//! [MeteoSwiss]: https://www.meteoswiss.admin.ch/
//!
//! ## Usage
//!
//! ### Picking stations
//!
//! A postal code is enough to get a forecast. Measurements come from a real-time weather station
//! and, optionally, a separate precipitation station. Use `meteoswiss_stations` to list the stations
//! closest to your location.
//!
//! ```text
//! ./meteoswiss_stations --latitude 47.378 --longitude 8.540 --postcode 8001
//! ```
//!
//! You can then run `meteoswiss_exporter` with the stations you picked.
//!
//! ```text
//! ./meteoswiss_exporter --postcode 8001 --forecast-name Zurich --station SMA --station-name Fluntern
//! ```
//!
//! ### Endpoints
//!
//! Everything is served on port `9783`.
//!
//! * `/metrics` - Prometheus metrics in the OpenMetrics text format.
//! * `/api/weather` - Weather entity as JSON, `503` until the first refresh succeeds.
//! * `/api/sensors` - Sensor entities as JSON, `503` until the first refresh succeeds.
//! * `/api/issues` - Currently raised issues as JSON.
//!
//! ### Prometheus
//!
//! Add the host running `meteoswiss_exporter` as a target under the Prometheus `scrape_configs`
//! section as described by the example below.
//!
//! ```yaml
//! scrape_configs:
//! - job_name: meteoswiss_exporter
//!   static_configs:
//!   - targets: ['example:9783']
//! ```
//!

pub mod client;
pub mod condition;
pub mod config;
pub mod coordinator;
pub mod entity;
pub mod extract;
pub mod http;
pub mod issues;
pub mod metrics;
pub mod stations;
