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

use crate::client::{DayForecast, HourlyForecast};
use crate::condition::{self, Condition};
use crate::coordinator::Snapshot;
use crate::extract::{self, Selection};
use chrono::{DateTime, Utc};
use serde::Serialize;

pub const CODE_TEMPERATURE: &str = "tre200s0";
pub const CODE_PRECIPITATION: &str = "rre150z0";
pub const CODE_HUMIDITY: &str = "ure200s0";
pub const CODE_WIND_BEARING: &str = "dkl010z0";
pub const CODE_WIND_SPEED: &str = "fu3010z0";
pub const CODE_PRESSURE: &str = "prestas0";
pub const CODE_PRESSURE_QFF: &str = "pp0qffs0";
pub const CODE_PRESSURE_QNH: &str = "pp0qnhs0";

const UNIT_DEGREES_C: &str = "°C";
const UNIT_HPA: &str = "hPa";
const UNIT_KPH: &str = "km/h";
const UNIT_MM: &str = "mm";
const STATE_CLASS_MEASUREMENT: &str = "measurement";

/// Static description of one kind of station sensor.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SensorType {
    pub key: &'static str,
    pub name: &'static str,
    pub unit: &'static str,
    pub icon: &'static str,
    pub device_class: Option<&'static str>,
    pub code: &'static str,
}

pub const SENSOR_TYPES: [SensorType; 12] = [
    SensorType {
        key: "temperature",
        name: "temperature",
        unit: UNIT_DEGREES_C,
        icon: "mdi:thermometer",
        device_class: Some("temperature"),
        code: CODE_TEMPERATURE,
    },
    SensorType {
        key: "10minrain",
        name: "10 minute rain",
        unit: UNIT_MM,
        icon: "mdi:water",
        device_class: None,
        code: CODE_PRECIPITATION,
    },
    SensorType {
        key: "10minsun",
        name: "10 minute sun",
        unit: "min",
        icon: "mdi:weather-sunny",
        device_class: None,
        code: "sre000z0",
    },
    SensorType {
        key: "sun_radiant",
        name: "sun irradiation",
        unit: "W/m²",
        icon: "mdi:weather-sunny",
        device_class: None,
        code: "gre000z0",
    },
    SensorType {
        key: "humidity",
        name: "humidity",
        unit: "%",
        icon: "mdi:water-percent",
        device_class: None,
        code: CODE_HUMIDITY,
    },
    SensorType {
        key: "dew_point",
        name: "dew point",
        unit: UNIT_DEGREES_C,
        icon: "mdi:weather-fog",
        device_class: None,
        code: "tde200s0",
    },
    SensorType {
        key: "wind_direction",
        name: "wind direction",
        unit: "°",
        icon: "mdi:compass-rose",
        device_class: None,
        code: CODE_WIND_BEARING,
    },
    SensorType {
        key: "wind_speed",
        name: "wind speed",
        unit: UNIT_KPH,
        icon: "mdi:weather-windy",
        device_class: None,
        code: CODE_WIND_SPEED,
    },
    SensorType {
        key: "wind_speed_max",
        name: "wind speed max",
        unit: UNIT_KPH,
        icon: "mdi:weather-windy",
        device_class: None,
        code: "fu3010z1",
    },
    SensorType {
        key: "pressure",
        name: "pressure",
        unit: UNIT_HPA,
        icon: "mdi:gauge",
        device_class: None,
        code: CODE_PRESSURE,
    },
    SensorType {
        key: "pressure_qff",
        name: "pressure QFF",
        unit: UNIT_HPA,
        icon: "mdi:gauge",
        device_class: None,
        code: CODE_PRESSURE_QFF,
    },
    SensorType {
        key: "pressure_qnh",
        name: "pressure QNH",
        unit: UNIT_HPA,
        icon: "mdi:gauge",
        device_class: None,
        code: CODE_PRESSURE_QNH,
    },
];

/// One day or hour of forecast as exposed by the weather entity.
#[derive(Serialize, Debug, Clone, PartialEq)]
pub struct ForecastEntry {
    pub datetime: String,
    pub templow: Option<f64>,
    pub temperature: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub condition: Option<Condition>,
    pub precipitation: Option<f64>,
}

impl ForecastEntry {
    fn daily(day: &DayForecast) -> Self {
        ForecastEntry {
            datetime: day.day_date.format("%Y-%m-%d").to_string(),
            templow: day.temperature_min,
            temperature: day.temperature_max,
            condition: condition::classify(day.icon_day),
            precipitation: day.precipitation,
        }
    }

    fn hourly(hour: &HourlyForecast) -> Self {
        ForecastEntry {
            datetime: hour.time.format("%Y-%m-%dT%H:%M:%SZ").to_string(),
            templow: hour.temperature_min,
            temperature: hour.temperature_max,
            condition: None,
            precipitation: hour.precipitation_max,
        }
    }
}

/// Current conditions and forecast for the configured postal code.
#[derive(Serialize, Debug, Clone, PartialEq)]
pub struct WeatherEntity {
    pub unique_id: String,
    pub name: String,
    pub available: bool,
    pub condition: Option<Condition>,
    pub temperature: Option<f64>,
    pub pressure: Option<f64>,
    pub pressure_qff: Option<f64>,
    pub pressure_qnh: Option<f64>,
    pub humidity: Option<f64>,
    pub wind_speed: Option<f64>,
    pub wind_bearing: Option<f64>,
    pub precipitation: Option<f64>,
    pub temperature_unit: &'static str,
    pub pressure_unit: &'static str,
    pub wind_speed_unit: &'static str,
    pub precipitation_unit: &'static str,
    pub attribution: String,
    pub daily_forecast: Vec<ForecastEntry>,
    pub hourly_forecast: Vec<ForecastEntry>,
}

impl WeatherEntity {
    /// Build the weather entity from a snapshot. `now` decides where the hourly
    /// forecast starts.
    pub fn from_snapshot(snapshot: &Snapshot, entry_id: &str, now: DateTime<Utc>) -> Self {
        let weather = snapshot
            .weather_station
            .clone()
            .map(Selection::Station)
            .unwrap_or(Selection::FirstAvailable);
        let reading = |code: &str| weather.extract(snapshot, code);

        // Precipitation stations only measure rain, prefer them for it and fall back
        // to the weather station.
        let precipitation = extract::first_available(
            snapshot.precipitation_record().into_iter().chain(snapshot.weather_record()),
            CODE_PRECIPITATION,
        );

        let daily_forecast = daily_forecast(&snapshot.forecast.daily);
        WeatherEntity {
            unique_id: format!("weather.{}", entry_id),
            name: snapshot.forecast_name.clone(),
            available: !daily_forecast.is_empty(),
            condition: condition::classify(snapshot.forecast.current.icon),
            temperature: reading(CODE_TEMPERATURE),
            pressure: reading(CODE_PRESSURE),
            pressure_qff: reading(CODE_PRESSURE_QFF),
            pressure_qnh: reading(CODE_PRESSURE_QNH),
            humidity: reading(CODE_HUMIDITY),
            wind_speed: reading(CODE_WIND_SPEED),
            wind_bearing: reading(CODE_WIND_BEARING),
            precipitation,
            temperature_unit: UNIT_DEGREES_C,
            pressure_unit: UNIT_HPA,
            wind_speed_unit: UNIT_KPH,
            precipitation_unit: UNIT_MM,
            attribution: attribution(snapshot),
            daily_forecast,
            hourly_forecast: hourly_forecast(&snapshot.forecast.hourly, now),
        }
    }
}

fn daily_forecast(days: &[DayForecast]) -> Vec<ForecastEntry> {
    let out: Vec<ForecastEntry> = days.iter().map(ForecastEntry::daily).collect();
    tracing::debug!(message = "built daily forecast", items = out.len());
    out
}

/// Hourly forecast from the hour before the first entry that is still in the future.
fn hourly_forecast(hours: &[HourlyForecast], now: DateTime<Utc>) -> Vec<ForecastEntry> {
    let start = match hours.iter().position(|h| h.time > now) {
        Some(idx) => idx.saturating_sub(1),
        None => return Vec::new(),
    };

    let out: Vec<ForecastEntry> = hours[start..].iter().map(ForecastEntry::hourly).collect();
    tracing::debug!(message = "built hourly forecast", items = out.len());
    out
}

fn attribution(snapshot: &Snapshot) -> String {
    let mut a = format!(
        "Data provided by MeteoSwiss. Forecasts from postal code {}.",
        snapshot.post_code
    );

    for (station, name) in [
        (&snapshot.weather_station, &snapshot.real_time_name),
        (&snapshot.precipitation_station, &snapshot.real_time_precipitation_name),
    ] {
        if let Some(station) = station {
            a.push_str(&format!(
                " Real-time weather data from weather station {} ({}).",
                station,
                name.as_deref().unwrap_or(station)
            ));
        }
    }

    if snapshot.weather_station.is_none() && snapshot.precipitation_station.is_none() {
        a.push_str(" No real-time stations used by this weather entry.");
    }

    a
}

/// A single measurement of the configured real-time weather station.
#[derive(Serialize, Debug, Clone, PartialEq)]
pub struct SensorEntity {
    pub unique_id: String,
    pub key: &'static str,
    pub name: String,
    pub station: String,
    pub value: Option<f64>,
    pub unit: &'static str,
    pub icon: &'static str,
    pub device_class: Option<&'static str>,
    pub state_class: &'static str,
}

impl SensorEntity {
    /// One sensor per known sensor type, or none at all without a weather station.
    pub fn all_from_snapshot(snapshot: &Snapshot, entry_id: &str) -> Vec<SensorEntity> {
        let station = match &snapshot.weather_station {
            Some(s) => s,
            None => {
                tracing::debug!(message = "no real-time station configured, not providing sensor data");
                return Vec::new();
            }
        };

        let label = snapshot.real_time_name.as_deref().unwrap_or(station);
        let selection = Selection::Station(station.clone());

        SENSOR_TYPES
            .iter()
            .map(|t| SensorEntity {
                unique_id: format!("sensor.{}-{}", entry_id, t.key),
                key: t.key,
                name: format!("{} {}", label, t.name),
                station: station.clone(),
                value: selection.extract(snapshot, t.code),
                unit: t.unit,
                icon: t.icon,
                device_class: t.device_class,
                state_class: STATE_CLASS_MEASUREMENT,
            })
            .collect()
    }
}
