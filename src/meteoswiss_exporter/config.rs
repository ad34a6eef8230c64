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

use std::error;
use std::fmt;
use std::time::Duration;

pub const DEFAULT_UPDATE_INTERVAL_MINS: u64 = 5;
pub const MIN_UPDATE_INTERVAL_MINS: u64 = 1;

#[derive(Debug, Clone, PartialEq)]
pub enum ConfigError {
    InvalidPostCode(String),
    EmptyForecastName,
    UpdateIntervalTooLow(u64),
    InvalidStation(String),
    LatitudeOutOfRange(f64),
    LongitudeOutOfRange(f64),
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidPostCode(p) => write!(f, "invalid postal code {:?}, expected four digits", p),
            Self::EmptyForecastName => write!(f, "forecast name must not be empty"),
            Self::UpdateIntervalTooLow(m) => write!(
                f,
                "update interval of {} minute(s) is too low, minimum is {}",
                m, MIN_UPDATE_INTERVAL_MINS
            ),
            Self::InvalidStation(s) => write!(f, "invalid station {:?}, expected a three character code", s),
            Self::LatitudeOutOfRange(v) => write!(f, "latitude {} out of range -90 to 90", v),
            Self::LongitudeOutOfRange(v) => write!(f, "longitude {} out of range -180 to 180", v),
        }
    }
}

impl error::Error for ConfigError {}

/// What to fetch and how often, validated.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CoordinatorConfig {
    pub post_code: String,
    pub forecast_name: String,
    pub weather_station: Option<String>,
    pub real_time_name: Option<String>,
    pub precipitation_station: Option<String>,
    pub real_time_precipitation_name: Option<String>,
    pub update_interval: Duration,
}

impl CoordinatorConfig {
    pub fn new(post_code: &str, forecast_name: &str, update_interval_mins: u64) -> Result<Self, ConfigError> {
        let post_code = validate_post_code(post_code)?;
        let forecast_name = forecast_name.trim();
        if forecast_name.is_empty() {
            return Err(ConfigError::EmptyForecastName);
        }

        if update_interval_mins < MIN_UPDATE_INTERVAL_MINS {
            return Err(ConfigError::UpdateIntervalTooLow(update_interval_mins));
        }

        Ok(CoordinatorConfig {
            post_code,
            forecast_name: forecast_name.to_owned(),
            weather_station: None,
            real_time_name: None,
            precipitation_station: None,
            real_time_precipitation_name: None,
            update_interval: Duration::from_secs(update_interval_mins * 60),
        })
    }

    /// Use a real-time weather station. Without a display name the station code is used.
    pub fn with_weather_station(mut self, station: &str, name: Option<&str>) -> Result<Self, ConfigError> {
        let station = validate_station(station)?;
        self.real_time_name = Some(display_name(&station, name));
        self.weather_station = Some(station);
        Ok(self)
    }

    /// Use a real-time precipitation station. Without a display name the station code is used.
    pub fn with_precipitation_station(mut self, station: &str, name: Option<&str>) -> Result<Self, ConfigError> {
        let station = validate_station(station)?;
        self.real_time_precipitation_name = Some(display_name(&station, name));
        self.precipitation_station = Some(station);
        Ok(self)
    }
}

fn display_name(station: &str, name: Option<&str>) -> String {
    match name.map(str::trim) {
        Some(n) if !n.is_empty() => n.to_owned(),
        _ => station.to_owned(),
    }
}

/// Swiss postal codes are exactly four digits.
pub fn validate_post_code(post_code: &str) -> Result<String, ConfigError> {
    let trimmed = post_code.trim();
    if trimmed.len() == 4 && trimmed.chars().all(|c| c.is_ascii_digit()) {
        Ok(trimmed.to_owned())
    } else {
        Err(ConfigError::InvalidPostCode(post_code.to_owned()))
    }
}

/// Station codes are three alphanumeric characters, normalized to upper case.
pub fn validate_station(station: &str) -> Result<String, ConfigError> {
    let trimmed = station.trim();
    if trimmed.len() == 3 && trimmed.chars().all(|c| c.is_ascii_alphanumeric()) {
        Ok(trimmed.to_ascii_uppercase())
    } else {
        Err(ConfigError::InvalidStation(station.to_owned()))
    }
}

pub fn validate_coordinates(latitude: f64, longitude: f64) -> Result<(), ConfigError> {
    if !(-90.0..=90.0).contains(&latitude) {
        return Err(ConfigError::LatitudeOutOfRange(latitude));
    }

    if !(-180.0..=180.0).contains(&longitude) {
        return Err(ConfigError::LongitudeOutOfRange(longitude));
    }

    Ok(())
}
