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

use crate::entity::{SensorEntity, WeatherEntity};
use prometheus_client::encoding::EncodeLabelSet;
use prometheus_client::metrics::counter::Counter;
use prometheus_client::metrics::family::Family;
use prometheus_client::metrics::gauge::Gauge;
use prometheus_client::registry::Registry;
use std::sync::atomic::AtomicU64;

const OUTCOME_SUCCESS: &str = "success";
const OUTCOME_FAILURE: &str = "failure";

type FloatGauge = Gauge<f64, AtomicU64>;

#[derive(Debug, Clone, Hash, PartialEq, Eq, EncodeLabelSet)]
struct PostCodeLabels {
    post_code: String,
}

#[derive(Debug, Clone, Hash, PartialEq, Eq, EncodeLabelSet)]
struct ForecastLabels {
    post_code: String,
    day: String,
}

#[derive(Debug, Clone, Hash, PartialEq, Eq, EncodeLabelSet)]
struct SensorLabels {
    station: String,
    sensor: String,
}

#[derive(Debug, Clone, Hash, PartialEq, Eq, EncodeLabelSet)]
struct OutcomeLabels {
    outcome: String,
}

/// Holder for metrics that can be set from weather and sensor entities.
///
/// All metrics are registered upon call to `WeatherMetrics::new()`. Values that are
/// unavailable in the most recent snapshot are set to `NaN` rather than keeping their
/// previous value.
#[derive(Debug)]
pub struct WeatherMetrics {
    available: Family<PostCodeLabels, Gauge>,
    icon: Family<PostCodeLabels, FloatGauge>,
    temperature: Family<PostCodeLabels, FloatGauge>,
    pressure: Family<PostCodeLabels, FloatGauge>,
    pressure_qff: Family<PostCodeLabels, FloatGauge>,
    pressure_qnh: Family<PostCodeLabels, FloatGauge>,
    humidity: Family<PostCodeLabels, FloatGauge>,
    wind_speed: Family<PostCodeLabels, FloatGauge>,
    wind_bearing: Family<PostCodeLabels, FloatGauge>,
    precipitation: Family<PostCodeLabels, FloatGauge>,
    forecast_temperature_min: Family<ForecastLabels, FloatGauge>,
    forecast_temperature_max: Family<ForecastLabels, FloatGauge>,
    forecast_precipitation: Family<ForecastLabels, FloatGauge>,
    sensor: Family<SensorLabels, FloatGauge>,
    refreshes: Family<OutcomeLabels, Counter>,
    active_issues: Gauge,
}

impl WeatherMetrics {
    /// Create a new `WeatherMetrics` and register each metric with the provided `Registry`.
    ///
    /// Names are prefixed by the registry, use `Registry::with_prefix("meteoswiss")` to get
    /// names like `meteoswiss_weather_temperature_degrees`.
    pub fn new(reg: &mut Registry) -> Self {
        let available = Family::<PostCodeLabels, Gauge>::default();
        let icon = Family::<PostCodeLabels, FloatGauge>::default();
        let temperature = Family::<PostCodeLabels, FloatGauge>::default();
        let pressure = Family::<PostCodeLabels, FloatGauge>::default();
        let pressure_qff = Family::<PostCodeLabels, FloatGauge>::default();
        let pressure_qnh = Family::<PostCodeLabels, FloatGauge>::default();
        let humidity = Family::<PostCodeLabels, FloatGauge>::default();
        let wind_speed = Family::<PostCodeLabels, FloatGauge>::default();
        let wind_bearing = Family::<PostCodeLabels, FloatGauge>::default();
        let precipitation = Family::<PostCodeLabels, FloatGauge>::default();
        let forecast_temperature_min = Family::<ForecastLabels, FloatGauge>::default();
        let forecast_temperature_max = Family::<ForecastLabels, FloatGauge>::default();
        let forecast_precipitation = Family::<ForecastLabels, FloatGauge>::default();
        let sensor = Family::<SensorLabels, FloatGauge>::default();
        let refreshes = Family::<OutcomeLabels, Counter>::default();
        let active_issues = Gauge::default();

        reg.register(
            "weather_available",
            "1 if a daily forecast is available, 0 otherwise",
            available.clone(),
        );
        reg.register("weather_icon", "Current MeteoSwiss icon code", icon.clone());
        reg.register(
            "weather_temperature_degrees",
            "Temperature in celsius",
            temperature.clone(),
        );
        reg.register(
            "weather_pressure_hpa",
            "Station level pressure in hectopascals",
            pressure.clone(),
        );
        reg.register(
            "weather_pressure_qff_hpa",
            "Pressure reduced to sea level (QFF) in hectopascals",
            pressure_qff.clone(),
        );
        reg.register(
            "weather_pressure_qnh_hpa",
            "Pressure reduced to sea level with standard atmosphere (QNH) in hectopascals",
            pressure_qnh.clone(),
        );
        reg.register(
            "weather_relative_humidity",
            "Relative humidity (0-100)",
            humidity.clone(),
        );
        reg.register(
            "weather_wind_speed_kph",
            "Ten minute mean wind speed in kilometers per hour",
            wind_speed.clone(),
        );
        reg.register(
            "weather_wind_bearing_degrees",
            "Ten minute mean wind direction in degrees",
            wind_bearing.clone(),
        );
        reg.register(
            "weather_precipitation_mm",
            "Precipitation over the last ten minutes in millimeters",
            precipitation.clone(),
        );
        reg.register(
            "forecast_temperature_min_degrees",
            "Forecast minimum temperature of a day in celsius",
            forecast_temperature_min.clone(),
        );
        reg.register(
            "forecast_temperature_max_degrees",
            "Forecast maximum temperature of a day in celsius",
            forecast_temperature_max.clone(),
        );
        reg.register(
            "forecast_precipitation_mm",
            "Forecast precipitation of a day in millimeters",
            forecast_precipitation.clone(),
        );
        reg.register("sensor", "Real-time station measurement", sensor.clone());
        reg.register("refreshes", "Refreshes of forecast and station data", refreshes.clone());
        reg.register("active_issues", "Currently raised issues", active_issues.clone());

        Self {
            available,
            icon,
            temperature,
            pressure,
            pressure_qff,
            pressure_qnh,
            humidity,
            wind_speed,
            wind_bearing,
            precipitation,
            forecast_temperature_min,
            forecast_temperature_max,
            forecast_precipitation,
            sensor,
            refreshes,
            active_issues,
        }
    }

    /// Set metrics from the weather entity of the most recent snapshot.
    pub fn weather(&self, post_code: &str, weather: &WeatherEntity, icon: Option<i64>) {
        let labels = PostCodeLabels {
            post_code: post_code.to_owned(),
        };

        self.available
            .get_or_create(&labels)
            .set(if weather.available { 1 } else { 0 });
        set_or_nan(&self.icon, &labels, icon.map(|i| i as f64));
        set_or_nan(&self.temperature, &labels, weather.temperature);
        set_or_nan(&self.pressure, &labels, weather.pressure);
        set_or_nan(&self.pressure_qff, &labels, weather.pressure_qff);
        set_or_nan(&self.pressure_qnh, &labels, weather.pressure_qnh);
        set_or_nan(&self.humidity, &labels, weather.humidity);
        set_or_nan(&self.wind_speed, &labels, weather.wind_speed);
        set_or_nan(&self.wind_bearing, &labels, weather.wind_bearing);
        set_or_nan(&self.precipitation, &labels, weather.precipitation);

        // Forecasts can get shorter, days that are no longer forecast go away
        self.forecast_temperature_min.clear();
        self.forecast_temperature_max.clear();
        self.forecast_precipitation.clear();

        for (i, day) in weather.daily_forecast.iter().enumerate() {
            let labels = ForecastLabels {
                post_code: post_code.to_owned(),
                day: i.to_string(),
            };

            set_or_nan(&self.forecast_temperature_min, &labels, day.templow);
            set_or_nan(&self.forecast_temperature_max, &labels, day.temperature);
            set_or_nan(&self.forecast_precipitation, &labels, day.precipitation);
        }
    }

    /// Set metrics from the sensors of the configured weather station.
    pub fn sensors(&self, sensors: &[SensorEntity]) {
        for s in sensors {
            let labels = SensorLabels {
                station: s.station.clone(),
                sensor: s.key.to_owned(),
            };

            set_or_nan(&self.sensor, &labels, s.value);
        }
    }

    pub fn refresh_success(&self) {
        self.refresh(OUTCOME_SUCCESS);
    }

    pub fn refresh_failure(&self) {
        self.refresh(OUTCOME_FAILURE);
    }

    fn refresh(&self, outcome: &str) {
        self.refreshes
            .get_or_create(&OutcomeLabels {
                outcome: outcome.to_owned(),
            })
            .inc();
    }

    pub fn active_issues(&self, count: usize) {
        self.active_issues.set(count as i64);
    }
}

fn set_or_nan<L>(family: &Family<L, FloatGauge>, labels: &L, value: Option<f64>)
where
    L: Clone + std::hash::Hash + Eq,
{
    family.get_or_create(labels).set(value.unwrap_or(f64::NAN));
}

#[cfg(test)]
mod test {
    use super::WeatherMetrics;
    use crate::client::DayForecast;
    use crate::coordinator::test::{config, record, result_with};
    use crate::coordinator::Snapshot;
    use crate::entity::{SensorEntity, WeatherEntity};
    use chrono::{NaiveDate, Utc};
    use prometheus_client::encoding::text::encode;
    use prometheus_client::registry::Registry;

    fn encoded(reg: &Registry) -> String {
        let mut buf = String::new();
        encode(&mut buf, reg).unwrap();
        buf
    }

    #[test]
    fn test_weather_and_sensors() {
        let mut reg = Registry::with_prefix("meteoswiss");
        let metrics = WeatherMetrics::new(&mut reg);
        let snapshot = Snapshot::new(
            result_with(&[(
                "KLO",
                record(&[("tre200s0", "21.5"), ("ure200s0", "-"), ("rre150z0", "0.25")]),
            )]),
            &config(),
        );

        let weather = WeatherEntity::from_snapshot(&snapshot, "abc", Utc::now());
        let sensors = SensorEntity::all_from_snapshot(&snapshot, "abc");
        metrics.weather(&snapshot.post_code, &weather, snapshot.forecast.current.icon);
        metrics.sensors(&sensors);

        let out = encoded(&reg);
        assert!(out.contains("meteoswiss_weather_temperature_degrees{post_code=\"8001\"} 21.5"));
        assert!(out.contains("meteoswiss_weather_relative_humidity{post_code=\"8001\"} NaN"));
        assert!(out.contains("meteoswiss_weather_available{post_code=\"8001\"} 0"));
        assert!(out.contains("meteoswiss_sensor{station=\"KLO\",sensor=\"temperature\"} 21.5"));
        assert!(out.contains("meteoswiss_sensor{station=\"KLO\",sensor=\"10minrain\"} 0.25"));
    }

    fn day(d: u32, min: f64, max: f64) -> DayForecast {
        DayForecast {
            day_date: NaiveDate::from_ymd_opt(2024, 8, d).unwrap(),
            icon_day: Some(1),
            temperature_min: Some(min),
            temperature_max: Some(max),
            precipitation: Some(0.0),
        }
    }

    #[test]
    fn test_weather_forecast_days_removed() {
        let mut reg = Registry::with_prefix("meteoswiss");
        let metrics = WeatherMetrics::new(&mut reg);
        let mut snapshot = Snapshot::new(result_with(&[]), &config());

        snapshot.forecast.daily = vec![day(23, 15.0, 27.5), day(24, 14.0, 25.5)];
        let weather = WeatherEntity::from_snapshot(&snapshot, "abc", Utc::now());
        metrics.weather(&snapshot.post_code, &weather, snapshot.forecast.current.icon);

        let out = encoded(&reg);
        assert!(out.contains("meteoswiss_forecast_temperature_max_degrees{post_code=\"8001\",day=\"0\"} 27.5"));
        assert!(out.contains("meteoswiss_forecast_temperature_max_degrees{post_code=\"8001\",day=\"1\"} 25.5"));

        snapshot.forecast.daily = vec![];
        let weather = WeatherEntity::from_snapshot(&snapshot, "abc", Utc::now());
        metrics.weather(&snapshot.post_code, &weather, snapshot.forecast.current.icon);

        let out = encoded(&reg);
        assert!(out.contains("meteoswiss_weather_available{post_code=\"8001\"} 0"));
        assert!(!out.contains("day=\"0\""));
        assert!(!out.contains("day=\"1\""));
    }

    #[test]
    fn test_refreshes_and_issues() {
        let mut reg = Registry::with_prefix("meteoswiss");
        let metrics = WeatherMetrics::new(&mut reg);

        metrics.refresh_success();
        metrics.refresh_success();
        metrics.refresh_failure();
        metrics.active_issues(2);

        let out = encoded(&reg);
        assert!(out.contains("meteoswiss_refreshes_total{outcome=\"success\"} 2"));
        assert!(out.contains("meteoswiss_refreshes_total{outcome=\"failure\"} 1"));
        assert!(out.contains("meteoswiss_active_issues 2"));
    }
}
