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

use crate::stations::{self, Station, StationType};
use async_trait::async_trait;
use chrono::{DateTime, Duration, NaiveDate, Utc};
use reqwest::header::{ACCEPT, USER_AGENT};
use reqwest::{Client, Response, StatusCode, Url};
use serde::{Deserialize, Deserializer, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::error;
use std::fmt;

/// Marker used by the SwissMetNet feeds for a parameter that was not measured.
pub const SENTINEL: &str = "-";

const CURRENT_CONDITIONS_DATASET: &str = "ch.meteoschweiz.messwerte-aktuell";
const WEATHER_CONDITIONS_FILE: &str = "VQHA80.csv";
const PRECIPITATION_CONDITIONS_FILE: &str = "VQHA98.csv";

#[derive(Debug)]
pub enum ClientError {
    Internal(reqwest::Error),
    InvalidUrl(String),
    Unexpected(StatusCode, Url),
    Parse(String),
}

impl fmt::Display for ClientError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Internal(e) => write!(f, "{}", e),
            Self::InvalidUrl(u) => write!(f, "invalid base URL {}", u),
            Self::Unexpected(status, url) => write!(f, "unexpected status {} for {}", status, url),
            Self::Parse(msg) => write!(f, "malformed response: {}", msg),
        }
    }
}

impl error::Error for ClientError {
    fn source(&self) -> Option<&(dyn error::Error + 'static)> {
        match self {
            Self::Internal(e) => Some(e),
            _ => None,
        }
    }
}

/// Anything that can produce forecast and real-time station data for a postal code.
///
/// `MeteoSwissClient` is the real implementation. The coordinator only depends on
/// this trait so that it can be driven by canned data.
#[async_trait]
pub trait WeatherSource: Send + Sync {
    async fn fetch(&self, post_code: &str) -> Result<ClientResult, ClientError>;
}

/// Result of a single fetch: the forecast for a postal code and the latest
/// measurements of every station in the real-time feeds.
#[derive(Debug, Clone, PartialEq)]
pub struct ClientResult {
    pub forecast: Forecast,
    pub condition_by_station: HashMap<String, StationRecord>,
}

/// Raw value of a single station parameter.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(untagged)]
pub enum RawValue {
    Number(f64),
    Text(String),
}

impl RawValue {
    pub fn is_sentinel(&self) -> bool {
        matches!(self, Self::Text(s) if s.trim() == SENTINEL)
    }
}

impl From<&str> for RawValue {
    fn from(s: &str) -> Self {
        RawValue::Text(s.to_owned())
    }
}

impl From<f64> for RawValue {
    fn from(v: f64) -> Self {
        RawValue::Number(v)
    }
}

/// Parameter code (`tre200s0`, `rre150z0`, ...) to raw value for one station.
pub type StationRecord = BTreeMap<String, RawValue>;

#[derive(Debug)]
pub struct MeteoSwissClient {
    client: Client,
    app_url: Url,
    data_url: Url,
}

impl MeteoSwissClient {
    const USER_AGENT: &'static str = "meteoswiss_exporter (https://github.com/56quarters/meteoswiss_exporter)";
    const JSON_RESPONSE: &'static str = "application/json";
    const CSV_RESPONSE: &'static str = "text/csv";

    pub fn new(client: Client, app_url: &str, data_url: &str) -> Result<Self, ClientError> {
        Ok(MeteoSwissClient {
            client,
            app_url: parse_base_url(app_url)?,
            data_url: parse_base_url(data_url)?,
        })
    }

    /// Fetch the forecast (current icon, daily and hourly forecast) for a postal code.
    pub async fn forecast(&self, post_code: &str) -> Result<Forecast, ClientError> {
        let request_url = self.forecast_url(post_code)?;
        tracing::debug!(message = "making forecast request", url = %request_url);

        let res = self.make_request(request_url, Self::JSON_RESPONSE).await?;
        let detail = res.json::<PlzDetail>().await.map_err(ClientError::Internal)?;
        Ok(detail.into_forecast())
    }

    /// Fetch the latest measurements of all weather and precipitation stations.
    ///
    /// Rows from the weather station feed take precedence, the precipitation feed only
    /// fills in parameters a station does not already have. A feed that can't be fetched
    /// or parsed contributes no stations, so its stations show up as having no data.
    pub async fn current_conditions(&self) -> HashMap<String, StationRecord> {
        let (mut conditions, precipitation) = tokio::join!(
            self.conditions_feed(WEATHER_CONDITIONS_FILE),
            self.conditions_feed(PRECIPITATION_CONDITIONS_FILE),
        );

        merge_conditions(&mut conditions, precipitation);
        conditions
    }

    async fn conditions_feed(&self, file: &str) -> HashMap<String, StationRecord> {
        match self.fetch_conditions_feed(file).await {
            Ok(conditions) => conditions,
            Err(e) => {
                tracing::warn!(message = "unable to fetch current conditions", file = file, error = %e);
                HashMap::new()
            }
        }
    }

    async fn fetch_conditions_feed(&self, file: &str) -> Result<HashMap<String, StationRecord>, ClientError> {
        let request_url = self.data_file_url(&[CURRENT_CONDITIONS_DATASET, file])?;
        tracing::debug!(message = "making current conditions request", url = %request_url);

        let body = self.fetch_text(request_url).await?;
        parse_current_conditions(&body)
    }

    /// Fetch the catalogue of automatic stations of a particular type.
    pub async fn stations(&self, kind: StationType) -> Result<Vec<Station>, ClientError> {
        let request_url = self.data_file_url(&kind.path_segments())?;
        tracing::debug!(message = "making station catalogue request", url = %request_url, kind = %kind);

        let body = self.fetch_text(request_url).await?;
        stations::parse_catalogue(&body)
    }

    async fn fetch_text(&self, url: Url) -> Result<String, ClientError> {
        let res = self.make_request(url, Self::CSV_RESPONSE).await?;
        res.text().await.map_err(ClientError::Internal)
    }

    async fn make_request(&self, url: Url, accept: &str) -> Result<Response, ClientError> {
        let res = self
            .client
            .get(url.clone())
            .header(USER_AGENT, Self::USER_AGENT)
            .header(ACCEPT, accept)
            .send()
            .await
            .map_err(ClientError::Internal)?;

        let status = res.status();
        if status == StatusCode::OK {
            Ok(res)
        } else {
            Err(ClientError::Unexpected(status, url))
        }
    }

    fn forecast_url(&self, post_code: &str) -> Result<Url, ClientError> {
        let mut url = with_path(&self.app_url, &["v1", "plzDetail"])?;
        // The app API addresses localities by postal code followed by a two digit suffix
        url.query_pairs_mut().append_pair("plz", &format!("{}00", post_code));
        Ok(url)
    }

    fn data_file_url(&self, segments: &[&str]) -> Result<Url, ClientError> {
        with_path(&self.data_url, segments)
    }
}

#[async_trait]
impl WeatherSource for MeteoSwissClient {
    async fn fetch(&self, post_code: &str) -> Result<ClientResult, ClientError> {
        let (forecast, condition_by_station) = tokio::join!(self.forecast(post_code), self.current_conditions());
        Ok(ClientResult {
            forecast: forecast?,
            condition_by_station,
        })
    }
}

fn parse_base_url(raw: &str) -> Result<Url, ClientError> {
    match Url::parse(raw) {
        Ok(u) if !u.cannot_be_a_base() => Ok(u),
        _ => Err(ClientError::InvalidUrl(raw.to_owned())),
    }
}

fn with_path(base: &Url, segments: &[&str]) -> Result<Url, ClientError> {
    let mut url = base.clone();
    url.path_segments_mut()
        .map(|mut p| {
            p.clear().extend(segments);
        })
        .map_err(|_| ClientError::InvalidUrl(base.to_string()))?;
    Ok(url)
}

/// Parse one of the `;` separated SwissMetNet real-time feeds into a record per station.
///
/// The first column of each row is the station code, the remaining columns are keyed
/// by the parameter codes in the header row. Values are kept verbatim, including the
/// `-` sentinel.
pub fn parse_current_conditions(body: &str) -> Result<HashMap<String, StationRecord>, ClientError> {
    let mut lines = body.lines().filter(|l| !l.trim().is_empty());
    let header: Vec<&str> = lines
        .next()
        .ok_or_else(|| ClientError::Parse("empty current conditions document".to_owned()))?
        .split(';')
        .map(str::trim)
        .collect();

    if header.len() < 2 {
        return Err(ClientError::Parse(format!(
            "current conditions header has {} column(s)",
            header.len()
        )));
    }

    let mut out = HashMap::new();
    for line in lines {
        let fields: Vec<&str> = line.split(';').map(str::trim).collect();
        let station = match fields.first() {
            Some(s) if !s.is_empty() => s.to_string(),
            _ => continue,
        };

        let record: StationRecord = header
            .iter()
            .zip(fields.iter())
            .skip(1)
            .map(|(code, value)| (code.to_string(), RawValue::from(*value)))
            .collect();

        out.insert(station, record);
    }

    Ok(out)
}

fn merge_conditions(into: &mut HashMap<String, StationRecord>, from: HashMap<String, StationRecord>) {
    for (station, record) in from {
        let existing = into.entry(station).or_default();
        for (code, value) in record {
            existing.entry(code).or_insert(value);
        }
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct Forecast {
    pub current: CurrentWeather,
    pub daily: Vec<DayForecast>,
    pub hourly: Vec<HourlyForecast>,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct CurrentWeather {
    #[serde(default, with = "chrono::serde::ts_milliseconds_option")]
    pub time: Option<DateTime<Utc>>,
    #[serde(default, deserialize_with = "icon_code")]
    pub icon: Option<i64>,
    #[serde(default)]
    pub temperature: Option<f64>,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct DayForecast {
    #[serde(alias = "dayDate")]
    pub day_date: NaiveDate,
    #[serde(alias = "iconDay", default, deserialize_with = "icon_code")]
    pub icon_day: Option<i64>,
    #[serde(alias = "temperatureMin", default)]
    pub temperature_min: Option<f64>,
    #[serde(alias = "temperatureMax", default)]
    pub temperature_max: Option<f64>,
    #[serde(default)]
    pub precipitation: Option<f64>,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct HourlyForecast {
    pub time: DateTime<Utc>,
    pub temperature_min: Option<f64>,
    pub temperature_max: Option<f64>,
    pub temperature_mean: Option<f64>,
    pub precipitation: Option<f64>,
    pub precipitation_min: Option<f64>,
    pub precipitation_max: Option<f64>,
}

/// Response of the app `plzDetail` endpoint, only the parts we use.
#[derive(Deserialize, Debug)]
pub(crate) struct PlzDetail {
    #[serde(alias = "currentWeather")]
    current_weather: CurrentWeather,
    #[serde(default)]
    forecast: Vec<DayForecast>,
    #[serde(default)]
    graph: Option<Graph>,
}

impl PlzDetail {
    pub(crate) fn into_forecast(self) -> Forecast {
        let hourly = self.graph.map(|g| g.hourly()).unwrap_or_default();
        Forecast {
            current: self.current_weather,
            daily: self.forecast,
            hourly,
        }
    }
}

#[derive(Deserialize, Debug)]
struct Graph {
    #[serde(with = "chrono::serde::ts_milliseconds")]
    start: DateTime<Utc>,
    #[serde(alias = "temperatureMin1h", default)]
    temperature_min_1h: Vec<Option<f64>>,
    #[serde(alias = "temperatureMax1h", default)]
    temperature_max_1h: Vec<Option<f64>>,
    #[serde(alias = "temperatureMean1h", default)]
    temperature_mean_1h: Vec<Option<f64>>,
    #[serde(alias = "precipitation1h", default)]
    precipitation_1h: Vec<Option<f64>>,
    #[serde(alias = "precipitationMin1h", default)]
    precipitation_min_1h: Vec<Option<f64>>,
    #[serde(alias = "precipitationMax1h", default)]
    precipitation_max_1h: Vec<Option<f64>>,
}

impl Graph {
    /// One entry per hour starting at `start`, as long as temperatures are available.
    fn hourly(&self) -> Vec<HourlyForecast> {
        let len = self.temperature_min_1h.len().max(self.temperature_max_1h.len());
        (0..len)
            .map(|i| HourlyForecast {
                time: self.start + Duration::hours(i as i64),
                temperature_min: at(&self.temperature_min_1h, i),
                temperature_max: at(&self.temperature_max_1h, i),
                temperature_mean: at(&self.temperature_mean_1h, i),
                precipitation: at(&self.precipitation_1h, i),
                precipitation_min: at(&self.precipitation_min_1h, i),
                precipitation_max: at(&self.precipitation_max_1h, i),
            })
            .collect()
    }
}

fn at(values: &[Option<f64>], i: usize) -> Option<f64> {
    values.get(i).copied().flatten()
}

/// Icon codes are integers. Anything else is kept as "no icon" so that classification
/// reports it instead of the whole forecast failing to parse.
fn icon_code<'de, D>(deserializer: D) -> Result<Option<i64>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<serde_json::Value>::deserialize(deserializer)?;
    Ok(value.and_then(|v| match v.as_i64() {
        Some(code) => Some(code),
        None => {
            tracing::warn!(message = "non-integer icon code in forecast", value = %v);
            None
        }
    }))
}

#[cfg(test)]
mod test {
    use super::{parse_current_conditions, MeteoSwissClient, PlzDetail, RawValue};
    use chrono::{NaiveDate, TimeZone, Utc};
    use reqwest::Client;

    const WEATHER_FEED: &str = "Station/Location;Date;tre200s0;rre150z0;ure200s0\n\
        KLO;202408231200;21.4;0.0;55.2\n\
        SMA;202408231200;-;0.2;61.0\n\
        \n";

    const PRECIPITATION_FEED: &str = "Station/Location;Date;rre150z0\n\
        KLO;202408231200;9.9\n\
        AGAAR;202408231200;1.3\n";

    const PLZ_DETAIL: &str = r#"{
        "currentWeather": {"time": 1724414400000, "icon": 2, "temperature": 21.3},
        "forecast": [
            {"dayDate": "2024-08-23", "iconDay": 2, "temperatureMax": 27.0, "temperatureMin": 15.0, "precipitation": 0.0},
            {"dayDate": "2024-08-24", "iconDay": "bogus", "temperatureMax": 24.0, "temperatureMin": 14.0, "precipitation": 3.2}
        ],
        "graph": {
            "start": 1724364000000,
            "temperatureMin1h": [14.1, 13.9, 13.5],
            "temperatureMax1h": [15.0, 14.8, 14.2],
            "temperatureMean1h": [14.5, 14.3, 13.8],
            "precipitation1h": [0.0, 0.1],
            "precipitationMin1h": [0.0, 0.0, 0.0],
            "precipitationMax1h": [0.0, 0.4, 1.2]
        },
        "warnings": []
    }"#;

    #[test]
    fn test_parse_current_conditions() {
        let conditions = parse_current_conditions(WEATHER_FEED).unwrap();

        assert_eq!(2, conditions.len());
        let klo = &conditions["KLO"];
        assert_eq!(Some(&RawValue::from("21.4")), klo.get("tre200s0"));
        assert_eq!(Some(&RawValue::from("202408231200")), klo.get("Date"));
        assert!(!klo.contains_key("Station/Location"));
        assert!(conditions["SMA"]["tre200s0"].is_sentinel());
    }

    #[test]
    fn test_parse_current_conditions_empty() {
        assert!(parse_current_conditions("").is_err());
        assert!(parse_current_conditions("Station/Location\n").is_err());
    }

    #[test]
    fn test_merge_conditions_prefers_weather_feed() {
        let mut conditions = parse_current_conditions(WEATHER_FEED).unwrap();
        super::merge_conditions(&mut conditions, parse_current_conditions(PRECIPITATION_FEED).unwrap());

        assert_eq!(3, conditions.len());
        assert_eq!(Some(&RawValue::from("0.0")), conditions["KLO"].get("rre150z0"));
        assert_eq!(Some(&RawValue::from("1.3")), conditions["AGAAR"].get("rre150z0"));
    }

    #[test]
    fn test_plz_detail_into_forecast() {
        let detail: PlzDetail = serde_json::from_str(PLZ_DETAIL).unwrap();
        let forecast = detail.into_forecast();

        assert_eq!(Some(2), forecast.current.icon);
        assert_eq!(Some(21.3), forecast.current.temperature);
        assert_eq!(2, forecast.daily.len());
        assert_eq!(NaiveDate::from_ymd_opt(2024, 8, 23).unwrap(), forecast.daily[0].day_date);
        assert_eq!(None, forecast.daily[1].icon_day);

        assert_eq!(3, forecast.hourly.len());
        assert_eq!(Utc.with_ymd_and_hms(2024, 8, 22, 22, 0, 0).unwrap(), forecast.hourly[0].time);
        assert_eq!(Utc.with_ymd_and_hms(2024, 8, 23, 0, 0, 0).unwrap(), forecast.hourly[2].time);
        assert_eq!(Some(1.2), forecast.hourly[2].precipitation_max);
        assert_eq!(None, forecast.hourly[2].precipitation);
    }

    #[test]
    fn test_plz_detail_without_graph() {
        let detail: PlzDetail = serde_json::from_str(r#"{"currentWeather": {"icon": null}}"#).unwrap();
        let forecast = detail.into_forecast();

        assert_eq!(None, forecast.current.icon);
        assert!(forecast.daily.is_empty());
        assert!(forecast.hourly.is_empty());
    }

    #[test]
    fn test_forecast_url() {
        let client = MeteoSwissClient::new(
            Client::new(),
            "https://app-prod-ws.meteoswiss-app.ch/",
            "https://data.geo.admin.ch/",
        )
        .unwrap();

        let url = client.forecast_url("8001").unwrap();
        assert_eq!("https://app-prod-ws.meteoswiss-app.ch/v1/plzDetail?plz=800100", url.as_str());
    }

    #[test]
    fn test_invalid_base_url() {
        assert!(MeteoSwissClient::new(Client::new(), "not a url", "https://data.geo.admin.ch/").is_err());
        assert!(MeteoSwissClient::new(Client::new(), "https://example.com/", "mailto:someone@example.com").is_err());
    }
}
