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

use crate::client::ClientError;
use serde::Serialize;
use std::fmt;

const EARTH_RADIUS_KM: f64 = 6371.0;

const COLUMN_CODE: &str = "Abbr.";
const COLUMN_NAME: &str = "Station";
const COLUMN_LATITUDE: &str = "Latitude";
const COLUMN_LONGITUDE: &str = "Longitude";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StationType {
    Weather,
    Precipitation,
}

impl StationType {
    /// Dataset and file of the station catalogue, relative to the open data base URL.
    pub fn path_segments(&self) -> [&'static str; 2] {
        match self {
            Self::Weather => [
                "ch.meteoschweiz.messnetz-automatisch",
                "ch.meteoschweiz.messnetz-automatisch_en.csv",
            ],
            Self::Precipitation => [
                "ch.meteoschweiz.messnetz-niederschlag",
                "ch.meteoschweiz.messnetz-niederschlag_en.csv",
            ],
        }
    }
}

impl fmt::Display for StationType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Weather => f.write_str("weather"),
            Self::Precipitation => f.write_str("precipitation"),
        }
    }
}

#[derive(Serialize, Debug, Clone, PartialEq)]
pub struct Station {
    pub code: String,
    pub name: String,
    pub latitude: f64,
    pub longitude: f64,
}

/// Parse a `;` separated station catalogue, locating columns by header name.
///
/// Rows without a code or with unusable coordinates (the catalogues end with a few
/// lines of licence text) are skipped.
pub fn parse_catalogue(body: &str) -> Result<Vec<Station>, ClientError> {
    let mut lines = body.lines().filter(|l| !l.trim().is_empty());
    let header: Vec<&str> = lines
        .next()
        .ok_or_else(|| ClientError::Parse("empty station catalogue".to_owned()))?
        .split(';')
        .map(|c| c.trim().trim_matches('"'))
        .collect();

    let column = |name: &str| {
        header
            .iter()
            .position(|c| *c == name)
            .ok_or_else(|| ClientError::Parse(format!("station catalogue has no {:?} column", name)))
    };

    let code_idx = column(COLUMN_CODE)?;
    let name_idx = column(COLUMN_NAME)?;
    let lat_idx = column(COLUMN_LATITUDE)?;
    let lon_idx = column(COLUMN_LONGITUDE)?;

    let mut stations = Vec::new();
    for line in lines {
        let fields: Vec<&str> = line.split(';').map(|c| c.trim().trim_matches('"')).collect();
        let field = |i: usize| fields.get(i).copied().unwrap_or_default();

        let code = field(code_idx);
        let coords = (field(lat_idx).parse::<f64>(), field(lon_idx).parse::<f64>());
        match (code, coords) {
            (c, (Ok(latitude), Ok(longitude))) if !c.is_empty() => stations.push(Station {
                code: c.to_owned(),
                name: field(name_idx).to_owned(),
                latitude,
                longitude,
            }),
            _ => {
                tracing::debug!(message = "skipping station catalogue row", row = %line);
            }
        }
    }

    Ok(stations)
}

/// Great-circle distance in kilometers between two points.
pub fn distance_km(lat1: f64, lon1: f64, lat2: f64, lon2: f64) -> f64 {
    let (phi1, phi2) = (lat1.to_radians(), lat2.to_radians());
    let d_phi = (lat2 - lat1).to_radians();
    let d_lambda = (lon2 - lon1).to_radians();

    let a = (d_phi / 2.0).sin().powi(2) + phi1.cos() * phi2.cos() * (d_lambda / 2.0).sin().powi(2);
    2.0 * EARTH_RADIUS_KM * a.sqrt().asin()
}

/// Stations with their distance from a point, nearest first.
pub fn by_distance(stations: &[Station], latitude: f64, longitude: f64) -> Vec<(&Station, f64)> {
    let mut out: Vec<(&Station, f64)> = stations
        .iter()
        .map(|s| (s, distance_km(latitude, longitude, s.latitude, s.longitude)))
        .collect();

    out.sort_by(|a, b| a.1.total_cmp(&b.1));
    out
}

pub fn closest(stations: &[Station], latitude: f64, longitude: f64) -> Option<&Station> {
    by_distance(stations, latitude, longitude).first().map(|(s, _)| *s)
}

#[cfg(test)]
mod test {
    use super::{by_distance, closest, distance_km, parse_catalogue, StationType};

    const CATALOGUE: &str = "Station;Abbr.;WIGOS-ID;Station type;Data Owner;Data since;Station height m. a. sea level;Barometric altitude m. a. ground;CoordinatesE;CoordinatesN;Latitude;Longitude;Exposition;Canton;Measurements;Link\n\
        Bern / Zollikofen;BER;0-20000-0-06631;Weather station;MeteoSwiss;01.01.1864;552;2;2601929;1204409;46.990744;7.464061;plain;BE;Temperature;https://www.meteoswiss.admin.ch\n\
        Zürich / Fluntern;SMA;0-20000-0-06660;Weather station;MeteoSwiss;01.01.1864;556;3;2685117;1248066;47.377925;8.565742;hilltop;ZH;Temperature;https://www.meteoswiss.admin.ch\n\
        Zürich / Kloten;KLO;0-20000-0-06670;Weather station;MeteoSwiss;01.01.1949;426;4;2682705;1259400;47.479580;8.535980;plain;ZH;Temperature;https://www.meteoswiss.admin.ch\n\
        Genève / Cointrin;GVE;0-20000-0-06700;Weather station;MeteoSwiss;01.01.1864;411;1;2498904;1122632;46.247519;6.127742;plain;GE;Temperature;https://www.meteoswiss.admin.ch\n\
        \n\
        Source: MeteoSwiss;;;;;;;;;;;;;;;\n";

    #[test]
    fn test_parse_catalogue() {
        let stations = parse_catalogue(CATALOGUE).unwrap();

        assert_eq!(4, stations.len());
        assert_eq!("BER", stations[0].code);
        assert_eq!("Bern / Zollikofen", stations[0].name);
        assert!((stations[1].latitude - 47.377925).abs() < 1e-9);
        assert!((stations[1].longitude - 8.565742).abs() < 1e-9);
    }

    #[test]
    fn test_parse_catalogue_missing_column() {
        assert!(parse_catalogue("Station;Abbr.;Latitude\nBern;BER;46.9\n").is_err());
        assert!(parse_catalogue("").is_err());
    }

    #[test]
    fn test_distance() {
        assert!(distance_km(47.0, 8.0, 47.0, 8.0).abs() < 1e-9);
        // Bern to Zurich is roughly 95 km
        let d = distance_km(46.948, 7.447, 47.376, 8.541);
        assert!((90.0..100.0).contains(&d), "distance {}", d);
    }

    #[test]
    fn test_closest() {
        let stations = parse_catalogue(CATALOGUE).unwrap();

        // Zurich main station
        assert_eq!("SMA", closest(&stations, 47.378, 8.540).unwrap().code);
        // Zurich airport
        assert_eq!("KLO", closest(&stations, 47.458, 8.555).unwrap().code);
        // Lausanne is closer to Geneva than to Bern
        assert_eq!("GVE", closest(&stations, 46.519, 6.632).unwrap().code);
        assert!(closest(&[], 47.0, 8.0).is_none());
    }

    #[test]
    fn test_by_distance_sorted() {
        let stations = parse_catalogue(CATALOGUE).unwrap();
        let sorted = by_distance(&stations, 47.378, 8.540);

        assert_eq!(4, sorted.len());
        assert!(sorted.windows(2).all(|w| w[0].1 <= w[1].1));
        assert_eq!("GVE", sorted[3].0.code);
    }

    #[test]
    fn test_station_type_paths() {
        assert_eq!("ch.meteoschweiz.messnetz-niederschlag", StationType::Precipitation.path_segments()[0]);
        assert_eq!("precipitation", StationType::Precipitation.to_string());
    }
}
