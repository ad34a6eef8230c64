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

//! Numeric values out of station records.
//!
//! Real-time stations routinely miss parameters, so nothing here fails: a missing
//! parameter, the `-` sentinel and a value that isn't a number all come back as `None`.

use crate::client::{RawValue, StationRecord};
use crate::coordinator::Snapshot;
use std::collections::HashMap;

impl RawValue {
    /// Numeric value, if there is one.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            RawValue::Number(v) if v.is_finite() => Some(*v),
            RawValue::Number(_) => None,
            RawValue::Text(_) if self.is_sentinel() => None,
            RawValue::Text(s) => s.trim().parse::<f64>().ok().filter(|v| v.is_finite()),
        }
    }
}

/// How a reader picks the station record a value comes from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Selection {
    /// Scan the configured stations' records in order, take the first usable value.
    FirstAvailable,
    /// Only look at the record of this station.
    Station(String),
}

impl Selection {
    pub fn extract(&self, snapshot: &Snapshot, code: &str) -> Option<f64> {
        match self {
            Self::FirstAvailable => first_available(snapshot.conditions(), code),
            Self::Station(station) => named_station(&snapshot.condition_by_station, station, code),
        }
    }
}

/// Value of `code` in a single record.
pub fn value(record: &StationRecord, code: &str) -> Option<f64> {
    let raw = record.get(code)?;
    match raw.as_f64() {
        Some(v) => Some(v),
        None => {
            tracing::debug!(message = "parameter not available", code = code, value = ?raw);
            None
        }
    }
}

/// First usable value of `code` scanning `records` in order.
pub fn first_available<'a, I>(records: I, code: &str) -> Option<f64>
where
    I: IntoIterator<Item = &'a StationRecord>,
{
    records.into_iter().find_map(|r| value(r, code))
}

/// Value of `code` from the record of one particular station, no fallback.
pub fn named_station(by_station: &HashMap<String, StationRecord>, station: &str, code: &str) -> Option<f64> {
    match by_station.get(station) {
        Some(record) if !record.is_empty() => value(record, code),
        _ => {
            tracing::debug!(message = "station has no current conditions", station = station, code = code);
            None
        }
    }
}

#[cfg(test)]
mod test {
    use super::{first_available, named_station, value};
    use crate::client::{RawValue, StationRecord};
    use std::collections::HashMap;

    fn record(pairs: &[(&str, &str)]) -> StationRecord {
        pairs.iter().map(|(k, v)| (k.to_string(), RawValue::from(*v))).collect()
    }

    #[test]
    fn test_raw_value_as_f64() {
        assert_eq!(Some(12.3), RawValue::from("12.3").as_f64());
        assert_eq!(Some(-4.0), RawValue::from(" -4 ").as_f64());
        assert_eq!(Some(7.5), RawValue::Number(7.5).as_f64());
        assert_eq!(None, RawValue::from("-").as_f64());
        assert_eq!(None, RawValue::from("").as_f64());
        assert_eq!(None, RawValue::from("n/a").as_f64());
        assert_eq!(None, RawValue::from("NaN").as_f64());
        assert_eq!(None, RawValue::Number(f64::INFINITY).as_f64());
    }

    #[test]
    fn test_first_available_empty() {
        let records: Vec<StationRecord> = vec![];
        assert_eq!(None, first_available(&records, "tre200s0"));
    }

    #[test]
    fn test_first_available_sentinel() {
        let records = vec![record(&[("tre200s0", "-")])];
        assert_eq!(None, first_available(&records, "tre200s0"));
    }

    #[test]
    fn test_first_available_value() {
        let records = vec![record(&[("tre200s0", "12.3")])];
        assert_eq!(Some(12.3), first_available(&records, "tre200s0"));
    }

    #[test]
    fn test_first_available_skips_sentinel_row() {
        let records = vec![record(&[("tre200s0", "-")]), record(&[("tre200s0", "7.0")])];
        assert_eq!(Some(7.0), first_available(&records, "tre200s0"));
    }

    #[test]
    fn test_first_available_skips_bad_and_missing_rows() {
        let records = vec![
            record(&[("ure200s0", "50")]),
            record(&[("tre200s0", "warm")]),
            record(&[("tre200s0", "3.5")]),
            record(&[("tre200s0", "9.0")]),
        ];
        assert_eq!(Some(3.5), first_available(&records, "tre200s0"));
    }

    #[test]
    fn test_named_station() {
        let mut by_station = HashMap::new();
        by_station.insert("KLO".to_owned(), record(&[("tre200s0", "-"), ("ure200s0", "61.2")]));
        by_station.insert("SMA".to_owned(), record(&[("tre200s0", "18.0")]));
        by_station.insert("BER".to_owned(), StationRecord::new());

        assert_eq!(Some(61.2), named_station(&by_station, "KLO", "ure200s0"));
        assert_eq!(Some(18.0), named_station(&by_station, "SMA", "tre200s0"));
        // No falling back to another station
        assert_eq!(None, named_station(&by_station, "KLO", "tre200s0"));
        assert_eq!(None, named_station(&by_station, "BER", "tre200s0"));
        assert_eq!(None, named_station(&by_station, "XYZ", "tre200s0"));
    }

    #[test]
    fn test_value_missing_code() {
        assert_eq!(None, value(&record(&[("tre200s0", "1")]), "rre150z0"));
    }
}
