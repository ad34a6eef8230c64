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

use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::BTreeMap;
use std::sync::{Mutex, MutexGuard, PoisonError};

pub const DOMAIN: &str = "meteoswiss";

#[derive(Serialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Error,
}

/// A user visible problem that persists until it is retracted.
#[derive(Serialize, Debug, Clone, PartialEq)]
pub struct Issue {
    pub id: String,
    pub severity: Severity,
    pub translation_key: String,
    pub placeholders: BTreeMap<String, String>,
    pub created_at: DateTime<Utc>,
}

impl Issue {
    /// Issue for a real-time station that has not reported anything for too long.
    ///
    /// `source_key` identifies which configured station this is (weather or
    /// precipitation) since the same station may be used for both.
    pub fn station_no_data(station: &str, source_key: &str, created_at: DateTime<Utc>) -> Self {
        let mut placeholders = BTreeMap::new();
        placeholders.insert("station".to_owned(), station.to_owned());

        Issue {
            id: Self::station_no_data_id(station, source_key),
            severity: Severity::Error,
            translation_key: "station_no_data".to_owned(),
            placeholders,
            created_at,
        }
    }

    pub fn station_no_data_id(station: &str, source_key: &str) -> String {
        format!("{}_{}_provides_no_data_{}", station, source_key, DOMAIN)
    }
}

/// Set of currently active issues, at most one per ID.
#[derive(Debug, Default)]
pub struct IssueRegistry {
    issues: Mutex<BTreeMap<String, Issue>>,
}

impl IssueRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add an issue, returning `false` if one with the same ID is already active.
    pub fn raise(&self, issue: Issue) -> bool {
        let mut issues = self.lock();
        if issues.contains_key(&issue.id) {
            return false;
        }

        tracing::error!(
            message = "raised issue",
            id = %issue.id,
            translation_key = %issue.translation_key,
            placeholders = ?issue.placeholders,
        );
        issues.insert(issue.id.clone(), issue);
        true
    }

    /// Remove an issue, returning `false` if it wasn't active.
    pub fn retract(&self, id: &str) -> bool {
        let removed = self.lock().remove(id).is_some();
        if removed {
            tracing::info!(message = "retracted issue", id = %id);
        }
        removed
    }

    pub fn contains(&self, id: &str) -> bool {
        self.lock().contains_key(id)
    }

    pub fn list(&self) -> Vec<Issue> {
        self.lock().values().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    fn lock(&self) -> MutexGuard<'_, BTreeMap<String, Issue>> {
        // Every update is a single insert or remove, a poisoned map is still consistent.
        self.issues.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
