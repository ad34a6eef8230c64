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

use crate::coordinator::Snapshot;
use crate::entity::{SensorEntity, WeatherEntity};
use crate::issues::IssueRegistry;
use axum::extract::State;
use axum::http::header::CONTENT_TYPE;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::{Json, Router};
use chrono::Utc;
use prometheus_client::encoding::text::encode;
use prometheus_client::registry::Registry;
use std::sync::Arc;
use tokio::sync::watch;
use tower_http::trace::TraceLayer;

const OPEN_METRICS_CONTENT_TYPE: &str = "application/openmetrics-text; version=1.0.0; charset=utf-8";

/// Everything the HTTP handlers read from.
pub struct RequestContext {
    registry: Registry,
    snapshots: watch::Receiver<Option<Arc<Snapshot>>>,
    issues: Arc<IssueRegistry>,
    entry_id: String,
}

impl RequestContext {
    pub fn new(
        registry: Registry,
        snapshots: watch::Receiver<Option<Arc<Snapshot>>>,
        issues: Arc<IssueRegistry>,
        entry_id: &str,
    ) -> Self {
        Self {
            registry,
            snapshots,
            issues,
            entry_id: entry_id.to_owned(),
        }
    }

    fn snapshot(&self) -> Option<Arc<Snapshot>> {
        self.snapshots.borrow().clone()
    }
}

pub fn app(context: Arc<RequestContext>) -> Router {
    Router::new()
        .route("/metrics", get(text_metrics))
        .route("/api/weather", get(weather))
        .route("/api/sensors", get(sensors))
        .route("/api/issues", get(issues))
        .layer(TraceLayer::new_for_http())
        .with_state(context)
}

pub async fn text_metrics(State(context): State<Arc<RequestContext>>) -> Response {
    let mut buf = String::new();

    match encode(&mut buf, &context.registry) {
        Ok(_) => {
            tracing::debug!(message = "encoded prometheus metrics to text format", num_bytes = buf.len());
            ([(CONTENT_TYPE, OPEN_METRICS_CONTENT_TYPE)], buf).into_response()
        }
        Err(e) => {
            tracing::error!(message = "error encoding metrics", error = %e);
            StatusCode::INTERNAL_SERVER_ERROR.into_response()
        }
    }
}

/// Weather entity of the latest snapshot, 503 until the first refresh succeeds.
pub async fn weather(State(context): State<Arc<RequestContext>>) -> Response {
    match context.snapshot() {
        Some(s) => Json(WeatherEntity::from_snapshot(&s, &context.entry_id, Utc::now())).into_response(),
        None => StatusCode::SERVICE_UNAVAILABLE.into_response(),
    }
}

/// Sensors of the configured weather station, 503 until the first refresh succeeds.
pub async fn sensors(State(context): State<Arc<RequestContext>>) -> Response {
    match context.snapshot() {
        Some(s) => Json(SensorEntity::all_from_snapshot(&s, &context.entry_id)).into_response(),
        None => StatusCode::SERVICE_UNAVAILABLE.into_response(),
    }
}

pub async fn issues(State(context): State<Arc<RequestContext>>) -> Response {
    Json(context.issues.list()).into_response()
}
