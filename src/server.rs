//! Read-only JSON API over the archive, search index and saved links, plus a
//! smoketest that reports whether the IRC transport is backing off.
//!
//! Every query runs through [`db::run_blocking`] like the rest of the bot.

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::{Json, Router};
use serde::{Deserialize, Serialize};

use crate::archive::{self, MessageView};
use crate::channel::connection::BackoffStatus;
use crate::config::ServerConfig;
use crate::db::{self, SharedDb};
use crate::links::{self, LinkEntry};
use crate::search;

/// Upper bound on search hits returned per request.
pub const MAX_SEARCH_RESULTS: usize = 50;

#[derive(Clone)]
pub struct AppState {
    pub db: SharedDb,
    pub backoff: BackoffStatus,
}

#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("invalid request: {0}")]
    BadRequest(String),

    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match &self {
            ApiError::BadRequest(_) => (StatusCode::BAD_REQUEST, self.to_string()),
            ApiError::Internal(e) => {
                tracing::error!(error = %e, "api request failed");
                (StatusCode::INTERNAL_SERVER_ERROR, "internal server error".to_string())
            }
        };
        (status, Json(serde_json::json!({ "error": message }))).into_response()
    }
}

type ApiResult<T> = Result<Json<T>, ApiError>;

pub fn router(db: SharedDb, backoff: BackoffStatus) -> Router {
    Router::new()
        .route("/api/logs/", get(list_years))
        .route("/api/logs/{year}/", get(list_months))
        .route("/api/logs/{year}/{month}/", get(list_days))
        .route("/api/logs/{year}/{month}/{day}/", get(list_messages))
        .route("/api/search", get(search_lines))
        .route("/api/links/", get(list_links))
        .route("/api/smoketest", get(smoketest))
        .with_state(AppState { db, backoff })
}

/// Serve the API until the task is dropped.
pub async fn serve(
    db: SharedDb,
    backoff: BackoffStatus,
    config: &ServerConfig,
) -> anyhow::Result<()> {
    let bind_addr = format!("{}:{}", config.host, config.port);
    let listener = tokio::net::TcpListener::bind(&bind_addr).await?;
    tracing::info!(addr = %bind_addr, "http api listening at http://{bind_addr}/api/logs/");
    axum::serve(listener, router(db, backoff)).await?;
    Ok(())
}

async fn list_years(State(state): State<AppState>) -> ApiResult<Vec<String>> {
    let years = db::run_blocking(&state.db, |conn| Ok(archive::years(conn)?)).await?;
    Ok(Json(years))
}

async fn list_months(
    State(state): State<AppState>,
    Path(year): Path<String>,
) -> ApiResult<Vec<String>> {
    let months =
        db::run_blocking(&state.db, move |conn| Ok(archive::months_in_year(conn, &year)?))
            .await?;
    Ok(Json(months))
}

async fn list_days(
    State(state): State<AppState>,
    Path((year, month)): Path<(String, String)>,
) -> ApiResult<Vec<String>> {
    let days = db::run_blocking(&state.db, move |conn| {
        Ok(archive::days_in_month(conn, &year, &month)?)
    })
    .await?;
    Ok(Json(days))
}

async fn list_messages(
    State(state): State<AppState>,
    Path((year, month, day)): Path<(String, String, String)>,
) -> ApiResult<Vec<MessageView>> {
    let records = db::run_blocking(&state.db, move |conn| {
        Ok(archive::messages_on_day(conn, &year, &month, &day)?)
    })
    .await?;
    Ok(Json(records.iter().map(MessageView::from).collect()))
}

#[derive(Debug, Deserialize)]
pub struct SearchParams {
    pub q: Option<String>,
}

async fn search_lines(
    State(state): State<AppState>,
    Query(params): Query<SearchParams>,
) -> ApiResult<Vec<MessageView>> {
    let query = params
        .q
        .filter(|q| !q.trim().is_empty())
        .ok_or_else(|| ApiError::BadRequest("missing query parameter `q`".into()))?;

    let records = db::run_blocking(&state.db, move |conn| {
        let keys = search::search(conn, &query, MAX_SEARCH_RESULTS)?;
        Ok(archive::messages_by_key(conn, &keys)?)
    })
    .await?;
    Ok(Json(records.iter().map(MessageView::from).collect()))
}

async fn list_links(State(state): State<AppState>) -> ApiResult<Vec<LinkEntry>> {
    let entries =
        db::run_blocking(&state.db, |conn| links::recent_links(conn, links::RECENT_LINKS))
            .await?;
    Ok(Json(entries))
}

/// Single-check health report: passes while the IRC transport is not
/// waiting out a reconnect delay.
#[derive(Debug, Serialize, PartialEq, Eq)]
pub struct SmoketestReport {
    pub status: &'static str,
    pub tests_run: u32,
    pub tests_passed: u32,
    pub tests_failed: u32,
    pub tests_errored: u32,
}

impl SmoketestReport {
    pub fn from_backoff(backoff: &BackoffStatus) -> Self {
        let passed = u32::from(!backoff.is_backing_off());
        Self {
            status: if passed == 1 { "PASS" } else { "FAIL" },
            tests_run: 1,
            tests_passed: passed,
            tests_failed: 1 - passed,
            tests_errored: 0,
        }
    }
}

async fn smoketest(State(state): State<AppState>) -> Json<SmoketestReport> {
    let report = SmoketestReport::from_backoff(&state.backoff);
    if report.tests_failed > 0 {
        tracing::debug!(attempts = state.backoff.attempts(), "smoketest failing, irc backing off");
    }
    Json(report)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::channel::connection::ConnectionSupervisor;
    use chrono::DateTime;
    use std::time::Duration;

    fn state_with_lines(lines: &[(&str, &str, &str)]) -> AppState {
        let mut conn = db::open_memory_database().unwrap();
        for (nick, text, at) in lines {
            let at = DateTime::parse_from_rfc3339(at).unwrap();
            archive::append(&mut conn, nick, text, at).unwrap();
        }
        search::rebuild(&mut conn, || {}).unwrap();
        AppState {
            db: db::shared(conn),
            backoff: BackoffStatus::default(),
        }
    }

    #[tokio::test]
    async fn calendar_listing() {
        let state = state_with_lines(&[
            ("carol", "morning", "2015-02-17T10:00:00Z"),
            ("dave", "later", "2015-03-01T10:00:00Z"),
        ]);

        let Json(years) = list_years(State(state.clone())).await.unwrap();
        assert_eq!(years, vec!["2015"]);

        let Json(months) = list_months(State(state.clone()), Path("2015".into())).await.unwrap();
        assert_eq!(months, vec!["02", "03"]);

        let Json(days) = list_days(State(state), Path(("2015".into(), "02".into())))
            .await
            .unwrap();
        assert_eq!(days, vec!["17"]);
    }

    #[tokio::test]
    async fn day_listing_and_missing_day() {
        let state = state_with_lines(&[("carol_", "morning", "2015-02-17T10:00:00Z")]);

        let Json(messages) = list_messages(
            State(state.clone()),
            Path(("2015".into(), "02".into(), "17".into())),
        )
        .await
        .unwrap();
        assert_eq!(messages.len(), 1);
        assert_eq!(messages[0].nick, "carol");
        assert_eq!(messages[0].time, "10:00:00");
        assert_eq!(messages[0].permalink, "/logs/2015/02/17/#2015-02-17T10:00:00Z");

        let Json(none) = list_messages(
            State(state),
            Path(("2016".into(), "01".into(), "01".into())),
        )
        .await
        .unwrap();
        assert!(none.is_empty());
    }

    #[tokio::test]
    async fn search_resolves_hits() {
        let state = state_with_lines(&[
            ("carol", "the build is green", "2015-02-17T10:00:00Z"),
            ("dave", "lunch?", "2015-02-17T10:01:00Z"),
        ]);

        let Json(hits) = search_lines(
            State(state.clone()),
            Query(SearchParams { q: Some("build".into()) }),
        )
        .await
        .unwrap();
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].nick, "carol");

        let missing = search_lines(State(state), Query(SearchParams { q: None })).await;
        assert!(matches!(missing, Err(ApiError::BadRequest(_))));
    }

    #[tokio::test]
    async fn smoketest_passes_while_connected() {
        let state = state_with_lines(&[]);

        let Json(report) = smoketest(State(state)).await;
        assert_eq!(report.status, "PASS");
        assert_eq!((report.tests_run, report.tests_passed, report.tests_failed), (1, 1, 0));
    }

    #[tokio::test]
    async fn smoketest_fails_while_backing_off() {
        let mut supervisor =
            ConnectionSupervisor::new(Duration::from_secs(5), Duration::from_secs(60));
        let state = AppState {
            backoff: supervisor.status(),
            ..state_with_lines(&[])
        };
        supervisor.next_delay();

        let Json(report) = smoketest(State(state.clone())).await;
        assert_eq!(report.status, "FAIL");
        assert_eq!((report.tests_run, report.tests_passed, report.tests_failed), (1, 0, 1));

        // a successful registration clears it again
        supervisor.reset();
        let Json(report) = smoketest(State(state)).await;
        assert_eq!(report.status, "PASS");

        let body = serde_json::to_value(SmoketestReport::from_backoff(&supervisor.status())).unwrap();
        assert_eq!(body["status"], "PASS");
        assert_eq!(body["tests_errored"], 0);
    }
}
