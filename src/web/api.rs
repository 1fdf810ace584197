use std::convert::Infallible;
use std::sync::Arc;
use std::time::Duration;
use chrono::{DateTime, Utc};
use log::error;
use serde::{Deserialize, Serialize};
use warp::http::StatusCode;
use warp::reply::{self, Response};
use warp::{Filter, Rejection, Reply};
use crate::error::{Error, ErrorKind, Result};
use crate::metrics;
use crate::models::RateStats;
use crate::services::RateAnalytics;
use crate::validation::normalize_symbol;

#[derive(Clone)]
pub struct ApiState {
    pub analytics: Arc<RateAnalytics>,
    pub request_timeout: Duration,
}

#[derive(Debug, Deserialize)]
pub struct WindowQuery {
    pub from: Option<DateTime<Utc>>,
    pub to: Option<DateTime<Utc>>,
}

#[derive(Debug, Serialize)]
pub struct RateResponse {
    pub symbol: String,
    pub price: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub min_24h: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_24h: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub change_1h_pct: Option<f64>,
    pub updated_at: DateTime<Utc>,
}

impl From<RateStats> for RateResponse {
    fn from(stats: RateStats) -> Self {
        Self {
            symbol: stats.symbol,
            price: stats.price,
            min_24h: stats.min_24h,
            max_24h: stats.max_24h,
            change_1h_pct: stats.change_1h_pct,
            updated_at: stats.updated_at,
        }
    }
}

#[derive(Debug, Serialize)]
struct ErrorBody {
    error: &'static str,
    message: String,
}

pub fn routes(state: ApiState) -> impl Filter<Extract = (impl Reply,), Error = Infallible> + Clone {
    let health = warp::path("health")
        .and(warp::path::end())
        .and(warp::get())
        .map(health_check);

    let metrics = warp::path("metrics")
        .and(warp::path::end())
        .and(warp::get())
        .map(get_metrics);

    let all_rates = warp::path("rates")
        .and(warp::path::end())
        .and(warp::get())
        .and(with_state(state.clone()))
        .and_then(get_rates);

    let one_rate = warp::path!("rates" / String)
        .and(warp::get())
        .and(warp::query::<WindowQuery>())
        .and(with_state(state))
        .and_then(get_rate);

    health
        .or(metrics)
        .or(all_rates)
        .or(one_rate)
        .recover(handle_rejection)
}

fn with_state(state: ApiState) -> impl Filter<Extract = (ApiState,), Error = Infallible> + Clone {
    warp::any().map(move || state.clone())
}

fn health_check() -> Response {
    reply::json(&serde_json::json!({
        "status": "ok",
        "timestamp": Utc::now().to_rfc3339()
    }))
    .into_response()
}

fn get_metrics() -> Response {
    match metrics::render() {
        Ok(text) => reply::with_header(text, "content-type", "text/plain; version=0.0.4")
            .into_response(),
        Err(e) => error_response(&Error::from(e)),
    }
}

async fn get_rates(state: ApiState) -> std::result::Result<Response, Infallible> {
    let result = bounded(state.request_timeout, state.analytics.get_all_latest()).await;
    Ok(match result {
        Ok(rates) => {
            let body: Vec<RateResponse> = rates.into_iter().map(RateResponse::from).collect();
            reply::json(&body).into_response()
        }
        Err(e) => error_response(&e),
    })
}

async fn get_rate(
    symbol: String,
    query: WindowQuery,
    state: ApiState,
) -> std::result::Result<Response, Infallible> {
    let result = match normalize_symbol(&symbol) {
        Ok(symbol) => {
            bounded(
                state.request_timeout,
                state.analytics.get_stats_by_symbol(&symbol, query.from, query.to),
            )
            .await
        }
        Err(_) => Err(Error::CoinNotFound(symbol.to_uppercase())),
    };
    Ok(match result {
        Ok(stats) => reply::json(&RateResponse::from(stats)).into_response(),
        Err(e) => error_response(&e),
    })
}

async fn bounded<T>(limit: Duration, work: impl std::future::Future<Output = Result<T>>) -> Result<T> {
    tokio::time::timeout(limit, work).await?
}

fn error_response(err: &Error) -> Response {
    let (status, code) = match (err.kind(), err) {
        (_, Error::CoinNotFound(_)) => (StatusCode::NOT_FOUND, "coin_not_found"),
        (ErrorKind::NotFound, _) => (StatusCode::NOT_FOUND, "prices_not_found"),
        (ErrorKind::Unprocessable, _) => {
            (StatusCode::UNPROCESSABLE_ENTITY, "not_enough_data_for_change_1h")
        }
        (ErrorKind::BadRequest, _) => (StatusCode::BAD_REQUEST, "bad_request"),
        (ErrorKind::Internal, _) => (StatusCode::INTERNAL_SERVER_ERROR, "internal_server_error"),
    };
    let message = if err.is_internal() {
        error!("Request failed: {}", err);
        "internal error".to_string()
    } else {
        err.to_string()
    };
    reply::with_status(reply::json(&ErrorBody { error: code, message }), status).into_response()
}

async fn handle_rejection(rejection: Rejection) -> std::result::Result<Response, Infallible> {
    let (status, code) = if rejection.is_not_found() {
        (StatusCode::NOT_FOUND, "not_found")
    } else if rejection.find::<warp::reject::InvalidQuery>().is_some() {
        (StatusCode::BAD_REQUEST, "bad_request")
    } else if rejection.find::<warp::reject::MethodNotAllowed>().is_some() {
        (StatusCode::METHOD_NOT_ALLOWED, "method_not_allowed")
    } else {
        error!("Unhandled rejection: {:?}", rejection);
        (StatusCode::INTERNAL_SERVER_ERROR, "internal_server_error")
    };
    let body = ErrorBody { error: code, message: code.replace('_', " ") };
    Ok(reply::with_status(reply::json(&body), status).into_response())
}
