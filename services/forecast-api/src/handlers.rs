//! Request handlers for the forecast API.

use axum::{
    extract::{Extension, Path, Query},
    http::{header, StatusCode},
    response::Response,
};
use chrono::Utc;
use forecast_common::{SurfaceVariable, TimerangeDt, Timestamp, Unit, WeatherVariable};
use met_grid::SelectionMode;
use point_query::{Domain, DomainMixer, QueryContext, QueryError};
use serde::Serialize;
use serde_json::json;
use std::sync::Arc;
use std::time::Duration;
use tracing::warn;

use crate::params::{DailyAggregate, ForecastParams, ForecastRequest, ResponseFormat, TimeFormat};
use crate::state::AppState;

const SECONDS_PER_DAY: i64 = 86_400;

/// Deadline for the storage work of one request.
const QUERY_TIMEOUT: Duration = Duration::from_secs(10);

/// GET /health
pub async fn health_handler() -> Response {
    json_response(StatusCode::OK, json!({"status": "ok"}).to_string())
}

/// GET /{model}
pub async fn forecast_handler(
    Extension(state): Extension<Arc<AppState>>,
    Path(model): Path<String>,
    Query(params): Query<ForecastParams>,
) -> Response {
    let Some(domains) = state.domains(&model) else {
        return error_response(
            StatusCode::NOT_FOUND,
            format!("unknown model: {model}"),
        );
    };

    let now = Timestamp::from_datetime(Utc::now());
    let request = match params.validate(now) {
        Ok(request) => request,
        Err(e) => return error_response(StatusCode::BAD_REQUEST, e.to_string()),
    };

    // The storage core is synchronous mmap I/O; keep it off the async workers.
    let domains = domains.to_vec();
    match tokio::task::spawn_blocking(move || answer(&domains, &request, now)).await {
        Ok(Ok(body)) => body.into_response(),
        Ok(Err(e)) => query_error_response(e),
        Err(e) => {
            warn!(error = %e, "forecast worker panicked");
            error_response(
                StatusCode::INTERNAL_SERVER_ERROR,
                "internal error".to_string(),
            )
        }
    }
}

/// An encoded response body with its content type.
pub struct EncodedForecast {
    pub body: String,
    pub content_type: &'static str,
}

impl EncodedForecast {
    fn into_response(self) -> Response {
        Response::builder()
            .status(StatusCode::OK)
            .header(header::CONTENT_TYPE, self.content_type)
            .body(self.body.into())
            .unwrap()
    }
}

/// Resolve and encode one validated forecast request.
pub fn answer(
    domains: &[Arc<Domain>],
    request: &ForecastRequest,
    now: Timestamp,
) -> Result<EncodedForecast, QueryError> {
    let mixer = DomainMixer::for_point(
        domains,
        request.latitude,
        request.longitude,
        request.elevation,
        SelectionMode::TerrainOptimised,
    )?;
    let ctx = QueryContext::with_timeout(QUERY_TIMEOUT);

    for variable in &request.hourly {
        mixer.prefetch(*variable, request.range);
    }

    let mut hourly = Vec::with_capacity(request.hourly.len());
    for variable in &request.hourly {
        let mut series = mixer.get(*variable, request.range, &ctx)?;
        let unit = request.convert_series(&mut series.values, series.unit);
        hourly.push((variable.file_stem(), series.values, unit));
    }

    let mut daily = Vec::with_capacity(request.daily.len());
    for aggregate in &request.daily {
        let series = mixer.get(aggregate.source(), request.range, &ctx)?;
        let mut values = aggregate_daily(
            *aggregate,
            &series.values,
            &request.range,
            request.utc_offset_seconds,
        );
        let unit = request.convert_series(&mut values, series.unit);
        daily.push((aggregate.name(), values, unit));
    }

    let current_weather = if request.current_weather {
        Some(current_weather(&mixer, request, now, &ctx)?)
    } else {
        None
    };

    // The best-resolution reader defines the reported model elevation.
    let grid_elevation = mixer
        .readers()
        .last()
        .map(|r| r.point().grid_elevation)
        .unwrap_or(f32::NAN);

    let encoded = match request.format {
        ResponseFormat::Json => EncodedForecast {
            body: encode_json(request, grid_elevation, &hourly, &daily, current_weather),
            content_type: "application/json",
        },
        ResponseFormat::Csv => EncodedForecast {
            body: encode_csv(request, &hourly),
            content_type: "text/csv",
        },
    };
    Ok(encoded)
}

/// The latest completed hour of the highest-resolution data.
#[derive(Debug, Serialize)]
pub struct CurrentWeather {
    pub time: serde_json::Value,
    pub temperature: Option<f32>,
    pub windspeed: Option<f32>,
    pub winddirection: Option<f32>,
}

fn current_weather(
    mixer: &DomainMixer,
    request: &ForecastRequest,
    now: Timestamp,
    ctx: &QueryContext,
) -> Result<CurrentWeather, QueryError> {
    let hour = now.floor(3600);
    let range = TimerangeDt::new(hour, hour.add(3600), 3600).expect("aligned by construction");

    let mut fetch = |variable: SurfaceVariable| -> Result<Option<f32>, QueryError> {
        let series = mixer.get(WeatherVariable::Surface(variable), range, ctx)?;
        let (value, _) = request.convert(series.values[0], series.unit);
        Ok(value.is_finite().then_some(value))
    };

    Ok(CurrentWeather {
        time: encode_time(request, hour),
        temperature: fetch(SurfaceVariable::Temperature2m)?,
        windspeed: fetch(SurfaceVariable::WindSpeed10m)?,
        winddirection: fetch(SurfaceVariable::WindDirection10m)?,
    })
}

/// Local-day numbers (days since epoch in the query timezone) touched by an
/// hourly range. The daily value and label arrays are both derived from this
/// span, so they always agree in length.
fn local_day_span(
    range: &TimerangeDt,
    utc_offset_seconds: i64,
) -> std::ops::RangeInclusive<i64> {
    let first = (range.start.0 + utc_offset_seconds).div_euclid(SECONDS_PER_DAY);
    let last =
        (range.end.0 - range.dt_seconds + utc_offset_seconds).div_euclid(SECONDS_PER_DAY);
    first..=last
}

/// Reduce an hourly series into per-local-day aggregates.
///
/// Each bucket covers one calendar day in the query timezone; steps are
/// assigned to the day containing their instant, so sub-hour offsets stay on
/// true local-midnight boundaries even though the hourly window is rounded
/// outward to whole hours. Missing hours are skipped; a day with no data
/// aggregates to NaN.
fn aggregate_daily(
    aggregate: DailyAggregate,
    hourly: &[f32],
    range: &TimerangeDt,
    utc_offset_seconds: i64,
) -> Vec<f32> {
    let dt = range.dt_seconds;
    let step_at_or_after = |instant: i64| -> usize {
        let steps = (instant - range.start.0 + dt - 1).div_euclid(dt);
        steps.clamp(0, hourly.len() as i64) as usize
    };

    local_day_span(range, utc_offset_seconds)
        .map(|day| {
            let day_start = day * SECONDS_PER_DAY - utc_offset_seconds;
            let lo = step_at_or_after(day_start);
            let hi = step_at_or_after(day_start + SECONDS_PER_DAY);
            let finite = hourly[lo..hi].iter().copied().filter(|v| v.is_finite());
            match aggregate {
                DailyAggregate::Temperature2mMax => finite.fold(f32::NAN, f32::max),
                DailyAggregate::Temperature2mMin => finite.fold(f32::NAN, f32::min),
                DailyAggregate::PrecipitationSum => {
                    let mut any = false;
                    let sum = finite.inspect(|_| any = true).sum::<f32>();
                    if any {
                        sum
                    } else {
                        f32::NAN
                    }
                }
            }
        })
        .collect()
}

/// Render one instant in the requested time format, localized to the query
/// timezone.
fn encode_time(request: &ForecastRequest, t: Timestamp) -> serde_json::Value {
    match request.timeformat {
        TimeFormat::Unixtime => json!(t.0),
        TimeFormat::Iso8601 => {
            let local = Timestamp(t.0 + request.utc_offset_seconds).datetime();
            json!(local.format("%Y-%m-%dT%H:%M").to_string())
        }
    }
}

fn encode_json(
    request: &ForecastRequest,
    grid_elevation: f32,
    hourly: &[(String, Vec<f32>, Unit)],
    daily: &[(&'static str, Vec<f32>, Unit)],
    current_weather: Option<CurrentWeather>,
) -> String {
    let mut root = serde_json::Map::new();
    root.insert("latitude".to_string(), json!(request.latitude));
    root.insert("longitude".to_string(), json!(request.longitude));
    root.insert("elevation".to_string(), json!(grid_elevation));
    root.insert(
        "utc_offset_seconds".to_string(),
        json!(request.utc_offset_seconds),
    );

    if !hourly.is_empty() {
        let mut block = serde_json::Map::new();
        let mut units = serde_json::Map::new();
        let times: Vec<_> = request.range.iter().map(|t| encode_time(request, t)).collect();
        block.insert("time".to_string(), json!(times));
        for (name, values, unit) in hourly {
            block.insert(name.clone(), json!(values));
            units.insert(name.clone(), json!(unit.symbol()));
        }
        root.insert("hourly".to_string(), block.into());
        root.insert("hourly_units".to_string(), units.into());
    }

    if !daily.is_empty() {
        let mut block = serde_json::Map::new();
        let mut units = serde_json::Map::new();
        let dates: Vec<_> = local_day_span(&request.range, request.utc_offset_seconds)
            .map(|day| {
                let date = Timestamp(day * SECONDS_PER_DAY).datetime();
                json!(date.format("%Y-%m-%d").to_string())
            })
            .collect();
        block.insert("time".to_string(), json!(dates));
        for (name, values, unit) in daily {
            block.insert(name.to_string(), json!(values));
            units.insert(name.to_string(), json!(unit.symbol()));
        }
        root.insert("daily".to_string(), block.into());
        root.insert("daily_units".to_string(), units.into());
    }

    if let Some(current) = current_weather {
        root.insert(
            "current_weather".to_string(),
            serde_json::to_value(current).unwrap_or_default(),
        );
    }

    serde_json::Value::Object(root).to_string()
}

fn encode_csv(request: &ForecastRequest, hourly: &[(String, Vec<f32>, Unit)]) -> String {
    let mut out = String::from("time");
    for (name, _, unit) in hourly {
        out.push(',');
        out.push_str(name);
        if *unit != Unit::Dimensionless {
            out.push_str(&format!(" ({})", unit.symbol()));
        }
    }
    out.push('\n');

    for (i, t) in request.range.iter().enumerate() {
        match encode_time(request, t) {
            serde_json::Value::String(s) => out.push_str(&s),
            value => out.push_str(&value.to_string()),
        }
        for (_, values, _) in hourly {
            out.push(',');
            if values[i].is_finite() {
                out.push_str(&format!("{}", values[i]));
            }
        }
        out.push('\n');
    }
    out
}

#[derive(Debug, Serialize)]
struct ApiError {
    error: bool,
    reason: String,
}

fn error_response(status: StatusCode, reason: String) -> Response {
    let body = serde_json::to_string(&ApiError {
        error: true,
        reason,
    })
    .unwrap_or_default();
    json_response(status, body)
}

fn json_response(status: StatusCode, body: String) -> Response {
    Response::builder()
        .status(status)
        .header(header::CONTENT_TYPE, "application/json")
        .body(body.into())
        .unwrap()
}

fn query_error_response(e: QueryError) -> Response {
    let status = match &e {
        QueryError::GridMiss { .. } | QueryError::UpsamplingForbidden { .. } => {
            StatusCode::BAD_REQUEST
        }
        QueryError::Cancelled => StatusCode::SERVICE_UNAVAILABLE,
        QueryError::UnitMismatch { .. } | QueryError::Store(_) | QueryError::Time(_) => {
            StatusCode::INTERNAL_SERVER_ERROR
        }
    };
    let reason = match &e {
        QueryError::GridMiss { .. } => "no data available for this location".to_string(),
        other => other.to_string(),
    };
    warn!(error = %e, "forecast query failed");
    error_response(status, reason)
}
