//! HTTP Handlers
//!
//! Each handler validates its input, calls the gateway core, and wraps the
//! outcome in a `ResultEnvelope`. Validation failures answer 400, internal
//! faults 500, and every other failure 200 with `success: false`.

use axum::{
    body::Bytes,
    extract::{
        rejection::{PathRejection, QueryRejection},
        Path, Query, State,
    },
    http::StatusCode,
    Json,
};
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use tracing::{debug, error};

use crate::bacnet::{flatten_pairs, DeviceInstance, GroupedRequest, ResultEnvelope, WriteDirective};
use crate::error::GatewayError;

use super::protocol::*;
use super::state::AppState;

/// Status code and envelope
pub type ApiResponse = (StatusCode, Json<ResultEnvelope>);

fn success(message: impl Into<String>, data: impl Serialize) -> ApiResponse {
    match serde_json::to_value(data) {
        Ok(data) => (StatusCode::OK, Json(ResultEnvelope::success(message, data))),
        Err(e) => failure(&GatewayError::Internal(format!("failed to encode response: {}", e))),
    }
}

fn failure(error: &GatewayError) -> ApiResponse {
    let status = match error {
        GatewayError::Internal(detail) => {
            error!("Internal error: {}", detail);
            StatusCode::INTERNAL_SERVER_ERROR
        }
        e if e.is_validation() => StatusCode::BAD_REQUEST,
        _ => StatusCode::OK,
    };
    (status, Json(ResultEnvelope::from(error)))
}

fn respond<T>(result: Result<T, GatewayError>, on_success: impl FnOnce(T) -> ApiResponse) -> ApiResponse {
    match result {
        Ok(value) => on_success(value),
        Err(e) => {
            debug!("Request failed: {}", e);
            failure(&e)
        }
    }
}

fn parse_body<T: DeserializeOwned>(body: &Bytes) -> Result<T, GatewayError> {
    serde_json::from_slice(body).map_err(|e| GatewayError::Validation(format!("Invalid request body: {}", e)))
}

fn path_params<T>(path: Result<Path<T>, PathRejection>) -> Result<T, GatewayError> {
    path.map(|Path(params)| params)
        .map_err(|rejection| GatewayError::Validation(format!("Invalid path: {}", rejection.body_text())))
}

fn query_params<T>(query: Result<Query<T>, QueryRejection>) -> Result<T, GatewayError> {
    query
        .map(|Query(params)| params)
        .map_err(|rejection| GatewayError::Validation(format!("Invalid query: {}", rejection.body_text())))
}

/// Health check endpoint
pub async fn health_check(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        version: env!("CARGO_PKG_VERSION"),
        cached_devices: state.service().cache().len(),
    })
}

/// Effective gateway configuration
pub async fn gateway_config(State(state): State<AppState>) -> ApiResponse {
    debug!("config");
    success(
        "Gateway configuration",
        ConfigResult {
            version: env!("CARGO_PKG_VERSION"),
            gateway: state.config(),
        },
    )
}

/// `GET /bacnet/whois/:instance?address=`
pub async fn who_is(
    State(state): State<AppState>,
    path: Result<Path<String>, PathRejection>,
    query: Result<Query<WhoIsQuery>, QueryRejection>,
) -> ApiResponse {
    let result = async {
        let instance = path_params(path)?;
        let query = query_params(query)?;
        debug!("who_is {} address={:?}", instance, query.address);

        let device: DeviceInstance = instance.parse()?;
        let devices = state.service().who_is(device, query.address.as_deref()).await?;
        Ok::<_, GatewayError>((device, devices))
    }
    .await;

    respond(result, |(device, devices)| {
        success(
            "BACnet who-is request successfully invoked",
            WhoIsResult {
                device_instance: i64::from(device.value()),
                devices,
            },
        )
    })
}

/// `GET /bacnet/whois/:start/:end`
pub async fn who_is_range(
    State(state): State<AppState>,
    path: Result<Path<(String, String)>, PathRejection>,
) -> ApiResponse {
    let result = async {
        let (start, end) = path_params(path)?;
        debug!("who_is_range {} {}", start, end);

        let start: DeviceInstance = start.parse()?;
        let end: DeviceInstance = end.parse()?;
        let devices = state.service().who_is_range(start, end).await?;
        Ok::<_, GatewayError>((start, end, devices))
    }
    .await;

    respond(result, |(start, end, devices)| {
        success(
            "BACnet who-is request successfully invoked",
            WhoIsRangeResult {
                start: i64::from(start.value()),
                end: i64::from(end.value()),
                devices,
            },
        )
    })
}

/// `GET /bacnet/read/:instance/:object?property_identifier=`
pub async fn read_property(
    State(state): State<AppState>,
    path: Result<Path<(String, String)>, PathRejection>,
    query: Result<Query<ReadQuery>, QueryRejection>,
) -> ApiResponse {
    let result = async {
        let (instance, object) = path_params(path)?;
        let ReadQuery { property_identifier } = query_params(query)?;
        debug!("read_property {} {} {}", instance, object, property_identifier);

        let device: DeviceInstance = instance.parse()?;
        let value = state.service().read_property(device, &object, &property_identifier).await?;
        Ok::<_, GatewayError>(ReadResult {
            device_instance: i64::from(device.value()),
            object_identifier: object,
            property_identifier,
            read_result: value,
        })
    }
    .await;

    respond(result, |read| success("BACnet read request successfully invoked", read))
}

/// `POST /bacnet/write`
pub async fn write_property(State(state): State<AppState>, body: Bytes) -> ApiResponse {
    let result = async {
        let request: WritePropertyRequest = parse_body(&body)?;
        debug!("write_property {:?}", request);

        let device = DeviceInstance::try_from(request.device_instance)?;
        let directive = WriteDirective::new(
            device,
            &request.object_identifier,
            &request.property_identifier,
            request.value.clone(),
            request.priority,
        )?;
        state.service().write_property(&directive).await?;
        Ok::<_, GatewayError>(request)
    }
    .await;

    respond(result, |request| {
        success(
            "BACnet write request successfully invoked",
            WriteResult {
                device_instance: request.device_instance,
                object_identifier: request.object_identifier,
                property_identifier: request.property_identifier,
                written_value: request.value,
                priority: request.priority,
            },
        )
    })
}

/// `POST /bacnet/read-multiple`
pub async fn read_multiple(State(state): State<AppState>, body: Bytes) -> ApiResponse {
    let result = async {
        let request: ReadMultipleRequest = parse_body(&body)?;
        debug!("read_multiple {:?}", request);

        let device = DeviceInstance::try_from(request.device_instance)?;
        let results: Value = if request.objects.is_empty() {
            let tokens = flatten_pairs(
                request
                    .requests
                    .iter()
                    .map(|pair| (pair.object_identifier.as_str(), pair.property_identifier.as_str())),
            );
            state.service().read_multiple(device, &tokens).await?
        } else {
            let groups: Vec<GroupedRequest<'_>> = request
                .objects
                .iter()
                .map(|object| GroupedRequest {
                    object: &object.object_identifier,
                    properties: &object.properties,
                })
                .collect();
            state.service().read_grouped(device, &groups).await?
        };
        Ok::<_, GatewayError>((device, results))
    }
    .await;

    respond(result, |(device, results)| {
        success(
            "BACnet read-multiple request successfully invoked",
            ReadMultipleResult {
                device_instance: i64::from(device.value()),
                results,
            },
        )
    })
}

/// `GET /bacnet/points/:instance`
pub async fn discover_points(State(state): State<AppState>, path: Result<Path<String>, PathRejection>) -> ApiResponse {
    let result = async {
        let instance = path_params(path)?;
        debug!("discover_points {}", instance);

        let device: DeviceInstance = instance.parse()?;
        let points = state.service().discover_points(device).await?;
        Ok::<_, GatewayError>((device, points))
    }
    .await;

    respond(result, |(device, points)| {
        success(
            format!("Discovered {} points", points.len()),
            PointsResult {
                device_instance: i64::from(device.value()),
                points,
            },
        )
    })
}
