//! Request boundary: route table, parameter validation and dispatch.
//!
//! The transport (HTTP on the device, plain calls in tests) turns a request
//! target into an [`ApiRequest`] with [`parse_request`], ships it to the
//! control loop through the [`bridge`], and the control loop answers it with
//! [`dispatch`].  Nothing here touches the telemetry store directly; all
//! state lives in the [`VentilatorService`].
//!
//! | Route                          | Effect                         |
//! |--------------------------------|--------------------------------|
//! | `/set_zero`                    | stop, actuator to rest         |
//! | `/start`                       | restart the breathing cycle    |
//! | `/status`                      | JSON status report             |
//! | `/set_spo2?val=`               | manual mode with given SpO2    |
//! | `/set_auto`                    | sensor mode, drop rate override|
//! | `/set_bpm?password=&bpm=`      | authorized rate override       |
//! | `/clear_bpm`                   | drop rate override             |
//! | `/get_data?duration=`          | CSV export (1h/6h/12h/all)     |

pub mod bridge;
pub mod query;

use log::warn;

use crate::app::commands::{AppCommand, RequestError};
use crate::app::events::AppEvent;
use crate::app::ports::{ActuatorPort, EventSink};
use crate::app::service::VentilatorService;
use crate::datalog::LogWindow;

use query::{query_param, split_uri, Param};

pub const CONTENT_TEXT: &str = "text/plain";
pub const CONTENT_JSON: &str = "application/json";
pub const CONTENT_CSV: &str = "text/csv";

/// Every routed path, for transports that register handlers per path.
pub const ROUTES: [&str; 8] = [
    "/set_zero",
    "/start",
    "/status",
    "/set_spo2",
    "/set_auto",
    "/set_bpm",
    "/clear_bpm",
    "/get_data",
];

/// A routed request with its raw (decoded, not yet validated) parameters.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ApiRequest {
    SetZero,
    Start,
    Status,
    SetSpo2 { val: Option<Param> },
    SetAuto,
    SetBpm { password: Option<Param>, bpm: Option<Param> },
    ClearBpm,
    GetData { duration: Option<Param> },
}

impl ApiRequest {
    /// Route path, for logging.
    pub fn path(&self) -> &'static str {
        match self {
            Self::SetZero => "/set_zero",
            Self::Start => "/start",
            Self::Status => "/status",
            Self::SetSpo2 { .. } => "/set_spo2",
            Self::SetAuto => "/set_auto",
            Self::SetBpm { .. } => "/set_bpm",
            Self::ClearBpm => "/clear_bpm",
            Self::GetData { .. } => "/get_data",
        }
    }
}

/// Route a request target such as `/set_bpm?password=x&bpm=25`.
pub fn parse_request(uri: &str) -> Result<ApiRequest, RequestError> {
    let (path, query) = split_uri(uri);
    let request = match path {
        "/set_zero" => ApiRequest::SetZero,
        "/start" => ApiRequest::Start,
        "/status" => ApiRequest::Status,
        "/set_spo2" => ApiRequest::SetSpo2 {
            val: query_param(query, "val")?,
        },
        "/set_auto" => ApiRequest::SetAuto,
        "/set_bpm" => ApiRequest::SetBpm {
            password: query_param(query, "password")?,
            bpm: query_param(query, "bpm")?,
        },
        "/clear_bpm" => ApiRequest::ClearBpm,
        "/get_data" => ApiRequest::GetData {
            duration: query_param(query, "duration")?,
        },
        _ => return Err(RequestError::NotFound),
    };
    Ok(request)
}

/// What the transport writes back.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApiResponse {
    pub status: u16,
    pub content_type: &'static str,
    pub body: String,
}

impl ApiResponse {
    pub fn ok_text(body: impl Into<String>) -> Self {
        Self {
            status: 200,
            content_type: CONTENT_TEXT,
            body: body.into(),
        }
    }

    pub fn ok_json(body: String) -> Self {
        Self {
            status: 200,
            content_type: CONTENT_JSON,
            body,
        }
    }

    pub fn ok_csv(body: String) -> Self {
        Self {
            status: 200,
            content_type: CONTENT_CSV,
            body,
        }
    }

    pub fn from_error(error: RequestError) -> Self {
        Self {
            status: error.status(),
            content_type: CONTENT_TEXT,
            body: error.to_string(),
        }
    }

    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

impl From<RequestError> for ApiResponse {
    fn from(error: RequestError) -> Self {
        Self::from_error(error)
    }
}

/// Answer a routed request against the service.  Runs in the control-loop
/// context, between ticks.
pub fn dispatch(
    service: &mut VentilatorService,
    request: &ApiRequest,
    now_ms: u32,
    hw: &mut impl ActuatorPort,
    sink: &mut impl EventSink,
) -> ApiResponse {
    let command = match request {
        ApiRequest::Status => return ApiResponse::ok_json(service.status().to_json()),
        ApiRequest::GetData { duration } => {
            return match export_window(duration.as_deref()) {
                Ok(window) => ApiResponse::ok_csv(service.export_log(window, now_ms)),
                Err(e) => reject(request, e, sink),
            };
        }
        ApiRequest::SetZero => AppCommand::Stop,
        ApiRequest::Start => AppCommand::Start,
        ApiRequest::SetAuto => AppCommand::SetAuto,
        ApiRequest::ClearBpm => AppCommand::ClearRateOverride,
        ApiRequest::SetSpo2 { val } => match number(val.as_deref()) {
            Ok(value) => AppCommand::SetManualSpo2(value),
            Err(e) => return reject(request, e, sink),
        },
        ApiRequest::SetBpm { password, bpm } => match (password, bpm) {
            (Some(password), Some(bpm)) => AppCommand::SetRateOverride {
                credential: password.as_str(),
                // Unparseable rates fall through to the range check, which
                // runs after the credential.
                bpm: bpm.trim().parse().unwrap_or(f32::NAN),
            },
            _ => return reject(request, RequestError::MissingParameter, sink),
        },
    };

    match service.handle_command(command, hw, sink) {
        Ok(reply) => ApiResponse::ok_text(reply.to_string()),
        Err(e) => ApiResponse::from_error(e),
    }
}

/// Emit the rejection for errors caught before reaching the service.
fn reject(request: &ApiRequest, error: RequestError, sink: &mut impl EventSink) -> ApiResponse {
    warn!("{} rejected: {error}", request.path());
    sink.emit(&AppEvent::RequestRejected(error));
    ApiResponse::from_error(error)
}

fn number(raw: Option<&str>) -> Result<f32, RequestError> {
    let raw = raw.ok_or(RequestError::MissingParameter)?;
    raw.trim().parse().map_err(|_| RequestError::InvalidValue)
}

fn export_window(raw: Option<&str>) -> Result<LogWindow, RequestError> {
    let raw = raw.ok_or(RequestError::MissingDuration)?;
    LogWindow::parse(raw).ok_or(RequestError::UnknownDuration)
}
