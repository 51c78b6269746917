//! Route definitions and handlers.
//!
//! Handlers snapshot the current client from the session manager and
//! forward; they do not validate command names or payloads beyond JSON
//! shape. Client errors come back as a JSON body with an HTTP status of
//! 400 for caller mistakes and 500 for everything else.

use std::sync::Arc;

use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Redirect, Response},
    routing::{delete, get, post},
    Json, Router,
};
use serde::Deserialize;
use serde_json::{json, Value};
use tower_http::trace::TraceLayer;
use tracing::error;

use crate::alexa::AlexaError;
use crate::session::SessionManager;
use crate::utils::url::extract_login_url;

pub type BridgeState = Arc<SessionManager>;

/// Create the router with all endpoints
pub fn create_router(state: BridgeState) -> Router {
    Router::new()
        .route("/", get(status))
        .route("/reconnect", get(reconnect))
        .route("/clearCookies", delete(clear_cookies))
        .route("/names", get(names))
        .route("/getAuthenticationDetails", get(get_authentication_details))
        .route("/checkAuthentication", get(check_authentication))
        .route("/getUsersMe", get(get_users_me))
        .route("/getHousehold", get(get_household))
        .route("/getDevices", get(get_devices))
        .route("/getSmarthomeDevices", get(get_smarthome_devices))
        .route("/getMusicProviders", get(get_music_providers))
        .route("/sendCommand", post(send_command))
        .route("/speak", post(speak))
        .route("/playMusicProvider", post(play_music_provider))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Client error translated to an HTTP response
struct ApiFailure(AlexaError);

impl From<AlexaError> for ApiFailure {
    fn from(err: AlexaError) -> Self {
        Self(err)
    }
}

impl IntoResponse for ApiFailure {
    fn into_response(self) -> Response {
        let status = if self.0.is_caller_error() {
            StatusCode::BAD_REQUEST
        } else {
            StatusCode::INTERNAL_SERVER_ERROR
        };
        let body = json!({
            "error": self.0.kind(),
            "message": self.0.to_string(),
            "code": status.as_u16(),
        });
        (status, Json(body)).into_response()
    }
}

// ============================================================================
// Request bodies
// ============================================================================

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SendCommandRequest {
    serial_or_name: String,
    command: String,
    #[serde(default)]
    value: Value,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SpeakRequest {
    serial_or_name: String,
    text: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PlayMusicProviderRequest {
    serial_or_name: String,
    provider_id: String,
    search_phrase: String,
}

// ============================================================================
// Connection handlers
// ============================================================================

async fn status(State(state): State<BridgeState>) -> String {
    match state.connected_at() {
        Some(at) => format!("Connected to Alexa since {}", at.to_rfc3339()),
        None => "Not connected. Use /reconnect to sign in and establish a session.".to_string(),
    }
}

/// Rebuild the client from the stored cookie. When the client reports a
/// sign-in is needed, its error text carries the login helper URL; redirect
/// the caller there instead of echoing the error.
async fn reconnect(State(state): State<BridgeState>) -> Response {
    match state.connect().await {
        Ok(()) => "alexa connection was reinitialized".into_response(),
        Err(e) => {
            let message = e.to_string();
            match extract_login_url(&message) {
                Some(url) => Redirect::temporary(url).into_response(),
                None => format!("Error reinitializing: {}", message).into_response(),
            }
        }
    }
}

async fn clear_cookies(State(state): State<BridgeState>) -> Response {
    match state.clear_session_files() {
        Ok(()) => StatusCode::NO_CONTENT.into_response(),
        Err(e) => {
            error!(error = %e, "Failed to clear session files");
            let body = json!({
                "error": "io",
                "message": e.to_string(),
                "code": 500,
            });
            (StatusCode::INTERNAL_SERVER_ERROR, Json(body)).into_response()
        }
    }
}

// ============================================================================
// Query handlers
// ============================================================================

async fn names(State(state): State<BridgeState>) -> Result<Json<Value>, ApiFailure> {
    Ok(Json(state.client()?.names()))
}

async fn get_authentication_details(
    State(state): State<BridgeState>,
) -> Result<Json<Value>, ApiFailure> {
    Ok(Json(state.client()?.authentication_details()))
}

/// Always answers 200; "not connected" and "probe failed" both read as
/// not authenticated.
async fn check_authentication(State(state): State<BridgeState>) -> Json<Value> {
    let authenticated = match state.client() {
        Ok(client) => client.check_authentication().await,
        Err(_) => false,
    };
    Json(json!({ "authenticated": authenticated }))
}

async fn get_users_me(State(state): State<BridgeState>) -> Result<Json<Value>, ApiFailure> {
    Ok(Json(state.client()?.get_users_me().await?))
}

async fn get_household(State(state): State<BridgeState>) -> Result<Json<Value>, ApiFailure> {
    Ok(Json(state.client()?.get_household().await?))
}

async fn get_devices(State(state): State<BridgeState>) -> Result<Json<Value>, ApiFailure> {
    Ok(Json(state.client()?.get_devices().await?))
}

async fn get_smarthome_devices(
    State(state): State<BridgeState>,
) -> Result<Json<Value>, ApiFailure> {
    Ok(Json(state.client()?.get_smarthome_devices().await?))
}

async fn get_music_providers(State(state): State<BridgeState>) -> Result<Json<Value>, ApiFailure> {
    Ok(Json(state.client()?.get_music_providers().await?))
}

// ============================================================================
// Command handlers
// ============================================================================

/// Forwards the command name verbatim; the client's dispatch table is the
/// one place unknown names are rejected.
async fn send_command(
    State(state): State<BridgeState>,
    Json(req): Json<SendCommandRequest>,
) -> Result<StatusCode, ApiFailure> {
    state
        .client()?
        .send_sequence_command(&req.serial_or_name, &req.command, &req.value)
        .await?;
    Ok(StatusCode::OK)
}

async fn speak(
    State(state): State<BridgeState>,
    Json(req): Json<SpeakRequest>,
) -> Result<StatusCode, ApiFailure> {
    state
        .client()?
        .send_sequence_command(&req.serial_or_name, "speak", &Value::String(req.text))
        .await?;
    Ok(StatusCode::OK)
}

async fn play_music_provider(
    State(state): State<BridgeState>,
    Json(req): Json<PlayMusicProviderRequest>,
) -> Result<Json<Value>, ApiFailure> {
    let result = state
        .client()?
        .play_music_provider(&req.serial_or_name, &req.provider_id, &req.search_phrase)
        .await?;
    Ok(Json(result))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_caller_errors_map_to_400() {
        let response = ApiFailure(AlexaError::UnknownCommand("dance".into())).into_response();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);

        let response = ApiFailure(AlexaError::UnknownDevice("Attic".into())).into_response();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[test]
    fn test_other_errors_map_to_500() {
        let response = ApiFailure(AlexaError::NotConnected).into_response();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);

        let response = ApiFailure(AlexaError::Unauthorized).into_response();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[test]
    fn test_send_command_body_is_camel_case() {
        let json = r#"{"serialOrName": "Kitchen", "command": "speak", "value": "Hi"}"#;
        let req: SendCommandRequest = serde_json::from_str(json).expect("Failed to parse body");
        assert_eq!(req.serial_or_name, "Kitchen");
        assert_eq!(req.command, "speak");
        assert_eq!(req.value, json!("Hi"));
    }

    #[test]
    fn test_send_command_value_is_optional() {
        let json = r#"{"serialOrName": "Kitchen", "command": "weather"}"#;
        let req: SendCommandRequest = serde_json::from_str(json).expect("Failed to parse body");
        assert_eq!(req.value, Value::Null);
    }

    #[test]
    fn test_play_music_provider_body() {
        let json = r#"{"serialOrName": "Kitchen", "providerId": "AMAZON_MUSIC", "searchPhrase": "Happy birthday"}"#;
        let req: PlayMusicProviderRequest =
            serde_json::from_str(json).expect("Failed to parse body");
        assert_eq!(req.provider_id, "AMAZON_MUSIC");
        assert_eq!(req.search_phrase, "Happy birthday");
    }
}
