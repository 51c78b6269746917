//! HTTP client for the Alexa cloud API.
//!
//! The client is built once per session from the persisted cookie blob and
//! verified with a bootstrap call before any request goes through. Every
//! public method maps to one upstream call and returns the raw JSON body;
//! the only state kept between calls is the cached authentication object
//! and the device directory used to resolve command targets.

use std::collections::HashMap;
use std::sync::RwLock;
use std::time::Duration;

use reqwest::{header, Client};
use serde_json::Value;
use tokio::sync::mpsc;
use tracing::{debug, warn};

use crate::config::Config;
use crate::models::{Device, DeviceDirectory, DevicesResponse, WakeWordsResponse};
use crate::session::CredentialUpdate;

use super::commands;
use super::credentials::Credentials;
use super::AlexaError;

/// HTTP request timeout in seconds.
/// 30s allows for slow cloud responses while failing fast enough for good UX.
const REQUEST_TIMEOUT_SECS: u64 = 30;

/// User agent the Alexa app uses; the API rejects generic ones
const USER_AGENT: &str =
    "AppleWebKit PitanguiBridge/2.2.389368.0-[HARDWARE=iPhone10_4][SOFTWARE=ifu14.8][DEVICE=iPhone]";

/// Behaviors node type for music provider playback
const PLAY_SEARCH_PHRASE_TYPE: &str = "Alexa.Music.PlaySearchPhrase";

pub struct AlexaClient {
    http: Client,
    base_url: String,
    locale: String,
    /// Authentication object from the last successful bootstrap call
    auth_details: RwLock<Value>,
    directory: RwLock<DeviceDirectory>,
}

impl AlexaClient {
    /// Build a client from the persisted credential blobs and verify the
    /// session with a bootstrap call.
    ///
    /// Fails without touching the network when no cookie is stored; the
    /// error message names the login helper so `/reconnect` can redirect
    /// the caller there.
    pub async fn connect(
        config: &Config,
        cookie: Option<Value>,
        mac_dms: Option<Value>,
        credential_tx: mpsc::UnboundedSender<CredentialUpdate>,
    ) -> Result<Self, AlexaError> {
        let cookie = cookie.ok_or_else(|| Self::not_authenticated(config))?;
        let creds = Credentials::from_blob(&cookie)?;

        let http = Self::build_http_client(&creds, &config.locale)?;
        let client = Self {
            http,
            base_url: config.alexa_base_url(),
            locale: config.locale.clone(),
            auth_details: RwLock::new(Value::Null),
            directory: RwLock::new(DeviceDirectory::default()),
        };

        let auth = match client.fetch_bootstrap().await {
            Ok(auth) => auth,
            // A rejected cookie means the user has to sign in again
            Err(AlexaError::Unauthorized) => return Err(Self::not_authenticated(config)),
            Err(e) => return Err(e),
        };
        if auth.get("authenticated").and_then(Value::as_bool) != Some(true) {
            return Err(Self::not_authenticated(config));
        }
        *client.auth_details.write().unwrap() = auth;

        client.refresh_directory().await?;

        // Echo the blobs back so the session files stay fresh
        let update = CredentialUpdate { cookie, mac_dms };
        if credential_tx.send(update).is_err() {
            warn!("Credential persistence channel closed, session files not updated");
        }

        Ok(client)
    }

    fn not_authenticated(config: &Config) -> AlexaError {
        AlexaError::NotAuthenticated(format!(
            "no valid session cookie - sign in via the login helper at {}",
            config.login_helper_url()
        ))
    }

    fn build_http_client(creds: &Credentials, locale: &str) -> Result<Client, AlexaError> {
        let mut headers = header::HeaderMap::new();
        headers.insert(
            header::COOKIE,
            header::HeaderValue::from_str(&creds.cookie)
                .map_err(|_| AlexaError::InvalidResponse("cookie contains invalid header characters".to_string()))?,
        );
        if let Some(ref csrf) = creds.csrf {
            headers.insert(
                header::HeaderName::from_static("csrf"),
                header::HeaderValue::from_str(csrf)
                    .map_err(|_| AlexaError::InvalidResponse("csrf token contains invalid header characters".to_string()))?,
            );
        }
        headers.insert(
            header::ACCEPT_LANGUAGE,
            header::HeaderValue::from_str(locale)
                .map_err(|_| AlexaError::InvalidResponse("locale contains invalid header characters".to_string()))?,
        );
        headers.insert(header::USER_AGENT, header::HeaderValue::from_static(USER_AGENT));

        let client = Client::builder()
            .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .default_headers(headers)
            .build()?;
        Ok(client)
    }

    /// Check if response is successful, returning an error with body if not.
    async fn check_response(response: reqwest::Response) -> Result<reqwest::Response, AlexaError> {
        if response.status().is_success() {
            Ok(response)
        } else {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            Err(AlexaError::from_status(status, &body))
        }
    }

    async fn get_value(&self, path: &str) -> Result<Value, AlexaError> {
        let url = format!("{}{}", self.base_url, path);
        debug!(%url, "GET");
        let response = self.http.get(&url).send().await?;
        let response = Self::check_response(response).await?;
        Ok(response.json().await?)
    }

    /// POST a JSON body and parse the response body, which may be empty
    async fn post_value(&self, path: &str, body: &Value) -> Result<Value, AlexaError> {
        let url = format!("{}{}", self.base_url, path);
        debug!(%url, "POST");
        let response = self.http.post(&url).json(body).send().await?;
        let response = Self::check_response(response).await?;
        let text = response.text().await?;
        if text.trim().is_empty() {
            return Ok(Value::Null);
        }
        Ok(serde_json::from_str(&text).unwrap_or(Value::String(text)))
    }

    /// Fetch the bootstrap authentication object
    async fn fetch_bootstrap(&self) -> Result<Value, AlexaError> {
        let body = self.get_value("/api/bootstrap?version=0").await?;
        body.get("authentication")
            .cloned()
            .ok_or_else(|| {
                AlexaError::InvalidResponse("bootstrap response has no authentication object".to_string())
            })
    }

    /// Authentication object from the last successful bootstrap call
    pub fn authentication_details(&self) -> Value {
        self.auth_details.read().unwrap().clone()
    }

    /// Probe the session with a bootstrap call. Any failure reads as "not
    /// authenticated"; a success refreshes the cached details.
    pub async fn check_authentication(&self) -> bool {
        match self.fetch_bootstrap().await {
            Ok(auth) => {
                let authenticated =
                    auth.get("authenticated").and_then(Value::as_bool) == Some(true);
                *self.auth_details.write().unwrap() = auth;
                authenticated
            }
            Err(e) => {
                debug!(error = %e, "Authentication probe failed");
                false
            }
        }
    }

    pub async fn get_users_me(&self) -> Result<Value, AlexaError> {
        self.get_value("/api/users/me").await
    }

    pub async fn get_household(&self) -> Result<Value, AlexaError> {
        self.get_value("/api/household").await
    }

    /// Fetch the device list, refreshing the directory as a side effect
    pub async fn get_devices(&self) -> Result<Value, AlexaError> {
        let raw = self.get_value("/api/devices-v2/device?cached=false").await?;
        if let Err(e) = self.rebuild_directory(&raw).await {
            // Pass-through still succeeds; only command targeting is affected
            warn!(error = %e, "Failed to rebuild device directory");
        }
        Ok(raw)
    }

    /// Smart-home devices from the phoenix endpoint. The interesting part
    /// of the body is a string-encoded JSON field; decode it when present.
    pub async fn get_smarthome_devices(&self) -> Result<Value, AlexaError> {
        let raw = self.get_value("/api/phoenix?includeRelationships=true").await?;
        if let Some(detail) = raw.get("networkDetail").and_then(Value::as_str) {
            if let Ok(decoded) = serde_json::from_str(detail) {
                return Ok(decoded);
            }
            warn!("networkDetail field is not valid JSON, returning raw body");
        }
        Ok(raw)
    }

    pub async fn get_music_providers(&self) -> Result<Value, AlexaError> {
        self.get_value("/api/behaviors/entities?skillId=amzn1.ask.1p.music")
            .await
    }

    /// Dispatch one sequence command to the device resolved from
    /// `serial_or_name`. Unknown commands and devices are rejected here,
    /// not at the route layer.
    pub async fn send_sequence_command(
        &self,
        serial_or_name: &str,
        command: &str,
        value: &Value,
    ) -> Result<(), AlexaError> {
        let (device, all) = self.resolve_device(serial_or_name)?;
        let node = commands::build_start_node(command, value, &device, &all, &self.locale)?;
        let request = commands::preview_request(&commands::build_sequence(node))?;
        self.post_value("/api/behaviors/preview", &request).await?;
        Ok(())
    }

    /// Validate a search phrase against a music provider, then play it as a
    /// sequence command. Returns the upstream response body.
    pub async fn play_music_provider(
        &self,
        serial_or_name: &str,
        provider_id: &str,
        search_phrase: &str,
    ) -> Result<Value, AlexaError> {
        if search_phrase.trim().is_empty() {
            return Err(AlexaError::InvalidRequest(
                "searchPhrase must not be empty".to_string(),
            ));
        }
        let (device, _) = self.resolve_device(serial_or_name)?;

        let payload = serde_json::json!({
            "deviceType": device.device_type,
            "deviceSerialNumber": device.serial_number,
            "customerId": device.device_owner_customer_id.clone().unwrap_or_default(),
            "locale": self.locale,
            "musicProviderId": provider_id,
            "searchPhrase": search_phrase,
        });
        let payload_json = serde_json::to_string(&payload)
            .map_err(|e| AlexaError::InvalidResponse(format!("Failed to encode payload: {}", e)))?;

        let validation = self
            .post_value(
                "/api/behaviors/operation/validate",
                &serde_json::json!({
                    "type": PLAY_SEARCH_PHRASE_TYPE,
                    "operationPayload": payload_json,
                }),
            )
            .await?;

        if validation.get("result").and_then(Value::as_str) != Some("VALID") {
            return Err(AlexaError::InvalidRequest(format!(
                "provider rejected the search phrase: {}",
                validation
            )));
        }

        // The validated payload comes back string-encoded; prefer it over
        // the one we sent
        let validated = validation
            .get("operationPayload")
            .and_then(Value::as_str)
            .and_then(|s| serde_json::from_str(s).ok())
            .unwrap_or(payload);

        let node = serde_json::json!({
            "@type": commands::OPERATION_NODE_TYPE,
            "type": PLAY_SEARCH_PHRASE_TYPE,
            "operationPayload": validated,
        });
        let request = commands::preview_request(&commands::build_sequence(node))?;
        self.post_value("/api/behaviors/preview", &request).await
    }

    /// Name to device map, as served by `/names`
    pub fn names(&self) -> Value {
        Value::Object(self.directory.read().unwrap().names())
    }

    fn resolve_device(&self, serial_or_name: &str) -> Result<(Device, Vec<Device>), AlexaError> {
        let directory = self.directory.read().unwrap();
        match directory.find(serial_or_name) {
            Some(device) => Ok((device.clone(), directory.all().to_vec())),
            None => Err(AlexaError::UnknownDevice(serial_or_name.to_string())),
        }
    }

    /// Fetch the device list and rebuild the directory, failing on an
    /// unparseable list. Used during connect.
    async fn refresh_directory(&self) -> Result<(), AlexaError> {
        let raw = self.get_value("/api/devices-v2/device?cached=false").await?;
        self.rebuild_directory(&raw).await
    }

    async fn rebuild_directory(&self, raw: &Value) -> Result<(), AlexaError> {
        let parsed: DevicesResponse = serde_json::from_value(raw.clone()).map_err(|e| {
            AlexaError::InvalidResponse(format!("Unexpected device list shape: {}", e))
        })?;
        let wake_words = self.fetch_wake_words().await;
        let mut directory = self.directory.write().unwrap();
        directory.rebuild(parsed.devices, &wake_words);
        debug!(devices = directory.all().len(), "Device directory rebuilt");
        Ok(())
    }

    /// Wake words are cosmetic; failures only cost the `wakeWord` field
    async fn fetch_wake_words(&self) -> HashMap<String, String> {
        match self.get_value("/api/wake-word?cached=true").await {
            Ok(raw) => match serde_json::from_value::<WakeWordsResponse>(raw) {
                Ok(parsed) => parsed
                    .wake_words
                    .into_iter()
                    .map(|w| (w.device_serial_number, w.wake_word))
                    .collect(),
                Err(e) => {
                    warn!(error = %e, "Unexpected wake-word response shape");
                    HashMap::new()
                }
            },
            Err(e) => {
                warn!(error = %e, "Failed to fetch wake words");
                HashMap::new()
            }
        }
    }
}
