use regex::Regex;
use serde_json::Value;
use std::sync::OnceLock;

use super::AlexaError;

static CSRF_PAIR_RE: OnceLock<Regex> = OnceLock::new();

fn csrf_pair_re() -> &'static Regex {
    CSRF_PAIR_RE.get_or_init(|| Regex::new(r"csrf=([^;\s]+)").expect("csrf regex is valid"))
}

/// Credential material extracted from the persisted cookie blob.
///
/// The blob is either a bare cookie string or an object carrying at least a
/// `cookie` field and usually a `csrf` field. The CSRF token may also be
/// embedded in the cookie string itself as a `csrf=<value>` pair.
#[derive(Debug, Clone)]
pub struct Credentials {
    pub cookie: String,
    pub csrf: Option<String>,
}

impl Credentials {
    pub fn from_blob(blob: &Value) -> Result<Self, AlexaError> {
        match blob {
            Value::String(cookie) => Ok(Self {
                cookie: cookie.clone(),
                csrf: csrf_from_cookie(cookie),
            }),
            Value::Object(map) => {
                let cookie = map
                    .get("cookie")
                    .and_then(Value::as_str)
                    .ok_or_else(|| {
                        AlexaError::InvalidResponse(
                            "cookie blob object has no 'cookie' string field".to_string(),
                        )
                    })?
                    .to_string();
                let csrf = match map.get("csrf") {
                    Some(Value::String(s)) => Some(s.clone()),
                    Some(Value::Number(n)) => Some(n.to_string()),
                    _ => csrf_from_cookie(&cookie),
                };
                Ok(Self { cookie, csrf })
            }
            _ => Err(AlexaError::InvalidResponse(
                "cookie blob is neither a string nor an object".to_string(),
            )),
        }
    }
}

fn csrf_from_cookie(cookie: &str) -> Option<String> {
    csrf_pair_re()
        .captures(cookie)
        .map(|caps| caps[1].to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_string_blob_with_embedded_csrf() {
        let blob = json!("session-id=147; ubid-main=131; csrf=1234567890; x-main=abc");
        let creds = Credentials::from_blob(&blob).expect("Failed to parse string blob");
        assert!(creds.cookie.starts_with("session-id=147"));
        assert_eq!(creds.csrf.as_deref(), Some("1234567890"));
    }

    #[test]
    fn test_object_blob_with_csrf_field() {
        let blob = json!({"cookie": "session-id=147; x-main=abc", "csrf": "-77721234"});
        let creds = Credentials::from_blob(&blob).expect("Failed to parse object blob");
        assert_eq!(creds.cookie, "session-id=147; x-main=abc");
        assert_eq!(creds.csrf.as_deref(), Some("-77721234"));
    }

    #[test]
    fn test_object_blob_numeric_csrf() {
        let blob = json!({"cookie": "session-id=147", "csrf": 987654321});
        let creds = Credentials::from_blob(&blob).expect("Failed to parse object blob");
        assert_eq!(creds.csrf.as_deref(), Some("987654321"));
    }

    #[test]
    fn test_object_blob_falls_back_to_cookie_pair() {
        let blob = json!({"cookie": "session-id=147; csrf=42"});
        let creds = Credentials::from_blob(&blob).expect("Failed to parse object blob");
        assert_eq!(creds.csrf.as_deref(), Some("42"));
    }

    #[test]
    fn test_blob_without_csrf() {
        let blob = json!("session-id=147; x-main=abc");
        let creds = Credentials::from_blob(&blob).expect("Failed to parse string blob");
        assert!(creds.csrf.is_none());
    }

    #[test]
    fn test_invalid_blob_shapes_rejected() {
        assert!(Credentials::from_blob(&json!(42)).is_err());
        assert!(Credentials::from_blob(&json!({"csrf": "1"})).is_err());
    }
}
