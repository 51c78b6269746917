use regex::Regex;
use std::sync::OnceLock;

static LOGIN_URL_RE: OnceLock<Regex> = OnceLock::new();

/// Find the bare `http://host:port/` login helper URL embedded in a client
/// error message. Anything after the port is deliberately not captured; the
/// helper's root page is the redirect target.
pub fn extract_login_url(message: &str) -> Option<&str> {
    let re = LOGIN_URL_RE
        .get_or_init(|| Regex::new(r"http://[^\s:/]+:\d+/").expect("login URL regex is valid"));
    re.find(message).map(|m| m.as_str())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extracts_bare_host_port_url() {
        let message =
            "not authenticated - sign in at http://192.168.1.2:3001/ap/signin to continue";
        assert_eq!(extract_login_url(message), Some("http://192.168.1.2:3001/"));
    }

    #[test]
    fn test_extracts_hostname_url() {
        let message = "open http://localhost:3001/ in a browser";
        assert_eq!(extract_login_url(message), Some("http://localhost:3001/"));
    }

    #[test]
    fn test_no_url_yields_none() {
        assert_eq!(extract_login_url("connection timed out"), None);
        // https and port-less URLs are not login helper addresses
        assert_eq!(extract_login_url("see https://example.com:443/ for docs"), None);
        assert_eq!(extract_login_url("see http://example.com/ for docs"), None);
    }
}
