//! Upgrade-time token authentication
//!
//! When a token is configured, the websocket upgrade request must carry it,
//! either as `Authorization: Bearer <token>` or as a `token` query
//! parameter (for browser clients that cannot set headers). The query value
//! is form-decoded, so a token containing `+`, `/` or `=` must be
//! percent-encoded there. Requests without a matching token are answered
//! with 401 and never reach the relay.

use serde::Deserialize;
use tokio_tungstenite::tungstenite::handshake::server::{ErrorResponse, Request, Response};
use tokio_tungstenite::tungstenite::http::{header, StatusCode};

/// Shared-secret check applied to upgrade requests
#[derive(Debug, Clone, Default)]
pub struct TokenAuth {
    token: Option<String>,
}

impl TokenAuth {
    pub fn new(token: Option<String>) -> Self {
        Self { token }
    }

    /// Whether any token is required
    pub fn is_enabled(&self) -> bool {
        self.token.is_some()
    }

    /// Check an upgrade request
    pub fn authorize(&self, request: &Request) -> bool {
        let Some(expected) = self.token.as_deref() else {
            return true;
        };

        let matches = |presented: &str| constant_time_eq(presented.as_bytes(), expected.as_bytes());

        bearer_token(request).is_some_and(matches)
            || query_token(request).is_some_and(|presented| matches(&presented))
    }

    /// Handshake callback for `accept_hdr_async`
    pub fn callback(
        &self,
    ) -> impl FnOnce(&Request, Response) -> Result<Response, ErrorResponse> + Send + Unpin + 'static
    {
        let auth = self.clone();
        move |request: &Request, response: Response| {
            if auth.authorize(request) {
                Ok(response)
            } else {
                let mut rejection = ErrorResponse::new(Some("unauthorized".to_string()));
                *rejection.status_mut() = StatusCode::UNAUTHORIZED;
                Err(rejection)
            }
        }
    }
}

fn bearer_token(request: &Request) -> Option<&str> {
    request
        .headers()
        .get(header::AUTHORIZATION)?
        .to_str()
        .ok()?
        .strip_prefix("Bearer ")
        .map(str::trim)
}

/// Query parameters read from the upgrade URI; others are ignored
#[derive(Debug, Deserialize)]
struct UpgradeQuery {
    token: Option<String>,
}

fn query_token(request: &Request) -> Option<String> {
    let query = request.uri().query()?;
    serde_urlencoded::from_str::<UpgradeQuery>(query)
        .ok()?
        .token
}

fn constant_time_eq(a: &[u8], b: &[u8]) -> bool {
    if a.len() != b.len() {
        return false;
    }
    a.iter().zip(b).fold(0u8, |acc, (x, y)| acc | (x ^ y)) == 0
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request(uri: &str, authorization: Option<&str>) -> Request {
        let mut builder = Request::builder().uri(uri);
        if let Some(value) = authorization {
            builder = builder.header(header::AUTHORIZATION, value);
        }
        builder.body(()).unwrap()
    }

    #[test]
    fn test_disabled_accepts_everything() {
        let auth = TokenAuth::default();
        assert!(!auth.is_enabled());
        assert!(auth.authorize(&request("/ws", None)));
    }

    #[test]
    fn test_bearer_header() {
        let auth = TokenAuth::new(Some("s3cret".into()));

        assert!(auth.authorize(&request("/ws", Some("Bearer s3cret"))));
        assert!(!auth.authorize(&request("/ws", Some("Bearer wrong"))));
        assert!(!auth.authorize(&request("/ws", Some("Basic s3cret"))));
        assert!(!auth.authorize(&request("/ws", None)));
    }

    #[test]
    fn test_query_parameter() {
        let auth = TokenAuth::new(Some("s3cret".into()));

        assert!(auth.authorize(&request("/ws?token=s3cret", None)));
        assert!(auth.authorize(&request("/ws?role=observer&token=s3cret", None)));
        assert!(!auth.authorize(&request("/ws?token=s3cre", None)));
        assert!(!auth.authorize(&request("/ws?tok=s3cret", None)));
    }

    #[test]
    fn test_query_parameter_is_percent_decoded() {
        let auth = TokenAuth::new(Some("a+b/c=".into()));

        assert!(auth.authorize(&request("/ws?token=a%2Bb%2Fc%3D", None)));
        assert!(auth.authorize(&request("/ws", Some("Bearer a+b/c="))));

        // A bare `+` decodes to a space
        assert!(!auth.authorize(&request("/ws?token=a+b/c=", None)));
    }

    #[test]
    fn test_callback_rejects_with_401() {
        let auth = TokenAuth::new(Some("s3cret".into()));
        let callback = auth.callback();

        let rejection = callback(&request("/ws", None), Response::new(())).unwrap_err();
        assert_eq!(rejection.status(), StatusCode::UNAUTHORIZED);
    }
}
