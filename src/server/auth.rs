use std::sync::Arc;

use axum::{
    body::Body,
    extract::State,
    http::{header, Request, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
    Json,
};
use navtask_kernel::Credentials;
use serde_json::json;
use tracing::warn;

/// Development key accepted outside production.
pub const DEV_API_KEY: &str = "123";

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Role {
    Admin,
    Developer,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Admin => "admin",
            Role::Developer => "developer",
        }
    }
}

/// Role attached to an authenticated request.
#[derive(Clone, Copy, Debug)]
pub struct CallerRole(pub Role);

/// Bearer keys and the role each one grants.
#[derive(Clone, Debug)]
pub struct AuthPolicy {
    keys: Vec<(String, Role)>,
}

impl AuthPolicy {
    pub fn new(admin_key: impl Into<String>, allow_dev_key: bool) -> Self {
        let mut keys = vec![(admin_key.into(), Role::Admin)];
        if allow_dev_key {
            keys.push((DEV_API_KEY.to_string(), Role::Developer));
        }
        Self { keys }
    }

    /// Use `API_KEY` when configured; otherwise generate a random admin key
    /// and log it, since the service would be unusable without one.
    pub fn from_credentials(credentials: &Credentials, allow_dev_key: bool) -> Self {
        let admin_key = match credentials.api_key() {
            Some(key) => key.to_string(),
            None => {
                let generated = uuid::Uuid::new_v4().simple().to_string();
                warn!(
                    api_key = %generated,
                    "API_KEY is not set; generated a random admin key for this process"
                );
                generated
            }
        };
        Self::new(admin_key, allow_dev_key)
    }

    pub fn authenticate(&self, token: &str) -> Option<Role> {
        self.keys
            .iter()
            .find(|(key, _)| key == token)
            .map(|(_, role)| *role)
    }
}

pub async fn require_auth(
    State(policy): State<Arc<AuthPolicy>>,
    mut req: Request<Body>,
    next: Next,
) -> Result<Response, Response> {
    let Some(token) = extract_token(&req) else {
        warn!(path = %req.uri().path(), "request without API key");
        return Err(unauthorized("missing API key"));
    };
    match policy.authenticate(&token) {
        Some(role) => {
            req.extensions_mut().insert(CallerRole(role));
            Ok(next.run(req).await)
        }
        None => {
            let prefix: String = token.chars().take(5).collect();
            warn!(path = %req.uri().path(), key_prefix = %prefix, "invalid API key");
            Err(unauthorized("invalid API key"))
        }
    }
}

fn unauthorized(detail: &str) -> Response {
    (
        StatusCode::UNAUTHORIZED,
        [(header::WWW_AUTHENTICATE, "Bearer")],
        Json(json!({ "detail": detail })),
    )
        .into_response()
}

fn extract_token(req: &Request<Body>) -> Option<String> {
    let raw = req.headers().get(header::AUTHORIZATION)?.to_str().ok()?;
    let token = raw.strip_prefix("Bearer ")?.trim();
    if token.is_empty() {
        None
    } else {
        Some(token.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn keys_map_to_roles() {
        let policy = AuthPolicy::new("admin-secret", true);
        assert_eq!(policy.authenticate("admin-secret"), Some(Role::Admin));
        assert_eq!(policy.authenticate(DEV_API_KEY), Some(Role::Developer));
        assert_eq!(policy.authenticate("nope"), None);
    }

    #[test]
    fn dev_key_is_refused_in_production() {
        let policy = AuthPolicy::new("admin-secret", false);
        assert_eq!(policy.authenticate(DEV_API_KEY), None);
    }

    #[test]
    fn missing_api_key_generates_one() {
        let policy = AuthPolicy::from_credentials(&Credentials::default(), false);
        let (key, role) = &policy.keys[0];
        assert_eq!(*role, Role::Admin);
        assert_eq!(key.len(), 32);
    }

    #[test]
    fn bearer_token_is_extracted() {
        let req = Request::builder()
            .header(header::AUTHORIZATION, "Bearer  abc ")
            .body(Body::empty())
            .unwrap();
        assert_eq!(extract_token(&req).as_deref(), Some("abc"));

        let basic = Request::builder()
            .header(header::AUTHORIZATION, "Basic abc")
            .body(Body::empty())
            .unwrap();
        assert_eq!(extract_token(&basic), None);
    }
}
