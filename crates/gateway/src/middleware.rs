//! Principal extraction and other cross-cutting concerns.
//!
//! There is no account system behind this service; upstream infrastructure
//! authenticates callers and forwards the caller's identity. HTTP clients
//! send it in `x-principal-id` / `x-principal-name` headers, WebSocket
//! clients (which cannot set headers from browsers) in `principal_id` /
//! `principal_name` query parameters.

use axum::{
    async_trait,
    extract::{FromRequestParts, Request},
    http::request::Parts,
    middleware::Next,
    response::IntoResponse,
};
use harvestchat_messaging::Principal;

use crate::error::GatewayError;

const PRINCIPAL_ID_HEADER: &str = "x-principal-id";
const PRINCIPAL_NAME_HEADER: &str = "x-principal-name";

/// The caller's identity, required by every chat endpoint.
pub struct AuthenticatedPrincipal(pub Principal);

#[async_trait]
impl<S> FromRequestParts<S> for AuthenticatedPrincipal
where
    S: Send + Sync,
{
    type Rejection = GatewayError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let id = header_value(parts, PRINCIPAL_ID_HEADER)
            .or_else(|| query_param(parts.uri.query().unwrap_or(""), "principal_id"))
            .ok_or_else(|| {
                GatewayError::AuthenticationFailed("Missing principal id".to_string())
            })?;
        let id: i64 = id.parse().map_err(|_| {
            GatewayError::AuthenticationFailed(format!("Malformed principal id: {id}"))
        })?;

        let username = header_value(parts, PRINCIPAL_NAME_HEADER)
            .or_else(|| query_param(parts.uri.query().unwrap_or(""), "principal_name"))
            .ok_or_else(|| {
                GatewayError::AuthenticationFailed("Missing principal name".to_string())
            })?;

        Ok(AuthenticatedPrincipal(Principal::new(id, username)))
    }
}

fn header_value(parts: &Parts, name: &str) -> Option<String> {
    parts
        .headers
        .get(name)
        .and_then(|value| value.to_str().ok())
        .map(str::to_owned)
}

fn query_param(query: &str, key: &str) -> Option<String> {
    query.split('&').find_map(|pair| {
        let mut parts = pair.splitn(2, '=');
        match (parts.next(), parts.next()) {
            (Some(k), Some(value)) if k == key => {
                urlencoding::decode(value).ok().map(|v| v.into_owned())
            }
            _ => None,
        }
    })
}

/// Logging middleware for request/response logging
pub async fn logging_middleware(request: Request, next: Next) -> impl IntoResponse {
    let method = request.method().clone();
    let uri = request.uri().clone();

    let start = std::time::Instant::now();
    let response = next.run(request).await;
    let duration = start.elapsed();

    tracing::info!(
        method = %method,
        uri = %uri,
        status = %response.status(),
        duration_ms = duration.as_millis(),
        "Request completed"
    );

    response
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn query_param_finds_the_named_pair() {
        let query = "principal_id=42&principal_name=amina%20k";
        assert_eq!(query_param(query, "principal_id").as_deref(), Some("42"));
        assert_eq!(
            query_param(query, "principal_name").as_deref(),
            Some("amina k")
        );
        assert_eq!(query_param(query, "token"), None);
    }

    #[test]
    fn query_param_ignores_valueless_pairs() {
        assert_eq!(query_param("principal_id", "principal_id"), None);
        assert_eq!(query_param("", "principal_id"), None);
    }
}
