//! Request ID middleware
//!
//! Every request gets an ID of the form `fingerprint.random`. The
//! fingerprint is a salted hash of the client IP and User-Agent, so
//! requests from the same client correlate across log lines without
//! storing the IP itself; the random part distinguishes individual
//! requests. The ID is injected into a tracing span and echoed back in
//! the `X-Request-ID` response header.

use std::rc::Rc;

use actix_service::{Service, Transform};
use actix_web::{
    Error, HttpMessage,
    dev::{ServiceRequest, ServiceResponse},
    http::header::HeaderValue,
};
use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use futures_util::future::{LocalBoxFuture, Ready, ready};
use once_cell::sync::Lazy;
use rand::RngExt;
use tracing::{Instrument, info_span};
use xxhash_rust::xxh64::Xxh64;

/// Request ID, extractable from request extensions
#[derive(Clone, Debug)]
pub struct RequestId(pub String);

/// Service identity attached to every request span, so each log line
/// inside a request names the emitting service and instance.
#[derive(Clone, Debug, Default)]
pub struct ServiceIdentity {
    pub service: String,
    /// First 8 chars of the instance id (the full id is an operational
    /// detail, the prefix is enough to tell instances apart in logs)
    pub instance: String,
}

impl ServiceIdentity {
    pub fn new(service: impl Into<String>, instance_id: Option<&str>) -> Self {
        Self {
            service: service.into(),
            instance: instance_id
                .map(|id| id.chars().take(8).collect())
                .unwrap_or_default(),
        }
    }
}

/// Per-process fingerprint salt: `LOG_FINGERPRINT_SALT` if set, otherwise
/// random. A fixed salt keeps fingerprints stable across instances.
static FINGERPRINT_SALT: Lazy<String> = Lazy::new(|| {
    std::env::var("LOG_FINGERPRINT_SALT").unwrap_or_else(|_| random_token())
});

fn fingerprint_salt() -> &'static str {
    FINGERPRINT_SALT.as_str()
}

fn random_token() -> String {
    let mut bytes = [0u8; 12];
    rand::rng().fill(&mut bytes);
    URL_SAFE_NO_PAD.encode(bytes)
}

/// Build a request ID from the client address and User-Agent.
pub fn generate_request_id(client_ip: &str, user_agent: &str, salt: &str) -> String {
    let mut hasher = Xxh64::new(0);
    hasher.update(client_ip.as_bytes());
    hasher.update(user_agent.as_bytes());
    hasher.update(salt.as_bytes());
    let fingerprint = URL_SAFE_NO_PAD.encode(hasher.digest().to_be_bytes());
    format!("{}.{}", fingerprint, random_token())
}

/// First `X-Forwarded-For` entry when present, else the peer address.
fn client_ip(req: &ServiceRequest) -> String {
    if let Some(forwarded) = req
        .headers()
        .get("x-forwarded-for")
        .and_then(|value| value.to_str().ok())
        && let Some(first) = forwarded.split(',').next()
    {
        let first = first.trim();
        if !first.is_empty() {
            return first.to_string();
        }
    }
    req.peer_addr()
        .map(|addr| addr.ip().to_string())
        .unwrap_or_default()
}

/// Request ID middleware factory
#[derive(Clone, Default)]
pub struct RequestIdMiddleware {
    identity: ServiceIdentity,
}

impl RequestIdMiddleware {
    pub fn new(identity: ServiceIdentity) -> Self {
        Self { identity }
    }
}

impl<S, B> Transform<S, ServiceRequest> for RequestIdMiddleware
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    B: 'static,
{
    type Response = ServiceResponse<B>;
    type Error = Error;
    type InitError = ();
    type Transform = RequestIdService<S>;
    type Future = Ready<Result<Self::Transform, Self::InitError>>;

    fn new_transform(&self, service: S) -> Self::Future {
        ready(Ok(RequestIdService {
            service: Rc::new(service),
            identity: self.identity.clone(),
        }))
    }
}

pub struct RequestIdService<S> {
    service: Rc<S>,
    identity: ServiceIdentity,
}

impl<S, B> Service<ServiceRequest> for RequestIdService<S>
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    B: 'static,
{
    type Response = ServiceResponse<B>;
    type Error = Error;
    type Future = LocalBoxFuture<'static, Result<Self::Response, Self::Error>>;

    fn poll_ready(
        &self,
        ctx: &mut std::task::Context<'_>,
    ) -> std::task::Poll<Result<(), Self::Error>> {
        self.service.poll_ready(ctx)
    }

    fn call(&self, req: ServiceRequest) -> Self::Future {
        let srv = self.service.clone();

        let user_agent = req
            .headers()
            .get("user-agent")
            .and_then(|value| value.to_str().ok())
            .unwrap_or_default()
            .to_string();
        let request_id = generate_request_id(&client_ip(&req), &user_agent, fingerprint_salt());

        req.extensions_mut().insert(RequestId(request_id.clone()));

        let span = info_span!(
            "request",
            service = %self.identity.service,
            instance = %self.identity.instance,
            request_id = %request_id,
            method = %req.method(),
            path = %req.path(),
        );

        Box::pin(
            async move {
                let mut response = srv.call(req).await?;

                if let Ok(header_value) = HeaderValue::from_str(&request_id) {
                    response.headers_mut().insert(
                        actix_web::http::header::HeaderName::from_static("x-request-id"),
                        header_value,
                    );
                }

                Ok(response)
            }
            .instrument(span),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn same_client_shares_a_fingerprint() {
        let a = generate_request_id("10.0.0.1", "curl/8.0", "salt");
        let b = generate_request_id("10.0.0.1", "curl/8.0", "salt");
        assert_eq!(a.split('.').next(), b.split('.').next());
        // The random halves must differ.
        assert_ne!(a.split('.').nth(1), b.split('.').nth(1));
    }

    #[test]
    fn fingerprint_depends_on_ip_agent_and_salt() {
        let base = generate_request_id("10.0.0.1", "curl/8.0", "salt");
        let fingerprint = |id: &str| id.split('.').next().unwrap().to_string();

        let other_ip = generate_request_id("10.0.0.2", "curl/8.0", "salt");
        let other_agent = generate_request_id("10.0.0.1", "Mozilla/5.0", "salt");
        let other_salt = generate_request_id("10.0.0.1", "curl/8.0", "pepper");

        assert_ne!(fingerprint(&base), fingerprint(&other_ip));
        assert_ne!(fingerprint(&base), fingerprint(&other_agent));
        assert_ne!(fingerprint(&base), fingerprint(&other_salt));
    }

    #[test]
    fn identity_truncates_instance_to_eight_chars() {
        let identity = ServiceIdentity::new("orders", Some("i-0abc1234def5678"));
        assert_eq!(identity.service, "orders");
        assert_eq!(identity.instance, "i-0abc12");

        let bare = ServiceIdentity::new("orders", None);
        assert!(bare.instance.is_empty());
    }

    #[test]
    fn request_id_is_url_safe() {
        let id = generate_request_id("192.168.1.50", "test-agent", "salt");
        assert_eq!(id.matches('.').count(), 1);
        assert!(
            id.chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_' || c == '.')
        );
    }
}
