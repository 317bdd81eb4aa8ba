use axum::{body::Body, http::Request, middleware::Next, response::Response};
use pulse_types::CallerIdentity;

/// The caller identity resolved for a request, if any.
#[derive(Clone, Debug, Default)]
pub struct CallerContext(pub Option<CallerIdentity>);

/// Resolves the caller from `Authorization: Bearer <uid>`.
///
/// Tokens are issued by the identity provider in front of this service and
/// the bearer value is the uid itself. A missing or malformed header leaves
/// the caller anonymous; each callable decides whether that is an error.
pub async fn caller_middleware(mut req: Request<Body>, next: Next) -> Response {
    let caller = req
        .headers()
        .get("Authorization")
        .and_then(|val| val.to_str().ok())
        .and_then(|val| val.strip_prefix("Bearer "))
        .map(str::trim)
        .filter(|uid| !uid.is_empty())
        .map(CallerIdentity::new);

    req.extensions_mut().insert(CallerContext(caller));
    next.run(req).await
}
