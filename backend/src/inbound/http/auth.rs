//! Bearer credential extraction and identity resolution.
//!
//! The extractors only pull the raw token out of the `Authorization` header;
//! verification happens against the `Authenticator` port so handlers stay
//! free of JWT details.

use actix_web::dev::Payload;
use actix_web::http::header;
use actix_web::{FromRequest, HttpRequest};
use futures_util::future::{Ready, ready};
use tracing::debug;

use crate::domain::{Error, UserId};

use super::ApiResult;
use super::state::HttpState;

fn bearer_from(req: &HttpRequest) -> Option<String> {
    let value = req.headers().get(header::AUTHORIZATION)?.to_str().ok()?;
    let token = value.strip_prefix("Bearer ")?.trim();
    if token.is_empty() {
        None
    } else {
        Some(token.to_owned())
    }
}

/// A bearer token that must be present; extraction fails with 401 otherwise.
#[derive(Debug, Clone)]
pub struct BearerToken(pub String);

impl FromRequest for BearerToken {
    type Error = Error;
    type Future = Ready<Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, _payload: &mut Payload) -> Self::Future {
        ready(
            bearer_from(req)
                .map(Self)
                .ok_or_else(|| Error::unauthorized("missing bearer token")),
        )
    }
}

/// A bearer token that may be absent; extraction never fails.
#[derive(Debug, Clone, Default)]
pub struct MaybeBearerToken(pub Option<String>);

impl FromRequest for MaybeBearerToken {
    type Error = Error;
    type Future = Ready<Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, _payload: &mut Payload) -> Self::Future {
        ready(Ok(Self(bearer_from(req))))
    }
}

/// Resolve a mandatory caller identity; a rejected token is a 401.
pub async fn require_user(state: &HttpState, token: &BearerToken) -> ApiResult<UserId> {
    state
        .authenticator
        .authenticate(&token.0)
        .await
        .map_err(|err| Error::unauthorized(err.to_string()))
}

/// Resolve an optional caller identity. A missing or rejected token degrades
/// to an anonymous caller instead of failing the request.
pub async fn optional_user(state: &HttpState, token: &MaybeBearerToken) -> Option<UserId> {
    let raw = token.0.as_deref()?;
    match state.authenticator.authenticate(raw).await {
        Ok(user) => Some(user),
        Err(err) => {
            debug!(error = %err, "ignoring invalid bearer token on optional endpoint");
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use actix_web::test::TestRequest;
    use rstest::rstest;

    use super::*;

    #[rstest]
    fn well_formed_header_yields_the_token() {
        let req = TestRequest::get()
            .insert_header((header::AUTHORIZATION, "Bearer abc.def.ghi"))
            .to_http_request();
        assert_eq!(bearer_from(&req).as_deref(), Some("abc.def.ghi"));
    }

    #[rstest]
    #[case::missing(None)]
    #[case::wrong_scheme(Some("Basic dXNlcjpwYXNz"))]
    #[case::empty_token(Some("Bearer    "))]
    fn degenerate_headers_yield_nothing(#[case] header_value: Option<&str>) {
        let mut req = TestRequest::get();
        if let Some(value) = header_value {
            req = req.insert_header((header::AUTHORIZATION, value));
        }
        assert_eq!(bearer_from(&req.to_http_request()), None);
    }
}
