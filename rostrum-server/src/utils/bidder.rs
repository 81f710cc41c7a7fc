use super::JWTVerifier;
use crate::ApiError;
use axum::{
    extract::{FromRef, FromRequestParts},
    http::request::Parts,
};
use axum_extra::{
    TypedHeader,
    headers::{Authorization, authorization::Bearer},
};
use rostrum_core::models::{BidderId, ErrorCode};
use uuid::Uuid;

/// An authenticated bidder identity.
///
/// This extractor verifies the JWT token from the request headers and
/// extracts the bidder id (the token subject) plus the optional display
/// name claim. It's used to authenticate and authorize operations specific
/// to a bidder.
pub struct Bidder {
    /// The account the token was issued to
    pub bidder_id: BidderId,
    /// The display name claim, if the token carries one
    pub display_name: Option<String>,
}

impl<S> FromRequestParts<S> for Bidder
where
    S: Send + Sync,
    JWTVerifier: FromRef<S>,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        // Extract the bearer token, rejecting the request if not provided
        let TypedHeader(auth) =
            Option::<TypedHeader<Authorization<Bearer>>>::from_request_parts(parts, state)
                .await
                .unwrap()
                .ok_or(ErrorCode::AuthFailed)?;

        // Extract the claims from the bearer token, rejecting if any errors occur
        let claims = JWTVerifier::from_ref(state)
            .claims(auth.token())
            .ok_or(ErrorCode::AuthFailed)?;

        // Extract the BidderId from the claims, rejecting if the subject cannot be parsed as UUID
        let subject = claims.subject.ok_or(ErrorCode::AuthFailed)?;
        let bidder_id = Uuid::try_parse(&subject).map_err(|_| ErrorCode::AuthFailed)?;
        Ok(Self {
            bidder_id: bidder_id.into(),
            display_name: claims.custom.name,
        })
    }
}
