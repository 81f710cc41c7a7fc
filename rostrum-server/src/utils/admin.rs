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
use rostrum_core::models::{AdminId, ErrorCode};
use uuid::Uuid;

/// An authenticated moderator identity.
///
/// This extractor verifies the JWT token from the request headers and
/// confirms that the holder has moderator privileges. The extracted id is
/// recorded on every decision the moderator takes.
pub struct Admin(pub AdminId);

impl<S> FromRequestParts<S> for Admin
where
    S: Send + Sync,
    JWTVerifier: FromRef<S>,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        // Extract the bearer token
        let header = Option::<TypedHeader<Authorization<Bearer>>>::from_request_parts(parts, state)
            .await
            .unwrap()
            .ok_or(ErrorCode::AuthFailed)?;
        let TypedHeader(auth) = header;

        // Process the claims. According to simple-jwt docs, this will automatically
        // check and verify all the things a responsible implementation should.
        let claims = JWTVerifier::from_ref(state)
            .claims(auth.token())
            .ok_or(ErrorCode::AuthFailed)?;

        if !claims.custom.admin {
            return Err(ApiError::forbidden(ErrorCode::AuthFailed));
        }

        let subject = claims.subject.ok_or(ErrorCode::AuthFailed)?;
        let admin_id = Uuid::try_parse(&subject).map_err(|_| ErrorCode::AuthFailed)?;
        Ok(Self(admin_id.into()))
    }
}
