//! Authenticated-user extraction.
//!
//! Login and logout live in the identity provider fronting the
//! application; by the time a request reaches the kernel, the trusted
//! reverse proxy has placed the authenticated username in a header. The
//! extractor resolves it to a profile, provisioning one on first sight.

use axum::extract::FromRequestParts;
use axum::http::request::Parts;

use crate::error::AppError;
use crate::models::Profile;
use crate::state::AppState;

/// The authenticated user's profile, extracted per request.
#[derive(Debug, Clone)]
pub struct CurrentUser(pub Profile);

impl FromRequestParts<AppState> for CurrentUser {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let header = &state.config().auth_user_header;

        let username = parts
            .headers
            .get(header.as_str())
            .and_then(|value| value.to_str().ok())
            .map(str::trim)
            .filter(|value| !value.is_empty())
            .ok_or(AppError::Unauthorized)?;

        let profile = Profile::get_or_provision(state.db(), username).await?;
        Ok(CurrentUser(profile))
    }
}
