use axum::{
    extract::{Request, State},
    http::{HeaderMap, header::AUTHORIZATION},
    middleware::Next,
    response::Response,
};
use tower_cookies::Cookies;

use crate::{
    auth,
    model::{CrudRepository, ResourceTyped, entity::UserEntity},
    web::{AppState, RequestContext, context::AuthenticatedUser, error::WebError},
};

pub static AUTH_TOKEN: &str = "SID";
pub static REFRESH_TOKEN: &str = "RID";

const BEARER_SOURCE: &str = "Authorization";

/// Pulls the access token from `Authorization: Bearer`, falling back to the `SID` cookie.
fn find_token(headers: &HeaderMap, cookies: &Cookies) -> Option<(&'static str, String)> {
    let bearer = headers
        .get(AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .map(str::trim)
        .filter(|t| !t.is_empty());

    match bearer {
        Some(token) => Some((BEARER_SOURCE, token.to_string())),
        None => cookies
            .get(AUTH_TOKEN)
            .map(|c| (AUTH_TOKEN, c.value().to_string())),
    }
}

pub async fn extract_context_fn(
    State(state): State<AppState>,
    cookies: Cookies,
    mut req: Request,
    next: Next,
) -> Result<Response, WebError> {
    let (source, token) = match find_token(req.headers(), &cookies) {
        Some(found) => found,
        None => {
            req.extensions_mut().insert(RequestContext::new(None));
            return Ok(next.run(req).await);
        }
    };

    let claims = auth::process_token(&token, state.config().app().jwt())
        .map_err(|e| WebError::auth_token_invalid(source, e))?;

    let id = claims.claims.user_id().ok_or_else(|| {
        WebError::auth_token_invalid(
            source,
            jsonwebtoken::errors::ErrorKind::InvalidSubject.into(),
        )
    })?;

    let user = UserEntity::find_by_id(state.pool(), &AuthenticatedUser::admin(), id)
        .await
        .map_err(|e| WebError::resource_fetch_error(UserEntity::get_resource_type(), e))?;

    // A token of a deleted account is treated as anonymous.
    let ctx = user.map(|user| AuthenticatedUser::new(id, user.role()));
    req.extensions_mut().insert(RequestContext::new(ctx));

    Ok(next.run(req).await)
}
