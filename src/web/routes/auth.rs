use axum::{
    Json, Router,
    body::Bytes,
    extract::{Query, State},
    http::StatusCode,
    middleware,
    response::IntoResponse,
    routing::{get, post},
};
use chrono::{DateTime, Utc};
use tower_cookies::{Cookie, Cookies, cookie::SameSite};
use tracing::info;
use uuid::Uuid;

use crate::{
    Config,
    auth::{self, RefreshClaims, UserClaims, hash_password, verify_password},
    model::{
        CrudRepository, Page, PaginatableRepository, ResourceTyped,
        entity::{RefreshToken, RefreshTokenCreate, UserEntity, UserEntityCreateUpdate},
    },
    web::{
        AppState, AuthenticatedUser, RequestContext, WebError, WebResult,
        dto::auth::{AuthResponse, LoginBody, RefreshBody, RegisterBody},
        error::ErrorResponse,
        middlewares::{self, AUTH_TOKEN, REFRESH_TOKEN},
        routes::PaginationQuery,
    },
};

pub fn routes<S>(state: AppState) -> Router<S> {
    let protected = Router::new()
        .route("/logout", post(auth_logout_handler))
        .route("/me", get(auth_me_handler))
        .route("/users", get(auth_users_handler))
        .route_layer(middleware::from_fn_with_state(
            state.clone(),
            middlewares::extract_context_fn,
        ));

    Router::new()
        .route("/register", post(auth_register_handler))
        .route("/login", post(auth_login_handler))
        .route("/refresh", post(auth_refresh_handler))
        .merge(protected)
        .with_state(state)
}

struct IssuedTokens {
    access: String,
    refresh: String,
    refresh_expires_at: DateTime<Utc>,
}

fn issue_tokens(config: &Config, user_id: Uuid) -> WebResult<IssuedTokens> {
    let app = config.app();

    let access = auth::generate_token(UserClaims::new(user_id, app.access_token_ttl()), app.jwt())
        .map_err(|e| WebError::server_crypt_error(e.into()))?;

    let claims = RefreshClaims::new(user_id, app.refresh_token_ttl());
    let refresh = auth::generate_refresh_token_jwt(&claims, app.refresh_jwt())
        .map_err(|e| WebError::server_crypt_error(e.into()))?;

    Ok(IssuedTokens {
        access,
        refresh,
        refresh_expires_at: Utc::now() + app.refresh_token_ttl(),
    })
}

fn session_cookie(name: &'static str, value: String, ttl: chrono::Duration) -> Cookie<'static> {
    let mut cookie = Cookie::new(name, value);
    cookie.set_same_site(SameSite::Lax);
    cookie.set_http_only(true);
    cookie.set_path("/");
    cookie.set_max_age(tower_cookies::cookie::time::Duration::seconds(
        ttl.num_seconds(),
    ));
    cookie
}

fn set_session_cookies(cookies: &Cookies, config: &Config, tokens: &IssuedTokens) {
    let app = config.app();
    cookies.add(session_cookie(
        AUTH_TOKEN,
        tokens.access.clone(),
        app.access_token_ttl(),
    ));
    cookies.add(session_cookie(
        REFRESH_TOKEN,
        tokens.refresh.clone(),
        app.refresh_token_ttl(),
    ));
}

fn clear_session_cookies(cookies: &Cookies) {
    for name in [AUTH_TOKEN, REFRESH_TOKEN] {
        let mut cookie = Cookie::new(name, "");
        cookie.set_path("/");
        cookies.remove(cookie);
    }
}

/// Replaces every refresh token of `user` with a fresh pair.
async fn start_session(
    state: &AppState,
    cookies: &Cookies,
    user: UserEntity,
) -> WebResult<AuthResponse> {
    let tokens = issue_tokens(state.config(), user.id())?;

    RefreshToken::replace_for_user(
        state.pool(),
        RefreshTokenCreate {
            token: tokens.refresh.clone(),
            user_id: user.id(),
            expires_at: tokens.refresh_expires_at,
        },
    )
    .await
    .map_err(|e| WebError::resource_fetch_error(RefreshToken::get_resource_type(), e))?;

    set_session_cookies(cookies, state.config(), &tokens);

    Ok(AuthResponse {
        user,
        access_token: tokens.access,
        refresh_token: tokens.refresh,
    })
}

#[utoipa::path(
    post,
    path = "/api/auth/register",
    request_body = RegisterBody,
    description = "Creates a user account and signs it in",
    responses(
        (status = 201, description = "User created and signed in", body = AuthResponse),
        (status = 400, description = "Malformed email, empty username or short password", body = ErrorResponse),
        (status = 409, description = "Username or email already taken", body = ErrorResponse),
        (status = 500, description = "Internal server error", body = ErrorResponse),
    ),
    tag = "auth"
)]
async fn auth_register_handler(
    State(state): State<AppState>,
    cookies: Cookies,
    Json(payload): Json<RegisterBody>,
) -> WebResult<impl IntoResponse> {
    if let Some(problem) = payload.problem() {
        return Err(WebError::registration_invalid(problem));
    }

    let admin = AuthenticatedUser::admin();
    let username = payload.username.trim().to_string();
    let email = payload.email.trim().to_lowercase();

    let taken = UserEntity::identity_taken(state.pool(), &admin, &username, &email, None)
        .await
        .map_err(|e| WebError::resource_fetch_error(UserEntity::get_resource_type(), e))?;
    if taken {
        return Err(WebError::registration_conflict());
    }

    let hash = hash_password(&payload.password).map_err(WebError::server_crypt_error)?;
    let data = UserEntityCreateUpdate {
        username,
        email,
        password_hash: hash,
        first_name: payload.first_name,
        last_name: payload.last_name,
    };

    // A concurrent registration can still win the race to the unique index.
    let created = UserEntity::create(state.pool(), &admin, data)
        .await
        .map_err(|e| {
            if e.is_unique_violation() {
                WebError::registration_conflict()
            } else {
                WebError::resource_fetch_error(UserEntity::get_resource_type(), e)
            }
        })?;

    info!(user = %created.id(), "user registered");
    let body = start_session(&state, &cookies, created).await?;
    Ok((StatusCode::CREATED, Json(body)))
}

#[utoipa::path(
    post,
    path = "/api/auth/login",
    request_body = LoginBody,
    description = "Signs in with email and password, revoking older refresh tokens",
    responses(
        (status = 200, description = "Signed in", body = AuthResponse),
        (status = 401, description = "Credentials invalid", body = ErrorResponse),
        (status = 500, description = "Internal server error", body = ErrorResponse),
    ),
    tag = "auth"
)]
async fn auth_login_handler(
    State(state): State<AppState>,
    cookies: Cookies,
    Json(payload): Json<LoginBody>,
) -> WebResult<impl IntoResponse> {
    let admin = AuthenticatedUser::admin();
    let found = UserEntity::find_by_email(state.pool(), &admin, payload.email.trim())
        .await
        .map_err(|e| WebError::resource_fetch_error(UserEntity::get_resource_type(), e))?
        .ok_or_else(WebError::auth_invalid_credentials)?;

    let is_verified =
        verify_password(found.hash(), &payload.password).map_err(WebError::server_crypt_error)?;
    if !is_verified {
        return Err(WebError::auth_invalid_credentials());
    }

    let body = start_session(&state, &cookies, found).await?;
    Ok((StatusCode::OK, Json(body)))
}

#[utoipa::path(
    post,
    path = "/api/auth/refresh",
    request_body(content = RefreshBody, description = "Falls back to the RID cookie when empty"),
    description = "Exchanges a refresh token for a new token pair",
    responses(
        (status = 200, description = "New token pair issued", body = AuthResponse),
        (status = 400, description = "Body is not valid JSON", body = ErrorResponse),
        (status = 401, description = "Refresh token missing, unknown or expired", body = ErrorResponse),
        (status = 500, description = "Internal server error", body = ErrorResponse),
    ),
    tag = "auth"
)]
async fn auth_refresh_handler(
    State(state): State<AppState>,
    cookies: Cookies,
    body: Bytes,
) -> WebResult<impl IntoResponse> {
    let payload: RefreshBody = if body.iter().all(u8::is_ascii_whitespace) {
        RefreshBody::default()
    } else {
        serde_json::from_slice(&body).map_err(|e| WebError::invalid_field("body", e.to_string()))?
    };

    let token = payload
        .refresh_token
        .or_else(|| cookies.get(REFRESH_TOKEN).map(|c| c.value().to_string()))
        .ok_or_else(WebError::auth_refresh_invalid)?;

    let claims = auth::process_refresh_token(&token, state.config().app().refresh_jwt())
        .map_err(|_| WebError::auth_refresh_invalid())?;

    let stored = RefreshToken::find_by_token(state.pool(), &token)
        .await
        .map_err(|e| WebError::resource_fetch_error(RefreshToken::get_resource_type(), e))?
        .ok_or_else(WebError::auth_refresh_invalid)?;

    if stored.is_expired(Utc::now()) || claims.user_id() != Some(stored.user_id()) {
        stored
            .delete(state.pool())
            .await
            .map_err(|e| WebError::resource_fetch_error(RefreshToken::get_resource_type(), e))?;
        return Err(WebError::auth_refresh_invalid());
    }

    let user = UserEntity::find_by_id(state.pool(), &AuthenticatedUser::admin(), stored.user_id())
        .await
        .map_err(|e| WebError::resource_fetch_error(UserEntity::get_resource_type(), e))?
        .ok_or_else(WebError::auth_refresh_invalid)?;

    let tokens = issue_tokens(state.config(), user.id())?;
    stored
        .rotate(
            state.pool(),
            RefreshTokenCreate {
                token: tokens.refresh.clone(),
                user_id: user.id(),
                expires_at: tokens.refresh_expires_at,
            },
        )
        .await
        .map_err(|e| WebError::resource_fetch_error(RefreshToken::get_resource_type(), e))?
        .ok_or_else(WebError::auth_refresh_invalid)?;

    set_session_cookies(&cookies, state.config(), &tokens);

    Ok((
        StatusCode::OK,
        Json(AuthResponse {
            user,
            access_token: tokens.access,
            refresh_token: tokens.refresh,
        }),
    ))
}

#[utoipa::path(
    post,
    path = "/api/auth/logout",
    description = "Revokes every refresh token of the caller and clears the session cookies",
    responses(
        (status = 200, description = "Signed out"),
        (status = 401, description = "You're not authorized", body = ErrorResponse),
        (status = 500, description = "Internal server error", body = ErrorResponse),
    ),
    tag = "auth",
    security(("bearer" = []), ("cookie" = []))
)]
async fn auth_logout_handler(
    ctx: RequestContext,
    State(state): State<AppState>,
    cookies: Cookies,
) -> WebResult<impl IntoResponse> {
    let user = ctx.user()?;

    RefreshToken::delete_for_user(state.pool(), user.user_id())
        .await
        .map_err(|e| WebError::resource_fetch_error(RefreshToken::get_resource_type(), e))?;
    clear_session_cookies(&cookies);

    Ok(StatusCode::OK)
}

#[utoipa::path(
    get,
    path = "/api/auth/me",
    description = "Returns the signed in user",
    responses(
        (status = 200, description = "Current user", body = UserEntity),
        (status = 401, description = "You're not authorized", body = ErrorResponse),
        (status = 500, description = "Internal server error", body = ErrorResponse),
    ),
    tag = "auth",
    security(("bearer" = []), ("cookie" = []))
)]
async fn auth_me_handler(
    ctx: RequestContext,
    State(state): State<AppState>,
) -> WebResult<impl IntoResponse> {
    let user = ctx.user()?;

    let found = UserEntity::find_by_id(state.pool(), user, user.user_id())
        .await
        .map_err(|e| WebError::resource_fetch_error(UserEntity::get_resource_type(), e))?
        .ok_or_else(|| WebError::resource_not_found(UserEntity::get_resource_type()))?;

    Ok((StatusCode::OK, Json(found)))
}

#[utoipa::path(
    get,
    path = "/api/auth/users",
    params(PaginationQuery),
    description = "Lists users page by page",
    responses(
        (status = 200, description = "Returns requested page", body = Page<UserEntity>),
        (status = 401, description = "You're not authorized", body = ErrorResponse),
        (status = 403, description = "You're not an admin", body = ErrorResponse),
        (status = 500, description = "Internal server error", body = ErrorResponse),
    ),
    tag = "auth",
    security(("bearer" = []), ("cookie" = []))
)]
async fn auth_users_handler(
    ctx: RequestContext,
    Query(page): Query<PaginationQuery>,
    State(state): State<AppState>,
) -> WebResult<impl IntoResponse> {
    let user = ctx.admin_user()?;
    let (limit, offset) = Page::<UserEntity>::bounds(page.limit, page.offset);

    let users = UserEntity::page(state.pool(), user, limit, offset)
        .await
        .map_err(|e| WebError::resource_fetch_error(UserEntity::get_resource_type(), e))?;

    Ok((StatusCode::OK, Json(users)))
}
