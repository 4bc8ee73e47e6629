use crate::web::{AppState, doc::ApiDoc};
use axum::Router;
use serde::Deserialize;
use tower_cookies::CookieManagerLayer;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

pub mod auth;
pub mod cache;
pub mod learning;
pub mod market;
pub mod quiz;
pub mod trading;
pub mod watchlist;

#[derive(Debug, Clone, Deserialize, utoipa::IntoParams)]
pub struct PaginationQuery {
    #[serde(default = "default_limit")]
    pub limit: i64,
    #[serde(default)]
    pub offset: i64,
}

fn default_limit() -> i64 {
    20
}

pub fn build_app<S: Send + Sync + Clone + 'static>(state: AppState) -> Router<S> {
    let docs = state.config().app().docs();

    let mut router = Router::new()
        .nest("/api/auth", auth::routes(state.clone()))
        .nest("/api/cache", cache::routes(state.clone()))
        .nest("/api/v1/learning", learning::routes(state.clone()))
        .nest("/api/v1/quiz", quiz::routes(state.clone()))
        .nest("/api/v1/market", market::routes(state.clone()))
        .nest("/api/v1/trading", trading::routes(state.clone()))
        .nest("/api/v1/watchlist", watchlist::routes(state.clone()))
        .layer(CookieManagerLayer::default())
        .layer(CorsLayer::very_permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(state);

    if docs {
        router = router.merge(
            SwaggerUi::new("/api/v1/docs").url("/api-doc/openapi.json", ApiDoc::openapi()),
        );
    }

    router
}
