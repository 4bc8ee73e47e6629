use utoipa::openapi::security::{ApiKey, ApiKeyValue, Http, HttpAuthScheme, SecurityScheme};
use utoipa::{Modify, OpenApi};

use crate::web::middlewares::AUTH_TOKEN;

pub struct SecurityModifier;

impl Modify for SecurityModifier {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        if let Some(schema) = openapi.components.as_mut() {
            schema.add_security_scheme(
                "cookie",
                SecurityScheme::ApiKey(ApiKey::Cookie(ApiKeyValue::with_description(
                    AUTH_TOKEN,
                    "Access token of the current user",
                ))),
            );
            schema.add_security_scheme(
                "bearer",
                SecurityScheme::Http(
                    Http::builder()
                        .scheme(HttpAuthScheme::Bearer)
                        .bearer_format("JWT")
                        .build(),
                ),
            );
        }
    }
}

#[derive(OpenApi)]
#[openapi(
    paths(
        crate::web::routes::auth::auth_register_handler,
        crate::web::routes::auth::auth_login_handler,
        crate::web::routes::auth::auth_refresh_handler,
        crate::web::routes::auth::auth_logout_handler,
        crate::web::routes::auth::auth_me_handler,
        crate::web::routes::auth::auth_users_handler,
        crate::web::routes::cache::cache_get_handler,
        crate::web::routes::cache::cache_set_handler,
        crate::web::routes::cache::cache_delete_handler,
        crate::web::routes::cache::cache_flush_handler,
        crate::web::routes::learning::learning_courses_handler,
        crate::web::routes::learning::learning_course_handler,
        crate::web::routes::learning::learning_course_create_handler,
        crate::web::routes::learning::learning_course_update_handler,
        crate::web::routes::learning::learning_course_delete_handler,
        crate::web::routes::learning::learning_module_create_handler,
        crate::web::routes::learning::learning_progress_handler,
        crate::web::routes::learning::learning_progress_update_handler,
        crate::web::routes::quiz::quiz_get_handler,
        crate::web::routes::quiz::quiz_submit_handler,
        crate::web::routes::quiz::quiz_best_score_handler,
        crate::web::routes::quiz::quiz_statistics_handler,
        crate::web::routes::quiz::quiz_results_handler,
        crate::web::routes::quiz::quiz_create_handler,
        crate::web::routes::quiz::quiz_question_create_handler,
        crate::web::routes::market::market_quote_handler,
        crate::web::routes::market::market_history_handler,
        crate::web::routes::market::market_search_handler,
        crate::web::routes::trading::trading_portfolio_handler,
        crate::web::routes::trading::trading_positions_handler,
        crate::web::routes::trading::trading_order_handler,
        crate::web::routes::trading::trading_trades_handler,
        crate::web::routes::trading::trading_reset_handler,
        crate::web::routes::watchlist::watchlist_list_handler,
        crate::web::routes::watchlist::watchlist_add_handler,
        crate::web::routes::watchlist::watchlist_remove_handler,
    ),
    modifiers(&SecurityModifier),
    tags(
        (name = "auth", description = "Registration, sessions and users"),
        (name = "cache", description = "Key-value cache"),
        (name = "learning", description = "Courses, modules and progress"),
        (name = "quiz", description = "Quizzes and attempts"),
        (name = "market", description = "Quotes, price history and symbol search"),
        (name = "trading", description = "Paper trading portfolio"),
        (name = "watchlist", description = "Watched symbols"),
    ),
)]
pub struct ApiDoc;

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn every_route_group_is_documented() {
        let doc = ApiDoc::openapi();
        for path in [
            "/api/auth/login",
            "/api/cache/{key}",
            "/api/v1/learning/courses",
            "/api/v1/quiz/{quiz_id}/submit",
            "/api/v1/market/quote/{symbol}",
            "/api/v1/trading/orders",
            "/api/v1/watchlist",
        ] {
            assert!(doc.paths.paths.contains_key(path), "{path} is missing");
        }

        let schemes = doc.components.unwrap().security_schemes;
        assert!(schemes.contains_key("cookie"));
        assert!(schemes.contains_key("bearer"));
    }
}
