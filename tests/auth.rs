mod common;
use flf::web::middlewares::{AUTH_TOKEN, REFRESH_TOKEN};
use reqwest::StatusCode;
use serde_json::json;
use tower_cookies::cookie::SameSite;

use crate::common::{
    Action, Flow, login_action, login_admin_action, register_action, setup_server, setup_test_db,
};

#[tokio::test]
async fn route_register_test() {
    let pool = setup_test_db().await;
    let mut server = setup_server(&pool).await;

    Flow::new()
        .step(
            register_action("foobar", "foobaz1")
                .assert_cookie(AUTH_TOKEN, |cookie| {
                    assert_eq!(cookie.same_site(), Some(SameSite::Lax));
                    assert_eq!(cookie.path(), Some("/"));
                    assert_eq!(cookie.http_only(), Some(true));
                })
                .assert_cookie(REFRESH_TOKEN, |cookie| {
                    assert_eq!(cookie.http_only(), Some(true));
                })
                .assert_json(|body| {
                    assert_eq!(body["user"]["username"], "foobar");
                    assert_eq!(body["user"]["email"], "foobar@example.com");
                    assert_eq!(body["user"]["role"], "user");
                    assert!(body["user"].get("password_hash").is_none());
                    assert!(body["access_token"].as_str().is_some_and(|t| !t.is_empty()));
                    assert!(body["refresh_token"].as_str().is_some_and(|t| !t.is_empty()));
                }),
        )
        // same username and email again
        .step(register_action("foobar", "foobaz1").with_expect(StatusCode::CONFLICT))
        .step(
            Action::new("register_bad_email", "POST", "/api/auth/register")
                .with_body(json!({
                    "username": "mailless",
                    "email": "not-an-email",
                    "password": "foobaz1",
                }))
                .with_expect(StatusCode::BAD_REQUEST)
                .assert_body(|body| assert!(body.contains("email"))),
        )
        .step(
            Action::new("register_short_password", "POST", "/api/auth/register")
                .with_body(json!({
                    "username": "shorty",
                    "email": "shorty@example.com",
                    "password": "abc",
                }))
                .with_expect(StatusCode::BAD_REQUEST)
                .assert_body(|body| assert!(body.contains("password"))),
        )
        .run(&mut server, pool)
        .await;
}

#[tokio::test]
async fn route_login_test() {
    let pool = setup_test_db().await;
    let mut server = setup_server(&pool).await;

    Flow::new()
        .step(register_action("LOGINTEST", "LOGINTEST").with_save_cookies(false))
        .step(
            login_action("LOGINTEST", "LOGINTEST")
                .with_clear_cookies(true)
                .assert_cookie(AUTH_TOKEN, |cookie| {
                    assert_eq!(cookie.same_site(), Some(SameSite::Lax));
                    assert_eq!(cookie.http_only(), Some(true));
                })
                .assert_json(|body| {
                    assert_eq!(body["user"]["username"], "LOGINTEST");
                }),
        )
        // wrong password
        .step(
            login_action("LOGINTEST", "WRONGPASSWORD")
                .with_save_cookies(false)
                .with_clear_cookies(true)
                .with_expect(StatusCode::UNAUTHORIZED)
                .assert_body(|body| assert!(body.contains("Authentication error"))),
        )
        // unknown account
        .step(
            login_action("nonexisting", "whatever")
                .with_expect(StatusCode::UNAUTHORIZED)
                .assert_body(|body| assert!(body.contains("Authentication error"))),
        )
        .run(&mut server, pool)
        .await;
}

#[tokio::test]
async fn route_me_test() {
    let pool = setup_test_db().await;
    let mut server = setup_server(&pool).await;

    Flow::new()
        .step(
            Action::new("me_anonymous", "GET", "/api/auth/me")
                .with_expect(StatusCode::UNAUTHORIZED),
        )
        .step(
            register_action("whoami", "whoami1")
                .with_save_cookies(false)
                .with_save_as("session"),
        )
        // bearer header without any cookie
        .step(
            Action::new("me_bearer", "GET", "/api/auth/me")
                .with_clear_cookies(true)
                .with_dyn_bearer(|ctx| ctx.get_str("session", "/access_token"))
                .assert_json(|body| assert_eq!(body["username"], "whoami")),
        )
        .step(
            Action::new("me_bad_bearer", "GET", "/api/auth/me")
                .with_dyn_bearer(|_| String::from("definitely.not.a-jwt"))
                .with_expect(StatusCode::UNAUTHORIZED),
        )
        // cookie session
        .step(login_action("whoami", "whoami1"))
        .step(
            Action::new("me_cookie", "GET", "/api/auth/me")
                .assert_json(|body| assert_eq!(body["username"], "whoami")),
        )
        .run(&mut server, pool)
        .await;
}

#[tokio::test]
async fn route_refresh_test() {
    let pool = setup_test_db().await;
    let mut server = setup_server(&pool).await;

    Flow::new()
        .step(
            register_action("refresher", "refresher1")
                .with_save_cookies(false)
                .with_save_as("first"),
        )
        .step(
            Action::new("refresh_body", "POST", "/api/auth/refresh")
                .with_save_cookies(false)
                .with_dyn_body(|ctx| json!({ "refresh_token": ctx.get_str("first", "/refresh_token") }))
                .with_save_as("second")
                .assert_json(|body| {
                    assert_eq!(body["user"]["username"], "refresher");
                }),
        )
        // the first token was rotated away
        .step(
            Action::new("refresh_reuse", "POST", "/api/auth/refresh")
                .with_save_cookies(false)
                .with_dyn_body(|ctx| json!({ "refresh_token": ctx.get_str("first", "/refresh_token") }))
                .with_expect(StatusCode::UNAUTHORIZED),
        )
        .step(
            Action::new("refresh_garbage", "POST", "/api/auth/refresh")
                .with_save_cookies(false)
                .with_body(json!({ "refresh_token": "garbage" }))
                .with_expect(StatusCode::UNAUTHORIZED),
        )
        // no body and no cookie
        .step(
            Action::new("refresh_nothing", "POST", "/api/auth/refresh")
                .with_clear_cookies(true)
                .with_expect(StatusCode::UNAUTHORIZED),
        )
        // cookie fallback
        .step(login_action("refresher", "refresher1"))
        .step(
            Action::new("refresh_cookie", "POST", "/api/auth/refresh")
                .assert_cookie(REFRESH_TOKEN, |cookie| {
                    assert!(!cookie.value().is_empty());
                }),
        )
        .run(&mut server, pool)
        .await;
}

#[tokio::test]
async fn route_logout_test() {
    let pool = setup_test_db().await;
    let mut server = setup_server(&pool).await;

    Flow::new()
        .step(register_action("leaver", "leaver12").with_save_as("session"))
        .step(Action::new("logout", "POST", "/api/auth/logout"))
        // refresh tokens are revoked
        .step(
            Action::new("refresh_after_logout", "POST", "/api/auth/refresh")
                .with_dyn_body(|ctx| json!({ "refresh_token": ctx.get_str("session", "/refresh_token") }))
                .with_expect(StatusCode::UNAUTHORIZED),
        )
        .step(
            Action::new("logout_anonymous", "POST", "/api/auth/logout")
                .with_clear_cookies(true)
                .with_expect(StatusCode::UNAUTHORIZED),
        )
        .run(&mut server, pool)
        .await;
}

#[tokio::test]
async fn route_user_list_test() {
    let pool = setup_test_db().await;
    let mut server = setup_server(&pool).await;

    Flow::new()
        .step(register_action("FOOBAR", "FOOBAZ"))
        .step(
            Action::new("user_list", "GET", "/api/auth/users")
                .with_param("limit", "5")
                .with_param("offset", "0")
                .with_expect(StatusCode::FORBIDDEN)
                .assert_body(|body| assert!(body.contains("Administrator"))),
        )
        .step(login_admin_action().with_clear_cookies(true))
        .step(
            Action::new("user_list", "GET", "/api/auth/users")
                .with_param("limit", "5")
                .with_param("offset", "0")
                .assert_json(|body| {
                    // admin and FOOBAR
                    assert_eq!(body["total"], 2);
                    assert_eq!(body["items"].as_array().map(Vec::len), Some(2));
                }),
        )
        .run(&mut server, pool)
        .await;
}

#[tokio::test]
async fn route_login_revokes_refresh_tokens_test() {
    let pool = setup_test_db().await;
    let mut server = setup_server(&pool).await;

    Flow::new()
        .step(
            register_action("rotator", "rotator1")
                .with_save_cookies(false)
                .with_save_as("registered"),
        )
        .step(
            login_action("rotator", "rotator1")
                .with_save_cookies(false)
                .with_save_as("logged_in"),
        )
        .step(
            Action::new("refresh_stale", "POST", "/api/auth/refresh")
                .with_save_cookies(false)
                .with_dyn_body(|ctx| {
                    json!({ "refresh_token": ctx.get_str("registered", "/refresh_token") })
                })
                .with_expect(StatusCode::UNAUTHORIZED),
        )
        .step(
            Action::new("refresh_current", "POST", "/api/auth/refresh")
                .with_save_cookies(false)
                .with_dyn_body(|ctx| {
                    json!({ "refresh_token": ctx.get_str("logged_in", "/refresh_token") })
                }),
        )
        .run(&mut server, pool)
        .await;
}
