use axum::{
    body::Body,
    http::{header, Request, StatusCode},
    Router,
};
use axum_extra::extract::cookie::{Cookie, SameSite};
use quickbite::{app::build_app, test_utils::TestHarness};
use serde_json::{json, Value};
use tower::ServiceExt; // for `oneshot`

struct Reply {
    status: StatusCode,
    set_cookie: Option<String>,
    body: Value,
}

async fn call(app: &Router, method: &str, uri: &str, body: Option<Value>, cookie: Option<&str>) -> Reply {
    let mut req = Request::builder().method(method).uri(uri);
    if let Some(c) = cookie {
        req = req.header(header::COOKIE, c);
    }
    let req = match body {
        Some(b) => req
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(b.to_string())),
        None => req.body(Body::empty()),
    }
    .expect("request to build");

    let res = app.clone().oneshot(req).await.expect("router to respond");
    let status = res.status();
    let set_cookie = res
        .headers()
        .get(header::SET_COOKIE)
        .map(|v| v.to_str().expect("ascii cookie").to_string());
    let bytes = axum::body::to_bytes(res.into_body(), usize::MAX)
        .await
        .expect("body to collect");
    let body = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap_or(Value::Null)
    };
    Reply {
        status,
        set_cookie,
        body,
    }
}

async fn post(app: &Router, uri: &str, body: Value) -> Reply {
    call(app, "POST", uri, Some(body), None).await
}

fn jane() -> Value {
    json!({
        "fullName": "Jane Doe",
        "email": "jane@x.com",
        "password": "Abc123!",
        "mobile": "9876543210",
        "role": "customer"
    })
}

#[tokio::test]
async fn signup_returns_201_with_session_cookie_and_no_secrets() {
    let h = TestHarness::new();
    let app = build_app(h.state());

    let res = post(&app, "/api/auth/signup", jane()).await;
    assert_eq!(res.status, StatusCode::CREATED);
    assert_eq!(res.body["email"], "jane@x.com");
    assert_eq!(res.body["fullName"], "Jane Doe");
    assert!(res.body.get("passwordHash").is_none());
    assert!(res.body.get("password_hash").is_none());
    assert_eq!(h.users.len(), 1);

    let raw = res.set_cookie.expect("session cookie to be issued");
    let cookie = Cookie::parse(raw).expect("cookie to parse");
    assert_eq!(cookie.name(), "token");
    assert_eq!(cookie.http_only(), Some(true));
    assert_eq!(cookie.same_site(), Some(SameSite::Strict));
    assert_eq!(cookie.max_age(), Some(time::Duration::days(7)));
    assert_ne!(cookie.secure(), Some(true));
}

#[tokio::test]
async fn duplicate_signup_in_any_case_is_400() {
    let h = TestHarness::new();
    let app = build_app(h.state());
    assert_eq!(post(&app, "/api/auth/signup", jane()).await.status, StatusCode::CREATED);

    let mut again = jane();
    again["email"] = json!("JANE@X.com");
    let res = post(&app, "/api/auth/signup", again).await;
    assert_eq!(res.status, StatusCode::BAD_REQUEST);
    assert_eq!(res.body["message"], "User already exists");
    assert!(res.set_cookie.is_none());
    assert_eq!(h.users.len(), 1);
}

#[tokio::test]
async fn signup_with_missing_field_is_400() {
    let app = build_app(TestHarness::new().state());
    let res = post(&app, "/api/auth/signup", json!({ "email": "jane@x.com" })).await;
    assert_eq!(res.status, StatusCode::BAD_REQUEST);
    assert_eq!(res.body["message"], "All fields are required");
}

#[tokio::test]
async fn signin_statuses() {
    let h = TestHarness::new();
    let app = build_app(h.state());
    post(&app, "/api/auth/signup", jane()).await;

    let ok = post(&app, "/api/auth/signin", json!({ "email": "Jane@x.com", "password": "Abc123!" })).await;
    assert_eq!(ok.status, StatusCode::OK);
    assert!(ok.set_cookie.is_some());

    let bad = post(&app, "/api/auth/signin", json!({ "email": "jane@x.com", "password": "nope" })).await;
    assert_eq!(bad.status, StatusCode::UNAUTHORIZED);

    let missing = post(&app, "/api/auth/signin", json!({ "email": "bob@x.com", "password": "Abc123!" })).await;
    assert_eq!(missing.status, StatusCode::NOT_FOUND);

    let malformed = post(&app, "/api/auth/signin", json!({ "email": "bob", "password": "x" })).await;
    assert_eq!(malformed.status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn me_requires_the_session_cookie() {
    let h = TestHarness::new();
    let app = build_app(h.state());
    let signup = post(&app, "/api/auth/signup", jane()).await;
    let raw = signup.set_cookie.unwrap();
    let cookie = Cookie::parse(raw).unwrap();
    let pair = format!("{}={}", cookie.name(), cookie.value());

    let me = call(&app, "GET", "/api/auth/me", None, Some(&pair)).await;
    assert_eq!(me.status, StatusCode::OK);
    assert_eq!(me.body["email"], "jane@x.com");

    let anon = call(&app, "GET", "/api/auth/me", None, None).await;
    assert_eq!(anon.status, StatusCode::UNAUTHORIZED);

    let forged = call(&app, "GET", "/api/auth/me", None, Some("token=forged")).await;
    assert_eq!(forged.status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn signout_clears_the_cookie() {
    let app = build_app(TestHarness::new().state());
    let res = call(&app, "POST", "/api/auth/signout", None, Some("token=abc")).await;
    assert_eq!(res.status, StatusCode::OK);
    assert_eq!(res.body["message"], "Log out successfully");
    let cookie = Cookie::parse(res.set_cookie.expect("removal cookie")).unwrap();
    assert_eq!(cookie.name(), "token");
    assert_eq!(cookie.value(), "");
    assert_eq!(cookie.max_age(), Some(time::Duration::ZERO));
}

#[tokio::test]
async fn otp_reset_scenario() {
    let h = TestHarness::new();
    let app = build_app(h.state());
    post(&app, "/api/auth/signup", jane()).await;
    h.otp.set("246810");

    let sent = post(&app, "/api/auth/otp/send", json!({ "email": "jane@x.com" })).await;
    assert_eq!(sent.status, StatusCode::OK);
    assert_eq!(h.mailer.last_code_for("jane@x.com").as_deref(), Some("246810"));

    let early = post(
        &app,
        "/api/auth/password/reset",
        json!({ "email": "jane@x.com", "newPassword": "NewPass1!" }),
    )
    .await;
    assert_eq!(early.status, StatusCode::BAD_REQUEST);

    let wrong = post(&app, "/api/auth/otp/verify", json!({ "email": "jane@x.com", "otp": "135790" })).await;
    assert_eq!(wrong.status, StatusCode::BAD_REQUEST);
    assert_eq!(wrong.body["message"], "Invalid OTP. Please check and try again");

    let right = post(&app, "/api/auth/otp/verify", json!({ "email": "jane@x.com", "otp": "246810" })).await;
    assert_eq!(right.status, StatusCode::OK);
    assert!(h.users.get("jane@x.com").unwrap().is_otp_verified);

    let reset = post(
        &app,
        "/api/auth/password/reset",
        json!({ "email": "jane@x.com", "newPassword": "NewPass1!" }),
    )
    .await;
    assert_eq!(reset.status, StatusCode::OK);

    let login = post(&app, "/api/auth/signin", json!({ "email": "jane@x.com", "password": "NewPass1!" })).await;
    assert_eq!(login.status, StatusCode::OK);
}

#[tokio::test]
async fn otp_for_unknown_email_is_404_and_mail_failure_is_500() {
    let h = TestHarness::new();
    let app = build_app(h.state());
    let unknown = post(&app, "/api/auth/otp/send", json!({ "email": "ghost@x.com" })).await;
    assert_eq!(unknown.status, StatusCode::NOT_FOUND);

    post(&app, "/api/auth/signup", jane()).await;
    h.mailer.fail(true);
    let failed = post(&app, "/api/auth/otp/send", json!({ "email": "jane@x.com" })).await;
    assert_eq!(failed.status, StatusCode::INTERNAL_SERVER_ERROR);
    assert!(failed.body["message"].is_string());
}

#[tokio::test]
async fn google_signin_requires_prior_signup() {
    let h = TestHarness::new();
    let app = build_app(h.state());

    let res = post(&app, "/api/auth/google/signin", json!({ "email": "jo@gmail.com", "fullName": "Jo" })).await;
    assert_eq!(res.status, StatusCode::NOT_FOUND);
    assert!(h.users.is_empty());

    let created = post(
        &app,
        "/api/auth/google",
        json!({ "fullName": "Jo", "email": "jo@gmail.com", "mobile": "9876543210", "role": "user" }),
    )
    .await;
    assert_eq!(created.status, StatusCode::OK);
    assert!(created.set_cookie.is_some());

    let res = post(&app, "/api/auth/google/signin", json!({ "email": "jo@gmail.com" })).await;
    assert_eq!(res.status, StatusCode::OK);
    assert_eq!(res.body["fullName"], "Jo");
    assert!(res.set_cookie.is_some());
}

#[tokio::test]
async fn health_is_ok() {
    let app = build_app(TestHarness::new().state());
    let res = app
        .oneshot(Request::builder().uri("/api/health").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
}

#[tokio::test]
async fn numeric_mobile_is_accepted() {
    let h = TestHarness::new();
    let app = build_app(h.state());
    let mut body = jane();
    body["mobile"] = json!(9876543210u64);

    let res = post(&app, "/api/auth/signup", body).await;
    assert_eq!(res.status, StatusCode::CREATED);
    assert_eq!(res.body["mobile"], "9876543210");
    assert_eq!(h.users.get("jane@x.com").unwrap().mobile, "9876543210");
}

#[tokio::test]
async fn unreadable_bodies_get_the_json_error_shape() {
    let app = build_app(TestHarness::new().state());

    let no_content_type = app
        .clone()
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/api/auth/signup")
                .body(Body::from(jane().to_string()))
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(no_content_type.status(), StatusCode::BAD_REQUEST);
    let bytes = axum::body::to_bytes(no_content_type.into_body(), usize::MAX)
        .await
        .unwrap();
    let body: Value = serde_json::from_slice(&bytes).unwrap();
    assert_eq!(body["message"], "Invalid request body");

    let malformed = app
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/api/auth/signin")
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from("{bad"))
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(malformed.status(), StatusCode::BAD_REQUEST);
    let bytes = axum::body::to_bytes(malformed.into_body(), usize::MAX)
        .await
        .unwrap();
    let body: Value = serde_json::from_slice(&bytes).unwrap();
    assert_eq!(body["message"], "Invalid request body");
}

#[tokio::test]
async fn wrongly_typed_field_is_400_json() {
    let app = build_app(TestHarness::new().state());
    let res = post(&app, "/api/auth/signin", json!({ "email": ["jane@x.com"], "password": "Abc123!" })).await;
    assert_eq!(res.status, StatusCode::BAD_REQUEST);
    assert_eq!(res.body["message"], "Invalid request body");
}
