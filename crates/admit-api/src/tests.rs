use std::sync::Arc;

use admit_core::role::{NewUser, Role};
use admit_store_sqlite::SqliteStore;
use axum::{
  Router,
  body::Body,
  http::{Method, Request, StatusCode, header},
  response::Response,
};
use serde_json::{Value, json};
use tower::ServiceExt;

use super::*;

const PASSWORD: &str = "secret";
const UPLOAD: &str = "User Code,Program CODE,Program,Session,Family Name,Given Name\n\
                      A1,VG01,Master of Data Science,2025W,Lovelace,Ada\n\
                      A2,VG01,Master of Data Science,2025W,Hopper,Grace\n";
const BOUNDARY: &str = "admit-test-boundary";

// ─── Helpers ─────────────────────────────────────────────────────────────────

async fn app() -> Router {
  let store = SqliteStore::open_in_memory().await.unwrap();
  let hash = auth::hash_password(PASSWORD).unwrap();
  let accounts = [("admin", Role::Admin), ("prof", Role::Faculty), ("guest", Role::Viewer)];
  for (username, role) in accounts {
    store
      .create_user(NewUser {
        username: username.to_owned(),
        password_hash: hash.clone(),
        role,
      })
      .await
      .unwrap()
      .unwrap();
  }

  let state = AppState::new(Arc::new(store), ApiConfig::default());
  Router::new().nest("/api", api_router(state))
}

async fn send(app: &Router, req: Request<Body>) -> Response {
  app.clone().oneshot(req).await.unwrap()
}

async fn json_body(resp: Response) -> Value {
  let bytes = axum::body::to_bytes(resp.into_body(), usize::MAX).await.unwrap();
  serde_json::from_slice(&bytes).unwrap()
}

fn json_request(
  method: Method,
  uri: &str,
  cookie: Option<&str>,
  body: Option<Value>,
) -> Request<Body> {
  let mut builder = Request::builder().method(method).uri(uri);
  if let Some(cookie) = cookie {
    builder = builder.header(header::COOKIE, cookie);
  }
  match body {
    Some(body) => builder
      .header(header::CONTENT_TYPE, "application/json")
      .body(Body::from(body.to_string()))
      .unwrap(),
    None => builder.body(Body::empty()).unwrap(),
  }
}

fn upload_request(cookie: &str, csv: &str) -> Request<Body> {
  let body = format!(
    "--{BOUNDARY}\r\n\
     Content-Disposition: form-data; name=\"file\"; filename=\"applicants.csv\"\r\n\
     Content-Type: text/csv\r\n\r\n\
     {csv}\r\n\
     --{BOUNDARY}--\r\n"
  );
  Request::builder()
    .method(Method::POST)
    .uri("/api/upload")
    .header(header::COOKIE, cookie)
    .header(header::CONTENT_TYPE, format!("multipart/form-data; boundary={BOUNDARY}"))
    .body(Body::from(body))
    .unwrap()
}

/// Log in and return the `name=value` pair to send back as a cookie.
async fn login(app: &Router, username: &str) -> String {
  let req = json_request(
    Method::POST,
    "/api/auth/login",
    None,
    Some(json!({ "username": username, "password": PASSWORD })),
  );
  let resp = send(app, req).await;
  assert_eq!(resp.status(), StatusCode::OK);
  let set_cookie = resp.headers().get(header::SET_COOKIE).unwrap().to_str().unwrap();
  set_cookie.split(';').next().unwrap().to_owned()
}

// ─── Auth gating ─────────────────────────────────────────────────────────────

#[tokio::test]
async fn missing_session_is_401() {
  let app = app().await;
  let resp = send(&app, json_request(Method::GET, "/api/applicants", None, None)).await;
  assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
  let body = json_body(resp).await;
  assert_eq!(body["success"], false);
  assert!(body["message"].is_string());
}

#[tokio::test]
async fn unknown_token_is_401() {
  let app = app().await;
  let req = json_request(Method::GET, "/api/auth/me", Some("admit_session=deadbeef"), None);
  assert_eq!(send(&app, req).await.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn insufficient_role_is_403() {
  let app = app().await;
  let guest = login(&app, "guest").await;
  let prof = login(&app, "prof").await;

  let req = json_request(Method::GET, "/api/users", Some(&guest), None);
  assert_eq!(send(&app, req).await.status(), StatusCode::FORBIDDEN);

  let req = json_request(
    Method::PUT,
    "/api/applicants/A1/rating",
    Some(&guest),
    Some(json!({ "rating": 5.0 })),
  );
  assert_eq!(send(&app, req).await.status(), StatusCode::FORBIDDEN);

  let resp = send(&app, upload_request(&prof, UPLOAD)).await;
  assert_eq!(resp.status(), StatusCode::FORBIDDEN);

  let req = json_request(Method::GET, "/api/applicants", Some(&guest), None);
  assert_eq!(send(&app, req).await.status(), StatusCode::OK);
}

#[tokio::test]
async fn wrong_password_is_401() {
  let app = app().await;
  let req = json_request(
    Method::POST,
    "/api/auth/login",
    None,
    Some(json!({ "username": "admin", "password": "nope" })),
  );
  let resp = send(&app, req).await;
  assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
  assert!(resp.headers().get(header::SET_COOKIE).is_none());
}

#[tokio::test]
async fn login_me_logout() {
  let app = app().await;
  let cookie = login(&app, "prof").await;
  assert!(cookie.starts_with("admit_session="));

  let resp = send(&app, json_request(Method::GET, "/api/auth/me", Some(&cookie), None)).await;
  assert_eq!(resp.status(), StatusCode::OK);
  let body = json_body(resp).await;
  assert_eq!(body["success"], true);
  assert_eq!(body["user"]["username"], "prof");
  assert_eq!(body["user"]["role"], "Faculty");
  assert!(body["user"].get("password_hash").is_none());

  let req = json_request(Method::POST, "/api/auth/logout", Some(&cookie), None);
  assert_eq!(send(&app, req).await.status(), StatusCode::OK);

  let resp = send(&app, json_request(Method::GET, "/api/auth/me", Some(&cookie), None)).await;
  assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
}

// ─── Upload & applicants ─────────────────────────────────────────────────────

#[tokio::test]
async fn upload_then_browse() {
  let app = app().await;
  let admin = login(&app, "admin").await;

  let resp = send(&app, upload_request(&admin, UPLOAD)).await;
  assert_eq!(resp.status(), StatusCode::OK);
  let body = json_body(resp).await;
  assert_eq!(body["success"], true);
  assert_eq!(body["summary"]["processed"], 2);
  assert_eq!(body["summary"]["session_created"], true);

  let req = json_request(Method::GET, "/api/sessions", Some(&admin), None);
  let body = json_body(send(&app, req).await).await;
  assert_eq!(body["sessions"].as_array().unwrap().len(), 1);

  let req = json_request(Method::GET, "/api/applicants?search=hopper", Some(&admin), None);
  let body = json_body(send(&app, req).await).await;
  assert_eq!(body["count"], 1);
  assert_eq!(body["applicants"][0]["user_code"], "A2");

  let req = json_request(Method::GET, "/api/applicants/A1", Some(&admin), None);
  let body = json_body(send(&app, req).await).await;
  let application = &body["applicant"]["application"];
  assert_eq!(application["sent"], "Not Reviewed");
  assert_eq!(application["english_status"], "Not Met");
  assert_eq!(application["english_description"], "No English tests submitted");

  let req = json_request(Method::GET, "/api/applicants/ZZ", Some(&admin), None);
  assert_eq!(send(&app, req).await.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn upload_without_user_code_is_400() {
  let app = app().await;
  let admin = login(&app, "admin").await;
  let resp = send(&app, upload_request(&admin, "Family Name\nLovelace\n")).await;
  assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
  assert_eq!(json_body(resp).await["success"], false);
}

#[tokio::test]
async fn status_changes_are_validated_and_logged() {
  let app = app().await;
  let admin = login(&app, "admin").await;
  send(&app, upload_request(&admin, UPLOAD)).await;

  let req = json_request(
    Method::PUT,
    "/api/applicants/A1/status",
    Some(&admin),
    Some(json!({ "status": "Send Offer to CoGS" })),
  );
  let body = json_body(send(&app, req).await).await;
  assert_eq!(body["application"]["sent"], "Send Offer to CoGS");

  let req = json_request(
    Method::PUT,
    "/api/applicants/A1/status",
    Some(&admin),
    Some(json!({ "status": "Accepted" })),
  );
  assert_eq!(send(&app, req).await.status(), StatusCode::BAD_REQUEST);

  let req = json_request(
    Method::PUT,
    "/api/applicants/ZZ/status",
    Some(&admin),
    Some(json!({ "status": "Reviewed" })),
  );
  assert_eq!(send(&app, req).await.status(), StatusCode::NOT_FOUND);

  let req = json_request(Method::GET, "/api/activity", Some(&admin), None);
  let body = json_body(send(&app, req).await).await;
  let actions: Vec<&str> = body["activity"]
    .as_array()
    .unwrap()
    .iter()
    .filter_map(|e| e["action"].as_str())
    .collect();
  assert_eq!(actions[0], "status_change");
  assert!(actions.contains(&"data_import"));
  assert!(actions.contains(&"login"));
}

#[tokio::test]
async fn review_fields_update() {
  let app = app().await;
  let admin = login(&app, "admin").await;
  let prof = login(&app, "prof").await;
  send(&app, upload_request(&admin, UPLOAD)).await;

  let req = json_request(
    Method::PUT,
    "/api/applicants/A1/review",
    Some(&prof),
    Some(json!({ "cs": true, "comment": "strong background" })),
  );
  let body = json_body(send(&app, req).await).await;
  assert_eq!(body["application"]["cs"], true);
  assert_eq!(body["application"]["comment"], "strong background");

  let req = json_request(Method::PUT, "/api/applicants/A1/review", Some(&prof), Some(json!({})));
  assert_eq!(send(&app, req).await.status(), StatusCode::BAD_REQUEST);
}

// ─── Ratings ─────────────────────────────────────────────────────────────────

#[tokio::test]
async fn ratings_are_validated_per_reviewer() {
  let app = app().await;
  let admin = login(&app, "admin").await;
  let prof = login(&app, "prof").await;
  send(&app, upload_request(&admin, UPLOAD)).await;

  let rate = |cookie: &str, rating: f64| {
    json_request(
      Method::PUT,
      "/api/applicants/A1/rating",
      Some(cookie),
      Some(json!({ "rating": rating })),
    )
  };

  assert_eq!(send(&app, rate(&prof, 10.05)).await.status(), StatusCode::BAD_REQUEST);
  assert_eq!(send(&app, rate(&prof, -0.1)).await.status(), StatusCode::BAD_REQUEST);
  assert_eq!(send(&app, rate(&prof, 9.0)).await.status(), StatusCode::OK);
  assert_eq!(send(&app, rate(&prof, 7.0)).await.status(), StatusCode::OK);
  assert_eq!(send(&app, rate(&admin, 10.0)).await.status(), StatusCode::OK);

  let req = json_request(Method::GET, "/api/applicants/A1/ratings", Some(&prof), None);
  let body = json_body(send(&app, req).await).await;
  assert_eq!(body["ratings"].as_array().unwrap().len(), 2);
  assert_eq!(body["average"], 8.5);

  let req = json_request(Method::DELETE, "/api/applicants/A1/rating", Some(&prof), None);
  assert_eq!(send(&app, req).await.status(), StatusCode::OK);
  let req = json_request(Method::DELETE, "/api/applicants/A1/rating", Some(&prof), None);
  assert_eq!(send(&app, req).await.status(), StatusCode::NOT_FOUND);

  let req = json_request(
    Method::PUT,
    "/api/applicants/ZZ/rating",
    Some(&prof),
    Some(json!({ "rating": 5.0 })),
  );
  assert_eq!(send(&app, req).await.status(), StatusCode::NOT_FOUND);
}

// ─── English ─────────────────────────────────────────────────────────────────

#[tokio::test]
async fn english_recompute() {
  let app = app().await;
  let admin = login(&app, "admin").await;
  send(&app, upload_request(&admin, UPLOAD)).await;

  let req = json_request(Method::POST, "/api/applicants/A2/english", Some(&admin), None);
  let body = json_body(send(&app, req).await).await;
  assert_eq!(body["english_status"], "Not Met");
  assert_eq!(body["english"], false);

  let req = json_request(Method::POST, "/api/english/recompute", Some(&admin), None);
  let body = json_body(send(&app, req).await).await;
  assert_eq!(body["evaluated"], 2);
}

// ─── Export ──────────────────────────────────────────────────────────────────

#[tokio::test]
async fn export_is_csv() {
  let app = app().await;
  let admin = login(&app, "admin").await;
  send(&app, upload_request(&admin, UPLOAD)).await;

  let guest = login(&app, "guest").await;
  let resp = send(&app, json_request(Method::GET, "/api/export", Some(&guest), None)).await;
  assert_eq!(resp.status(), StatusCode::OK);
  let content_type = resp.headers().get(header::CONTENT_TYPE).unwrap().to_str().unwrap();
  assert!(content_type.starts_with("text/csv"));

  let bytes = axum::body::to_bytes(resp.into_body(), usize::MAX).await.unwrap();
  let text = std::str::from_utf8(&bytes).unwrap();
  let lines: Vec<&str> = text.lines().collect();
  assert_eq!(lines.len(), 3);
  assert!(lines[0].starts_with("User Code,Family Name,Given Name,Session"));
  assert!(lines[1].starts_with("A2,Hopper,Grace,Master of Data Science 2025W"));
}

#[tokio::test]
async fn export_as_xlsx() {
  let app = app().await;
  let admin = login(&app, "admin").await;
  send(&app, upload_request(&admin, UPLOAD)).await;

  let req = json_request(Method::GET, "/api/export?format=xlsx", Some(&admin), None);
  let resp = send(&app, req).await;
  assert_eq!(resp.status(), StatusCode::OK);
  let content_type = resp.headers().get(header::CONTENT_TYPE).unwrap().to_str().unwrap();
  assert_eq!(content_type, "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet");
  let disposition = resp.headers().get(header::CONTENT_DISPOSITION).unwrap().to_str().unwrap();
  assert!(disposition.ends_with("applicants.xlsx\""));

  let bytes = axum::body::to_bytes(resp.into_body(), usize::MAX).await.unwrap();
  assert!(bytes.starts_with(b"PK\x03\x04"));

  let req = json_request(Method::GET, "/api/export?format=pdf", Some(&admin), None);
  let resp = send(&app, req).await;
  assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
}

// ─── Users ───────────────────────────────────────────────────────────────────

#[tokio::test]
async fn user_management() {
  let app = app().await;
  let admin = login(&app, "admin").await;

  let req = json_request(
    Method::POST,
    "/api/users",
    Some(&admin),
    Some(json!({ "username": "ta", "password": "pw", "role": "viewer" })),
  );
  let resp = send(&app, req).await;
  assert_eq!(resp.status(), StatusCode::CREATED);
  let id = json_body(resp).await["user"]["id"].as_i64().unwrap();

  let req = json_request(
    Method::POST,
    "/api/users",
    Some(&admin),
    Some(json!({ "username": "TA", "password": "pw", "role": "viewer" })),
  );
  let resp = send(&app, req).await;
  assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
  let body = json_body(resp).await;
  assert_eq!(body["success"], false);
  assert!(body["message"].as_str().unwrap().contains("taken"));

  let req = json_request(
    Method::PUT,
    &format!("/api/users/{id}/role"),
    Some(&admin),
    Some(json!({ "role": "Faculty" })),
  );
  let body = json_body(send(&app, req).await).await;
  assert_eq!(body["user"]["role"], "Faculty");

  let req = json_request(
    Method::PUT,
    &format!("/api/users/{id}/role"),
    Some(&admin),
    Some(json!({ "role": "owner" })),
  );
  assert_eq!(send(&app, req).await.status(), StatusCode::BAD_REQUEST);

  let req = json_request(Method::DELETE, &format!("/api/users/{id}"), Some(&admin), None);
  assert_eq!(send(&app, req).await.status(), StatusCode::OK);
  let req = json_request(Method::DELETE, &format!("/api/users/{id}"), Some(&admin), None);
  assert_eq!(send(&app, req).await.status(), StatusCode::NOT_FOUND);

  let req = json_request(Method::GET, "/api/users", Some(&admin), None);
  let body = json_body(send(&app, req).await).await;
  assert_eq!(body["users"].as_array().unwrap().len(), 3);
}
