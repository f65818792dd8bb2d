use std::sync::Arc;

use axum::{
    Router,
    body::Body,
    http::{HeaderMap, Method, Request, StatusCode, header},
};
use chrono::{TimeDelta, Utc};
use http_body_util::BodyExt;
use serde_json::{Value, json};
use tower::ServiceExt;

use marina_api::auth::{AppState, AppStateInner};
use marina_api::password::HashCost;
use marina_api::routes::router;
use marina_api::session::{DEFAULT_TOKEN_TTL, SessionManager, strip_bearer};
use marina_db::Database;

const SECRET: &str = "integration-test-secret";

struct TestApp {
    router: Router,
    state: AppState,
}

struct Reply {
    status: StatusCode,
    headers: HeaderMap,
    body: Value,
}

impl TestApp {
    fn new() -> Self {
        let state = Arc::new(AppStateInner {
            db: Database::open_in_memory().unwrap(),
            sessions: SessionManager::new(SECRET, DEFAULT_TOKEN_TTL),
            hash_cost: HashCost {
                memory_kib: 8,
                iterations: 1,
                parallelism: 1,
            },
        });
        Self {
            router: router(state.clone()),
            state,
        }
    }

    fn token(&self) -> String {
        self.state.sessions.issue_token("operator", "ops@port.fr").unwrap()
    }

    async fn send(&self, method: Method, uri: &str, token: Option<&str>, body: Option<Value>) -> Reply {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(token) = token {
            builder = builder.header(header::AUTHORIZATION, format!("Bearer {token}"));
        }
        let request = match body {
            Some(body) => builder
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(body.to_string()))
                .unwrap(),
            None => builder.body(Body::empty()).unwrap(),
        };
        self.raw(request).await
    }

    async fn raw(&self, request: Request<Body>) -> Reply {
        let response = self.router.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let headers = response.headers().clone();
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        let body = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap()
        };
        Reply {
            status,
            headers,
            body,
        }
    }

    async fn register(&self, name: &str, email: &str, password: &str) -> Reply {
        self.send(
            Method::POST,
            "/api/auth/register",
            None,
            Some(json!({ "name": name, "email": email, "password": password })),
        )
        .await
    }

    async fn create_catway(&self, token: &str, number: i64) -> String {
        let reply = self
            .send(
                Method::POST,
                "/api/catways",
                Some(token),
                Some(json!({ "catwayNumber": number, "type": "long", "catwayState": "bon état" })),
            )
            .await;
        assert_eq!(reply.status, StatusCode::CREATED, "{}", reply.body);
        reply.body["_id"].as_str().unwrap().to_string()
    }

    async fn create_reservation(&self, token: &str, catway_id: &str, check_in: &str, check_out: &str) -> Reply {
        self.send(
            Method::POST,
            &format!("/api/catways/{catway_id}/reservations"),
            Some(token),
            Some(json!({
                "clientName": "John Doe",
                "boatName": "Sea Breeze",
                "checkIn": check_in,
                "checkOut": check_out,
            })),
        )
        .await
    }
}

fn rotated_token(reply: &Reply) -> String {
    let value = reply
        .headers
        .get(header::AUTHORIZATION)
        .expect("rotated token header")
        .to_str()
        .unwrap();
    assert!(value.starts_with("Bearer"));
    assert!(!value.starts_with("Bearer "));
    strip_bearer(value).to_string()
}

// -- Authentication --

#[tokio::test]
async fn register_then_login() {
    let app = TestApp::new();

    let reply = app.register("Capitaine", " Capitaine@Port.fr ", "secret1").await;
    assert_eq!(reply.status, StatusCode::CREATED);
    assert_eq!(reply.body["email"], "capitaine@port.fr");
    assert_eq!(reply.body["name"], "Capitaine");
    assert!(reply.body.get("password").is_none());

    let stored = app.state.db.get_user_by_email("capitaine@port.fr").unwrap().unwrap();
    assert!(stored.password.starts_with("$argon2id$"));

    let reply = app
        .send(
            Method::POST,
            "/api/auth/authenticate",
            None,
            Some(json!({ "email": "CAPITAINE@port.fr", "password": "secret1" })),
        )
        .await;
    assert_eq!(reply.status, StatusCode::OK);
    assert_eq!(reply.body["message"], "Authentification réussie");

    let token = reply.body["token"].as_str().unwrap();
    let claims = app.state.sessions.verify(token).unwrap();
    assert_eq!(claims.sub, stored.id);
    assert_eq!(claims.email, "capitaine@port.fr");
    assert_eq!(rotated_token(&reply), token);
}

#[tokio::test]
async fn login_unknown_user_is_404() {
    let app = TestApp::new();
    let reply = app
        .send(
            Method::POST,
            "/api/auth/authenticate",
            None,
            Some(json!({ "email": "nobody@port.fr", "password": "secret1" })),
        )
        .await;
    assert_eq!(reply.status, StatusCode::NOT_FOUND);
    assert_eq!(reply.body["error"], "user_not_found");
}

#[tokio::test]
async fn login_wrong_password_is_403() {
    let app = TestApp::new();
    app.register("Capitaine", "capitaine@port.fr", "secret1").await;

    let reply = app
        .send(
            Method::POST,
            "/api/auth/authenticate",
            None,
            Some(json!({ "email": "capitaine@port.fr", "password": "secret2" })),
        )
        .await;
    assert_eq!(reply.status, StatusCode::FORBIDDEN);
    assert_eq!(reply.body["error"], "wrong_credentials");
}

#[tokio::test]
async fn login_requires_both_fields() {
    let app = TestApp::new();
    for body in [
        json!({ "email": "capitaine@port.fr" }),
        json!({ "password": "secret1" }),
        json!({ "email": "  ", "password": "secret1" }),
    ] {
        let reply = app
            .send(Method::POST, "/api/auth/authenticate", None, Some(body))
            .await;
        assert_eq!(reply.status, StatusCode::BAD_REQUEST);
        assert_eq!(reply.body["error"], "validation_failed");
    }
}

#[tokio::test]
async fn registration_is_validated() {
    let app = TestApp::new();
    let reply = app.register("", "not-an-email", "123").await;
    assert_eq!(reply.status, StatusCode::BAD_REQUEST);
    assert_eq!(reply.body["error"], "validation_failed");

    assert_eq!(app.register("A", "a@port.fr", "secret1").await.status, StatusCode::CREATED);
    let reply = app.register("B", "A@PORT.FR", "secret1").await;
    assert_eq!(reply.status, StatusCode::CONFLICT);
    assert_eq!(reply.body["error"], "email_taken");
}

#[tokio::test]
async fn malformed_json_gets_our_error_body() {
    let app = TestApp::new();
    let request = Request::builder()
        .method(Method::POST)
        .uri("/api/auth/authenticate")
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from("{\"email\": "))
        .unwrap();

    let reply = app.raw(request).await;
    assert_eq!(reply.status, StatusCode::BAD_REQUEST);
    assert_eq!(reply.body["error"], "validation_failed");
}

// -- Token gate --

#[tokio::test]
async fn protected_route_without_token_is_401() {
    let app = TestApp::new();
    let reply = app.send(Method::GET, "/api/catways", None, None).await;
    assert_eq!(reply.status, StatusCode::UNAUTHORIZED);
    assert_eq!(reply.body["error"], "token_required");
    assert!(reply.headers.get(header::AUTHORIZATION).is_none());
}

#[tokio::test]
async fn expired_or_forged_token_is_401() {
    let app = TestApp::new();

    let expired = app
        .state
        .sessions
        .issue_token_at("operator", "ops@port.fr", Utc::now() - TimeDelta::hours(25))
        .unwrap();
    let reply = app.send(Method::GET, "/api/catways", Some(&expired), None).await;
    assert_eq!(reply.status, StatusCode::UNAUTHORIZED);
    assert_eq!(reply.body["error"], "token_not_valid");

    let forged = SessionManager::new("another-secret", DEFAULT_TOKEN_TTL)
        .issue_token("operator", "ops@port.fr")
        .unwrap();
    let reply = app.send(Method::GET, "/api/catways", Some(&forged), None).await;
    assert_eq!(reply.status, StatusCode::UNAUTHORIZED);
    assert_eq!(reply.body["error"], "token_not_valid");
}

#[tokio::test]
async fn every_protected_response_rotates_the_token() {
    let app = TestApp::new();
    let old = app
        .state
        .sessions
        .issue_token_at("operator", "ops@port.fr", Utc::now() - TimeDelta::hours(23))
        .unwrap();

    let reply = app.send(Method::GET, "/api/catways", Some(&old), None).await;
    assert_eq!(reply.status, StatusCode::OK);
    assert_eq!(reply.body, json!([]));

    let fresh = rotated_token(&reply);
    let old_claims = app.state.sessions.verify(&old).unwrap();
    let new_claims = app.state.sessions.verify(&fresh).unwrap();
    assert_eq!(new_claims.sub, old_claims.sub);
    assert_eq!(new_claims.email, old_claims.email);
    assert!(new_claims.exp > old_claims.exp);

    // the header value goes straight back in as a credential
    let request = Request::builder()
        .uri("/api/reservations")
        .header(header::AUTHORIZATION, format!("Bearer{fresh}"))
        .body(Body::empty())
        .unwrap();
    assert_eq!(app.raw(request).await.status, StatusCode::OK);
}

#[tokio::test]
async fn access_token_header_is_accepted() {
    let app = TestApp::new();
    let request = Request::builder()
        .uri("/api/users")
        .header("x-access-token", app.token())
        .body(Body::empty())
        .unwrap();

    let reply = app.raw(request).await;
    assert_eq!(reply.status, StatusCode::OK);
    rotated_token(&reply);
}

#[tokio::test]
async fn handler_errors_still_carry_a_rotated_token() {
    let app = TestApp::new();
    let token = app.token();
    let reply = app.send(Method::GET, "/api/catways/abc123", Some(&token), None).await;
    assert_eq!(reply.status, StatusCode::NOT_FOUND);
    rotated_token(&reply);
}

// -- Current user --

#[tokio::test]
async fn me_returns_the_token_holder() {
    let app = TestApp::new();
    app.register("Capitaine", "capitaine@port.fr", "secret1").await;
    let login = app
        .send(
            Method::POST,
            "/api/auth/authenticate",
            None,
            Some(json!({ "email": "capitaine@port.fr", "password": "secret1" })),
        )
        .await;
    let token = login.body["token"].as_str().unwrap().to_string();

    let reply = app.send(Method::GET, "/api/auth/me", Some(&token), None).await;
    assert_eq!(reply.status, StatusCode::OK);
    assert_eq!(reply.body["email"], "capitaine@port.fr");
    assert!(reply.body["createdAt"].is_string());
    assert!(reply.body.get("password").is_none());

    let id = reply.body["_id"].as_str().unwrap().to_string();
    app.state.db.delete_user(&id).unwrap();
    let reply = app.send(Method::GET, "/api/auth/me", Some(&token), None).await;
    assert_eq!(reply.status, StatusCode::NOT_FOUND);
    assert_eq!(reply.body["error"], "user_not_found");
}

#[tokio::test]
async fn me_with_bad_token_is_invalid_session() {
    let app = TestApp::new();
    for token in [Some("garbage"), None] {
        let reply = app.send(Method::GET, "/api/auth/me", token, None).await;
        assert_eq!(reply.status, StatusCode::UNAUTHORIZED);
        assert_eq!(reply.body["error"], "invalid_session");
    }
}

// -- Users --

#[tokio::test]
async fn user_crud() {
    let app = TestApp::new();
    let token = app.token();

    let reply = app
        .send(
            Method::POST,
            "/api/users",
            Some(&token),
            Some(json!({ "name": "Marin", "email": "marin@port.fr", "password": "secret1" })),
        )
        .await;
    assert_eq!(reply.status, StatusCode::CREATED);
    let id = reply.body["_id"].as_str().unwrap().to_string();
    let hash_before = app.state.db.get_user_by_id(&id).unwrap().unwrap().password;

    let reply = app
        .send(
            Method::PUT,
            &format!("/api/users/{id}"),
            Some(&token),
            Some(json!({ "name": "Marin Pêcheur" })),
        )
        .await;
    assert_eq!(reply.status, StatusCode::OK);
    assert_eq!(reply.body["name"], "Marin Pêcheur");
    let row = app.state.db.get_user_by_id(&id).unwrap().unwrap();
    assert_eq!(row.password, hash_before);

    let reply = app
        .send(
            Method::PUT,
            &format!("/api/users/{id}"),
            Some(&token),
            Some(json!({ "password": "another1" })),
        )
        .await;
    assert_eq!(reply.status, StatusCode::OK);
    let row = app.state.db.get_user_by_id(&id).unwrap().unwrap();
    assert_ne!(row.password, hash_before);
    assert!(row.password.starts_with("$argon2id$"));

    let reply = app.send(Method::GET, "/api/users", Some(&token), None).await;
    assert_eq!(reply.body.as_array().unwrap().len(), 1);

    let reply = app
        .send(Method::DELETE, &format!("/api/users/{id}"), Some(&token), None)
        .await;
    assert_eq!(reply.status, StatusCode::OK);
    assert_eq!(reply.body["name"], "Marin Pêcheur");

    let reply = app
        .send(Method::GET, &format!("/api/users/{id}"), Some(&token), None)
        .await;
    assert_eq!(reply.status, StatusCode::NOT_FOUND);
}

// -- Catways --

#[tokio::test]
async fn catway_crud() {
    let app = TestApp::new();
    let token = app.token();
    let id = app.create_catway(&token, 1).await;

    let reply = app
        .send(
            Method::POST,
            "/api/catways",
            Some(&token),
            Some(json!({ "catwayNumber": 1, "type": "short", "catwayState": "neuf" })),
        )
        .await;
    assert_eq!(reply.status, StatusCode::CONFLICT);
    assert_eq!(reply.body["error"], "catway_number_taken");

    let reply = app
        .send(
            Method::PUT,
            &format!("/api/catways/{id}"),
            Some(&token),
            Some(json!({ "catwayState": "planche cassée" })),
        )
        .await;
    assert_eq!(reply.status, StatusCode::BAD_REQUEST);

    let reply = app
        .send(
            Method::PATCH,
            &format!("/api/catways/{id}"),
            Some(&token),
            Some(json!({ "catwayState": "planche cassée" })),
        )
        .await;
    assert_eq!(reply.status, StatusCode::OK);
    assert_eq!(reply.body["catwayState"], "planche cassée");
    assert_eq!(reply.body["type"], "long");

    let reply = app
        .send(
            Method::PUT,
            &format!("/api/catways/{id}"),
            Some(&token),
            Some(json!({ "catwayNumber": 2, "type": "short", "catwayState": "réparé" })),
        )
        .await;
    assert_eq!(reply.status, StatusCode::OK);
    assert_eq!(reply.body["catwayNumber"], 2);
    assert_eq!(reply.body["type"], "short");

    let reply = app
        .send(Method::DELETE, &format!("/api/catways/{id}"), Some(&token), None)
        .await;
    assert_eq!(reply.status, StatusCode::OK);
    let reply = app
        .send(Method::GET, &format!("/api/catways/{id}"), Some(&token), None)
        .await;
    assert_eq!(reply.status, StatusCode::NOT_FOUND);
    assert_eq!(reply.body["message"], "Catway non trouvé.");
}

// -- Reservations --

#[tokio::test]
async fn reservation_under_unknown_catway_is_404() {
    let app = TestApp::new();
    let token = app.token();
    let reply = app
        .create_reservation(&token, "abc123", "2025-01-10", "2025-01-15")
        .await;
    assert_eq!(reply.status, StatusCode::NOT_FOUND);
    assert_eq!(reply.body["error"], "catway_not_found");
    assert_eq!(reply.body["message"], "Catway non trouvé.");
}

#[tokio::test]
async fn reversed_or_empty_interval_is_rejected() {
    let app = TestApp::new();
    let token = app.token();
    let catway = app.create_catway(&token, 7).await;

    for (check_in, check_out) in [("2025-01-20", "2025-01-15"), ("2025-01-20", "2025-01-20")] {
        let reply = app
            .create_reservation(&token, &catway, check_in, check_out)
            .await;
        assert_eq!(reply.status, StatusCode::BAD_REQUEST);
        assert_eq!(reply.body["error"], "invalid_interval");
    }
    assert!(app.state.db.list_reservations().unwrap().is_empty());
}

#[tokio::test]
async fn stored_interval_stays_strictly_ordered() {
    let app = TestApp::new();
    let token = app.token();
    let catway = app.create_catway(&token, 21).await;

    // both ends land in the same stored second
    let reply = app
        .create_reservation(&token, &catway, "2025-01-10T14:30:00.100Z", "2025-01-10T14:30:00.900Z")
        .await;
    assert_eq!(reply.status, StatusCode::BAD_REQUEST);
    assert_eq!(reply.body["error"], "invalid_interval");
    assert!(app.state.db.list_reservations().unwrap().is_empty());

    for (check_in, check_out) in [
        ("2025-01-10T14:30:00.900Z", "2025-01-10T14:30:01.100Z"),
        ("2025-01-10T14:30:00.5", "2025-01-10T14:31"),
        ("2025-01-10", "2025-01-15T12:00"),
    ] {
        let reply = app
            .create_reservation(&token, &catway, check_in, check_out)
            .await;
        assert_eq!(reply.status, StatusCode::CREATED, "{check_in} -> {check_out}");

        let id = reply.body["_id"].as_str().unwrap();
        let stored = app
            .state
            .db
            .get_reservation(id)
            .unwrap()
            .unwrap()
            .into_model()
            .unwrap();
        assert!(stored.check_out > stored.check_in, "{check_in} -> {check_out}");
        assert_eq!(reply.body["checkIn"], json!(stored.check_in));
        assert_eq!(reply.body["checkOut"], json!(stored.check_out));
    }
}

#[tokio::test]
async fn reservation_snapshots_the_catway_number() {
    let app = TestApp::new();
    let token = app.token();
    let catway = app.create_catway(&token, 12).await;

    let reply = app
        .create_reservation(&token, &catway, "2025-01-10", "2025-01-15T12:00")
        .await;
    assert_eq!(reply.status, StatusCode::CREATED);
    assert_eq!(reply.body["catwayNumber"], 12);
    assert_eq!(reply.body["checkIn"], "2025-01-10T00:00:00Z");
    assert_eq!(reply.body["checkOut"], "2025-01-15T12:00:00Z");
    let reservation = reply.body["_id"].as_str().unwrap().to_string();

    let reply = app
        .send(
            Method::PATCH,
            &format!("/api/catways/{catway}"),
            Some(&token),
            Some(json!({ "catwayNumber": 13 })),
        )
        .await;
    assert_eq!(reply.status, StatusCode::OK);

    let reply = app
        .send(
            Method::GET,
            &format!("/api/catways/{catway}/reservations/{reservation}"),
            Some(&token),
            None,
        )
        .await;
    assert_eq!(reply.status, StatusCode::OK);
    assert_eq!(reply.body["catwayNumber"], 12);

    let reply = app
        .send(
            Method::GET,
            &format!("/api/catways/{catway}/reservations"),
            Some(&token),
            None,
        )
        .await;
    assert_eq!(reply.body, json!([]));

    let reply = app.send(Method::GET, "/api/reservations", Some(&token), None).await;
    assert_eq!(reply.body.as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn reservation_body_is_validated_before_catway_lookup() {
    let app = TestApp::new();
    let token = app.token();
    let reply = app
        .send(
            Method::POST,
            "/api/catways/abc123/reservations",
            Some(&token),
            Some(json!({ "clientName": "John Doe", "checkIn": "2025-01-10" })),
        )
        .await;
    assert_eq!(reply.status, StatusCode::BAD_REQUEST);
    assert_eq!(reply.body["error"], "validation_failed");
}

#[tokio::test]
async fn reservation_get_and_delete() {
    let app = TestApp::new();
    let token = app.token();
    let catway = app.create_catway(&token, 3).await;
    let reply = app
        .create_reservation(&token, &catway, "2025-03-01T09:00:00Z", "2025-03-04T18:00:00Z")
        .await;
    let reservation = reply.body["_id"].as_str().unwrap().to_string();
    let path = format!("/api/catways/{catway}/reservations/{reservation}");

    let reply = app
        .send(Method::GET, "/api/catways/abc123/reservations/whatever", Some(&token), None)
        .await;
    assert_eq!(reply.body["error"], "catway_not_found");

    let reply = app
        .send(
            Method::GET,
            &format!("/api/catways/{catway}/reservations/abc123"),
            Some(&token),
            None,
        )
        .await;
    assert_eq!(reply.status, StatusCode::NOT_FOUND);
    assert_eq!(reply.body["error"], "reservation_not_found");

    let reply = app
        .send(Method::GET, "/api/catways/%20/reservations/%20", Some(&token), None)
        .await;
    assert_eq!(reply.status, StatusCode::BAD_REQUEST);
    assert_eq!(reply.body["error"], "missing_identifiers");

    let reply = app.send(Method::DELETE, &path, Some(&token), None).await;
    assert_eq!(reply.status, StatusCode::OK);
    assert!(reply.body["message"].is_string());

    let reply = app.send(Method::DELETE, &path, Some(&token), None).await;
    assert_eq!(reply.status, StatusCode::NOT_FOUND);
    assert_eq!(reply.body["error"], "reservation_not_found");
}
