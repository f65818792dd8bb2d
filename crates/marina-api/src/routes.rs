use axum::{
    Router, middleware,
    routing::{get, post},
};

use crate::auth::{self, AppState};
use crate::middleware::require_auth;
use crate::{catways, reservations, users};

/// Every API route. Everything outside `/api/auth` goes through the token
/// gate and answers with a rotated token.
pub fn router(state: AppState) -> Router {
    let public_routes = Router::new()
        .route("/api/auth/authenticate", post(auth::login))
        .route("/api/auth/me", get(auth::me))
        .route("/api/auth/register", post(users::create));

    let protected_routes = Router::new()
        .route("/api/users", get(users::list).post(users::create))
        .route(
            "/api/users/{id}",
            get(users::get).put(users::update).delete(users::delete),
        )
        .route("/api/catways", get(catways::list).post(catways::create))
        .route(
            "/api/catways/{id}",
            get(catways::get)
                .put(catways::replace)
                .patch(catways::patch)
                .delete(catways::delete),
        )
        .route(
            "/api/catways/{id}/reservations",
            get(reservations::list_for_catway).post(reservations::create),
        )
        .route(
            "/api/catways/{id}/reservations/{reservation_id}",
            get(reservations::get).delete(reservations::delete),
        )
        .route("/api/reservations", get(reservations::list))
        .route_layer(middleware::from_fn_with_state(state.clone(), require_auth));

    Router::new()
        .merge(public_routes)
        .merge(protected_routes)
        .with_state(state)
}
