pub mod auth;
pub mod catways;
pub mod error;
pub mod middleware;
pub mod password;
pub mod reservations;
pub mod routes;
pub mod session;
pub mod users;
pub mod validation;
