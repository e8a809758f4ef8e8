pub mod auth;
pub mod comments;
pub mod error;
pub mod middleware;
pub mod reviews;
pub mod routes;
pub mod votes;
