pub mod auth;
pub mod authz;
pub mod jwt;
pub mod middleware;
