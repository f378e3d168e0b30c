pub mod auth;
pub mod configuration;
pub mod error;
pub mod logger;
pub mod middleware;
pub mod revocation;
pub mod routes;
pub mod session;
pub mod startup;
pub mod telemetry;
pub mod users;
pub mod validators;
