mod auth;
mod health_check;

pub use auth::{login, logout, me, refresh, signup, CookiePolicy, REFRESH_COOKIE};
pub use health_check::health_check;
