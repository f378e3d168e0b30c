/// Middleware module
///
/// Bearer access token verification for protected routes.

mod jwt_middleware;

pub use jwt_middleware::JwtMiddleware;
