use actix_web::dev::Server;
use actix_web::{web, App, HttpServer};
use std::net::TcpListener;

use crate::error::{AppError, ValidationError};
use crate::logger::RequestLogger;
use crate::middleware::JwtMiddleware;
use crate::routes::{health_check, login, logout, me, refresh, signup, CookiePolicy};
use crate::session::SessionFacade;

/// Assemble the HTTP server around an already-built session facade
pub fn run(
    listener: TcpListener,
    sessions: web::Data<SessionFacade>,
    cookies: CookiePolicy,
) -> Result<Server, std::io::Error> {
    let cookies = web::Data::new(cookies);

    let server = HttpServer::new(move || {
        let tokens = sessions.tokens().clone();

        App::new()
            .wrap(RequestLogger)
            .app_data(sessions.clone())
            .app_data(cookies.clone())
            .app_data(web::JsonConfig::default().error_handler(|err, _req| {
                tracing::debug!(error = %err, "Rejected request body");
                AppError::from(ValidationError::InvalidFormat("request body".to_string())).into()
            }))
            .route("/health_check", web::get().to(health_check))
            .service(
                web::scope("/auth")
                    .route("/signup", web::post().to(signup))
                    .route("/login", web::post().to(login))
                    .route("/refresh", web::post().to(refresh))
                    .route("/logout", web::post().to(logout))
                    .service(
                        web::resource("/me")
                            .wrap(JwtMiddleware::new(tokens))
                            .route(web::get().to(me)),
                    ),
            )
    })
    .listen(listener)?
    .run();

    Ok(server)
}
