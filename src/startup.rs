use actix_web::dev::Server;
use actix_web::{error::JsonPayloadError, web, App, HttpRequest, HttpServer};
use std::net::TcpListener;

use crate::error::{AppError, ValidationError};
use crate::logger::RequestLogger;
use crate::middleware::SessionGuard;
use crate::routes::{
    current_user, get_user, health_check, login, logout, public_config, refresh, register,
    seed_users, validate_session, whoami,
};
use crate::state::AppState;

fn json_error_handler(err: JsonPayloadError, _req: &HttpRequest) -> actix_web::Error {
    AppError::from(ValidationError::InvalidBody(err.to_string())).into()
}

pub fn run(listener: TcpListener, state: AppState, enable_seed: bool) -> Result<Server, std::io::Error> {
    let state = web::Data::new(state);

    let server = HttpServer::new(move || {
        let app = App::new()
            .wrap(RequestLogger)
            .app_data(state.clone())
            .app_data(web::JsonConfig::default().error_handler(json_error_handler))
            // Public routes
            .route("/health", web::get().to(health_check))
            .route("/config", web::get().to(public_config))
            .service(
                web::scope("/auth")
                    .route("/register", web::post().to(register))
                    .route("/login", web::post().to(login))
                    .route("/logout", web::post().to(logout))
                    .route("/refresh", web::post().to(refresh))
                    .route("/validate-session", web::get().to(validate_session)),
            )
            // Guarded routes
            .service(
                web::scope("/api")
                    .service(
                        web::resource("/me")
                            .wrap(SessionGuard::required(state.clone()))
                            .route(web::get().to(current_user)),
                    )
                    .service(
                        web::resource("/admin/users/{id}")
                            .wrap(SessionGuard::admin(state.clone()))
                            .route(web::get().to(get_user)),
                    )
                    .service(
                        web::resource("/whoami")
                            .wrap(SessionGuard::optional(state.clone()))
                            .route(web::get().to(whoami)),
                    ),
            );

        if enable_seed {
            app.route("/seed", web::post().to(seed_users))
        } else {
            app
        }
    })
    .listen(listener)?
    .run();

    Ok(server)
}
