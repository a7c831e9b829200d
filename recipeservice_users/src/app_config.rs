use paperclip::actix::web;

use crate::handlers;

pub fn config_app(cfg: &mut web::ServiceConfig) {
    cfg.service(web::resource("/health").route(web::get().to(handlers::health)))
        .service(
            web::scope("/api")
                .service(
                    web::scope("/auth")
                        .service(
                            web::resource("/register").route(web::post().to(handlers::register)),
                        )
                        .service(web::resource("/login").route(web::post().to(handlers::login)))
                        .service(web::resource("/me").route(web::get().to(handlers::me))),
                )
                .service(
                    web::resource("/cart")
                        .route(web::get().to(handlers::get_cart))
                        .route(web::post().to(handlers::add_to_cart))
                        .route(web::delete().to(handlers::remove_from_cart)),
                ),
        );
}
