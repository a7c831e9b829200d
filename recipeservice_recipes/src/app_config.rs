use paperclip::actix::web;

use crate::handlers;

pub fn config_app(cfg: &mut web::ServiceConfig) {
    cfg.service(web::resource("/health").route(web::get().to(handlers::health)))
        .service(
            web::scope("/api")
                .service(web::resource("/cuisines").route(web::get().to(handlers::list_cuisines)))
                .service(
                    web::scope("/recipes")
                        .service(
                            web::resource("")
                                .route(web::get().to(handlers::list_recipes))
                                .route(web::post().to(handlers::create_recipe)),
                        )
                        .service(
                            web::scope("/{recipe_id}")
                                .service(
                                    web::resource("")
                                        .route(web::get().to(handlers::get_recipe))
                                        .route(web::put().to(handlers::update_recipe))
                                        .route(web::delete().to(handlers::delete_recipe)),
                                )
                                .service(
                                    web::resource("/like")
                                        .route(web::post().to(handlers::toggle_like)),
                                )
                                .service(
                                    web::resource("/rating")
                                        .route(web::post().to(handlers::rate_recipe))
                                        .route(web::delete().to(handlers::remove_rating)),
                                )
                                .service(
                                    web::resource("/comments")
                                        .route(web::get().to(handlers::list_comments))
                                        .route(web::post().to(handlers::add_comment)),
                                )
                                .service(
                                    web::resource("/comments/{comment_id}")
                                        .route(web::delete().to(handlers::delete_comment)),
                                ),
                        ),
                ),
        );
}
