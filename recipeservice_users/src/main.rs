use std::sync::Arc;

use actix_web::{App, HttpServer};
use anyhow::Context;
use paperclip::actix::{web, OpenApiExt};
use serde::Deserialize;
use tracing_actix_web::TracingLogger;

use recipeservice_common::error::{json_error_handler, query_error_handler};
use recipeservice_common::settings::{
    load_settings, settings_builder, AuthSettings, DatabaseSettings, ServerSettings,
};
use recipeservice_common::telemetry::init_telemetry;
use recipeservice_users::app_config::config_app;
use recipeservice_users::recipe_catalog::{HttpRecipeCatalog, RecipeCatalog};
use recipeservice_users::users_repository::{
    InMemoryUsersRepository, PostgresUsersRepository, UsersRepository,
};

#[derive(Debug, Deserialize)]
struct Settings {
    server: ServerSettings,
    database: DatabaseSettings,
    auth: AuthSettings,
    recipes_service_url: String,
}

#[actix_web::main]
async fn main() -> anyhow::Result<()> {
    init_telemetry("recipeservice_users")?;
    let settings: Settings = load_settings(
        settings_builder("users")?
            .set_default("server.port", 8081)?
            .set_default("recipes_service_url", "http://127.0.0.1:8080")?,
    )?;
    let jwt_keys = web::Data::new(settings.auth.jwt_keys()?);

    let users_repository: Arc<dyn UsersRepository> = if settings.database.use_in_memory {
        tracing::info!("Using in-memory users repository");
        Arc::new(InMemoryUsersRepository::default())
    } else {
        Arc::new(PostgresUsersRepository::new(
            settings.database.postgres_config(),
        ))
    };
    let recipe_catalog: Arc<dyn RecipeCatalog> =
        Arc::new(HttpRecipeCatalog::new(&settings.recipes_service_url)?);

    tracing::info!(
        "Starting HTTP server at http://{}:{}, recipes service at {}",
        settings.server.host,
        settings.server.port,
        settings.recipes_service_url
    );
    HttpServer::new(move || {
        App::new()
            .wrap_api()
            .app_data(web::Data::new(users_repository.clone()))
            .app_data(web::Data::new(recipe_catalog.clone()))
            .app_data(jwt_keys.clone())
            .app_data(actix_web::web::JsonConfig::default().error_handler(json_error_handler))
            .app_data(actix_web::web::QueryConfig::default().error_handler(query_error_handler))
            .wrap(TracingLogger::default())
            .configure(config_app)
            .with_json_spec_at("/apispec/v2")
            .build()
    })
    .bind((settings.server.host.as_str(), settings.server.port))
    .context("Failed to bind HTTP server")?
    .run()
    .await
    .context("HTTP server failed")
}
