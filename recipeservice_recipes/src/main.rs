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
use recipeservice_recipes::app_config::config_app;
use recipeservice_recipes::recipes_repository::{
    InMemoryRecipesRepository, PostgresRecipesRepository, RecipesRepository,
};

#[derive(Debug, Deserialize)]
struct Settings {
    server: ServerSettings,
    database: DatabaseSettings,
    auth: AuthSettings,
}

#[actix_web::main]
async fn main() -> anyhow::Result<()> {
    init_telemetry("recipeservice_recipes")?;
    let settings: Settings = load_settings(settings_builder("recipes")?)?;
    let jwt_keys = web::Data::new(settings.auth.jwt_keys()?);

    let recipes_repository: Arc<dyn RecipesRepository> = if settings.database.use_in_memory {
        tracing::info!("Using in-memory recipes repository");
        Arc::new(InMemoryRecipesRepository::default())
    } else {
        Arc::new(PostgresRecipesRepository::new(
            settings.database.postgres_config(),
        ))
    };

    tracing::info!(
        "Starting HTTP server at http://{}:{}",
        settings.server.host,
        settings.server.port
    );
    HttpServer::new(move || {
        App::new()
            .wrap_api()
            .app_data(web::Data::new(recipes_repository.clone()))
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
