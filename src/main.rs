use actix_web::{middleware::Logger, web, App, HttpServer};

use quizsmith::{app_state::AppState, config::Config, handlers, middleware::RequestIdMiddleware};

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    dotenvy::dotenv().ok();
    env_logger::init_from_env(env_logger::Env::default().default_filter_or("info"));

    let config = Config::from_env().map_err(std::io::Error::other)?;
    config
        .validate_for_production()
        .map_err(std::io::Error::other)?;

    let bind_address = (config.web_server_host.clone(), config.web_server_port);
    log::info!(
        "Starting quiz generation server on {}:{} ({} concurrent generation(s))",
        bind_address.0,
        bind_address.1,
        config.max_concurrent_generations
    );

    let state = AppState::new(config);

    HttpServer::new(move || {
        App::new()
            .app_data(web::Data::new(state.clone()))
            .configure(handlers::configure)
            .app_data(handlers::json_config(
                state.config.pipeline.max_content_length * 4 + 16 * 1024,
            ))
            .wrap(Logger::default())
            .wrap(RequestIdMiddleware)
    })
    .bind(bind_address)?
    .run()
    .await
}
