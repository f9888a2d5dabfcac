pub mod quiz_handler;

use actix_web::{error::JsonPayloadError, web, HttpRequest};

use crate::{
    errors::{AppError, PipelineError, StageFailure},
    models::domain::PipelineStage,
};

pub use quiz_handler::{generate_quiz, health_check};

const DEFAULT_JSON_LIMIT: usize = 256 * 1024;

pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.app_data(json_config(DEFAULT_JSON_LIMIT))
        .service(generate_quiz)
        .service(health_check);
}

/// JSON body settings for the API. A body that cannot be read is reported in
/// the same failure shape as any other rejected request.
pub fn json_config(limit: usize) -> web::JsonConfig {
    web::JsonConfig::default()
        .limit(limit)
        .error_handler(|err: JsonPayloadError, _req: &HttpRequest| {
            log::warn!("Rejected request body: {}", err);
            AppError::Pipeline(StageFailure::new(
                PipelineStage::Created,
                PipelineError::InvalidInput(err.to_string()),
            ))
            .into()
        })
}
