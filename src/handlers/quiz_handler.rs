use actix_web::{get, post, web, HttpRequest, HttpResponse};
use tokio_util::sync::CancellationToken;
use uuid::Uuid;
use validator::Validate;

use crate::{
    app_state::AppState,
    errors::AppError,
    middleware::get_request_id,
    models::{
        domain::GenerationRequest,
        dto::{GenerateQuizRequestDto, HealthResponse},
    },
};

/// Runs the generation pipeline for one request. The run is cancelled if the
/// client goes away before it finishes.
#[post("/api/quizzes/generate")]
async fn generate_quiz(
    req: HttpRequest,
    state: web::Data<AppState>,
    request: web::Json<GenerateQuizRequestDto>,
) -> Result<HttpResponse, AppError> {
    let request = request.into_inner();
    request.validate()?;

    let run_id = get_request_id(&req).unwrap_or_else(|| Uuid::new_v4().to_string());
    let cancel = CancellationToken::new();
    let _cancel_on_drop = cancel.clone().drop_guard();

    let generation: GenerationRequest = request.into();
    let result = state
        .generation_service
        .generate(run_id, &generation, cancel)
        .await?;
    Ok(HttpResponse::Ok().json(result))
}

#[get("/health")]
async fn health_check(state: web::Data<AppState>) -> HttpResponse {
    HttpResponse::Ok().json(HealthResponse::ok(state.generation_service.provider_name()))
}
