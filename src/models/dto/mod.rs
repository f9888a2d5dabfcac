pub mod request;
pub mod response;

pub use request::{DistributionDto, GenerateQuizRequestDto};
pub use response::HealthResponse;
