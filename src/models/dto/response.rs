use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub provider: String,
}

impl HealthResponse {
    pub fn ok(provider: &str) -> Self {
        Self {
            status: "ok".to_string(),
            provider: provider.to_string(),
        }
    }
}
