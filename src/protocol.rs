//! Public protocol structs for the HTTP endpoints (serde ready).
//! Keep this small and stable to evolve backend and frontend independently.

use std::collections::BTreeMap;

use serde::Serialize;

use crate::domain::GenerationResult;

#[derive(Debug, Serialize)]
pub struct GenerateExamOut {
    pub success: bool,
    pub exam: GenerationResult,
}

/// Body for request validation failures: field path → messages.
#[derive(Debug, Serialize)]
pub struct ValidationErrorOut {
    pub success: bool,
    pub message: String,
    pub errors: BTreeMap<String, Vec<String>>,
}

#[derive(Debug, Serialize)]
pub struct ErrorOut {
    pub success: bool,
    pub message: String,
}

#[derive(Serialize)]
pub struct HealthOut {
    pub ok: bool,
    pub oracle_configured: bool,
}
