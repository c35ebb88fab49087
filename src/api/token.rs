// Token API route
//
// Exposes the Token Provider as an HTTP endpoint. The route takes no body;
// credentials come from process configuration and are never echoed back.

use std::sync::Arc;

use log::error;
use rocket::http::Status;
use rocket::post;
use rocket::response::status::Custom;
use rocket::serde::json::Json;
use rocket::State;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::helpers::token_provider::TokenProvider;

#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
}

/// Exchange the configured refresh token for a fresh access token.
///
/// Returns the upstream token payload verbatim on success. Missing
/// configuration and upstream failures both surface as a 500 with an
/// `{error}` body; the caller retries at its own cadence.
#[post("/token")]
pub fn refresh_token(
    provider: &State<Arc<TokenProvider>>,
) -> Result<Json<Value>, Custom<Json<ErrorResponse>>> {
    match provider.refresh() {
        Ok(body) => Ok(Json(body)),
        Err(e) => {
            error!("Token refresh request failed: {}", e);
            Err(Custom(
                Status::InternalServerError,
                Json(ErrorResponse {
                    error: e.to_string(),
                }),
            ))
        }
    }
}
