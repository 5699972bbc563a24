//! HTTP helpers for the Lambda handlers.

use lambda_http::{Body, Response};
use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::Error;

/// A failure as shown to the editor: where it happened and what went wrong.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ErrorBody {
    pub step: String,
    pub message: String,
}

/// Standard API response wrapper.
#[derive(Debug, Serialize)]
pub struct ApiResponse<T> {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<ErrorBody>,
}

impl<T> ApiResponse<T> {
    pub fn success(data: T) -> Self {
        Self {
            success: true,
            data: Some(data),
            error: None,
        }
    }

    /// Failure response, optionally carrying data such as session state.
    pub fn failure(step: impl Into<String>, message: impl Into<String>, data: Option<T>) -> Self {
        Self {
            success: false,
            data,
            error: Some(ErrorBody {
                step: step.into(),
                message: message.into(),
            }),
        }
    }
}

/// Create a JSON response with the given status code and data.
pub fn json_response<T: Serialize>(
    status: u16,
    data: &T,
) -> Result<Response<Body>, lambda_http::Error> {
    Ok(Response::builder()
        .status(status)
        .header("content-type", "application/json")
        .body(Body::from(serde_json::to_string(data)?))?)
}

/// Create an error response with the given status code, step and message.
pub fn error_response(
    status: u16,
    step: &str,
    message: impl Into<String>,
) -> Result<Response<Body>, lambda_http::Error> {
    json_response(status, &ApiResponse::<()>::failure(step, message, None))
}

/// Map a pipeline error to its status code, step and message.
pub fn pipeline_error_response(err: &Error) -> Result<Response<Body>, lambda_http::Error> {
    error_response(err.status_code(), err.step(), err.to_string())
}

/// Parse request body as JSON, returning a 400 response on failure.
///
/// Returns `Ok(Ok(T))` on successful parse, `Ok(Err(Response))` on parse error (400),
/// or `Err(lambda_http::Error)` on serialization failure.
pub fn parse_json_body<T: DeserializeOwned>(
    body: &Body,
) -> Result<Result<T, Response<Body>>, lambda_http::Error> {
    match serde_json::from_slice(body.as_ref()) {
        Ok(parsed) => Ok(Ok(parsed)),
        Err(e) => {
            let response = error_response(400, "request", format!("Invalid request body: {}", e))?;
            Ok(Err(response))
        }
    }
}

/// Parse request body, returning early with 400 on parse error.
///
/// ```ignore
/// let request: GenerateRequest = parse_body!(event.body());
/// ```
#[macro_export]
macro_rules! parse_body {
    ($body:expr) => {
        match $crate::http::parse_json_body($body)? {
            Ok(parsed) => parsed,
            Err(response) => return Ok(response),
        }
    };
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_body_shape() {
        let response: ApiResponse<()> =
            ApiResponse::failure("engine_timeout", "Content engine did not respond within 300 seconds", None);
        assert_eq!(
            serde_json::to_value(&response).unwrap(),
            serde_json::json!({
                "success": false,
                "error": {
                    "step": "engine_timeout",
                    "message": "Content engine did not respond within 300 seconds"
                }
            })
        );
    }

    #[test]
    fn test_pipeline_error_status() {
        let response = pipeline_error_response(&Error::NotFound("category 'x'".to_string())).unwrap();
        assert_eq!(response.status(), 404);
    }

    #[test]
    fn test_invalid_body_is_400() {
        let body = Body::from("{not json");
        let parsed: Result<serde_json::Value, _> = parse_json_body(&body).unwrap();
        assert_eq!(parsed.unwrap_err().status(), 400);
    }
}
