//! RFC 9457 Problem Details, the error body of every REST module.

use axum::{
    http::{header, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

pub const APPLICATION_PROBLEM_JSON: &str = "application/problem+json";

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[schema(
    title = "Problem",
    description = "RFC 9457 Problem Details for HTTP APIs"
)]
pub struct Problem {
    /// Problem type URI; `about:blank` unless the problem carries a code.
    #[serde(rename = "type")]
    pub type_url: String,
    pub title: String,
    pub status: u16,
    pub detail: String,
    /// Request path the problem occurred on.
    pub instance: String,
    /// Stable machine-readable code, e.g. `SUBSCRIPTIONS_VALIDATION`.
    pub code: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub errors: Vec<ValidationError>,
}

/// One offending input location.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[schema(title = "ValidationError")]
pub struct ValidationError {
    pub detail: String,
    /// JSON Pointer into the request, e.g. `/start_date`.
    pub pointer: String,
}

impl Problem {
    pub fn new(status: StatusCode, title: impl Into<String>, detail: impl Into<String>) -> Self {
        Self {
            type_url: "about:blank".to_string(),
            title: title.into(),
            status: status.as_u16(),
            detail: detail.into(),
            instance: String::new(),
            code: String::new(),
            errors: Vec::new(),
        }
    }

    /// Sets `code` and derives `type` as `{type_base}/{code}`.
    pub fn coded(mut self, type_base: &str, code: impl Into<String>) -> Self {
        self.code = code.into();
        self.type_url = format!("{}/{}", type_base.trim_end_matches('/'), self.code);
        self
    }

    pub fn at(mut self, instance: impl Into<String>) -> Self {
        self.instance = instance.into();
        self
    }

    /// Adds an error pointing at a top-level request field.
    pub fn field_error(mut self, field: &str, detail: impl Into<String>) -> Self {
        self.errors.push(ValidationError {
            detail: detail.into(),
            pointer: format!("/{field}"),
        });
        self
    }

    pub fn status_code(&self) -> StatusCode {
        StatusCode::from_u16(self.status).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR)
    }
}

/// Handler error type: renders the problem with its status and content type.
#[derive(Debug, Clone)]
pub struct ProblemResponse(pub Problem);

impl From<Problem> for ProblemResponse {
    fn from(p: Problem) -> Self {
        Self(p)
    }
}

impl IntoResponse for ProblemResponse {
    fn into_response(self) -> Response {
        let status = self.0.status_code();
        let mut resp = (status, axum::Json(self.0)).into_response();
        resp.headers_mut().insert(
            header::CONTENT_TYPE,
            HeaderValue::from_static(APPLICATION_PROBLEM_JSON),
        );
        resp
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn response_carries_status_and_problem_content_type() {
        let p = Problem::new(StatusCode::NOT_FOUND, "Not Found", "no such subscription");
        let resp = ProblemResponse::from(p).into_response();
        assert_eq!(resp.status(), StatusCode::NOT_FOUND);
        assert_eq!(
            resp.headers().get(header::CONTENT_TYPE).unwrap(),
            APPLICATION_PROBLEM_JSON
        );
    }

    #[test]
    fn coded_problem_with_field_errors() {
        let p = Problem::new(
            StatusCode::BAD_REQUEST,
            "Validation error",
            "end_date must be after start_date",
        )
        .coded("https://errors.example.com/", "SUBSCRIPTIONS_VALIDATION")
        .at("/subscriptions")
        .field_error("end_date", "must be after start_date");

        assert_eq!(p.type_url, "https://errors.example.com/SUBSCRIPTIONS_VALIDATION");
        assert_eq!(p.code, "SUBSCRIPTIONS_VALIDATION");
        assert_eq!(p.instance, "/subscriptions");
        assert_eq!(p.errors[0].pointer, "/end_date");
    }

    #[test]
    fn json_shape() {
        let v = serde_json::to_value(Problem::new(StatusCode::CONFLICT, "Conflict", "x")).unwrap();
        assert_eq!(v["type"], "about:blank");
        assert_eq!(v["status"], 409);
        assert!(v.get("errors").is_none());
    }

    #[test]
    fn unknown_status_renders_as_500() {
        let mut p = Problem::new(StatusCode::BAD_REQUEST, "Bad Request", "x");
        p.status = 1000;
        assert_eq!(p.status_code(), StatusCode::INTERNAL_SERVER_ERROR);
    }
}
