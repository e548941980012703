use axum::http::StatusCode;
use modkit::api::problem::{Problem, ProblemResponse};
use uuid::Uuid;

use crate::domain::error::DomainError;

pub const CODE_INVALID_PERIOD: &str = "SUBSCRIPTIONS_INVALID_PERIOD";
pub const CODE_VALIDATION: &str = "SUBSCRIPTIONS_VALIDATION";
pub const CODE_NOT_FOUND: &str = "SUBSCRIPTIONS_NOT_FOUND";
pub const CODE_INTERNAL_DB: &str = "INTERNAL_DB";

const ERROR_TYPE_BASE: &str = "https://errors.example.com";

fn problem(
    status: StatusCode,
    code: &str,
    title: &str,
    detail: impl Into<String>,
    instance: &str,
) -> Problem {
    Problem::new(status, title, detail)
        .coded(ERROR_TYPE_BASE, code)
        .at(instance)
}

/// Map domain error to RFC 9457 ProblemResponse
pub fn map_domain_error(e: &DomainError, instance: &str) -> ProblemResponse {
    let problem = match e {
        DomainError::InvalidPeriodFormat { field, .. } => problem(
            StatusCode::BAD_REQUEST,
            CODE_INVALID_PERIOD,
            "Invalid period",
            e.to_string(),
            instance,
        )
        .field_error(field, "expected MM-YYYY"),
        DomainError::Validation { field, message } => problem(
            StatusCode::BAD_REQUEST,
            CODE_VALIDATION,
            "Validation error",
            e.to_string(),
            instance,
        )
        .field_error(field, message.clone()),
        DomainError::Database { .. } => {
            // Internal details are logged, never returned.
            tracing::error!(error = ?e, "Database error occurred");
            problem(
                StatusCode::INTERNAL_SERVER_ERROR,
                CODE_INTERNAL_DB,
                "Internal error",
                "An internal database error occurred",
                instance,
            )
        }
    };
    problem.into()
}

pub fn subscription_not_found(id: Uuid, instance: &str) -> ProblemResponse {
    problem(
        StatusCode::NOT_FOUND,
        CODE_NOT_FOUND,
        "Subscription not found",
        format!("Subscription with id {id} was not found"),
        instance,
    )
    .into()
}

/// Malformed body, query string or path parameter.
pub fn bad_input(detail: impl Into<String>, instance: &str) -> ProblemResponse {
    problem(
        StatusCode::BAD_REQUEST,
        CODE_VALIDATION,
        "Invalid request",
        detail,
        instance,
    )
    .into()
}
