use std::sync::Arc;

use axum::{
    extract::{
        rejection::{JsonRejection, PathRejection, QueryRejection},
        Path, Query,
    },
    http::{StatusCode, Uri},
    response::Json,
    Extension,
};
use modkit::api::problem::{Problem, ProblemResponse};
use tracing::{error, info};
use uuid::Uuid;

use crate::api::rest::dto::{
    CreateSubscriptionReq, ListSubscriptionsQuery, SubscriptionDto, TotalCostDto, TotalCostQuery,
    UpdateSubscriptionReq,
};
use crate::api::rest::error::{bad_input, map_domain_error, subscription_not_found};
use crate::contract::model::SubscriptionFilter;
use crate::domain::error::DomainError;
use crate::domain::service::Service;

type Svc = Extension<Arc<Service>>;

fn path_id(path: Result<Path<Uuid>, PathRejection>, uri: &Uri) -> Result<Uuid, ProblemResponse> {
    path.map(|Path(id)| id)
        .map_err(|rej| bad_input(rej.body_text(), uri.path()))
}

/// Create a subscription
#[utoipa::path(
    post,
    path = "/subscriptions",
    tag = "subscriptions",
    operation_id = "subscriptions.create",
    request_body = CreateSubscriptionReq,
    responses(
        (status = 201, description = "Created subscription", body = SubscriptionDto),
        (status = 400, description = "Bad Request", body = Problem, content_type = "application/problem+json"),
        (status = 500, description = "Internal Server Error", body = Problem, content_type = "application/problem+json"),
    )
)]
pub async fn create_subscription(
    uri: Uri,
    Extension(svc): Svc,
    body: Result<Json<CreateSubscriptionReq>, JsonRejection>,
) -> Result<(StatusCode, Json<SubscriptionDto>), ProblemResponse> {
    let Json(req) = body.map_err(|rej| bad_input(rej.body_text(), uri.path()))?;
    info!("Creating subscription for user {}", req.user_id);

    match svc.create_subscription(req.into()).await {
        Ok(sub) => Ok((StatusCode::CREATED, Json(SubscriptionDto::from(sub)))),
        Err(e) => {
            error!("Failed to create subscription: {}", e);
            Err(map_domain_error(&e, uri.path()))
        }
    }
}

/// List subscriptions, newest first
#[utoipa::path(
    get,
    path = "/subscriptions",
    tag = "subscriptions",
    operation_id = "subscriptions.list",
    params(ListSubscriptionsQuery),
    responses(
        (status = 200, description = "Matching subscriptions", body = [SubscriptionDto]),
        (status = 400, description = "Bad Request", body = Problem, content_type = "application/problem+json"),
        (status = 500, description = "Internal Server Error", body = Problem, content_type = "application/problem+json"),
    )
)]
pub async fn list_subscriptions(
    uri: Uri,
    Extension(svc): Svc,
    query: Result<Query<ListSubscriptionsQuery>, QueryRejection>,
) -> Result<Json<Vec<SubscriptionDto>>, ProblemResponse> {
    let Query(query) = query.map_err(|rej| bad_input(rej.body_text(), uri.path()))?;
    info!("Listing subscriptions with query: {:?}", query);

    match svc.list_subscriptions(query.into()).await {
        Ok(subs) => Ok(Json(subs.into_iter().map(SubscriptionDto::from).collect())),
        Err(e) => {
            error!("Failed to list subscriptions: {}", e);
            Err(map_domain_error(&e, uri.path()))
        }
    }
}

/// Total price of subscriptions active in a period window
#[utoipa::path(
    get,
    path = "/subscriptions/total-cost",
    tag = "subscriptions",
    operation_id = "subscriptions.total_cost",
    params(TotalCostQuery),
    responses(
        (status = 200, description = "Sum of prices", body = TotalCostDto),
        (status = 400, description = "Bad Request", body = Problem, content_type = "application/problem+json"),
        (status = 500, description = "Internal Server Error", body = Problem, content_type = "application/problem+json"),
    )
)]
pub async fn total_cost(
    uri: Uri,
    Extension(svc): Svc,
    query: Result<Query<TotalCostQuery>, QueryRejection>,
) -> Result<Json<TotalCostDto>, ProblemResponse> {
    let Query(query) = query.map_err(|rej| bad_input(rej.body_text(), uri.path()))?;
    info!("Computing total cost with query: {:?}", query);

    let (Some(from), Some(to)) = (query.period_from.as_deref(), query.period_to.as_deref()) else {
        let field = if query.period_from.is_none() {
            "period_from"
        } else {
            "period_to"
        };
        let e = DomainError::validation(field, "is required");
        return Err(map_domain_error(&e, uri.path()));
    };

    let filter = SubscriptionFilter {
        user_id: query.user_id,
        service_name: query.service_name.clone(),
    };
    match svc.total_cost(filter, from, to).await {
        Ok(total_cost) => Ok(Json(TotalCostDto { total_cost })),
        Err(e) => {
            error!("Failed to compute total cost: {}", e);
            Err(map_domain_error(&e, uri.path()))
        }
    }
}

/// Get a subscription by id
#[utoipa::path(
    get,
    path = "/subscriptions/{id}",
    tag = "subscriptions",
    operation_id = "subscriptions.get",
    params(("id" = Uuid, Path, description = "Subscription id")),
    responses(
        (status = 200, description = "Subscription found", body = SubscriptionDto),
        (status = 404, description = "Not Found", body = Problem, content_type = "application/problem+json"),
        (status = 500, description = "Internal Server Error", body = Problem, content_type = "application/problem+json"),
    )
)]
pub async fn get_subscription(
    uri: Uri,
    Extension(svc): Svc,
    path: Result<Path<Uuid>, PathRejection>,
) -> Result<Json<SubscriptionDto>, ProblemResponse> {
    let id = path_id(path, &uri)?;
    info!("Getting subscription {}", id);

    match svc.get_subscription(id).await {
        Ok(Some(sub)) => Ok(Json(SubscriptionDto::from(sub))),
        Ok(None) => Err(subscription_not_found(id, uri.path())),
        Err(e) => {
            error!("Failed to get subscription {}: {}", id, e);
            Err(map_domain_error(&e, uri.path()))
        }
    }
}

/// Partially update a subscription
#[utoipa::path(
    put,
    path = "/subscriptions/{id}",
    tag = "subscriptions",
    operation_id = "subscriptions.update",
    params(("id" = Uuid, Path, description = "Subscription id")),
    request_body = UpdateSubscriptionReq,
    responses(
        (status = 200, description = "Updated subscription", body = SubscriptionDto),
        (status = 400, description = "Bad Request", body = Problem, content_type = "application/problem+json"),
        (status = 404, description = "Not Found", body = Problem, content_type = "application/problem+json"),
        (status = 500, description = "Internal Server Error", body = Problem, content_type = "application/problem+json"),
    )
)]
pub async fn update_subscription(
    uri: Uri,
    Extension(svc): Svc,
    path: Result<Path<Uuid>, PathRejection>,
    body: Result<Json<UpdateSubscriptionReq>, JsonRejection>,
) -> Result<Json<SubscriptionDto>, ProblemResponse> {
    let id = path_id(path, &uri)?;
    let Json(req) = body.map_err(|rej| bad_input(rej.body_text(), uri.path()))?;
    info!("Updating subscription {} with: {:?}", id, req);

    match svc.update_subscription(id, req.into()).await {
        Ok(Some(sub)) => Ok(Json(SubscriptionDto::from(sub))),
        Ok(None) => Err(subscription_not_found(id, uri.path())),
        Err(e) => {
            error!("Failed to update subscription {}: {}", id, e);
            Err(map_domain_error(&e, uri.path()))
        }
    }
}

/// Delete a subscription
#[utoipa::path(
    delete,
    path = "/subscriptions/{id}",
    tag = "subscriptions",
    operation_id = "subscriptions.delete",
    params(("id" = Uuid, Path, description = "Subscription id")),
    responses(
        (status = 204, description = "Deleted"),
        (status = 404, description = "Not Found", body = Problem, content_type = "application/problem+json"),
        (status = 500, description = "Internal Server Error", body = Problem, content_type = "application/problem+json"),
    )
)]
pub async fn delete_subscription(
    uri: Uri,
    Extension(svc): Svc,
    path: Result<Path<Uuid>, PathRejection>,
) -> Result<StatusCode, ProblemResponse> {
    let id = path_id(path, &uri)?;
    info!("Deleting subscription {}", id);

    match svc.delete_subscription(id).await {
        Ok(true) => Ok(StatusCode::NO_CONTENT),
        Ok(false) => Err(subscription_not_found(id, uri.path())),
        Err(e) => {
            error!("Failed to delete subscription {}: {}", id, e);
            Err(map_domain_error(&e, uri.path()))
        }
    }
}
