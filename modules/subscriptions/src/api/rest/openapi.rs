use modkit::api::problem::{Problem, ValidationError};
use utoipa::OpenApi;

use crate::api::rest::{dto, handlers};

#[derive(OpenApi)]
#[openapi(
    paths(
        handlers::create_subscription,
        handlers::list_subscriptions,
        handlers::total_cost,
        handlers::get_subscription,
        handlers::update_subscription,
        handlers::delete_subscription,
    ),
    components(schemas(
        dto::SubscriptionDto,
        dto::CreateSubscriptionReq,
        dto::UpdateSubscriptionReq,
        dto::TotalCostDto,
        Problem,
        ValidationError,
    )),
    tags((name = "subscriptions", description = "Subscription ledger"))
)]
pub struct SubscriptionsApiDoc;
