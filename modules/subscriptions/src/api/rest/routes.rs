use std::sync::Arc;

use axum::{routing::get, Extension, Router};
use modkit::OpenApiRegistry;
use utoipa::OpenApi;

use crate::api::rest::{handlers, openapi::SubscriptionsApiDoc};
use crate::domain::service::Service;

pub fn register_routes(
    router: Router,
    openapi: &dyn OpenApiRegistry,
    service: Arc<Service>,
) -> anyhow::Result<Router> {
    openapi.register_openapi(SubscriptionsApiDoc::openapi());

    let routes = Router::new()
        .route(
            "/subscriptions",
            get(handlers::list_subscriptions).post(handlers::create_subscription),
        )
        .route("/subscriptions/total-cost", get(handlers::total_cost))
        .route(
            "/subscriptions/{id}",
            get(handlers::get_subscription)
                .put(handlers::update_subscription)
                .delete(handlers::delete_subscription),
        )
        .layer(Extension(service));

    Ok(router.merge(routes))
}
