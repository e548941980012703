use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;

use crate::contract::model::{NewSubscription, Subscription, SubscriptionFilter, SubscriptionPatch};

/// REST representation of a subscription; periods are `MM-YYYY`.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct SubscriptionDto {
    pub id: Uuid,
    #[schema(example = "Yandex Plus")]
    pub service_name: String,
    #[schema(example = 400)]
    pub price: i32,
    pub user_id: Uuid,
    #[schema(example = "07-2025")]
    pub start_date: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[schema(example = "12-2025")]
    pub end_date: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct CreateSubscriptionReq {
    #[schema(example = "Yandex Plus")]
    pub service_name: String,
    #[schema(minimum = 1, example = 400)]
    pub price: i32,
    pub user_id: Uuid,
    #[schema(example = "07-2025")]
    pub start_date: String,
    #[serde(default)]
    #[schema(example = "12-2025")]
    pub end_date: Option<String>,
}

/// Partial update; omitted (or null) fields are left as stored. Unknown keys,
/// `user_id` included, are ignored.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema, Default)]
pub struct UpdateSubscriptionReq {
    #[serde(default)]
    pub service_name: Option<String>,
    #[serde(default)]
    #[schema(minimum = 1)]
    pub price: Option<i32>,
    #[serde(default)]
    pub start_date: Option<String>,
    #[serde(default)]
    pub end_date: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct ListSubscriptionsQuery {
    /// Exact owner match.
    pub user_id: Option<Uuid>,
    /// Case-insensitive substring of the service name.
    pub service_name: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct TotalCostQuery {
    pub user_id: Option<Uuid>,
    pub service_name: Option<String>,
    /// Window start, `MM-YYYY`. Required.
    pub period_from: Option<String>,
    /// Window end, `MM-YYYY`, inclusive. Required.
    pub period_to: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct TotalCostDto {
    #[schema(example = 1200)]
    pub total_cost: i64,
}

impl From<Subscription> for SubscriptionDto {
    fn from(s: Subscription) -> Self {
        Self {
            id: s.id,
            service_name: s.service_name,
            price: s.price,
            user_id: s.user_id,
            start_date: s.start_date.to_string(),
            end_date: s.end_date.map(|p| p.to_string()),
            created_at: s.created_at,
            updated_at: s.updated_at,
        }
    }
}

impl From<CreateSubscriptionReq> for NewSubscription {
    fn from(req: CreateSubscriptionReq) -> Self {
        Self {
            service_name: req.service_name,
            price: req.price,
            user_id: req.user_id,
            start_date: req.start_date,
            end_date: req.end_date,
        }
    }
}

impl From<UpdateSubscriptionReq> for SubscriptionPatch {
    fn from(req: UpdateSubscriptionReq) -> Self {
        Self {
            service_name: req.service_name,
            price: req.price,
            start_date: req.start_date,
            end_date: req.end_date,
        }
    }
}

impl From<ListSubscriptionsQuery> for SubscriptionFilter {
    fn from(q: ListSubscriptionsQuery) -> Self {
        Self {
            user_id: q.user_id,
            service_name: q.service_name,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn dto_formats_periods_and_omits_missing_end() {
        let now = Utc::now();
        let sub = Subscription {
            id: Uuid::new_v4(),
            service_name: "Netflix".into(),
            price: 799,
            user_id: Uuid::new_v4(),
            start_date: "03-2025".parse().unwrap(),
            end_date: None,
            created_at: now,
            updated_at: now,
        };

        let json = serde_json::to_value(SubscriptionDto::from(sub.clone())).unwrap();
        assert_eq!(json["start_date"], "03-2025");
        assert_eq!(json["price"], 799);
        assert!(json.get("end_date").is_none());

        let with_end = Subscription {
            end_date: Some("09-2025".parse().unwrap()),
            ..sub
        };
        let json = serde_json::to_value(SubscriptionDto::from(with_end)).unwrap();
        assert_eq!(json["end_date"], "09-2025");
    }

    #[test]
    fn update_request_accepts_partial_bodies() {
        let req: UpdateSubscriptionReq = serde_json::from_str(r#"{"price": 5}"#).unwrap();
        let patch = SubscriptionPatch::from(req);
        assert_eq!(patch.price, Some(5));
        assert!(patch.start_date.is_none());

        let req: UpdateSubscriptionReq = serde_json::from_str("{}").unwrap();
        assert_eq!(SubscriptionPatch::from(req), SubscriptionPatch::default());
    }
}
