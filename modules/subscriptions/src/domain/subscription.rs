//! Validation and construction rules for subscription records.

use uuid::Uuid;

use crate::contract::model::{NewSubscription, SubscriptionPatch};
use crate::domain::error::DomainError;
use crate::domain::period::Period;

pub const MIN_PRICE: i32 = 1;

/// Width of the `service_name` column; the configurable limit never exceeds it.
pub const SERVICE_NAME_COLUMN_LEN: usize = 255;

/// A validated subscription ready to be stored. Timestamps are assigned by storage.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewSubscriptionRecord {
    pub id: Uuid,
    pub service_name: String,
    pub price: i32,
    pub user_id: Uuid,
    pub start_date: Period,
    pub end_date: Option<Period>,
}

/// Typed change set for a partial update: one slot per mutable column.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct SubscriptionChanges {
    pub service_name: Option<String>,
    pub price: Option<i32>,
    pub start_date: Option<Period>,
    pub end_date: Option<Period>,
}

impl SubscriptionChanges {
    pub fn is_empty(&self) -> bool {
        self.service_name.is_none()
            && self.price.is_none()
            && self.start_date.is_none()
            && self.end_date.is_none()
    }
}

#[derive(Debug, Clone)]
pub struct EntityRules {
    max_service_name_length: usize,
}

impl EntityRules {
    pub fn new(max_service_name_length: usize) -> Self {
        Self {
            max_service_name_length: max_service_name_length.min(SERVICE_NAME_COLUMN_LEN),
        }
    }

    pub fn build_new(&self, input: NewSubscription) -> Result<NewSubscriptionRecord, DomainError> {
        self.check_service_name(&input.service_name)?;
        check_price(input.price)?;

        let start_date = Period::parse_field("start_date", &input.start_date)?;
        let end_date = input
            .end_date
            .as_deref()
            .map(|raw| Period::parse_field("end_date", raw))
            .transpose()?;
        check_interval(start_date, end_date)?;

        Ok(NewSubscriptionRecord {
            id: Uuid::new_v4(),
            service_name: input.service_name,
            price: input.price,
            user_id: input.user_id,
            start_date,
            end_date,
        })
    }

    /// Validates each supplied field on its own. Start and end are checked
    /// against each other only when both are in the same patch.
    pub fn apply_patch(&self, patch: SubscriptionPatch) -> Result<SubscriptionChanges, DomainError> {
        if let Some(name) = &patch.service_name {
            self.check_service_name(name)?;
        }
        if let Some(price) = patch.price {
            check_price(price)?;
        }
        let start_date = patch
            .start_date
            .as_deref()
            .map(|raw| Period::parse_field("start_date", raw))
            .transpose()?;
        let end_date = patch
            .end_date
            .as_deref()
            .map(|raw| Period::parse_field("end_date", raw))
            .transpose()?;
        if let Some(start) = start_date {
            check_interval(start, end_date)?;
        }

        Ok(SubscriptionChanges {
            service_name: patch.service_name,
            price: patch.price,
            start_date,
            end_date,
        })
    }

    fn check_service_name(&self, name: &str) -> Result<(), DomainError> {
        if name.trim().is_empty() {
            return Err(DomainError::validation("service_name", "must not be empty"));
        }
        let len = name.chars().count();
        if len > self.max_service_name_length {
            return Err(DomainError::validation(
                "service_name",
                format!(
                    "too long: {len} characters (max: {})",
                    self.max_service_name_length
                ),
            ));
        }
        Ok(())
    }
}

impl Default for EntityRules {
    fn default() -> Self {
        Self::new(SERVICE_NAME_COLUMN_LEN)
    }
}

fn check_price(price: i32) -> Result<(), DomainError> {
    if price < MIN_PRICE {
        return Err(DomainError::validation(
            "price",
            format!("must be at least {MIN_PRICE}"),
        ));
    }
    Ok(())
}

fn check_interval(start: Period, end: Option<Period>) -> Result<(), DomainError> {
    match end {
        Some(end) if end <= start => Err(DomainError::validation(
            "end_date",
            "end_date must be after start_date",
        )),
        _ => Ok(()),
    }
}
