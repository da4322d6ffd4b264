//! Orders and payments client.
//!
//! Thin typed wrapper over the Orders Resource. The server owns pricing,
//! availability limits and the payment state machine; the checks here only
//! reject requests the server is known to refuse.

use chrono::NaiveDate;
use serde::Serialize;
use tracing::instrument;

use crate::api::{ApiClient, ApiError};
use crate::models::{Availability, CreateOrderRequest, Order, PaymentPreference, PaymentStatusReport};

/// Widest date range `GET /orders/availability` accepts.
pub const MAX_AVAILABILITY_RANGE_DAYS: i64 = 365;

#[derive(Serialize)]
struct AvailabilityQuery {
    from_date: NaiveDate,
    to_date: NaiveDate,
}

/// Client for orders and payment handoff.
#[derive(Debug, Clone)]
pub struct OrdersClient {
    api: ApiClient,
}

impl OrdersClient {
    #[must_use]
    pub const fn new(api: ApiClient) -> Self {
        Self { api }
    }

    /// Reserved units vs. capacity for each day in `from..=to`.
    ///
    /// # Errors
    ///
    /// Returns `ApiError::InvalidRequest` if `from` is after `to` or the
    /// range spans more than [`MAX_AVAILABILITY_RANGE_DAYS`], otherwise any
    /// transport or API error.
    #[instrument(skip(self), fields(from = %from, to = %to))]
    pub async fn availability(
        &self,
        from: NaiveDate,
        to: NaiveDate,
    ) -> Result<Availability, ApiError> {
        check_availability_range(from, to)?;
        self.api
            .get_with_query(
                "/orders/availability",
                &AvailabilityQuery {
                    from_date: from,
                    to_date: to,
                },
            )
            .await
    }

    /// Place an order from the current session's cart.
    ///
    /// # Errors
    ///
    /// Returns `ApiError::InvalidRequest` if the request is incomplete,
    /// otherwise any transport or API error.
    #[instrument(skip(self, request), fields(delivery_type = %request.delivery_type))]
    pub async fn create_order(&self, request: &CreateOrderRequest) -> Result<Order, ApiError> {
        request.validate().map_err(ApiError::InvalidRequest)?;
        let order: Order = self.api.post("/orders", request).await?;
        tracing::info!(order_number = %order.order_number, "Order created");
        Ok(order)
    }

    /// Look up an order by its public number.
    ///
    /// # Errors
    ///
    /// Returns `ApiError::NotFound` for an unknown number.
    #[instrument(skip(self))]
    pub async fn order(&self, number: &str) -> Result<Order, ApiError> {
        self.api.get(&format!("/orders/{}", segment(number)?)).await
    }

    /// Orders of the signed-in customer.
    ///
    /// # Errors
    ///
    /// Returns any transport or API error (401 without an access token).
    #[instrument(skip(self))]
    pub async fn my_orders(&self) -> Result<Vec<Order>, ApiError> {
        self.api.get("/orders").await
    }

    /// Create a payment-provider checkout for an order.
    ///
    /// # Errors
    ///
    /// Returns any transport or API error.
    #[instrument(skip(self))]
    pub async fn create_payment_preference(
        &self,
        number: &str,
    ) -> Result<PaymentPreference, ApiError> {
        let path = format!("/payments/preference/{}", segment(number)?);
        self.api.post(&path, &serde_json::Map::new()).await
    }

    /// Payment status of an order.
    ///
    /// # Errors
    ///
    /// Returns any transport or API error.
    #[instrument(skip(self))]
    pub async fn payment_status(&self, number: &str) -> Result<PaymentStatusReport, ApiError> {
        self.api
            .get(&format!("/payments/status/{}", segment(number)?))
            .await
    }
}

fn check_availability_range(from: NaiveDate, to: NaiveDate) -> Result<(), ApiError> {
    if from > to {
        return Err(ApiError::InvalidRequest(format!(
            "from_date {from} is after to_date {to}"
        )));
    }
    let days = (to - from).num_days();
    if days > MAX_AVAILABILITY_RANGE_DAYS {
        return Err(ApiError::InvalidRequest(format!(
            "date range of {days} days exceeds {MAX_AVAILABILITY_RANGE_DAYS}"
        )));
    }
    Ok(())
}

/// Percent-encode an order number for use as a path segment.
fn segment(number: &str) -> Result<String, ApiError> {
    let number = number.trim();
    if number.is_empty() {
        return Err(ApiError::InvalidRequest(
            "order number is required".to_string(),
        ));
    }
    Ok(urlencoding::encode(number).into_owned())
}
