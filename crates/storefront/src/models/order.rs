//! Order, availability and payment types.

use std::collections::BTreeMap;

use bakery_core::{DeliveryType, Email, Money, OrderId, OrderItemId, OrderStatus, Phone, ProductId};
use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};

use super::null_as_default;

/// A placed order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Order {
    pub id: OrderId,
    /// Public order number used in URLs and payment references.
    pub order_number: String,
    pub customer_name: String,
    pub customer_email: String,
    pub customer_phone: String,
    pub delivery_type: DeliveryType,
    #[serde(default)]
    pub delivery_address: Option<String>,
    #[serde(default)]
    pub delivery_city: Option<String>,
    #[serde(default, with = "flexible_datetime::option")]
    pub delivery_date: Option<NaiveDateTime>,
    #[serde(default)]
    pub delivery_time_slot: Option<String>,
    #[serde(default)]
    pub notes: Option<String>,
    pub status: OrderStatus,
    #[serde(default, deserialize_with = "null_as_default")]
    pub subtotal: Money,
    #[serde(default, deserialize_with = "null_as_default")]
    pub delivery_fee: Money,
    #[serde(default, deserialize_with = "null_as_default")]
    pub discount: Money,
    #[serde(default, deserialize_with = "null_as_default")]
    pub total: Money,
    #[serde(default)]
    pub payment_method: Option<String>,
    #[serde(default)]
    pub payment_status: Option<String>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub items: Vec<OrderItem>,
    #[serde(with = "flexible_datetime")]
    pub created_at: NaiveDateTime,
}

impl Order {
    /// Whether a payment may be started for this order.
    #[must_use]
    pub const fn can_pay(&self) -> bool {
        self.status.can_pay()
    }

    /// Whether the order has been paid and is in or past fulfillment.
    #[must_use]
    pub const fn is_completed(&self) -> bool {
        self.status.is_completed()
    }

    /// Units across all items.
    #[must_use]
    pub fn unit_count(&self) -> u32 {
        self.items.iter().map(|item| item.quantity).sum()
    }
}

/// One line of a placed order, frozen at checkout.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderItem {
    pub id: OrderItemId,
    #[serde(default)]
    pub product_id: Option<ProductId>,
    pub product_name: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub product_price: Money,
    #[serde(default)]
    pub product_image: Option<String>,
    pub quantity: u32,
    #[serde(default, deserialize_with = "null_as_default")]
    pub subtotal: Money,
    #[serde(default)]
    pub notes: Option<String>,
}

/// Body of `POST /orders`. The server turns the session's cart into the order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreateOrderRequest {
    pub customer_name: String,
    pub customer_email: Email,
    pub customer_phone: Phone,
    pub delivery_type: DeliveryType,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub delivery_address: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub delivery_city: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub delivery_date: Option<NaiveDate>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub delivery_time_slot: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
}

impl CreateOrderRequest {
    /// Check the fields the server would otherwise reject after a round trip.
    ///
    /// # Errors
    ///
    /// Returns a message describing the first problem found.
    pub fn validate(&self) -> Result<(), String> {
        if self.customer_name.trim().is_empty() {
            return Err("customer name is required".to_string());
        }
        if self.delivery_type == DeliveryType::Delivery
            && self
                .delivery_address
                .as_deref()
                .is_none_or(|address| address.trim().is_empty())
        {
            return Err("delivery orders need a delivery address".to_string());
        }
        Ok(())
    }
}

/// Reserved units vs. daily capacity for one day.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DayAvailability {
    pub reserved: u32,
    pub capacity: u32,
}

impl DayAvailability {
    /// Units that can still be booked.
    #[must_use]
    pub const fn remaining(&self) -> u32 {
        self.capacity.saturating_sub(self.reserved)
    }

    /// Whether the day is fully booked.
    #[must_use]
    pub const fn is_full(&self) -> bool {
        self.remaining() == 0
    }
}

/// Response of `GET /orders/availability`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Availability {
    #[serde(default, deserialize_with = "null_as_default")]
    pub dates: BTreeMap<NaiveDate, DayAvailability>,
}

impl Availability {
    /// Availability for `date`, if the server reported it.
    #[must_use]
    pub fn on(&self, date: NaiveDate) -> Option<DayAvailability> {
        self.dates.get(&date).copied()
    }

    /// Days that still accept orders, in date order.
    pub fn open_days(&self) -> impl Iterator<Item = NaiveDate> + '_ {
        self.dates
            .iter()
            .filter(|(_, day)| !day.is_full())
            .map(|(date, _)| *date)
    }
}

/// Response of `POST /payments/preference/{number}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaymentPreference {
    /// Payment provider preference ID.
    pub preference_id: String,
    /// Provider checkout URL the customer is sent to.
    pub init_point: String,
}

/// Response of `GET /payments/status/{number}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaymentStatusReport {
    pub order_number: String,
    pub status: OrderStatus,
    #[serde(default)]
    pub payment_status: Option<String>,
    #[serde(default)]
    pub payment_method: Option<String>,
}

/// Timestamps arrive as RFC 3339, naive ISO 8601, or bare dates depending on
/// how the server stored them. All are read as naive local time.
mod flexible_datetime {
    use chrono::{DateTime, NaiveDate, NaiveDateTime};
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn parse(raw: &str) -> Option<NaiveDateTime> {
        let raw = raw.trim();
        DateTime::parse_from_rfc3339(raw)
            .map(|dt| dt.naive_local())
            .ok()
            .or_else(|| raw.parse::<NaiveDateTime>().ok())
            .or_else(|| {
                raw.parse::<NaiveDate>()
                    .ok()
                    .and_then(|date| date.and_hms_opt(0, 0, 0))
            })
    }

    pub fn serialize<S: Serializer>(value: &NaiveDateTime, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(&value.format("%Y-%m-%dT%H:%M:%S"))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<NaiveDateTime, D::Error> {
        let raw = String::deserialize(deserializer)?;
        parse(&raw).ok_or_else(|| serde::de::Error::custom(format!("invalid datetime: {raw}")))
    }

    pub mod option {
        use chrono::NaiveDateTime;
        use serde::{Deserialize, Deserializer, Serializer};

        #[allow(clippy::ref_option)] // serde `with` passes &Option<T>
        pub fn serialize<S: Serializer>(
            value: &Option<NaiveDateTime>,
            serializer: S,
        ) -> Result<S::Ok, S::Error> {
            match value {
                Some(dt) => super::serialize(dt, serializer),
                None => serializer.serialize_none(),
            }
        }

        pub fn deserialize<'de, D: Deserializer<'de>>(
            deserializer: D,
        ) -> Result<Option<NaiveDateTime>, D::Error> {
            Option::<String>::deserialize(deserializer)?
                .filter(|raw| !raw.trim().is_empty())
                .map(|raw| {
                    super::parse(&raw)
                        .ok_or_else(|| serde::de::Error::custom(format!("invalid datetime: {raw}")))
                })
                .transpose()
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    const ORDER_JSON: &str = r#"{
        "id": 12,
        "order_number": "ORD-20261019-0012",
        "customer_name": "Ana",
        "customer_email": "ana@example.com",
        "customer_phone": "+56912345678",
        "delivery_type": "delivery",
        "delivery_address": "Av. Siempre Viva 742",
        "delivery_city": "Santiago",
        "delivery_date": "2026-10-24T00:00:00",
        "delivery_time_slot": "10:00-13:00",
        "notes": null,
        "status": "pagada",
        "subtotal": "17000.00",
        "delivery_fee": "3000.00",
        "discount": "0.00",
        "total": "20000.00",
        "payment_method": "credit_card",
        "payment_status": "approved",
        "items": [
            {"id": 1, "product_id": 1, "product_name": "Torta Selva Negra", "product_price": "1000.00",
             "product_image": null, "quantity": 2, "subtotal": "2000.00", "notes": null},
            {"id": 2, "product_id": null, "product_name": "Torta personalizada", "product_price": "15000.00",
             "product_image": "/uploads/x.png", "quantity": 1, "subtotal": "15000.00", "notes": "Feliz cumple"}
        ],
        "created_at": "2026-10-19T14:03:11.512000+00:00"
    }"#;

    #[test]
    fn test_decodes_order() {
        let order: Order = serde_json::from_str(ORDER_JSON).unwrap();
        assert_eq!(order.status, OrderStatus::Paid);
        assert_eq!(order.total, Money::from_units(20_000));
        assert_eq!(order.unit_count(), 3);
        assert!(order.is_completed());
        assert!(!order.can_pay());
        assert_eq!(
            order.delivery_date.map(|d| d.date()),
            NaiveDate::from_ymd_opt(2026, 10, 24)
        );
        assert_eq!(order.created_at.date(), NaiveDate::from_ymd_opt(2026, 10, 19).unwrap());
    }

    #[test]
    fn test_flexible_datetime_formats() {
        assert!(flexible_datetime::parse("2026-10-24").is_some());
        assert!(flexible_datetime::parse("2026-10-24T09:30:00").is_some());
        assert!(flexible_datetime::parse("2026-10-24T09:30:00Z").is_some());
        assert!(flexible_datetime::parse("24/10/2026").is_none());
    }

    #[test]
    fn test_availability() {
        let json = r#"{"dates": {
            "2026-10-20": {"reserved": 2, "capacity": 2},
            "2026-10-21": {"reserved": 1, "capacity": 2},
            "2026-10-22": {"reserved": 0, "capacity": 2}
        }}"#;
        let availability: Availability = serde_json::from_str(json).unwrap();

        let day = availability.on(NaiveDate::from_ymd_opt(2026, 10, 21).unwrap()).unwrap();
        assert_eq!(day.remaining(), 1);
        assert!(!day.is_full());

        let open: Vec<_> = availability.open_days().collect();
        assert_eq!(
            open,
            vec![
                NaiveDate::from_ymd_opt(2026, 10, 21).unwrap(),
                NaiveDate::from_ymd_opt(2026, 10, 22).unwrap(),
            ]
        );
    }

    #[test]
    fn test_create_order_validation() {
        let mut request = CreateOrderRequest {
            customer_name: "Ana".to_string(),
            customer_email: Email::parse("ana@example.com").unwrap(),
            customer_phone: Phone::parse("+56912345678").unwrap(),
            delivery_type: DeliveryType::Delivery,
            delivery_address: None,
            delivery_city: None,
            delivery_date: NaiveDate::from_ymd_opt(2026, 10, 24),
            delivery_time_slot: None,
            notes: None,
        };
        assert!(request.validate().is_err());

        request.delivery_address = Some("Av. Siempre Viva 742".to_string());
        assert!(request.validate().is_ok());

        request.delivery_type = DeliveryType::Pickup;
        request.delivery_address = None;
        assert!(request.validate().is_ok());

        let body = serde_json::to_value(&request).unwrap();
        assert_eq!(body["delivery_type"], "pickup");
        assert_eq!(body["delivery_date"], "2026-10-24");
        assert!(body.get("delivery_address").is_none());
    }
}
