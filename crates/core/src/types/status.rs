//! Status enums for orders and deliveries.
//!
//! The bakery API speaks Spanish on the wire (`creada`, `pagada`, ...), and the
//! display labels are shown to customers as-is.

use serde::{Deserialize, Serialize};

/// Neutral gray used for statuses without a dedicated color.
pub const NEUTRAL_STATUS_COLOR: &str = "#6B7280";

/// Order lifecycle status.
///
/// Values the client does not know are preserved in [`OrderStatus::Unknown`]
/// so a newer server never breaks order listings.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum OrderStatus {
    /// Order placed, not yet paid.
    Created,
    /// Customer was handed off to the payment provider.
    Paying,
    /// Payment confirmed.
    Paid,
    /// Payment was rejected or abandoned.
    PaymentFailed,
    /// Kitchen is working on it.
    InPreparation,
    /// Ready for pickup or dispatch.
    Ready,
    /// Handed to the customer.
    Delivered,
    /// Cancelled by the store or the customer.
    Cancelled,
    /// A status string this client does not recognize.
    Unknown(String),
}

impl OrderStatus {
    /// Wire value of the status.
    #[must_use]
    pub fn as_str(&self) -> &str {
        match self {
            Self::Created => "creada",
            Self::Paying => "pagando",
            Self::Paid => "pagada",
            Self::PaymentFailed => "fallida",
            Self::InPreparation => "en_preparacion",
            Self::Ready => "lista",
            Self::Delivered => "entregada",
            Self::Cancelled => "cancelada",
            Self::Unknown(raw) => raw,
        }
    }

    /// Customer-facing label. Unknown statuses fall back to the raw value.
    #[must_use]
    pub fn label(&self) -> &str {
        match self {
            Self::Created => "Creada",
            Self::Paying => "Procesando pago",
            Self::Paid => "Pagada",
            Self::PaymentFailed => "Pago fallido",
            Self::InPreparation => "En preparación",
            Self::Ready => "Lista para entregar",
            Self::Delivered => "Entregada",
            Self::Cancelled => "Cancelada",
            Self::Unknown(raw) => raw,
        }
    }

    /// Badge color (hex) used when listing orders.
    #[must_use]
    pub const fn color(&self) -> &'static str {
        match self {
            Self::Created => "#6366F1",
            Self::Paying => "#F59E0B",
            Self::Paid | Self::Delivered => "#10B981",
            Self::PaymentFailed => "#EF4444",
            Self::InPreparation => "#3B82F6",
            Self::Ready => "#EC4899",
            Self::Cancelled | Self::Unknown(_) => NEUTRAL_STATUS_COLOR,
        }
    }

    /// Whether a payment may (still) be started for an order in this status.
    #[must_use]
    pub const fn can_pay(&self) -> bool {
        matches!(self, Self::Created | Self::PaymentFailed)
    }

    /// Whether the order has been paid and is moving through fulfillment.
    #[must_use]
    pub const fn is_completed(&self) -> bool {
        matches!(
            self,
            Self::Paid | Self::InPreparation | Self::Ready | Self::Delivered
        )
    }
}

impl From<String> for OrderStatus {
    fn from(raw: String) -> Self {
        match raw.as_str() {
            "creada" => Self::Created,
            "pagando" => Self::Paying,
            "pagada" => Self::Paid,
            "fallida" => Self::PaymentFailed,
            "en_preparacion" => Self::InPreparation,
            "lista" => Self::Ready,
            "entregada" => Self::Delivered,
            "cancelada" => Self::Cancelled,
            _ => Self::Unknown(raw),
        }
    }
}

impl From<OrderStatus> for String {
    fn from(status: OrderStatus) -> Self {
        match status {
            OrderStatus::Unknown(raw) => raw,
            known => known.as_str().to_owned(),
        }
    }
}

impl std::fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// How an order reaches the customer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum DeliveryType {
    /// Sent to the customer's address.
    Delivery,
    /// Collected at the shop.
    #[default]
    Pickup,
}

impl std::fmt::Display for DeliveryType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Delivery => write!(f, "delivery"),
            Self::Pickup => write!(f, "pickup"),
        }
    }
}

impl std::str::FromStr for DeliveryType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "delivery" => Ok(Self::Delivery),
            "pickup" => Ok(Self::Pickup),
            _ => Err(format!("invalid delivery type: {s}")),
        }
    }
}
