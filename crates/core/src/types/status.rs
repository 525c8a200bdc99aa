//! Status enums reported by the commerce backend.
//!
//! The backend serializes every status in `snake_case`. Unknown values are a
//! schema violation and fail deserialization.

use serde::{Deserialize, Serialize};

/// Overall order status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum OrderStatus {
    #[default]
    Pending,
    Completed,
    Archived,
    Canceled,
    RequiresAction,
}

impl OrderStatus {
    /// Customer-facing label.
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::Pending => "Processing",
            Self::Completed => "Completed",
            Self::Archived => "Archived",
            Self::Canceled => "Canceled",
            Self::RequiresAction => "Action required",
        }
    }
}

/// Order fulfillment status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum FulfillmentStatus {
    #[default]
    NotFulfilled,
    PartiallyFulfilled,
    Fulfilled,
    PartiallyShipped,
    Shipped,
    PartiallyDelivered,
    Delivered,
    PartiallyReturned,
    Returned,
    Canceled,
}

impl FulfillmentStatus {
    /// Customer-facing label.
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::NotFulfilled => "Preparing",
            Self::PartiallyFulfilled => "Partially prepared",
            Self::Fulfilled => "Ready to ship",
            Self::PartiallyShipped => "Partially shipped",
            Self::Shipped => "Shipped",
            Self::PartiallyDelivered => "Partially delivered",
            Self::Delivered => "Delivered",
            Self::PartiallyReturned => "Partially returned",
            Self::Returned => "Returned",
            Self::Canceled => "Canceled",
        }
    }
}

/// Order payment status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum PaymentStatus {
    #[default]
    NotPaid,
    Awaiting,
    Authorized,
    Captured,
    PartiallyRefunded,
    Refunded,
    Canceled,
    RequiresAction,
}

impl PaymentStatus {
    /// Customer-facing label.
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::NotPaid => "Not paid",
            Self::Awaiting => "Awaiting payment",
            Self::Authorized => "Authorized",
            Self::Captured => "Paid",
            Self::PartiallyRefunded => "Partially refunded",
            Self::Refunded => "Refunded",
            Self::Canceled => "Canceled",
            Self::RequiresAction => "Action required",
        }
    }
}

/// Status of a return or exchange request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum ReturnStatus {
    #[default]
    Requested,
    Approved,
    Received,
    Refunded,
    Rejected,
    Canceled,
}

impl ReturnStatus {
    /// Customer-facing label.
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::Requested => "Requested",
            Self::Approved => "Approved",
            Self::Received => "Received",
            Self::Refunded => "Refunded",
            Self::Rejected => "Rejected",
            Self::Canceled => "Canceled",
        }
    }

    /// Whether the backend is still working on the request.
    #[must_use]
    pub const fn is_open(self) -> bool {
        matches!(self, Self::Requested | Self::Approved | Self::Received)
    }
}

/// Whether a post-purchase request wants money back or a replacement.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum ReturnKind {
    #[default]
    Return,
    Exchange,
}

impl ReturnKind {
    /// Parse the form value (`"return"` / `"exchange"`).
    #[must_use]
    pub fn from_form(value: &str) -> Option<Self> {
        match value.trim() {
            "return" => Some(Self::Return),
            "exchange" => Some(Self::Exchange),
            _ => None,
        }
    }

    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::Return => "Return",
            Self::Exchange => "Exchange",
        }
    }
}
