//! Domain models for the EasyDrop checkout service.
//!
//! The order draft is the live, editable form state of one checkout session.
//! The order submission is the normalized payload sent to the gateway, and the
//! remaining types describe the HTTP request/response bodies of this service
//! and of the gateway.

use std::fmt;
use std::str::FromStr;

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

// ============================================================================
// Parcel size
// ============================================================================

/// Canonical parcel size accepted by the gateway.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "lowercase")]
pub enum ParcelSize {
    Small,
    Medium,
    Large,
}

impl ParcelSize {
    pub fn as_str(&self) -> &'static str {
        match self {
            ParcelSize::Small => "small",
            ParcelSize::Medium => "medium",
            ParcelSize::Large => "large",
        }
    }
}

impl fmt::Display for ParcelSize {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error returned when a string names none of the three parcel sizes.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown parcel size: {0:?}")]
pub struct UnknownParcelSize(pub String);

impl FromStr for ParcelSize {
    type Err = UnknownParcelSize;

    /// Accepts the canonical names in any letter case, ignoring surrounding whitespace.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "small" => Ok(ParcelSize::Small),
            "medium" => Ok(ParcelSize::Medium),
            "large" => Ok(ParcelSize::Large),
            _ => Err(UnknownParcelSize(s.to_string())),
        }
    }
}

// ============================================================================
// Order draft (form state)
// ============================================================================

pub const DEFAULT_LATITUDE: f64 = 8.9806;
pub const DEFAULT_LONGITUDE: f64 = 38.7578;
pub const DEFAULT_POSTAL_CODE: &str = "1000";
pub const DEFAULT_PARCEL_MEASURE: f64 = 0.1;

/// Delivery location of an order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct Location {
    pub address: String,
    pub latitude: f64,
    pub longitude: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub postal_code: Option<String>,
}

impl Default for Location {
    fn default() -> Self {
        Self {
            address: String::new(),
            latitude: DEFAULT_LATITUDE,
            longitude: DEFAULT_LONGITUDE,
            postal_code: Some(DEFAULT_POSTAL_CODE.to_string()),
        }
    }
}

/// Parcel attributes as entered on the form. The size stays a raw string
/// until validation so that an unknown value can be reported on its field.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParcelDraft {
    pub size: String,
    pub length: f64,
    pub width: f64,
    pub height: f64,
    pub weight: f64,
    pub fragile: bool,
}

impl Default for ParcelDraft {
    fn default() -> Self {
        Self {
            size: ParcelSize::Small.as_str().to_string(),
            length: DEFAULT_PARCEL_MEASURE,
            width: DEFAULT_PARCEL_MEASURE,
            height: DEFAULT_PARCEL_MEASURE,
            weight: DEFAULT_PARCEL_MEASURE,
            fragile: false,
        }
    }
}

/// The live, editable order of one checkout session.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct OrderDraft {
    pub first_name: String,
    pub last_name: String,
    pub phone_number: String,
    pub email: String,
    pub location: Location,
    pub latest_time_of_delivery: String,
    pub parcel: ParcelDraft,
}

// ============================================================================
// Order submission (gateway payload)
// ============================================================================

/// Parcel attributes as sent to the gateway.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct Parcel {
    pub size: ParcelSize,
    pub length: f64,
    pub width: f64,
    pub height: f64,
    pub weight: f64,
    pub fragile: bool,
}

/// Finalized order payload for `POST /api/checkout` on the gateway.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct OrderSubmission {
    pub first_name: String,
    pub last_name: String,
    /// Country code followed by the 9-digit subscriber number, digits only.
    pub phone_number: String,
    pub email: String,
    pub location: Location,
    /// ISO-8601 local date-time, e.g. `2026-10-20T14:30`.
    pub latest_time_of_delivery: String,
    pub parcel: Parcel,
}

// ============================================================================
// Gateway envelope
// ============================================================================

/// Response envelope returned by every gateway endpoint.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FetchResponse<T> {
    #[serde(default)]
    pub success: bool,
    #[serde(default)]
    pub message: String,
    pub data: Option<T>,
    #[serde(default)]
    pub errors: Vec<String>,
}

/// Opaque reference the gateway assigns to a created order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct OrderReference(pub String);

impl fmt::Display for OrderReference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

// ============================================================================
// Request Models (Deserialize from JSON input)
// ============================================================================

/// Request body for opening a checkout session from a partner redirect URL.
#[derive(Debug, Deserialize)]
pub struct CreateSessionRequest {
    pub url: String,
}

/// Direct user input. Absent fields are left as they are.
///
/// Latitude and longitude are deliberately missing: they only change through
/// a location update together with the address.
#[derive(Debug, Default, Deserialize)]
pub struct FieldEdit {
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub phone_number: Option<String>,
    pub email: Option<String>,
    pub address: Option<String>,
    pub postal_code: Option<String>,
    pub latest_time_of_delivery: Option<String>,
    #[serde(default)]
    pub parcel: ParcelEdit,
}

/// Parcel part of a [`FieldEdit`].
#[derive(Debug, Default, Deserialize)]
pub struct ParcelEdit {
    pub size: Option<String>,
    pub length: Option<f64>,
    pub width: Option<f64>,
    pub height: Option<f64>,
    pub weight: Option<f64>,
    pub fragile: Option<bool>,
}

/// Request body for a map click or a marker drag.
#[derive(Debug, Deserialize)]
pub struct PinRequest {
    pub latitude: f64,
    pub longitude: f64,
}

/// Request body for an address search.
#[derive(Debug, Deserialize)]
pub struct SearchRequest {
    pub query: String,
}

// ============================================================================
// Response Models
// ============================================================================

/// Generic API response wrapper.
#[derive(Debug, Serialize)]
pub struct ApiResponse<T: Serialize> {
    pub data: T,
    pub message: String,
}

/// Snapshot of a checkout session.
#[derive(Debug, Serialize)]
pub struct SessionResponse {
    pub id: Uuid,
    pub business_name: String,
    pub callback_url: String,
    pub draft: OrderDraft,
    pub busy: bool,
}

/// Outcome of a location gesture.
#[derive(Debug, Serialize)]
pub struct LocationResponse {
    pub location: Location,
    /// False when the result arrived after a newer gesture and was dropped.
    pub applied: bool,
}

/// Terminal outcome of a submission: where the browser goes next.
#[derive(Debug, Serialize)]
pub struct SubmitResponse {
    pub redirect_url: String,
    pub order_reference: Option<OrderReference>,
    pub error: Option<String>,
}
