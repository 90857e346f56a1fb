//! Order form model.
//!
//! Holds the draft of one checkout session, applies edits from the two
//! mutation sources (direct user input and location resolution) and validates
//! the draft as a whole.

use std::collections::BTreeMap;

use chrono::NaiveDateTime;
use serde::Serialize;
use validator::ValidateEmail;

use crate::intent::CheckoutIntent;
use crate::models::{FieldEdit, Location, OrderDraft, OrderSubmission, Parcel, ParcelSize};

/// Address stored when reverse geocoding finds nothing for a pin.
pub const ADDRESS_NOT_FOUND: &str = "Address not found";

/// Length of a local subscriber number, country code excluded.
pub const PHONE_DIGITS: usize = 9;

/// Field path (`location.address`, `parcel.weight`, ...) to message.
pub type FieldErrors = BTreeMap<String, String>;

/// A resolved location, applied to the draft as one unit.
#[derive(Debug, Clone, PartialEq)]
pub struct LocationUpdate {
    pub latitude: f64,
    pub longitude: f64,
    pub address: String,
    pub postal_code: Option<String>,
}

/// A draft that passed every validation rule.
#[derive(Debug, Clone, PartialEq)]
pub struct ValidOrder {
    draft: OrderDraft,
    size: ParcelSize,
}

impl ValidOrder {
    pub fn draft(&self) -> &OrderDraft {
        &self.draft
    }

    /// Normalize into the gateway payload, prefixing the phone number with
    /// `country_code`.
    pub fn into_submission(self, country_code: &str) -> OrderSubmission {
        let OrderDraft {
            first_name,
            last_name,
            phone_number,
            email,
            location,
            latest_time_of_delivery,
            parcel,
        } = self.draft;

        OrderSubmission {
            first_name,
            last_name,
            phone_number: format!("{country_code}{phone_number}"),
            email,
            location,
            latest_time_of_delivery,
            parcel: Parcel {
                size: self.size,
                length: parcel.length,
                width: parcel.width,
                height: parcel.height,
                weight: parcel.weight,
                fragile: parcel.fragile,
            },
        }
    }
}

/// JSON form of a validation outcome.
#[derive(Debug, Serialize)]
pub struct ValidationReport {
    pub valid: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<OrderDraft>,
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub field_errors: FieldErrors,
}

impl ValidationReport {
    pub fn invalid(field_errors: FieldErrors) -> Self {
        Self {
            valid: false,
            data: None,
            field_errors,
        }
    }
}

impl From<Result<ValidOrder, FieldErrors>> for ValidationReport {
    fn from(result: Result<ValidOrder, FieldErrors>) -> Self {
        match result {
            Ok(order) => Self {
                valid: true,
                data: Some(order.draft),
                field_errors: FieldErrors::new(),
            },
            Err(field_errors) => Self::invalid(field_errors),
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct OrderForm {
    draft: OrderDraft,
}

impl OrderForm {
    pub fn new() -> Self {
        Self::default()
    }

    /// Form pre-filled with the parcel attributes of a checkout intent.
    pub fn from_intent(intent: &CheckoutIntent) -> Self {
        Self {
            draft: OrderDraft {
                parcel: intent.parcel_draft(),
                ..OrderDraft::default()
            },
        }
    }

    pub fn draft(&self) -> &OrderDraft {
        &self.draft
    }

    /// Apply direct user input. Fields absent from the edit keep their value.
    pub fn apply_edit(&mut self, edit: FieldEdit) {
        let draft = &mut self.draft;
        set(&mut draft.first_name, edit.first_name);
        set(&mut draft.last_name, edit.last_name);
        set(&mut draft.phone_number, edit.phone_number);
        set(&mut draft.email, edit.email);
        set(&mut draft.location.address, edit.address);
        set(&mut draft.latest_time_of_delivery, edit.latest_time_of_delivery);
        if let Some(postal_code) = edit.postal_code {
            draft.location.postal_code = Some(postal_code).filter(|p| !p.is_empty());
        }

        let parcel = &mut draft.parcel;
        set(&mut parcel.size, edit.parcel.size);
        set(&mut parcel.length, edit.parcel.length);
        set(&mut parcel.width, edit.parcel.width);
        set(&mut parcel.height, edit.parcel.height);
        set(&mut parcel.weight, edit.parcel.weight);
        set(&mut parcel.fragile, edit.parcel.fragile);
    }

    /// Move the delivery point. Coordinates and address change together;
    /// the postal code is only replaced when the update carries one.
    pub fn apply_location(&mut self, update: LocationUpdate) {
        let location = &mut self.draft.location;
        location.latitude = round6(update.latitude);
        location.longitude = round6(update.longitude);
        location.address = update.address;
        if update.postal_code.is_some() {
            location.postal_code = update.postal_code;
        }
    }

    /// Reverse geocoding failed: the address no longer describes the pin.
    pub fn mark_address_not_found(&mut self) {
        self.draft.location.address = ADDRESS_NOT_FOUND.to_string();
    }

    pub fn location(&self) -> &Location {
        &self.draft.location
    }

    /// Check every rule. All-or-nothing: either the whole draft is valid or
    /// each offending field path gets a message.
    pub fn validate(&self) -> Result<ValidOrder, FieldErrors> {
        let d = &self.draft;
        let mut errors = FieldErrors::new();
        let mut fail = |path: &str, message: &str| {
            errors.insert(path.to_string(), message.to_string());
        };

        if d.first_name.is_empty() {
            fail("first_name", "First name is required.");
        }
        if d.last_name.is_empty() {
            fail("last_name", "Last name is required.");
        }

        if d.phone_number.chars().count() != PHONE_DIGITS {
            fail("phone_number", "Phone number must be exactly 9 digits.");
        } else if !d.phone_number.chars().all(|c| c.is_ascii_digit()) {
            fail("phone_number", "Phone number must contain only digits.");
        }

        if d.email.is_empty() {
            fail("email", "Email is required.");
        } else if !is_valid_email(&d.email) {
            fail("email", "Invalid email address.");
        }

        if d.location.address.is_empty() {
            fail("location.address", "Address is required.");
        }
        if !(-90.0..=90.0).contains(&d.location.latitude) {
            fail("location.latitude", "Latitude must be between -90 and 90.");
        }
        if !(-180.0..=180.0).contains(&d.location.longitude) {
            fail("location.longitude", "Longitude must be between -180 and 180.");
        }

        if d.latest_time_of_delivery.is_empty() {
            fail("latest_time_of_delivery", "Delivery time is required.");
        } else if parse_local_datetime(&d.latest_time_of_delivery).is_none() {
            fail("latest_time_of_delivery", "Delivery time must be a date and time.");
        }

        let size = d.parcel.size.parse::<ParcelSize>().ok();
        if size.is_none() {
            fail("parcel.size", "Parcel size is required.");
        }
        for (path, value, message) in [
            ("parcel.length", d.parcel.length, "Length must be positive."),
            ("parcel.width", d.parcel.width, "Width must be positive."),
            ("parcel.height", d.parcel.height, "Height must be positive."),
            ("parcel.weight", d.parcel.weight, "Weight must be positive."),
        ] {
            if !(value.is_finite() && value > 0.0) {
                fail(path, message);
            }
        }

        match size {
            Some(size) if errors.is_empty() => Ok(ValidOrder {
                draft: d.clone(),
                size,
            }),
            _ => Err(errors),
        }
    }
}

fn set<T>(field: &mut T, value: Option<T>) {
    if let Some(value) = value {
        *field = value;
    }
}

fn round6(value: f64) -> f64 {
    (value * 1_000_000.0).round() / 1_000_000.0
}

/// HTML5 email syntax, plus a dotted domain ending in an alphabetic TLD and
/// a local part without empty dot-separated labels.
fn is_valid_email(email: &str) -> bool {
    let Some((local, domain)) = email.rsplit_once('@') else {
        return false;
    };
    let tld = domain.rsplit_once('.').map(|(_, tld)| tld).unwrap_or_default();

    email.validate_email()
        && local.split('.').all(|label| !label.is_empty())
        && tld.len() >= 2
        && tld.chars().all(|c| c.is_ascii_alphabetic())
}

/// `datetime-local` input values: minutes, optionally seconds and fractions.
fn parse_local_datetime(value: &str) -> Option<NaiveDateTime> {
    NaiveDateTime::parse_from_str(value, "%Y-%m-%dT%H:%M")
        .or_else(|_| NaiveDateTime::parse_from_str(value, "%Y-%m-%dT%H:%M:%S%.f"))
        .ok()
}
