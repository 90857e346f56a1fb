//! HTTP route modules for the checkout service.
//!
//! - `sessions`: checkout session lifecycle, form edits, validation, submission
//! - `location`: map pin and address search, resolved through the geocoder
//! - `meta`: health, map readiness and the order submission schema

pub mod location;
pub mod meta;
pub mod sessions;
