//! Checkout intent decoding.
//!
//! A partner business redirects the customer to the checkout page with the
//! parcel attributes, its gateway API key and a callback URL encoded in the
//! query string. [`parse`] turns that URL into a [`CheckoutIntent`], or into
//! nothing at all when any required parameter is missing or malformed.

use std::borrow::Cow;
use std::collections::HashMap;

use tracing::warn;

use crate::models::{ParcelDraft, ParcelSize, UnknownParcelSize};

/// Parameters a partner encodes into the checkout redirect URL.
#[derive(Debug, Clone, PartialEq)]
pub struct CheckoutIntent {
    pub api_key: String,
    pub callback_url: String,
    pub business_name: String,
    pub parcel_size: ParcelSize,
    pub length: f64,
    pub width: f64,
    pub height: f64,
    pub weight: f64,
    pub fragile: bool,
}

impl CheckoutIntent {
    /// Parcel fields of the order draft, pre-filled from the intent.
    pub fn parcel_draft(&self) -> ParcelDraft {
        ParcelDraft {
            size: self.parcel_size.as_str().to_string(),
            length: self.length,
            width: self.width,
            height: self.height,
            weight: self.weight,
            fragile: self.fragile,
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum IntentError {
    #[error("missing required parameter: {0}")]
    Missing(&'static str),

    #[error("invalid number format for parameter {name}: {value:?}")]
    InvalidNumber { name: &'static str, value: String },

    #[error("parameter {name} must be positive, got {value}")]
    NotPositive { name: &'static str, value: f64 },

    #[error(transparent)]
    InvalidSize(#[from] UnknownParcelSize),

    #[error("malformed percent-escape in {name} at byte {offset}")]
    MalformedEscape { name: &'static str, offset: usize },

    #[error("malformed percent-encoding in {name}: {source}")]
    Encoding {
        name: &'static str,
        #[source]
        source: std::string::FromUtf8Error,
    },
}

/// Decode a checkout URL into an intent.
///
/// Accepts a full URL, a path with a query string, or a bare query string.
/// Returns `None` on any decode failure and logs the reason.
pub fn parse(url: &str) -> Option<CheckoutIntent> {
    match decode(url) {
        Ok(intent) => Some(intent),
        Err(e) => {
            warn!("Error parsing checkout URL: {}", e);
            None
        }
    }
}

/// Decode a checkout URL, reporting why it was rejected.
pub fn decode(url: &str) -> Result<CheckoutIntent, IntentError> {
    let params = QueryParams::from_url(url);

    let callback_url = strict_decode("callback_url", &params.string("callback_url")?)?;

    Ok(CheckoutIntent {
        api_key: params.string("api_key")?,
        parcel_size: params.string("size")?.parse()?,
        length: params.positive_number("length")?,
        width: params.positive_number("width")?,
        height: params.positive_number("height")?,
        weight: params.positive_number("weight")?,
        fragile: params.flag("fragile"),
        business_name: params.string("business_name")?,
        callback_url,
    })
}

/// Form-url-decoded query parameters. The first occurrence of a name wins.
struct QueryParams(HashMap<String, String>);

impl QueryParams {
    fn from_url(url: &str) -> Self {
        let without_fragment = url.split('#').next().unwrap_or_default();
        let query = match without_fragment.split_once('?') {
            Some((_, query)) => query,
            None if without_fragment.contains('=') => without_fragment,
            None => "",
        };

        let mut params = HashMap::new();
        for pair in query.split('&').filter(|p| !p.is_empty()) {
            let (name, value) = pair.split_once('=').unwrap_or((pair, ""));
            params
                .entry(form_decode(name).into_owned())
                .or_insert_with(|| form_decode(value).into_owned());
        }
        Self(params)
    }

    fn string(&self, name: &'static str) -> Result<String, IntentError> {
        self.0.get(name).cloned().ok_or(IntentError::Missing(name))
    }

    fn positive_number(&self, name: &'static str) -> Result<f64, IntentError> {
        let raw = self.0.get(name).ok_or(IntentError::Missing(name))?;
        let value = leading_float(raw).ok_or_else(|| IntentError::InvalidNumber {
            name,
            value: raw.clone(),
        })?;
        if !value.is_finite() {
            return Err(IntentError::InvalidNumber {
                name,
                value: raw.clone(),
            });
        }
        if value <= 0.0 {
            return Err(IntentError::NotPositive { name, value });
        }
        Ok(value)
    }

    fn flag(&self, name: &str) -> bool {
        self.0.get(name).map(String::as_str) == Some("1")
    }
}

/// `application/x-www-form-urlencoded` decoding. Invalid escapes are kept
/// verbatim rather than rejected.
fn form_decode(raw: &str) -> Cow<'_, str> {
    if !raw.contains(['+', '%']) {
        return Cow::Borrowed(raw);
    }
    let spaced = raw.replace('+', " ");
    let bytes = urlencoding::decode_binary(spaced.as_bytes());
    Cow::Owned(String::from_utf8_lossy(&bytes).into_owned())
}

/// Percent-decode `raw`, rejecting a `%` not followed by two hex digits and
/// escapes that do not form UTF-8.
fn strict_decode(name: &'static str, raw: &str) -> Result<String, IntentError> {
    let bytes = raw.as_bytes();
    for (offset, _) in raw.match_indices('%') {
        let escape = bytes.get(offset + 1..offset + 3);
        if !escape.is_some_and(|hex| hex.iter().all(u8::is_ascii_hexdigit)) {
            return Err(IntentError::MalformedEscape { name, offset });
        }
    }
    urlencoding::decode(raw)
        .map(Cow::into_owned)
        .map_err(|source| IntentError::Encoding { name, source })
}

/// Parse the longest numeric prefix of `raw`, skipping leading whitespace.
/// `"12.5cm"` yields 12.5; a string without a numeric prefix yields `None`.
fn leading_float(raw: &str) -> Option<f64> {
    let s = raw.trim_start();
    let bytes = s.as_bytes();
    let mut end = 0;

    if matches!(bytes.first(), Some(b'+' | b'-')) {
        end += 1;
    }
    let int_start = end;
    while bytes.get(end).is_some_and(u8::is_ascii_digit) {
        end += 1;
    }
    let mut digits = end - int_start;
    if bytes.get(end) == Some(&b'.') {
        let frac_start = end + 1;
        let mut frac_end = frac_start;
        while bytes.get(frac_end).is_some_and(u8::is_ascii_digit) {
            frac_end += 1;
        }
        digits += frac_end - frac_start;
        if digits > 0 {
            end = frac_end;
        }
    }
    if digits == 0 {
        return None;
    }
    if matches!(bytes.get(end), Some(b'e' | b'E')) {
        let mut exp_end = end + 1;
        if matches!(bytes.get(exp_end), Some(b'+' | b'-')) {
            exp_end += 1;
        }
        let exp_digits_start = exp_end;
        while bytes.get(exp_end).is_some_and(u8::is_ascii_digit) {
            exp_end += 1;
        }
        if exp_end > exp_digits_start {
            end = exp_end;
        }
    }
    s[..end].parse().ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    const VALID: &str = "https://checkout.easydrop.example/?api_key=abc&size=small&length=10&width=5&height=2&weight=1&fragile=1&callback_url=https%3A%2F%2Fshop.example%2Freturn&business_name=Acme";

    #[test]
    fn decodes_all_parameters() {
        let intent = parse(VALID).expect("valid url should decode");
        assert_eq!(
            intent,
            CheckoutIntent {
                api_key: "abc".into(),
                callback_url: "https://shop.example/return".into(),
                business_name: "Acme".into(),
                parcel_size: ParcelSize::Small,
                length: 10.0,
                width: 5.0,
                height: 2.0,
                weight: 1.0,
                fragile: true,
            }
        );
    }

    #[test]
    fn accepts_bare_query_string() {
        let query = &VALID[VALID.find('?').unwrap()..];
        assert_eq!(parse(query), parse(VALID));
    }

    #[test]
    fn missing_weight_yields_none() {
        let url = VALID.replace("&weight=1", "");
        assert!(parse(&url).is_none());
    }

    #[test]
    fn every_required_parameter_is_required() {
        for name in [
            "api_key",
            "size",
            "length",
            "width",
            "height",
            "weight",
            "callback_url",
            "business_name",
        ] {
            let query: Vec<&str> = VALID
                .split_once('?')
                .unwrap()
                .1
                .split('&')
                .filter(|pair| !pair.starts_with(&format!("{name}=")))
                .collect();
            let url = format!("https://checkout.easydrop.example/?{}", query.join("&"));
            assert!(
                matches!(decode(&url), Err(IntentError::Missing(n)) if n == name),
                "dropping {name} should fail"
            );
        }
    }

    #[test]
    fn fragile_is_true_only_for_one() {
        for (raw, expected) in [("1", true), ("0", false), ("true", false), ("", false)] {
            let url = VALID.replace("fragile=1", &format!("fragile={raw}"));
            assert_eq!(parse(&url).unwrap().fragile, expected, "fragile={raw}");
        }
        let url = VALID.replace("&fragile=1", "");
        assert!(!parse(&url).unwrap().fragile);
    }

    #[test]
    fn non_numeric_dimension_is_rejected() {
        let url = VALID.replace("length=10", "length=abc");
        assert!(matches!(
            decode(&url),
            Err(IntentError::InvalidNumber { name: "length", .. })
        ));
    }

    #[test]
    fn numeric_prefix_is_accepted() {
        let url = VALID.replace("width=5", "width=5.5cm");
        assert_eq!(parse(&url).unwrap().width, 5.5);
    }

    #[test]
    fn infinite_and_non_positive_numbers_are_rejected() {
        assert!(parse(&VALID.replace("height=2", "height=1e999")).is_none());
        assert!(parse(&VALID.replace("height=2", "height=0")).is_none());
        assert!(parse(&VALID.replace("height=2", "height=-3")).is_none());
    }

    #[test]
    fn unknown_size_is_rejected_and_case_is_normalized() {
        assert!(parse(&VALID.replace("size=small", "size=huge")).is_none());
        let intent = parse(&VALID.replace("size=small", "size=LARGE")).unwrap();
        assert_eq!(intent.parcel_size, ParcelSize::Large);
    }

    #[test]
    fn callback_url_is_decoded_twice() {
        let url = VALID.replace(
            "callback_url=https%3A%2F%2Fshop.example%2Freturn",
            "callback_url=https%253A%252F%252Fshop.example%252Freturn%253Fa%253D1",
        );
        assert_eq!(
            parse(&url).unwrap().callback_url,
            "https://shop.example/return?a=1"
        );
    }

    #[test]
    fn malformed_escape_in_second_decode_is_rejected() {
        let url = VALID.replace("%2Freturn", "%2Fr%25zz");
        assert!(matches!(
            decode(&url),
            Err(IntentError::MalformedEscape {
                name: "callback_url",
                offset: 22
            })
        ));

        let truncated = VALID.replace("%2Freturn", "%2Freturn%25A");
        assert!(parse(&truncated).is_none());

        let bad_utf8 = VALID.replace("%2Freturn", "%2F%25C3%2528");
        assert!(matches!(
            decode(&bad_utf8),
            Err(IntentError::Encoding { name: "callback_url", .. })
        ));
    }

    #[test]
    fn plus_decodes_to_space() {
        let url = VALID.replace("business_name=Acme", "business_name=Acme+Parcel%20Co");
        assert_eq!(parse(&url).unwrap().business_name, "Acme Parcel Co");
    }

    #[test]
    fn parcel_draft_carries_intent_values() {
        let draft = parse(VALID).unwrap().parcel_draft();
        assert_eq!(draft.size, "small");
        assert_eq!(
            (draft.length, draft.width, draft.height, draft.weight),
            (10.0, 5.0, 2.0, 1.0)
        );
        assert!(draft.fragile);
    }

    #[test]
    fn leading_float_matches_prefix_rules() {
        assert_eq!(leading_float("  3.25kg"), Some(3.25));
        assert_eq!(leading_float(".5"), Some(0.5));
        assert_eq!(leading_float("7."), Some(7.0));
        assert_eq!(leading_float("2e3x"), Some(2000.0));
        assert_eq!(leading_float("2e"), Some(2.0));
        assert_eq!(leading_float("-"), None);
        assert_eq!(leading_float("."), None);
        assert_eq!(leading_float("kg"), None);
    }
}
