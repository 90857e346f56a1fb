//! Post-submission redirect back to the partner.

use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum DeliveryOutcome {
    Success,
    Failure,
}

impl DeliveryOutcome {
    pub fn as_str(&self) -> &'static str {
        match self {
            DeliveryOutcome::Success => "success",
            DeliveryOutcome::Failure => "failure",
        }
    }
}

/// Build `<callback_url>?delivery=<outcome>`.
///
/// With `uniform_success` every outcome is reported as `success`, which is
/// what partners integrated against the first checkout page expect.
/// An existing query string is extended and a fragment is kept at the end.
pub fn callback_redirect(
    callback_url: &str,
    outcome: DeliveryOutcome,
    uniform_success: bool,
) -> String {
    let outcome = if uniform_success {
        DeliveryOutcome::Success
    } else {
        outcome
    };

    let (base, fragment) = match callback_url.split_once('#') {
        Some((base, fragment)) => (base, Some(fragment)),
        None => (callback_url, None),
    };
    let separator = match base.find('?') {
        None => "?",
        Some(i) if i + 1 == base.len() || base.ends_with('&') => "",
        Some(_) => "&",
    };

    let mut url = format!("{base}{separator}delivery={}", outcome.as_str());
    if let Some(fragment) = fragment {
        url.push('#');
        url.push_str(fragment);
    }
    url
}
