//! Location resolution through a geocoding provider.
//!
//! The [`Geocoder`] trait is the seam the checkout routes depend on;
//! [`GoogleGeocoder`] implements it against the Google Geocoding JSON API.
//! Every call is a single attempt bounded by the client timeout.

use std::time::Duration;

use async_trait::async_trait;
use serde::Deserialize;
use tracing::debug;

/// A place returned by the provider.
#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedPlace {
    pub latitude: f64,
    pub longitude: f64,
    pub address: String,
    pub postal_code: Option<String>,
}

#[derive(Debug, thiserror::Error)]
pub enum GeocodeError {
    #[error("geocoding request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("no results for {0}")]
    NotFound(String),

    #[error("geocoding provider returned {status}{}", message_suffix(.message))]
    Provider {
        status: String,
        message: Option<String>,
    },
}

fn message_suffix(message: &Option<String>) -> String {
    message
        .as_deref()
        .map(|m| format!(": {m}"))
        .unwrap_or_default()
}

#[async_trait]
pub trait Geocoder: Send + Sync {
    /// Address of the given coordinates.
    async fn reverse(&self, latitude: f64, longitude: f64) -> Result<ResolvedPlace, GeocodeError>;

    /// Coordinates and canonical address of a free-text query.
    async fn forward(&self, query: &str) -> Result<ResolvedPlace, GeocodeError>;
}

pub struct GoogleGeocoder {
    client: reqwest::Client,
    endpoint: String,
    api_key: String,
}

impl GoogleGeocoder {
    pub fn new(
        endpoint: impl Into<String>,
        api_key: impl Into<String>,
        timeout: Duration,
    ) -> Result<Self, reqwest::Error> {
        Ok(Self {
            client: reqwest::Client::builder().timeout(timeout).build()?,
            endpoint: endpoint.into(),
            api_key: api_key.into(),
        })
    }

    async fn lookup(&self, param: (&str, &str), what: &str) -> Result<ResolvedPlace, GeocodeError> {
        let body: GeocodeResponse = self
            .client
            .get(&self.endpoint)
            .query(&[param, ("key", self.api_key.as_str())])
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;

        debug!("Geocoding {} returned status {}", what, body.status);

        match body.status.as_str() {
            "OK" => {}
            "ZERO_RESULTS" => return Err(GeocodeError::NotFound(what.to_string())),
            _ => {
                return Err(GeocodeError::Provider {
                    status: body.status,
                    message: body.error_message,
                })
            }
        }

        body.results
            .into_iter()
            .next()
            .map(GeocodeResult::into_place)
            .ok_or_else(|| GeocodeError::NotFound(what.to_string()))
    }
}

#[async_trait]
impl Geocoder for GoogleGeocoder {
    async fn reverse(&self, latitude: f64, longitude: f64) -> Result<ResolvedPlace, GeocodeError> {
        let latlng = format!("{latitude},{longitude}");
        self.lookup(("latlng", &latlng), &latlng).await
    }

    async fn forward(&self, query: &str) -> Result<ResolvedPlace, GeocodeError> {
        self.lookup(("address", query), &format!("{query:?}")).await
    }
}

// ============================================================================
// Provider response
// ============================================================================

#[derive(Debug, Deserialize)]
struct GeocodeResponse {
    status: String,
    #[serde(default)]
    error_message: Option<String>,
    #[serde(default)]
    results: Vec<GeocodeResult>,
}

#[derive(Debug, Deserialize)]
struct GeocodeResult {
    formatted_address: String,
    geometry: Geometry,
    #[serde(default)]
    address_components: Vec<AddressComponent>,
}

#[derive(Debug, Deserialize)]
struct Geometry {
    location: LatLng,
}

#[derive(Debug, Deserialize)]
struct LatLng {
    lat: f64,
    lng: f64,
}

#[derive(Debug, Deserialize)]
struct AddressComponent {
    long_name: String,
    #[serde(default)]
    types: Vec<String>,
}

impl GeocodeResult {
    fn into_place(self) -> ResolvedPlace {
        let postal_code = self
            .address_components
            .into_iter()
            .find(|c| c.types.iter().any(|t| t == "postal_code"))
            .map(|c| c.long_name);

        ResolvedPlace {
            latitude: self.geometry.location.lat,
            longitude: self.geometry.location.lng,
            address: self.formatted_address,
            postal_code,
        }
    }
}
