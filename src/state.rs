//! Shared application state handed to every route through an `Extension`.

use std::sync::Arc;

use crate::config::Config;
use crate::gateway::GatewayClient;
use crate::geocoding::{Geocoder, GoogleGeocoder};
use crate::maps::MapsLoader;
use crate::session::SessionStore;

pub struct AppState {
    pub config: Config,
    pub sessions: SessionStore,
    pub gateway: Arc<GatewayClient>,
    pub geocoder: Arc<dyn Geocoder>,
    pub maps: MapsLoader,
}

impl AppState {
    /// State backed by the Google geocoding provider.
    pub fn from_config(config: Config) -> Result<Arc<Self>, reqwest::Error> {
        let geocoder = GoogleGeocoder::new(
            config.geocoding_api_url.clone(),
            config.maps_api_key.clone(),
            config.geocode_timeout,
        )?;
        Self::with_geocoder(config, Arc::new(geocoder))
    }

    pub fn with_geocoder(
        config: Config,
        geocoder: Arc<dyn Geocoder>,
    ) -> Result<Arc<Self>, reqwest::Error> {
        let gateway = GatewayClient::new(&config.gateway_api_url, config.gateway_timeout)?;
        let maps = MapsLoader::new(
            &config.maps_script_url,
            &config.maps_api_key,
            config.maps_timeout,
        )?;

        Ok(Arc::new(Self {
            config,
            sessions: SessionStore::new(),
            gateway: Arc::new(gateway),
            geocoder,
            maps,
        }))
    }
}

pub type SharedState = Arc<AppState>;
