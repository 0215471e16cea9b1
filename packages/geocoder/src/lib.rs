#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Reverse-geocoding client for the telemetry address repair job.
//!
//! Resolves latitude/longitude pairs to structured addresses through a
//! Nominatim-compatible endpoint. The public instance enforces a strict
//! rate limit of **1 request per second**; pacing is the caller's
//! responsibility (see `OSM_RESOLVE_INTERVAL_MS` in `addrfix_repair`).
//!
//! See <https://nominatim.org/release-docs/develop/api/Reverse/>

pub mod reverse;

use std::time::Duration;

use addrfix_geocoder_models::OsmAddress;
use thiserror::Error;

/// Default public Nominatim endpoint.
pub const DEFAULT_BASE_URL: &str = "https://nominatim.openstreetmap.org";

/// User agent sent with every request. Nominatim's usage policy requires
/// one that identifies the application.
pub const USER_AGENT: &str = "addrfix/0.1";

/// Errors from reverse-geocoding operations.
#[derive(Debug, Error)]
pub enum GeocodeError {
    /// HTTP request failed (including proxy and timeout errors).
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Response parsing failed.
    #[error("Parse error: {message}")]
    Parse {
        /// Description of the parsing failure.
        message: String,
    },

    /// Rate limit exceeded.
    #[error("Rate limit exceeded")]
    RateLimited,

    /// Input coordinates outside the valid WGS84 range.
    #[error("Coordinates out of range: ({latitude}, {longitude})")]
    InvalidCoordinates {
        /// Latitude as supplied.
        latitude: f64,
        /// Longitude as supplied.
        longitude: f64,
    },
}

/// Builds the HTTP client used for all geocoding requests.
///
/// The timeout applies per request; when `proxy` is set it routes
/// requests for every scheme.
///
/// # Errors
///
/// Returns [`GeocodeError`] if the proxy URL is invalid or the client
/// cannot be constructed.
pub fn build_client(
    timeout: Duration,
    proxy: Option<&str>,
) -> Result<reqwest::Client, GeocodeError> {
    let mut builder = reqwest::Client::builder()
        .user_agent(USER_AGENT)
        .timeout(timeout);

    if let Some(url) = proxy {
        builder = builder.proxy(reqwest::Proxy::all(url)?);
    }

    Ok(builder.build()?)
}

/// Resolves coordinates to addresses.
///
/// The seam between the repair job and the network: production code uses
/// [`NominatimGeocoder`], tests substitute a scripted implementation.
#[async_trait::async_trait]
pub trait ReverseGeocoder: Send + Sync {
    /// Resolves a coordinate pair to an address.
    ///
    /// Returns `Ok(None)` when the provider has no result for the
    /// location.
    ///
    /// # Errors
    ///
    /// Returns [`GeocodeError`] on invalid coordinates, transport
    /// failures, rate limiting, or an unparseable response.
    async fn reverse(
        &self,
        latitude: f64,
        longitude: f64,
    ) -> Result<Option<OsmAddress>, GeocodeError>;
}

/// [`ReverseGeocoder`] backed by a Nominatim-compatible endpoint.
pub struct NominatimGeocoder {
    client: reqwest::Client,
    base_url: String,
}

impl NominatimGeocoder {
    /// Creates a geocoder that queries `base_url` with `client`.
    #[must_use]
    pub fn new(client: reqwest::Client, base_url: impl Into<String>) -> Self {
        Self {
            client,
            base_url: base_url.into(),
        }
    }
}

#[async_trait::async_trait]
impl ReverseGeocoder for NominatimGeocoder {
    async fn reverse(
        &self,
        latitude: f64,
        longitude: f64,
    ) -> Result<Option<OsmAddress>, GeocodeError> {
        reverse::reverse_geocode(&self.client, &self.base_url, latitude, longitude).await
    }
}
