#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions)]

//! Resolved-address types shared between the reverse geocoder and the
//! database layer.
//!
//! An [`OsmAddress`] carries the attributes the provider returns for a
//! coordinate pair plus the `(osm_id, osm_type)` pair that forms the
//! natural key of the `addresses` table.

use serde::{Deserialize, Serialize};
use strum_macros::{AsRefStr, Display, EnumString};

/// OSM entity classifier — the second half of the address natural key.
#[derive(
    AsRefStr,
    Display,
    EnumString,
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Serialize,
    Deserialize,
)]
#[strum(serialize_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum OsmType {
    /// A single point feature.
    Node,
    /// An ordered list of nodes (roads, building outlines).
    Way,
    /// A group of other elements (boundaries, routes).
    Relation,
}

/// An address resolved from a recorded position's coordinates.
///
/// The latitude/longitude are the *queried* coordinates, not the
/// provider's — the provider's higher-precision values never overwrite
/// telemetry data. Attributes the provider omits are carried as empty
/// strings, matching what the telemetry system itself stores.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OsmAddress {
    /// Latitude the lookup was made for (WGS84).
    pub latitude: f64,
    /// Longitude the lookup was made for (WGS84).
    pub longitude: f64,
    /// Full human-readable address line.
    pub display_name: String,
    /// Short name composed from road and house number.
    pub name: String,
    pub house_number: String,
    pub road: String,
    pub neighbourhood: String,
    pub city: String,
    pub county: String,
    pub postcode: String,
    pub state: String,
    pub state_district: String,
    pub country: String,
    /// The provider's `address` JSON object, serialized verbatim.
    pub raw: String,
    /// External numeric identifier of the matched OSM entity.
    pub osm_id: i64,
    /// Entity classifier paired with `osm_id` to form the natural key.
    pub osm_type: OsmType,
}

impl OsmAddress {
    /// The `(osm_id, osm_type)` pair that uniquely names this address.
    #[must_use]
    pub const fn natural_key(&self) -> (i64, OsmType) {
        (self.osm_id, self.osm_type)
    }
}

/// Composes the `name` column the way the telemetry system does:
/// `"{road} {house_number}"` when both are known, the road alone when
/// only it is, empty otherwise. Empty strings count as unknown.
#[must_use]
pub fn compose_name(road: Option<&str>, house_number: Option<&str>) -> String {
    let road = road.filter(|r| !r.is_empty());
    let number = house_number.filter(|n| !n.is_empty());

    match (road, number) {
        (Some(road), Some(number)) => format!("{road} {number}"),
        (Some(road), None) => road.to_string(),
        _ => String::new(),
    }
}
