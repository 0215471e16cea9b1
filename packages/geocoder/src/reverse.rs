//! Nominatim reverse-geocoding call and response parsing.
//!
//! A reverse lookup returns a single JSON object (not an array like the
//! search endpoint); "no result" is reported as an `error` member with
//! HTTP 200, so it is handled during parsing rather than at the status
//! level.

use addrfix_geocoder_models::{OsmAddress, OsmType, compose_name};

use crate::GeocodeError;

/// Resolves a coordinate pair through the `/reverse` endpoint.
///
/// Returns `Ok(None)` when the provider cannot geocode the location.
///
/// # Errors
///
/// Returns [`GeocodeError`] on out-of-range coordinates, HTTP failures,
/// rate limiting, or a response missing the OSM identifiers.
pub async fn reverse_geocode(
    client: &reqwest::Client,
    base_url: &str,
    latitude: f64,
    longitude: f64,
) -> Result<Option<OsmAddress>, GeocodeError> {
    validate_coordinates(latitude, longitude)?;

    let lat = latitude.to_string();
    let lon = longitude.to_string();

    let resp = client
        .get(format!("{base_url}/reverse"))
        .query(&[("format", "json"), ("lat", lat.as_str()), ("lon", lon.as_str())])
        .send()
        .await?;

    if resp.status() == reqwest::StatusCode::TOO_MANY_REQUESTS {
        return Err(GeocodeError::RateLimited);
    }

    let body: serde_json::Value = resp.json().await?;
    parse_response(&body, latitude, longitude)
}

/// Checks that the coordinates lie within the WGS84 domain.
///
/// # Errors
///
/// Returns [`GeocodeError::InvalidCoordinates`] when either value is out
/// of range.
pub fn validate_coordinates(latitude: f64, longitude: f64) -> Result<(), GeocodeError> {
    if (-90.0..=90.0).contains(&latitude) && (-180.0..=180.0).contains(&longitude) {
        Ok(())
    } else {
        Err(GeocodeError::InvalidCoordinates {
            latitude,
            longitude,
        })
    }
}

/// Parses a Nominatim reverse-geocode JSON response.
///
/// The queried coordinates are carried through unchanged; the provider's
/// own coordinates are never used to overwrite telemetry data. A response
/// without `osm_id`/`osm_type` is rejected — those two fields form the
/// address natural key and must never be defaulted.
fn parse_response(
    body: &serde_json::Value,
    latitude: f64,
    longitude: f64,
) -> Result<Option<OsmAddress>, GeocodeError> {
    // "Unable to geocode" arrives as an error member with HTTP 200.
    if body.get("error").is_some() {
        return Ok(None);
    }

    let osm_id = body["osm_id"]
        .as_i64()
        .ok_or_else(|| GeocodeError::Parse {
            message: "Missing osm_id in reverse geocode response".to_string(),
        })?;

    let osm_type = body["osm_type"]
        .as_str()
        .and_then(|s| s.parse::<OsmType>().ok())
        .ok_or_else(|| GeocodeError::Parse {
            message: "Missing or unknown osm_type in reverse geocode response".to_string(),
        })?;

    let address = &body["address"];
    let field = |key: &str| address[key].as_str().unwrap_or_default().to_string();

    Ok(Some(OsmAddress {
        latitude,
        longitude,
        display_name: body["display_name"].as_str().unwrap_or_default().to_string(),
        name: compose_name(address["road"].as_str(), address["house_number"].as_str()),
        house_number: field("house_number"),
        road: field("road"),
        neighbourhood: field("neighbourhood"),
        city: field("city"),
        county: field("county"),
        postcode: field("postcode"),
        state: field("state"),
        state_district: field("state_district"),
        country: field("country"),
        raw: if address.is_object() {
            address.to_string()
        } else {
            "{}".to_string()
        },
        osm_id,
        osm_type,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_reverse_result() {
        let body = serde_json::json!({
            "place_id": 109_305_457,
            "osm_type": "way",
            "osm_id": 169_249_786,
            "lat": "52.54877605",
            "lon": "-1.81627033",
            "display_name": "137, Pilkington Avenue, Sutton Coldfield, Birmingham, England, B72 1LH, United Kingdom",
            "address": {
                "house_number": "137",
                "road": "Pilkington Avenue",
                "city": "Birmingham",
                "state_district": "West Midlands",
                "state": "England",
                "postcode": "B72 1LH",
                "country": "United Kingdom"
            }
        });

        let address = parse_response(&body, 52.5487, -1.8164).unwrap().unwrap();
        assert_eq!(address.natural_key(), (169_249_786, OsmType::Way));
        assert_eq!(address.name, "Pilkington Avenue 137");
        assert_eq!(address.road, "Pilkington Avenue");
        assert_eq!(address.city, "Birmingham");
        assert_eq!(address.neighbourhood, "");
        // The queried coordinates win over the provider's.
        assert!((address.latitude - 52.5487).abs() < 1e-9);
        assert!((address.longitude - -1.8164).abs() < 1e-9);
        assert!(address.raw.contains("Pilkington"));
    }

    #[test]
    fn treats_provider_error_as_no_result() {
        let body = serde_json::json!({ "error": "Unable to geocode" });
        assert!(parse_response(&body, 0.0, 0.0).unwrap().is_none());
    }

    #[test]
    fn rejects_response_without_osm_id() {
        let body = serde_json::json!({
            "osm_type": "node",
            "display_name": "Somewhere",
            "address": {}
        });
        assert!(matches!(
            parse_response(&body, 1.0, 2.0),
            Err(GeocodeError::Parse { .. })
        ));
    }

    #[test]
    fn rejects_unknown_osm_type() {
        let body = serde_json::json!({
            "osm_id": 42,
            "osm_type": "galaxy",
            "address": {}
        });
        assert!(matches!(
            parse_response(&body, 1.0, 2.0),
            Err(GeocodeError::Parse { .. })
        ));
    }

    #[test]
    fn tolerates_missing_address_object() {
        let body = serde_json::json!({
            "osm_id": 7,
            "osm_type": "node",
            "display_name": "Middle of nowhere"
        });
        let address = parse_response(&body, 10.0, 20.0).unwrap().unwrap();
        assert_eq!(address.road, "");
        assert_eq!(address.name, "");
        assert_eq!(address.raw, "{}");
    }

    #[test]
    fn validates_coordinate_ranges() {
        assert!(validate_coordinates(52.5, 13.4).is_ok());
        assert!(validate_coordinates(90.0, 180.0).is_ok());
        assert!(matches!(
            validate_coordinates(91.0, 0.0),
            Err(GeocodeError::InvalidCoordinates { .. })
        ));
        assert!(matches!(
            validate_coordinates(0.0, -180.5),
            Err(GeocodeError::InvalidCoordinates { .. })
        ));
    }
}
