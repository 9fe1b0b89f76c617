//! Geocoding client and radius math
//!
//! Addresses are resolved through an external MapQuest-compatible HTTP
//! provider behind the `Geocoder` trait, so handlers and hooks never see
//! the wire format. Radius filtering happens in-process with great-circle
//! distances.

use async_trait::async_trait;
use serde::Deserialize;
use tracing::debug;

use crate::error::{ApiError, ApiResult};
use crate::models::bootcamp::Location;

pub const EARTH_RADIUS_MILES: f64 = 3963.2;
pub const EARTH_RADIUS_KM: f64 = 6378.1;

/// Resolves a postal address to a geocoded location
#[async_trait]
pub trait Geocoder: Send + Sync {
    async fn geocode(&self, address: &str) -> ApiResult<Location>;
}

/// Geocoder provider settings
#[derive(Debug, Clone)]
pub struct GeocoderConfig {
    pub api_key: String,
    pub base_url: String,
}

impl GeocoderConfig {
    pub fn from_env() -> anyhow::Result<Self> {
        Ok(Self {
            api_key: std::env::var("GEOCODER_API_KEY")
                .map_err(|_| anyhow::anyhow!("GEOCODER_API_KEY must be set"))?,
            base_url: std::env::var("GEOCODER_URL")
                .unwrap_or_else(|_| "https://www.mapquestapi.com/geocoding/v1".to_string()),
        })
    }
}

/// MapQuest-compatible HTTP geocoder
pub struct HttpGeocoder {
    client: reqwest::Client,
    config: GeocoderConfig,
}

#[derive(Debug, Deserialize)]
struct GeocodeResponse {
    results: Vec<GeocodeResult>,
}

#[derive(Debug, Deserialize)]
struct GeocodeResult {
    locations: Vec<ProviderLocation>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ProviderLocation {
    lat_lng: LatLng,
    #[serde(default)]
    street: String,
    /// City
    #[serde(default)]
    admin_area5: String,
    /// State
    #[serde(default)]
    admin_area3: String,
    /// Country
    #[serde(default)]
    admin_area1: String,
    #[serde(default)]
    postal_code: String,
}

#[derive(Debug, Deserialize)]
struct LatLng {
    lat: f64,
    lng: f64,
}

impl HttpGeocoder {
    pub fn new(config: GeocoderConfig) -> Self {
        Self {
            client: reqwest::Client::new(),
            config,
        }
    }
}

#[async_trait]
impl Geocoder for HttpGeocoder {
    async fn geocode(&self, address: &str) -> ApiResult<Location> {
        let url = format!("{}/address", self.config.base_url);
        let response = self
            .client
            .get(&url)
            .query(&[("key", self.config.api_key.as_str()), ("location", address)])
            .send()
            .await
            .map_err(|e| ApiError::Internal(anyhow::anyhow!("Geocoder request failed: {}", e)))?
            .error_for_status()
            .map_err(|e| ApiError::Internal(anyhow::anyhow!("Geocoder returned an error: {}", e)))?
            .json::<GeocodeResponse>()
            .await
            .map_err(|e| ApiError::Internal(anyhow::anyhow!("Invalid geocoder response: {}", e)))?;

        let provided = response
            .results
            .into_iter()
            .flat_map(|r| r.locations)
            .next()
            .ok_or_else(|| {
                ApiError::Validation("Could not geocode the provided address".to_string())
            })?;

        debug!(address, "Geocoded address");
        Ok(provided.into())
    }
}

impl From<ProviderLocation> for Location {
    fn from(p: ProviderLocation) -> Self {
        let formatted = [
            p.street.as_str(),
            p.admin_area5.as_str(),
            p.admin_area3.as_str(),
            p.postal_code.as_str(),
            p.admin_area1.as_str(),
        ]
        .iter()
        .filter(|part| !part.is_empty())
        .cloned()
        .collect::<Vec<_>>()
        .join(", ");

        Location {
            kind: "Point".to_string(),
            coordinates: [p.lat_lng.lng, p.lat_lng.lat],
            formatted_address: non_empty(formatted),
            street: non_empty(p.street),
            city: non_empty(p.admin_area5),
            state: non_empty(p.admin_area3),
            zipcode: non_empty(p.postal_code),
            country: non_empty(p.admin_area1),
        }
    }
}

fn non_empty(s: String) -> Option<String> {
    if s.is_empty() { None } else { Some(s) }
}

/// Geocoder that resolves every address to one fixed location. Test double
/// for exercising write pipelines without network access.
pub struct FixedGeocoder(pub Location);

#[async_trait]
impl Geocoder for FixedGeocoder {
    async fn geocode(&self, _address: &str) -> ApiResult<Location> {
        Ok(self.0.clone())
    }
}

/// Great-circle distance between two `[longitude, latitude]` points, in
/// the unit of the given sphere radius
pub fn distance(a: [f64; 2], b: [f64; 2], sphere_radius: f64) -> f64 {
    let (lng1, lat1) = (a[0].to_radians(), a[1].to_radians());
    let (lng2, lat2) = (b[0].to_radians(), b[1].to_radians());

    let dlat = lat2 - lat1;
    let dlng = lng2 - lng1;
    let h = (dlat / 2.0).sin().powi(2) + lat1.cos() * lat2.cos() * (dlng / 2.0).sin().powi(2);
    2.0 * h.sqrt().asin() * sphere_radius
}

/// Whether a point lies within `max_distance` of the center, both in the
/// unit of the sphere radius
pub fn within_radius(center: [f64; 2], point: [f64; 2], max_distance: f64, sphere_radius: f64) -> bool {
    distance(center, point, sphere_radius) <= max_distance
}

#[cfg(test)]
mod tests {
    use super::*;

    // Boston and New York, roughly 190 miles apart
    const BOSTON: [f64; 2] = [-71.0589, 42.3601];
    const NEW_YORK: [f64; 2] = [-74.0060, 40.7128];

    #[test]
    fn known_city_pair_distance_is_plausible() {
        let miles = distance(BOSTON, NEW_YORK, EARTH_RADIUS_MILES);
        assert!((180.0..200.0).contains(&miles), "got {miles}");

        let km = distance(BOSTON, NEW_YORK, EARTH_RADIUS_KM);
        assert!((290.0..320.0).contains(&km), "got {km}");
    }

    #[test]
    fn distance_to_self_is_zero() {
        assert_eq!(distance(BOSTON, BOSTON, EARTH_RADIUS_MILES), 0.0);
    }

    #[test]
    fn radius_check_brackets_the_distance() {
        assert!(within_radius(BOSTON, NEW_YORK, 250.0, EARTH_RADIUS_MILES));
        assert!(!within_radius(BOSTON, NEW_YORK, 100.0, EARTH_RADIUS_MILES));
    }

    #[test]
    fn provider_location_maps_to_geojson_point() {
        let provided = ProviderLocation {
            lat_lng: LatLng {
                lat: 42.3601,
                lng: -71.0589,
            },
            street: "233 Bay State Rd".to_string(),
            admin_area5: "Boston".to_string(),
            admin_area3: "MA".to_string(),
            admin_area1: "US".to_string(),
            postal_code: "02215".to_string(),
        };
        let location: Location = provided.into();
        assert_eq!(location.kind, "Point");
        assert_eq!(location.coordinates, [-71.0589, 42.3601]);
        assert_eq!(location.city.as_deref(), Some("Boston"));
        assert_eq!(
            location.formatted_address.as_deref(),
            Some("233 Bay State Rd, Boston, MA, 02215, US")
        );
    }

    #[test]
    fn empty_provider_fields_become_none() {
        let provided = ProviderLocation {
            lat_lng: LatLng { lat: 1.0, lng: 2.0 },
            street: String::new(),
            admin_area5: String::new(),
            admin_area3: String::new(),
            admin_area1: String::new(),
            postal_code: String::new(),
        };
        let location: Location = provided.into();
        assert!(location.street.is_none());
        assert!(location.formatted_address.is_none());
    }
}
