//! Geocoordinate cache types.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// A resolved longitude/latitude pair.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Coordinate {
    pub longitude: f64,
    pub latitude: f64,
}

/// Outcome of geocoding one location name.
///
/// `NotFound` is an explicit, persisted sentinel: once the provider says a
/// name has no match, subsequent runs skip it instead of re-querying a
/// rate-limited API.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum GeoResolution {
    Found { longitude: f64, latitude: f64 },
    NotFound,
}

impl GeoResolution {
    /// Coordinate if resolution succeeded.
    pub fn coordinate(&self) -> Option<Coordinate> {
        match self {
            GeoResolution::Found {
                longitude,
                latitude,
            } => Some(Coordinate {
                longitude: *longitude,
                latitude: *latitude,
            }),
            GeoResolution::NotFound => None,
        }
    }
}

/// Location name to resolved coordinate (or not-found sentinel).
///
/// Ordered map so the persisted snapshot serializes stably across runs.
pub type GeoSnapshot = BTreeMap<String, GeoResolution>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_found_serialization() {
        let res = GeoResolution::Found {
            longitude: -0.1,
            latitude: 51.5,
        };
        let json = serde_json::to_string(&res).unwrap();
        assert!(json.contains("\"status\":\"found\""));

        let parsed: GeoResolution = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, res);
    }

    #[test]
    fn test_not_found_serialization() {
        let json = serde_json::to_string(&GeoResolution::NotFound).unwrap();
        assert_eq!(json, "{\"status\":\"not_found\"}");
    }

    #[test]
    fn test_coordinate_accessor() {
        let found = GeoResolution::Found {
            longitude: -0.1,
            latitude: 51.5,
        };
        assert_eq!(
            found.coordinate(),
            Some(Coordinate {
                longitude: -0.1,
                latitude: 51.5
            })
        );
        assert_eq!(GeoResolution::NotFound.coordinate(), None);
    }

    #[test]
    fn test_snapshot_roundtrip() {
        let mut snapshot = GeoSnapshot::new();
        snapshot.insert(
            "The Star".to_string(),
            GeoResolution::Found {
                longitude: -0.1,
                latitude: 51.5,
            },
        );
        snapshot.insert("Nowhere".to_string(), GeoResolution::NotFound);

        let json = serde_json::to_string(&snapshot).unwrap();
        let parsed: GeoSnapshot = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, snapshot);
    }
}
