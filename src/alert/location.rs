//! Last known location for outgoing alerts.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::{Arc, RwLock};

/// A WGS84 coordinate pair.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GeoPoint {
    pub latitude: f64,
    pub longitude: f64,
}

impl GeoPoint {
    /// Sentinel sent when no fix is available.
    pub const UNKNOWN: GeoPoint = GeoPoint {
        latitude: 0.0,
        longitude: 0.0,
    };

    pub fn new(latitude: f64, longitude: f64) -> Self {
        Self {
            latitude,
            longitude,
        }
    }

    pub fn is_unknown(&self) -> bool {
        *self == Self::UNKNOWN
    }

    /// Parse `"lat,lon"`.
    pub fn parse(s: &str) -> Option<Self> {
        let (lat, lon) = s.split_once(',')?;
        let latitude: f64 = lat.trim().parse().ok()?;
        let longitude: f64 = lon.trim().parse().ok()?;
        if !(-90.0..=90.0).contains(&latitude) || !(-180.0..=180.0).contains(&longitude) {
            return None;
        }
        Some(Self::new(latitude, longitude))
    }
}

/// Map center used before the first fix (Lima).
pub const DEFAULT_MAP_CENTER: GeoPoint = GeoPoint {
    latitude: -12.0464,
    longitude: -77.0428,
};

/// A location fix and when it was taken.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LocationFix {
    pub point: GeoPoint,
    pub at: DateTime<Utc>,
}

/// Shared holder for the most recent location fix.
#[derive(Debug, Clone, Default)]
pub struct LocationCache {
    inner: Arc<RwLock<Option<LocationFix>>>,
}

impl LocationCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_fix(fix: LocationFix) -> Self {
        let cache = Self::new();
        cache.record(fix);
        cache
    }

    /// Record a fresh fix taken now.
    pub fn update(&self, point: GeoPoint) {
        self.record(LocationFix {
            point,
            at: Utc::now(),
        });
    }

    pub fn record(&self, fix: LocationFix) {
        let mut guard = self.inner.write().unwrap_or_else(|e| e.into_inner());
        *guard = Some(fix);
    }

    pub fn last_fix(&self) -> Option<LocationFix> {
        *self.inner.read().unwrap_or_else(|e| e.into_inner())
    }

    /// Last known point, or [`GeoPoint::UNKNOWN`].
    pub fn resolve(&self) -> GeoPoint {
        self.last_fix()
            .map(|fix| fix.point)
            .unwrap_or(GeoPoint::UNKNOWN)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resolve_without_fix_is_sentinel() {
        let cache = LocationCache::new();
        assert!(cache.resolve().is_unknown());
        assert!(cache.last_fix().is_none());
    }

    #[test]
    fn test_update_is_visible_to_clones() {
        let cache = LocationCache::new();
        let reader = cache.clone();
        cache.update(GeoPoint::new(-12.1, -77.0));
        assert_eq!(reader.resolve(), GeoPoint::new(-12.1, -77.0));
    }

    #[test]
    fn test_parse() {
        assert_eq!(
            GeoPoint::parse("-12.0464, -77.0428"),
            Some(DEFAULT_MAP_CENTER)
        );
        assert_eq!(GeoPoint::parse("91,0"), None);
        assert_eq!(GeoPoint::parse("abc"), None);
    }
}
