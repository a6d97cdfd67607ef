//! Submission coordinate resolution and jitter.
//!
//! Resolution never fails: a malformed or missing per-identity override
//! degrades to the configured default, and a default of exactly (0, 0) --
//! the "operator never configured anything" signature -- degrades to a
//! hardcoded fallback so submissions always carry a plausible location.

use autosign_core::settings::Settings;
use autosign_store::{keys, TtlStore};
use rand::Rng;

/// Fallback coordinates used when resolution lands on exactly (0, 0).
pub const FALLBACK_LAT: f64 = 34.212723;
pub const FALLBACK_LON: f64 = 117.142737;

/// One jitter unit: a millionth of a degree, roughly 0.1 m.
const JITTER_STEP: f64 = 0.000001;

/// Resolve submission coordinates for an identity as `(lat, lon)`.
///
/// Precedence: parseable per-identity override, then the configured
/// default, then [`FALLBACK_LAT`]/[`FALLBACK_LON`] when the result is
/// exactly (0, 0).
pub async fn resolve(store: &dyn TtlStore, settings: &dyn Settings, token: &str) -> (f64, f64) {
    let (mut lat, mut lon) = settings.default_coords();

    match store.get(&keys::gps_override(token)).await {
        Ok(Some(raw)) => {
            if let Some((user_lat, user_lon)) = parse_override(&raw) {
                lat = user_lat;
                lon = user_lon;
                tracing::debug!(token, lat, lon, "Using per-identity GPS override");
            } else {
                tracing::warn!(token, raw = %raw, "Malformed GPS override; using default");
            }
        }
        Ok(None) => {}
        Err(e) => {
            tracing::warn!(token, error = %e, "GPS override lookup failed; using default");
        }
    }

    if lat == 0.0 && lon == 0.0 {
        (FALLBACK_LAT, FALLBACK_LON)
    } else {
        (lat, lon)
    }
}

/// Parse an override string: longitude first, then latitude, separated by
/// an ASCII or full-width comma. Whitespace around either number is fine.
pub fn parse_override(raw: &str) -> Option<(f64, f64)> {
    let normalized = raw.replace('，', ",");
    let mut parts = normalized.split(',');
    let lon = parts.next()?.trim().parse::<f64>().ok()?;
    let lat = parts.next()?.trim().parse::<f64>().ok()?;
    if parts.next().is_some() {
        return None;
    }
    Some((lat, lon))
}

/// Perturb coordinates by an independent uniform integer offset in
/// [-20, 20] jitter units per axis, so repeated submissions from one spot
/// do not look machine-identical.
pub fn jitter(lat: f64, lon: f64) -> (f64, f64) {
    let mut rng = rand::rng();
    (
        lat + f64::from(rng.random_range(-20..=20)) * JITTER_STEP,
        lon + f64::from(rng.random_range(-20..=20)) * JITTER_STEP,
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use autosign_core::settings::StaticSettings;
    use autosign_store::MemoryStore;

    #[test]
    fn override_parsing_is_lon_first_and_comma_tolerant() {
        assert_eq!(
            parse_override("113.399319,23.038859"),
            Some((23.038859, 113.399319))
        );
        assert_eq!(
            parse_override(" 113.399319 ， 23.038859 "),
            Some((23.038859, 113.399319))
        );
    }

    #[test]
    fn malformed_overrides_are_rejected() {
        assert_eq!(parse_override(""), None);
        assert_eq!(parse_override("113.4"), None);
        assert_eq!(parse_override("113.4,abc"), None);
        assert_eq!(parse_override("1,2,3"), None);
    }

    #[tokio::test]
    async fn override_beats_configured_default() {
        let store = MemoryStore::new();
        store
            .set(&keys::gps_override("tok"), "113.399319,23.038859", None)
            .await
            .unwrap();
        let settings = StaticSettings {
            default_lat: 31.0,
            default_lon: 121.0,
            ..StaticSettings::default()
        };
        assert_eq!(
            resolve(&store, &settings, "tok").await,
            (23.038859, 113.399319)
        );
    }

    #[tokio::test]
    async fn malformed_override_falls_back_to_default() {
        let store = MemoryStore::new();
        store
            .set(&keys::gps_override("tok"), "garbage", None)
            .await
            .unwrap();
        let settings = StaticSettings {
            default_lat: 31.0,
            default_lon: 121.0,
            ..StaticSettings::default()
        };
        assert_eq!(resolve(&store, &settings, "tok").await, (31.0, 121.0));
    }

    #[tokio::test]
    async fn exact_origin_resolves_to_the_hardcoded_fallback() {
        let store = MemoryStore::new();
        let settings = StaticSettings::default(); // defaults are (0, 0)
        assert_eq!(
            resolve(&store, &settings, "tok").await,
            (FALLBACK_LAT, FALLBACK_LON)
        );
    }

    #[tokio::test]
    async fn half_zero_defaults_are_left_alone() {
        let store = MemoryStore::new();
        let settings = StaticSettings {
            default_lat: 0.0,
            default_lon: 121.0,
            ..StaticSettings::default()
        };
        assert_eq!(resolve(&store, &settings, "tok").await, (0.0, 121.0));
    }

    #[test]
    fn jitter_stays_within_twenty_units_per_axis() {
        // Tolerance slightly above 20 units to absorb float rounding at
        // the extremes of the offset range.
        let bound = 20.0 * JITTER_STEP + 1e-9;
        for _ in 0..10_000 {
            let (lat, lon) = jitter(34.212723, 117.142737);
            assert!((lat - 34.212723).abs() <= bound);
            assert!((lon - 117.142737).abs() <= bound);
        }
    }
}
