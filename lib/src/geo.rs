//! Great-circle geometry on a spherical Earth.
//!
//! `Coordinate` validates on construction (and on deserialize), so the
//! math functions below are total.

use serde::{Deserialize, Serialize};

use crate::EngineError;

/// Mean Earth radius used for all distance math (m).
pub const EARTH_RADIUS_M: f64 = 6_371_000.0;

/// A GPS fix or a user-selected point.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "RawCoordinate")]
pub struct Coordinate {
    latitude: f64,
    longitude: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    accuracy_meters: Option<f64>,
    #[serde(default)]
    captured_at_millis: i64,
}

/// Unvalidated wire form of `Coordinate`.
#[derive(Deserialize)]
struct RawCoordinate {
    latitude: f64,
    longitude: f64,
    #[serde(default)]
    accuracy_meters: Option<f64>,
    #[serde(default)]
    captured_at_millis: i64,
}

impl TryFrom<RawCoordinate> for Coordinate {
    type Error = EngineError;

    fn try_from(raw: RawCoordinate) -> Result<Self, Self::Error> {
        Coordinate::fix(
            raw.latitude,
            raw.longitude,
            raw.accuracy_meters,
            raw.captured_at_millis,
        )
    }
}

impl Coordinate {
    /// A bare point with no accuracy and a zero capture time.
    pub fn new(latitude: f64, longitude: f64) -> Result<Self, EngineError> {
        Self::fix(latitude, longitude, None, 0)
    }

    /// A location-source fix. Out-of-range values are rejected, never clamped.
    pub fn fix(
        latitude: f64,
        longitude: f64,
        accuracy_meters: Option<f64>,
        captured_at_millis: i64,
    ) -> Result<Self, EngineError> {
        let lat_ok = latitude.is_finite() && (-90.0..=90.0).contains(&latitude);
        let lon_ok = longitude.is_finite() && (-180.0..=180.0).contains(&longitude);
        let acc_ok = accuracy_meters.is_none_or(|a| a.is_finite() && a >= 0.0);
        if !(lat_ok && lon_ok && acc_ok) {
            return Err(EngineError::InvalidCoordinate {
                latitude,
                longitude,
            });
        }
        Ok(Self {
            latitude,
            longitude,
            accuracy_meters,
            captured_at_millis,
        })
    }

    pub fn latitude(&self) -> f64 {
        self.latitude
    }

    pub fn longitude(&self) -> f64 {
        self.longitude
    }

    pub fn accuracy_meters(&self) -> Option<f64> {
        self.accuracy_meters
    }

    pub fn captured_at_millis(&self) -> i64 {
        self.captured_at_millis
    }

    /// Same point, restamped.
    pub fn captured_at(mut self, millis: i64) -> Self {
        self.captured_at_millis = millis;
        self
    }

    /// Same point with an accuracy radius. Negative or non-finite radii are dropped.
    pub fn with_accuracy(mut self, meters: f64) -> Self {
        self.accuracy_meters = (meters.is_finite() && meters >= 0.0).then_some(meters);
        self
    }
}

/// Haversine distance between two points (m). Symmetric, never negative.
pub fn distance_meters(a: &Coordinate, b: &Coordinate) -> f64 {
    let lat1 = a.latitude.to_radians();
    let lat2 = b.latitude.to_radians();
    let d_lat = (b.latitude - a.latitude).to_radians();
    let d_lon = (b.longitude - a.longitude).to_radians();

    let h = (d_lat / 2.0).sin().powi(2) + lat1.cos() * lat2.cos() * (d_lon / 2.0).sin().powi(2);
    // Rounding can push h a hair past 1 for antipodal points.
    let h = h.clamp(0.0, 1.0);
    2.0 * EARTH_RADIUS_M * h.sqrt().asin()
}

/// Initial bearing from `a` to `b`, degrees in [0, 360). Identical points give 0.
pub fn bearing_degrees(a: &Coordinate, b: &Coordinate) -> f64 {
    let lat1 = a.latitude.to_radians();
    let lat2 = b.latitude.to_radians();
    let d_lon = (b.longitude - a.longitude).to_radians();

    let x = d_lon.sin() * lat2.cos();
    let y = lat1.cos() * lat2.sin() - lat1.sin() * lat2.cos() * d_lon.cos();

    let bearing = x.atan2(y).to_degrees().rem_euclid(360.0);
    if bearing >= 360.0 { 0.0 } else { bearing }
}

/// Point reached by travelling `distance_m` from `origin` on an initial
/// bearing. Carries the origin's capture time; accuracy is dropped.
pub fn destination(origin: &Coordinate, bearing_deg: f64, distance_m: f64) -> Coordinate {
    let lat1 = origin.latitude.to_radians();
    let lon1 = origin.longitude.to_radians();
    let theta = bearing_deg.to_radians();
    let delta = distance_m / EARTH_RADIUS_M;

    let lat2 = (lat1.sin() * delta.cos() + lat1.cos() * delta.sin() * theta.cos()).asin();
    let lon2 = lon1
        + (theta.sin() * delta.sin() * lat1.cos()).atan2(delta.cos() - lat1.sin() * lat2.sin());

    let longitude = (lon2.to_degrees() + 540.0).rem_euclid(360.0) - 180.0;
    Coordinate {
        latitude: lat2.to_degrees().clamp(-90.0, 90.0),
        longitude: longitude.clamp(-180.0, 180.0),
        accuracy_meters: None,
        captured_at_millis: origin.captured_at_millis,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pt(lat: f64, lon: f64) -> Coordinate {
        Coordinate::new(lat, lon).unwrap()
    }

    #[test]
    fn one_degree_of_longitude_at_equator() {
        let d = distance_meters(&pt(0.0, 0.0), &pt(0.0, 1.0));
        assert!((d - 111_195.0).abs() < 111_195.0 * 0.005, "got {d}");
    }

    #[test]
    fn identical_points_are_zero_apart() {
        let p = pt(55.0209, -7.2479);
        assert_eq!(distance_meters(&p, &p), 0.0);
        assert_eq!(bearing_degrees(&p, &p), 0.0);
    }

    #[test]
    fn cardinal_bearings() {
        let o = pt(10.0, 10.0);
        assert!((bearing_degrees(&o, &pt(11.0, 10.0)) - 0.0).abs() < 1e-9);
        assert!((bearing_degrees(&o, &pt(9.0, 10.0)) - 180.0).abs() < 1e-9);
        let east = bearing_degrees(&o, &pt(10.0, 11.0));
        assert!(east > 89.0 && east < 91.0, "got {east}");
        let west = bearing_degrees(&o, &pt(10.0, 9.0));
        assert!(west > 269.0 && west < 271.0, "got {west}");
    }

    #[test]
    fn rejects_out_of_range_values() {
        assert!(matches!(
            Coordinate::new(90.5, 0.0),
            Err(EngineError::InvalidCoordinate { .. })
        ));
        assert!(Coordinate::new(0.0, -180.01).is_err());
        assert!(Coordinate::new(f64::NAN, 0.0).is_err());
        assert!(Coordinate::fix(0.0, 0.0, Some(-1.0), 0).is_err());
        assert!(Coordinate::new(-90.0, 180.0).is_ok());
    }

    #[test]
    fn deserialize_validates() {
        let ok: Coordinate =
            serde_json::from_str(r#"{"latitude":55.0,"longitude":-7.0,"captured_at_millis":12}"#)
                .unwrap();
        assert_eq!(ok.captured_at_millis(), 12);
        assert_eq!(ok.accuracy_meters(), None);

        let bad = serde_json::from_str::<Coordinate>(r#"{"latitude":95.0,"longitude":0.0}"#);
        assert!(bad.is_err());
    }

    #[test]
    fn destination_lands_at_requested_distance() {
        let o = pt(55.0209, -7.2479);
        for bearing in [0.0, 45.0, 137.0, 270.0] {
            let p = destination(&o, bearing, 150.0);
            let d = distance_meters(&o, &p);
            assert!((d - 150.0).abs() < 0.01, "bearing {bearing}: {d}");
            let b = bearing_degrees(&o, &p);
            let diff = (b - bearing + 540.0).rem_euclid(360.0) - 180.0;
            assert!(diff.abs() < 0.01, "bearing {bearing}: {b}");
        }
    }

    #[test]
    fn destination_wraps_the_antimeridian() {
        let p = destination(&pt(0.0, 179.9999), 90.0, 1_000.0);
        assert!(p.longitude() < 0.0 && p.longitude() >= -180.0);
    }

    mod proptests {
        use super::*;
        use proptest::prelude::*;

        proptest! {
            /// Property: distance is symmetric and non-negative
            #[test]
            fn prop_distance_symmetric(
                lat1 in -90.0f64..=90.0, lon1 in -180.0f64..=180.0,
                lat2 in -90.0f64..=90.0, lon2 in -180.0f64..=180.0,
            ) {
                let a = pt(lat1, lon1);
                let b = pt(lat2, lon2);
                let ab = distance_meters(&a, &b);
                let ba = distance_meters(&b, &a);
                prop_assert!(ab >= 0.0);
                prop_assert!((ab - ba).abs() <= 1e-6);
                prop_assert!(ab <= std::f64::consts::PI * EARTH_RADIUS_M + 1e-3);
            }

            /// Property: bearing always lands in [0, 360)
            #[test]
            fn prop_bearing_in_range(
                lat1 in -90.0f64..=90.0, lon1 in -180.0f64..=180.0,
                lat2 in -90.0f64..=90.0, lon2 in -180.0f64..=180.0,
            ) {
                let b = bearing_degrees(&pt(lat1, lon1), &pt(lat2, lon2));
                prop_assert!((0.0..360.0).contains(&b));
            }

            /// Property: a point is zero meters from itself
            #[test]
            fn prop_self_distance_zero(lat in -90.0f64..=90.0, lon in -180.0f64..=180.0) {
                let p = pt(lat, lon);
                prop_assert_eq!(distance_meters(&p, &p), 0.0);
            }
        }
    }
}
