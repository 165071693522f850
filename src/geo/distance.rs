use crate::geo::GeoPoint;

/// Mean Earth radius (IUGG) in kilometres
pub const EARTH_RADIUS_KM: f64 = 6371.0088;

/// Approximate length of one degree of latitude in kilometres
const KM_PER_DEGREE: f64 = 111.32;

/// Great-circle distance between two points using the haversine formula
pub fn haversine_km(a: GeoPoint, b: GeoPoint) -> f64 {
    let lat1 = a.latitude.to_radians();
    let lat2 = b.latitude.to_radians();
    let d_lat = (b.latitude - a.latitude).to_radians();
    let d_lng = (b.longitude - a.longitude).to_radians();

    let h = (d_lat / 2.0).sin().powi(2) + lat1.cos() * lat2.cos() * (d_lng / 2.0).sin().powi(2);
    // Clamp guards against h drifting past 1.0 for antipodal points
    2.0 * EARTH_RADIUS_KM * h.sqrt().min(1.0).asin()
}

/// Axis-aligned latitude/longitude box that contains every point within
/// `radius_km` of a centre. Used as a coarse pre-filter before the exact
/// haversine check, so it may include points outside the circle but never
/// excludes one inside it.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BoundingBox {
    pub min_latitude: f64,
    pub max_latitude: f64,
    pub min_longitude: f64,
    pub max_longitude: f64,
}

impl BoundingBox {
    pub fn around(center: GeoPoint, radius_km: f64) -> Self {
        // Widen by 1% so rounding never cuts off points sitting on the circle
        let lat_delta = radius_km / KM_PER_DEGREE * 1.01;
        let min_latitude = (center.latitude - lat_delta).max(-90.0);
        let max_latitude = (center.latitude + lat_delta).min(90.0);

        // Near the poles (or across the antimeridian) the longitude span
        // degenerates, fall back to the whole circle of longitudes
        let cos_lat = min_latitude
            .abs()
            .max(max_latitude.abs())
            .to_radians()
            .cos();
        let lng_delta = if cos_lat < 1e-6 {
            180.0
        } else {
            radius_km / (KM_PER_DEGREE * cos_lat) * 1.01
        };

        let (min_longitude, max_longitude) =
            if center.longitude - lng_delta < -180.0 || center.longitude + lng_delta > 180.0 {
                (-180.0, 180.0)
            } else {
                (center.longitude - lng_delta, center.longitude + lng_delta)
            };

        Self {
            min_latitude,
            max_latitude,
            min_longitude,
            max_longitude,
        }
    }

    pub fn contains(&self, point: GeoPoint) -> bool {
        (self.min_latitude..=self.max_latitude).contains(&point.latitude)
            && (self.min_longitude..=self.max_longitude).contains(&point.longitude)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn assert_close(actual: f64, expected: f64, tolerance: f64) {
        assert!(
            (actual - expected).abs() <= tolerance,
            "expected {expected} ± {tolerance}, got {actual}"
        );
    }

    #[test]
    fn distance_to_self_is_zero() {
        let kyiv = GeoPoint::new(50.45, 30.52);
        assert_eq!(haversine_km(kyiv, kyiv), 0.0);
    }

    #[test]
    fn kyiv_to_lviv() {
        let kyiv = GeoPoint::new(50.4501, 30.5234);
        let lviv = GeoPoint::new(49.8397, 24.0297);
        assert_close(haversine_km(kyiv, lviv), 468.0, 3.0);
    }

    #[test]
    fn one_degree_of_latitude() {
        let a = GeoPoint::new(0.0, 0.0);
        let b = GeoPoint::new(1.0, 0.0);
        assert_close(haversine_km(a, b), 111.19, 0.1);
    }

    #[test]
    fn antipodal_points_are_half_circumference() {
        let a = GeoPoint::new(0.0, 0.0);
        let b = GeoPoint::new(0.0, 180.0);
        assert_close(haversine_km(a, b), std::f64::consts::PI * EARTH_RADIUS_KM, 1e-6);
    }

    #[test]
    fn box_near_pole_spans_all_longitudes() {
        let bbox = BoundingBox::around(GeoPoint::new(89.99, 10.0), 50.0);
        assert_eq!(bbox.min_longitude, -180.0);
        assert_eq!(bbox.max_longitude, 180.0);
        assert_eq!(bbox.max_latitude, 90.0);
    }

    mod properties {
        use super::*;
        use proptest::prelude::*;

        fn point() -> impl Strategy<Value = GeoPoint> {
            (-89.0f64..89.0, -179.0f64..179.0).prop_map(|(lat, lng)| GeoPoint::new(lat, lng))
        }

        proptest! {
            #[test]
            fn distance_is_symmetric(a in point(), b in point()) {
                let ab = haversine_km(a, b);
                let ba = haversine_km(b, a);
                prop_assert!((ab - ba).abs() < 1e-9);
            }

            #[test]
            fn distance_is_bounded_by_half_circumference(a in point(), b in point()) {
                let d = haversine_km(a, b);
                prop_assert!(d >= 0.0);
                prop_assert!(d <= std::f64::consts::PI * EARTH_RADIUS_KM + 1e-6);
            }

            #[test]
            fn bounding_box_never_excludes_points_inside_radius(
                center in point(),
                other in point(),
                radius in 0.5f64..500.0,
            ) {
                if haversine_km(center, other) <= radius {
                    prop_assert!(BoundingBox::around(center, radius).contains(other));
                }
            }
        }
    }
}
