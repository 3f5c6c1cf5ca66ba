//! Latitude/longitude on a render sphere.
//!
//! The sphere is Y-up with positive latitude to the north. Longitude is offset
//! by 180° to match an equirectangular texture whose `u = 0` seam sits at
//! `-X`, which puts longitude 0 at the texture centre facing `+X`.

use super::Vec3;

/// Converts degrees of latitude/longitude to a point on a sphere of `radius`.
///
/// Inputs are not validated; out-of-range angles wrap through the
/// trigonometric functions.
pub fn lat_lng_to_vector3(lat_deg: f64, lng_deg: f64, radius: f64) -> Vec3 {
    let phi = (90.0 - lat_deg).to_radians();
    let theta = (lng_deg + 180.0).to_radians();

    let x = -radius * phi.sin() * theta.cos();
    let y = radius * phi.cos();
    let z = radius * phi.sin() * theta.sin();

    Vec3::new(x, y, z)
}

/// Inverse of [`lat_lng_to_vector3`]. Returns `(lat_deg, lng_deg)` with
/// longitude normalized to `(-180, 180]`.
///
/// The origin maps to `(0, 0)`.
pub fn vector3_to_lat_lng(p: Vec3) -> (f64, f64) {
    let r = p.length();
    if r <= 0.0 {
        return (0.0, 0.0);
    }

    let lat = 90.0 - (p.y / r).clamp(-1.0, 1.0).acos().to_degrees();
    let theta = p.z.atan2(-p.x).to_degrees();
    let mut lng = theta - 180.0;
    if lng <= -180.0 {
        lng += 360.0;
    }

    (lat, lng)
}

#[cfg(test)]
mod tests {
    use super::{lat_lng_to_vector3, vector3_to_lat_lng};

    fn assert_close(a: f64, b: f64, eps: f64) {
        let diff = (a - b).abs();
        assert!(diff <= eps, "expected {a} ~= {b} (diff {diff})");
    }

    #[test]
    fn points_lie_on_the_requested_radius() {
        for lat in [-90.0, -63.5, -41.29, 0.0, 17.07, 50.84, 90.0] {
            for lng in [-180.0, -96.72, -77.04, 0.0, 4.47, 174.78, 180.0] {
                let p = lat_lng_to_vector3(lat, lng, 5.1);
                assert_close(p.length(), 5.1, 1e-12);
            }
        }
    }

    #[test]
    fn southern_hemisphere_has_negative_y() {
        let p = lat_lng_to_vector3(-41.29, 174.78, 5.10);
        assert_close(p.length(), 5.10, 1e-12);
        assert!(p.y < 0.0);
    }

    #[test]
    fn poles_and_prime_meridian() {
        let north = lat_lng_to_vector3(90.0, 0.0, 1.0);
        assert_close(north.y, 1.0, 1e-12);

        // Longitude 0 on the equator faces +X.
        let origin = lat_lng_to_vector3(0.0, 0.0, 1.0);
        assert_close(origin.x, 1.0, 1e-12);
        assert_close(origin.z, 0.0, 1e-12);

        // Longitude 90E on the equator faces -Z.
        let east = lat_lng_to_vector3(0.0, 90.0, 1.0);
        assert_close(east.z, -1.0, 1e-12);
    }

    #[test]
    fn out_of_range_inputs_wrap_instead_of_failing() {
        let a = lat_lng_to_vector3(10.0, 190.0, 2.0);
        let b = lat_lng_to_vector3(10.0, -170.0, 2.0);
        assert_close((a - b).length(), 0.0, 1e-12);
    }

    #[test]
    fn inverse_recovers_lat_lng() {
        for (lat, lng) in [(50.84, 4.47), (-41.29, 174.78), (6.33, 5.62), (-12.04, -77.04)] {
            let p = lat_lng_to_vector3(lat, lng, 5.1);
            let (lat2, lng2) = vector3_to_lat_lng(p);
            assert_close(lat2, lat, 1e-9);
            assert_close(lng2, lng, 1e-9);
        }
    }
}
