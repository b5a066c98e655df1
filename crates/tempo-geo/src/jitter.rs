//! Random coordinate offsets within a fixed radius.

use rand::Rng;
use std::f64::consts::PI;

/// Kilometres per degree of latitude.
pub const KM_PER_DEGREE: f64 = 111.32;

/// Move a coordinate to a random point within `max_km` of it.
///
/// The radius is drawn as `max_km * sqrt(U)` so points are spread evenly
/// over the disk's area rather than bunched around the centre.
pub fn jitter_latlon_circle<R: Rng + ?Sized>(
    lat: f64,
    lon: f64,
    max_km: f64,
    rng: &mut R,
) -> (f64, f64) {
    let r = max_km * rng.gen::<f64>().sqrt();
    let theta = 2.0 * PI * rng.gen::<f64>();

    let dlat = (r * theta.cos()) / KM_PER_DEGREE;
    let dlon = (r * theta.sin()) / (KM_PER_DEGREE * lat.to_radians().cos());

    (lat + dlat, lon + dlon)
}

/// [`jitter_latlon_circle`] with the thread-local RNG.
pub fn jitter_latlon(lat: f64, lon: f64, max_km: f64) -> (f64, f64) {
    jitter_latlon_circle(lat, lon, max_km, &mut rand::thread_rng())
}
