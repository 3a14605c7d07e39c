//! Spherical web mercator (EPSG:3857) for lon/lat (EPSG:4326) input.

use super::Vec2;

/// Sphere radius used by web mercator (the WGS84 semi-major axis, metres).
pub const EARTH_RADIUS_M: f64 = 6_378_137.0;

/// Latitude limit of the square web-mercator world.
pub const MAX_MERCATOR_LAT: f64 = 85.051_128_779_806_59;

/// Half the side of the projected world square (metres).
pub const MERCATOR_HALF_WORLD: f64 = std::f64::consts::PI * EARTH_RADIUS_M;

/// Projects lon/lat degrees onto the web-mercator plane.
///
/// Latitudes are clamped to the mercator limit so polar input stays finite.
pub fn lonlat_to_mercator(lonlat: Vec2) -> Vec2 {
    let lat = lonlat.y.clamp(-MAX_MERCATOR_LAT, MAX_MERCATOR_LAT);
    let x = EARTH_RADIUS_M * lonlat.x.to_radians();
    let y = EARTH_RADIUS_M * (std::f64::consts::FRAC_PI_4 + lat.to_radians() / 2.0).tan().ln();
    Vec2::new(x, y)
}

pub fn mercator_to_lonlat(p: Vec2) -> Vec2 {
    let lon = (p.x / EARTH_RADIUS_M).to_degrees();
    let lat = (2.0 * (p.y / EARTH_RADIUS_M).exp().atan() - std::f64::consts::FRAC_PI_2).to_degrees();
    Vec2::new(lon, lat)
}

/// Ground distance represented by one projected metre at the given latitude.
pub fn mercator_scale_factor(lat_deg: f64) -> f64 {
    lat_deg.to_radians().cos()
}
