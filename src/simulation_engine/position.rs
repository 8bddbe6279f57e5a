use crate::shared_data::Position;
use std::time::Duration;

const METERS_PER_DEGREE_LAT: f64 = 111_320.0;

/// Rectangular latitude/longitude bounds the simulated vehicles stay inside.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GeoFence {
    pub min_lat: f64,
    pub max_lat: f64,
    pub min_lon: f64,
    pub max_lon: f64,
}

impl GeoFence {
    pub fn around(center: (f64, f64), half_span_deg: f64) -> Self {
        Self {
            min_lat: center.0 - half_span_deg,
            max_lat: center.0 + half_span_deg,
            min_lon: center.1 - half_span_deg,
            max_lon: center.1 + half_span_deg,
        }
    }

    pub fn contains(&self, position: Position) -> bool {
        (self.min_lat..=self.max_lat).contains(&position.latitude())
            && (self.min_lon..=self.max_lon).contains(&position.longitude())
    }
}

pub fn normalize_heading(heading: f64) -> f64 {
    heading.rem_euclid(360.0)
}

/// Moves a position along `heading` for `elapsed` at `speed_kmh`.
///
/// # Arguments
///
/// * `position` - Current coordinates.
/// * `heading` - Degrees clockwise from north.
/// * `speed_kmh` - Speed over the elapsed interval.
/// * `elapsed` - Length of one tick.
/// * `fence` - Optional bounds. A vehicle that would cross one is clamped to the
///             edge and its heading mirrored on the crossed axis.
///
/// # Returns
///
/// The new position and the (possibly mirrored) heading.
pub fn advance_position(
    position: Position,
    heading: f64,
    speed_kmh: f64,
    elapsed: Duration,
    fence: Option<&GeoFence>,
) -> (Position, f64) {
    let distance_m = speed_kmh / 3.6 * elapsed.as_secs_f64();
    if distance_m <= 0.0 {
        return (position, normalize_heading(heading));
    }

    let radians = heading.to_radians();
    let meters_per_degree_lon = METERS_PER_DEGREE_LAT * position.latitude().to_radians().cos();
    let mut lat = position.latitude() + distance_m * radians.cos() / METERS_PER_DEGREE_LAT;
    let mut lon = position.longitude() + distance_m * radians.sin() / meters_per_degree_lon;
    let mut heading = heading;

    if let Some(fence) = fence {
        if lat < fence.min_lat || lat > fence.max_lat {
            lat = lat.clamp(fence.min_lat, fence.max_lat);
            heading = 180.0 - heading;
        }
        if lon < fence.min_lon || lon > fence.max_lon {
            lon = lon.clamp(fence.min_lon, fence.max_lon);
            heading = -heading;
        }
    }

    (Position(lat, lon), normalize_heading(heading))
}
