//! Coordinate Reference System handling

mod project;

use crate::raster::Bounds;
use serde::{Deserialize, Serialize};
use std::fmt;

pub use project::{parse_utm_epsg, utm_to_wgs84, web_mercator_to_wgs84};

/// EPSG code of WGS84 geographic coordinates
pub const EPSG_WGS84: u32 = 4326;
/// EPSG code of spherical Web Mercator
pub const EPSG_WEB_MERCATOR: u32 = 3857;

/// Coordinate Reference System, identified by its EPSG code
///
/// GeoTIFF rasters carry their CRS as a GeoKey EPSG code, which is all the
/// pipeline compares, reports and projects with.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CRS {
    epsg: u32,
}

impl CRS {
    pub fn from_epsg(code: u32) -> Self {
        Self { epsg: code }
    }

    /// WGS84 geographic CRS (EPSG:4326)
    pub fn wgs84() -> Self {
        Self::from_epsg(EPSG_WGS84)
    }

    pub fn epsg(&self) -> u32 {
        self.epsg
    }

    /// Whether coordinates are longitude/latitude degrees
    pub fn is_geographic(&self) -> bool {
        self.epsg == EPSG_WGS84
    }

    /// `EPSG:<code>`, as reported in run metadata
    pub fn identifier(&self) -> String {
        format!("EPSG:{}", self.epsg)
    }

    /// Project an extent in this CRS to WGS84 longitude/latitude.
    ///
    /// The four corners are projected and their envelope returned. Supported:
    /// EPSG:4326 (identity), EPSG:3857 and UTM zones (EPSG:326xx / 327xx).
    /// Returns `None` for any other CRS.
    pub fn bounds_to_lonlat(&self, bounds: &Bounds) -> Option<Bounds> {
        let epsg = self.epsg;
        if epsg == EPSG_WGS84 {
            return Some(*bounds);
        }

        let corners = bounds.corners();
        let projected: Vec<(f64, f64)> = if epsg == EPSG_WEB_MERCATOR {
            corners
                .iter()
                .map(|&(x, y)| web_mercator_to_wgs84(x, y))
                .collect()
        } else {
            let (zone, north) = parse_utm_epsg(epsg)?;
            corners
                .iter()
                .map(|&(e, n)| utm_to_wgs84(e, n, zone, north))
                .collect()
        };

        Some(Bounds::enclosing(&projected))
    }
}

impl fmt::Display for CRS {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.identifier())
    }
}
