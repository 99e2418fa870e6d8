//! DSM to DTM/CHM pipeline
//!
//! One run: load the DSM, size the window from the source resolution,
//! filter (on a block-averaged grid when the pixel budget is exceeded, then
//! reconciled back to the source grid), subtract, and write both products.

use std::path::{Path, PathBuf};

use dsm2dtm_core::io::{
    read_geotiff, read_geotiff_from_buffer, write_geotiff, write_geotiff_to_buffer,
    GeoTiffOptions,
};
use dsm2dtm_core::raster::{Bounds, Raster};
use dsm2dtm_core::{Error, Result, DEFAULT_NODATA};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::resample::{block_average, downsample_factor, reconcile};
use crate::terrain::{
    canopy_height, ground_filter, open_surface, restore_nodata, WindowSpec,
};

/// Default pixel budget for the morphological pass
pub const DEFAULT_MAX_PIXELS: usize = 15_000_000;

/// Default search radius in metres
pub const DEFAULT_SEARCH_RADIUS_M: f64 = 10.0;

/// Parameters for one pipeline run
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ProcessingParameters {
    /// Width in metres of the largest above-ground object to remove
    pub search_radius_meters: f64,
    /// Largest grid the filter may work on before downsampling kicks in
    pub max_pixels: usize,
}

impl Default for ProcessingParameters {
    fn default() -> Self {
        Self {
            search_radius_meters: DEFAULT_SEARCH_RADIUS_M,
            max_pixels: DEFAULT_MAX_PIXELS,
        }
    }
}

impl ProcessingParameters {
    pub fn new(search_radius_meters: f64) -> Self {
        Self {
            search_radius_meters,
            ..Self::default()
        }
    }

    /// Check that both parameters are usable
    pub fn validate(&self) -> Result<()> {
        let r = self.search_radius_meters;
        if !(r.is_finite() && r > 0.0) {
            return Err(Error::invalid_parameter(
                "search_radius_meters",
                r,
                "must be a finite value greater than zero",
            ));
        }
        if self.max_pixels == 0 {
            return Err(Error::invalid_parameter(
                "max_pixels",
                self.max_pixels,
                "pixel budget must be greater than zero",
            ));
        }
        Ok(())
    }
}

/// Summary of a run, returned to the caller and serialisable to JSON
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RunMetadata {
    /// Source x-resolution in CRS units
    pub resolution: f64,
    /// Window width in pixels at the source resolution
    pub window_pixels: usize,
    /// Requested search radius in metres
    pub window_meters: f64,
    /// Source extent in the source CRS
    pub bounds: Bounds,
    /// Source extent in WGS84 degrees, when the CRS is supported
    pub bounds_lonlat: Option<Bounds>,
    /// CRS identifier, e.g. `EPSG:32630`
    pub crs: Option<String>,
    /// Sentinel written to both outputs
    pub nodata: f64,
    /// (rows, cols) of the source and of both outputs
    pub shape: (usize, usize),
    /// (rows, cols) of the grid the filter ran on
    pub processed_shape: (usize, usize),
    pub downsampled: bool,
    pub downsample_factor: usize,
    /// Valid CHM cells where the ground came out above the surface
    pub negative_chm_cells: usize,
}

/// DTM and CHM rasters of one run
#[derive(Debug, Clone)]
pub struct TerrainModels {
    pub dtm: Raster<f64>,
    pub chm: Raster<f64>,
    pub metadata: RunMetadata,
}

/// Result of [`process`]
#[derive(Debug, Clone)]
pub struct ProcessOutput {
    pub dtm_path: PathBuf,
    pub chm_path: PathBuf,
    pub metadata: RunMetadata,
}

/// Result of [`process_buffer`]: GeoTIFF bytes of both products
#[derive(Debug, Clone)]
pub struct BufferOutput {
    pub dtm: Vec<u8>,
    pub chm: Vec<u8>,
    pub metadata: RunMetadata,
}

/// Read band 1 of a DSM GeoTIFF
///
/// The nodata sentinel defaults to -9999 when the file declares none.
pub fn load_dsm<P: AsRef<Path>>(path: P) -> Result<Raster<f64>> {
    let path = path.as_ref();
    let dsm = prepare_dsm(read_geotiff(path)?, &path.display().to_string())?;
    info!(
        path = %path.display(),
        rows = dsm.rows(),
        cols = dsm.cols(),
        resolution = dsm.cell_size(),
        "Loaded DSM"
    );
    Ok(dsm)
}

fn prepare_dsm(mut dsm: Raster<f64>, location: &str) -> Result<Raster<f64>> {
    if dsm.is_empty() {
        return Err(Error::unreadable(location, "raster has no cells"));
    }
    let resolution = dsm.cell_size();
    if !(resolution.is_finite() && resolution > 0.0) {
        return Err(Error::unreadable(
            location,
            format!("invalid pixel size {}", resolution),
        ));
    }
    if dsm.nodata().is_none() {
        dsm.set_nodata(Some(DEFAULT_NODATA));
    }
    Ok(dsm)
}

/// Derive DTM and CHM from an in-memory DSM
///
/// The window is sized once from the source resolution. When the grid
/// exceeds `max_pixels`, that same window is applied to a block-averaged
/// copy, and the result is resampled bilinearly back onto the source grid
/// before the source nodata mask is restored.
pub fn derive_terrain(dsm: &Raster<f64>, params: &ProcessingParameters) -> Result<TerrainModels> {
    params.validate()?;

    let resolution = dsm.cell_size();
    let window = WindowSpec::new(params.search_radius_meters, resolution)?;
    let shape = dsm.shape();
    let factor = downsample_factor(shape.0, shape.1, params.max_pixels)?;

    if dsm.crs().is_some_and(|c| c.is_geographic()) {
        warn!(
            resolution,
            "DSM is in geographic coordinates; the search radius is applied in degrees"
        );
    }

    debug!(
        window_pixels = window.pixels,
        window_meters = window.meters,
        factor,
        "Sized morphological window"
    );

    let (dtm, processed_shape) = if factor == 1 {
        (ground_filter(dsm, window.pixels)?, shape)
    } else {
        let coarse = block_average(dsm, factor)?;
        info!(
            factor,
            rows = coarse.rows(),
            cols = coarse.cols(),
            window_pixels = window.pixels,
            "DSM exceeds pixel budget, filtering a downsampled grid"
        );

        let opened = open_surface(&coarse, window.pixels)?;
        let mut dtm = reconcile(&opened, dsm.transform(), shape, dsm.crs())?;
        restore_nodata(&mut dtm, dsm)?;
        (dtm, coarse.shape())
    };

    let chm = canopy_height(dsm, &dtm)?;

    let bounds = dsm.bounds();
    let metadata = RunMetadata {
        resolution,
        window_pixels: window.pixels,
        window_meters: window.meters,
        bounds,
        bounds_lonlat: dsm.crs().and_then(|c| c.bounds_to_lonlat(&bounds)),
        crs: dsm.crs().map(|c| c.identifier()),
        nodata: dsm.nodata().unwrap_or(DEFAULT_NODATA),
        shape,
        processed_shape,
        downsampled: factor > 1,
        downsample_factor: factor,
        negative_chm_cells: chm.negative_cells,
    };

    info!(
        resolution,
        window_pixels = metadata.window_pixels,
        downsample_factor = factor,
        negative_chm_cells = chm.negative_cells,
        "Derived DTM and CHM"
    );

    Ok(TerrainModels {
        dtm,
        chm: chm.raster,
        metadata,
    })
}

/// Run the pipeline from a DSM file, writing the DTM to `output` and the CHM next to it
///
/// See [`chm_path_for`] for the CHM file name.
pub fn process<P, Q>(input: P, output: Q, params: &ProcessingParameters) -> Result<ProcessOutput>
where
    P: AsRef<Path>,
    Q: AsRef<Path>,
{
    process_with_options(input, output, params, &GeoTiffOptions::default())
}

/// [`process`] with explicit GeoTIFF encoding options for both outputs
pub fn process_with_options<P, Q>(
    input: P,
    output: Q,
    params: &ProcessingParameters,
    options: &GeoTiffOptions,
) -> Result<ProcessOutput>
where
    P: AsRef<Path>,
    Q: AsRef<Path>,
{
    let dtm_path = output.as_ref().to_path_buf();
    let chm_path = chm_path_for(&dtm_path);

    let dsm = load_dsm(input)?;
    let models = derive_terrain(&dsm, params)?;

    write_geotiff(&models.dtm, &dtm_path, Some(options.clone()))?;
    write_geotiff(&models.chm, &chm_path, Some(options.clone()))?;
    info!(dtm = %dtm_path.display(), chm = %chm_path.display(), "Wrote terrain models");

    Ok(ProcessOutput {
        dtm_path,
        chm_path,
        metadata: models.metadata,
    })
}

/// Run the pipeline on GeoTIFF bytes, returning both products as GeoTIFF bytes
pub fn process_buffer(dsm_bytes: &[u8], params: &ProcessingParameters) -> Result<BufferOutput> {
    let dsm = prepare_dsm(read_geotiff_from_buffer(dsm_bytes)?, "<buffer>")?;
    let models = derive_terrain(&dsm, params)?;

    Ok(BufferOutput {
        dtm: write_geotiff_to_buffer(&models.dtm, None)?,
        chm: write_geotiff_to_buffer(&models.chm, None)?,
        metadata: models.metadata,
    })
}

/// CHM path derived from the DTM path
///
/// `dtm.tif` becomes `dtm_chm.tif` (a `.tif`/`.tiff` extension is kept in
/// any case); any other name gets `_chm.tif` appended.
pub fn chm_path_for(dtm_path: &Path) -> PathBuf {
    let is_tiff = dtm_path
        .extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| e.eq_ignore_ascii_case("tif") || e.eq_ignore_ascii_case("tiff"));

    let file_name = if is_tiff {
        let stem = dtm_path
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_default();
        let ext = dtm_path
            .extension()
            .map(|e| e.to_string_lossy().into_owned())
            .unwrap_or_default();
        format!("{}_chm.{}", stem, ext)
    } else {
        let name = dtm_path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        format!("{}_chm.tif", name)
    };

    dtm_path.with_file_name(file_name)
}

#[cfg(test)]
mod tests {
    use super::*;
    use dsm2dtm_core::{GeoTransform, CRS};

    fn flat_dsm(rows: usize, cols: usize) -> Raster<f64> {
        let mut dsm = Raster::filled(rows, cols, 100.0);
        dsm.set_transform(GeoTransform::new(440_000.0, 4_475_000.0, 1.0, -1.0));
        dsm.set_crs(Some(CRS::from_epsg(32630)));
        dsm.set_nodata(Some(-9999.0));
        dsm
    }

    #[test]
    fn test_chm_path_naming() {
        assert_eq!(chm_path_for(Path::new("/out/dtm.tif")), PathBuf::from("/out/dtm_chm.tif"));
        assert_eq!(chm_path_for(Path::new("dtm.TIFF")), PathBuf::from("dtm_chm.TIFF"));
        assert_eq!(chm_path_for(Path::new("/out/dtm.img")), PathBuf::from("/out/dtm.img_chm.tif"));
        assert_eq!(chm_path_for(Path::new("ground")), PathBuf::from("ground_chm.tif"));
        // Only the extension is touched, not earlier ".tif" fragments
        assert_eq!(
            chm_path_for(Path::new("/data.tif.d/dtm.tif")),
            PathBuf::from("/data.tif.d/dtm_chm.tif")
        );
    }

    #[test]
    fn test_parameters_validation() {
        assert!(ProcessingParameters::default().validate().is_ok());
        assert!(ProcessingParameters::new(0.0).validate().is_err());
        assert!(ProcessingParameters::new(f64::NAN).validate().is_err());
        let zero_budget = ProcessingParameters {
            max_pixels: 0,
            ..Default::default()
        };
        assert!(matches!(
            zero_budget.validate(),
            Err(Error::InvalidParameter { name: "max_pixels", .. })
        ));
    }

    #[test]
    fn test_metadata_without_downsampling() {
        let mut dsm = flat_dsm(40, 30);
        dsm.set_transform(GeoTransform::new(440_000.0, 4_475_000.0, 0.5, -0.5));
        let models = derive_terrain(&dsm, &ProcessingParameters::new(10.0)).unwrap();
        let meta = &models.metadata;

        assert_eq!(meta.resolution, 0.5);
        assert_eq!(meta.window_pixels, 21);
        assert_eq!(meta.window_meters, 10.0);
        assert!(!meta.downsampled);
        assert_eq!(meta.downsample_factor, 1);
        assert_eq!(meta.shape, (40, 30));
        assert_eq!(meta.processed_shape, (40, 30));
        assert_eq!(meta.crs.as_deref(), Some("EPSG:32630"));
        assert!(meta.bounds_lonlat.is_some());
        assert_eq!(meta.nodata, -9999.0);
    }

    #[test]
    fn test_downsampled_grid_uses_source_window() {
        let dsm = flat_dsm(100, 100);
        let params = ProcessingParameters {
            search_radius_meters: 9.0,
            max_pixels: 400,
        };
        let models = derive_terrain(&dsm, &params).unwrap();
        let meta = &models.metadata;

        assert!(meta.downsampled);
        assert_eq!(meta.downsample_factor, 5);
        assert_eq!(meta.processed_shape, (20, 20));
        // Sized from the 1 m source cells, applied unchanged to the 5 m grid
        assert_eq!(meta.window_pixels, 9);
        assert_eq!(models.dtm.shape(), (100, 100));
        assert_eq!(models.dtm.transform(), dsm.transform());
        assert!(models.dtm.data().iter().all(|&v| (v - 100.0).abs() < 1e-9));
    }

    #[test]
    fn test_downsampled_window_removes_coarse_block() {
        // 20x20 m roof: 4x4 cells on the 5 m grid, narrower than the 9-cell window
        let mut dsm = flat_dsm(100, 100);
        for r in 40..60 {
            for c in 40..60 {
                dsm.set(r, c, 120.0).unwrap();
            }
        }
        let params = ProcessingParameters {
            search_radius_meters: 9.0,
            max_pixels: 400,
        };
        let models = derive_terrain(&dsm, &params).unwrap();

        assert_eq!(models.metadata.downsample_factor, 5);
        assert!((models.dtm.get(50, 50).unwrap() - 100.0).abs() < 1e-9);
        assert!((models.chm.get(50, 50).unwrap() - 20.0).abs() < 1e-9);
    }

    #[test]
    fn test_missing_nodata_defaults_to_sentinel() {
        let mut dsm = flat_dsm(5, 5);
        dsm.set_nodata(None);
        let dsm = prepare_dsm(dsm, "test").unwrap();
        assert_eq!(dsm.nodata(), Some(DEFAULT_NODATA));
    }

    #[test]
    fn test_degenerate_resolution_rejected() {
        let mut dsm = flat_dsm(5, 5);
        dsm.set_transform(GeoTransform::new(0.0, 0.0, 0.0, -1.0));
        assert!(matches!(
            prepare_dsm(dsm, "test"),
            Err(Error::UnreadableRaster { .. })
        ));
    }
}
