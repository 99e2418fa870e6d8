//! Native GeoTIFF reading/writing built on the `tiff` crate.
//!
//! Georeferencing is carried in the standard GeoTIFF tags:
//! ModelPixelScale (33550) + ModelTiepoint (33922) for north-up grids,
//! ModelTransformation (34264) otherwise, the GeoKeyDirectory (34735) for
//! the EPSG code and raster type, and GDAL_NODATA (42113) for the nodata
//! sentinel. PixelIsPoint rasters are read with a corner origin, the way
//! GDAL presents them, and always written back as PixelIsArea.

use crate::crs::CRS;
use crate::error::{Error, Result};
use crate::raster::{GeoTransform, Raster, RasterElement};
use num_traits::NumCast;
use std::fs::File;
use std::io::{self, Cursor, Read, Seek, Write};
use std::path::Path;
use tiff::decoder::{Decoder, DecodingResult, Limits};
use tiff::encoder::colortype::{self, Gray32Float, Gray64Float};
use tiff::encoder::compression::{Compression, Deflate, Uncompressed};
use tiff::encoder::{DirectoryEncoder, TiffEncoder, TiffKind, TiffValue};
use tiff::tags::Tag;
use tiff::{ColorType, TiffError, TiffResult};

// GeoKey ids and values (GeoTIFF 1.1, section 7)
const GT_MODEL_TYPE_GEOKEY: u16 = 1024;
const GT_RASTER_TYPE_GEOKEY: u16 = 1025;
const GEOGRAPHIC_TYPE_GEOKEY: u16 = 2048;
const PROJECTED_CS_TYPE_GEOKEY: u16 = 3072;
const MODEL_TYPE_PROJECTED: u16 = 1;
const MODEL_TYPE_GEOGRAPHIC: u16 = 2;
const RASTER_PIXEL_IS_AREA: u16 = 1;
const RASTER_PIXEL_IS_POINT: u16 = 2;
const USER_DEFINED: u16 = 32767;

/// Label used in errors for rasters that do not come from a file
const BUFFER_LOCATION: &str = "<buffer>";

/// Options for writing GeoTIFF files
#[derive(Debug, Clone, Default)]
pub struct GeoTiffOptions {
    /// Deflate-compress the pixel data
    pub deflate: bool,
}

/// Read band 1 of a GeoTIFF file into a Raster
///
/// Any sample type the decoder produces for a single-band grey image is
/// cast to `T`; values that do not fit become `T::default_nodata()`.
pub fn read_geotiff<T, P>(path: P) -> Result<Raster<T>>
where
    T: RasterElement,
    P: AsRef<Path>,
{
    let path = path.as_ref();
    let location = path.display().to_string();
    let file = File::open(path).map_err(|e| Error::unreadable(&location, e.to_string()))?;
    decode_geotiff(io::BufReader::new(file), &location)
}

/// Read a GeoTIFF from an in-memory buffer into a Raster
pub fn read_geotiff_from_buffer<T>(data: &[u8]) -> Result<Raster<T>>
where
    T: RasterElement,
{
    decode_geotiff(Cursor::new(data), BUFFER_LOCATION)
}

/// Internal: decode a GeoTIFF from any `Read + Seek` source
fn decode_geotiff<T, R>(reader: R, location: &str) -> Result<Raster<T>>
where
    T: RasterElement,
    R: Read + Seek,
{
    let unreadable = |what: &str, e: TiffError| Error::unreadable(location, format!("{what}: {e}"));

    let mut decoder = Decoder::new(reader)
        .map_err(|e| unreadable("not a TIFF file", e))?
        .with_limits(Limits::unlimited());

    match decoder.colortype() {
        Ok(ColorType::Gray(_)) => {}
        Ok(other) => {
            return Err(Error::unreadable(
                location,
                format!("expected a single-band raster, found {:?}", other),
            ));
        }
        Err(e) => return Err(unreadable("cannot read color type", e)),
    }

    let (width, height) = decoder
        .dimensions()
        .map_err(|e| unreadable("cannot read dimensions", e))?;

    let rows = height as usize;
    let cols = width as usize;

    let result = decoder
        .read_image()
        .map_err(|e| unreadable("cannot read image data", e))?;

    // Float32 pixels only ever equal the sentinel at float32 precision
    let f32_samples = matches!(result, DecodingResult::F32(_));

    let data: Vec<T> = match result {
        DecodingResult::F32(buf) => cast_samples(buf),
        DecodingResult::F64(buf) => cast_samples(buf),
        DecodingResult::U8(buf) => cast_samples(buf),
        DecodingResult::U16(buf) => cast_samples(buf),
        DecodingResult::U32(buf) => cast_samples(buf),
        DecodingResult::U64(buf) => cast_samples(buf),
        DecodingResult::I8(buf) => cast_samples(buf),
        DecodingResult::I16(buf) => cast_samples(buf),
        DecodingResult::I32(buf) => cast_samples(buf),
        DecodingResult::I64(buf) => cast_samples(buf),
    };

    if data.len() != rows * cols {
        return Err(Error::unreadable(
            location,
            format!(
                "expected {} samples for {}x{} pixels, decoded {}",
                rows * cols,
                cols,
                rows,
                data.len()
            ),
        ));
    }

    let mut raster = Raster::from_vec(data, rows, cols)?;

    let keys = decoder
        .get_tag_u16_vec(Tag::GeoKeyDirectoryTag)
        .map(|dir| parse_geokeys(&dir))
        .unwrap_or_default();

    if let Some(transform) = read_geotransform(&mut decoder) {
        if keys.pixel_is_point {
            raster.set_transform(point_to_area(transform));
        } else {
            raster.set_transform(transform);
        }
    }
    raster.set_crs(keys.epsg.map(CRS::from_epsg));

    let nodata = read_nodata(&mut decoder).map(|v| {
        if f32_samples {
            v as f32 as f64
        } else {
            v
        }
    });
    raster.set_nodata(nodata.and_then(num_traits::cast));

    Ok(raster)
}

fn cast_samples<S, T>(buf: Vec<S>) -> Vec<T>
where
    S: NumCast + Copy,
    T: RasterElement,
{
    buf.into_iter()
        .map(|v| num_traits::cast(v).unwrap_or(T::default_nodata()))
        .collect()
}

/// Read the GeoTransform from ModelPixelScale + ModelTiepoint, or from ModelTransformation
fn read_geotransform<R: Read + Seek>(decoder: &mut Decoder<R>) -> Option<GeoTransform> {
    let scale = decoder.get_tag_f64_vec(Tag::ModelPixelScaleTag).ok();
    let tiepoint = decoder.get_tag_f64_vec(Tag::ModelTiepointTag).ok();

    if let (Some(scale), Some(tiepoint)) = (&scale, &tiepoint)
        && scale.len() >= 2
        && tiepoint.len() >= 6
    {
        // tiepoint: [I, J, K, X, Y, Z], scale: [ScaleX, ScaleY, ScaleZ]
        let origin_x = tiepoint[3] - tiepoint[0] * scale[0];
        let origin_y = tiepoint[4] + tiepoint[1] * scale[1];
        return Some(GeoTransform::new(origin_x, origin_y, scale[0], -scale[1]));
    }

    // Row-major 4x4 matrix; the first two rows carry the affine terms
    let t = decoder.get_tag_f64_vec(Tag::ModelTransformationTag).ok()?;
    if t.len() < 16 {
        return None;
    }
    Some(GeoTransform {
        origin_x: t[3],
        origin_y: t[7],
        pixel_width: t[0],
        pixel_height: t[5],
        row_rotation: t[1],
        col_rotation: t[4],
    })
}

/// Shift a PixelIsPoint transform so the origin is the corner of pixel (0, 0)
fn point_to_area(gt: GeoTransform) -> GeoTransform {
    GeoTransform {
        origin_x: gt.origin_x - 0.5 * (gt.pixel_width + gt.row_rotation),
        origin_y: gt.origin_y - 0.5 * (gt.col_rotation + gt.pixel_height),
        ..gt
    }
}

/// GeoKeys this reader understands
#[derive(Debug, Default, PartialEq)]
struct GeoKeys {
    /// ProjectedCSTypeGeoKey (preferred) or GeographicTypeGeoKey
    epsg: Option<u32>,
    /// GTRasterTypeGeoKey == RasterPixelIsPoint
    pixel_is_point: bool,
}

/// Walk a GeoKeyDirectory.
///
/// Layout: `[version, revision, minor, count, (key_id, location, count, value) * count]`.
/// Only inline values (`location == 0`) are read.
fn parse_geokeys(dir: &[u16]) -> GeoKeys {
    let mut keys = GeoKeys::default();
    if dir.len() < 4 {
        return keys;
    }
    let count = dir[3] as usize;

    let mut projected = None;
    let mut geographic = None;
    for entry in dir[4..].chunks_exact(4).take(count) {
        let (key, location, value) = (entry[0], entry[1], entry[3]);
        if location != 0 {
            continue;
        }
        match key {
            GT_RASTER_TYPE_GEOKEY => keys.pixel_is_point = value == RASTER_PIXEL_IS_POINT,
            PROJECTED_CS_TYPE_GEOKEY if value != 0 && value != USER_DEFINED => {
                projected = Some(value as u32)
            }
            GEOGRAPHIC_TYPE_GEOKEY if value != 0 && value != USER_DEFINED => {
                geographic = Some(value as u32)
            }
            _ => {}
        }
    }
    keys.epsg = projected.or(geographic);
    keys
}

/// Read the GDAL_NODATA ASCII tag
fn read_nodata<R: Read + Seek>(decoder: &mut Decoder<R>) -> Option<f64> {
    let text = decoder.get_tag_ascii_string(Tag::GdalNodata).ok()?;
    text.trim_matches(char::from(0)).trim().parse().ok()
}

/// Write a Raster to a GeoTIFF file
///
/// `f64` rasters are written as 64-bit float samples, everything else as 32-bit float.
pub fn write_geotiff<T, P>(raster: &Raster<T>, path: P, options: Option<GeoTiffOptions>) -> Result<()>
where
    T: RasterElement,
    P: AsRef<Path>,
{
    let path = path.as_ref();
    let write_error = |source: io::Error| Error::Write {
        path: path.to_path_buf(),
        source,
    };

    let file = File::create(path).map_err(write_error)?;
    let mut writer = io::BufWriter::new(file);
    encode_geotiff(raster, &mut writer, &options.unwrap_or_default())
        .map_err(|e| write_error(tiff_to_io(e)))?;
    writer.flush().map_err(write_error)
}

/// Write a Raster to an in-memory GeoTIFF buffer
pub fn write_geotiff_to_buffer<T>(raster: &Raster<T>, options: Option<GeoTiffOptions>) -> Result<Vec<u8>>
where
    T: RasterElement,
{
    let mut buf = Vec::new();
    encode_geotiff(raster, Cursor::new(&mut buf), &options.unwrap_or_default())
        .map_err(|e| Error::Other(format!("TIFF encode error: {}", e)))?;
    Ok(buf)
}

fn tiff_to_io(e: TiffError) -> io::Error {
    match e {
        TiffError::IoError(io) => io,
        other => io::Error::other(other.to_string()),
    }
}

/// Georeferencing written alongside the pixels
struct GeoTags {
    transform: GeoTransform,
    crs: Option<CRS>,
    /// GDAL_NODATA text
    nodata: Option<String>,
    raster_type: u16,
}

/// Internal: encode a Raster as GeoTIFF into any `Write + Seek` sink
fn encode_geotiff<T, W>(raster: &Raster<T>, writer: W, options: &GeoTiffOptions) -> TiffResult<()>
where
    T: RasterElement,
    W: Write + Seek,
{
    let mut encoder = TiffEncoder::new(writer)?;
    let (rows, cols) = raster.shape();
    let tags = GeoTags {
        transform: *raster.transform(),
        crs: raster.crs().cloned(),
        nodata: raster.nodata().and_then(|v| v.to_f64()).map(|v| v.to_string()),
        raster_type: RASTER_PIXEL_IS_AREA,
    };

    if T::is_float() && T::bits() == 64 {
        let samples: Vec<f64> = raster
            .data()
            .iter()
            .map(|&v| num_traits::cast(v).unwrap_or(f64::NAN))
            .collect();
        if options.deflate {
            write_image::<_, Gray64Float, _>(&mut encoder, cols, rows, &samples, &tags, Deflate::default())
        } else {
            write_image::<_, Gray64Float, _>(&mut encoder, cols, rows, &samples, &tags, Uncompressed)
        }
    } else {
        let samples: Vec<f32> = raster
            .data()
            .iter()
            .map(|&v| num_traits::cast(v).unwrap_or(f32::NAN))
            .collect();
        if options.deflate {
            write_image::<_, Gray32Float, _>(&mut encoder, cols, rows, &samples, &tags, Deflate::default())
        } else {
            write_image::<_, Gray32Float, _>(&mut encoder, cols, rows, &samples, &tags, Uncompressed)
        }
    }
}

fn write_image<W, C, D>(
    encoder: &mut TiffEncoder<W>,
    cols: usize,
    rows: usize,
    samples: &[C::Inner],
    tags: &GeoTags,
    compression: D,
) -> TiffResult<()>
where
    W: Write + Seek,
    C: colortype::ColorType,
    D: Compression,
    [C::Inner]: TiffValue,
{
    let mut image = encoder.new_image_with_compression::<C, D>(cols as u32, rows as u32, compression)?;
    write_geo_tags(image.encoder(), tags)?;
    image.write_data(samples)
}

fn write_geo_tags<W, K>(dir: &mut DirectoryEncoder<'_, W, K>, tags: &GeoTags) -> TiffResult<()>
where
    W: Write + Seek,
    K: TiffKind,
{
    let gt = &tags.transform;
    if gt.is_north_up() {
        let scale = [gt.pixel_width, -gt.pixel_height, 0.0];
        dir.write_tag(Tag::ModelPixelScaleTag, &scale[..])?;
        let tiepoint = [0.0, 0.0, 0.0, gt.origin_x, gt.origin_y, 0.0];
        dir.write_tag(Tag::ModelTiepointTag, &tiepoint[..])?;
    } else {
        let matrix = [
            gt.pixel_width, gt.row_rotation, 0.0, gt.origin_x,
            gt.col_rotation, gt.pixel_height, 0.0, gt.origin_y,
            0.0, 0.0, 0.0, 0.0,
            0.0, 0.0, 0.0, 1.0,
        ];
        dir.write_tag(Tag::ModelTransformationTag, &matrix[..])?;
    }

    let keys = geokey_directory(tags.crs.as_ref(), tags.raster_type);
    dir.write_tag(Tag::GeoKeyDirectoryTag, &keys[..])?;

    if let Some(nodata) = &tags.nodata {
        dir.write_tag(Tag::GdalNodata, nodata.as_str())?;
    }
    Ok(())
}

/// Build a GeoKeyDirectory with the model type, raster type and, when known, the EPSG code
fn geokey_directory(crs: Option<&CRS>, raster_type: u16) -> Vec<u16> {
    let epsg = crs.and_then(|c| u16::try_from(c.epsg()).ok());
    let geographic = crs.is_some_and(|c| c.is_geographic());

    let model_type = if geographic {
        MODEL_TYPE_GEOGRAPHIC
    } else {
        MODEL_TYPE_PROJECTED
    };
    let mut keys: Vec<[u16; 4]> = vec![
        [GT_MODEL_TYPE_GEOKEY, 0, 1, model_type],
        [GT_RASTER_TYPE_GEOKEY, 0, 1, raster_type],
    ];
    if let Some(code) = epsg {
        let key = if geographic {
            GEOGRAPHIC_TYPE_GEOKEY
        } else {
            PROJECTED_CS_TYPE_GEOKEY
        };
        keys.push([key, 0, 1, code]);
    }

    let mut dir = vec![1, 1, 0, keys.len() as u16];
    dir.extend(keys.iter().flatten());
    dir
}
