//! Native GeoTIFF reading/writing on top of the `tiff` crate.
//!
//! Supports what the model exchanges with GIS tools: single-band grids,
//! north-up georeferencing (pixel scale + tiepoint), the GDAL no-data tag
//! and an EPSG code in the GeoKey directory. Rasters are written as
//! 32-bit float unless a class raster asks for 32-bit integers.

use crate::crs::CRS;
use crate::error::{Error, Result};
use crate::raster::{GeoTransform, Raster, RasterElement};
use num_traits::NumCast;
use serde::Serialize;
use std::fs::File;
use std::io::{BufWriter, Read, Seek, Write};
use std::path::Path;
use tiff::decoder::{Decoder, DecodingResult};
use tiff::encoder::colortype::{ColorType, Gray32Float, GrayI32};
use tiff::encoder::{TiffEncoder, TiffValue};
use tiff::tags::Tag;
use tracing::debug;

const MODEL_PIXEL_SCALE: u16 = 33550;
const MODEL_TIEPOINT: u16 = 33922;
const GEO_KEY_DIRECTORY: u16 = 34735;
const GDAL_NODATA: u16 = 42113;

const GT_MODEL_TYPE_KEY: u16 = 1024;
const GT_RASTER_TYPE_KEY: u16 = 1025;
const GEOGRAPHIC_TYPE_KEY: u16 = 2048;
const PROJECTED_CS_TYPE_KEY: u16 = 3072;

fn tag(code: u16) -> Tag {
    Tag::from_u16_exhaustive(code)
}

/// Sample format of a written GeoTIFF
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SampleType {
    #[default]
    Float32,
    /// Class rasters. Values are rounded; no-data and non-finite cells
    /// become the integer no-data value.
    Int32,
}

/// Read the first band of a GeoTIFF
pub fn read_geotiff<T, P>(path: P) -> Result<Raster<T>>
where
    T: RasterElement,
    P: AsRef<Path>,
{
    let file = File::open(path.as_ref())?;
    let raster: Raster<T> = decode(file)?;
    let (rows, cols) = raster.shape();
    debug!(path = %path.as_ref().display(), rows, cols, "read geotiff");
    Ok(raster)
}

fn cast_all<S, T>(buf: Vec<S>) -> Vec<T>
where
    S: NumCast + Copy,
    T: RasterElement,
{
    buf.into_iter()
        .map(|v| num_traits::cast(v).unwrap_or_else(T::default_nodata))
        .collect()
}

fn decode<T, R>(reader: R) -> Result<Raster<T>>
where
    T: RasterElement,
    R: Read + Seek,
{
    let mut decoder =
        Decoder::new(reader).map_err(|e| Error::Other(format!("TIFF decode error: {}", e)))?;

    let (width, height) = decoder
        .dimensions()
        .map_err(|e| Error::Other(format!("Cannot read dimensions: {}", e)))?;
    let (rows, cols) = (height as usize, width as usize);

    let image = decoder
        .read_image()
        .map_err(|e| Error::Other(format!("Cannot read image data: {}", e)))?;

    let data: Vec<T> = match image {
        DecodingResult::F32(buf) => cast_all(buf),
        DecodingResult::F64(buf) => cast_all(buf),
        DecodingResult::U8(buf) => cast_all(buf),
        DecodingResult::U16(buf) => cast_all(buf),
        DecodingResult::U32(buf) => cast_all(buf),
        DecodingResult::I8(buf) => cast_all(buf),
        DecodingResult::I16(buf) => cast_all(buf),
        DecodingResult::I32(buf) => cast_all(buf),
        _ => return Err(Error::UnsupportedDataType("unsupported TIFF sample format".into())),
    };

    // Multi-band files come back interleaved; keep band 1.
    let bands = data.len() / (rows * cols).max(1);
    let data = if bands > 1 {
        data.into_iter().step_by(bands).collect()
    } else {
        data
    };

    let mut raster = Raster::from_vec(data, rows, cols)?;

    if let Some(transform) = read_geotransform(&mut decoder) {
        raster.set_transform(transform);
    }
    if let Some(nodata) = read_nodata(&mut decoder) {
        raster.set_nodata(num_traits::cast::<f64, T>(nodata));
    }
    raster.set_crs(read_epsg(&mut decoder).map(CRS::from_epsg));

    Ok(raster)
}

fn read_geotransform<R: Read + Seek>(decoder: &mut Decoder<R>) -> Option<GeoTransform> {
    let scale = decoder.get_tag_f64_vec(tag(MODEL_PIXEL_SCALE)).ok()?;
    let tiepoint = decoder.get_tag_f64_vec(tag(MODEL_TIEPOINT)).ok()?;
    if scale.len() < 2 || tiepoint.len() < 6 {
        return None;
    }

    // tiepoint: [I, J, K, X, Y, Z]
    let origin_x = tiepoint[3] - tiepoint[0] * scale[0];
    let origin_y = tiepoint[4] + tiepoint[1] * scale[1];
    Some(GeoTransform::new(origin_x, origin_y, scale[0], -scale[1]))
}

fn read_nodata<R: Read + Seek>(decoder: &mut Decoder<R>) -> Option<f64> {
    let text = decoder.get_tag_ascii_string(tag(GDAL_NODATA)).ok()?;
    text.trim_matches(|c: char| c == '\0' || c.is_whitespace())
        .parse()
        .ok()
}

fn read_epsg<R: Read + Seek>(decoder: &mut Decoder<R>) -> Option<u32> {
    let keys = decoder.get_tag_u16_vec(tag(GEO_KEY_DIRECTORY)).ok()?;
    // header [version, revision, minor, count] then [key, location, count, value]
    keys.get(4..)?
        .chunks_exact(4)
        .find(|entry| {
            (entry[0] == PROJECTED_CS_TYPE_KEY || entry[0] == GEOGRAPHIC_TYPE_KEY) && entry[1] == 0
        })
        .map(|entry| entry[3] as u32)
}

/// Write a raster as a single-band 32-bit float GeoTIFF
pub fn write_geotiff<T, P>(raster: &Raster<T>, path: P) -> Result<()>
where
    T: RasterElement,
    P: AsRef<Path>,
{
    write_geotiff_as(raster, path, SampleType::Float32)
}

/// Write a raster as a single-band GeoTIFF with the given sample format
pub fn write_geotiff_as<T, P>(raster: &Raster<T>, path: P, sample: SampleType) -> Result<()>
where
    T: RasterElement,
    P: AsRef<Path>,
{
    let file = File::create(path.as_ref())?;
    let mut writer = BufWriter::new(file);
    encode(raster, &mut writer, sample)?;
    writer.flush()?;
    let (rows, cols) = raster.shape();
    debug!(path = %path.as_ref().display(), rows, cols, ?sample, "wrote geotiff");
    Ok(())
}

fn encode<T, W>(raster: &Raster<T>, writer: W, sample: SampleType) -> Result<()>
where
    T: RasterElement,
    W: Write + Seek,
{
    let mut encoder =
        TiffEncoder::new(writer).map_err(|e| Error::Other(format!("TIFF encoder error: {}", e)))?;

    match sample {
        SampleType::Float32 => {
            let data: Vec<f32> = raster
                .data()
                .iter()
                .map(|&v| num_traits::cast(v).unwrap_or(f32::NAN))
                .collect();
            let nodata = raster.nodata().and_then(|nd| nd.to_f64()).map(|nd| nd.to_string());
            encode_image::<Gray32Float, _, _>(&mut encoder, raster, &data, nodata)
        }
        SampleType::Int32 => {
            let fill = int_nodata(raster);
            let data: Vec<i32> = raster
                .data()
                .iter()
                .map(|&v| {
                    if raster.is_nodata(v) {
                        return fill;
                    }
                    v.to_f64()
                        .filter(|x| x.is_finite())
                        .and_then(|x| num_traits::cast(x.round()))
                        .unwrap_or(fill)
                })
                .collect();
            let nodata = raster.nodata().map(|_| fill.to_string());
            encode_image::<GrayI32, _, _>(&mut encoder, raster, &data, nodata)
        }
    }
}

/// Integer stand-in for the raster's no-data value
fn int_nodata<T: RasterElement>(raster: &Raster<T>) -> i32 {
    raster
        .nodata()
        .and_then(|nd| nd.to_f64())
        .filter(|nd| nd.is_finite())
        .and_then(|nd| num_traits::cast(nd.round()))
        .unwrap_or(i32::MIN)
}

fn encode_image<C, T, W>(
    encoder: &mut TiffEncoder<W>,
    raster: &Raster<T>,
    data: &[C::Inner],
    nodata: Option<String>,
) -> Result<()>
where
    C: ColorType,
    [C::Inner]: TiffValue,
    T: RasterElement,
    W: Write + Seek,
{
    let (rows, cols) = raster.shape();
    let mut image = encoder
        .new_image::<C>(cols as u32, rows as u32)
        .map_err(|e| Error::Other(format!("Cannot create TIFF image: {}", e)))?;

    let gt = raster.transform();
    let scale = [gt.pixel_width, gt.pixel_height.abs(), 0.0];
    let tiepoint = [0.0, 0.0, 0.0, gt.origin_x, gt.origin_y, 0.0];
    image
        .encoder()
        .write_tag(tag(MODEL_PIXEL_SCALE), &scale[..])
        .map_err(|e| Error::Other(format!("Cannot write scale tag: {}", e)))?;
    image
        .encoder()
        .write_tag(tag(MODEL_TIEPOINT), &tiepoint[..])
        .map_err(|e| Error::Other(format!("Cannot write tiepoint tag: {}", e)))?;

    let geokeys = geokey_directory(raster.crs().and_then(CRS::epsg));
    image
        .encoder()
        .write_tag(tag(GEO_KEY_DIRECTORY), &geokeys[..])
        .map_err(|e| Error::Other(format!("Cannot write geokey tag: {}", e)))?;

    if let Some(text) = nodata {
        image
            .encoder()
            .write_tag(tag(GDAL_NODATA), text.as_str())
            .map_err(|e| Error::Other(format!("Cannot write nodata tag: {}", e)))?;
    }

    image
        .write_data(data)
        .map_err(|e| Error::Other(format!("Cannot write image data: {}", e)))?;
    Ok(())
}

fn geokey_directory(epsg: Option<u32>) -> Vec<u16> {
    let code = epsg.and_then(|c| u16::try_from(c).ok());
    let geographic = code == Some(4326);
    let mut entries: Vec<[u16; 4]> = vec![
        [GT_MODEL_TYPE_KEY, 0, 1, if geographic { 2 } else { 1 }],
        [GT_RASTER_TYPE_KEY, 0, 1, 1],
    ];
    if let Some(code) = code {
        let key = if geographic { GEOGRAPHIC_TYPE_KEY } else { PROJECTED_CS_TYPE_KEY };
        entries.push([key, 0, 1, code]);
    }

    let mut keys = vec![1, 1, 0, entries.len() as u16];
    keys.extend(entries.into_iter().flatten());
    keys
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn geokeys_carry_projected_epsg() {
        let keys = geokey_directory(Some(3006));
        assert_eq!(&keys[..4], &[1, 1, 0, 3]);
        assert_eq!(&keys[12..], &[PROJECTED_CS_TYPE_KEY, 0, 1, 3006]);
    }

    #[test]
    fn geokeys_without_crs() {
        assert_eq!(geokey_directory(None).len(), 12);
    }

    #[test]
    fn write_then_read_keeps_georeferencing() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("iuhd.tif");

        let mut raster = Raster::from_vec(vec![1.0, -9999.0, 3.5, 10.0], 2, 2).unwrap();
        raster.set_transform(GeoTransform::new(647_000.0, 6_640_020.0, 10.0, -10.0));
        raster.set_nodata(Some(-9999.0));
        raster.set_crs(Some(CRS::sweref99_tm()));
        write_geotiff(&raster, &path).unwrap();

        let back: Raster<f64> = read_geotiff(&path).unwrap();
        assert_eq!(back.shape(), (2, 2));
        assert_eq!(back.transform(), raster.transform());
        assert_eq!(back.nodata(), Some(-9999.0));
        assert_eq!(back.crs().and_then(CRS::epsg), Some(3006));
        assert_eq!(back.get(1, 0).unwrap(), 3.5);
        assert!(back.is_nodata(back.get(0, 1).unwrap()));
    }

    #[test]
    fn class_raster_written_as_int32() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("IUHD_final.tif");

        let mut raster = Raster::from_vec(vec![1.0, -9999.0, 4.0, 9.6, f64::NAN, 10.0], 2, 3).unwrap();
        raster.set_transform(GeoTransform::new(647_000.0, 6_640_020.0, 10.0, -10.0));
        raster.set_nodata(Some(-9999.0));
        raster.set_crs(Some(CRS::sweref99_tm()));
        write_geotiff_as(&raster, &path, SampleType::Int32).unwrap();

        let mut decoder = Decoder::new(File::open(&path).unwrap()).unwrap();
        let DecodingResult::I32(samples) = decoder.read_image().unwrap() else {
            panic!("class raster is not Int32");
        };
        assert_eq!(samples, vec![1, -9999, 4, 10, -9999, 10]);

        let back: Raster<f64> = read_geotiff(&path).unwrap();
        assert_eq!(back.nodata(), Some(-9999.0));
        assert_eq!(back.transform(), raster.transform());
        assert_eq!(back.crs().and_then(CRS::epsg), Some(3006));
        assert!(back.is_nodata(back.get(1, 1).unwrap()));
    }

    #[test]
    fn default_sample_type_is_float() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("lai.tif");
        let raster = Raster::from_vec(vec![0.25, 2.5], 1, 2).unwrap();
        write_geotiff(&raster, &path).unwrap();

        let mut decoder = Decoder::new(File::open(&path).unwrap()).unwrap();
        assert!(matches!(decoder.read_image().unwrap(), DecodingResult::F32(_)));
        assert_eq!(SampleType::default(), SampleType::Float32);
    }
}
