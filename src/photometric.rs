//! The Photometric Converter (spec 4.F): turns a decoded `Array` into a normalized 8-bit RGB
//! `ImageBuffer`, dispatching on the view's `PhotometricInterpretation`.
use crate::array::Array;
use crate::colormap::{Colormap, ColormapArray, ColormapDtype};
use crate::image::{DataType, ImageBuffer};
use crate::tiff::tags::PhotometricInterpretation;
use crate::Error;

fn clamp_u8(v: f64) -> u8 {
    v.round().clamp(0.0, 255.0) as u8
}

fn require_bands(array: &Array, want: usize, photometric: PhotometricInterpretation) -> Result<(), Error> {
    if array.count != want {
        return Err(Error::UnsupportedPhotometric(format!(
            "{:?} requires {} band(s), got {}",
            photometric, want, array.count
        )));
    }
    Ok(())
}

/// CIELab -> linear sRGB -> gamma-encoded sRGB, via the classic D65 XYZ intermediate (spec 4.F).
const LAB_EPSILON: f64 = 0.008856;
const D65_XN: f64 = 0.95047;
const D65_YN: f64 = 1.0;
const D65_ZN: f64 = 1.08883;

fn lab_inverse_f(t: f64) -> f64 {
    let t3 = t * t * t;
    if t3 > LAB_EPSILON {
        t3
    } else {
        (t - 16.0 / 116.0) / 7.787
    }
}

fn gamma_encode(c: f64) -> f64 {
    if c <= 0.0031308 {
        12.92 * c
    } else {
        1.055 * c.powf(1.0 / 2.4) - 0.055
    }
}

fn cielab_to_srgb8(l_raw: f64, a: f64, b: f64) -> [u8; 3] {
    let fy = (l_raw + 16.0) / 116.0;
    let fx = fy + a / 500.0;
    let fz = fy - b / 200.0;

    let x = D65_XN * lab_inverse_f(fx);
    let y = D65_YN * lab_inverse_f(fy);
    let z = D65_ZN * lab_inverse_f(fz);

    let r_lin = 3.2406 * x - 1.5372 * y - 0.4986 * z;
    let g_lin = -0.9689 * x + 1.8758 * y + 0.0415 * z;
    let b_lin = 0.0557 * x - 0.2040 * y + 1.0570 * z;

    [
        clamp_u8(gamma_encode(r_lin.max(0.0)) * 255.0),
        clamp_u8(gamma_encode(g_lin.max(0.0)) * 255.0),
        clamp_u8(gamma_encode(b_lin.max(0.0)) * 255.0),
    ]
}

fn ycbcr_to_rgb8(y: f64, cb: f64, cr: f64) -> [u8; 3] {
    [
        clamp_u8(y + 1.402 * (cr - 128.0)),
        clamp_u8(y - 0.344136 * (cb - 128.0) - 0.714136 * (cr - 128.0)),
        clamp_u8(y + 1.772 * (cb - 128.0)),
    ]
}

fn cmyk_to_rgb8(c: f64, m: f64, y: f64, k: f64) -> [u8; 3] {
    [
        clamp_u8(255.0 * ((255.0 - c) / 256.0) * ((255.0 - k) / 256.0)),
        clamp_u8(255.0 * ((255.0 - m) / 256.0) * ((255.0 - k) / 256.0)),
        clamp_u8(255.0 * ((255.0 - y) / 256.0) * ((255.0 - k) / 256.0)),
    ]
}

/// Converts `array` to a 3-band 8-bit `ImageBuffer` per its source's photometric interpretation
/// (spec 4.F). `colormap` is required (and only used) for `RgbPalette`.
pub fn to_rgb(
    array: &Array,
    photometric: PhotometricInterpretation,
    colormap: Option<&Colormap>,
) -> Result<ImageBuffer, Error> {
    let (h, w) = (array.height, array.width);
    let mut data = vec![0u8; h * w * 3];

    match photometric {
        PhotometricInterpretation::Rgb => {
            require_bands(array, 3, photometric)?;
            for row in 0..h {
                for col in 0..w {
                    let o = (row * w + col) * 3;
                    for band in 0..3 {
                        data[o + band] = clamp_u8(array.sample_f64(band, row, col));
                    }
                }
            }
        }
        PhotometricInterpretation::RgbPalette => {
            let colormap = colormap.ok_or_else(|| {
                Error::UnsupportedPhotometric("RgbPalette requires a colormap".to_string())
            })?;
            let table = match colormap.as_array(ColormapDtype::Uint8) {
                ColormapArray::Uint8(v) => v,
                ColormapArray::Uint16(_) => unreachable!("as_array(Uint8) always returns Uint8"),
            };
            for row in 0..h {
                for col in 0..w {
                    let idx = array.sample_f64(0, row, col) as usize;
                    let rgb = table.get(idx).ok_or_else(|| {
                        Error::OtherError(format!(
                            "colormap index {} out of range (table has {} entries)",
                            idx,
                            table.len()
                        ))
                    })?;
                    let o = (row * w + col) * 3;
                    data[o..o + 3].copy_from_slice(rgb);
                }
            }
        }
        PhotometricInterpretation::BlackIsZero => {
            for row in 0..h {
                for col in 0..w {
                    let v = clamp_u8(array.sample_f64(0, row, col));
                    let o = (row * w + col) * 3;
                    data[o] = v;
                    data[o + 1] = v;
                    data[o + 2] = v;
                }
            }
        }
        PhotometricInterpretation::WhiteIsZero => {
            for row in 0..h {
                for col in 0..w {
                    let v = clamp_u8(255.0 - array.sample_f64(0, row, col));
                    let o = (row * w + col) * 3;
                    data[o] = v;
                    data[o + 1] = v;
                    data[o + 2] = v;
                }
            }
        }
        PhotometricInterpretation::Cmyk => {
            require_bands(array, 4, photometric)?;
            for row in 0..h {
                for col in 0..w {
                    let rgb = cmyk_to_rgb8(
                        array.sample_f64(0, row, col),
                        array.sample_f64(1, row, col),
                        array.sample_f64(2, row, col),
                        array.sample_f64(3, row, col),
                    );
                    let o = (row * w + col) * 3;
                    data[o..o + 3].copy_from_slice(&rgb);
                }
            }
        }
        PhotometricInterpretation::YCbCr => {
            require_bands(array, 3, photometric)?;
            for row in 0..h {
                for col in 0..w {
                    let rgb = ycbcr_to_rgb8(
                        array.sample_f64(0, row, col),
                        array.sample_f64(1, row, col),
                        array.sample_f64(2, row, col),
                    );
                    let o = (row * w + col) * 3;
                    data[o..o + 3].copy_from_slice(&rgb);
                }
            }
        }
        PhotometricInterpretation::CieLab => {
            require_bands(array, 3, photometric)?;
            for row in 0..h {
                for col in 0..w {
                    let rgb = cielab_to_srgb8(
                        array.sample_f64(0, row, col),
                        array.sample_i8(1, row, col) as f64,
                        array.sample_i8(2, row, col) as f64,
                    );
                    let o = (row * w + col) * 3;
                    data[o..o + 3].copy_from_slice(&rgb);
                }
            }
        }
        PhotometricInterpretation::TransparencyMask => {
            return Err(Error::UnsupportedPhotometric(
                "a transparency mask directory has no RGB conversion".to_string(),
            ));
        }
    }

    Ok(ImageBuffer {
        width: w,
        height: h,
        nbands: 3,
        has_alpha: false,
        data_type: DataType::Uint8,
        data,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transform::Affine;
    use serde_json::json;

    fn gray_array(samples: Vec<u8>, w: usize, h: usize) -> Array {
        Array {
            data: samples,
            dtype: crate::tiff::data_types::InternalDataType::Uint8,
            width: w,
            height: h,
            count: 1,
            mask: None,
            transform: Affine::IDENTITY,
            crs: json!({}),
            nodata: None,
        }
    }

    #[test]
    fn test_black_is_zero_replicates_to_three_bands() {
        let a = gray_array(vec![0, 128, 255, 64], 2, 2);
        let img = to_rgb(&a, PhotometricInterpretation::BlackIsZero, None).unwrap();
        assert_eq!(img.nbands, 3);
        assert_eq!(&img.data[0..3], &[0, 0, 0]);
        assert_eq!(&img.data[3..6], &[128, 128, 128]);
    }

    #[test]
    fn test_white_is_zero_inverts() {
        let a = gray_array(vec![0, 255], 2, 1);
        let img = to_rgb(&a, PhotometricInterpretation::WhiteIsZero, None).unwrap();
        assert_eq!(&img.data[0..3], &[255, 255, 255]);
        assert_eq!(&img.data[3..6], &[0, 0, 0]);
    }

    #[test]
    fn test_rgb_passthrough_requires_three_bands() {
        let a = gray_array(vec![1], 1, 1);
        assert!(to_rgb(&a, PhotometricInterpretation::Rgb, None).is_err());
    }

    #[test]
    fn test_rgb_palette_requires_colormap() {
        let a = gray_array(vec![0], 1, 1);
        assert!(to_rgb(&a, PhotometricInterpretation::RgbPalette, None).is_err());
    }

    #[test]
    fn test_rgb_palette_looks_up_table() {
        let a = gray_array(vec![1, 0], 2, 1);
        let cmap = Colormap::from_raw(&[0, 0xffff, 0, 0xffff, 0, 0]).unwrap();
        let img = to_rgb(&a, PhotometricInterpretation::RgbPalette, Some(&cmap)).unwrap();
        assert_eq!(&img.data[0..3], &[0xff, 0xff, 0x00]);
        assert_eq!(&img.data[3..6], &[0x00, 0x00, 0x00]);
    }

    #[test]
    fn test_ycbcr_gray_midpoint_is_neutral() {
        let rgb = ycbcr_to_rgb8(128.0, 128.0, 128.0);
        assert_eq!(rgb, [128, 128, 128]);
    }

    #[test]
    fn test_cmyk_all_zero_is_near_white() {
        // 255 * (255/256)^2 rounds to 253, not a clean 255, per the /256-normalized formula.
        assert_eq!(cmyk_to_rgb8(0.0, 0.0, 0.0, 0.0), [253, 253, 253]);
    }

    #[test]
    fn test_cmyk_full_black_channel_is_black() {
        assert_eq!(cmyk_to_rgb8(0.0, 0.0, 0.0, 255.0), [0, 0, 0]);
    }

    #[test]
    fn test_cielab_mid_gray_is_neutral() {
        // L=50, a*=b*=0 is a neutral gray: all three channels come out equal.
        let rgb = cielab_to_srgb8(50.0, 0.0, 0.0);
        assert!((rgb[0] as i32 - rgb[1] as i32).abs() <= 1);
        assert!((rgb[1] as i32 - rgb[2] as i32).abs() <= 1);
        testutils::assert_float_eq(rgb[0] as f64, rgb[2] as f64, 2.0);
    }

    #[test]
    fn test_cielab_black_is_black() {
        let rgb = cielab_to_srgb8(0.0, 0.0, 0.0);
        assert_eq!(rgb, [0, 0, 0]);
    }
}
