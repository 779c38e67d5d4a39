//! Derives the affine pixel→world transform from an `ImageFileDirectory`'s georeferencing tags
//! (spec 4.C `transform`): either `(model_tiepoint, model_pixel_scale)` or the 4x4
//! `model_transformation` fallback.
use super::ifd::{IFDTag, ImageFileDirectory};
use crate::sources::ByteSource;
use crate::transform::Affine;
use crate::Error;

/// Which sign convention for y-resolution the 4x4 `model_transformation` branch used. The source
/// this was distilled from tries both `m[4]` and `-m[4]` depending on a detail that never got
/// pinned down (spec 9) - kept as a distinct, labeled branch rather than silently picking one. The
/// tiepoint+scale path (the common case, always `-pixel_scale[1]`) never goes through here.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum YResSign {
    AsIs,
    Negated,
}

fn affine_from_tiepoint_and_scale(
    tie_points: &[f64],
    pixel_scale: &[f64],
) -> Result<Affine, Error> {
    if tie_points.len() != 6 {
        return Err(Error::UnsupportedCOG(format!(
            "expected model_tiepoint of length 6, got {}",
            tie_points.len()
        )));
    }
    if pixel_scale.len() != 3 {
        return Err(Error::UnsupportedCOG(format!(
            "expected model_pixel_scale of length 3, got {}",
            pixel_scale.len()
        )));
    }
    let tx = tie_points[3];
    let ty = tie_points[4];
    let sx = pixel_scale[0];
    let sy = pixel_scale[1];
    Ok(Affine::new(sx, 0.0, tx, 0.0, -sy, ty))
}

fn affine_from_model_transformation(m: &[f64], y_res_sign: YResSign) -> Result<Affine, Error> {
    if m.len() != 16 {
        return Err(Error::UnsupportedCOG(format!(
            "expected model_transformation of length 16, got {}",
            m.len()
        )));
    }
    let e = match y_res_sign {
        YResSign::AsIs => m[5],
        YResSign::Negated => -m[5],
    };
    Ok(Affine::new(m[0], m[1], m[3], m[4], e, m[7]))
}

/// Reads the georeferencing tags off `ifd` and derives its pixel->world affine transform,
/// preferring `(ModelTiepointTag, ModelPixelScaleTag)` over the `ModelTransformationTag` fallback.
pub async fn resolve_transform<S: ByteSource>(
    source: &mut S,
    ifd: &ImageFileDirectory,
) -> Result<Affine, Error> {
    if ifd.has_tag(IFDTag::ModelTiepointTag) && ifd.has_tag(IFDTag::ModelPixelScaleTag) {
        let tie_points = ifd
            .get_vec_double_tag_value(source, IFDTag::ModelTiepointTag)
            .await?;
        let pixel_scale = ifd
            .get_vec_double_tag_value(source, IFDTag::ModelPixelScaleTag)
            .await?;
        return affine_from_tiepoint_and_scale(&tie_points, &pixel_scale);
    }
    if ifd.has_tag(IFDTag::ModelTransformationTag) {
        let m = ifd
            .get_vec_double_tag_value(source, IFDTag::ModelTransformationTag)
            .await?;
        return affine_from_model_transformation(&m, YResSign::AsIs);
    }
    Err(Error::UnsupportedCOG(
        "no affine transformation: neither (model_tiepoint, model_pixel_scale) nor model_transformation is present".to_string(),
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_affine_from_tiepoint_and_scale() {
        let tie_points = vec![0.0, 0.0, 0.0, 500000.0, 4500000.0, 0.0];
        let pixel_scale = vec![10.0, 10.0, 0.0];
        let affine = affine_from_tiepoint_and_scale(&tie_points, &pixel_scale).unwrap();
        assert_eq!(affine, Affine::new(10.0, 0.0, 500000.0, 0.0, -10.0, 4500000.0));
    }

    #[test]
    fn test_affine_from_tiepoint_and_scale_rejects_wrong_length() {
        assert!(affine_from_tiepoint_and_scale(&[0.0; 3], &[1.0, 1.0, 0.0]).is_err());
        assert!(affine_from_tiepoint_and_scale(&[0.0; 6], &[1.0, 1.0]).is_err());
    }

    #[test]
    fn test_affine_from_model_transformation_as_is_and_negated() {
        let m = vec![
            10.0, 0.0, 0.0, 500000.0, 0.0, 10.0, 0.0, 4500000.0, 0.0, 0.0, 1.0, 0.0, 0.0, 0.0,
            0.0, 1.0,
        ];
        let as_is = affine_from_model_transformation(&m, YResSign::AsIs).unwrap();
        assert_eq!(as_is.e, 10.0);
        let negated = affine_from_model_transformation(&m, YResSign::Negated).unwrap();
        assert_eq!(negated.e, -10.0);
    }
}
