//! The Geo Key Resolver (spec 4.E): turns a packed `GeoKeyDirectory` into a structured CRS
//! description. There is no coordinate-transform library underneath this (see `DESIGN.md`,
//! "Dropped"): an EPSG-coded CRS resolves to a PROJJSON reference object carrying its `id`, and a
//! user-defined CRS is built up field-by-field into a full `ProjectedCRS`/`GeographicCRS`
//! PROJJSON document, the way a consumer would hand either shape to a real CRS library.
use serde_json::json;

use super::epsg::{AngularUnit, LinearUnit};
use super::geo_keys::{GeoKeyDirectory, GeoKeyId};
use crate::Error;

/// A structured CRS description (PROJJSON). Opaque to this crate beyond construction - downstream
/// consumers hand it to a real CRS library.
pub type Crs = serde_json::Value;

const PROJJSON_SCHEMA: &str = "https://proj.org/schemas/v0.7/projjson.schema.json";
const USER_DEFINED: u16 = 32767;

fn opt_short(gkd: &GeoKeyDirectory, id: GeoKeyId) -> Result<Option<u16>, Error> {
    if gkd.has_key(id) {
        Ok(Some(gkd.get_short_key_value(id)?))
    } else {
        Ok(None)
    }
}

fn opt_double(gkd: &GeoKeyDirectory, id: GeoKeyId) -> Result<Option<f64>, Error> {
    if gkd.has_key(id) {
        Ok(Some(gkd.get_double_key_value(id)?))
    } else {
        Ok(None)
    }
}

fn opt_ascii(gkd: &GeoKeyDirectory, id: GeoKeyId) -> Result<Option<String>, Error> {
    if gkd.has_key(id) {
        Ok(Some(gkd.get_ascii_key_value(id)?.to_string()))
    } else {
        Ok(None)
    }
}

/// Mirrors Python's `a or b`: `None` *or* a falsy (zero) value falls through to `b`. The source
/// this was distilled from relies on this for a few conversion-parameter fallback chains (ct=15,
/// ct=17 below) - faithfully reproduced rather than "fixed", per spec 9.
fn py_or_f64(a: Option<f64>, b: Option<f64>) -> Option<f64> {
    match a {
        Some(v) if v != 0.0 => Some(v),
        _ => b,
    }
}

fn py_or_string(a: Option<String>, fallback: &str) -> String {
    match a {
        Some(s) if !s.is_empty() => s,
        _ => fallback.to_string(),
    }
}

fn epsg_reference(crs_type: &str, code: u16) -> Crs {
    json!({
        "type": crs_type,
        "$schema": PROJJSON_SCHEMA,
        "name": format!("EPSG:{}", code),
        "id": {"authority": "EPSG", "code": code},
    })
}

fn linear_unit_json(unit: &LinearUnit) -> serde_json::Value {
    match unit {
        LinearUnit::Metre => json!("metre"),
        LinearUnit::Foot => json!("foot"),
        LinearUnit::UsSurveyFoot => json!({
            "type": "LinearUnit",
            "name": "US survey foot",
            "conversion_factor": LinearUnit::US_SURVEY_FOOT_CONVERSION_FACTOR,
        }),
    }
}

fn geographic_cs(gkd: &GeoKeyDirectory) -> Result<serde_json::Value, Error> {
    let unit = AngularUnit::from_epsg_code(opt_short(gkd, GeoKeyId::GeogAngularUnits)?);
    Ok(json!({
        "subtype": "ellipsoidal",
        "axis": [
            {"name": "Latitude", "abbreviation": "lat", "direction": "north", "unit": unit.projjson_name()},
            {"name": "Longitude", "abbreviation": "lon", "direction": "east", "unit": unit.projjson_name()},
        ],
    }))
}

fn projected_cs(gkd: &GeoKeyDirectory) -> Result<serde_json::Value, Error> {
    let unit = LinearUnit::from_epsg_code(opt_short(gkd, GeoKeyId::ProjLinearUnits)?);
    let unit_json = linear_unit_json(&unit);
    Ok(json!({
        "subtype": "Cartesian",
        "axis": [
            {"name": "Easting", "abbreviation": "E", "direction": "east", "unit": unit_json},
            {"name": "Northing", "abbreviation": "N", "direction": "north", "unit": unit_json},
        ],
    }))
}

fn build_ellipsoid_params(gkd: &GeoKeyDirectory) -> Result<serde_json::Value, Error> {
    if let Some(code) = opt_short(gkd, GeoKeyId::GeogEllipsoid)? {
        if code != USER_DEFINED {
            let mut ellipsoid = json!({"name": format!("EPSG ellipsoid {}", code)});
            if let Some(a) = opt_double(gkd, GeoKeyId::GeogSemiMajorAxis)? {
                ellipsoid["semi_major_axis"] = json!(a);
            }
            if let Some(inv_f) = opt_double(gkd, GeoKeyId::GeogInvFlattening)? {
                ellipsoid["inverse_flattening"] = json!(inv_f);
            } else if let Some(b) = opt_double(gkd, GeoKeyId::GeogSemiMinorAxis)? {
                ellipsoid["semi_minor_axis"] = json!(b);
            }
            return Ok(ellipsoid);
        }
    }

    let semi_major = opt_double(gkd, GeoKeyId::GeogSemiMajorAxis)?.ok_or_else(|| {
        Error::UnsupportedProjection(
            "user-defined ellipsoid requires GeogSemiMajorAxis".to_string(),
        )
    })?;
    let mut ellipsoid = json!({"name": "User-defined", "semi_major_axis": semi_major});
    if let Some(inv_f) = opt_double(gkd, GeoKeyId::GeogInvFlattening)? {
        ellipsoid["inverse_flattening"] = json!(inv_f);
    } else if let Some(b) = opt_double(gkd, GeoKeyId::GeogSemiMinorAxis)? {
        ellipsoid["semi_minor_axis"] = json!(b);
    } else {
        return Err(Error::UnsupportedProjection(
            "user-defined ellipsoid requires GeogInvFlattening or GeogSemiMinorAxis".to_string(),
        ));
    }
    Ok(ellipsoid)
}

fn build_user_defined_geographic_crs(gkd: &GeoKeyDirectory) -> Result<Crs, Error> {
    let ellipsoid = build_ellipsoid_params(gkd)?;

    let mut pm_name = "Greenwich".to_string();
    let mut pm_longitude = 0.0;
    match opt_short(gkd, GeoKeyId::GeogPrimeMeridian)? {
        Some(code) if code != USER_DEFINED => pm_name = format!("EPSG:{}", code),
        _ => {
            if let Some(lon) = opt_double(gkd, GeoKeyId::GeogPrimeMeridianLong)? {
                pm_longitude = lon;
                pm_name = "User-defined".to_string();
            }
        }
    }

    let name = py_or_string(opt_ascii(gkd, GeoKeyId::GeogCitation)?, "User-defined");

    if let Some(code) = opt_short(gkd, GeoKeyId::GeogGeodeticDatum)? {
        if code != USER_DEFINED {
            return Ok(json!({
                "type": "GeographicCRS",
                "$schema": PROJJSON_SCHEMA,
                "name": name,
                "datum": {
                    "type": "GeodeticReferenceFrame",
                    "name": format!("Unknown datum based upon EPSG {} ellipsoid", code),
                },
                "datum_ensemble": serde_json::Value::Null,
                "coordinate_system": geographic_cs(gkd)?,
            }));
        }
    }

    let datum = json!({
        "type": "GeodeticReferenceFrame",
        "name": name,
        "ellipsoid": ellipsoid,
        "prime_meridian": {"name": pm_name, "longitude": pm_longitude},
    });
    Ok(json!({
        "type": "GeographicCRS",
        "$schema": PROJJSON_SCHEMA,
        "name": name,
        "datum": datum,
        "coordinate_system": geographic_cs(gkd)?,
    }))
}

fn parse_geographic_crs(gkd: &GeoKeyDirectory) -> Result<Crs, Error> {
    if let Some(code) = opt_short(gkd, GeoKeyId::GeographicType)? {
        if code != USER_DEFINED {
            return Ok(epsg_reference("GeographicCRS", code));
        }
    }
    build_user_defined_geographic_crs(gkd)
}

fn param(name: &str, value: Option<f64>, default: f64) -> serde_json::Value {
    json!({"name": name, "value": value.unwrap_or(default)})
}

/// Builds the `conversion` object of a user-defined `ProjectedCRS`, dispatching on
/// `ProjCoordTrans` (GeoKey 3075). The method/parameter table is spec 4.E's; fallback chains for
/// ct=15 and ct=17, and the azimuth dual-use for ct=3-6, are reproduced exactly as observed in the
/// source rather than corrected (spec 9).
fn build_conversion(gkd: &GeoKeyDirectory) -> Result<serde_json::Value, Error> {
    let ct = gkd.get_short_key_value(GeoKeyId::ProjCoordTrans)?;

    let lat0 = || opt_double(gkd, GeoKeyId::ProjNatOriginLat);
    let lon0 = || opt_double(gkd, GeoKeyId::ProjNatOriginLong);
    let k0 = || opt_double(gkd, GeoKeyId::ProjScaleAtNatOrigin);
    let fe = || opt_double(gkd, GeoKeyId::ProjFalseEasting);
    let fn_ = || opt_double(gkd, GeoKeyId::ProjFalseNorthing);
    let lat_c = || opt_double(gkd, GeoKeyId::ProjCenterLat);
    let lon_c = || opt_double(gkd, GeoKeyId::ProjCenterLong);

    let (name, method_name, parameters): (&str, &str, Vec<serde_json::Value>) = match ct {
        1 => (
            "Transverse Mercator",
            "Transverse Mercator",
            vec![
                param("Latitude of natural origin", lat0()?, 0.0),
                param("Longitude of natural origin", lon0()?, 0.0),
                param("Scale factor at natural origin", k0()?, 1.0),
                param("False easting", fe()?, 0.0),
                param("False northing", fn_()?, 0.0),
            ],
        ),
        2 | 27 => (
            "Transverse Mercator (South Orientated)",
            "Transverse Mercator (South Orientated)",
            vec![
                param("Latitude of natural origin", lat0()?, 0.0),
                param("Longitude of natural origin", lon0()?, 0.0),
                param("Scale factor at natural origin", k0()?, 1.0),
                param("False easting", fe()?, 0.0),
                param("False northing", fn_()?, 0.0),
            ],
        ),
        3..=6 => {
            // proj_azimuth_angle is reused for both "Azimuth of initial line" and "Angle from
            // Rectified to Skew Grid" - see spec 9, not a transcription mistake.
            let azimuth = opt_double(gkd, GeoKeyId::ProjAzimuthAngle)?;
            (
                "Hotine Oblique Mercator (variant B)",
                "Hotine Oblique Mercator (variant B)",
                vec![
                    param("Latitude of projection centre", lat_c()?, 0.0),
                    param("Longitude of projection centre", lon_c()?, 0.0),
                    param("Azimuth of initial line", azimuth, 0.0),
                    param("Angle from Rectified to Skew Grid", azimuth, 0.0),
                    param(
                        "Scale factor on initial line",
                        opt_double(gkd, GeoKeyId::ProjScaleAtCenter)?,
                        1.0,
                    ),
                    param(
                        "Easting at projection centre",
                        opt_double(gkd, GeoKeyId::ProjCenterEasting)?,
                        0.0,
                    ),
                    param(
                        "Northing at projection centre",
                        opt_double(gkd, GeoKeyId::ProjCenterNorthing)?,
                        0.0,
                    ),
                ],
            )
        }
        7 => (
            "Mercator (variant A)",
            "Mercator (variant A)",
            vec![
                param("Latitude of natural origin", lat0()?, 0.0),
                param("Longitude of natural origin", lon0()?, 0.0),
                param("Scale factor at natural origin", k0()?, 1.0),
                param("False easting", fe()?, 0.0),
                param("False northing", fn_()?, 0.0),
            ],
        ),
        8 => (
            "Lambert Conic Conformal (2SP)",
            "Lambert Conic Conformal (2SP)",
            vec![
                param(
                    "Latitude of false origin",
                    opt_double(gkd, GeoKeyId::ProjFalseOriginLat)?,
                    0.0,
                ),
                param(
                    "Longitude of false origin",
                    opt_double(gkd, GeoKeyId::ProjFalseOriginLong)?,
                    0.0,
                ),
                param(
                    "Latitude of 1st standard parallel",
                    opt_double(gkd, GeoKeyId::ProjStdParallel1)?,
                    0.0,
                ),
                param(
                    "Latitude of 2nd standard parallel",
                    opt_double(gkd, GeoKeyId::ProjStdParallel2)?,
                    0.0,
                ),
                param(
                    "Easting at false origin",
                    opt_double(gkd, GeoKeyId::ProjFalseOriginEasting)?,
                    0.0,
                ),
                param(
                    "Northing at false origin",
                    opt_double(gkd, GeoKeyId::ProjFalseOriginNorthing)?,
                    0.0,
                ),
            ],
        ),
        9 => (
            "Lambert Conic Conformal (1SP)",
            "Lambert Conic Conformal (1SP)",
            vec![
                param("Latitude of natural origin", lat0()?, 0.0),
                param("Longitude of natural origin", lon0()?, 0.0),
                param("Scale factor at natural origin", k0()?, 1.0),
                param("False easting", fe()?, 0.0),
                param("False northing", fn_()?, 0.0),
            ],
        ),
        10 => (
            "Lambert Azimuthal Equal Area",
            "Lambert Azimuthal Equal Area",
            vec![
                param("Latitude of natural origin", lat_c()?, 0.0),
                param("Longitude of natural origin", lon_c()?, 0.0),
                param("False easting", fe()?, 0.0),
                param("False northing", fn_()?, 0.0),
            ],
        ),
        11 => (
            "Albers Equal Area",
            "Albers Equal Area",
            vec![
                param(
                    "Latitude of false origin",
                    opt_double(gkd, GeoKeyId::ProjFalseOriginLat)?,
                    0.0,
                ),
                param(
                    "Longitude of false origin",
                    opt_double(gkd, GeoKeyId::ProjFalseOriginLong)?,
                    0.0,
                ),
                param(
                    "Latitude of 1st standard parallel",
                    opt_double(gkd, GeoKeyId::ProjStdParallel1)?,
                    0.0,
                ),
                param(
                    "Latitude of 2nd standard parallel",
                    opt_double(gkd, GeoKeyId::ProjStdParallel2)?,
                    0.0,
                ),
                param(
                    "Easting at false origin",
                    opt_double(gkd, GeoKeyId::ProjFalseOriginEasting)?,
                    0.0,
                ),
                param(
                    "Northing at false origin",
                    opt_double(gkd, GeoKeyId::ProjFalseOriginNorthing)?,
                    0.0,
                ),
            ],
        ),
        12 => (
            "Modified Azimuthal Equidistant",
            "Modified Azimuthal Equidistant",
            vec![
                param("Latitude of natural origin", lat_c()?, 0.0),
                param("Longitude of natural origin", lon_c()?, 0.0),
                param("False easting", fe()?, 0.0),
                param("False northing", fn_()?, 0.0),
            ],
        ),
        14 => (
            "Stereographic",
            "Stereographic",
            vec![
                param("Latitude of natural origin", lat_c()?, 0.0),
                param("Longitude of natural origin", lon_c()?, 0.0),
                param(
                    "Scale factor at natural origin",
                    opt_double(gkd, GeoKeyId::ProjScaleAtCenter)?,
                    1.0,
                ),
                param("False easting", fe()?, 0.0),
                param("False northing", fn_()?, 0.0),
            ],
        ),
        15 => (
            "Polar Stereographic (variant B)",
            "Polar Stereographic (variant B)",
            vec![
                param(
                    "Latitude of standard parallel",
                    py_or_f64(lat0()?, opt_double(gkd, GeoKeyId::ProjStdParallel1)?),
                    0.0,
                ),
                param(
                    "Longitude of origin",
                    py_or_f64(
                        opt_double(gkd, GeoKeyId::ProjStraightVertPoleLong)?,
                        lon0()?,
                    ),
                    0.0,
                ),
                param("False easting", fe()?, 0.0),
                param("False northing", fn_()?, 0.0),
            ],
        ),
        16 => (
            "Oblique Stereographic",
            "Oblique Stereographic",
            vec![
                param("Latitude of natural origin", lat_c()?, 0.0),
                param("Longitude of natural origin", lon_c()?, 0.0),
                param(
                    "Scale factor at natural origin",
                    opt_double(gkd, GeoKeyId::ProjScaleAtCenter)?,
                    1.0,
                ),
                param("False easting", fe()?, 0.0),
                param("False northing", fn_()?, 0.0),
            ],
        ),
        17 => (
            "Equidistant Cylindrical",
            "Equidistant Cylindrical",
            vec![
                param(
                    "Latitude of 1st standard parallel",
                    py_or_f64(opt_double(gkd, GeoKeyId::ProjStdParallel1)?, lat_c()?),
                    0.0,
                ),
                param("Longitude of natural origin", lon_c()?, 0.0),
                param("False easting", fe()?, 0.0),
                param("False northing", fn_()?, 0.0),
            ],
        ),
        18 => (
            "Cassini-Soldner",
            "Cassini-Soldner",
            vec![
                param("Latitude of natural origin", lat0()?, 0.0),
                param("Longitude of natural origin", lon0()?, 0.0),
                param("False easting", fe()?, 0.0),
                param("False northing", fn_()?, 0.0),
            ],
        ),
        21 => (
            "Orthographic",
            "Orthographic",
            vec![
                param("Latitude of natural origin", lat_c()?, 0.0),
                param("Longitude of natural origin", lon_c()?, 0.0),
                param("False easting", fe()?, 0.0),
                param("False northing", fn_()?, 0.0),
            ],
        ),
        22 => (
            "American Polyconic",
            "American Polyconic",
            vec![
                param("Latitude of natural origin", lat0()?, 0.0),
                param("Longitude of natural origin", lon0()?, 0.0),
                param("False easting", fe()?, 0.0),
                param("False northing", fn_()?, 0.0),
            ],
        ),
        24 => (
            "Sinusoidal",
            "Sinusoidal",
            vec![
                param("Longitude of natural origin", lon_c()?, 0.0),
                param("False easting", fe()?, 0.0),
                param("False northing", fn_()?, 0.0),
            ],
        ),
        26 => (
            "New Zealand Map Grid",
            "New Zealand Map Grid",
            vec![
                param("Latitude of natural origin", lat0()?, 0.0),
                param("Longitude of natural origin", lon0()?, 0.0),
                param("False easting", fe()?, 0.0),
                param("False northing", fn_()?, 0.0),
            ],
        ),
        v => {
            return Err(Error::UnsupportedProjection(format!(
                "unsupported coordinate transformation type: {}",
                v
            )))
        }
    };

    Ok(json!({
        "name": name,
        "method": {"name": method_name},
        "parameters": parameters,
    }))
}

fn build_user_defined_projected_crs(gkd: &GeoKeyDirectory) -> Result<Crs, Error> {
    let base_crs = parse_geographic_crs(gkd)?;
    let conversion = build_conversion(gkd)?;
    let cs = projected_cs(gkd)?;
    let name = py_or_string(opt_ascii(gkd, GeoKeyId::PCSCitation)?, "User-defined");
    Ok(json!({
        "type": "ProjectedCRS",
        "$schema": PROJJSON_SCHEMA,
        "name": name,
        "base_crs": base_crs,
        "conversion": conversion,
        "coordinate_system": cs,
    }))
}

fn parse_projected_crs(gkd: &GeoKeyDirectory) -> Result<Crs, Error> {
    if let Some(code) = opt_short(gkd, GeoKeyId::ProjectedType)? {
        if code != USER_DEFINED {
            return Ok(epsg_reference("ProjectedCRS", code));
        }
    }
    build_user_defined_projected_crs(gkd)
}

pub fn resolve(gkd: &GeoKeyDirectory) -> Result<Crs, Error> {
    let model_type = gkd.get_short_key_value(GeoKeyId::GTModelType)?;
    match model_type {
        1 => parse_projected_crs(gkd),
        2 => parse_geographic_crs(gkd),
        v => Err(Error::UnsupportedProjection(format!(
            "unsupported GeoTIFF model type: {}",
            v
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_py_or_treats_zero_as_falsy() {
        assert_eq!(py_or_f64(Some(0.0), Some(5.0)), Some(5.0));
        assert_eq!(py_or_f64(Some(3.0), Some(5.0)), Some(3.0));
        assert_eq!(py_or_f64(None, Some(5.0)), Some(5.0));
        assert_eq!(py_or_f64(None, None), None);
    }

    #[test]
    fn test_epsg_reference_shape() {
        let crs = epsg_reference("ProjectedCRS", 3857);
        assert_eq!(crs["type"], "ProjectedCRS");
        assert_eq!(crs["id"]["authority"], "EPSG");
        assert_eq!(crs["id"]["code"], 3857);
    }

    #[test]
    fn test_linear_unit_us_survey_foot_has_conversion_factor() {
        let unit = linear_unit_json(&LinearUnit::UsSurveyFoot);
        assert_eq!(unit["name"], "US survey foot");
        assert!((unit["conversion_factor"].as_f64().unwrap() - 0.30480060960121924).abs() < 1e-15);
    }
}
