/// Unit tables used by the Geo Key Resolver (spec 4.E) when building a user-defined CRS: the
/// GeoTIFF angular/linear unit GeoKeys carry EPSG unit codes, which the PROJJSON axis descriptions
/// need translated to names (and, for US survey foot, a conversion factor).

/// GeogAngularUnitsGeoKey / GeogAngularUnitSizeGeoKey (EPSG units, §4.E "Angular unit").
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AngularUnit {
    Degree,
    Radian,
    Grad,
}

impl AngularUnit {
    /// `v` is the raw EPSG unit code from the GeoKeyDirectory; absent defaults to degree.
    pub fn from_epsg_code(v: Option<u16>) -> AngularUnit {
        match v {
            Some(9101) => AngularUnit::Radian,
            Some(9105) => AngularUnit::Grad,
            _ => AngularUnit::Degree,
        }
    }

    pub fn projjson_name(&self) -> &'static str {
        match self {
            AngularUnit::Degree => "degree",
            AngularUnit::Radian => "radian",
            AngularUnit::Grad => "grad",
        }
    }
}

/// ProjLinearUnitsGeoKey (EPSG units, §4.E "Linear unit"). US survey foot additionally carries a
/// conversion factor, so it isn't representable as a bare name the way the other two are.
#[derive(Debug, Clone, PartialEq)]
pub enum LinearUnit {
    Metre,
    Foot,
    UsSurveyFoot,
}

impl LinearUnit {
    pub const US_SURVEY_FOOT_CONVERSION_FACTOR: f64 = 0.30480060960121924;

    /// `v` is the raw EPSG unit code from the GeoKeyDirectory; absent defaults to metre.
    pub fn from_epsg_code(v: Option<u16>) -> LinearUnit {
        match v {
            Some(9002) => LinearUnit::Foot,
            Some(9003) => LinearUnit::UsSurveyFoot,
            _ => LinearUnit::Metre,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_angular_unit_defaults_to_degree() {
        assert_eq!(AngularUnit::from_epsg_code(None), AngularUnit::Degree);
        assert_eq!(AngularUnit::from_epsg_code(Some(9102)), AngularUnit::Degree);
        assert_eq!(AngularUnit::from_epsg_code(Some(9101)), AngularUnit::Radian);
    }

    #[test]
    fn test_linear_unit_defaults_to_metre() {
        assert_eq!(LinearUnit::from_epsg_code(None), LinearUnit::Metre);
        assert_eq!(LinearUnit::from_epsg_code(Some(9002)), LinearUnit::Foot);
        assert_eq!(
            LinearUnit::from_epsg_code(Some(9003)),
            LinearUnit::UsSurveyFoot
        );
    }
}
