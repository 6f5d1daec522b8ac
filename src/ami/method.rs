//! Closed set of overlap-weight algorithms, selected by method name.

use crate::types::{Error, Result};

/// How per-face overlap weights are computed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AmiMethod {
    /// Exact projected polygon overlap area per candidate pair.
    FaceAreaWeight,
    /// Whole source face weight assigned to the target face with the
    /// nearest centre.
    MapNearest,
}

impl AmiMethod {
    /// Look up a method by its configuration name.
    pub fn from_name(name: &str) -> Result<Self> {
        match name {
            "faceAreaWeight" => Ok(Self::FaceAreaWeight),
            "mapNearest" => Ok(Self::MapNearest),
            _ => Err(Error::UnknownMethod(name.to_string())),
        }
    }

    /// The configuration name of this method.
    pub fn name(&self) -> &'static str {
        match self {
            Self::FaceAreaWeight => "faceAreaWeight",
            Self::MapNearest => "mapNearest",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_name_round_trip() {
        for m in [AmiMethod::FaceAreaWeight, AmiMethod::MapNearest] {
            assert_eq!(AmiMethod::from_name(m.name()).unwrap(), m);
        }
    }

    #[test]
    fn test_unknown_name() {
        let err = AmiMethod::from_name("sphereProjection").unwrap_err();
        assert!(matches!(err, Error::UnknownMethod(_)));
    }
}
