//! Spatial reference identifiers
//!
//! The engine does not reproject. A CRS is carried along with each raster
//! so outputs can be tagged and mismatched inputs rejected.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Spatial reference, identified by EPSG code or WKT
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CRS {
    epsg: Option<u32>,
    wkt: Option<String>,
}

impl CRS {
    pub fn from_epsg(code: u32) -> Self {
        Self {
            epsg: Some(code),
            wkt: None,
        }
    }

    pub fn from_wkt(wkt: impl Into<String>) -> Self {
        Self {
            epsg: None,
            wkt: Some(wkt.into()),
        }
    }

    /// SWEREF99 TM (EPSG:3006), the national grid the model is run in
    pub fn sweref99_tm() -> Self {
        Self::from_epsg(3006)
    }

    pub fn epsg(&self) -> Option<u32> {
        self.epsg
    }

    pub fn wkt(&self) -> Option<&str> {
        self.wkt.as_deref()
    }

    /// Whether two references name the same system
    pub fn is_equivalent(&self, other: &CRS) -> bool {
        match (self.epsg, other.epsg) {
            (Some(a), Some(b)) => a == b,
            _ => matches!((&self.wkt, &other.wkt), (Some(a), Some(b)) if a == b),
        }
    }

    pub fn identifier(&self) -> String {
        match (self.epsg, &self.wkt) {
            (Some(code), _) => format!("EPSG:{}", code),
            (None, Some(wkt)) => format!("WKT:{}", wkt.chars().take(50).collect::<String>()),
            (None, None) => "Unknown".to_string(),
        }
    }
}

impl fmt::Display for CRS {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.identifier())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_crs_epsg() {
        let crs = CRS::sweref99_tm();
        assert_eq!(crs.epsg(), Some(3006));
        assert_eq!(crs.to_string(), "EPSG:3006");
    }

    #[test]
    fn test_crs_equivalence() {
        assert!(CRS::from_epsg(3006).is_equivalent(&CRS::sweref99_tm()));
        assert!(!CRS::from_epsg(3006).is_equivalent(&CRS::from_epsg(4326)));
        assert!(!CRS::from_wkt("A").is_equivalent(&CRS::from_epsg(3006)));
    }
}
