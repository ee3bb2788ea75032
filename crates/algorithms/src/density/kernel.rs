//! Kernel shapes for density estimation

use std::f64::consts::PI;
use std::str::FromStr;

use culexmap_core::Error;
use serde::{Deserialize, Serialize};

/// Kernel profile. Numeric codes follow the usual heatmap tool ordering:
/// quartic 0, triangular 1, uniform 2, triweight 3, epanechnikov 4.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum KernelShape {
    Quartic,
    Triangular,
    Uniform,
    #[default]
    Triweight,
    Epanechnikov,
}

impl KernelShape {
    pub fn from_code(code: u8) -> Option<Self> {
        match code {
            0 => Some(Self::Quartic),
            1 => Some(Self::Triangular),
            2 => Some(Self::Uniform),
            3 => Some(Self::Triweight),
            4 => Some(Self::Epanechnikov),
            _ => None,
        }
    }
}

impl FromStr for KernelShape {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Error> {
        match s.to_lowercase().as_str() {
            "quartic" => Ok(Self::Quartic),
            "triangular" => Ok(Self::Triangular),
            "uniform" => Ok(Self::Uniform),
            "triweight" => Ok(Self::Triweight),
            "epanechnikov" => Ok(Self::Epanechnikov),
            other => other
                .parse::<u8>()
                .ok()
                .and_then(Self::from_code)
                .ok_or_else(|| Error::InvalidParameter {
                    name: "kernel",
                    value: s.to_string(),
                    reason: "unknown kernel shape".into(),
                }),
        }
    }
}

/// Whether kernel values are raw profile heights or normalized densities
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OutputValues {
    /// Profile height in `[0, 1]` at distance 0
    #[default]
    Raw,
    /// Scaled so one point integrates to unit mass over the disc
    Scaled,
}

impl FromStr for OutputValues {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Error> {
        match s.to_lowercase().as_str() {
            "raw" | "0" => Ok(Self::Raw),
            "scaled" | "densities" | "1" => Ok(Self::Scaled),
            _ => Err(Error::InvalidParameter {
                name: "output",
                value: s.to_string(),
                reason: "expected raw or scaled".into(),
            }),
        }
    }
}

/// Kernel value of one point at `distance`, for search radius `bandwidth`.
///
/// Zero outside the radius. `decay` only shapes the triangular kernel:
/// 0 is a plain cone, 1 is flat, negative values overshoot to below zero
/// at the rim.
pub fn kernel_value(shape: KernelShape, output: OutputValues, distance: f64, bandwidth: f64, decay: f64) -> f64 {
    if distance > bandwidth || bandwidth <= 0.0 {
        return 0.0;
    }
    let u = distance / bandwidth;
    let b2 = bandwidth * bandwidth;
    let raw = output == OutputValues::Raw;

    match shape {
        KernelShape::Uniform => {
            if raw {
                1.0
            } else {
                (2.0 / (PI * bandwidth)) * (0.5 / bandwidth)
            }
        }
        KernelShape::Quartic => {
            let profile = (1.0 - u * u).powi(2);
            if raw {
                profile
            } else {
                116.0 / (5.0 * PI * b2) * (15.0 / 16.0) * profile
            }
        }
        KernelShape::Triweight => {
            let profile = (1.0 - u * u).powi(3);
            if raw {
                profile
            } else {
                128.0 / (35.0 * PI * b2) * (35.0 / 32.0) * profile
            }
        }
        KernelShape::Epanechnikov => {
            let profile = 1.0 - u * u;
            if raw {
                profile
            } else {
                8.0 / (3.0 * PI * b2) * (3.0 / 4.0) * profile
            }
        }
        KernelShape::Triangular => {
            let profile = 1.0 - (1.0 - decay) * u;
            if raw || decay < 0.0 {
                profile
            } else {
                3.0 / ((1.0 + 2.0 * decay) * PI * b2) * profile
            }
        }
    }
}
