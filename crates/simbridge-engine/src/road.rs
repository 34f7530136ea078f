//! Road geometry description handed to [`Engine::add_road`](crate::Engine::add_road).

use serde::{Deserialize, Serialize};
use simbridge_core::data::{Position, Sentinel};
use simbridge_core::types::{
    AsphaltTone, AsphaltType, LaneType, ParameterRange, RoadSideType, TrafficSide,
};

/// One geometric section, laid end to end along the road.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum RoadSection {
    Straight {
        length: f64,
    },
    Arc {
        length: f64,
        curvature: f64,
    },
    Spiral {
        length: f64,
        start_curvature: f64,
        end_curvature: f64,
    },
    CubicPolynomial {
        length: f64,
        a: f64,
        b: f64,
        c: f64,
        d: f64,
    },
    ParametricCubicPolynomial {
        length: f64,
        u: [f64; 4],
        v: [f64; 4],
        range: ParameterRange,
    },
}

impl RoadSection {
    #[must_use]
    pub const fn length(&self) -> f64 {
        match *self {
            Self::Straight { length }
            | Self::Arc { length, .. }
            | Self::Spiral { length, .. }
            | Self::CubicPolynomial { length, .. }
            | Self::ParametricCubicPolynomial { length, .. } => length,
        }
    }

    /// Curvature at arc-length `s` into the section.
    #[must_use]
    pub fn curvature_at(&self, s: f64) -> f64 {
        match *self {
            Self::Straight { .. } | Self::ParametricCubicPolynomial { .. } => 0.0,
            Self::Arc { curvature, .. } => curvature,
            Self::Spiral {
                length,
                start_curvature,
                end_curvature,
            } => {
                if length <= 0.0 {
                    start_curvature
                } else {
                    start_curvature + (end_curvature - start_curvature) * (s / length).clamp(0.0, 1.0)
                }
            }
            Self::CubicPolynomial { b, c, d, .. } => {
                // Curvature of y(s) = a + b s + c s^2 + d s^3.
                let dy = b + 2.0 * c * s + 3.0 * d * s * s;
                let ddy = 2.0 * c + 6.0 * d * s;
                ddy / (1.0 + dy * dy).powf(1.5)
            }
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LaneDescription {
    pub side: RoadSideType,
    pub width: f64,
    pub lane_type: LaneType,
    pub start_offset: f64,
    /// `f64::INFINITY` runs to the end of the road.
    pub end_offset: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ParkingSpaceDescription {
    pub length: f64,
    pub width: f64,
    pub yaw: f64,
    pub side: RoadSideType,
    pub side_offset: f64,
    pub offset: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SpeedLimit {
    pub value: f64,
    pub start_offset: f64,
    pub end_offset: f64,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct AsphaltSettings {
    pub asphalt_type: AsphaltType,
    pub tone: AsphaltTone,
    pub color: Option<[f64; 3]>,
    pub texture_scale: Option<f64>,
}

/// Everything the engine needs to build one road.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RoadDescription {
    pub position: Position,
    pub sections: Vec<RoadSection>,
    pub lanes: Vec<LaneDescription>,
    pub parking_spaces: Vec<ParkingSpaceDescription>,
    pub speed_limits: Vec<SpeedLimit>,
    pub traffic_side: TrafficSide,
    pub asphalt: AsphaltSettings,
}

impl Default for RoadDescription {
    fn default() -> Self {
        Self {
            position: Position::zeroed(),
            sections: Vec::new(),
            lanes: Vec::new(),
            parking_spaces: Vec::new(),
            speed_limits: Vec::new(),
            traffic_side: TrafficSide::default(),
            asphalt: AsphaltSettings::default(),
        }
    }
}

impl RoadDescription {
    /// Total length of all sections.
    #[must_use]
    pub fn length(&self) -> f64 {
        self.sections.iter().map(RoadSection::length).sum()
    }
}
