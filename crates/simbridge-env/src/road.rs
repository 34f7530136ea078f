//! Fluent builder for roads added with
//! [`Environment::add_road`](crate::Environment::add_road).

use simbridge_core::data::Position;
use simbridge_core::types::{
    AsphaltTone, AsphaltType, LaneType, ParameterRange, RoadSideType, TrafficSide,
};
use simbridge_engine::road::{
    LaneDescription, ParkingSpaceDescription, RoadDescription, RoadSection, SpeedLimit,
};

/// A road under construction. Sections are laid end to end in call order.
///
/// # Example
///
/// ```
/// use simbridge_core::types::RoadSideType;
/// use simbridge_env::Road;
///
/// let road = Road::new()
///     .straight(100.0)
///     .arc(30.0, 0.02)
///     .lane(RoadSideType::Right, 3.5)
///     .speed_limit(13.9);
/// assert!((road.length() - 130.0).abs() < 1e-9);
/// ```
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Road {
    description: RoadDescription,
}

impl Road {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Position of the road start.
    #[must_use]
    pub fn at(mut self, position: Position) -> Self {
        self.description.position = position;
        self
    }

    // -- Sections --

    #[must_use]
    pub fn straight(self, length: f64) -> Self {
        self.section(RoadSection::Straight { length })
    }

    /// Constant-curvature section.
    #[must_use]
    pub fn arc(self, length: f64, curvature: f64) -> Self {
        self.section(RoadSection::Arc { length, curvature })
    }

    /// Curvature changing linearly from `start_curvature` to `end_curvature`.
    #[must_use]
    pub fn spiral(self, length: f64, start_curvature: f64, end_curvature: f64) -> Self {
        self.section(RoadSection::Spiral {
            length,
            start_curvature,
            end_curvature,
        })
    }

    /// Lateral offset `a + b s + c s^2 + d s^3`.
    #[must_use]
    pub fn cubic_polynomial(self, length: f64, a: f64, b: f64, c: f64, d: f64) -> Self {
        self.section(RoadSection::CubicPolynomial { length, a, b, c, d })
    }

    /// `u` and `v` hold the `[a, b, c, d]` coefficients of each coordinate.
    #[must_use]
    pub fn parametric_cubic_polynomial(
        self,
        length: f64,
        u: [f64; 4],
        v: [f64; 4],
        range: ParameterRange,
    ) -> Self {
        self.section(RoadSection::ParametricCubicPolynomial {
            length,
            u,
            v,
            range,
        })
    }

    fn section(mut self, section: RoadSection) -> Self {
        self.description.sections.push(section);
        self
    }

    // -- Lanes and markings --

    /// Driving lane along the whole road.
    #[must_use]
    pub fn lane(self, side: RoadSideType, width: f64) -> Self {
        self.lane_between(side, width, LaneType::Driving, 0.0, f64::INFINITY)
    }

    #[must_use]
    pub fn lane_between(
        mut self,
        side: RoadSideType,
        width: f64,
        lane_type: LaneType,
        start_offset: f64,
        end_offset: f64,
    ) -> Self {
        self.description.lanes.push(LaneDescription {
            side,
            width,
            lane_type,
            start_offset,
            end_offset,
        });
        self
    }

    #[must_use]
    pub fn parking_space(mut self, space: ParkingSpaceDescription) -> Self {
        self.description.parking_spaces.push(space);
        self
    }

    /// Speed limit in m/s along the whole road.
    #[must_use]
    pub fn speed_limit(self, value: f64) -> Self {
        self.speed_limit_between(value, 0.0, f64::INFINITY)
    }

    #[must_use]
    pub fn speed_limit_between(mut self, value: f64, start_offset: f64, end_offset: f64) -> Self {
        self.description.speed_limits.push(SpeedLimit {
            value,
            start_offset,
            end_offset,
        });
        self
    }

    #[must_use]
    pub fn traffic_side(mut self, side: TrafficSide) -> Self {
        self.description.traffic_side = side;
        self
    }

    // -- Asphalt --

    #[must_use]
    pub fn asphalt_type(mut self, asphalt_type: AsphaltType) -> Self {
        self.description.asphalt.asphalt_type = asphalt_type;
        self
    }

    #[must_use]
    pub fn asphalt_tone(mut self, tone: AsphaltTone) -> Self {
        self.description.asphalt.tone = tone;
        self
    }

    /// RGB in `[0, 1]`.
    #[must_use]
    pub fn asphalt_color(mut self, r: f64, g: f64, b: f64) -> Self {
        self.description.asphalt.color = Some([r, g, b]);
        self
    }

    #[must_use]
    pub fn asphalt_texture_scale(mut self, scale: f64) -> Self {
        self.description.asphalt.texture_scale = Some(scale);
        self
    }

    // -- Queries --

    /// Total length of all sections in metres.
    #[must_use]
    pub fn length(&self) -> f64 {
        self.description.length()
    }

    #[must_use]
    pub const fn description(&self) -> &RoadDescription {
        &self.description
    }
}

impl From<Road> for RoadDescription {
    fn from(road: Road) -> Self {
        road.description
    }
}
