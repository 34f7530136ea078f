//! Flattening of typed sensor outputs into a numeric state vector.

use simbridge_engine::io::{AirDetection, BrsDetection, CameraImage, LmsPoint, SensorOutput};

/// Values per AIR detection: range, azimuth, elevation, id, velocity, heading.
pub const AIR_VALUES: usize = 6;
/// Values per BRS detection: object id, left, right, bottom, top.
pub const BRS_VALUES: usize = 5;
/// Values per LMS point: x, y, z, curvature.
pub const LMS_VALUES: usize = 4;

/// Replace `state` (or `image` for cameras) with the content of `output`.
pub(crate) fn decode(output: SensorOutput, state: &mut Vec<f64>, image: &mut CameraImage) {
    state.clear();
    match output {
        SensorOutput::Air(detections) => {
            state.reserve(detections.len() * AIR_VALUES);
            for d in &detections {
                state.extend_from_slice(&[
                    d.range,
                    d.azimuth,
                    d.elevation,
                    f64::from(d.id),
                    d.velocity,
                    d.heading,
                ]);
            }
        }
        SensorOutput::Brs(detections) => {
            state.reserve(detections.len() * BRS_VALUES);
            for d in &detections {
                state.extend_from_slice(&[f64::from(d.object_id), d.left, d.right, d.bottom, d.top]);
            }
        }
        SensorOutput::Lms(lines) => {
            state.reserve(lines.iter().map(Vec::len).sum::<usize>() * LMS_VALUES);
            for p in lines.iter().flatten() {
                state.extend_from_slice(&[p.x, p.y, p.z, p.curvature]);
            }
        }
        SensorOutput::Camera(frame) => *image = frame,
    }
}

/// Read a flat AIR state back into detections.
#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
pub fn air_detections(state: &[f64]) -> Vec<AirDetection> {
    state
        .chunks_exact(AIR_VALUES)
        .map(|c| AirDetection {
            range: c[0],
            azimuth: c[1],
            elevation: c[2],
            id: c[3] as u32,
            velocity: c[4],
            heading: c[5],
        })
        .collect()
}

/// Read a flat BRS state back into detections.
#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
pub fn brs_detections(state: &[f64]) -> Vec<BrsDetection> {
    state
        .chunks_exact(BRS_VALUES)
        .map(|c| BrsDetection {
            object_id: c[0] as u32,
            left: c[1],
            right: c[2],
            bottom: c[3],
            top: c[4],
        })
        .collect()
}

/// Read a flat LMS state back into points. Line boundaries are not kept.
pub fn lms_points(state: &[f64]) -> Vec<LmsPoint> {
    state
        .chunks_exact(LMS_VALUES)
        .map(|c| LmsPoint {
            x: c[0],
            y: c[1],
            z: c[2],
            curvature: c[3],
        })
        .collect()
}
