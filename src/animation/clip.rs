//! Keyframe tracks and their interpolation.

use glam::{Quat, Vec3};

use crate::asset::Transform;

/// How values between keyframes are computed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Interpolation {
    Step,
    Linear,
    /// Hermite spline; each keyframe stores in-tangent, value, out-tangent
    CubicSpline,
}

/// Keyframe values of one animated property.
#[derive(Debug, Clone, PartialEq)]
pub enum TrackValues {
    Translation(Vec<Vec3>),
    Rotation(Vec<Quat>),
    Scale(Vec<Vec3>),
}

/// One animated property of one node.
#[derive(Debug, Clone, PartialEq)]
pub struct Track {
    pub node: usize,
    pub interpolation: Interpolation,
    /// Keyframe times in seconds, ascending
    pub times: Vec<f32>,
    pub values: TrackValues,
}

/// A named group of tracks played together.
#[derive(Debug, Clone, PartialEq)]
pub struct AnimationClip {
    pub name: Option<String>,
    pub tracks: Vec<Track>,
    /// Latest keyframe time over all tracks
    pub duration: f32,
}

impl AnimationClip {
    pub fn new(name: Option<String>, tracks: Vec<Track>) -> Self {
        let duration = tracks
            .iter()
            .filter_map(|t| t.times.last().copied())
            .fold(0.0f32, f32::max);
        Self {
            name,
            tracks,
            duration,
        }
    }

    /// Write the pose at `time` into `locals`, indexed by node.
    pub fn apply(&self, time: f32, locals: &mut [Transform]) {
        for track in &self.tracks {
            if let Some(local) = locals.get_mut(track.node) {
                track.apply(time, local);
            }
        }
    }
}

/// Position of `time` within `times`: keyframe index and blend factor.
fn locate(times: &[f32], time: f32) -> (usize, f32, f32) {
    let last = times.len().saturating_sub(1);
    if last == 0 || time.is_nan() || time <= times[0] {
        return (0, 0.0, 0.0);
    }
    if time >= times[last] {
        return (last, 0.0, 0.0);
    }
    // First key strictly after `time`, kept in range for unordered input.
    let next = times.partition_point(|&t| t <= time).clamp(1, last);
    let i = next - 1;
    let dt = times[next] - times[i];
    let s = if dt > 0.0 {
        ((time - times[i]) / dt).clamp(0.0, 1.0)
    } else {
        0.0
    };
    (i, s, dt)
}

fn hermite<T>(p0: T, m0: T, p1: T, m1: T, s: f32, dt: f32) -> T
where
    T: std::ops::Mul<f32, Output = T> + std::ops::Add<Output = T>,
{
    let s2 = s * s;
    let s3 = s2 * s;
    p0 * (2.0 * s3 - 3.0 * s2 + 1.0)
        + m0 * ((s3 - 2.0 * s2 + s) * dt)
        + p1 * (-2.0 * s3 + 3.0 * s2)
        + m1 * ((s3 - s2) * dt)
}

fn sample_vec3(values: &[Vec3], interpolation: Interpolation, times: &[f32], time: f32) -> Option<Vec3> {
    let (i, s, dt) = locate(times, time);
    let at_end = i + 1 >= times.len() || s == 0.0;
    match interpolation {
        Interpolation::Step => values.get(i).copied(),
        Interpolation::Linear => {
            let a = *values.get(i)?;
            if at_end {
                return Some(a);
            }
            Some(a.lerp(*values.get(i + 1)?, s))
        }
        Interpolation::CubicSpline => {
            let p0 = *values.get(i * 3 + 1)?;
            if at_end {
                return Some(p0);
            }
            let m0 = *values.get(i * 3 + 2)?;
            let m1 = *values.get((i + 1) * 3)?;
            let p1 = *values.get((i + 1) * 3 + 1)?;
            Some(hermite(p0, m0, p1, m1, s, dt))
        }
    }
}

fn sample_quat(values: &[Quat], interpolation: Interpolation, times: &[f32], time: f32) -> Option<Quat> {
    let (i, s, dt) = locate(times, time);
    let at_end = i + 1 >= times.len() || s == 0.0;
    match interpolation {
        Interpolation::Step => values.get(i).copied(),
        Interpolation::Linear => {
            let a = *values.get(i)?;
            if at_end {
                return Some(a);
            }
            Some(a.slerp(*values.get(i + 1)?, s))
        }
        Interpolation::CubicSpline => {
            let p0 = *values.get(i * 3 + 1)?;
            if at_end {
                return Some(p0);
            }
            let m0 = *values.get(i * 3 + 2)?;
            let m1 = *values.get((i + 1) * 3)?;
            let p1 = *values.get((i + 1) * 3 + 1)?;
            Some(hermite(p0, m0, p1, m1, s, dt).normalize())
        }
    }
}

impl Track {
    /// Overwrite the animated property of `local` with its value at `time`.
    pub fn apply(&self, time: f32, local: &mut Transform) {
        if self.times.is_empty() {
            return;
        }
        match &self.values {
            TrackValues::Translation(v) => {
                if let Some(t) = sample_vec3(v, self.interpolation, &self.times, time) {
                    local.translation = t;
                }
            }
            TrackValues::Rotation(v) => {
                if let Some(r) = sample_quat(v, self.interpolation, &self.times, time) {
                    local.rotation = r;
                }
            }
            TrackValues::Scale(v) => {
                if let Some(s) = sample_vec3(v, self.interpolation, &self.times, time) {
                    local.scale = s;
                }
            }
        }
    }
}
