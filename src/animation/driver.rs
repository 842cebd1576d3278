use std::time::Duration;

use log::debug;

use crate::asset::{ModelSurface, Transform};

/// Playback position of one clip.
#[derive(Debug, Clone, PartialEq)]
struct ClipPlayer {
    clip: usize,
    duration: f32,
    time: f32,
}

impl ClipPlayer {
    fn advance(&mut self, dt: f32) {
        self.time += dt;
        if self.duration > 0.0 {
            self.time %= self.duration;
        } else {
            self.time = 0.0;
        }
    }
}

/// Plays every clip of the bound model at once, looping.
#[derive(Debug, Default)]
pub struct AnimationDriver {
    players: Vec<ClipPlayer>,
}

impl AnimationDriver {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace all players with one per clip of `model`, starting at zero.
    pub fn bind(&mut self, model: &ModelSurface) {
        self.clear();
        self.players = model
            .clips
            .iter()
            .enumerate()
            .map(|(clip, c)| ClipPlayer {
                clip,
                duration: c.duration,
                time: 0.0,
            })
            .collect();
        debug!("Bound {} animation clips", self.players.len());
    }

    /// Drop every player.
    pub fn clear(&mut self) {
        self.players.clear();
    }

    pub fn player_count(&self) -> usize {
        self.players.len()
    }

    /// Current time of each player, in clip order.
    pub fn times(&self) -> Vec<f32> {
        self.players.iter().map(|p| p.time).collect()
    }

    pub fn advance(&mut self, delta: Duration) {
        let dt = delta.as_secs_f32();
        for player in &mut self.players {
            player.advance(dt);
        }
    }

    /// Local transforms of `model` at the current time. Clips are applied
    /// in order over the rest pose, so a later clip wins on a shared
    /// property.
    pub fn pose(&self, model: &ModelSurface) -> Vec<Transform> {
        let mut locals = model.rest_pose();
        for player in &self.players {
            if let Some(clip) = model.clips.get(player.clip) {
                clip.apply(player.time, &mut locals);
            }
        }
        locals
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::animation::{AnimationClip, Interpolation, Track, TrackValues};
    use crate::asset::{Material, NodeFlags, SceneNode};
    use glam::Vec3;

    fn model_with_clip(duration: f32) -> ModelSurface {
        let track = Track {
            node: 0,
            interpolation: Interpolation::Linear,
            times: vec![0.0, duration],
            values: TrackValues::Translation(vec![Vec3::ZERO, Vec3::new(duration, 0.0, 0.0)]),
        };
        ModelSurface {
            nodes: vec![SceneNode {
                name: None,
                rest: Transform::default(),
                children: vec![],
                mesh: None,
                skin: None,
                flags: NodeFlags::default(),
                material: Material::Normal,
            }],
            roots: vec![0],
            meshes: vec![],
            skins: vec![],
            clips: vec![AnimationClip::new(Some("slide".into()), vec![track])],
        }
    }

    #[test]
    fn test_advance_moves_pose() {
        let model = model_with_clip(2.0);
        let mut driver = AnimationDriver::new();
        driver.bind(&model);
        driver.advance(Duration::from_millis(500));
        let pose = driver.pose(&model);
        assert!((pose[0].translation.x - 0.5).abs() < 1e-4);
    }

    #[test]
    fn test_clips_loop() {
        let model = model_with_clip(2.0);
        let mut driver = AnimationDriver::new();
        driver.bind(&model);
        driver.advance(Duration::from_millis(2500));
        assert!((driver.times()[0] - 0.5).abs() < 1e-4);
    }

    #[test]
    fn test_rebind_discards_previous_players() {
        let mut driver = AnimationDriver::new();
        driver.bind(&model_with_clip(1.0));
        driver.advance(Duration::from_millis(300));
        let mut other = model_with_clip(1.0);
        other.clips.push(other.clips[0].clone());
        driver.bind(&other);
        assert_eq!(driver.player_count(), 2);
        assert_eq!(driver.times(), vec![0.0, 0.0]);
    }

    #[test]
    fn test_zero_delta_is_a_no_op() {
        let model = model_with_clip(1.0);
        let mut driver = AnimationDriver::new();
        driver.bind(&model);
        driver.advance(Duration::ZERO);
        assert_eq!(driver.pose(&model), model.rest_pose());
    }
}
