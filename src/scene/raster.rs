//! CPU triangle rasterizer with a depth buffer.
//!
//! Triangles are set up with edge functions over their screen bounding box
//! and filled with barycentric interpolation. Depth is NDC z in `[0, 1]`,
//! smaller is closer.

use glam::{Mat3, Mat4, Vec2, Vec3};

use super::camera::{CameraState, Viewport};
use super::compositor::MODEL_SCALE;
use crate::asset::{Material, ModelSurface, Primitive, Transform};
use crate::frame::{Frame, Rgb};

/// Barycentric weights below this still count as inside.
const EDGE_EPSILON: f32 = -1e-4;

/// A projected vertex: pixel position plus depth.
#[derive(Debug, Clone, Copy, PartialEq)]
struct ScreenVertex {
    x: f32,
    y: f32,
    z: f32,
}

pub struct Raster {
    color: Frame,
    depth: Vec<f32>,
}

impl Raster {
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            color: Frame::new(width, height),
            depth: vec![f32::INFINITY; width as usize * height as usize],
        }
    }

    pub fn frame(&self) -> &Frame {
        &self.color
    }

    pub fn resize(&mut self, width: u32, height: u32) {
        if self.color.width == width && self.color.height == height {
            return;
        }
        self.color.resize(width, height);
        self.depth = vec![f32::INFINITY; width as usize * height as usize];
    }

    /// Reset color to transparent black and depth to infinity.
    pub fn clear(&mut self) {
        self.color.clear(Rgb::BLACK, 0);
        self.depth.fill(f32::INFINITY);
    }

    fn to_screen(&self, clip: Mat4, p: Vec3) -> ScreenVertex {
        let c = clip * p.extend(1.0);
        let ndc = if c.w.abs() > f32::EPSILON { c.truncate() / c.w } else { c.truncate() };
        ScreenVertex {
            x: (ndc.x * 0.5 + 0.5) * self.color.width as f32,
            y: (0.5 - ndc.y * 0.5) * self.color.height as f32,
            z: ndc.z,
        }
    }

    /// Fill one triangle, calling `shade` with the barycentric weights of
    /// every covered pixel that passes the depth test.
    fn fill_triangle(&mut self, v: [ScreenVertex; 3], mut shade: impl FnMut(Vec3) -> Rgb) {
        let width = self.color.width as usize;
        let height = self.color.height as usize;
        let min_x = v[0].x.min(v[1].x).min(v[2].x).floor().max(0.0) as usize;
        let max_x = (v[0].x.max(v[1].x).max(v[2].x).ceil() + 1.0).min(width as f32) as usize;
        let min_y = v[0].y.min(v[1].y).min(v[2].y).floor().max(0.0) as usize;
        let max_y = (v[0].y.max(v[1].y).max(v[2].y).ceil() + 1.0).min(height as f32) as usize;
        if min_x >= max_x || min_y >= max_y {
            return;
        }

        let area = (v[1].y - v[2].y) * (v[0].x - v[2].x) + (v[2].x - v[1].x) * (v[0].y - v[2].y);
        if area.abs() < 1e-6 {
            return;
        }
        let inv_area = 1.0 / area;

        for y in min_y..max_y {
            let py = y as f32 + 0.5;
            for x in min_x..max_x {
                let px = x as f32 + 0.5;
                let b0 = ((v[1].y - v[2].y) * (px - v[2].x) + (v[2].x - v[1].x) * (py - v[2].y)) * inv_area;
                let b1 = ((v[2].y - v[0].y) * (px - v[2].x) + (v[0].x - v[2].x) * (py - v[2].y)) * inv_area;
                let b2 = 1.0 - b0 - b1;
                if b0 < EDGE_EPSILON || b1 < EDGE_EPSILON || b2 < EDGE_EPSILON {
                    continue;
                }
                let z = b0 * v[0].z + b1 * v[1].z + b2 * v[2].z;
                if !(0.0..=1.0).contains(&z) {
                    continue;
                }
                let idx = y * width + x;
                if z >= self.depth[idx] {
                    continue;
                }
                self.depth[idx] = z;
                let color = shade(Vec3::new(b0, b1, b2));
                self.color.put(x as u32, y as u32, color);
            }
        }
    }

    /// Draw `source` on a screen-facing quad of `size` world units centered
    /// at the origin.
    pub fn draw_quad(&mut self, source: &Frame, size: Vec2, camera: &CameraState, viewport: Viewport) {
        if source.is_empty() {
            return;
        }
        let clip = camera.view_projection(viewport);
        let half = size * 0.5;
        let corners = [
            Vec3::new(-half.x, half.y, 0.0),
            Vec3::new(half.x, half.y, 0.0),
            Vec3::new(half.x, -half.y, 0.0),
            Vec3::new(-half.x, -half.y, 0.0),
        ];
        let uvs = [Vec2::new(0.0, 0.0), Vec2::new(1.0, 0.0), Vec2::new(1.0, 1.0), Vec2::new(0.0, 1.0)];
        let screen = corners.map(|c| self.to_screen(clip, c));
        for [a, b, c] in [[0, 1, 2], [0, 2, 3]] {
            let (ua, ub, uc) = (uvs[a], uvs[b], uvs[c]);
            self.fill_triangle([screen[a], screen[b], screen[c]], |w| {
                let uv = ua * w.x + ub * w.y + uc * w.z;
                source.sample_nearest(uv.x, uv.y)
            });
        }
    }

    /// Draw every mesh node of `model` posed by `locals`.
    pub fn draw_model(&mut self, model: &ModelSurface, locals: &[Transform], camera: &CameraState, viewport: Viewport) {
        let group = Mat4::from_scale(Vec3::splat(MODEL_SCALE));
        let view = camera.view_matrix();
        let projection = camera.projection(viewport);
        let world = model.world_matrices(locals);

        for (index, node) in model.nodes.iter().enumerate() {
            let Some(mesh) = node.mesh.and_then(|m| model.meshes.get(m)) else {
                continue;
            };
            let skin = node.skin.and_then(|s| model.skins.get(s)).map(|skin| {
                skin.joints
                    .iter()
                    .enumerate()
                    .map(|(j, &joint)| {
                        let joint_world = world.get(joint).copied().unwrap_or(Mat4::IDENTITY);
                        let inverse_bind = skin.inverse_bind.get(j).copied().unwrap_or(Mat4::IDENTITY);
                        joint_world * inverse_bind
                    })
                    .collect::<Vec<Mat4>>()
            });
            let node_world = world.get(index).copied().unwrap_or(Mat4::IDENTITY);

            for primitive in &mesh.primitives {
                let (positions, normals) = match &skin {
                    Some(joints) if primitive.is_skinned() => skin_primitive(primitive, joints),
                    _ => (primitive.positions.clone(), primitive.normals.clone()),
                };
                // Skinned vertices are already in model space.
                let model_matrix = if skin.is_some() && primitive.is_skinned() {
                    group
                } else {
                    group * node_world
                };
                self.draw_primitive(
                    &positions,
                    &normals,
                    &primitive.indices,
                    node.material,
                    projection * view * model_matrix,
                    view * model_matrix,
                );
            }
        }
    }

    fn draw_primitive(
        &mut self,
        positions: &[Vec3],
        normals: &[Vec3],
        indices: &[u32],
        material: Material,
        clip: Mat4,
        model_view: Mat4,
    ) {
        let normal_matrix = Mat3::from_mat4(model_view).inverse().transpose();
        let screen: Vec<ScreenVertex> = positions.iter().map(|&p| self.to_screen(clip, p)).collect();
        let view_normals: Vec<Vec3> = normals
            .iter()
            .map(|&n| (normal_matrix * n).try_normalize().unwrap_or(Vec3::Z))
            .collect();

        for tri in indices.chunks_exact(3) {
            let [a, b, c] = [tri[0] as usize, tri[1] as usize, tri[2] as usize];
            let (Some(&sa), Some(&sb), Some(&sc)) = (screen.get(a), screen.get(b), screen.get(c)) else {
                continue;
            };
            match material {
                Material::Occluder => self.fill_triangle([sa, sb, sc], |_| Rgb::BLACK),
                Material::Normal => {
                    let n = |i: usize| view_normals.get(i).copied().unwrap_or(Vec3::Z);
                    let (na, nb, nc) = (n(a), n(b), n(c));
                    self.fill_triangle([sa, sb, sc], |w| {
                        normal_color(na * w.x + nb * w.y + nc * w.z)
                    });
                }
            }
        }
    }
}

/// View-space normal mapped from `[-1, 1]` to RGB.
pub fn normal_color(normal: Vec3) -> Rgb {
    let n = normal.try_normalize().unwrap_or(Vec3::Z) * 0.5 + Vec3::splat(0.5);
    let c = |v: f32| (v.clamp(0.0, 1.0) * 255.0).round() as u8;
    Rgb::new(c(n.x), c(n.y), c(n.z))
}

/// Linear blend skinning of positions and normals.
fn skin_primitive(primitive: &Primitive, joints: &[Mat4]) -> (Vec<Vec3>, Vec<Vec3>) {
    let mut positions = Vec::with_capacity(primitive.positions.len());
    let mut normals = Vec::with_capacity(primitive.positions.len());
    for (i, &p) in primitive.positions.iter().enumerate() {
        let (Some(joint), Some(weight)) = (primitive.joints.get(i), primitive.weights.get(i)) else {
            positions.push(p);
            normals.push(primitive.normals.get(i).copied().unwrap_or(Vec3::Z));
            continue;
        };
        let mut m = Mat4::ZERO;
        let mut total = 0.0;
        for k in 0..4 {
            if let Some(joint_matrix) = joints.get(joint[k] as usize) {
                m += *joint_matrix * weight[k];
                total += weight[k];
            }
        }
        if total <= f32::EPSILON {
            m = Mat4::IDENTITY;
        } else if (total - 1.0).abs() > 1e-3 {
            m = m * (1.0 / total);
        }
        positions.push(m.transform_point3(p));
        let n = primitive.normals.get(i).copied().unwrap_or(Vec3::Z);
        normals.push(m.transform_vector3(n).try_normalize().unwrap_or(Vec3::Z));
    }
    (positions, normals)
}
