//! glTF binary decoding into a CPU scene graph.
//!
//! Only what the renderer needs is kept: node hierarchy with rest
//! transforms, triangle geometry with normals and skin weights, skins and
//! animation clips. Materials are not read from the file; every mesh node
//! gets [`Material::Normal`] unless it carries an `occlude` marker.

use glam::{Mat4, Quat, Vec3};
use gltf::animation::util::ReadOutputs;
use log::{debug, info};

use crate::animation::{AnimationClip, Interpolation, Track, TrackValues};
use crate::error::LoadError;

const DRACO_EXTENSION: &str = "KHR_draco_mesh_compression";

/// Marker key in node or mesh extras that turns a mesh into an occluder.
pub const OCCLUDE_KEY: &str = "occlude";

/// Translation, rotation and scale of a node relative to its parent.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Transform {
    pub translation: Vec3,
    pub rotation: Quat,
    pub scale: Vec3,
}

impl Default for Transform {
    fn default() -> Self {
        Self {
            translation: Vec3::ZERO,
            rotation: Quat::IDENTITY,
            scale: Vec3::ONE,
        }
    }
}

impl Transform {
    pub fn matrix(&self) -> Mat4 {
        Mat4::from_scale_rotation_translation(self.scale, self.rotation, self.translation)
    }
}

/// Flags resolved once at load time.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct NodeFlags {
    pub occlude: bool,
}

/// Shading applied to a mesh node.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Material {
    /// View-space normal mapped to RGB
    Normal,
    /// Opaque unlit black
    Occluder,
}

impl Material {
    pub fn for_flags(flags: NodeFlags) -> Self {
        if flags.occlude {
            Material::Occluder
        } else {
            Material::Normal
        }
    }
}

/// A triangle list.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Primitive {
    pub positions: Vec<Vec3>,
    pub normals: Vec<Vec3>,
    pub indices: Vec<u32>,
    /// Empty for rigid geometry
    pub joints: Vec<[u16; 4]>,
    pub weights: Vec<[f32; 4]>,
}

impl Primitive {
    pub fn is_skinned(&self) -> bool {
        !self.joints.is_empty() && self.joints.len() == self.weights.len()
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Mesh {
    pub primitives: Vec<Primitive>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Skin {
    /// Node index of every joint
    pub joints: Vec<usize>,
    pub inverse_bind: Vec<Mat4>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SceneNode {
    pub name: Option<String>,
    pub rest: Transform,
    pub children: Vec<usize>,
    pub mesh: Option<usize>,
    pub skin: Option<usize>,
    pub flags: NodeFlags,
    pub material: Material,
}

/// A decoded model: the group that holds the scene plus its clips.
#[derive(Debug, Clone, PartialEq)]
pub struct ModelSurface {
    pub nodes: Vec<SceneNode>,
    pub roots: Vec<usize>,
    pub meshes: Vec<Mesh>,
    pub skins: Vec<Skin>,
    pub clips: Vec<AnimationClip>,
}

impl ModelSurface {
    /// Rest-pose local transforms, one per node.
    pub fn rest_pose(&self) -> Vec<Transform> {
        self.nodes.iter().map(|n| n.rest).collect()
    }

    /// Model-space matrices for the given local transforms.
    pub fn world_matrices(&self, locals: &[Transform]) -> Vec<Mat4> {
        let mut world = vec![Mat4::IDENTITY; self.nodes.len()];
        let mut visited = vec![false; self.nodes.len()];
        let mut stack: Vec<(usize, Mat4)> = self.roots.iter().map(|&r| (r, Mat4::IDENTITY)).collect();
        while let Some((index, parent)) = stack.pop() {
            let Some(node) = self.nodes.get(index) else {
                continue;
            };
            // Each node is placed once, even in a malformed graph.
            if std::mem::replace(&mut visited[index], true) {
                continue;
            }
            let local = locals.get(index).unwrap_or(&node.rest).matrix();
            let m = parent * local;
            world[index] = m;
            stack.extend(node.children.iter().map(|&c| (c, m)));
        }
        world
    }

    /// Number of triangles over all meshes.
    pub fn triangle_count(&self) -> usize {
        self.meshes
            .iter()
            .flat_map(|m| m.primitives.iter())
            .map(|p| p.indices.len() / 3)
            .sum()
    }

    /// Decode a `.glb` (or embedded `.gltf`) file.
    pub fn decode(bytes: &[u8], label: &str) -> Result<Self, LoadError> {
        let fail = |reason: String| LoadError::decode("model", label, reason);

        let gltf = gltf::Gltf::from_slice(bytes).map_err(|e| fail(e.to_string()))?;
        if gltf.extensions_required().any(|e| e == DRACO_EXTENSION) {
            return Err(fail("Draco-compressed meshes are not supported".into()));
        }
        let document = gltf.document;
        let buffers = gltf::import_buffers(&document, None, gltf.blob)
            .map_err(|e| fail(e.to_string()))?;
        let meshes: Vec<Mesh> = document.meshes().map(|mesh| read_mesh(&mesh, &buffers)).collect();

        let mut nodes = Vec::with_capacity(document.nodes().len());
        for node in document.nodes() {
            let (t, r, s) = node.transform().decomposed();
            let flags = NodeFlags {
                occlude: has_occlude_marker(node.extras())
                    || node.mesh().is_some_and(|m| has_occlude_marker(m.extras())),
            };
            nodes.push(SceneNode {
                name: node.name().map(str::to_string),
                rest: Transform {
                    translation: Vec3::from(t),
                    rotation: Quat::from_array(r),
                    scale: Vec3::from(s),
                },
                children: node.children().map(|c| c.index()).collect(),
                mesh: node.mesh().map(|m| m.index()),
                skin: node.skin().map(|s| s.index()),
                flags,
                material: Material::for_flags(flags),
            });
        }

        let roots = match document.default_scene().or_else(|| document.scenes().next()) {
            Some(scene) => scene.nodes().map(|n| n.index()).collect(),
            None => orphan_nodes(&nodes),
        };
        check_hierarchy(&nodes, &roots).map_err(fail)?;

        let skins = document
            .skins()
            .map(|skin| {
                let joints: Vec<usize> = skin.joints().map(|j| j.index()).collect();
                let inverse_bind: Vec<Mat4> = skin
                    .reader(|b| buffer_data(&buffers, b))
                    .read_inverse_bind_matrices()
                    .map(|m| m.map(|c| Mat4::from_cols_array_2d(&c)).collect())
                    .unwrap_or_else(|| vec![Mat4::IDENTITY; joints.len()]);
                Skin {
                    joints,
                    inverse_bind,
                }
            })
            .collect();

        let clips = document
            .animations()
            .map(|anim| read_clip(&anim, &buffers))
            .collect::<Result<Vec<_>, _>>()
            .map_err(fail)?;

        let surface = ModelSurface {
            nodes,
            roots,
            meshes,
            skins,
            clips,
        };
        info!(
            "Decoded model {}: {} nodes, {} triangles, {} clips",
            label,
            surface.nodes.len(),
            surface.triangle_count(),
            surface.clips.len()
        );
        Ok(surface)
    }
}

/// Every node reachable from `roots` must be reached exactly once.
fn check_hierarchy(nodes: &[SceneNode], roots: &[usize]) -> Result<(), String> {
    let mut seen = vec![false; nodes.len()];
    let mut stack = roots.to_vec();
    while let Some(index) = stack.pop() {
        let Some(node) = nodes.get(index) else {
            return Err(format!("node {} does not exist", index));
        };
        if std::mem::replace(&mut seen[index], true) {
            return Err(format!("node hierarchy contains a cycle at node {}", index));
        }
        stack.extend(&node.children);
    }
    Ok(())
}

fn orphan_nodes(nodes: &[SceneNode]) -> Vec<usize> {
    let mut is_child = vec![false; nodes.len()];
    for node in nodes {
        for &c in &node.children {
            if let Some(flag) = is_child.get_mut(c) {
                *flag = true;
            }
        }
    }
    (0..nodes.len()).filter(|&i| !is_child[i]).collect()
}

/// True if the extras object has a key equal to `occlude` ignoring case.
fn has_occlude_marker(extras: &gltf::json::Extras) -> bool {
    let Some(raw) = extras.as_ref() else {
        return false;
    };
    match serde_json::from_str::<serde_json::Map<String, serde_json::Value>>(raw.get()) {
        Ok(map) => map.keys().any(|k| k.eq_ignore_ascii_case(OCCLUDE_KEY)),
        Err(_) => false,
    }
}

fn buffer_data<'s>(buffers: &'s [gltf::buffer::Data], buffer: gltf::Buffer<'_>) -> Option<&'s [u8]> {
    buffers.get(buffer.index()).map(|d| d.0.as_slice())
}

fn read_mesh(mesh: &gltf::Mesh<'_>, buffers: &[gltf::buffer::Data]) -> Mesh {
    let mut primitives = Vec::new();
    for primitive in mesh.primitives() {
        if primitive.mode() != gltf::mesh::Mode::Triangles {
            debug!("Skipping non-triangle primitive ({:?})", primitive.mode());
            continue;
        }
        let reader = primitive.reader(|b| buffer_data(buffers, b));
        let Some(positions) = reader.read_positions() else {
            continue;
        };
        let positions: Vec<Vec3> = positions.map(Vec3::from).collect();
        let indices: Vec<u32> = match reader.read_indices() {
            Some(indices) => indices.into_u32().collect(),
            None => (0..positions.len() as u32).collect(),
        };
        let normals = match reader.read_normals() {
            Some(normals) => normals.map(Vec3::from).collect(),
            None => smooth_normals(&positions, &indices),
        };
        let joints = reader
            .read_joints(0)
            .map(|j| j.into_u16().collect())
            .unwrap_or_default();
        let weights = reader
            .read_weights(0)
            .map(|w| w.into_f32().collect())
            .unwrap_or_default();
        primitives.push(Primitive {
            positions,
            normals,
            indices,
            joints,
            weights,
        });
    }
    Mesh { primitives }
}

/// Area-weighted vertex normals for geometry that ships without them.
pub fn smooth_normals(positions: &[Vec3], indices: &[u32]) -> Vec<Vec3> {
    let mut normals = vec![Vec3::ZERO; positions.len()];
    for tri in indices.chunks_exact(3) {
        let [a, b, c] = [tri[0] as usize, tri[1] as usize, tri[2] as usize];
        if a >= positions.len() || b >= positions.len() || c >= positions.len() {
            continue;
        }
        let n = (positions[b] - positions[a]).cross(positions[c] - positions[a]);
        normals[a] += n;
        normals[b] += n;
        normals[c] += n;
    }
    normals
        .into_iter()
        .map(|n| n.try_normalize().unwrap_or(Vec3::Z))
        .collect()
}

/// Keyframe times must be finite and strictly increasing.
fn valid_times(times: &[f32]) -> bool {
    times.iter().all(|t| t.is_finite()) && times.windows(2).all(|w| w[0] < w[1])
}

fn read_clip(anim: &gltf::Animation<'_>, buffers: &[gltf::buffer::Data]) -> Result<AnimationClip, String> {
    let mut tracks = Vec::new();
    for channel in anim.channels() {
        let reader = channel.reader(|b| buffer_data(buffers, b));
        let Some(inputs) = reader.read_inputs() else {
            continue;
        };
        let times: Vec<f32> = inputs.collect();
        if !valid_times(&times) {
            return Err(format!(
                "animation {} has non-finite or unordered keyframe times",
                anim.name().unwrap_or("(unnamed)")
            ));
        }
        let values = match reader.read_outputs() {
            Some(ReadOutputs::Translations(v)) => TrackValues::Translation(v.map(Vec3::from).collect()),
            Some(ReadOutputs::Rotations(v)) => {
                TrackValues::Rotation(v.into_f32().map(Quat::from_array).collect())
            }
            Some(ReadOutputs::Scales(v)) => TrackValues::Scale(v.map(Vec3::from).collect()),
            // Morph targets are not animated.
            Some(ReadOutputs::MorphTargetWeights(_)) | None => continue,
        };
        let interpolation = match channel.sampler().interpolation() {
            gltf::animation::Interpolation::Step => Interpolation::Step,
            gltf::animation::Interpolation::Linear => Interpolation::Linear,
            gltf::animation::Interpolation::CubicSpline => Interpolation::CubicSpline,
        };
        tracks.push(Track {
            node: channel.target().node().index(),
            interpolation,
            times,
            values,
        });
    }
    Ok(AnimationClip::new(anim.name().map(str::to_string), tracks))
}
