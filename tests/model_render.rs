//! End-to-end tests for glTF models.
//!
//! A minimal GLB (one triangle, an occluder node and a translation clip) is
//! assembled in memory and pushed through decode, animation and rendering.

use std::sync::Arc;
use std::time::Duration;

use aniso_ascii::animation::AnimationDriver;
use aniso_ascii::asset::{AssetKind, AssetRef, FormatDecoder, LoadEvent, Material, ModelSurface};
use aniso_ascii::scene::{FramingMode, Viewport};
use aniso_ascii::{EffectSettings, LoadError, Renderer};
use tokio::runtime::Handle;

const GLTF_JSON: &str = r#"{
  "asset": {"version": "2.0"},
  "scene": 0,
  "scenes": [{"nodes": [0, 1]}],
  "nodes": [
    {"name": "body", "mesh": 0},
    {"name": "mask", "mesh": 0, "translation": [0, 0, -1], "extras": {"occlude": true}}
  ],
  "meshes": [{"primitives": [{"attributes": {"POSITION": 0}, "indices": 1}]}],
  "animations": [{
    "name": "bob",
    "channels": [{"sampler": 0, "target": {"node": 0, "path": "translation"}}],
    "samplers": [{"input": 2, "output": 3, "interpolation": "LINEAR"}]
  }],
  "buffers": [{"byteLength": 76}],
  "bufferViews": [
    {"buffer": 0, "byteOffset": 0, "byteLength": 36},
    {"buffer": 0, "byteOffset": 36, "byteLength": 6},
    {"buffer": 0, "byteOffset": 44, "byteLength": 8},
    {"buffer": 0, "byteOffset": 52, "byteLength": 24}
  ],
  "accessors": [
    {"bufferView": 0, "componentType": 5126, "count": 3, "type": "VEC3", "min": [0, 0, 0], "max": [1, 1, 0]},
    {"bufferView": 1, "componentType": 5123, "count": 3, "type": "SCALAR"},
    {"bufferView": 2, "componentType": 5126, "count": 2, "type": "SCALAR", "min": [0], "max": [1]},
    {"bufferView": 3, "componentType": 5126, "count": 2, "type": "VEC3"}
  ]
}"#;

fn binary_chunk(times: [f32; 2]) -> Vec<u8> {
    let mut bin = Vec::with_capacity(76);
    for v in [0.0f32, 0.0, 0.0, 1.0, 0.0, 0.0, 0.0, 1.0, 0.0] {
        bin.extend_from_slice(&v.to_le_bytes());
    }
    for i in [0u16, 1, 2] {
        bin.extend_from_slice(&i.to_le_bytes());
    }
    bin.extend_from_slice(&[0, 0]);
    for t in times {
        bin.extend_from_slice(&t.to_le_bytes());
    }
    for v in [0.0f32, 0.0, 0.0, 0.0, 0.5, 0.0] {
        bin.extend_from_slice(&v.to_le_bytes());
    }
    bin
}

fn glb() -> Vec<u8> {
    glb_from(GLTF_JSON, [0.0, 1.0])
}

fn glb_from(gltf_json: &str, times: [f32; 2]) -> Vec<u8> {
    let mut json = gltf_json.as_bytes().to_vec();
    while json.len() % 4 != 0 {
        json.push(b' ');
    }
    let bin = binary_chunk(times);
    let total = 12 + 8 + json.len() + 8 + bin.len();

    let mut out = Vec::with_capacity(total);
    out.extend_from_slice(b"glTF");
    out.extend_from_slice(&2u32.to_le_bytes());
    out.extend_from_slice(&(total as u32).to_le_bytes());
    out.extend_from_slice(&(json.len() as u32).to_le_bytes());
    out.extend_from_slice(b"JSON");
    out.extend_from_slice(&json);
    out.extend_from_slice(&(bin.len() as u32).to_le_bytes());
    out.extend_from_slice(b"BIN\0");
    out.extend_from_slice(&bin);
    out
}

// ==================== Decode ====================

#[test]
fn test_decode_minimal_glb() {
    let model = ModelSurface::decode(&glb(), "tri.glb").unwrap();
    assert_eq!(model.nodes.len(), 2);
    assert_eq!(model.roots, vec![0, 1]);
    assert_eq!(model.triangle_count(), 1);
    assert_eq!(model.clips.len(), 1);

    let body = &model.nodes[0];
    assert_eq!(body.name.as_deref(), Some("body"));
    assert!(!body.flags.occlude);
    assert_eq!(body.material, Material::Normal);

    let mask = &model.nodes[1];
    assert!(mask.flags.occlude);
    assert_eq!(mask.material, Material::Occluder);

    // Missing normals are generated.
    let primitive = &model.meshes[0].primitives[0];
    assert_eq!(primitive.normals.len(), primitive.positions.len());
}

#[test]
fn test_truncated_glb_is_a_decode_failure() {
    let bytes = glb();
    let err = ModelSurface::decode(&bytes[..bytes.len() / 2], "tri.glb").unwrap_err();
    assert!(matches!(err, LoadError::DecodeFailure { .. }));
}

#[test]
fn test_cyclic_hierarchy_is_a_decode_failure() {
    let json = GLTF_JSON.replace(
        r#"{"name": "body", "mesh": 0}"#,
        r#"{"name": "body", "mesh": 0, "children": [0]}"#,
    );
    assert_ne!(json, GLTF_JSON);
    let err = ModelSurface::decode(&glb_from(&json, [0.0, 1.0]), "loop.glb").unwrap_err();
    assert!(matches!(err, LoadError::DecodeFailure { kind: "model", .. }));
    assert!(err.to_string().contains("cycle"));
}

#[test]
fn test_nan_keyframe_time_is_a_decode_failure() {
    let err = ModelSurface::decode(&glb_from(GLTF_JSON, [f32::NAN, 1.0]), "nan.glb").unwrap_err();
    assert!(matches!(err, LoadError::DecodeFailure { .. }));

    let err = ModelSurface::decode(&glb_from(GLTF_JSON, [1.0, 0.5]), "backwards.glb").unwrap_err();
    assert!(matches!(err, LoadError::DecodeFailure { .. }));
}

#[tokio::test]
async fn test_malformed_model_keeps_previous_surface() {
    let mut r = Renderer::with_decoder(Handle::current(), Viewport::new(32, 32), Arc::new(FormatDecoder)).unwrap();
    let settings = EffectSettings::default();
    r.load(AssetRef::blob("tri.glb", glb()));
    r.settle(&settings).await;
    assert_eq!(r.surface_kind(), Some(AssetKind::Model));

    r.load(AssetRef::blob("nan.glb", glb_from(GLTF_JSON, [f32::NAN, 1.0])));
    r.settle(&settings).await;
    r.tick(&settings, Duration::from_millis(500));
    assert_eq!(r.surface_kind(), Some(AssetKind::Model));
    assert!(r
        .drain_events()
        .iter()
        .any(|e| matches!(e, LoadEvent::Failed { id: Some(_), .. })));
}

// ==================== Animation ====================

#[test]
fn test_clip_moves_the_body() {
    let model = ModelSurface::decode(&glb(), "tri.glb").unwrap();
    let mut driver = AnimationDriver::new();
    driver.bind(&model);
    assert_eq!(driver.player_count(), 1);

    driver.advance(Duration::from_millis(500));
    let pose = driver.pose(&model);
    assert!((pose[0].translation.y - 0.25).abs() < 1e-4);
    // Untouched nodes keep their rest transform.
    assert_eq!(pose[1], model.nodes[1].rest);
}

// ==================== Render ====================

#[tokio::test]
async fn test_model_renders_spatially() {
    let mut r = Renderer::with_decoder(Handle::current(), Viewport::new(64, 48), Arc::new(FormatDecoder)).unwrap();
    let settings = EffectSettings::default();
    r.load(AssetRef::blob("tri.glb", glb()));
    r.settle(&settings).await;
    assert_eq!(r.surface_kind(), Some(AssetKind::Model));

    r.tick(&settings, Duration::from_millis(16));
    assert_eq!(r.compositor().mode(), Some(FramingMode::Spatial));
    let grid = r.last_grid().unwrap();
    assert!(grid.cells.iter().any(|c| c.index > 0));
    // The triangle does not reach every corner of the view.
    assert!(grid.cells.iter().any(|c| c.index == 0));
}
