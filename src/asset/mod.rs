//! Asset intake: classification, fetching and decoding.
//!
//! An [`AssetRef`] is classified into an [`AssetKind`] from its MIME
//! prefix or file suffix, fetched into a [`Payload`] and decoded into a
//! [`LoadedSurface`] by the [`AssetLoader`].

mod bitmap;
mod classify;
mod loader;
mod model;
mod source;
mod surface;
mod video;

pub use bitmap::ImageSurface;
pub use classify::{classify, classify_str, AssetKind};
pub use loader::{AssetLoader, Decode, FormatDecoder, LoadEvent, LoadOutcome, RequestId};
pub use model::{
    smooth_normals, Material, Mesh, ModelSurface, NodeFlags, Primitive, SceneNode, Skin, Transform,
    OCCLUDE_KEY,
};
pub use source::{decode_data_uri, AssetRef, Fetcher, Payload};
pub use surface::LoadedSurface;
pub use video::{VideoError, VideoInfo, VideoSurface};
