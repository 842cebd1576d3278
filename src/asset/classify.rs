//! Asset kind detection from a reference string.

use std::fmt;

use super::source::AssetRef;

/// What an asset decodes into.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AssetKind {
    /// glTF binary with an optional animation set
    Model,
    /// Streaming video, re-sampled every frame
    Video,
    /// Static bitmap
    Image,
}

impl AssetKind {
    pub fn name(&self) -> &'static str {
        match self {
            AssetKind::Model => "model",
            AssetKind::Video => "video",
            AssetKind::Image => "image",
        }
    }

    /// VIDEO and IMAGE are drawn as a flat textured quad.
    pub fn is_flat(&self) -> bool {
        matches!(self, AssetKind::Video | AssetKind::Image)
    }
}

impl fmt::Display for AssetKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// MIME prefixes checked before any suffix.
const MIME_PREFIXES: &[(&str, AssetKind)] = &[
    ("data:application/octet-stream;base64", AssetKind::Model),
    ("data:model/gltf-binary", AssetKind::Model),
    ("data:video", AssetKind::Video),
    ("data:image", AssetKind::Image),
];

const SUFFIXES: &[(&str, AssetKind)] = &[
    ("glb", AssetKind::Model),
    ("mp4", AssetKind::Video),
    ("webm", AssetKind::Video),
    ("mov", AssetKind::Video),
    ("jpg", AssetKind::Image),
    ("jpeg", AssetKind::Image),
    ("png", AssetKind::Image),
    ("webp", AssetKind::Image),
    ("avif", AssetKind::Image),
];

/// Resolve the kind of an asset. `None` means the asset is not supported.
pub fn classify(asset: &AssetRef) -> Option<AssetKind> {
    match asset {
        AssetRef::Url(url) => classify_str(url),
        AssetRef::Blob { name, .. } => classify_str(name),
    }
}

/// Resolve the kind of a URL, path, file name or data URI.
pub fn classify_str(reference: &str) -> Option<AssetKind> {
    let trimmed = reference.trim();
    if has_prefix_ignore_case(trimmed, "data:") {
        return MIME_PREFIXES
            .iter()
            .find(|(prefix, _)| has_prefix_ignore_case(trimmed, prefix))
            .map(|&(_, kind)| kind);
    }

    let suffix = suffix_of(trimmed)?.to_ascii_lowercase();
    SUFFIXES
        .iter()
        .find(|(ext, _)| *ext == suffix)
        .map(|&(_, kind)| kind)
}

fn has_prefix_ignore_case(s: &str, prefix: &str) -> bool {
    s.len() >= prefix.len()
        && s.is_char_boundary(prefix.len())
        && s[..prefix.len()].eq_ignore_ascii_case(prefix)
}

/// File extension of the last path segment, ignoring query and fragment.
fn suffix_of(reference: &str) -> Option<&str> {
    let path = reference
        .split_once('#')
        .map_or(reference, |(p, _)| p);
    let path = path.split_once('?').map_or(path, |(p, _)| p);
    let segment = path.rsplit(['/', '\\']).next().unwrap_or(path);
    match segment.rsplit_once('.') {
        Some((stem, ext)) if !stem.is_empty() && !ext.is_empty() => Some(ext),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_suffix_table() {
        assert_eq!(classify_str("model.glb"), Some(AssetKind::Model));
        assert_eq!(classify_str("clip.mp4"), Some(AssetKind::Video));
        assert_eq!(classify_str("clip.webm"), Some(AssetKind::Video));
        assert_eq!(classify_str("clip.mov"), Some(AssetKind::Video));
        assert_eq!(classify_str("photo.png"), Some(AssetKind::Image));
        assert_eq!(classify_str("photo.jpeg"), Some(AssetKind::Image));
        assert_eq!(classify_str("photo.avif"), Some(AssetKind::Image));
        assert_eq!(classify_str("notes.txt"), None);
    }

    #[test]
    fn test_suffix_is_case_insensitive() {
        assert_eq!(classify_str("MODEL.GLB"), Some(AssetKind::Model));
        assert_eq!(classify_str("Photo.JpG"), Some(AssetKind::Image));
    }

    #[test]
    fn test_query_and_fragment_ignored() {
        assert_eq!(
            classify_str("https://cdn.example.com/a/clip.mp4?token=abc.png#t=3"),
            Some(AssetKind::Video)
        );
        assert_eq!(classify_str("https://example.com/x.png?v=2"), Some(AssetKind::Image));
    }

    #[test]
    fn test_mime_prefix_wins() {
        assert_eq!(
            classify_str("data:application/octet-stream;base64,Z2xURg=="),
            Some(AssetKind::Model)
        );
        assert_eq!(classify_str("data:video/mp4;base64,AAAA"), Some(AssetKind::Video));
        assert_eq!(classify_str("data:image/png;base64,AAAA"), Some(AssetKind::Image));
        // A data URI is never classified by a suffix embedded in its payload.
        assert_eq!(classify_str("data:text/plain,hello.png"), None);
    }

    #[test]
    fn test_degenerate_inputs() {
        assert_eq!(classify_str(""), None);
        assert_eq!(classify_str(".png"), None);
        assert_eq!(classify_str("dir.png/file"), None);
        assert_eq!(classify_str("archive."), None);
        assert_eq!(classify_str("é"), None);
    }

    #[test]
    fn test_blob_uses_file_name() {
        let blob = AssetRef::blob("Dropped.WEBP", vec![0u8; 4]);
        assert_eq!(classify(&blob), Some(AssetKind::Image));
    }

    #[test]
    fn test_is_flat() {
        assert!(AssetKind::Image.is_flat());
        assert!(AssetKind::Video.is_flat());
        assert!(!AssetKind::Model.is_flat());
    }
}
