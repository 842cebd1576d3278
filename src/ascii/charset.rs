//! Character set definitions for the glyph mosaic.

/// Default alphabet of the mosaic, ordered from darkest to brightest.
pub const ANISO_CHARACTERS: &str = " *,    ./0!8#X~;$\\}%";

/// Standard ASCII density ramp (10 levels).
/// Characters ordered from darkest (space) to brightest (@).
pub const STANDARD_CHARSET: &[char] = &[' ', '.', ':', '-', '=', '+', '*', '#', '%', '@'];

/// Block character set (5 levels).
/// Uses Unicode block characters for higher perceived resolution.
pub const BLOCKS_CHARSET: &[char] = &[' ', '░', '▒', '▓', '█'];

/// Minimal character set (4 levels).
/// Clean, less noisy look.
pub const MINIMAL_CHARSET: &[char] = &[' ', '.', ':', '#'];

/// Named alphabet presets selectable from the command line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CharSet {
    /// The original tool's alphabet
    #[default]
    Aniso,
    /// Standard ASCII density ramp (10 levels)
    Standard,
    /// Block character set (5 levels) using Unicode blocks
    Blocks,
    /// Minimal character set (4 levels) for a clean look
    Minimal,
}

impl CharSet {
    /// The raw (not yet deduplicated) characters of this preset.
    pub fn characters(&self) -> String {
        match self {
            CharSet::Aniso => ANISO_CHARACTERS.to_string(),
            CharSet::Standard => STANDARD_CHARSET.iter().collect(),
            CharSet::Blocks => BLOCKS_CHARSET.iter().collect(),
            CharSet::Minimal => MINIMAL_CHARSET.iter().collect(),
        }
    }

    /// Get a human-readable name for the charset.
    pub fn name(&self) -> &'static str {
        match self {
            CharSet::Aniso => "aniso",
            CharSet::Standard => "standard",
            CharSet::Blocks => "blocks",
            CharSet::Minimal => "minimal",
        }
    }
}

/// A deduplicated, upper-cased glyph alphabet.
///
/// Order is preserved: the first occurrence of a glyph decides its ordinal,
/// and ordinal 0 is the darkest glyph.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Alphabet {
    glyphs: Vec<char>,
}

impl Alphabet {
    pub fn new(characters: &str) -> Self {
        let mut glyphs: Vec<char> = Vec::with_capacity(characters.len());
        for ch in characters.chars().flat_map(char::to_uppercase) {
            if !glyphs.contains(&ch) {
                glyphs.push(ch);
            }
        }
        Self { glyphs }
    }

    pub fn glyphs(&self) -> &[char] {
        &self.glyphs
    }

    pub fn len(&self) -> usize {
        self.glyphs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.glyphs.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<char> {
        self.glyphs.get(index).copied()
    }

    pub fn as_string(&self) -> String {
        self.glyphs.iter().collect()
    }
}

impl Default for Alphabet {
    fn default() -> Self {
        Self::new(ANISO_CHARACTERS)
    }
}
