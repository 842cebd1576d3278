//! CLI enum types for character set options.

use clap::ValueEnum;

use crate::ascii;

/// Glyph alphabet preset.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum CharacterSet {
    #[default]
    Aniso,
    Standard,
    Blocks,
    Minimal,
}

impl From<CharacterSet> for ascii::CharSet {
    fn from(c: CharacterSet) -> Self {
        match c {
            CharacterSet::Aniso => ascii::CharSet::Aniso,
            CharacterSet::Standard => ascii::CharSet::Standard,
            CharacterSet::Blocks => ascii::CharSet::Blocks,
            CharacterSet::Minimal => ascii::CharSet::Minimal,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_charset_to_ascii_charset() {
        assert_eq!(ascii::CharSet::from(CharacterSet::Aniso), ascii::CharSet::Aniso);
        assert_eq!(
            ascii::CharSet::from(CharacterSet::Blocks),
            ascii::CharSet::Blocks
        );
        assert_eq!(
            ascii::CharSet::from(CharacterSet::Minimal),
            ascii::CharSet::Minimal
        );
    }

    #[test]
    fn test_charset_parses_from_cli_name() {
        assert_eq!(
            CharacterSet::from_str("standard", true),
            Ok(CharacterSet::Standard)
        );
        assert!(CharacterSet::from_str("braille", true).is_err());
    }
}
