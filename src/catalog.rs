use std::fmt;
use std::str::FromStr;

use anyhow::anyhow;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CatalogOption {
    pub label: &'static str,
    pub value: &'static str,
}

const fn option(label: &'static str, value: &'static str) -> CatalogOption {
    CatalogOption { label, value }
}

pub const SCALE_OPTIONS: &[CatalogOption] = &[
    option("1/7 standard scale", "1/7 scale"),
    option("1/6 large scale", "1/6 scale"),
    option("1/4 giant scale", "1/4 scale"),
    option("Chibi / Nendoroid", "chibi nendoroid style"),
    option("1/12 action figure", "1/12 scale action figure"),
];

pub const STYLE_OPTIONS: &[CatalogOption] = &[
    option("Realistic (default)", "realistic style"),
    option("Anime", "anime style"),
    option("3D render", "3D render style"),
    option("Unpainted garage kit", "unpainted grey resin garage kit"),
    option("Cyberpunk", "cyberpunk style"),
];

pub const BASE_OPTIONS: &[CatalogOption] = &[
    option(
        "Round clear acrylic (no text)",
        "circular transparent acrylic base without any text",
    ),
    option("Wooden base", "wooden base"),
    option("Marble base", "marble base"),
    option("LED light-up base", "LED light-up base"),
    option("No base", "standing directly on desk"),
];

/// Resolves a user supplied selection against a catalog.
///
/// Accepts an exact catalog value, a label (case-insensitive) or a 1-based
/// index into the list.
pub fn resolve_option(options: &[CatalogOption], input: &str) -> Option<&'static str> {
    let trimmed = input.trim();
    if trimmed.is_empty() {
        return None;
    }

    if let Some(entry) = options.iter().find(|entry| entry.value == trimmed) {
        return Some(entry.value);
    }

    if let Some(entry) = options
        .iter()
        .find(|entry| entry.label.eq_ignore_ascii_case(trimmed))
    {
        return Some(entry.value);
    }

    trimmed
        .parse::<usize>()
        .ok()
        .filter(|index| *index >= 1)
        .and_then(|index| options.get(index - 1))
        .map(|entry| entry.value)
}

pub fn default_value(options: &[CatalogOption]) -> &'static str {
    options.first().map(|entry| entry.value).unwrap_or_default()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum AspectRatio {
    Square,
    Portrait,
    #[default]
    Landscape,
    Wide,
    Tall,
}

impl AspectRatio {
    pub const ALL: [AspectRatio; 5] = [
        AspectRatio::Square,
        AspectRatio::Portrait,
        AspectRatio::Landscape,
        AspectRatio::Wide,
        AspectRatio::Tall,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            AspectRatio::Square => "1:1",
            AspectRatio::Portrait => "3:4",
            AspectRatio::Landscape => "4:3",
            AspectRatio::Wide => "16:9",
            AspectRatio::Tall => "9:16",
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            AspectRatio::Square => "Square (1:1)",
            AspectRatio::Portrait => "Portrait (3:4)",
            AspectRatio::Landscape => "Landscape (4:3)",
            AspectRatio::Wide => "Wide (16:9)",
            AspectRatio::Tall => "Tall (9:16)",
        }
    }

    fn name(self) -> &'static str {
        match self {
            AspectRatio::Square => "square",
            AspectRatio::Portrait => "portrait",
            AspectRatio::Landscape => "landscape",
            AspectRatio::Wide => "wide",
            AspectRatio::Tall => "tall",
        }
    }
}

impl fmt::Display for AspectRatio {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AspectRatio {
    type Err = anyhow::Error;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let lowered = value.trim().to_ascii_lowercase();
        AspectRatio::ALL
            .into_iter()
            .find(|ratio| ratio.as_str() == lowered || ratio.name() == lowered)
            .ok_or_else(|| anyhow!("Unknown aspect ratio: {value}"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn resolves_values_labels_and_indexes() {
        assert_eq!(resolve_option(SCALE_OPTIONS, "1/6 scale"), Some("1/6 scale"));
        assert_eq!(resolve_option(BASE_OPTIONS, "marble BASE"), Some("marble base"));
        assert_eq!(resolve_option(STYLE_OPTIONS, "2"), Some("anime style"));
        assert_eq!(resolve_option(STYLE_OPTIONS, "0"), None);
        assert_eq!(resolve_option(STYLE_OPTIONS, "6"), None);
        assert_eq!(resolve_option(STYLE_OPTIONS, "  "), None);
    }

    #[test]
    fn defaults_are_first_entries() {
        assert_eq!(default_value(SCALE_OPTIONS), "1/7 scale");
        assert_eq!(default_value(STYLE_OPTIONS), "realistic style");
        assert_eq!(
            default_value(BASE_OPTIONS),
            "circular transparent acrylic base without any text"
        );
        assert_eq!(AspectRatio::default(), AspectRatio::Landscape);
    }

    #[test]
    fn parses_aspect_ratio_by_wire_value_or_name() {
        assert_eq!("16:9".parse::<AspectRatio>().unwrap(), AspectRatio::Wide);
        assert_eq!("Tall".parse::<AspectRatio>().unwrap(), AspectRatio::Tall);
        assert!("2:1".parse::<AspectRatio>().is_err());
        assert_eq!(AspectRatio::Portrait.to_string(), "3:4");
    }
}
