use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Tailwind screen prefixes and their min-width in pixels.
const SCREENS: &[(&str, u32)] = &[
    ("sm", 640),
    ("md", 768),
    ("lg", 1024),
    ("xl", 1280),
    ("2xl", 1536),
];

/// Breakpoint-name table (`{ name = pixelWidth }`) supplied by the host.
///
/// A responsive class prefix belongs to the breakpoint whose width equals the
/// prefix's min-width. Prefixes without an exact match are not interpreted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct BreakpointTable {
    widths: BTreeMap<String, u32>,
}

impl Default for BreakpointTable {
    fn default() -> Self {
        Self::from_pairs([("mobile", 640), ("tablet", 768), ("desktop", 1024)])
    }
}

impl BreakpointTable {
    pub fn from_pairs<I, S>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (S, u32)>,
        S: Into<String>,
    {
        Self {
            widths: pairs
                .into_iter()
                .map(|(name, width)| (name.into(), width))
                .collect(),
        }
    }

    pub fn insert(&mut self, name: impl Into<String>, width: u32) {
        self.widths.insert(name.into(), width);
    }

    pub fn width_of(&self, name: &str) -> Option<u32> {
        self.widths.get(name).copied()
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.widths.keys().map(String::as_str)
    }

    pub fn is_empty(&self) -> bool {
        self.widths.is_empty()
    }

    /// First breakpoint (by name) configured at exactly `width` pixels.
    pub fn name_for_width(&self, width: u32) -> Option<&str> {
        self.widths
            .iter()
            .find(|(_, w)| **w == width)
            .map(|(name, _)| name.as_str())
    }

    /// Maps a class variant prefix (`md`, `min-[900px]`) to a breakpoint name.
    pub fn resolve_prefix(&self, prefix: &str) -> Option<&str> {
        let width = SCREENS
            .iter()
            .find(|(screen, _)| *screen == prefix)
            .map(|(_, w)| *w)
            .or_else(|| parse_min_width_prefix(prefix))?;
        self.name_for_width(width)
    }

    /// The class prefix that [`BreakpointTable::resolve_prefix`] maps back to `name`.
    pub fn prefix_for(&self, name: &str) -> Option<String> {
        let width = self.width_of(name)?;
        // A prefix only round-trips if this name is the one chosen for its width.
        if self.name_for_width(width) != Some(name) {
            return None;
        }
        let prefix = SCREENS
            .iter()
            .find(|(_, w)| *w == width)
            .map(|(screen, _)| screen.to_string())
            .unwrap_or_else(|| format!("min-[{width}px]"));
        Some(prefix)
    }
}

fn parse_min_width_prefix(prefix: &str) -> Option<u32> {
    let inner = prefix.strip_prefix("min-[")?.strip_suffix(']')?;
    inner.strip_suffix("px")?.trim().parse().ok()
}
