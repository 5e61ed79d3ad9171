use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// A length normalized to a single unit system.
///
/// Absolute units collapse to CSS pixels; percentages and `auto` have no pixel
/// equivalent and keep their own variant.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "unit", content = "value", rename_all = "snake_case")]
pub enum Length {
    Px(f64),
    Percent(f64),
    Auto,
}

impl Length {
    /// Parses a single CSS length token. Returns `None` for units that cannot be
    /// normalized (`vw`, `calc(...)`, ...).
    pub fn parse(raw: &str) -> Option<Length> {
        let value = raw.trim().to_ascii_lowercase();
        if value.is_empty() {
            return None;
        }
        if value == "auto" {
            return Some(Length::Auto);
        }
        if let Some(pct) = value.strip_suffix('%') {
            return pct.trim().parse::<f64>().ok().filter(|v| v.is_finite()).map(Length::Percent);
        }
        let (number, scale) = if let Some(n) = value.strip_suffix("px") {
            (n, 1.0)
        } else if let Some(n) = value.strip_suffix("rem") {
            (n, 16.0)
        } else if let Some(n) = value.strip_suffix("em") {
            (n, 16.0)
        } else if let Some(n) = value.strip_suffix("pt") {
            (n, 4.0 / 3.0)
        } else {
            // Unitless lengths are only valid for zero.
            let parsed = value.parse::<f64>().ok()?;
            return (parsed == 0.0).then_some(Length::Px(0.0));
        };
        let parsed = number.trim().parse::<f64>().ok()?;
        if !parsed.is_finite() {
            return None;
        }
        Some(Length::Px(round3(parsed * scale)))
    }

    pub fn to_css(&self) -> String {
        match self {
            Length::Px(v) => format!("{}px", format_number(*v)),
            Length::Percent(v) => format!("{}%", format_number(*v)),
            Length::Auto => "auto".to_string(),
        }
    }

    pub fn negated(self) -> Length {
        match self {
            Length::Px(v) => Length::Px(-v),
            Length::Percent(v) => Length::Percent(-v),
            Length::Auto => Length::Auto,
        }
    }
}

pub(crate) fn round3(value: f64) -> f64 {
    let rounded = (value * 1000.0).round() / 1000.0;
    if rounded == 0.0 { 0.0 } else { rounded }
}

pub(crate) fn format_number(value: f64) -> String {
    format!("{}", round3(value))
}

/// Per-side box spacing.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Edges {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub top: Option<Length>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub right: Option<Length>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bottom: Option<Length>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub left: Option<Length>,
}

impl Edges {
    pub fn is_empty(&self) -> bool {
        self.top.is_none() && self.right.is_none() && self.bottom.is_none() && self.left.is_none()
    }

    pub fn apply(&mut self, values: [Length; 4]) {
        self.top = Some(values[0]);
        self.right = Some(values[1]);
        self.bottom = Some(values[2]);
        self.left = Some(values[3]);
    }

    /// All four sides, when every one is set.
    pub fn uniform_sides(&self) -> Option<[Length; 4]> {
        Some([self.top?, self.right?, self.bottom?, self.left?])
    }

    fn overlay(&mut self, other: &Edges) {
        if other.top.is_some() {
            self.top = other.top;
        }
        if other.right.is_some() {
            self.right = other.right;
        }
        if other.bottom.is_some() {
            self.bottom = other.bottom;
        }
        if other.left.is_some() {
            self.left = other.left;
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Display {
    Block,
    Inline,
    InlineBlock,
    Flex,
    InlineFlex,
    Grid,
    InlineGrid,
    None,
}

impl Display {
    pub fn parse(raw: &str) -> Option<Display> {
        Some(match raw.trim().to_ascii_lowercase().as_str() {
            "block" => Display::Block,
            "inline" => Display::Inline,
            "inline-block" => Display::InlineBlock,
            "flex" => Display::Flex,
            "inline-flex" => Display::InlineFlex,
            "grid" => Display::Grid,
            "inline-grid" => Display::InlineGrid,
            "none" => Display::None,
            _ => return None,
        })
    }

    pub fn as_css(&self) -> &'static str {
        match self {
            Display::Block => "block",
            Display::Inline => "inline",
            Display::InlineBlock => "inline-block",
            Display::Flex => "flex",
            Display::InlineFlex => "inline-flex",
            Display::Grid => "grid",
            Display::InlineGrid => "inline-grid",
            Display::None => "none",
        }
    }

    pub fn is_flex(&self) -> bool {
        matches!(self, Display::Flex | Display::InlineFlex)
    }

    pub fn is_grid(&self) -> bool {
        matches!(self, Display::Grid | Display::InlineGrid)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum FlexDirection {
    Row,
    Column,
    RowReverse,
    ColumnReverse,
}

impl FlexDirection {
    pub fn parse(raw: &str) -> Option<FlexDirection> {
        Some(match raw.trim().to_ascii_lowercase().as_str() {
            "row" => FlexDirection::Row,
            "column" => FlexDirection::Column,
            "row-reverse" => FlexDirection::RowReverse,
            "column-reverse" => FlexDirection::ColumnReverse,
            _ => return None,
        })
    }

    pub fn as_css(&self) -> &'static str {
        match self {
            FlexDirection::Row => "row",
            FlexDirection::Column => "column",
            FlexDirection::RowReverse => "row-reverse",
            FlexDirection::ColumnReverse => "column-reverse",
        }
    }

    pub fn is_column(&self) -> bool {
        matches!(self, FlexDirection::Column | FlexDirection::ColumnReverse)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TextAlign {
    Left,
    Center,
    Right,
    Justify,
    Start,
    End,
}

impl TextAlign {
    pub fn parse(raw: &str) -> Option<TextAlign> {
        Some(match raw.trim().to_ascii_lowercase().as_str() {
            "left" => TextAlign::Left,
            "center" => TextAlign::Center,
            "right" => TextAlign::Right,
            "justify" => TextAlign::Justify,
            "start" => TextAlign::Start,
            "end" => TextAlign::End,
            _ => return None,
        })
    }

    pub fn as_css(&self) -> &'static str {
        match self {
            TextAlign::Left => "left",
            TextAlign::Center => "center",
            TextAlign::Right => "right",
            TextAlign::Justify => "justify",
            TextAlign::Start => "start",
            TextAlign::End => "end",
        }
    }
}

/// Canonical style values for one breakpoint (or the base).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StyleValues {
    #[serde(skip_serializing_if = "Edges::is_empty")]
    pub padding: Edges,
    #[serde(skip_serializing_if = "Edges::is_empty")]
    pub margin: Edges,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub color: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub background_color: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub font_family: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub font_size: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub font_weight: Option<u16>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub line_height: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub text_align: Option<TextAlign>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub display: Option<Display>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub flex_direction: Option<FlexDirection>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub gap: Option<Length>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub grid_columns: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub width: Option<Length>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub height: Option<Length>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_width: Option<Length>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub border_radius: Option<Length>,
    /// Declarations without a canonical field, verbatim and in source order.
    /// They are written after the canonical fields, so no entry may overlap a
    /// canonical value that was declared after it.
    #[serde(skip_serializing_if = "IndexMap::is_empty")]
    pub extra: IndexMap<String, String>,
}

impl StyleValues {
    pub fn is_empty(&self) -> bool {
        *self == StyleValues::default()
    }

    /// Copies every value set in `other` over `self`.
    pub fn overlay(&mut self, other: &StyleValues) {
        self.padding.overlay(&other.padding);
        self.margin.overlay(&other.margin);
        macro_rules! take {
            ($($field:ident),*) => {
                $(if other.$field.is_some() {
                    self.$field = other.$field.clone();
                })*
            };
        }
        take!(
            color,
            background_color,
            font_family,
            font_size,
            font_weight,
            line_height,
            text_align,
            display,
            flex_direction,
            gap,
            grid_columns,
            width,
            height,
            max_width,
            border_radius
        );
        for (name, value) in &other.extra {
            self.extra.shift_remove(name);
            self.extra.insert(name.clone(), value.clone());
        }
    }
}

/// Canonical style record: base values plus per-breakpoint overrides.
///
/// Overrides only hold what differs; [`StyleRecord::effective`] resolves the
/// inheritance from the base when read.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StyleRecord {
    #[serde(skip_serializing_if = "StyleValues::is_empty")]
    pub base: StyleValues,
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub breakpoints: BTreeMap<String, StyleValues>,
}

impl StyleRecord {
    pub fn is_empty(&self) -> bool {
        self.base.is_empty() && self.breakpoints.values().all(StyleValues::is_empty)
    }

    /// Values in effect at `breakpoint`; unknown or absent breakpoints read the base.
    pub fn effective(&self, breakpoint: &str) -> StyleValues {
        let mut values = self.base.clone();
        if let Some(overrides) = self.breakpoints.get(breakpoint) {
            values.overlay(overrides);
        }
        values
    }

    pub(crate) fn prune_empty_breakpoints(&mut self) {
        self.breakpoints.retain(|_, values| !values.is_empty());
    }
}
