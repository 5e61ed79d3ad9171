//! Utility-class vocabulary (a Tailwind-compatible subset).
//!
//! `apply_utility` reads one class into a [`StyleValues`]; `utilities_for` is
//! its inverse and always emits arbitrary-value forms so the trip back is exact.

use super::inline::{canonical_color, canonical_line_height, numeric_font_weight};
use super::style::{Display, FlexDirection, Length, StyleValues, TextAlign, round3};

const FONT_SIZES: &[(&str, f64)] = &[
    ("xs", 12.0),
    ("sm", 14.0),
    ("base", 16.0),
    ("lg", 18.0),
    ("xl", 20.0),
    ("2xl", 24.0),
    ("3xl", 30.0),
    ("4xl", 36.0),
    ("5xl", 48.0),
    ("6xl", 60.0),
];

const FONT_WEIGHTS: &[(&str, u16)] = &[
    ("thin", 100),
    ("extralight", 200),
    ("light", 300),
    ("normal", 400),
    ("medium", 500),
    ("semibold", 600),
    ("bold", 700),
    ("extrabold", 800),
    ("black", 900),
];

const RADII: &[(&str, f64)] = &[
    ("rounded-none", 0.0),
    ("rounded-sm", 2.0),
    ("rounded", 4.0),
    ("rounded-md", 6.0),
    ("rounded-lg", 8.0),
    ("rounded-xl", 12.0),
    ("rounded-2xl", 16.0),
    ("rounded-3xl", 24.0),
    ("rounded-full", 9999.0),
];

const LEADING: &[(&str, &str)] = &[
    ("none", "1"),
    ("tight", "1.25"),
    ("snug", "1.375"),
    ("normal", "1.5"),
    ("relaxed", "1.625"),
    ("loose", "2"),
];

/// Applies one utility class. Returns `false`, leaving `out` untouched, when the
/// class is not part of the vocabulary.
pub fn apply_utility(out: &mut StyleValues, class: &str) -> bool {
    let (negative, body) = match class.strip_prefix('-') {
        Some(rest) => (true, rest),
        None => (false, class),
    };
    if negative {
        return apply_spacing(out, body, true);
    }

    if let Some(display) = keyword_display(body) {
        out.display = Some(display);
        return true;
    }
    let direction = match body {
        "flex-row" => Some(FlexDirection::Row),
        "flex-col" => Some(FlexDirection::Column),
        "flex-row-reverse" => Some(FlexDirection::RowReverse),
        "flex-col-reverse" => Some(FlexDirection::ColumnReverse),
        _ => None,
    };
    if let Some(direction) = direction {
        out.flex_direction = Some(direction);
        return true;
    }
    if let Some((_, px)) = RADII.iter().find(|(name, _)| *name == body) {
        out.border_radius = Some(Length::Px(*px));
        return true;
    }
    if let Some(raw) = body.strip_prefix("rounded-") {
        return match arbitrary(raw).and_then(|v| Length::parse(&v)) {
            Some(len @ (Length::Px(_) | Length::Percent(_))) => {
                out.border_radius = Some(len);
                true
            }
            _ => false,
        };
    }
    if let Some(raw) = body.strip_prefix("grid-cols-") {
        return match raw.parse::<u32>() {
            Ok(n) if n > 0 => {
                out.grid_columns = Some(n);
                true
            }
            _ => false,
        };
    }
    if let Some(raw) = body.strip_prefix("max-w-") {
        return match size_value(raw) {
            Some(Length::Auto) | None => false,
            Some(len) => {
                out.max_width = Some(len);
                true
            }
        };
    }
    if let Some(raw) = body.strip_prefix("leading-") {
        let value = match arbitrary(raw) {
            Some(v) => canonical_line_height(&v),
            None => LEADING
                .iter()
                .find(|(name, _)| *name == raw)
                .map(|(_, v)| v.to_string())
                .or_else(|| scale_px(raw).map(|px| Length::Px(px).to_css())),
        };
        return match value {
            Some(v) => {
                out.line_height = Some(v);
                true
            }
            None => false,
        };
    }
    if let Some(raw) = body.strip_prefix("font-") {
        let weight = match arbitrary(raw) {
            Some(v) => numeric_font_weight(&v),
            None => FONT_WEIGHTS
                .iter()
                .find(|(name, _)| *name == raw)
                .map(|(_, w)| *w),
        };
        return match weight {
            Some(w) => {
                out.font_weight = Some(w);
                true
            }
            None => false,
        };
    }
    if let Some(raw) = body.strip_prefix("text-") {
        return apply_text(out, raw);
    }
    if let Some(raw) = body.strip_prefix("bg-") {
        return match color_value(raw) {
            Some(c) => {
                out.background_color = Some(c);
                true
            }
            None => false,
        };
    }
    apply_spacing(out, body, false)
}

fn keyword_display(body: &str) -> Option<Display> {
    match body {
        "hidden" => Some(Display::None),
        "block" | "inline" | "inline-block" | "flex" | "inline-flex" | "grid" | "inline-grid" => {
            Display::parse(body)
        }
        _ => None,
    }
}

fn apply_text(out: &mut StyleValues, raw: &str) -> bool {
    if let Some(align) = TextAlign::parse(raw) {
        out.text_align = Some(align);
        return true;
    }
    if let Some((_, px)) = FONT_SIZES.iter().find(|(name, _)| *name == raw) {
        out.font_size = Some(*px);
        return true;
    }
    if let Some(v) = arbitrary(raw) {
        if let Some(Length::Px(px)) = Length::parse(&v) {
            out.font_size = Some(px);
            return true;
        }
    }
    match color_value(raw) {
        Some(c) => {
            out.color = Some(c);
            true
        }
        None => false,
    }
}

fn color_value(raw: &str) -> Option<String> {
    match raw {
        "white" | "black" | "transparent" => canonical_color(raw),
        _ => canonical_color(&arbitrary(raw)?),
    }
}

fn apply_spacing(out: &mut StyleValues, body: &str, negative: bool) -> bool {
    let Some((key, raw)) = body.split_once('-') else {
        return false;
    };
    let value = match key {
        "w" | "h" => size_value(raw),
        _ => spacing_value(raw),
    };
    let Some(mut len) = value else {
        return false;
    };
    if negative {
        if len == Length::Auto || !matches!(key, "m" | "mx" | "my" | "mt" | "mr" | "mb" | "ml") {
            return false;
        }
        len = len.negated();
    }
    let auto = len == Length::Auto;
    match key {
        "p" | "px" | "py" | "pt" | "pr" | "pb" | "pl" if !auto => {
            let sides = sides_for(&key[1..]);
            let p = &mut out.padding;
            let slots = [&mut p.top, &mut p.right, &mut p.bottom, &mut p.left];
            for (slot, on) in slots.into_iter().zip(sides) {
                if on {
                    *slot = Some(len);
                }
            }
        }
        "m" | "mx" | "my" | "mt" | "mr" | "mb" | "ml" => {
            let sides = sides_for(&key[1..]);
            let m = &mut out.margin;
            let slots = [&mut m.top, &mut m.right, &mut m.bottom, &mut m.left];
            for (slot, on) in slots.into_iter().zip(sides) {
                if on {
                    *slot = Some(len);
                }
            }
        }
        "gap" if !auto => out.gap = Some(len),
        "w" => out.width = Some(len),
        "h" => out.height = Some(len),
        _ => return false,
    }
    true
}

/// Which of top/right/bottom/left an axis suffix (`""`, `x`, `y`, `t`...) covers.
fn sides_for(axis: &str) -> [bool; 4] {
    match axis {
        "x" => [false, true, false, true],
        "y" => [true, false, true, false],
        "t" => [true, false, false, false],
        "r" => [false, true, false, false],
        "b" => [false, false, true, false],
        "l" => [false, false, false, true],
        _ => [true, true, true, true],
    }
}

fn spacing_value(raw: &str) -> Option<Length> {
    match raw {
        "px" => Some(Length::Px(1.0)),
        "auto" => Some(Length::Auto),
        _ => match arbitrary(raw) {
            Some(v) => Length::parse(&v),
            None => scale_px(raw).map(Length::Px),
        },
    }
}

fn size_value(raw: &str) -> Option<Length> {
    if raw == "full" {
        return Some(Length::Percent(100.0));
    }
    if let Some((num, den)) = raw.split_once('/') {
        let num = num.parse::<f64>().ok()?;
        let den = den.parse::<f64>().ok().filter(|d| *d > 0.0)?;
        return Some(Length::Percent(round3(num / den * 100.0)));
    }
    spacing_value(raw)
}

/// Spacing scale: one step is 4px.
fn scale_px(raw: &str) -> Option<f64> {
    let steps = raw.parse::<f64>().ok().filter(|v| v.is_finite() && *v >= 0.0)?;
    Some(round3(steps * 4.0))
}

/// Inner text of an arbitrary value (`[13px]`), with `_` standing for a space.
fn arbitrary(raw: &str) -> Option<String> {
    let inner = raw.strip_prefix('[')?.strip_suffix(']')?;
    if inner.is_empty() {
        return None;
    }
    Some(inner.replace('_', " "))
}

fn wrap(value: &str) -> String {
    format!("[{}]", value.replace(' ', "_"))
}

/// Unprefixed utilities that reproduce every class-expressible value in
/// `values`. `font_family` and `extra` have no class form and are skipped.
pub fn utilities_for(values: &StyleValues) -> Vec<String> {
    let mut out = Vec::new();
    let padding = [
        ("pt", values.padding.top),
        ("pr", values.padding.right),
        ("pb", values.padding.bottom),
        ("pl", values.padding.left),
    ];
    for (key, len) in padding {
        if let Some(len) = len {
            out.push(format!("{key}-{}", wrap(&len.to_css())));
        }
    }
    let margin = [
        ("mt", values.margin.top),
        ("mr", values.margin.right),
        ("mb", values.margin.bottom),
        ("ml", values.margin.left),
    ];
    for (key, len) in margin {
        match len {
            Some(Length::Auto) => out.push(format!("{key}-auto")),
            Some(len) => out.push(format!("{key}-{}", wrap(&len.to_css()))),
            None => {}
        }
    }
    if let Some(d) = values.display {
        out.push(match d {
            Display::None => "hidden".to_string(),
            other => other.as_css().to_string(),
        });
    }
    if let Some(d) = values.flex_direction {
        out.push(
            match d {
                FlexDirection::Row => "flex-row",
                FlexDirection::Column => "flex-col",
                FlexDirection::RowReverse => "flex-row-reverse",
                FlexDirection::ColumnReverse => "flex-col-reverse",
            }
            .to_string(),
        );
    }
    if let Some(n) = values.grid_columns {
        out.push(format!("grid-cols-{n}"));
    }
    if let Some(gap) = values.gap {
        out.push(format!("gap-{}", wrap(&gap.to_css())));
    }
    let sizes = [
        ("w", values.width),
        ("h", values.height),
        ("max-w", values.max_width),
    ];
    for (key, len) in sizes {
        match len {
            Some(Length::Auto) => out.push(format!("{key}-auto")),
            Some(len) => out.push(format!("{key}-{}", wrap(&len.to_css()))),
            None => {}
        }
    }
    if let Some(c) = &values.color {
        out.push(format!("text-{}", wrap(c)));
    }
    if let Some(c) = &values.background_color {
        out.push(format!("bg-{}", wrap(c)));
    }
    if let Some(px) = values.font_size {
        out.push(format!("text-{}", wrap(&Length::Px(px).to_css())));
    }
    if let Some(w) = values.font_weight {
        out.push(format!("font-[{w}]"));
    }
    if let Some(lh) = &values.line_height {
        out.push(format!("leading-{}", wrap(lh)));
    }
    if let Some(a) = values.text_align {
        out.push(format!("text-{}", a.as_css()));
    }
    if let Some(r) = values.border_radius {
        out.push(format!("rounded-{}", wrap(&r.to_css())));
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn apply_all(classes: &str) -> (StyleValues, Vec<String>) {
        let mut out = StyleValues::default();
        let mut kept = Vec::new();
        for class in classes.split_whitespace() {
            if !apply_utility(&mut out, class) {
                kept.push(class.to_string());
            }
        }
        (out, kept)
    }

    #[test]
    fn spacing_scale_and_axes() {
        let (v, kept) = apply_all("p-4 px-2 -mt-1 mx-auto gap-[10px]");
        assert!(kept.is_empty());
        assert_eq!(v.padding.top, Some(Length::Px(16.0)));
        assert_eq!(v.padding.left, Some(Length::Px(8.0)));
        assert_eq!(v.padding.right, Some(Length::Px(8.0)));
        assert_eq!(v.margin.top, Some(Length::Px(-4.0)));
        assert_eq!(v.margin.left, Some(Length::Auto));
        assert_eq!(v.gap, Some(Length::Px(10.0)));
    }

    #[test]
    fn typography_and_colors() {
        let (v, kept) = apply_all("text-lg font-semibold text-center text-[#f00] bg-white leading-[1.5]");
        assert!(kept.is_empty());
        assert_eq!(v.font_size, Some(18.0));
        assert_eq!(v.font_weight, Some(600));
        assert_eq!(v.text_align, Some(TextAlign::Center));
        assert_eq!(v.color.as_deref(), Some("#ff0000"));
        assert_eq!(v.background_color.as_deref(), Some("#ffffff"));
        assert_eq!(v.line_height.as_deref(), Some("1.5"));
    }

    #[test]
    fn unknown_classes_are_rejected_without_side_effects() {
        let (v, kept) = apply_all("card text-red-500 -p-4 p-auto shadow-lg font-[950] font-[50]");
        assert_eq!(
            kept,
            vec!["card", "text-red-500", "-p-4", "p-auto", "shadow-lg", "font-[950]", "font-[50]"]
        );
        assert!(v.is_empty());
    }

    #[test]
    fn emitted_utilities_reapply_to_the_same_values() {
        let (v, _) = apply_all(
            "flex flex-col grid-cols-3 p-2 -ml-3 mr-auto w-1/2 max-w-[640px] text-[14px] text-[rgba(0,0,0,0.5)] font-bold rounded-lg leading-6 text-right",
        );
        let utilities = utilities_for(&v);
        let (again, kept) = apply_all(&utilities.join(" "));
        assert!(kept.is_empty(), "unexpected leftovers: {kept:?}");
        assert_eq!(again, v);
    }
}
