use csscolorparser::Color as CssColor;
use std::str::FromStr;

use super::style::{Display, FlexDirection, Length, StyleValues, TextAlign, format_number};

/// Splits a `style` attribute into lowercase property names and raw values.
///
/// Semicolons inside parentheses or quotes (`url(data:...;base64,...)`) do not
/// terminate a declaration.
pub fn parse_declarations(source: &str) -> Vec<(String, String)> {
    let mut out = Vec::new();
    let mut depth = 0usize;
    let mut quote: Option<char> = None;
    let mut start = 0usize;
    for (idx, ch) in source.char_indices() {
        match (quote, ch) {
            (Some(q), c) if c == q => quote = None,
            (Some(_), _) => {}
            (None, '"' | '\'') => quote = Some(ch),
            (None, '(') => depth += 1,
            (None, ')') => depth = depth.saturating_sub(1),
            (None, ';') if depth == 0 => {
                push_declaration(&source[start..idx], &mut out);
                start = idx + 1;
            }
            _ => {}
        }
    }
    push_declaration(&source[start..], &mut out);
    out
}

fn push_declaration(decl: &str, out: &mut Vec<(String, String)>) {
    let Some((name, value)) = decl.split_once(':') else {
        return;
    };
    let name = name.trim().to_ascii_lowercase();
    let value = value.trim();
    if name.is_empty() || value.is_empty() {
        return;
    }
    out.push((name, value.to_string()));
}

/// Canonical fields, by the longhand property each one holds.
const CANONICAL_PROPERTIES: &[&str] = &[
    "padding-top",
    "padding-right",
    "padding-bottom",
    "padding-left",
    "margin-top",
    "margin-right",
    "margin-bottom",
    "margin-left",
    "color",
    "background-color",
    "font-family",
    "font-size",
    "font-weight",
    "line-height",
    "text-align",
    "display",
    "flex-direction",
    "gap",
    "grid-template-columns",
    "width",
    "height",
    "max-width",
    "border-radius",
];

/// Applies one declaration as if it came after everything already in `out`.
///
/// Anything without a canonical field, or whose value cannot be normalized,
/// lands in `extra` untouched and clears the canonical fields it overrides. A
/// declaration that an earlier `extra` entry only partly overrides also stays
/// verbatim so the serialized order keeps the same winner.
pub fn apply_declaration(out: &mut StyleValues, name: &str, raw: &str) {
    let value = raw.trim();
    let important = is_important(value);
    if !important
        && out
            .extra
            .iter()
            .any(|(prior, prior_value)| is_important(prior_value) && covers(prior, name))
    {
        return;
    }
    out.extra
        .retain(|prior, prior_value| !covers(name, prior) || (is_important(prior_value) && !important));
    let shadowed = out.extra.keys().any(|prior| covers(prior, name));
    if important || shadowed || !apply_canonical(out, name, value) {
        clear_canonical(out, name);
        out.extra.insert(name.to_string(), value.to_string());
        return;
    }
    // Fields an earlier `!important` entry overrides keep that entry.
    let pinned: Vec<String> = out
        .extra
        .iter()
        .filter(|(_, prior_value)| is_important(prior_value))
        .map(|(prior, _)| prior.clone())
        .collect();
    for prior in pinned {
        clear_canonical(out, &prior);
    }
}

fn is_important(value: &str) -> bool {
    value.to_ascii_lowercase().contains("!important")
}

/// Whether declaring `shorthand` resets `longhand`.
pub(crate) fn covers(shorthand: &str, longhand: &str) -> bool {
    if shorthand == longhand {
        return true;
    }
    if shorthand.starts_with("--") || longhand.starts_with("--") {
        return false;
    }
    match (shorthand, longhand) {
        ("font", "line-height") | ("flex-flow", "flex-direction") => true,
        ("gap", "row-gap" | "column-gap") => true,
        ("color" | "font-size", _) | ("outline", "outline-offset") => false,
        ("flex", "flex-direction" | "flex-wrap" | "flex-flow") => false,
        (s, l) if s.starts_with("border") && l.ends_with("-radius") => {
            s == "border-radius" && l.starts_with("border-")
        }
        _ => longhand
            .strip_prefix(shorthand)
            .is_some_and(|rest| rest.starts_with('-')),
    }
}

fn clear_canonical(out: &mut StyleValues, name: &str) {
    for property in CANONICAL_PROPERTIES.iter().copied().filter(|p| covers(name, p)) {
        match property {
            "padding-top" => out.padding.top = None,
            "padding-right" => out.padding.right = None,
            "padding-bottom" => out.padding.bottom = None,
            "padding-left" => out.padding.left = None,
            "margin-top" => out.margin.top = None,
            "margin-right" => out.margin.right = None,
            "margin-bottom" => out.margin.bottom = None,
            "margin-left" => out.margin.left = None,
            "color" => out.color = None,
            "background-color" => out.background_color = None,
            "font-family" => out.font_family = None,
            "font-size" => out.font_size = None,
            "font-weight" => out.font_weight = None,
            "line-height" => out.line_height = None,
            "text-align" => out.text_align = None,
            "display" => out.display = None,
            "flex-direction" => out.flex_direction = None,
            "gap" => out.gap = None,
            "grid-template-columns" => out.grid_columns = None,
            "width" => out.width = None,
            "height" => out.height = None,
            "max-width" => out.max_width = None,
            "border-radius" => out.border_radius = None,
            _ => {}
        }
    }
}

fn apply_canonical(out: &mut StyleValues, name: &str, value: &str) -> bool {
    match name {
        "padding" => match parse_edge_values(value) {
            Some(v) if !v.contains(&Length::Auto) => out.padding.apply(v),
            _ => return false,
        },
        "padding-top" => return set_length(&mut out.padding.top, value, false),
        "padding-right" => return set_length(&mut out.padding.right, value, false),
        "padding-bottom" => return set_length(&mut out.padding.bottom, value, false),
        "padding-left" => return set_length(&mut out.padding.left, value, false),
        "margin" => match parse_edge_values(value) {
            Some(v) => out.margin.apply(v),
            None => return false,
        },
        "margin-top" => return set_length(&mut out.margin.top, value, true),
        "margin-right" => return set_length(&mut out.margin.right, value, true),
        "margin-bottom" => return set_length(&mut out.margin.bottom, value, true),
        "margin-left" => return set_length(&mut out.margin.left, value, true),
        "color" => match canonical_color(value) {
            Some(c) => out.color = Some(c),
            None => return false,
        },
        // Only a lone color is canonical; layered backgrounds stay verbatim.
        "background-color" | "background" => match canonical_color(value) {
            Some(c) => out.background_color = Some(c),
            None => return false,
        },
        "font-family" => out.font_family = Some(collapse_spaces(value)),
        "font-size" => match Length::parse(value) {
            Some(Length::Px(px)) => out.font_size = Some(px),
            _ => return false,
        },
        "font-weight" => match parse_font_weight(value) {
            Some(w) => out.font_weight = Some(w),
            None => return false,
        },
        "line-height" => match canonical_line_height(value) {
            Some(lh) => out.line_height = Some(lh),
            None => return false,
        },
        "text-align" => match TextAlign::parse(value) {
            Some(a) => out.text_align = Some(a),
            None => return false,
        },
        "display" => match Display::parse(value) {
            Some(d) => out.display = Some(d),
            None => return false,
        },
        "flex-direction" => match FlexDirection::parse(value) {
            Some(d) => out.flex_direction = Some(d),
            None => return false,
        },
        "gap" => return set_length(&mut out.gap, value, false),
        "grid-template-columns" => match parse_grid_columns(value) {
            Some(n) => out.grid_columns = Some(n),
            None => return false,
        },
        "width" => return set_length(&mut out.width, value, true),
        "height" => return set_length(&mut out.height, value, true),
        "max-width" => return set_length(&mut out.max_width, value, false),
        "border-radius" => return set_length(&mut out.border_radius, value, false),
        _ => return false,
    }
    true
}

fn set_length(slot: &mut Option<Length>, value: &str, allow_auto: bool) -> bool {
    match Length::parse(value) {
        Some(Length::Auto) if !allow_auto => false,
        Some(len) => {
            *slot = Some(len);
            true
        }
        None => false,
    }
}

/// Expands a 1–4 value box shorthand into top/right/bottom/left.
pub fn parse_edge_values(input: &str) -> Option<[Length; 4]> {
    let mut parts = Vec::with_capacity(4);
    for token in input.split_whitespace() {
        parts.push(Length::parse(token)?);
    }
    match parts.as_slice() {
        [single] => Some([*single, *single, *single, *single]),
        [vertical, horizontal] => Some([*vertical, *horizontal, *vertical, *horizontal]),
        [top, horizontal, bottom] => Some([*top, *horizontal, *bottom, *horizontal]),
        [top, right, bottom, left] => Some([*top, *right, *bottom, *left]),
        _ => None,
    }
}

/// `#rrggbb` for opaque colors, `rgba(r,g,b,a)` otherwise. `var(...)` is kept
/// as written; keywords that mean "no explicit color" yield `None`.
pub fn canonical_color(raw: &str) -> Option<String> {
    let v = raw.trim();
    if v.eq_ignore_ascii_case("none")
        || v.eq_ignore_ascii_case("inherit")
        || v.eq_ignore_ascii_case("currentcolor")
    {
        return None;
    }
    if v.starts_with("var(") && v.ends_with(')') && !v.contains(char::is_whitespace) {
        return Some(v.to_string());
    }
    let c = CssColor::from_str(v).ok()?;
    let r = (c.r * 255.0).round().clamp(0.0, 255.0) as u8;
    let g = (c.g * 255.0).round().clamp(0.0, 255.0) as u8;
    let b = (c.b * 255.0).round().clamp(0.0, 255.0) as u8;
    let a = c.a;
    if (a - 1.0).abs() < 1e-6 {
        Some(format!("#{:02x}{:02x}{:02x}", r, g, b))
    } else {
        Some(format!("rgba({},{},{},{:.2})", r, g, b, a))
    }
}

/// Numeric weights outside 100–900 have no canonical form and stay verbatim.
pub(crate) fn numeric_font_weight(value: &str) -> Option<u16> {
    value
        .parse::<u16>()
        .ok()
        .filter(|w| (100..=900).contains(w))
}

pub fn parse_font_weight(value: &str) -> Option<u16> {
    match value.trim().to_ascii_lowercase().as_str() {
        "normal" => Some(400),
        "bold" => Some(700),
        other => numeric_font_weight(other),
    }
}

/// Unitless multipliers stay unitless, lengths become pixels.
pub fn canonical_line_height(value: &str) -> Option<String> {
    let v = value.trim().to_ascii_lowercase();
    if v == "normal" {
        return Some(v);
    }
    if let Ok(n) = v.parse::<f64>() {
        return n.is_finite().then(|| format_number(n));
    }
    match Length::parse(&v)? {
        Length::Auto => None,
        len => Some(len.to_css()),
    }
}

/// Accepts `repeat(N, 1fr)`, `repeat(N, minmax(0, 1fr))` and `1fr 1fr ...`.
pub fn parse_grid_columns(value: &str) -> Option<u32> {
    let compact: String = value
        .chars()
        .filter(|c| !c.is_whitespace())
        .collect::<String>()
        .to_ascii_lowercase();
    if let Some(inner) = compact
        .strip_prefix("repeat(")
        .and_then(|rest| rest.strip_suffix(')'))
    {
        let (count, track) = inner.split_once(',')?;
        if track != "1fr" && track != "minmax(0,1fr)" {
            return None;
        }
        return count.parse::<u32>().ok().filter(|n| *n > 0);
    }
    let tracks: Vec<&str> = value.split_whitespace().collect();
    if !tracks.is_empty() && tracks.iter().all(|t| t.eq_ignore_ascii_case("1fr")) {
        return u32::try_from(tracks.len()).ok();
    }
    None
}

fn collapse_spaces(value: &str) -> String {
    value.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Renders the canonical inline `style` attribute value. Property order is
/// fixed so identical records always produce identical text.
///
/// Verbatim declarations follow the canonical ones in their source order.
pub fn to_inline_css(values: &StyleValues) -> String {
    let mut decls: Vec<(String, String)> = Vec::new();
    if let Some(d) = values.display {
        decls.push(("display".into(), d.as_css().into()));
    }
    if let Some(d) = values.flex_direction {
        decls.push(("flex-direction".into(), d.as_css().into()));
    }
    if let Some(n) = values.grid_columns {
        decls.push((
            "grid-template-columns".into(),
            format!("repeat({n},minmax(0,1fr))"),
        ));
    }
    if let Some(gap) = values.gap {
        decls.push(("gap".into(), gap.to_css()));
    }
    push_edges(&mut decls, "padding", &values.padding);
    push_edges(&mut decls, "margin", &values.margin);
    let lengths = [
        ("width", values.width),
        ("height", values.height),
        ("max-width", values.max_width),
    ];
    for (name, len) in lengths {
        if let Some(len) = len {
            decls.push((name.into(), len.to_css()));
        }
    }
    if let Some(c) = &values.color {
        decls.push(("color".into(), c.clone()));
    }
    if let Some(c) = &values.background_color {
        decls.push(("background-color".into(), c.clone()));
    }
    if let Some(f) = &values.font_family {
        decls.push(("font-family".into(), f.clone()));
    }
    if let Some(px) = values.font_size {
        decls.push(("font-size".into(), Length::Px(px).to_css()));
    }
    if let Some(w) = values.font_weight {
        decls.push(("font-weight".into(), w.to_string()));
    }
    if let Some(lh) = &values.line_height {
        decls.push(("line-height".into(), lh.clone()));
    }
    if let Some(a) = values.text_align {
        decls.push(("text-align".into(), a.as_css().into()));
    }
    if let Some(r) = values.border_radius {
        decls.push(("border-radius".into(), r.to_css()));
    }
    for (name, value) in &values.extra {
        decls.push((name.clone(), value.clone()));
    }
    decls
        .into_iter()
        .map(|(name, value)| format!("{name}:{value}"))
        .collect::<Vec<_>>()
        .join(";")
}

fn push_edges(decls: &mut Vec<(String, String)>, prefix: &str, edges: &super::style::Edges) {
    if let Some([t, r, b, l]) = edges.uniform_sides() {
        let value = if t == b && r == l && t == r {
            t.to_css()
        } else {
            format!("{} {} {} {}", t.to_css(), r.to_css(), b.to_css(), l.to_css())
        };
        decls.push((prefix.to_string(), value));
        return;
    }
    let sides = [
        ("top", edges.top),
        ("right", edges.right),
        ("bottom", edges.bottom),
        ("left", edges.left),
    ];
    for (side, len) in sides {
        if let Some(len) = len {
            decls.push((format!("{prefix}-{side}"), len.to_css()));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(source: &str) -> StyleValues {
        let mut out = StyleValues::default();
        for (name, value) in parse_declarations(source) {
            apply_declaration(&mut out, &name, &value);
        }
        out
    }

    #[test]
    fn inline_declarations_parse_basic_values() {
        let out = parse("display:flex; gap: 8px; color: #333; margin: 4px 8px; width:100%");
        assert_eq!(out.display, Some(Display::Flex));
        assert_eq!(out.gap, Some(Length::Px(8.0)));
        assert_eq!(out.color.as_deref(), Some("#333333"));
        assert_eq!(out.margin.top, Some(Length::Px(4.0)));
        assert_eq!(out.margin.right, Some(Length::Px(8.0)));
        assert_eq!(out.width, Some(Length::Percent(100.0)));
        assert!(out.extra.is_empty());
    }

    #[test]
    fn color_name_and_rgba_canonicalize() {
        let out = parse("color: red; background-color: rgba(0,0,255,0.5)");
        assert_eq!(out.color.as_deref(), Some("#ff0000"));
        assert_eq!(out.background_color.as_deref(), Some("rgba(0,0,255,0.50)"));
    }

    #[test]
    fn unknown_and_unconvertible_declarations_are_kept() {
        let out = parse("box-shadow: 0 1px 2px black; width: 10vw; background: url('a;b.png')");
        assert_eq!(
            out.extra.get("box-shadow").map(String::as_str),
            Some("0 1px 2px black")
        );
        assert_eq!(out.extra.get("width").map(String::as_str), Some("10vw"));
        assert_eq!(
            out.extra.get("background").map(String::as_str),
            Some("url('a;b.png')")
        );
        assert_eq!(out.width, None);
    }

    #[test]
    fn equivalent_units_share_one_form() {
        assert_eq!(parse("padding: 1rem"), parse("padding: 16px 16px"));
        assert_eq!(parse("font-size: 12pt").font_size, Some(16.0));
    }

    #[test]
    fn css_output_is_stable_and_reparses() {
        let values = parse("color:blue;padding:1px 2px 3px 4px;margin-left:auto;display:grid;grid-template-columns:repeat(3, 1fr);cursor:pointer");
        let css = to_inline_css(&values);
        assert_eq!(
            css,
            "display:grid;grid-template-columns:repeat(3,minmax(0,1fr));padding:1px 2px 3px 4px;margin-left:auto;color:#0000ff;cursor:pointer"
        );
        assert_eq!(parse(&css), values);
    }

    #[test]
    fn verbatim_declarations_override_earlier_canonical_values() {
        let values = parse("padding-top:2px;padding:5vw");
        assert!(values.padding.is_empty());
        assert_eq!(to_inline_css(&values), "padding:5vw");

        let values = parse("padding:5vw;padding-top:2px");
        assert_eq!(values.padding.top, None);
        assert_eq!(to_inline_css(&values), "padding:5vw;padding-top:2px");

        let values = parse("margin:4px;margin-left:1vw;color:red");
        assert_eq!(
            to_inline_css(&values),
            "margin-top:4px;margin-right:4px;margin-bottom:4px;color:#ff0000;margin-left:1vw"
        );
    }

    #[test]
    fn later_shorthands_reset_verbatim_longhands() {
        let values = parse("transition-duration:1s;transition:all 2s");
        assert_eq!(to_inline_css(&values), "transition:all 2s");

        let values = parse("transition:all 2s;transition-duration:1s");
        assert_eq!(to_inline_css(&values), "transition:all 2s;transition-duration:1s");
        assert_eq!(parse(&to_inline_css(&values)).extra, values.extra);

        let values = parse("padding-top:5vw;padding:4px");
        assert_eq!(values.padding.top, Some(Length::Px(4.0)));
        assert!(values.extra.is_empty());

        let values = parse("background-image:url(a.png);background:#fff");
        assert!(values.extra.is_empty());
        assert_eq!(to_inline_css(&values), "background-color:#ffffff");
    }

    #[test]
    fn important_declarations_keep_winning() {
        let values = parse("color:red !important;color:blue");
        assert_eq!(values.color, None);
        assert_eq!(to_inline_css(&values), "color:red !important");

        let values = parse("padding-top:1px !important;padding:4px");
        assert_eq!(values.padding.top, None);
        let css = to_inline_css(&values);
        assert_eq!(
            css,
            "padding-right:4px;padding-bottom:4px;padding-left:4px;padding-top:1px !important"
        );
        assert_eq!(parse(&css), values);
    }

    #[test]
    fn shorthand_coverage() {
        assert!(covers("padding", "padding-left"));
        assert!(covers("font", "line-height"));
        assert!(covers("border-radius", "border-top-left-radius"));
        assert!(covers("gap", "row-gap"));
        assert!(!covers("border", "border-radius"));
        assert!(!covers("flex", "flex-direction"));
        assert!(!covers("color", "color-scheme"));
        assert!(!covers("--space", "--space-lg"));
        assert!(!covers("padding-left", "padding"));
    }

    #[test]
    fn font_weights_outside_the_named_scale_stay_verbatim() {
        assert_eq!(parse("font-weight:900").font_weight, Some(900));
        let values = parse("font-weight:950");
        assert_eq!(values.font_weight, None);
        assert_eq!(values.extra.get("font-weight").map(String::as_str), Some("950"));
        assert_eq!(parse_font_weight("50"), None);
    }

    #[test]
    fn grid_columns_accept_common_spellings() {
        assert_eq!(parse_grid_columns("repeat(4, minmax(0, 1fr))"), Some(4));
        assert_eq!(parse_grid_columns("1fr 1fr"), Some(2));
        assert_eq!(parse_grid_columns("200px 1fr"), None);
    }
}
