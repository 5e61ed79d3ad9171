//! Style extraction: utility classes and inline declarations folded into one
//! canonical [`StyleRecord`].

mod breakpoints;
mod inline;
mod style;
mod utility;

pub use breakpoints::BreakpointTable;
pub use inline::{
    apply_declaration, canonical_color, parse_declarations, parse_edge_values, to_inline_css,
};
pub(crate) use style::format_number;
pub use style::{Display, Edges, FlexDirection, Length, StyleRecord, StyleValues, TextAlign};
pub use utility::{apply_utility, utilities_for};

use crate::diagnostics::diagnostics_enabled;
use tracing::{debug, info};

/// Result of reading an element's `class` and `style` attributes.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ExtractedStyle {
    pub style: StyleRecord,
    /// Classes outside the utility vocabulary, in source order.
    pub kept_classes: Vec<String>,
}

/// Folds utility classes, then inline declarations, into a style record.
///
/// Inline declarations win over classes for the base values. Responsive
/// prefixes only apply when they resolve to a configured breakpoint; others are
/// kept as plain classes.
pub fn extract_style(
    class_attr: Option<&str>,
    style_attr: Option<&str>,
    breakpoints: &BreakpointTable,
) -> ExtractedStyle {
    let mut record = StyleRecord::default();
    let mut kept_classes = Vec::new();
    for class in class_attr.unwrap_or_default().split_whitespace() {
        let recognized = match split_variant(class) {
            Some((prefix, utility)) => match breakpoints.resolve_prefix(prefix) {
                Some(name) => {
                    let slot = record.breakpoints.entry(name.to_string()).or_default();
                    apply_utility(slot, utility)
                }
                None => false,
            },
            None => apply_utility(&mut record.base, class),
        };
        if !recognized {
            if diagnostics_enabled("css") {
                info!(class = %class, "diagnostics: class kept verbatim");
            }
            kept_classes.push(class.to_string());
        }
    }
    if let Some(style) = style_attr {
        for (name, value) in parse_declarations(style) {
            apply_declaration(&mut record.base, &name, &value);
        }
    }
    record.prune_empty_breakpoints();
    ExtractedStyle {
        style: record,
        kept_classes,
    }
}

/// Generated `prefix:utility` classes that reproduce every breakpoint override.
pub fn responsive_classes(record: &StyleRecord, breakpoints: &BreakpointTable) -> Vec<String> {
    let mut out = Vec::new();
    for (name, values) in &record.breakpoints {
        let Some(prefix) = breakpoints.prefix_for(name) else {
            debug!(breakpoint = %name, "dropping overrides for unconfigured breakpoint");
            continue;
        };
        for utility in utilities_for(values) {
            out.push(format!("{prefix}:{utility}"));
        }
    }
    out
}

/// Splits `md:p-4` into `("md", "p-4")`. Colons inside arbitrary values do not count.
fn split_variant(class: &str) -> Option<(&str, &str)> {
    let mut depth = 0usize;
    for (idx, ch) in class.char_indices() {
        match ch {
            '[' => depth += 1,
            ']' => depth = depth.saturating_sub(1),
            ':' if depth == 0 => return Some((&class[..idx], &class[idx + 1..])),
            _ => {}
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn inline_wins_over_classes() {
        let out = extract_style(
            Some("p-4 text-center card"),
            Some("padding-top: 2px; color: red"),
            &BreakpointTable::default(),
        );
        let base = &out.style.base;
        assert_eq!(base.padding.top, Some(Length::Px(2.0)));
        assert_eq!(base.padding.bottom, Some(Length::Px(16.0)));
        assert_eq!(base.text_align, Some(TextAlign::Center));
        assert_eq!(base.color.as_deref(), Some("#ff0000"));
        assert_eq!(out.kept_classes, vec!["card"]);
    }

    #[test]
    fn verbatim_inline_values_beat_classes() {
        let out = extract_style(
            Some("w-full p-4"),
            Some("width:10vw; padding-left: calc(1rem + 2px)"),
            &BreakpointTable::default(),
        );
        let base = &out.style.base;
        assert_eq!(base.width, None);
        assert_eq!(base.padding.left, None);
        assert_eq!(base.padding.top, Some(Length::Px(16.0)));
        assert_eq!(
            to_inline_css(base),
            "padding-top:16px;padding-right:16px;padding-bottom:16px;width:10vw;padding-left:calc(1rem + 2px)"
        );
    }

    #[test]
    fn responsive_prefixes_follow_the_breakpoint_table() {
        let table = BreakpointTable::default();
        let out = extract_style(Some("p-2 md:p-8 xl:p-10 hover:bg-white"), None, &table);
        assert_eq!(out.style.base.padding.left, Some(Length::Px(8.0)));
        let tablet = out.style.breakpoints.get("tablet").expect("tablet overrides");
        assert_eq!(tablet.padding.left, Some(Length::Px(32.0)));
        assert_eq!(out.kept_classes, vec!["xl:p-10", "hover:bg-white"]);
    }

    #[test]
    fn responsive_classes_reextract_to_the_same_overrides() {
        let table = BreakpointTable::default();
        let out = extract_style(Some("sm:text-lg lg:grid lg:grid-cols-2 md:-mt-2"), None, &table);
        let classes = responsive_classes(&out.style, &table).join(" ");
        let again = extract_style(Some(&classes), None, &table);
        assert_eq!(again.style, out.style);
        assert!(again.kept_classes.is_empty());
    }

    #[test]
    fn variant_split_ignores_colons_in_arbitrary_values() {
        assert_eq!(split_variant("md:p-4"), Some(("md", "p-4")));
        assert_eq!(split_variant("min-[900px]:p-4"), Some(("min-[900px]", "p-4")));
        assert_eq!(split_variant("bg-[url(a:b)]"), None);
    }
}
