//! Low-level HTML writing shared by the normalizer, builder and serializer.

use html_escape::{encode_double_quoted_attribute, encode_text};

const VOID_ELEMENTS: &[&str] = &[
    "area", "base", "br", "col", "embed", "hr", "img", "input", "link", "meta", "param", "source",
    "track", "wbr",
];

/// Elements whose text content is emitted without escaping.
const RAW_TEXT_ELEMENTS: &[&str] = &[
    "script", "style", "xmp", "iframe", "noembed", "noframes", "noscript", "plaintext",
];

/// The parser drops one newline right after these start tags.
const LEADING_NEWLINE_ELEMENTS: &[&str] = &["pre", "textarea", "listing"];

pub(crate) fn is_void(tag: &str) -> bool {
    VOID_ELEMENTS.contains(&tag)
}

pub(crate) fn is_raw_text(tag: &str) -> bool {
    RAW_TEXT_ELEMENTS.contains(&tag)
}

pub(crate) fn write_start_tag<'a, I>(out: &mut String, tag: &str, attrs: I)
where
    I: IntoIterator<Item = (&'a str, &'a str)>,
{
    out.push('<');
    out.push_str(tag);
    for (name, value) in attrs {
        out.push(' ');
        out.push_str(name);
        out.push_str("=\"");
        out.push_str(&encode_double_quoted_attribute(value));
        out.push('"');
    }
    out.push('>');
}

pub(crate) fn write_end_tag(out: &mut String, tag: &str) {
    if is_void(tag) {
        return;
    }
    out.push_str("</");
    out.push_str(tag);
    out.push('>');
}

/// Writes a text node whose parent element is `parent`. `first` marks the
/// parent's first child, where a leading newline needs doubling.
pub(crate) fn write_text(out: &mut String, parent: Option<&str>, text: &str, first: bool) {
    if let Some(tag) = parent {
        if is_raw_text(tag) {
            out.push_str(text);
            return;
        }
        if first && text.starts_with('\n') && LEADING_NEWLINE_ELEMENTS.contains(&tag) {
            out.push('\n');
        }
    }
    out.push_str(&encode_text(text));
}

/// HTML whitespace is ASCII only. U+00A0 and other Unicode spaces render.
pub(crate) fn is_html_space(c: char) -> bool {
    matches!(c, ' ' | '\t' | '\n' | '\x0C' | '\r')
}

pub(crate) fn is_blank(text: &str) -> bool {
    text.chars().all(is_html_space)
}

/// Collapses HTML whitespace runs to one space and trims both ends.
pub(crate) fn collapse_whitespace(input: &str) -> String {
    input
        .split(is_html_space)
        .filter(|word| !word.is_empty())
        .collect::<Vec<_>>()
        .join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;

    const NO_ATTRS: [(&str, &str); 0] = [];

    #[test]
    fn attributes_and_text_are_escaped() {
        let mut out = String::new();
        write_start_tag(&mut out, "a", [("href", "/q?a=1&b=\"2\"")]);
        write_text(&mut out, Some("a"), "1 < 2 & 3", true);
        write_end_tag(&mut out, "a");
        assert_eq!(out, "<a href=\"/q?a=1&amp;b=&quot;2&quot;\">1 &lt; 2 &amp; 3</a>");
    }

    #[test]
    fn raw_text_and_void_elements() {
        let mut out = String::new();
        write_start_tag(&mut out, "style", NO_ATTRS);
        write_text(&mut out, Some("style"), "a > b { color: red }", true);
        write_end_tag(&mut out, "style");
        write_start_tag(&mut out, "br", NO_ATTRS);
        write_end_tag(&mut out, "br");
        assert_eq!(out, "<style>a > b { color: red }</style><br>");
    }

    #[test]
    fn pre_keeps_its_leading_newline() {
        let mut out = String::new();
        write_text(&mut out, Some("pre"), "\ncode", true);
        assert_eq!(out, "\n\ncode");
    }

    #[test]
    fn non_breaking_spaces_are_content() {
        assert_eq!(collapse_whitespace(" a \t\n b\x0C"), "a b");
        assert_eq!(collapse_whitespace("Price:\u{a0}\u{a0}$5"), "Price:\u{a0}\u{a0}$5");
        assert_eq!(collapse_whitespace(" \u{a0} "), "\u{a0}");
        assert!(is_blank(" \r\n"));
        assert!(!is_blank("\u{a0}"));
    }
}
