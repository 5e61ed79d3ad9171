//! Opt-in diagnostics channel.
//!
//! `TRELLIS_DIAGNOSTICS` holds a comma list of categories (`html`, `css`) or
//! `all`. Enabled categories log classification decisions, kept classes and
//! fallbacks at `info`.

use std::collections::HashSet;
use std::sync::{Mutex, OnceLock};

use tracing::info;

#[derive(Debug, Default, PartialEq, Eq)]
struct Categories {
    all: bool,
    names: HashSet<String>,
}

impl Categories {
    fn parse(raw: &str) -> Self {
        let mut categories = Categories::default();
        for name in raw.split(',').map(|name| name.trim().to_ascii_lowercase()) {
            match name.as_str() {
                "" => {}
                "all" | "1" | "true" => categories.all = true,
                _ => {
                    categories.names.insert(name);
                }
            }
        }
        categories
    }

    fn contains(&self, category: &str) -> bool {
        self.all || self.names.contains(&category.to_ascii_lowercase())
    }
}

fn categories() -> &'static Categories {
    static CATEGORIES: OnceLock<Categories> = OnceLock::new();
    CATEGORIES.get_or_init(|| {
        Categories::parse(&std::env::var("TRELLIS_DIAGNOSTICS").unwrap_or_default())
    })
}

/// Whether `category` was enabled when the process first asked.
pub fn diagnostics_enabled(category: &str) -> bool {
    categories().contains(category)
}

/// Reports a tag that fell back to `fallback`, once per tag per process.
pub(crate) fn log_fallback_tag_once(tag: &str, fallback: &str) {
    static REPORTED: OnceLock<Mutex<HashSet<String>>> = OnceLock::new();
    if !diagnostics_enabled("html") {
        return;
    }
    let reported = REPORTED.get_or_init(|| Mutex::new(HashSet::new()));
    let first = match reported.lock() {
        Ok(mut tags) => tags.insert(tag.to_string()),
        Err(_) => false,
    };
    if first {
        info!(tag = %tag, fallback = %fallback, "diagnostics: unsupported tag fell back");
    }
}
