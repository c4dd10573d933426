//! Strips namespace prefixes from tag and attribute names.
//!
//! OMR exporters routinely emit vendor prefixes that were never declared,
//! which a conforming XML parser refuses. The rewrite here is purely
//! syntactic: it never consults `xmlns` declarations, it removes anything
//! that looks like a prefix in tag or attribute position.

use crate::document::{NotationDocument, Raw, Repaired};
use once_cell::sync::Lazy;
use regex::Regex;

/// `<p:name` and `</p:name`.
static RE_TAG_PREFIX: Lazy<Regex> = Lazy::new(|| Regex::new(r"<(/?)\w+:").unwrap());

/// Whitespace, `p:name`, then `=` and an opening quote.
static RE_ATTR_PREFIX: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#"(\s)\w+:([\w.\-]+\s*=\s*["'])"#).unwrap());

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct RepairStats {
    pub tag_prefixes: usize,
    pub attribute_prefixes: usize,
}

impl RepairStats {
    pub fn total(&self) -> usize {
        self.tag_prefixes + self.attribute_prefixes
    }
}

/// Applies the tag rule to the whole document, then the attribute rule to
/// the result. Each rule is a single pass; replacements are not rescanned.
pub fn repair(doc: NotationDocument<Raw>) -> (NotationDocument<Repaired>, RepairStats) {
    let (text, stats) = repair_text(doc.as_str());
    (NotationDocument::from_repaired(text), stats)
}

pub fn repair_text(text: &str) -> (String, RepairStats) {
    let tag_prefixes = RE_TAG_PREFIX.find_iter(text).count();
    let tags_fixed = RE_TAG_PREFIX.replace_all(text, "<$1");

    let attribute_prefixes = RE_ATTR_PREFIX.find_iter(&tags_fixed).count();
    let repaired = RE_ATTR_PREFIX.replace_all(&tags_fixed, "$1$2").into_owned();

    (
        repaired,
        RepairStats {
            tag_prefixes,
            attribute_prefixes,
        },
    )
}
