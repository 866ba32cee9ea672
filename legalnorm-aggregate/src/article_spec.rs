//! Article-specification parsing (C11, spec §4.11).
//!
//! `"2, 4-6, 9-bis"` expands to concrete article identifiers against the
//! act's tree: ranges expand by numeric base, extensions are preserved
//! verbatim and never expanded across a range.

use legalnorm_core::TreeEntry;
use std::collections::BTreeSet;

/// Expands a comma-separated article specification into concrete
/// article numbers, in the order the tree lists them, limited to the
/// numbers the spec actually requested.
pub fn expand_article_spec(spec: &str, tree: &[TreeEntry]) -> Vec<String> {
    let trimmed = spec.trim();
    let known: Vec<&str> = tree
        .iter()
        .filter_map(|e| match e {
            TreeEntry::Article { numero, .. } => Some(numero.as_str()),
            _ => None,
        })
        .collect();

    if trimmed.is_empty() {
        return known.into_iter().map(str::to_string).collect();
    }

    // Literal tokens (plain numbers or extensions like "2-bis") must match
    // the tree entry exactly; ranges match by numeric base so an
    // extension-bearing article like "5-bis" survives a "4-6" request.
    let mut literals: BTreeSet<String> = BTreeSet::new();
    let mut ranges: Vec<(u32, u32)> = Vec::new();
    for part in trimmed.split(',') {
        let part = part.trim();
        if part.is_empty() {
            continue;
        }
        if let Some((from, to)) = part.split_once('-').filter(|(_, to)| to.chars().all(|c| c.is_ascii_digit())) {
            if let (Ok(from_n), Ok(to_n)) = (from.trim().parse::<u32>(), to.trim().parse::<u32>()) {
                ranges.push((from_n, to_n));
                continue;
            }
        }
        literals.insert(part.to_string());
    }

    known
        .into_iter()
        .filter(|n| {
            literals.contains(*n)
                || numeric_base(n).map(|base| ranges.iter().any(|(from, to)| base >= *from && base <= *to)).unwrap_or(false)
        })
        .map(str::to_string)
        .collect()
}

/// Leading digits of a tree article number, stripping a trailing
/// extension (e.g. `"5-bis"` -> `Some(5)`).
fn numeric_base(numero: &str) -> Option<u32> {
    let digits: String = numero.chars().take_while(|c| c.is_ascii_digit()).collect();
    digits.parse().ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tree(numbers: &[&str]) -> Vec<TreeEntry> {
        numbers
            .iter()
            .map(|n| TreeEntry::Article { numero: n.to_string(), allegato: None, url: None })
            .collect()
    }

    #[test]
    fn empty_spec_returns_every_article() {
        let t = tree(&["1", "2", "3"]);
        assert_eq!(expand_article_spec("", &t), vec!["1", "2", "3"]);
    }

    #[test]
    fn range_expands_by_numeric_base() {
        let t = tree(&["4", "5", "6", "7"]);
        assert_eq!(expand_article_spec("4-6", &t), vec!["4", "5", "6"]);
    }

    #[test]
    fn range_preserves_extension_bearing_articles_in_range() {
        let t = tree(&["4", "5", "5-bis", "6", "7"]);
        assert_eq!(expand_article_spec("4-6", &t), vec!["4", "5", "5-bis", "6"]);
    }

    #[test]
    fn extension_is_preserved_not_expanded() {
        let t = tree(&["2", "2-bis", "3"]);
        assert_eq!(expand_article_spec("2-bis", &t), vec!["2-bis"]);
    }

    #[test]
    fn comma_list_preserves_tree_order() {
        let t = tree(&["1", "2", "3", "9"]);
        assert_eq!(expand_article_spec("9, 2", &t), vec!["2", "9"]);
    }

    #[test]
    fn requested_articles_absent_from_tree_are_dropped() {
        let t = tree(&["1", "2"]);
        assert_eq!(expand_article_spec("1, 99", &t), vec!["1"]);
    }
}
