//! Act-type normalizer (spec §4.1, C1).
//!
//! Three parallel static mappings, grounded on the `NORMATTIVA` /
//! `NORMATTIVA_SEARCH` / codified-code maps referenced by
//! `original_source/NEWVERSION/utils/text.py::normalize_act_type` and
//! `original_source/NEWVERSION/utils/urn.py::generate_urn`:
//!
//! - `CANONICAL`: free-form act name → URN type token (dotted lowercase).
//! - `SEARCH`: free-form act name → human search label, used by the date
//!   resolver (C5) to build its search-box query.
//! - `CODICI_URN`: codified-code aliases → a fully-formed URN stem that
//!   may already embed a default annex suffix.
//!
//! Normalization never fails: an unknown input is returned lowercased and
//! trimmed, unchanged otherwise (spec §4.1 "Errors").

use once_cell::sync::Lazy;
use std::collections::HashMap;

/// Treaty tokens preserved verbatim — never looked up, never lowercased.
pub const TREATY_TOKENS: [&str; 3] = ["TUE", "TFUE", "CDFUE"];

/// EU act kinds: keyed by the dotted token `normalize_act_type` actually
/// returns (see `CANONICAL`'s values), not the raw space-form aliases.
pub static EU_KINDS: Lazy<HashMap<&'static str, &'static str>> = Lazy::new(|| {
    [("regolamento.ue", "reg"), ("direttiva.ue", "dir"), ("decisione.ue", "dec")].into_iter().collect()
});

pub static CANONICAL: Lazy<HashMap<&'static str, &'static str>> = Lazy::new(|| {
    [
        ("legge", "legge"),
        ("l.", "legge"),
        ("decreto legge", "decreto.legge"),
        ("decreto-legge", "decreto.legge"),
        ("dl", "decreto.legge"),
        ("d.l.", "decreto.legge"),
        ("decreto legislativo", "decreto.legislativo"),
        ("d.lgs", "decreto.legislativo"),
        ("d.lgs.", "decreto.legislativo"),
        ("dlgs", "decreto.legislativo"),
        ("regio decreto", "regio.decreto"),
        ("r.d.", "regio.decreto"),
        ("rd", "regio.decreto"),
        ("decreto del presidente della repubblica", "decreto.del.presidente.della.repubblica"),
        ("dpr", "decreto.del.presidente.della.repubblica"),
        ("d.p.r.", "decreto.del.presidente.della.repubblica"),
        ("costituzione", "costituzione"),
        ("codice civile", "codice.civile"),
        ("codice penale", "codice.penale"),
        ("codice di procedura civile", "codice.di.procedura.civile"),
        ("codice di procedura penale", "codice.di.procedura.penale"),
        ("regolamento ue", "regolamento.ue"),
        ("regolamento", "regolamento.ue"),
        ("direttiva ue", "direttiva.ue"),
        ("direttiva", "direttiva.ue"),
        ("decisione ue", "decisione.ue"),
    ]
    .into_iter()
    .collect()
});

pub static SEARCH: Lazy<HashMap<&'static str, &'static str>> = Lazy::new(|| {
    [
        ("legge", "Legge"),
        ("decreto legge", "Decreto Legge"),
        ("decreto.legge", "Decreto Legge"),
        ("decreto legislativo", "Decreto Legislativo"),
        ("decreto.legislativo", "Decreto Legislativo"),
        ("regio decreto", "Regio Decreto"),
        ("regio.decreto", "Regio Decreto"),
        ("decreto del presidente della repubblica", "Decreto del Presidente della Repubblica"),
        ("decreto.del.presidente.della.repubblica", "Decreto del Presidente della Repubblica"),
        ("costituzione", "Costituzione"),
    ]
    .into_iter()
    .collect()
});

/// Codified-code dotted token (as returned by `normalize_act_type`) →
/// fully-formed URN stem (possibly embedding a default trailing `:N`
/// annex). The civil code's default annex and the constitution's bare
/// act-type stem are fixtures chosen to exercise the default-annex quirk
/// (spec §9); see DESIGN.md.
pub static CODICI_URN: Lazy<HashMap<&'static str, &'static str>> = Lazy::new(|| {
    [
        ("codice.civile", "regio.decreto:1942-03-16;262:2"),
        ("codice.penale", "regio.decreto:1930-10-19;1398"),
        ("codice.di.procedura.civile", "regio.decreto:1940-10-28;1443:2"),
        ("codice.di.procedura.penale", "decreto.del.presidente.della.repubblica:1988-09-22;447"),
        ("costituzione", "costituzione"),
    ]
    .into_iter()
    .collect()
});

/// Normalizes a free-form act type string. Treaty tokens pass through
/// verbatim; everything else is looked up (case/space-insensitively) in
/// `CANONICAL`, falling back to the lowercase-trimmed input.
pub fn normalize_act_type(input_type: &str) -> String {
    if TREATY_TOKENS.contains(&input_type) {
        return input_type.to_string();
    }
    let key = input_type.to_lowercase().trim().replace(' ', "");
    // CANONICAL keys are stored with spaces; try both the raw trimmed
    // lowercase form and the space-collapsed form used for lookup misses.
    let trimmed = input_type.to_lowercase();
    let trimmed = trimmed.trim();
    if let Some(&v) = CANONICAL.get(trimmed) {
        return v.to_string();
    }
    if let Some((_, &v)) = CANONICAL.iter().find(|(k, _)| k.replace(' ', "") == key) {
        return v.to_string();
    }
    trimmed.to_string()
}

/// Normalizes for use as a human search label (C5's search-box query),
/// falling back to the title-cased normalized type when no explicit
/// search label is registered.
pub fn normalize_for_search(input_type: &str) -> String {
    let normalized = normalize_act_type(input_type);
    if let Some(&label) = SEARCH.get(normalized.as_str()).or_else(|| SEARCH.get(input_type.to_lowercase().trim())) {
        return label.to_string();
    }
    title_case(&normalized.replace('.', " "))
}

fn title_case(s: &str) -> String {
    s.split_whitespace()
        .map(|w| {
            let mut c = w.chars();
            match c.next() {
                Some(first) => first.to_uppercase().collect::<String>() + c.as_str(),
                None => String::new(),
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}

/// True if `normalized_type` is one of the EU-kind tokens.
pub fn is_eu_kind(normalized_type: &str) -> bool {
    EU_KINDS.contains_key(normalized_type)
}

pub fn is_treaty(act_type: &str) -> bool {
    TREATY_TOKENS.contains(&act_type)
}
