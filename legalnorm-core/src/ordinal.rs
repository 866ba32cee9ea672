//! Italian ordinal words, Roman numerals and Latin extension numerals
//! (spec §4.1, C1).
//!
//! Grounded on `original_source/NEWVERSION/utils/ordinals.py`: ordinals
//! `primo`..`cinquantesimo` map to 1..50, and the combined matcher tries
//! ordinals before Roman numerals so `"ventesimo"` never matches the `V`
//! in the Roman pattern.

use once_cell::sync::Lazy;
use regex::Regex;
use std::collections::HashMap;

static ORDINALI_TO_ARABIC: Lazy<HashMap<&'static str, u32>> = Lazy::new(|| {
    [
        ("primo", 1), ("secondo", 2), ("terzo", 3), ("quarto", 4), ("quinto", 5),
        ("sesto", 6), ("settimo", 7), ("ottavo", 8), ("nono", 9), ("decimo", 10),
        ("undicesimo", 11), ("dodicesimo", 12), ("tredicesimo", 13), ("quattordicesimo", 14),
        ("quindicesimo", 15), ("sedicesimo", 16), ("diciassettesimo", 17), ("diciottesimo", 18),
        ("diciannovesimo", 19), ("ventesimo", 20), ("ventunesimo", 21), ("ventiduesimo", 22),
        ("ventitreesimo", 23), ("ventiquattresimo", 24), ("venticinquesimo", 25),
        ("ventiseiesimo", 26), ("ventisettesimo", 27), ("ventottesimo", 28), ("ventinovesimo", 29),
        ("trentesimo", 30), ("trentunesimo", 31), ("trentaduesimo", 32), ("trentatreesimo", 33),
        ("trentaquattresimo", 34), ("trentacinquesimo", 35), ("trentaseiesimo", 36),
        ("trentasettesimo", 37), ("trentottesimo", 38), ("trentanovesimo", 39),
        ("quarantesimo", 40), ("quarantunesimo", 41), ("quarantaduesimo", 42),
        ("quarantatreesimo", 43), ("quarantaquattresimo", 44), ("quarantacinquesimo", 45),
        ("quarantaseiesimo", 46), ("quarantasettesimo", 47), ("quarantottesimo", 48),
        ("quarantanovesimo", 49), ("cinquantesimo", 50),
    ]
    .into_iter()
    .collect()
});

static ARABIC_TO_ORDINALI: Lazy<HashMap<u32, &'static str>> =
    Lazy::new(|| ORDINALI_TO_ARABIC.iter().map(|(&k, &v)| (v, k)).collect());

/// Italian ordinal word → arabic number (1..50).
pub fn ordinal_to_arabic(ordinal: &str) -> Option<u32> {
    ORDINALI_TO_ARABIC.get(ordinal.to_lowercase().as_str()).copied()
}

pub fn arabic_to_ordinal(num: u32) -> Option<&'static str> {
    ARABIC_TO_ORDINALI.get(&num).copied()
}

/// Roman numeral → arabic number. Unrecognized characters are ignored,
/// mirroring the permissive behavior of the source.
pub fn roman_to_arabic(roman: &str) -> u32 {
    let value = |c: char| -> i64 {
        match c {
            'I' => 1,
            'V' => 5,
            'X' => 10,
            'L' => 50,
            'C' => 100,
            'D' => 500,
            'M' => 1000,
            _ => 0,
        }
    };
    let mut result: i64 = 0;
    let mut prev: i64 = 0;
    for ch in roman.to_uppercase().chars().rev() {
        let curr = value(ch);
        if curr < prev {
            result -= curr;
        } else {
            result += curr;
        }
        prev = curr;
    }
    result.max(0) as u32
}

/// Combined entry point: tries the Italian ordinal mapping first, then
/// falls back to Roman numeral parsing.
pub fn to_arabic(value: &str) -> Option<u32> {
    if let Some(n) = ordinal_to_arabic(value) {
        return Some(n);
    }
    if value.chars().all(|c| "IVXLCDMivxlcdm".contains(c)) && !value.is_empty() {
        Some(roman_to_arabic(value))
    } else {
        None
    }
}

/// Regex matching either an ordinal word or a Roman numeral, ordinals
/// first so e.g. `ventesimo` is not partially consumed by `[IVXLCDM]+`.
pub static ROMAN_OR_ORDINAL_PATTERN: Lazy<Regex> = Lazy::new(|| {
    let ordinal_alt = ORDINALI_TO_ARABIC.keys().copied().collect::<Vec<_>>().join("|");
    Regex::new(&format!(r"(?i)(?:{}|[IVXLCDM]+)", ordinal_alt)).unwrap()
});

/// Latin extension numerals (spec §4.1): `bis`, `ter`, … up to
/// `undequinquagies`, mapping article-numbering suffixes to 2..49.
/// Grounded on `original_source/NEWVERSION/utils/text.py::estrai_numero_da_estensione`.
static EXTENSION_TO_NUMBER: Lazy<HashMap<&'static str, u32>> = Lazy::new(|| {
    [
        ("bis", 2), ("tris", 3), ("ter", 3), ("quater", 4), ("quinquies", 5),
        ("quinques", 5), ("sexies", 6), ("septies", 7), ("octies", 8), ("novies", 9),
        ("decies", 10), ("undecies", 11), ("duodecies", 12), ("terdecies", 13),
        ("quaterdecies", 14), ("quindecies", 15), ("sexdecies", 16), ("septiesdecies", 17),
        ("duodevicies", 18), ("undevicies", 19), ("vices", 20), ("vicessemel", 21),
        ("vicesbis", 22), ("vicester", 23), ("vicesquater", 24), ("vicesquinquies", 25),
        ("vicessexies", 26), ("vicessepties", 27), ("duodetricies", 28), ("undetricies", 29),
        ("tricies", 30), ("triciessemel", 31), ("triciesbis", 32), ("triciester", 33),
        ("triciesquater", 34), ("triciesquinquies", 35), ("triciessexies", 36),
        ("triciessepties", 37), ("duodequadragies", 38), ("undequadragies", 39),
        ("quadragies", 40), ("quadragiessemel", 41), ("quadragiesbis", 42),
        ("quadragiester", 43), ("quadragiesquater", 44), ("quadragiesquinquies", 45),
        ("quadragiessexies", 46), ("quadragiessepties", 47), ("duodequinquagies", 48),
        ("undequinquagies", 49),
    ]
    .into_iter()
    .collect()
});

/// Extracts the numeric value of an article extension (e.g. `"bis"` →
/// 2); returns 0 for an unrecognized or absent extension.
pub fn extension_to_number(extension: Option<&str>) -> u32 {
    extension
        .and_then(|e| EXTENSION_TO_NUMBER.get(e.to_lowercase().as_str()).copied())
        .unwrap_or(0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ordinals_roundtrip() {
        assert_eq!(ordinal_to_arabic("primo"), Some(1));
        assert_eq!(ordinal_to_arabic("quarantesimo"), Some(40));
        assert_eq!(arabic_to_ordinal(1), Some("primo"));
        assert_eq!(arabic_to_ordinal(40), Some("quarantesimo"));
    }

    #[test]
    fn roman_numerals() {
        assert_eq!(roman_to_arabic("IV"), 4);
        assert_eq!(roman_to_arabic("XIV"), 14);
        assert_eq!(roman_to_arabic("XLII"), 42);
    }

    #[test]
    fn to_arabic_prefers_ordinal_over_roman() {
        // "ventesimo" must not be mistaken for a Roman-numeral fragment.
        assert_eq!(to_arabic("ventesimo"), Some(20));
        assert_eq!(to_arabic("V"), Some(5));
        assert_eq!(to_arabic("quarto"), Some(4));
        assert_eq!(to_arabic("nonsense-word"), None);
    }

    #[test]
    fn extensions() {
        assert_eq!(extension_to_number(Some("bis")), 2);
        assert_eq!(extension_to_number(Some("ter")), 3);
        assert_eq!(extension_to_number(Some("undequinquagies")), 49);
        assert_eq!(extension_to_number(None), 0);
        assert_eq!(extension_to_number(Some("unknown")), 0);
    }
}
