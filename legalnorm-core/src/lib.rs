//! Data model, act-type normalization, URN construction and shared
//! configuration for the legalnorm engine.

pub mod act_type;
pub mod config;
pub mod error;
pub mod ordinal;
pub mod types;
pub mod urn;

pub use act_type::{is_eu_kind, is_treaty, normalize_act_type, normalize_for_search};
pub use config::Config;
pub use error::{LegalNormError, LegalNormResult};
pub use ordinal::{arabic_to_ordinal, extension_to_number, ordinal_to_arabic, roman_to_arabic, to_arabic};
pub use types::*;
pub use urn::{DateResolver, NoDateResolver, UrnBuilder};
