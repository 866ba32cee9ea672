//! Source-specific HTML extraction (C6-C10): Normattiva's AKN-dialect
//! article bodies and amendment history, EUR-Lex's WAF-gated article
//! pages, Brocardi's supplementary commentary, and the tree extractors
//! for both Italian and EU sources.

pub mod amendments;
pub mod brocardi;
pub mod eurlex;
pub mod normattiva;
pub mod text_walker;
pub mod tree;

pub use amendments::{extract_amendment_history, DestinationParser, LlmDestination, NullDestinationParser};
pub use brocardi::{lookup_section_url, BrocardiResolver};
pub use eurlex::EurLexExtractor;
pub use normattiva::{extract_article, with_version_suffix};
pub use text_walker::extract_text;
pub use tree::{extract_eurlex_tree, extract_normattiva_tree};
