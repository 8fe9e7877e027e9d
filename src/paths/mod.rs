//! Helpers for normalising module paths and turning them into registry keys.
//!
//! Lexical normalisation, key construction and specifier classification live in separate
//! submodules so the extractor, resolver and registry all agree on one spelling of a path.

mod keys;
mod normalize;
mod specifiers;

pub use keys::{registry_key, strip_script_extension};
pub use normalize::{join_segments, normalize_lexically};
pub use specifiers::{is_external_specifier, is_relative_specifier};
