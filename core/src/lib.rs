//! hansearch-core
//!
//! Hangul text primitives shared by the search crates:
//! - `syllable` - arithmetic codec between precomposed syllables and
//!   (choseong, jungseong, jongseong) index triples
//! - `jamo` - compatibility jamo tables and compound decomposition
//! - `choseong` - leading-consonant projection and token normalization
//! - `layout` - dubeolsik QWERTY key conversion and keyboard geometry
//! - `compose` - streaming syllable composer and string assembler
//!
//! Everything here is pure computation: no I/O, no threads, no allocation
//! beyond the returned strings.

pub mod choseong;
pub mod compose;
pub mod jamo;
pub mod layout;
pub mod syllable;

pub use choseong::{choseong, normalized_token, ChoseongOptions, WhitespacePolicy};
pub use compose::{assemble, assemble_strict, disassemble, Composer, HangulError, JamoEvent};
pub use layout::{
    convert_hangul_to_qwerty, convert_qwerty_to_hangul, key_position, substitution_cost,
};
