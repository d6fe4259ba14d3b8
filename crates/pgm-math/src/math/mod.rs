//! Core math modules.

pub mod scale;
pub mod stable;
