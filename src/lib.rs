//! Library entry for decodegen components used by binary and tests.

pub mod extract;
pub mod profile;
pub mod render;
