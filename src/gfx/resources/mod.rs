//! Per-material shader sources

pub mod material;

// Re-export main types
pub use material::MaterialList;
