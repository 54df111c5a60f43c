pub mod fallback;
pub mod overlay_catalog;
