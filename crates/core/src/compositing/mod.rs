pub mod compositor;
pub mod overlay_asset;
