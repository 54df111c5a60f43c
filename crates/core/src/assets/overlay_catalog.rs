use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

use image::RgbaImage;
use serde::Deserialize;
use thiserror::Error;

use super::fallback::{FallbackImages, FallbackKind};
use crate::compositing::overlay_asset::{AntlerPair, OverlayAsset};
use crate::request::moose_request::OverlayNames;
use crate::shared::constants::{ASSET_MANIFEST_NAME, DEFAULT_OVERLAY_NAME};

#[derive(Error, Debug)]
pub enum AssetError {
    #[error("failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("malformed asset manifest {path}: {source}")]
    Manifest {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
    #[error("failed to decode asset {path}: {source}")]
    Image {
        path: PathBuf,
        #[source]
        source: image::ImageError,
    },
    #[error("overlay '{0}' needs a positive anchor height")]
    InvalidAnchor(String),
    #[error("the asset table has no '{0}' overlay")]
    MissingOverlay(String),
    #[error("asset {0} is an empty image")]
    EmptyImage(PathBuf),
    #[error("no {0} fallback image configured")]
    MissingFallback(FallbackKind),
    #[error("failed to encode {kind} fallback: {source}")]
    Encode {
        kind: FallbackKind,
        #[source]
        source: image::ImageError,
    },
}

#[derive(Debug, Deserialize)]
struct Manifest {
    overlays: HashMap<String, OverlayEntry>,
    antlers: AntlerEntry,
    no_face_found: PathBuf,
    fallbacks: FallbackEntries,
}

#[derive(Debug, Deserialize)]
struct OverlayEntry {
    file: PathBuf,
    anchor_left: f32,
    anchor_top: f32,
    anchor_height: f32,
}

#[derive(Debug, Deserialize)]
struct AntlerEntry {
    left: PathBuf,
    right: PathBuf,
}

#[derive(Debug, Deserialize)]
struct FallbackEntries {
    bad_source_url: PathBuf,
    bad_overlay_url: PathBuf,
    unknown_overlay_name: PathBuf,
    server_error: PathBuf,
}

/// Every static raster the service draws or serves, loaded once and read-only.
///
/// Overlay names are case-insensitive and stored lowercased.
#[derive(Debug)]
pub struct OverlayCatalog {
    overlays: HashMap<String, OverlayAsset>,
    antlers: AntlerPair,
    no_face_found: RgbaImage,
    fallbacks: FallbackImages,
}

impl OverlayCatalog {
    pub fn new(
        overlays: HashMap<String, OverlayAsset>,
        antlers: AntlerPair,
        no_face_found: RgbaImage,
        fallbacks: FallbackImages,
    ) -> Result<Self, AssetError> {
        let overlays: HashMap<String, OverlayAsset> = overlays
            .into_iter()
            .map(|(name, asset)| (name.to_ascii_lowercase(), asset))
            .collect();
        if let Some((name, _)) = overlays.iter().find(|(_, a)| a.anchor_height() <= 0.0) {
            return Err(AssetError::InvalidAnchor(name.clone()));
        }
        if !overlays.contains_key(DEFAULT_OVERLAY_NAME) {
            return Err(AssetError::MissingOverlay(DEFAULT_OVERLAY_NAME.to_string()));
        }
        Ok(Self {
            overlays,
            antlers,
            no_face_found,
            fallbacks,
        })
    }

    /// Loads `dir/overlays.json` and every raster it references.
    /// Paths in the manifest are relative to `dir`.
    pub fn load(dir: &Path) -> Result<Self, AssetError> {
        let manifest_path = dir.join(ASSET_MANIFEST_NAME);
        let raw = fs::read_to_string(&manifest_path).map_err(|source| AssetError::Io {
            path: manifest_path.clone(),
            source,
        })?;
        let manifest: Manifest =
            serde_json::from_str(&raw).map_err(|source| AssetError::Manifest {
                path: manifest_path.clone(),
                source,
            })?;

        let mut overlays = HashMap::with_capacity(manifest.overlays.len());
        for (name, entry) in manifest.overlays {
            let image = load_raster(&dir.join(&entry.file))?;
            overlays.insert(
                name,
                OverlayAsset::new(image, entry.anchor_left, entry.anchor_top, entry.anchor_height),
            );
        }

        let antlers = AntlerPair::new(
            load_raster(&dir.join(&manifest.antlers.left))?,
            load_raster(&dir.join(&manifest.antlers.right))?,
        );
        let no_face_found = load_raster(&dir.join(&manifest.no_face_found))?;

        let entries = &manifest.fallbacks;
        let mut fallback_images = HashMap::new();
        for (kind, file) in [
            (FallbackKind::BadSourceUrl, &entries.bad_source_url),
            (FallbackKind::BadOverlayUrl, &entries.bad_overlay_url),
            (FallbackKind::UnknownOverlayName, &entries.unknown_overlay_name),
            (FallbackKind::ServerError, &entries.server_error),
        ] {
            fallback_images.insert(kind, load_raster(&dir.join(file))?);
        }
        let fallbacks = FallbackImages::encode(fallback_images)?;

        let catalog = Self::new(overlays, antlers, no_face_found, fallbacks)?;
        log::info!(
            "Loaded {} overlay(s) from {}: {}",
            catalog.overlays.len(),
            dir.display(),
            catalog.names().join(", ")
        );
        Ok(catalog)
    }

    pub fn overlay(&self, name: &str) -> Option<&OverlayAsset> {
        self.overlays.get(&name.to_ascii_lowercase())
    }

    /// Overlay names in sorted order.
    pub fn names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.overlays.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }

    pub fn antlers(&self) -> &AntlerPair {
        &self.antlers
    }

    pub fn no_face_found(&self) -> &RgbaImage {
        &self.no_face_found
    }

    pub fn fallbacks(&self) -> &FallbackImages {
        &self.fallbacks
    }
}

impl OverlayNames for OverlayCatalog {
    fn has_overlay(&self, name: &str) -> bool {
        self.overlay(name).is_some()
    }
}

fn load_raster(path: &Path) -> Result<RgbaImage, AssetError> {
    let image = image::open(path)
        .map_err(|source| AssetError::Image {
            path: path.to_path_buf(),
            source,
        })?
        .to_rgba8();
    if image.width() == 0 || image.height() == 0 {
        return Err(AssetError::EmptyImage(path.to_path_buf()));
    }
    Ok(image)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support;
    use tempfile::TempDir;

    const MANIFEST: &str = r#"{
        "overlays": {
            "Moose": { "file": "moose.png", "anchor_left": 138, "anchor_top": 120, "anchor_height": 115 },
            "bullwinkle": { "file": "moose.png", "anchor_left": 10, "anchor_top": 12, "anchor_height": 40 }
        },
        "antlers": { "left": "antler-left.png", "right": "antler-right.png" },
        "no_face_found": "no-face.png",
        "fallbacks": {
            "bad_source_url": "fallback.png",
            "bad_overlay_url": "fallback.png",
            "unknown_overlay_name": "fallback.png",
            "server_error": "fallback.png"
        }
    }"#;

    fn write_asset_dir(manifest: &str) -> TempDir {
        let dir = TempDir::new().unwrap();
        for (name, w, h) in [
            ("moose.png", 40, 30),
            ("antler-left.png", 8, 16),
            ("antler-right.png", 8, 16),
            ("no-face.png", 20, 10),
            ("fallback.png", 5, 5),
        ] {
            RgbaImage::from_pixel(w, h, image::Rgba([9, 9, 9, 255]))
                .save(dir.path().join(name))
                .unwrap();
        }
        fs::write(dir.path().join(ASSET_MANIFEST_NAME), manifest).unwrap();
        dir
    }

    #[test]
    fn test_load_reads_manifest_and_rasters() {
        let dir = write_asset_dir(MANIFEST);
        let catalog = OverlayCatalog::load(dir.path()).unwrap();

        assert_eq!(catalog.names(), vec!["bullwinkle", "moose"]);
        assert_eq!(catalog.overlay("MOOSE").unwrap().image().dimensions(), (40, 30));
        assert_eq!(catalog.antlers().right().dimensions(), (8, 16));
        assert_eq!(catalog.no_face_found().dimensions(), (20, 10));
        assert!(!catalog.fallbacks().png(FallbackKind::ServerError).is_empty());
        assert!(catalog.has_overlay("Bullwinkle"));
        assert!(!catalog.has_overlay("rudolph"));
    }

    #[test]
    fn test_missing_manifest_is_io_error() {
        let dir = TempDir::new().unwrap();
        assert!(matches!(
            OverlayCatalog::load(dir.path()),
            Err(AssetError::Io { .. })
        ));
    }

    #[test]
    fn test_malformed_manifest_is_reported() {
        let dir = write_asset_dir("{ \"overlays\": 3 }");
        assert!(matches!(
            OverlayCatalog::load(dir.path()),
            Err(AssetError::Manifest { .. })
        ));
    }

    #[test]
    fn test_missing_raster_names_the_file() {
        let dir = write_asset_dir(MANIFEST);
        fs::remove_file(dir.path().join("no-face.png")).unwrap();
        let err = OverlayCatalog::load(dir.path()).unwrap_err();
        assert!(matches!(err, AssetError::Image { ref path, .. } if path.ends_with("no-face.png")));
    }

    #[test]
    fn test_stock_moose_is_required() {
        let manifest = MANIFEST.replace("\"Moose\"", "\"elk\"");
        let dir = write_asset_dir(&manifest);
        assert!(matches!(
            OverlayCatalog::load(dir.path()),
            Err(AssetError::MissingOverlay(name)) if name == "moose"
        ));
    }

    #[test]
    fn test_zero_anchor_height_is_rejected() {
        let manifest = MANIFEST.replace("\"anchor_height\": 40", "\"anchor_height\": 0");
        let dir = write_asset_dir(&manifest);
        assert!(matches!(
            OverlayCatalog::load(dir.path()),
            Err(AssetError::InvalidAnchor(name)) if name == "bullwinkle"
        ));
    }

    #[test]
    fn test_programmatic_catalog_lowercases_names() {
        let catalog = test_support::catalog();
        assert!(catalog.overlay("moose").is_some());
        assert!(catalog.overlay("Moose").is_some());
    }
}
