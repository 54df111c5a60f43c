use std::collections::HashMap;
use std::fmt;

use bytes::Bytes;
use image::RgbaImage;

use super::overlay_catalog::AssetError;
use crate::media::infrastructure::image_codec::encode_png;

/// The static images served instead of a computed result.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum FallbackKind {
    BadSourceUrl,
    BadOverlayUrl,
    UnknownOverlayName,
    ServerError,
}

impl FallbackKind {
    pub const ALL: [FallbackKind; 4] = [
        Self::BadSourceUrl,
        Self::BadOverlayUrl,
        Self::UnknownOverlayName,
        Self::ServerError,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::BadSourceUrl => "bad_source_url",
            Self::BadOverlayUrl => "bad_overlay_url",
            Self::UnknownOverlayName => "unknown_overlay_name",
            Self::ServerError => "server_error",
        }
    }
}

impl fmt::Display for FallbackKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Fallback images, PNG-encoded once at startup.
#[derive(Clone, Debug)]
pub struct FallbackImages {
    encoded: HashMap<FallbackKind, Bytes>,
}

impl FallbackImages {
    /// Encodes one image per kind. Every kind must be present.
    pub fn encode(images: HashMap<FallbackKind, RgbaImage>) -> Result<Self, AssetError> {
        let mut encoded = HashMap::with_capacity(FallbackKind::ALL.len());
        for kind in FallbackKind::ALL {
            let image = images.get(&kind).ok_or(AssetError::MissingFallback(kind))?;
            let png = encode_png(image).map_err(|source| AssetError::Encode { kind, source })?;
            encoded.insert(kind, Bytes::from(png));
        }
        Ok(Self { encoded })
    }

    pub fn png(&self, kind: FallbackKind) -> Bytes {
        self.encoded.get(&kind).cloned().unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn all_kinds() -> HashMap<FallbackKind, RgbaImage> {
        FallbackKind::ALL
            .into_iter()
            .enumerate()
            .map(|(i, k)| (k, RgbaImage::new(i as u32 + 1, 1)))
            .collect()
    }

    #[test]
    fn test_every_kind_is_encoded_as_png() {
        let fallbacks = FallbackImages::encode(all_kinds()).unwrap();
        for (i, kind) in FallbackKind::ALL.into_iter().enumerate() {
            let decoded = image::load_from_memory(&fallbacks.png(kind)).unwrap();
            assert_eq!(decoded.width(), i as u32 + 1);
        }
    }

    #[test]
    fn test_missing_kind_is_rejected() {
        let mut images = all_kinds();
        images.remove(&FallbackKind::BadOverlayUrl);
        let err = FallbackImages::encode(images).unwrap_err();
        assert!(matches!(err, AssetError::MissingFallback(FallbackKind::BadOverlayUrl)));
    }

    #[test]
    fn test_kind_names_match_manifest_keys() {
        let names: Vec<_> = FallbackKind::ALL.iter().map(FallbackKind::as_str).collect();
        assert_eq!(
            names,
            ["bad_source_url", "bad_overlay_url", "unknown_overlay_name", "server_error"]
        );
    }
}
