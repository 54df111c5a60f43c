use std::fmt;

use reqwest::Url;
use serde::Deserialize;
use thiserror::Error;

use crate::assets::fallback::FallbackKind;
use crate::shared::constants::DEFAULT_OVERLAY_NAME;

/// Why an inbound request could not be turned into a [`MooseRequest`].
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValidationError {
    #[error("missing moose request type")]
    MissingKind,
    #[error("missing source URL")]
    MissingSourceUrl,
    #[error("invalid source URL")]
    InvalidSourceUrl,
    #[error("missing moose name")]
    MissingOverlayName,
    #[error("invalid moose name")]
    InvalidOverlayName,
    #[error("missing re-moose URL")]
    MissingOverlayUrl,
    #[error("invalid re-moose URL")]
    InvalidOverlayUrl,
}

impl ValidationError {
    /// The static image served in place of a result for this error.
    pub fn fallback_kind(&self) -> FallbackKind {
        match self {
            Self::MissingKind => FallbackKind::ServerError,
            Self::MissingSourceUrl | Self::InvalidSourceUrl => FallbackKind::BadSourceUrl,
            Self::MissingOverlayName | Self::InvalidOverlayName => FallbackKind::UnknownOverlayName,
            Self::MissingOverlayUrl | Self::InvalidOverlayUrl => FallbackKind::BadOverlayUrl,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum RequestKind {
    /// Antlers on every face.
    Antler,
    /// The stock moose head on every face.
    Moose,
    /// A catalog overlay chosen by name.
    Named,
    /// A face cut out of another image, pasted on every face, then antlered.
    ReMoose,
}

impl RequestKind {
    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "antler" | "antlers" => Some(Self::Antler),
            "moose" => Some(Self::Moose),
            "named" => Some(Self::Named),
            "remoose" | "re_moose" | "re-moose" => Some(Self::ReMoose),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Antler => "antler",
            Self::Moose => "moose",
            Self::Named => "named",
            Self::ReMoose => "remoose",
        }
    }

    pub fn draws_antlers(&self) -> bool {
        matches!(self, Self::Antler | Self::ReMoose)
    }
}

impl fmt::Display for RequestKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Which overlay, if any, goes on each face. Exactly one variant is active.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum OverlaySelection {
    None,
    Named(String),
    Url(Url),
}

/// Untyped query input, exactly as received.
#[derive(Clone, Debug, Default, Deserialize)]
pub struct RawRequest {
    pub kind: Option<String>,
    pub image: Option<String>,
    pub name: Option<String>,
    pub overlay: Option<String>,
    pub debug: Option<String>,
}

/// Lookup of overlay names that exist in the loaded asset table.
pub trait OverlayNames {
    fn has_overlay(&self, name: &str) -> bool;
}

/// A fully validated request. Doubles as the result cache key.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct MooseRequest {
    kind: RequestKind,
    source: Url,
    overlay: OverlaySelection,
    debug: bool,
}

impl MooseRequest {
    /// Validates `raw` in a fixed order: kind, source URL, then the
    /// kind-specific overlay requirements.
    pub fn build<N>(raw: &RawRequest, overlays: &N) -> Result<Self, ValidationError>
    where
        N: OverlayNames + ?Sized,
    {
        let kind = non_blank(&raw.kind)
            .and_then(RequestKind::parse)
            .ok_or(ValidationError::MissingKind)?;

        let source = non_blank(&raw.image).ok_or(ValidationError::MissingSourceUrl)?;
        let source = parse_web_url(source).ok_or(ValidationError::InvalidSourceUrl)?;

        let overlay = match kind {
            RequestKind::Antler => OverlaySelection::None,
            RequestKind::Moose => known_name(DEFAULT_OVERLAY_NAME, overlays)?,
            RequestKind::Named => {
                let name = non_blank(&raw.name).ok_or(ValidationError::MissingOverlayName)?;
                known_name(name, overlays)?
            }
            RequestKind::ReMoose => {
                let url = non_blank(&raw.overlay).ok_or(ValidationError::MissingOverlayUrl)?;
                OverlaySelection::Url(parse_web_url(url).ok_or(ValidationError::InvalidOverlayUrl)?)
            }
        };

        Ok(Self {
            kind,
            source,
            overlay,
            debug: parse_debug(raw.debug.as_deref()),
        })
    }

    pub fn kind(&self) -> RequestKind {
        self.kind
    }

    pub fn source(&self) -> &Url {
        &self.source
    }

    pub fn overlay(&self) -> &OverlaySelection {
        &self.overlay
    }

    pub fn debug(&self) -> bool {
        self.debug
    }
}

fn non_blank(value: &Option<String>) -> Option<&str> {
    value.as_deref().map(str::trim).filter(|v| !v.is_empty())
}

/// Only absolute http(s) URLs with a host are fetchable.
fn parse_web_url(raw: &str) -> Option<Url> {
    let url = Url::parse(raw).ok()?;
    let web = matches!(url.scheme(), "http" | "https") && url.has_host();
    web.then_some(url)
}

fn known_name<N>(name: &str, overlays: &N) -> Result<OverlaySelection, ValidationError>
where
    N: OverlayNames + ?Sized,
{
    let name = name.to_ascii_lowercase();
    if overlays.has_overlay(&name) {
        Ok(OverlaySelection::Named(name))
    } else {
        Err(ValidationError::InvalidOverlayName)
    }
}

fn parse_debug(raw: Option<&str>) -> bool {
    raw.is_some_and(|v| v.eq_ignore_ascii_case("true") || v.eq_ignore_ascii_case("y"))
}
