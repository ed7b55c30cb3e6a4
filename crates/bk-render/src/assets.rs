//! Image source resolution.
//!
//! Loading a remote image is asynchronous and lives outside the renderer.
//! The host feeds finished downloads into an [`AssetCache`]; until then a
//! source is [`AssetState::Pending`] and its node draws nothing.

use base64::Engine as _;
use base64::engine::general_purpose::STANDARD as BASE64;
use std::collections::HashMap;

#[derive(Debug, Clone, PartialEq)]
pub enum AssetState {
    /// An href the SVG rasterizer can load directly (a data URI).
    Ready(String),
    Pending,
    Failed(String),
}

pub trait AssetResolver {
    fn resolve(&self, src: &str) -> AssetState;
}

#[derive(Debug, Default, Clone)]
pub struct AssetCache {
    entries: HashMap<String, AssetState>,
}

impl AssetCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store downloaded bytes for `url`. Undecodable bytes mark it failed.
    pub fn insert_bytes(&mut self, url: &str, bytes: &[u8]) {
        let state = match image::guess_format(bytes) {
            Ok(format) => {
                let mime = format.to_mime_type();
                AssetState::Ready(format!("data:{mime};base64,{}", BASE64.encode(bytes)))
            }
            Err(_) if looks_like_svg(bytes) => AssetState::Ready(format!(
                "data:image/svg+xml;base64,{}",
                BASE64.encode(bytes)
            )),
            Err(e) => AssetState::Failed(e.to_string()),
        };
        self.entries.insert(url.to_string(), state);
    }

    pub fn mark_failed(&mut self, url: &str, reason: &str) {
        self.entries
            .insert(url.to_string(), AssetState::Failed(reason.to_string()));
    }

    pub fn is_loaded(&self, url: &str) -> bool {
        matches!(self.entries.get(url), Some(AssetState::Ready(_)))
    }
}

fn looks_like_svg(bytes: &[u8]) -> bool {
    let head = &bytes[..bytes.len().min(256)];
    String::from_utf8_lossy(head).contains("<svg")
}

impl AssetResolver for AssetCache {
    fn resolve(&self, src: &str) -> AssetState {
        let src = src.trim();
        if src.is_empty() {
            return AssetState::Failed("empty image source".into());
        }
        if src.starts_with("data:") {
            return AssetState::Ready(src.to_string());
        }
        self.entries.get(src).cloned().unwrap_or(AssetState::Pending)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const PNG_MAGIC: &[u8] = &[0x89, b'P', b'N', b'G', 0x0D, 0x0A, 0x1A, 0x0A, 0, 0];

    #[test]
    fn data_uris_are_ready() {
        let cache = AssetCache::new();
        assert!(matches!(cache.resolve("data:image/png;base64,AAAA"), AssetState::Ready(_)));
        assert_eq!(cache.resolve("https://cdn.example.com/a.png"), AssetState::Pending);
        assert!(matches!(cache.resolve(""), AssetState::Failed(_)));
    }

    #[test]
    fn inserted_bytes_become_data_uris() {
        let mut cache = AssetCache::new();
        cache.insert_bytes("logo.png", PNG_MAGIC);
        let AssetState::Ready(href) = cache.resolve("logo.png") else {
            panic!("expected ready");
        };
        assert!(href.starts_with("data:image/png;base64,"));
        cache.insert_bytes("junk", b"not an image");
        assert!(matches!(cache.resolve("junk"), AssetState::Failed(_)));
    }
}
