//! Thumbnail rendering collaborator interface.
//!
//! Page previews are produced by an external rendering engine. The core only
//! depends on this trait; hosts bind whatever engine their platform offers
//! and tests use a deterministic stub.

use serde::Serialize;

/// A cached page preview.
///
/// Thumbnails are rendered once at ingestion from the unrotated page and
/// never regenerated: rotation is applied by consumers as a display
/// transform and again at export time, so the pixel data here is always
/// upright with respect to the source page.
#[derive(Debug, Clone, Serialize)]
pub struct Thumbnail {
    /// Encoded image bytes as produced by the renderer.
    #[serde(skip_serializing)]
    pub bytes: Vec<u8>,
    /// Pixel width of the preview.
    pub width: u32,
    /// Pixel height of the preview.
    pub height: u32,
}

impl Thumbnail {
    /// Create a thumbnail from encoded image bytes and pixel dimensions.
    pub fn new(bytes: Vec<u8>, width: u32, height: u32) -> Self {
        Self {
            bytes,
            width,
            height,
        }
    }
}

/// External rendering engine, treated as a pure function of
/// `(document bytes, page index)`.
pub trait ThumbnailRenderer {
    /// Render one page of `document` scaled to `target_width` pixels.
    ///
    /// Implementations must preserve the page's aspect ratio and composite
    /// an opaque white background under transparent content. `page_index`
    /// is zero-based.
    fn render_page(
        &self,
        document: &[u8],
        page_index: usize,
        target_width: u32,
    ) -> anyhow::Result<Thumbnail>;
}
