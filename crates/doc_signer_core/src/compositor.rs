//! crates/doc_signer_core/src/compositor.rs
//!
//! The burn-in engine: permanently rasterizes every filled field value
//! onto its page image. Pages proceed in parallel and independently; the
//! overall operation completes only when every page has emitted its final
//! raster. Within one page, text fields are always drawn before any image
//! field, and image fields draw in field-list order once all of the
//! page's payloads have finished decoding.

use crate::domain::{Document, Field, PageImage};
use crate::geometry::{self, RasterScale};
use crate::signature::data_uri;
use image::imageops::{self, FilterType};
use image::Rgba;
use imageproc::drawing::draw_text_mut;
use rusttype::{Font, Scale};
use tokio::task::JoinSet;
use tracing::warn;

/// Fixed size for burned-in text values.
pub const BURN_TEXT_SIZE: f32 = 24.0;

const BURN_TEXT_COLOR: Rgba<u8> = Rgba([0, 0, 0, 255]);

/// Compositing failures. An individual field payload that cannot be
/// decoded is not an error (that field is skipped), but a page whose
/// base raster cannot be decoded is fatal for the whole run.
#[derive(Debug, thiserror::Error)]
pub enum CompositeError {
    #[error("Page {page_number}: base image could not be decoded: {reason}")]
    PageDecode { page_number: u32, reason: String },

    #[error("Page {page_number}: composited raster could not be encoded: {reason}")]
    PageEncode { page_number: u32, reason: String },

    #[error("Page {page_number} has text fields to burn but no font is configured")]
    FontUnavailable { page_number: u32 },

    #[error("Compositing task failed: {0}")]
    Join(String),
}

/// Burns field values into page rasters. Borrows the document read-only
/// and emits fresh [`PageImage`]s; ownership of the updated pages is the
/// caller's to hand back to the document.
#[derive(Clone)]
pub struct Compositor {
    scale: RasterScale,
    font: Option<Font<'static>>,
}

impl Compositor {
    pub fn new(scale: RasterScale) -> Self {
        Self { scale, font: None }
    }

    /// Supplies the font used for TEXT/DATE/NUMBER values. Required when
    /// any such field carries a value.
    pub fn with_font(mut self, font: Font<'static>) -> Self {
        self.font = Some(font);
        self
    }

    /// Composites every page of the document. Pages decode and render in
    /// parallel; the result is ordered by page number. There is no
    /// mid-flight cancellation: the operation runs to completion or to
    /// the first fatal page failure.
    pub async fn composite(&self, document: &Document) -> Result<Vec<PageImage>, CompositeError> {
        let mut tasks = JoinSet::new();
        for page in &document.pages {
            let fields: Vec<Field> = document
                .fields_on_page(page.page_number)
                .filter(|f| f.has_value())
                .cloned()
                .collect();
            tasks.spawn(burn_page(page.clone(), fields, self.scale, self.font.clone()));
        }

        let mut pages = Vec::with_capacity(document.pages.len());
        while let Some(joined) = tasks.join_next().await {
            let page = joined.map_err(|e| CompositeError::Join(e.to_string()))??;
            pages.push(page);
        }
        pages.sort_by_key(|p| p.page_number);
        Ok(pages)
    }
}

async fn burn_page(
    page: PageImage,
    fields: Vec<Field>,
    scale: RasterScale,
    font: Option<Font<'static>>,
) -> Result<PageImage, CompositeError> {
    let page_number = page.page_number;

    // Decoding the base raster is the page's first suspension point;
    // nothing below runs until it lands.
    let base_url = page.image_url.clone();
    let base = tokio::task::spawn_blocking(move || data_uri::decode_image(&base_url))
        .await
        .map_err(|e| CompositeError::Join(e.to_string()))?
        .map_err(|e| CompositeError::PageDecode {
            page_number,
            reason: e.to_string(),
        })?;
    let mut canvas = base.to_rgba8();
    let (page_w, page_h) = (canvas.width(), canvas.height());

    let (text_fields, image_fields): (Vec<&Field>, Vec<&Field>) =
        fields.iter().partition(|f| !f.kind.is_image());

    // Text values never need a secondary load and always land first, so
    // image fields may overlap text but never the other way around.
    if !text_fields.is_empty() {
        let font = font.ok_or(CompositeError::FontUnavailable { page_number })?;
        for field in &text_fields {
            let rect = geometry::field_pixel_rect(field, page_w, page_h, scale);
            if let Some(value) = &field.value {
                draw_text_mut(
                    &mut canvas,
                    BURN_TEXT_COLOR,
                    rect.x as i32,
                    rect.y as i32,
                    Scale::uniform(BURN_TEXT_SIZE),
                    &font,
                    value.trim(),
                );
            }
        }
    }

    // Every image payload on the page decodes concurrently, and drawing
    // waits for all of them; a failed decode still counts as loaded so a
    // bad payload can never stall the page.
    let decodes = image_fields.iter().map(|field| {
        let payload = field.value.clone().unwrap_or_default();
        tokio::task::spawn_blocking(move || data_uri::decode_image(&payload))
    });
    let decoded = futures::future::join_all(decodes).await;

    for (field, outcome) in image_fields.iter().zip(decoded) {
        let image = match outcome {
            Ok(Ok(image)) => image,
            Ok(Err(e)) => {
                warn!(page_number, field = %field.id, error = %e, "skipping undecodable field value");
                continue;
            }
            Err(e) => {
                warn!(page_number, field = %field.id, error = %e, "skipping field whose decode task failed");
                continue;
            }
        };
        let rect = geometry::field_pixel_rect(field, page_w, page_h, scale);
        let target_w = (rect.width.round() as u32).max(1);
        let target_h = (rect.height.round() as u32).max(1);
        let resized = imageops::resize(&image.to_rgba8(), target_w, target_h, FilterType::Triangle);
        imageops::overlay(&mut canvas, &resized, rect.x as i64, rect.y as i64);
    }

    let encoded = tokio::task::spawn_blocking(move || data_uri::encode_png(&canvas))
        .await
        .map_err(|e| CompositeError::Join(e.to_string()))?
        .map_err(|e| CompositeError::PageEncode {
            page_number,
            reason: e.to_string(),
        })?;

    Ok(PageImage {
        page_number,
        image_url: encoded,
        width: page_w,
        height: page_h,
    })
}
