//! crates/doc_signer_core/src/signature.rs
//!
//! The three capture modes a signer can use to produce a field value:
//! freehand drawing, image upload and rendered typed text. All three
//! terminate in a `save()` that yields the same contract (an encoded
//! raster as a PNG data URI), so the compositor never knows which mode
//! produced a value.

use crate::error::{DomainError, DomainResult};
use crate::geometry::Point;
use image::{Rgba, RgbaImage};
use imageproc::drawing::{draw_filled_circle_mut, draw_line_segment_mut, draw_text_mut};
use rusttype::{Font, Scale};

/// Capture canvas dimensions, matching the editing surface.
pub const PAD_WIDTH: u32 = 500;
pub const PAD_HEIGHT: u32 = 200;

/// Freehand stroke width in pixels.
pub const STROKE_WIDTH: f32 = 2.0;

/// Upload size ceiling.
pub const MAX_UPLOAD_BYTES: usize = 10 * 1024 * 1024;

/// Adjustable size range for typed signatures.
pub const TYPED_SIZE_MIN: f32 = 20.0;
pub const TYPED_SIZE_MAX: f32 = 120.0;

const INK: Rgba<u8> = Rgba([0, 0, 0, 255]);
const BLANK: Rgba<u8> = Rgba([0, 0, 0, 0]);

/// A pointer position reported by the capture surface. Mouse/pointer and
/// touch events are normalized into one `(x, y)` here, at the capture
/// boundary, instead of being branched on downstream.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum PadInput {
    Pointer(Point),
    Touch(Point),
}

impl PadInput {
    pub fn position(self) -> Point {
        match self {
            PadInput::Pointer(p) | PadInput::Touch(p) => p,
        }
    }
}

/// Freehand signature capture: a sequence of pointer-drag strokes
/// rendered onto a transparent raster with a fixed stroke width and
/// round caps and joins.
pub struct SignaturePad {
    canvas: RgbaImage,
    last: Option<Point>,
    dirty: bool,
}

impl SignaturePad {
    pub fn new() -> Self {
        Self {
            canvas: RgbaImage::from_pixel(PAD_WIDTH, PAD_HEIGHT, BLANK),
            last: None,
            dirty: false,
        }
    }

    /// Starts a stroke at the given position.
    pub fn begin(&mut self, input: PadInput) {
        let p = input.position();
        self.stamp(p);
        self.last = Some(p);
        self.dirty = true;
    }

    /// Extends the current stroke. Ignored when no stroke is active.
    pub fn extend(&mut self, input: PadInput) {
        let Some(from) = self.last else { return };
        let to = input.position();
        draw_line_segment_mut(&mut self.canvas, (from.x, from.y), (to.x, to.y), INK);
        // stamped disks along the segment give the round cap/join
        let steps = ((to.x - from.x).hypot(to.y - from.y)).ceil().max(1.0) as u32;
        for i in 0..=steps {
            let t = i as f32 / steps as f32;
            self.stamp(Point {
                x: from.x + (to.x - from.x) * t,
                y: from.y + (to.y - from.y) * t,
            });
        }
        self.last = Some(to);
        self.dirty = true;
    }

    /// Ends the current stroke; the next `begin` starts a new one.
    pub fn end(&mut self) {
        self.last = None;
    }

    /// Resets the raster to blank without closing the capture session.
    pub fn clear(&mut self) {
        self.canvas = RgbaImage::from_pixel(PAD_WIDTH, PAD_HEIGHT, BLANK);
        self.last = None;
        self.dirty = false;
    }

    pub fn is_blank(&self) -> bool {
        !self.dirty
    }

    /// Encodes the captured raster as a PNG data URI.
    pub fn save(&self) -> DomainResult<String> {
        data_uri::encode_png(&self.canvas)
    }

    fn stamp(&mut self, p: Point) {
        let radius = (STROKE_WIDTH / 2.0).round().max(1.0) as i32;
        draw_filled_circle_mut(
            &mut self.canvas,
            (p.x.round() as i32, p.y.round() as i32),
            radius,
            INK,
        );
    }
}

impl Default for SignaturePad {
    fn default() -> Self {
        Self::new()
    }
}

/// Accepts a user-provided raster verbatim as the field value, rejecting
/// oversized or undecodable payloads before anything is stored.
pub fn upload_signature(bytes: &[u8]) -> DomainResult<String> {
    if bytes.len() > MAX_UPLOAD_BYTES {
        return Err(DomainError::Validation(format!(
            "Uploaded image is {} bytes; the limit is {} bytes",
            bytes.len(),
            MAX_UPLOAD_BYTES
        )));
    }
    let format = image::guess_format(bytes)
        .map_err(|_| DomainError::Validation("Upload is not a recognizable image".to_string()))?;
    let mime = match format {
        image::ImageFormat::Png => "image/png",
        image::ImageFormat::Jpeg => "image/jpeg",
        image::ImageFormat::Gif => "image/gif",
        image::ImageFormat::WebP => "image/webp",
        image::ImageFormat::Bmp => "image/bmp",
        other => {
            return Err(DomainError::Validation(format!(
                "Unsupported upload format {other:?}"
            )))
        }
    };
    // decodability check only; the payload itself is stored untouched
    image::load_from_memory(bytes)
        .map_err(|e| DomainError::Validation(format!("Upload could not be decoded: {e}")))?;
    Ok(data_uri::encode(mime, bytes))
}

/// The decorative fonts available for typed signatures, in insertion
/// order. The first registered font is the default.
pub struct FontLibrary {
    fonts: Vec<(String, Font<'static>)>,
}

impl FontLibrary {
    pub fn new() -> Self {
        Self { fonts: Vec::new() }
    }

    pub fn insert(&mut self, name: &str, bytes: Vec<u8>) -> DomainResult<()> {
        let font = Font::try_from_vec(bytes).ok_or_else(|| {
            DomainError::Validation(format!("'{name}' is not a usable TrueType font"))
        })?;
        self.fonts.push((name.to_string(), font));
        Ok(())
    }

    pub fn load_file(&mut self, name: &str, path: &std::path::Path) -> DomainResult<()> {
        let bytes = std::fs::read(path).map_err(|e| {
            DomainError::Validation(format!("Font file {} unreadable: {e}", path.display()))
        })?;
        self.insert(name, bytes)
    }

    pub fn get(&self, name: &str) -> Option<&Font<'static>> {
        self.fonts.iter().find(|(n, _)| n == name).map(|(_, f)| f)
    }

    pub fn default_font(&self) -> Option<(&str, &Font<'static>)> {
        self.fonts.first().map(|(n, f)| (n.as_str(), f))
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.fonts.iter().map(|(n, _)| n.as_str())
    }

    pub fn is_empty(&self) -> bool {
        self.fonts.is_empty()
    }
}

impl Default for FontLibrary {
    fn default() -> Self {
        Self::new()
    }
}

/// Renders a typed name into a signature raster. Every text, font or
/// size change re-renders synchronously so the preview always reflects
/// the latest value.
pub struct TypedSignature {
    text: String,
    font: Font<'static>,
    size: f32,
    canvas: RgbaImage,
}

impl TypedSignature {
    pub fn new(library: &FontLibrary, font_name: &str) -> DomainResult<Self> {
        let font = library
            .get(font_name)
            .ok_or_else(|| {
                DomainError::Validation(format!("Unknown signature font '{font_name}'"))
            })?
            .clone();
        let mut typed = Self {
            text: String::new(),
            font,
            size: 48.0,
            canvas: RgbaImage::from_pixel(PAD_WIDTH, PAD_HEIGHT, BLANK),
        };
        typed.render();
        Ok(typed)
    }

    pub fn set_text(&mut self, text: &str) {
        self.text = text.to_string();
        self.render();
    }

    pub fn set_font(&mut self, library: &FontLibrary, font_name: &str) -> DomainResult<()> {
        let font = library
            .get(font_name)
            .ok_or_else(|| {
                DomainError::Validation(format!("Unknown signature font '{font_name}'"))
            })?
            .clone();
        self.font = font;
        self.render();
        Ok(())
    }

    pub fn set_size(&mut self, size: f32) {
        self.size = size.clamp(TYPED_SIZE_MIN, TYPED_SIZE_MAX);
        self.render();
    }

    pub fn size(&self) -> f32 {
        self.size
    }

    pub fn save(&self) -> DomainResult<String> {
        data_uri::encode_png(&self.canvas)
    }

    fn render(&mut self) {
        self.canvas = RgbaImage::from_pixel(PAD_WIDTH, PAD_HEIGHT, BLANK);
        let text = self.text.trim();
        if text.is_empty() {
            return;
        }
        let scale = Scale::uniform(self.size);
        let v_metrics = self.font.v_metrics(scale);
        let width = text_width(&self.font, scale, text);
        let x = ((PAD_WIDTH as f32 - width) / 2.0).max(0.0);
        let y = ((PAD_HEIGHT as f32 - (v_metrics.ascent - v_metrics.descent)) / 2.0).max(0.0);
        draw_text_mut(
            &mut self.canvas,
            INK,
            x as i32,
            y as i32,
            scale,
            &self.font,
            text,
        );
    }
}

fn text_width(font: &Font<'_>, scale: Scale, text: &str) -> f32 {
    font.layout(text, scale, rusttype::point(0.0, 0.0))
        .last()
        .map(|g| g.position().x + g.unpositioned().h_metrics().advance_width)
        .unwrap_or(0.0)
}

/// Data-URI helpers shared by the capture modes and the compositor.
pub mod data_uri {
    use super::{DomainError, DomainResult};
    use base64::engine::general_purpose::STANDARD;
    use base64::Engine as _;
    use image::{DynamicImage, RgbaImage};
    use std::io::Cursor;

    pub fn encode(mime: &str, bytes: &[u8]) -> String {
        format!("data:{mime};base64,{}", STANDARD.encode(bytes))
    }

    pub fn encode_png(image: &RgbaImage) -> DomainResult<String> {
        let mut buffer = Cursor::new(Vec::new());
        image
            .write_to(&mut buffer, image::ImageOutputFormat::Png)
            .map_err(|e| DomainError::Encode(e.to_string()))?;
        Ok(encode("image/png", buffer.get_ref()))
    }

    pub fn decode(uri: &str) -> DomainResult<Vec<u8>> {
        let (header, payload) = uri
            .split_once(',')
            .ok_or_else(|| DomainError::Validation("Not a data URI".to_string()))?;
        if !header.starts_with("data:") || !header.ends_with(";base64") {
            return Err(DomainError::Validation(
                "Only base64 data URIs are supported".to_string(),
            ));
        }
        STANDARD
            .decode(payload.trim())
            .map_err(|e| DomainError::Validation(format!("Invalid base64 payload: {e}")))
    }

    pub fn decode_image(uri: &str) -> DomainResult<DynamicImage> {
        let bytes = decode(uri)?;
        image::load_from_memory(&bytes)
            .map_err(|e| DomainError::Validation(format!("Image payload undecodable: {e}")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ink_pixels(uri: &str) -> usize {
        let decoded = data_uri::decode_image(uri).unwrap().to_rgba8();
        decoded.pixels().filter(|p| p.0[3] != 0).count()
    }

    /// Looks for any usable TrueType font on the host; typed-signature
    /// tests bail out quietly when none is installed.
    fn host_font() -> Option<Vec<u8>> {
        const CANDIDATES: [&str; 4] = [
            "/usr/share/fonts/truetype/dejavu/DejaVuSans.ttf",
            "/usr/share/fonts/truetype/liberation/LiberationSans-Regular.ttf",
            "/usr/share/fonts/TTF/DejaVuSans.ttf",
            "/System/Library/Fonts/Supplemental/Arial.ttf",
        ];
        CANDIDATES.iter().find_map(|p| std::fs::read(p).ok())
    }

    #[test]
    fn pad_strokes_leave_ink_on_the_raster() {
        let mut pad = SignaturePad::new();
        assert!(pad.is_blank());

        pad.begin(PadInput::Pointer(Point { x: 20.0, y: 50.0 }));
        pad.extend(PadInput::Pointer(Point { x: 200.0, y: 90.0 }));
        pad.extend(PadInput::Touch(Point { x: 350.0, y: 40.0 }));
        pad.end();

        assert!(!pad.is_blank());
        let uri = pad.save().unwrap();
        assert!(uri.starts_with("data:image/png;base64,"));
        assert!(ink_pixels(&uri) > 100);
    }

    #[test]
    fn pad_extend_without_begin_is_ignored() {
        let mut pad = SignaturePad::new();
        pad.extend(PadInput::Pointer(Point { x: 10.0, y: 10.0 }));
        assert!(pad.is_blank());
    }

    #[test]
    fn pad_clear_resets_without_closing_the_session() {
        let mut pad = SignaturePad::new();
        pad.begin(PadInput::Pointer(Point { x: 20.0, y: 50.0 }));
        pad.extend(PadInput::Pointer(Point { x: 120.0, y: 60.0 }));
        pad.clear();
        assert!(pad.is_blank());
        assert_eq!(ink_pixels(&pad.save().unwrap()), 0);

        // the session is still usable after a clear
        pad.begin(PadInput::Pointer(Point { x: 30.0, y: 30.0 }));
        pad.extend(PadInput::Pointer(Point { x: 90.0, y: 80.0 }));
        assert!(ink_pixels(&pad.save().unwrap()) > 0);
    }

    #[test]
    fn pointer_and_touch_inputs_normalize_to_one_position() {
        let p = Point { x: 3.0, y: 4.0 };
        assert_eq!(PadInput::Pointer(p).position(), p);
        assert_eq!(PadInput::Touch(p).position(), p);
    }

    #[test]
    fn oversized_uploads_are_rejected() {
        let oversized = vec![0u8; MAX_UPLOAD_BYTES + 1];
        let err = upload_signature(&oversized).unwrap_err();
        assert!(matches!(err, DomainError::Validation(_)));
    }

    #[test]
    fn garbage_uploads_are_rejected() {
        assert!(upload_signature(b"not an image at all").is_err());
    }

    #[test]
    fn valid_uploads_pass_through_verbatim() {
        let png = {
            let image = RgbaImage::from_pixel(4, 4, Rgba([255, 0, 0, 255]));
            let uri = data_uri::encode_png(&image).unwrap();
            data_uri::decode(&uri).unwrap()
        };
        let uri = upload_signature(&png).unwrap();
        assert!(uri.starts_with("data:image/png;base64,"));
        assert_eq!(data_uri::decode(&uri).unwrap(), png);
    }

    #[test]
    fn typed_signature_renders_centered_text() {
        let Some(bytes) = host_font() else {
            eprintln!("skipping: no TrueType font installed on this host");
            return;
        };
        let mut library = FontLibrary::new();
        library.insert("Cursive", bytes).unwrap();

        let mut typed = TypedSignature::new(&library, "Cursive").unwrap();
        assert_eq!(ink_pixels(&typed.save().unwrap()), 0);

        typed.set_text("Ada Lovelace");
        let first = ink_pixels(&typed.save().unwrap());
        assert!(first > 0);

        // every change re-renders synchronously
        typed.set_size(500.0);
        assert_eq!(typed.size(), TYPED_SIZE_MAX);
        typed.set_size(5.0);
        assert_eq!(typed.size(), TYPED_SIZE_MIN);
        let small = ink_pixels(&typed.save().unwrap());
        assert!(small < first);

        typed.set_text("");
        assert_eq!(ink_pixels(&typed.save().unwrap()), 0);
    }

    #[test]
    fn typed_signature_rejects_unknown_fonts() {
        let library = FontLibrary::new();
        assert!(TypedSignature::new(&library, "Nope").is_err());
    }

    #[test]
    fn data_uri_round_trip_and_rejects() {
        let uri = data_uri::encode("image/png", b"payload");
        assert_eq!(data_uri::decode(&uri).unwrap(), b"payload");
        assert!(data_uri::decode("http://example.com/x.png").is_err());
        assert!(data_uri::decode("data:image/png;base64").is_err());
    }
}
