//! Report elements built on top of `genpdf` primitives.
//!
//! `genpdf` lays text out left to right and knows nothing about bidirectional text.  The
//! [`RtlParagraph`] element wraps shaped text in logical order and reorders each wrapped line on its
//! own, so that the first words of a right-to-left paragraph end up on the first line.  The module
//! also provides a fixed vertical gap and scaled, alpha-free logos for the page header.

use std::path::Path;

use image::{DynamicImage, GenericImageView};
use log::{debug, warn};

use genpdf::elements::Image;
use genpdf::error::{Context as _, Error};
use genpdf::style::{Style, StyledString};
use genpdf::{render, Alignment, Element, Mm, Position, RenderResult, Scale, Size};

use crate::model::HorizontalAlignment;
use crate::shaping::ShapedText;

pub(crate) const DEFAULT_IMAGE_DPI: f64 = 300.0;
const MM_PER_INCH: f64 = 25.4;
const POINTS_PER_INCH: f64 = 72.0;

pub(crate) fn mm_from_f64(value: f64) -> Mm {
    Mm::from(printpdf::Mm(value))
}

pub(crate) fn mm_to_f64(value: Mm) -> f64 {
    let mm: printpdf::Mm = value.into();
    mm.0
}

pub(crate) fn points_to_mm(points: f64) -> f64 {
    points * MM_PER_INCH / POINTS_PER_INCH
}

impl From<HorizontalAlignment> for Alignment {
    fn from(alignment: HorizontalAlignment) -> Self {
        match alignment {
            HorizontalAlignment::Center => Alignment::Center,
            HorizontalAlignment::Right => Alignment::Right,
        }
    }
}

/// Horizontal offset of a line of `width` inside `available` for the given alignment.
pub(crate) fn aligned_offset(alignment: Alignment, available: Mm, width: Mm) -> Mm {
    match alignment {
        Alignment::Left => Mm::default(),
        Alignment::Center => (available - width) / 2.0,
        Alignment::Right => available - width,
    }
}

/// Greedy word wrap in logical order.
///
/// Explicit newlines always break.  A word wider than `max_width` is broken after the last
/// character that still fits, so no line overflows its box.
pub(crate) fn wrap_lines(text: &str, max_width: Mm, measure: impl Fn(&str) -> Mm) -> Vec<String> {
    let mut lines = Vec::new();
    for source_line in text.split('\n') {
        let mut current = String::new();
        for word in source_line.split(' ').filter(|word| !word.is_empty()) {
            if measure(word) > max_width {
                if !current.is_empty() {
                    lines.push(std::mem::take(&mut current));
                }
                let mut pieces = split_word(word, max_width, &measure);
                current = pieces.pop().unwrap_or_default();
                lines.extend(pieces);
                continue;
            }
            if current.is_empty() {
                current.push_str(word);
                continue;
            }
            let candidate = format!("{current} {word}");
            if measure(&candidate) > max_width {
                lines.push(std::mem::replace(&mut current, word.to_owned()));
            } else {
                current = candidate;
            }
        }
        lines.push(current);
    }
    // a trailing empty line carries no content
    while lines.len() > 1 && lines.last().is_some_and(String::is_empty) {
        lines.pop();
    }
    lines
}

/// Cuts one word into pieces no wider than `max_width`; every piece holds at least one character.
fn split_word(word: &str, max_width: Mm, measure: &impl Fn(&str) -> Mm) -> Vec<String> {
    let mut pieces = Vec::new();
    let mut current = String::new();
    for c in word.chars() {
        current.push(c);
        if current.chars().nth(1).is_some() && measure(&current) > max_width {
            current.pop();
            pieces.push(std::mem::take(&mut current));
            current.push(c);
        }
    }
    if !current.is_empty() {
        pieces.push(current);
    }
    pieces
}

/// A paragraph of shaped right-to-left text.
///
/// The paragraph remembers how far it got, so a long paragraph continues on the next page where
/// it stopped.
pub struct RtlParagraph {
    text: ShapedText,
    alignment: Alignment,
    style: Style,
    lines: Option<Vec<String>>,
    next_line: usize,
}

impl RtlParagraph {
    /// Creates a right-aligned paragraph.
    pub fn new(text: ShapedText) -> Self {
        Self {
            text,
            alignment: Alignment::Right,
            style: Style::new(),
            lines: None,
            next_line: 0,
        }
    }

    pub fn with_alignment(mut self, alignment: impl Into<Alignment>) -> Self {
        self.alignment = alignment.into();
        self
    }

    /// Style merged over the style inherited from the document.
    pub fn with_style(mut self, style: Style) -> Self {
        self.style = style;
        self
    }
}

impl Element for RtlParagraph {
    fn render(
        &mut self,
        context: &genpdf::Context,
        mut area: render::Area<'_>,
        style: Style,
    ) -> Result<RenderResult, Error> {
        let style = style.and(self.style);
        let mut result = RenderResult::default();
        if self.text.is_empty() {
            return Ok(result);
        }

        let available_width = area.size().width;
        let text = &self.text;
        let lines = self.lines.get_or_insert_with(|| {
            wrap_lines(text.as_logical(), available_width, |candidate| {
                StyledString::new(candidate.to_owned(), style).width(&context.font_cache)
            })
        });

        let line_height = style.line_height(&context.font_cache);
        while self.next_line < lines.len() {
            if line_height > area.size().height {
                result.has_more = true;
                return Ok(result);
            }

            let visual = self.text.visual_line(&lines[self.next_line]);
            let width = StyledString::new(visual.clone(), style).width(&context.font_cache);
            let x_offset = aligned_offset(self.alignment, available_width, width);
            match area.text_section(&context.font_cache, Position::new(x_offset, 0), style) {
                Some(mut section) => section.print_str(&visual, style)?,
                None => {
                    result.has_more = true;
                    return Ok(result);
                }
            }

            area.add_offset(Position::new(0, line_height));
            result.size = result.size.stack_vertical(Size::new(width, line_height));
            self.next_line += 1;
        }

        Ok(result)
    }
}

/// A fixed vertical gap.
///
/// At the bottom of a page the gap is cut short instead of being carried over.
pub struct VerticalSpace {
    height: Mm,
}

impl VerticalSpace {
    pub fn new(height_mm: f64) -> Self {
        Self {
            height: mm_from_f64(height_mm),
        }
    }
}

impl Element for VerticalSpace {
    fn render(
        &mut self,
        _context: &genpdf::Context,
        area: render::Area<'_>,
        _style: Style,
    ) -> Result<RenderResult, Error> {
        let available = area.size().height;
        let height = if self.height > available {
            available
        } else {
            self.height
        };
        let mut result = RenderResult::default();
        result.size = Size::new(0, height);
        Ok(result)
    }
}

/// A header logo, scaled to fit its bounding box.
pub struct LogoImage {
    image: Image,
    size: Size,
}

impl LogoImage {
    /// Decodes the image at `path` and scales it to fit `max_width_mm` x `max_height_mm`,
    /// preserving the aspect ratio.
    pub fn load(path: &Path, max_width_mm: f64, max_height_mm: f64) -> Result<Self, Error> {
        let decoded = decode_image_from_path(path)?;
        Self::from_dynamic_image(decoded, max_width_mm, max_height_mm)
    }

    pub fn from_dynamic_image(
        image: DynamicImage,
        max_width_mm: f64,
        max_height_mm: f64,
    ) -> Result<Self, Error> {
        let image = flatten_alpha(image);
        let (natural_width, natural_height) = natural_size_mm(&image);
        if natural_width <= f64::EPSILON || natural_height <= f64::EPSILON {
            return Err(Error::new(
                "Logo image has no pixels",
                genpdf::error::ErrorKind::InvalidData,
            ));
        }

        let scale = fit_scale(
            (natural_width, natural_height),
            (max_width_mm, max_height_mm),
        );
        let size = Size::new(
            mm_from_f64(natural_width * scale),
            mm_from_f64(natural_height * scale),
        );
        let mut image = Image::from_dynamic_image(image)?;
        image.set_scale(Scale::new(scale, scale));
        Ok(Self { image, size })
    }

    /// Loads a logo that the report can do without.
    ///
    /// Missing, unreadable or unsupported files are logged and yield `None`.
    pub fn load_optional(path: &Path, max_width_mm: f64, max_height_mm: f64) -> Option<Self> {
        if !path.is_file() {
            debug!("no logo at {}", path.display());
            return None;
        }
        match Self::load(path, max_width_mm, max_height_mm) {
            Ok(logo) => Some(logo),
            Err(err) => {
                warn!("Skipping logo {}: {}", path.display(), err);
                None
            }
        }
    }

    /// Rendered size after scaling.
    pub fn size(&self) -> Size {
        self.size
    }

    pub(crate) fn image_mut(&mut self) -> &mut Image {
        &mut self.image
    }
}

/// Largest scale factor at which `natural` still fits into `bounds`.
pub(crate) fn fit_scale(natural: (f64, f64), bounds: (f64, f64)) -> f64 {
    (bounds.0 / natural.0).min(bounds.1 / natural.1)
}

fn natural_size_mm(image: &DynamicImage) -> (f64, f64) {
    let (px_width, px_height) = image.dimensions();
    (
        MM_PER_INCH * f64::from(px_width) / DEFAULT_IMAGE_DPI,
        MM_PER_INCH * f64::from(px_height) / DEFAULT_IMAGE_DPI,
    )
}

/// Composites transparent pixels over white; PDF images are embedded without an alpha channel.
fn flatten_alpha(image: DynamicImage) -> DynamicImage {
    if !image.color().has_alpha() {
        return image;
    }
    let rgba = image.into_rgba8();
    let (width, height) = rgba.dimensions();
    let mut rgb = image::RgbImage::new(width, height);
    for (x, y, pixel) in rgba.enumerate_pixels() {
        let [r, g, b, a] = pixel.0;
        let alpha = u32::from(a);
        let blend = |channel: u8| ((u32::from(channel) * alpha + 255 * (255 - alpha)) / 255) as u8;
        rgb.put_pixel(x, y, image::Rgb([blend(r), blend(g), blend(b)]));
    }
    DynamicImage::ImageRgb8(rgb)
}

/// Loads an image from the given path using the [`image`] crate with descriptive errors.
pub fn decode_image_from_path(path: impl AsRef<Path>) -> Result<DynamicImage, Error> {
    let path = path.as_ref();
    let reader = image::io::Reader::open(path)
        .with_context(|| format!("Failed to open image file {}", path.display()))?;
    reader
        .with_guessed_format()
        .context("Unable to determine image format")?
        .decode()
        .with_context(|| format!("Failed to decode image file {}", path.display()))
}

/// Optional logos of the page header, resolved before drawing starts.
#[derive(Default)]
pub struct LogoSet {
    pub center: Option<LogoImage>,
    pub left: Option<LogoImage>,
}

impl LogoSet {
    pub const CENTER_MAX_MM: (f64, f64) = (60.0, 26.0);
    pub const LEFT_MAX_MM: (f64, f64) = (40.0, 26.0);

    pub fn load(center: &Path, left: &Path) -> Self {
        Self {
            center: LogoImage::load_optional(center, Self::CENTER_MAX_MM.0, Self::CENTER_MAX_MM.1),
            left: LogoImage::load_optional(left, Self::LEFT_MAX_MM.0, Self::LEFT_MAX_MM.1),
        }
    }
}
