//! Page template and document assembly.
//!
//! Every page gets the same decoration: the letterhead at the top, the logos and, for some
//! templates, the signature above the bottom edge.  The decoration is drawn outside the flowing
//! body, which starts below the reserved top margin.

use genpdf::elements::{FrameCellDecorator, TableLayout};
use genpdf::error::Error;
use genpdf::style::{Style, StyledString};
use genpdf::{self, render, Alignment, Element, Margins, Mm, PageDecorator, Position, Size};
use log::debug;

use crate::elements::{
    aligned_offset, mm_from_f64, mm_to_f64, points_to_mm, LogoImage, LogoSet, RtlParagraph,
    VerticalSpace,
};
use crate::fonts::FontSet;
use crate::model::{PageLayout, ReportBlock, ReportLayout, TableBlock, TextRole};
use crate::shaping::ShapedText;

/// Distance of the letterhead band from the top and side edges of the page.
const HEADER_EDGE_MM: f64 = 15.0;
const HEADER_FONT_SIZE: u8 = 9;
const HEADER_LINE_STEP_PT: f64 = 11.0;
/// Gap between the bottom of the body and the footer signature.
const SIGNATURE_GAP_MM: f64 = 8.0;

const BODY_FONT_SIZE: u8 = 12;
const SMALL_FONT_SIZE: u8 = 11;
const TITLE_FONT_SIZE: u8 = 18;
const SIGNATURE_FONT_SIZE: u8 = 15;
const TABLE_HEADER_FONT_SIZE: u8 = 12;
const LINE_SPACING: f64 = 1.25;
const CELL_PADDING_MM: f64 = 1.5;

/// Where a page sits in the document.
#[derive(Clone, Copy, Debug)]
pub struct PageInfo {
    /// One-based page number.
    pub number: usize,
    /// Full page size, margins included.
    pub size: Size,
}

/// Drawing surface handed to a [`PageDecoration`].
///
/// Coordinates are relative to the top left corner of the page.
pub struct PageCanvas<'c, 'a> {
    context: &'c genpdf::Context,
    area: render::Area<'a>,
    style: Style,
}

impl<'c, 'a> PageCanvas<'c, 'a> {
    pub fn size(&self) -> Size {
        self.area.size()
    }

    /// Draws one line of text that is already in visual order.
    ///
    /// `inset` is kept free on both sides and `alignment` places the line between the insets.
    pub fn draw_line(
        &mut self,
        text: &str,
        top: Mm,
        inset: Mm,
        alignment: Alignment,
        style: Style,
    ) -> Result<(), Error> {
        let style = self.style.and(style);
        let available = self.area.size().width - inset - inset;
        let width = StyledString::new(text.to_owned(), style).width(&self.context.font_cache);
        let x = inset + aligned_offset(alignment, available, width);
        if let Some(mut section) =
            self.area
                .text_section(&self.context.font_cache, Position::new(x, top), style)
        {
            section.print_str(text, style)?;
        }
        Ok(())
    }

    /// Line height of `style` merged over the page style.
    pub fn line_height(&self, style: Style) -> Mm {
        self.style.and(style).line_height(&self.context.font_cache)
    }

    /// Renders an element inside the box starting at `origin` with the given width.
    pub fn draw_element(
        &mut self,
        element: &mut dyn Element,
        origin: Position,
        width: Mm,
    ) -> Result<(), Error> {
        let mut area = self.area.clone();
        area.add_offset(origin);
        area.set_width(width);
        element.render(self.context, area, self.style)?;
        Ok(())
    }
}

/// Per-page drawing callback, invoked for the first and every following page.
pub trait PageDecoration {
    fn decorate(&mut self, canvas: &mut PageCanvas<'_, '_>, page: &PageInfo) -> Result<(), Error>;
}

/// Adapts a [`PageDecoration`] to `genpdf`, reserving the body margins after drawing.
struct DecorationAdapter<D> {
    page: usize,
    margins: Margins,
    decoration: D,
}

impl<D: PageDecoration> PageDecorator for DecorationAdapter<D> {
    fn decorate_page<'a>(
        &mut self,
        context: &genpdf::Context,
        mut area: render::Area<'a>,
        style: Style,
    ) -> Result<render::Area<'a>, Error> {
        self.page += 1;

        let page = PageInfo {
            number: self.page,
            size: area.size(),
        };
        if page.number == 1 {
            debug!(
                "page size {:.0} x {:.0} mm",
                mm_to_f64(page.size.width),
                mm_to_f64(page.size.height)
            );
        }
        let mut canvas = PageCanvas {
            context,
            area: area.clone(),
            style,
        };
        self.decoration.decorate(&mut canvas, &page)?;

        area.add_margins(self.margins);
        Ok(area)
    }
}

/// Letterhead, logos and optional signature of a report page.
pub struct ReportDecoration {
    page: PageLayout,
    header_lines: Vec<ShapedText>,
    logos: LogoSet,
    signature: Option<ShapedText>,
}

impl ReportDecoration {
    pub fn new(layout: &ReportLayout, logos: LogoSet) -> Self {
        Self {
            page: layout.page,
            header_lines: layout.header_lines.clone(),
            logos,
            signature: layout.footer_signature.clone(),
        }
    }

    fn draw_logo(
        canvas: &mut PageCanvas<'_, '_>,
        logo: &mut LogoImage,
        left: Mm,
        width: Mm,
        alignment: Alignment,
    ) -> Result<(), Error> {
        let image = logo.image_mut();
        image.set_alignment(alignment);
        canvas.draw_element(
            image,
            Position::new(left, mm_from_f64(HEADER_EDGE_MM)),
            width,
        )
    }
}

impl PageDecoration for ReportDecoration {
    fn decorate(&mut self, canvas: &mut PageCanvas<'_, '_>, page: &PageInfo) -> Result<(), Error> {
        let edge = mm_from_f64(HEADER_EDGE_MM);
        let header_style = Style::new().with_font_size(HEADER_FONT_SIZE);
        let step = mm_from_f64(points_to_mm(HEADER_LINE_STEP_PT));

        let mut top = edge;
        for line in &self.header_lines {
            canvas.draw_line(&line.to_visual(), top, edge, Alignment::Right, header_style)?;
            top += step;
        }

        let inner_width = page.size.width - edge - edge;
        if let Some(logo) = self.logos.center.as_mut() {
            Self::draw_logo(canvas, logo, edge, inner_width, Alignment::Center)?;
        }
        if let Some(logo) = self.logos.left.as_mut() {
            let width = logo.size().width;
            Self::draw_logo(canvas, logo, edge, width, Alignment::Left)?;
        }

        if let Some(signature) = &self.signature {
            let style = Style::new().bold().with_font_size(SIGNATURE_FONT_SIZE);
            let top = page.size.height - mm_from_f64(self.page.bottom_margin_mm)
                + mm_from_f64(SIGNATURE_GAP_MM);
            let side = mm_from_f64(self.page.side_margin_mm);
            canvas.draw_line(&signature.to_visual(), top, side, Alignment::Right, style)?;
        }

        Ok(())
    }
}

fn role_style(role: TextRole) -> Style {
    match role {
        TextRole::Body => Style::new().with_font_size(BODY_FONT_SIZE),
        TextRole::Small => Style::new().with_font_size(SMALL_FONT_SIZE),
        TextRole::Signature => Style::new().bold().with_font_size(SIGNATURE_FONT_SIZE),
    }
}

fn cell(text: &ShapedText, alignment: Alignment, style: Style) -> impl Element {
    RtlParagraph::new(text.clone())
        .with_alignment(alignment)
        .with_style(style)
        .padded(Margins::trbl(
            mm_from_f64(CELL_PADDING_MM),
            mm_from_f64(CELL_PADDING_MM),
            mm_from_f64(CELL_PADDING_MM),
            mm_from_f64(CELL_PADDING_MM),
        ))
}

/// Builds the bordered table with columns in left-to-right order.
///
/// The table spans exactly the sum of its column widths and is pushed against the right edge of
/// the content area.
fn table_element(table: &TableBlock, content_width_mm: f64) -> Result<impl Element, Error> {
    let weights: Vec<usize> = table
        .visual_columns()
        .map(|column| column.width_mm.round().max(1.0) as usize)
        .collect();
    let mut layout = TableLayout::new(weights);
    layout.set_cell_decorator(FrameCellDecorator::new(true, true, false));

    let header_style = Style::new().with_font_size(TABLE_HEADER_FONT_SIZE);
    let mut header = layout.row();
    for column in table.visual_columns() {
        header.push_element(cell(&column.heading, Alignment::Right, header_style));
    }
    header.push()?;

    let cell_style = role_style(TextRole::Small);
    for row in table.data_rows() {
        let mut table_row = layout.row();
        for (text, column) in TableBlock::visual_cells(row).zip(table.visual_columns()) {
            table_row.push_element(cell(text, column.alignment.into(), cell_style));
        }
        table_row.push()?;
    }

    let left_padding = (content_width_mm - table.width_mm()).max(0.0);
    debug!(
        "table: {} rows, {:.1} mm wide, {:.1} mm left padding",
        table.row_count(),
        table.width_mm(),
        left_padding
    );
    Ok(layout.padded(Margins::trbl(0, 0, 0, mm_from_f64(left_padding))))
}

fn push_block(
    document: &mut genpdf::Document,
    block: &ReportBlock,
    page: &PageLayout,
) -> Result<(), Error> {
    match block {
        ReportBlock::Title(text) => document.push(
            RtlParagraph::new(text.clone())
                .with_alignment(Alignment::Center)
                .with_style(Style::new().bold().with_font_size(TITLE_FONT_SIZE)),
        ),
        ReportBlock::Paragraph { text, role } => document.push(
            RtlParagraph::new(text.clone())
                .with_alignment(Alignment::Right)
                .with_style(role_style(*role)),
        ),
        ReportBlock::Spacer(height_mm) => document.push(VerticalSpace::new(*height_mm)),
        ReportBlock::Table(table) => document.push(table_element(table, page.content_width_mm())?),
    }
    Ok(())
}

/// Builds the `genpdf` document for a composed report.
pub fn build_document(
    layout: &ReportLayout,
    fonts: &FontSet,
    logos: LogoSet,
) -> Result<genpdf::Document, Error> {
    let mut document = genpdf::Document::new(fonts.family());
    document.set_paper_size(Size::new(
        mm_from_f64(layout.page.width_mm),
        mm_from_f64(layout.page.height_mm),
    ));
    document.set_title(layout.info.title.clone());
    document.set_font_size(BODY_FONT_SIZE);
    document.set_line_spacing(LINE_SPACING);

    let side = mm_from_f64(layout.page.side_margin_mm);
    document.set_page_decorator(DecorationAdapter {
        page: 0,
        margins: Margins::trbl(
            mm_from_f64(layout.page.top_margin_mm),
            side,
            mm_from_f64(layout.page.bottom_margin_mm),
            side,
        ),
        decoration: ReportDecoration::new(layout, logos),
    });

    for block in &layout.blocks {
        push_block(&mut document, block, &layout.page)?;
    }
    Ok(document)
}

/// Renders a composed report into PDF bytes.
pub fn render_layout(
    layout: &ReportLayout,
    fonts: &FontSet,
    logos: LogoSet,
) -> Result<Vec<u8>, Error> {
    let document = build_document(layout, fonts, logos)?;
    let mut bytes = Vec::new();
    document.render(&mut bytes)?;
    debug!("rendered {} bytes", bytes.len());
    Ok(bytes)
}
