//! The report renderer.

use log::{debug, info};
use serde_json::{Map, Value};

use crate::builder;
use crate::config::Branding;
use crate::dates::Clock;
use crate::elements::LogoSet;
use crate::error::Result;
use crate::fonts::{AssetPaths, FontSet};
use crate::metadata;
use crate::model::{ReportInput, ReportLayout};
use crate::shaping::{ShapingConfig, TextShaper};
use crate::templates::ReportTemplate;

/// A finished PDF.
#[derive(Debug, Clone)]
pub struct RenderedDocument {
    pub bytes: Vec<u8>,
    pub page_count: usize,
    /// Suggested download name, `<prefix>_<YYYYMMDD_HHMMSS>.pdf`.
    pub filename: String,
}

/// Turns report input into PDF documents.
///
/// Fonts, the shaping configuration and the branding are loaded once and shared read-only by all
/// renders; everything else lives for a single call to [`ReportRenderer::render`].
#[derive(Debug, Clone)]
pub struct ReportRenderer {
    fonts: FontSet,
    shaper: TextShaper,
    assets: AssetPaths,
    branding: Branding,
}

impl ReportRenderer {
    /// Creates a renderer whose shaping follows the glyph coverage of the regular font.
    pub fn new(fonts: FontSet, assets: AssetPaths, branding: Branding) -> Self {
        let shaper = TextShaper::new(ShapingConfig::from_font_bytes(fonts.regular_bytes()));
        Self {
            fonts,
            shaper,
            assets,
            branding,
        }
    }

    /// Registers the fonts below `assets` and creates the renderer.
    ///
    /// Fails when the regular font is missing or unreadable.
    pub fn from_assets(assets: AssetPaths, branding: Branding) -> Result<Self> {
        let fonts = assets.ensure_fonts()?;
        let (regular, bold) = fonts.ids();
        info!(
            "Registered fonts {} and {} from {}",
            regular.name(),
            bold.name(),
            assets.root().display()
        );
        Ok(Self::new(fonts, assets, branding))
    }

    pub fn shaper(&self) -> &TextShaper {
        &self.shaper
    }

    /// Composes the report content without rendering it.
    pub fn compose(
        &self,
        template: ReportTemplate,
        input: &ReportInput,
        clock: &dyn Clock,
    ) -> ReportLayout {
        template.compose(input, &self.branding, &self.shaper, clock)
    }

    /// Renders one report.
    pub fn render(
        &self,
        template: ReportTemplate,
        input: &ReportInput,
        clock: &dyn Clock,
    ) -> Result<RenderedDocument> {
        let layout = self.compose(template, input, clock);
        let logos = LogoSet::load(&self.assets.center_logo(), &self.assets.left_logo());
        let raw = builder::render_layout(&layout, &self.fonts, logos)?;
        let finished = metadata::apply_document_info(&raw, &layout.info)?;
        debug!(
            "{template} report rendered: {} rows, {} pages, {} bytes",
            input.rows.len(),
            finished.page_count,
            finished.bytes.len()
        );
        Ok(RenderedDocument {
            bytes: finished.bytes,
            page_count: finished.page_count,
            filename: template.download_filename(clock),
        })
    }

    /// Parses decoded request fields with the template's rows policy, then renders.
    pub fn render_fields(
        &self,
        template: ReportTemplate,
        fields: &Map<String, Value>,
        clock: &dyn Clock,
    ) -> Result<RenderedDocument> {
        let input = ReportInput::from_fields(fields, template.policy().malformed_rows)?;
        self.render(template, &input, clock)
    }
}
