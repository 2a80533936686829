//! Renders school administration reports as right-to-left Arabic PDF documents.
//!
//! The crate shapes Arabic text into presentation forms, reorders it for display and lays the
//! report out with `genpdf`: a repeating letterhead with logos, a title, body paragraphs and an
//! optional bordered table.  [`ReportRenderer`] ties the pieces together.

pub mod builder;
pub mod config;
pub mod dates;
pub mod elements;
pub mod error;
pub mod fonts;
pub mod metadata;
pub mod model;
pub mod renderer;
pub mod shaping;
pub mod templates;

pub use config::Branding;
pub use dates::{Clock, FixedClock, SystemClock};
pub use error::{ReportError, Result};
pub use fonts::{ensure_fonts, AssetPaths, FontSet};
pub use model::{AbsenceRow, DayEntry, MalformedRowsPolicy, ReportInput};
pub use renderer::{RenderedDocument, ReportRenderer};
pub use shaping::{ShapedText, ShapingConfig, TextShaper};
pub use templates::ReportTemplate;
