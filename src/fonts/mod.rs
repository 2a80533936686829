//! Font registration and asset discovery.
//!
//! The renderer embeds one Arabic-capable TrueType family.  The regular face is mandatory; the
//! bold face is optional and silently replaced by the regular face when it is missing or broken.

use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use genpdf::error::Error;
use genpdf::fonts::{FontData, FontFamily};
use log::warn;

use crate::error::{ReportError, Result};

/// Environment variable that points at the assets root (`fonts/` and `images/`).
pub const ASSETS_DIR_ENV: &str = "RTL_REPORT_ASSETS_DIR";

/// Regular face, relative to the assets root.
pub const REGULAR_FONT_FILE: &str = "fonts/Tajawal-Medium.ttf";

/// Bold face, relative to the assets root.
pub const BOLD_FONT_FILE: &str = "fonts/Tajawal-Bold.ttf";

/// Logo drawn in the middle of the page header.
pub const CENTER_LOGO_FILE: &str = "images/center_logo.png";

/// Logo drawn at the left edge of the page header.
pub const LEFT_LOGO_FILE: &str = "images/left_logo.png";

const REGULAR_FONT_ID: &str = "Arabic-Regular";
const BOLD_FONT_ID: &str = "Arabic-Bold";

/// Identifier of a registered face.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct FontId(&'static str);

impl FontId {
    pub fn name(&self) -> &'static str {
        self.0
    }
}

#[derive(Debug)]
struct LoadedFont {
    data: Vec<u8>,
    font: FontData,
}

/// The registered regular and bold faces.
///
/// Cloning is cheap; the font bytes are shared.
#[derive(Clone, Debug)]
pub struct FontSet {
    regular: Arc<LoadedFont>,
    bold: Option<Arc<LoadedFont>>,
}

impl FontSet {
    pub fn regular_id(&self) -> FontId {
        FontId(REGULAR_FONT_ID)
    }

    /// Equal to [`FontSet::regular_id`] when no usable bold face was registered.
    pub fn bold_id(&self) -> FontId {
        if self.bold.is_some() {
            FontId(BOLD_FONT_ID)
        } else {
            self.regular_id()
        }
    }

    /// Both identifiers, in `(regular, bold)` order.
    pub fn ids(&self) -> (FontId, FontId) {
        (self.regular_id(), self.bold_id())
    }

    /// Raw bytes of the regular face, used to derive the shaping configuration.
    pub fn regular_bytes(&self) -> &[u8] {
        &self.regular.data
    }

    /// The `genpdf` font family for one document, cloned from the faces parsed at registration.
    ///
    /// Italic variants reuse the upright faces; Arabic has no italic convention.
    pub fn family(&self) -> FontFamily<FontData> {
        let regular = self.regular.font.clone();
        let bold = match &self.bold {
            Some(bold) => bold.font.clone(),
            None => regular.clone(),
        };
        FontFamily {
            italic: regular.clone(),
            bold_italic: bold.clone(),
            regular,
            bold,
        }
    }
}

/// Registers the regular and (optional) bold faces.
///
/// A missing regular face is fatal.  A missing or unreadable bold face is logged and replaced by
/// the regular face.
pub fn ensure_fonts(regular_path: &Path, bold_path: Option<&Path>) -> Result<FontSet> {
    if !regular_path.is_file() {
        return Err(ReportError::MissingFont {
            path: regular_path.to_path_buf(),
        });
    }

    let regular = load_font(regular_path).map_err(|source| ReportError::FontLoad {
        path: regular_path.to_path_buf(),
        source,
    })?;

    let bold = match bold_path {
        Some(path) if path.is_file() => match load_font(path) {
            Ok(font) => Some(Arc::new(font)),
            Err(err) => {
                warn!(
                    "Bold font at {} could not be loaded ({}); using the regular face instead.",
                    path.display(),
                    err
                );
                None
            }
        },
        Some(path) => {
            warn!(
                "Bold font missing at {}; using the regular face instead.",
                path.display()
            );
            None
        }
        None => None,
    };

    Ok(FontSet {
        regular: Arc::new(regular),
        bold,
    })
}

fn load_font(path: &Path) -> std::result::Result<LoadedFont, Error> {
    let data = fs::read(path).map_err(|err| {
        Error::new(format!("Failed to read font file {}", path.display()), err)
    })?;
    let font = FontData::new(data.clone(), None)?;
    Ok(LoadedFont { data, font })
}

/// Fixed locations of the report assets below one root directory.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AssetPaths {
    root: PathBuf,
}

impl AssetPaths {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Picks the first candidate directory that contains the regular font.
    ///
    /// Candidates, in order: `explicit`, `$RTL_REPORT_ASSETS_DIR`, `assets/` next to the
    /// executable and `assets/` in the crate root.  When none contains the font the first candidate
    /// is returned so that the subsequent font registration reports a useful path.
    pub fn discover(explicit: Option<&Path>) -> Self {
        let candidates = asset_directory_candidates(explicit);
        let chosen = candidates
            .iter()
            .find(|candidate| candidate.join(REGULAR_FONT_FILE).is_file())
            .or_else(|| candidates.first())
            .cloned()
            .unwrap_or_else(|| PathBuf::from("assets"));
        Self::new(chosen)
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn regular_font(&self) -> PathBuf {
        self.root.join(REGULAR_FONT_FILE)
    }

    pub fn bold_font(&self) -> PathBuf {
        self.root.join(BOLD_FONT_FILE)
    }

    pub fn center_logo(&self) -> PathBuf {
        self.root.join(CENTER_LOGO_FILE)
    }

    pub fn left_logo(&self) -> PathBuf {
        self.root.join(LEFT_LOGO_FILE)
    }

    /// Registers the fonts found below this root.
    pub fn ensure_fonts(&self) -> Result<FontSet> {
        let bold = self.bold_font();
        ensure_fonts(&self.regular_font(), Some(&bold))
    }
}

fn asset_directory_candidates(explicit: Option<&Path>) -> Vec<PathBuf> {
    let mut candidates = Vec::new();

    if let Some(path) = explicit {
        candidates.push(path.to_path_buf());
    }

    if let Some(path) = env_path(ASSETS_DIR_ENV) {
        push_unique(&mut candidates, path);
    }

    if let Ok(current_exe) = env::current_exe() {
        if let Some(bin_dir) = current_exe.parent() {
            push_unique(&mut candidates, bin_dir.join("assets"));
        }
    }

    push_unique(
        &mut candidates,
        PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("assets"),
    );

    candidates
}

fn push_unique(candidates: &mut Vec<PathBuf>, candidate: PathBuf) {
    if !candidates.iter().any(|existing| existing == &candidate) {
        candidates.push(candidate);
    }
}

fn env_path(var: &str) -> Option<PathBuf> {
    env::var_os(var).and_then(|value| {
        let path = PathBuf::from(value);
        if path.as_os_str().is_empty() {
            None
        } else {
            Some(path)
        }
    })
}
