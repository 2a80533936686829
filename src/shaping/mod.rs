//! Arabic shaping and bidirectional reordering for display in a left-to-right PDF text model.
//!
//! PDF text is drawn glyph by glyph from left to right and the layout engine has no notion of
//! contextual glyph selection.  Arabic therefore has to be prepared in two steps before it is
//! handed to `genpdf`:
//!
//! 1. *Reshaping* replaces each letter with the presentation form matching its position in the
//!    word and merges ligatures such as lam-alef.  The joining rules come from `ar_reshaper`; the
//!    configuration is derived from the glyphs the embedded font actually contains.
//! 2. *Reordering* applies the Unicode bidirectional algorithm so that right-to-left runs are stored
//!    in visual order, with paired brackets mirrored.
//!
//! [`ShapedText`] keeps the result of step 1 in logical order.  Paragraph elements wrap it in
//! logical order and reorder each line separately, which keeps multi-line paragraphs readable.

use std::collections::HashSet;
use std::fmt;

use ar_reshaper::form::LettersType;
use ar_reshaper::letters::letters_db::LETTERS_ARABIC;
use ar_reshaper::prelude::LigatureNames;
use ar_reshaper::{ArabicReshaper, ReshaperConfig};
use log::{debug, warn};
use unicode_bidi::{BidiInfo, Level};

static LETTERS: &[LettersType] = &LETTERS_ARABIC;

/// Ligatures enabled when the font maps every one of their presentation forms.
const FONT_LIGATURES: &[(LigatureNames, &[char])] = &[
    (LigatureNames::ARABIC_LIGATURE_BISMILLAH_AR_RAHMAN_AR_RAHEEM, &['\u{FDFD}']),
    (LigatureNames::ARABIC_LIGATURE_JALLAJALALOUHOU, &['\u{FDFB}']),
    (LigatureNames::ARABIC_LIGATURE_SALLALLAHOU_ALAYHE_WASALLAM, &['\u{FDFA}']),
    (LigatureNames::ARABIC_LIGATURE_ALLAH, &['\u{FDF2}']),
    (LigatureNames::ARABIC_LIGATURE_LAM_WITH_ALEF, &['\u{FEFB}', '\u{FEFC}']),
    (
        LigatureNames::ARABIC_LIGATURE_LAM_WITH_ALEF_WITH_HAMZA_ABOVE,
        &['\u{FEF7}', '\u{FEF8}'],
    ),
    (
        LigatureNames::ARABIC_LIGATURE_LAM_WITH_ALEF_WITH_HAMZA_BELOW,
        &['\u{FEF9}', '\u{FEFA}'],
    ),
    (
        LigatureNames::ARABIC_LIGATURE_LAM_WITH_ALEF_WITH_MADDA_ABOVE,
        &['\u{FEF5}', '\u{FEF6}'],
    ),
];

/// Font-driven shaping options.
///
/// Built once per process from the regular font and shared read-only by every render.
#[derive(Clone, Debug)]
pub struct ShapingConfig {
    unsupported: HashSet<char>,
    keep_harakat: bool,
    ligatures: bool,
}

impl Default for ShapingConfig {
    fn default() -> Self {
        Self {
            unsupported: HashSet::new(),
            keep_harakat: false,
            ligatures: true,
        }
    }
}

impl ShapingConfig {
    /// Derives the configuration from the glyph coverage of a TrueType font.
    ///
    /// Presentation forms that the font does not map are never emitted, and a ligature is only
    /// used when all of its forms are present.  Fonts that cannot be parsed degrade to the default
    /// configuration, which assumes full coverage.
    pub fn from_font_bytes(data: &[u8]) -> Self {
        match ttf_parser::Face::parse(data, 0) {
            Ok(face) => {
                let unsupported: HashSet<char> = presentation_forms()
                    .filter(|form| face.glyph_index(*form).is_none())
                    .collect();
                if !unsupported.is_empty() {
                    debug!(
                        "font lacks {} Arabic presentation forms; base letters will be used instead",
                        unsupported.len()
                    );
                }
                Self {
                    unsupported,
                    ..Self::default()
                }
            }
            Err(err) => {
                warn!("Unable to read glyph coverage from font ({err}); using default shaping configuration");
                Self::default()
            }
        }
    }

    /// Keeps diacritics in the output instead of dropping them.
    pub fn with_harakat(mut self, keep: bool) -> Self {
        self.keep_harakat = keep;
        self
    }

    /// Enables or disables all ligatures.
    pub fn with_ligatures(mut self, ligatures: bool) -> Self {
        self.ligatures = ligatures;
        self
    }

    /// Marks a presentation form as missing from the target font.
    pub fn without_glyph(mut self, glyph: char) -> Self {
        self.unsupported.insert(glyph);
        self
    }

    fn supports(&self, glyph: char) -> bool {
        !self.unsupported.contains(&glyph)
    }

    fn reshaper_config(&self) -> ReshaperConfig {
        let mut config = ReshaperConfig {
            delete_harakat: !self.keep_harakat,
            ..ReshaperConfig::default()
        };
        for (name, glyphs) in FONT_LIGATURES {
            let enabled = self.ligatures && glyphs.iter().all(|glyph| self.supports(*glyph));
            config.update_ligature(*name, enabled);
        }
        config
    }
}

/// Every presentation form the letter table can emit, plus the ligature glyphs.
fn presentation_forms() -> impl Iterator<Item = char> {
    LETTERS
        .iter()
        .flat_map(|(letter, forms)| {
            let letter = *letter;
            [forms.isolated, forms.initial, forms.medial, forms.end]
                .into_iter()
                .filter(move |form| *form != '\0' && *form != letter)
        })
        .chain(FONT_LIGATURES.iter().flat_map(|(_, glyphs)| glyphs.iter().copied()))
}

/// The letter a presentation form belongs to.
fn base_letter(glyph: char) -> Option<char> {
    LETTERS
        .iter()
        .find(|(_, forms)| {
            [forms.isolated, forms.initial, forms.medial, forms.end].contains(&glyph)
        })
        .map(|(letter, _)| *letter)
}

/// Combining marks the reshaper treats as harakat.
fn is_harakah(c: char) -> bool {
    matches!(
        c,
        '\u{0610}'..='\u{061A}'
            | '\u{064B}'..='\u{065F}'
            | '\u{0670}'
            | '\u{06D6}'..='\u{06DC}'
            | '\u{06DF}'..='\u{06E8}'
            | '\u{06EA}'..='\u{06ED}'
            | '\u{08D4}'..='\u{08FF}'
    )
}

/// Text that went through the reshaper, still in logical order.
///
/// Only [`TextShaper`] produces values of this type, so a string can not be reshaped twice by
/// accident.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ShapedText {
    logical: String,
    base_level: Option<Level>,
}

impl ShapedText {
    /// The reshaped text in logical (typing) order.
    pub fn as_logical(&self) -> &str {
        &self.logical
    }

    pub fn is_empty(&self) -> bool {
        self.logical.is_empty()
    }

    /// The complete text in visual order, one output line per input line.
    pub fn to_visual(&self) -> String {
        self.logical
            .split('\n')
            .map(|line| visual_order(line, self.base_level))
            .collect::<Vec<_>>()
            .join("\n")
    }

    /// Reorders a single line cut out of this text, using the paragraph direction of the whole
    /// text so that lines of one paragraph agree on their base direction.
    pub fn visual_line(&self, line: &str) -> String {
        visual_order(line, self.base_level)
    }
}

/// Reshapes and reorders Arabic text.
#[derive(Clone)]
pub struct TextShaper {
    config: ShapingConfig,
    reshaper: ArabicReshaper,
}

impl Default for TextShaper {
    fn default() -> Self {
        Self::new(ShapingConfig::default())
    }
}

impl fmt::Debug for TextShaper {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TextShaper")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl TextShaper {
    pub fn new(config: ShapingConfig) -> Self {
        let reshaper = ArabicReshaper::new(config.reshaper_config());
        Self { config, reshaper }
    }

    pub fn config(&self) -> &ShapingConfig {
        &self.config
    }

    /// Reshapes `text` into contextual presentation forms, keeping logical order.
    ///
    /// Absent and empty input yield an empty [`ShapedText`].
    pub fn shape<'a>(&self, text: impl Into<Option<&'a str>>) -> ShapedText {
        let text = text.into().unwrap_or_default();
        if text.is_empty() {
            return ShapedText::default();
        }
        ShapedText {
            base_level: paragraph_level(text),
            logical: self.reshape(text),
        }
    }

    /// Reshapes `text` and returns it in visual order, ready to be drawn left to right.
    pub fn shape_for_display<'a>(&self, text: impl Into<Option<&'a str>>) -> String {
        self.shape(text).to_visual()
    }

    fn reshape(&self, text: &str) -> String {
        // marks need a preceding character to attach to
        let text = if self.config.keep_harakat {
            text.trim_start_matches(is_harakah)
        } else {
            text
        };
        self.reshaper
            .reshape(text)
            .chars()
            .map(|glyph| {
                if self.config.supports(glyph) {
                    glyph
                } else {
                    base_letter(glyph).unwrap_or(glyph)
                }
            })
            .collect()
    }
}

fn paragraph_level(text: &str) -> Option<Level> {
    let first_line = text.split('\n').find(|line| !line.trim().is_empty())?;
    let info = BidiInfo::new(first_line, None);
    info.paragraphs.first().map(|paragraph| paragraph.level)
}

/// Reorders one line of text into visual order.
///
/// `base_level` forces the paragraph direction; `None` detects it from the first strong character.
pub fn visual_order(line: &str, base_level: Option<Level>) -> String {
    if line.is_empty() {
        return String::new();
    }

    let info = BidiInfo::new(line, base_level);
    if !info.has_rtl() {
        return line.to_owned();
    }

    let mut output = String::with_capacity(line.len());
    for paragraph in &info.paragraphs {
        let (levels, runs) = info.visual_runs(paragraph, paragraph.range.clone());
        for run in runs {
            let segment = &line[run.clone()];
            if levels[run.start].is_rtl() {
                output.extend(segment.chars().rev().map(mirror));
            } else {
                output.push_str(segment);
            }
        }
    }
    output
}

fn mirror(c: char) -> char {
    match c {
        '(' => ')',
        ')' => '(',
        '[' => ']',
        ']' => '[',
        '{' => '}',
        '}' => '{',
        '<' => '>',
        '>' => '<',
        '«' => '»',
        '»' => '«',
        other => other,
    }
}
