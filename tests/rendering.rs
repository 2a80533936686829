use std::path::PathBuf;

use chrono::NaiveDate;
use lopdf::{Document, Object};
use rtl_report::fonts::{self, CENTER_LOGO_FILE, LEFT_LOGO_FILE, REGULAR_FONT_FILE};
use rtl_report::metadata;
use rtl_report::{
    AbsenceRow, AssetPaths, Branding, FixedClock, RenderedDocument, ReportInput, ReportRenderer,
    ReportTemplate,
};
use sha2::{Digest, Sha256};

const FALLBACK_FONTS: &[&str] = &[
    "/usr/share/fonts/truetype/dejavu/DejaVuSans.ttf",
    "/usr/share/fonts/dejavu/DejaVuSans.ttf",
];

/// An Arabic-capable font: the bundled asset, `RTL_REPORT_TEST_FONT`, or a system DejaVu Sans.
fn test_font() -> Option<PathBuf> {
    let bundled = PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .join("assets")
        .join(REGULAR_FONT_FILE);
    std::iter::once(bundled)
        .chain(std::env::var_os("RTL_REPORT_TEST_FONT").map(PathBuf::from))
        .chain(FALLBACK_FONTS.iter().map(PathBuf::from))
        .find(|path| path.is_file())
}

fn renderer() -> Option<ReportRenderer> {
    let font = test_font()?;
    let fonts = fonts::ensure_fonts(&font, None).expect("register test font");
    // an empty assets root: no logos
    let assets = AssetPaths::new(std::env::temp_dir().join("rtl-report-no-assets"));
    Some(ReportRenderer::new(fonts, assets, Branding::default()))
}

/// A renderer whose assets root holds an RGBA center logo and an RGB left logo.
fn renderer_with_logos(root: &std::path::Path) -> Option<ReportRenderer> {
    let font = test_font()?;
    std::fs::create_dir_all(root.join("images")).expect("images dir");
    image::RgbaImage::from_pixel(600, 300, image::Rgba([0, 90, 60, 128]))
        .save(root.join(CENTER_LOGO_FILE))
        .expect("write center logo");
    image::RgbImage::from_pixel(200, 200, image::Rgb([200, 30, 30]))
        .save(root.join(LEFT_LOGO_FILE))
        .expect("write left logo");

    let fonts = fonts::ensure_fonts(&font, None).expect("register test font");
    Some(ReportRenderer::new(
        fonts,
        AssetPaths::new(root),
        Branding::default(),
    ))
}

fn resolve<'a>(document: &'a Document, object: &'a Object) -> &'a Object {
    match object {
        Object::Reference(id) => document.get_object(*id).expect("dangling reference"),
        other => other,
    }
}

/// Number of image XObjects in the resources of each page, in page order.
fn images_per_page(bytes: &[u8]) -> Vec<usize> {
    let document = Document::load_mem(bytes).expect("parse rendered pdf");
    document
        .get_pages()
        .values()
        .map(|page_id| {
            let page = document.get_dictionary(*page_id).expect("page dictionary");
            let Ok(resources) = page.get(b"Resources") else {
                return 0;
            };
            let resources = resolve(&document, resources).as_dict().expect("resources");
            let Ok(xobjects) = resources.get(b"XObject") else {
                return 0;
            };
            let xobjects = resolve(&document, xobjects).as_dict().expect("xobjects");
            xobjects
                .iter()
                .filter(|(_, object)| match resolve(&document, object) {
                    Object::Stream(stream) => matches!(
                        stream.dict.get(b"Subtype"),
                        Ok(Object::Name(name)) if name.as_slice() == b"Image"
                    ),
                    _ => false,
                })
                .count()
        })
        .collect()
}

fn clock() -> FixedClock {
    FixedClock::on(NaiveDate::from_ymd_opt(2024, 9, 3).expect("valid date"))
}

fn rows(count: usize) -> ReportInput {
    ReportInput {
        rows: (1..=count)
            .map(|i| AbsenceRow::new(format!("المعلمة رقم {i}"), "إجازة اضطرارية (مرضية)"))
            .collect(),
        ..ReportInput::default()
    }
}

fn render(renderer: &ReportRenderer, template: ReportTemplate, input: &ReportInput) -> RenderedDocument {
    renderer
        .render(template, input, &clock())
        .expect("render report")
}

fn scrub_pdf(bytes: &[u8]) -> Vec<u8> {
    fn scrub_segment(data: &mut [u8], tag: &[u8], terminator: u8) {
        let mut index = 0;
        while index + tag.len() < data.len() {
            if data[index..].starts_with(tag) {
                let mut cursor = index + tag.len();
                while cursor < data.len() && data[cursor] != terminator {
                    if terminator == b')'
                        || !matches!(data[cursor], b'<' | b'>' | b' ' | b'\n' | b'\r' | b'\t')
                    {
                        data[cursor] = b'0';
                    }
                    cursor += 1;
                }
                index = cursor;
            } else {
                index += 1;
            }
        }
    }

    fn scrub_xml(data: &mut [u8], start: &[u8], end: &[u8]) {
        let mut offset = 0;
        while offset + start.len() < data.len() {
            let Some(start_pos) = data[offset..]
                .windows(start.len())
                .position(|window| window == start)
            else {
                break;
            };
            let start_index = offset + start_pos + start.len();
            let Some(end_pos) = data[start_index..]
                .windows(end.len())
                .position(|window| window == end)
            else {
                break;
            };
            for byte in &mut data[start_index..start_index + end_pos] {
                *byte = b'0';
            }
            offset = start_index + end_pos + end.len();
        }
    }

    let mut normalized = bytes.to_vec();
    scrub_segment(&mut normalized, b"/CreationDate(", b')');
    scrub_segment(&mut normalized, b"/ModDate(", b')');
    scrub_segment(&mut normalized, b"/ID[", b']');
    for tag in [
        "xmp:CreateDate",
        "xmp:ModifyDate",
        "xmp:MetadataDate",
        "xmpMM:DocumentID",
        "xmpMM:InstanceID",
        "xmpMM:VersionID",
    ] {
        scrub_xml(
            &mut normalized,
            format!("<{tag}>").as_bytes(),
            format!("</{tag}>").as_bytes(),
        );
    }
    normalized
}

fn normalized_hash(bytes: &[u8]) -> [u8; 32] {
    Sha256::digest(scrub_pdf(bytes)).into()
}

#[test]
fn every_template_renders_without_rows() {
    let Some(renderer) = renderer() else {
        eprintln!("Skipping every_template_renders_without_rows: no Arabic font found. Set RTL_REPORT_TEST_FONT.");
        return;
    };

    for template in ReportTemplate::ALL {
        let document = render(&renderer, template, &ReportInput::default());
        assert!(document.bytes.starts_with(b"%PDF"), "{template}");
        assert_eq!(document.page_count, 1, "{template}");
        assert!(document.filename.ends_with("_20240903_000000.pdf"));
    }
}

#[test]
fn many_rows_spill_onto_further_pages() {
    let Some(renderer) = renderer() else {
        eprintln!("Skipping many_rows_spill_onto_further_pages: no Arabic font found. Set RTL_REPORT_TEST_FONT.");
        return;
    };

    let document = render(&renderer, ReportTemplate::Rounds, &rows(80));
    assert!(document.page_count > 1, "got {} pages", document.page_count);
    assert_eq!(
        metadata::page_count(&document.bytes).expect("parse rendered pdf"),
        document.page_count
    );
}

#[test]
fn logos_are_drawn_on_every_page() {
    let dir = tempfile::tempdir().expect("tempdir");
    let Some(renderer) = renderer_with_logos(dir.path()) else {
        eprintln!("Skipping logos_are_drawn_on_every_page: no Arabic font found. Set RTL_REPORT_TEST_FONT.");
        return;
    };

    let document = render(&renderer, ReportTemplate::Rounds, &rows(80));
    assert!(document.page_count > 1, "got {} pages", document.page_count);
    let images = images_per_page(&document.bytes);
    assert_eq!(images.len(), document.page_count);
    assert!(images.iter().all(|count| *count == 2), "images per page: {images:?}");

    let weekly = render(&renderer, ReportTemplate::WeeklyVisits, &ReportInput::default());
    assert_eq!(images_per_page(&weekly.bytes), vec![2]);
}

#[test]
fn metadata_carries_shaped_arabic() {
    let Some(renderer) = renderer() else {
        eprintln!("Skipping metadata_carries_shaped_arabic: no Arabic font found. Set RTL_REPORT_TEST_FONT.");
        return;
    };

    let document = render(&renderer, ReportTemplate::Attendance, &rows(2));
    let info = metadata::read_document_info(&document.bytes).expect("document info");
    let shaper = renderer.shaper();
    assert_eq!(info.title, shaper.shape_for_display("تقرير متابعة غياب المعلمات"));
    assert_eq!(info.author, shaper.shape_for_display("ابتسام الفيفي"));
}

#[test]
fn rendering_is_deterministic() {
    let Some(renderer) = renderer() else {
        eprintln!("Skipping rendering_is_deterministic: no Arabic font found. Set RTL_REPORT_TEST_FONT.");
        return;
    };

    let input = rows(5);
    let first = render(&renderer, ReportTemplate::Rounds, &input);
    let second = render(&renderer, ReportTemplate::Rounds, &input);

    assert_eq!(first.bytes.len(), second.bytes.len(), "PDF sizes should match");
    assert_eq!(
        normalized_hash(&first.bytes),
        normalized_hash(&second.bytes),
        "PDF renders must be deterministic after metadata normalization"
    );
}

#[test]
fn missing_bold_face_reuses_the_regular_face() {
    let Some(font) = test_font() else {
        eprintln!("Skipping missing_bold_face_reuses_the_regular_face: no Arabic font found.");
        return;
    };

    let dir = tempfile::tempdir().expect("tempdir");
    let fonts = fonts::ensure_fonts(&font, Some(&dir.path().join("missing-bold.ttf")))
        .expect("regular font is enough");
    assert_eq!(fonts.bold_id(), fonts.regular_id());

    let fonts = fonts::ensure_fonts(&font, Some(&font)).expect("both faces");
    assert_ne!(fonts.bold_id(), fonts.regular_id());
}
