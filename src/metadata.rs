//! Document information post-processing built on top of `lopdf`.
//!
//! The layout engine only writes an ASCII-oriented title.  This pass reopens the rendered bytes
//! and stores title, author and subject as UTF-16 text strings so that PDF viewers show the
//! Arabic metadata correctly.

use lopdf::{Dictionary, Document, Object, StringFormat};

use crate::model::DocumentInfo;

/// Result of the metadata pass.
#[derive(Debug)]
pub struct FinishedPdf {
    pub bytes: Vec<u8>,
    pub page_count: usize,
}

/// Writes `info` into the document information dictionary, creating it when missing.
pub fn apply_document_info(pdf_bytes: &[u8], info: &DocumentInfo) -> Result<FinishedPdf, lopdf::Error> {
    let mut document = Document::load_mem(pdf_bytes)?;
    let page_count = document.get_pages().len();

    let existing = document
        .trailer
        .get(b"Info")
        .and_then(Object::as_reference)
        .ok();
    let info_id = match existing {
        Some(id) if document.get_dictionary(id).is_ok() => id,
        _ => {
            let id = document.add_object(Dictionary::new());
            document.trailer.set("Info", Object::Reference(id));
            id
        }
    };

    let dictionary = document.get_dictionary_mut(info_id)?;
    for (key, value) in [
        ("Title", &info.title),
        ("Author", &info.author),
        ("Subject", &info.subject),
    ] {
        if !value.is_empty() {
            dictionary.set(key, pdf_text_string(value));
        }
    }
    dictionary.set("Creator", pdf_text_string(env!("CARGO_PKG_NAME")));

    let mut bytes = Vec::new();
    document.save_to(&mut bytes).map_err(lopdf::Error::from)?;
    Ok(FinishedPdf { bytes, page_count })
}

/// Number of pages in a PDF.
pub fn page_count(pdf_bytes: &[u8]) -> Result<usize, lopdf::Error> {
    Ok(Document::load_mem(pdf_bytes)?.get_pages().len())
}

/// Encodes text as a PDF text string: UTF-16BE with a byte order mark.
fn pdf_text_string(text: &str) -> Object {
    let mut bytes = vec![0xFE, 0xFF];
    bytes.extend(text.encode_utf16().flat_map(u16::to_be_bytes));
    Object::String(bytes, StringFormat::Hexadecimal)
}

/// Decodes a PDF text string written by [`pdf_text_string`] or as plain bytes.
pub fn decode_text_string(bytes: &[u8]) -> String {
    match bytes {
        [0xFE, 0xFF, rest @ ..] => {
            let units: Vec<u16> = rest
                .chunks_exact(2)
                .map(|pair| u16::from_be_bytes([pair[0], pair[1]]))
                .collect();
            String::from_utf16_lossy(&units)
        }
        _ => String::from_utf8_lossy(bytes).into_owned(),
    }
}

/// Reads title, author and subject back from a PDF.
pub fn read_document_info(pdf_bytes: &[u8]) -> Result<DocumentInfo, lopdf::Error> {
    let document = Document::load_mem(pdf_bytes)?;
    let info_id = document.trailer.get(b"Info")?.as_reference()?;
    let dictionary = document.get_dictionary(info_id)?;
    let text = |key: &[u8]| {
        dictionary
            .get(key)
            .and_then(Object::as_str)
            .map(decode_text_string)
            .unwrap_or_default()
    };
    Ok(DocumentInfo {
        title: text(b"Title"),
        author: text(b"Author"),
        subject: text(b"Subject"),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use lopdf::dictionary;

    fn minimal_pdf(with_info: bool) -> Vec<u8> {
        let mut document = Document::with_version("1.5");
        let pages_id = document.new_object_id();
        let page_id = document.add_object(dictionary! {
            "Type" => "Page",
            "Parent" => pages_id,
            "MediaBox" => vec![0.into(), 0.into(), 595.into(), 842.into()],
        });
        document.objects.insert(
            pages_id,
            Object::Dictionary(dictionary! {
                "Type" => "Pages",
                "Kids" => vec![page_id.into()],
                "Count" => 1,
            }),
        );
        let catalog_id = document.add_object(dictionary! {
            "Type" => "Catalog",
            "Pages" => pages_id,
        });
        document.trailer.set("Root", catalog_id);
        if with_info {
            let info_id = document.add_object(dictionary! {
                "Title" => Object::string_literal("untitled"),
            });
            document.trailer.set("Info", info_id);
        }

        let mut bytes = Vec::new();
        document.save_to(&mut bytes).expect("save");
        bytes
    }

    fn arabic_info() -> DocumentInfo {
        DocumentInfo {
            title: "تقرير الجولات".to_string(),
            author: "ابتسام".to_string(),
            subject: String::new(),
        }
    }

    #[test]
    fn info_is_written_as_utf16() {
        let finished = apply_document_info(&minimal_pdf(true), &arabic_info()).expect("apply");
        assert_eq!(finished.page_count, 1);

        let info = read_document_info(&finished.bytes).expect("read");
        assert_eq!(info.title, "تقرير الجولات");
        assert_eq!(info.author, "ابتسام");
        assert_eq!(info.subject, "");
    }

    #[test]
    fn missing_info_dictionary_is_created() {
        let finished = apply_document_info(&minimal_pdf(false), &arabic_info()).expect("apply");
        let info = read_document_info(&finished.bytes).expect("read");
        assert_eq!(info.title, "تقرير الجولات");
    }

    #[test]
    fn garbage_is_rejected() {
        assert!(apply_document_info(b"not a pdf", &arabic_info()).is_err());
        assert!(page_count(b"").is_err());
    }

    #[test]
    fn text_strings_round_trip_through_utf16() {
        let Object::String(bytes, _) = pdf_text_string("سلام") else {
            unreachable!()
        };
        assert_eq!(&bytes[..2], &[0xFE, 0xFF]);
        assert_eq!(decode_text_string(&bytes), "سلام");
        assert_eq!(decode_text_string(b"plain"), "plain");
    }
}
