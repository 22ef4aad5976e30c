use crate::error::IngestError;
use crate::models::DocumentMetadata;
use lopdf::{Dictionary, Document, Object};
use sha2::{Digest, Sha256};
use std::fs;
use std::path::Path;
use tracing::debug;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageText {
    pub number: u32,
    pub text: String,
}

impl PageText {
    pub fn new(number: u32, text: impl Into<String>) -> Self {
        Self {
            number,
            text: text.into(),
        }
    }
}

/// Turns PDF bytes into ordered page texts. Pages without extractable
/// text are still returned, with an empty string.
pub trait PdfExtractor {
    fn extract_pages_from_bytes(&self, bytes: &[u8]) -> Result<Vec<PageText>, IngestError>;

    fn extract_metadata_from_bytes(&self, bytes: &[u8]) -> Result<DocumentMetadata, IngestError>;

    fn extract_pages(&self, path: &Path) -> Result<Vec<PageText>, IngestError> {
        let bytes = read_pdf(path)?;
        self.extract_pages_from_bytes(&bytes)
    }

    fn extract_metadata(&self, path: &Path) -> Result<DocumentMetadata, IngestError> {
        let bytes = read_pdf(path)?;
        self.extract_metadata_from_bytes(&bytes)
    }
}

#[derive(Debug, Default, Clone, Copy)]
pub struct LopdfExtractor;

impl PdfExtractor for LopdfExtractor {
    fn extract_pages_from_bytes(&self, bytes: &[u8]) -> Result<Vec<PageText>, IngestError> {
        let document = load_document(bytes)?;

        let mut pages = Vec::new();
        for (page_no, _page_id) in document.get_pages() {
            let text = document
                .extract_text(&[page_no])
                .map_err(|error| IngestError::PdfParse(error.to_string()))?;

            debug!(page = page_no, chars = text.chars().count(), "extracted page text");
            pages.push(PageText::new(page_no, text));
        }

        Ok(pages)
    }

    fn extract_metadata_from_bytes(&self, bytes: &[u8]) -> Result<DocumentMetadata, IngestError> {
        let document = load_document(bytes)?;
        let info = info_dictionary(&document);
        let field = |key: &[u8]| {
            info.and_then(|dict| dict.get(key).ok())
                .map(|value| object_text(&document, value))
                .unwrap_or_default()
        };

        Ok(DocumentMetadata {
            title: field(b"Title"),
            author: field(b"Author"),
            subject: field(b"Subject"),
            keywords: field(b"Keywords"),
            creator: field(b"Creator"),
            producer: field(b"Producer"),
            num_pages: document.get_pages().len(),
            checksum: digest_bytes(bytes),
        })
    }
}

pub fn extract_page_texts(path: &Path) -> Result<Vec<PageText>, IngestError> {
    LopdfExtractor.extract_pages(path)
}

pub fn digest_bytes(bytes: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(bytes);
    format!("{:x}", hasher.finalize())
}

fn read_pdf(path: &Path) -> Result<Vec<u8>, IngestError> {
    if path.file_name().is_none() {
        return Err(IngestError::MissingFileName(path.display().to_string()));
    }
    Ok(fs::read(path)?)
}

fn load_document(bytes: &[u8]) -> Result<Document, IngestError> {
    Document::load_mem(bytes).map_err(|error| IngestError::PdfParse(error.to_string()))
}

fn info_dictionary(document: &Document) -> Option<&Dictionary> {
    match document.trailer.get(b"Info").ok()? {
        Object::Reference(id) => document.get_object(*id).ok()?.as_dict().ok(),
        Object::Dictionary(dict) => Some(dict),
        _ => None,
    }
}

fn object_text(document: &Document, object: &Object) -> String {
    match object {
        Object::String(bytes, _) => decode_pdf_string(bytes),
        Object::Name(name) => String::from_utf8_lossy(name).into_owned(),
        Object::Reference(id) => document
            .get_object(*id)
            .map(|target| object_text(document, target))
            .unwrap_or_default(),
        _ => String::new(),
    }
}

/// PDF text strings are either UTF-16BE with a byte order mark or a
/// single-byte encoding; the latter is read leniently as UTF-8.
fn decode_pdf_string(bytes: &[u8]) -> String {
    match bytes {
        [0xFE, 0xFF, rest @ ..] => {
            let units = rest
                .chunks_exact(2)
                .map(|pair| u16::from_be_bytes([pair[0], pair[1]]));
            char::decode_utf16(units)
                .map(|unit| unit.unwrap_or(char::REPLACEMENT_CHARACTER))
                .collect()
        }
        _ => String::from_utf8_lossy(bytes).into_owned(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use lopdf::content::{Content, Operation};
    use lopdf::{dictionary, Stream};
    use tempfile::tempdir;

    /// One page per entry; `None` leaves the page without a content stream.
    fn text_pdf(pages: &[Option<&str>]) -> Vec<u8> {
        let mut doc = Document::with_version("1.5");
        let pages_id = doc.new_object_id();
        let font_id = doc.add_object(dictionary! {
            "Type" => "Font",
            "Subtype" => "Type1",
            "BaseFont" => "Courier",
        });
        let resources_id = doc.add_object(dictionary! {
            "Font" => dictionary! { "F1" => font_id },
        });

        let mut kids: Vec<Object> = Vec::new();
        for text in pages {
            let mut page = dictionary! {
                "Type" => "Page",
                "Parent" => pages_id,
                "Resources" => resources_id,
            };
            if let Some(text) = text {
                let content = Content {
                    operations: vec![
                        Operation::new("BT", vec![]),
                        Operation::new("Tf", vec!["F1".into(), 24.into()]),
                        Operation::new("Td", vec![72.into(), 720.into()]),
                        Operation::new("Tj", vec![Object::string_literal(*text)]),
                        Operation::new("ET", vec![]),
                    ],
                };
                let encoded = content.encode().expect("content should encode");
                let content_id = doc.add_object(Stream::new(dictionary! {}, encoded));
                page.set("Contents", content_id);
            }
            kids.push(doc.add_object(page).into());
        }

        doc.objects.insert(
            pages_id,
            Object::Dictionary(dictionary! {
                "Type" => "Pages",
                "Count" => kids.len() as i64,
                "Kids" => kids,
                "MediaBox" => vec![0.into(), 0.into(), 595.into(), 842.into()],
            }),
        );
        let catalog_id = doc.add_object(dictionary! {
            "Type" => "Catalog",
            "Pages" => pages_id,
        });
        doc.trailer.set("Root", catalog_id);

        let mut bytes = Vec::new();
        doc.save_to(&mut bytes).expect("in-memory pdf should serialize");
        bytes
    }

    fn sample_pdf(title: &str, page_count: usize) -> Vec<u8> {
        let mut doc = Document::with_version("1.5");
        let pages_id = doc.new_object_id();

        let kids: Vec<Object> = (0..page_count)
            .map(|_| {
                doc.add_object(dictionary! {
                    "Type" => "Page",
                    "Parent" => pages_id,
                })
                .into()
            })
            .collect();

        doc.objects.insert(
            pages_id,
            Object::Dictionary(dictionary! {
                "Type" => "Pages",
                "Kids" => kids,
                "Count" => page_count as i64,
                "MediaBox" => vec![0.into(), 0.into(), 595.into(), 842.into()],
            }),
        );

        let catalog_id = doc.add_object(dictionary! {
            "Type" => "Catalog",
            "Pages" => pages_id,
        });
        let info_id = doc.add_object(dictionary! {
            "Title" => Object::string_literal(title),
            "Author" => Object::string_literal("Test Author"),
            "Keywords" => Object::string_literal("test, pdf"),
        });
        doc.trailer.set("Root", catalog_id);
        doc.trailer.set("Info", info_id);

        let mut bytes = Vec::new();
        doc.save_to(&mut bytes).expect("in-memory pdf should serialize");
        bytes
    }

    #[test]
    fn metadata_reads_info_dictionary_and_page_count() {
        let bytes = sample_pdf("Test PDF", 2);

        let metadata = LopdfExtractor
            .extract_metadata_from_bytes(&bytes)
            .expect("metadata should be readable");

        assert_eq!(metadata.title, "Test PDF");
        assert_eq!(metadata.author, "Test Author");
        assert_eq!(metadata.keywords, "test, pdf");
        assert_eq!(metadata.subject, "");
        assert_eq!(metadata.num_pages, 2);
        assert_eq!(metadata.checksum, digest_bytes(&bytes));
    }

    #[test]
    fn pages_come_back_in_order_with_blank_pages_kept() {
        let bytes = text_pdf(&[Some("Hello AI"), None, Some("Second text page")]);

        let pages = LopdfExtractor
            .extract_pages_from_bytes(&bytes)
            .expect("pages should be extracted");

        let numbers: Vec<u32> = pages.iter().map(|page| page.number).collect();
        assert_eq!(numbers, vec![1, 2, 3]);
        assert_eq!(pages[0].text.trim(), "Hello AI");
        assert_eq!(pages[1].text, "");
        assert_eq!(pages[2].text.trim(), "Second text page");
    }

    #[test]
    fn pages_from_path_match_in_memory() -> Result<(), Box<dyn std::error::Error>> {
        let dir = tempdir()?;
        let path = dir.path().join("slides.pdf");
        let bytes = text_pdf(&[Some("Hello AI"), None]);
        fs::write(&path, &bytes)?;

        let from_path = extract_page_texts(&path)?;
        assert_eq!(from_path, LopdfExtractor.extract_pages_from_bytes(&bytes)?);
        assert_eq!(from_path.len(), 2);
        Ok(())
    }

    #[test]
    fn metadata_from_path_matches_in_memory() -> Result<(), Box<dyn std::error::Error>> {
        let dir = tempdir()?;
        let path = dir.path().join("notes.pdf");
        let bytes = sample_pdf("Lecture Notes", 1);
        fs::write(&path, &bytes)?;

        let from_path = LopdfExtractor.extract_metadata(&path)?;
        let from_bytes = LopdfExtractor.extract_metadata_from_bytes(&bytes)?;
        assert_eq!(from_path, from_bytes);
        Ok(())
    }

    #[test]
    fn unreadable_bytes_are_a_parse_error() {
        let result = LopdfExtractor.extract_pages_from_bytes(b"%PDF-1.4\n%broken");
        assert!(matches!(result, Err(IngestError::PdfParse(_))));
    }

    #[test]
    fn missing_file_is_an_io_error() -> Result<(), Box<dyn std::error::Error>> {
        let dir = tempdir()?;
        let result = extract_page_texts(&dir.path().join("absent.pdf"));
        assert!(matches!(result, Err(IngestError::Io(_))));
        Ok(())
    }

    #[test]
    fn utf16_strings_with_bom_are_decoded() {
        let encoded = [0xFE, 0xFF, 0x00, 0x41, 0x00, 0x49];
        assert_eq!(decode_pdf_string(&encoded), "AI");
        assert_eq!(decode_pdf_string(b"plain"), "plain");
    }

    #[test]
    fn checksum_is_reproducible() {
        assert_eq!(digest_bytes(b"abc"), digest_bytes(b"abc"));
        assert_ne!(digest_bytes(b"abc"), digest_bytes(b"abd"));
    }
}
