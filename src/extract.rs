//! Document text extraction
//!
//! Plain text out of uploaded PDF and DOCX term sheets.

use quick_xml::events::Event;
use std::io::{Cursor, Read};
use std::path::Path;
use tracing::{debug, info};

pub const MIME_PDF: &str = "application/pdf";
pub const MIME_DOCX: &str =
    "application/vnd.openxmlformats-officedocument.wordprocessingml.document";
pub const MIME_DOC: &str = "application/msword";

#[derive(thiserror::Error, Debug)]
pub enum ExtractError {
    #[error("Unsupported file type: {0}. Please upload a PDF or DOCX file.")]
    UnsupportedFormat(String),

    #[error("Failed to process the document: {0}")]
    ExtractionFailure(String),
}

/// Extract plain text from a document held in memory
pub fn extract(bytes: &[u8], mime_type: &str) -> Result<String, ExtractError> {
    debug!("Attempting to extract text for MIME type: {}", mime_type);

    let text = match mime_type {
        MIME_PDF => extract_pdf(bytes)?,
        MIME_DOCX => extract_docx(bytes)?,
        other => return Err(ExtractError::UnsupportedFormat(other.to_string())),
    };

    info!("📄 Extracted {} characters from {}", text.len(), mime_type);
    Ok(text)
}

/// MIME type for a file path, by extension
pub fn mime_type_for_path(path: &Path) -> Option<&'static str> {
    let ext = path.extension()?.to_str()?.to_ascii_lowercase();
    match ext.as_str() {
        "pdf" => Some(MIME_PDF),
        "docx" => Some(MIME_DOCX),
        "doc" => Some(MIME_DOC),
        _ => None,
    }
}

fn extract_pdf(bytes: &[u8]) -> Result<String, ExtractError> {
    pdf_extract::extract_text_from_mem(bytes).map_err(|e| {
        ExtractError::ExtractionFailure(format!("Failed to extract PDF text: {}", e))
    })
}

fn extract_docx(bytes: &[u8]) -> Result<String, ExtractError> {
    let failure = |message: String| ExtractError::ExtractionFailure(message);

    let mut archive = zip::ZipArchive::new(Cursor::new(bytes))
        .map_err(|e| failure(format!("Failed to read DOCX as ZIP: {}", e)))?;

    let mut doc_xml = String::new();
    archive
        .by_name("word/document.xml")
        .map_err(|_| failure("Invalid DOCX: missing word/document.xml".to_string()))?
        .read_to_string(&mut doc_xml)
        .map_err(|e| failure(format!("Failed to read document.xml: {}", e)))?;

    docx_xml_to_text(&doc_xml)
}

/// Collect `<w:t>` runs, one paragraph per block
fn docx_xml_to_text(doc_xml: &str) -> Result<String, ExtractError> {
    let mut reader = quick_xml::Reader::from_str(doc_xml);
    let mut output = String::new();
    let mut paragraph = String::new();
    let mut in_text = false;

    loop {
        match reader.read_event() {
            Ok(Event::Start(e)) => match e.local_name().as_ref() {
                b"p" => paragraph.clear(),
                b"t" => in_text = true,
                _ => {}
            },
            Ok(Event::Empty(e)) => match e.local_name().as_ref() {
                b"tab" => paragraph.push('\t'),
                b"br" | b"cr" => paragraph.push('\n'),
                _ => {}
            },
            Ok(Event::End(e)) => match e.local_name().as_ref() {
                b"p" => {
                    if !paragraph.is_empty() {
                        output.push_str(&paragraph);
                        output.push_str("\n\n");
                    }
                    paragraph.clear();
                }
                b"t" => in_text = false,
                _ => {}
            },
            Ok(Event::Text(e)) if in_text => {
                let text = e.unescape().map_err(xml_error)?;
                paragraph.push_str(&text);
            }
            Ok(Event::Eof) => break,
            Err(e) => return Err(xml_error(e)),
            _ => {}
        }
    }

    Ok(output.trim_end().to_string())
}

fn xml_error(e: quick_xml::Error) -> ExtractError {
    ExtractError::ExtractionFailure(format!("XML parse error: {}", e))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use zip::write::SimpleFileOptions;

    const DOCUMENT_XML: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<w:document xmlns:w="http://schemas.openxmlformats.org/wordprocessingml/2006/main">
  <w:body>
    <w:p><w:r><w:t>SERIES A PREFERRED STOCK</w:t></w:r></w:p>
    <w:p><w:r><w:t xml:space="preserve">Liquidation Preference: </w:t></w:r><w:r><w:t>1x non-participating &amp; senior</w:t></w:r></w:p>
    <w:p><w:r><w:t>Board:</w:t><w:tab/><w:t>2 of 5 seats</w:t></w:r></w:p>
    <w:p/>
  </w:body>
</w:document>"#;

    fn docx_bytes(document_xml: Option<&str>) -> Vec<u8> {
        let mut writer = zip::ZipWriter::new(Cursor::new(Vec::new()));
        writer
            .start_file("[Content_Types].xml", SimpleFileOptions::default())
            .unwrap();
        writer.write_all(b"<Types/>").unwrap();
        if let Some(xml) = document_xml {
            writer
                .start_file("word/document.xml", SimpleFileOptions::default())
                .unwrap();
            writer.write_all(xml.as_bytes()).unwrap();
        }
        writer.finish().unwrap().into_inner()
    }

    #[test]
    fn test_extract_docx() {
        let text = extract(&docx_bytes(Some(DOCUMENT_XML)), MIME_DOCX).unwrap();
        assert_eq!(
            text,
            "SERIES A PREFERRED STOCK\n\n\
             Liquidation Preference: 1x non-participating & senior\n\n\
             Board:\t2 of 5 seats"
        );
    }

    #[test]
    fn test_docx_without_document_xml() {
        let result = extract(&docx_bytes(None), MIME_DOCX);
        assert!(matches!(result, Err(ExtractError::ExtractionFailure(_))));
    }

    #[test]
    fn test_docx_that_is_not_a_zip() {
        let result = extract(b"plain bytes", MIME_DOCX);
        assert!(matches!(result, Err(ExtractError::ExtractionFailure(_))));
    }

    #[test]
    fn test_unsupported_format() {
        match extract(b"hello", "text/plain") {
            Err(ExtractError::UnsupportedFormat(mime)) => assert_eq!(mime, "text/plain"),
            other => panic!("unexpected: {:?}", other),
        }
        // Legacy .doc is accepted at upload but cannot be parsed
        assert!(matches!(
            extract(b"\xD0\xCF\x11\xE0", MIME_DOC),
            Err(ExtractError::UnsupportedFormat(_))
        ));
    }

    #[test]
    fn test_mime_type_for_path() {
        assert_eq!(mime_type_for_path(Path::new("deal/TermSheet.PDF")), Some(MIME_PDF));
        assert_eq!(mime_type_for_path(Path::new("term_sheet.docx")), Some(MIME_DOCX));
        assert_eq!(mime_type_for_path(Path::new("notes.txt")), None);
        assert_eq!(mime_type_for_path(Path::new("README")), None);
    }
}
