//! Plain-text extraction from uploaded document containers.
//!
//! Both extractors take the raw upload bytes and return the document's visible
//! text. A document that parses but contains no text (scanned PDFs, empty
//! DOCX bodies) is reported as [`ExtractionError::Empty`] so the API layer can
//! reject it as a client error instead of feeding nothing to the model.

use quick_xml::Reader;
use quick_xml::events::Event;
use std::io::{Cursor, Read};
use thiserror::Error;
use zip::ZipArchive;

/// Errors produced while turning uploaded bytes into plain text.
#[derive(Debug, Error)]
pub enum ExtractionError {
    /// Document parsed successfully but contained no visible text.
    #[error("Could not extract text from {0} file.")]
    Empty(&'static str),
    /// PDF byte stream could not be parsed.
    #[error("Failed to read PDF: {0}")]
    Pdf(String),
    /// DOCX archive was missing, malformed, or held invalid XML.
    #[error("Failed to read DOCX: {0}")]
    Docx(String),
}

/// Extract the text of every page of a PDF, in page order.
pub fn pdf_text(bytes: &[u8]) -> Result<String, ExtractionError> {
    let text = pdf_extract::extract_text_from_mem(bytes)
        .map_err(|err| ExtractionError::Pdf(err.to_string()))?;
    if text.trim().is_empty() {
        return Err(ExtractionError::Empty("PDF"));
    }
    Ok(text)
}

/// Extract paragraph text from a DOCX archive, one line per paragraph.
pub fn docx_text(bytes: &[u8]) -> Result<String, ExtractionError> {
    let mut archive =
        ZipArchive::new(Cursor::new(bytes)).map_err(|err| ExtractionError::Docx(err.to_string()))?;
    let mut xml = String::new();
    archive
        .by_name("word/document.xml")
        .map_err(|err| ExtractionError::Docx(err.to_string()))?
        .read_to_string(&mut xml)
        .map_err(|err| ExtractionError::Docx(err.to_string()))?;

    let text = document_xml_text(&xml)?;
    if text.trim().is_empty() {
        return Err(ExtractionError::Empty("DOCX"));
    }
    Ok(text)
}

/// Walk WordprocessingML and collect runs of `w:t` text.
///
/// A paragraph end (`w:p`) emits a newline, explicit breaks (`w:br`) map to
/// newlines, and tabs (`w:tab`) to tab characters. Everything else in the
/// document body (styling, tables markup, revision data) is skipped.
fn document_xml_text(xml: &str) -> Result<String, ExtractionError> {
    let mut reader = Reader::from_str(xml);
    let mut buf = Vec::new();
    let mut output = String::new();
    let mut in_text_node = false;

    loop {
        match reader.read_event_into(&mut buf) {
            Ok(Event::Start(ref e)) => match e.name().as_ref() {
                b"w:t" => in_text_node = true,
                b"w:tab" => output.push('\t'),
                b"w:br" => output.push('\n'),
                _ => {}
            },
            Ok(Event::Empty(ref e)) => match e.name().as_ref() {
                b"w:tab" => output.push('\t'),
                b"w:br" => output.push('\n'),
                _ => {}
            },
            Ok(Event::Text(e)) => {
                if in_text_node {
                    let value = e
                        .unescape()
                        .map_err(|err| ExtractionError::Docx(err.to_string()))?;
                    output.push_str(&value);
                }
            }
            Ok(Event::End(ref e)) => match e.name().as_ref() {
                b"w:t" => in_text_node = false,
                b"w:p" => output.push('\n'),
                _ => {}
            },
            Ok(Event::Eof) => break,
            Err(err) => return Err(ExtractionError::Docx(err.to_string())),
            _ => {}
        }
        buf.clear();
    }

    Ok(output)
}
