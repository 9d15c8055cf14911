use std::io::{Cursor, Read};

use anyhow::{Context, Result, anyhow, bail};
use base64::{Engine as _, engine::general_purpose::STANDARD as BASE64};
use pdf_extract::extract_text_from_mem as extract_pdf_text;
use quick_xml::{Reader as XmlReader, events::Event};
use zip::ZipArchive;

/// Extensions accepted by every upload endpoint.
pub const ALLOWED_EXTENSIONS: &[&str] = &["pdf", "docx", "pptx", "jpg", "jpeg", "png", "txt"];

const PNG_SIGNATURE: &[u8] = b"\x89PNG\r\n\x1a\n";
const JPEG_SIGNATURE: &[u8] = &[0xFF, 0xD8, 0xFF];

/// Lowercased text after the last `.`, if any.
pub fn file_extension(filename: &str) -> Option<String> {
    filename
        .rsplit_once('.')
        .map(|(_, ext)| ext.to_ascii_lowercase())
}

pub fn is_allowed_file(filename: &str) -> bool {
    file_extension(filename)
        .map(|ext| ALLOWED_EXTENSIONS.contains(&ext.as_str()))
        .unwrap_or(false)
}

#[derive(Debug, Clone, Copy, Eq, PartialEq)]
pub enum ImageFormat {
    Jpeg,
    Png,
}

impl ImageFormat {
    pub fn mime_type(&self) -> &'static str {
        match self {
            ImageFormat::Jpeg => "image/jpeg",
            ImageFormat::Png => "image/png",
        }
    }

    fn signature(&self) -> &'static [u8] {
        match self {
            ImageFormat::Jpeg => JPEG_SIGNATURE,
            ImageFormat::Png => PNG_SIGNATURE,
        }
    }
}

/// Supported upload kinds, keyed by extension.
#[derive(Debug, Clone, Copy, Eq, PartialEq)]
pub enum DocumentKind {
    Text,
    Pdf,
    Docx,
    Pptx,
    Image(ImageFormat),
}

/// Image bytes prepared for a multimodal request.
#[derive(Debug, Clone)]
pub struct ImagePayload {
    pub label: String,
    pub mime_type: &'static str,
    pub base64_data: String,
}

#[derive(Debug, Clone)]
pub enum ExtractedContent {
    Text(String),
    Image(ImagePayload),
}

impl DocumentKind {
    pub fn from_filename(filename: &str) -> Option<Self> {
        match file_extension(filename)?.as_str() {
            "txt" => Some(DocumentKind::Text),
            "pdf" => Some(DocumentKind::Pdf),
            "docx" => Some(DocumentKind::Docx),
            "pptx" => Some(DocumentKind::Pptx),
            "jpg" | "jpeg" => Some(DocumentKind::Image(ImageFormat::Jpeg)),
            "png" => Some(DocumentKind::Image(ImageFormat::Png)),
            _ => None,
        }
    }

    /// Turn raw upload bytes into text (or an encoded image). CPU bound; call from a
    /// blocking task.
    pub fn extract(&self, filename: &str, bytes: &[u8]) -> Result<ExtractedContent> {
        match self {
            DocumentKind::Text => Ok(ExtractedContent::Text(decode_utf8_ignoring_errors(bytes))),
            DocumentKind::Pdf => extract_pdf_text(bytes)
                .map(ExtractedContent::Text)
                .map_err(|err| anyhow!("failed to extract PDF text: {err}")),
            DocumentKind::Docx => extract_docx_text(bytes).map(ExtractedContent::Text),
            DocumentKind::Pptx => extract_pptx_text(bytes).map(ExtractedContent::Text),
            DocumentKind::Image(format) => {
                encode_image(filename, *format, bytes).map(ExtractedContent::Image)
            }
        }
    }
}

fn decode_utf8_ignoring_errors(bytes: &[u8]) -> String {
    bytes.utf8_chunks().map(|chunk| chunk.valid()).collect()
}

fn encode_image(filename: &str, format: ImageFormat, bytes: &[u8]) -> Result<ImagePayload> {
    if !bytes.starts_with(format.signature()) {
        bail!("cannot identify image file '{filename}'");
    }

    Ok(ImagePayload {
        label: format!("[Image uploaded: {filename}]"),
        mime_type: format.mime_type(),
        base64_data: BASE64.encode(bytes),
    })
}

fn read_archive_entry(archive: &mut ZipArchive<Cursor<&[u8]>>, name: &str) -> Result<String> {
    let mut entry = archive
        .by_name(name)
        .with_context(|| format!("missing {name} in archive"))?;
    let mut xml = String::new();
    entry
        .read_to_string(&mut xml)
        .with_context(|| format!("failed to read {name}"))?;
    Ok(xml)
}

/// One line per `w:p` paragraph of the main document part.
fn extract_docx_text(bytes: &[u8]) -> Result<String> {
    let mut archive = ZipArchive::new(Cursor::new(bytes)).context("failed to open DOCX archive")?;
    let xml = read_archive_entry(&mut archive, "word/document.xml")?;

    let mut reader = XmlReader::from_str(&xml);
    let mut buf = Vec::new();
    let mut paragraphs: Vec<String> = Vec::new();
    let mut in_paragraph = false;
    let mut in_text_node = false;

    loop {
        match reader.read_event_into(&mut buf) {
            Ok(Event::Start(ref e)) => match e.name().as_ref() {
                b"w:p" => {
                    paragraphs.push(String::new());
                    in_paragraph = true;
                }
                b"w:t" => in_text_node = true,
                b"w:tab" => push_to_last(&mut paragraphs, in_paragraph, "\t"),
                b"w:br" => push_to_last(&mut paragraphs, in_paragraph, "\n"),
                _ => {}
            },
            Ok(Event::Empty(ref e)) => match e.name().as_ref() {
                b"w:p" => paragraphs.push(String::new()),
                b"w:tab" => push_to_last(&mut paragraphs, in_paragraph, "\t"),
                b"w:br" => push_to_last(&mut paragraphs, in_paragraph, "\n"),
                _ => {}
            },
            Ok(Event::Text(e)) => {
                if in_text_node {
                    let value = e.unescape().map_err(|err| anyhow!(err))?;
                    push_to_last(&mut paragraphs, in_paragraph, &value);
                }
            }
            Ok(Event::End(ref e)) => match e.name().as_ref() {
                b"w:t" => in_text_node = false,
                b"w:p" => in_paragraph = false,
                _ => {}
            },
            Ok(Event::Eof) => break,
            Err(err) => return Err(anyhow!("failed to parse DOCX XML: {}", err)),
            _ => {}
        }
        buf.clear();
    }

    Ok(paragraphs
        .into_iter()
        .map(|paragraph| paragraph + "\n")
        .collect())
}

fn push_to_last(paragraphs: &mut [String], active: bool, value: &str) {
    if !active {
        return;
    }
    if let Some(last) = paragraphs.last_mut() {
        last.push_str(value);
    }
}

/// Slide parts sorted by their number, so `slide10.xml` follows `slide9.xml`.
fn slide_entries(archive: &ZipArchive<Cursor<&[u8]>>) -> Vec<String> {
    let mut slides: Vec<(u32, String)> = archive
        .file_names()
        .filter_map(|name| {
            let number = name
                .strip_prefix("ppt/slides/slide")?
                .strip_suffix(".xml")?
                .parse::<u32>()
                .ok()?;
            Some((number, name.to_string()))
        })
        .collect();
    slides.sort_by_key(|(number, _)| *number);
    slides.into_iter().map(|(_, name)| name).collect()
}

/// Text of every top-level `p:sp` shape across all slides, one shape per line.
fn extract_pptx_text(bytes: &[u8]) -> Result<String> {
    let mut archive = ZipArchive::new(Cursor::new(bytes)).context("failed to open PPTX archive")?;
    let slides = slide_entries(&archive);
    if slides.is_empty() {
        bail!("no slides found in presentation");
    }

    let mut output = String::new();
    for slide in slides {
        let xml = read_archive_entry(&mut archive, &slide)?;
        collect_slide_shapes(&xml, &mut output)
            .with_context(|| format!("failed to parse {slide}"))?;
    }

    Ok(output)
}

fn collect_slide_shapes(xml: &str, output: &mut String) -> Result<()> {
    let mut reader = XmlReader::from_str(xml);
    let mut buf = Vec::new();
    let mut group_depth = 0usize;
    let mut in_shape = false;
    let mut in_text_node = false;
    let mut paragraphs: Vec<String> = Vec::new();

    loop {
        match reader.read_event_into(&mut buf) {
            Ok(Event::Start(ref e)) => match e.name().as_ref() {
                b"p:grpSp" => group_depth += 1,
                b"p:sp" if group_depth == 0 => {
                    in_shape = true;
                    paragraphs.clear();
                }
                b"a:p" if in_shape => paragraphs.push(String::new()),
                b"a:t" if in_shape => in_text_node = true,
                _ => {}
            },
            Ok(Event::Empty(ref e)) => match e.name().as_ref() {
                b"p:sp" if group_depth == 0 => output.push('\n'),
                b"a:p" if in_shape => paragraphs.push(String::new()),
                b"a:br" if in_shape => push_to_last(&mut paragraphs, true, "\n"),
                _ => {}
            },
            Ok(Event::Text(e)) => {
                if in_text_node {
                    let value = e.unescape().map_err(|err| anyhow!(err))?;
                    push_to_last(&mut paragraphs, true, &value);
                }
            }
            Ok(Event::End(ref e)) => match e.name().as_ref() {
                b"p:grpSp" => group_depth = group_depth.saturating_sub(1),
                b"p:sp" if in_shape => {
                    output.push_str(&paragraphs.join("\n"));
                    output.push('\n');
                    in_shape = false;
                }
                b"a:t" => in_text_node = false,
                _ => {}
            },
            Ok(Event::Eof) => break,
            Err(err) => return Err(anyhow!("failed to parse slide XML: {}", err)),
            _ => {}
        }
        buf.clear();
    }

    Ok(())
}
