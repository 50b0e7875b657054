//! Content sniffing and PDF text extraction.

use lopdf::Document;

/// Content type assumed when the backend reports none.
pub const DEFAULT_CONTENT_TYPE: &str = "application/octet-stream";

/// Text returned in place of a PDF whose text cannot be extracted.
pub const PDF_EXTRACTION_FAILED: &str = "Error: Could not extract text from PDF file.";

/// Key extensions treated as text.
const TEXT_EXTENSIONS: &[&str] = &[
    ".txt", ".json", ".xml", ".html", ".htm", ".css", ".js", ".ts", ".md", ".csv", ".yml",
    ".yaml", ".log", ".sh", ".bash", ".py", ".rb", ".java", ".c", ".cpp", ".h", ".cs", ".php",
];

/// Content types treated as text besides `text/*`.
const TEXT_CONTENT_TYPES: &[&str] = &[
    "application/json",
    "application/xml",
    "application/javascript",
];

/// Returns the media type of a content type, without parameters.
fn essence(content_type: &str) -> String {
    content_type
        .split(';')
        .next()
        .unwrap_or_default()
        .trim()
        .to_ascii_lowercase()
}

/// Returns `true` if the object should be decoded as text.
#[must_use]
pub fn is_text_file(key: &str, content_type: &str) -> bool {
    let media_type = essence(content_type);
    if media_type.starts_with("text/") || TEXT_CONTENT_TYPES.contains(&media_type.as_str()) {
        return true;
    }

    let key = key.to_ascii_lowercase();
    TEXT_EXTENSIONS.iter().any(|ext| key.ends_with(ext))
}

/// Returns `true` if the object is a PDF document.
#[must_use]
pub fn is_pdf_file(key: &str, content_type: &str) -> bool {
    essence(content_type) == "application/pdf" || key.to_ascii_lowercase().ends_with(".pdf")
}

/// Extracts the text of every page of a PDF, in page order.
///
/// # Errors
///
/// Returns an error if the bytes are not a readable PDF.
pub fn pdf_to_text(bytes: &[u8]) -> Result<String, lopdf::Error> {
    let doc = Document::load_mem(bytes)?;
    let mut pages: Vec<u32> = doc.get_pages().keys().copied().collect();
    pages.sort_unstable();
    doc.extract_text(&pages)
}

/// Builds a one-page PDF drawing `text`, for tests.
#[cfg(test)]
pub(crate) fn sample_pdf(text: &str) -> Vec<u8> {
    use lopdf::content::{Content, Operation};
    use lopdf::{dictionary, Object, Stream};

    let mut doc = Document::with_version("1.5");
    let pages_id = doc.new_object_id();
    let font_id = doc.add_object(dictionary! {
        "Type" => "Font",
        "Subtype" => "Type1",
        "BaseFont" => "Courier",
        "Encoding" => "WinAnsiEncoding",
    });
    let resources_id = doc.add_object(dictionary! {
        "Font" => dictionary! {
            "F1" => font_id,
        },
    });
    let content = Content {
        operations: vec![
            Operation::new("BT", vec![]),
            Operation::new("Tf", vec!["F1".into(), 24.into()]),
            Operation::new("Td", vec![72.into(), 720.into()]),
            Operation::new("Tj", vec![Object::string_literal(text)]),
            Operation::new("ET", vec![]),
        ],
    };
    let content_id = doc.add_object(Stream::new(dictionary! {}, content.encode().unwrap()));
    let page_id = doc.add_object(dictionary! {
        "Type" => "Page",
        "Parent" => pages_id,
        "Contents" => content_id,
        "Resources" => resources_id,
    });
    doc.objects.insert(
        pages_id,
        Object::Dictionary(dictionary! {
            "Type" => "Pages",
            "Kids" => vec![page_id.into()],
            "Count" => 1,
            "MediaBox" => vec![0.into(), 0.into(), 612.into(), 792.into()],
        }),
    );
    let catalog_id = doc.add_object(dictionary! {
        "Type" => "Catalog",
        "Pages" => pages_id,
    });
    doc.trailer.set("Root", catalog_id);

    let mut bytes = Vec::new();
    doc.save_to(&mut bytes).unwrap();
    bytes
}
