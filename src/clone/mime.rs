//! MIME naming and the content-capture relevance filter.

/// MIME prefixes whose content is never captured as diff text.
const IRRELEVANT_PREFIXES: &[&str] = &[
    "image/",
    "audio/",
    "video/",
    "model/",
    "chemical/",
    "application/vnd",
    "application/octet-stream",
];

/// True when diff text for content of this MIME type is worth storing.
pub fn is_mime_relevant(mime_type: &str) -> bool {
    if mime_type.is_empty() {
        return false;
    }
    !IRRELEVANT_PREFIXES
        .iter()
        .any(|prefix| mime_type.starts_with(prefix))
}

/// Name the MIME type of a blob from its path, falling back to a
/// content sniff: blobs carrying NUL bytes are binary.
pub fn sniff_mime(path: &str, bytes: Option<&[u8]>) -> String {
    let guessed = mime_guess::from_path(path).first_raw();
    if let Some(mime) = guessed {
        return mime.to_string();
    }
    match bytes {
        Some(content) if looks_binary(content) => "application/octet-stream".to_string(),
        Some(_) => "text/plain".to_string(),
        None => "unknown".to_string(),
    }
}

fn looks_binary(content: &[u8]) -> bool {
    content.iter().take(8000).any(|byte| *byte == 0)
}
