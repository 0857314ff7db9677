//! Upload validators.
//!
//! PDF uploads are double-checked: the first kilobyte must sniff as a PDF
//! and the filename must carry a `.pdf` extension. The checks are
//! independent so a renamed non-PDF is rejected by the sniff even though
//! its extension looks right.

use std::path::Path;

use super::ContentError;

/// Bytes fed to the magic-byte sniffer.
const SNIFF_LEN: usize = 1024;

/// Validate an uploaded PDF file.
pub fn validate_pdf(filename: &str, data: &[u8]) -> Result<(), ContentError> {
    let head = &data[..data.len().min(SNIFF_LEN)];
    let sniffed = infer::get(head).map(|kind| kind.mime_type());
    if sniffed != Some("application/pdf") {
        return Err(ContentError::UnsupportedFileType);
    }

    let extension = Path::new(filename)
        .extension()
        .and_then(|ext| ext.to_str())
        .map(str::to_lowercase);
    if extension.as_deref() != Some("pdf") {
        return Err(ContentError::UnacceptableExtension);
    }

    Ok(())
}

/// Validate an uploaded image file by magic bytes.
pub fn validate_image(data: &[u8]) -> Result<(), ContentError> {
    let head = &data[..data.len().min(SNIFF_LEN)];
    match infer::get(head) {
        Some(kind) if kind.matcher_type() == infer::MatcherType::Image => Ok(()),
        _ => Err(ContentError::UnsupportedFileType),
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    /// A minimal but well-formed PDF header.
    const PDF_BYTES: &[u8] = b"%PDF-1.4\n1 0 obj\n<< /Type /Catalog >>\nendobj\n%%EOF\n";

    /// A 1x1 PNG.
    const PNG_BYTES: &[u8] = &[
        0x89, 0x50, 0x4E, 0x47, 0x0D, 0x0A, 0x1A, 0x0A, 0x00, 0x00, 0x00, 0x0D, 0x49, 0x48, 0x44,
        0x52, 0x00, 0x00, 0x00, 0x01, 0x00, 0x00, 0x00, 0x01, 0x08, 0x06, 0x00, 0x00, 0x00, 0x1F,
        0x15, 0xC4, 0x89,
    ];

    #[test]
    fn genuine_pdf_with_correct_extension_passes() {
        assert!(validate_pdf("notes.pdf", PDF_BYTES).is_ok());
        assert!(validate_pdf("NOTES.PDF", PDF_BYTES).is_ok());
    }

    #[test]
    fn renamed_non_pdf_is_rejected_by_sniff() {
        let err = validate_pdf("sneaky.pdf", PNG_BYTES).unwrap_err();
        assert!(matches!(err, ContentError::UnsupportedFileType));
    }

    #[test]
    fn genuine_pdf_with_wrong_extension_is_rejected() {
        let err = validate_pdf("notes.jpg", PDF_BYTES).unwrap_err();
        assert!(matches!(err, ContentError::UnacceptableExtension));

        let err = validate_pdf("notes", PDF_BYTES).unwrap_err();
        assert!(matches!(err, ContentError::UnacceptableExtension));
    }

    #[test]
    fn image_sniffing() {
        assert!(validate_image(PNG_BYTES).is_ok());
        assert!(matches!(
            validate_image(PDF_BYTES),
            Err(ContentError::UnsupportedFileType)
        ));
        assert!(matches!(
            validate_image(b""),
            Err(ContentError::UnsupportedFileType)
        ));
    }
}
