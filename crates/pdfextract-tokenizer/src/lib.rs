//! PDF tokeniser contract (§6 "PDF tokeniser contract") and a
//! `pdfium-render`-backed implementation.
//!
//! The teacher crate already links `pdfium-render` (statically, for page
//! rendering in its GUI); this reuses the same library binding for text
//! extraction instead, which the teacher never needed since its table
//! extraction went through `tabula`.

use std::path::Path;

use log::warn;
use pdfextract_core::error::TokenizeError;
use pdfextract_core::model::PositionedToken;
use pdfextract_core::traits::PdfTokenizer;
use pdfium_render::prelude::*;

/// Tokenises PDFs via a process-local, statically-linked Pdfium instance.
///
/// `Pdfium` is not `Sync`; callers that need concurrent tokenisation should
/// run each call on its own blocking task (the Pipeline does this via
/// `spawn_blocking`) rather than share one `PdfiumTokenizer` across threads
/// at the same instant.
pub struct PdfiumTokenizer {
    pdfium: Pdfium,
}

impl PdfiumTokenizer {
    pub fn new() -> Result<Self, TokenizeError> {
        let bindings = Pdfium::bind_to_statically_linked_library()
            .map_err(|e| TokenizeError::Parse(format!("failed to bind pdfium library: {e}")))?;
        Ok(PdfiumTokenizer { pdfium: Pdfium::new(bindings) })
    }
}

impl PdfTokenizer for PdfiumTokenizer {
    fn tokenize(&self, pdf_path: &Path) -> Result<Vec<PositionedToken>, TokenizeError> {
        let document = self
            .pdfium
            .load_pdf_from_file(pdf_path, None)
            .map_err(|e| TokenizeError::Parse(format!("failed to load PDF: {e}")))?;

        let mut tokens = Vec::new();

        for (page_index, page) in document.pages().iter().enumerate() {
            let page_width = page.width().value as f64;
            let page_height = page.height().value as f64;

            let text_page = match page.text() {
                Ok(text_page) => text_page,
                Err(e) => {
                    warn!("page {page_index} has no extractable text layer: {e}");
                    continue;
                }
            };

            for segment in text_page.segments().iter() {
                let text = segment.text();
                let trimmed = text.trim();
                if trimmed.is_empty() {
                    continue;
                }

                let bounds = segment.bounds();
                tokens.push(PositionedToken {
                    text: trimmed.to_string(),
                    page: page_index as u32,
                    x: bounds.left().value as f64,
                    y: bounds.top().value as f64,
                    page_width,
                    page_height,
                });
            }
        }

        Ok(tokens)
    }
}

#[cfg(test)]
mod tests {
    // `PdfiumTokenizer` requires a linked pdfium library at test time and is
    // exercised through integration fixtures in `pdfextract-testutils`
    // rather than here; this module only guards the trait wiring compiles.
    use super::*;

    fn _assert_implements_trait<T: PdfTokenizer>() {}

    #[test]
    fn pdfium_tokenizer_implements_pdf_tokenizer() {
        _assert_implements_trait::<PdfiumTokenizer>();
    }
}
