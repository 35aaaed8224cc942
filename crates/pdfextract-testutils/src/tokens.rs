//! Shorthand constructors for [`PositionedToken`] fixtures, so tests can
//! write a row of tokens without repeating the page-dimension boilerplate.

use pdfextract_core::model::PositionedToken;

pub const PAGE_WIDTH: f64 = 612.0;
pub const PAGE_HEIGHT: f64 = 792.0;

/// A token on page 0 of a US-Letter page at the given coordinates.
pub fn token(text: &str, x: f64, y: f64) -> PositionedToken {
    PositionedToken {
        text: text.to_string(),
        page: 0,
        x,
        y,
        page_width: PAGE_WIDTH,
        page_height: PAGE_HEIGHT,
    }
}

/// Builds a row of tokens left-to-right starting at `(x0, y)`, spaced by
/// `dx` per token — useful for structural-matcher and row-grouping fixtures.
pub fn row(texts: &[&str], x0: f64, y: f64, dx: f64) -> Vec<PositionedToken> {
    texts.iter().enumerate().map(|(i, text)| token(text, x0 + dx * i as f64, y)).collect()
}
