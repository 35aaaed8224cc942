//! Row grouping (§4.8): a shared utility used by the Structural Matcher to
//! reconstruct a document's reading-order text, and by the LLM prompt
//! builder for the same purpose.

use crate::model::PositionedToken;

/// Vertical tolerance, in PDF points, for two tokens to be considered on the
/// same row (~2mm; §9 design note).
pub const Y_TOL: f64 = 5.0;

/// Groups tokens into rows (sorted top-to-bottom, then left-to-right within
/// a row) and renders the whole document as newline-joined row text.
pub fn render_document_text(tokens: &[PositionedToken]) -> String {
    group_rows(tokens)
        .into_iter()
        .map(|row| row.iter().map(|t| t.text.as_str()).collect::<Vec<_>>().join(" "))
        .collect::<Vec<_>>()
        .join("\n")
}

/// Groups tokens into rows per §4.8: sort by `(y, x)`, then walk tokens
/// maintaining a reference `y` for the open row; a token joins the row iff
/// `|token.y - y_ref| <= Y_TOL`, otherwise the row closes and a new one
/// opens. Each returned row is itself sorted by `x` ascending.
pub fn group_rows(tokens: &[PositionedToken]) -> Vec<Vec<&PositionedToken>> {
    let mut sorted: Vec<&PositionedToken> = tokens.iter().collect();
    sorted.sort_by(|a, b| {
        a.y.partial_cmp(&b.y).unwrap_or(std::cmp::Ordering::Equal).then(
            a.x.partial_cmp(&b.x).unwrap_or(std::cmp::Ordering::Equal),
        )
    });

    let mut rows: Vec<Vec<&PositionedToken>> = Vec::new();
    let mut current: Vec<&PositionedToken> = Vec::new();
    let mut y_ref: Option<f64> = None;

    for token in sorted {
        match y_ref {
            Some(y) if (token.y - y).abs() <= Y_TOL => {
                current.push(token);
            }
            Some(_) => {
                current.sort_by(|a, b| a.x.partial_cmp(&b.x).unwrap_or(std::cmp::Ordering::Equal));
                rows.push(std::mem::take(&mut current));
                current.push(token);
                y_ref = Some(token.y);
            }
            None => {
                current.push(token);
                y_ref = Some(token.y);
            }
        }
    }
    if !current.is_empty() {
        current.sort_by(|a, b| a.x.partial_cmp(&b.x).unwrap_or(std::cmp::Ordering::Equal));
        rows.push(current);
    }
    rows
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tok(text: &str, x: f64, y: f64) -> PositionedToken {
        PositionedToken { text: text.to_owned(), page: 0, x, y, page_width: 612.0, page_height: 792.0 }
    }

    #[test]
    fn groups_tokens_within_tolerance_into_one_row() {
        let tokens = vec![tok("Nome:", 100.0, 200.0), tok("JOANA", 150.0, 203.0)];
        let rows = group_rows(&tokens);
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].iter().map(|t| t.text.as_str()).collect::<Vec<_>>(), vec!["Nome:", "JOANA"]);
    }

    #[test]
    fn splits_rows_beyond_tolerance() {
        let tokens = vec![tok("Nome:", 100.0, 200.0), tok("CPF:", 100.0, 260.0)];
        let rows = group_rows(&tokens);
        assert_eq!(rows.len(), 2);
    }

    #[test]
    fn renders_rows_top_to_bottom_left_to_right() {
        let tokens = vec![
            tok("JOANA", 150.0, 200.0),
            tok("Nome:", 100.0, 200.0),
            tok("CPF:", 100.0, 260.0),
        ];
        assert_eq!(render_document_text(&tokens), "Nome: JOANA\nCPF:");
    }
}
