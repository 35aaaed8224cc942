//! Extraction prompt construction, grounded in the schema and the
//! document's row-grouped text (§6 "LLM client contract").

use pdfextract_core::Schema;

/// Builds the full prompt: field list with descriptions, the expected
/// JSON response shape, and the document text appended last so the model
/// sees instructions before content.
pub fn build_extraction_prompt(label: &str, schema: &Schema, document_text: &str) -> String {
    let fields_list: String =
        schema.iter().map(|(name, description)| format!("\"{name}\": \"{description}\"")).collect::<Vec<_>>().join("\n");
    let json_template = json_template(schema);

    format!(
        "Extract the following fields from the document labelled \"{label}\". \
The text is ordered top to bottom, left to right.\n\n\
EXTRACTION SCHEMA:\n{fields_list}\n\n\
Respond with ONLY a valid JSON object in this exact shape. \
If a field is not present in the document, return null for it.\n\n\
JSON FORMAT:\n{json_template}\n\n\
DOCUMENT_TEXT:\n{document_text}"
    )
}

fn json_template(schema: &Schema) -> String {
    let fields: String = schema.fields().map(|name| format!("\"{name}\": \"...\"")).collect::<Vec<_>>().join(", ");
    format!("{{{fields}}}")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn prompt_includes_label_fields_and_document_text() {
        let mut schema = Schema::new();
        schema.insert("nome", "full name");
        schema.insert("cpf", "taxpayer id");

        let prompt = build_extraction_prompt("oab", &schema, "Nome: JOANA\nCPF: 123.456.789-00");
        assert!(prompt.contains("oab"));
        assert!(prompt.contains("\"nome\": \"full name\""));
        assert!(prompt.contains("\"nome\": \"...\", \"cpf\": \"...\""));
        assert!(prompt.contains("Nome: JOANA"));
    }
}
