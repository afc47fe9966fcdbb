use serde_json::{Map, Value};

use crate::domain::error::{AppError, Result};
use crate::domain::highlight::{
    HighlightId, RawHighlight, StorageHighlight, UiHighlight, STORED_FIELD,
};

const TITLE_FIELDS: [&str; 2] = ["title", "name"];
const DESCRIPTION_FIELD: &str = "description";

/// Display and storage shapes derived from one raw batch.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct TransformedBatch {
    pub highlights: Vec<UiHighlight>,
    pub highlights_to_store: Vec<StorageHighlight>,
}

/// Validates a raw batch and derives both output shapes from it.
///
/// The whole batch is rejected if any record lacks a usable `id`.
pub fn transform_highlights(raw: &[RawHighlight]) -> Result<TransformedBatch> {
    let mut batch = TransformedBatch {
        highlights: Vec::with_capacity(raw.len()),
        highlights_to_store: Vec::with_capacity(raw.len()),
    };

    for (index, record) in raw.iter().enumerate() {
        let id = record.id().ok_or_else(|| {
            AppError::Transform(format!(
                "record {} has no usable id (got {})",
                index,
                record
                    .get("id")
                    .map(Value::to_string)
                    .unwrap_or_else(|| "nothing".to_string())
            ))
        })?;

        batch.highlights.push(to_ui_highlight(id, record));
        batch.highlights_to_store.push(to_storage_highlight(record));
    }

    Ok(batch)
}

fn to_ui_highlight(id: HighlightId, record: &RawHighlight) -> UiHighlight {
    let title = TITLE_FIELDS
        .iter()
        .find_map(|field| non_blank_str(record.get(field)))
        .map(str::to_string)
        .unwrap_or_else(|| format!("Highlight {}", id));
    let description = non_blank_str(record.get(DESCRIPTION_FIELD)).map(str::to_string);

    let attributes: Map<String, Value> = record
        .fields()
        .iter()
        .filter(|(key, _)| {
            key.as_str() != "id"
                && key.as_str() != DESCRIPTION_FIELD
                && !TITLE_FIELDS.contains(&key.as_str())
        })
        .map(|(key, value)| (key.clone(), value.clone()))
        .collect();

    UiHighlight {
        id,
        title,
        description,
        attributes,
    }
}

fn to_storage_highlight(record: &RawHighlight) -> StorageHighlight {
    let mut fields = record.fields().clone();
    fields.remove(STORED_FIELD);
    StorageHighlight {
        fields,
        stored: true,
    }
}

fn non_blank_str(value: Option<&Value>) -> Option<&str> {
    value
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|text| !text.is_empty())
}
