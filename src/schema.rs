//! Invoice data model, schema generation, and response validation.
//!
//! The typed record below is the single source of truth for the wire format:
//! [`invoice_schema`] derives the JSON Schema sent to the model as its output
//! constraint, and [`parse_invoice`] validates the model's reply against that
//! same schema before deserialising it. Doc comments on the fields double as
//! schema `description`s, which is how the model learns what each field means.

use once_cell::sync::Lazy;
use schemars::{schema_for, JsonSchema};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::ExtractError;

// ── Bounding boxes ───────────────────────────────────────────────────────

/// A rectangular region on a PDF page in normalized coordinates.
///
/// Component order is `[y_min, x_min, y_max, x_max]`, each scaled to 0–1000
/// against the page height/width. The all-zero box is the model's "field not
/// located" sentinel.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, JsonSchema,
)]
#[serde(transparent)]
pub struct BoundingBox(pub [i64; 4]);

impl BoundingBox {
    /// The "not located" sentinel.
    pub const ZERO: BoundingBox = BoundingBox([0, 0, 0, 0]);

    pub fn new(y_min: i64, x_min: i64, y_max: i64, x_max: i64) -> Self {
        BoundingBox([y_min, x_min, y_max, x_max])
    }

    /// True when every component is zero, i.e. the field was not located.
    pub fn is_zero(&self) -> bool {
        self.0 == [0, 0, 0, 0]
    }

    pub fn y_min(&self) -> i64 {
        self.0[0]
    }

    pub fn x_min(&self) -> i64 {
        self.0[1]
    }

    pub fn y_max(&self) -> i64 {
        self.0[2]
    }

    pub fn x_max(&self) -> i64 {
        self.0[3]
    }
}

/// Where a field was found: box plus 1-based page number.
///
/// Flattened into every field object on the wire, so each field carries its
/// own `bounding_box` and `page` keys next to its value.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct FieldLocation {
    /// The bounding box where the information was found [y_min, x_min, y_max, x_max].
    pub bounding_box: BoundingBox,

    /// Page number where the information was found. Start counting with 1.
    pub page: u32,
}

impl FieldLocation {
    /// The box and page when the field was actually located, `None` when the
    /// model reported the all-zero sentinel.
    pub fn locate(&self) -> Option<(BoundingBox, u32)> {
        if self.bounding_box.is_zero() {
            None
        } else {
            Some((self.bounding_box, self.page))
        }
    }
}

// ── Field kinds ──────────────────────────────────────────────────────────

/// Total amount of the invoice.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct TotalAmountField {
    /// The total amount of the invoice.
    pub value: f64,

    #[serde(flatten)]
    pub location: FieldLocation,
}

/// Recipient of the invoice.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct RecipientField {
    /// The name of the recipient.
    pub name: String,

    #[serde(flatten)]
    pub location: FieldLocation,
}

/// Tax amount on the invoice.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct TaxAmountField {
    /// The total amount of the tax.
    pub value: f64,

    #[serde(flatten)]
    pub location: FieldLocation,
}

/// Sender of the invoice.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct SenderField {
    /// The name of the sender.
    pub name: String,

    #[serde(flatten)]
    pub location: FieldLocation,
}

/// Account number on the invoice.
///
/// Kept as text: account numbers carry leading zeros and separators that a
/// numeric type would destroy.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct AccountNumberField {
    /// The number of the account.
    pub account_no: String,

    #[serde(flatten)]
    pub location: FieldLocation,
}

/// The closed set of extracted field kinds.
///
/// The five kinds share the box-and-page location shape but differ in their
/// value payload; this enum gives annotation and reporting a stable label per
/// kind without any dispatch hierarchy.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldKind {
    Total,
    Recipient,
    Tax,
    Sender,
    AccountNo,
}

impl FieldKind {
    /// Stable label text, used for annotation and progress output.
    pub fn label(self) -> &'static str {
        match self {
            FieldKind::Total => "total",
            FieldKind::Recipient => "recipient",
            FieldKind::Tax => "tax",
            FieldKind::Sender => "sender",
            FieldKind::AccountNo => "account_no",
        }
    }
}

// ── The record ───────────────────────────────────────────────────────────

/// One validated extraction result: all five invoice fields.
///
/// Constructed only by [`parse_invoice`]; immutable afterwards. Field order
/// here is the order annotation draws in.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct InvoiceRecord {
    pub total: TotalAmountField,
    pub recipient: RecipientField,
    pub tax: TaxAmountField,
    pub sender: SenderField,
    pub account_no: AccountNumberField,
}

/// One annotation work item: label plus an optional box/page.
///
/// Absent box or page means "nothing to draw for this field" and is skipped
/// silently by the renderer.
#[derive(Debug, Clone, PartialEq)]
pub struct LabeledBox {
    pub label: String,
    pub bounding_box: Option<BoundingBox>,
    pub page: Option<u32>,
}

impl InvoiceRecord {
    /// Iterate the five (kind, location) pairs in drawing order.
    pub fn locations(&self) -> [(FieldKind, &FieldLocation); 5] {
        [
            (FieldKind::Total, &self.total.location),
            (FieldKind::Recipient, &self.recipient.location),
            (FieldKind::Tax, &self.tax.location),
            (FieldKind::Sender, &self.sender.location),
            (FieldKind::AccountNo, &self.account_no.location),
        ]
    }

    /// Derive the annotation items for this record.
    ///
    /// A field whose box is the all-zero sentinel yields an item with no box
    /// and no page, so the renderer skips it.
    pub fn labeled_boxes(&self) -> Vec<LabeledBox> {
        self.locations()
            .into_iter()
            .map(|(kind, location)| match location.locate() {
                Some((bounding_box, page)) => LabeledBox {
                    label: kind.label().to_string(),
                    bounding_box: Some(bounding_box),
                    page: Some(page),
                },
                None => LabeledBox {
                    label: kind.label().to_string(),
                    bounding_box: None,
                    page: None,
                },
            })
            .collect()
    }

    /// Count of fields the model actually located.
    pub fn located_count(&self) -> usize {
        self.locations()
            .into_iter()
            .filter(|(_, l)| l.locate().is_some())
            .count()
    }
}

// ── Schema generation and validation ─────────────────────────────────────

/// The JSON Schema the model's output is constrained to.
///
/// Derived from [`InvoiceRecord`]; every field object is required, bounding
/// boxes are integer arrays of exactly four elements, and pages are integers.
pub fn invoice_schema() -> Value {
    serde_json::to_value(schema_for!(InvoiceRecord))
        .expect("invoice schema serialises to JSON")
}

static VALIDATOR: Lazy<Result<jsonschema::Validator, String>> =
    Lazy::new(|| jsonschema::validator_for(&invoice_schema()).map_err(|e| e.to_string()));

/// Validate and parse a model reply into an [`InvoiceRecord`].
///
/// Fails with [`ExtractError::MalformedResponse`] when the text is not JSON
/// at all, and [`ExtractError::SchemaViolation`] (listing every violation
/// with its instance path) when it is JSON of the wrong shape.
pub fn parse_invoice(text: &str) -> Result<InvoiceRecord, ExtractError> {
    let instance: Value =
        serde_json::from_str(text).map_err(|e| ExtractError::MalformedResponse {
            detail: e.to_string(),
        })?;

    let validator = VALIDATOR
        .as_ref()
        .map_err(|e| ExtractError::Internal(format!("invoice schema failed to compile: {e}")))?;

    let violations: Vec<String> = validator
        .iter_errors(&instance)
        .map(|err| format!("{}: {}", err.instance_path, err))
        .collect();
    if !violations.is_empty() {
        return Err(ExtractError::SchemaViolation {
            detail: violations.join("\n"),
        });
    }

    serde_json::from_value(instance).map_err(|e| ExtractError::SchemaViolation {
        detail: e.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn sample_json() -> Value {
        json!({
            "total": {"value": 1520.5, "bounding_box": [100, 200, 300, 400], "page": 1},
            "recipient": {"name": "Acme GmbH", "bounding_box": [50, 60, 70, 80], "page": 1},
            "tax": {"value": 288.9, "bounding_box": [0, 0, 0, 0], "page": 1},
            "sender": {"name": "Widget Corp", "bounding_box": [10, 20, 30, 40], "page": 2},
            "account_no": {"account_no": "0042-007-XY", "bounding_box": [5, 6, 7, 8], "page": 1},
        })
    }

    /// Resolve `properties.<name>` through an optional `$ref` into
    /// `definitions`.
    fn field_schema<'a>(schema: &'a Value, name: &str) -> &'a Value {
        let prop = &schema["properties"][name];
        match prop["$ref"].as_str() {
            Some(r) => {
                let def = r.rsplit('/').next().unwrap();
                &schema["definitions"][def]
            }
            None => prop,
        }
    }

    #[test]
    fn schema_requires_all_five_fields() {
        let schema = invoice_schema();
        let required: Vec<&str> = schema["required"]
            .as_array()
            .unwrap()
            .iter()
            .map(|v| v.as_str().unwrap())
            .collect();
        for field in ["total", "recipient", "tax", "sender", "account_no"] {
            assert!(required.contains(&field), "{field} missing from {required:?}");
        }
    }

    #[test]
    fn schema_requires_location_inside_each_field() {
        let schema = invoice_schema();
        for (field, value_key) in [
            ("total", "value"),
            ("recipient", "name"),
            ("tax", "value"),
            ("sender", "name"),
            ("account_no", "account_no"),
        ] {
            let fs = field_schema(&schema, field);
            let required: Vec<&str> = fs["required"]
                .as_array()
                .unwrap()
                .iter()
                .map(|v| v.as_str().unwrap())
                .collect();
            assert!(required.contains(&value_key), "{field}: {required:?}");
            assert!(required.contains(&"bounding_box"), "{field}: {required:?}");
            assert!(required.contains(&"page"), "{field}: {required:?}");
        }
    }

    #[test]
    fn schema_constrains_box_to_four_integers() {
        let schema = invoice_schema();
        let fs = field_schema(&schema, "total");
        let mut bbox = fs["properties"]["bounding_box"].clone();
        if let Some(r) = bbox["$ref"].as_str() {
            let def = r.rsplit('/').next().unwrap().to_string();
            bbox = schema["definitions"][&def].clone();
        }
        assert_eq!(bbox["type"], "array");
        assert_eq!(bbox["minItems"], 4);
        assert_eq!(bbox["maxItems"], 4);
    }

    #[test]
    fn parse_accepts_conforming_document() {
        let record = parse_invoice(&sample_json().to_string()).unwrap();
        assert_eq!(record.total.value, 1520.5);
        assert_eq!(record.recipient.name, "Acme GmbH");
        assert_eq!(record.sender.location.page, 2);
        assert_eq!(record.account_no.account_no, "0042-007-XY");
    }

    #[test]
    fn parse_rejects_missing_field() {
        for field in ["total", "recipient", "tax", "sender", "account_no"] {
            let mut doc = sample_json();
            doc.as_object_mut().unwrap().remove(field);
            let err = parse_invoice(&doc.to_string()).unwrap_err();
            assert!(
                matches!(err, ExtractError::SchemaViolation { .. }),
                "{field}: {err}"
            );
        }
    }

    #[test]
    fn parse_rejects_missing_inner_keys() {
        let mut doc = sample_json();
        doc["total"].as_object_mut().unwrap().remove("value");
        let err = parse_invoice(&doc.to_string()).unwrap_err();
        assert!(matches!(err, ExtractError::SchemaViolation { .. }), "{err}");

        let mut doc = sample_json();
        doc["sender"].as_object_mut().unwrap().remove("page");
        let err = parse_invoice(&doc.to_string()).unwrap_err();
        assert!(matches!(err, ExtractError::SchemaViolation { .. }), "{err}");

        let mut doc = sample_json();
        doc["recipient"].as_object_mut().unwrap().remove("bounding_box");
        let err = parse_invoice(&doc.to_string()).unwrap_err();
        assert!(matches!(err, ExtractError::SchemaViolation { .. }), "{err}");
    }

    #[test]
    fn parse_rejects_wrong_value_type() {
        let mut doc = sample_json();
        doc["total"]["value"] = json!("a lot");
        let err = parse_invoice(&doc.to_string()).unwrap_err();
        assert!(matches!(err, ExtractError::SchemaViolation { .. }), "{err}");
    }

    #[test]
    fn parse_rejects_short_bounding_box() {
        let mut doc = sample_json();
        doc["sender"]["bounding_box"] = json!([1, 2, 3]);
        let err = parse_invoice(&doc.to_string()).unwrap_err();
        assert!(matches!(err, ExtractError::SchemaViolation { .. }), "{err}");
    }

    #[test]
    fn parse_rejects_non_json() {
        let err = parse_invoice("Sure! Here is the JSON you asked for:").unwrap_err();
        assert!(matches!(err, ExtractError::MalformedResponse { .. }), "{err}");
    }

    #[test]
    fn round_trip_preserves_scalars_exactly() {
        let text = sample_json().to_string();
        let record = parse_invoice(&text).unwrap();
        let reserialised = serde_json::to_value(&record).unwrap();
        assert_eq!(reserialised, sample_json());
    }

    #[test]
    fn account_number_preserves_leading_zeros() {
        let mut doc = sample_json();
        doc["account_no"]["account_no"] = json!("000123");
        let record = parse_invoice(&doc.to_string()).unwrap();
        assert_eq!(record.account_no.account_no, "000123");
    }

    #[test]
    fn labeled_boxes_keep_field_order_and_skip_zero_boxes() {
        let record = parse_invoice(&sample_json().to_string()).unwrap();
        let items = record.labeled_boxes();
        let labels: Vec<&str> = items.iter().map(|i| i.label.as_str()).collect();
        assert_eq!(labels, ["total", "recipient", "tax", "sender", "account_no"]);

        // tax carries the all-zero sentinel in the sample
        assert!(items[2].bounding_box.is_none());
        assert!(items[2].page.is_none());
        assert_eq!(items[0].bounding_box, Some(BoundingBox::new(100, 200, 300, 400)));
        assert_eq!(items[3].page, Some(2));
        assert_eq!(record.located_count(), 4);
    }

    #[test]
    fn zero_box_is_not_located() {
        assert!(BoundingBox::ZERO.is_zero());
        assert!(!BoundingBox::new(0, 0, 1, 1).is_zero());
        let loc = FieldLocation {
            bounding_box: BoundingBox::ZERO,
            page: 3,
        };
        assert_eq!(loc.locate(), None);
    }
}
