use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;

use crate::error::{IntakeError, Result};

/// Document types offered on the upload form (Typless document type names).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DocumentType {
    SimpleInvoice,
    Receipt,
    RegistrationCard,
}

impl DocumentType {
    pub const ALL: [DocumentType; 3] = [
        DocumentType::SimpleInvoice,
        DocumentType::Receipt,
        DocumentType::RegistrationCard,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            DocumentType::SimpleInvoice => "simple-invoice",
            DocumentType::Receipt => "receipt",
            DocumentType::RegistrationCard => "registration-card",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            DocumentType::SimpleInvoice => "Simple Invoice",
            DocumentType::Receipt => "Receipt",
            DocumentType::RegistrationCard => "Registration Card",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|t| t.as_str() == s.trim())
    }
}

impl fmt::Display for DocumentType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A file as received from the multipart form.
#[derive(Debug, Clone)]
pub struct UploadedFile {
    pub filename: String,
    pub content: Vec<u8>,
    pub content_type: Option<String>,
}

/// JSON body of the Typless extract-data call.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ExtractionRequest {
    pub document_type_name: String,
    pub file_name: String,
    /// Base64 file content.
    pub file: String,
}

/// One candidate value for an extracted field.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct ValueDescriptor {
    pub value: Value,
    pub confidence_score: Option<f64>,
    pub page_number: Option<i64>,
    pub x: Option<f64>,
    pub y: Option<f64>,
    pub width: Option<f64>,
    pub height: Option<f64>,
}

impl ValueDescriptor {
    fn from_json(obj: &Value) -> Self {
        let num = |key: &str| obj.get(key).and_then(|v| v.as_f64());
        ValueDescriptor {
            value: obj.get("value").cloned().unwrap_or(Value::Null),
            confidence_score: num("confidence_score"),
            page_number: obj.get("page_number").and_then(|v| v.as_i64()),
            x: num("x"),
            y: num("y"),
            width: num("width"),
            height: num("height"),
        }
    }

    /// Display text of the value: strings as-is, null as empty, other scalars as JSON.
    pub fn text(&self) -> String {
        match &self.value {
            Value::Null => String::new(),
            Value::String(s) => s.clone(),
            other => other.to_string(),
        }
    }
}

/// One named attribute found in the document.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct FieldDescriptor {
    pub name: String,
    pub data_type: Option<String>,
    pub values: Vec<ValueDescriptor>,
}

impl FieldDescriptor {
    /// `None` for anything that is not an object; a missing `values` array is empty.
    fn from_json(obj: &Value) -> Option<Self> {
        let obj = obj.as_object()?;
        let name = obj
            .get("name")
            .and_then(|n| n.as_str())
            .unwrap_or("")
            .to_string();
        let data_type = obj
            .get("data_type")
            .and_then(|t| t.as_str())
            .map(String::from);
        let values = obj
            .get("values")
            .and_then(|v| v.as_array())
            .map(|arr| {
                arr.iter()
                    .filter(|v| v.is_object())
                    .map(ValueDescriptor::from_json)
                    .collect()
            })
            .unwrap_or_default();
        Some(FieldDescriptor {
            name,
            data_type,
            values,
        })
    }

    pub fn first_value(&self) -> Option<&ValueDescriptor> {
        self.values.first()
    }
}

fn fields_from_json(value: Option<&Value>) -> Vec<FieldDescriptor> {
    value
        .and_then(|v| v.as_array())
        .map(|arr| arr.iter().filter_map(FieldDescriptor::from_json).collect())
        .unwrap_or_default()
}

/// One row of a detected table; accepts `[{..}, ..]` and `{"fields": [{..}, ..]}`.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct LineItem {
    pub fields: Vec<FieldDescriptor>,
}

impl LineItem {
    fn from_json(item: &Value) -> Option<Self> {
        let fields = match item {
            Value::Array(_) => fields_from_json(Some(item)),
            Value::Object(obj) => fields_from_json(obj.get("fields")),
            _ => return None,
        };
        Some(LineItem { fields })
    }

    /// First field with the given name.
    pub fn find_field(&self, name: &str) -> Option<&FieldDescriptor> {
        self.fields.iter().find(|f| f.name == name)
    }
}

/// Parsed Typless response. The raw JSON is kept so it can be stored verbatim.
#[derive(Debug, Clone, PartialEq)]
pub struct ExtractionResult {
    raw: Value,
    pub extracted_fields: Vec<FieldDescriptor>,
    pub line_items: Vec<LineItem>,
}

impl ExtractionResult {
    pub fn from_json(raw: Value) -> Result<Self> {
        let obj = raw.as_object().ok_or_else(|| {
            IntakeError::InvalidResponse("extraction result is not a JSON object".to_string())
        })?;
        let extracted_fields = fields_from_json(obj.get("extracted_fields"));
        let line_items = obj
            .get("line_items")
            .and_then(|v| v.as_array())
            .map(|arr| arr.iter().filter_map(LineItem::from_json).collect())
            .unwrap_or_default();
        Ok(ExtractionResult {
            raw,
            extracted_fields,
            line_items,
        })
    }

    pub fn parse_str(text: &str) -> Result<Self> {
        let raw: Value = serde_json::from_str(text)?;
        Self::from_json(raw)
    }

    pub fn raw(&self) -> &Value {
        &self.raw
    }

    pub fn to_json_string(&self) -> String {
        self.raw.to_string()
    }
}

/// A saved document. `id` is assigned by the store when absent.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DocumentRecord {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<i64>,
    pub filename: String,
    pub document_type: String,
    pub content_b64: String,
    /// Serialized extraction result (JSON text).
    pub result: String,
}
