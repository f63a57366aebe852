//! Projection of an [`ExtractionResult`] into display tables.
//!
//! The shape of a Typless result depends on the document type chosen at
//! upload time, so nothing here assumes a field is present. Missing data
//! becomes an empty cell; it never aborts the projection.

use rust_decimal::{Decimal, RoundingStrategy};
use serde::Serialize;
use std::fmt;
use std::str::FromStr;

use crate::types::{ExtractionResult, LineItem, ValueDescriptor};

pub const CONFIDENCE_LABEL: &str = "Confidence Score";

/// Sub-fields shown in the line item table, in column order.
pub const LINE_ITEM_COLUMNS: [(&str, &str); 4] = [
    ("product_number", "Product number"),
    ("product_description", "Description"),
    ("quantity", "Quantity"),
    ("price", "Price"),
];

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ValueRow {
    pub value: String,
    pub confidence: String,
}

/// One extracted field: the header row (name + [`CONFIDENCE_LABEL`]) and one row per value.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FieldGroup {
    pub name: String,
    pub rows: Vec<ValueRow>,
}

/// A line item amount coerced from extracted text.
#[derive(Debug, Clone, PartialEq)]
pub enum Amount {
    /// Rounded to 2 places, midpoint away from zero.
    Value(Decimal),
    Missing,
    /// Text that is not a number, kept as received.
    Invalid(String),
}

impl Amount {
    pub fn parse(raw: Option<&str>) -> Self {
        let text = match raw.map(str::trim) {
            Some(t) if !t.is_empty() => t,
            _ => return Amount::Missing,
        };
        let parsed = Decimal::from_str(text).or_else(|_| Decimal::from_scientific(text));
        match parsed {
            Ok(d) => Amount::Value(d.round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero)),
            Err(_) => Amount::Invalid(text.to_string()),
        }
    }

    pub fn value(&self) -> Option<Decimal> {
        match self {
            Amount::Value(d) => Some(*d),
            _ => None,
        }
    }
}

impl fmt::Display for Amount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Amount::Value(d) => write!(f, "{:.2}", d),
            Amount::Missing => Ok(()),
            Amount::Invalid(raw) => f.write_str(raw),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct LineItemRow {
    pub product_number: String,
    pub product_description: String,
    pub quantity: Amount,
    pub price: Amount,
}

impl LineItemRow {
    /// Cell texts in [`LINE_ITEM_COLUMNS`] order.
    pub fn cells(&self) -> [String; 4] {
        [
            self.product_number.clone(),
            self.product_description.clone(),
            self.quantity.to_string(),
            self.price.to_string(),
        ]
    }
}

/// `confidence_score * 100` with two decimals and a `%`; empty when absent.
pub fn format_confidence(score: Option<f64>) -> String {
    match score {
        Some(s) if s.is_finite() => format!("{:.2}%", s * 100.0),
        _ => String::new(),
    }
}

fn value_row(value: &ValueDescriptor) -> ValueRow {
    ValueRow {
        value: value.text(),
        confidence: format_confidence(value.confidence_score),
    }
}

pub fn field_table(result: &ExtractionResult) -> Vec<FieldGroup> {
    result
        .extracted_fields
        .iter()
        .map(|field| FieldGroup {
            name: field.name.clone(),
            rows: field.values.iter().map(value_row).collect(),
        })
        .collect()
}

/// Text of the first value of the named sub-field, if the item has one.
fn first_value_text(item: &LineItem, name: &str) -> Option<String> {
    item.find_field(name)
        .and_then(|f| f.first_value())
        .map(|v| v.text())
}

fn line_item_row(item: &LineItem) -> LineItemRow {
    let text = |name: &str| first_value_text(item, name).unwrap_or_default();
    LineItemRow {
        product_number: text("product_number"),
        product_description: text("product_description"),
        quantity: Amount::parse(first_value_text(item, "quantity").as_deref()),
        price: Amount::parse(first_value_text(item, "price").as_deref()),
    }
}

pub fn line_item_table(result: &ExtractionResult) -> Vec<LineItemRow> {
    result.line_items.iter().map(line_item_row).collect()
}
