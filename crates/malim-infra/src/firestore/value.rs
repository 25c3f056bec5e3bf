//! Decoding of Firestore REST documents into domain products.
//!
//! The REST API wraps every field in a typed envelope (`{"stringValue": ..}`,
//! `{"integerValue": "42"}`, `{"mapValue": {"fields": ..}}`). These helpers
//! unwrap the envelopes into plain JSON and then deserialize with the
//! product's own serde mapping, so a record that lacks required fields is
//! rejected here at the boundary.

use chrono::DateTime;
use serde::Deserialize;
use serde_json::{Map, Value};

use malim_types::catalog::Product;
use malim_types::error::StoreError;

/// Largest integer a double carries exactly.
const MAX_SAFE_INTEGER: f64 = 9_007_199_254_740_991.0;

/// A document as returned by `GET documents/..` and inside `runQuery` results.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Document {
    /// Full resource name, `projects/{p}/databases/(default)/documents/{coll}/{id}`.
    pub name: String,
    #[serde(default)]
    pub fields: Map<String, Value>,
}

impl Document {
    /// Last path segment of the resource name.
    pub fn id(&self) -> &str {
        self.name.rsplit('/').next().unwrap_or(&self.name)
    }

    /// Decode into a `Product`, taking `id` from the document key.
    pub fn into_product(self) -> Result<Product, StoreError> {
        let id = self.id().to_string();
        let mut plain = decode_fields(&self.fields)?;
        plain.insert("id".to_string(), Value::String(id.clone()));
        serde_json::from_value(Value::Object(plain))
            .map_err(|e| StoreError::Deserialization(format!("document '{id}': {e}")))
    }
}

/// One element of a `runQuery` response stream.
#[derive(Debug, Deserialize)]
pub struct RunQueryItem {
    /// Absent on the progress-only element of an empty result.
    pub document: Option<Document>,
}

/// Unwrap a `fields` map.
pub fn decode_fields(fields: &Map<String, Value>) -> Result<Map<String, Value>, StoreError> {
    fields
        .iter()
        .map(|(key, value)| Ok((key.clone(), decode_value(value)?)))
        .collect()
}

/// Unwrap one typed value.
pub fn decode_value(value: &Value) -> Result<Value, StoreError> {
    let Some((kind, inner)) = value.as_object().and_then(|o| o.iter().next()) else {
        return Err(StoreError::Deserialization(format!(
            "expected a typed value, got {value}"
        )));
    };

    let invalid = |what: &str| StoreError::Deserialization(format!("invalid {kind}: {what}"));

    match kind.as_str() {
        "nullValue" => Ok(Value::Null),
        "booleanValue" => Ok(inner.clone()),
        "stringValue" | "referenceValue" | "bytesValue" => Ok(inner.clone()),
        "integerValue" => {
            // Encoded as a decimal string.
            let n = match inner {
                Value::String(s) => s.parse::<i64>().map_err(|e| invalid(&e.to_string()))?,
                Value::Number(n) => n.as_i64().ok_or_else(|| invalid("out of range"))?,
                other => return Err(invalid(&other.to_string())),
            };
            Ok(Value::from(n))
        }
        "doubleValue" => {
            let d = match inner {
                Value::Number(n) => n.as_f64().ok_or_else(|| invalid("not a number"))?,
                Value::String(s) => s.parse::<f64>().map_err(|e| invalid(&e.to_string()))?,
                other => return Err(invalid(&other.to_string())),
            };
            // Whole doubles become integers so they fit integer fields too.
            if d.fract() == 0.0 && d.abs() <= MAX_SAFE_INTEGER {
                Ok(Value::from(d as i64))
            } else {
                Ok(Value::from(d))
            }
        }
        "timestampValue" => {
            let s = inner.as_str().ok_or_else(|| invalid("not a string"))?;
            let ts = DateTime::parse_from_rfc3339(s).map_err(|e| invalid(&e.to_string()))?;
            Ok(Value::from(ts.timestamp_millis()))
        }
        "arrayValue" => {
            let values = inner
                .get("values")
                .and_then(Value::as_array)
                .map(|values| values.iter().map(decode_value).collect::<Result<Vec<_>, _>>())
                .transpose()?
                .unwrap_or_default();
            Ok(Value::Array(values))
        }
        "mapValue" => {
            let fields = inner
                .get("fields")
                .and_then(Value::as_object)
                .map(decode_fields)
                .transpose()?
                .unwrap_or_default();
            Ok(Value::Object(fields))
        }
        "geoPointValue" => Ok(inner.clone()),
        other => Err(StoreError::Deserialization(format!(
            "unsupported value type '{other}'"
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn decodes_scalars() {
        assert_eq!(decode_value(&json!({"stringValue": "Rojo"})).unwrap(), json!("Rojo"));
        assert_eq!(decode_value(&json!({"integerValue": "12"})).unwrap(), json!(12));
        assert_eq!(decode_value(&json!({"doubleValue": 499.5})).unwrap(), json!(499.5));
        assert_eq!(decode_value(&json!({"doubleValue": 500.0})).unwrap(), json!(500));
        assert_eq!(decode_value(&json!({"booleanValue": true})).unwrap(), json!(true));
        assert_eq!(decode_value(&json!({"nullValue": null})).unwrap(), Value::Null);
        assert_eq!(
            decode_value(&json!({"timestampValue": "2026-03-01T00:00:00Z"})).unwrap(),
            json!(1_772_323_200_000i64)
        );
    }

    #[test]
    fn decodes_nested_arrays_and_maps() {
        let value = json!({"arrayValue": {"values": [
            {"mapValue": {"fields": {
                "size": {"stringValue": "M"},
                "stock": {"integerValue": "2"}
            }}}
        ]}});
        assert_eq!(decode_value(&value).unwrap(), json!([{"size": "M", "stock": 2}]));
        assert_eq!(decode_value(&json!({"arrayValue": {}})).unwrap(), json!([]));
    }

    #[test]
    fn rejects_malformed_values() {
        assert!(decode_value(&json!("bare")).is_err());
        assert!(decode_value(&json!({"integerValue": "twelve"})).is_err());
        assert!(decode_value(&json!({"mysteryValue": 1})).is_err());
    }

    #[test]
    fn document_into_product() {
        let doc: Document = serde_json::from_value(json!({
            "name": "projects/malim/databases/(default)/documents/disponible/MAL-VES-ROJ-001",
            "fields": {
                "name": {"stringValue": "Vestido rojo"},
                "category": {"stringValue": "vestidos"},
                "publicPrice": {"integerValue": "800"},
                "offerPercentage": {"doubleValue": 15.0},
                "publishOnline": {"booleanValue": true},
                "dateAdded": {"doubleValue": 1700000000000.0},
                "variants": {"arrayValue": {"values": [{"mapValue": {"fields": {
                    "colorName": {"stringValue": "Rojo"},
                    "hexColor": {"stringValue": "#ff0000"},
                    "imageUrls": {"arrayValue": {"values": [{"stringValue": "https://cdn.example/r.jpg"}]}},
                    "sizes": {"arrayValue": {"values": [{"mapValue": {"fields": {
                        "size": {"stringValue": "M"},
                        "stock": {"integerValue": "3"},
                        "variantSku": {"stringValue": "MAL-VES-ROJ-001-M"}
                    }}}]}}
                }}}]}}
            }
        }))
        .unwrap();

        let product = doc.into_product().unwrap();
        assert_eq!(product.id, "MAL-VES-ROJ-001");
        assert_eq!(product.public_price, 800.0);
        assert_eq!(product.date_added, 1_700_000_000_000);
        assert_eq!(product.variants[0].sizes[0].stock, 3);
        assert!(product.is_published());
    }

    #[test]
    fn document_missing_required_fields_is_rejected() {
        let doc: Document = serde_json::from_value(json!({
            "name": "projects/p/databases/(default)/documents/disponible/X",
            "fields": {"category": {"stringValue": "blusas"}}
        }))
        .unwrap();
        assert!(matches!(doc.into_product(), Err(StoreError::Deserialization(_))));
    }
}
