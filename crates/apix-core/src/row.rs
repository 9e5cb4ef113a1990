use std::collections::HashMap;

use serde::ser::{Serialize, SerializeMap, Serializer};
use serde_json::{Map, Number, Value};

/// Name of the synthetic field holding the original serialized record.
pub const RAW_JSON_FIELD: &str = "raw_json";

/// Loosely-typed scalar read from an API record.
#[derive(Debug, Clone, PartialEq, serde::Serialize)]
#[serde(untagged)]
pub enum RowValue {
    Null,
    Bool(bool),
    Number(Number),
    Text(String),
}

impl RowValue {
    /// Narrows a JSON value to a scalar. Nested arrays and objects are kept as
    /// their serialized text.
    pub fn from_json(value: &Value) -> Self {
        match value {
            Value::Null => Self::Null,
            Value::Bool(flag) => Self::Bool(*flag),
            Value::Number(number) => Self::Number(number.clone()),
            Value::String(text) => Self::Text(text.clone()),
            Value::Array(_) | Value::Object(_) => Self::Text(value.to_string()),
        }
    }
}

/// One API record with lower-cased field names, in record order, followed by
/// the `raw_json` field.
#[derive(Debug, Clone, Default)]
pub struct Row {
    values: Vec<(String, RowValue)>,
    positions: HashMap<String, usize>,
}

impl PartialEq for Row {
    fn eq(&self, other: &Self) -> bool {
        self.values == other.values
    }
}

impl Row {
    /// Normalizes a record object into a row.
    pub fn from_record(record: &Map<String, Value>) -> Self {
        let mut row = Self::default();
        for (key, value) in record {
            row.insert(key.to_lowercase(), RowValue::from_json(value));
        }

        let raw = Value::Object(record.clone()).to_string();
        row.insert(String::from(RAW_JSON_FIELD), RowValue::Text(raw));
        row
    }

    /// Later keys win when two record keys differ only by case.
    fn insert(&mut self, name: String, value: RowValue) {
        match self.positions.get(&name) {
            Some(&position) => self.values[position].1 = value,
            None => {
                self.positions.insert(name.clone(), self.values.len());
                self.values.push((name, value));
            }
        }
    }

    pub fn get(&self, name: &str) -> Option<&RowValue> {
        self.positions
            .get(name)
            .and_then(|&position| self.values.get(position))
            .map(|(_, value)| value)
    }

    pub fn raw_json(&self) -> Option<&str> {
        match self.get(RAW_JSON_FIELD) {
            Some(RowValue::Text(raw)) => Some(raw),
            _ => None,
        }
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &RowValue)> {
        self.values
            .iter()
            .map(|(name, value)| (name.as_str(), value))
    }
}

impl Serialize for Row {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        let mut map = serializer.serialize_map(Some(self.values.len()))?;
        for (name, value) in &self.values {
            map.serialize_entry(name, value)?;
        }
        map.end()
    }
}

/// Extracts the rows of a data response. A missing or non-array `data` field
/// yields no rows, and array items that are not objects are skipped.
pub fn rows_from_response(body: &Value) -> Vec<Row> {
    let Some(items) = body.get("data").and_then(Value::as_array) else {
        return Vec::new();
    };

    items
        .iter()
        .filter_map(Value::as_object)
        .map(Row::from_record)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn normalizes_keys_and_narrows_values() {
        let record = json!({
            "ID_Lead": 42,
            "fl_Ativo": true,
            "ds_Nome": "Maria",
            "vl_Taxa": 1.5,
            "dt_Higienizado": null,
            "ds_Dados": {"canal": "whatsapp"},
            "ds_Tags": ["a", "b"]
        });

        let row = Row::from_record(record.as_object().expect("object"));

        assert_eq!(row.get("id_lead"), Some(&RowValue::Number(42.into())));
        assert_eq!(row.get("fl_ativo"), Some(&RowValue::Bool(true)));
        assert_eq!(row.get("ds_nome"), Some(&RowValue::Text(String::from("Maria"))));
        assert_eq!(row.get("dt_higienizado"), Some(&RowValue::Null));
        assert_eq!(
            row.get("ds_dados"),
            Some(&RowValue::Text(String::from(r#"{"canal":"whatsapp"}"#)))
        );
        assert_eq!(
            row.get("ds_tags"),
            Some(&RowValue::Text(String::from(r#"["a","b"]"#)))
        );
        assert!(row.get("ID_Lead").is_none());
        assert!(row.get("ausente").is_none());
    }

    #[test]
    fn raw_json_keeps_original_keys_and_order() {
        let record = json!({"Zeta": 1, "alpha": "x"});

        let row = Row::from_record(record.as_object().expect("object"));

        assert_eq!(row.raw_json(), Some(r#"{"Zeta":1,"alpha":"x"}"#));
        let names = row.iter().map(|(name, _)| name).collect::<Vec<_>>();
        assert_eq!(names, ["zeta", "alpha", RAW_JSON_FIELD]);
    }

    #[test]
    fn keys_differing_only_by_case_keep_the_first_position_and_last_value() {
        let record = json!({"Nome": "Ana", "id": 1, "NOME": "Bia"});

        let row = Row::from_record(record.as_object().expect("object"));

        assert_eq!(row.len(), 3);
        assert_eq!(row.get("nome"), Some(&RowValue::Text(String::from("Bia"))));
        let names = row.iter().map(|(name, _)| name).collect::<Vec<_>>();
        assert_eq!(names, ["nome", "id", RAW_JSON_FIELD]);
    }

    #[test]
    fn response_without_data_array_yields_no_rows() {
        assert!(rows_from_response(&json!({"success": true})).is_empty());
        assert!(rows_from_response(&json!({"success": true, "data": {"id": 1}})).is_empty());
    }

    #[test]
    fn non_object_items_are_skipped() {
        let body = json!({"success": true, "data": [{"id": 1}, 7, "x", null, {"id": 2}]});

        let rows = rows_from_response(&body);

        assert_eq!(rows.len(), 2);
        assert_eq!(rows[1].get("id"), Some(&RowValue::Number(2.into())));
    }

    #[test]
    fn serializes_as_flat_object() {
        let record = json!({"ID": 1, "Nome": "Ana"});
        let row = Row::from_record(record.as_object().expect("object"));

        let value = serde_json::to_value(&row).expect("serializable");

        assert_eq!(
            value,
            json!({"id": 1, "nome": "Ana", "raw_json": r#"{"ID":1,"Nome":"Ana"}"#})
        );
    }
}
