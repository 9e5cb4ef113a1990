use serde_json::{Map, Value};

use crate::catalog::{ColumnDefinition, ColumnType};
use crate::datetime::{normalize_epoch_number, parse_timestamp_to_epoch_micros};
use crate::row::{Row, RowValue};
use crate::ConnectorError;

/// Forward-only reader over fetched rows, projected to a fixed column list.
///
/// Call [`RecordCursor::advance`] before reading; check
/// [`RecordCursor::is_null`] before the typed getters, which reject nulls.
#[derive(Debug)]
pub struct RecordCursor {
    columns: Vec<ColumnDefinition>,
    rows: std::vec::IntoIter<Row>,
    current: Option<Row>,
}

impl RecordCursor {
    pub fn new(columns: Vec<ColumnDefinition>, rows: Vec<Row>) -> Self {
        Self {
            columns,
            rows: rows.into_iter(),
            current: None,
        }
    }

    pub fn columns(&self) -> &[ColumnDefinition] {
        &self.columns
    }

    pub fn column_type(&self, field: usize) -> Result<ColumnType, ConnectorError> {
        self.column(field).map(|column| column.column_type)
    }

    /// Moves to the next row; false once the rows are exhausted.
    pub fn advance(&mut self) -> bool {
        self.current = self.rows.next();
        self.current.is_some()
    }

    pub fn current_row(&self) -> Option<&Row> {
        self.current.as_ref()
    }

    /// Missing fields are null, and so are blank strings outside VARCHAR
    /// columns.
    pub fn is_null(&self, field: usize) -> Result<bool, ConnectorError> {
        let column = self.column(field)?;
        Ok(match self.nullable_value(field)? {
            None | Some(RowValue::Null) => true,
            Some(RowValue::Text(text)) => {
                column.column_type != ColumnType::Varchar && text.trim().is_empty()
            }
            Some(_) => false,
        })
    }

    pub fn get_bool(&self, field: usize) -> Result<bool, ConnectorError> {
        self.expect_type(field, &[ColumnType::Boolean])?;
        match self.value(field)? {
            RowValue::Bool(flag) => Ok(*flag),
            RowValue::Number(number) => Ok(number_as_i64(number) != 0),
            value => {
                let text = self.text_of(field, value)?;
                Ok(match text {
                    "1" => true,
                    "0" => false,
                    other => other.eq_ignore_ascii_case("true"),
                })
            }
        }
    }

    /// BIGINT values, or TIMESTAMP values as UTC epoch microseconds.
    pub fn get_long(&self, field: usize) -> Result<i64, ConnectorError> {
        let column_type = self.expect_type(field, &[ColumnType::Bigint, ColumnType::Timestamp])?;
        let value = self.value(field)?;

        if column_type == ColumnType::Timestamp {
            return match value {
                RowValue::Number(number) => Ok(normalize_epoch_number(number_as_i64(number))),
                RowValue::Text(text) => parse_timestamp_to_epoch_micros(text),
                RowValue::Bool(_) | RowValue::Null => Err(self.access_error(
                    field,
                    "boolean cannot be read as a timestamp",
                )),
            };
        }

        match value {
            RowValue::Number(number) => Ok(number_as_i64(number)),
            RowValue::Bool(flag) => Ok(i64::from(*flag)),
            value => {
                let text = self.text_of(field, value)?;
                text.parse::<i64>()
                    .or_else(|_| text.parse::<f64>().map(|number| number.trunc() as i64))
                    .map_err(|_| ConnectorError::format(text, "not a number"))
            }
        }
    }

    pub fn get_double(&self, field: usize) -> Result<f64, ConnectorError> {
        match self.value(field)? {
            RowValue::Number(number) => Ok(number.as_f64().unwrap_or_default()),
            value => {
                let text = self.text_of(field, value)?;
                text.parse::<f64>()
                    .map_err(|_| ConnectorError::format(text, "not a number"))
            }
        }
    }

    /// VARCHAR values; a null reads as the empty string.
    pub fn get_text(&self, field: usize) -> Result<String, ConnectorError> {
        self.expect_type(field, &[ColumnType::Varchar])?;
        Ok(match self.nullable_value(field)? {
            None | Some(RowValue::Null) => String::new(),
            Some(RowValue::Text(text)) => text.clone(),
            Some(RowValue::Number(number)) => number.to_string(),
            Some(RowValue::Bool(flag)) => flag.to_string(),
        })
    }

    /// Current row as a JSON object with each projected column read through
    /// its typed getter. Timestamps are epoch microseconds.
    pub fn typed_row(&self) -> Result<Map<String, Value>, ConnectorError> {
        let mut object = Map::with_capacity(self.columns.len());
        for (field, column) in self.columns.iter().enumerate() {
            let value = if self.is_null(field)? && column.column_type != ColumnType::Varchar {
                Value::Null
            } else {
                match column.column_type {
                    ColumnType::Boolean => Value::Bool(self.get_bool(field)?),
                    ColumnType::Bigint | ColumnType::Timestamp => {
                        Value::from(self.get_long(field)?)
                    }
                    ColumnType::Varchar => Value::String(self.get_text(field)?),
                }
            };
            object.insert(column.name.clone(), value);
        }
        Ok(object)
    }

    fn column(&self, field: usize) -> Result<&ColumnDefinition, ConnectorError> {
        self.columns.get(field).ok_or_else(|| {
            ConnectorError::column_access(format!("#{field}"), "invalid field index")
        })
    }

    fn expect_type(
        &self,
        field: usize,
        accepted: &[ColumnType],
    ) -> Result<ColumnType, ConnectorError> {
        let column_type = self.column_type(field)?;
        if accepted.contains(&column_type) {
            Ok(column_type)
        } else {
            Err(self.access_error(field, format!("column is {column_type}")))
        }
    }

    fn nullable_value(&self, field: usize) -> Result<Option<&RowValue>, ConnectorError> {
        let column = self.column(field)?;
        let row = self.current.as_ref().ok_or_else(|| {
            ConnectorError::column_access(&column.name, "cursor has not been advanced")
        })?;
        Ok(row.get(&column.name))
    }

    fn value(&self, field: usize) -> Result<&RowValue, ConnectorError> {
        match self.nullable_value(field)? {
            None | Some(RowValue::Null) => {
                Err(self.access_error(field, "value is null, check is_null first"))
            }
            Some(value) => Ok(value),
        }
    }

    /// Trimmed textual form of a scalar; blank text cannot be converted.
    fn text_of<'a>(&self, field: usize, value: &'a RowValue) -> Result<&'a str, ConnectorError> {
        let text = match value {
            RowValue::Text(text) => text.trim(),
            RowValue::Bool(true) => "true",
            RowValue::Bool(false) => "false",
            RowValue::Number(_) | RowValue::Null => {
                return Err(self.access_error(field, "expected a textual value"));
            }
        };
        if text.is_empty() {
            return Err(self.access_error(field, "blank value cannot be converted"));
        }
        Ok(text)
    }

    fn access_error(&self, field: usize, reason: impl Into<String>) -> ConnectorError {
        let column = self
            .columns
            .get(field)
            .map_or_else(|| format!("#{field}"), |column| column.name.clone());
        ConnectorError::column_access(column, reason)
    }
}

fn number_as_i64(number: &serde_json::Number) -> i64 {
    number
        .as_i64()
        .or_else(|| number.as_u64().map(|value| value as i64))
        .unwrap_or_else(|| number.as_f64().map_or(0, |value| value.trunc() as i64))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::datetime::to_epoch_micros;
    use crate::ErrorKind;
    use serde_json::json;
    use time::macros::datetime;

    fn cursor(record: Value) -> RecordCursor {
        let columns = vec![
            ColumnDefinition::new("id_lead", ColumnType::Bigint),
            ColumnDefinition::new("fl_ativo", ColumnType::Boolean),
            ColumnDefinition::new("dt_criacao", ColumnType::Timestamp),
            ColumnDefinition::new("ds_nome", ColumnType::Varchar),
        ];
        let row = Row::from_record(record.as_object().expect("object"));
        let mut cursor = RecordCursor::new(columns, vec![row]);
        assert!(cursor.advance());
        cursor
    }

    #[test]
    fn reads_typed_values() {
        let cursor = cursor(json!({
            "ID_LEAD": "42",
            "FL_ATIVO": "1",
            "DT_CRIACAO": "01/12/2025 07:23:11",
            "DS_NOME": "Ana"
        }));

        assert_eq!(cursor.get_long(0).expect("long"), 42);
        assert!(cursor.get_bool(1).expect("bool"));
        assert_eq!(
            cursor.get_long(2).expect("timestamp"),
            to_epoch_micros(datetime!(2025 - 12 - 01 07:23:11))
        );
        assert_eq!(cursor.get_text(3).expect("text"), "Ana");
        assert_eq!(cursor.get_double(0).expect("double"), 42.0);
    }

    #[test]
    fn numeric_timestamps_are_normalized() {
        let seconds = cursor(json!({"dt_criacao": 1_700_000_000_i64}));
        let millis = cursor(json!({"dt_criacao": 1_700_000_000_000_i64}));

        assert_eq!(seconds.get_long(2).expect("seconds"), 1_700_000_000_000_000);
        assert_eq!(millis.get_long(2).expect("millis"), 1_700_000_000_000_000);
    }

    #[test]
    fn boolean_conversions() {
        assert!(!cursor(json!({"fl_ativo": 0})).get_bool(1).expect("zero"));
        assert!(cursor(json!({"fl_ativo": "TRUE"})).get_bool(1).expect("text"));
        assert!(!cursor(json!({"fl_ativo": "sim"})).get_bool(1).expect("other text"));
        assert!(cursor(json!({"fl_ativo": true})).get_bool(1).expect("bool"));
    }

    #[test]
    fn long_accepts_decimal_text_and_booleans() {
        assert_eq!(cursor(json!({"id_lead": " 12.9 "})).get_long(0).expect("decimal"), 12);
        assert_eq!(cursor(json!({"id_lead": true})).get_long(0).expect("bool"), 1);

        let error = cursor(json!({"id_lead": "abc"})).get_long(0).expect_err("garbage");
        assert_eq!(error.kind(), ErrorKind::Format);
    }

    #[test]
    fn null_rules_depend_on_column_type() {
        let cursor = cursor(json!({"id_lead": "  ", "dt_criacao": null, "ds_nome": ""}));

        assert!(cursor.is_null(0).expect("blank bigint"));
        assert!(cursor.is_null(1).expect("missing"));
        assert!(cursor.is_null(2).expect("null timestamp"));
        assert!(!cursor.is_null(3).expect("blank varchar"));
        assert_eq!(cursor.get_text(3).expect("text"), "");

        let error = cursor.get_long(2).expect_err("null read");
        assert_eq!(error.kind(), ErrorKind::ColumnAccess);
    }

    #[test]
    fn varchar_null_reads_as_empty_and_type_mismatches_fail() {
        let cursor = cursor(json!({"ds_nome": null, "id_lead": 5}));

        assert_eq!(cursor.get_text(3).expect("null text"), "");
        assert_eq!(cursor.get_bool(0).expect_err("bigint").kind(), ErrorKind::ColumnAccess);
        assert_eq!(cursor.get_text(0).expect_err("bigint").kind(), ErrorKind::ColumnAccess);
        assert_eq!(cursor.get_long(9).expect_err("index").kind(), ErrorKind::ColumnAccess);
    }

    #[test]
    fn cursor_must_be_advanced() {
        let mut cursor = RecordCursor::new(
            vec![ColumnDefinition::new("id", ColumnType::Bigint)],
            Vec::new(),
        );

        assert_eq!(cursor.is_null(0).expect_err("not advanced").kind(), ErrorKind::ColumnAccess);
        assert!(!cursor.advance());
        assert!(cursor.current_row().is_none());
    }

    #[test]
    fn typed_row_projects_columns() {
        let cursor = cursor(json!({
            "id_lead": 7,
            "fl_ativo": "0",
            "dt_criacao": "",
            "ds_nome": null
        }));

        let typed = cursor.typed_row().expect("typed row");

        assert_eq!(
            Value::Object(typed),
            json!({"id_lead": 7, "fl_ativo": false, "dt_criacao": null, "ds_nome": ""})
        );
    }
}
