//! Dynamically typed rows shared by the load stage and the table dump

use anyhow::{Context, Result, bail};
use std::fmt::Display;
use std::io::{Read, Write};

/// Formats a float so it reads back as a float: `100.0`, not `100`.
pub fn format_real(value: f64) -> String {
    let s = value.to_string();
    if !value.is_finite() || s.contains('.') {
        s
    } else {
        format!("{s}.0")
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Null,
    Integer(i64),
    Real(f64),
    Text(String),
}

impl Value {
    /// Infers a value from a CSV cell: empty is null, then integer, real, text.
    pub fn infer(cell: &str) -> Self {
        if cell.is_empty() {
            return Value::Null;
        }
        if let Ok(i) = cell.parse::<i64>() {
            return Value::Integer(i);
        }
        match cell.parse::<f64>() {
            Ok(f) if f.is_finite() => Value::Real(f),
            _ => Value::Text(cell.to_string()),
        }
    }

    /// Renders the value as an SQL literal. Text is single-quoted with quotes doubled.
    pub fn to_sql_literal(&self) -> String {
        match self {
            Value::Null => "NULL".to_string(),
            Value::Integer(i) => i.to_string(),
            Value::Real(f) if f.is_finite() => format_real(*f),
            Value::Real(_) => "NULL".to_string(),
            Value::Text(s) => format!("'{}'", s.replace('\'', "''")),
        }
    }
}

impl Display for Value {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Value::Null => Ok(()),
            Value::Integer(i) => write!(f, "{i}"),
            Value::Real(r) => write!(f, "{}", format_real(*r)),
            Value::Text(s) => write!(f, "{s}"),
        }
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::Text(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::Text(s)
    }
}

impl From<f64> for Value {
    fn from(f: f64) -> Self {
        Value::Real(f)
    }
}

/// A header plus rows, all rows the same width as the header.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Table {
    pub columns: Vec<String>,
    pub rows: Vec<Vec<Value>>,
}

impl Table {
    pub fn new(columns: Vec<String>) -> Self {
        Self {
            columns,
            rows: Vec::new(),
        }
    }

    pub fn push_row(&mut self, row: Vec<Value>) -> Result<()> {
        if row.len() != self.columns.len() {
            bail!(
                "Row has {} values but table has {} columns",
                row.len(),
                self.columns.len()
            );
        }
        self.rows.push(row);
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c == name)
    }

    pub fn write_csv<W: Write>(&self, writer: W) -> Result<()> {
        let mut wtr = csv::Writer::from_writer(writer);
        wtr.write_record(&self.columns)?;
        for row in &self.rows {
            wtr.write_record(row.iter().map(|v| v.to_string()))?;
        }
        wtr.flush()?;
        Ok(())
    }

    pub fn read_csv<R: Read>(reader: R) -> Result<Self> {
        let mut rdr = csv::Reader::from_reader(reader);
        let columns = rdr
            .headers()
            .context("Failed to read CSV header")?
            .iter()
            .map(str::to_string)
            .collect();
        let mut table = Table::new(columns);
        for record in rdr.records() {
            let record = record.context("Failed to read CSV record")?;
            table.push_row(record.iter().map(Value::infer).collect())?;
        }
        Ok(table)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_value_inference() {
        assert_eq!(Value::infer(""), Value::Null);
        assert_eq!(Value::infer("42"), Value::Integer(42));
        assert_eq!(Value::infer("15750.3"), Value::Real(15750.3));
        assert_eq!(Value::infer("USD"), Value::Text("USD".to_string()));
        assert_eq!(
            Value::infer("2022-12-01 12:00:00"),
            Value::Text("2022-12-01 12:00:00".to_string())
        );
        assert_eq!(Value::infer("NaN"), Value::Text("NaN".to_string()));
    }

    #[test]
    fn test_sql_literals() {
        assert_eq!(Value::Null.to_sql_literal(), "NULL");
        assert_eq!(Value::Integer(7).to_sql_literal(), "7");
        assert_eq!(Value::Real(100.0).to_sql_literal(), "100.0");
        assert_eq!(Value::Real(0.25).to_sql_literal(), "0.25");
        assert_eq!(Value::Real(f64::NAN).to_sql_literal(), "NULL");
        assert_eq!(Value::Real(1575030.0).to_string(), "1575030.0");
        assert_eq!(
            Value::from("Coindesk's data").to_sql_literal(),
            "'Coindesk''s data'"
        );
    }

    #[test]
    fn test_push_row_checks_width() {
        let mut table = Table::new(vec!["a".to_string(), "b".to_string()]);
        assert!(table.push_row(vec![Value::Integer(1)]).is_err());
        assert!(
            table
                .push_row(vec![Value::Integer(1), Value::from("x")])
                .is_ok()
        );
        assert_eq!(table.len(), 1);
    }

    #[test]
    fn test_csv_keeps_header_and_quotes() {
        let mut table = Table::new(vec!["disclaimer".to_string(), "rate".to_string()]);
        table
            .push_row(vec![Value::from("a, b"), Value::Real(1.5)])
            .unwrap();

        let mut buf = Vec::new();
        table.write_csv(&mut buf).unwrap();
        let text = String::from_utf8(buf).unwrap();
        assert_eq!(text, "disclaimer,rate\n\"a, b\",1.5\n");

        let parsed = Table::read_csv(text.as_bytes()).unwrap();
        assert_eq!(parsed, table);
    }
}
