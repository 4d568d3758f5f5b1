use crate::storage::{PairStats, Record};
use rusqlite::types::Value as SqlValue;
use tabled::{Table, Tabled, builder::Builder, settings::Style};

#[derive(Tabled)]
pub struct TableRow {
    #[tabled(rename = "Metric")]
    pub metric: String,
    #[tabled(rename = "Value")]
    pub value: String,
}

#[derive(Default)]
pub struct TableBuilder {
    rows: Vec<TableRow>,
}

impl TableBuilder {
    pub fn new() -> Self {
        Self { rows: Vec::new() }
    }

    pub fn add_row(&mut self, label: &str, value: impl ToString) {
        self.rows.push(TableRow {
            metric: label.to_string(),
            value: value.to_string(),
        });
    }

    pub fn build(&self) -> String {
        if self.rows.is_empty() {
            return String::new();
        }
        Table::new(&self.rows).with(Style::rounded()).to_string()
    }
}

/// Table of a store's persisted and in-process state
pub fn stats_table(table: &str, rows: usize, capacity: usize, stats: &PairStats) -> String {
    let mut builder = TableBuilder::new();
    builder.add_row("Table", table);
    builder.add_row("Rows", rows);
    builder.add_row("Cache capacity", capacity);
    builder.add_row("Cached entries", stats.cached_entries);
    builder.add_row("Lookups by key", stats.lookups_by_key);
    builder.add_row("Lookups by value", stats.lookups_by_value);
    builder.add_row("Plans compiled", stats.plans_compiled);
    builder.build()
}

/// Render query rows, using the first row's column names as the header
pub fn records_table(records: &[Record]) -> String {
    let Some(first) = records.first() else {
        return String::new();
    };

    let mut builder = Builder::default();
    builder.push_record(first.iter().map(|(name, _)| name.clone()));
    for record in records {
        builder.push_record(record.iter().map(|(_, value)| sql_cell(value)));
    }
    builder.build().with(Style::rounded()).to_string()
}

pub fn sql_cell(value: &SqlValue) -> String {
    match value {
        SqlValue::Null => "NULL".to_string(),
        SqlValue::Integer(i) => i.to_string(),
        SqlValue::Real(r) => r.to_string(),
        SqlValue::Text(s) => s.clone(),
        SqlValue::Blob(b) => {
            let hex: String = b.iter().map(|byte| format!("{:02x}", byte)).collect();
            format!("x'{}'", hex)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_builder() {
        assert!(TableBuilder::new().build().is_empty());
    }

    #[test]
    fn test_stats_table() {
        let rendered = stats_table("ids", 3, 1024, &PairStats::default());
        assert!(rendered.contains("Metric"));
        assert!(rendered.contains("ids"));
        assert!(rendered.contains("1024"));
    }

    #[test]
    fn test_records_table() {
        let records: Vec<Record> = vec![
            vec![("key".to_string(), SqlValue::Integer(1)), ("value".to_string(), SqlValue::Text("a".into()))],
            vec![("key".to_string(), SqlValue::Integer(2)), ("value".to_string(), SqlValue::Null)],
        ];
        let rendered = records_table(&records);
        assert!(rendered.contains("key"));
        assert!(rendered.contains("NULL"));
        assert!(records_table(&[]).is_empty());
    }

    #[test]
    fn test_sql_cell_blob() {
        assert_eq!(sql_cell(&SqlValue::Blob(vec![0xab, 0x01])), "x'ab01'");
    }
}
