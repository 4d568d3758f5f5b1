use crate::{OutputMode, Settings, emit_success};
use pairs::ui::{self, Icons, ImportProgress, section, success, summary_row};
use pairs::{Codec, KeyFormat, PairStats, PairStore, Scalar, Value};
use owo_colors::OwoColorize;
use std::path::Path;
use std::time::Instant;

/// Parse command-line text into a value the given codec can store.
fn parse_value(raw: &str, codec: Codec) -> anyhow::Result<Value> {
    Ok(match codec {
        Codec::Raw => Value::from(raw),
        Codec::Integer => Value::from(Scalar::Integer(Scalar::infer(raw).to_integer()?)),
        Codec::Json | Codec::JsonDeflate => Value::Json(serde_json::from_str(raw)?),
    })
}

fn scalar_json(scalar: &Scalar) -> serde_json::Value {
    match scalar {
        Scalar::Integer(i) => serde_json::json!(i),
        Scalar::Text(s) => serde_json::json!(s),
        Scalar::Blob(_) => serde_json::json!(scalar.to_string()),
    }
}

fn stats_json(stats: &PairStats) -> serde_json::Value {
    serde_json::to_value(stats).unwrap_or(serde_json::Value::Null)
}

fn value_json(value: &Value) -> serde_json::Value {
    match value {
        Value::Scalar(scalar) => scalar_json(scalar),
        Value::Json(json) => json.clone(),
    }
}

pub fn run_init(settings: &Settings, force: bool, output_mode: OutputMode) -> anyhow::Result<()> {
    let file_config = settings.to_file_config();
    pairs::config::write_config(&settings.config_path, &file_config, force)?;

    if output_mode.is_human() {
        success(&format!("Wrote {}", settings.config_path.display()));
        summary_row("database", &settings.database.display().to_string());
        summary_row("table", &settings.store.table);
        summary_row("types", &settings.store.types.to_string());
    } else {
        emit_success(output_mode, "init", serde_json::json!({
            "path": settings.config_path.display().to_string(),
            "config": file_config,
        }))?;
    }
    Ok(())
}

pub fn run_set(
    store: &mut PairStore<'_>,
    key: &str,
    value: &str,
    codec: Codec,
    output_mode: OutputMode,
) -> anyhow::Result<()> {
    let key = Scalar::infer(key);
    let value = parse_value(value, codec)?;
    let shown = value_json(&value);
    store.set_key_value(key.clone(), value, codec)?;

    if output_mode.is_human() {
        ui::pair(&key.to_string(), &shown.to_string());
    } else {
        emit_success(output_mode, "set", serde_json::json!({
            "key": scalar_json(&key),
            "value": shown,
            "codec": codec,
        }))?;
    }
    Ok(())
}

pub fn run_get(store: &mut PairStore<'_>, key: &str, codec: Codec, output_mode: OutputMode) -> anyhow::Result<()> {
    let key = Scalar::infer(key);
    let value = store.get_value(key.clone(), codec)?;

    if output_mode.is_human() {
        match &value {
            Some(value) => ui::pair(&key.to_string(), &value.to_string()),
            None => ui::not_found(&format!("key {}", key)),
        }
    } else {
        emit_success(output_mode, "get", serde_json::json!({
            "key": scalar_json(&key),
            "found": value.is_some(),
            "value": value.as_ref().map(value_json),
        }))?;
    }
    Ok(())
}

pub fn run_key(
    store: &mut PairStore<'_>,
    value: &str,
    add: bool,
    raw: bool,
    output_mode: OutputMode,
) -> anyhow::Result<()> {
    let format = if raw { KeyFormat::Raw } else { KeyFormat::Integer };
    let key = store.get_key(value, add, format)?;

    if output_mode.is_human() {
        match &key {
            Some(key) => ui::pair(&key.to_string(), value),
            None => ui::not_found(&format!("value {:?}", value)),
        }
    } else {
        emit_success(output_mode, "key", serde_json::json!({
            "value": value,
            "found": key.is_some(),
            "key": key.as_ref().map(scalar_json),
        }))?;
    }
    Ok(())
}

pub fn run_unset(
    store: &mut PairStore<'_>,
    key: &str,
    value: Option<&str>,
    output_mode: OutputMode,
) -> anyhow::Result<()> {
    let key = Scalar::infer(key);
    let removed = match value {
        Some(value) => store.unset_key_value(key.clone(), value)?,
        // Without a value only the key side is forgotten
        None => store.unset_key_value(key.clone(), Value::Json(serde_json::Value::Null))?,
    };

    if output_mode.is_human() {
        if removed {
            success(&format!("Removed key {}", key));
        } else {
            ui::not_found(&format!("key {}", key));
        }
    } else {
        emit_success(output_mode, "unset", serde_json::json!({
            "key": scalar_json(&key),
            "removed": removed,
        }))?;
    }
    Ok(())
}

pub fn run_reset(store: &mut PairStore<'_>, output_mode: OutputMode) -> anyhow::Result<()> {
    let before = store.count_pairs()?;
    store.reset()?;

    if output_mode.is_human() {
        success(&format!("Deleted {} pairs from {}", before, store.table()));
    } else {
        emit_success(output_mode, "reset", serde_json::json!({
            "table": store.table(),
            "deleted": before,
        }))?;
    }
    Ok(())
}

pub fn run_import(store: &mut PairStore<'_>, file: &Path, output_mode: OutputMode) -> anyhow::Result<()> {
    let contents = std::fs::read_to_string(file)?;
    let lines: Vec<&str> = contents.lines().filter(|line| !line.is_empty()).collect();

    let start = Instant::now();
    let before = store.count_pairs()?;
    let progress = if output_mode.is_human() {
        Some(ImportProgress::new(lines.len()))
    } else {
        None
    };

    store.begin()?;
    for line in &lines {
        if let Err(err) = store.get_key(*line, true, KeyFormat::Raw) {
            if let Some(progress) = &progress {
                progress.abandon();
            }
            if let Err(rollback_err) = store.rollback() {
                tracing::warn!(error = %rollback_err, "rollback after failed import also failed");
            }
            // Keys assigned before the failure were rolled back
            store.clear_cache();
            return Err(err.into());
        }
        if let Some(progress) = &progress {
            progress.inc();
        }
    }
    store.commit()?;

    let new_keys = store.count_pairs()?.saturating_sub(before);
    tracing::info!(lines = lines.len(), new_keys, "import finished");

    match &progress {
        Some(progress) => progress.finish_with_summary(start.elapsed(), lines.len(), new_keys),
        None => emit_success(output_mode, "import", serde_json::json!({
            "file": file.display().to_string(),
            "lines": lines.len(),
            "new_keys": new_keys,
        }))?,
    }
    Ok(())
}

pub fn run_stats(store: &PairStore<'_>, settings: &Settings, output_mode: OutputMode) -> anyhow::Result<()> {
    let rows = store.count_pairs()?;
    let stats = store.stats();

    if output_mode.is_human() {
        ui::header(&format!("{}", settings.database.display()));
        section(&format!(" {} {} ", Icons::STATS, "Statistics".bold()));
        println!("{}", ui::stats_table(store.table(), rows, store.cache_capacity(), &stats));
    } else {
        emit_success(output_mode, "stats", serde_json::json!({
            "database": settings.database.display().to_string(),
            "table": store.table(),
            "rows": rows,
            "cache_capacity": store.cache_capacity(),
            "types": settings.store.types.to_string(),
            "stats": stats_json(&stats),
        }))?;
    }
    Ok(())
}

pub fn run_query(store: &PairStore<'_>, sql: &str, output_mode: OutputMode) -> anyhow::Result<()> {
    let records = store.query(sql)?;

    if output_mode.is_human() {
        if records.is_empty() {
            ui::not_found("rows");
        } else {
            println!("{}", ui::records_table(&records));
            ui::info("rows", &records.len().to_string());
        }
    } else {
        let rows: Vec<serde_json::Map<String, serde_json::Value>> = records
            .iter()
            .map(|record| {
                record
                    .iter()
                    .map(|(name, value)| (name.clone(), serde_json::json!(ui::sql_cell(value))))
                    .collect()
            })
            .collect();
        emit_success(output_mode, "query", serde_json::json!({ "rows": rows }))?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_value_per_codec() {
        assert_eq!(parse_value("42", Codec::Raw).unwrap(), Value::from("42"));
        assert_eq!(parse_value("42", Codec::Integer).unwrap(), Value::from(42i64));
        assert!(parse_value("forty", Codec::Integer).is_err());
        assert_eq!(
            parse_value(r#"{"a":1}"#, Codec::Json).unwrap(),
            Value::Json(serde_json::json!({"a": 1}))
        );
        assert!(parse_value("{", Codec::JsonDeflate).is_err());
    }

    #[test]
    fn test_stats_json_carries_counters() {
        let stats = PairStats {
            lookups_by_key: 3,
            lookups_by_value: 2,
            writes: 5,
            plans_compiled: 4,
            cache_flushes: 1,
            ..PairStats::default()
        };
        let json = stats_json(&stats);
        assert_eq!(json["lookups_by_key"], serde_json::json!(3));
        assert_eq!(json["lookups_by_value"], serde_json::json!(2));
        assert_eq!(json["writes"], serde_json::json!(5));
        assert_eq!(json["plans_compiled"], serde_json::json!(4));
        assert_eq!(json["cache_flushes"], serde_json::json!(1));
    }

    #[test]
    fn test_value_json() {
        assert_eq!(value_json(&Value::from(7i64)), serde_json::json!(7));
        assert_eq!(value_json(&Value::from("x")), serde_json::json!("x"));
        assert_eq!(value_json(&Value::from(vec![0x01u8])), serde_json::json!("x'01'"));
    }
}
