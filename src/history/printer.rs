use super::storage::HistoryStorage;
use crate::Result;
use comfy_table::presets::UTF8_FULL;
use comfy_table::{Attribute, Cell, Color, Table};

pub fn list_history(storage: &HistoryStorage, limit: usize) -> Result<()> {
    let mut records = storage.tail(limit)?;
    records.reverse();

    if records.is_empty() {
        println!("No runs recorded in {}", storage.path().display());
        return Ok(());
    }

    let mut table = Table::new();
    table.load_preset(UTF8_FULL).set_header(vec![
        "ID", "Time", "Probe", "Strategy", "Result", "Duration",
    ]);

    for record in records {
        let (result, color) = if record.is_success() {
            (format!("{}/{} passed", record.passed, record.total), Color::Green)
        } else {
            (
                format!(
                    "{} failed, {} errors / {}",
                    record.failed, record.errors, record.total
                ),
                Color::Red,
            )
        };

        table.add_row(vec![
            Cell::new(&record.id[..8.min(record.id.len())]),
            Cell::new(record.timestamp.format("%Y-%m-%d %H:%M:%S")),
            Cell::new(&record.probe),
            Cell::new(record.strategy).add_attribute(Attribute::Dim),
            Cell::new(result).fg(color),
            Cell::new(format!("{}ms", record.duration.as_millis())),
        ]);
    }

    println!("{}", table);
    Ok(())
}
