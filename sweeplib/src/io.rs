use std::io::{self, Write};
use crate::sweep::{ResultTable, SweepReport};

/// Header of the CSV output. The unnamed first column is the row number
pub const CSV_HEADER: &str = ",Hit Rate,Cache Implementation,Cache Size";

/// Writes the table as a pretty printed JSON array of rows
pub fn write_json<W: Write>(table: &ResultTable, mut writer: W) -> io::Result<()> {
    serde_json::to_writer_pretty(&mut writer, table)?;
    writeln!(writer)
}

/// Writes a whole report, failures included, as pretty printed JSON
pub fn write_report_json<W: Write>(report: &SweepReport, mut writer: W) -> io::Result<()> {
    serde_json::to_writer_pretty(&mut writer, report)?;
    writeln!(writer)
}

/// Writes the table as CSV, one numbered row per outcome
///
/// # Arguments
///
/// * `table`: The table to write
/// * `writer`: Where to write it, buffering is left to the caller
///
/// returns: Result<(), io::Error>
///
/// # Examples
///
/// ```
/// use sweeplib::io::write_csv;
/// use sweeplib::sweep::{ResultTable, SimulationOutcome};
/// let mut table = ResultTable::new();
/// table.push(SimulationOutcome { hit_rate: 0.5, implementation_label: "Direct Mapped".to_string(), cache_size_bytes: 1024 });
/// let mut out = Vec::new();
/// write_csv(&table, &mut out).unwrap();
/// assert_eq!(String::from_utf8(out).unwrap(), ",Hit Rate,Cache Implementation,Cache Size\n0,0.5,Direct Mapped,1024\n");
/// ```
pub fn write_csv<W: Write>(table: &ResultTable, mut writer: W) -> io::Result<()> {
    writeln!(writer, "{CSV_HEADER}")?;
    for (index, row) in table.iter().enumerate() {
        writeln!(writer, "{index},{},{},{}", row.hit_rate, csv_field(&row.implementation_label), row.cache_size_bytes)?;
    }
    Ok(())
}

/// Quotes a field if it would otherwise break the row
fn csv_field(field: &str) -> String {
    if field.contains([',', '"', '\n', '\r']) {
        format!("\"{}\"", field.replace('"', "\"\""))
    } else {
        field.to_string()
    }
}
