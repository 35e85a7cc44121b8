//! `spana table`: list the offset table

use spana_image::{FormatWarning, OffsetTableDb};
use std::fmt::Write;

/// Render the table as aligned text, one entry per line
pub fn render(db: &OffsetTableDb, warnings: &[FormatWarning]) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "idx  rate(Hz)  start     end       size    label");
    for entry in db {
        let rate = entry
            .sample_rate_hz()
            .map_or_else(|| "-".to_string(), |hz| hz.to_string());
        let end = entry
            .sound_data_end_addr
            .map_or_else(|| "-".to_string(), |end| format!("0x{end:06X}"));
        let size = entry
            .sound_data_end_addr
            .map_or_else(|| "-".to_string(), |end| end.saturating_sub(entry.sound_data_start_addr).to_string());
        let marker = if entry.valid { "" } else { " (invalid)" };

        let _ = writeln!(
            out,
            "{:3}  {:>8}  0x{:06X}  {:>8}  {:>6}  {}{}",
            entry.index,
            rate,
            entry.sound_data_start_addr,
            end,
            size,
            entry.display_label(),
            marker
        );
    }

    if !warnings.is_empty() {
        let _ = writeln!(out, "\n{} warning(s):", warnings.len());
        for warning in warnings {
            let _ = writeln!(out, "  {warning}");
        }
    }
    out
}
