use comfy_table::presets::UTF8_HORIZONTAL_ONLY;
use comfy_table::{Cell, CellAlignment, Color as TableColor, ContentArrangement, Table};

use crate::teamcity::types::NO_COMMENT;
use crate::teamcity::MutedTests;

fn header(labels: &[&str]) -> Vec<Cell> {
    labels
        .iter()
        .map(|label| Cell::new(*label).fg(TableColor::Cyan))
        .collect()
}

/// Reasons left empty by the muting user are dimmed.
fn reason_cell(reason: &str) -> Cell {
    if reason == NO_COMMENT {
        Cell::new(reason).fg(TableColor::DarkGrey)
    } else {
        Cell::new(reason)
    }
}

/// One row per muted test, numbered in server order.
pub fn muted_tests_table(muted: &MutedTests) -> Table {
    let mut table = Table::new();
    table
        .load_preset(UTF8_HORIZONTAL_ONLY)
        .set_content_arrangement(ContentArrangement::DynamicFullWidth)
        .set_header(header(&["#", "Test", "Reason"]));
    for (index, (name, reason)) in muted.iter().enumerate() {
        table.add_row(vec![
            Cell::new(index + 1).set_alignment(CellAlignment::Right),
            Cell::new(name),
            reason_cell(reason),
        ]);
    }
    table
}
