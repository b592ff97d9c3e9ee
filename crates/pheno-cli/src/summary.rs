use comfy_table::modifiers::UTF8_ROUND_CORNERS;
use comfy_table::presets::UTF8_FULL_CONDENSED;
use comfy_table::{Attribute, Cell, CellAlignment, Color, ContentArrangement, Table};

use pheno_transform::PassCount;

use crate::types::{NormalizeResult, PoolResult, QcResult};

pub fn apply_table_style(table: &mut Table) {
    table
        .load_preset(UTF8_FULL_CONDENSED)
        .apply_modifier(UTF8_ROUND_CORNERS)
        .set_content_arrangement(ContentArrangement::Dynamic);
}

pub fn print_normalize_summary(result: &NormalizeResult) {
    println!("Cohort: {}", result.cohort);
    println!("Rows: {} read, {} written", result.input_rows, result.output_rows);
    println!("Columns: {}", result.columns.join(", "));
    println!("Table: {}", result.table_path.display());
    println!("Dictionary: {}", result.dictionary_path.display());
}

pub fn print_qc_summary(result: &QcResult) {
    let mut table = Table::new();
    table.set_header(vec![
        header_cell("Dataset"),
        header_cell("Scans"),
        header_cell("Sessions"),
        header_cell("Subjects"),
    ]);
    apply_table_style(&mut table);
    for column in 1..=3 {
        align_column(&mut table, column, CellAlignment::Right);
    }
    for (dataset, summary) in &result.summaries {
        table.add_row(vec![
            Cell::new(dataset)
                .fg(Color::Blue)
                .add_attribute(Attribute::Bold),
            pass_cell(summary.scans),
            pass_cell(summary.sessions),
            pass_cell(summary.participants),
        ]);
    }
    println!("{table}");
    println!(
        "Master rows: {} ({} passed)",
        result.master_rows, result.passed_rows
    );
    println!("QC summary: {}", result.summary_path.display());
    println!("Passed master: {}", result.passed_path.display());
    print_errors(&result.errors);
}

pub fn print_pool_summary(result: &PoolResult) {
    let mut table = Table::new();
    table.set_header(vec![
        header_cell("Group"),
        header_cell("Label"),
        header_cell("Rows"),
    ]);
    apply_table_style(&mut table);
    align_column(&mut table, 2, CellAlignment::Right);
    for group in &result.groups {
        for (label, count) in &group.labels {
            table.add_row(vec![
                Cell::new(&group.name)
                    .fg(Color::Blue)
                    .add_attribute(Attribute::Bold),
                label_cell(label),
                Cell::new(count),
            ]);
        }
        table.add_row(vec![
            Cell::new(&group.name).fg(Color::Cyan),
            Cell::new("all").fg(Color::Cyan),
            Cell::new(group.rows).add_attribute(Attribute::Bold),
        ]);
    }
    println!("{table}");
    for group in &result.groups {
        if let Some(path) = &group.severity_path {
            println!("Severity table ({}): {}", group.name, path.display());
        }
    }
    println!(
        "Pooled table: {} ({} rows)",
        result.pooled_path.display(),
        result.pooled_rows
    );
    print_errors(&result.errors);
}

fn print_errors(errors: &[String]) {
    if !errors.is_empty() {
        eprintln!("Errors:");
        for error in errors {
            eprintln!("- {error}");
        }
    }
}

fn pass_cell(count: PassCount) -> Cell {
    let text = format!("{}/{} ({:.1}%)", count.passed, count.total, count.percent());
    let color = if count.total == 0 {
        Color::DarkGrey
    } else if count.passed == count.total {
        Color::Green
    } else {
        Color::Yellow
    };
    Cell::new(text).fg(color)
}

fn label_cell(label: &str) -> Cell {
    if label == "n/a" {
        Cell::new(label).fg(Color::DarkGrey)
    } else {
        Cell::new(label)
    }
}

fn header_cell(label: &str) -> Cell {
    Cell::new(label)
        .fg(Color::Cyan)
        .add_attribute(Attribute::Bold)
}

fn align_column(table: &mut Table, index: usize, alignment: CellAlignment) {
    if let Some(column) = table.column_mut(index) {
        column.set_cell_alignment(alignment);
    }
}
