use crate::merge::WordCounts;
use itertools::Itertools;
use std::io::{self, Write};

/// Row order of the emitted listing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SortOrder {
    /// By word, byte order.
    #[default]
    Word,
    /// By count, highest first; ties by word.
    Count,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Format {
    /// `word<TAB>count`, one pair per line.
    #[default]
    Tsv,
    /// Boxed table in the style of a dataframe `show()`.
    Table,
}

const CELL_MAX: usize = 20;

pub fn sorted(counts: &WordCounts, order: SortOrder) -> Vec<(&str, u64)> {
    match order {
        SortOrder::Word => counts.iter().collect(),
        SortOrder::Count => counts
            .iter()
            .sorted_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)))
            .collect(),
    }
}

pub fn write_counts<W: Write>(
    out: &mut W,
    counts: &WordCounts,
    order: SortOrder,
    format: Format,
    limit: Option<usize>,
) -> io::Result<()> {
    let rows = sorted(counts, order);
    let shown = limit.unwrap_or(rows.len()).min(rows.len());
    match format {
        Format::Tsv => {
            for (word, count) in &rows[..shown] {
                writeln!(out, "{word}\t{count}")?;
            }
        }
        Format::Table => write_table(out, &rows[..shown], rows.len())?,
    }
    out.flush()
}

fn truncate_cell(cell: &str) -> String {
    if cell.chars().count() > CELL_MAX {
        format!("{}...", cell.chars().take(CELL_MAX - 3).collect::<String>())
    } else {
        cell.to_string()
    }
}

fn write_table<W: Write>(out: &mut W, rows: &[(&str, u64)], total: usize) -> io::Result<()> {
    let cells = rows
        .iter()
        .map(|(word, count)| [truncate_cell(word), count.to_string()])
        .collect_vec();
    let header = ["word".to_string(), "count".to_string()];

    let widths: Vec<usize> = (0..2)
        .map(|col| {
            std::iter::once(&header)
                .chain(&cells)
                .map(|row| row[col].chars().count())
                .max()
                .unwrap_or(0)
                .max(3)
        })
        .collect();

    let sep = format!("+{}+", widths.iter().map(|w| "-".repeat(*w)).join("+"));
    let line = |row: &[String; 2]| {
        format!(
            "|{}|",
            row.iter()
                .zip(&widths)
                .map(|(cell, w)| format!("{cell:>w$}", w = *w))
                .join("|")
        )
    };

    writeln!(out, "{sep}")?;
    writeln!(out, "{}", line(&header))?;
    writeln!(out, "{sep}")?;
    for row in &cells {
        writeln!(out, "{}", line(row))?;
    }
    writeln!(out, "{sep}")?;
    if rows.len() < total {
        let noun = if rows.len() == 1 { "row" } else { "rows" };
        writeln!(out, "only showing top {} {noun}", rows.len())?;
    }
    Ok(())
}
