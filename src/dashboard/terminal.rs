//! Colored terminal rendering of the dashboard.

use colored::Colorize;

use crate::describe::{Description, Fragment};

use super::{Dashboard, Status, Tab, Table};

/// Render the dashboard, optionally limited to one tab.
pub fn render(dashboard: &Dashboard, only: Option<Tab>) -> String {
    let mut out = String::new();

    out.push_str(&format!("{}\n", "Xray (status)".bold().cyan()));
    let headline = match dashboard.status {
        Status::Ready => dashboard.headline.dimmed(),
        Status::Waiting => dashboard.headline.yellow(),
        Status::MetricsDisabled | Status::Failed => dashboard.headline.red(),
    };
    out.push_str(&format!("{headline}\n"));

    for tab in Tab::ALL {
        if only.is_some_and(|t| t != tab) {
            continue;
        }
        let tables: Vec<&Table> = dashboard.tables_in(tab).collect();
        if tables.is_empty() {
            continue;
        }
        out.push('\n');
        out.push_str(&format!("{}\n", format!("[{}]", tab.title()).bold().magenta()));
        out.push_str(&format!("{}\n", "=".repeat(60)));
        for table in tables {
            out.push_str(&render_table(table));
        }
    }

    out
}

/// One table: title, description, then aligned columns.
pub fn render_table(table: &Table) -> String {
    let mut out = String::new();
    out.push('\n');
    out.push_str(&format!("{}\n", table.title.bold().cyan()));
    if let Some(description) = &table.description {
        out.push_str(&format!("  {}\n", description.dimmed()));
    }

    let columns = table
        .rows
        .iter()
        .map(Vec::len)
        .chain(std::iter::once(table.headers.len()))
        .max()
        .unwrap_or(0);
    let mut widths = vec![0usize; columns];
    for (i, header) in table.headers.iter().enumerate() {
        widths[i] = widths[i].max(header.chars().count());
    }
    for row in &table.rows {
        for (i, cell) in row.iter().enumerate() {
            widths[i] = widths[i].max(plain_width(cell));
        }
    }

    if !table.headers.is_empty() {
        let header_line: Vec<String> = table
            .headers
            .iter()
            .enumerate()
            .map(|(i, h)| pad(&h.bold().to_string(), h.chars().count(), widths[i]))
            .collect();
        out.push_str(&format!("  {}\n", header_line.join("  ").trim_end()));
        let rule = widths.iter().sum::<usize>() + 2 * columns.saturating_sub(1);
        out.push_str(&format!("  {}\n", "-".repeat(rule)));
    }

    for row in &table.rows {
        let line: Vec<String> = row
            .iter()
            .enumerate()
            .map(|(i, cell)| pad(&colorize(cell), plain_width(cell), widths[i]))
            .collect();
        out.push_str(&format!("  {}\n", line.join("  ").trim_end()));
    }

    out
}

/// Fake DNS pool labels span lines; only the widest line counts.
fn plain_width(cell: &Description) -> usize {
    cell.to_string()
        .lines()
        .map(|l| l.chars().count())
        .max()
        .unwrap_or(0)
}

fn pad(rendered: &str, visible: usize, width: usize) -> String {
    format!("{rendered}{}", " ".repeat(width.saturating_sub(visible)))
}

/// Badges in cyan, elided badges dimmed, text as is.
fn colorize(cell: &Description) -> String {
    cell.fragments()
        .iter()
        .map(|fragment| match fragment {
            Fragment::Text { text } => text.clone(),
            Fragment::Badge(badge) if badge.is_elided() => badge.to_string().dimmed().to_string(),
            Fragment::Badge(badge) => badge.to_string().cyan().to_string(),
        })
        .collect::<Vec<_>>()
        .join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::describe::Badge;

    fn table() -> Table {
        Table {
            tab: Tab::Inbounds,
            title: "Inbound Statistics".into(),
            description: None,
            headers: vec!["Tag".into(), "Downlink".into()],
            rows: vec![
                vec![
                    Description::text("socks_inbound").with(Badge::named("listen", "socks5://0.0.0.0:1080")),
                    Description::text("1.00 KiB"),
                ],
                vec![Description::text("api"), Description::text("0.00 B")],
            ],
        }
    }

    #[test]
    fn columns_align_on_plain_width() {
        colored::control::set_override(false);
        let out = render_table(&table());
        let lines: Vec<&str> = out.lines().collect();
        assert_eq!(lines[1], "Inbound Statistics");
        let first = lines.iter().find(|l| l.contains("socks_inbound")).unwrap();
        let second = lines.iter().find(|l| l.contains("api")).unwrap();
        assert_eq!(first.find("1.00 KiB"), second.find("0.00 B"));
    }

    #[test]
    fn render_filters_by_tab() {
        colored::control::set_override(false);
        let dashboard = Dashboard {
            status: Status::Ready,
            headline: "Xray 1.8.24".into(),
            tables: vec![table()],
        };
        assert!(render(&dashboard, None).contains("[Inbounds]"));
        assert!(!render(&dashboard, Some(Tab::Dns)).contains("Inbound Statistics"));
    }
}
