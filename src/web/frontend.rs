//! Server-rendered HTML page for the xstat web dashboard.
//!
//! The page is a fixed shell with the dashboard tables rendered into it.
//! No JavaScript, no external assets; the browser reloads it every
//! poll interval.

use std::fmt::Write;

use crate::dashboard::{Dashboard, Status, Tab, Table};
use crate::describe::escape_html;

const STYLE: &str = r#"
:root {
  --bg: #0d1117;
  --surface: #161b22;
  --border: #30363d;
  --text: #e6edf3;
  --text-muted: #8b949e;
  --accent: #58a6ff;
  --yellow: #d29922;
  --red: #f85149;
  --cyan: #39d2c0;
  --radius: 8px;
  --font: -apple-system, BlinkMacSystemFont, 'Segoe UI', Helvetica, Arial, sans-serif;
  --mono: 'SF Mono', 'Cascadia Code', 'Fira Code', monospace;
}

* { margin: 0; padding: 0; box-sizing: border-box; }
body {
  background: var(--bg);
  color: var(--text);
  font-family: var(--font);
  font-size: 14px;
  line-height: 1.5;
}

.app { max-width: 1200px; margin: 0 auto; padding: 24px; }

header {
  margin-bottom: 24px;
  padding-bottom: 16px;
  border-bottom: 1px solid var(--border);
}
header h1 { font-size: 24px; font-weight: 600; }
header .subtitle { color: var(--text-muted); font-size: 13px; }
header .subtitle.warn { color: var(--yellow); }
header .subtitle.err { color: var(--red); }

nav {
  display: flex;
  gap: 4px;
  margin-bottom: 24px;
  background: var(--surface);
  border-radius: var(--radius);
  padding: 4px;
  border: 1px solid var(--border);
}
nav a {
  flex: 1;
  padding: 8px 16px;
  border-radius: 6px;
  color: var(--text-muted);
  font-size: 13px;
  font-weight: 500;
  text-align: center;
  text-decoration: none;
}
nav a:hover { color: var(--text); background: rgba(255,255,255,0.04); }
nav a.active { background: var(--accent); color: #fff; }

.card {
  background: var(--surface);
  border: 1px solid var(--border);
  border-radius: var(--radius);
  padding: 20px;
  margin-bottom: 16px;
}
.card h2 { font-size: 16px; font-weight: 600; margin-bottom: 4px; }
.card .descr { color: var(--text-muted); font-size: 12px; margin-bottom: 12px; }

table { width: 100%; border-collapse: collapse; font-size: 13px; }
th {
  text-align: left;
  color: var(--text-muted);
  font-weight: 500;
  padding: 8px 12px;
  border-bottom: 1px solid var(--border);
}
td { padding: 8px 12px; border-bottom: 1px solid var(--border); vertical-align: top; }
tr:nth-child(even) td { background: rgba(255,255,255,0.02); }

.badge {
  position: relative;
  display: inline-block;
  padding: 0 6px;
  border-radius: 10px;
  font-family: var(--mono);
  font-size: 12px;
  border: 1px solid var(--border);
  color: var(--cyan);
  white-space: pre-line;
}
.badge[data-tooltip] { cursor: help; }
.badge[data-tooltip]:hover::after {
  content: attr(data-tooltip);
  position: absolute;
  left: 0;
  top: 100%;
  z-index: 10;
  margin-top: 4px;
  padding: 6px 10px;
  background: var(--bg);
  border: 1px solid var(--border);
  border-radius: 6px;
  color: var(--text);
  white-space: pre;
}
"#;

/// Render the full page. `only` limits the tables to one tab.
pub fn render_page(dashboard: &Dashboard, only: Option<Tab>, refresh_secs: u64) -> String {
    let mut html = String::new();
    let _ = write!(
        html,
        "<!DOCTYPE html>\n<html lang=\"en\">\n<head>\n<meta charset=\"utf-8\">\n\
         <meta name=\"viewport\" content=\"width=device-width, initial-scale=1\">\n\
         <meta http-equiv=\"refresh\" content=\"{}\">\n\
         <title>Xray (status)</title>\n<style>{STYLE}</style>\n</head>\n<body>\n<div class=\"app\">\n",
        refresh_secs.max(1)
    );

    let subtitle_class = match dashboard.status {
        Status::Ready => "subtitle",
        Status::Waiting => "subtitle warn",
        Status::MetricsDisabled | Status::Failed => "subtitle err",
    };
    let _ = write!(
        html,
        "<header>\n<h1>Xray (status)</h1>\n<p class=\"{subtitle_class}\">{}</p>\n</header>\n",
        escape_html(&dashboard.headline)
    );

    if dashboard.status == Status::Ready {
        html.push_str(&render_nav(only));
        for tab in Tab::ALL {
            if only.is_some_and(|t| t != tab) {
                continue;
            }
            for table in dashboard.tables_in(tab) {
                html.push_str(&render_table(table));
            }
        }
    }

    html.push_str("</div>\n</body>\n</html>\n");
    html
}

fn render_nav(only: Option<Tab>) -> String {
    let mut nav = String::from("<nav>\n");
    let class = |active: bool| if active { " class=\"active\"" } else { "" };
    let _ = writeln!(nav, "<a href=\"/\"{}>All</a>", class(only.is_none()));
    for tab in Tab::ALL {
        let _ = writeln!(
            nav,
            "<a href=\"/?tab={}\"{}>{}</a>",
            tab.id(),
            class(only == Some(tab)),
            tab.title()
        );
    }
    nav.push_str("</nav>\n");
    nav
}

fn render_table(table: &Table) -> String {
    let mut html = String::from("<div class=\"card\">\n");
    let _ = writeln!(html, "<h2>{}</h2>", escape_html(&table.title));
    if let Some(description) = &table.description {
        let _ = writeln!(html, "<p class=\"descr\">{}</p>", escape_html(description));
    }

    html.push_str("<table>\n");
    if !table.headers.is_empty() {
        html.push_str("<tr>");
        for header in &table.headers {
            let _ = write!(html, "<th>{}</th>", escape_html(header));
        }
        html.push_str("</tr>\n");
    }
    for row in &table.rows {
        html.push_str("<tr>");
        for cell in row {
            let _ = write!(html, "<td>{}</td>", cell.to_html());
        }
        html.push_str("</tr>\n");
    }
    html.push_str("</table>\n</div>\n");
    html
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::describe::{Badge, Description};

    fn dashboard() -> Dashboard {
        Dashboard {
            status: Status::Ready,
            headline: "Xray 1.8.24 <custom>".into(),
            tables: vec![Table {
                tab: Tab::Outbounds,
                title: "Outbound Statistics".into(),
                description: None,
                headers: vec!["Tag".into(), "Downlink".into()],
                rows: vec![vec![
                    Description::text("tcp_outbound:srv")
                        .with(Badge::value("tokyo").with_tooltip("tcp_outbound")),
                    Description::text("1.00 KiB"),
                ]],
            }],
        }
    }

    #[test]
    fn page_escapes_headline_and_renders_badges() {
        let html = render_page(&dashboard(), None, 5);
        assert!(html.contains("Xray 1.8.24 &lt;custom&gt;"));
        assert!(html.contains("<meta http-equiv=\"refresh\" content=\"5\">"));
        assert!(html.contains("data-tooltip=\"tcp_outbound\""));
        assert!(html.contains("<th>Downlink</th>"));
    }

    #[test]
    fn tab_filter_hides_other_tables() {
        let html = render_page(&dashboard(), Some(Tab::Dns), 5);
        assert!(!html.contains("Outbound Statistics"));
        assert!(html.contains("<a href=\"/?tab=dns\" class=\"active\">DNS</a>"));
    }

    #[test]
    fn non_ready_pages_have_no_tables() {
        let failed = Dashboard {
            status: Status::Failed,
            headline: "check that the metrics endpoint at http://127.0.0.1:18888/debug/vars is reachable".into(),
            tables: Vec::new(),
        };
        let html = render_page(&failed, None, 0);
        assert!(html.contains("subtitle err"));
        assert!(!html.contains("<nav>"));
        assert!(html.contains("content=\"1\""));
    }
}
