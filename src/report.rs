use std::fmt::Write as _;
use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use serde::Serialize;

use crate::backtest::SegmentStats;

/// One titled table of the report.
#[derive(Debug, Clone, Serialize)]
pub struct ReportSection {
    pub heading: String,
    pub note: Option<String>,
    pub rows: Vec<SegmentStats>,
}

impl ReportSection {
    pub fn new(heading: impl Into<String>, rows: Vec<SegmentStats>) -> Self {
        Self {
            heading: heading.into(),
            note: None,
            rows,
        }
    }

    pub fn with_note(mut self, note: impl Into<String>) -> Self {
        self.note = Some(note.into());
        self
    }
}

pub fn escape_html(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    for c in raw.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}

fn signed_class(v: f64) -> &'static str {
    if v > 0.0 {
        "pos"
    } else if v < 0.0 {
        "neg"
    } else {
        ""
    }
}

const STYLE: &str = "body{font-family:sans-serif;margin:2em;color:#222}\
table{border-collapse:collapse;margin-bottom:2em}\
th,td{border:1px solid #ccc;padding:4px 10px;text-align:right}\
th:first-child,td:first-child{text-align:left}\
th{background:#f2f2f2}.pos{color:#0a7d32}.neg{color:#c62828}\
.note{color:#666;font-size:90%}";

/// A self-contained HTML page, one table per section.
pub fn render_html_report(title: &str, sections: &[ReportSection]) -> String {
    let title = escape_html(title);
    let mut html = String::new();
    // writing into a String cannot fail
    let _ = write!(
        html,
        "<!DOCTYPE html>\n<html lang=\"en\">\n<head>\n<meta charset=\"utf-8\">\n\
         <title>{title}</title>\n<style>{STYLE}</style>\n</head>\n<body>\n<h1>{title}</h1>\n"
    );

    for section in sections {
        let _ = writeln!(html, "<h2>{}</h2>", escape_html(&section.heading));
        if let Some(note) = &section.note {
            let _ = writeln!(html, "<p class=\"note\">{}</p>", escape_html(note));
        }
        html.push_str(
            "<table>\n<tr><th>segment</th><th>valid</th><th>wins</th><th>win rate</th>\
             <th>total (yen)</th><th>mean (yen)</th><th>max drawdown (yen)</th></tr>\n",
        );
        for s in &section.rows {
            let _ = writeln!(
                html,
                "<tr><td>{}</td><td>{}</td><td>{}</td><td>{:.1}%</td>\
                 <td class=\"{}\">{:.0}</td><td class=\"{}\">{:.1}</td><td>{:.0}</td></tr>",
                escape_html(&s.label),
                s.valid,
                s.wins,
                s.win_rate * 100.0,
                signed_class(s.total_profit),
                s.total_profit,
                signed_class(s.mean_profit),
                s.mean_profit,
                s.max_drawdown
            );
        }
        html.push_str("</table>\n");
    }

    html.push_str("</body>\n</html>\n");
    html
}

fn ensure_parent(path: &Path) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)
            .with_context(|| format!("failed to create directory {:?}", parent))?;
    }
    Ok(())
}

pub fn write_html_report(path: &Path, title: &str, sections: &[ReportSection]) -> Result<()> {
    ensure_parent(path)?;
    fs::write(path, render_html_report(title, sections))
        .with_context(|| format!("failed to write report {:?}", path))
}

pub fn write_json_summary<T: Serialize + ?Sized>(path: &Path, value: &T) -> Result<()> {
    ensure_parent(path)?;
    let json = serde_json::to_string_pretty(value).context("failed to encode JSON summary")?;
    fs::write(path, json).with_context(|| format!("failed to write {:?}", path))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn stats(label: &str, total: f64) -> SegmentStats {
        SegmentStats {
            label: label.to_string(),
            total: 2,
            valid: 2,
            wins: 1,
            total_profit: total,
            mean_profit: total / 2.0,
            win_rate: 0.5,
            max_drawdown: 300.0,
        }
    }

    #[test]
    fn test_escape_html() {
        assert_eq!(
            escape_html("<b>\"R&D\"</b> 'x'"),
            "&lt;b&gt;&quot;R&amp;D&quot;&lt;/b&gt; &#39;x&#39;"
        );
        assert_eq!(escape_html("トヨタ"), "トヨタ");
    }

    #[test]
    fn test_render_html_report_escapes_and_colors() {
        let sections = vec![
            ReportSection::new("By <segment>", vec![stats("phase1", 1_200.0), stats("seg_0930", -400.0)])
                .with_note("yen per 100 shares"),
        ];
        let html = render_html_report("Picks & results", &sections);
        assert!(html.starts_with("<!DOCTYPE html>"));
        assert!(html.contains("<title>Picks &amp; results</title>"));
        assert!(html.contains("<h2>By &lt;segment&gt;</h2>"));
        assert!(html.contains("<p class=\"note\">yen per 100 shares</p>"));
        assert!(html.contains("<td class=\"pos\">1200</td>"));
        assert!(html.contains("<td class=\"neg\">-400</td>"));
        assert!(html.contains("50.0%"));
        assert!(html.trim_end().ends_with("</html>"));
    }

    #[test]
    fn test_write_json_summary() {
        let mut path = std::env::temp_dir();
        path.push(format!("trend_backtest_report_{}", std::process::id()));
        path.push("summary.json");

        let sections = vec![ReportSection::new("all", vec![stats("phase2", 10.0)])];
        write_json_summary(&path, &sections).unwrap();
        let text = std::fs::read_to_string(&path).unwrap();
        std::fs::remove_dir_all(path.parent().unwrap()).ok();

        let v: serde_json::Value = serde_json::from_str(&text).unwrap();
        assert_eq!(v[0]["heading"], "all");
        assert_eq!(v[0]["rows"][0]["label"], "phase2");
        assert_eq!(v[0]["rows"][0]["wins"], 1);
    }
}
