use super::manifest::format_size;
use super::types::RunReport;
use crate::runner::state::{CheckResult, Outcome};
use anyhow::{Context, Result};
use std::path::Path;

/// Write the HTML report, or print it when no path is given
pub fn generate(report: &RunReport, output: Option<&Path>) -> Result<()> {
    let html = generate_html(report);

    if let Some(path) = output {
        std::fs::write(path, html)
            .with_context(|| format!("Failed to write HTML report to {}", path.display()))?;
        println!("HTML report saved to: {}", path.display());
    } else {
        println!("{}", html);
    }

    Ok(())
}

pub fn generate_html(report: &RunReport) -> String {
    let summary = &report.summary;
    let pass_rate = if summary.total > 0 {
        (summary.passed as f64 / summary.total as f64 * 100.0) as u32
    } else {
        0
    };
    let verdict = if report.is_success() { "passed" } else { "failed" };

    let mut groups_html = String::new();
    for group in report.groups() {
        let checks: Vec<&CheckResult> = report.results.iter().filter(|r| r.group == group).collect();
        let group_class = if checks.iter().any(|c| c.outcome == Outcome::Fail) {
            "failed"
        } else if checks.iter().any(|c| c.outcome == Outcome::Warn) {
            "warned"
        } else {
            "passed"
        };

        let checks_html: String = checks.iter().map(|c| check_row(report, c)).collect();

        groups_html.push_str(&format!(
            r#"
            <div class="group {group_class}">
                <div class="group-header">
                    <h3>{}</h3>
                    <span class="count">{} checks</span>
                </div>
                <div class="checks">{checks_html}</div>
            </div>
        "#,
            html_escape(group),
            checks.len(),
        ));
    }

    let artifacts_html: String = report
        .artifacts
        .expected
        .iter()
        .map(|a| {
            let (class, size) = if a.present {
                ("passed", format_size(a.size_bytes))
            } else {
                ("failed", "MISSING".to_string())
            };
            let thumb = if a.present {
                let src = html_escape(&a.path.display().to_string());
                format!(r#"<img class="thumb" src="{src}" onclick="showScreenshot('{src}')" alt="">"#)
            } else {
                String::new()
            };
            format!(
                r#"<tr class="{class}"><td>{thumb}</td><td class="mono">{}</td><td>{size}</td></tr>"#,
                html_escape(&a.name)
            )
        })
        .collect();

    let extra_html = if report.artifacts.extra.is_empty() {
        String::new()
    } else {
        format!(
            r#"<p class="extra">Also written: {}</p>"#,
            html_escape(&report.artifacts.extra.join(", "))
        )
    };

    format!(
        r#"<!DOCTYPE html>
<html lang="en">
<head>
    <meta charset="UTF-8">
    <meta name="viewport" content="width=device-width, initial-scale=1.0">
    <title>Verification Report - {suite}</title>
    <style>
        :root {{
            --bg-primary: #0a0f1d;
            --bg-secondary: #141b2d;
            --bg-tertiary: #1f2937;
            --border: #374151;
            --text-primary: #f9fafb;
            --text-secondary: #9ca3af;
            --green: #10b981;
            --red: #ef4444;
            --yellow: #f59e0b;
            --blue: #3b82f6;
        }}
        * {{ margin: 0; padding: 0; box-sizing: border-box; }}
        body {{
            font-family: system-ui, -apple-system, sans-serif;
            background: var(--bg-primary);
            color: var(--text-primary);
            line-height: 1.5;
            padding: 3rem 1rem;
        }}
        .container {{ max-width: 1100px; margin: 0 auto; }}
        header {{ margin-bottom: 2.5rem; display: flex; justify-content: space-between; align-items: flex-end; }}
        h1 {{ font-size: 2rem; font-weight: 800; }}
        h2 {{ font-size: 1.25rem; margin: 2.5rem 0 1rem; }}
        .verdict {{ font-size: 0.875rem; font-weight: 700; text-transform: uppercase; }}
        .verdict.passed {{ color: var(--green); }}
        .verdict.failed {{ color: var(--red); }}
        .summary {{ display: grid; grid-template-columns: repeat(auto-fit, minmax(180px, 1fr)); gap: 1.25rem; margin-bottom: 2rem; }}
        .stat {{ background: var(--bg-secondary); border: 1px solid var(--border); padding: 1.25rem; border-radius: 1rem; }}
        .stat-value {{ font-size: 2.25rem; font-weight: 800; }}
        .stat-label {{ color: var(--text-secondary); font-size: 0.8rem; text-transform: uppercase; letter-spacing: 0.05em; }}
        .stat.passed .stat-value {{ color: var(--green); }}
        .stat.failed .stat-value {{ color: var(--red); }}
        .stat.warned .stat-value {{ color: var(--yellow); }}
        .progress-bar {{ background: var(--bg-secondary); height: 12px; border-radius: 6px; overflow: hidden; border: 1px solid var(--border); margin-bottom: 3rem; }}
        .progress-fill {{ height: 100%; background: var(--green); }}
        .group {{ background: var(--bg-secondary); border: 1px solid var(--border); border-radius: 1rem; margin-bottom: 1.5rem; overflow: hidden; }}
        .group-header {{ padding: 1rem 1.5rem; display: flex; justify-content: space-between; border-bottom: 1px solid var(--border); }}
        .group.failed .group-header h3 {{ color: var(--red); }}
        .group.warned .group-header h3 {{ color: var(--yellow); }}
        .count {{ color: var(--text-secondary); font-size: 0.8rem; }}
        .checks {{ padding: 0.75rem 1.5rem; }}
        .check {{ display: flex; gap: 1rem; padding: 0.6rem 0; border-bottom: 1px solid var(--bg-tertiary); }}
        .check:last-child {{ border-bottom: none; }}
        .badge {{ font-family: monospace; font-size: 0.75rem; font-weight: 700; padding: 0.1rem 0.5rem; border-radius: 0.4rem; height: fit-content; }}
        .check.passed .badge {{ background: rgba(16, 185, 129, 0.1); color: var(--green); }}
        .check.failed .badge {{ background: rgba(239, 68, 68, 0.1); color: var(--red); }}
        .check.warned .badge {{ background: rgba(245, 158, 11, 0.1); color: var(--yellow); }}
        .check-name {{ font-weight: 600; }}
        .detail {{ color: var(--text-secondary); font-size: 0.85rem; font-family: monospace; word-break: break-word; }}
        .screenshot-link {{ color: var(--blue); font-size: 0.75rem; cursor: pointer; }}
        table {{ width: 100%; border-collapse: collapse; background: var(--bg-secondary); border-radius: 1rem; overflow: hidden; }}
        td {{ padding: 0.5rem 1rem; border-bottom: 1px solid var(--border); }}
        tr.failed td {{ color: var(--red); }}
        .mono {{ font-family: monospace; }}
        .thumb {{ width: 96px; border-radius: 0.25rem; cursor: pointer; }}
        .extra {{ margin-top: 0.75rem; color: var(--text-secondary); font-size: 0.85rem; }}
        .meta {{ margin-top: 3rem; padding-top: 1.5rem; border-top: 1px solid var(--border); color: var(--text-secondary); font-size: 0.85rem; display: flex; justify-content: center; gap: 2rem; }}
        #modal {{ display: none; position: fixed; z-index: 100; inset: 0; background: rgba(0, 0, 0, 0.9); padding: 2rem; align-items: center; justify-content: center; }}
        #modal img {{ max-width: 100%; max-height: 100%; border-radius: 0.5rem; }}
        #modal.active {{ display: flex; }}
    </style>
</head>
<body>
    <div class="container">
        <header>
            <div>
                <div class="verdict {verdict}">{verdict}</div>
                <h1>{suite}</h1>
            </div>
            <div style="text-align: right;">
                <div style="font-size: 0.875rem; color: var(--text-secondary);">Duration</div>
                <div style="font-size: 1.25rem; font-weight: 700;">{duration}</div>
            </div>
        </header>

        <div class="summary">
            <div class="stat"><div class="stat-value">{total}</div><div class="stat-label">Checks</div></div>
            <div class="stat passed"><div class="stat-value">{passed}</div><div class="stat-label">Passed</div></div>
            <div class="stat failed"><div class="stat-value">{failed}</div><div class="stat-label">Failed</div></div>
            <div class="stat warned"><div class="stat-value">{warned}</div><div class="stat-label">Warnings</div></div>
        </div>

        <div class="progress-bar"><div class="progress-fill" style="width: {pass_rate}%"></div></div>

        {groups_html}

        <h2>Screenshots ({present}/{expected})</h2>
        <table>{artifacts_html}</table>
        {extra_html}

        <div class="meta">
            <span>Started: {started}</span>
            <span>Screenshots: {dir}</span>
        </div>
    </div>

    <div id="modal" onclick="this.classList.remove('active')">
        <img id="modal-img" src="" alt="Screenshot">
    </div>

    <script>
        function showScreenshot(path) {{
            document.getElementById('modal-img').src = path;
            document.getElementById('modal').classList.add('active');
            event.stopPropagation();
        }}
    </script>
</body>
</html>"#,
        suite = html_escape(&report.suite),
        duration = format_duration(report.duration_ms),
        total = summary.total,
        passed = summary.passed,
        failed = summary.failed,
        warned = summary.warned,
        present = report.artifacts.present_count(),
        expected = report.artifacts.expected.len(),
        started = html_escape(&report.started_at),
        dir = html_escape(&report.artifacts.dir.display().to_string()),
    )
}

fn check_row(report: &RunReport, check: &CheckResult) -> String {
    let class = match check.outcome {
        Outcome::Pass => "passed",
        Outcome::Fail => "failed",
        Outcome::Warn => "warned",
    };

    let screenshot_html = match &check.screenshot {
        Some(name) => {
            let src = html_escape(&report.artifacts.dir.join(name).display().to_string());
            format!(r#"<a class="screenshot-link" onclick="showScreenshot('{src}')">View {}</a>"#, html_escape(name))
        }
        None => String::new(),
    };

    let detail_html = if check.detail.is_empty() {
        String::new()
    } else {
        format!(r#"<div class="detail">{}</div>"#, html_escape(&check.detail))
    };

    format!(
        r#"
                <div class="check {class}">
                    <span class="badge">{}</span>
                    <div>
                        <div class="check-name">{}</div>
                        {detail_html}
                        {screenshot_html}
                    </div>
                </div>"#,
        check.outcome,
        html_escape(&check.name),
    )
}

fn html_escape(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
        .replace('\'', "&#39;")
}

fn format_duration(ms: u64) -> String {
    if ms < 1000 {
        format!("{}ms", ms)
    } else if ms < 60000 {
        format!("{:.1}s", ms as f64 / 1000.0)
    } else {
        let minutes = ms / 60000;
        let seconds = (ms % 60000) as f64 / 1000.0;
        format!("{}m {:.0}s", minutes, seconds)
    }
}
