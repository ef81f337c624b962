use super::types::RunReport;
use crate::runner::state::{CheckResult, Outcome};
use anyhow::Result;
use quick_xml::events::{BytesDecl, BytesEnd, BytesStart, BytesText, Event};
use quick_xml::Writer;
use std::io::Cursor;
use std::path::{Path, PathBuf};

/// Render a run as JUnit XML, one `<testsuite>` per check group
pub fn generate_junit_xml(report: &RunReport) -> Result<String> {
    let mut writer = Writer::new(Cursor::new(Vec::new()));

    writer.write_event(Event::Decl(BytesDecl::new("1.0", Some("UTF-8"), None)))?;

    let summary = &report.summary;
    let seconds = format_seconds(report.duration_ms);

    let mut suites_start = BytesStart::new("testsuites");
    suites_start.push_attribute(("name", report.suite.as_str()));
    suites_start.push_attribute(("tests", summary.total.to_string().as_str()));
    suites_start.push_attribute(("failures", summary.failed.to_string().as_str()));
    suites_start.push_attribute(("skipped", "0"));
    suites_start.push_attribute(("time", seconds.as_str()));
    writer.write_event(Event::Start(suites_start))?;

    for group in report.groups() {
        let checks: Vec<&CheckResult> = report.results.iter().filter(|r| r.group == group).collect();
        let failures = checks.iter().filter(|r| r.outcome == Outcome::Fail).count();

        let mut suite_start = BytesStart::new("testsuite");
        suite_start.push_attribute(("name", group));
        suite_start.push_attribute(("tests", checks.len().to_string().as_str()));
        suite_start.push_attribute(("failures", failures.to_string().as_str()));
        suite_start.push_attribute(("skipped", "0"));
        suite_start.push_attribute(("timestamp", report.started_at.as_str()));
        writer.write_event(Event::Start(suite_start))?;

        for check in checks {
            write_test_case(&mut writer, &report.suite, check)?;
        }

        writer.write_event(Event::End(BytesEnd::new("testsuite")))?;
    }

    writer.write_event(Event::End(BytesEnd::new("testsuites")))?;

    let xml = String::from_utf8(writer.into_inner().into_inner())?;
    Ok(xml)
}

fn write_test_case<W: std::io::Write>(writer: &mut Writer<W>, suite: &str, check: &CheckResult) -> Result<()> {
    let classname = format!("{}.{}", suite, check.group);

    let mut case_start = BytesStart::new("testcase");
    case_start.push_attribute(("name", check.name.as_str()));
    case_start.push_attribute(("classname", classname.as_str()));
    writer.write_event(Event::Start(case_start))?;

    match check.outcome {
        Outcome::Fail => {
            let mut fail_start = BytesStart::new("failure");
            fail_start.push_attribute(("message", check.detail.as_str()));
            fail_start.push_attribute(("type", "CheckFailed"));
            writer.write_event(Event::Start(fail_start))?;
            writer.write_event(Event::Text(BytesText::new(&check.detail)))?;
            writer.write_event(Event::End(BytesEnd::new("failure")))?;
        }
        // Warnings are not failures; surface them as output only
        Outcome::Warn => {
            writer.write_event(Event::Start(BytesStart::new("system-out")))?;
            let text = format!("WARN: {}", check.detail);
            writer.write_event(Event::Text(BytesText::new(&text)))?;
            writer.write_event(Event::End(BytesEnd::new("system-out")))?;
        }
        Outcome::Pass => {}
    }

    writer.write_event(Event::End(BytesEnd::new("testcase")))?;
    Ok(())
}

fn format_seconds(ms: u64) -> String {
    format!("{:.3}", ms as f64 / 1000.0)
}

/// Write `<suite>-junit.xml` into `output_dir`
pub fn write_report(report: &RunReport, output_dir: &Path) -> Result<PathBuf> {
    let xml = generate_junit_xml(report)?;
    let path = output_dir.join(format!("{}-junit.xml", report.suite));
    std::fs::write(&path, xml)?;
    println!("    Generated JUnit report: {}", path.display());
    Ok(path)
}
