//! `threadloom audit`: list the repairs made while threading.

use std::path::Path;

use anyhow::Result;
use threadloom_core::BuildReport;
use threadloom_core::config::Config;

use crate::cli::input;

pub fn run(file: Option<&Path>, config: &Config) -> Result<()> {
    let normalizer = config.normalizer();
    let records = input::load_records(file, &normalizer)?;
    let (_, report) = threadloom_core::build_with_report(records, &normalizer);
    print!("{}", format_report(&report));
    Ok(())
}

fn format_report(report: &BuildReport) -> String {
    if report.is_clean() {
        return "No anomalies.\n".to_string();
    }

    let mut out = String::new();
    for demotion in &report.demotions {
        out.push_str(&format!(
            "demoted {}: {} ({})\n",
            demotion.id, demotion.reason, demotion.declared_parent
        ));
    }
    for id in &report.duplicates {
        out.push_str(&format!("duplicate {id}: dropped\n"));
    }
    out
}
