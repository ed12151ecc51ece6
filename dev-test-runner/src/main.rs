//! Converts every fixture to every version and checks the result invariants.
use std::path::{Path, PathBuf};

use anyhow::{Context, Result, ensure};
use colored::Colorize;
use oas_convert::{Converter, ConverterConfig, DocumentLoader, FsLoader, ParsedDocument, Version};

fn main() -> Result<()> {
    env_logger::init();
    let root = std::env::args()
        .nth(1)
        .map(PathBuf::from)
        .unwrap_or_else(|| Path::new(env!("CARGO_MANIFEST_DIR")).join("../fixtures"));

    let mut fixtures = Vec::new();
    for ext in ["json", "yaml", "yml"] {
        let pattern = format!("{}/**/*.{ext}", root.display());
        for entry in glob::glob(&pattern)? {
            fixtures.push(entry?);
        }
    }
    fixtures.sort();

    let converter = Converter::new(ConverterConfig::default());
    let mut failures = 0usize;
    for path in &fixtures {
        let parsed = match load(path) {
            Ok(parsed) => parsed,
            Err(error) => {
                eprintln!("{} {}: {error:#}", "FAIL".red().bold(), path.display());
                failures += 1;
                continue;
            }
        };
        for target in Version::all() {
            let label = format!("{} → {}", path.display(), target.as_str());
            match check(&converter, &parsed, *target) {
                Ok(summary) => println!("{} {label} {}", "ok".green(), summary.dimmed()),
                Err(error) => {
                    eprintln!("{} {label}: {error:#}", "FAIL".red().bold());
                    failures += 1;
                }
            }
        }
    }

    println!("{} fixture(s), {failures} failure(s)", fixtures.len());
    ensure!(failures == 0, "{failures} check(s) failed");
    Ok(())
}

fn load(path: &Path) -> Result<ParsedDocument> {
    let location = path.to_string_lossy();
    let loaded = FsLoader.load(&location, "dev-test-runner")?;
    ensure!(loaded.errors.is_empty(), "structural errors: {}", loaded.errors.join("; "));
    loaded.parsed.context("loader returned no document")
}

fn check(converter: &Converter, parsed: &ParsedDocument, target: Version) -> Result<String> {
    let before = parsed.document.to_value()?;
    let result = converter.convert_parsed(parsed, target.as_str())?;

    ensure!(parsed.document.to_value()? == before, "source document was mutated");
    ensure!(
        result.issues.len() == result.info_count + result.warning_count + result.critical_count,
        "issue counters disagree with the issue list"
    );
    ensure!(result.success == (result.critical_count == 0), "success flag disagrees with critical count");
    ensure!(result.target == target, "result reports target {}", result.target_version);
    match result.document.as_v2() {
        Some(_) => ensure!(target.is_legacy(), "legacy document produced for {target}"),
        None => ensure!(!target.is_legacy(), "modern document produced for {target}"),
    }
    // the output must survive a round trip through its own JSON form
    ParsedDocument::from_value(result.document.to_value()?).context("converted document does not re-parse")?;

    Ok(format!(
        "({} info, {} warning, {} critical)",
        result.info_count, result.warning_count, result.critical_count
    ))
}
