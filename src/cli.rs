//! Minimal CLI: load → convert → (json | yaml)
use std::path::{Path, PathBuf};

use anyhow::Context;
use clap::{Args, Parser, Subcommand, ValueEnum};
use colored::Colorize;
use rayon::prelude::*;

use crate::converter::{Converter, ConverterConfig};
use crate::error::Error;
use crate::issue::{ConversionIssue, ConversionResult, Severity};
use crate::loader::{DocumentLoader, FsLoader};
use crate::model::Document;
use crate::overlay::JqOverlay;

// ————————————————————————————————————————————————————————————————————————————
// TYPES
// ————————————————————————————————————————————————————————————————————————————

/// convert OpenAPI/Swagger documents between 2.0, 3.0.x, 3.1.0 and 3.2.0
#[derive(Parser, Debug)]
pub struct CommandLineInterface {
    #[command(subcommand)]
    cmd: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// convert each input to the target version
    Convert(ConvertOut),
    /// print the detected version, format and size of each input
    Inspect(InspectOut),
}

#[derive(Args, Debug, Clone)]
struct InputSettings {
    /// One or more inputs. May be literal paths or quoted glob patterns
    #[arg(long, short, num_args = 1.., required = true)]
    input: Vec<String>,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum OutputFormat {
    Json,
    Yaml,
}

#[derive(clap::Parser, Debug)]
struct ConvertOut {
    #[command(flatten)]
    input_settings: InputSettings,

    /// target version (2.0, 3.0.0 … 3.0.4, 3.1.0, 3.2.0; short forms like 3.1 accepted)
    #[arg(long)]
    to: String,

    /// output directory, one `<stem>.<ext>` file per input (stdout if omitted)
    #[arg(short, long)]
    out: Option<PathBuf>,

    #[arg(long, value_enum, default_value = "json")]
    format: OutputFormat,

    /// JSON or YAML file with `strictMode`, `includeInfo` and `userAgent`
    #[arg(long)]
    config: Option<PathBuf>,

    /// fail on any warning or critical issue
    #[arg(long)]
    strict: bool,

    /// omit info issues from the report
    #[arg(long)]
    no_info: bool,

    #[arg(long)]
    user_agent: Option<String>,

    /// jq filter applied to each parsed document before conversion
    #[arg(long)]
    pre_jq: Option<String>,

    /// jq filter applied to each converted document
    #[arg(long)]
    post_jq: Option<String>,

    /// debugging
    #[arg(long)]
    no_op: bool,
}

#[derive(clap::Parser, Debug)]
struct InspectOut {
    #[command(flatten)]
    input_settings: InputSettings,
}

// ————————————————————————————————————————————————————————————————————————————
// IMPLEMENTATION
// ————————————————————————————————————————————————————————————————————————————

impl InputSettings {
    fn resolve(&self) -> anyhow::Result<Vec<PathBuf>> {
        resolve_file_path_patterns(&self.input).map_err(|error| anyhow::anyhow!("failed to resolve input file paths: {error}"))
    }
}

impl ConvertOut {
    fn converter(&self) -> anyhow::Result<Converter> {
        let mut config = match self.config.as_ref() {
            Some(path) => ConverterConfig::from_file(path)?,
            None => ConverterConfig::default(),
        };
        config.strict_mode |= self.strict;
        if self.no_info {
            config.include_info = false;
        }
        if let Some(user_agent) = self.user_agent.as_ref() {
            config.user_agent = user_agent.clone();
        }

        let mut converter = Converter::new(config);
        if let Some(filter) = self.pre_jq.as_ref() {
            converter = converter.with_pre_overlay(JqOverlay::new(filter.as_str()));
        }
        if let Some(filter) = self.post_jq.as_ref() {
            converter = converter.with_post_overlay(JqOverlay::new(filter.as_str()));
        }
        Ok(converter)
    }

    fn run(&self) -> anyhow::Result<bool> {
        let converter = self.converter()?;
        let source_paths = self.input_settings.resolve()?;
        if let Some(out) = self.out.as_ref() {
            std::fs::create_dir_all(out).with_context(|| format!("creating {}", out.display()))?;
        }

        // convert in parallel, report in input order
        let outcomes: Vec<_> = source_paths
            .par_iter()
            .map(|path| (path, converter.convert(&path.to_string_lossy(), &self.to)))
            .collect();

        let mut all_ok = true;
        for (path, outcome) in outcomes {
            let label = path.display().to_string();
            match outcome {
                Ok(result) => {
                    print_report(&label, &result);
                    all_ok &= result.success;
                    if let Err(error) = self.emit(path, &result.document) {
                        eprintln!("{} {label}: {error:#}", "error".red().bold());
                        all_ok = false;
                    }
                }
                Err(Error::Strict(result)) => {
                    print_report(&label, &result);
                    eprintln!("{} {label}: rejected in strict mode", "error".red().bold());
                    all_ok = false;
                }
                Err(error) => {
                    eprintln!("{} {label}: {error}", "error".red().bold());
                    all_ok = false;
                }
            }
        }
        Ok(all_ok)
    }

    fn emit(&self, source_path: &Path, document: &Document) -> anyhow::Result<()> {
        let rendered = match self.format {
            OutputFormat::Json => serde_json::to_string_pretty(document)?,
            OutputFormat::Yaml => serde_yaml::to_string(document)?,
        };
        match self.out.as_ref() {
            Some(dir) => {
                let stem = source_path.file_stem().and_then(|s| s.to_str()).unwrap_or("document");
                let ext = match self.format {
                    OutputFormat::Json => "json",
                    OutputFormat::Yaml => "yaml",
                };
                let target = dir.join(format!("{stem}.{ext}"));
                std::fs::write(&target, rendered).with_context(|| format!("writing {}", target.display()))?;
            }
            None => println!("{rendered}"),
        }
        Ok(())
    }
}

impl InspectOut {
    fn run(&self) -> anyhow::Result<bool> {
        let mut all_ok = true;
        for path in self.input_settings.resolve()? {
            let label = path.display().to_string();
            let loaded = match FsLoader.load(&label, "") {
                Ok(loaded) => loaded,
                Err(error) => {
                    eprintln!("{} {label}: {error}", "error".red().bold());
                    all_ok = false;
                    continue;
                }
            };
            for error in &loaded.errors {
                eprintln!("{} {label}: {error}", "error".red().bold());
            }
            let Some(parsed) = loaded.parsed else {
                all_ok = false;
                continue;
            };
            println!("{} {} ({})", label.bold(), parsed.document.version_str(), parsed.format);
            if let Some(stats) = parsed.stats {
                println!(
                    "  paths: {}  operations: {}  schemas: {}  references: {}",
                    stats.paths, stats.operations, stats.schemas, stats.references
                );
            }
            if let Some(size) = parsed.size {
                println!("  size: {size} bytes");
            }
        }
        Ok(all_ok)
    }
}

impl CommandLineInterface {
    pub fn load() -> Self {
        Self::parse()
    }
    /// Returns the process exit code.
    pub fn run(&self) -> i32 {
        let outcome = match &self.cmd {
            Command::Convert(target) => {
                // debug path
                if target.no_op {
                    eprintln!("{self:#?}");
                    return 0;
                }
                target.run()
            }
            Command::Inspect(target) => target.run(),
        };
        match outcome {
            Ok(true) => 0,
            Ok(false) => 1,
            Err(error) => {
                eprintln!("{} {error:#}", "error".red().bold());
                1
            }
        }
    }
}

// ————————————————————————————————————————————————————————————————————————————
// INTERNAL HELPERS
// ————————————————————————————————————————————————————————————————————————————

fn print_report(label: &str, result: &ConversionResult) {
    eprintln!(
        "{} {} → {}: {} info, {} warning(s), {} critical",
        label.bold(),
        result.source_version,
        result.target_version,
        result.info_count,
        result.warning_count,
        result.critical_count,
    );
    for issue in &result.issues {
        eprintln!("  {}", format_issue(issue));
    }
}

fn format_issue(issue: &ConversionIssue) -> String {
    let severity = match issue.severity {
        Severity::Info => "info".blue(),
        Severity::Warning => "warning".yellow(),
        Severity::Critical => "critical".red().bold(),
    };
    let location = match (issue.line, issue.column) {
        (Some(line), Some(column)) => format!(" ({line}:{column})"),
        _ => String::new(),
    };
    let mut line = format!("{severity} {}{location}: {}", issue.path, issue.message);
    if let Some(context) = issue.context.as_ref() {
        line.push_str(&format!(" [{context}]"));
    }
    line
}

fn resolve_file_path_patterns<I>(patterns: I) -> Result<Vec<PathBuf>, Box<dyn std::error::Error>>
where
    I: IntoIterator,
    I::Item: AsRef<str>,
{
    fn has_glob_chars(s: &str) -> bool {
        // Minimal glob detection for the `glob` crate syntax.
        s.bytes().any(|b| matches!(b, b'*' | b'?' | b'[' | b'{'))
    }

    let mut out = Vec::<PathBuf>::new();

    for raw in patterns {
        let pattern = raw.as_ref();

        if has_glob_chars(pattern) {
            let mut matched_any = false;
            for entry in glob::glob(pattern)? {
                match entry {
                    Ok(p) => {
                        matched_any = true;
                        out.push(p);
                    }
                    Err(e) => return Err(Box::new(e)),
                }
            }
            if !matched_any {
                return Err(format!("glob pattern matched no files: {pattern}").into());
            }
        } else {
            out.push(PathBuf::from(pattern));
        }
    }

    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn cli_definition_is_consistent() {
        CommandLineInterface::command().debug_assert();
    }

    #[test]
    fn convert_flags_parse() {
        let cli = CommandLineInterface::try_parse_from([
            "oas-convert", "convert", "--to", "3.1", "-i", "a.yaml", "b.json", "--strict", "--format", "yaml",
        ])
        .unwrap();
        let Command::Convert(convert) = cli.cmd else { panic!("expected convert") };
        assert_eq!(convert.input_settings.input, vec!["a.yaml", "b.json"]);
        assert!(convert.strict);
        assert!(matches!(convert.format, OutputFormat::Yaml));
    }

    #[test]
    fn literal_paths_pass_through_and_empty_globs_fail() {
        let paths = resolve_file_path_patterns(["does/not/exist.json"]).unwrap();
        assert_eq!(paths, vec![PathBuf::from("does/not/exist.json")]);
        assert!(resolve_file_path_patterns(["/nonexistent-oas-dir/*.json"]).is_err());
    }

    #[test]
    fn issue_lines_carry_position_and_context() {
        colored::control::set_override(false);
        let issue = ConversionIssue {
            path: "securityDefinitions.oauth".into(),
            message: "only one flow survives".into(),
            severity: Severity::Warning,
            context: Some("dropped: password".into()),
            line: Some(3),
            column: Some(5),
            file: None,
        };
        assert_eq!(
            format_issue(&issue),
            "warning securityDefinitions.oauth (3:5): only one flow survives [dropped: password]"
        );
    }

    #[test]
    fn a_failed_write_does_not_stop_the_remaining_inputs() {
        let dir = std::env::temp_dir().join(format!("oas-convert-cli-{}", std::process::id()));
        let out = dir.join("out");
        // a directory where `a.json` should go makes that one write fail
        std::fs::create_dir_all(out.join("a.json")).unwrap();
        let doc = "openapi: 3.0.3\ninfo:\n  title: t\n  version: '1'\nservers:\n  - url: https://a.example.com\npaths: {}\n";
        for name in ["a.yaml", "b.yaml"] {
            std::fs::write(dir.join(name), doc).unwrap();
        }

        let cli = CommandLineInterface::try_parse_from([
            "oas-convert".to_string(),
            "convert".into(),
            "--to".into(),
            "3.1.0".into(),
            "--out".into(),
            out.display().to_string(),
            "-i".into(),
            dir.join("a.yaml").display().to_string(),
            dir.join("b.yaml").display().to_string(),
        ])
        .unwrap();
        let Command::Convert(convert) = &cli.cmd else { panic!("expected convert") };
        assert!(!convert.run().unwrap());
        let written = std::fs::read_to_string(out.join("b.json")).unwrap();
        assert!(written.contains("\"3.1.0\""));
    }
}
