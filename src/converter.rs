//! Public entry points.
//!
//! A [`Converter`] holds configuration and collaborators only; every call
//! writes into its own result, so one instance can serve many threads.
use std::fmt;
use std::path::Path;
use std::sync::Arc;

use anyhow::Context;
use serde::{Deserialize, Serialize};

use crate::convert::convert_document;
use crate::error::{Error, Result};
use crate::issue::{ConversionResult, Issues, PositionLookup, Severity};
use crate::loader::{DocumentLoader, FsLoader, ParsedDocument, sniff_format};
use crate::overlay::Overlay;
use crate::version::{SourceFormat, Version};

// ————————————————————————————————————————————————————————————————————————————
// CONFIG
// ————————————————————————————————————————————————————————————————————————————

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ConverterConfig {
    /// Fail the call when any warning or critical issue was found.
    pub strict_mode: bool,
    /// Keep info issues in the returned list. They are counted either way.
    pub include_info: bool,
    /// Handed to the loader.
    pub user_agent: String,
}

impl Default for ConverterConfig {
    fn default() -> Self {
        Self {
            strict_mode: false,
            include_info: true,
            user_agent: format!("oas-convert/{}", env!("CARGO_PKG_VERSION")),
        }
    }
}

impl ConverterConfig {
    /// Read a JSON or YAML config file. Missing keys take their defaults.
    pub fn from_file(path: &Path) -> anyhow::Result<Self> {
        let bytes = std::fs::read(path).with_context(|| format!("reading config {}", path.display()))?;
        let config = match sniff_format(path, &bytes) {
            SourceFormat::Json => serde_json::from_slice(&bytes)?,
            SourceFormat::Yaml => serde_yaml::from_slice(&bytes)?,
        };
        Ok(config)
    }
}

// ————————————————————————————————————————————————————————————————————————————
// CONVERTER
// ————————————————————————————————————————————————————————————————————————————

#[derive(Clone)]
pub struct Converter {
    config: ConverterConfig,
    loader: Arc<dyn DocumentLoader>,
    positions: Option<Arc<dyn PositionLookup>>,
    pre_overlay: Option<Arc<dyn Overlay>>,
    post_overlay: Option<Arc<dyn Overlay>>,
}

impl Converter {
    pub fn new(config: ConverterConfig) -> Self {
        Self {
            config,
            loader: Arc::new(FsLoader),
            positions: None,
            pre_overlay: None,
            post_overlay: None,
        }
    }

    pub fn with_loader(mut self, loader: impl DocumentLoader + 'static) -> Self {
        self.loader = Arc::new(loader);
        self
    }

    /// Takes precedence over a lookup attached to the parsed document.
    pub fn with_positions(mut self, positions: Arc<dyn PositionLookup>) -> Self {
        self.positions = Some(positions);
        self
    }

    pub fn with_pre_overlay(mut self, overlay: impl Overlay + 'static) -> Self {
        self.pre_overlay = Some(Arc::new(overlay));
        self
    }

    pub fn with_post_overlay(mut self, overlay: impl Overlay + 'static) -> Self {
        self.post_overlay = Some(Arc::new(overlay));
        self
    }

    pub fn config(&self) -> &ConverterConfig {
        &self.config
    }

    /// Load `location` and convert it. Any structural error reported by the
    /// loader aborts the call.
    pub fn convert(&self, location: &str, target: &str) -> Result<ConversionResult> {
        let loaded = self.loader.load(location, &self.config.user_agent)?;
        if !loaded.errors.is_empty() {
            return Err(Error::Parse { location: location.to_string(), errors: loaded.errors });
        }
        let parsed = loaded
            .parsed
            .ok_or_else(|| Error::UnsupportedSource(format!("loader produced no document for `{location}`")))?;
        self.convert_parsed(&parsed, target)
    }

    pub fn convert_parsed(&self, parsed: &ParsedDocument, target: &str) -> Result<ConversionResult> {
        let target: Version = target.parse()?;

        let (source, source_version) = match &self.pre_overlay {
            Some(overlay) => {
                let document = overlay.apply(&parsed.document).map_err(Error::Overlay)?;
                let version = document.version()?;
                (Arc::new(document), version)
            }
            None => (Arc::clone(&parsed.document), parsed.version),
        };

        let positions = self.positions.as_deref().or(parsed.positions.as_deref());
        let mut issues = Issues::with_positions(positions);
        let mut document = convert_document(&source, source_version, target, &mut issues)?;

        if let Some(overlay) = &self.post_overlay {
            document = Arc::new(overlay.apply(&document).map_err(Error::Overlay)?);
        }

        let mut result = ConversionResult {
            document,
            source_version: source.version_str().to_string(),
            target_version: target.as_str().to_string(),
            source: source_version,
            target,
            source_format: parsed.format,
            issues: issues.into_vec(),
            info_count: 0,
            warning_count: 0,
            critical_count: 0,
            success: false,
            load_time: parsed.load_time,
            size: parsed.size,
            stats: parsed.stats,
        };
        result.recount();
        if !self.config.include_info {
            result.issues.retain(|issue| issue.severity != Severity::Info);
        }

        log::info!(
            "{} → {}: {} info, {} warning(s), {} critical",
            result.source_version,
            result.target_version,
            result.info_count,
            result.warning_count,
            result.critical_count,
        );

        if self.config.strict_mode && result.is_lossy() {
            log::warn!("strict mode: rejecting lossy conversion to {}", result.target_version);
            return Err(Error::Strict(Box::new(result)));
        }
        Ok(result)
    }
}

impl Default for Converter {
    fn default() -> Self {
        Self::new(ConverterConfig::default())
    }
}

impl fmt::Debug for Converter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Converter")
            .field("config", &self.config)
            .field("positions", &self.positions.is_some())
            .field("pre_overlay", &self.pre_overlay.is_some())
            .field("post_overlay", &self.post_overlay.is_some())
            .finish_non_exhaustive()
    }
}

/// Load and convert with the filesystem loader.
pub fn convert(location: &str, target: &str, config: &ConverterConfig) -> Result<ConversionResult> {
    Converter::new(config.clone()).convert(location, target)
}

pub fn convert_parsed(parsed: &ParsedDocument, target: &str, config: &ConverterConfig) -> Result<ConversionResult> {
    Converter::new(config.clone()).convert_parsed(parsed, target)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::issue::SourcePosition;
    use crate::loader::Loaded;
    use crate::model::Document;
    use indexmap::IndexMap;
    use serde_json::{Value, json};

    fn parsed(v: Value) -> ParsedDocument {
        ParsedDocument::from_value(v).unwrap()
    }

    fn lossy_v3() -> ParsedDocument {
        parsed(json!({
            "openapi": "3.1.0",
            "info": { "title": "t", "version": "1" },
            "paths": {},
            "webhooks": { "ping": {} }
        }))
    }

    fn assert_counts_match(result: &ConversionResult) {
        assert_eq!(
            result.issues.len(),
            result.info_count + result.warning_count + result.critical_count
        );
        assert_eq!(result.success, result.critical_count == 0);
    }

    #[test]
    fn invalid_target_version_is_a_hard_failure() {
        let err = convert_parsed(&lossy_v3(), "4.0", &ConverterConfig::default()).unwrap_err();
        assert!(matches!(err, Error::InvalidVersion(ref v) if v == "4.0"));
    }

    #[test]
    fn counters_and_success_follow_the_issue_list() {
        let result = convert_parsed(&lossy_v3(), "2.0", &ConverterConfig::default()).unwrap();
        assert_counts_match(&result);
        assert!(!result.success);
        assert_eq!(result.critical_count, 1);
        assert_eq!(result.info_count, 1);
        assert_eq!(result.source_version, "3.1.0");
        assert_eq!(result.target_version, "2.0");
        assert!(result.stats.is_some());
    }

    #[test]
    fn strict_mode_fails_but_keeps_the_result() {
        let config = ConverterConfig { strict_mode: true, ..ConverterConfig::default() };
        let err = convert_parsed(&lossy_v3(), "2.0", &config).unwrap_err();
        let result = err.result().expect("strict errors carry the result");
        assert_eq!(result.critical_count, 1);
        assert!(result.document.as_v2().is_some());
    }

    #[test]
    fn strict_mode_accepts_info_only_results() {
        let config = ConverterConfig { strict_mode: true, ..ConverterConfig::default() };
        let result = convert_parsed(&lossy_v3(), "3.1.0", &config).unwrap();
        assert_eq!(result.info_count, 1);
    }

    #[test]
    fn excluding_info_strips_after_counting() {
        let config = ConverterConfig { include_info: false, ..ConverterConfig::default() };
        let result = convert_parsed(&lossy_v3(), "2.0", &config).unwrap();
        assert_eq!(result.info_count, 1);
        assert!(result.issues.iter().all(|i| i.severity != Severity::Info));
        assert_eq!(result.issues.len(), 1);
    }

    #[test]
    fn same_version_shares_the_parsed_allocation() {
        let source = lossy_v3();
        let result = convert_parsed(&source, "3.1.0", &ConverterConfig::default()).unwrap();
        assert!(Arc::ptr_eq(&source.document, &result.document));
        assert_eq!(result.issues.len(), 1);
    }

    #[test]
    fn issues_pick_up_source_positions() {
        let mut lookup = IndexMap::new();
        lookup.insert(
            "$.webhooks".to_string(),
            SourcePosition { line: 7, column: 1, file: Some("api.yaml".into()) },
        );
        let converter = Converter::default().with_positions(Arc::new(lookup));
        let result = converter.convert_parsed(&lossy_v3(), "2.0").unwrap();
        let webhooks = result.issues.iter().find(|i| i.path == "webhooks").unwrap();
        assert_eq!(webhooks.line, Some(7));
        assert_eq!(webhooks.file.as_deref(), Some("api.yaml"));
    }

    #[test]
    fn overlays_run_before_and_after() {
        let converter = Converter::default()
            .with_pre_overlay(|d: &Document| -> anyhow::Result<Document> {
                let mut d = d.clone();
                if let Document::V3(api) = &mut d {
                    api.webhooks.clear();
                }
                Ok(d)
            })
            .with_post_overlay(crate::overlay::JqOverlay::new(r#".info.title = "after""#));
        let result = converter.convert_parsed(&lossy_v3(), "2.0").unwrap();
        assert_eq!(result.critical_count, 0);
        assert_eq!(result.document.as_v2().unwrap().info.title, "after");
    }

    struct BrokenLoader;

    impl DocumentLoader for BrokenLoader {
        fn load(&self, _location: &str, _user_agent: &str) -> Result<Loaded> {
            Ok(Loaded { parsed: None, errors: vec!["at paths → invalid type".into()] })
        }
    }

    #[test]
    fn loader_errors_abort_before_conversion() {
        let err = Converter::default().with_loader(BrokenLoader).convert("api.json", "3.0.3").unwrap_err();
        assert!(matches!(err, Error::Parse { ref errors, .. } if errors.len() == 1));
    }

    #[test]
    fn one_converter_serves_many_threads() {
        let converter = &Converter::default();
        let source = &lossy_v3();
        let targets = ["2.0", "3.0.3", "3.1.0", "3.2.0"];
        std::thread::scope(|scope| {
            let handles: Vec<_> = targets
                .into_iter()
                .map(|t| scope.spawn(move || converter.convert_parsed(source, t).unwrap()))
                .collect();
            for handle in handles {
                assert_counts_match(&handle.join().unwrap());
            }
        });
        assert!(source.document.as_v3().unwrap().webhooks.contains_key("ping"));
    }

    #[test]
    fn config_reads_partial_yaml() {
        let dir = std::env::temp_dir().join(format!("oas-convert-config-{}", std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join("config.yaml");
        std::fs::write(&path, "strictMode: true\n").unwrap();
        let config = ConverterConfig::from_file(&path).unwrap();
        assert!(config.strict_mode);
        assert!(config.include_info);
        assert!(config.user_agent.starts_with("oas-convert/"));
    }
}
