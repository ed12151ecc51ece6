//! OpenAPI/Swagger document conversion between 2.0, 3.0.x, 3.1.0 and 3.2.0.
//!
//! ```no_run
//! use oas_convert::{Converter, ConverterConfig};
//!
//! let result = Converter::new(ConverterConfig::default()).convert("petstore.yaml", "3.1.0")?;
//! for issue in &result.issues {
//!     eprintln!("{:?} {}: {}", issue.severity, issue.path, issue.message);
//! }
//! # Ok::<(), oas_convert::Error>(())
//! ```
pub mod cli;
pub mod convert;
pub mod converter;
pub mod error;
pub mod issue;
pub mod loader;
pub mod model;
pub mod overlay;
pub mod path_de;
pub mod refs;
pub mod version;

pub use converter::{Converter, ConverterConfig, convert, convert_parsed};
pub use error::{Error, Result};
pub use issue::{ConversionIssue, ConversionResult, DocumentStats, PositionLookup, Severity, SourcePosition};
pub use loader::{DocumentLoader, FsLoader, Loaded, ParsedDocument};
pub use model::Document;
pub use overlay::{JqOverlay, Overlay};
pub use version::{SourceFormat, Version};
