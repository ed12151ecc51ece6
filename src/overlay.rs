//! Pre/post conversion hooks.
//!
//! An overlay rewrites a whole document. The converter runs one on the parsed
//! source before dispatch and one on the converted result afterwards; the
//! conversion itself never sees anything but a plain document.
use anyhow::{Context, Result, anyhow, bail};
use jaq_core::{Compiler, Ctx, RcIter, compile::Undefined, load};
use jaq_json::Val;
use serde_json::Value;

use crate::model::Document;

pub trait Overlay: Send + Sync {
    fn apply(&self, document: &Document) -> Result<Document>;
}

impl<F> Overlay for F
where
    F: Fn(&Document) -> Result<Document> + Send + Sync,
{
    fn apply(&self, document: &Document) -> Result<Document> {
        self(document)
    }
}

/// Runs a jq program over the document's JSON form. The program must produce
/// exactly one output, which is read back as a document.
#[derive(Debug, Clone)]
pub struct JqOverlay {
    filter: String,
}

impl JqOverlay {
    pub fn new(filter: impl Into<String>) -> Self {
        Self { filter: filter.into() }
    }

    pub fn filter(&self) -> &str {
        &self.filter
    }
}

impl Overlay for JqOverlay {
    fn apply(&self, document: &Document) -> Result<Document> {
        let input = document.to_value().context("serializing document for jq")?;
        let mut outputs = run_jaq(&self.filter, &input)?;
        if outputs.len() != 1 {
            bail!("jq filter `{}` produced {} outputs, expected 1", self.filter, outputs.len());
        }
        let output = outputs.remove(0);
        let (document, _) = Document::from_value(output).context("jq output is not an OpenAPI document")?;
        Ok(document)
    }
}

pub fn run_jaq(filter_src: &str, input: &Value) -> Result<Vec<Value>> {
    let loader = load::Loader::new(jaq_std::defs().chain(jaq_json::defs()));
    let arena = load::Arena::default();
    let program = load::File { code: filter_src, path: () };

    let modules = loader.load(&arena, program).map_err(format_parse_errors)?;

    let filter = Compiler::default()
        .with_funs(jaq_std::funs().chain(jaq_json::funs()))
        .compile(modules)
        .map_err(format_undefined_errors)?;

    let inputs = RcIter::new(core::iter::empty());
    let mut it = filter.run((Ctx::new([], &inputs), Val::from(input.clone())));

    let mut out = Vec::new();
    while let Some(item) = it.next() {
        let v = item.map_err(|e| anyhow!(format!("{e:?}")))?;
        // Val prints as JSON text
        let json: Value = serde_json::from_str(&v.to_string()).context("jq produced non-JSON output")?;
        out.push(json);
    }
    Ok(out)
}

fn format_parse_errors(errs: Vec<(load::File<&str, ()>, load::Error<&str>)>) -> anyhow::Error {
    let mut s = String::new();
    for (file, err) in errs {
        s.push_str(&format!("parse error: {err:?} in `{}`\n", file.code));
    }
    anyhow!(s)
}

fn format_undefined_errors(errs: Vec<(load::File<&str, ()>, Vec<(&str, Undefined)>)>) -> anyhow::Error {
    let mut s = String::new();
    for (file, list) in errs {
        for (name, undef) in list {
            s.push_str(&format!("undefined `{name}`: {undef:?} in `{}`\n", file.code));
        }
    }
    anyhow!(s)
}
