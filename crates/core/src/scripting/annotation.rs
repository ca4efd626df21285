//! Parser for the `# -- jojo --` annotation block embedded in scripts.
//!
//! Only comment lines are considered. The first sentinel line opens the
//! block and the second closes it; anything after the close is ignored.
//! Inside the block each line is a `key: value` directive. Unknown keys
//! and unrecognized values are logged and skipped, never fatal.

use std::collections::BTreeSet;
use std::os::unix::fs::PermissionsExt;
use std::path::Path;

use super::descriptor::{HttpMethod, OutputMode, Param, ScriptDescriptor};
use crate::error::ParseError;

/// Line that opens and closes the annotation block.
pub const SENTINEL: &str = "-- jojo --";

/// Marker every annotation line must start with.
const COMMENT_MARKER: char = '#';

// ---------------------------------------------------------------------------
// Directives
// ---------------------------------------------------------------------------

/// One recognized `key: value` line inside the block.
#[derive(Debug, Clone, PartialEq, Eq)]
enum Directive<'a> {
    Description(&'a str),
    HttpMethod(&'a str),
    Output(&'a str),
    Param(&'a str),
    FilteredParams(&'a str),
    Tags(&'a str),
    Lock(&'a str),
    Unknown { key: &'a str, value: &'a str },
}

impl<'a> Directive<'a> {
    /// Split on the first colon. Lines without a colon are not directives.
    fn parse(line: &'a str) -> Option<Self> {
        let (key, value) = line.split_once(':')?;
        let (key, value) = (key.trim(), value.trim());

        Some(match key {
            "description" => Self::Description(value),
            "http_method" => Self::HttpMethod(value),
            "output" => Self::Output(value),
            "param" => Self::Param(value),
            "filtered_params" => Self::FilteredParams(value),
            "tags" => Self::Tags(value),
            "lock" => Self::Lock(value),
            _ => Self::Unknown { key, value },
        })
    }
}

// ---------------------------------------------------------------------------
// Builder
// ---------------------------------------------------------------------------

/// Directive values collected from a block, starting from the defaults.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Annotations {
    pub description: Option<String>,
    pub params: Vec<Param>,
    pub filtered_params: BTreeSet<String>,
    pub tags: BTreeSet<String>,
    pub http_method: HttpMethod,
    pub output_mode: OutputMode,
    pub needs_lock: bool,
}

impl Annotations {
    fn apply(&mut self, directive: Directive<'_>, source: &Path) {
        match directive {
            Directive::Description(value) => self.description = Some(value.to_string()),
            Directive::HttpMethod(value) => match HttpMethod::parse(value) {
                Some(method) => self.http_method = method,
                None => tracing::warn!(
                    path = %source.display(),
                    value,
                    "Unrecognized http_method in jojo block, keeping {}",
                    self.http_method
                ),
            },
            Directive::Output(value) => match OutputMode::parse(value) {
                Some(mode) => self.output_mode = mode,
                None => tracing::warn!(
                    path = %source.display(),
                    value,
                    "Unrecognized output type in jojo block, keeping {}",
                    self.output_mode
                ),
            },
            Directive::Param(value) => match parse_param(value) {
                Some(param) => self.params.push(param),
                None => tracing::warn!(
                    path = %source.display(),
                    "Ignoring param directive without a name"
                ),
            },
            Directive::FilteredParams(value) => self.filtered_params.extend(split_list(value)),
            Directive::Tags(value) => self.tags.extend(split_list(value)),
            Directive::Lock(value) => self.needs_lock = value == "True",
            Directive::Unknown { key, value } => tracing::warn!(
                path = %source.display(),
                key,
                value,
                "Unrecognized line in jojo block"
            ),
        }
    }

    /// Move the collected values into a descriptor.
    pub fn into_descriptor(self, name: &str, filename: &Path) -> ScriptDescriptor {
        let mut descriptor = ScriptDescriptor::new(name, filename);
        descriptor.description = self.description;
        descriptor.params = self.params;
        descriptor.filtered_params = self.filtered_params;
        descriptor.tags = self.tags;
        descriptor.http_method = self.http_method;
        descriptor.output_mode = self.output_mode;
        descriptor.needs_lock = self.needs_lock;
        descriptor
    }
}

/// `name - description` or just `name`.
fn parse_param(value: &str) -> Option<Param> {
    let (name, description) = match value.split_once('-') {
        Some((name, desc)) => {
            let desc = desc.trim();
            (name.trim(), (!desc.is_empty()).then(|| desc.to_string()))
        }
        None => (value.trim(), None),
    };

    if name.is_empty() {
        return None;
    }

    Some(Param {
        name: name.to_string(),
        description,
    })
}

fn split_list(value: &str) -> impl Iterator<Item = String> + '_ {
    value
        .split(',')
        .map(str::trim)
        .filter(|item| !item.is_empty())
        .map(str::to_string)
}

// ---------------------------------------------------------------------------
// Entry points
// ---------------------------------------------------------------------------

/// Extract the annotations from script text.
///
/// A file with no block at all yields the defaults. A block that is
/// opened but never closed is an error.
pub fn parse_annotations(contents: &str, source: &Path) -> Result<Annotations, ParseError> {
    let mut annotations = Annotations::default();
    let mut in_block = false;

    for line in contents.lines() {
        let Some(comment) = line.strip_prefix(COMMENT_MARKER) else {
            continue;
        };
        let text = comment.trim_start_matches(COMMENT_MARKER).trim();

        if text.starts_with(SENTINEL) {
            if in_block {
                return Ok(annotations);
            }
            in_block = true;
            continue;
        }

        if !in_block {
            continue;
        }

        if let Some(directive) = Directive::parse(text) {
            annotations.apply(directive, source);
        }
    }

    if in_block {
        return Err(ParseError::UnterminatedBlock {
            path: source.to_path_buf(),
        });
    }

    Ok(annotations)
}

/// Whether any execute bit is set on the file.
pub fn is_executable(path: &Path) -> Result<bool, ParseError> {
    let metadata = std::fs::metadata(path).map_err(|source| ParseError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    Ok(metadata.permissions().mode() & 0o111 != 0)
}

/// Parse the script at `path` into a descriptor registered under `name`.
pub fn parse_script(name: &str, path: &Path) -> Result<ScriptDescriptor, ParseError> {
    if !is_executable(path)? {
        return Err(ParseError::NotExecutable {
            path: path.to_path_buf(),
        });
    }

    let bytes = std::fs::read(path).map_err(|source| ParseError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    let contents = String::from_utf8_lossy(&bytes);

    Ok(parse_annotations(&contents, path)?.into_descriptor(name, path))
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
