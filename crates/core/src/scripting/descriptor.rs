//! Parsed script metadata and its serializable view.
//!
//! A [`ScriptDescriptor`] is produced by the annotation parser once per
//! executable file and is read-only afterwards. The only mutable state it
//! carries is the per-script execution lock, shared between clones.

use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;

use super::annotation::SENTINEL;

/// Replacement shown instead of a filtered parameter value.
pub const FILTERED_MARKER: &str = "FILTERED";

// ---------------------------------------------------------------------------
// Directive value types
// ---------------------------------------------------------------------------

/// HTTP verb a script advertises. Advisory only; nothing in the core
/// enforces it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HttpMethod {
    Get,
    #[default]
    Post,
    Put,
    Delete,
}

impl HttpMethod {
    /// Case-insensitive parse; `None` for anything outside get/post/put/delete.
    pub fn parse(value: &str) -> Option<Self> {
        match value.to_ascii_lowercase().as_str() {
            "get" => Some(Self::Get),
            "post" => Some(Self::Post),
            "put" => Some(Self::Put),
            "delete" => Some(Self::Delete),
            _ => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Get => "get",
            Self::Post => "post",
            Self::Put => "put",
            Self::Delete => "delete",
        }
    }
}

impl fmt::Display for HttpMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// How stdout and stderr are captured.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputMode {
    /// stdout and stderr on independent channels.
    #[default]
    Split,
    /// stderr redirected into stdout before capture.
    Combined,
}

impl OutputMode {
    pub fn parse(value: &str) -> Option<Self> {
        match value.to_ascii_lowercase().as_str() {
            "split" => Some(Self::Split),
            "combined" => Some(Self::Combined),
            _ => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Split => "split",
            Self::Combined => "combined",
        }
    }
}

impl fmt::Display for OutputMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A declared invocation parameter.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Param {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

impl Param {
    /// Environment variable the value is exposed under.
    pub fn env_name(&self) -> String {
        self.name.to_uppercase()
    }
}

// ---------------------------------------------------------------------------
// Descriptor
// ---------------------------------------------------------------------------

/// One discovered executable script.
#[derive(Debug, Clone)]
pub struct ScriptDescriptor {
    /// Absolute path; also the executable that gets spawned.
    pub filename: PathBuf,
    /// Registry key derived from the path relative to the scan root.
    pub name: String,
    pub description: Option<String>,
    /// Declaration order from the annotation block.
    pub params: Vec<Param>,
    /// Parameter names whose values are redacted in logs.
    pub filtered_params: BTreeSet<String>,
    pub tags: BTreeSet<String>,
    pub http_method: HttpMethod,
    pub output_mode: OutputMode,
    pub needs_lock: bool,
    lock: Arc<Mutex<()>>,
}

impl ScriptDescriptor {
    /// Descriptor with every directive at its default.
    pub fn new(name: impl Into<String>, filename: impl Into<PathBuf>) -> Self {
        Self {
            filename: filename.into(),
            name: name.into(),
            description: None,
            params: Vec::new(),
            filtered_params: BTreeSet::new(),
            tags: BTreeSet::new(),
            http_method: HttpMethod::default(),
            output_mode: OutputMode::default(),
            needs_lock: false,
            lock: Arc::new(Mutex::new(())),
        }
    }

    /// The exclusive lock serializing invocations when `needs_lock` is set.
    pub fn execution_lock(&self) -> &Mutex<()> {
        &self.lock
    }

    /// Serializable view exposed to callers.
    ///
    /// Filtered parameter names are listed as-is; only values are ever
    /// redacted.
    pub fn metadata(&self) -> ScriptMetadata {
        ScriptMetadata {
            filename: self.filename.to_string_lossy().into_owned(),
            http_method: self.http_method,
            name: self.name.clone(),
            description: self.description.clone(),
            params: self.params.clone(),
            filtered_params: self.filtered_params.clone(),
            tags: self.tags.clone(),
            output_mode: self.output_mode,
            needs_lock: self.needs_lock,
        }
    }

    /// Copy of the caller's parameters suitable for logging.
    pub fn redact_params(&self, params: &HashMap<String, String>) -> BTreeMap<String, String> {
        params
            .iter()
            .map(|(key, value)| {
                let shown = if self.filtered_params.contains(key) {
                    FILTERED_MARKER.to_string()
                } else {
                    value.clone()
                };
                (key.clone(), shown)
            })
            .collect()
    }

    /// Environment handed to the child: one variable per declared
    /// parameter, missing values defaulting to the empty string.
    ///
    /// Values are passed verbatim. Unknown caller keys are dropped.
    pub fn build_env(&self, params: &HashMap<String, String>) -> Vec<(String, String)> {
        self.params
            .iter()
            .map(|param| {
                let value = params.get(&param.name).cloned().unwrap_or_default();
                (param.env_name(), value)
            })
            .collect()
    }

    /// Render the descriptor's directives as an annotation block.
    pub fn to_annotation_block(&self) -> String {
        let mut lines = vec![format!("# {SENTINEL}")];

        if let Some(description) = &self.description {
            lines.push(format!("# description: {description}"));
        }
        for param in &self.params {
            match &param.description {
                Some(desc) => lines.push(format!("# param: {} - {desc}", param.name)),
                None => lines.push(format!("# param: {}", param.name)),
            }
        }
        if !self.filtered_params.is_empty() {
            lines.push(format!("# filtered_params: {}", join(&self.filtered_params)));
        }
        if !self.tags.is_empty() {
            lines.push(format!("# tags: {}", join(&self.tags)));
        }
        lines.push(format!("# http_method: {}", self.http_method));
        lines.push(format!("# output: {}", self.output_mode));
        lines.push(format!(
            "# lock: {}",
            if self.needs_lock { "True" } else { "False" }
        ));
        lines.push(format!("# {SENTINEL}"));

        let mut block = lines.join("\n");
        block.push('\n');
        block
    }
}

fn join(set: &BTreeSet<String>) -> String {
    set.iter().map(String::as_str).collect::<Vec<_>>().join(", ")
}

/// Descriptor fields as exposed to the adapter layer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScriptMetadata {
    pub filename: String,
    pub http_method: HttpMethod,
    pub name: String,
    pub description: Option<String>,
    pub params: Vec<Param>,
    pub filtered_params: BTreeSet<String>,
    pub tags: BTreeSet<String>,
    pub output_mode: OutputMode,
    pub needs_lock: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn descriptor_with_params() -> ScriptDescriptor {
        let mut descriptor = ScriptDescriptor::new("deploy", "/srv/jojo/deploy.sh");
        descriptor.params = vec![
            Param {
                name: "user".to_string(),
                description: Some("login name".to_string()),
            },
            Param {
                name: "password".to_string(),
                description: None,
            },
        ];
        descriptor.filtered_params.insert("password".to_string());
        descriptor
    }

    #[test]
    fn http_method_parse_is_case_insensitive() {
        assert_eq!(HttpMethod::parse("GET"), Some(HttpMethod::Get));
        assert_eq!(HttpMethod::parse("Delete"), Some(HttpMethod::Delete));
        assert_eq!(HttpMethod::parse("patch"), None);
    }

    #[test]
    fn output_mode_parse() {
        assert_eq!(OutputMode::parse("Combined"), Some(OutputMode::Combined));
        assert_eq!(OutputMode::parse("split"), Some(OutputMode::Split));
        assert_eq!(OutputMode::parse("interleaved"), None);
    }

    #[test]
    fn build_env_uppercases_and_defaults_missing() {
        let descriptor = descriptor_with_params();
        let params = HashMap::from([
            ("user".to_string(), "alice".to_string()),
            ("unrelated".to_string(), "ignored".to_string()),
        ]);

        let env = descriptor.build_env(&params);
        assert_eq!(
            env,
            vec![
                ("USER".to_string(), "alice".to_string()),
                ("PASSWORD".to_string(), String::new()),
            ]
        );
    }

    #[test]
    fn build_env_passes_values_verbatim() {
        let descriptor = descriptor_with_params();
        let params = HashMap::from([("user".to_string(), "a b'c\"$(d)".to_string())]);
        let env = descriptor.build_env(&params);
        assert_eq!(env[0].1, "a b'c\"$(d)");
    }

    #[test]
    fn redact_params_hides_filtered_values_only() {
        let descriptor = descriptor_with_params();
        let params = HashMap::from([
            ("user".to_string(), "alice".to_string()),
            ("password".to_string(), "secretvalue".to_string()),
        ]);

        let redacted = descriptor.redact_params(&params);
        assert_eq!(redacted["user"], "alice");
        assert_eq!(redacted["password"], FILTERED_MARKER);
        // The caller's map is untouched.
        assert_eq!(params["password"], "secretvalue");
    }

    #[test]
    fn metadata_lists_filtered_names() {
        let metadata = descriptor_with_params().metadata();
        assert!(metadata.filtered_params.contains("password"));
        assert_eq!(metadata.http_method, HttpMethod::Post);
        assert_eq!(metadata.output_mode, OutputMode::Split);
        assert!(!metadata.needs_lock);
    }

    #[test]
    fn metadata_serializes_lowercase_enums() {
        let json = serde_json::to_value(descriptor_with_params().metadata()).expect("serialize");
        assert_eq!(json["http_method"], "post");
        assert_eq!(json["output_mode"], "split");
        assert_eq!(json["params"][0]["description"], "login name");
        assert!(json["params"][1].get("description").is_none());
    }

    #[test]
    fn clones_share_the_execution_lock() {
        let descriptor = ScriptDescriptor::new("a", "/tmp/a");
        let clone = descriptor.clone();
        let _guard = descriptor.execution_lock().try_lock().expect("first lock");
        assert!(clone.execution_lock().try_lock().is_err());
    }
}
