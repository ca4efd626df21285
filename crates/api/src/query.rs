//! Query parameter types for the script endpoints.

use serde::Deserialize;

use jojo_core::scripting::TagFilter;

/// `GET /scripts` parameters (`?tags=a,b&not_tags=c&any_tags=d&names=true`).
#[derive(Debug, Default, Deserialize)]
pub struct ScriptListParams {
    pub tags: Option<String>,
    pub not_tags: Option<String>,
    pub any_tags: Option<String>,
    /// Return only the names instead of full metadata.
    #[serde(default)]
    pub names: bool,
}

impl ScriptListParams {
    pub fn tag_filter(&self) -> TagFilter {
        TagFilter {
            tags: split_tags(self.tags.as_deref()),
            not_tags: split_tags(self.not_tags.as_deref()),
            any_tags: split_tags(self.any_tags.as_deref()),
        }
    }
}

fn split_tags<C: FromIterator<String>>(value: Option<&str>) -> C {
    value
        .unwrap_or_default()
        .split(',')
        .map(str::trim)
        .filter(|tag| !tag.is_empty())
        .map(str::to_string)
        .collect()
}
