//! Script name derivation.
//!
//! A script's registry key is its path relative to the scan root with the
//! final extension removed and every run of non-word characters collapsed
//! into a single underscore.

use std::path::Path;
use std::sync::LazyLock;

use regex::Regex;

static NON_WORD_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\W+").expect("valid regex"));

/// Derive the registry name for `path`, found while scanning `root`.
///
/// Returns `None` when `path` is not under `root` or nothing usable is
/// left after stripping.
///
/// # Examples
///
/// ```
/// use std::path::Path;
/// use jojo_core::scripting::naming::derive_script_name;
///
/// let root = Path::new("/srv/jojo");
/// assert_eq!(derive_script_name(root, Path::new("/srv/jojo/deploy.sh")).as_deref(), Some("deploy"));
/// assert_eq!(derive_script_name(root, Path::new("/srv/jojo/db/backup-now.sh")).as_deref(), Some("db_backup_now"));
/// ```
pub fn derive_script_name(root: &Path, path: &Path) -> Option<String> {
    let relative = path.strip_prefix(root).ok()?;
    let relative = relative.to_string_lossy();

    let name = NON_WORD_RE.replace_all(strip_extension(&relative), "_");
    (!name.is_empty()).then(|| name.into_owned())
}

/// Drop the last `.ext` of the final path component, if any.
///
/// A leading dot (hidden file) is not treated as an extension separator.
fn strip_extension(relative: &str) -> &str {
    let file_start = relative.rfind('/').map_or(0, |idx| idx + 1);
    match relative[file_start..].rfind('.') {
        Some(dot) if dot > 0 => &relative[..file_start + dot],
        _ => relative,
    }
}
