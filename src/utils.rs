//! # Utility Functions Module
//!
//! Small helpers shared by the optimizer command builders and the reporting code.

use std::path::Path;

/// Converts any iterable of string-like items into owned argv entries.
///
/// # Example
/// ```rust
/// use thumbnail_optimizer::utils::to_string_vec;
///
/// let args = to_string_vec(["-O3", "anim.gif", "-o", "anim.tmp.gif"]);
/// assert_eq!(args.len(), 4);
/// ```
pub fn to_string_vec<T, I>(items: I) -> Vec<String>
where
    T: ToString,
    I: IntoIterator<Item = T>,
{
    items.into_iter().map(|item| item.to_string()).collect()
}

/// Builds an argv vector from mixed expressions.
///
/// # Example
/// ```rust
/// use thumbnail_optimizer::args;
///
/// let quality = 85;
/// let argv = args!["--skip-if-larger", format!("--quality={}", quality)];
/// assert_eq!(argv, vec!["--skip-if-larger", "--quality=85"]);
/// ```
#[macro_export]
macro_rules! args {
    [$($item:expr),* $(,)?] => {
        $crate::utils::to_string_vec([$($item.to_string()),*])
    };
}

/// Last path component for log lines, falling back to the full path.
pub fn display_name(path: &Path) -> String {
    path.file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}
