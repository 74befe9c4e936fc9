//! Normalized path handling for cross-platform compatibility

use std::path::{Path, PathBuf};

/// A path normalized to use forward slashes internally.
///
/// Backslashes become forward slashes, repeated separators collapse, and
/// `.`/`..` components are resolved lexically. The filesystem is never
/// consulted, so symlinks inside the path are left alone.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NormalizedPath {
    /// Internal representation always uses forward slashes
    inner: String,
}

impl NormalizedPath {
    /// Create a new NormalizedPath from any path-like input.
    pub fn new(path: impl AsRef<Path>) -> Self {
        let path_str = path.as_ref().to_string_lossy();
        Self {
            inner: clean(&path_str.replace('\\', "/")),
        }
    }

    /// Get the internal normalized string representation.
    pub fn as_str(&self) -> &str {
        &self.inner
    }

    /// Convert to a platform-native PathBuf for I/O operations.
    pub fn to_native(&self) -> PathBuf {
        PathBuf::from(&self.inner)
    }

    /// Join this path with a segment.
    pub fn join(&self, segment: &str) -> Self {
        let segment_normalized = segment.replace('\\', "/");
        let joined = if self.inner.is_empty() {
            segment_normalized
        } else if self.inner.ends_with('/') {
            format!("{}{}", self.inner, segment_normalized)
        } else {
            format!("{}/{}", self.inner, segment_normalized)
        };
        Self {
            inner: clean(&joined),
        }
    }

    /// Get the parent directory.
    pub fn parent(&self) -> Option<Self> {
        let trimmed = self.inner.trim_end_matches('/');
        match trimmed.rfind('/') {
            Some(idx) if idx > 0 => Some(Self {
                inner: trimmed[..idx].to_string(),
            }),
            Some(0) if trimmed.len() > 1 => Some(Self {
                inner: "/".to_string(),
            }),
            _ => None,
        }
    }

    /// Get the file name component.
    pub fn file_name(&self) -> Option<&str> {
        let trimmed = self.inner.trim_end_matches('/');
        trimmed.rsplit('/').next().filter(|name| !name.is_empty())
    }

    /// Get the extension if present.
    pub fn extension(&self) -> Option<&str> {
        self.file_name().and_then(|name| {
            let idx = name.rfind('.')?;
            if idx == 0 { None } else { Some(&name[idx + 1..]) }
        })
    }

    /// Whether `self` lies at or below `base`, compared component-wise.
    pub fn starts_with(&self, base: &NormalizedPath) -> bool {
        if base.inner.is_empty() || base.inner == "." {
            return !self.is_absolute();
        }
        if base.inner == "/" {
            return self.is_absolute();
        }
        self.inner == base.inner
            || self
                .inner
                .strip_prefix(&base.inner)
                .is_some_and(|rest| rest.starts_with('/'))
    }

    /// Whether the path is rooted.
    pub fn is_absolute(&self) -> bool {
        self.inner.starts_with('/') || self.to_native().is_absolute()
    }

    /// Check if this is a file (follows symlinks).
    pub fn is_file(&self) -> bool {
        self.to_native().is_file()
    }
}

/// Lexically resolve `.`/`..` and collapse separators.
///
/// A leading `//` (UNC-style network path) is preserved; three or more
/// leading slashes collapse to a single root.
fn clean(path: &str) -> String {
    if path.is_empty() {
        return String::new();
    }

    let (prefix, rest) = if path.starts_with("//") && !path.starts_with("///") {
        ("//", &path[2..])
    } else if path.starts_with('/') {
        ("/", path.trim_start_matches('/'))
    } else {
        ("", path)
    };

    let mut parts: Vec<&str> = Vec::new();
    for component in rest.split('/') {
        match component {
            "" | "." => {}
            ".." => match parts.last() {
                Some(last) if *last != ".." => {
                    parts.pop();
                }
                // `..` above the root stays at the root
                _ if !prefix.is_empty() => {}
                _ => parts.push(".."),
            },
            other => parts.push(other),
        }
    }

    let body = parts.join("/");
    match (prefix, body.is_empty()) {
        ("", true) => ".".to_string(),
        (p, true) => p.to_string(),
        (p, false) => format!("{p}{body}"),
    }
}

/// Validate that a user-supplied identifier is safe to use as a single path
/// component (item names, backup labels).
///
/// Returns a human-readable message naming `label` on failure.
pub fn validate_path_identifier(value: &str, label: &str) -> std::result::Result<(), String> {
    if value.trim().is_empty() {
        return Err(format!("{label} must not be empty"));
    }
    if value == "." || value == ".." {
        return Err(format!("{label} '{value}' is not a valid name"));
    }
    if value.contains('/') || value.contains('\\') {
        return Err(format!("{label} '{value}' must not contain path separators"));
    }
    if value.contains('\0') {
        return Err(format!("{label} must not contain NUL bytes"));
    }
    if value.starts_with('.') {
        return Err(format!("{label} '{value}' must not start with '.'"));
    }
    Ok(())
}

impl AsRef<Path> for NormalizedPath {
    fn as_ref(&self) -> &Path {
        Path::new(&self.inner)
    }
}

impl std::fmt::Display for NormalizedPath {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.inner)
    }
}

impl From<&str> for NormalizedPath {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}

impl From<PathBuf> for NormalizedPath {
    fn from(p: PathBuf) -> Self {
        Self::new(p)
    }
}

impl From<&Path> for NormalizedPath {
    fn from(p: &Path) -> Self {
        Self::new(p)
    }
}
