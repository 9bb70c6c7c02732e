// src/core/call_graph/identity.rs
use std::cmp::Ordering;
use std::fmt;
use std::path::{Path, PathBuf};

/// Separator between the file part and the name part of an identity
pub const IDENTITY_SEPARATOR: &str = "::";

/// Textual identity of a function: the file it was found in plus its name.
///
/// Identity is never resolved against other files. A callee is always named
/// after the *caller's* file, so calls to imported or builtin functions show
/// up as shadow nodes that no extractor ever defines.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct FunctionId {
    pub file_path: PathBuf,
    pub name: String,
}

impl FunctionId {
    pub fn new(file_path: impl Into<PathBuf>, name: impl Into<String>) -> Self {
        Self {
            file_path: file_path.into(),
            name: name.into(),
        }
    }

    /// Identity of a call made from `caller` to `name`, attributed to the caller's file
    pub fn callee_of(caller: &FunctionId, name: &str) -> Self {
        Self::new(caller.file_path.clone(), name)
    }

    /// Canonical `file_path::name` form
    pub fn canonical(&self) -> String {
        format!("{}{}{}", self.file_path.display(), IDENTITY_SEPARATOR, self.name)
    }

    /// Display form with the path reduced to its base name.
    ///
    /// Two identities from same-named files in different directories render
    /// identically; only use this for output.
    pub fn clean_label(&self) -> String {
        format!("{}{}{}", base_name(&self.file_path), IDENTITY_SEPARATOR, self.name)
    }
}

impl fmt::Display for FunctionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}{}", self.file_path.display(), IDENTITY_SEPARATOR, self.name)
    }
}

// Ordered by canonical string so sorted listings read like sorted text.
impl Ord for FunctionId {
    fn cmp(&self, other: &Self) -> Ordering {
        self.canonical()
            .cmp(&other.canonical())
            .then_with(|| self.file_path.cmp(&other.file_path))
    }
}

impl PartialOrd for FunctionId {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

fn base_name(path: &Path) -> String {
    path.file_name()
        .map(|name| name.to_string_lossy().to_string())
        .unwrap_or_else(|| path.display().to_string())
}
