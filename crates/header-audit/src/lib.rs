//! Finds headers in an SDK include tree that nobody has vetted yet.
//!
//! The allow-list is a plain text file of include-root relative paths, one per line. Two passes
//! are run over the tree: the C pass covers everything outside the C++ headers, the C++ pass
//! covers only the C++ sub-directory and reports paths relative to it.
use std::collections::BTreeSet;
use std::fs;
use std::path::{Component, Path, PathBuf};

mod error;

pub use error::AuditError;

pub const DEFAULT_CPP_MARKER: &str = "c++";
pub const DEFAULT_CPP_DIR: &str = "c++/v1";

/// Relative header paths that have been reviewed.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AllowList {
    entries: BTreeSet<String>,
}

impl AllowList {
    /// Blank lines and surrounding whitespace are ignored. Backslashes are read as separators.
    pub fn parse(text: &str) -> Self {
        text.lines()
            .map(str::trim)
            .filter(|line| !line.is_empty())
            .collect()
    }

    pub fn load(path: &Path) -> Result<Self, AuditError> {
        let text = fs::read_to_string(path).map_err(AuditError::io(path))?;
        let allow = Self::parse(&text);
        tracing::debug!(message = "loaded allow-list", path = %path.display(), entries = allow.len());
        Ok(allow)
    }

    pub fn contains(&self, path: &str) -> bool {
        self.entries.contains(path)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl<S: AsRef<str>> FromIterator<S> for AllowList {
    fn from_iter<I: IntoIterator<Item = S>>(iter: I) -> Self {
        Self {
            entries: iter
                .into_iter()
                .map(|entry| entry.as_ref().replace('\\', "/"))
                .collect(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Pass {
    C,
    Cpp,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Audit {
    root: PathBuf,
    cpp_marker: String,
    cpp_dir: PathBuf,
}

impl Audit {
    pub fn new<P: Into<PathBuf>>(root: P) -> Self {
        Self {
            root: root.into(),
            cpp_marker: DEFAULT_CPP_MARKER.to_owned(),
            cpp_dir: PathBuf::from(DEFAULT_CPP_DIR),
        }
    }

    pub fn cpp_marker<S: Into<String>>(mut self, marker: S) -> Self {
        self.cpp_marker = marker.into();
        self
    }

    /// Sub-directory of the root holding the C++ headers.
    pub fn cpp_dir<P: Into<PathBuf>>(mut self, dir: P) -> Self {
        self.cpp_dir = dir.into();
        self
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn run(&self, pass: Pass, allow: &AllowList) -> Result<Vec<String>, AuditError> {
        match pass {
            Pass::C => self.c_pass(allow),
            Pass::Cpp => self.cpp_pass(allow),
        }
    }

    /// Every file under the root that isn't allowed and has no path component equal to the C++
    /// marker.
    pub fn c_pass(&self, allow: &AllowList) -> Result<Vec<String>, AuditError> {
        let missing = relative_files(&self.root)?
            .into_iter()
            .filter(|path| !path.split('/').any(|part| part == self.cpp_marker))
            .filter(|path| !allow.contains(path))
            .collect::<Vec<_>>();

        tracing::info!(
            message = "c pass done",
            root = %self.root.display(),
            missing = missing.len()
        );
        Ok(missing)
    }

    /// Every file under the C++ sub-directory that isn't allowed, relative to that directory.
    /// An allow-list entry may name the file relative to either the sub-directory or the root.
    pub fn cpp_pass(&self, allow: &AllowList) -> Result<Vec<String>, AuditError> {
        let dir = self.root.join(&self.cpp_dir);
        if !dir.is_dir() {
            tracing::warn!(message = "no c++ headers", dir = %dir.display());
            return Ok(Vec::new());
        }

        let prefix = slash_path(&self.cpp_dir)?;
        let missing = relative_files(&dir)?
            .into_iter()
            .filter(|path| !allow.contains(path) && !allow.contains(&format!("{prefix}/{path}")))
            .collect::<Vec<_>>();

        tracing::info!(
            message = "c++ pass done",
            dir = %dir.display(),
            missing = missing.len()
        );
        Ok(missing)
    }
}

/// All files below `root`, as sorted `/`-separated paths relative to it.
pub fn relative_files(root: &Path) -> Result<Vec<String>, AuditError> {
    let mut files = Vec::new();
    walk(root, &mut files)?;

    let mut relative = files
        .iter()
        .map(|path| {
            let rel = path.strip_prefix(root).map_err(|_| AuditError::OutsideRoot {
                path: path.clone(),
                root: root.to_owned(),
            })?;
            slash_path(rel)
        })
        .collect::<Result<Vec<_>, _>>()?;

    relative.sort();
    Ok(relative)
}

fn walk(dir: &Path, files: &mut Vec<PathBuf>) -> Result<(), AuditError> {
    for entry in fs::read_dir(dir).map_err(AuditError::io(dir))? {
        let entry = entry.map_err(AuditError::io(dir))?;
        let path = entry.path();
        let ty = entry.file_type().map_err(AuditError::io(&path))?;

        if ty.is_dir() {
            walk(&path, files)?;
        } else {
            files.push(path);
        }
    }

    Ok(())
}

fn slash_path(path: &Path) -> Result<String, AuditError> {
    let mut parts = Vec::new();
    for component in path.components() {
        match component {
            Component::Normal(part) => parts.push(part.to_string_lossy()),
            Component::CurDir => (),
            _ => {
                return Err(AuditError::OutsideRoot {
                    path: path.to_owned(),
                    root: PathBuf::from("."),
                });
            }
        }
    }
    Ok(parts.join("/"))
}
