//! Project configuration documents.
//!
//! A project declares its version in one of two dialects:
//!
//! | Dialect | File | Version field | `versionup` section |
//! |---------|------|---------------|---------------------|
//! | [`Dialect::Poetry`] | `pyproject.toml` | `tool.poetry.version` | `[tool.versionup]` |
//! | [`Dialect::Setup`] | `setup.cfg` | `metadata.version` | `[versionup]` |
//!
//! [`ProjectDocument`] gives both a uniform get/set for the version and a
//! read-only view of the `versionup` section. Saving rewrites the file in
//! place while keeping the user's formatting and comments.

mod poetry;
mod setup;

use std::fmt;

use camino::{Utf8Path, Utf8PathBuf};
use serde::Serialize;
use thiserror::Error;
use tracing::{debug, instrument};

// ──────────────────────────────────────────────
// Errors
// ──────────────────────────────────────────────

/// Errors from loading, reading, or saving a project document.
#[derive(Error, Debug)]
pub enum DocumentError {
    /// Neither `pyproject.toml` nor `setup.cfg` exists in the working directory.
    #[error("no pyproject.toml or setup.cfg found in {0}")]
    ConfigNotFound(Utf8PathBuf),

    /// The version key is absent at the dialect's expected path.
    #[error("{path}: missing version field `{field}`")]
    MissingVersionField {
        /// The document that was searched.
        path: Utf8PathBuf,
        /// Dotted path of the expected field.
        field: &'static str,
    },

    /// The document could not be read.
    #[error("failed to read {path}: {source}")]
    Read {
        /// The document path.
        path: Utf8PathBuf,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// The document could not be written back.
    #[error("failed to write {path}: {source}")]
    Write {
        /// The document path.
        path: Utf8PathBuf,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// The document is not valid in its dialect.
    #[error("failed to parse {path}: {message}")]
    Parse {
        /// The document path.
        path: Utf8PathBuf,
        /// Parser diagnostic.
        message: String,
    },
}

/// Result alias for document operations.
pub type DocumentResult<T> = Result<T, DocumentError>;

// ──────────────────────────────────────────────
// Dialects
// ──────────────────────────────────────────────

/// The configuration file formats versionup understands.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Dialect {
    /// setuptools `setup.cfg` (INI).
    Setup,
    /// poetry `pyproject.toml` (TOML).
    Poetry,
}

impl Dialect {
    /// Detection order: poetry wins when both files are present.
    pub const PROBE_ORDER: [Self; 2] = [Self::Poetry, Self::Setup];

    /// File name of the document for this dialect.
    pub const fn file_name(self) -> &'static str {
        match self {
            Self::Setup => "setup.cfg",
            Self::Poetry => "pyproject.toml",
        }
    }

    /// Dotted path of the version field.
    pub const fn version_field(self) -> &'static str {
        match self {
            Self::Setup => "metadata.version",
            Self::Poetry => "tool.poetry.version",
        }
    }
}

impl fmt::Display for Dialect {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Setup => write!(f, "setup"),
            Self::Poetry => write!(f, "poetry"),
        }
    }
}

// ──────────────────────────────────────────────
// The versionup section
// ──────────────────────────────────────────────

/// A raw boolean-like value as stored in the document.
///
/// TOML stores native booleans; INI stores everything as strings. The
/// settings resolver coerces these leniently.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SectionValue {
    /// A native boolean.
    Bool(bool),
    /// A string, e.g. `"True"` from setup.cfg.
    Str(String),
    /// Any other representation (numbers, arrays, tables).
    Other,
}

/// Read-only view of the `versionup` section.
///
/// Every field is optional in the document; `files` is empty when absent.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct VersionUpSection {
    /// Declared target files, in declaration order, blanks removed.
    pub files: Vec<String>,
    /// Raw `commit` value.
    pub commit: Option<SectionValue>,
    /// Raw `tag` value.
    pub tag: Option<SectionValue>,
    /// Prefix prepended to the new version when naming the tag.
    pub tag_prefix: Option<String>,
    /// Commit message template.
    pub message: Option<String>,
}

/// Split a newline-delimited list, trimming entries and dropping blanks.
pub(crate) fn split_lines(value: &str) -> Vec<String> {
    value
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .map(str::to_string)
        .collect()
}

// ──────────────────────────────────────────────
// Document
// ──────────────────────────────────────────────

#[derive(Debug)]
enum Format {
    Setup(setup::SetupDocument),
    Poetry(poetry::PoetryDocument),
}

/// A loaded project configuration document.
#[derive(Debug)]
pub struct ProjectDocument {
    path: Utf8PathBuf,
    format: Format,
}

impl ProjectDocument {
    /// Probe `working_dir` for `pyproject.toml`, then `setup.cfg`, and load
    /// the first one found.
    ///
    /// # Errors
    ///
    /// [`DocumentError::ConfigNotFound`] if neither exists; read and parse
    /// errors of the selected file propagate.
    #[instrument(fields(%working_dir))]
    pub fn detect_and_load(working_dir: &Utf8Path) -> DocumentResult<Self> {
        let Some((dialect, path)) = Dialect::PROBE_ORDER
            .iter()
            .map(|dialect| (*dialect, working_dir.join(dialect.file_name())))
            .find(|(_, path)| path.is_file())
        else {
            return Err(DocumentError::ConfigNotFound(working_dir.to_path_buf()));
        };

        debug!(%dialect, %path, "detected project document");
        Self::load(path, dialect)
    }

    /// Load the document at `path` as `dialect`.
    pub fn load(path: impl Into<Utf8PathBuf>, dialect: Dialect) -> DocumentResult<Self> {
        let path = path.into();
        let source = std::fs::read_to_string(&path).map_err(|source| DocumentError::Read {
            path: path.clone(),
            source,
        })?;
        Self::parse(path, dialect, source)
    }

    /// Parse `source` as `dialect`; `path` is where [`save`](Self::save) writes.
    pub fn parse(
        path: impl Into<Utf8PathBuf>,
        dialect: Dialect,
        source: String,
    ) -> DocumentResult<Self> {
        let path = path.into();
        let parsed = match dialect {
            Dialect::Setup => setup::SetupDocument::parse(source).map(Format::Setup),
            Dialect::Poetry => poetry::PoetryDocument::parse(&source).map(Format::Poetry),
        };
        let format = parsed.map_err(|message| DocumentError::Parse {
            path: path.clone(),
            message,
        })?;
        Ok(Self { path, format })
    }

    /// The dialect this document was loaded as.
    pub const fn dialect(&self) -> Dialect {
        match self.format {
            Format::Setup(_) => Dialect::Setup,
            Format::Poetry(_) => Dialect::Poetry,
        }
    }

    /// The file this document was loaded from.
    pub fn path(&self) -> &Utf8Path {
        &self.path
    }

    /// The current version.
    ///
    /// # Errors
    ///
    /// [`DocumentError::MissingVersionField`] if the field is absent or not a string.
    pub fn version(&self) -> DocumentResult<String> {
        let version = match &self.format {
            Format::Setup(doc) => doc.version(),
            Format::Poetry(doc) => doc.version(),
        };
        version.ok_or_else(|| self.missing_version())
    }

    /// Set the version in memory. Nothing is written until [`save`](Self::save).
    ///
    /// # Errors
    ///
    /// [`DocumentError::MissingVersionField`] if the poetry table path does not
    /// exist. The setup dialect creates `[metadata]` when needed.
    pub fn set_version(&mut self, new_version: &str) -> DocumentResult<()> {
        let updated = match &mut self.format {
            Format::Setup(doc) => {
                doc.set_version(new_version);
                true
            }
            Format::Poetry(doc) => doc.set_version(new_version),
        };
        if updated {
            Ok(())
        } else {
            Err(self.missing_version())
        }
    }

    /// The `versionup` section, or `None` when the document has none.
    ///
    /// An absent section disables rewriting, committing, and tagging; an
    /// empty one means "defaults for everything".
    pub fn versionup_section(&self) -> Option<VersionUpSection> {
        match &self.format {
            Format::Setup(doc) => doc.versionup_section(),
            Format::Poetry(doc) => doc.versionup_section(),
        }
    }

    /// Serialize the document in its dialect.
    pub fn render(&self) -> String {
        match &self.format {
            Format::Setup(doc) => doc.render(),
            Format::Poetry(doc) => doc.render(),
        }
    }

    /// Overwrite the file the document was loaded from.
    #[instrument(skip(self), fields(path = %self.path))]
    pub fn save(&self) -> DocumentResult<()> {
        std::fs::write(&self.path, self.render()).map_err(|source| DocumentError::Write {
            path: self.path.clone(),
            source,
        })?;
        debug!("project document saved");
        Ok(())
    }

    fn missing_version(&self) -> DocumentError {
        DocumentError::MissingVersionField {
            path: self.path.clone(),
            field: self.dialect().version_field(),
        }
    }
}
