//! Effective settings for one run.
//!
//! Merges the document's `versionup` section with command-line overrides:
//!
//! - `commit` / `tag`: an explicit CLI value wins; otherwise the document's
//!   value, coerced leniently ([`truthy`]); otherwise `false`.
//! - `message`: a non-empty CLI message, else the document's, else
//!   [`DEFAULT_MESSAGE`].
//! - `tag_prefix`: document only, default empty.
//! - `target_files`: the document itself first, then the declared files.

use camino::{Utf8Path, Utf8PathBuf};
use serde::Serialize;
use tracing::{debug, instrument};

use crate::document::{DocumentResult, ProjectDocument, SectionValue, VersionUpSection};

/// Commit message used when neither the CLI nor the document sets one.
pub const DEFAULT_MESSAGE: &str = "[versionup] $old_version -> $new_version";

/// Values supplied on the command line. `None` means "inherit from the document".
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CliOverrides {
    /// `--commit` / `--no-commit`.
    pub commit: Option<bool>,
    /// `--tag` / `--no-tag`.
    pub tag: Option<bool>,
    /// `--message`.
    pub message: Option<String>,
}

/// The effective settings for one run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ResolvedSettings {
    /// Version currently declared in the document.
    pub old_version: String,
    /// Version to write.
    pub new_version: String,
    /// Files to rewrite and stage, relative to the working directory.
    pub target_files: Vec<Utf8PathBuf>,
    /// Whether to commit.
    pub do_commit: bool,
    /// Whether to tag (only honored after a commit).
    pub do_tag: bool,
    /// Prefix for the tag name.
    pub tag_prefix: String,
    /// Commit message with `$old_version` / `$new_version` placeholders.
    pub message_template: String,
}

impl ResolvedSettings {
    /// `tag_prefix` followed by the new version.
    pub fn tag_name(&self) -> String {
        format!("{}{}", self.tag_prefix, self.new_version)
    }

    /// The message template with both placeholders substituted.
    pub fn commit_message(&self) -> String {
        render_message(&self.message_template, &self.old_version, &self.new_version)
    }
}

/// Compute the settings for a run that sets the version to `new_version`.
///
/// # Errors
///
/// [`DocumentError::MissingVersionField`](crate::document::DocumentError::MissingVersionField)
/// if the document declares no version.
#[instrument(skip(doc, overrides), fields(dialect = %doc.dialect()))]
pub fn resolve(
    doc: &ProjectDocument,
    new_version: &str,
    overrides: &CliOverrides,
) -> DocumentResult<ResolvedSettings> {
    let old_version = doc.version()?;
    let section = doc.versionup_section().unwrap_or_default();

    let config_file = doc
        .path()
        .file_name()
        .map_or_else(|| doc.path().to_path_buf(), Utf8PathBuf::from);

    let settings = ResolvedSettings {
        old_version,
        new_version: new_version.to_string(),
        target_files: target_files(&config_file, &section),
        do_commit: overrides
            .commit
            .unwrap_or_else(|| truthy(section.commit.as_ref(), false)),
        do_tag: overrides
            .tag
            .unwrap_or_else(|| truthy(section.tag.as_ref(), false)),
        tag_prefix: section.tag_prefix.unwrap_or_default(),
        message_template: overrides
            .message
            .clone()
            .filter(|message| !message.is_empty())
            .or(section.message)
            .unwrap_or_else(|| DEFAULT_MESSAGE.to_string()),
    };

    debug!(
        old = %settings.old_version,
        new = %settings.new_version,
        files = settings.target_files.len(),
        commit = settings.do_commit,
        tag = settings.do_tag,
        "settings resolved"
    );
    Ok(settings)
}

fn target_files(config_file: &Utf8Path, section: &VersionUpSection) -> Vec<Utf8PathBuf> {
    let mut files = vec![config_file.to_path_buf()];
    files.extend(
        section
            .files
            .iter()
            .map(|entry| Utf8PathBuf::from(entry.trim_start_matches("./")))
            .filter(|path| path != config_file),
    );
    files
}

/// Lenient boolean coercion for document values.
///
/// Native booleans are used as-is, strings are `true` only when they read
/// `"true"` in any case, and anything else yields `default`.
pub fn truthy(value: Option<&SectionValue>, default: bool) -> bool {
    match value {
        Some(SectionValue::Bool(flag)) => *flag,
        Some(SectionValue::Str(text)) => text.trim().eq_ignore_ascii_case("true"),
        Some(SectionValue::Other) | None => default,
    }
}

/// Substitute `$old_version` and `$new_version` (or `${...}`) in `template`.
///
/// Placeholders match whole identifiers only, so `$new_version_tag` is left
/// alone. `$$` renders a literal `$`; unknown names are kept verbatim.
pub fn render_message(template: &str, old_version: &str, new_version: &str) -> String {
    let lookup = |name: &str| match name {
        "old_version" => Some(old_version),
        "new_version" => Some(new_version),
        _ => None,
    };

    let mut out = String::with_capacity(template.len());
    let mut rest = template;
    while let Some(at) = rest.find('$') {
        out.push_str(&rest[..at]);
        let after = &rest[at + 1..];

        if let Some(tail) = after.strip_prefix('$') {
            out.push('$');
            rest = tail;
            continue;
        }

        let (name, consumed) = if let Some(braced) = after.strip_prefix('{') {
            match braced.find('}') {
                Some(end) => (&braced[..end], end + 2),
                None => ("", 0),
            }
        } else {
            let end = after
                .find(|c: char| !(c.is_ascii_alphanumeric() || c == '_'))
                .unwrap_or(after.len());
            (&after[..end], end)
        };

        match lookup(name) {
            Some(value) => {
                out.push_str(value);
                rest = &after[consumed..];
            }
            None => {
                out.push('$');
                rest = after;
            }
        }
    }
    out.push_str(rest);
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::Dialect;

    fn setup_doc(section: &str) -> ProjectDocument {
        ProjectDocument::parse(
            "/work/setup.cfg",
            Dialect::Setup,
            format!("[metadata]\nversion = 1.0.0\n\n{section}"),
        )
        .unwrap()
    }

    fn overrides(commit: Option<bool>, tag: Option<bool>) -> CliOverrides {
        CliOverrides {
            commit,
            tag,
            message: None,
        }
    }

    #[test]
    fn cli_value_wins_over_document_value() {
        for document in [true, false] {
            let doc = setup_doc(&format!(
                "[versionup]\ncommit = {document}\ntag = {document}\n"
            ));
            for cli in [Some(true), Some(false), None] {
                let settings = resolve(&doc, "1.0.1", &overrides(cli, cli)).unwrap();
                let expected = cli.unwrap_or(document);
                assert_eq!(settings.do_commit, expected, "commit: doc={document} cli={cli:?}");
                assert_eq!(settings.do_tag, expected, "tag: doc={document} cli={cli:?}");
            }
        }
    }

    #[test]
    fn absent_section_defaults_everything() {
        let doc = setup_doc("");
        let settings = resolve(&doc, "1.0.1", &CliOverrides::default()).unwrap();

        assert_eq!(settings.old_version, "1.0.0");
        assert_eq!(settings.new_version, "1.0.1");
        assert!(!settings.do_commit);
        assert!(!settings.do_tag);
        assert_eq!(settings.tag_prefix, "");
        assert_eq!(settings.message_template, DEFAULT_MESSAGE);
        assert_eq!(settings.target_files, vec![Utf8PathBuf::from("setup.cfg")]);
    }

    #[test]
    fn target_files_start_with_the_document() {
        let doc = setup_doc("[versionup]\nfiles =\n    foo.txt\n    ./setup.cfg\n    src/pkg/__init__.py\n");
        let settings = resolve(&doc, "2.0", &CliOverrides::default()).unwrap();

        assert_eq!(
            settings.target_files,
            vec![
                Utf8PathBuf::from("setup.cfg"),
                Utf8PathBuf::from("foo.txt"),
                Utf8PathBuf::from("src/pkg/__init__.py"),
            ]
        );
    }

    #[test]
    fn message_precedence() {
        let doc = setup_doc("[versionup]\nmessage = bump to $new_version\n");

        let from_doc = resolve(&doc, "2.0", &CliOverrides::default()).unwrap();
        assert_eq!(from_doc.commit_message(), "bump to 2.0");

        let cli = CliOverrides {
            message: Some("release $old_version => $new_version".into()),
            ..CliOverrides::default()
        };
        let from_cli = resolve(&doc, "2.0", &cli).unwrap();
        assert_eq!(from_cli.commit_message(), "release 1.0.0 => 2.0");

        let empty_cli = CliOverrides {
            message: Some(String::new()),
            ..CliOverrides::default()
        };
        let fallback = resolve(&doc, "2.0", &empty_cli).unwrap();
        assert_eq!(fallback.message_template, "bump to $new_version");
    }

    #[test]
    fn tag_name_uses_prefix() {
        let doc = setup_doc("[versionup]\ntag_prefix = foo/\n");
        let settings = resolve(&doc, "3.1", &CliOverrides::default()).unwrap();
        assert_eq!(settings.tag_name(), "foo/3.1");
    }

    #[test]
    fn truthy_is_lenient() {
        assert!(truthy(Some(&SectionValue::Bool(true)), false));
        assert!(!truthy(Some(&SectionValue::Bool(false)), true));
        assert!(truthy(Some(&SectionValue::Str("True".into())), false));
        assert!(truthy(Some(&SectionValue::Str(" TRUE ".into())), false));
        assert!(!truthy(Some(&SectionValue::Str("yes".into())), false));
        assert!(!truthy(Some(&SectionValue::Str("False".into())), true));
        assert!(truthy(Some(&SectionValue::Other), true));
        assert!(!truthy(None, false));
    }

    #[test]
    fn default_message_renders() {
        assert_eq!(
            render_message(DEFAULT_MESSAGE, "1.0.0", "1.0.1"),
            "[versionup] 1.0.0 -> 1.0.1"
        );
    }

    #[test]
    fn render_message_respects_identifier_boundaries() {
        assert_eq!(
            render_message("$new_version_tag $new_version.", "a", "b"),
            "$new_version_tag b."
        );
        assert_eq!(render_message("${old_version}x", "a", "b"), "ax");
        assert_eq!(render_message("cost: $$5 $unknown $", "a", "b"), "cost: $5 $unknown $");
        assert_eq!(render_message("${old_version", "a", "b"), "${old_version");
    }
}
