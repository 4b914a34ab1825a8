//! `setup.cfg` (INI) documents.
//!
//! Values are read through `configparser`. Writes edit the original text
//! line by line, so comments, ordering, and unrelated keys survive a save.
//!
//! Names are matched case-insensitively (`Version = 1.0` is the version).
//! Inline comments are not recognized: `#` and `;` after a value are part of
//! it, and only whole-line comments are skipped.

use configparser::ini::Ini;

use super::{SectionValue, VersionUpSection, split_lines};

const METADATA: &str = "metadata";
const VERSIONUP: &str = "versionup";
const VERSION: &str = "version";

#[derive(Debug)]
pub(super) struct SetupDocument {
    source: String,
    ini: Ini,
}

impl SetupDocument {
    pub(super) fn parse(source: String) -> Result<Self, String> {
        let mut ini = Ini::new();
        ini.set_multiline(true);
        let no_inline: &[char] = &[];
        ini.set_inline_comment_symbols(Some(no_inline));
        ini.read(source.clone())?;
        Ok(Self { source, ini })
    }

    pub(super) fn version(&self) -> Option<String> {
        self.ini.get(METADATA, VERSION)
    }

    pub(super) fn set_version(&mut self, new_version: &str) {
        self.source = set_value(&self.source, METADATA, VERSION, new_version);
        self.ini.set(METADATA, VERSION, Some(new_version.to_string()));
    }

    pub(super) fn versionup_section(&self) -> Option<VersionUpSection> {
        if !has_section(&self.source, VERSIONUP) {
            return None;
        }
        let get = |key: &str| self.ini.get(VERSIONUP, key);
        Some(VersionUpSection {
            files: get("files").as_deref().map(split_lines).unwrap_or_default(),
            commit: get("commit").map(SectionValue::Str),
            tag: get("tag").map(SectionValue::Str),
            tag_prefix: get("tag_prefix"),
            message: get("message"),
        })
    }

    pub(super) fn render(&self) -> String {
        self.source.clone()
    }
}

fn section_name(line: &str) -> Option<&str> {
    line.trim()
        .strip_prefix('[')
        .and_then(|rest| rest.strip_suffix(']'))
        .map(str::trim)
}

fn has_section(source: &str, section: &str) -> bool {
    source
        .lines()
        .any(|line| section_name(line).is_some_and(|name| name.eq_ignore_ascii_case(section)))
}

/// Key and delimiter offset of a `key = value` / `key: value` line.
fn assignment(line: &str) -> Option<(&str, usize)> {
    if line.starts_with(char::is_whitespace) {
        return None;
    }
    let delimiter = line.find(['=', ':'])?;
    Some((line[..delimiter].trim(), delimiter))
}

const fn is_comment(trimmed: &str) -> bool {
    matches!(trimmed.as_bytes().first(), Some(b'#' | b';'))
}

/// Replace `key`'s value inside `[section]`, keeping everything else verbatim.
///
/// Continuation lines of the old value are dropped. A missing key is added at
/// the end of the section; a missing section is appended to the document.
fn set_value(source: &str, section: &str, key: &str, value: &str) -> String {
    let mut out = String::with_capacity(source.len() + value.len());
    let mut current: Option<&str> = None;
    let mut replaced = false;
    let mut in_continuation = false;
    // byte offset in `out` just after the last content line of the target section
    let mut section_end: Option<usize> = None;

    for raw in source.split_inclusive('\n') {
        let line = raw.trim_end_matches(['\n', '\r']);
        let ending = &raw[line.len()..];
        let trimmed = line.trim();

        if in_continuation {
            if !trimmed.is_empty() && line.starts_with(char::is_whitespace) {
                continue;
            }
            in_continuation = false;
        }

        if let Some(name) = section_name(line) {
            current = Some(name);
            out.push_str(raw);
            if name.eq_ignore_ascii_case(section) && !replaced {
                section_end = Some(out.len());
            }
            continue;
        }

        let in_target = current.is_some_and(|name| name.eq_ignore_ascii_case(section));
        if let Some((name, delimiter)) = assignment(line)
            && in_target
            && !replaced
            && !is_comment(trimmed)
            && name.eq_ignore_ascii_case(key)
        {
            let value_start = line[delimiter + 1..]
                .find(|c: char| !c.is_whitespace())
                .map_or(line.len(), |offset| delimiter + 1 + offset);
            let prefix = &line[..value_start];
            out.push_str(prefix);
            // `version =` with the value on continuation lines
            if value_start == line.len() && !prefix.ends_with(char::is_whitespace) {
                out.push(' ');
            }
            out.push_str(value);
            out.push_str(ending);
            replaced = true;
            in_continuation = true;
            continue;
        }

        out.push_str(raw);
        if in_target && !replaced && !trimmed.is_empty() {
            section_end = Some(out.len());
        }
    }

    if replaced {
        return out;
    }

    let new_line = format!("{key} = {value}\n");
    match section_end {
        Some(at) => {
            if !out[..at].ends_with('\n') {
                out.insert(at, '\n');
                out.insert_str(at + 1, &new_line);
            } else {
                out.insert_str(at, &new_line);
            }
        }
        None => {
            if !out.is_empty() && !out.ends_with('\n') {
                out.push('\n');
            }
            if !out.is_empty() {
                out.push('\n');
            }
            out.push_str(&format!("[{section}]\n{new_line}"));
        }
    }
    out
}
