//! `pyproject.toml` documents, edited through `toml_edit`.

use toml_edit::{DocumentMut, Item, TableLike, Value};

use super::{SectionValue, VersionUpSection, split_lines};

const POETRY: [&str; 2] = ["tool", "poetry"];
const VERSION: &str = "version";
const TOOL_SECTION: [&str; 2] = ["tool", "versionup"];
// older layouts kept the section at the top level
const LEGACY_SECTION: [&str; 1] = ["versionup"];

#[derive(Debug)]
pub(super) struct PoetryDocument {
    doc: DocumentMut,
}

impl PoetryDocument {
    pub(super) fn parse(source: &str) -> Result<Self, String> {
        source
            .parse::<DocumentMut>()
            .map(|doc| Self { doc })
            .map_err(|err| err.to_string())
    }

    pub(super) fn version(&self) -> Option<String> {
        lookup(self.doc.as_item(), &POETRY)?
            .as_table_like()?
            .get(VERSION)?
            .as_str()
            .map(str::to_string)
    }

    /// Returns `false` when `tool.poetry` is missing.
    pub(super) fn set_version(&mut self, new_version: &str) -> bool {
        let Some(poetry) =
            lookup_mut(self.doc.as_item_mut(), &POETRY).and_then(Item::as_table_like_mut)
        else {
            return false;
        };

        match poetry.get_mut(VERSION).and_then(Item::as_value_mut) {
            Some(value) => {
                let decor = value.decor().clone();
                *value = Value::from(new_version);
                *value.decor_mut() = decor;
            }
            None => {
                poetry.insert(VERSION, toml_edit::value(new_version));
            }
        }
        true
    }

    pub(super) fn versionup_section(&self) -> Option<VersionUpSection> {
        let root = self.doc.as_item();
        let table = lookup(root, &TOOL_SECTION)
            .or_else(|| lookup(root, &LEGACY_SECTION))?
            .as_table_like()?;

        Some(VersionUpSection {
            files: table.get("files").map(files).unwrap_or_default(),
            commit: table.get("commit").map(raw_value),
            tag: table.get("tag").map(raw_value),
            tag_prefix: string(table, "tag_prefix"),
            message: string(table, "message"),
        })
    }

    pub(super) fn render(&self) -> String {
        self.doc.to_string()
    }
}

fn lookup<'a>(item: &'a Item, path: &[&str]) -> Option<&'a Item> {
    path.iter()
        .try_fold(item, |item, key| item.as_table_like()?.get(key))
}

fn lookup_mut<'a>(item: &'a mut Item, path: &[&str]) -> Option<&'a mut Item> {
    path.iter()
        .try_fold(item, |item, key| item.as_table_like_mut()?.get_mut(key))
}

fn string(table: &dyn TableLike, key: &str) -> Option<String> {
    table.get(key)?.as_str().map(str::to_string)
}

/// `files` is normally an array of strings; a newline-delimited string is
/// accepted too.
fn files(item: &Item) -> Vec<String> {
    if let Some(array) = item.as_array() {
        array
            .iter()
            .filter_map(Value::as_str)
            .map(str::trim)
            .filter(|entry| !entry.is_empty())
            .map(str::to_string)
            .collect()
    } else {
        item.as_str().map(split_lines).unwrap_or_default()
    }
}

fn raw_value(item: &Item) -> SectionValue {
    if let Some(flag) = item.as_bool() {
        SectionValue::Bool(flag)
    } else if let Some(text) = item.as_str() {
        SectionValue::Str(text.to_string())
    } else {
        SectionValue::Other
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use indoc::indoc;

    const PYPROJECT: &str = indoc! {r#"
        [tool.poetry]
        name = "demo"
        version = "1.0.0"  # bumped by versionup

        [tool.versionup]
        files = ["foo.txt", "", "demo/__init__.py"]
        commit = true
        tag = "True"
        tag_prefix = "v"
        message = "release $new_version"
    "#};

    #[test]
    fn reads_version_and_section() {
        let doc = PoetryDocument::parse(PYPROJECT).unwrap();
        assert_eq!(doc.version().as_deref(), Some("1.0.0"));

        let section = doc.versionup_section().unwrap();
        assert_eq!(section.files, vec!["foo.txt", "demo/__init__.py"]);
        assert_eq!(section.commit, Some(SectionValue::Bool(true)));
        assert_eq!(section.tag, Some(SectionValue::Str("True".into())));
        assert_eq!(section.tag_prefix.as_deref(), Some("v"));
        assert_eq!(section.message.as_deref(), Some("release $new_version"));
    }

    #[test]
    fn set_version_keeps_comments_and_layout() {
        let mut doc = PoetryDocument::parse(PYPROJECT).unwrap();
        assert!(doc.set_version("1.0.1"));

        assert_eq!(doc.version().as_deref(), Some("1.0.1"));
        assert_eq!(
            doc.render(),
            PYPROJECT.replace(r#"version = "1.0.0""#, r#"version = "1.0.1""#)
        );
    }

    #[test]
    fn set_version_without_poetry_table_fails() {
        let mut doc = PoetryDocument::parse("[project]\nname = \"demo\"\n").unwrap();
        assert!(!doc.set_version("1.0.1"));
    }

    #[test]
    fn inline_tables_are_supported() {
        let mut doc = PoetryDocument::parse(r#"tool = { poetry = { version = "0.1" } }"#).unwrap();
        assert_eq!(doc.version().as_deref(), Some("0.1"));
        assert!(doc.set_version("0.2"));
        assert_eq!(doc.version().as_deref(), Some("0.2"));
    }

    #[test]
    fn top_level_section_is_a_fallback() {
        let doc = PoetryDocument::parse(indoc! {r#"
            [tool.poetry]
            version = "1.0.0"

            [versionup]
            files = "a.txt\nb.txt"
            commit = 1
        "#})
        .unwrap();

        let section = doc.versionup_section().unwrap();
        assert_eq!(section.files, vec!["a.txt", "b.txt"]);
        assert_eq!(section.commit, Some(SectionValue::Other));
    }

    #[test]
    fn tool_section_wins_over_top_level() {
        let doc = PoetryDocument::parse(indoc! {r#"
            [tool.versionup]
            tag_prefix = "release-"

            [versionup]
            tag_prefix = "v"
        "#})
        .unwrap();

        let section = doc.versionup_section().unwrap();
        assert_eq!(section.tag_prefix.as_deref(), Some("release-"));
    }

    #[test]
    fn missing_section_is_none() {
        let doc = PoetryDocument::parse("[tool.poetry]\nversion = \"1.0.0\"\n").unwrap();
        assert_eq!(doc.versionup_section(), None);
    }
}
