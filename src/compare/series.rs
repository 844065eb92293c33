//! Numeric inputs: inline values or JSON files loaded at evaluation time.

use super::labels::{label_id, LabeledValues};
use super::ComparisonError;
use serde::de::{self, MapAccess, SeqAccess, Visitor};
use serde::{Deserialize, Deserializer, Serialize};
use std::convert::Infallible;
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};

/// A numeric sequence.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum NumericSeries {
    /// Inline values.
    Values(Vec<f64>),

    /// A JSON file holding an array of numbers, optionally below a JSON
    /// pointer (`/results/latency`).
    File {
        file: PathBuf,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        pointer: Option<String>,
    },

    /// The [`label_id`]s of a labeled series, for set comparison of labels.
    LabelIds { label_ids_of: Box<LabeledSeries> },
}

impl NumericSeries {
    /// Resolve relative file paths against `base`.
    pub fn rebase(&mut self, base: &Path) {
        if let Err(never) = self.map_paths(&|p| Ok::<_, Infallible>(rebased(p, base))) {
            match never {}
        }
    }

    /// Rewrite every file path with `f`, stopping at the first error.
    pub fn map_paths<F, E>(&mut self, f: &F) -> Result<(), E>
    where
        F: Fn(&Path) -> Result<PathBuf, E>,
    {
        match self {
            NumericSeries::Values(_) => Ok(()),
            NumericSeries::File { file, .. } => {
                *file = f(file.as_path())?;
                Ok(())
            }
            NumericSeries::LabelIds { label_ids_of } => label_ids_of.map_paths(f),
        }
    }

    /// Produce the values, reading files as needed.
    pub fn load(&self) -> Result<Vec<f64>, ComparisonError> {
        match self {
            NumericSeries::Values(values) => Ok(values.clone()),
            NumericSeries::File { file, pointer } => {
                let tree = read_tree(file)?;
                let node = select(&tree, pointer.as_deref(), file)?;
                node.numbers().map_err(|message| ComparisonError::Load {
                    path: file.clone(),
                    message,
                })
            }
            NumericSeries::LabelIds { label_ids_of } => Ok(label_ids_of.load()?.label_ids()),
        }
    }
}

/// A labeled numeric series.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum LabeledSeries {
    /// A JSON file. Nested objects are flattened to dotted labels; with
    /// `field`, only leaves named `field` are kept, labeled by their parent
    /// path, and rows without that field are skipped.
    File {
        file: PathBuf,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        pointer: Option<String>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        field: Option<String>,
    },

    /// Inline labeled values.
    Inline(LabeledValues),
}

impl LabeledSeries {
    /// Resolve relative file paths against `base`.
    pub fn rebase(&mut self, base: &Path) {
        if let Err(never) = self.map_paths(&|p| Ok::<_, Infallible>(rebased(p, base))) {
            match never {}
        }
    }

    /// Rewrite every file path with `f`, stopping at the first error.
    pub fn map_paths<F, E>(&mut self, f: &F) -> Result<(), E>
    where
        F: Fn(&Path) -> Result<PathBuf, E>,
    {
        if let LabeledSeries::File { file, .. } = self {
            *file = f(file.as_path())?;
        }
        Ok(())
    }

    /// Produce the labeled values, reading files as needed.
    pub fn load(&self) -> Result<LabeledValues, ComparisonError> {
        match self {
            LabeledSeries::Inline(values) => Ok(values.clone()),
            LabeledSeries::File {
                file,
                pointer,
                field,
            } => {
                let tree = read_tree(file)?;
                let node = select(&tree, pointer.as_deref(), file)?;
                node.flatten(field.as_deref(), &file.display().to_string())
                    .map_err(|e| match e {
                        ComparisonError::Input { message, .. } => ComparisonError::Load {
                            path: file.clone(),
                            message,
                        },
                        other => other,
                    })
            }
        }
    }
}

fn rebased(path: &Path, base: &Path) -> PathBuf {
    if path.is_relative() {
        base.join(path)
    } else {
        path.to_path_buf()
    }
}

fn read_tree(path: &Path) -> Result<Tree, ComparisonError> {
    let load_err = |message: String| ComparisonError::Load {
        path: path.to_path_buf(),
        message,
    };
    let text = fs::read_to_string(path).map_err(|e| load_err(e.to_string()))?;
    if text.trim().is_empty() {
        return Err(load_err("empty JSON content".to_string()));
    }
    serde_json::from_str(&text).map_err(|e| load_err(format!("invalid JSON: {}", e)))
}

fn select<'a>(
    tree: &'a Tree,
    pointer: Option<&str>,
    path: &Path,
) -> Result<&'a Tree, ComparisonError> {
    match pointer {
        None | Some("") => Ok(tree),
        Some(p) => tree.pointer(p).ok_or_else(|| ComparisonError::Load {
            path: path.to_path_buf(),
            message: format!("no value at pointer {:?}", p),
        }),
    }
}

/// A parsed JSON/YAML document that keeps duplicate object keys and their
/// order, unlike `serde_json::Value`.
#[derive(Debug, Clone, PartialEq)]
pub(crate) enum Tree {
    Null,
    Bool(bool),
    Number(f64),
    String(String),
    Array(Vec<Tree>),
    Object(Vec<(String, Tree)>),
}

impl Tree {
    fn kind(&self) -> &'static str {
        match self {
            Tree::Null => "null",
            Tree::Bool(_) => "boolean",
            Tree::Number(_) => "number",
            Tree::String(_) => "string",
            Tree::Array(_) => "array",
            Tree::Object(_) => "object",
        }
    }

    /// Numeric value. JSON has no NaN or infinity literals, so the strings
    /// `"NaN"`, `"inf"` and `"-Infinity"` are accepted for them.
    fn as_number(&self) -> Option<f64> {
        match self {
            Tree::Number(n) => Some(*n),
            Tree::String(s) => s.trim().parse::<f64>().ok().filter(|v| !v.is_finite()),
            _ => None,
        }
    }

    fn get(&self, key: &str) -> Option<&Tree> {
        match self {
            Tree::Object(entries) => entries.iter().find(|(k, _)| k == key).map(|(_, v)| v),
            _ => None,
        }
    }

    /// RFC 6901 lookup.
    fn pointer(&self, pointer: &str) -> Option<&Tree> {
        let rest = pointer.strip_prefix('/')?;
        rest.split('/')
            .map(|token| token.replace("~1", "/").replace("~0", "~"))
            .try_fold(self, |node, token| match node {
                Tree::Object(_) => node.get(&token),
                Tree::Array(items) => token.parse::<usize>().ok().and_then(|i| items.get(i)),
                _ => None,
            })
    }

    fn numbers(&self) -> Result<Vec<f64>, String> {
        match self {
            Tree::Array(items) => items
                .iter()
                .enumerate()
                .map(|(i, item)| {
                    item.as_number()
                        .ok_or_else(|| format!("non-numeric {} at index {}", item.kind(), i))
                })
                .collect(),
            other => Err(format!("expected an array of numbers, found {}", other.kind())),
        }
    }

    pub(crate) fn flatten(
        &self,
        field: Option<&str>,
        context: &str,
    ) -> Result<LabeledValues, ComparisonError> {
        let input_err = |message: String| ComparisonError::Input {
            context: context.to_string(),
            message,
        };
        let mut out = Vec::new();
        match self {
            Tree::Array(items) => {
                for (i, item) in items.iter().enumerate() {
                    let (label, value) = pair(item).map_err(|m| input_err(format!("entry #{}: {}", i, m)))?;
                    out.push((label, value));
                }
            }
            Tree::Object(entries) => {
                let mut path = Vec::new();
                collect_leaves(entries, &mut path, field, &mut out).map_err(input_err)?;
            }
            other => {
                return Err(input_err(format!(
                    "expected an object or an array of pairs, found {}",
                    other.kind()
                )))
            }
        }
        Ok(LabeledValues::new(out))
    }
}

/// `["label", value]` or `{"label": ..., "value": ...}`.
fn pair(item: &Tree) -> Result<(String, f64), String> {
    let (label, value) = match item {
        Tree::Array(parts) if parts.len() == 2 => (&parts[0], &parts[1]),
        Tree::Object(_) => (
            item.get("label").ok_or("missing field \"label\"")?,
            item.get("value").ok_or("missing field \"value\"")?,
        ),
        other => return Err(format!("expected a [label, value] pair, found {}", other.kind())),
    };
    let label = match label {
        Tree::String(s) if !s.trim().is_empty() => s.clone(),
        _ => return Err("label must be a non-empty string".to_string()),
    };
    let value = value
        .as_number()
        .ok_or_else(|| format!("{}: non-numeric value ({})", label, value.kind()))?;
    Ok((label, value))
}

fn collect_leaves(
    entries: &[(String, Tree)],
    path: &mut Vec<String>,
    field: Option<&str>,
    out: &mut Vec<(String, f64)>,
) -> Result<(), String> {
    for (key, value) in entries {
        path.push(key.clone());
        match value {
            Tree::Object(children) => collect_leaves(children, path, field, out)?,
            leaf => match field {
                None => {
                    let v = leaf
                        .as_number()
                        .ok_or_else(|| format!("{}: non-numeric value ({})", path.join("."), leaf.kind()))?;
                    out.push((path.join("."), v));
                }
                Some(f) if key == f && path.len() > 1 => {
                    let v = leaf
                        .as_number()
                        .ok_or_else(|| format!("{}: non-numeric value ({})", path.join("."), leaf.kind()))?;
                    out.push((path[..path.len() - 1].join("."), v));
                }
                Some(_) => {}
            },
        }
        path.pop();
    }
    Ok(())
}

impl<'de> Deserialize<'de> for Tree {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        deserializer.deserialize_any(TreeVisitor)
    }
}

struct TreeVisitor;

impl<'de> Visitor<'de> for TreeVisitor {
    type Value = Tree;

    fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("a JSON value")
    }

    fn visit_unit<E: de::Error>(self) -> Result<Tree, E> {
        Ok(Tree::Null)
    }

    fn visit_none<E: de::Error>(self) -> Result<Tree, E> {
        Ok(Tree::Null)
    }

    fn visit_some<D: Deserializer<'de>>(self, d: D) -> Result<Tree, D::Error> {
        Tree::deserialize(d)
    }

    fn visit_bool<E: de::Error>(self, v: bool) -> Result<Tree, E> {
        Ok(Tree::Bool(v))
    }

    fn visit_i64<E: de::Error>(self, v: i64) -> Result<Tree, E> {
        Ok(Tree::Number(v as f64))
    }

    fn visit_u64<E: de::Error>(self, v: u64) -> Result<Tree, E> {
        Ok(Tree::Number(v as f64))
    }

    fn visit_f64<E: de::Error>(self, v: f64) -> Result<Tree, E> {
        Ok(Tree::Number(v))
    }

    fn visit_str<E: de::Error>(self, v: &str) -> Result<Tree, E> {
        Ok(Tree::String(v.to_string()))
    }

    fn visit_string<E: de::Error>(self, v: String) -> Result<Tree, E> {
        Ok(Tree::String(v))
    }

    fn visit_seq<A: SeqAccess<'de>>(self, mut seq: A) -> Result<Tree, A::Error> {
        let mut items = Vec::new();
        while let Some(item) = seq.next_element()? {
            items.push(item);
        }
        Ok(Tree::Array(items))
    }

    fn visit_map<A: MapAccess<'de>>(self, mut map: A) -> Result<Tree, A::Error> {
        let mut entries = Vec::new();
        while let Some((key, value)) = map.next_entry::<String, Tree>()? {
            entries.push((key, value));
        }
        Ok(Tree::Object(entries))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn write(dir: &TempDir, name: &str, content: &str) -> PathBuf {
        let path = dir.path().join(name);
        fs::write(&path, content).unwrap();
        path
    }

    #[test]
    fn inline_values_load_as_is() {
        let series = NumericSeries::Values(vec![1.0, 2.0]);
        assert_eq!(series.load().unwrap(), vec![1.0, 2.0]);
    }

    #[test]
    fn loads_array_file() {
        let temp = TempDir::new().unwrap();
        let file = write(&temp, "v.json", "[1, 2.5, \"NaN\"]");
        let values = NumericSeries::File { file, pointer: None }.load().unwrap();
        assert_eq!(values[..2], [1.0, 2.5]);
        assert!(values[2].is_nan());
    }

    #[test]
    fn loads_array_below_pointer() {
        let temp = TempDir::new().unwrap();
        let file = write(&temp, "v.json", r#"{"runs": {"latency": [3, 4]}}"#);
        let series = NumericSeries::File {
            file,
            pointer: Some("/runs/latency".into()),
        };
        assert_eq!(series.load().unwrap(), vec![3.0, 4.0]);
    }

    #[test]
    fn numeric_strings_are_not_numbers() {
        let temp = TempDir::new().unwrap();
        let file = write(&temp, "v.json", "[\"1.5\"]");
        let err = NumericSeries::File { file, pointer: None }.load().unwrap_err();
        assert!(err.to_string().contains("non-numeric string at index 0"));
    }

    #[test]
    fn missing_file_is_a_load_error() {
        let series = NumericSeries::File {
            file: PathBuf::from("/nonexistent/arteval/v.json"),
            pointer: None,
        };
        assert!(matches!(series.load(), Err(ComparisonError::Load { .. })));
    }

    #[test]
    fn empty_file_is_a_load_error() {
        let temp = TempDir::new().unwrap();
        let file = write(&temp, "v.json", "  \n");
        let err = NumericSeries::File { file, pointer: None }.load().unwrap_err();
        assert!(err.to_string().contains("empty JSON content"));
    }

    #[test]
    fn flattens_nested_objects_to_dotted_labels() {
        let temp = TempDir::new().unwrap();
        let file = write(
            &temp,
            "t.json",
            r#"{"ff": {"automerge": {"mean": 1.0, "stddev": 0.1}}, "opt": {"git": {"mean": 2.0}}}"#,
        );
        let all = LabeledSeries::File {
            file: file.clone(),
            pointer: None,
            field: None,
        }
        .load()
        .unwrap();
        let labels: Vec<&str> = all.labels().collect();
        assert_eq!(labels, ["ff.automerge.mean", "ff.automerge.stddev", "opt.git.mean"]);

        let stddev = LabeledSeries::File {
            file,
            pointer: None,
            field: Some("stddev".into()),
        }
        .load()
        .unwrap();
        assert_eq!(stddev, LabeledValues::new(vec![("ff.automerge".into(), 0.1)]));
    }

    #[test]
    fn label_ids_series_hashes_labels() {
        let inline = LabeledSeries::Inline(LabeledValues::new(vec![("a".into(), 1.0)]));
        let series = NumericSeries::LabelIds {
            label_ids_of: Box::new(inline),
        };
        assert_eq!(series.load().unwrap(), vec![label_id("a")]);
    }

    #[test]
    fn rebase_only_touches_relative_paths() {
        let mut rel = NumericSeries::File {
            file: PathBuf::from("out/v.json"),
            pointer: None,
        };
        rel.rebase(Path::new("/home/x"));
        assert_eq!(
            rel,
            NumericSeries::File {
                file: PathBuf::from("/home/x/out/v.json"),
                pointer: None
            }
        );

        let mut abs = LabeledSeries::File {
            file: PathBuf::from("/data/t.json"),
            pointer: None,
            field: None,
        };
        abs.rebase(Path::new("/home/x"));
        assert!(matches!(abs, LabeledSeries::File { ref file, .. } if file == Path::new("/data/t.json")));
    }

    #[test]
    fn series_deserialize_from_yaml() {
        let values: NumericSeries = serde_yaml::from_str("[1, 2, .nan]").unwrap();
        assert!(matches!(values, NumericSeries::Values(ref v) if v.len() == 3 && v[2].is_nan()));

        let file: NumericSeries = serde_yaml::from_str("file: out.json").unwrap();
        assert!(matches!(file, NumericSeries::File { .. }));

        let labeled: LabeledSeries = serde_yaml::from_str("{a: 1, b: 2}").unwrap();
        assert!(matches!(labeled, LabeledSeries::Inline(ref v) if v.len() == 2));

        let labeled_file: LabeledSeries =
            serde_yaml::from_str("{file: t.json, field: mean}").unwrap();
        assert!(matches!(labeled_file, LabeledSeries::File { field: Some(_), .. }));
    }
}
