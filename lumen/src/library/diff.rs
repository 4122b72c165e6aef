//! Structured diffs between component settings.
//!
//! When a component's geometry hash drifts from the locked reference, the
//! settings diff explains *why* in terms of the parameters the factories
//! were called with: which keys were added, removed, or changed.

use std::fmt;

use serde_json::Value;

/// One difference between two settings objects.
#[derive(Debug, Clone, PartialEq)]
pub enum DiffEntry {
    Added { key: String, value: Value },
    Removed { key: String, value: Value },
    Changed { key: String, before: Value, after: Value },
}

/// A structured diff of two settings objects.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SettingsDiff {
    pub entries: Vec<DiffEntry>,
}

impl SettingsDiff {
    /// Returns `true` if the two settings objects were identical.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl fmt::Display for SettingsDiff {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.entries.is_empty() {
            return write!(f, "settings unchanged");
        }
        for (i, entry) in self.entries.iter().enumerate() {
            if i > 0 {
                writeln!(f)?;
            }
            match entry {
                DiffEntry::Added { key, value } => write!(f, "+ {key}: {value}")?,
                DiffEntry::Removed { key, value } => write!(f, "- {key}: {value}")?,
                DiffEntry::Changed { key, before, after } => {
                    write!(f, "  {key}: {before} -> {after}")?
                }
            }
        }
        Ok(())
    }
}

/// Diffs two settings values.
///
/// Nested objects are compared recursively, with dotted key paths in the
/// result. Keys are reported in sorted order.
pub fn diff_settings(before: &Value, after: &Value) -> SettingsDiff {
    let mut diff = SettingsDiff::default();
    diff_into(&mut diff, "", before, after);
    diff
}

fn diff_into(diff: &mut SettingsDiff, prefix: &str, before: &Value, after: &Value) {
    match (before, after) {
        (Value::Object(b), Value::Object(a)) => {
            let mut keys: Vec<&String> = b.keys().chain(a.keys()).collect();
            keys.sort();
            keys.dedup();
            for key in keys {
                let path = if prefix.is_empty() {
                    key.clone()
                } else {
                    format!("{prefix}.{key}")
                };
                match (b.get(key), a.get(key)) {
                    (Some(bv), Some(av)) => diff_into(diff, &path, bv, av),
                    (Some(bv), None) => diff.entries.push(DiffEntry::Removed {
                        key: path,
                        value: bv.clone(),
                    }),
                    (None, Some(av)) => diff.entries.push(DiffEntry::Added {
                        key: path,
                        value: av.clone(),
                    }),
                    (None, None) => unreachable!(),
                }
            }
        }
        (b, a) => {
            if b != a {
                diff.entries.push(DiffEntry::Changed {
                    key: prefix.to_string(),
                    before: b.clone(),
                    after: a.clone(),
                });
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn identical_settings_have_empty_diff() {
        let v = json!({"width": 0.5, "gap": 0.2});
        assert!(diff_settings(&v, &v).is_empty());
    }

    #[test]
    fn changed_key_is_reported() {
        let before = json!({"width": 0.5, "gap": 0.2});
        let after = json!({"width": 0.45, "gap": 0.2});
        let diff = diff_settings(&before, &after);
        assert_eq!(
            diff.entries,
            vec![DiffEntry::Changed {
                key: "width".to_string(),
                before: json!(0.5),
                after: json!(0.45),
            }]
        );
    }

    #[test]
    fn nested_keys_use_dotted_paths() {
        let before = json!({"base": {"width": 0.5}, "bias": {"width": 0.02}});
        let after = json!({"base": {"width": 0.5}, "bias": {"width": 0.03}});
        let diff = diff_settings(&before, &after);
        assert_eq!(
            diff.entries,
            vec![DiffEntry::Changed {
                key: "bias.width".to_string(),
                before: json!(0.02),
                after: json!(0.03),
            }]
        );
    }

    #[test]
    fn added_and_removed_keys() {
        let before = json!({"width": 0.5});
        let after = json!({"gap": 0.2});
        let diff = diff_settings(&before, &after);
        assert_eq!(diff.entries.len(), 2);
        assert!(matches!(&diff.entries[0], DiffEntry::Added { key, .. } if key == "gap"));
        assert!(matches!(&diff.entries[1], DiffEntry::Removed { key, .. } if key == "width"));
    }

    #[test]
    fn display_is_one_line_per_entry() {
        let before = json!({"width": 0.5, "gap": 0.2});
        let after = json!({"width": 0.45});
        let rendered = diff_settings(&before, &after).to_string();
        assert_eq!(rendered.lines().count(), 2);
    }
}
