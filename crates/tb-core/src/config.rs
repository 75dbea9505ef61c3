//! Project configuration: annotation classes (name + color) and the
//! key → tool-name table.
//!
//! Persisting the configuration is the host's job; this module only parses
//! and validates what the host hands over.
//!
//! JSON shape:
//!
//! ```json
//! {
//!   "classes": [{ "name": "car", "color": "#FF8800" }],
//!   "keybinds": { "r": "Rectangle", "h": "Pan" }
//! }
//! ```
//!
//! Classes are a list rather than a map so the first class (the default
//! for new annotations) is well defined.

use crate::model::Color;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use thiserror::Error;

/// Class used when no classes are configured.
pub const FALLBACK_CLASS: &str = "Default";

/// Errors from parsing or validating a configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("invalid color '{value}' for class '{class}'")]
    InvalidColor { class: String, value: String },

    #[error("class '{0}' is defined more than once")]
    DuplicateClass(String),

    #[error("class names must not be empty")]
    EmptyClassName,

    #[error("key '{0}' is bound more than once")]
    DuplicateKeybind(String),
}

/// One annotation class.
#[derive(Debug, Clone, PartialEq)]
pub struct ClassDef {
    pub name: String,
    pub color: Color,
}

/// Ordered class list with color lookup.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ClassPalette {
    classes: Vec<ClassDef>,
}

impl ClassPalette {
    /// Build a palette from `(name, hex color)` pairs, validating both.
    pub fn from_pairs<I, N, C>(pairs: I) -> Result<Self, ConfigError>
    where
        I: IntoIterator<Item = (N, C)>,
        N: Into<String>,
        C: AsRef<str>,
    {
        let mut palette = Self::default();
        for (name, color) in pairs {
            let name = name.into();
            let parsed = Color::from_hex(color.as_ref()).ok_or_else(|| ConfigError::InvalidColor {
                class: name.clone(),
                value: color.as_ref().to_string(),
            })?;
            palette.push(name, parsed)?;
        }
        Ok(palette)
    }

    pub fn push(&mut self, name: String, color: Color) -> Result<(), ConfigError> {
        if name.trim().is_empty() {
            return Err(ConfigError::EmptyClassName);
        }
        if self.contains(&name) {
            return Err(ConfigError::DuplicateClass(name));
        }
        self.classes.push(ClassDef { name, color });
        Ok(())
    }

    pub fn contains(&self, name: &str) -> bool {
        self.classes.iter().any(|c| c.name == name)
    }

    /// Color of `name`, or red for classes the palette doesn't know.
    pub fn color_of(&self, name: &str) -> Color {
        self.classes
            .iter()
            .find(|c| c.name == name)
            .map(|c| c.color)
            .unwrap_or(Color::RED)
    }

    /// Class new annotations receive when the user hasn't picked one.
    pub fn default_class(&self) -> &str {
        self.classes
            .first()
            .map(|c| c.name.as_str())
            .unwrap_or(FALLBACK_CLASS)
    }

    pub fn iter(&self) -> impl Iterator<Item = &ClassDef> + '_ {
        self.classes.iter()
    }

    pub fn len(&self) -> usize {
        self.classes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.classes.is_empty()
    }
}

/// Everything the configuration collaborator supplies.
#[derive(Debug, Clone, PartialEq)]
pub struct ProjectConfig {
    pub classes: ClassPalette,
    /// Lower-cased key → tool name (e.g. `"r" → "Rectangle"`).
    pub keybinds: HashMap<String, String>,
}

#[derive(Serialize, Deserialize)]
struct RawClass {
    name: String,
    color: String,
}

#[derive(Serialize, Deserialize)]
struct RawConfig {
    #[serde(default)]
    classes: Vec<RawClass>,
    #[serde(default)]
    keybinds: HashMap<String, String>,
}

impl Default for ProjectConfig {
    fn default() -> Self {
        let mut classes = ClassPalette::default();
        classes.classes.push(ClassDef {
            name: FALLBACK_CLASS.to_string(),
            color: Color::RED,
        });
        Self {
            classes,
            keybinds: default_keybinds(),
        }
    }
}

/// Stock bindings: R draws, H pans, S selects, A associates.
pub fn default_keybinds() -> HashMap<String, String> {
    [
        ("r", "Rectangle"),
        ("h", "Pan"),
        ("s", "Selector"),
        ("a", "Associator"),
    ]
    .into_iter()
    .map(|(k, v)| (k.to_string(), v.to_string()))
    .collect()
}

impl ProjectConfig {
    /// Parse and validate a configuration. A missing `keybinds` table falls
    /// back to [`default_keybinds`]; keys are lower-cased, and two keys that
    /// differ only in case are rejected.
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        let raw: RawConfig = serde_json::from_str(json)?;
        let classes = ClassPalette::from_pairs(raw.classes.into_iter().map(|c| (c.name, c.color)))?;
        let keybinds = if raw.keybinds.is_empty() {
            default_keybinds()
        } else {
            let mut keybinds = HashMap::with_capacity(raw.keybinds.len());
            for (key, tool) in raw.keybinds {
                let key = key.to_lowercase();
                if keybinds.contains_key(&key) {
                    return Err(ConfigError::DuplicateKeybind(key));
                }
                keybinds.insert(key, tool);
            }
            keybinds
        };
        log::debug!(
            "config: {} classes, {} keybinds",
            classes.len(),
            keybinds.len()
        );
        Ok(Self { classes, keybinds })
    }

    pub fn to_json(&self) -> Result<String, ConfigError> {
        let raw = RawConfig {
            classes: self
                .classes
                .iter()
                .map(|c| RawClass {
                    name: c.name.clone(),
                    color: c.color.to_hex(),
                })
                .collect(),
            keybinds: self.keybinds.clone(),
        };
        Ok(serde_json::to_string_pretty(&raw)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_full_config() {
        let json = r##"{
            "classes": [
                { "name": "car", "color": "#FF8800" },
                { "name": "plate", "color": "#0F0" }
            ],
            "keybinds": { "R": "Rectangle", "p": "Pan" }
        }"##;
        let cfg = ProjectConfig::from_json(json).unwrap();
        assert_eq!(cfg.classes.len(), 2);
        assert_eq!(cfg.classes.default_class(), "car");
        assert_eq!(cfg.classes.color_of("plate").to_hex(), "#00FF00");
        assert_eq!(cfg.keybinds.get("r").map(String::as_str), Some("Rectangle"));
        assert_eq!(cfg.keybinds.get("p").map(String::as_str), Some("Pan"));
    }

    #[test]
    fn missing_tables_use_defaults() {
        let cfg = ProjectConfig::from_json("{}").unwrap();
        assert!(cfg.classes.is_empty());
        assert_eq!(cfg.classes.default_class(), FALLBACK_CLASS);
        assert_eq!(cfg.keybinds, default_keybinds());
    }

    #[test]
    fn rejects_bad_color() {
        let json = r##"{ "classes": [{ "name": "car", "color": "orange" }] }"##;
        match ProjectConfig::from_json(json) {
            Err(ConfigError::InvalidColor { class, value }) => {
                assert_eq!(class, "car");
                assert_eq!(value, "orange");
            }
            other => panic!("expected InvalidColor, got {other:?}"),
        }
    }

    #[test]
    fn rejects_duplicate_and_empty_classes() {
        let dup = ClassPalette::from_pairs([("car", "#F00"), ("car", "#0F0")]);
        assert!(matches!(dup, Err(ConfigError::DuplicateClass(name)) if name == "car"));

        let empty = ClassPalette::from_pairs([(" ", "#F00")]);
        assert!(matches!(empty, Err(ConfigError::EmptyClassName)));
    }

    #[test]
    fn rejects_keys_differing_only_in_case() {
        let json = r#"{ "keybinds": { "R": "Pan", "r": "Rectangle" } }"#;
        match ProjectConfig::from_json(json) {
            Err(ConfigError::DuplicateKeybind(key)) => assert_eq!(key, "r"),
            other => panic!("expected DuplicateKeybind, got {other:?}"),
        }
    }

    #[test]
    fn rejects_malformed_json() {
        assert!(matches!(
            ProjectConfig::from_json("{ not json"),
            Err(ConfigError::Json(_))
        ));
    }

    #[test]
    fn unknown_class_color_falls_back() {
        let palette = ClassPalette::default();
        assert_eq!(palette.color_of("anything"), Color::RED);
    }

    #[test]
    fn json_roundtrip() {
        let cfg = ProjectConfig::default();
        let back = ProjectConfig::from_json(&cfg.to_json().unwrap()).unwrap();
        assert_eq!(back, cfg);
    }
}
