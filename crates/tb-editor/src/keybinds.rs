//! Key → tool table.
//!
//! Keys are matched case-insensitively against `KeyboardEvent.key`. The
//! table is built from the configuration's `{key → tool name}` map; names
//! that don't match a tool are skipped. When two keys differ only in case,
//! the one that sorts first (`"R"` before `"r"`) wins.

use crate::tools::ToolKind;
use std::collections::HashMap;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeybindMap {
    bindings: HashMap<String, ToolKind>,
}

impl Default for KeybindMap {
    fn default() -> Self {
        let mut map = Self::empty();
        for kind in ToolKind::ALL {
            map.bind(kind.default_key(), kind);
        }
        map
    }
}

impl KeybindMap {
    pub fn empty() -> Self {
        Self {
            bindings: HashMap::new(),
        }
    }

    /// Build from a `{key → tool name}` map.
    pub fn from_names<'a, I>(names: I) -> Self
    where
        I: IntoIterator<Item = (&'a String, &'a String)>,
    {
        let mut names: Vec<_> = names.into_iter().collect();
        names.sort();
        let mut map = Self::empty();
        for (key, tool_name) in names {
            let Some(kind) = ToolKind::from_name(tool_name) else {
                log::warn!("keybinds: '{key}' is bound to unknown tool '{tool_name}'");
                continue;
            };
            if let Some(kept) = map.resolve(key) {
                log::warn!(
                    "keybinds: '{key}' → '{tool_name}' ignored, key already bound to '{}'",
                    kept.name()
                );
                continue;
            }
            map.bind(key, kind);
        }
        map
    }

    pub fn bind(&mut self, key: &str, tool: ToolKind) {
        self.bindings.insert(key.to_lowercase(), tool);
    }

    /// Tool bound to `key`, if any.
    pub fn resolve(&self, key: &str) -> Option<ToolKind> {
        self.bindings.get(&key.to_lowercase()).copied()
    }

    /// First key (alphabetically) bound to `tool`, for toolbar hints.
    pub fn key_for(&self, tool: ToolKind) -> Option<&str> {
        self.bindings
            .iter()
            .filter(|(_, kind)| **kind == tool)
            .map(|(key, _)| key.as_str())
            .min()
    }

    pub fn len(&self) -> usize {
        self.bindings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bindings.is_empty()
    }
}
