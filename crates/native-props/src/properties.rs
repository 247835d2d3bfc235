//! Property environment for expression evaluation.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// A single property value: a scalar string or an ordered list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum PropertyValue {
    Scalar(String),
    List(Vec<String>),
}

impl PropertyValue {
    /// Items of this value in list context.
    ///
    /// Scalars are split on commas with surrounding whitespace trimmed and
    /// empty items dropped, so `"a, b,"` yields `["a", "b"]`.
    pub fn items(&self) -> Vec<String> {
        match self {
            PropertyValue::Scalar(s) => s
                .split(',')
                .map(str::trim)
                .filter(|item| !item.is_empty())
                .map(str::to_string)
                .collect(),
            PropertyValue::List(items) => items.clone(),
        }
    }
}

/// Immutable-by-convention mapping of property names to values.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Properties {
    values: BTreeMap<String, PropertyValue>,
}

impl Properties {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set a scalar property, replacing any previous value.
    pub fn set(&mut self, name: impl Into<String>, value: impl Into<String>) {
        self.values
            .insert(name.into(), PropertyValue::Scalar(value.into()));
    }

    /// Set a list property, replacing any previous value.
    pub fn set_list<I, S>(&mut self, name: impl Into<String>, items: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let items = items.into_iter().map(Into::into).collect();
        self.values.insert(name.into(), PropertyValue::List(items));
    }

    pub fn get(&self, name: &str) -> Option<&PropertyValue> {
        self.values.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.values.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Overlay `other` on top of `self`; entries in `other` win.
    pub fn extend(&mut self, other: Properties) {
        self.values.extend(other.values);
    }
}
