//! Named parameters and their compiled, positional form

use crate::dialect::{PlaceholderStyle, SqlDialect};
use serde_json::{Map, Value};
use std::collections::HashSet;

/// Named values bound to the `:name` placeholders of one predicate
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Params(Vec<(String, Value)>);

impl Params {
    pub fn new() -> Self {
        Self(Vec::new())
    }

    /// Bind `name`, replacing an earlier binding of the same name
    pub fn with(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.insert(name.into(), value.into());
        self
    }

    pub fn insert(&mut self, name: String, value: Value) {
        match self.0.iter_mut().find(|(existing, _)| *existing == name) {
            Some(entry) => entry.1 = value,
            None => self.0.push((name, value)),
        }
    }

    pub fn get(&self, name: &str) -> Option<&Value> {
        self.0
            .iter()
            .find(|(existing, _)| existing == name)
            .map(|(_, value)| value)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.0.iter().map(|(name, value)| (name.as_str(), value))
    }
}

impl<K, V, const N: usize> From<[(K, V); N]> for Params
where
    K: Into<String>,
    V: Into<Value>,
{
    fn from(entries: [(K, V); N]) -> Self {
        entries.into_iter().collect()
    }
}

impl From<Map<String, Value>> for Params {
    fn from(map: Map<String, Value>) -> Self {
        map.into_iter().collect()
    }
}

impl<K, V> FromIterator<(K, V)> for Params
where
    K: Into<String>,
    V: Into<Value>,
{
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut params = Params::new();
        for (name, value) in iter {
            params.insert(name.into(), value.into());
        }
        params
    }
}

/// Parameter bookkeeping for one statement being compiled.
///
/// Every value gets a name that is unique across the statement, and each
/// placeholder occurrence is recorded so positional dialects bind in order.
#[derive(Debug)]
pub struct ParamScope<'d> {
    dialect: &'d dyn SqlDialect,
    bindings: Vec<(String, Value)>,
    taken: HashSet<String>,
    positions: Vec<usize>,
}

impl<'d> ParamScope<'d> {
    pub fn new(dialect: &'d dyn SqlDialect) -> Self {
        Self {
            dialect,
            bindings: Vec::new(),
            taken: HashSet::new(),
            positions: Vec::new(),
        }
    }

    pub fn dialect(&self) -> &'d dyn SqlDialect {
        self.dialect
    }

    /// Register `value` under a statement-unique name derived from `name`
    pub fn register(&mut self, name: &str, value: Value) -> usize {
        let unique = self.unique_name(name);
        self.taken.insert(unique.clone());
        self.bindings.push((unique, value));
        self.bindings.len() - 1
    }

    /// Emit the dialect placeholder for a registered binding
    pub fn placeholder(&mut self, index: usize) -> String {
        match self.dialect.placeholder_style() {
            PlaceholderStyle::Numbered => self.dialect.placeholder(index + 1),
            PlaceholderStyle::Positional => {
                self.positions.push(index);
                self.dialect.placeholder(self.positions.len())
            }
        }
    }

    /// Register and emit in one step
    pub fn bind(&mut self, name: &str, value: Value) -> String {
        let index = self.register(name, value);
        self.placeholder(index)
    }

    fn unique_name(&self, name: &str) -> String {
        if !self.taken.contains(name) {
            return name.to_string();
        }

        let mut suffix = 1;
        loop {
            let candidate = format!("{}_{}", name, suffix);
            if !self.taken.contains(&candidate) {
                return candidate;
            }
            suffix += 1;
        }
    }

    pub fn finish(self, sql: String, returns_rows: bool) -> CompiledQuery {
        let values = match self.dialect.placeholder_style() {
            PlaceholderStyle::Numbered => self
                .bindings
                .iter()
                .map(|(_, value)| value.clone())
                .collect(),
            PlaceholderStyle::Positional => self
                .positions
                .iter()
                .map(|index| self.bindings[*index].1.clone())
                .collect(),
        };

        CompiledQuery {
            sql,
            parameters: self.bindings,
            values,
            returns_rows,
        }
    }
}

/// SQL text plus the values to bind, ready for a driver
#[derive(Debug, Clone, PartialEq)]
pub struct CompiledQuery {
    sql: String,
    parameters: Vec<(String, Value)>,
    values: Vec<Value>,
    returns_rows: bool,
}

impl CompiledQuery {
    pub fn sql(&self) -> &str {
        &self.sql
    }

    /// Unique parameter names and their values, in first-use order
    pub fn parameters(&self) -> &[(String, Value)] {
        &self.parameters
    }

    pub fn parameter(&self, name: &str) -> Option<&Value> {
        self.parameters
            .iter()
            .find(|(existing, _)| existing == name)
            .map(|(_, value)| value)
    }

    /// Values in the order the driver binds them
    pub fn values(&self) -> &[Value] {
        &self.values
    }

    /// Whether executing this statement yields a row set
    pub fn returns_rows(&self) -> bool {
        self.returns_rows
    }
}

const ROW_RETURNING_KEYWORDS: &[&str] = &[
    "SELECT", "WITH", "SHOW", "PRAGMA", "EXPLAIN", "VALUES", "DESCRIBE", "DESC", "TABLE",
];

/// Decide from the text whether literal SQL yields rows
pub fn returns_rows(sql: &str) -> bool {
    let trimmed = sql.trim_start_matches(|c: char| c.is_whitespace() || c == '(');
    let keyword: String = trimmed
        .chars()
        .take_while(|c| c.is_ascii_alphabetic())
        .collect::<String>()
        .to_ascii_uppercase();

    if ROW_RETURNING_KEYWORDS.contains(&keyword.as_str()) {
        return true;
    }

    contains_keyword(sql, "RETURNING")
}

/// Whether `keyword` appears as a whole word outside quoted text
fn contains_keyword(sql: &str, keyword: &str) -> bool {
    let bytes = sql.as_bytes();
    let mut i = 0;

    while i < bytes.len() {
        match bytes[i] {
            quote @ (b'\'' | b'"' | b'`') => {
                i += 1;
                while i < bytes.len() && bytes[i] != quote {
                    i += 1;
                }
                i += 1;
            }
            b if b.is_ascii_alphanumeric() || b == b'_' => {
                let start = i;
                while i < bytes.len() && (bytes[i].is_ascii_alphanumeric() || bytes[i] == b'_') {
                    i += 1;
                }
                if sql[start..i].eq_ignore_ascii_case(keyword) {
                    return true;
                }
            }
            _ => i += 1,
        }
    }
    false
}
