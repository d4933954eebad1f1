//! Bound parameter collection
//!
//! Issues PostgreSQL-style `$n` placeholders and keeps the bound values in
//! placeholder order so they can be appended to the caller's argument list.

/// A value bound to one placeholder
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SqlValue {
    Text(String),
    BigInt(i64),
    TextArray(Vec<String>),
    BigIntArray(Vec<i64>),
}

/// Collects SQL parameters for one statement (maintains placeholder order)
#[derive(Debug)]
pub struct ParameterBuilder {
    start_index: usize,
    values: Vec<SqlValue>,
}

impl ParameterBuilder {
    /// Create a builder whose first placeholder is `$start_index`.
    ///
    /// Placeholders are 1-based, so a start index of 0 is treated as 1.
    pub fn new(start_index: usize) -> Self {
        Self {
            start_index: start_index.max(1),
            values: Vec::new(),
        }
    }

    /// Bind a scalar and return its placeholder
    pub fn add(&mut self, value: SqlValue) -> String {
        let token = format!("${}", self.next_index());
        self.values.push(value);
        token
    }

    /// Bind a whole list as a single array parameter (for `= ANY(...)` tests)
    pub fn add_array(&mut self, values: SqlValue) -> String {
        debug_assert!(matches!(
            values,
            SqlValue::TextArray(_) | SqlValue::BigIntArray(_)
        ));
        self.add(values)
    }

    /// Index the next placeholder would receive
    pub fn next_index(&self) -> usize {
        self.start_index + self.values.len()
    }

    /// Bound values in placeholder order
    pub fn values(&self) -> &[SqlValue] {
        &self.values
    }

    pub fn into_values(self) -> Vec<SqlValue> {
        self.values
    }
}
