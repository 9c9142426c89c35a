use serde::Serialize;
use serde_json::Value;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Asc,
    Desc,
}

/// Equality filters plus optional ordering and limit: the full query
/// surface the backend store exposes.
#[derive(Debug, Clone, Default)]
pub struct Query {
    pub(crate) filters: Vec<(String, Value)>,
    pub(crate) order: Option<(String, Direction)>,
    pub(crate) limit: Option<u32>,
}

impl Query {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add an equality filter. Values must be scalars (strings, ids,
    /// numbers, booleans); anything else is rejected when the query runs.
    pub fn filter(mut self, field: &str, value: impl Serialize) -> Self {
        let value = serde_json::to_value(value).unwrap_or(Value::Null);
        self.filters.push((field.to_string(), value));
        self
    }

    pub fn order_asc(mut self, field: &str) -> Self {
        self.order = Some((field.to_string(), Direction::Asc));
        self
    }

    pub fn order_desc(mut self, field: &str) -> Self {
        self.order = Some((field.to_string(), Direction::Desc));
        self
    }

    pub fn limit(mut self, limit: u32) -> Self {
        self.limit = Some(limit);
        self
    }
}
