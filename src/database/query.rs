use serde::Serialize;
use serde_json::Value;

/// Operators understood by every store backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FilterOp {
    /// `$eq` - field equals the value
    Eq,
    /// `$in` - field equals one of the values (value is an array)
    In,
    /// `$any` - array field has an element containing the value
    Any,
    /// `$gte` - RFC 3339 timestamp field is at or after the value
    Gte,
    /// `$lte` - RFC 3339 timestamp field is at or before the value
    Lte,
}

impl FilterOp {
    pub fn as_str(&self) -> &'static str {
        match self {
            FilterOp::Eq => "$eq",
            FilterOp::In => "$in",
            FilterOp::Any => "$any",
            FilterOp::Gte => "$gte",
            FilterOp::Lte => "$lte",
        }
    }
}

#[derive(Debug, Clone)]
pub struct Condition {
    pub field: String,
    pub op: FilterOp,
    pub value: Value,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortDirection {
    Asc,
    Desc,
}

impl SortDirection {
    pub fn to_sql(&self) -> &'static str {
        match self {
            SortDirection::Asc => "ASC",
            SortDirection::Desc => "DESC",
        }
    }
}

/// How a sort field is compared.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortKind {
    Text,
    Timestamp,
}

#[derive(Debug, Clone)]
pub struct SortKey {
    pub field: String,
    pub direction: SortDirection,
    pub kind: SortKind,
}

/// Filter, order and window over one collection. Conditions are AND-ed;
/// ties in the ordering fall back to insertion order.
#[derive(Debug, Clone, Default)]
pub struct DocQuery {
    pub conditions: Vec<Condition>,
    pub order: Vec<SortKey>,
    pub limit: Option<u64>,
    pub offset: Option<u64>,
}

fn to_json<V: Serialize>(value: V) -> Value {
    serde_json::to_value(value).unwrap_or(Value::Null)
}

impl DocQuery {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn filter(mut self, field: impl Into<String>, op: FilterOp, value: Value) -> Self {
        self.conditions.push(Condition {
            field: field.into(),
            op,
            value,
        });
        self
    }

    pub fn eq<V: Serialize>(self, field: impl Into<String>, value: V) -> Self {
        self.filter(field, FilterOp::Eq, to_json(value))
    }

    /// Apply an equality filter only when a value is present.
    pub fn eq_opt<V: Serialize>(self, field: impl Into<String>, value: Option<V>) -> Self {
        match value {
            Some(v) => self.eq(field, v),
            None => self,
        }
    }

    pub fn is_in<V: Serialize>(self, field: impl Into<String>, values: &[V]) -> Self {
        self.filter(field, FilterOp::In, to_json(values))
    }

    pub fn any<V: Serialize>(self, field: impl Into<String>, value: V) -> Self {
        self.filter(field, FilterOp::Any, to_json(value))
    }

    pub fn gte<V: Serialize>(self, field: impl Into<String>, value: V) -> Self {
        self.filter(field, FilterOp::Gte, to_json(value))
    }

    pub fn lte<V: Serialize>(self, field: impl Into<String>, value: V) -> Self {
        self.filter(field, FilterOp::Lte, to_json(value))
    }

    pub fn sort(mut self, field: impl Into<String>, direction: SortDirection, kind: SortKind) -> Self {
        self.order.push(SortKey {
            field: field.into(),
            direction,
            kind,
        });
        self
    }

    pub fn newest_first(self, field: impl Into<String>) -> Self {
        self.sort(field, SortDirection::Desc, SortKind::Timestamp)
    }

    pub fn oldest_first(self, field: impl Into<String>) -> Self {
        self.sort(field, SortDirection::Asc, SortKind::Timestamp)
    }

    pub fn limit(mut self, limit: u64) -> Self {
        self.limit = Some(limit);
        self
    }

    pub fn offset(mut self, offset: u64) -> Self {
        self.offset = Some(offset);
        self
    }

    /// Same conditions, no ordering or window. Used for counts.
    pub fn unpaged(&self) -> Self {
        Self {
            conditions: self.conditions.clone(),
            ..Default::default()
        }
    }
}

/// Field names are interpolated into SQL, so only plain identifiers pass.
pub fn is_valid_field(name: &str) -> bool {
    !name.is_empty()
        && name.len() <= 64
        && name.chars().next().map(|c| c.is_ascii_alphabetic()).unwrap_or(false)
        && name.chars().all(|c| c.is_ascii_alphanumeric() || c == '_')
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use uuid::Uuid;

    #[test]
    fn builder_collects_conditions_in_order() {
        let id = Uuid::new_v4();
        let q = DocQuery::new()
            .eq("student", id)
            .eq_opt::<String>("academicTerm", None)
            .any("subjects", id)
            .newest_first("date")
            .limit(10)
            .offset(20);

        assert_eq!(q.conditions.len(), 2);
        assert_eq!(q.conditions[0].op, FilterOp::Eq);
        assert_eq!(q.conditions[0].value, json!(id.to_string()));
        assert_eq!(q.conditions[1].op, FilterOp::Any);
        assert_eq!(q.order[0].direction, SortDirection::Desc);

        let unpaged = q.unpaged();
        assert_eq!(unpaged.conditions.len(), 2);
        assert!(unpaged.order.is_empty());
        assert!(unpaged.limit.is_none());
    }

    #[test]
    fn validates_field_names() {
        assert!(is_valid_field("academicTerm"));
        assert!(is_valid_field("short_name"));
        assert!(!is_valid_field(""));
        assert!(!is_valid_field("1field"));
        assert!(!is_valid_field("data'); DROP TABLE users; --"));
        assert!(!is_valid_field("parents.parent"));
    }
}
