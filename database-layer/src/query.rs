// Query builder shared by the REST and in-memory table clients
use serde_json::Value as JsonValue;
use std::cmp::Ordering;

/// Comparison operators understood by the table API
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FilterOp {
    Eq,
    Neq,
    Gt,
    Gte,
    Lt,
    Lte,
}

impl FilterOp {
    fn as_str(self) -> &'static str {
        match self {
            FilterOp::Eq => "eq",
            FilterOp::Neq => "neq",
            FilterOp::Gt => "gt",
            FilterOp::Gte => "gte",
            FilterOp::Lt => "lt",
            FilterOp::Lte => "lte",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Filter {
    pub column: String,
    pub op: FilterOp,
    pub value: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Order {
    pub column: String,
    pub descending: bool,
}

/// Filter + order + limit, rendered as PostgREST query parameters
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Query {
    pub filters: Vec<Filter>,
    pub order: Vec<Order>,
    pub limit: Option<usize>,
}

impl Query {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn filter(mut self, column: &str, op: FilterOp, value: impl ToString) -> Self {
        self.filters.push(Filter {
            column: column.to_string(),
            op,
            value: value.to_string(),
        });
        self
    }

    pub fn eq(self, column: &str, value: impl ToString) -> Self {
        self.filter(column, FilterOp::Eq, value)
    }

    pub fn gte(self, column: &str, value: impl ToString) -> Self {
        self.filter(column, FilterOp::Gte, value)
    }

    pub fn lte(self, column: &str, value: impl ToString) -> Self {
        self.filter(column, FilterOp::Lte, value)
    }

    pub fn order_by(mut self, column: &str, descending: bool) -> Self {
        self.order.push(Order {
            column: column.to_string(),
            descending,
        });
        self
    }

    pub fn limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }

    pub fn is_unfiltered(&self) -> bool {
        self.filters.is_empty()
    }

    /// Render as `column=op.value`, `order=a.desc,b.asc`, `limit=n`
    pub fn to_params(&self) -> Vec<(String, String)> {
        let mut params: Vec<(String, String)> = self
            .filters
            .iter()
            .map(|f| (f.column.clone(), format!("{}.{}", f.op.as_str(), f.value)))
            .collect();

        if !self.order.is_empty() {
            let order = self
                .order
                .iter()
                .map(|o| format!("{}.{}", o.column, if o.descending { "desc" } else { "asc" }))
                .collect::<Vec<_>>()
                .join(",");
            params.push(("order".to_string(), order));
        }

        if let Some(limit) = self.limit {
            params.push(("limit".to_string(), limit.to_string()));
        }

        params
    }

    /// Evaluate the filters against a JSON row
    pub fn matches(&self, row: &JsonValue) -> bool {
        self.filters.iter().all(|f| {
            let cell = row.get(&f.column).filter(|v| !v.is_null());
            match cell {
                None => f.op == FilterOp::Neq,
                Some(cell) => {
                    let ordering = compare_cell(cell, &f.value);
                    match f.op {
                        FilterOp::Eq => ordering == Ordering::Equal,
                        FilterOp::Neq => ordering != Ordering::Equal,
                        FilterOp::Gt => ordering == Ordering::Greater,
                        FilterOp::Gte => ordering != Ordering::Less,
                        FilterOp::Lt => ordering == Ordering::Less,
                        FilterOp::Lte => ordering != Ordering::Greater,
                    }
                }
            }
        })
    }

    /// Filter, sort and truncate rows the way the table API would
    pub fn apply(&self, rows: &[JsonValue]) -> Vec<JsonValue> {
        let mut selected: Vec<JsonValue> = rows.iter().filter(|r| self.matches(r)).cloned().collect();

        if !self.order.is_empty() {
            selected.sort_by(|a, b| {
                for order in &self.order {
                    let ordering =
                        compare_rows(a.get(&order.column), b.get(&order.column), order.descending);
                    if ordering != Ordering::Equal {
                        return ordering;
                    }
                }
                Ordering::Equal
            });
        }

        if let Some(limit) = self.limit {
            selected.truncate(limit);
        }

        selected
    }
}

fn cell_text(cell: &JsonValue) -> String {
    match cell {
        JsonValue::String(s) => s.clone(),
        other => other.to_string(),
    }
}

fn compare_cell(cell: &JsonValue, value: &str) -> Ordering {
    let text = cell_text(cell);
    match (text.parse::<f64>(), value.parse::<f64>()) {
        (Ok(a), Ok(b)) => a.partial_cmp(&b).unwrap_or(Ordering::Equal),
        _ => text.as_str().cmp(value),
    }
}

fn compare_rows(a: Option<&JsonValue>, b: Option<&JsonValue>, descending: bool) -> Ordering {
    let a = a.filter(|v| !v.is_null());
    let b = b.filter(|v| !v.is_null());
    match (a, b) {
        (Some(a), Some(b)) if descending => compare_cell(a, &cell_text(b)).reverse(),
        (Some(a), Some(b)) => compare_cell(a, &cell_text(b)),
        // nulls sort last in both directions
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    }
}
