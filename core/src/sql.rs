//! Injection-safe composition of relational queries.
//!
//! Filter state arrives from the request layer as arbitrary user text. All
//! queries are therefore assembled as an AST of typed predicate nodes over
//! engine-controlled column references, with every user value bound to a
//! named parameter. Rendering produces the SQL text and the parameter table
//! together, so a statement can never be built with a value spliced into the
//! query string.

use std::fmt::Write;

use rustc_hash::FxHashSet;

use crate::errors::{Result, ValcorCoreError};

/// A value bound to a named placeholder.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum Value {
    Text(String),
    Integer(i64),
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Value::Text(v.to_string())
    }
}

impl From<String> for Value {
    fn from(v: String) -> Self {
        Value::Text(v)
    }
}

impl From<i64> for Value {
    fn from(v: i64) -> Self {
        Value::Integer(v)
    }
}

/// The named parameter table of one statement.
///
/// Names are plain identifiers without the placeholder sigil; the renderer
/// prefixes `:` when it writes a placeholder. [`Params::bind`] generates a
/// fresh name from a prefix so independent clause builders cannot collide,
/// while [`Params::push`] keeps a caller-chosen name and fails on reuse.
#[derive(Debug, Default, Clone, PartialEq, Serialize)]
pub struct Params {
    entries: Vec<(String, Value)>,
}

impl Params {
    pub fn new() -> Params {
        Params::default()
    }

    /// Bind `value` under a generated unique name and return that name.
    pub fn bind(&mut self, prefix: &str, value: impl Into<Value>) -> String {
        let name = format!("{}_{}", prefix, self.entries.len());
        self.entries.push((name.clone(), value.into()));
        name
    }

    /// Bind `value` under the given name.
    pub fn push(&mut self, name: &str, value: impl Into<Value>) -> Result<String> {
        if self.entries.iter().any(|(n, _)| n == name) {
            return Err(ValcorCoreError::DuplicateParameterName(name.to_string()));
        }
        self.entries.push((name.to_string(), value.into()));
        Ok(name.to_string())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.entries.iter().map(|(n, v)| (n.as_str(), v))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Escape `%`, `_` and the escape character itself for use in a `LIKE`
/// pattern rendered with `ESCAPE '\'`.
fn escape_like(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        if c == '\\' || c == '%' || c == '_' {
            out.push('\\');
        }
        out.push(c);
    }
    out
}

/// One typed predicate node. Column references are engine-controlled
/// identifiers, never user input; all user values travel through [`Params`].
#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum Pred {
    /// `col = :p`
    Eq { col: String, param: String },
    /// `LOWER(col) = LOWER(:p)`, case-folded equality
    EqFold { col: String, param: String },
    /// `col IN (:p0, :p1, …)`
    InSet { col: String, params: Vec<String> },
    /// `col LIKE :p ESCAPE '\'`, with a pre-escaped bound pattern
    Like { col: String, param: String },
    /// `col NOT LIKE :p ESCAPE '\'`
    NotLike { col: String, param: String },
    /// `col REGEXP :p`
    Regex { col: String, param: String },
    /// `col NOT REGEXP :p`
    NotRegex { col: String, param: String },
    /// `left != right`, both sides column references
    NeColumns { left: String, right: String },
    /// `(p OR p OR …)`
    Any(Vec<Pred>),
    /// `(p AND p AND …)`
    All(Vec<Pred>),
    /// `0 = 1`, a deliberately empty result, e.g. for an explicitly empty
    /// source selection
    Never,
}

impl Pred {
    pub fn eq(col: &str, value: impl Into<Value>, params: &mut Params) -> Pred {
        Pred::Eq {
            col: col.to_string(),
            param: params.bind("p", value),
        }
    }

    pub fn eq_fold(col: &str, value: impl Into<Value>, params: &mut Params) -> Pred {
        Pred::EqFold {
            col: col.to_string(),
            param: params.bind("p", value),
        }
    }

    pub fn in_set<I, V>(col: &str, values: I, params: &mut Params) -> Result<Pred>
    where
        I: IntoIterator<Item = V>,
        V: Into<Value>,
    {
        let bound: Vec<String> = values
            .into_iter()
            .map(|v| params.bind("p", v))
            .collect();
        if bound.is_empty() {
            return Err(ValcorCoreError::EmptyValueSet);
        }
        Ok(Pred::InSet {
            col: col.to_string(),
            params: bound,
        })
    }

    /// `col` starts with `prefix`.
    pub fn starts_with(col: &str, prefix: &str, params: &mut Params) -> Pred {
        Pred::Like {
            col: col.to_string(),
            param: params.bind("p", format!("{}%", escape_like(prefix))),
        }
    }

    /// `col` does not start with `prefix`.
    pub fn not_starts_with(col: &str, prefix: &str, params: &mut Params) -> Pred {
        Pred::NotLike {
            col: col.to_string(),
            param: params.bind("p", format!("{}%", escape_like(prefix))),
        }
    }

    /// `col` contains `text` anywhere.
    pub fn contains(col: &str, text: &str, params: &mut Params) -> Pred {
        Pred::Like {
            col: col.to_string(),
            param: params.bind("p", format!("%{}%", escape_like(text))),
        }
    }

    pub fn not_contains(col: &str, text: &str, params: &mut Params) -> Pred {
        Pred::NotLike {
            col: col.to_string(),
            param: params.bind("p", format!("%{}%", escape_like(text))),
        }
    }

    /// `col` matches the regular expression `pattern`. The pattern is
    /// validated here so that an invalid expression fails at composition
    /// time instead of inside the store.
    pub fn matches(col: &str, pattern: &str, params: &mut Params) -> Result<Pred> {
        Self::check_pattern(pattern)?;
        Ok(Pred::Regex {
            col: col.to_string(),
            param: params.bind("p", pattern),
        })
    }

    pub fn not_matches(col: &str, pattern: &str, params: &mut Params) -> Result<Pred> {
        Self::check_pattern(pattern)?;
        Ok(Pred::NotRegex {
            col: col.to_string(),
            param: params.bind("p", pattern),
        })
    }

    fn check_pattern(pattern: &str) -> Result<()> {
        regex::Regex::new(pattern).map_err(|source| ValcorCoreError::InvalidRegexPredicate {
            pattern: pattern.to_string(),
            source,
        })?;
        Ok(())
    }

    pub fn ne_columns(left: &str, right: &str) -> Pred {
        Pred::NeColumns {
            left: left.to_string(),
            right: right.to_string(),
        }
    }

    pub fn any(branches: Vec<Pred>) -> Result<Pred> {
        if branches.is_empty() {
            return Err(ValcorCoreError::EmptyDisjunction);
        }
        Ok(Pred::Any(branches))
    }

    fn render(&self, out: &mut String) {
        match self {
            Pred::Eq { col, param } => {
                let _ = write!(out, "{} = :{}", col, param);
            }
            Pred::EqFold { col, param } => {
                let _ = write!(out, "LOWER({}) = LOWER(:{})", col, param);
            }
            Pred::InSet { col, params } => {
                let _ = write!(out, "{} IN (", col);
                for (i, p) in params.iter().enumerate() {
                    if i > 0 {
                        out.push_str(", ");
                    }
                    let _ = write!(out, ":{}", p);
                }
                out.push(')');
            }
            Pred::Like { col, param } => {
                let _ = write!(out, "{} LIKE :{} ESCAPE '\\'", col, param);
            }
            Pred::NotLike { col, param } => {
                let _ = write!(out, "{} NOT LIKE :{} ESCAPE '\\'", col, param);
            }
            Pred::Regex { col, param } => {
                let _ = write!(out, "{} REGEXP :{}", col, param);
            }
            Pred::NotRegex { col, param } => {
                let _ = write!(out, "{} NOT REGEXP :{}", col, param);
            }
            Pred::NeColumns { left, right } => {
                let _ = write!(out, "{} != {}", left, right);
            }
            Pred::Any(branches) => {
                out.push('(');
                for (i, b) in branches.iter().enumerate() {
                    if i > 0 {
                        out.push_str(" OR ");
                    }
                    b.render(out);
                }
                out.push(')');
            }
            Pred::All(parts) => {
                out.push('(');
                for (i, p) in parts.iter().enumerate() {
                    if i > 0 {
                        out.push_str(" AND ");
                    }
                    p.render(out);
                }
                out.push(')');
            }
            Pred::Never => out.push_str("0 = 1"),
        }
    }
}

/// A rendered statement: SQL text plus its named parameter table.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Statement {
    pub sql: String,
    pub params: Params,
}

/// Builder for one SELECT query.
#[derive(Debug, Clone, Default)]
pub struct SelectQuery {
    select: Vec<String>,
    from: String,
    joins: Vec<String>,
    preds: Vec<Pred>,
    group_by: Vec<String>,
    order_by: Vec<String>,
    limit: Option<u32>,
}

impl SelectQuery {
    pub fn from_table(from: &str) -> SelectQuery {
        SelectQuery {
            from: from.to_string(),
            ..SelectQuery::default()
        }
    }

    pub fn column(mut self, expr: &str) -> SelectQuery {
        self.select.push(expr.to_string());
        self
    }

    pub fn join(mut self, clause: &str) -> SelectQuery {
        self.joins.push(clause.to_string());
        self
    }

    pub fn joins<I: IntoIterator<Item = String>>(mut self, clauses: I) -> SelectQuery {
        self.joins.extend(clauses);
        self
    }

    pub fn filter(mut self, pred: Pred) -> SelectQuery {
        self.preds.push(pred);
        self
    }

    pub fn filters<I: IntoIterator<Item = Pred>>(mut self, preds: I) -> SelectQuery {
        self.preds.extend(preds);
        self
    }

    pub fn group_by(mut self, expr: &str) -> SelectQuery {
        self.group_by.push(expr.to_string());
        self
    }

    pub fn order_by(mut self, expr: &str) -> SelectQuery {
        self.order_by.push(expr.to_string());
        self
    }

    pub fn limit(mut self, limit: u32) -> SelectQuery {
        self.limit = Some(limit);
        self
    }

    fn render_sql(&self, out: &mut String) {
        out.push_str("SELECT ");
        for (i, s) in self.select.iter().enumerate() {
            if i > 0 {
                out.push_str(", ");
            }
            out.push_str(s);
        }
        let _ = write!(out, " FROM {}", self.from);
        for j in &self.joins {
            out.push(' ');
            out.push_str(j);
        }
        if !self.preds.is_empty() {
            out.push_str(" WHERE ");
            for (i, p) in self.preds.iter().enumerate() {
                if i > 0 {
                    out.push_str(" AND ");
                }
                p.render(out);
            }
        }
        if !self.group_by.is_empty() {
            out.push_str(" GROUP BY ");
            for (i, g) in self.group_by.iter().enumerate() {
                if i > 0 {
                    out.push_str(", ");
                }
                out.push_str(g);
            }
        }
        if !self.order_by.is_empty() {
            out.push_str(" ORDER BY ");
            for (i, o) in self.order_by.iter().enumerate() {
                if i > 0 {
                    out.push_str(", ");
                }
                out.push_str(o);
            }
        }
        if let Some(limit) = self.limit {
            let _ = write!(out, " LIMIT {}", limit);
        }
    }

    /// Render to a statement, consuming the parameter table the predicates
    /// were bound against.
    pub fn render(&self, params: Params) -> Statement {
        let mut sql = String::new();
        self.render_sql(&mut sql);
        debug_assert!(unique_names(&params));
        Statement { sql, params }
    }

    /// Render with a common-table-expression prelude: `WITH name AS (inner) …`.
    /// Both queries must have been composed against the same parameter table.
    pub fn render_with(&self, name: &str, inner: &SelectQuery, params: Params) -> Statement {
        let mut sql = String::new();
        let _ = write!(sql, "WITH {} AS (", name);
        inner.render_sql(&mut sql);
        sql.push_str(") ");
        self.render_sql(&mut sql);
        debug_assert!(unique_names(&params));
        Statement { sql, params }
    }
}

fn unique_names(params: &Params) -> bool {
    let mut seen = FxHashSet::default();
    params.iter().all(|(n, _)| seen.insert(n.to_string()))
}
