//! Query construction for document stores.
//!
//! A [`Query`] is an accumulated list of `(field path, operator, value)`
//! predicates, an optional single sort key, an offset and an optional limit.
//! Drivers apply them in that fixed order: filter, sort, offset, limit.
//!
//! # Query Building
//!
//! ```ignore
//! use treelayer::query::{Query, Operator, SortDirection};
//!
//! let query = Query::builder()
//!     .filter("settings.enabled", Operator::Eq, true)
//!     .order_by("rating", SortDirection::Desc)
//!     .offset(10)
//!     .limit(5)
//!     .build();
//! ```
//!
//! Operators can also be parsed from their usual spelling (`"=="`, `"<="`,
//! `"array-contains"`, ...) with [`str::parse`].

use std::{fmt, str::FromStr};

use bson::Bson;
use serde::{Deserialize, Serialize};

use crate::error::{DocumentStoreError, DocumentStoreResult};

/// Sort direction for query results.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortDirection {
    /// Ascending order (A to Z, 0 to 9, earliest to latest).
    #[default]
    Asc,
    /// Descending order (Z to A, 9 to 0, latest to earliest).
    Desc,
}

impl FromStr for SortDirection {
    type Err = DocumentStoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "asc" => Ok(SortDirection::Asc),
            "desc" => Ok(SortDirection::Desc),
            other => Err(DocumentStoreError::InvalidQuery(format!(
                "Unsupported sort direction {other}"
            ))),
        }
    }
}

/// Sort specification for query results.
#[derive(Debug, Clone, PartialEq)]
pub struct Sort {
    /// The dot-separated field path to sort by.
    pub field: String,
    /// The sort direction.
    pub direction: SortDirection,
}

/// Predicate operators.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operator {
    /// `==`, deep equality for documents and arrays.
    Eq,
    /// `!=`
    Ne,
    /// `<`
    Lt,
    /// `<=`
    Lte,
    /// `>`
    Gt,
    /// `>=`
    Gte,
    /// `in`, the expected value is an array containing the actual value.
    In,
    /// `not-in`, the expected value is an array not containing the actual value.
    NotIn,
    /// `array-contains`, the actual value is an array containing the expected value.
    ArrayContains,
    /// `array-contains-any`, the actual array shares an element with the expected array.
    ArrayContainsAny,
}

impl Operator {
    pub fn as_str(&self) -> &'static str {
        match self {
            Operator::Eq => "==",
            Operator::Ne => "!=",
            Operator::Lt => "<",
            Operator::Lte => "<=",
            Operator::Gt => ">",
            Operator::Gte => ">=",
            Operator::In => "in",
            Operator::NotIn => "not-in",
            Operator::ArrayContains => "array-contains",
            Operator::ArrayContainsAny => "array-contains-any",
        }
    }

    /// Whether the expected operand must be an array.
    pub fn takes_array_operand(&self) -> bool {
        matches!(self, Operator::In | Operator::NotIn | Operator::ArrayContainsAny)
    }
}

impl FromStr for Operator {
    type Err = DocumentStoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(match s {
            "==" => Operator::Eq,
            "!=" => Operator::Ne,
            "<" => Operator::Lt,
            "<=" => Operator::Lte,
            ">" => Operator::Gt,
            ">=" => Operator::Gte,
            "in" => Operator::In,
            "not-in" => Operator::NotIn,
            "array-contains" => Operator::ArrayContains,
            "array-contains-any" => Operator::ArrayContainsAny,
            other => {
                return Err(DocumentStoreError::InvalidQuery(format!(
                    "Unsupported operator {other}"
                )));
            }
        })
    }
}

impl fmt::Display for Operator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A single `(field path, operator, value)` condition.
#[derive(Debug, Clone, PartialEq)]
pub struct Predicate {
    pub field: String,
    pub op: Operator,
    pub value: Bson,
}

/// A structured query: predicates, sort, offset and limit.
///
/// The default query matches every document in snapshot order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Query {
    /// Conditions that must all hold.
    pub predicates: Vec<Predicate>,
    /// Optional sort key.
    pub sort: Option<Sort>,
    /// Number of matching documents to skip.
    pub offset: usize,
    /// Maximum number of documents to return.
    pub limit: Option<usize>,
}

impl Query {
    /// Creates a query matching everything.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a new query builder for fluent construction.
    pub fn builder() -> QueryBuilder {
        QueryBuilder::new()
    }

    /// Checks operand shapes before any document is examined.
    ///
    /// # Errors
    ///
    /// Returns [`DocumentStoreError::InvalidQuery`] when an array operator is
    /// given something other than an array.
    pub fn validate(&self) -> DocumentStoreResult<()> {
        for predicate in &self.predicates {
            if predicate.op.takes_array_operand() && !matches!(predicate.value, Bson::Array(_)) {
                return Err(DocumentStoreError::InvalidQuery(format!(
                    "operator '{}' on field '{}' requires an array value",
                    predicate.op, predicate.field
                )));
            }
        }

        Ok(())
    }
}

/// Fluent builder for [`Query`].
#[derive(Debug, Clone, Default)]
pub struct QueryBuilder {
    query: Query,
}

impl QueryBuilder {
    /// Creates a new query builder.
    pub fn new() -> Self {
        QueryBuilder { query: Query::default() }
    }

    /// Adds a predicate. Predicates accumulate and must all match.
    pub fn filter(
        mut self,
        field: impl Into<String>,
        op: Operator,
        value: impl Into<Bson>,
    ) -> Self {
        self.query.predicates.push(Predicate {
            field: field.into(),
            op,
            value: value.into(),
        });
        self
    }

    /// Sets the single sort key, replacing any previous one.
    pub fn order_by(mut self, field: impl Into<String>, direction: SortDirection) -> Self {
        self.query.sort = Some(Sort { field: field.into(), direction });
        self
    }

    /// Sets the maximum number of documents to return.
    pub fn limit(mut self, limit: usize) -> Self {
        self.query.limit = Some(limit);
        self
    }

    /// Sets the number of documents to skip.
    pub fn offset(mut self, offset: usize) -> Self {
        self.query.offset = offset;
        self
    }

    /// Builds and returns the final query.
    pub fn build(self) -> Query {
        self.query
    }
}

impl From<QueryBuilder> for Query {
    fn from(builder: QueryBuilder) -> Self {
        builder.build()
    }
}
