//! Query evaluation for in-memory document filtering.
//!
//! Field values are lifted into [`Comparable`], which normalizes every number
//! to `f64` and every point in time (native dates and timestamp documents) to
//! epoch milliseconds, so `==`, `<` and membership tests can be written once.

use std::{cmp::Ordering, collections::BTreeMap};

use bson::Bson;

use treelayer_core::{
    error::DocumentStoreResult,
    query::{Operator, Predicate, Query, SortDirection},
    record::Record,
    value::{Temporal, is_truthy},
};

/// Comparable representation of field values.
///
/// Types that are not valid field data collapse to `Null`.
#[derive(Debug)]
pub(crate) enum Comparable<'a> {
    Null,
    Bool(bool),
    /// Numbers, dates and timestamps (as epoch milliseconds).
    Number(f64),
    String(&'a str),
    Array(Vec<Comparable<'a>>),
    Map(BTreeMap<&'a str, Comparable<'a>>),
}

impl<'a> From<&'a Bson> for Comparable<'a> {
    fn from(bson: &'a Bson) -> Self {
        if let Some(temporal) = Temporal::recognize(bson) {
            return Comparable::Number(temporal.epoch_millis());
        }

        match bson {
            Bson::Null => Comparable::Null,
            Bson::Boolean(value) => Comparable::Bool(*value),
            Bson::Int32(value) => Comparable::Number(*value as f64),
            Bson::Int64(value) => Comparable::Number(*value as f64),
            Bson::Double(value) => Comparable::Number(*value),
            Bson::String(value) => Comparable::String(value),
            Bson::Array(arr) => Comparable::Array(arr.iter().map(Comparable::from).collect()),
            Bson::Document(doc) => Comparable::Map(
                doc.iter()
                    .map(|(k, v)| (k.as_str(), Comparable::from(v)))
                    .collect(),
            ),
            _ => Comparable::Null,
        }
    }
}

impl<'a> PartialEq for Comparable<'a> {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Comparable::Null, Comparable::Null) => true,
            (Comparable::Bool(a), Comparable::Bool(b)) => a == b,
            (Comparable::Number(a), Comparable::Number(b)) => a == b,
            (Comparable::String(a), Comparable::String(b)) => a == b,
            (Comparable::Array(a), Comparable::Array(b)) => a == b,
            (Comparable::Map(a), Comparable::Map(b)) => a == b,
            _ => false,
        }
    }
}

/// Ordering for `<`, `<=`, `>` and `>=`: only defined between scalars of the same kind.
impl<'a> PartialOrd for Comparable<'a> {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        match (self, other) {
            (Comparable::Bool(a), Comparable::Bool(b)) => a.partial_cmp(b),
            (Comparable::Number(a), Comparable::Number(b)) => a.partial_cmp(b),
            (Comparable::String(a), Comparable::String(b)) => a.partial_cmp(b),
            _ => None,
        }
    }
}

impl<'a> Comparable<'a> {
    fn rank(&self) -> u8 {
        match self {
            Comparable::Null => 0,
            Comparable::Bool(_) => 1,
            Comparable::Number(_) => 2,
            Comparable::String(_) => 3,
            Comparable::Array(_) => 4,
            Comparable::Map(_) => 5,
        }
    }

    /// Total order used for sorting: values of different kinds order by
    /// kind (null, bool, number, string, array, map). NaN sorts after every
    /// other number.
    pub fn sort_cmp(&self, other: &Self) -> Ordering {
        match (self, other) {
            (Comparable::Bool(a), Comparable::Bool(b)) => a.cmp(b),
            (Comparable::Number(a), Comparable::Number(b)) => match (a.is_nan(), b.is_nan()) {
                (true, true) => Ordering::Equal,
                (true, false) => Ordering::Greater,
                (false, true) => Ordering::Less,
                (false, false) => a.partial_cmp(b).unwrap_or(Ordering::Equal),
            },
            (Comparable::String(a), Comparable::String(b)) => a.cmp(b),
            (Comparable::Array(a), Comparable::Array(b)) => a
                .iter()
                .zip(b.iter())
                .map(|(x, y)| x.sort_cmp(y))
                .find(|ordering| ordering.is_ne())
                .unwrap_or_else(|| a.len().cmp(&b.len())),
            (Comparable::Map(a), Comparable::Map(b)) => a
                .iter()
                .zip(b.iter())
                .map(|((ka, va), (kb, vb))| ka.cmp(kb).then_with(|| va.sort_cmp(vb)))
                .find(|ordering| ordering.is_ne())
                .unwrap_or_else(|| a.len().cmp(&b.len())),
            _ => self.rank().cmp(&other.rank()),
        }
    }
}

/// Evaluates predicates against one record.
pub(crate) struct DocumentEvaluator<'a> {
    record: &'a Record,
}

impl<'a> DocumentEvaluator<'a> {
    pub fn new(record: &'a Record) -> Self {
        Self { record }
    }

    /// Whether every predicate holds.
    pub fn matches(&self, predicates: &[Predicate]) -> bool {
        predicates.iter().all(|predicate| self.evaluate(predicate))
    }

    /// Whether one predicate holds.
    ///
    /// A missing or null field never satisfies a predicate whose expected
    /// value is truthy, whatever the operator.
    pub fn evaluate(&self, predicate: &Predicate) -> bool {
        let null = Bson::Null;
        let actual = self.record.get(&predicate.field);
        let actual = actual.as_deref().unwrap_or(&null);

        if matches!(actual, Bson::Null) && is_truthy(&predicate.value) {
            return false;
        }

        let left = Comparable::from(actual);
        let right = Comparable::from(&predicate.value);

        match predicate.op {
            Operator::Eq => left == right,
            Operator::Ne => left != right,
            Operator::Lt => left.partial_cmp(&right) == Some(Ordering::Less),
            Operator::Lte => matches!(
                left.partial_cmp(&right),
                Some(Ordering::Less | Ordering::Equal)
            ),
            Operator::Gt => left.partial_cmp(&right) == Some(Ordering::Greater),
            Operator::Gte => matches!(
                left.partial_cmp(&right),
                Some(Ordering::Greater | Ordering::Equal)
            ),
            Operator::In => match &right {
                Comparable::Array(values) => values.iter().any(|value| value == &left),
                _ => false,
            },
            Operator::NotIn => match &right {
                Comparable::Array(values) => !values.iter().any(|value| value == &left),
                _ => false,
            },
            Operator::ArrayContains => match &left {
                Comparable::Array(items) => items.iter().any(|item| item == &right),
                _ => false,
            },
            Operator::ArrayContainsAny => match (&left, &right) {
                (Comparable::Array(items), Comparable::Array(values)) => {
                    values.iter().any(|value| items.iter().any(|item| item == value))
                }
                _ => false,
            },
        }
    }
}

/// Applies a query to a snapshot of records: filter, sort, offset, limit.
///
/// The sort is stable, so documents with equal keys keep snapshot order.
pub(crate) fn run_query(records: Vec<Record>, query: &Query) -> DocumentStoreResult<Vec<Record>> {
    query.validate()?;

    let mut matched = records
        .into_iter()
        .filter(|record| DocumentEvaluator::new(record).matches(&query.predicates))
        .collect::<Vec<_>>();

    if let Some(sort) = &query.sort {
        matched.sort_by(|a, b| {
            let left = a.get(&sort.field);
            let right = b.get(&sort.field);
            let left = left.as_deref().map(Comparable::from).unwrap_or(Comparable::Null);
            let right = right.as_deref().map(Comparable::from).unwrap_or(Comparable::Null);

            match sort.direction {
                SortDirection::Asc => left.sort_cmp(&right),
                SortDirection::Desc => right.sort_cmp(&left),
            }
        });
    }

    Ok(matched
        .into_iter()
        .skip(query.offset)
        .take(query.limit.unwrap_or(usize::MAX))
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use bson::{DateTime, bson, doc};
    use chrono::{TimeZone, Utc};
    use treelayer_core::error::DocumentStoreError;

    fn record(id: &str, data: bson::Document) -> Record {
        let at = Utc.timestamp_millis_opt(0).unwrap();
        Record {
            id: id.into(),
            created_at: at,
            updated_at: at,
            raw_path: format!("items/{id}"),
            data,
        }
    }

    fn holds(data: bson::Document, field: &str, op: Operator, value: Bson) -> bool {
        let record = record("x", data);
        DocumentEvaluator::new(&record).evaluate(&Predicate {
            field: field.into(),
            op,
            value,
        })
    }

    #[test]
    fn equality_is_deep() {
        let data = doc! { "tags": ["a", "b"], "settings": { "x": 1_i64 } };
        assert!(holds(data.clone(), "tags", Operator::Eq, bson!(["a", "b"])));
        assert!(!holds(data.clone(), "tags", Operator::Eq, bson!(["b", "a"])));
        assert!(holds(data.clone(), "settings", Operator::Eq, bson!({ "x": 1 })));
        assert!(holds(data, "settings.x", Operator::Eq, Bson::Double(1.0)));
    }

    #[test]
    fn ordering_requires_same_kind() {
        let data = doc! { "n": 5_i64, "s": "b" };
        assert!(holds(data.clone(), "n", Operator::Gt, bson!(4)));
        assert!(holds(data.clone(), "n", Operator::Lte, bson!(5.0)));
        assert!(holds(data.clone(), "s", Operator::Lt, bson!("c")));
        assert!(!holds(data.clone(), "n", Operator::Lt, bson!("z")));
        assert!(!holds(data, "s", Operator::Gt, bson!(1)));
    }

    #[test]
    fn missing_field_never_matches_truthy_expectation() {
        assert!(!holds(doc! {}, "flag", Operator::Ne, bson!(true)));
        assert!(!holds(doc! { "flag": Bson::Null }, "flag", Operator::NotIn, bson!([1])));
        assert!(holds(doc! {}, "flag", Operator::Eq, Bson::Null));
        assert!(holds(doc! {}, "flag", Operator::Ne, bson!(false)));
    }

    #[test]
    fn membership_operators() {
        let data = doc! { "city": "Oslo", "tags": ["a", "b"] };
        assert!(holds(data.clone(), "city", Operator::In, bson!(["Oslo", "Rome"])));
        assert!(!holds(data.clone(), "city", Operator::NotIn, bson!(["Oslo"])));
        assert!(holds(data.clone(), "tags", Operator::ArrayContains, bson!("b")));
        assert!(!holds(data.clone(), "city", Operator::ArrayContains, bson!("O")));
        assert!(holds(data.clone(), "tags", Operator::ArrayContainsAny, bson!(["z", "a"])));
        assert!(!holds(data, "tags", Operator::ArrayContainsAny, bson!(["z"])));
    }

    #[test]
    fn dates_and_timestamps_compare_as_instants() {
        let data = doc! { "at": DateTime::from_millis(2_000) };
        assert!(holds(data.clone(), "at", Operator::Gt, Bson::DateTime(DateTime::from_millis(1_000))));
        assert!(holds(
            data,
            "at",
            Operator::Eq,
            bson!({ "_seconds": 2, "_nanoseconds": 0 })
        ));
    }

    #[test]
    fn metadata_fields_are_queryable() {
        assert!(holds(doc! {}, "id", Operator::Eq, bson!("x")));
        assert!(holds(
            doc! {},
            "createdAt",
            Operator::Lte,
            Bson::DateTime(DateTime::from_millis(0))
        ));
    }

    #[test]
    fn sort_orders_by_kind_then_value_and_is_stable() {
        let records = vec![
            record("a", doc! { "v": "s" }),
            record("b", doc! { "v": 2_i64 }),
            record("c", doc! {}),
            record("d", doc! { "v": true }),
            record("e", doc! { "v": 1_i64 }),
            record("f", doc! { "v": 1.0 }),
        ];

        let query = Query::builder().order_by("v", SortDirection::Asc).build();
        let ids = run_query(records.clone(), &query)
            .unwrap()
            .into_iter()
            .map(|r| r.id)
            .collect::<Vec<_>>();
        assert_eq!(ids, ["c", "d", "e", "f", "b", "a"]);

        let query = Query::builder().order_by("v", SortDirection::Desc).build();
        let ids = run_query(records, &query)
            .unwrap()
            .into_iter()
            .map(|r| r.id)
            .collect::<Vec<_>>();
        assert_eq!(ids, ["a", "b", "e", "f", "d", "c"]);
    }

    #[test]
    fn nan_sorts_after_finite_numbers() {
        let records = (0..30)
            .map(|n| {
                let v = if n % 3 == 0 { f64::NAN } else { ((n * 7) % 11) as f64 };
                record(&format!("{n:02}"), doc! { "v": v })
            })
            .collect::<Vec<_>>();

        let query = Query::builder().order_by("v", SortDirection::Asc).build();
        let values = run_query(records, &query)
            .unwrap()
            .into_iter()
            .map(|r| r.data.get_f64("v").unwrap())
            .collect::<Vec<_>>();

        let (finite, nan): (Vec<f64>, Vec<f64>) = values.iter().partition(|v| !v.is_nan());
        assert_eq!(nan.len(), 10);
        assert!(values[..finite.len()].iter().all(|v| !v.is_nan()));
        assert!(finite.windows(2).all(|pair| pair[0] <= pair[1]));
    }

    #[test]
    fn offset_and_limit_apply_after_sorting() {
        let records = (0..5)
            .map(|n| record(&n.to_string(), doc! { "n": n as i64 }))
            .collect::<Vec<_>>();

        let query = Query::builder()
            .order_by("n", SortDirection::Desc)
            .offset(1)
            .limit(2)
            .build();
        let ids = run_query(records, &query)
            .unwrap()
            .into_iter()
            .map(|r| r.id)
            .collect::<Vec<_>>();
        assert_eq!(ids, ["3", "2"]);
    }

    #[test]
    fn invalid_operand_fails_before_evaluation() {
        let query = Query::builder().filter("a", Operator::In, "x").build();
        assert!(matches!(
            run_query(vec![], &query),
            Err(DocumentStoreError::InvalidQuery(_))
        ));
    }
}
