//! Sort keys and the full stable sort used by the sort pass.
//!
//! A sort model is an ordered chain of [`SortKey`]s. Each key extracts a
//! [`SortValue`] from a row's data, compares with either a custom comparator
//! or [`default_compare`], and applies its direction. Rows that compare equal
//! on every key keep their filtered order.

use std::cmp::Ordering;
use std::fmt;
use std::sync::Arc;

use crate::node::RowNode;

/// Sort direction of one key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SortDirection {
    /// Smallest values first.
    #[default]
    Ascending,
    /// Largest values first.
    Descending,
}

/// A value extracted from a row for comparison.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum SortValue {
    /// Missing value. Sorts before everything else when ascending.
    #[default]
    None,
    /// Boolean value.
    Bool(bool),
    /// Integer value.
    Int(i64),
    /// Floating point value.
    Float(f64),
    /// Text value.
    Text(String),
}

impl SortValue {
    fn rank(&self) -> u8 {
        match self {
            Self::None => 0,
            Self::Bool(_) => 1,
            Self::Int(_) | Self::Float(_) => 2,
            Self::Text(_) => 3,
        }
    }
}

impl From<bool> for SortValue {
    fn from(value: bool) -> Self {
        Self::Bool(value)
    }
}

impl From<i64> for SortValue {
    fn from(value: i64) -> Self {
        Self::Int(value)
    }
}

impl From<i32> for SortValue {
    fn from(value: i32) -> Self {
        Self::Int(i64::from(value))
    }
}

impl From<f64> for SortValue {
    fn from(value: f64) -> Self {
        Self::Float(value)
    }
}

impl From<&str> for SortValue {
    fn from(value: &str) -> Self {
        Self::Text(value.to_string())
    }
}

impl From<String> for SortValue {
    fn from(value: String) -> Self {
        Self::Text(value)
    }
}

impl<V: Into<SortValue>> From<Option<V>> for SortValue {
    fn from(value: Option<V>) -> Self {
        value.map_or(Self::None, Into::into)
    }
}

/// Compares two sort values.
///
/// Missing values sort first, integers and floats compare numerically, and
/// values of unrelated kinds order by kind (bool, number, text).
pub fn default_compare(a: &SortValue, b: &SortValue) -> Ordering {
    match (a, b) {
        (SortValue::Bool(x), SortValue::Bool(y)) => x.cmp(y),
        (SortValue::Int(x), SortValue::Int(y)) => x.cmp(y),
        (SortValue::Float(x), SortValue::Float(y)) => x.total_cmp(y),
        (SortValue::Int(x), SortValue::Float(y)) => (*x as f64).total_cmp(y),
        (SortValue::Float(x), SortValue::Int(y)) => x.total_cmp(&(*y as f64)),
        (SortValue::Text(x), SortValue::Text(y)) => x.cmp(y),
        _ => a.rank().cmp(&b.rank()),
    }
}

/// Extracts the value a key sorts on.
pub type ValueGetter<T> = Arc<dyn Fn(&T) -> SortValue + Send + Sync>;

/// Custom comparison of two extracted values.
pub type ValueComparator = Arc<dyn Fn(&SortValue, &SortValue) -> Ordering + Send + Sync>;

/// One entry of the sort model.
pub struct SortKey<T> {
    direction: SortDirection,
    value: ValueGetter<T>,
    comparator: Option<ValueComparator>,
}

impl<T> Clone for SortKey<T> {
    fn clone(&self) -> Self {
        Self {
            direction: self.direction,
            value: self.value.clone(),
            comparator: self.comparator.clone(),
        }
    }
}

impl<T> fmt::Debug for SortKey<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SortKey")
            .field("direction", &self.direction)
            .field("custom_comparator", &self.comparator.is_some())
            .finish()
    }
}

impl<T> SortKey<T> {
    /// Creates an ascending key over the extracted value.
    pub fn new<F>(value: F) -> Self
    where
        F: Fn(&T) -> SortValue + Send + Sync + 'static,
    {
        Self {
            direction: SortDirection::Ascending,
            value: Arc::new(value),
            comparator: None,
        }
    }

    /// Creates an ascending key.
    pub fn ascending<F>(value: F) -> Self
    where
        F: Fn(&T) -> SortValue + Send + Sync + 'static,
    {
        Self::new(value)
    }

    /// Creates a descending key.
    pub fn descending<F>(value: F) -> Self
    where
        F: Fn(&T) -> SortValue + Send + Sync + 'static,
    {
        Self::new(value).with_direction(SortDirection::Descending)
    }

    /// Sets the direction.
    pub fn with_direction(mut self, direction: SortDirection) -> Self {
        self.direction = direction;
        self
    }

    /// Replaces [`default_compare`] with a custom comparator.
    pub fn with_comparator<F>(mut self, comparator: F) -> Self
    where
        F: Fn(&SortValue, &SortValue) -> Ordering + Send + Sync + 'static,
    {
        self.comparator = Some(Arc::new(comparator));
        self
    }

    /// The direction of this key.
    pub fn direction(&self) -> SortDirection {
        self.direction
    }

    fn extract(&self, node: &RowNode<T>) -> SortValue {
        node.data()
            .map_or(SortValue::None, |data| (self.value)(&data))
    }

    fn compare(&self, a: &SortValue, b: &SortValue) -> Ordering {
        let ordering = match &self.comparator {
            Some(comparator) => comparator(a, b),
            None => default_compare(a, b),
        };
        match self.direction {
            SortDirection::Ascending => ordering,
            SortDirection::Descending => ordering.reverse(),
        }
    }
}

/// Returns a sorted copy of `nodes` according to `keys`.
///
/// Values are extracted once per node. The sort is stable: nodes that compare
/// equal on every key keep their relative order from `nodes`.
pub fn sort_nodes<T>(nodes: &[Arc<RowNode<T>>], keys: &[SortKey<T>]) -> Vec<Arc<RowNode<T>>> {
    let mut decorated: Vec<(Vec<SortValue>, &Arc<RowNode<T>>)> = nodes
        .iter()
        .map(|node| (keys.iter().map(|key| key.extract(node)).collect(), node))
        .collect();

    decorated.sort_by(|(values_a, _), (values_b, _)| {
        keys.iter()
            .zip(values_a.iter().zip(values_b.iter()))
            .map(|(key, (a, b))| key.compare(a, b))
            .find(|ordering| ordering.is_ne())
            .unwrap_or(Ordering::Equal)
    });

    decorated.into_iter().map(|(_, node)| node.clone()).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::node::NodeInit;

    #[derive(Debug)]
    struct Athlete {
        name: &'static str,
        country: &'static str,
        gold: i64,
    }

    fn nodes(rows: Vec<Athlete>) -> Vec<Arc<RowNode<Athlete>>> {
        rows.into_iter()
            .enumerate()
            .map(|(i, row)| {
                RowNode::new(NodeInit {
                    id: Some(i.to_string()),
                    key: None,
                    level: 0,
                    group: false,
                    leaf_group: false,
                    parent: None,
                    data: Some(Arc::new(row)),
                    row_height: 25.0,
                    selectable: true,
                })
            })
            .collect()
    }

    fn names(nodes: &[Arc<RowNode<Athlete>>]) -> Vec<&'static str> {
        nodes.iter().map(|n| n.data().unwrap().name).collect()
    }

    fn sample() -> Vec<Arc<RowNode<Athlete>>> {
        nodes(vec![
            Athlete { name: "Phelps", country: "US", gold: 8 },
            Athlete { name: "Hoy", country: "GB", gold: 3 },
            Athlete { name: "Lochte", country: "US", gold: 3 },
            Athlete { name: "Bolt", country: "JM", gold: 3 },
            Athlete { name: "Adlington", country: "GB", gold: 2 },
        ])
    }

    #[test]
    fn test_default_compare() {
        assert_eq!(default_compare(&SortValue::None, &SortValue::Int(0)), Ordering::Less);
        assert_eq!(default_compare(&SortValue::Int(2), &SortValue::Float(1.5)), Ordering::Greater);
        assert_eq!(
            default_compare(&SortValue::from("a"), &SortValue::from("b")),
            Ordering::Less
        );
        assert_eq!(default_compare(&SortValue::None, &SortValue::None), Ordering::Equal);
    }

    #[test]
    fn test_sort_is_stable_for_equal_keys() {
        let rows = sample();
        let keys = vec![SortKey::ascending(|a: &Athlete| SortValue::Int(a.gold))];
        let sorted = sort_nodes(&rows, &keys);

        // The three athletes with 3 golds keep their input order.
        assert_eq!(names(&sorted), vec!["Adlington", "Hoy", "Lochte", "Bolt", "Phelps"]);
    }

    #[test]
    fn test_descending_is_still_stable() {
        let rows = sample();
        let keys = vec![SortKey::descending(|a: &Athlete| SortValue::Int(a.gold))];
        let sorted = sort_nodes(&rows, &keys);

        assert_eq!(names(&sorted), vec!["Phelps", "Hoy", "Lochte", "Bolt", "Adlington"]);
    }

    #[test]
    fn test_multi_key_sort() {
        let rows = sample();
        let keys = vec![
            SortKey::ascending(|a: &Athlete| SortValue::from(a.country)),
            SortKey::descending(|a: &Athlete| SortValue::Int(a.gold)),
        ];
        let sorted = sort_nodes(&rows, &keys);

        assert_eq!(names(&sorted), vec!["Hoy", "Adlington", "Bolt", "Phelps", "Lochte"]);
    }

    #[test]
    fn test_custom_comparator() {
        let rows = sample();
        let by_name_length = SortKey::ascending(|a: &Athlete| SortValue::from(a.name))
            .with_comparator(|a, b| match (a, b) {
                (SortValue::Text(x), SortValue::Text(y)) => x.len().cmp(&y.len()),
                _ => Ordering::Equal,
            });
        let sorted = sort_nodes(&rows, &[by_name_length]);

        assert_eq!(names(&sorted), vec!["Hoy", "Bolt", "Phelps", "Lochte", "Adlington"]);
    }
}
