use crate::core::{ColumnCodec, ColumnValue, PersistenceError, Result};
use std::collections::{BTreeMap, BTreeSet};

/// List-valued column with structural-change interception.
///
/// Mutating calls flag the container; read paths (len, get, contains,
/// iteration) never do. The flag is folded into the owning entity's dirty
/// set at merge time and reset on successful flush.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct List<T> {
    items: Vec<T>,
    touched: bool,
}

impl<T> List<T> {
    pub fn new() -> Self {
        Self {
            items: Vec::new(),
            touched: false,
        }
    }

    pub fn from_vec(items: Vec<T>) -> Self {
        Self {
            items,
            touched: false,
        }
    }

    pub fn push(&mut self, item: T) {
        self.items.push(item);
        self.touched = true;
    }

    pub fn insert(&mut self, index: usize, item: T) {
        self.items.insert(index, item);
        self.touched = true;
    }

    pub fn remove(&mut self, index: usize) -> T {
        self.touched = true;
        self.items.remove(index)
    }

    pub fn clear(&mut self) {
        self.items.clear();
        self.touched = true;
    }

    pub fn retain(&mut self, f: impl FnMut(&T) -> bool) {
        self.items.retain(f);
        self.touched = true;
    }

    /// Obtaining a mutable slot counts as a structural change.
    pub fn get_mut(&mut self, index: usize) -> Option<&mut T> {
        self.touched = true;
        self.items.get_mut(index)
    }

    pub fn get(&self, index: usize) -> Option<&T> {
        self.items.get(index)
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, T> {
        self.items.iter()
    }

    pub fn contains(&self, item: &T) -> bool
    where
        T: PartialEq,
    {
        self.items.contains(item)
    }

    pub fn is_touched(&self) -> bool {
        self.touched
    }

    pub fn reset_touched(&mut self) {
        self.touched = false;
    }
}

impl<T> From<Vec<T>> for List<T> {
    fn from(items: Vec<T>) -> Self {
        Self::from_vec(items)
    }
}

impl<T> FromIterator<T> for List<T> {
    fn from_iter<I: IntoIterator<Item = T>>(iter: I) -> Self {
        Self::from_vec(iter.into_iter().collect())
    }
}

impl<'a, T> IntoIterator for &'a List<T> {
    type Item = &'a T;
    type IntoIter = std::slice::Iter<'a, T>;

    fn into_iter(self) -> Self::IntoIter {
        self.items.iter()
    }
}

impl<T: ColumnCodec> ColumnCodec for List<T> {
    fn cql_type() -> &'static str {
        "list"
    }
    fn to_column(&self) -> ColumnValue {
        ColumnValue::List(self.items.iter().map(ColumnCodec::to_column).collect())
    }
    fn from_column(value: ColumnValue) -> Result<Self> {
        match value {
            ColumnValue::Null => Ok(Self::new()),
            ColumnValue::List(items) => Ok(Self::from_vec(
                items
                    .into_iter()
                    .map(T::from_column)
                    .collect::<Result<Vec<_>>>()?,
            )),
            other => Err(PersistenceError::Codec(format!(
                "expected list, got {}",
                other.type_name()
            ))),
        }
    }
}

/// Set-valued column with structural-change interception.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Set<T: Ord> {
    items: BTreeSet<T>,
    touched: bool,
}

impl<T: Ord> Set<T> {
    pub fn new() -> Self {
        Self {
            items: BTreeSet::new(),
            touched: false,
        }
    }

    pub fn insert(&mut self, item: T) -> bool {
        self.touched = true;
        self.items.insert(item)
    }

    pub fn remove(&mut self, item: &T) -> bool {
        self.touched = true;
        self.items.remove(item)
    }

    pub fn clear(&mut self) {
        self.items.clear();
        self.touched = true;
    }

    pub fn retain(&mut self, f: impl FnMut(&T) -> bool) {
        self.items.retain(f);
        self.touched = true;
    }

    pub fn contains(&self, item: &T) -> bool {
        self.items.contains(item)
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn iter(&self) -> std::collections::btree_set::Iter<'_, T> {
        self.items.iter()
    }

    pub fn is_touched(&self) -> bool {
        self.touched
    }

    pub fn reset_touched(&mut self) {
        self.touched = false;
    }
}

impl<T: Ord> FromIterator<T> for Set<T> {
    fn from_iter<I: IntoIterator<Item = T>>(iter: I) -> Self {
        Self {
            items: iter.into_iter().collect(),
            touched: false,
        }
    }
}

impl<T: ColumnCodec + Ord> ColumnCodec for Set<T> {
    fn cql_type() -> &'static str {
        "set"
    }
    fn to_column(&self) -> ColumnValue {
        ColumnValue::Set(self.items.iter().map(ColumnCodec::to_column).collect())
    }
    fn from_column(value: ColumnValue) -> Result<Self> {
        match value {
            ColumnValue::Null => Ok(Self::new()),
            ColumnValue::Set(items) | ColumnValue::List(items) => Ok(items
                .into_iter()
                .map(T::from_column)
                .collect::<Result<Self>>()?),
            other => Err(PersistenceError::Codec(format!(
                "expected set, got {}",
                other.type_name()
            ))),
        }
    }
}

/// Map-valued column with structural-change interception. Writing through
/// `get_mut` (the entry-set-value path) flags the container; lookups do not.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Map<K: Ord, V> {
    entries: BTreeMap<K, V>,
    touched: bool,
}

impl<K: Ord, V> Map<K, V> {
    pub fn new() -> Self {
        Self {
            entries: BTreeMap::new(),
            touched: false,
        }
    }

    pub fn insert(&mut self, key: K, value: V) -> Option<V> {
        self.touched = true;
        self.entries.insert(key, value)
    }

    pub fn remove(&mut self, key: &K) -> Option<V> {
        self.touched = true;
        self.entries.remove(key)
    }

    pub fn clear(&mut self) {
        self.entries.clear();
        self.touched = true;
    }

    pub fn get(&self, key: &K) -> Option<&V> {
        self.entries.get(key)
    }

    pub fn get_mut(&mut self, key: &K) -> Option<&mut V> {
        self.touched = true;
        self.entries.get_mut(key)
    }

    pub fn contains_key(&self, key: &K) -> bool {
        self.entries.contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> std::collections::btree_map::Iter<'_, K, V> {
        self.entries.iter()
    }

    pub fn is_touched(&self) -> bool {
        self.touched
    }

    pub fn reset_touched(&mut self) {
        self.touched = false;
    }
}

impl<K: Ord, V> FromIterator<(K, V)> for Map<K, V> {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self {
            entries: iter.into_iter().collect(),
            touched: false,
        }
    }
}

impl<K: ColumnCodec + Ord, V: ColumnCodec> ColumnCodec for Map<K, V> {
    fn cql_type() -> &'static str {
        "map"
    }
    fn to_column(&self) -> ColumnValue {
        ColumnValue::Map(
            self.entries
                .iter()
                .map(|(k, v)| (k.to_column(), v.to_column()))
                .collect(),
        )
    }
    fn from_column(value: ColumnValue) -> Result<Self> {
        match value {
            ColumnValue::Null => Ok(Self::new()),
            ColumnValue::Map(entries) => Ok(entries
                .into_iter()
                .map(|(k, v)| Ok((K::from_column(k)?, V::from_column(v)?)))
                .collect::<Result<Self>>()?),
            other => Err(PersistenceError::Codec(format!(
                "expected map, got {}",
                other.type_name()
            ))),
        }
    }
}
