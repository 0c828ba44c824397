use crate::core::{ColumnValue, Result};
use crate::gateway::Row;
use crate::metadata::{EntityMeta, PrimaryKey};
use crate::proxy::Proxied;

/// Contract between a mapped struct and the persistence engine.
///
/// Implementations are generated by `#[derive(Entity)]`; hand-written impls
/// are possible but must keep `metadata()` consistent with the accessors.
pub trait Entity: Sized + Send + 'static {
    /// The generated dirty-tracking wrapper type for this entity.
    type Proxy: Proxied<Entity = Self>;

    fn metadata() -> &'static EntityMeta;

    /// Key component values in key order. Components may be null for an
    /// incompletely populated instance; operations validate before I/O.
    fn primary_key(&self) -> PrimaryKey;

    /// `(property name, value)` pairs for every non-counter property, in
    /// metadata order.
    fn to_columns(&self) -> Vec<(String, ColumnValue)>;

    /// Value of a single non-counter property; `None` for unknown names and
    /// for counter properties (those travel as deltas, never as values).
    fn column(&self, property: &str) -> Option<ColumnValue>;

    /// Writes one property from a column value; counters receive their base.
    fn set_column(&mut self, property: &str, value: ColumnValue) -> Result<()>;

    fn from_row(row: &Row) -> Result<Self>;

    /// Collection-typed properties whose containers saw structural mutation.
    fn dirty_collections(&self) -> Vec<String>;

    fn clear_collection_flags(&mut self);

    /// Nonzero accumulated counter deltas as `(property name, delta)`.
    fn counter_deltas(&self) -> Vec<(String, i64)>;

    /// Folds accumulated deltas into the known base after a successful flush.
    fn settle_counters(&mut self);

    /// True when every counter property carries neither base nor delta.
    fn counters_unset(&self) -> bool;
}
