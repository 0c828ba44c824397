use crate::core::{ColumnCodec, ColumnValue, PersistenceError, Result};

/// Counter column state on a mapped entity: an optional base value (known
/// after a load) plus the locally accumulated signed delta.
///
/// Mutations never overwrite; they accumulate into the delta, which the
/// flush turns into a single `c = c + ?` statement.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Counter {
    base: Option<i64>,
    delta: i64,
}

impl Counter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_base(base: i64) -> Self {
        Self {
            base: Some(base),
            delta: 0,
        }
    }

    pub fn incr(&mut self) {
        self.delta += 1;
    }

    pub fn decr(&mut self) {
        self.delta -= 1;
    }

    pub fn incr_by(&mut self, amount: i64) {
        self.delta += amount;
    }

    pub fn decr_by(&mut self, amount: i64) {
        self.delta -= amount;
    }

    /// Locally known value: base plus delta when the base is known, the
    /// bare delta when only mutations happened, `None` when untouched.
    pub fn get(&self) -> Option<i64> {
        match self.base {
            Some(base) => Some(base + self.delta),
            None if self.delta != 0 => Some(self.delta),
            None => None,
        }
    }

    pub fn base(&self) -> Option<i64> {
        self.base
    }

    pub fn delta(&self) -> i64 {
        self.delta
    }

    /// Neither a known base nor a pending delta.
    pub fn is_unset(&self) -> bool {
        self.base.is_none() && self.delta == 0
    }

    /// Folds the pending delta into the base after a successful flush.
    pub fn settle(&mut self) {
        if let Some(value) = self.get() {
            self.base = Some(value);
        }
        self.delta = 0;
    }
}

impl ColumnCodec for Counter {
    fn cql_type() -> &'static str {
        "counter"
    }

    fn to_column(&self) -> ColumnValue {
        match self.get() {
            Some(value) => ColumnValue::Counter(value),
            None => ColumnValue::Null,
        }
    }

    fn from_column(value: ColumnValue) -> Result<Self> {
        match value {
            ColumnValue::Null => Ok(Self::new()),
            ColumnValue::Counter(v) | ColumnValue::BigInt(v) => Ok(Self::with_base(v)),
            ColumnValue::Int(v) => Ok(Self::with_base(i64::from(v))),
            other => Err(PersistenceError::Codec(format!(
                "expected counter, got {}",
                other.type_name()
            ))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn delta_accumulates_signed() {
        let mut c = Counter::new();
        c.incr();
        c.incr_by(10);
        c.decr_by(4);
        assert_eq!(c.delta(), 7);
        assert_eq!(c.get(), Some(7));
        assert!(c.base().is_none());
    }

    #[test]
    fn base_plus_delta_when_both_known() {
        let mut c = Counter::with_base(100);
        c.decr();
        assert_eq!(c.get(), Some(99));
    }

    #[test]
    fn untouched_counter_is_unset() {
        let c = Counter::new();
        assert!(c.is_unset());
        assert_eq!(c.get(), None);
    }

    #[test]
    fn settle_folds_delta_into_base() {
        let mut c = Counter::with_base(5);
        c.incr_by(3);
        c.settle();
        assert_eq!(c.base(), Some(8));
        assert_eq!(c.delta(), 0);
    }
}
