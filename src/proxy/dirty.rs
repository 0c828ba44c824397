use std::collections::BTreeSet;

/// Set of property names mutated since load or last flush.
///
/// Marking is idempotent: repeated sets of the same property do not grow the
/// structure. The ordered view feeds the statement-cache key, so two distinct
/// mutation orders of the same properties share one prepared statement.
#[derive(Debug, Clone, Default)]
pub struct DirtyMap {
    properties: BTreeSet<String>,
}

impl DirtyMap {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn mark(&mut self, property: &str) {
        self.properties.insert(property.to_string());
    }

    pub fn is_dirty(&self, property: &str) -> bool {
        self.properties.contains(property)
    }

    pub fn is_empty(&self) -> bool {
        self.properties.is_empty()
    }

    pub fn len(&self) -> usize {
        self.properties.len()
    }

    /// Property names in lexicographic order.
    pub fn sorted(&self) -> Vec<String> {
        self.properties.iter().cloned().collect()
    }

    pub fn clear(&mut self) {
        self.properties.clear();
    }
}
