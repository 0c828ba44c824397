use crate::core::{AccessKind, ConsistencyLevel, SerialConsistency};
use crate::metadata::{EntityMeta, PropertyMeta};
use crate::options::Options;

/// Global read/write defaults, validated present at manager construction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ConsistencyDefaults {
    pub read: ConsistencyLevel,
    pub write: ConsistencyLevel,
}

impl ConsistencyDefaults {
    pub fn level_for(&self, kind: AccessKind) -> ConsistencyLevel {
        match kind {
            AccessKind::Read => self.read,
            AccessKind::Write => self.write,
        }
    }
}

/// Resolves the effective consistency level for one operation.
///
/// Precedence, first match wins: call-level override, active batch-session
/// level, per-property default, per-entity default, global default. Counter
/// properties resolve through their own descriptor, independent of the
/// non-counter properties of the same entity.
///
/// Stateless; a copy is handed to every persistence context rather than
/// referenced through a process-wide instance.
#[derive(Debug, Clone, Copy)]
pub struct ConsistencyResolver {
    defaults: ConsistencyDefaults,
}

impl ConsistencyResolver {
    pub fn new(defaults: ConsistencyDefaults) -> Self {
        Self { defaults }
    }

    pub fn resolve(
        &self,
        kind: AccessKind,
        meta: &EntityMeta,
        property: Option<&PropertyMeta>,
        options: &Options,
        batch_level: Option<ConsistencyLevel>,
    ) -> ConsistencyLevel {
        options
            .consistency
            .or(batch_level)
            .or_else(|| property.and_then(|p| p.consistency_for(kind)))
            .or_else(|| meta.consistency_for(kind))
            .unwrap_or_else(|| self.defaults.level_for(kind))
    }

    /// Serial consistency applies only when the call carries one; there is
    /// no fallback chain for it.
    pub fn resolve_serial(&self, options: &Options) -> Option<SerialConsistency> {
        options.serial_consistency
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::metadata::{PropertyKind, PropertyMeta};

    fn resolver() -> ConsistencyResolver {
        ConsistencyResolver::new(ConsistencyDefaults {
            read: ConsistencyLevel::One,
            write: ConsistencyLevel::Two,
        })
    }

    fn meta() -> EntityMeta {
        EntityMeta::builder("User", "users")
            .write_consistency(ConsistencyLevel::Three)
            .property(PropertyMeta::new("id", "id", "bigint", PropertyKind::PartitionKey))
            .property(
                PropertyMeta::new("name", "name", "text", PropertyKind::Regular)
                    .write_consistency(ConsistencyLevel::Quorum),
            )
            .build()
            .unwrap()
    }

    #[test]
    fn call_level_override_wins_over_everything() {
        let meta = meta();
        let property = meta.property("name");
        let options = Options::new().consistency(ConsistencyLevel::All);
        let level = resolver().resolve(
            AccessKind::Write,
            &meta,
            property,
            &options,
            Some(ConsistencyLevel::EachQuorum),
        );
        assert_eq!(level, ConsistencyLevel::All);
    }

    #[test]
    fn precedence_chain_falls_through_layer_by_layer() {
        let meta = meta();
        let property = meta.property("name");
        let r = resolver();

        // batch level beats property and entity defaults
        let level = r.resolve(
            AccessKind::Write,
            &meta,
            property,
            &Options::new(),
            Some(ConsistencyLevel::EachQuorum),
        );
        assert_eq!(level, ConsistencyLevel::EachQuorum);

        // then the property default
        let level = r.resolve(AccessKind::Write, &meta, property, &Options::new(), None);
        assert_eq!(level, ConsistencyLevel::Quorum);

        // then the entity default
        let level = r.resolve(AccessKind::Write, &meta, None, &Options::new(), None);
        assert_eq!(level, ConsistencyLevel::Three);

        // finally the global default
        let bare = EntityMeta::builder("Bare", "bare")
            .property(PropertyMeta::new("id", "id", "bigint", PropertyKind::PartitionKey))
            .build()
            .unwrap();
        let level = r.resolve(AccessKind::Write, &bare, None, &Options::new(), None);
        assert_eq!(level, ConsistencyLevel::Two);
        let level = r.resolve(AccessKind::Read, &bare, None, &Options::new(), None);
        assert_eq!(level, ConsistencyLevel::One);
    }
}
