pub mod contracts;
pub mod entity;
pub mod key;
pub mod property;
pub mod registry;

pub use contracts::Entity;
pub use entity::{EntityMeta, EntityMetaBuilder};
pub use key::{KeyShape, PrimaryKey};
pub use property::{PropertyKind, PropertyMeta};
pub use registry::MetadataRegistry;
