pub mod collections;
pub mod dirty;
pub mod managed;

pub use collections::{List, Map, Set};
pub use dirty::DirtyMap;
pub use managed::{ManagedState, Proxied, ProxyStatus};
