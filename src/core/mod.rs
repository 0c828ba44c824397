pub mod consistency;
pub mod error;
pub mod value;

pub use consistency::{AccessKind, ConsistencyLevel, SerialConsistency};
pub use error::{PersistenceError, Result};
pub use value::{ColumnCodec, ColumnValue};
