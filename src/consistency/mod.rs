pub mod resolver;

pub use resolver::{ConsistencyDefaults, ConsistencyResolver};
