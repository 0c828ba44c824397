pub mod dao;
pub mod session;

pub use dao::DaoGateway;
pub use session::{PreparedStatement, Row, Session};
