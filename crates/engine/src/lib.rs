pub mod cell;
pub mod error;
pub mod history;
pub mod locks;
pub mod session;
pub mod table;

pub use cell::CellValue;
pub use error::ModelError;
pub use history::{History, Snapshot};
pub use locks::LockSet;
pub use session::Session;
pub use table::Table;
