pub mod audit;
pub mod check;
pub mod dispatch;
pub mod schema;
pub mod shared;
pub mod undo;
