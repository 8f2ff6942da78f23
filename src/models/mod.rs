pub mod common;
pub mod lottery;
pub mod pagination;

pub use common::*;
pub use lottery::*;
pub use pagination::*;
