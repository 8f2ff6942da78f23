pub mod participation_set;
pub mod redis_set;

pub use participation_set::*;
pub use redis_set::*;
