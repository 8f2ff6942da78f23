pub mod lottery_service;
pub mod user_service;

pub use lottery_service::*;
pub use user_service::*;
