pub mod address;
pub mod code_generator;
pub mod draw;
pub mod signature;

pub use address::*;
pub use code_generator::{generate_lottery_code, generate_unique_lottery_code, is_valid_lottery_code};
pub use draw::select_winners;
pub use signature::{creation_message, verify_signature};
