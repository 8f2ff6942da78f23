pub mod lotteries;
pub mod lottery_participants;
pub mod lottery_prizes;
pub mod users;

pub use lotteries::LotteryStatus;
pub use lotteries as lottery_entity;
pub use lottery_participants as lottery_participant_entity;
pub use lottery_prizes as lottery_prize_entity;
pub use users as user_entity;
