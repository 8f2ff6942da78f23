use crate::entities::lottery_entity as lotteries;
use crate::error::{AppError, AppResult};
use rand::Rng;
use sea_orm::{ColumnTrait, ConnectionTrait, EntityTrait, PaginatorTrait, QueryFilter};

/// 抽奖码字符集，去掉了容易混淆的 0/O/1/I
pub const LOTTERY_CODE_CHARSET: &[u8] = b"23456789ABCDEFGHJKLMNPQRSTUVWXYZ";

pub const LOTTERY_CODE_LEN: usize = 8;

/// 生成8位抽奖码（不检查唯一性）
pub fn generate_lottery_code<R: Rng + ?Sized>(rng: &mut R) -> String {
    (0..LOTTERY_CODE_LEN)
        .map(|_| LOTTERY_CODE_CHARSET[rng.gen_range(0..LOTTERY_CODE_CHARSET.len())] as char)
        .collect()
}

/// 是否为合法格式的抽奖码
pub fn is_valid_lottery_code(code: &str) -> bool {
    code.len() == LOTTERY_CODE_LEN && code.bytes().all(|b| LOTTERY_CODE_CHARSET.contains(&b))
}

/// 生成唯一的抽奖码，超过 max_attempts 次仍冲突则返回内部错误
pub async fn generate_unique_lottery_code<C>(db: &C, max_attempts: u32) -> AppResult<String>
where
    C: ConnectionTrait,
{
    for attempt in 1..=max_attempts.max(1) {
        let code = generate_lottery_code(&mut rand::thread_rng());

        let exists = lotteries::Entity::find()
            .filter(lotteries::Column::Code.eq(code.as_str()))
            .count(db)
            .await?;

        if exists == 0 {
            return Ok(code);
        }
        log::warn!("Lottery code collision on attempt {attempt}: {code}");
    }

    Err(AppError::InternalError(format!(
        "Failed to generate a unique lottery code after {max_attempts} attempts"
    )))
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    #[test]
    fn test_generate_lottery_code() {
        let code = generate_lottery_code(&mut rand::thread_rng());
        assert_eq!(code.len(), 8);
        assert!(is_valid_lottery_code(&code));
    }

    #[test]
    fn test_code_never_contains_ambiguous_chars() {
        let mut rng = StdRng::seed_from_u64(7);
        for _ in 0..500 {
            let code = generate_lottery_code(&mut rng);
            assert!(!code.contains(['0', 'O', '1', 'I']), "ambiguous char in {code}");
        }
    }

    #[test]
    fn test_is_valid_lottery_code() {
        assert!(is_valid_lottery_code("ABCD2345"));
        assert!(!is_valid_lottery_code("ABCD234"));
        assert!(!is_valid_lottery_code("ABCD2340"));
        assert!(!is_valid_lottery_code("abcd2345"));
    }
}
