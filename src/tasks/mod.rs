//! Background tasks.
//!
//! Currently only the stale-draw monitor: a lottery stays in `DRAWING` only if the
//! process died between claiming the draw and committing the result. Such lotteries
//! are reported, never modified, since the participation set may already be gone.
//! Call `spawn_all` once during startup.

use crate::config::LotteryConfig;
use crate::services::LotteryService;

/// Spawn all background tasks. Detaches via `tokio::spawn`; does not block.
pub fn spawn_all(lottery_service: LotteryService, config: LotteryConfig) {
    // 卡在 DRAWING 的抽奖巡检
    {
        let svc = lottery_service.clone();
        let stale_after = chrono::Duration::seconds(config.stale_draw_after_secs.max(0));
        let interval = std::time::Duration::from_secs(config.stale_check_interval_secs.max(1));
        tokio::spawn(async move {
            loop {
                match svc.find_stale_draws(stale_after).await {
                    Ok(list) => {
                        for lottery in list {
                            log::error!(
                                "Lottery {} stuck in DRAWING since {:?}, manual recovery required",
                                lottery.code,
                                lottery.updated_at
                            );
                        }
                    }
                    Err(e) => log::error!("Failed to check stale draws: {e:?}"),
                }
                tokio::time::sleep(interval).await;
            }
        });
    }
}
