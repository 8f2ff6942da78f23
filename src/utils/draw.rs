use rand::Rng;

/// 按奖项顺序从参与者池中抽取中奖者
///
/// `slots[i]` 为第 i 个奖项（已按 level 升序）的名额。每次在剩余池中均匀随机取一个下标，
/// 与池尾交换后弹出（部分 Fisher–Yates），因此：
/// - 每位参与者最多中一个奖项
/// - 池耗尽后后续名额直接作废，不报错
/// - 返回的第 i 组即第 i 个奖项的中奖者
pub fn select_winners<T, R>(mut pool: Vec<T>, slots: &[usize], rng: &mut R) -> Vec<Vec<T>>
where
    R: Rng + ?Sized,
{
    let mut result = Vec::with_capacity(slots.len());

    for &amount in slots {
        let take = amount.min(pool.len());
        let mut winners = Vec::with_capacity(take);
        for _ in 0..take {
            let last = pool.len() - 1;
            let idx = rng.gen_range(0..pool.len());
            pool.swap(idx, last);
            if let Some(winner) = pool.pop() {
                winners.push(winner);
            }
        }
        result.push(winners);
    }

    result
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand::rngs::StdRng;
    use std::collections::HashSet;

    #[test]
    fn test_caps_by_participant_count() {
        let mut rng = StdRng::seed_from_u64(1);
        let groups = select_winners(vec!["a", "b", "c"], &[5], &mut rng);
        assert_eq!(groups.len(), 1);
        let mut won = groups[0].clone();
        won.sort();
        assert_eq!(won, vec!["a", "b", "c"]);
    }

    #[test]
    fn test_empty_pool_yields_empty_groups() {
        let mut rng = StdRng::seed_from_u64(2);
        let groups = select_winners(Vec::<i64>::new(), &[2, 3], &mut rng);
        assert_eq!(groups, vec![Vec::<i64>::new(), Vec::new()]);
    }

    #[test]
    fn test_pool_carries_over_between_prizes() {
        let mut rng = StdRng::seed_from_u64(3);
        let pool: Vec<i64> = (1..=10).collect();
        let groups = select_winners(pool, &[3, 4, 5], &mut rng);

        assert_eq!(groups[0].len(), 3);
        assert_eq!(groups[1].len(), 4);
        // 只剩 3 人
        assert_eq!(groups[2].len(), 3);

        let all: Vec<i64> = groups.iter().flatten().copied().collect();
        let distinct: HashSet<i64> = all.iter().copied().collect();
        assert_eq!(all.len(), distinct.len());
        assert!(distinct.iter().all(|id| (1..=10).contains(id)));
    }

    #[test]
    fn test_sizes_match_amounts_when_pool_is_large() {
        for seed in 0..20 {
            let mut rng = StdRng::seed_from_u64(seed);
            let pool: Vec<u32> = (0..100).collect();
            let groups = select_winners(pool, &[1, 2, 3], &mut rng);
            let sizes: Vec<usize> = groups.iter().map(Vec::len).collect();
            assert_eq!(sizes, vec![1, 2, 3]);
        }
    }

    #[test]
    fn test_selection_is_roughly_uniform() {
        // 5 人抽 1 个名额，每人中奖频率应接近 1/5
        let mut rng = StdRng::seed_from_u64(42);
        let mut counts = [0usize; 5];
        let rounds = 20_000;
        for _ in 0..rounds {
            let groups = select_winners(vec![0usize, 1, 2, 3, 4], &[1], &mut rng);
            counts[groups[0][0]] += 1;
        }
        for c in counts {
            let freq = c as f64 / rounds as f64;
            assert!((freq - 0.2).abs() < 0.02, "biased frequency {freq}");
        }
    }

    #[test]
    fn test_zero_slots() {
        let mut rng = StdRng::seed_from_u64(5);
        let groups = select_winners(vec![1, 2], &[0, 1], &mut rng);
        assert!(groups[0].is_empty());
        assert_eq!(groups[1].len(), 1);
    }
}
