use rand::Rng;

const BASE36_UPPER: &[u8] = b"0123456789ABCDEFGHIJKLMNOPQRSTUVWXYZ";
const CODE_PREFIX_LEN: usize = 8;
const CODE_SUFFIX_LEN: usize = 4;

/// 抽奖与优惠码使用的随机源
///
/// 生产环境使用 [`ThreadRewardRng`]，测试中可替换为固定序列。
pub trait RewardRng: Send + Sync {
    /// 在 `[0, len)` 内均匀取一个下标
    fn pick_index(&self, len: usize) -> usize;

    /// 生成 4 位大写 base-36 后缀
    fn code_suffix(&self) -> String;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct ThreadRewardRng;

impl RewardRng for ThreadRewardRng {
    fn pick_index(&self, len: usize) -> usize {
        if len == 0 {
            return 0;
        }
        rand::thread_rng().gen_range(0..len)
    }

    fn code_suffix(&self) -> String {
        random_base36(CODE_SUFFIX_LEN)
    }
}

/// 生成指定长度的大写 base-36 字符串
pub fn random_base36(len: usize) -> String {
    let mut rng = rand::thread_rng();
    (0..len)
        .map(|_| BASE36_UPPER[rng.gen_range(0..BASE36_UPPER.len())] as char)
        .collect()
}

/// 优惠码格式: 奖品名(空格换成下划线, 大写, 取前8个字符) + "-" + 后缀
/// 例: "5% OFF" + "7QZ2" -> "5%_OFF-7QZ2"
pub fn coupon_code(prize_name: &str, suffix: &str) -> String {
    let prefix: String = prize_name
        .replace(' ', "_")
        .to_uppercase()
        .chars()
        .take(CODE_PREFIX_LEN)
        .collect();
    format!("{prefix}-{}", suffix.to_uppercase())
}

/// 用户输入的优惠码统一转大写后精确匹配
pub fn normalize_coupon_code(code: &str) -> String {
    code.trim().to_uppercase()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_coupon_code_format() {
        assert_eq!(coupon_code("5% OFF", "7qz2"), "5%_OFF-7QZ2");
        assert_eq!(coupon_code("LKR 100 OFF", "AB12"), "LKR_100_-AB12");
        assert_eq!(coupon_code("FREE DRINK", "0000"), "FREE_DRI-0000");
    }

    #[test]
    fn test_suffix_is_base36_upper() {
        let rng = ThreadRewardRng;
        for _ in 0..100 {
            let suffix = rng.code_suffix();
            assert_eq!(suffix.len(), 4);
            assert!(
                suffix
                    .chars()
                    .all(|c| c.is_ascii_digit() || c.is_ascii_uppercase())
            );
        }
    }

    #[test]
    fn test_pick_index_in_range() {
        let rng = ThreadRewardRng;
        for _ in 0..200 {
            assert!(rng.pick_index(4) < 4);
        }
        assert_eq!(rng.pick_index(1), 0);
    }

    #[test]
    fn test_normalize_coupon_code() {
        assert_eq!(normalize_coupon_code("  5%_off-7qz2 "), "5%_OFF-7QZ2");
    }
}
