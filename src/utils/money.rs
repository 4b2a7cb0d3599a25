/// 金额统一保留两位小数
pub fn round_money(amount: f64) -> f64 {
    (amount * 100.0).round() / 100.0
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_round_money() {
        assert_eq!(round_money(50.000000001), 50.0);
        assert_eq!(round_money(12.346), 12.35);
        assert_eq!(round_money(0.0), 0.0);
    }
}
