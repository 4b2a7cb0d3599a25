use chrono::{DateTime, Utc};
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::error::{AppError, AppResult};
use crate::models::{Coupon, NewCoupon};
use crate::utils::RewardRng;

/// 奖品类型：中奖 / 未中奖
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum PrizeKind {
    Win,
    Lose,
}

/// 优惠方式
/// - flat: 固定金额
/// - percentage: 按比例 (0.05 = 5%)
/// - free_item: 免费单品，抵扣金额由配置决定
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, EnumIter, DeriveActiveEnum, Serialize, Deserialize, ToSchema,
)]
#[sea_orm(rs_type = "String", db_type = "String(Some(20))")]
#[serde(rename_all = "snake_case")]
pub enum DiscountType {
    #[sea_orm(string_value = "flat")]
    Flat,
    #[sea_orm(string_value = "percentage")]
    Percentage,
    #[sea_orm(string_value = "free_item")]
    FreeItem,
}

impl std::fmt::Display for DiscountType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DiscountType::Flat => write!(f, "flat"),
            DiscountType::Percentage => write!(f, "percentage"),
            DiscountType::FreeItem => write!(f, "free_item"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct DiscountSpec {
    pub discount_type: DiscountType,
    pub value: f64,
}

/// 奖品配置（启动时加载，运行期只读）
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct Prize {
    #[schema(example = "5% OFF")]
    pub name: String,
    pub kind: PrizeKind,
    #[schema(example = "Get 5% off!")]
    pub description: String,
    /// 仅中奖奖品携带
    #[serde(default)]
    pub discount: Option<DiscountSpec>,
}

impl Prize {
    fn win(name: &str, description: &str, discount_type: DiscountType, value: f64) -> Self {
        Self {
            name: name.to_string(),
            kind: PrizeKind::Win,
            description: description.to_string(),
            discount: Some(DiscountSpec {
                discount_type,
                value,
            }),
        }
    }

    fn lose(name: &str, description: &str) -> Self {
        Self {
            name: name.to_string(),
            kind: PrizeKind::Lose,
            description: description.to_string(),
            discount: None,
        }
    }

    pub fn is_win(&self) -> bool {
        self.kind == PrizeKind::Win
    }
}

/// 奖品表
///
/// 构造时校验：
/// - 至少一个奖品，名称非空且不重复
/// - 恰好一个未中奖项
/// - 中奖项必须带有效的优惠描述，未中奖项不得带优惠
#[derive(Debug, Clone)]
pub struct PrizeTable {
    prizes: Vec<Prize>,
    lose_index: usize,
}

impl PrizeTable {
    pub fn new(prizes: Vec<Prize>) -> AppResult<Self> {
        if prizes.is_empty() {
            return Err(AppError::ConfigError("Prize table is empty".into()));
        }

        let mut lose_index = None;
        for (idx, prize) in prizes.iter().enumerate() {
            if prize.name.trim().is_empty() {
                return Err(AppError::ConfigError("Prize name must not be empty".into()));
            }
            if prizes[..idx].iter().any(|p| p.name == prize.name) {
                return Err(AppError::ConfigError(format!(
                    "Duplicate prize name: {}",
                    prize.name
                )));
            }
            match (prize.kind, &prize.discount) {
                (PrizeKind::Lose, None) => {
                    if lose_index.replace(idx).is_some() {
                        return Err(AppError::ConfigError(
                            "Prize table must contain exactly one lose entry".into(),
                        ));
                    }
                }
                (PrizeKind::Lose, Some(_)) => {
                    return Err(AppError::ConfigError(format!(
                        "Lose prize {} must not carry a discount",
                        prize.name
                    )));
                }
                (PrizeKind::Win, None) => {
                    return Err(AppError::ConfigError(format!(
                        "Win prize {} is missing a discount",
                        prize.name
                    )));
                }
                (PrizeKind::Win, Some(d)) => {
                    let valid = d.value.is_finite()
                        && d.value > 0.0
                        && (d.discount_type != DiscountType::Percentage || d.value <= 1.0);
                    if !valid {
                        return Err(AppError::ConfigError(format!(
                            "Invalid discount value {} for prize {}",
                            d.value, prize.name
                        )));
                    }
                }
            }
        }

        let lose_index = lose_index.ok_or_else(|| {
            AppError::ConfigError("Prize table must contain exactly one lose entry".into())
        })?;

        Ok(Self { prizes, lose_index })
    }

    /// 内置奖品表
    pub fn standard() -> Self {
        Self {
            prizes: vec![
                Prize::win("LKR 100 OFF", "A small boost!", DiscountType::Flat, 100.0),
                Prize::win("FREE DRINK", "Enjoy a free drink!", DiscountType::FreeItem, 1.0),
                Prize::win("5% OFF", "Get 5% off!", DiscountType::Percentage, 0.05),
                Prize::lose("TRY AGAIN", "Better luck tomorrow!"),
            ],
            lose_index: 3,
        }
    }

    /// 配置为空时退回内置奖品表
    pub fn from_config(prizes: &[Prize]) -> AppResult<Self> {
        if prizes.is_empty() {
            Ok(Self::standard())
        } else {
            Self::new(prizes.to_vec())
        }
    }

    pub fn prizes(&self) -> &[Prize] {
        &self.prizes
    }

    pub fn len(&self) -> usize {
        self.prizes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.prizes.is_empty()
    }

    pub fn lose_prize(&self) -> &Prize {
        &self.prizes[self.lose_index]
    }

    /// 等概率抽取一个奖品
    pub fn draw(&self, rng: &dyn RewardRng) -> &Prize {
        let idx = rng.pick_index(self.prizes.len());
        self.prizes.get(idx).unwrap_or_else(|| self.lose_prize())
    }
}

/// 用户抽奖账本（每个用户一条）
#[derive(Debug, Clone, PartialEq)]
pub struct LedgerEntry {
    pub user_id: i64,
    pub last_played_at: DateTime<Utc>,
    pub last_prize_name: String,
}

/// 一次抽奖要落库的内容：账本条件写入 + 中奖时的优惠券，两者同成同败
#[derive(Debug, Clone, PartialEq)]
pub struct PlayRecord {
    pub user_id: i64,
    /// 抽奖前读到的 last_played_at，首次抽奖为 None
    pub previous: Option<DateTime<Utc>>,
    pub played_at: DateTime<Utc>,
    pub prize_name: String,
    pub coupon: Option<NewCoupon>,
}

/// 账本条件写入结果
#[derive(Debug, Clone, PartialEq)]
pub enum LedgerWrite {
    /// 已记录；中奖时带上新发放的优惠券
    Applied(Option<Coupon>),
    /// 读取之后账本已被其它请求更新，什么都没有写入
    Stale,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct DailyPlayStatusResponse {
    pub can_play: bool,
    /// 今日已抽奖时返回今日结果
    pub last_result: Option<String>,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct PlayRewardResponse {
    pub name: String,
    pub kind: PrizeKind,
    pub description: String,
    pub discount: Option<DiscountSpec>,
    /// 中奖时发放的优惠码
    pub code: Option<String>,
    pub expires_at: Option<DateTime<Utc>>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct FixedIndex(AtomicUsize);

    impl RewardRng for FixedIndex {
        fn pick_index(&self, _len: usize) -> usize {
            self.0.load(Ordering::SeqCst)
        }

        fn code_suffix(&self) -> String {
            "AAAA".to_string()
        }
    }

    #[test]
    fn test_standard_table_is_valid() {
        let table = PrizeTable::standard();
        let rebuilt = PrizeTable::new(table.prizes().to_vec()).unwrap();
        assert_eq!(rebuilt.len(), 4);
        assert_eq!(rebuilt.lose_prize().name, "TRY AGAIN");
        assert_eq!(
            table.prizes().iter().filter(|p| !p.is_win()).count(),
            1
        );
    }

    #[test]
    fn test_table_requires_exactly_one_lose() {
        let wins_only = vec![Prize::win("A", "a", DiscountType::Flat, 10.0)];
        assert!(PrizeTable::new(wins_only).is_err());

        let two_loses = vec![Prize::lose("X", "x"), Prize::lose("Y", "y")];
        assert!(PrizeTable::new(two_loses).is_err());

        assert!(PrizeTable::new(Vec::new()).is_err());
    }

    #[test]
    fn test_table_rejects_bad_discounts() {
        let pct_over_one = vec![
            Prize::win("BIG", "b", DiscountType::Percentage, 1.5),
            Prize::lose("TRY AGAIN", "t"),
        ];
        assert!(PrizeTable::new(pct_over_one).is_err());

        let lose_with_discount = vec![Prize {
            discount: Some(DiscountSpec {
                discount_type: DiscountType::Flat,
                value: 1.0,
            }),
            ..Prize::lose("TRY AGAIN", "t")
        }];
        assert!(PrizeTable::new(lose_with_discount).is_err());

        let duplicate = vec![
            Prize::win("SAME", "a", DiscountType::Flat, 1.0),
            Prize::win("SAME", "b", DiscountType::Flat, 2.0),
            Prize::lose("TRY AGAIN", "t"),
        ];
        assert!(PrizeTable::new(duplicate).is_err());
    }

    #[test]
    fn test_draw_uses_rng_index() {
        let table = PrizeTable::standard();
        let rng = FixedIndex(AtomicUsize::new(2));
        assert_eq!(table.draw(&rng).name, "5% OFF");

        // 越界时落到未中奖项
        rng.0.store(99, Ordering::SeqCst);
        assert_eq!(table.draw(&rng).name, "TRY AGAIN");
    }

    #[test]
    fn test_empty_config_falls_back_to_standard() {
        let table = PrizeTable::from_config(&[]).unwrap();
        assert_eq!(table.prizes(), PrizeTable::standard().prizes());
    }
}
