pub mod code_generator;
pub mod email;
pub mod jwt;
pub mod money;
pub mod password;

pub use code_generator::{
    RewardRng, ThreadRewardRng, coupon_code, normalize_coupon_code, random_base36,
};
pub use email::*;
pub use jwt::*;
pub use money::round_money;
pub use password::*;
