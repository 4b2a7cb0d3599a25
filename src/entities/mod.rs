pub mod coupons;
pub mod orders;
pub mod products;
pub mod reward_plays;
pub mod users;

pub use coupons as coupon_entity;
pub use orders as order_entity;
pub use products as product_entity;
pub use reward_plays as reward_play_entity;
pub use users as user_entity;
