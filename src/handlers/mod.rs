pub mod auth;
pub mod coupon;
pub mod order;
pub mod product;
pub mod reward;
pub mod user;

pub use auth::auth_config;
pub use coupon::coupon_config;
pub use order::order_config;
pub use product::product_config;
pub use reward::reward_config;
pub use user::user_config;
