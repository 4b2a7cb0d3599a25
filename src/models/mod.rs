pub mod common;
pub mod coupon;
pub mod order;
pub mod pagination;
pub mod product;
pub mod reward;
pub mod user;

pub use common::*;
pub use coupon::*;
pub use order::*;
pub use pagination::*;
pub use product::*;
pub use reward::*;
pub use user::*;
