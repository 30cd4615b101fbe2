pub mod expression;
pub mod value;
