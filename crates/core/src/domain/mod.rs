pub mod knowledge;
pub mod sales;
pub mod session;
