pub mod auth;
pub mod cache;
pub mod learning;
pub mod market;
pub mod quiz;
pub mod trading;
