pub mod actor;
pub mod matcher;
pub mod recommend;
pub mod sizing;
pub mod tokenization;
