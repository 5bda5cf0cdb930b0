pub mod persistence;
pub mod telegram;
pub mod ui;
