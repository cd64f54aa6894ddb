pub mod compare;
pub mod runner;
pub mod score;
