pub mod backup_exchange;
pub mod calculator;
pub mod core;
pub mod courses;
pub mod grades;
pub mod stats;
