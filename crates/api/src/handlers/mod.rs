pub mod analyze;
pub mod dispatch;
pub mod health;
pub mod system;
pub mod tasks;
