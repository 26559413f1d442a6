pub mod subscriptions;
pub mod units;
pub mod users;
