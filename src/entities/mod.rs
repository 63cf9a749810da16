pub mod prelude;

pub mod comments;
pub mod subscriptions;
pub mod tweets;
pub mod users;
pub mod videos;
pub mod watch_history;
