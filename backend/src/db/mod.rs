pub mod connection;
pub mod memory;
pub mod migrations;
pub mod swipes;
pub mod users;

pub use connection::{get_db_pool, DatabaseConfig};
pub use memory::{MemorySwipeLog, MemoryUserDirectory};
pub use swipes::{PgSwipeLog, SwipeLog};
pub use users::{PgUserDirectory, UserDirectory};
