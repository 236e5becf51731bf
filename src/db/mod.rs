mod pool;
mod schema;

pub use pool::create_pool;
pub use schema::{migrate, seed};
