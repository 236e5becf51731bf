pub mod activity;
pub mod auth;
pub mod backup;
pub mod customers;
pub mod events;
pub mod extract;
pub mod messaging;
pub mod response;
mod routes;
pub mod settings;
pub mod transactions;
pub mod users;

pub use response::{ok, ApiResponse};
pub use routes::api_routes;
