mod claims;
mod jwt;
pub mod password;
mod service;

pub use claims::{Claims, Principal};
pub use jwt::JwtService;
pub use service::SessionService;
