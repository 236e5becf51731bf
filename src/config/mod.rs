mod settings;

pub use settings::{
    DatabaseConfig, JwtConfig, MessagingConfig, ServerConfig, Settings,
};
