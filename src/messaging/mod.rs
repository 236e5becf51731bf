mod phone;
mod service;
mod status;
mod template;
mod transport;

pub use phone::normalize_phone;
pub use service::{BroadcastDetail, BroadcastSummary, MessagingService, SendOutcome};
pub use status::{GatewayState, GatewayStatus};
pub use template::render_template;
pub use transport::{LoggingTransport, MessageTransport, TransportError, TransportEvent};
