pub mod activity;
pub mod customers;
pub mod message_log;
pub mod settings_store;
pub mod transactions;
pub mod users;
