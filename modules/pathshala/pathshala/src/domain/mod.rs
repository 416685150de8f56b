pub mod api_client;
pub mod bootstrap;
pub mod dashboard;
pub mod session_store;
pub mod settings;
pub mod tenant_store;

#[cfg(test)]
mod stores_test;
