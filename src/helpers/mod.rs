pub mod http_client;
pub mod token_provider;
