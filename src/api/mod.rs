pub mod nowplaying;
pub mod server;
pub mod token;
