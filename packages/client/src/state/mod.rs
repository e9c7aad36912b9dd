//! State shared by the methods one client executes

pub mod http_state;

pub use http_state::HttpState;
