//! Execution director
//!
//! Drives one `execute_method` call: acquires a connection, opens a proxy
//! tunnel when needed, answers authentication challenges, follows
//! redirects and retries transport failures, then hands the connection to
//! the method (body still unread) or back to the pool.

mod auth;
mod execute;
mod response;
mod tunnel;

pub(crate) use execute::MethodDirector;
pub use response::ProxyResponse;
