//! Types most callers need

pub use crate::auth::{AuthScope, Credentials, CredentialsKind, CredentialsProvider};
pub use crate::client::{ClientStats, ClientStatsSnapshot, HttpClient};
pub use crate::config::{ClientParams, ConnectionManagerParams, HostParams, MethodParams};
pub use crate::connect::{HostConfiguration, Protocol};
pub use crate::cookie::{Cookie, CookiePolicy};
pub use crate::error::{Error, Result};
pub use crate::http::{Header, HeaderGroup, HttpVersion, StatusLine};
pub use crate::method::{
    AbortHandle, BodyReader, ByteArrayEntity, HttpMethod, RequestEntity, StreamEntity,
    StringEntity,
};
pub use crate::pool::{HttpConnectionManager, MultiThreadedConnectionManager, SimpleConnectionManager};
pub use crate::retry::{DefaultMethodRetryHandler, MethodRetryHandler};
pub use crate::state::HttpState;

pub use url::Url;
