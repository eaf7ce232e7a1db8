//! Tower layers applied to every outbound request.
//!
//! - [`DefaultHeadersLayer`] - session-wide default headers
//! - [`UserAgentLayer`] - User-Agent header

mod default_headers;
mod user_agent;

pub use default_headers::{DefaultHeadersLayer, DefaultHeadersService};
pub use user_agent::{UserAgentLayer, UserAgentService};
