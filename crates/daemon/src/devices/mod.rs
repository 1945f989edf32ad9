//! Device tracking module.
//!
//! Every visit to the listing page (and every `/connect` call) registers the
//! client, identified by its address and the browser and OS parsed from its
//! user agent.

pub mod registry;
pub mod user_agent;

pub use registry::DeviceRegistry;
pub use user_agent::ClientInfo;
