mod cache_policy;
mod connection_descriptor;
mod identifier;
mod isolation_key;
mod view_ref;

pub use cache_policy::CachePolicy;
pub use connection_descriptor::ConnectionDescriptor;
pub use identifier::{is_valid_identifier, Identifier};
pub use isolation_key::IsolationKey;
pub use view_ref::ViewRef;
