pub mod blacklist;
pub mod game;
pub mod key;
pub mod provider;
pub mod provider_session;
pub mod rate_limit;
pub mod script;
pub mod script_load;
pub mod script_token;
pub mod usage_log;
pub mod user;

pub use blacklist::BanKind;
pub use key::KeyType;
pub use provider::IpCheck;
pub use provider_session::SessionStatus;
