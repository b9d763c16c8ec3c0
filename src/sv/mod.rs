pub mod blacklist;
pub mod game;
pub mod key;
pub mod limit;
pub mod provider;
pub mod script;
#[cfg(test)]
pub mod test_utils;
pub mod token;
pub mod usage;
pub mod user;
pub mod validate;

pub use blacklist::Blacklist;
pub use game::Game;
pub use key::Key;
pub use provider::Provider;
pub use script::Script;
pub use usage::Usage;
pub use user::User;
pub use validate::Validation;
