//! Client side of the voting portal: logging in, keeping the session token,
//! and making authenticated requests to the voting backend.

mod client;
pub mod context;
pub mod login_form;
pub mod request;
mod result;
pub mod session;
pub mod store;
#[cfg(test)]
mod testing;
pub mod types;

pub use client::Client;
pub use context::SessionContext;
pub use login_form::{LoginForm, LoginView};
pub use request::{RequestBody, RequestOptions};
pub use result::{Error, ErrorKind, Result};
pub use session::{Destination, Role, Session};
pub use store::{Change, DynTokenStore, FileTokenStore, MemoryTokenStore, TokenStore};
pub use types::Credentials;
