//! Domain models

pub mod session;
pub mod snippet;
pub mod user;

pub use session::Session;
pub use snippet::{
    FieldUpdate, NewSnippet, Snippet, SnippetPayload, SnippetUpdate, SnippetWithOwner,
};
pub use user::{LoginMethod, NewUser, UpdateUser, User};
