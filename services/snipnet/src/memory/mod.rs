//! In-process store implementations
//!
//! Used when `SNIPNET_STORAGE=memory` and by the test suite. They honour the
//! same contracts as the PostgreSQL and Redis stores: unique usernames,
//! emails and oauth ids, public-only listings, newest-first ordering and
//! passive session expiry.

mod sessions;
mod snippets;
mod users;

pub use sessions::MemorySessionStore;
pub use snippets::MemorySnippetStore;
pub use users::MemoryUserStore;
