pub mod stored_session;

pub use stored_session::StoredSession;
