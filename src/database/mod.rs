pub mod db;
pub mod models;
mod store;

pub use store::SessionStore;
