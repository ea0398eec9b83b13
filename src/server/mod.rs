//! TCP server that dispatches accepted connections through a [`Router`](crate::router::Router).

pub mod listener;

pub use listener::Server;
