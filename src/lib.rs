//! Real-time shopping list notifications.
//!
//! Clients connect on `/ws` and receive a JSON notification for every change
//! to the shared lists, whether it came through this service's HTTP API or
//! from another writer observed on the store's change feed.

pub mod config;
pub mod db;
pub mod docs;
pub mod feed;
pub mod handlers;
pub mod models;
pub mod routes;
pub mod services;
pub mod ws;

use services::ListService;
use ws::{ConnectionRegistry, ConnectionSettings};

/// Shared state handed to every request handler
pub struct AppState {
    pub lists: ListService,
    pub registry: ConnectionRegistry,
    pub connection_settings: ConnectionSettings,
    pub ws_max_message_size: usize,
}
