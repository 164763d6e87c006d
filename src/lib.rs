//! Library crate for couch-arcade-back: session codes, controller slots and the
//! WebSocket relay between a host screen and up to two phone controllers.

pub mod config;
pub mod dto;
pub mod error;
pub mod routes;
pub mod services;
pub mod state;
