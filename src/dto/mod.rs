pub mod catalog;
pub mod health;
pub mod join_link;
pub mod validation;
pub mod ws;
