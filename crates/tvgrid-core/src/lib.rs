//! # tvgrid core
//!
//! Pure scheduling logic for tvgrid: grid time-slot allocation, date/time
//! and timezone normalization, episode listing parsing, the freshness gate,
//! and the document-store trait.
//!
//! This crate performs no network or database I/O. Documents arrive as
//! already-parsed markup trees (through the [`markup::MarkupNode`]
//! capability trait) or plain text, and results leave through
//! [`store::Store`].

pub mod detail;
pub mod episode;
pub mod error;
pub mod freshness;
pub mod grid;
pub mod markup;
pub mod models;
pub mod store;
pub mod temporal;
pub mod timeslot;
