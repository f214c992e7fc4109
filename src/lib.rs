//! # tvgrid
//!
//! Keeps a local copy of a weekly prime-time TV grid and each show's
//! episode listing, with every air time converted into the viewer's zone.
//!
//! tvgrid walks the grid page into per-show time slots, follows each show
//! to its detail page and episode listing, and stores the parsed episodes,
//! the upcoming ones, and a show index. Every page carries an update stamp;
//! unchanged pages are skipped on later runs.
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────┐   ┌─────────────┐   ┌──────────────┐   ┌──────────┐
//! │   Grid   │──▶│  Placements │──▶│ Detail pages │──▶│  SQLite  │
//! │   page   │   │  (slots)    │   │ + listings   │   │  store   │
//! └──────────┘   └─────────────┘   └──────────────┘   └────┬─────┘
//!                                                          │
//!                                            ┌─────────────┤
//!                                            ▼             ▼
//!                                       ┌─────────┐  ┌──────────┐
//!                                       │  index  │  │ upcoming │
//!                                       └─────────┘  └──────────┘
//! ```
//!
//! ## Quick Start
//!
//! ```bash
//! tvgrid init               # create database
//! tvgrid sync               # fetch grid, details, listings
//! tvgrid upcoming           # what airs next, in your zone
//! ```
//!
//! ## Modules
//!
//! | Module | Purpose |
//! |--------|---------|
//! | [`config`] | TOML configuration parsing |
//! | [`logging`] | `tracing` subscriber setup |
//! | [`db`] | Database connection |
//! | [`migrate`] | Schema migrations |
//! | [`sqlite_store`] | SQLite document store |
//! | [`fetch`] | Page fetching |
//! | [`html`] | HTML markup backing |
//! | [`collector`] | Sync pipeline |
//! | [`report`] | Index and upcoming views |
//!
//! Scheduling logic itself (slot allocation, time normalization, listing
//! parsing, freshness) lives in the `tvgrid-core` crate.

pub mod collector;
pub mod config;
pub mod db;
pub mod fetch;
pub mod html;
pub mod logging;
pub mod migrate;
pub mod report;
pub mod sqlite_store;
