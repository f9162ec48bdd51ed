//! # Latent Assets
//!
//! Client for a tagged-image search service.
//!
//! Users stage images with optional tags and upload them in one batch,
//! query the remote index with text (optionally filtered by tags), and edit
//! or delete images they find. This crate holds the client-side engine:
//! tag entry, upload staging, result bookkeeping, and the dialogs that
//! mutate results after the service confirms a change.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────┐   ┌──────────────┐   ┌───────────────┐
//! │ files       │──▶│ staging      │──▶│               │
//! │ (handles)   │   │ (tag chips)  │   │               │
//! └─────────────┘   └──────────────┘   │ ImageIndex    │
//!                                      │ HTTP / memory │
//! ┌─────────────┐   ┌──────────────┐   │               │
//! │ dialogs     │◀─▶│ results      │◀──│               │
//! │ edit/delete │   │ (by path)    │   └───────────────┘
//! └─────────────┘   └──────────────┘
//!         ▲                ▲
//!         └──── controller ┘◀── shell / CLI (`lat`)
//! ```
//!
//! ## Quick Start
//!
//! ```bash
//! lat upload ./photos --tags "holiday, beach"
//! lat search "sunset over water" --top-k 8 --tag beach
//! lat retag /data/assets/IMG_0042.jpg --tags "holiday, sunset"
//! lat delete /data/assets/IMG_0042.jpg --yes
//! lat shell
//! ```
//!
//! ## Modules
//!
//! | Module | Purpose |
//! |--------|---------|
//! | [`tags`] | Tag chip input and tag policy |
//! | [`files`] | File handles with declared media types |
//! | [`staging`] | Pending uploads and batch building |
//! | [`results`] | Path-keyed result set and asset URLs |
//! | [`dialogs`] | Edit and delete state machines |
//! | [`client`] | Image index trait, HTTP and in-memory implementations |
//! | [`controller`] | Orchestration of all of the above |
//! | [`shell`] | Interactive text front end |
//! | [`config`] | TOML configuration parsing |
//! | [`error`] | API error type |
//! | [`models`] | Wire types |

pub mod client;
pub mod config;
pub mod controller;
pub mod dialogs;
pub mod error;
pub mod files;
pub mod models;
pub mod results;
pub mod shell;
pub mod staging;
pub mod tags;
