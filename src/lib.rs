//! # wiki-mirror
//!
//! Idempotent mirroring of a hierarchical wiki tree into a Drive-style
//! remote folder space.
//!
//! wiki-mirror walks a source tree of pages (pages contain sub-pages and
//! file attachments) and reconciles a remote space against it: each
//! folder-backed page becomes a remote folder with a rendered dump file
//! inside, attachments land in a per-page `_Attachments` sub-folder, and
//! pages that reference pre-existing remote documents are relocated under
//! their resolved parent. Every mutation is find-or-create, so repeated
//! and interrupted runs converge without duplicates.
//!
//! ## Architecture
//!
//! ```text
//! ┌───────────┐   ┌─────────────────────┐   ┌──────────────┐
//! │ Tree file │──▶│   Export walker      │──▶│ RemoteSpace   │
//! │ (TOML)    │   │ resolve / dump /    │   │ Drive REST /  │
//! └───────────┘   │ attach / reparent   │   │ in-memory     │
//!                 └─────────┬───────────┘   └──────────────┘
//!                           │
//!                           ▼
//!                    progress events (stderr)
//! ```
//!
//! ## Quick Start
//!
//! ```bash
//! wmir check                        # verify credentials
//! wmir tree wiki.toml               # validate and print a tree file
//! wmir export wiki.toml             # mirror it into the remote space
//! wmir export wiki.toml             # second run: zero creations
//! ```
//!
//! ## Modules
//!
//! | Module | Purpose |
//! |--------|---------|
//! | [`config`] | TOML configuration parsing |
//! | [`models`] | Source tree data types |
//! | [`tree`] | Tree file loading and validation |
//! | [`remote`] | Remote space trait and wire types |
//! | [`remote_drive`] | Google Drive REST implementation |
//! | [`remote_memory`] | In-memory implementation for tests |
//! | [`render`] | Page body rendering |
//! | [`export`] | The reconciliation core |
//! | [`progress`] | Progress reporting on stderr |
//! | [`error`] | Export error taxonomy |

pub mod config;
pub mod error;
pub mod export;
pub mod models;
pub mod progress;
pub mod remote;
pub mod remote_drive;
pub mod remote_memory;
pub mod render;
pub mod tree;

pub use error::ExportError;
pub use export::{ExportSummary, Exporter};
