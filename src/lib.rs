//! # Question Bank
//!
//! Local question-bank tooling with a loopback import bridge.
//!
//! A browser extension posts a question id and a screenshot of the question to
//! `http://127.0.0.1:27777/import`. The listener validates the request against
//! a per-installation token and hands it to the GUI thread, which fills the
//! question-entry view: id field, scaled image preview, focus on the query
//! field.
//!
//! ## Architecture
//!
//! ```text
//! ┌───────────┐  HTTP  ┌──────────────┐  mpsc  ┌───────────────┐
//! │  Browser  │───────▶│  Listener    │───────▶│  GUI thread   │
//! │ extension │◀───────│ (tokio, own  │        │ ImportApplier │
//! └───────────┘  JSON  │   thread)    │        │ ViewRegistry  │
//!                      └──────────────┘        └───────┬───────┘
//!                                                      ▼
//!                                          ┌────────────────────────┐
//!                                          │ data dir: SQLite db    │
//!                                          │ + item_img_path/*.png  │
//!                                          └────────────────────────┘
//! ```
//!
//! ## Modules
//!
//! | Module | Purpose |
//! |--------|---------|
//! | [`config`] | TOML configuration parsing |
//! | [`settings`] | Persisted JSON settings |
//! | [`token`] | Import token creation and rotation |
//! | [`models`] | Request and response types |
//! | [`validate`] | Import payload validation |
//! | [`server`] | Loopback HTTP listener |
//! | [`dispatch`] | Listener to GUI hand-off |
//! | [`bridge`] | Import bridge lifecycle |
//! | [`view`] | Entry view handles and registry |
//! | [`memory_view`] | Headless entry view |
//! | [`preview`] | Image decoding and scaling |
//! | [`entry`] | Applying imports to the entry view |
//! | [`db`] | Database connection |
//! | [`migrate`] | Schema migrations |
//! | [`questions`] | Question lookups and image files |
//! | [`logging`] | Tracing subscriber setup |

pub mod bridge;
pub mod config;
pub mod db;
pub mod dispatch;
pub mod entry;
pub mod logging;
pub mod memory_view;
pub mod migrate;
pub mod models;
pub mod preview;
pub mod questions;
pub mod server;
pub mod settings;
pub mod token;
pub mod validate;
pub mod view;
