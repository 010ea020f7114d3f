//! Mission Control: personal kanban board back-end.
//!
//! ## Overview
//!
//! Tasks move through fixed status columns and every change is recorded in
//! an activity log. A separate list of "upgrades" holds improvement ideas,
//! some of them proposed by an external text-generation service. All state
//! lives in JSON files under one data directory, and every mutation is
//! pushed to connected browsers over a WebSocket.
//!
//! ## Module Map
//!
//! ```text
//! ┌──────────┐   HTTP   ┌──────────────────────────────────────────────────┐
//! │  Client  │ ───────> │  server.rs  (axum Router, ServerConfig)          │
//! │ (browser)│ <─────── │    ├─ api.rs  (route handlers, AppState)         │
//! └──────────┘ WebSocket│    └─ ws.rs   (event socket, ping/pong)          │
//!                       │         │                                        │
//!                       │         │ StoreHandle::call() (spawn_blocking)   │
//!                       │         v                                        │
//!                       │  store.rs  (BoardStore, DataDirLock)             │
//!                       │    ├─ tasks.rs     (tasks, activity, numbering)  │
//!                       │    └─ upgrades.rs  (upgrades, active cap)        │
//!                       │         │                                        │
//!                       │         │ JsonTable::mutate() → write file       │
//!                       │         │ Broadcaster::broadcast() → ws clients  │
//!                       │         v                                        │
//!                       │  json_file.rs / events.rs                        │
//!                       └──────────────────────────────────────────────────┘
//! ```
//!
//! ## Supporting Modules
//!
//! | Module     | Responsibility                                           |
//! |------------|----------------------------------------------------------|
//! | `models`   | Shared types: `Task`, `Activity`, `Upgrade`, status enums |
//! | `reorder`  | Drag-and-drop placement planning (`plan_move`)           |
//! | `suggest`  | `TextGenerator` trait, Anthropic client, generate/rerank |
//! | `migrate`  | `KANBAN.md` importer                                     |
//!
//! ## Typical Request Flow (generate upgrades)
//!
//! 1. `POST /api/upgrades/generate` → `api::generate_upgrades()`
//! 2. `Suggester::generate()` snapshots upgrades and the first tasks, then
//!    checks the active cap before spending a request.
//! 3. The prompt goes to the `TextGenerator` with no store lock held.
//! 4. The reply is validated into drafts and committed in one write by
//!    `UpgradeStore::create_proposed()`, which re-checks the cap.
//! 5. A best-effort rerank follows; failures there are only logged.

pub mod api;
pub mod events;
pub mod json_file;
pub mod migrate;
pub mod models;
pub mod reorder;
pub mod server;
pub mod store;
pub mod suggest;
pub mod tasks;
pub mod upgrades;
pub mod ws;
