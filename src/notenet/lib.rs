//! # Notenet Architecture
//!
//! Notenet is a **UI-agnostic library for notes kept on a decentralized
//! document network**. Notes belong to an identity derived from a 32-byte seed.
//! Each note is its own document. An identity keeps one index record listing
//! `{id, title}` for all of its notes. The CLI is one client of the library.
//!
//! ## Layers
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │  CLI Layer (cli/, wired by main.rs)                         │
//! │  - Parses arguments, formats output, handles terminal I/O   │
//! │  - The ONLY place that knows about stdout/stderr/exit codes │
//! └─────────────────────────────────────────────────────────────┘
//!                              │
//!                              ▼
//! ┌─────────────────────────────────────────────────────────────┐
//! │  App Layer (app.rs)                                         │
//! │  - User operations: authenticate, drafts, notes             │
//! │  - Applies the immediate action, spawns the network task    │
//! │  - Each task reports back with exactly one action           │
//! └─────────────────────────────────────────────────────────────┘
//!                              │
//!                              ▼
//! ┌─────────────────────────────────────────────────────────────┐
//! │  State Layer (state.rs)                                     │
//! │  - Pure reducer: (State, Action) -> State                   │
//! │  - Auth, navigation, draft status, per-note lifecycle       │
//! └─────────────────────────────────────────────────────────────┘
//!                              │
//!                              ▼
//! ┌─────────────────────────────────────────────────────────────┐
//! │  Network Layer (network/)                                   │
//! │  - DocumentNetwork / Session / Document traits              │
//! │  - FileNetwork (CLI), InMemoryNetwork (testing)             │
//! └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Key Principle: State Has One Writer
//!
//! Network work runs on tokio tasks, but tasks never touch [`state::State`].
//! They send their result as an [`state::Action`] and [`app::NotesApp`] applies
//! it. Every change to state is therefore a reducer step that can be tested
//! without a runtime.
//!
//! ## Testing Strategy
//!
//! 1. **Reducer** (`state.rs`): one test per transition and edge case.
//! 2. **App** (`app.rs`): operations against [`network::memory::InMemoryNetwork`],
//!    with fault injection and held loads to observe in-flight states.
//! 3. **Adapters** (`network/`): schema and controller enforcement.
//! 4. **CLI** (`tests/`): the binary against a temporary data dir.
//!
//! ## Module Overview
//!
//! - [`app`]: The controller, entry point for all user operations
//! - [`state`]: State types and the reducer
//! - [`network`]: Network traits and implementations
//! - [`model`]: Seeds, document ids, note types
//! - [`schema`]: Note and notes index schemas, validation
//! - [`index`]: Reading and writing the notes index record
//! - [`provision`]: One-time publication of schemas, definition and tiles
//! - [`config`]: Configuration and model aliases
//! - [`init`]: Data directory resolution and context setup
//! - [`logging`]: `tracing` subscriber setup for binaries
//! - [`error`]: Error types
//! - `cli`: Argument parsing and printing for the binary (not part of the lib API)

pub mod app;
pub mod config;
pub mod error;
pub mod index;
pub mod init;
pub mod logging;
pub mod model;
pub mod network;
pub mod provision;
pub mod schema;
pub mod state;
