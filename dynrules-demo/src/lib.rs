//! # dynrules-demo — Warrior Arena
//!
//! A small end-to-end use of dynrules: a pool of combat tactics, a warrior
//! whose script is assembled from them, and an arena that scores each
//! script by kills. Over many bouts the weights drift towards the tactics
//! that keep the warrior alive and killing.
//!
//! ```text
//!   InMemoryRuleStore ──populate──▶ RuleSet<WarriorPolicy>
//!                                        │        ▲
//!                              assemble  │        │ update_weights(kills)
//!                                        ▼        │
//!                               warrior script ──▶ Arena::bout
//! ```
//!
//! ## Modules
//!
//! - `config` — `[arena]` settings on top of the core and store config
//! - `policy` — [`WarriorPolicy`], kills against a break-even
//! - `tactics` — the tactic pool and [`WarriorTemplate`]
//! - `arena` — the simulated bouts and the learning loop

#![deny(clippy::unwrap_used)]
#![deny(missing_docs)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod arena;
pub mod config;
pub mod policy;
pub mod tactics;

pub use arena::{Arena, ArenaSummary, BoutOutcome};
pub use config::{ArenaConfig, DemoConfig};
pub use policy::WarriorPolicy;
pub use tactics::{seed_store, WarriorTemplate};
