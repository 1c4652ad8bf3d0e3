//! # dynrules core library
//!
//! Dynamic scripting for adaptive game agents (Spronck et al., 2005).
//!
//! A [`RuleSet`] holds weighted, opaque behavior fragments ([`Rule`]s).
//! A [`ScriptAssembler`] samples the set proportionally to weight and
//! concatenates the selected payloads into a script. After the script has
//! been evaluated, the caller feeds the observed fitness back through
//! [`RuleSet::update_weights`], which rewards (or punishes) the rules that
//! were used and compensates the ones that were not.
//!
//! ```text
//!   RuleStore ──load──▶ RuleSet ──sample──▶ ScriptAssembler ──▶ script
//!                          ▲                                      │
//!                          └────── update_weights(fitness) ◀──────┘
//! ```
//!
//! Domain specifics (how fitness maps to a reward, how clamping spill is
//! handed back) are injected through a [`WeightPolicy`].

#![deny(clippy::unwrap_used)]
#![deny(missing_docs)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod assembler;
pub mod config;
pub mod error;
pub mod policy;
pub mod random;
pub mod rule;
pub mod ruleset;

pub use assembler::{
    Assembly, AssemblyReport, PlainTemplate, ScriptAssembler, ScriptTemplate, StaticTemplate,
    StopReason,
};
pub use config::DynrulesConfig;
pub use error::{DynrulesError, Result};
pub use policy::{FnPolicy, NullPolicy, WeightPolicy};
pub use random::RandomSource;
pub use rule::{Rule, RuleId};
pub use ruleset::{RuleSet, SkipReason, WeightUpdate};
