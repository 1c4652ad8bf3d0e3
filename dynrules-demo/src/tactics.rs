//! The tactic pool and the frame around a warrior script.

use dynrules_core::ScriptTemplate;
use dynrules_store::InMemoryRuleStore;

/// Tactic bodies cycled through when seeding a store.
const TACTICS: &[&str] = &[
    "attack_nearest()",
    "attack_weakest()",
    "cast_fireball()",
    "raise_shield()",
    "drink_potion()",
    "charge()",
    "taunt()",
    "circle_strafe()",
    "retreat()",
    "call_for_help()",
];

/// Fill every pre-created rule of `store` with a tactic and a starting
/// weight. Rule `i` gets `TACTICS[i % len]`; past the first lap the rule id
/// is passed as the tactic's argument so each payload stays distinct.
pub fn seed_store(store: &mut InMemoryRuleStore, initial_weight: f64) -> dynrules_core::Result<()> {
    for (i, rule) in store.rules_mut().iter_mut().enumerate() {
        let tactic = TACTICS[i % TACTICS.len()];
        let body = if i < TACTICS.len() {
            tactic.to_string()
        } else {
            tactic.replace("()", &format!("({})", rule.id()))
        };
        rule.set_payload(format!("    {body}\n"));
        rule.set_weight(initial_weight)?;
    }
    Ok(())
}

/// Wraps the sampled tactics in a Python `act` function.
#[derive(Debug, Clone)]
pub struct WarriorTemplate {
    name: String,
}

impl WarriorTemplate {
    /// Template for the warrior called `name`.
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into() }
    }
}

impl ScriptTemplate for WarriorTemplate {
    fn header(&self) -> String {
        format!("# ----\n# {} battle script\n# ----\ndef act(warrior):", self.name)
    }

    fn footer(&self) -> String {
        "    return warrior\n# ---- end ----".to_string()
    }
}
