//! Script assembly — bounded weighted sampling over a [`RuleSet`].
//!
//! A script is `header + "\n" + rules + "\n" + footer + "\n"`, where the
//! rules section is the concatenation of up to `max_rule_count` payloads
//! drawn with probability proportional to rule weight.
//!
//! Budget policy: when the drawn rule would push the rules section past
//! `max_script_size`, assembly stops outright. It does not skip the rule and
//! try a smaller one. Callers size their payloads and budget with that in
//! mind; a skip-and-continue policy would produce different scripts for the
//! same seed.

use std::io::Write;

use rand::rngs::StdRng;
use tracing::{debug, trace};

use crate::config::AssemblerConfig;
use crate::error::{DynrulesError, Result};
use crate::policy::{NullPolicy, WeightPolicy};
use crate::random::{default_rng, seeded_rng, RandomSource};
use crate::rule::{Rule, RuleId};
use crate::ruleset::RuleSet;

/// Default number of draws per script slot.
pub const DEFAULT_MAX_TRIES: u32 = 100;

/// Default byte budget for the rules section.
pub const DEFAULT_MAX_SCRIPT_SIZE: usize = 1024;

// ---------------------------------------------------------------------------
// Templates
// ---------------------------------------------------------------------------

/// Header and footer wrapped around the sampled rules.
pub trait ScriptTemplate {
    /// Text written before the rules. Empty by default.
    fn header(&self) -> String {
        String::new()
    }

    /// Text written after the rules. Empty by default.
    fn footer(&self) -> String {
        String::new()
    }
}

/// Template with an empty header and footer.
#[derive(Debug, Clone, Copy, Default)]
pub struct PlainTemplate;

impl ScriptTemplate for PlainTemplate {}

/// Template with fixed header and footer text.
#[derive(Debug, Clone, Default)]
pub struct StaticTemplate {
    /// Header text.
    pub header: String,
    /// Footer text.
    pub footer: String,
}

impl StaticTemplate {
    /// Build from header and footer text.
    pub fn new(header: impl Into<String>, footer: impl Into<String>) -> Self {
        Self {
            header: header.into(),
            footer: footer.into(),
        }
    }
}

impl ScriptTemplate for StaticTemplate {
    fn header(&self) -> String {
        self.header.clone()
    }

    fn footer(&self) -> String {
        self.footer.clone()
    }
}

// ---------------------------------------------------------------------------
// Reports
// ---------------------------------------------------------------------------

/// Why an assembly pass ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopReason {
    /// Every slot was processed.
    SlotsFilled,
    /// The budget was already spent when the next slot began.
    BudgetExhausted,
    /// A drawn payload did not fit into the remaining budget.
    BudgetOverflow,
    /// The rule set carries no weight.
    NoWeight,
    /// Zero slots were requested.
    NoSlots,
}

/// Statistics for one assembly pass.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AssemblyReport {
    /// Payloads appended.
    pub rules_written: usize,
    /// Bytes in the rules section.
    pub bytes_written: usize,
    /// Random draws made.
    pub draws: usize,
    /// Slots that used up `max_tries` without placing a rule.
    pub abandoned_slots: usize,
    /// How the pass ended.
    pub stop: StopReason,
}

impl AssemblyReport {
    fn empty(stop: StopReason) -> Self {
        Self {
            rules_written: 0,
            bytes_written: 0,
            draws: 0,
            abandoned_slots: 0,
            stop,
        }
    }
}

/// Rules section plus the statistics of the pass that produced it.
#[derive(Debug, Clone)]
pub struct Assembly {
    /// Concatenated payloads.
    pub script: String,
    /// Pass statistics.
    pub report: AssemblyReport,
}

// ---------------------------------------------------------------------------
// ScriptAssembler
// ---------------------------------------------------------------------------

/// Samples a borrowed [`RuleSet`] into scripts.
///
/// Selected rules are marked used so that a subsequent
/// [`RuleSet::update_weights`] knows which rules contributed. Flags are never
/// cleared here; call [`RuleSet::reset_used`] between learning cycles.
///
/// A draw landing on a rule with an empty payload is rejected and redrawn.
/// Such a rule is therefore never marked used: it only ever receives the
/// compensation share of an update pass, never the adjustment.
///
/// ```
/// use dynrules_core::{Rule, RuleSet, ScriptAssembler};
/// use dynrules_core::random::seeded_rng;
///
/// let mut set = RuleSet::new(0.0, 10.0)?;
/// for id in 0..4 {
///     set.add_rule(Rule::with_payload(id, format!("do_{id}();\n")).weighted(5.0)?)?;
/// }
///
/// let mut assembler = ScriptAssembler::new(&mut set).with_rng(seeded_rng(1));
/// let rules = assembler.assemble_rules(3);
/// assert_eq!(rules.lines().count(), 3);
/// assert_eq!(set.used_count(), set.rules().filter(|r| r.used()).count());
/// # Ok::<(), dynrules_core::DynrulesError>(())
/// ```
#[derive(Debug)]
pub struct ScriptAssembler<'a, P = NullPolicy, R = StdRng, T = PlainTemplate>
where
    P: WeightPolicy,
{
    ruleset: &'a mut RuleSet<P>,
    rng: R,
    template: T,
    max_tries: u32,
    max_script_size: usize,
}

impl<'a, P: WeightPolicy> ScriptAssembler<'a, P> {
    /// Assembler with default limits, an entropy-seeded RNG and an empty
    /// header and footer.
    pub fn new(ruleset: &'a mut RuleSet<P>) -> Self {
        Self::with_parts(ruleset, default_rng(), PlainTemplate)
    }

    /// Assembler configured from `config`. A configured seed makes the
    /// output reproducible.
    ///
    /// # Errors
    /// Returns [`DynrulesError::Configuration`] if a limit is zero.
    pub fn from_config(ruleset: &'a mut RuleSet<P>, config: &AssemblerConfig) -> Result<Self> {
        config.validate()?;
        let rng = config.seed.map_or_else(default_rng, seeded_rng);
        let mut assembler = Self::with_parts(ruleset, rng, PlainTemplate);
        assembler.max_tries = config.max_tries;
        assembler.max_script_size = config.max_script_size;
        Ok(assembler)
    }
}

impl<'a, P, R, T> ScriptAssembler<'a, P, R, T>
where
    P: WeightPolicy,
    R: RandomSource,
    T: ScriptTemplate,
{
    /// Assembler from explicit parts with default limits.
    pub fn with_parts(ruleset: &'a mut RuleSet<P>, rng: R, template: T) -> Self {
        Self {
            ruleset,
            rng,
            template,
            max_tries: DEFAULT_MAX_TRIES,
            max_script_size: DEFAULT_MAX_SCRIPT_SIZE,
        }
    }

    /// Swap the random source.
    pub fn with_rng<R2: RandomSource>(self, rng: R2) -> ScriptAssembler<'a, P, R2, T> {
        ScriptAssembler {
            ruleset: self.ruleset,
            rng,
            template: self.template,
            max_tries: self.max_tries,
            max_script_size: self.max_script_size,
        }
    }

    /// Swap the header/footer template.
    pub fn with_template<T2: ScriptTemplate>(self, template: T2) -> ScriptAssembler<'a, P, R, T2> {
        ScriptAssembler {
            ruleset: self.ruleset,
            rng: self.rng,
            template,
            max_tries: self.max_tries,
            max_script_size: self.max_script_size,
        }
    }

    // ------------------------------------------------------------------
    // Configuration
    // ------------------------------------------------------------------

    /// Draws allowed per slot.
    pub fn max_tries(&self) -> u32 {
        self.max_tries
    }

    /// Set the draws allowed per slot.
    ///
    /// # Errors
    /// Returns [`DynrulesError::Configuration`] for zero.
    pub fn set_max_tries(&mut self, max_tries: u32) -> Result<()> {
        if max_tries == 0 {
            return Err(DynrulesError::Configuration("max_tries must be > 0".into()));
        }
        self.max_tries = max_tries;
        Ok(())
    }

    /// Byte budget of the rules section.
    pub fn max_script_size(&self) -> usize {
        self.max_script_size
    }

    /// Set the byte budget of the rules section.
    ///
    /// # Errors
    /// Returns [`DynrulesError::Configuration`] for zero.
    pub fn set_max_script_size(&mut self, max_script_size: usize) -> Result<()> {
        if max_script_size == 0 {
            return Err(DynrulesError::Configuration(
                "max_script_size must be > 0".into(),
            ));
        }
        self.max_script_size = max_script_size;
        Ok(())
    }

    /// The rule set being sampled.
    pub fn ruleset(&self) -> &RuleSet<P> {
        &*self.ruleset
    }

    /// Mutable access to the rule set, e.g. to feed back fitness.
    pub fn ruleset_mut(&mut self) -> &mut RuleSet<P> {
        &mut *self.ruleset
    }

    /// Point the assembler at another rule set, returning the previous one.
    pub fn set_ruleset(&mut self, ruleset: &'a mut RuleSet<P>) -> &'a mut RuleSet<P> {
        std::mem::replace(&mut self.ruleset, ruleset)
    }

    /// The header/footer template.
    pub fn template(&self) -> &T {
        &self.template
    }

    /// Script header from the template.
    pub fn header(&self) -> String {
        self.template.header()
    }

    /// Script footer from the template.
    pub fn footer(&self) -> String {
        self.template.footer()
    }

    // ------------------------------------------------------------------
    // Assembly
    // ------------------------------------------------------------------

    /// Concatenate up to `max_rule_count` sampled payloads.
    pub fn assemble_rules(&mut self, max_rule_count: usize) -> String {
        self.assemble(max_rule_count).script
    }

    /// Sample up to `max_rule_count` payloads and report how it went.
    ///
    /// Each slot draws `fraction ∈ [0, total_weight)` and walks the rules in
    /// id order until the cumulative weight exceeds it. A draw landing on a
    /// rule with an empty payload is discarded and redrawn, up to
    /// `max_tries` times per slot.
    pub fn assemble(&mut self, max_rule_count: usize) -> Assembly {
        let total = self.ruleset.total_weight();
        if total <= 0.0 {
            return Assembly {
                script: String::new(),
                report: AssemblyReport::empty(StopReason::NoWeight),
            };
        }
        if max_rule_count == 0 {
            return Assembly {
                script: String::new(),
                report: AssemblyReport::empty(StopReason::NoSlots),
            };
        }

        let mut script = String::new();
        let mut report = AssemblyReport::empty(StopReason::SlotsFilled);

        'slots: for slot in 0..max_rule_count {
            if report.bytes_written >= self.max_script_size {
                report.stop = StopReason::BudgetExhausted;
                break;
            }

            let mut placed = false;
            for _ in 0..self.max_tries {
                report.draws += 1;
                let fraction = self.rng.uniform(0.0, total);
                let Some(id) = select(self.ruleset.rules(), fraction) else {
                    continue;
                };
                let Some(rule) = self.ruleset.find(id) else {
                    continue;
                };
                if rule.payload().is_empty() {
                    trace!(slot, rule = %id, "Drew rule without payload, redrawing");
                    continue;
                }

                let len = rule.payload_len();
                if report.bytes_written + len > self.max_script_size {
                    trace!(slot, rule = %id, len, "Payload exceeds remaining budget");
                    report.stop = StopReason::BudgetOverflow;
                    break 'slots;
                }

                script.push_str(rule.payload());
                report.bytes_written += len;
                report.rules_written += 1;
                if let Some(rule) = self.ruleset.rule_mut(id) {
                    rule.set_used(true);
                }
                trace!(slot, rule = %id, fraction, "Selected rule");
                placed = true;
                break;
            }

            if !placed {
                report.abandoned_slots += 1;
            }
        }

        debug!(
            rules_written = report.rules_written,
            bytes = report.bytes_written,
            draws = report.draws,
            abandoned = report.abandoned_slots,
            stop = ?report.stop,
            "Assembled rules"
        );

        Assembly { script, report }
    }

    /// Write `header`, the sampled rules and `footer` to `dest`, each
    /// followed by a newline.
    ///
    /// # Errors
    /// Returns [`DynrulesError::Io`] if writing fails.
    pub fn assemble_script<W: Write + ?Sized>(
        &mut self,
        dest: &mut W,
        max_rule_count: usize,
    ) -> Result<AssemblyReport> {
        let header = self.header();
        let Assembly { script, report } = self.assemble(max_rule_count);
        let footer = self.footer();

        writeln!(dest, "{header}")?;
        writeln!(dest, "{script}")?;
        writeln!(dest, "{footer}")?;
        dest.flush()?;
        Ok(report)
    }
}

/// Pick the first rule whose cumulative weight exceeds `fraction`.
///
/// If rounding lets `fraction` reach the end of the cumulative sum, the last
/// rule with positive weight is chosen. `None` only when no rule carries
/// weight.
fn select<'r>(rules: impl Iterator<Item = &'r Rule>, fraction: f64) -> Option<RuleId> {
    let mut cumulative = 0.0;
    let mut last_weighted = None;
    for rule in rules {
        if rule.weight() > 0.0 {
            last_weighted = Some(rule.id());
        }
        cumulative += rule.weight();
        if cumulative > fraction {
            return Some(rule.id());
        }
    }
    last_weighted
}
