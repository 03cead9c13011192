//! Poll controller: runs every enabled rule once per tick against the device.
//!
//! The controller is the single owner of the rule list, the I/O snapshot and
//! the edge memory. It is driven through `&mut self` from one task, so the
//! engine needs no locks.

use std::time::Instant;

use relayseq_domain::error::{NotFoundError, RelaySeqError, ValidationError};
use relayseq_domain::id::RuleId;
use relayseq_domain::io::DigitalState;
use relayseq_domain::rule::Rule;
use relayseq_domain::time;

use crate::engine::{DeviceCommand, EdgeTracker, RuleSlot, TickContext};
use crate::ports::{RelayDevice, RuleEntry, RuleSet};

/// Summary of one tick.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TickReport {
    /// The device could not be read; no rule ran.
    pub skipped: bool,
    /// Rising-edge mask sampled for this tick.
    pub rising: u8,
    pub writes: usize,
    pub failed_writes: usize,
}

impl TickReport {
    const fn skipped() -> Self {
        Self {
            skipped: true,
            rising: 0,
            writes: 0,
            failed_writes: 0,
        }
    }
}

pub struct SequenceController<D> {
    device: D,
    slots: Vec<RuleSlot>,
    snapshot: DigitalState,
    edges: EdgeTracker,
}

impl<D: RelayDevice> SequenceController<D> {
    /// Create a controller with no rules.
    pub fn new(device: D) -> Self {
        Self {
            device,
            slots: Vec::new(),
            snapshot: DigitalState::default(),
            edges: EdgeTracker::new(),
        }
    }

    pub fn device(&self) -> &D {
        &self.device
    }

    /// Last known I/O state.
    pub fn snapshot(&self) -> DigitalState {
        self.snapshot
    }

    /// Configured rules in evaluation order, with their enabled flag.
    pub fn rules(&self) -> impl Iterator<Item = (&Rule, bool)> + '_ {
        self.slots.iter().map(|slot| (slot.rule(), slot.is_enabled()))
    }

    /// The rule list as a persistable [`RuleSet`], stamped with the current time.
    pub fn rule_set(&self) -> RuleSet {
        RuleSet {
            entries: self
                .slots
                .iter()
                .map(|slot| RuleEntry {
                    rule: slot.rule().clone(),
                    enabled: slot.is_enabled(),
                })
                .collect(),
            saved_at: Some(time::now()),
        }
    }

    /// Open the device connection.
    ///
    /// # Errors
    ///
    /// Returns [`RelaySeqError::Device`] if the device cannot be reached.
    #[tracing::instrument(skip(self))]
    pub async fn connect(&self) -> Result<(), RelaySeqError> {
        self.device.connect().await?;
        tracing::info!("relay connected");
        Ok(())
    }

    /// Run one poll tick at `now`.
    ///
    /// 1. read inputs and outputs; on failure log and skip the tick
    /// 2. sample rising edges
    /// 3. for each enabled rule: apply its initial states if needed, run
    ///    its machine and write the resulting commands
    /// 4. commit the edge memory
    pub async fn tick(&mut self, now: Instant) -> TickReport {
        let inputs = match self.device.read_inputs().await {
            Ok(mask) => mask,
            Err(err) => {
                tracing::warn!(error = %err, "failed to read inputs, skipping tick");
                return TickReport::skipped();
            }
        };
        let outputs = match self.device.read_outputs().await {
            Ok(mask) => mask,
            Err(err) => {
                tracing::warn!(error = %err, "failed to read outputs, skipping tick");
                return TickReport::skipped();
            }
        };
        self.snapshot.set_input_mask(inputs);
        self.snapshot.set_output_mask(outputs);

        let edges = self.edges.sample(inputs);
        let mut report = TickReport {
            rising: edges.mask(),
            ..TickReport::default()
        };
        if edges.mask() != 0 {
            tracing::debug!(rising = edges.mask(), "input edges");
        }

        for index in 0..self.slots.len() {
            if !self.slots[index].is_enabled() {
                continue;
            }
            let initial = self.slots[index].apply_initial_state();
            self.write_all(&initial, &mut report).await;

            let ctx = TickContext::new(self.snapshot, edges);
            let commands = self.slots[index].tick(&ctx, now);
            self.write_all(&commands, &mut report).await;
        }

        self.edges.commit(inputs);
        report
    }

    /// Add a rule at the end of the list.
    ///
    /// Rules whose step program contains unusable parts are accepted; the
    /// problems are logged.
    ///
    /// # Errors
    ///
    /// Returns [`RelaySeqError::Validation`] if the rule breaks an invariant
    /// or its id is already used.
    #[tracing::instrument(skip(self, rule), fields(rule = %rule.display_name()))]
    pub fn add_rule(&mut self, rule: Rule, enabled: bool) -> Result<RuleId, RelaySeqError> {
        rule.validate()?;
        if self.position(rule.id).is_some() {
            return Err(ValidationError::DuplicateRule(rule.id.to_string()).into());
        }
        log_diagnostics(&rule);
        let id = rule.id;
        tracing::info!(kind = rule.kind.label(), enabled, summary = %rule, "rule added");
        self.slots.push(RuleSlot::new(rule, enabled));
        Ok(id)
    }

    /// Replace the rule with the same id, keeping its position and enabled flag.
    ///
    /// # Errors
    ///
    /// Returns [`RelaySeqError::Validation`] if the new rule is invalid, or
    /// [`RelaySeqError::NotFound`] if no rule has its id.
    #[tracing::instrument(skip(self, rule), fields(rule = %rule.display_name()))]
    pub async fn replace_rule(&mut self, rule: Rule) -> Result<(), RelaySeqError> {
        rule.validate()?;
        let index = self.require(rule.id)?;
        log_diagnostics(&rule);
        tracing::info!(summary = %rule, "rule edited");
        let commands = self.slots[index].replace(rule);
        self.write_all(&commands, &mut TickReport::default()).await;
        Ok(())
    }

    /// Remove a rule, stopping it first.
    ///
    /// # Errors
    ///
    /// Returns [`RelaySeqError::NotFound`] if no rule has this id.
    #[tracing::instrument(skip(self))]
    pub async fn remove_rule(&mut self, id: RuleId) -> Result<Rule, RelaySeqError> {
        let index = self.require(id)?;
        let (rule, commands) = self.slots.remove(index).retire();
        self.write_all(&commands, &mut TickReport::default()).await;
        tracing::info!(rule = %rule.display_name(), "rule removed");
        Ok(rule)
    }

    /// Enable or disable a rule.
    ///
    /// Disabling stops the rule and applies its end states unless it
    /// returns to its initial states. Enabling applies the initial states
    /// on the next tick.
    ///
    /// # Errors
    ///
    /// Returns [`RelaySeqError::NotFound`] if no rule has this id.
    #[tracing::instrument(skip(self))]
    pub async fn set_enabled(&mut self, id: RuleId, enabled: bool) -> Result<(), RelaySeqError> {
        let index = self.require(id)?;
        let slot = &mut self.slots[index];
        if enabled == slot.is_enabled() {
            return Ok(());
        }
        let commands = if enabled {
            slot.enable();
            Vec::new()
        } else {
            slot.disable()
        };
        tracing::info!(rule = %slot.rule().display_name(), enabled, "rule toggled");
        self.write_all(&commands, &mut TickReport::default()).await;
        Ok(())
    }

    /// Stop everything and release the device.
    ///
    /// Enabled rules are stopped (applying their end states unless they
    /// return to their initial states), then every output is switched off
    /// and the connection closed.
    ///
    /// # Errors
    ///
    /// Returns [`RelaySeqError::Device`] if switching the outputs off failed.
    /// The connection is closed either way.
    #[tracing::instrument(skip(self))]
    pub async fn shutdown(&mut self) -> Result<(), RelaySeqError> {
        for index in 0..self.slots.len() {
            let commands = self.slots[index].disable();
            self.write_all(&commands, &mut TickReport::default()).await;
        }
        let result = self.device.all_off().await;
        self.device.disconnect().await;
        tracing::info!("relay released");
        result.map_err(Into::into)
    }

    fn position(&self, id: RuleId) -> Option<usize> {
        self.slots.iter().position(|slot| slot.rule().id == id)
    }

    fn require(&self, id: RuleId) -> Result<usize, RelaySeqError> {
        self.position(id).ok_or_else(|| {
            NotFoundError {
                entity: "Rule",
                id: id.to_string(),
            }
            .into()
        })
    }

    /// Write commands in order. Successful writes are mirrored into the
    /// snapshot so later rules in the same tick see them; failures are
    /// logged and leave the snapshot untouched.
    async fn write_all(&mut self, commands: &[DeviceCommand], report: &mut TickReport) {
        for command in commands {
            match self.device.set(command.channel, command.on).await {
                Ok(()) => {
                    self.snapshot.set_output(command.channel, command.on);
                    report.writes += 1;
                    tracing::debug!(%command, "output written");
                }
                Err(err) => {
                    report.failed_writes += 1;
                    tracing::warn!(%command, error = %err, "failed to write output");
                }
            }
        }
    }
}

fn log_diagnostics(rule: &Rule) {
    for note in rule.diagnostics() {
        tracing::warn!(rule = %rule.display_name(), "{note}");
    }
}
