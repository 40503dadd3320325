//! Wizard state machine.
//!
//! `WizardState` is the single aggregate of user choices. It is only mutated through `Wizard`,
//! which owns navigation (gated by the transition table in [`step`]), the selection operations,
//! and the save latch around the summary -> command transition.
//!
//! Saving is split in two so callers can run the exchange anywhere (worker thread, test, inline):
//! `go_next` hands out a ticketed [`SaveRequest`], `finish_save` applies the result. A result
//! whose ticket no longer matches (the user navigated away meanwhile) is dropped.

pub mod step;

use log::{info, warn};
use std::collections::BTreeSet;

use crate::builder::{
    build_pipes_config, generate_cli_command, persisted_json, short_cli_command,
    DEFAULT_CLI_PACKAGE,
};
use crate::client::exchange::{ConfigExchange, ExchangeError};
use crate::models::config::{NetworkType, PackageManager, PipesConfig, Sink, TemplateId, TemplateParams};
use crate::templates::needs_params;
use crate::templates::params::TemplateParamsMap;
use crate::utils::validation::sanitize_project_folder;

pub use step::Step;

#[derive(Debug, Clone, PartialEq)]
pub struct WizardState {
    current_step: Step,
    project_name: String,
    package_manager: PackageManager,
    network_type: NetworkType,
    selected_network: Option<String>,
    selected_templates: Vec<TemplateId>,
    template_params: TemplateParamsMap,
    selected_sink: Option<Sink>,
    config_hash: Option<String>,
}

impl Default for WizardState {
    fn default() -> Self {
        Self {
            current_step: Step::Project,
            project_name: String::new(),
            package_manager: PackageManager::default(),
            network_type: NetworkType::default(),
            selected_network: None,
            selected_templates: Vec::new(),
            template_params: TemplateParamsMap::new(),
            selected_sink: None,
            config_hash: None,
        }
    }
}

impl WizardState {
    pub fn current_step(&self) -> Step {
        self.current_step
    }

    pub fn project_name(&self) -> &str {
        &self.project_name
    }

    pub fn sanitized_project_folder(&self) -> String {
        sanitize_project_folder(&self.project_name)
    }

    pub fn package_manager(&self) -> PackageManager {
        self.package_manager
    }

    pub fn network_type(&self) -> NetworkType {
        self.network_type
    }

    pub fn selected_network(&self) -> Option<&str> {
        self.selected_network.as_deref()
    }

    pub fn selected_templates(&self) -> &[TemplateId] {
        &self.selected_templates
    }

    pub fn is_template_selected(&self, template_id: TemplateId) -> bool {
        self.selected_templates.contains(&template_id)
    }

    pub fn template_params(&self) -> &TemplateParamsMap {
        &self.template_params
    }

    pub fn selected_sink(&self) -> Option<Sink> {
        self.selected_sink
    }

    pub fn config_hash(&self) -> Option<&str> {
        self.config_hash.as_deref()
    }

    /// Gate for leaving the current step forward.
    pub fn can_advance(&self) -> bool {
        (step::transition(self.current_step).gate)(self)
    }
}

/// Persistence work handed out by [`Wizard::go_next`] on summary -> command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SaveRequest {
    pub ticket: u64,
    pub json_config: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Advance {
    Moved(Step),
    /// Gate for the current step is closed.
    Blocked,
    /// Already at the last step.
    AtEnd,
    /// A save is in flight.
    Busy,
    SaveRequired(SaveRequest),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandView {
    /// `--config-id` form; present only when a hash was obtained.
    pub short: Option<String>,
    /// Inline `--config` form; always available.
    pub full: String,
}

#[derive(Debug, Clone)]
pub struct Wizard {
    state: WizardState,
    // Templates whose parameter editor is open. Not part of the derived config.
    expanded: BTreeSet<TemplateId>,
    pending_save: Option<u64>,
    next_ticket: u64,
    save_error: Option<String>,
    cli_package: String,
}

impl Default for Wizard {
    fn default() -> Self {
        Self::new(DEFAULT_CLI_PACKAGE)
    }
}

impl Wizard {
    pub fn new(cli_package: impl Into<String>) -> Self {
        Self {
            state: WizardState::default(),
            expanded: BTreeSet::new(),
            pending_save: None,
            next_ticket: 1,
            save_error: None,
            cli_package: cli_package.into(),
        }
    }

    pub fn state(&self) -> &WizardState {
        &self.state
    }

    pub fn current_step(&self) -> Step {
        self.state.current_step
    }

    pub fn can_advance(&self) -> bool {
        self.state.can_advance()
    }

    pub fn is_saving(&self) -> bool {
        self.pending_save.is_some()
    }

    pub fn save_error(&self) -> Option<&str> {
        self.save_error.as_deref()
    }

    pub fn cli_package(&self) -> &str {
        &self.cli_package
    }

    // =========================
    // Navigation
    // =========================

    pub fn go_next(&mut self) -> Advance {
        if self.pending_save.is_some() {
            return Advance::Busy;
        }

        let t = step::transition(self.state.current_step);
        let Some(next) = t.next else {
            return Advance::AtEnd;
        };
        if !(t.gate)(&self.state) {
            return Advance::Blocked;
        }

        if t.step == Step::Summary && next == Step::Command {
            let ticket = self.next_ticket;
            self.next_ticket += 1;
            self.pending_save = Some(ticket);
            info!(
                "[PHASE: wizard] [STEP: save_config] Saving config (ticket={})",
                ticket
            );
            return Advance::SaveRequired(SaveRequest {
                ticket,
                json_config: persisted_json(&self.config()),
            });
        }

        self.move_to(next);
        Advance::Moved(next)
    }

    /// Apply the outcome of a save started by `go_next`. Returns false for a stale ticket.
    ///
    /// Success stores the hash; failure clears it and records the message. Either way the
    /// wizard lands on the command step.
    pub fn finish_save(&mut self, ticket: u64, result: Result<String, ExchangeError>) -> bool {
        if self.pending_save != Some(ticket) {
            info!(
                "[PHASE: wizard] [STEP: save_config] Ignoring stale save result (ticket={})",
                ticket
            );
            return false;
        }
        self.pending_save = None;

        match result {
            Ok(hash) => {
                info!(
                    "[PHASE: wizard] [STEP: save_config] Config saved hash={}",
                    hash
                );
                self.state.config_hash = Some(hash);
                self.save_error = None;
            }
            Err(e) => {
                warn!(
                    "[PHASE: wizard] [STEP: save_config] Save failed, falling back to inline command: {}",
                    e
                );
                self.state.config_hash = None;
                self.save_error = Some(e.to_string());
            }
        }
        self.move_to(Step::Command);
        true
    }

    /// `go_next`, running any required save through `exchange` before returning.
    pub async fn go_next_with(&mut self, exchange: &dyn ConfigExchange) -> Advance {
        match self.go_next() {
            Advance::SaveRequired(req) => {
                let result = exchange.save(&req.json_config).await;
                self.finish_save(req.ticket, result);
                Advance::Moved(self.state.current_step)
            }
            other => other,
        }
    }

    /// Step back. No-op on the first step. Drops any in-flight save.
    pub fn go_back(&mut self) -> bool {
        self.cancel_save();
        match self.state.current_step.prev() {
            Some(prev) => {
                self.move_to(prev);
                true
            }
            None => false,
        }
    }

    /// Ungated jump (summary edit links). Drops any in-flight save.
    pub fn go_to(&mut self, step: Step) {
        self.cancel_save();
        self.move_to(step);
    }

    fn cancel_save(&mut self) {
        if let Some(ticket) = self.pending_save.take() {
            info!(
                "[PHASE: wizard] [STEP: save_config] Save cancelled by navigation (ticket={})",
                ticket
            );
        }
    }

    fn move_to(&mut self, step: Step) {
        if self.state.current_step != step {
            info!(
                "[PHASE: wizard] [STEP: navigate] {} -> {}",
                self.state.current_step.id(),
                step.id()
            );
        }
        self.state.current_step = step;
    }

    // =========================
    // Selections
    // =========================

    fn invalidate_hash(&mut self) {
        self.state.config_hash = None;
        self.save_error = None;
    }

    pub fn set_project_name(&mut self, name: impl Into<String>) {
        self.state.project_name = name.into();
        self.invalidate_hash();
    }

    pub fn set_package_manager(&mut self, package_manager: PackageManager) {
        self.state.package_manager = package_manager;
        self.invalidate_hash();
    }

    /// Switch network family. A change resets network, templates and their params.
    pub fn set_network_type(&mut self, network_type: NetworkType) {
        if self.state.network_type == network_type {
            return;
        }
        info!(
            "[PHASE: wizard] [STEP: network_type] {} -> {} (resetting selections)",
            self.state.network_type, network_type
        );
        self.state.network_type = network_type;
        self.state.selected_network = None;
        self.state.selected_templates.clear();
        self.state.template_params.clear();
        self.expanded.clear();
        self.invalidate_hash();
    }

    pub fn select_network(&mut self, slug: impl Into<String>) {
        let slug = slug.into();
        self.state.selected_network = (!slug.trim().is_empty()).then_some(slug);
        self.invalidate_hash();
    }

    /// Add or remove a template. Removing drops its params. Returns true when the template was
    /// added and its parameter editor should open.
    pub fn toggle_template(&mut self, template_id: TemplateId) -> bool {
        self.invalidate_hash();

        if let Some(pos) = self
            .state
            .selected_templates
            .iter()
            .position(|&t| t == template_id)
        {
            self.state.selected_templates.remove(pos);
            self.state.template_params.remove(template_id);
            self.expanded.remove(&template_id);
            return false;
        }

        self.state.selected_templates.push(template_id);
        if needs_params(template_id) {
            self.expanded.insert(template_id);
            return true;
        }
        false
    }

    pub fn update_template_params(&mut self, template_id: TemplateId, params: TemplateParams) {
        self.state.template_params.upsert(template_id, params);
        self.invalidate_hash();
    }

    pub fn select_sink(&mut self, sink: Sink) {
        self.state.selected_sink = Some(sink);
        self.invalidate_hash();
    }

    pub fn is_expanded(&self, template_id: TemplateId) -> bool {
        self.expanded.contains(&template_id)
    }

    pub fn expand(&mut self, template_id: TemplateId) {
        if self.state.is_template_selected(template_id) {
            self.expanded.insert(template_id);
        }
    }

    pub fn collapse(&mut self, template_id: TemplateId) {
        self.expanded.remove(&template_id);
    }

    // =========================
    // Derived output
    // =========================

    /// Canonical config from the current selections. A missing sink derives as `memory`.
    pub fn config(&self) -> PipesConfig {
        build_pipes_config(
            &self.state.sanitized_project_folder(),
            self.state.network_type,
            self.state.package_manager,
            self.state.selected_network.as_deref().unwrap_or_default(),
            &self.state.selected_templates,
            &self.state.template_params,
            self.state.selected_sink.unwrap_or(Sink::Memory),
        )
    }

    pub fn command_view(&self) -> CommandView {
        CommandView {
            short: self
                .state
                .config_hash
                .as_deref()
                .map(|h| short_cli_command(h, &self.cli_package)),
            full: generate_cli_command(&self.config(), &self.cli_package),
        }
    }
}
