//! Terminal UI for the starter wizard.
//!
//! Layout:
//! - Centered window titled "Pipes SDK Starter"
//! - Left banner with logo and step list
//! - Content panel per step, with a step indicator on top
//! - Bottom button row: [ Back ] [ Next ] [ Quit ]
//! - Popups for parameter editors and confirmations
//!
//! Collaborator calls (config save, contract lookup) run on worker threads; results come back as
//! `UiMsg` over a channel and are applied by `drain_messages` on the UI thread.
//!
//! Note: Logging is file-only in TUI mode (stdout logging is disabled) to avoid corrupting the terminal UI.

use crate::catalog::Catalog;
use crate::client::exchange::{ConfigExchange, ExchangeError};
use crate::client::metadata::MetadataLookup;
use crate::models::config::{NetworkType, PackageManager, Sink, TemplateId};
use crate::models::responses::ContractMetadata;
use crate::security::crypto::config_hash;
use crate::templates::custom::{self, ContractPicker, FetchRequest, PickerStage};
use crate::templates::form::ParamForm;
use crate::templates::{get_template_metadata, is_disabled, needs_params};
use crate::utils::validation::{address_format_hint, format_addresses_for_display, truncate_address};
use crate::wizard::{Advance, SaveRequest, Step, Wizard};
use anyhow::Result;
use crossterm::event::{self, Event, KeyCode, KeyEventKind};
use crossterm::terminal::{
    disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen,
};
use crossterm::ExecutableCommand;
use log::{info, warn};
use ratatui::backend::{Backend, CrosstermBackend, TestBackend};
use ratatui::layout::{Alignment, Constraint, Direction, Layout, Margin, Rect};
use ratatui::style::{Color, Modifier, Style};
use ratatui::text::{Line, Span, Text};
use ratatui::widgets::{Block, Borders, Clear, Paragraph, Wrap};
use ratatui::Terminal;
use std::io::{self, Stdout};
use std::sync::mpsc;
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

const ASCII_LOGO: &str = r#" ____  _
|  _ \(_)_ __   ___  ___
| |_) | | '_ \ / _ \/ __|
|  __/| | |_) |  __/\__ \
|_|   |_| .__/ \___||___/
        |_|   SDK starter"#;

const WINDOW_TITLE: &str = "Pipes SDK Starter";

/// Collaborators the UI hands work to.
pub struct Workers {
    pub runtime: tokio::runtime::Handle,
    pub exchange: Arc<dyn ConfigExchange>,
    pub metadata: Arc<dyn MetadataLookup>,
    pub tx: mpsc::Sender<UiMsg>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ButtonFocus {
    Back,
    Next,
    Quit,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum FocusTarget {
    Field(usize),
    Button(ButtonFocus),
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Modal {
    ConfirmQuit { yes_selected: bool },
    Message { title: String, body: String },
}

#[derive(Debug)]
pub enum UiMsg {
    ConfigSaved {
        ticket: u64,
        result: Result<String, ExchangeError>,
    },
    ContractsFetched {
        ticket: u64,
        result: Result<Vec<ContractMetadata>, String>,
    },
}

#[derive(Debug, Clone)]
enum ParamEditor {
    Form {
        form: ParamForm,
        field: usize,
        error: Option<String>,
    },
    Contracts {
        template_id: TemplateId,
        picker: ContractPicker,
        row: usize,
        error: Option<String>,
    },
}

impl ParamEditor {
    fn template_id(&self) -> TemplateId {
        match self {
            ParamEditor::Form { form, .. } => form.template_id(),
            ParamEditor::Contracts { template_id, .. } => *template_id,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct TextInput {
    value: String,
    // char index
    cursor: usize,
}

impl TextInput {
    fn new(value: impl Into<String>) -> Self {
        let v = value.into();
        Self {
            cursor: v.chars().count(),
            value: v,
        }
    }

    fn byte_index(&self, char_index: usize) -> usize {
        self.value
            .char_indices()
            .nth(char_index)
            .map(|(i, _)| i)
            .unwrap_or(self.value.len())
    }

    fn len(&self) -> usize {
        self.value.chars().count()
    }

    fn clear(&mut self) {
        self.value.clear();
        self.cursor = 0;
    }

    fn handle_key(&mut self, code: KeyCode) -> bool {
        match code {
            KeyCode::Char(c) => {
                let idx = self.byte_index(self.cursor);
                self.value.insert(idx, c);
                self.cursor += 1;
                true
            }
            KeyCode::Backspace => {
                if self.cursor > 0 {
                    let idx = self.byte_index(self.cursor - 1);
                    self.value.remove(idx);
                    self.cursor -= 1;
                }
                true
            }
            KeyCode::Delete => {
                if self.cursor < self.len() {
                    let idx = self.byte_index(self.cursor);
                    self.value.remove(idx);
                }
                true
            }
            KeyCode::Left => {
                self.cursor = self.cursor.saturating_sub(1);
                true
            }
            KeyCode::Right => {
                self.cursor = (self.cursor + 1).min(self.len());
                true
            }
            KeyCode::Home => {
                self.cursor = 0;
                true
            }
            KeyCode::End => {
                self.cursor = self.len();
                true
            }
            _ => false,
        }
    }
}

/// Editable steps listed on the summary, in display order.
const SUMMARY_EDIT_TARGETS: [Step; 5] = [
    Step::Project,
    Step::PackageManager,
    Step::Network,
    Step::Pipeline,
    Step::Sink,
];

struct App {
    wizard: Wizard,
    catalog: Catalog,
    exchange_label: String,
    focus: FocusTarget,
    modal: Option<Modal>,
    editor: Option<ParamEditor>,
    quit: bool,
    project_input: TextInput,
    package_index: usize,
    network_query: TextInput,
    network_index: usize,
    template_index: usize,
    sink_index: usize,
    summary_index: usize,
    show_full_command: bool,
}

impl App {
    fn new(wizard: Wizard, catalog: Catalog, exchange_label: impl Into<String>) -> Self {
        let project_input = TextInput::new(wizard.state().project_name());
        Self {
            wizard,
            catalog,
            exchange_label: exchange_label.into(),
            focus: FocusTarget::Field(0),
            modal: None,
            editor: None,
            quit: false,
            project_input,
            package_index: 0,
            network_query: TextInput::new(""),
            network_index: 0,
            template_index: 0,
            sink_index: 0,
            summary_index: 0,
            show_full_command: false,
        }
    }

    fn step(&self) -> Step {
        self.wizard.current_step()
    }

    fn network_type(&self) -> NetworkType {
        self.wizard.state().network_type()
    }

    fn filtered_network_slugs(&self) -> Vec<String> {
        self.catalog
            .search_networks(self.network_type(), &self.network_query.value)
            .into_iter()
            .map(|n| n.slug.clone())
            .collect()
    }

    fn template_ids(&self) -> Vec<TemplateId> {
        self.catalog
            .template_options(self.network_type())
            .iter()
            .map(|t| t.id)
            .collect()
    }

    fn sinks(&self) -> Vec<Sink> {
        let from_catalog: Vec<Sink> = self.catalog.sinks().iter().map(|s| s.id).collect();
        if from_catalog.is_empty() {
            Sink::ALL.to_vec()
        } else {
            from_catalog
        }
    }
}

// =========================
// Step metadata
// =========================

fn step_title(step: Step) -> &'static str {
    match step {
        Step::Project => "Project Name",
        Step::PackageManager => "Package Manager",
        Step::Network => "Network",
        Step::Pipeline => "Pipeline Templates",
        Step::Sink => "Storage",
        Step::Summary => "Review",
        Step::Command => "Your Command",
    }
}

fn next_label(app: &App) -> &'static str {
    if app.wizard.is_saving() {
        return "Saving...";
    }
    match app.step() {
        Step::Summary => "Generate",
        Step::Command => "Finish",
        _ => "Next",
    }
}

fn can_go_back(app: &App) -> bool {
    app.step().prev().is_some()
}

fn can_go_next(app: &App) -> bool {
    !app.wizard.is_saving() && (app.step() == Step::Command || app.wizard.can_advance())
}

fn field_count(step: Step) -> usize {
    match step {
        Step::Network => 3,
        _ => 1,
    }
}

fn blocked_reason(app: &App) -> String {
    match app.step() {
        Step::Project => "Enter a project name to continue.".to_string(),
        Step::Network => "Select a network to continue.".to_string(),
        Step::Pipeline => {
            if app.wizard.state().selected_templates().is_empty() {
                "Select at least one template.".to_string()
            } else {
                let missing: Vec<String> = app
                    .wizard
                    .state()
                    .selected_templates()
                    .iter()
                    .filter(|&&id| {
                        needs_params(id) && !app.wizard.state().template_params().contains(id)
                    })
                    .map(|&id| app.catalog.template_name(app.network_type(), id))
                    .collect();
                format!("Configure parameters for: {}", missing.join(", "))
            }
        }
        Step::Sink => "Choose where data lands.".to_string(),
        _ => "This step is incomplete.".to_string(),
    }
}

// =========================
// Entry points
// =========================

pub fn run(wizard: Wizard, catalog: Catalog, workers: Workers, rx: mpsc::Receiver<UiMsg>) -> Result<()> {
    info!("[PHASE: tui] [STEP: start] Starting TUI wizard");

    let mut terminal = setup_terminal()?;
    let result = run_loop(&mut terminal, wizard, catalog, &workers, &rx);
    restore_terminal(&mut terminal)?;

    result
}

/// Render a single frame of `target` into an in-memory backend.
pub fn smoke(catalog: Catalog, cli_package: &str, target: &str) -> Result<()> {
    info!(
        "[PHASE: tui] [STEP: smoke] Rendering single-frame TUI smoke target={}",
        target
    );

    let app = new_smoke_app(catalog, cli_package, target.trim());

    // In-memory backend: no raw mode, no alternate screen.
    let backend = TestBackend::new(100, 30);
    let mut terminal = Terminal::new(backend)?;
    terminal.draw(|f| draw(f.size(), f, &app))?;

    Ok(())
}

fn new_smoke_app(catalog: Catalog, cli_package: &str, target: &str) -> App {
    // Smoke-only: seeded state for deterministic step rendering in CI/tooling.
    let mut wizard = Wizard::new(cli_package);
    wizard.set_project_name("My Bot");
    wizard.select_network("ethereum-mainnet");
    wizard.toggle_template(TemplateId::Erc20Transfers);
    if let Some(defaults) = get_template_metadata(TemplateId::Erc20Transfers)
        .and_then(|m| m.default_params.clone())
    {
        wizard.update_template_params(TemplateId::Erc20Transfers, defaults);
    }
    wizard.collapse(TemplateId::Erc20Transfers);
    wizard.select_sink(Sink::Clickhouse);

    let step = match target.to_ascii_lowercase().as_str() {
        "params" | "contracts" => Step::Pipeline,
        other => Step::parse(other).unwrap_or(Step::Project),
    };

    if step == Step::Command {
        wizard.go_to(Step::Summary);
        if let Advance::SaveRequired(req) = wizard.go_next() {
            let hash = config_hash(&req.json_config);
            wizard.finish_save(req.ticket, Ok(hash));
        }
    } else {
        wizard.go_to(step);
    }

    let mut app = App::new(wizard, catalog, "smoke");
    match target.to_ascii_lowercase().as_str() {
        "params" => open_editor(&mut app, TemplateId::Erc20Transfers),
        "contracts" => {
            let params = custom::sample_params();
            app.editor = Some(ParamEditor::Contracts {
                template_id: TemplateId::Custom,
                picker: ContractPicker::from_existing(
                    NetworkType::Evm,
                    "ethereum-mainnet",
                    Some(&params),
                ),
                row: 0,
                error: None,
            });
        }
        _ => {}
    }
    app.focus = FocusTarget::Button(ButtonFocus::Next);
    app
}

fn setup_terminal() -> Result<Terminal<CrosstermBackend<Stdout>>> {
    enable_raw_mode()?;
    let mut stdout = io::stdout();
    stdout.execute(EnterAlternateScreen)?;
    let backend = CrosstermBackend::new(stdout);
    let terminal = Terminal::new(backend)?;
    Ok(terminal)
}

fn restore_terminal(terminal: &mut Terminal<CrosstermBackend<Stdout>>) -> Result<()> {
    disable_raw_mode()?;
    terminal.backend_mut().execute(LeaveAlternateScreen)?;
    terminal.show_cursor()?;
    Ok(())
}

fn run_loop<B: Backend>(
    terminal: &mut Terminal<B>,
    wizard: Wizard,
    catalog: Catalog,
    workers: &Workers,
    rx: &mpsc::Receiver<UiMsg>,
) -> Result<()> {
    let tick_rate = Duration::from_millis(100);
    let mut last_tick = Instant::now();
    let mut app = App::new(wizard, catalog, workers.exchange.describe());

    while !app.quit {
        drain_messages(&mut app, rx);
        terminal.draw(|f| draw(f.size(), f, &app))?;

        let timeout = tick_rate
            .checked_sub(last_tick.elapsed())
            .unwrap_or_else(|| Duration::from_millis(0));

        if event::poll(timeout)? {
            if let Event::Key(key) = event::read()? {
                if key.kind == KeyEventKind::Press {
                    handle_key(&mut app, key.code, workers);
                }
            }
        }

        if last_tick.elapsed() >= tick_rate {
            last_tick = Instant::now();
        }
    }

    info!("[PHASE: tui] [STEP: exit] TUI wizard closed");
    Ok(())
}

// =========================
// Workers
// =========================

fn start_save(req: SaveRequest, workers: &Workers) {
    let exchange = Arc::clone(&workers.exchange);
    let runtime = workers.runtime.clone();
    let tx = workers.tx.clone();
    thread::spawn(move || {
        let result = runtime.block_on(exchange.save(&req.json_config));
        let _ = tx.send(UiMsg::ConfigSaved {
            ticket: req.ticket,
            result,
        });
    });
}

fn start_fetch(fetch: FetchRequest, workers: &Workers) {
    let metadata = Arc::clone(&workers.metadata);
    let runtime = workers.runtime.clone();
    let tx = workers.tx.clone();
    thread::spawn(move || {
        let result = runtime
            .block_on(metadata.lookup(&fetch.request))
            .map_err(|e| e.to_string());
        let _ = tx.send(UiMsg::ContractsFetched {
            ticket: fetch.ticket,
            result,
        });
    });
}

fn drain_messages(app: &mut App, rx: &mpsc::Receiver<UiMsg>) {
    while let Ok(msg) = rx.try_recv() {
        apply_message(app, msg);
    }
}

fn apply_message(app: &mut App, msg: UiMsg) {
    match msg {
        UiMsg::ConfigSaved { ticket, result } => {
            if app.wizard.finish_save(ticket, result) {
                app.show_full_command = app.wizard.state().config_hash().is_none();
                app.focus = FocusTarget::Field(0);
            }
        }
        UiMsg::ContractsFetched { ticket, result } => {
            if let Some(ParamEditor::Contracts { picker, row, .. }) = app.editor.as_mut() {
                if picker.finish_fetch(ticket, result) {
                    *row = 0;
                }
            } else {
                warn!(
                    "[PHASE: tui] [STEP: contracts] Dropping lookup result for closed editor (ticket={})",
                    ticket
                );
            }
        }
    }
}

// =========================
// Key handling
// =========================

fn handle_key(app: &mut App, code: KeyCode, workers: &Workers) {
    if let Some(modal) = app.modal.clone() {
        match modal {
            Modal::ConfirmQuit { yes_selected } => match code {
                KeyCode::Left | KeyCode::Right | KeyCode::Tab => {
                    app.modal = Some(Modal::ConfirmQuit {
                        yes_selected: !yes_selected,
                    });
                }
                KeyCode::Enter => {
                    app.modal = None;
                    if yes_selected {
                        app.quit = true;
                    }
                }
                KeyCode::Esc => app.modal = None,
                _ => {}
            },
            Modal::Message { .. } => {
                if matches!(code, KeyCode::Enter | KeyCode::Esc) {
                    app.modal = None;
                }
            }
        }
        return;
    }

    if app.editor.is_some() {
        handle_editor_key(app, code, workers);
        return;
    }

    match code {
        KeyCode::Esc => {
            app.modal = Some(Modal::ConfirmQuit {
                yes_selected: false,
            });
        }
        KeyCode::Tab => cycle_focus(app, true),
        KeyCode::BackTab => cycle_focus(app, false),
        _ => match app.focus {
            FocusTarget::Field(i) => handle_field_key(app, i, code, workers),
            FocusTarget::Button(b) => handle_button_key(app, b, code, workers),
        },
    }
}

fn focus_order(step: Step) -> Vec<FocusTarget> {
    let mut order: Vec<FocusTarget> = (0..field_count(step)).map(FocusTarget::Field).collect();
    order.push(FocusTarget::Button(ButtonFocus::Back));
    order.push(FocusTarget::Button(ButtonFocus::Next));
    order.push(FocusTarget::Button(ButtonFocus::Quit));
    order
}

fn cycle_focus(app: &mut App, forward: bool) {
    let order = focus_order(app.step());
    let pos = order.iter().position(|f| *f == app.focus).unwrap_or(0);
    let len = order.len();
    let next = if forward {
        (pos + 1) % len
    } else {
        (pos + len - 1) % len
    };
    app.focus = order[next];
}

fn handle_button_key(app: &mut App, button: ButtonFocus, code: KeyCode, workers: &Workers) {
    match code {
        KeyCode::Left => {
            app.focus = FocusTarget::Button(match button {
                ButtonFocus::Back => ButtonFocus::Back,
                ButtonFocus::Next => ButtonFocus::Back,
                ButtonFocus::Quit => ButtonFocus::Next,
            });
        }
        KeyCode::Right => {
            app.focus = FocusTarget::Button(match button {
                ButtonFocus::Back => ButtonFocus::Next,
                ButtonFocus::Next => ButtonFocus::Quit,
                ButtonFocus::Quit => ButtonFocus::Quit,
            });
        }
        KeyCode::Enter => match button {
            ButtonFocus::Back => {
                if app.wizard.go_back() {
                    on_enter_step(app);
                    app.focus = FocusTarget::Button(ButtonFocus::Back);
                }
            }
            ButtonFocus::Next => go_next(app, workers),
            ButtonFocus::Quit => {
                app.modal = Some(Modal::ConfirmQuit {
                    yes_selected: false,
                });
            }
        },
        _ => {}
    }
}

fn go_next(app: &mut App, workers: &Workers) {
    match app.wizard.go_next() {
        Advance::Moved(_) => {
            on_enter_step(app);
        }
        Advance::SaveRequired(req) => start_save(req, workers),
        Advance::Blocked => {
            app.modal = Some(Modal::Message {
                title: "Not quite yet".to_string(),
                body: blocked_reason(app),
            });
        }
        Advance::AtEnd => app.quit = true,
        Advance::Busy => {}
    }
}

fn on_enter_step(app: &mut App) {
    app.focus = FocusTarget::Field(0);
    match app.step() {
        Step::Project => {
            app.project_input = TextInput::new(app.wizard.state().project_name());
        }
        Step::PackageManager => {
            let pm = app.wizard.state().package_manager();
            app.package_index = PackageManager::ALL.iter().position(|p| *p == pm).unwrap_or(0);
        }
        Step::Network => {
            let slugs = app.filtered_network_slugs();
            app.network_index = app
                .wizard
                .state()
                .selected_network()
                .and_then(|sel| slugs.iter().position(|s| s == sel))
                .unwrap_or(0);
        }
        Step::Sink => {
            let sinks = app.sinks();
            app.sink_index = app
                .wizard
                .state()
                .selected_sink()
                .and_then(|sel| sinks.iter().position(|s| *s == sel))
                .unwrap_or(0);
        }
        Step::Command => {
            app.show_full_command = app.wizard.state().config_hash().is_none();
        }
        _ => {}
    }
}

fn move_index(index: &mut usize, len: usize, code: KeyCode) -> bool {
    if len == 0 {
        *index = 0;
        return false;
    }
    match code {
        KeyCode::Up => {
            *index = index.saturating_sub(1);
            true
        }
        KeyCode::Down => {
            *index = (*index + 1).min(len - 1);
            true
        }
        _ => false,
    }
}

fn handle_field_key(app: &mut App, field: usize, code: KeyCode, workers: &Workers) {
    match app.step() {
        Step::Project => {
            if code == KeyCode::Enter {
                go_next(app, workers);
            } else if app.project_input.handle_key(code) {
                let value = app.project_input.value.clone();
                app.wizard.set_project_name(value);
            }
        }
        Step::PackageManager => {
            if move_index(&mut app.package_index, PackageManager::ALL.len(), code) {
                app.wizard
                    .set_package_manager(PackageManager::ALL[app.package_index]);
            } else if code == KeyCode::Enter {
                go_next(app, workers);
            }
        }
        Step::Network => handle_network_key(app, field, code),
        Step::Pipeline => handle_pipeline_key(app, code),
        Step::Sink => {
            let sinks = app.sinks();
            if !move_index(&mut app.sink_index, sinks.len(), code)
                && matches!(code, KeyCode::Enter | KeyCode::Char(' '))
            {
                if let Some(&sink) = sinks.get(app.sink_index) {
                    app.wizard.select_sink(sink);
                }
            }
        }
        Step::Summary => {
            if !move_index(&mut app.summary_index, SUMMARY_EDIT_TARGETS.len(), code)
                && matches!(code, KeyCode::Enter | KeyCode::Char('e'))
            {
                if let Some(&target) = SUMMARY_EDIT_TARGETS.get(app.summary_index) {
                    app.wizard.go_to(target);
                    on_enter_step(app);
                }
            }
        }
        Step::Command => {
            if matches!(code, KeyCode::Char('f') | KeyCode::Char(' ')) {
                app.show_full_command = !app.show_full_command;
            }
        }
    }
}

fn handle_network_key(app: &mut App, field: usize, code: KeyCode) {
    match field {
        0 => {
            if matches!(code, KeyCode::Left | KeyCode::Right | KeyCode::Char(' ')) {
                let nt = app.network_type().toggle();
                app.wizard.set_network_type(nt);
                app.network_query.clear();
                app.network_index = 0;
                app.template_index = 0;
            }
        }
        1 => {
            if app.network_query.handle_key(code) {
                app.network_index = 0;
            }
        }
        _ => {
            let slugs = app.filtered_network_slugs();
            if !move_index(&mut app.network_index, slugs.len(), code)
                && matches!(code, KeyCode::Enter | KeyCode::Char(' '))
            {
                if let Some(slug) = slugs.get(app.network_index) {
                    app.wizard.select_network(slug.clone());
                }
            }
        }
    }
}

fn handle_pipeline_key(app: &mut App, code: KeyCode) {
    let ids = app.template_ids();
    if move_index(&mut app.template_index, ids.len(), code) {
        return;
    }
    let Some(&id) = ids.get(app.template_index) else {
        return;
    };

    match code {
        KeyCode::Char(' ') => {
            if is_disabled(id) && !app.wizard.state().is_template_selected(id) {
                app.modal = Some(Modal::Message {
                    title: "Coming soon".to_string(),
                    body: format!(
                        "{} is not available yet.",
                        app.catalog.template_name(app.network_type(), id)
                    ),
                });
                return;
            }
            if app.wizard.toggle_template(id) {
                open_editor(app, id);
            }
        }
        KeyCode::Enter | KeyCode::Char('e') => {
            if app.wizard.state().is_template_selected(id) && needs_params(id) {
                app.wizard.expand(id);
                open_editor(app, id);
            }
        }
        _ => {}
    }
}

fn open_editor(app: &mut App, template_id: TemplateId) {
    let existing = app.wizard.state().template_params().get(template_id);
    let editor = if template_id == TemplateId::Custom {
        let network = app
            .wizard
            .state()
            .selected_network()
            .unwrap_or_default()
            .to_string();
        Some(ParamEditor::Contracts {
            template_id,
            picker: ContractPicker::from_existing(app.network_type(), network, existing),
            row: 0,
            error: None,
        })
    } else {
        ParamForm::for_template(template_id, existing).map(|form| ParamEditor::Form {
            form,
            field: 0,
            error: None,
        })
    };
    app.editor = editor;
}

fn close_editor(app: &mut App) {
    if let Some(editor) = app.editor.take() {
        app.wizard.collapse(editor.template_id());
    }
}

fn contract_rows(picker: &ContractPicker) -> Vec<(String, String)> {
    picker
        .contracts()
        .iter()
        .flat_map(|c| {
            c.contract_events
                .iter()
                .map(move |e| (c.contract_address.clone(), e.name.clone()))
        })
        .collect()
}

fn handle_editor_key(app: &mut App, code: KeyCode, workers: &Workers) {
    let Some(editor) = app.editor.as_mut() else {
        return;
    };

    match editor {
        ParamEditor::Form { form, field, error } => match code {
            KeyCode::Esc => close_editor(app),
            KeyCode::Up | KeyCode::BackTab => *field = field.saturating_sub(1),
            KeyCode::Down | KeyCode::Tab => {
                *field = (*field + 1).min(form.fields().len().saturating_sub(1));
            }
            KeyCode::Char(c) => {
                if let Some(v) = form.value_mut(*field) {
                    v.push(c);
                }
            }
            KeyCode::Backspace => {
                if let Some(v) = form.value_mut(*field) {
                    v.pop();
                }
            }
            KeyCode::Enter => match form.submit() {
                Ok(params) => {
                    let id = form.template_id();
                    app.wizard.update_template_params(id, params);
                    close_editor(app);
                }
                Err(e) => *error = Some(e.to_string()),
            },
            _ => {}
        },
        ParamEditor::Contracts {
            template_id,
            picker,
            row,
            error,
        } => match picker.stage() {
            PickerStage::Input => match code {
                KeyCode::Esc => {
                    picker.cancel_fetch();
                    close_editor(app);
                }
                KeyCode::Char(c) => picker.address_input_mut().push(c),
                KeyCode::Backspace => {
                    picker.address_input_mut().pop();
                }
                KeyCode::Enter => {
                    if let Some(fetch) = picker.begin_fetch() {
                        start_fetch(fetch, workers);
                    }
                }
                _ => {}
            },
            PickerStage::Selection => {
                let rows = contract_rows(picker);
                if move_index(row, rows.len(), code) {
                    return;
                }
                let current = rows.get(*row).cloned();
                match code {
                    KeyCode::Esc => close_editor(app),
                    KeyCode::Char(' ') => {
                        if let Some((addr, event)) = current {
                            picker.toggle_event(&addr, &event);
                        }
                    }
                    KeyCode::Char('a') => {
                        if let Some((addr, _)) = current {
                            picker.select_all_events(&addr);
                        }
                    }
                    KeyCode::Char('n') => {
                        if let Some((addr, _)) = current {
                            picker.deselect_all_events(&addr);
                        }
                    }
                    KeyCode::Char('i') => picker.edit_addresses(),
                    KeyCode::Enter => match picker.submit() {
                        Ok(params) => {
                            let id = *template_id;
                            app.wizard.update_template_params(id, params);
                            close_editor(app);
                        }
                        Err(e) => *error = Some(e.to_string()),
                    },
                    _ => {}
                }
            }
        },
    }
}

// =========================
// Drawing
// =========================

fn draw(area: Rect, f: &mut ratatui::Frame<'_>, app: &App) {
    let window_area = centered_window(area, 100, 30);

    let outer_block = Block::default()
        .borders(Borders::ALL)
        .title(WINDOW_TITLE);
    f.render_widget(outer_block, window_area);

    // Inner layout: banner + content + buttons row
    let inner = window_area.inner(&Margin {
        vertical: 1,
        horizontal: 1,
    });
    let rows = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Min(0), Constraint::Length(1)].as_ref())
        .split(inner);

    let body = rows[0];
    let buttons = rows[1];

    let cols = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Length(30), Constraint::Min(0)].as_ref())
        .split(body);

    draw_banner(f, cols[0], app);

    let content_block = Block::default()
        .borders(Borders::ALL)
        .title(step_title(app.step()));
    f.render_widget(content_block, cols[1]);
    let content_inner = cols[1].inner(&Margin {
        vertical: 1,
        horizontal: 1,
    });
    let content_rows = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Length(2), Constraint::Min(0)].as_ref())
        .split(content_inner);

    f.render_widget(
        Paragraph::new(step_indicator(app.step())).wrap(Wrap { trim: false }),
        content_rows[0],
    );
    let content = Paragraph::new(Text::from(step_lines(app)))
        .alignment(Alignment::Left)
        .wrap(Wrap { trim: false });
    f.render_widget(content, content_rows[1]);

    draw_buttons(f, buttons, app);

    if let Some(editor) = app.editor.as_ref() {
        draw_editor(f, window_area, app, editor);
    }

    if let Some(modal) = app.modal.as_ref() {
        match modal {
            Modal::ConfirmQuit { yes_selected } => draw_quit_modal(f, window_area, *yes_selected),
            Modal::Message { title, body } => draw_message_modal(f, window_area, title, body),
        }
    }
}

fn centered_window(area: Rect, width: u16, height: u16) -> Rect {
    let w = width.min(area.width.saturating_sub(2)).max(60).min(area.width);
    let h = height.min(area.height.saturating_sub(2)).max(20).min(area.height);
    let x = area.x + (area.width.saturating_sub(w)) / 2;
    let y = area.y + (area.height.saturating_sub(h)) / 2;
    Rect {
        x,
        y,
        width: w,
        height: h,
    }
}

fn popup_area(window_area: Rect, width: u16, height: u16) -> Rect {
    let w = width.min(window_area.width.saturating_sub(4));
    let h = height.min(window_area.height.saturating_sub(2));
    Rect {
        x: window_area.x + (window_area.width.saturating_sub(w)) / 2,
        y: window_area.y + (window_area.height.saturating_sub(h)) / 2,
        width: w,
        height: h,
    }
}

fn draw_banner(f: &mut ratatui::Frame<'_>, area: Rect, app: &App) {
    let current = app.step();
    let mut lines: Vec<Line<'static>> = ASCII_LOGO.lines().map(|l| Line::from(l.to_string())).collect();
    lines.push(Line::from(""));
    for step in Step::ALL {
        let marker = if step == current {
            ">"
        } else if step < current {
            "*"
        } else {
            " "
        };
        let style = if step == current {
            Style::default().add_modifier(Modifier::BOLD)
        } else {
            Style::default()
        };
        lines.push(Line::from(Span::styled(
            format!("{} {}. {}", marker, step.index() + 1, step.label()),
            style,
        )));
        if step == current {
            lines.push(Line::from(format!("     {}", step.helper())));
        }
    }
    lines.push(Line::from(""));
    lines.push(Line::from(format!("Store: {}", app.exchange_label)));

    let banner = Paragraph::new(Text::from(lines))
        .block(Block::default().borders(Borders::ALL))
        .wrap(Wrap { trim: false });
    f.render_widget(banner, area);
}

fn step_indicator(current: Step) -> Line<'static> {
    let mut spans = Vec::new();
    for (i, step) in Step::ALL.iter().enumerate() {
        if i > 0 {
            spans.push(Span::raw(" > "));
        }
        let style = if *step == current {
            Style::default().add_modifier(Modifier::REVERSED)
        } else if *step < current {
            Style::default().fg(Color::Green)
        } else {
            Style::default().fg(Color::DarkGray)
        };
        spans.push(Span::styled(step.label().to_string(), style));
    }
    Line::from(spans)
}

fn prefix(app: &App, field: usize) -> &'static str {
    if app.focus == FocusTarget::Field(field) {
        ">"
    } else {
        " "
    }
}

fn step_lines(app: &App) -> Vec<Line<'static>> {
    let state = app.wizard.state();
    match app.step() {
        Step::Project => {
            let folder = state.sanitized_project_folder();
            vec![
                Line::from("Give your project a name. It becomes the folder name."),
                Line::from(""),
                Line::from(format!("{} Project name: {}", prefix(app, 0), app.project_input.value)),
                Line::from(""),
                Line::from(format!("Folder: {}", folder)),
            ]
        }
        Step::PackageManager => {
            let mut lines = vec![
                Line::from("Which package manager should the project use?"),
                Line::from(""),
            ];
            for pm in PackageManager::ALL {
                let mark = if state.package_manager() == pm { "(x)" } else { "( )" };
                lines.push(Line::from(format!(
                    "{} {:<5} {}",
                    mark,
                    pm.as_str(),
                    pm.description()
                )));
            }
            lines.push(Line::from(""));
            lines.push(Line::from("Use Up/Down to change selection."));
            lines
        }
        Step::Network => {
            let nt = state.network_type();
            let evm = if nt == NetworkType::Evm { "[EVM]" } else { " EVM " };
            let svm = if nt == NetworkType::Svm { "[SVM]" } else { " SVM " };
            let mut lines = vec![
                Line::from(format!("{} Network type: {}  {}", prefix(app, 0), evm, svm)),
                Line::from(format!("{} Search: {}", prefix(app, 1), app.network_query.value)),
                Line::from(""),
            ];
            let hits = app
                .catalog
                .search_networks(nt, &app.network_query.value);
            if hits.is_empty() {
                lines.push(Line::from("No networks match your search."));
            }
            let start = app.network_index.saturating_sub(9);
            for (i, n) in hits.iter().enumerate().skip(start).take(10) {
                let cursor = if i == app.network_index && app.focus == FocusTarget::Field(2) {
                    ">"
                } else {
                    " "
                };
                let mark = if state.selected_network() == Some(n.slug.as_str()) {
                    "(x)"
                } else {
                    "( )"
                };
                let chain = n
                    .chain_id
                    .as_deref()
                    .map(|c| format!(" #{}", c))
                    .unwrap_or_default();
                let mut tags = vec![n.kind.clone()];
                if n.realtime {
                    tags.push("realtime".to_string());
                }
                if n.traces {
                    tags.push("traces".to_string());
                }
                if n.state_diffs {
                    tags.push("state diffs".to_string());
                }
                lines.push(Line::from(format!(
                    "{}{} {}{}  [{}]",
                    cursor,
                    mark,
                    n.name,
                    chain,
                    tags.join(", ")
                )));
            }
            lines.push(Line::from(""));
            lines.push(Line::from(
                "Tab moves between fields. Space toggles type / selects network.",
            ));
            lines
        }
        Step::Pipeline => {
            let nt = state.network_type();
            let mut lines = vec![
                Line::from("Select one or more templates for your pipeline."),
                Line::from(""),
            ];
            for (i, opt) in app.catalog.template_options(nt).iter().enumerate() {
                let cursor = if i == app.template_index { ">" } else { " " };
                let mark = if state.is_template_selected(opt.id) { "[x]" } else { "[ ]" };
                let mut suffix = String::new();
                if is_disabled(opt.id) {
                    suffix.push_str(" (coming soon)");
                } else if state.is_template_selected(opt.id) && needs_params(opt.id) {
                    if state.template_params().contains(opt.id) {
                        suffix.push_str(" (configured)");
                    } else {
                        suffix.push_str(" (needs parameters)");
                    }
                }
                lines.push(Line::from(format!("{}{} {}{}", cursor, mark, opt.name, suffix)));
            }
            lines.push(Line::from(""));
            lines.push(Line::from("Space toggles a template. Enter edits its parameters."));
            lines
        }
        Step::Sink => {
            let mut lines = vec![Line::from("Where should the data land?"), Line::from("")];
            for (i, sink) in app.sinks().iter().enumerate() {
                let cursor = if i == app.sink_index { ">" } else { " " };
                let mark = if state.selected_sink() == Some(*sink) { "(x)" } else { "( )" };
                lines.push(Line::from(format!(
                    "{}{} {}",
                    cursor,
                    mark,
                    app.catalog.sink_name(*sink)
                )));
            }
            lines.push(Line::from(""));
            lines.push(Line::from("Use Up/Down and Space to select."));
            lines
        }
        Step::Summary => summary_lines(app),
        Step::Command => command_lines(app),
    }
}

fn summary_lines(app: &App) -> Vec<Line<'static>> {
    let state = app.wizard.state();
    let nt = state.network_type();
    let network = state
        .selected_network()
        .map(|slug| app.catalog.network_name(nt, slug))
        .unwrap_or_else(|| "-".to_string());
    let sink = state
        .selected_sink()
        .map(|s| app.catalog.sink_name(s))
        .unwrap_or_else(|| "-".to_string());

    let mut lines = vec![
        Line::from(format!("Project folder:  {}", state.sanitized_project_folder())),
        Line::from(format!("Package manager: {}", state.package_manager())),
        Line::from(format!("Network:         {} ({})", network, nt.label())),
        Line::from("Templates:"),
    ];
    for &id in state.selected_templates() {
        let detail = match state.template_params().non_empty(id) {
            Some(p) if id == TemplateId::Custom => {
                let addresses: Vec<String> = p
                    .get("contracts")
                    .and_then(|v| v.as_array())
                    .map(|items| {
                        items
                            .iter()
                            .filter_map(|c| c.get("contractAddress")?.as_str().map(str::to_string))
                            .collect()
                    })
                    .unwrap_or_default();
                format!(
                    " ({} contracts: {})",
                    custom::contract_count(p),
                    format_addresses_for_display(&addresses)
                )
            }
            Some(p) => format!(" ({} parameter(s))", p.len()),
            None => String::new(),
        };
        lines.push(Line::from(format!(
            "  - {}{}",
            app.catalog.template_name(nt, id),
            detail
        )));
    }
    lines.push(Line::from(format!("Storage:         {}", sink)));
    lines.push(Line::from(""));

    let mut edit_spans = vec![Span::raw("Edit: ")];
    for (i, step) in SUMMARY_EDIT_TARGETS.iter().enumerate() {
        let style = if i == app.summary_index && app.focus == FocusTarget::Field(0) {
            Style::default().add_modifier(Modifier::REVERSED)
        } else {
            Style::default()
        };
        edit_spans.push(Span::styled(format!("[{}]", step.label()), style));
        edit_spans.push(Span::raw(" "));
    }
    lines.push(Line::from(edit_spans));
    lines.push(Line::from(""));
    lines.push(Line::from("Generate saves the config and builds your command."));
    lines
}

fn command_lines(app: &App) -> Vec<Line<'static>> {
    let view = app.wizard.command_view();
    let mut lines = Vec::new();

    match (&view.short, app.wizard.state().config_hash()) {
        (Some(short), Some(hash)) => {
            lines.push(Line::from("Run this in your terminal:"));
            lines.push(Line::from(""));
            lines.push(Line::from(Span::styled(
                short.clone(),
                Style::default().add_modifier(Modifier::BOLD),
            )));
            lines.push(Line::from(""));
            lines.push(Line::from(format!("Config id: {}", hash)));
            lines.push(Line::from("Press F to show the full command."));
        }
        _ => {
            if let Some(err) = app.wizard.save_error() {
                lines.push(Line::from(Span::styled(
                    format!("Could not save config: {}", err),
                    Style::default().fg(Color::Yellow),
                )));
                lines.push(Line::from("Use the full command below instead."));
                lines.push(Line::from(""));
            }
        }
    }

    if app.show_full_command || view.short.is_none() {
        if view.short.is_some() {
            lines.push(Line::from(""));
        }
        for l in view.full.lines() {
            lines.push(Line::from(l.to_string()));
        }
    }
    lines
}

fn draw_buttons(f: &mut ratatui::Frame<'_>, area: Rect, app: &App) {
    let back = button_text(
        "Back",
        app.focus == FocusTarget::Button(ButtonFocus::Back),
        can_go_back(app),
    );
    let next = button_text(
        next_label(app),
        app.focus == FocusTarget::Button(ButtonFocus::Next),
        can_go_next(app),
    );
    let quit = button_text(
        "Quit",
        app.focus == FocusTarget::Button(ButtonFocus::Quit),
        true,
    );

    let line = Line::from(vec![back, Span::raw(" "), next, Span::raw(" "), quit]);

    let p = Paragraph::new(Text::from(line)).alignment(Alignment::Right);
    f.render_widget(p, area);
}

fn button_text(label: &str, focused: bool, enabled: bool) -> Span<'static> {
    let mut style = Style::default();
    if !enabled {
        style = style.fg(Color::DarkGray);
    }
    if focused && enabled {
        style = style.add_modifier(Modifier::REVERSED);
    }
    Span::styled(format!("[ {} ]", label), style)
}

fn draw_editor(f: &mut ratatui::Frame<'_>, window_area: Rect, app: &App, editor: &ParamEditor) {
    let area = popup_area(window_area, 84, 20);
    f.render_widget(Clear, area);

    let nt = app.network_type();
    let title = format!(
        "Parameters: {}",
        app.catalog.template_name(nt, editor.template_id())
    );

    let mut lines: Vec<Line<'static>> = Vec::new();
    match editor {
        ParamEditor::Form { form, field, error } => {
            for (i, fld) in form.fields().iter().enumerate() {
                let cursor = if i == *field { ">" } else { " " };
                lines.push(Line::from(format!("{} {}", cursor, fld.spec.label)));
                lines.push(Line::from(format!("    {}", fld.value)));
                lines.push(Line::from(""));
            }
            if let Some(err) = error {
                lines.push(Line::from(Span::styled(
                    format!("Error: {}", err),
                    Style::default().fg(Color::Red),
                )));
            }
            lines.push(Line::from(
                "Lists are comma separated. Enter saves, Esc cancels.",
            ));
        }
        ParamEditor::Contracts {
            picker, row, error, ..
        } => match picker.stage() {
            PickerStage::Input => {
                lines.push(Line::from("Contract addresses (comma or space separated):"));
                lines.push(Line::from(format!("> {}", picker.address_input())));
                lines.push(Line::from(""));
                lines.push(Line::from(address_format_hint(nt).to_string()));
                if picker.is_loading() {
                    lines.push(Line::from("Fetching contract metadata..."));
                }
                if let Some(err) = picker.error() {
                    lines.push(Line::from(Span::styled(
                        format!("Error: {}", err),
                        Style::default().fg(Color::Red),
                    )));
                }
                lines.push(Line::from(""));
                lines.push(Line::from("Enter fetches contracts. Esc cancels."));
            }
            PickerStage::Selection => {
                let rows = contract_rows(picker);
                let mut flat = 0usize;
                for c in picker.contracts() {
                    lines.push(Line::from(format!(
                        "{} {} ({}/{} events)",
                        c.contract_name,
                        truncate_address(&c.contract_address),
                        picker.selected_event_count(&c.contract_address),
                        c.contract_events.len()
                    )));
                    for e in &c.contract_events {
                        let cursor = if flat == *row { ">" } else { " " };
                        let mark = if picker.is_event_selected(&c.contract_address, &e.name) {
                            "[x]"
                        } else {
                            "[ ]"
                        };
                        lines.push(Line::from(format!("  {}{} {}", cursor, mark, e.name)));
                        flat += 1;
                    }
                }
                if rows.is_empty() {
                    lines.push(Line::from("No events found."));
                }
                if let Some(err) = error {
                    lines.push(Line::from(Span::styled(
                        format!("Error: {}", err),
                        Style::default().fg(Color::Red),
                    )));
                }
                lines.push(Line::from(""));
                lines.push(Line::from(
                    "Space toggles, A/N all/none, I edits addresses, Enter saves.",
                ));
            }
        },
    }

    let p = Paragraph::new(Text::from(lines))
        .block(Block::default().borders(Borders::ALL).title(title))
        .wrap(Wrap { trim: false });
    f.render_widget(p, area);
}

fn draw_quit_modal(f: &mut ratatui::Frame<'_>, window_area: Rect, yes_selected: bool) {
    let area = popup_area(window_area, 56, 7);
    f.render_widget(Clear, area);

    let block = Block::default().borders(Borders::ALL).title("Quit?");
    let body = Paragraph::new(Text::from(vec![
        Line::from("Your selections will be lost."),
        Line::from(""),
        Line::from(""),
    ]))
    .block(block)
    .wrap(Wrap { trim: false });
    f.render_widget(body, area);

    let buttons_area = Rect {
        x: area.x + 1,
        y: area.y + area.height.saturating_sub(2),
        width: area.width.saturating_sub(2),
        height: 1,
    };

    let yes = button_text("Yes, quit", yes_selected, true);
    let no = button_text("No", !yes_selected, true);
    let line = Line::from(vec![yes, Span::raw(" "), no]);
    let p = Paragraph::new(Text::from(line)).alignment(Alignment::Right);
    f.render_widget(p, buttons_area);
}

fn draw_message_modal(f: &mut ratatui::Frame<'_>, window_area: Rect, title: &str, body: &str) {
    let area = popup_area(window_area, 60, 8);
    f.render_widget(Clear, area);

    let p = Paragraph::new(Text::from(vec![
        Line::from(body.to_string()),
        Line::from(""),
        Line::from("Press Enter to continue."),
    ]))
    .block(Block::default().borders(Borders::ALL).title(title.to_string()))
    .wrap(Wrap { trim: false });
    f.render_widget(p, area);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::exchange::LocalConfigExchange;
    use crate::client::metadata::{DisabledMetadataLookup, MetadataError};
    use crate::database::store::MemoryConfigStore;
    use crate::models::requests::ContractMetadataRequest;
    use async_trait::async_trait;

    struct StubLookup;

    #[async_trait]
    impl MetadataLookup for StubLookup {
        async fn lookup(
            &self,
            request: &ContractMetadataRequest,
        ) -> Result<Vec<ContractMetadata>, MetadataError> {
            Ok(request
                .addresses
                .iter()
                .map(|a| {
                    serde_json::from_value(serde_json::json!({
                        "contractAddress": a,
                        "contractName": "Stub",
                        "contractEvents": [{"name": "Transfer", "type": "event", "inputs": []}]
                    }))
                    .unwrap()
                })
                .collect())
        }
    }

    fn workers_with(
        rt: &tokio::runtime::Runtime,
        metadata: Arc<dyn MetadataLookup>,
    ) -> (Workers, mpsc::Receiver<UiMsg>) {
        let (tx, rx) = mpsc::channel();
        let workers = Workers {
            runtime: rt.handle().clone(),
            exchange: Arc::new(LocalConfigExchange::new(Arc::new(MemoryConfigStore::new()))),
            metadata,
            tx,
        };
        (workers, rx)
    }

    fn render(app: &App) -> String {
        let backend = TestBackend::new(100, 30);
        let mut terminal = Terminal::new(backend).unwrap();
        terminal.draw(|f| draw(f.size(), f, app)).unwrap();
        let buffer = terminal.backend().buffer().clone();
        let mut out = String::new();
        for y in 0..buffer.area.height {
            for x in 0..buffer.area.width {
                out.push_str(buffer.get(x, y).symbol());
            }
            out.push('\n');
        }
        out
    }

    fn wait_for_message(app: &mut App, rx: &mpsc::Receiver<UiMsg>) {
        let msg = rx
            .recv_timeout(Duration::from_secs(5))
            .expect("worker should report back");
        apply_message(app, msg);
    }

    fn type_text(app: &mut App, text: &str, workers: &Workers) {
        for c in text.chars() {
            handle_key(app, KeyCode::Char(c), workers);
        }
    }

    // -------------------------------------------------------------------------
    // A) Smoke rendering
    // -------------------------------------------------------------------------

    #[test]
    fn smoke_renders_every_target() {
        let catalog = Catalog::builtin().unwrap();
        for target in [
            "project",
            "packageManager",
            "network",
            "pipeline",
            "params",
            "contracts",
            "sink",
            "summary",
            "command",
            "unknown",
        ] {
            smoke(catalog.clone(), "@iankressin/pipes-cli", target)
                .unwrap_or_else(|e| panic!("smoke {} failed: {}", target, e));
        }
    }

    #[test]
    fn command_step_shows_short_form_after_save() {
        let app = new_smoke_app(Catalog::builtin().unwrap(), "@iankressin/pipes-cli", "command");
        assert_eq!(app.step(), Step::Command);
        let screen = render(&app);
        assert!(screen.contains("init --config-id"), "screen:\n{}", screen);
        assert!(screen.contains("[ Finish ]"));
    }

    #[test]
    fn summary_lists_selections() {
        let app = new_smoke_app(Catalog::builtin().unwrap(), "@iankressin/pipes-cli", "summary");
        let screen = render(&app);
        assert!(screen.contains("My-Bot"), "screen:\n{}", screen);
        assert!(screen.contains("ERC20 Transfers"));
        assert!(screen.contains("ClickHouse"));
        assert!(screen.contains("[ Generate ]"));
    }

    // -------------------------------------------------------------------------
    // B) Key handling
    // -------------------------------------------------------------------------

    #[test]
    fn typing_a_name_and_enter_advances() {
        let rt = tokio::runtime::Runtime::new().unwrap();
        let (workers, _rx) = workers_with(&rt, Arc::new(DisabledMetadataLookup));
        let mut app = App::new(Wizard::default(), Catalog::builtin().unwrap(), "test");

        handle_key(&mut app, KeyCode::Enter, &workers);
        assert!(matches!(app.modal, Some(Modal::Message { .. })), "blocked on empty name");
        handle_key(&mut app, KeyCode::Enter, &workers);
        assert!(app.modal.is_none());

        type_text(&mut app, "My Bot", &workers);
        assert_eq!(app.wizard.state().project_name(), "My Bot");
        handle_key(&mut app, KeyCode::Enter, &workers);
        assert_eq!(app.step(), Step::PackageManager);
    }

    #[test]
    fn network_type_switch_resets_templates() {
        let rt = tokio::runtime::Runtime::new().unwrap();
        let (workers, _rx) = workers_with(&rt, Arc::new(DisabledMetadataLookup));
        let mut app = new_smoke_app(Catalog::builtin().unwrap(), "pkg", "network");
        app.focus = FocusTarget::Field(0);

        handle_key(&mut app, KeyCode::Right, &workers);
        assert_eq!(app.network_type(), NetworkType::Svm);
        assert!(app.wizard.state().selected_templates().is_empty());
        assert!(app.wizard.state().selected_network().is_none());

        // Pick the first SVM network from the list field.
        app.focus = FocusTarget::Field(2);
        handle_key(&mut app, KeyCode::Enter, &workers);
        assert_eq!(app.wizard.state().selected_network(), Some("solana-mainnet"));
    }

    #[test]
    fn disabled_templates_cannot_be_selected() {
        let rt = tokio::runtime::Runtime::new().unwrap();
        let (workers, _rx) = workers_with(&rt, Arc::new(DisabledMetadataLookup));
        let mut app = new_smoke_app(Catalog::builtin().unwrap(), "pkg", "pipeline");
        app.focus = FocusTarget::Field(0);

        let morpho = app
            .template_ids()
            .iter()
            .position(|&id| id == TemplateId::MorphoBlue)
            .unwrap();
        app.template_index = morpho;
        handle_key(&mut app, KeyCode::Char(' '), &workers);
        assert!(!app.wizard.state().is_template_selected(TemplateId::MorphoBlue));
        assert!(matches!(app.modal, Some(Modal::Message { .. })));
    }

    #[test]
    fn selecting_a_schema_template_opens_form_and_saves_params() {
        let rt = tokio::runtime::Runtime::new().unwrap();
        let (workers, _rx) = workers_with(&rt, Arc::new(DisabledMetadataLookup));
        let mut app = new_smoke_app(Catalog::builtin().unwrap(), "pkg", "pipeline");
        app.focus = FocusTarget::Field(0);
        app.template_index = 1; // Uniswap V3 Swaps

        handle_key(&mut app, KeyCode::Char(' '), &workers);
        assert!(matches!(app.editor, Some(ParamEditor::Form { .. })));
        assert!(!app.wizard.can_advance(), "params not recorded yet");

        handle_key(&mut app, KeyCode::Enter, &workers);
        assert!(app.editor.is_none());
        assert!(app
            .wizard
            .state()
            .template_params()
            .contains(TemplateId::UniswapV3Swaps));
        assert!(app.wizard.can_advance());
    }

    #[test]
    fn custom_contracts_flow_fetches_and_submits() {
        let rt = tokio::runtime::Runtime::new().unwrap();
        let (workers, rx) = workers_with(&rt, Arc::new(StubLookup));
        let mut app = new_smoke_app(Catalog::builtin().unwrap(), "pkg", "pipeline");
        app.focus = FocusTarget::Field(0);
        app.template_index = app
            .template_ids()
            .iter()
            .position(|&id| id == TemplateId::Custom)
            .unwrap();

        handle_key(&mut app, KeyCode::Char(' '), &workers);
        assert!(matches!(app.editor, Some(ParamEditor::Contracts { .. })));

        type_text(&mut app, "0xc02aaa39b223fe8d0a0e5c4f27ead9083c756cc2", &workers);
        handle_key(&mut app, KeyCode::Enter, &workers);
        wait_for_message(&mut app, &rx);

        match app.editor.as_ref() {
            Some(ParamEditor::Contracts { picker, .. }) => {
                assert_eq!(picker.stage(), PickerStage::Selection)
            }
            other => panic!("unexpected editor: {:?}", other),
        }

        handle_key(&mut app, KeyCode::Enter, &workers);
        assert!(app.editor.is_none());
        let params = app
            .wizard
            .state()
            .template_params()
            .get(TemplateId::Custom)
            .cloned()
            .unwrap();
        assert_eq!(custom::contract_count(&params), 1);
    }

    #[test]
    fn cancelled_lookup_result_is_ignored_after_reopening_editor() {
        let rt = tokio::runtime::Runtime::new().unwrap();
        let (workers, rx) = workers_with(&rt, Arc::new(StubLookup));
        let mut app = new_smoke_app(Catalog::builtin().unwrap(), "pkg", "pipeline");
        app.focus = FocusTarget::Field(0);
        app.template_index = app
            .template_ids()
            .iter()
            .position(|&id| id == TemplateId::Custom)
            .unwrap();

        handle_key(&mut app, KeyCode::Char(' '), &workers);
        type_text(&mut app, "0xc02aaa39b223fe8d0a0e5c4f27ead9083c756cc2", &workers);
        handle_key(&mut app, KeyCode::Enter, &workers);
        let stale = rx
            .recv_timeout(Duration::from_secs(5))
            .expect("worker should report back");

        handle_key(&mut app, KeyCode::Esc, &workers);
        assert!(app.editor.is_none());
        handle_key(&mut app, KeyCode::Enter, &workers);
        assert!(matches!(app.editor, Some(ParamEditor::Contracts { .. })));

        type_text(&mut app, "0x1f98431c8ad98523631ae4a59f267346ea31f984", &workers);
        handle_key(&mut app, KeyCode::Enter, &workers);
        apply_message(&mut app, stale);

        match app.editor.as_ref() {
            Some(ParamEditor::Contracts { picker, .. }) => {
                assert_eq!(picker.stage(), PickerStage::Input);
                assert!(picker.is_loading(), "current lookup still pending");
                assert!(picker.contracts().is_empty());
            }
            other => panic!("unexpected editor: {:?}", other),
        }

        wait_for_message(&mut app, &rx);
        match app.editor.as_ref() {
            Some(ParamEditor::Contracts { picker, .. }) => {
                assert_eq!(picker.stage(), PickerStage::Selection);
                assert_eq!(
                    picker.contracts()[0].contract_address,
                    "0x1f98431c8ad98523631ae4a59f267346ea31f984"
                );
            }
            other => panic!("unexpected editor: {:?}", other),
        }
    }

    #[test]
    fn generate_saves_in_background_and_lands_on_command() {
        let rt = tokio::runtime::Runtime::new().unwrap();
        let (workers, rx) = workers_with(&rt, Arc::new(DisabledMetadataLookup));
        let mut app = new_smoke_app(Catalog::builtin().unwrap(), "pkg", "summary");

        handle_key(&mut app, KeyCode::Enter, &workers);
        assert!(app.wizard.is_saving());
        assert_eq!(next_label(&app), "Saving...");
        assert!(!can_go_next(&app));

        wait_for_message(&mut app, &rx);
        assert_eq!(app.step(), Step::Command);
        assert!(app.wizard.state().config_hash().is_some());
        assert!(!app.show_full_command);
    }

    #[test]
    fn summary_edit_link_jumps_to_step() {
        let rt = tokio::runtime::Runtime::new().unwrap();
        let (workers, _rx) = workers_with(&rt, Arc::new(DisabledMetadataLookup));
        let mut app = new_smoke_app(Catalog::builtin().unwrap(), "pkg", "summary");
        app.focus = FocusTarget::Field(0);

        handle_key(&mut app, KeyCode::Down, &workers);
        handle_key(&mut app, KeyCode::Down, &workers);
        handle_key(&mut app, KeyCode::Enter, &workers);
        assert_eq!(app.step(), Step::Network);
    }

    #[test]
    fn quit_requires_confirmation() {
        let rt = tokio::runtime::Runtime::new().unwrap();
        let (workers, _rx) = workers_with(&rt, Arc::new(DisabledMetadataLookup));
        let mut app = App::new(Wizard::default(), Catalog::builtin().unwrap(), "test");

        handle_key(&mut app, KeyCode::Esc, &workers);
        handle_key(&mut app, KeyCode::Enter, &workers);
        assert!(!app.quit, "default answer is No");

        handle_key(&mut app, KeyCode::Esc, &workers);
        handle_key(&mut app, KeyCode::Left, &workers);
        handle_key(&mut app, KeyCode::Enter, &workers);
        assert!(app.quit);
    }

    #[test]
    fn text_input_handles_multibyte_characters() {
        let mut input = TextInput::new("");
        for c in "héllo".chars() {
            input.handle_key(KeyCode::Char(c));
        }
        input.handle_key(KeyCode::Left);
        input.handle_key(KeyCode::Backspace);
        assert_eq!(input.value, "hélo");
        input.handle_key(KeyCode::Home);
        input.handle_key(KeyCode::Delete);
        assert_eq!(input.value, "élo");
    }
}
