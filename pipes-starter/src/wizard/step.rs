// Wizard steps and the transition table.
//
// Order is fixed; each row names the neighbours and the gate that must hold to leave the step
// forward. Jumps (`go_to`) and back-navigation are ungated.

use super::WizardState;
use crate::templates::needs_params;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Step {
    Project,
    PackageManager,
    Network,
    Pipeline,
    Sink,
    Summary,
    Command,
}

impl Step {
    pub const ALL: [Step; 7] = [
        Step::Project,
        Step::PackageManager,
        Step::Network,
        Step::Pipeline,
        Step::Sink,
        Step::Summary,
        Step::Command,
    ];

    pub fn index(&self) -> usize {
        *self as usize
    }

    pub fn id(&self) -> &'static str {
        match self {
            Step::Project => "project",
            Step::PackageManager => "packageManager",
            Step::Network => "network",
            Step::Pipeline => "pipeline",
            Step::Sink => "sink",
            Step::Summary => "summary",
            Step::Command => "command",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Step::Project => "Project",
            Step::PackageManager => "Package",
            Step::Network => "Network",
            Step::Pipeline => "Pipeline",
            Step::Sink => "Storage",
            Step::Summary => "Review",
            Step::Command => "Generate",
        }
    }

    pub fn helper(&self) -> &'static str {
        match self {
            Step::Project => "Name your workspace",
            Step::PackageManager => "Choose your package manager",
            Step::Network => "Pick your chain",
            Step::Pipeline => "Select templates",
            Step::Sink => "Where data lands",
            Step::Summary => "Double-check choices",
            Step::Command => "Ready to run",
        }
    }

    /// Parse a step id (`"pipeline"`, `"packageManager"`, ...). Case-insensitive.
    pub fn parse(id: &str) -> Option<Step> {
        Step::ALL
            .iter()
            .copied()
            .find(|s| s.id().eq_ignore_ascii_case(id.trim()))
    }

    pub fn next(&self) -> Option<Step> {
        transition(*self).next
    }

    pub fn prev(&self) -> Option<Step> {
        transition(*self).prev
    }
}

pub type Gate = fn(&WizardState) -> bool;

#[derive(Clone, Copy)]
pub struct Transition {
    pub step: Step,
    pub next: Option<Step>,
    pub prev: Option<Step>,
    pub gate: Gate,
}

fn project_gate(state: &WizardState) -> bool {
    !state.project_name().trim().is_empty()
}

fn package_manager_gate(_state: &WizardState) -> bool {
    // Always defaulted.
    true
}

fn network_gate(state: &WizardState) -> bool {
    state.selected_network().is_some()
}

// Key presence counts as configured; the form decides what an acceptable object is.
fn pipeline_gate(state: &WizardState) -> bool {
    let selected = state.selected_templates();
    !selected.is_empty()
        && selected
            .iter()
            .all(|&id| !needs_params(id) || state.template_params().contains(id))
}

fn sink_gate(state: &WizardState) -> bool {
    state.selected_sink().is_some()
}

fn open_gate(_state: &WizardState) -> bool {
    true
}

pub const TRANSITIONS: [Transition; 7] = [
    Transition {
        step: Step::Project,
        next: Some(Step::PackageManager),
        prev: None,
        gate: project_gate,
    },
    Transition {
        step: Step::PackageManager,
        next: Some(Step::Network),
        prev: Some(Step::Project),
        gate: package_manager_gate,
    },
    Transition {
        step: Step::Network,
        next: Some(Step::Pipeline),
        prev: Some(Step::PackageManager),
        gate: network_gate,
    },
    Transition {
        step: Step::Pipeline,
        next: Some(Step::Sink),
        prev: Some(Step::Network),
        gate: pipeline_gate,
    },
    Transition {
        step: Step::Sink,
        next: Some(Step::Summary),
        prev: Some(Step::Pipeline),
        gate: sink_gate,
    },
    Transition {
        step: Step::Summary,
        next: Some(Step::Command),
        prev: Some(Step::Sink),
        gate: open_gate,
    },
    Transition {
        step: Step::Command,
        next: None,
        prev: Some(Step::Summary),
        gate: open_gate,
    },
];

pub fn transition(step: Step) -> &'static Transition {
    // TRANSITIONS is laid out in Step declaration order.
    &TRANSITIONS[step as usize]
}
