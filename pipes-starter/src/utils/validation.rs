// Input validation utilities
// Address validators, address-list parsing and the project-folder sanitizer.

use regex::Regex;
use std::sync::OnceLock;

use crate::models::config::NetworkType;

/// Folder name used when the project name sanitizes down to nothing.
pub const FALLBACK_PROJECT_FOLDER: &str = "pipes-project";

// Patterns are literals; a compile failure is logged once and the validators then reject.
fn compile_pattern(pattern: &str) -> Option<Regex> {
    Regex::new(pattern)
        .map_err(|e| log::error!("[PHASE: validation] Invalid pattern {}: {}", pattern, e))
        .ok()
}

fn evm_address_re() -> Option<&'static Regex> {
    static RE: OnceLock<Option<Regex>> = OnceLock::new();
    RE.get_or_init(|| compile_pattern(r"^0x[a-fA-F0-9]{40}$")).as_ref()
}

fn svm_address_re() -> Option<&'static Regex> {
    // Base58 alphabet: no 0, O, I, l.
    static RE: OnceLock<Option<Regex>> = OnceLock::new();
    RE.get_or_init(|| compile_pattern(r"^[1-9A-HJ-NP-Za-km-z]{32,44}$"))
        .as_ref()
}

struct FolderPatterns {
    whitespace: Regex,
    invalid_chars: Regex,
    edge_dots_dashes: Regex,
    dash_runs: Regex,
    reserved: Regex,
}

impl FolderPatterns {
    fn compile() -> Option<Self> {
        Some(Self {
            whitespace: compile_pattern(r"\s+")?,
            invalid_chars: compile_pattern(r#"[<>:"/\\|?*!\x00-\x1f]"#)?,
            edge_dots_dashes: compile_pattern(r"^[.-]+|[.-]+$")?,
            dash_runs: compile_pattern(r"-+")?,
            reserved: compile_pattern(r"(?i)^(CON|PRN|AUX|NUL|COM[1-9]|LPT[1-9])(\.|$)")?,
        })
    }
}

fn folder_patterns() -> Option<&'static FolderPatterns> {
    static PATTERNS: OnceLock<Option<FolderPatterns>> = OnceLock::new();
    PATTERNS.get_or_init(FolderPatterns::compile).as_ref()
}

/// Turn a free-text project name into a filesystem-safe folder name.
///
/// Deterministic and idempotent: sanitizing an already-sanitized name returns it unchanged.
pub fn sanitize_project_folder(name: &str) -> String {
    let trimmed = name.trim();
    if trimmed.is_empty() {
        return FALLBACK_PROJECT_FOLDER.to_string();
    }

    let Some(p) = folder_patterns() else {
        return FALLBACK_PROJECT_FOLDER.to_string();
    };
    let sanitized = p.whitespace.replace_all(trimmed, "-");
    let sanitized = p.invalid_chars.replace_all(&sanitized, "");
    let sanitized = p.edge_dots_dashes.replace_all(&sanitized, "");
    let mut sanitized = p.dash_runs.replace_all(&sanitized, "-").into_owned();

    if p.reserved.is_match(&sanitized) {
        sanitized = format!("project-{}", sanitized);
    }

    if sanitized.is_empty() {
        return FALLBACK_PROJECT_FOLDER.to_string();
    }

    sanitized
}

pub fn validate_evm_address(address: &str) -> bool {
    evm_address_re().is_some_and(|re| re.is_match(address))
}

pub fn validate_svm_address(address: &str) -> bool {
    svm_address_re().is_some_and(|re| re.is_match(address))
}

/// Dispatch on network type. No network type means nothing validates.
pub fn validate_address(address: &str, network_type: Option<NetworkType>) -> bool {
    match network_type {
        Some(NetworkType::Evm) => validate_evm_address(address),
        Some(NetworkType::Svm) => validate_svm_address(address),
        None => false,
    }
}

/// Split a free-text address list on commas/whitespace. Order-preserving, no dedup.
pub fn parse_addresses(input: &str) -> Vec<String> {
    input
        .split(|c: char| c == ',' || c.is_whitespace())
        .filter(|a| !a.is_empty())
        .map(|a| a.to_string())
        .collect()
}

/// Shorten long addresses for display, keeping both ends visible.
pub fn truncate_address(address: &str) -> String {
    let chars: Vec<char> = address.chars().collect();
    if chars.len() <= 12 {
        return address.to_string();
    }
    let head: String = chars[..6].iter().collect();
    let tail: String = chars[chars.len() - 4..].iter().collect();
    format!("{}...{}", head, tail)
}

pub fn format_addresses_for_display(addresses: &[String]) -> String {
    match addresses {
        [] => String::new(),
        [only] => truncate_address(only),
        [first, rest @ ..] => format!("{} +{} more", truncate_address(first), rest.len()),
    }
}

/// Human hint shown next to rejected addresses.
pub fn address_format_hint(network_type: NetworkType) -> &'static str {
    match network_type {
        NetworkType::Evm => "EVM addresses must start with 0x and be 42 characters long",
        NetworkType::Svm => "SVM addresses must be valid base58 (32-44 characters)",
    }
}
