use std::path::PathBuf;

fn main() {
    let args: Vec<String> = std::env::args().collect();

    // Settings override: --settings=<path> or --settings <path>.
    let settings_path = args
        .iter()
        .enumerate()
        .find_map(|(i, a)| {
            if let Some(v) = a.strip_prefix("--settings=") {
                Some(v.to_string())
            } else if a == "--settings" {
                args.get(i + 1).cloned()
            } else {
                None
            }
        })
        .filter(|v| !v.trim().is_empty())
        .map(PathBuf::from);

    if args.iter().any(|a| a == "--help" || a == "-h") {
        print_usage();
        return;
    }

    // Non-interactive TUI smoke test mode (for automated checks).
    // Renders a single frame for a specific step and exits 0.
    // Usage: --tui-smoke or --tui-smoke=project|packageManager|network|pipeline|params|contracts|sink|summary|command
    if let Some(arg) = args
        .iter()
        .find(|a| a.as_str() == "--tui-smoke" || a.starts_with("--tui-smoke="))
    {
        let target = arg
            .split_once('=')
            .map(|(_, v)| v.to_string())
            .filter(|v| !v.trim().is_empty());
        pipes_starter::run_tui_smoke(target, settings_path);
        return;
    }

    // Print a stored config: --print-config <id> or --print-config=<id>.
    if let Some(pos) = args
        .iter()
        .position(|a| a == "--print-config" || a.starts_with("--print-config="))
    {
        let config_id = args[pos]
            .split_once('=')
            .map(|(_, v)| v.to_string())
            .or_else(|| args.get(pos + 1).filter(|v| !v.starts_with("--")).cloned())
            .unwrap_or_default();
        let verbose = args.iter().any(|a| a == "--verbose" || a == "-v");
        let code = pipes_starter::run_print_config(&config_id, settings_path, verbose);
        std::process::exit(code);
    }

    pipes_starter::run_tui(settings_path);
}

fn print_usage() {
    println!("pipes-starter: guided configuration for new Pipes SDK projects");
    println!();
    println!("Usage:");
    println!("  pipes-starter [--settings=<path>]              run the interactive wizard");
    println!("  pipes-starter --tui-smoke[=<step>]             render one frame and exit");
    println!("  pipes-starter --print-config <id> [--verbose]  print a stored config as JSON");
}
