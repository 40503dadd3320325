// Config builder
// Turns accumulated wizard selections into the canonical `PipesConfig` and the CLI commands.

use crate::models::config::{
    NetworkType, PackageManager, PipesConfig, Sink, TemplateConfig, TemplateId,
};
use crate::templates::params::TemplateParamsMap;

pub const DEFAULT_CLI_PACKAGE: &str = "@iankressin/pipes-cli";

/// Build the config. Templates keep selection order; `params` is attached only for templates
/// with a non-empty recorded parameter object.
pub fn build_pipes_config(
    project_folder: &str,
    network_type: NetworkType,
    package_manager: PackageManager,
    network: &str,
    selected_templates: &[TemplateId],
    template_params: &TemplateParamsMap,
    sink: Sink,
) -> PipesConfig {
    let templates = selected_templates
        .iter()
        .map(|&template_id| TemplateConfig {
            template_id,
            params: template_params.non_empty(template_id).cloned(),
        })
        .collect();

    PipesConfig {
        project_folder: project_folder.to_string(),
        network_type,
        package_manager,
        network: network.to_string(),
        templates,
        sink,
    }
}

/// Text that gets hashed and stored: compact JSON in fixed key order.
pub fn persisted_json(config: &PipesConfig) -> String {
    serde_json::to_string(config).unwrap_or_else(|_| "{}".to_string())
}

/// Pretty JSON (2-space indent) as embedded in the long-form command.
pub fn pretty_json(config: &PipesConfig) -> String {
    serde_json::to_string_pretty(config).unwrap_or_else(|_| "{}".to_string())
}

/// Escape for embedding inside a single-quoted shell word.
pub fn shell_single_quote_escape(text: &str) -> String {
    text.replace('\'', "'\\''")
}

/// `npx <pkg>@latest init --config '<json>'`
pub fn generate_cli_command(config: &PipesConfig, cli_package: &str) -> String {
    format!(
        "npx {}@latest init --config '{}'",
        cli_package,
        shell_single_quote_escape(&pretty_json(config))
    )
}

/// `npx <pkg>@latest init --config-id <hash>`
pub fn short_cli_command(config_hash: &str, cli_package: &str) -> String {
    format!("npx {}@latest init --config-id {}", cli_package, config_hash)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::security::crypto::config_hash;
    use proptest::prelude::*;
    use serde_json::json;

    fn sample_params() -> TemplateParamsMap {
        let mut map = TemplateParamsMap::new();
        map.upsert(
            TemplateId::Erc20Transfers,
            json!({"contractAddresses": ["0xa"]})
                .as_object()
                .cloned()
                .unwrap(),
        );
        // Present but empty: must not produce a params key.
        map.upsert(TemplateId::UniswapV3Swaps, Default::default());
        map
    }

    fn sample_config() -> PipesConfig {
        build_pipes_config(
            "my-bot",
            NetworkType::Evm,
            PackageManager::Pnpm,
            "ethereum-mainnet",
            &[TemplateId::UniswapV3Swaps, TemplateId::Erc20Transfers],
            &sample_params(),
            Sink::Clickhouse,
        )
    }

    #[test]
    fn templates_keep_selection_order_and_only_non_empty_params() {
        let cfg = sample_config();
        assert_eq!(cfg.templates.len(), 2);
        assert_eq!(cfg.templates[0].template_id, TemplateId::UniswapV3Swaps);
        assert!(cfg.templates[0].params.is_none());
        assert_eq!(cfg.templates[1].template_id, TemplateId::Erc20Transfers);
        assert_eq!(
            cfg.templates[1].params.as_ref().unwrap()["contractAddresses"],
            json!(["0xa"])
        );
    }

    #[test]
    fn building_is_deterministic() {
        assert_eq!(sample_config(), sample_config());
        assert_eq!(persisted_json(&sample_config()), persisted_json(&sample_config()));
        assert_eq!(
            generate_cli_command(&sample_config(), DEFAULT_CLI_PACKAGE),
            generate_cli_command(&sample_config(), DEFAULT_CLI_PACKAGE)
        );
    }

    #[test]
    fn persisted_json_is_compact_in_fixed_order() {
        let text = persisted_json(&sample_config());
        assert!(text.starts_with(r#"{"projectFolder":"my-bot","networkType":"evm","packageManager":"pnpm","network":"ethereum-mainnet","templates":["#));
        assert!(text.ends_with(r#""sink":"clickhouse"}"#));
        assert!(!text.contains('\n'));
    }

    #[test]
    fn long_command_embeds_pretty_json() {
        let cmd = generate_cli_command(&sample_config(), DEFAULT_CLI_PACKAGE);
        assert!(cmd.starts_with("npx @iankressin/pipes-cli@latest init --config '{\n  \"projectFolder\": \"my-bot\","));
        assert!(cmd.ends_with("}'"));
    }

    #[test]
    fn single_quotes_are_shell_escaped() {
        let cfg = build_pipes_config(
            "it's",
            NetworkType::Svm,
            PackageManager::Bun,
            "solana-mainnet",
            &[TemplateId::TokenBalances],
            &TemplateParamsMap::new(),
            Sink::Memory,
        );
        let cmd = generate_cli_command(&cfg, "pkg");
        assert!(cmd.contains(r#""projectFolder": "it'\''s""#), "got {}", cmd);
        assert_eq!(shell_single_quote_escape("a'b"), "a'\\''b");
    }

    #[test]
    fn short_command_uses_config_id() {
        assert_eq!(
            short_cli_command("0123456789abcdef", DEFAULT_CLI_PACKAGE),
            "npx @iankressin/pipes-cli@latest init --config-id 0123456789abcdef"
        );
    }

    const ALL_TEMPLATES: [TemplateId; 7] = [
        TemplateId::Erc20Transfers,
        TemplateId::UniswapV3Swaps,
        TemplateId::MorphoBlue,
        TemplateId::UniswapV4,
        TemplateId::Polymarket,
        TemplateId::TokenBalances,
        TemplateId::Custom,
    ];

    fn network_type() -> impl Strategy<Value = NetworkType> {
        prop_oneof![Just(NetworkType::Evm), Just(NetworkType::Svm)]
    }

    fn package_manager() -> impl Strategy<Value = PackageManager> {
        prop_oneof![
            Just(PackageManager::Pnpm),
            Just(PackageManager::Yarn),
            Just(PackageManager::Npm),
            Just(PackageManager::Bun),
        ]
    }

    fn sink() -> impl Strategy<Value = Sink> {
        prop::sample::select(Sink::ALL.to_vec())
    }

    proptest! {
        #[test]
        fn config_and_commands_are_deterministic(
            folder in any::<String>(),
            network in "\\PC{0,24}",
            network_type in network_type(),
            package_manager in package_manager(),
            templates in prop::sample::subsequence(ALL_TEMPLATES.to_vec(), 0..=7),
            address in "\\PC{0,12}",
            sink in sink(),
        ) {
            let mut params = TemplateParamsMap::new();
            params.upsert(
                TemplateId::Erc20Transfers,
                json!({"contractAddresses": [address]}).as_object().cloned().unwrap(),
            );
            let build = || {
                build_pipes_config(
                    &folder,
                    network_type,
                    package_manager,
                    &network,
                    &templates,
                    &params,
                    sink,
                )
            };

            let first = build();
            let second = build();
            prop_assert_eq!(&first, &second);
            prop_assert_eq!(persisted_json(&first), persisted_json(&second));
            prop_assert_eq!(
                config_hash(&persisted_json(&first)),
                config_hash(&persisted_json(&second))
            );

            let cmd = generate_cli_command(&first, "pkg");
            prop_assert_eq!(&cmd, &generate_cli_command(&second, "pkg"));

            // The quoted body unescapes back to the config.
            let body = cmd
                .strip_prefix("npx pkg@latest init --config '")
                .and_then(|rest| rest.strip_suffix('\''));
            prop_assert!(body.is_some(), "got {}", cmd);
            let parsed: PipesConfig =
                serde_json::from_str(&body.unwrap().replace("'\\''", "'")).unwrap();
            prop_assert_eq!(parsed, first);
        }
    }
}
