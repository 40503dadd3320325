// Custom contracts picker
//
// Collects parameters for the custom-contracts template: the user types addresses, the metadata
// lookup decodes them, then events are picked per contract. The lookup call itself happens
// outside; this type only hands out ticketed requests and accepts their completions.

use std::collections::{BTreeMap, BTreeSet};
use std::sync::atomic::{AtomicU64, Ordering};

use serde_json::{json, Value};

use super::form::FormError;
use crate::models::config::{NetworkType, TemplateParams};
use crate::models::requests::ContractMetadataRequest;
use crate::models::responses::ContractMetadata;
use crate::utils::validation::{address_format_hint, parse_addresses, validate_address};

pub const NO_EVENTS_SELECTED: &str = "Please select at least one event";

// Shared by every picker so a reopened editor never reuses a cancelled lookup's ticket.
static NEXT_FETCH_TICKET: AtomicU64 = AtomicU64::new(1);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PickerStage {
    Input,
    Selection,
}

/// A metadata lookup handed out by [`ContractPicker::begin_fetch`].
#[derive(Debug, Clone)]
pub struct FetchRequest {
    pub ticket: u64,
    pub request: ContractMetadataRequest,
}

#[derive(Debug, Clone)]
pub struct ContractPicker {
    network_type: NetworkType,
    network: String,
    address_input: String,
    stage: PickerStage,
    contracts: Vec<ContractMetadata>,
    // contract address -> selected event names
    selected: BTreeMap<String, BTreeSet<String>>,
    loading: Option<u64>,
    error: Option<String>,
}

impl ContractPicker {
    pub fn new(network_type: NetworkType, network: impl Into<String>) -> Self {
        Self {
            network_type,
            network: network.into(),
            address_input: String::new(),
            stage: PickerStage::Input,
            contracts: Vec::new(),
            selected: BTreeMap::new(),
            loading: None,
            error: None,
        }
    }

    /// Re-open the picker on previously recorded params (`{"contracts": [...]}`).
    ///
    /// Falls back to an empty picker when the params carry no contracts.
    pub fn from_existing(
        network_type: NetworkType,
        network: impl Into<String>,
        existing: Option<&TemplateParams>,
    ) -> Self {
        let mut picker = Self::new(network_type, network);

        let contracts: Vec<ContractMetadata> = existing
            .and_then(|p| p.get("contracts"))
            .and_then(|v| serde_json::from_value(v.clone()).ok())
            .unwrap_or_default();
        if contracts.is_empty() {
            return picker;
        }

        picker.address_input = contracts
            .iter()
            .map(|c| c.contract_address.clone())
            .collect::<Vec<_>>()
            .join(", ");
        picker.load_contracts(contracts);
        picker
    }

    pub fn stage(&self) -> PickerStage {
        self.stage
    }

    pub fn address_input(&self) -> &str {
        &self.address_input
    }

    pub fn address_input_mut(&mut self) -> &mut String {
        &mut self.address_input
    }

    #[cfg(test)]
    pub fn set_address_input(&mut self, input: impl Into<String>) {
        self.address_input = input.into();
    }

    pub fn contracts(&self) -> &[ContractMetadata] {
        &self.contracts
    }

    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    pub fn is_loading(&self) -> bool {
        self.loading.is_some()
    }

    pub fn addresses(&self) -> Vec<String> {
        parse_addresses(&self.address_input)
    }

    /// At least one address and every address valid for the network type.
    pub fn can_fetch(&self) -> bool {
        let addresses = self.addresses();
        !addresses.is_empty()
            && addresses
                .iter()
                .all(|a| validate_address(a, Some(self.network_type)))
    }

    /// Start a metadata lookup. Returns `None` while another lookup is in flight or when the
    /// address list is not fetchable (the reason is recorded in [`Self::error`]).
    pub fn begin_fetch(&mut self) -> Option<FetchRequest> {
        if self.loading.is_some() {
            return None;
        }

        let addresses = self.addresses();
        if addresses.is_empty() {
            self.error = Some("Enter at least one contract address".to_string());
            return None;
        }
        if let Some(bad) = addresses
            .iter()
            .find(|a| !validate_address(a, Some(self.network_type)))
        {
            self.error = Some(format!(
                "Invalid address {}: {}",
                bad,
                address_format_hint(self.network_type)
            ));
            return None;
        }

        let ticket = NEXT_FETCH_TICKET.fetch_add(1, Ordering::Relaxed);
        self.loading = Some(ticket);
        self.error = None;

        Some(FetchRequest {
            ticket,
            request: ContractMetadataRequest {
                network_type: self.network_type,
                network: self.network.clone(),
                addresses,
            },
        })
    }

    /// Apply a lookup completion. Returns false (and changes nothing) for a stale ticket.
    pub fn finish_fetch(
        &mut self,
        ticket: u64,
        result: Result<Vec<ContractMetadata>, String>,
    ) -> bool {
        if self.loading != Some(ticket) {
            return false;
        }
        self.loading = None;

        match result {
            Ok(contracts) if contracts.is_empty() => {
                self.error = Some("No contracts found for these addresses".to_string());
            }
            Ok(contracts) => {
                self.error = None;
                self.load_contracts(contracts);
            }
            Err(message) => {
                self.error = Some(message);
            }
        }
        true
    }

    /// Drop any in-flight lookup; its completion will be ignored.
    pub fn cancel_fetch(&mut self) {
        self.loading = None;
    }

    /// Go back to editing addresses. Loaded contracts are kept until the next fetch succeeds.
    pub fn edit_addresses(&mut self) {
        self.stage = PickerStage::Input;
    }

    fn load_contracts(&mut self, contracts: Vec<ContractMetadata>) {
        self.selected = contracts
            .iter()
            .map(|c| {
                (
                    c.contract_address.clone(),
                    c.contract_events.iter().map(|e| e.name.clone()).collect(),
                )
            })
            .collect();
        self.contracts = contracts;
        self.stage = PickerStage::Selection;
    }

    pub fn is_event_selected(&self, contract_address: &str, event_name: &str) -> bool {
        self.selected
            .get(contract_address)
            .map(|s| s.contains(event_name))
            .unwrap_or(false)
    }

    pub fn toggle_event(&mut self, contract_address: &str, event_name: &str) {
        let set = self
            .selected
            .entry(contract_address.to_string())
            .or_default();
        if !set.remove(event_name) {
            set.insert(event_name.to_string());
        }
    }

    pub fn select_all_events(&mut self, contract_address: &str) {
        if let Some(contract) = self
            .contracts
            .iter()
            .find(|c| c.contract_address == contract_address)
        {
            let all = contract
                .contract_events
                .iter()
                .map(|e| e.name.clone())
                .collect();
            self.selected.insert(contract_address.to_string(), all);
        }
    }

    pub fn deselect_all_events(&mut self, contract_address: &str) {
        if let Some(set) = self.selected.get_mut(contract_address) {
            set.clear();
        }
    }

    pub fn selected_event_count(&self, contract_address: &str) -> usize {
        self.selected
            .get(contract_address)
            .map(|s| s.len())
            .unwrap_or(0)
    }

    /// Build `{"contracts": [...]}` from the selected events, dropping contracts with none.
    pub fn submit(&self) -> Result<TemplateParams, FormError> {
        let chosen: Vec<ContractMetadata> = self
            .contracts
            .iter()
            .filter_map(|c| {
                let events: Vec<_> = c
                    .contract_events
                    .iter()
                    .filter(|e| self.is_event_selected(&c.contract_address, &e.name))
                    .cloned()
                    .collect();
                (!events.is_empty()).then(|| ContractMetadata {
                    contract_address: c.contract_address.clone(),
                    contract_name: c.contract_name.clone(),
                    contract_events: events,
                })
            })
            .collect();

        if chosen.is_empty() {
            return Err(FormError::Rejected(NO_EVENTS_SELECTED.to_string()));
        }

        let contracts =
            serde_json::to_value(&chosen).map_err(|e| FormError::Rejected(e.to_string()))?;
        let mut params = TemplateParams::new();
        params.insert("contracts".to_string(), contracts);
        Ok(params)
    }
}

/// Shape check for recorded custom params, used by summary rendering.
pub fn contract_count(params: &TemplateParams) -> usize {
    match params.get("contracts") {
        Some(Value::Array(items)) => items.len(),
        _ => 0,
    }
}

/// Example params used by the smoke render.
pub fn sample_params() -> TemplateParams {
    let v = json!({
        "contracts": [{
            "contractAddress": "0xc02aaa39b223fe8d0a0e5c4f27ead9083c756cc2",
            "contractName": "WETH9",
            "contractEvents": [
                {"name": "Transfer", "type": "event", "inputs": []}
            ]
        }]
    });
    match v {
        Value::Object(map) => map,
        _ => TemplateParams::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::responses::ContractEvent;

    const WETH: &str = "0xc02aaa39b223fe8d0a0e5c4f27ead9083c756cc2";
    const USDC: &str = "0xa0b86991c6218b36c1d19d4a2e9eb0ce3606eb48";

    fn event(name: &str) -> ContractEvent {
        ContractEvent {
            name: name.to_string(),
            kind: "event".to_string(),
            inputs: Vec::new(),
        }
    }

    fn contract(address: &str, name: &str, events: &[&str]) -> ContractMetadata {
        ContractMetadata {
            contract_address: address.to_string(),
            contract_name: name.to_string(),
            contract_events: events.iter().map(|e| event(e)).collect(),
        }
    }

    fn loaded_picker() -> ContractPicker {
        let mut picker = ContractPicker::new(NetworkType::Evm, "ethereum-mainnet");
        picker.set_address_input(format!("{}, {}", WETH, USDC));
        let req = picker.begin_fetch().expect("fetch should start");
        assert!(picker.finish_fetch(
            req.ticket,
            Ok(vec![
                contract(WETH, "WETH9", &["Transfer", "Deposit"]),
                contract(USDC, "FiatToken", &["Transfer", "Approval"]),
            ])
        ));
        picker
    }

    // -------------------------------------------------------------------------
    // A) Fetch gating and ticket guard
    // -------------------------------------------------------------------------

    #[test]
    fn fetch_requires_valid_addresses() {
        let mut picker = ContractPicker::new(NetworkType::Evm, "ethereum-mainnet");
        assert!(!picker.can_fetch());
        assert!(picker.begin_fetch().is_none());
        assert!(picker.error().is_some());

        picker.set_address_input(format!("{} 0xZZZ", WETH));
        assert!(!picker.can_fetch());
        assert!(picker.begin_fetch().is_none());
        assert!(picker.error().unwrap().contains("0xZZZ"));
        assert!(!picker.is_loading());
    }

    #[test]
    fn fetch_request_carries_network_and_parsed_addresses() {
        let mut picker = ContractPicker::new(NetworkType::Evm, "base-mainnet");
        picker.set_address_input(format!("{},\n{}", WETH, USDC));
        let req = picker.begin_fetch().unwrap();
        assert_eq!(req.request.network, "base-mainnet");
        assert_eq!(req.request.network_type, NetworkType::Evm);
        assert_eq!(req.request.addresses, vec![WETH.to_string(), USDC.to_string()]);
        assert!(picker.is_loading());

        // INTENT: one lookup at a time.
        assert!(picker.begin_fetch().is_none());
    }

    #[test]
    fn stale_completion_is_ignored() {
        let mut picker = ContractPicker::new(NetworkType::Evm, "ethereum-mainnet");
        picker.set_address_input(WETH);
        let first = picker.begin_fetch().unwrap();
        picker.cancel_fetch();
        let second = picker.begin_fetch().unwrap();
        assert_ne!(first.ticket, second.ticket);

        assert!(
            !picker.finish_fetch(first.ticket, Ok(vec![contract(WETH, "Old", &["A"])])),
            "stale ticket must be ignored"
        );
        assert_eq!(picker.stage(), PickerStage::Input);
        assert!(picker.is_loading());

        assert!(picker.finish_fetch(second.ticket, Ok(vec![contract(WETH, "WETH9", &["B"])])));
        assert_eq!(picker.contracts()[0].contract_name, "WETH9");
    }

    #[test]
    fn tickets_are_unique_across_pickers() {
        let mut first = ContractPicker::new(NetworkType::Evm, "ethereum-mainnet");
        first.set_address_input(WETH);
        let old = first.begin_fetch().unwrap();

        let mut second = ContractPicker::new(NetworkType::Evm, "ethereum-mainnet");
        second.set_address_input(USDC);
        let current = second.begin_fetch().unwrap();
        assert_ne!(old.ticket, current.ticket);

        assert!(!second.finish_fetch(old.ticket, Ok(vec![contract(WETH, "WETH9", &["A"])])));
        assert!(second.is_loading());
        assert_eq!(second.stage(), PickerStage::Input);
    }

    #[test]
    fn failed_fetch_stays_in_input_with_message() {
        let mut picker = ContractPicker::new(NetworkType::Evm, "ethereum-mainnet");
        picker.set_address_input(WETH);
        let req = picker.begin_fetch().unwrap();
        picker.finish_fetch(req.ticket, Err("Contract not verified".to_string()));
        assert_eq!(picker.stage(), PickerStage::Input);
        assert_eq!(picker.error(), Some("Contract not verified"));
        assert!(!picker.is_loading());
    }

    // -------------------------------------------------------------------------
    // B) Event selection and submit
    // -------------------------------------------------------------------------

    #[test]
    fn all_events_start_selected() {
        let picker = loaded_picker();
        assert_eq!(picker.stage(), PickerStage::Selection);
        assert_eq!(picker.selected_event_count(WETH), 2);
        assert_eq!(picker.selected_event_count(USDC), 2);
    }

    #[test]
    fn submit_drops_contracts_without_selected_events() {
        let mut picker = loaded_picker();
        picker.deselect_all_events(USDC);
        picker.toggle_event(WETH, "Deposit");

        let params = picker.submit().unwrap();
        let contracts = params["contracts"].as_array().unwrap();
        assert_eq!(contracts.len(), 1);
        assert_eq!(contracts[0]["contractAddress"], WETH);
        let events = contracts[0]["contractEvents"].as_array().unwrap();
        assert_eq!(events.len(), 1);
        assert_eq!(events[0]["name"], "Transfer");
    }

    #[test]
    fn submit_with_nothing_selected_fails() {
        let mut picker = loaded_picker();
        picker.deselect_all_events(WETH);
        picker.deselect_all_events(USDC);
        let err = picker.submit().unwrap_err();
        assert_eq!(err.to_string(), NO_EVENTS_SELECTED);

        picker.select_all_events(USDC);
        assert_eq!(picker.selected_event_count(USDC), 2);
        assert!(picker.submit().is_ok());
    }

    #[test]
    fn reopening_restores_selection_stage() {
        let params = loaded_picker().submit().unwrap();
        let picker =
            ContractPicker::from_existing(NetworkType::Evm, "ethereum-mainnet", Some(&params));
        assert_eq!(picker.stage(), PickerStage::Selection);
        assert_eq!(picker.address_input(), format!("{}, {}", WETH, USDC));
        assert!(picker.is_event_selected(WETH, "Deposit"));
        assert_eq!(contract_count(&params), 2);
    }

    #[test]
    fn reopening_without_contracts_starts_empty() {
        let picker = ContractPicker::from_existing(
            NetworkType::Evm,
            "ethereum-mainnet",
            Some(&TemplateParams::new()),
        );
        assert_eq!(picker.stage(), PickerStage::Input);
        assert!(picker.address_input().is_empty());
    }
}
