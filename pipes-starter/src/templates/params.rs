// Template parameter map
//
// Key presence means "configured" for gating purposes; only a non-empty object makes it into
// the derived config. Both distinctions are explicit here.

use std::collections::HashMap;

use crate::models::config::{TemplateId, TemplateParams};

#[derive(Debug, Clone, Default, PartialEq)]
pub struct TemplateParamsMap {
    entries: HashMap<TemplateId, TemplateParams>,
}

impl TemplateParamsMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or replace the entry for `template_id`. Empty objects are stored too.
    pub fn upsert(&mut self, template_id: TemplateId, params: TemplateParams) {
        self.entries.insert(template_id, params);
    }

    pub fn remove(&mut self, template_id: TemplateId) -> Option<TemplateParams> {
        self.entries.remove(&template_id)
    }

    pub fn get(&self, template_id: TemplateId) -> Option<&TemplateParams> {
        self.entries.get(&template_id)
    }

    /// Key presence, regardless of the object's contents.
    pub fn contains(&self, template_id: TemplateId) -> bool {
        self.entries.contains_key(&template_id)
    }

    /// The entry exists and carries at least one key.
    pub fn non_empty(&self, template_id: TemplateId) -> Option<&TemplateParams> {
        self.entries.get(&template_id).filter(|p| !p.is_empty())
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn template_ids(&self) -> impl Iterator<Item = TemplateId> + '_ {
        self.entries.keys().copied()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn params(v: serde_json::Value) -> TemplateParams {
        v.as_object().cloned().unwrap()
    }

    #[test]
    fn empty_entry_is_present_but_not_non_empty() {
        let mut map = TemplateParamsMap::new();
        map.upsert(TemplateId::Erc20Transfers, TemplateParams::new());

        assert!(map.contains(TemplateId::Erc20Transfers));
        assert!(map.non_empty(TemplateId::Erc20Transfers).is_none());
    }

    #[test]
    fn upsert_replaces_and_remove_deletes() {
        let mut map = TemplateParamsMap::new();
        map.upsert(
            TemplateId::UniswapV3Swaps,
            params(json!({"factoryAddress": "0x1"})),
        );
        map.upsert(
            TemplateId::UniswapV3Swaps,
            params(json!({"factoryAddress": "0x2"})),
        );
        assert_eq!(map.len(), 1);
        assert_eq!(
            map.non_empty(TemplateId::UniswapV3Swaps).unwrap()["factoryAddress"],
            json!("0x2")
        );

        assert!(map.remove(TemplateId::UniswapV3Swaps).is_some());
        assert!(!map.contains(TemplateId::UniswapV3Swaps));
        assert!(map.remove(TemplateId::UniswapV3Swaps).is_none());
        assert!(map.is_empty());
    }
}
