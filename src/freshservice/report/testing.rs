//! In-memory [`AssetSource`] used by the test suites.

use std::cell::RefCell;
use std::collections::{HashMap, HashSet};

use crate::freshservice::report::error::{ReportError, Result};
use crate::freshservice::report::ids::AssetId;
use crate::freshservice::report::model::{Asset, Component, NamedResource, Requester};
use crate::freshservice::report::source::{AssetSource, MachineFacts};

/// A call made against the mock, recorded in order.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Call {
    Asset(AssetId),
    Components(AssetId),
    Department(u64),
    AssetType(u64),
    Location(u64),
    Requester(u64),
    MachineFacts(AssetId),
    FindRequester(String, String),
    AssetsForUser(u64),
}

/// Canned responses keyed by ID, plus a list of calls that should fail.
#[derive(Debug, Default)]
pub struct MockAssetSource {
    assets: HashMap<AssetId, Asset>,
    components: HashMap<AssetId, Vec<Component>>,
    departments: HashMap<u64, String>,
    asset_types: HashMap<u64, String>,
    locations: HashMap<u64, String>,
    requesters: HashMap<u64, Requester>,
    machine_facts: HashMap<AssetId, MachineFacts>,
    failures: HashSet<Call>,
    calls: RefCell<Vec<Call>>,
}

impl MockAssetSource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_asset(mut self, id: AssetId, asset: Asset) -> Self {
        self.assets.insert(id, asset);
        self
    }

    pub fn with_components(mut self, id: AssetId, components: Vec<Component>) -> Self {
        self.components.insert(id, components);
        self
    }

    pub fn with_department(mut self, id: u64, name: &str) -> Self {
        self.departments.insert(id, name.to_string());
        self
    }

    pub fn with_asset_type(mut self, id: u64, name: &str) -> Self {
        self.asset_types.insert(id, name.to_string());
        self
    }

    pub fn with_location(mut self, id: u64, name: &str) -> Self {
        self.locations.insert(id, name.to_string());
        self
    }

    pub fn with_requester(mut self, requester: Requester) -> Self {
        let id = requester.id.unwrap_or_default();
        self.requesters.insert(id, requester);
        self
    }

    pub fn with_machine_facts(mut self, id: AssetId, os: &str, ip: &str) -> Self {
        self.machine_facts.insert(
            id,
            MachineFacts {
                system_os: Some(os.to_string()),
                machine_ip: Some(ip.to_string()),
            },
        );
        self
    }

    /// Makes `call` return a server error instead of data.
    pub fn failing(mut self, call: Call) -> Self {
        self.failures.insert(call);
        self
    }

    /// Every call made so far, in order.
    pub fn calls(&self) -> Vec<Call> {
        self.calls.borrow().clone()
    }

    fn record(&self, call: Call) -> Result<()> {
        self.calls.borrow_mut().push(call.clone());
        if self.failures.contains(&call) {
            return Err(ReportError::Status {
                status: 500,
                url: format!("mock://{call:?}"),
            });
        }
        Ok(())
    }

    fn named(names: &HashMap<u64, String>, id: u64) -> Option<NamedResource> {
        names.get(&id).map(|name| NamedResource {
            id: Some(id),
            name: Some(name.clone()),
        })
    }
}

impl AssetSource for MockAssetSource {
    fn asset(&self, id: AssetId) -> Result<Option<Asset>> {
        self.record(Call::Asset(id))?;
        Ok(self.assets.get(&id).cloned())
    }

    fn components(&self, id: AssetId) -> Result<Vec<Component>> {
        self.record(Call::Components(id))?;
        Ok(self.components.get(&id).cloned().unwrap_or_default())
    }

    fn department(&self, id: u64) -> Result<Option<NamedResource>> {
        self.record(Call::Department(id))?;
        Ok(Self::named(&self.departments, id))
    }

    fn asset_type(&self, id: u64) -> Result<Option<NamedResource>> {
        self.record(Call::AssetType(id))?;
        Ok(Self::named(&self.asset_types, id))
    }

    fn location(&self, id: u64) -> Result<Option<NamedResource>> {
        self.record(Call::Location(id))?;
        Ok(Self::named(&self.locations, id))
    }

    fn requester(&self, id: u64) -> Result<Option<Requester>> {
        self.record(Call::Requester(id))?;
        Ok(self.requesters.get(&id).cloned())
    }

    fn machine_facts(&self, id: AssetId) -> Result<Option<MachineFacts>> {
        self.record(Call::MachineFacts(id))?;
        Ok(self.machine_facts.get(&id).cloned())
    }

    fn find_requester(&self, first_name: &str, last_name: &str) -> Result<Option<Requester>> {
        self.record(Call::FindRequester(
            first_name.to_string(),
            last_name.to_string(),
        ))?;
        Ok(self
            .requesters
            .values()
            .find(|requester| {
                requester.first_name.as_deref() == Some(first_name)
                    && requester.last_name.as_deref() == Some(last_name)
            })
            .cloned())
    }

    fn assets_for_user(&self, user_id: u64) -> Result<Vec<Asset>> {
        self.record(Call::AssetsForUser(user_id))?;
        let mut assets: Vec<(AssetId, Asset)> = self
            .assets
            .iter()
            .filter(|(_, asset)| asset.user_id == Some(user_id))
            .map(|(id, asset)| (*id, asset.clone()))
            .collect();
        assets.sort_by_key(|(id, _)| *id);
        Ok(assets.into_iter().map(|(_, asset)| asset).collect())
    }
}
