//! Per-asset enrichment.
//!
//! The caller describes what it wants as an [`AttributeSet`] plus an optional
//! [`ComponentFilter`]; [`Pipeline`] works out which lookups that requires,
//! performs each of them at most once per asset and flattens the result into
//! [`EnrichedRow`]s. Lookup failures degrade to the `Unknown` sentinel and
//! never stop the run.

use std::collections::BTreeSet;
use std::fmt;

use tracing::{debug, info, instrument, warn};

use crate::freshservice::report::error::Result;
use crate::freshservice::report::ids::AssetId;
use crate::freshservice::report::model::{
    Asset, AssetFields, Component, ComponentDetail, EnrichedRow, Lookup, NamedResource, UNKNOWN,
    UserInfo, value_to_text,
};
use crate::freshservice::report::source::{AssetSource, MachineFacts};

/// Short component aliases accepted on the command line and the category
/// names the service uses for them.
pub const COMPONENT_ALIASES: &[(&str, &str)] = &[
    ("cpu", "Processor"),
    ("ram", "Memory"),
    ("hdd", "Logical Drive"),
    ("nic", "Network Adapter"),
];

/// Optional data that can be attached to each asset.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Attribute {
    /// Shorthand for every other attribute.
    AssetData,
    Department,
    AssetType,
    Location,
    User,
    SystemOs,
    MachineIp,
}

impl Attribute {
    /// Attributes resolved through the base asset record.
    fn uses_base_record(self) -> bool {
        matches!(
            self,
            Attribute::AssetData
                | Attribute::Department
                | Attribute::AssetType
                | Attribute::Location
                | Attribute::User
        )
    }
}

/// Requested attributes.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AttributeSet(BTreeSet<Attribute>);

impl AttributeSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, attribute: Attribute) {
        self.0.insert(attribute);
    }

    pub fn contains(&self, attribute: Attribute) -> bool {
        self.0.contains(&attribute)
    }

    /// Replaces [`Attribute::AssetData`] by everything it stands for. The
    /// marker itself is kept.
    pub fn expanded(mut self) -> Self {
        if self.contains(Attribute::AssetData) {
            self.0.extend([
                Attribute::Department,
                Attribute::AssetType,
                Attribute::Location,
                Attribute::User,
                Attribute::SystemOs,
                Attribute::MachineIp,
            ]);
        }
        self
    }

    pub fn needs_base_record(&self) -> bool {
        self.0.iter().any(|attribute| attribute.uses_base_record())
    }

    pub fn needs_machine_facts(&self) -> bool {
        self.contains(Attribute::SystemOs) || self.contains(Attribute::MachineIp)
    }
}

impl FromIterator<Attribute> for AttributeSet {
    fn from_iter<I: IntoIterator<Item = Attribute>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

/// Translates a component alias into the service's category name. Unknown
/// aliases are returned unchanged.
pub fn translate_component_type(alias: &str) -> String {
    let lowered = alias.to_lowercase();
    COMPONENT_ALIASES
        .iter()
        .find(|(short, _)| *short == lowered)
        .map(|(_, full)| full.to_string())
        .unwrap_or_else(|| alias.to_string())
}

/// Which component types produce rows.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ComponentFilter {
    All,
    Only(BTreeSet<String>),
}

impl ComponentFilter {
    /// Builds a filter from command-line aliases; no aliases means every type.
    pub fn from_aliases<I, S>(aliases: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let types: BTreeSet<String> = aliases
            .into_iter()
            .map(|alias| translate_component_type(alias.as_ref()))
            .collect();
        if types.is_empty() {
            ComponentFilter::All
        } else {
            ComponentFilter::Only(types)
        }
    }

    pub fn matches(&self, component_type: &str) -> bool {
        match self {
            ComponentFilter::All => true,
            ComponentFilter::Only(types) => types.contains(component_type),
        }
    }
}

/// Everything the pipeline needs to know about what to fetch.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EnrichmentRequest {
    attributes: AttributeSet,
    components: Option<ComponentFilter>,
}

impl EnrichmentRequest {
    /// `components` is `None` when no per-component rows are wanted.
    pub fn new(attributes: AttributeSet, components: Option<ComponentFilter>) -> Self {
        Self {
            attributes: attributes.expanded(),
            components,
        }
    }

    pub fn attributes(&self) -> &AttributeSet {
        &self.attributes
    }

    pub fn components(&self) -> Option<&ComponentFilter> {
        self.components.as_ref()
    }
}

enum BaseRecord {
    NotRequested,
    Loaded(Asset),
    Unavailable,
}

impl BaseRecord {
    fn loaded(&self) -> Option<&Asset> {
        match self {
            BaseRecord::Loaded(asset) => Some(asset),
            BaseRecord::NotRequested | BaseRecord::Unavailable => None,
        }
    }
}

/// Runs an [`EnrichmentRequest`] against an [`AssetSource`].
pub struct Pipeline<'a, S: AssetSource + ?Sized> {
    source: &'a S,
    request: EnrichmentRequest,
}

impl<S: AssetSource + ?Sized> fmt::Debug for Pipeline<'_, S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Pipeline")
            .field("request", &self.request)
            .finish_non_exhaustive()
    }
}

impl<'a, S: AssetSource + ?Sized> Pipeline<'a, S> {
    pub fn new(source: &'a S, request: EnrichmentRequest) -> Self {
        Self { source, request }
    }

    /// Enriches every asset in order and concatenates the rows.
    #[instrument(level = "info", skip_all, fields(asset_count = ids.len()))]
    pub fn run(&self, ids: &[AssetId]) -> Vec<EnrichedRow> {
        let mut rows = Vec::new();
        for &id in ids {
            rows.extend(self.enrich(id));
        }
        info!(row_count = rows.len(), "enrichment finished");
        rows
    }

    /// Produces the rows for a single asset.
    #[instrument(level = "debug", skip(self))]
    pub fn enrich(&self, id: AssetId) -> Vec<EnrichedRow> {
        let attributes = &self.request.attributes;

        let facts = if attributes.needs_machine_facts() {
            Some(self.machine_facts(id))
        } else {
            None
        };

        let base = if attributes.needs_base_record() {
            match self.source.asset(id) {
                Ok(Some(asset)) => BaseRecord::Loaded(asset),
                Ok(None) => {
                    warn!(asset_id = id, "no data returned for asset");
                    BaseRecord::Unavailable
                }
                Err(error) => {
                    warn!(asset_id = id, %error, "failed to fetch asset");
                    BaseRecord::Unavailable
                }
            }
        } else {
            BaseRecord::NotRequested
        };

        if matches!(base, BaseRecord::Unavailable)
            && !attributes.needs_machine_facts()
            && self.request.components.is_none()
        {
            debug!(asset_id = id, "skipping asset without data");
            return Vec::new();
        }

        let fields = self.asset_fields(id, &base, facts);

        match &self.request.components {
            None => vec![EnrichedRow {
                asset_id: id,
                component: None,
                fields,
            }],
            Some(filter) => self.component_rows(id, filter, &fields),
        }
    }

    fn asset_fields(
        &self,
        id: AssetId,
        base: &BaseRecord,
        facts: Option<MachineFacts>,
    ) -> AssetFields {
        let attributes = &self.request.attributes;
        let source = self.source;
        let wants = |attribute| attributes.contains(attribute);

        let department = wants(Attribute::Department).then(|| {
            resolve_name(id, "department", base, |a| a.department_id, |key| {
                source.department(key)
            })
        });
        let asset_type = wants(Attribute::AssetType).then(|| {
            resolve_name(id, "asset type", base, |a| a.asset_type_id, |key| {
                source.asset_type(key)
            })
        });
        let location = wants(Attribute::Location).then(|| {
            resolve_name(id, "location", base, |a| a.location_id, |key| {
                source.location(key)
            })
        });
        let user = wants(Attribute::User).then(|| self.user(id, base));

        let (system_os, machine_ip) = match facts {
            Some(facts) => (
                facts.system_os.map_or(Lookup::Unknown, Lookup::Found),
                facts.machine_ip.map_or(Lookup::Unknown, Lookup::Found),
            ),
            None => (Lookup::Unknown, Lookup::Unknown),
        };

        AssetFields {
            department,
            asset_type,
            location,
            user,
            system_os: wants(Attribute::SystemOs).then_some(system_os),
            machine_ip: wants(Attribute::MachineIp).then_some(machine_ip),
        }
    }

    fn machine_facts(&self, id: AssetId) -> MachineFacts {
        match self.source.machine_facts(id) {
            Ok(Some(facts)) => facts,
            Ok(None) => {
                warn!(asset_id = id, "no asset found for OS and IP lookup");
                MachineFacts::default()
            }
            Err(error) => {
                warn!(asset_id = id, %error, "failed to fetch OS and IP");
                MachineFacts::default()
            }
        }
    }

    fn user(&self, id: AssetId, base: &BaseRecord) -> Lookup<UserInfo> {
        let Some(asset) = base.loaded() else {
            return Lookup::Unknown;
        };
        let Some(user_id) = asset.user_id else {
            return Lookup::Absent;
        };
        match self.source.requester(user_id) {
            Ok(Some(requester)) => Lookup::Found(UserInfo::from(requester)),
            Ok(None) => Lookup::Unknown,
            Err(error) => {
                warn!(asset_id = id, user_id, %error, "failed to fetch user");
                Lookup::Unknown
            }
        }
    }

    fn component_rows(
        &self,
        id: AssetId,
        filter: &ComponentFilter,
        fields: &AssetFields,
    ) -> Vec<EnrichedRow> {
        let components = match self.source.components(id) {
            Ok(components) => components,
            Err(error) => {
                warn!(asset_id = id, %error, "failed to fetch components");
                Vec::new()
            }
        };

        let mut rows = Vec::new();
        for component in components {
            let component_type = component
                .component_type
                .clone()
                .unwrap_or_else(|| UNKNOWN.to_string());
            if !filter.matches(&component_type) {
                continue;
            }
            let Component {
                name,
                status,
                component_data,
                ..
            } = component;
            let name = name.unwrap_or_else(|| UNKNOWN.to_string());
            let status = status
                .filter(|value| !value.is_null())
                .map(|value| value_to_text(&value))
                .unwrap_or_else(|| UNKNOWN.to_string());

            for details in component_data {
                rows.push(EnrichedRow {
                    asset_id: id,
                    component: Some(ComponentDetail {
                        component_type: component_type.clone(),
                        name: name.clone(),
                        status: status.clone(),
                        details,
                    }),
                    fields: fields.clone(),
                });
            }
        }
        debug!(asset_id = id, row_count = rows.len(), "component rows built");
        rows
    }
}

/// Resolves a display name behind one of the asset's foreign keys.
fn resolve_name<K, F>(
    id: AssetId,
    what: &str,
    base: &BaseRecord,
    key: K,
    fetch: F,
) -> Lookup<String>
where
    K: FnOnce(&Asset) -> Option<u64>,
    F: FnOnce(u64) -> Result<Option<NamedResource>>,
{
    let Some(asset) = base.loaded() else {
        return Lookup::Unknown;
    };
    let Some(foreign_key) = key(asset) else {
        return Lookup::Absent;
    };
    match fetch(foreign_key) {
        Ok(Some(NamedResource {
            name: Some(name), ..
        })) => Lookup::Found(name),
        Ok(_) => Lookup::Unknown,
        Err(error) => {
            warn!(asset_id = id, key = foreign_key, %error, "failed to resolve {what}");
            Lookup::Unknown
        }
    }
}
