//! Data model: payloads returned by the asset service and the flat rows the
//! report is built from.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::freshservice::report::ids::AssetId;

/// Placeholder for values whose lookup failed.
pub const UNKNOWN: &str = "Unknown";

pub const COL_ASSET_ID: &str = "asset_id";
pub const COL_COMPONENT_TYPE: &str = "component_type";
pub const COL_COMPONENT_NAME: &str = "component_name";
pub const COL_COMPONENT_STATUS: &str = "component_status";
pub const COL_DEPARTMENT: &str = "department_name";
pub const COL_ASSET_TYPE: &str = "asset_type";
pub const COL_LOCATION: &str = "location_name";
pub const COL_USER_FIRST_NAME: &str = "user_first_name";
pub const COL_USER_LAST_NAME: &str = "user_last_name";
pub const COL_USER_EMAIL: &str = "user_email";
pub const COL_SYSTEM_OS: &str = "system_os";
pub const COL_MACHINE_IP: &str = "machine_ip";

/// Base asset record. Foreign keys are optional because the service returns
/// `null` for unassigned relations.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Asset {
    #[serde(default)]
    pub id: Option<u64>,
    #[serde(default)]
    pub display_id: Option<AssetId>,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub department_id: Option<u64>,
    #[serde(default)]
    pub asset_type_id: Option<u64>,
    #[serde(default)]
    pub location_id: Option<u64>,
    #[serde(default)]
    pub user_id: Option<u64>,
    #[serde(default)]
    pub type_fields: Option<Map<String, Value>>,
}

impl Asset {
    /// Reads a type field as display text; `None` when the field is missing
    /// or null.
    pub fn type_field(&self, key: &str) -> Option<String> {
        self.type_fields
            .as_ref()
            .and_then(|fields| fields.get(key))
            .filter(|value| !value.is_null())
            .map(value_to_text)
    }
}

/// Hardware or software sub-part of an asset.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Component {
    #[serde(default)]
    pub component_type: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub status: Option<Value>,
    #[serde(default)]
    pub component_data: Vec<Map<String, Value>>,
}

/// Any resource that is only consulted for its display name
/// (departments, asset types, locations).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct NamedResource {
    #[serde(default)]
    pub id: Option<u64>,
    #[serde(default)]
    pub name: Option<String>,
}

/// End-user account as the service calls it.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Requester {
    #[serde(default)]
    pub id: Option<u64>,
    #[serde(default)]
    pub first_name: Option<String>,
    #[serde(default)]
    pub last_name: Option<String>,
    #[serde(default)]
    pub primary_email: Option<String>,
}

/// User columns carried into report rows.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UserInfo {
    pub first_name: String,
    pub last_name: String,
    pub email: String,
}

impl UserInfo {
    pub fn unknown() -> Self {
        Self {
            first_name: UNKNOWN.to_string(),
            last_name: UNKNOWN.to_string(),
            email: UNKNOWN.to_string(),
        }
    }
}

impl From<Requester> for UserInfo {
    fn from(requester: Requester) -> Self {
        let or_unknown = |value: Option<String>| value.unwrap_or_else(|| UNKNOWN.to_string());
        Self {
            first_name: or_unknown(requester.first_name),
            last_name: or_unknown(requester.last_name),
            email: or_unknown(requester.primary_email),
        }
    }
}

/// Result of resolving one requested field.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Lookup<T> {
    /// The service returned a value.
    Found(T),
    /// The asset has no foreign key for this field, so nothing was looked up.
    Absent,
    /// The lookup was attempted and failed, or its input was unavailable.
    Unknown,
}

impl Lookup<String> {
    fn cell(&self) -> String {
        match self {
            Lookup::Found(value) => value.clone(),
            Lookup::Absent => String::new(),
            Lookup::Unknown => UNKNOWN.to_string(),
        }
    }
}

/// Asset-level enrichment. `None` means the field was not requested and no
/// column is emitted for it.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AssetFields {
    pub department: Option<Lookup<String>>,
    pub asset_type: Option<Lookup<String>>,
    pub location: Option<Lookup<String>>,
    pub user: Option<Lookup<UserInfo>>,
    pub system_os: Option<Lookup<String>>,
    pub machine_ip: Option<Lookup<String>>,
}

/// One detail entry of a component, decorated with its component's identity.
#[derive(Debug, Clone, PartialEq)]
pub struct ComponentDetail {
    pub component_type: String,
    pub name: String,
    pub status: String,
    pub details: Map<String, Value>,
}

/// Flat output unit of the pipeline.
#[derive(Debug, Clone, PartialEq)]
pub struct EnrichedRow {
    pub asset_id: AssetId,
    /// Set for component rows, `None` for asset-level rows.
    pub component: Option<ComponentDetail>,
    pub fields: AssetFields,
}

impl EnrichedRow {
    /// Column/value pairs in output order.
    pub fn cells(&self) -> Vec<(String, String)> {
        let mut cells = Vec::new();

        match &self.component {
            Some(component) => {
                for (key, value) in &component.details {
                    cells.push((key.clone(), value_to_text(value)));
                }
                cells.push((COL_COMPONENT_TYPE.into(), component.component_type.clone()));
                cells.push((COL_ASSET_ID.into(), self.asset_id.to_string()));
                cells.push((COL_COMPONENT_NAME.into(), component.name.clone()));
                cells.push((COL_COMPONENT_STATUS.into(), component.status.clone()));
            }
            None => cells.push((COL_ASSET_ID.into(), self.asset_id.to_string())),
        }

        let fields = &self.fields;
        let mut push = |column: &str, lookup: &Option<Lookup<String>>| {
            if let Some(lookup) = lookup {
                cells.push((column.to_string(), lookup.cell()));
            }
        };
        push(COL_DEPARTMENT, &fields.department);
        push(COL_ASSET_TYPE, &fields.asset_type);
        push(COL_LOCATION, &fields.location);

        let user = match &fields.user {
            Some(Lookup::Found(user)) => Some(user.clone()),
            Some(Lookup::Unknown) => Some(UserInfo::unknown()),
            Some(Lookup::Absent) | None => None,
        };
        if let Some(user) = user {
            cells.push((COL_USER_FIRST_NAME.into(), user.first_name));
            cells.push((COL_USER_LAST_NAME.into(), user.last_name));
            cells.push((COL_USER_EMAIL.into(), user.email));
        }

        let mut push = |column: &str, lookup: &Option<Lookup<String>>| {
            if let Some(lookup) = lookup {
                cells.push((column.to_string(), lookup.cell()));
            }
        };
        push(COL_SYSTEM_OS, &fields.system_os);
        push(COL_MACHINE_IP, &fields.machine_ip);

        cells
    }
}

/// Renders a JSON value as cell text: strings unquoted, null empty.
pub fn value_to_text(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::String(text) => text.clone(),
        other => other.to_string(),
    }
}
