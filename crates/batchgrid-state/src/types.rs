//! Domain and wire types for provisioning batches.
//!
//! `BatchRequest` is both the message published on the batch topics and
//! the record persisted in the key-value store. `ItemWorkOrder` and
//! `ItemOutcome` are the messages exchanged with downstream workers.
//! Every field defaults to its zero value when absent so that partially
//! populated payloads from older producers still decode.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize};

use crate::key::CacheKey;

/// Identifier correlating every message of one batch.
pub type ServiceId = String;

// ── Action ────────────────────────────────────────────────────────

/// The provisioning verb a batch applies to all of its items.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Action {
    #[default]
    Create,
    Update,
    Delete,
}

impl Action {
    pub const ALL: [Action; 3] = [Action::Create, Action::Update, Action::Delete];

    pub fn as_str(&self) -> &'static str {
        match self {
            Action::Create => "create",
            Action::Update => "update",
            Action::Delete => "delete",
        }
    }

    /// Derive the action from the second dot-separated segment of a topic,
    /// e.g. `instances.create` or `instance.delete.done`.
    pub fn from_subject(subject: &str) -> Option<Self> {
        subject.split('.').nth(1)?.parse().ok()
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Returned when a string is not one of the known actions.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown action: {0}")]
pub struct UnknownAction(pub String);

impl FromStr for Action {
    type Err = UnknownAction;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "create" => Ok(Action::Create),
            "update" => Ok(Action::Update),
            "delete" => Ok(Action::Delete),
            other => Err(UnknownAction(other.to_string())),
        }
    }
}

// ── Statuses ──────────────────────────────────────────────────────

/// Aggregate status of a batch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BatchStatus {
    #[default]
    #[serde(alias = "")]
    Pending,
    Completed,
    Error,
}

impl BatchStatus {
    pub fn is_terminal(&self) -> bool {
        !matches!(self, BatchStatus::Pending)
    }
}

/// Lifecycle status of a single item.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ItemStatus {
    #[default]
    #[serde(alias = "")]
    Pending,
    #[serde(alias = "processed")]
    Processing,
    Completed,
    Errored,
}

impl ItemStatus {
    /// Completed and errored items never transition again.
    pub fn is_terminal(&self) -> bool {
        matches!(self, ItemStatus::Completed | ItemStatus::Errored)
    }
}

impl fmt::Display for ItemStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ItemStatus::Pending => "pending",
            ItemStatus::Processing => "processing",
            ItemStatus::Completed => "completed",
            ItemStatus::Errored => "errored",
        };
        f.write_str(s)
    }
}

// ── Item ──────────────────────────────────────────────────────────

/// A disk attached to an item.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Disk {
    pub id: u64,
    pub size: u64,
}

/// Router the item's network hangs off.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RouterDescriptor {
    #[serde(rename = "router_name")]
    pub name: String,
    #[serde(rename = "router_type")]
    pub kind: String,
    #[serde(rename = "router_ip")]
    pub ip: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClientDescriptor {
    #[serde(rename = "client_name")]
    pub name: String,
}

/// Datacenter the item is provisioned into, with its credentials.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DatacenterDescriptor {
    #[serde(rename = "datacenter_name")]
    pub name: String,
    #[serde(rename = "datacenter_type")]
    pub kind: String,
    #[serde(rename = "datacenter_region")]
    pub region: String,
    #[serde(rename = "datacenter_username")]
    pub username: String,
    #[serde(rename = "datacenter_password")]
    pub password: String,
}

/// One unit of provisioning work inside a batch.
///
/// `name` is unique within the batch and is what outcome notifications
/// are correlated on.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Item {
    pub name: String,
    #[serde(rename = "type")]
    pub kind: String,
    pub cpus: u32,
    pub ram: u64,
    pub ip: String,
    #[serde(rename = "reference_catalog")]
    pub catalog: String,
    #[serde(rename = "reference_image")]
    pub image: String,
    #[serde(deserialize_with = "null_as_empty")]
    pub disks: Vec<Disk>,
    #[serde(flatten)]
    pub router: RouterDescriptor,
    #[serde(flatten)]
    pub client: ClientDescriptor,
    #[serde(flatten)]
    pub datacenter: DatacenterDescriptor,
    pub network_name: String,
    pub vcloud_url: String,
    pub status: ItemStatus,
    pub error_code: String,
    pub error_message: String,
}

// ── Batch ─────────────────────────────────────────────────────────

/// A provisioning batch, identified by `(service_id, action)`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BatchRequest {
    #[serde(rename = "service")]
    pub service_id: ServiceId,
    pub status: BatchStatus,
    pub error_code: String,
    pub error_message: String,
    #[serde(rename = "instances", deserialize_with = "null_as_empty")]
    pub items: Vec<Item>,
    pub sequential_processing: bool,
    /// Always stamped from the triggering topic, never trusted from input.
    pub action: Action,
}

impl BatchRequest {
    /// Key the record is persisted under.
    pub fn cache_key(&self) -> CacheKey {
        CacheKey::compose(&self.service_id, self.action)
    }

    /// Mark the batch completed and clear any previous error.
    pub fn mark_completed(&mut self) {
        self.status = BatchStatus::Completed;
        self.error_code.clear();
        self.error_message.clear();
    }

    /// Put a resubmitted batch back in flight, dropping any terminal
    /// status and error left from a previous run.
    pub fn reopen(&mut self) {
        self.status = BatchStatus::Pending;
        self.error_code.clear();
        self.error_message.clear();
    }

    pub fn mark_error(&mut self, code: &str, message: &str) {
        self.status = BatchStatus::Error;
        self.error_code = code.to_string();
        self.error_message = message.to_string();
    }

    /// True if any item anywhere in the batch ended in `errored`.
    pub fn has_errored_items(&self) -> bool {
        self.items.iter().any(|i| i.status == ItemStatus::Errored)
    }
}

// ── Work orders ───────────────────────────────────────────────────

/// Resource block of a work order, denormalized from the item.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct InstanceResource {
    pub cpus: u32,
    pub ram: u64,
    pub ip: String,
    #[serde(rename = "reference_catalog")]
    pub catalog: String,
    #[serde(rename = "reference_image")]
    pub image: String,
    #[serde(deserialize_with = "null_as_empty")]
    pub disks: Vec<Disk>,
}

/// Message instructing a downstream worker to act on one item.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ItemWorkOrder {
    pub service_id: ServiceId,
    /// Name of the topic the order is published on.
    #[serde(rename = "type")]
    pub kind: String,
    pub instance_name: String,
    pub instance_type: String,
    #[serde(rename = "instance_resource")]
    pub resource: InstanceResource,
    pub router_name: String,
    pub router_type: String,
    pub router_ip: String,
    pub client_name: String,
    pub datacenter_name: String,
    pub datacenter_password: String,
    pub datacenter_region: String,
    pub datacenter_type: String,
    pub datacenter_username: String,
    pub network_name: String,
    pub vcloud_url: String,
}

impl ItemWorkOrder {
    /// Build the work order for `item`, to be published on `topic`.
    pub fn for_item(item: &Item, service_id: &str, topic: &str) -> Self {
        Self {
            service_id: service_id.to_string(),
            kind: topic.to_string(),
            instance_name: item.name.clone(),
            instance_type: item.datacenter.kind.clone(),
            resource: InstanceResource {
                cpus: item.cpus,
                ram: item.ram,
                ip: item.ip.clone(),
                catalog: item.catalog.clone(),
                image: item.image.clone(),
                disks: item.disks.clone(),
            },
            router_name: item.router.name.clone(),
            router_type: item.router.kind.clone(),
            router_ip: item.router.ip.clone(),
            client_name: item.client.name.clone(),
            datacenter_name: item.datacenter.name.clone(),
            datacenter_password: item.datacenter.password.clone(),
            datacenter_region: item.datacenter.region.clone(),
            datacenter_type: item.datacenter.kind.clone(),
            datacenter_username: item.datacenter.username.clone(),
            network_name: item.network_name.clone(),
            vcloud_url: item.vcloud_url.clone(),
        }
    }
}

// ── Outcomes ──────────────────────────────────────────────────────

/// Failure details reported by a worker.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct OutcomeError {
    /// Workers send the code either as a JSON number or a string.
    #[serde(deserialize_with = "number_or_string")]
    pub code: String,
    pub message: String,
}

/// Notification reporting one item's result.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ItemOutcome {
    #[serde(rename = "type")]
    pub kind: String,
    pub service_id: ServiceId,
    pub instance_id: String,
    pub instance_name: String,
    pub error: Option<OutcomeError>,
}

fn number_or_string<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Code {
        Text(String),
        Number(serde_json::Number),
    }

    Ok(match Option::<Code>::deserialize(deserializer)? {
        Some(Code::Text(s)) => s,
        Some(Code::Number(n)) => n.to_string(),
        None => String::new(),
    })
}

/// Producers that marshal an unset list write `null` rather than `[]`.
fn null_as_empty<'de, D, T>(deserializer: D) -> Result<Vec<T>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    Ok(Option::<Vec<T>>::deserialize(deserializer)?.unwrap_or_default())
}
