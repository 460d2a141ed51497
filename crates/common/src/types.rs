//! Payload types carried in the envelope `data` and `id` fields

use serde::{Deserialize, Serialize};

/// Structured phase identity. Travels JSON-encoded in the envelope `id`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PhaseId {
    #[serde(rename = "Name", default)]
    pub name: String,
    #[serde(rename = "Namespace", default, skip_serializing_if = "String::is_empty")]
    pub namespace: String,
}

impl PhaseId {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            namespace: String::new(),
        }
    }

    pub fn with_namespace(mut self, namespace: impl Into<String>) -> Self {
        self.namespace = namespace.into();
        self
    }
}

/// Node of a document or phase tree.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct KustomNode {
    pub id: String,
    pub phase_id: Option<PhaseId>,
    pub name: String,
    pub can_load_children: bool,
    pub is_phase_node: bool,
    pub has_error: bool,
    pub children: Vec<KustomNode>,
    /// Local only: a run for this phase is in flight
    #[serde(skip)]
    pub running: bool,
}

impl KustomNode {
    pub fn has_children(&self) -> bool {
        !self.children.is_empty()
    }

    /// Depth-first search by node id.
    pub fn find(&self, id: &str) -> Option<&KustomNode> {
        if self.id == id {
            return Some(self);
        }
        self.children.iter().find_map(|c| c.find(id))
    }

    pub fn find_mut(&mut self, id: &str) -> Option<&mut KustomNode> {
        if self.id == id {
            return Some(self);
        }
        self.children.iter_mut().find_map(|c| c.find_mut(id))
    }

    /// Depth-first search by structured phase identity.
    pub fn find_phase_mut(&mut self, phase: &PhaseId) -> Option<&mut KustomNode> {
        if self.phase_id.as_ref() == Some(phase) {
            return Some(self);
        }
        self.children
            .iter_mut()
            .find_map(|c| c.find_phase_mut(phase))
    }
}

/// Options sent with a phase run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunOptions {
    #[serde(rename = "Debug")]
    pub debug: bool,
    #[serde(rename = "DryRun")]
    pub dry_run: bool,
}

/// Progress of a long-running backend task, times in epoch millis.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct TaskProgress {
    pub start_time: i64,
    pub end_time: i64,
    pub last_updated: i64,
    pub total_steps: u32,
    pub current_step: u32,
    pub message: String,
    pub errors: Vec<String>,
}

/// Progress fields as pushed by the backend. Absent fields leave the
/// current value untouched when merged.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct TaskProgressUpdate {
    pub start_time: Option<i64>,
    pub end_time: Option<i64>,
    pub last_updated: Option<i64>,
    pub total_steps: Option<u32>,
    pub current_step: Option<u32>,
    pub message: Option<String>,
    pub errors: Option<Vec<String>>,
}

impl TaskProgress {
    pub fn merge(&mut self, update: TaskProgressUpdate) {
        if let Some(v) = update.start_time {
            self.start_time = v;
        }
        if let Some(v) = update.end_time {
            self.end_time = v;
        }
        if let Some(v) = update.last_updated {
            self.last_updated = v;
        }
        if let Some(v) = update.total_steps {
            self.total_steps = v;
        }
        if let Some(v) = update.current_step {
            self.current_step = v;
        }
        if let Some(v) = update.message {
            self.message = v;
        }
        if let Some(v) = update.errors {
            self.errors = v;
        }
    }
}

/// Bare-metal host row.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct NodeInfo {
    pub name: String,
    pub id: String,
    pub bmc_address: String,
}

/// Bare-metal phase row.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct PhaseInfo {
    pub name: String,
    pub generate_name: String,
    pub namespace: String,
    pub cluster_name: String,
}

/// Reply payload of `baremetal/getDefaults`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BaremetalDefaults {
    pub nodes: Vec<NodeInfo>,
    pub phases: Vec<PhaseInfo>,
}

/// One recorded operation as stored by the backend statistics table.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase", default)]
pub struct HistoryRecord {
    pub sub_component: String,
    pub user: Option<String>,
    pub action_type: Option<String>,
    pub target: Option<String>,
    pub success: bool,
    pub started: i64,
    pub elapsed: i64,
    pub stopped: i64,
}

/// An airshipctl context.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Context {
    pub name: String,
    pub context_kubeconf: String,
    pub manifest: String,
    pub encryption_config: String,
    pub management_configuration: String,
}

/// Options for `config/setContext`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase", default)]
pub struct ContextOptions {
    pub name: String,
    pub manifest: String,
    pub management_configuration: String,
    pub encryption_config: String,
}

/// An encryption configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct EncryptionConfig {
    pub name: String,
    pub encryption_key_path: String,
    pub decryption_key_path: String,
    pub key_secret_name: String,
    pub key_secret_namespace: String,
}

/// Options for `config/setEncryptionConfig`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase", default)]
pub struct EncryptionConfigOptions {
    pub name: String,
    pub encryption_key_path: String,
    pub decryption_key_path: String,
    pub key_secret_name: String,
    pub key_secret_namespace: String,
}

/// A management configuration. `Name` is capitalized on the wire to match
/// the other option structs.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ManagementConfig {
    #[serde(rename = "Name")]
    pub name: String,
    pub insecure: bool,
    pub system_action_retries: u32,
    pub system_reboot_delay: u32,
    #[serde(rename = "type")]
    pub kind: String,
    pub useproxy: bool,
}

/// A named manifest.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Manifest {
    pub name: String,
    pub manifest: CtlManifest,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct CtlManifest {
    pub phase_repository_name: String,
    pub repositories: serde_json::Value,
    pub target_path: String,
    pub sub_path: String,
    pub metadata_path: String,
}

/// Options for `config/setManifest`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase", default)]
pub struct ManifestOptions {
    pub name: String,
    pub repo_name: String,
    #[serde(rename = "URL")]
    pub url: String,
    pub branch: String,
    pub commit_hash: String,
    pub tag: String,
    pub remote_ref: String,
    pub force: bool,
    pub is_phase: bool,
    pub sub_path: String,
    pub target_path: String,
    pub metadata_path: String,
}
