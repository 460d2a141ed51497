//! The wire envelope exchanged with the airshipUI backend
//!
//! Every message in either direction is one JSON object of this shape.
//! Missing fields deserialize to their empty value instead of failing.

use crate::{yaml, Error, Result};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Protocol version stamped on every outgoing envelope and required on the
/// backend's initialize reply.
pub const PROTOCOL_VERSION: u32 = 2;

/// Coarse routing key carried in the envelope `type` field.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum Channel {
    /// UI-internal traffic: initialize, keepalive, auth, logs, tasks
    Ui,
    /// airshipctl operations
    Ctl,
    /// Transient warnings that bypass component routing
    Alert,
    Other(String),
}

impl Default for Channel {
    fn default() -> Self {
        Channel::Other(String::new())
    }
}

impl Channel {
    pub fn as_str(&self) -> &str {
        match self {
            Channel::Ui => "ui",
            Channel::Ctl => "ctl",
            Channel::Alert => "alert",
            Channel::Other(s) => s,
        }
    }
}

impl From<String> for Channel {
    fn from(s: String) -> Self {
        match s.as_str() {
            "ui" => Channel::Ui,
            "ctl" => Channel::Ctl,
            "alert" => Channel::Alert,
            _ => Channel::Other(s),
        }
    }
}

impl From<&str> for Channel {
    fn from(s: &str) -> Self {
        Channel::from(s.to_string())
    }
}

impl From<Channel> for String {
    fn from(c: Channel) -> Self {
        match c {
            Channel::Other(s) => s,
            other => other.as_str().to_string(),
        }
    }
}

impl fmt::Display for Channel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Component names used within a channel.
pub mod component {
    pub const ANY: &str = "any";
    pub const AUTH: &str = "auth";
    pub const INITIALIZE: &str = "initialize";
    pub const KEEPALIVE: &str = "keepalive";
    pub const LOG: &str = "log";
    pub const TASK: &str = "task";

    pub const BAREMETAL: &str = "baremetal";
    pub const CONFIG: &str = "config";
    pub const DOCUMENT: &str = "document";
    pub const HISTORY: &str = "history";
    pub const IMAGE: &str = "image";
    pub const PHASE: &str = "phase";
    pub const SECRET: &str = "secret";
}

/// Operation names carried in `subComponent`.
pub mod sub {
    // auth
    pub const APPROVED: &str = "approved";
    pub const AUTHENTICATE: &str = "authenticate";
    pub const DENIED: &str = "denied";
    pub const REFRESH: &str = "refresh";
    pub const VALIDATE: &str = "validate";

    // tasks
    pub const TASK_START: &str = "taskStart";
    pub const TASK_UPDATE: &str = "taskUpdate";
    pub const TASK_END: &str = "taskEnd";

    // shared ctl operations
    pub const GET_DEFAULTS: &str = "getDefaults";
    pub const GENERATE: &str = "generate";
    pub const INIT: &str = "init";
    pub const GET_YAML: &str = "getYaml";
    pub const YAML_WRITE: &str = "yamlWrite";
    pub const GET_TARGET: &str = "getTarget";
    pub const GET_DOCUMENTS_BY_SELECTOR: &str = "getDocumentsBySelector";

    // documents and phases
    pub const PULL: &str = "pull";
    pub const GET_PHASE_TREE: &str = "getPhaseTree";
    pub const GET_PHASE: &str = "getPhase";
    pub const GET_EXECUTOR_DOC: &str = "getExecutorDoc";
    pub const VALIDATE_PHASE: &str = "validatePhase";
    pub const RUN: &str = "run";

    // secrets
    pub const ENCRYPT: &str = "encrypt";
    pub const DECRYPT: &str = "decrypt";

    // configuration
    pub const SET_AIRSHIP_CONFIG: &str = "setAirshipConfig";
    pub const GET_AIRSHIP_CONFIG_PATH: &str = "getAirshipConfigPath";
    pub const GET_CONTEXTS: &str = "getContexts";
    pub const GET_CURRENT_CONTEXT: &str = "getCurrentContext";
    pub const GET_ENCRYPTION_CONFIGS: &str = "getEncryptionConfigs";
    pub const GET_MANAGEMENT_CONFIGS: &str = "getManagementConfigs";
    pub const GET_MANIFESTS: &str = "getManifests";
    pub const SET_CONTEXT: &str = "setContext";
    pub const SET_ENCRYPTION_CONFIG: &str = "setEncryptionConfig";
    pub const SET_MANAGEMENT_CONFIG: &str = "setManagementConfig";
    pub const SET_MANIFEST: &str = "setManifest";
    pub const USE_CONTEXT: &str = "useContext";
}

/// Dispatch key: one handler per `(channel, component)` pair.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct RouteKey {
    pub channel: Channel,
    pub component: String,
}

impl RouteKey {
    pub fn new(channel: Channel, component: impl Into<String>) -> Self {
        Self {
            channel,
            component: component.into(),
        }
    }

    /// Fallback key catching every unmatched component of a channel.
    pub fn any(channel: Channel) -> Self {
        Self::new(channel, component::ANY)
    }
}

impl fmt::Display for RouteKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.channel, self.component)
    }
}

/// Which rendition of a document a `getYaml` request asks for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DocumentMode {
    /// Editable source file
    Source,
    /// Output of kustomize rendering, read only
    Rendered,
    /// Live object from the target cluster, read only
    Kube,
}

/// Whether a bare-metal action targets hosts directly or through a phase.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ActionType {
    Direct,
    Phase,
}

/// External dashboard link pushed on initialize.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Dashboard {
    pub name: String,
    #[serde(rename = "baseURL")]
    pub base_url: String,
    pub path: String,
    pub is_proxied: bool,
}

/// Credentials sent with an authenticate request.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Authentication {
    pub id: String,
    pub password: String,
}

/// Authentication method advertised by the backend on initialize.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AuthMethod {
    #[serde(rename = "type")]
    pub kind: String,
    pub values: Vec<String>,
    pub url: String,
}

/// The single message shape exchanged over the socket.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Envelope {
    #[serde(rename = "sessionID", skip_serializing_if = "Option::is_none")]
    pub session_id: Option<String>,
    #[serde(rename = "type")]
    pub channel: Channel,
    pub component: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sub_component: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub version: Option<u32>,
    #[serde(rename = "requestID", skip_serializing_if = "Option::is_none")]
    pub request_id: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
    /// Display text only; mode selection lives in `mode`
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mode: Option<DocumentMode>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<serde_json::Value>,
    /// Base64 of UTF-8 text
    #[serde(skip_serializing_if = "Option::is_none")]
    pub yaml: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub token: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub refresh_token: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub is_authenticated: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub authentication: Option<Authentication>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub auth_method: Option<AuthMethod>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub dashboards: Option<Vec<Dashboard>>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub action_type: Option<ActionType>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub target: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub targets: Option<Vec<String>>,
}

impl Envelope {
    /// Create an envelope addressed to `(channel, component)`.
    pub fn new(channel: Channel, component: impl Into<String>) -> Self {
        Self {
            channel,
            component: component.into(),
            ..Default::default()
        }
    }

    /// Create a request for a specific operation.
    pub fn request(channel: Channel, component: impl Into<String>, sub: &str) -> Self {
        Self::new(channel, component).with_sub(sub)
    }

    /// Parse an inbound frame.
    pub fn from_json(text: &str) -> Result<Self> {
        Ok(serde_json::from_str(text)?)
    }

    /// Serialize for the wire.
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string(self)?)
    }

    pub fn with_sub(mut self, sub: &str) -> Self {
        self.sub_component = Some(sub.to_string());
        self
    }

    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = Some(id.into());
        self
    }

    /// Set `id` to the JSON encoding of a structured key.
    pub fn with_json_id<T: Serialize>(mut self, id: &T) -> Result<Self> {
        self.id = Some(serde_json::to_string(id)?);
        Ok(self)
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.message = Some(message.into());
        self
    }

    pub fn with_mode(mut self, mode: DocumentMode) -> Self {
        self.mode = Some(mode);
        self
    }

    pub fn with_data<T: Serialize>(mut self, data: &T) -> Result<Self> {
        self.data = Some(serde_json::to_value(data)?);
        Ok(self)
    }

    /// Attach editor text, base64 encoded.
    pub fn with_yaml_text(mut self, text: &str) -> Self {
        self.yaml = Some(yaml::encode(text));
        self
    }

    pub fn with_error(mut self, error: impl Into<String>) -> Self {
        self.error = Some(error.into());
        self
    }

    /// The dispatch key of this envelope.
    pub fn route_key(&self) -> RouteKey {
        RouteKey::new(self.channel.clone(), self.component.clone())
    }

    pub fn sub(&self) -> &str {
        self.sub_component.as_deref().unwrap_or_default()
    }

    pub fn is_error(&self) -> bool {
        self.error.is_some()
    }

    pub fn is_sub(&self, sub: &str) -> bool {
        self.sub_component.as_deref() == Some(sub)
    }

    /// Decode the `yaml` field. An absent or empty field yields `None`.
    pub fn yaml_text(&self) -> Result<Option<String>> {
        match self.yaml.as_deref() {
            None | Some("") => Ok(None),
            Some(payload) => yaml::decode(payload).map(Some),
        }
    }

    /// Parse a JSON-encoded `id` into a structured key.
    pub fn id_as<T: DeserializeOwned>(&self) -> Result<Option<T>> {
        match self.id.as_deref() {
            None | Some("") => Ok(None),
            Some(raw) => Ok(Some(serde_json::from_str(raw)?)),
        }
    }

    /// Deserialize the `data` payload.
    pub fn data_as<T: DeserializeOwned>(&self) -> Result<Option<T>> {
        match &self.data {
            None | Some(serde_json::Value::Null) => Ok(None),
            Some(value) => Ok(Some(T::deserialize(value).map_err(Error::from)?)),
        }
    }

    /// Short human description used when nothing else handles the envelope.
    pub fn summary(&self) -> String {
        if let Some(message) = &self.message {
            return message.clone();
        }
        match &self.sub_component {
            Some(sub) => format!("{}/{}/{}", self.channel, self.component, sub),
            None => format!("{}/{}", self.channel, self.component),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_missing_fields_default() {
        let env = Envelope::from_json("{}").unwrap();
        assert_eq!(env.channel, Channel::Other(String::new()));
        assert_eq!(env.component, "");
        assert!(env.sub_component.is_none());
        assert!(!env.is_error());
    }

    #[test]
    fn test_wire_names() {
        let env = Envelope::request(Channel::Ctl, component::SECRET, sub::GENERATE)
            .with_mode(DocumentMode::Rendered);
        let value: serde_json::Value = serde_json::from_str(&env.to_json().unwrap()).unwrap();
        assert_eq!(
            value,
            json!({
                "type": "ctl",
                "component": "secret",
                "subComponent": "generate",
                "mode": "rendered",
            })
        );
    }

    #[test]
    fn test_inbound_parsing() {
        let env = Envelope::from_json(
            r#"{"sessionID":"abc","type":"ui","component":"initialize","version":2,
                "dashboards":[{"name":"grafana","baseURL":"http://g","isProxied":true}],
                "authMethod":{"type":"basic","values":["id","password"]},
                "requestID":"r-1","refreshToken":"rt"}"#,
        )
        .unwrap();
        assert_eq!(env.session_id.as_deref(), Some("abc"));
        assert_eq!(env.route_key(), RouteKey::new(Channel::Ui, component::INITIALIZE));
        assert_eq!(env.version, Some(2));
        assert_eq!(env.request_id.as_deref(), Some("r-1"));
        assert_eq!(env.refresh_token.as_deref(), Some("rt"));
        let dashboards = env.dashboards.unwrap();
        assert_eq!(dashboards[0].base_url, "http://g");
        assert!(dashboards[0].is_proxied);
        assert_eq!(env.auth_method.unwrap().kind, "basic");
    }

    #[test]
    fn test_unknown_channel_is_preserved() {
        let env = Envelope::from_json(r#"{"type":"airshipctl","component":"x"}"#).unwrap();
        assert_eq!(env.channel, Channel::Other("airshipctl".to_string()));
        let back: serde_json::Value = serde_json::from_str(&env.to_json().unwrap()).unwrap();
        assert_eq!(back["type"], "airshipctl");
    }

    #[test]
    fn test_structured_id() {
        #[derive(Debug, PartialEq, Serialize, Deserialize)]
        struct Key {
            #[serde(rename = "Name")]
            name: String,
        }

        let env = Envelope::new(Channel::Ctl, component::PHASE)
            .with_json_id(&Key {
                name: "initinfra".to_string(),
            })
            .unwrap();
        assert_eq!(env.id.as_deref(), Some(r#"{"Name":"initinfra"}"#));

        // whitespace differences do not matter once parsed
        let echoed =
            Envelope::new(Channel::Ctl, component::PHASE).with_id(r#"{ "Name" : "initinfra" }"#);
        assert_eq!(echoed.id_as::<Key>().unwrap(), env.id_as::<Key>().unwrap());
    }

    #[test]
    fn test_yaml_text() {
        let env = Envelope::new(Channel::Ctl, component::DOCUMENT).with_yaml_text("a: 1");
        assert_eq!(env.yaml.as_deref(), Some("YTogMQ=="));
        assert_eq!(env.yaml_text().unwrap().as_deref(), Some("a: 1"));
        assert_eq!(Envelope::default().yaml_text().unwrap(), None);
    }

    #[test]
    fn test_summary() {
        let env = Envelope::request(Channel::Ctl, component::IMAGE, sub::GENERATE);
        assert_eq!(env.summary(), "ctl/image/generate");
        assert_eq!(env.with_message("done").summary(), "done");
    }
}
