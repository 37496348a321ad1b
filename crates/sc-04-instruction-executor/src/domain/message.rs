//! # Protocol Message Envelope
//!
//! `{ processID, protocol, params, toXpub, seq, customData }` on the wire.
//! `params` is decoded into the record matching `protocol`.

use super::params::{
    InstallParams, ProposeParams, ProtocolParams, SetupParams, TakeActionParams, UninstallParams,
    UpdateParams,
};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use shared_crypto::Signature;
use std::fmt;

/// `seq` of a reply: the responder's message carries no step number.
pub const UNASSIGNED_SEQ_NO: i64 = -1;

/// Protocol names.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Protocol {
    /// Install an accepted proposal.
    Install,
    /// Propose an app.
    Propose,
    /// Create the channel.
    Setup,
    /// Apply an app action.
    TakeAction,
    /// Pay out and remove an app.
    Uninstall,
    /// Replace an app's state.
    Update,
}

impl Protocol {
    /// Wire name.
    pub fn as_str(&self) -> &'static str {
        match self {
            Protocol::Install => "install",
            Protocol::Propose => "propose",
            Protocol::Setup => "setup",
            Protocol::TakeAction => "takeAction",
            Protocol::Uninstall => "uninstall",
            Protocol::Update => "update",
        }
    }
}

impl fmt::Display for Protocol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl ProtocolParams {
    /// Protocol these params belong to.
    pub fn protocol(&self) -> Protocol {
        match self {
            ProtocolParams::Setup(_) => Protocol::Setup,
            ProtocolParams::Propose(_) => Protocol::Propose,
            ProtocolParams::Install(_) => Protocol::Install,
            ProtocolParams::Update(_) => Protocol::Update,
            ProtocolParams::TakeAction(_) => Protocol::TakeAction,
            ProtocolParams::Uninstall(_) => Protocol::Uninstall,
        }
    }

    fn to_value(&self) -> Result<Value, serde_json::Error> {
        match self {
            ProtocolParams::Setup(p) => serde_json::to_value(p),
            ProtocolParams::Propose(p) => serde_json::to_value(p),
            ProtocolParams::Install(p) => serde_json::to_value(p),
            ProtocolParams::Update(p) => serde_json::to_value(p),
            ProtocolParams::TakeAction(p) => serde_json::to_value(p),
            ProtocolParams::Uninstall(p) => serde_json::to_value(p),
        }
    }

    fn from_value(protocol: Protocol, value: Value) -> Result<Self, serde_json::Error> {
        Ok(match protocol {
            Protocol::Setup => ProtocolParams::Setup(serde_json::from_value::<SetupParams>(value)?),
            Protocol::Propose => {
                ProtocolParams::Propose(serde_json::from_value::<ProposeParams>(value)?)
            }
            Protocol::Install => {
                ProtocolParams::Install(serde_json::from_value::<InstallParams>(value)?)
            }
            Protocol::Update => ProtocolParams::Update(serde_json::from_value::<UpdateParams>(value)?),
            Protocol::TakeAction => {
                ProtocolParams::TakeAction(serde_json::from_value::<TakeActionParams>(value)?)
            }
            Protocol::Uninstall => {
                ProtocolParams::Uninstall(serde_json::from_value::<UninstallParams>(value)?)
            }
        })
    }
}

/// One message of a protocol run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProtocolMessage {
    /// Correlation id chosen by the initiator.
    pub process_id: String,
    /// Params, which also fix the protocol.
    pub params: ProtocolParams,
    /// Recipient's xpub.
    pub to_xpub: String,
    /// Step number, or [`UNASSIGNED_SEQ_NO`] for a reply.
    pub seq: i64,
    /// Free-form extras, chiefly signatures.
    pub custom_data: Map<String, Value>,
}

impl ProtocolMessage {
    /// Fresh random process id.
    pub fn new_process_id() -> String {
        uuid::Uuid::new_v4().to_string()
    }

    /// Protocol of this message.
    pub fn protocol(&self) -> Protocol {
        self.params.protocol()
    }

    /// Whether this is a reply to a suspended initiator.
    pub fn is_reply(&self) -> bool {
        self.seq == UNASSIGNED_SEQ_NO
    }

    /// Reply to this message: same process and params, no step number.
    pub fn reply(&self, to_xpub: impl Into<String>) -> Self {
        Self {
            process_id: self.process_id.clone(),
            params: self.params.clone(),
            to_xpub: to_xpub.into(),
            seq: UNASSIGNED_SEQ_NO,
            custom_data: Map::new(),
        }
    }

    /// Attach a signature under `key`.
    pub fn with_signature(mut self, key: &str, signature: &Signature) -> Self {
        self.custom_data
            .insert(key.to_string(), Value::String(signature.to_hex()));
        self
    }

    /// Signature stored under `key`, if present and well-formed.
    pub fn signature(&self, key: &str) -> Option<Signature> {
        self.custom_data
            .get(key)
            .and_then(|v| serde_json::from_value(v.clone()).ok())
    }
}

#[derive(Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ProtocolMessageJson {
    #[serde(rename = "processID")]
    process_id: String,
    protocol: Protocol,
    params: Value,
    to_xpub: String,
    seq: i64,
    #[serde(default)]
    custom_data: Map<String, Value>,
}

impl Serialize for ProtocolMessage {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let json = ProtocolMessageJson {
            process_id: self.process_id.clone(),
            protocol: self.protocol(),
            params: self.params.to_value().map_err(serde::ser::Error::custom)?,
            to_xpub: self.to_xpub.clone(),
            seq: self.seq,
            custom_data: self.custom_data.clone(),
        };
        json.serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for ProtocolMessage {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let json = ProtocolMessageJson::deserialize(deserializer)?;
        let params = ProtocolParams::from_value(json.protocol, json.params)
            .map_err(serde::de::Error::custom)?;
        Ok(Self {
            process_id: json.process_id,
            params,
            to_xpub: json.to_xpub,
            seq: json.seq,
            custom_data: json.custom_data,
        })
    }
}
