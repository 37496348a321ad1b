//! # Opcodes
//!
//! The six instruction kinds a protocol flow can yield.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Instruction kind; the middleware registry has one slot per opcode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Opcode {
    /// Sign a digest with the key at an index.
    OpSign,
    /// Send a message to the counterparty.
    IoSend,
    /// Send a message and suspend until the reply with the same process id.
    IoSendAndWait,
    /// Persist updated channels.
    PersistStateChannel,
    /// Persist a signed commitment.
    PersistCommitment,
    /// Persist the effect on an app instance or proposal.
    PersistAppInstance,
}

impl Opcode {
    /// All opcodes.
    pub const ALL: [Opcode; 6] = [
        Opcode::OpSign,
        Opcode::IoSend,
        Opcode::IoSendAndWait,
        Opcode::PersistStateChannel,
        Opcode::PersistCommitment,
        Opcode::PersistAppInstance,
    ];

    /// Wire name.
    pub fn as_str(&self) -> &'static str {
        match self {
            Opcode::OpSign => "OP_SIGN",
            Opcode::IoSend => "IO_SEND",
            Opcode::IoSendAndWait => "IO_SEND_AND_WAIT",
            Opcode::PersistStateChannel => "PERSIST_STATE_CHANNEL",
            Opcode::PersistCommitment => "PERSIST_COMMITMENT",
            Opcode::PersistAppInstance => "PERSIST_APP_INSTANCE",
        }
    }
}

impl fmt::Display for Opcode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
