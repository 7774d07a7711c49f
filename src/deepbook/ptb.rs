//! Programmable transaction model
//!
//! Serde types whose BCS encoding matches Sui's `TransactionKind`, so the
//! bytes produced here can be handed to `sui_devInspectTransactionBlock` or to
//! a wallet for signing. Variant order is part of the wire format.

use anyhow::{anyhow, Result};
use base64::Engine;
use move_core_types::account_address::AccountAddress;
use move_core_types::identifier::Identifier;
use move_core_types::language_storage::TypeTag;
use serde::{Serialize, Serializer};
use std::fmt;

/// 32-byte object digest; base58 in JSON-RPC, length-prefixed bytes in BCS.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct ObjectDigest(pub [u8; 32]);

impl ObjectDigest {
    pub fn from_base58(encoded: &str) -> Result<Self> {
        let bytes = bs58::decode(encoded)
            .into_vec()
            .map_err(|e| anyhow!("Invalid object digest {}: {}", encoded, e))?;
        let array: [u8; 32] = bytes
            .try_into()
            .map_err(|b: Vec<u8>| anyhow!("Object digest must be 32 bytes, got {}", b.len()))?;
        Ok(Self(array))
    }
}

impl fmt::Display for ObjectDigest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", bs58::encode(self.0).into_string())
    }
}

impl fmt::Debug for ObjectDigest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ObjectDigest({})", self)
    }
}

impl Serialize for ObjectDigest {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_bytes(&self.0)
    }
}

/// (id, version, digest)
pub type ObjectRef = (AccountAddress, u64, ObjectDigest);

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub enum TransactionKind {
    ProgrammableTransaction(ProgrammableTransaction),
}

impl TransactionKind {
    pub fn to_bcs(&self) -> Result<Vec<u8>> {
        Ok(bcs::to_bytes(self)?)
    }

    pub fn to_bcs_base64(&self) -> Result<String> {
        Ok(base64::engine::general_purpose::STANDARD.encode(self.to_bcs()?))
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ProgrammableTransaction {
    pub inputs: Vec<CallArg>,
    pub commands: Vec<Command>,
}

impl ProgrammableTransaction {
    /// Flat description of every command, for API responses and logs.
    pub fn command_summaries(&self) -> Vec<CommandInfo> {
        self.commands
            .iter()
            .enumerate()
            .map(|(index, command)| match command {
                Command::MoveCall(call) => CommandInfo {
                    index,
                    command_type: "MoveCall".to_string(),
                    package: Some(format!("0x{}", hex::encode(call.package.as_ref()))),
                    module: Some(call.module.to_string()),
                    function: Some(call.function.to_string()),
                    type_args: call
                        .type_arguments
                        .iter()
                        .map(|t| t.to_string())
                        .collect(),
                },
                Command::TransferObjects(..) => CommandInfo::plain(index, "TransferObjects"),
                Command::SplitCoins(..) => CommandInfo::plain(index, "SplitCoins"),
                Command::MergeCoins(..) => CommandInfo::plain(index, "MergeCoins"),
            })
            .collect()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub enum CallArg {
    Pure(Vec<u8>),
    Object(ObjectArg),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub enum ObjectArg {
    ImmOrOwnedObject(ObjectRef),
    SharedObject {
        id: AccountAddress,
        initial_shared_version: u64,
        mutable: bool,
    },
    Receiving(ObjectRef),
}

impl ObjectArg {
    fn id(&self) -> AccountAddress {
        match self {
            ObjectArg::ImmOrOwnedObject((id, _, _))
            | ObjectArg::Receiving((id, _, _))
            | ObjectArg::SharedObject { id, .. } => *id,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub enum Command {
    MoveCall(Box<ProgrammableMoveCall>),
    TransferObjects(Vec<Argument>, Argument),
    SplitCoins(Argument, Vec<Argument>),
    MergeCoins(Argument, Vec<Argument>),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ProgrammableMoveCall {
    pub package: AccountAddress,
    pub module: Identifier,
    pub function: Identifier,
    pub type_arguments: Vec<TypeTag>,
    pub arguments: Vec<Argument>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum Argument {
    GasCoin,
    Input(u16),
    Result(u16),
    NestedResult(u16, u16),
}

/// Command info for transaction summaries
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize)]
pub struct CommandInfo {
    pub index: usize,
    pub command_type: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub package: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub module: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub function: Option<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub type_args: Vec<String>,
}

impl CommandInfo {
    fn plain(index: usize, command_type: &str) -> Self {
        Self {
            index,
            command_type: command_type.to_string(),
            package: None,
            module: None,
            function: None,
            type_args: Vec::new(),
        }
    }
}

/// Accumulates inputs and commands, reusing an input slot when the same pure
/// value or object is added twice.
#[derive(Debug, Default)]
pub struct ProgrammableTransactionBuilder {
    inputs: Vec<CallArg>,
    commands: Vec<Command>,
}

impl ProgrammableTransactionBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn pure<T: Serialize>(&mut self, value: &T) -> Result<Argument> {
        let bytes = bcs::to_bytes(value)?;
        if let Some(idx) = self
            .inputs
            .iter()
            .position(|input| matches!(input, CallArg::Pure(existing) if *existing == bytes))
        {
            return Ok(Argument::Input(idx as u16));
        }
        self.push_input(CallArg::Pure(bytes))
    }

    pub fn obj(&mut self, arg: ObjectArg) -> Result<Argument> {
        let id = arg.id();
        let existing = self.inputs.iter().position(
            |input| matches!(input, CallArg::Object(object) if object.id() == id),
        );
        let Some(idx) = existing else {
            return self.push_input(CallArg::Object(arg));
        };

        // A shared object used both ways must be passed mutably.
        if let (
            CallArg::Object(ObjectArg::SharedObject { mutable, .. }),
            ObjectArg::SharedObject { mutable: wanted, .. },
        ) = (&mut self.inputs[idx], &arg)
        {
            *mutable |= *wanted;
        } else if self.inputs[idx] != CallArg::Object(arg) {
            return Err(anyhow!(
                "Object 0x{} added twice with different references",
                hex::encode(id.as_ref())
            ));
        }
        Ok(Argument::Input(idx as u16))
    }

    pub fn command(&mut self, command: Command) -> Result<Argument> {
        let idx = u16::try_from(self.commands.len())
            .map_err(|_| anyhow!("Too many commands in programmable transaction"))?;
        self.commands.push(command);
        Ok(Argument::Result(idx))
    }

    pub fn move_call(
        &mut self,
        package: AccountAddress,
        module: &str,
        function: &str,
        type_arguments: Vec<TypeTag>,
        arguments: Vec<Argument>,
    ) -> Result<Argument> {
        self.command(Command::MoveCall(Box::new(ProgrammableMoveCall {
            package,
            module: Identifier::new(module)?,
            function: Identifier::new(function)?,
            type_arguments,
            arguments,
        })))
    }

    pub fn split_coins(&mut self, coin: Argument, amounts: Vec<Argument>) -> Result<Argument> {
        self.command(Command::SplitCoins(coin, amounts))
    }

    pub fn merge_coins(&mut self, target: Argument, sources: Vec<Argument>) -> Result<Argument> {
        self.command(Command::MergeCoins(target, sources))
    }

    pub fn transfer_objects(&mut self, objects: Vec<Argument>, recipient: Argument) -> Result<Argument> {
        self.command(Command::TransferObjects(objects, recipient))
    }

    pub fn finish(self) -> ProgrammableTransaction {
        ProgrammableTransaction {
            inputs: self.inputs,
            commands: self.commands,
        }
    }

    fn push_input(&mut self, arg: CallArg) -> Result<Argument> {
        let idx = u16::try_from(self.inputs.len())
            .map_err(|_| anyhow!("Too many inputs in programmable transaction"))?;
        self.inputs.push(arg);
        Ok(Argument::Input(idx))
    }
}
