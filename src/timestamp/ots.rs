//! OpenTimestamps proof trees.
//!
//! A serialized timestamp is a tree rooted at the stamped message. Every edge
//! is an operation applied to the parent's message and every leaf carries
//! attestations. A calendar indexes pending stamps by the message of the node
//! holding the pending attestation, and answers upgrade requests with a
//! subtree rooted at that same message.

use sha2::{Digest, Sha256};

use crate::error_handling::NotaryError;

/// Tag of a Bitcoin block header attestation.
pub const BITCOIN_ATTESTATION_TAG: [u8; 8] = [0x05, 0x88, 0x96, 0x0d, 0x73, 0xd7, 0x19, 0x01];
/// Tag of a calendar's pending attestation.
pub const PENDING_ATTESTATION_TAG: [u8; 8] = [0x83, 0xdf, 0xe3, 0x0d, 0x2e, 0xf9, 0x0c, 0x8e];

const TAG_ATTESTATION: u8 = 0x00;
const TAG_FORK: u8 = 0xff;
const TAG_SHA256: u8 = 0x08;
const TAG_APPEND: u8 = 0xf0;
const TAG_PREPEND: u8 = 0xf1;
const TAG_REVERSE: u8 = 0xf2;
const TAG_HEXLIFY: u8 = 0xf3;

const MAX_DEPTH: usize = 256;
const MAX_OP_ARG_LEN: usize = 4096;
const MAX_PAYLOAD_LEN: usize = 8192;
const MAX_URI_LEN: usize = 1000;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Op {
    Append(Vec<u8>),
    Prepend(Vec<u8>),
    Reverse,
    Hexlify,
    Sha256,
}

impl Op {
    fn read(tag: u8, reader: &mut Reader<'_>) -> Result<Self, NotaryError> {
        Ok(match tag {
            TAG_APPEND => Op::Append(reader.varbytes(MAX_OP_ARG_LEN)?.to_vec()),
            TAG_PREPEND => Op::Prepend(reader.varbytes(MAX_OP_ARG_LEN)?.to_vec()),
            TAG_REVERSE => Op::Reverse,
            TAG_HEXLIFY => Op::Hexlify,
            TAG_SHA256 => Op::Sha256,
            other => {
                return Err(NotaryError::InvalidProof(format!(
                    "unsupported operation 0x{other:02x}"
                )))
            }
        })
    }

    fn write(&self, out: &mut Vec<u8>) {
        match self {
            Op::Append(arg) => {
                out.push(TAG_APPEND);
                write_varbytes(out, arg);
            }
            Op::Prepend(arg) => {
                out.push(TAG_PREPEND);
                write_varbytes(out, arg);
            }
            Op::Reverse => out.push(TAG_REVERSE),
            Op::Hexlify => out.push(TAG_HEXLIFY),
            Op::Sha256 => out.push(TAG_SHA256),
        }
    }

    pub fn apply(&self, msg: &[u8]) -> Vec<u8> {
        match self {
            Op::Append(arg) => [msg, arg.as_slice()].concat(),
            Op::Prepend(arg) => [arg.as_slice(), msg].concat(),
            Op::Reverse => msg.iter().rev().copied().collect(),
            Op::Hexlify => hex::encode(msg).into_bytes(),
            Op::Sha256 => Sha256::digest(msg).to_vec(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Attestation {
    Bitcoin { height: u64 },
    Pending { uri: String },
    Unknown { tag: [u8; 8], payload: Vec<u8> },
}

impl Attestation {
    fn read(reader: &mut Reader<'_>) -> Result<Self, NotaryError> {
        let tag: [u8; 8] = reader
            .take(8)?
            .try_into()
            .map_err(|_| invalid("attestation tag"))?;
        let payload = reader.varbytes(MAX_PAYLOAD_LEN)?;
        let mut inner = Reader::new(payload);
        Ok(match tag {
            BITCOIN_ATTESTATION_TAG => Attestation::Bitcoin {
                height: inner.varuint()?,
            },
            PENDING_ATTESTATION_TAG => {
                let uri = inner.varbytes(MAX_URI_LEN)?;
                Attestation::Pending {
                    uri: String::from_utf8(uri.to_vec())
                        .map_err(|_| invalid("pending attestation URI"))?,
                }
            }
            _ => Attestation::Unknown {
                tag,
                payload: payload.to_vec(),
            },
        })
    }

    fn write(&self, out: &mut Vec<u8>) {
        out.push(TAG_ATTESTATION);
        let mut payload = Vec::new();
        match self {
            Attestation::Bitcoin { height } => {
                out.extend_from_slice(&BITCOIN_ATTESTATION_TAG);
                write_varuint(&mut payload, *height);
            }
            Attestation::Pending { uri } => {
                out.extend_from_slice(&PENDING_ATTESTATION_TAG);
                write_varbytes(&mut payload, uri.as_bytes());
            }
            Attestation::Unknown { tag, payload: raw } => {
                out.extend_from_slice(tag);
                payload.extend_from_slice(raw);
            }
        }
        write_varbytes(out, &payload);
    }
}

/// One node of a proof tree and everything below it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Timestamp {
    pub msg: Vec<u8>,
    pub attestations: Vec<Attestation>,
    pub ops: Vec<(Op, Timestamp)>,
}

impl Timestamp {
    pub fn new(msg: Vec<u8>) -> Self {
        Self {
            msg,
            attestations: Vec::new(),
            ops: Vec::new(),
        }
    }

    /// Parses a serialized timestamp whose root message is `msg`.
    pub fn deserialize(msg: &[u8], bytes: &[u8]) -> Result<Self, NotaryError> {
        let mut reader = Reader::new(bytes);
        let timestamp = Self::read(&mut reader, msg.to_vec(), 0)?;
        if !reader.is_empty() {
            return Err(invalid("trailing bytes"));
        }
        Ok(timestamp)
    }

    fn read(reader: &mut Reader<'_>, msg: Vec<u8>, depth: usize) -> Result<Self, NotaryError> {
        if depth > MAX_DEPTH {
            return Err(invalid("proof nesting"));
        }
        let mut timestamp = Self::new(msg);
        let mut tag = reader.byte()?;
        while tag == TAG_FORK {
            let branch = reader.byte()?;
            timestamp.read_item(reader, branch, depth)?;
            tag = reader.byte()?;
        }
        timestamp.read_item(reader, tag, depth)?;
        Ok(timestamp)
    }

    fn read_item(&mut self, reader: &mut Reader<'_>, tag: u8, depth: usize) -> Result<(), NotaryError> {
        if tag == TAG_ATTESTATION {
            self.attestations.push(Attestation::read(reader)?);
        } else {
            let op = Op::read(tag, reader)?;
            let child = Self::read(reader, op.apply(&self.msg), depth + 1)?;
            self.ops.push((op, child));
        }
        Ok(())
    }

    pub fn serialize(&self) -> Vec<u8> {
        let mut out = Vec::new();
        self.write(&mut out);
        out
    }

    fn write(&self, out: &mut Vec<u8>) {
        let count = self.attestations.len() + self.ops.len();
        let mut written = 0;
        for attestation in &self.attestations {
            written += 1;
            if written < count {
                out.push(TAG_FORK);
            }
            attestation.write(out);
        }
        for (op, child) in &self.ops {
            written += 1;
            if written < count {
                out.push(TAG_FORK);
            }
            op.write(out);
            child.write(out);
        }
    }

    /// Messages of the nodes that still wait on a calendar.
    pub fn pending_commitments(&self) -> Vec<Vec<u8>> {
        let mut commitments = Vec::new();
        self.collect_pending(&mut commitments);
        commitments
    }

    fn collect_pending(&self, commitments: &mut Vec<Vec<u8>>) {
        let pending = self
            .attestations
            .iter()
            .any(|a| matches!(a, Attestation::Pending { .. }));
        if pending && !commitments.contains(&self.msg) {
            commitments.push(self.msg.clone());
        }
        for (_, child) in &self.ops {
            child.collect_pending(commitments);
        }
    }

    /// Lowest Bitcoin block height attested anywhere in the tree.
    pub fn bitcoin_height(&self) -> Option<u64> {
        let here = self.attestations.iter().filter_map(|a| match a {
            Attestation::Bitcoin { height } => Some(*height),
            _ => None,
        });
        let below = self.ops.iter().filter_map(|(_, child)| child.bitcoin_height());
        here.chain(below).min()
    }

    pub fn node_mut(&mut self, msg: &[u8]) -> Option<&mut Timestamp> {
        if self.msg == msg {
            return Some(self);
        }
        self.ops.iter_mut().find_map(|(_, child)| child.node_mut(msg))
    }

    /// Adds the attestations and operations of `other`, which must share this
    /// node's message.
    pub fn merge(&mut self, other: Timestamp) {
        for attestation in other.attestations {
            if !self.attestations.contains(&attestation) {
                self.attestations.push(attestation);
            }
        }
        for (op, child) in other.ops {
            match self.ops.iter_mut().find(|(existing, _)| *existing == op) {
                Some((_, existing)) => existing.merge(child),
                None => self.ops.push((op, child)),
            }
        }
    }
}

struct Reader<'a> {
    bytes: &'a [u8],
    pos: usize,
}

impl<'a> Reader<'a> {
    fn new(bytes: &'a [u8]) -> Self {
        Self { bytes, pos: 0 }
    }

    fn is_empty(&self) -> bool {
        self.pos >= self.bytes.len()
    }

    fn byte(&mut self) -> Result<u8, NotaryError> {
        Ok(self.take(1)?[0])
    }

    fn take(&mut self, len: usize) -> Result<&'a [u8], NotaryError> {
        let end = self.pos.checked_add(len).ok_or_else(|| invalid("length"))?;
        let slice = self
            .bytes
            .get(self.pos..end)
            .ok_or_else(|| invalid("truncated proof"))?;
        self.pos = end;
        Ok(slice)
    }

    /// Unsigned LEB128.
    fn varuint(&mut self) -> Result<u64, NotaryError> {
        let mut value: u64 = 0;
        for shift in (0..64).step_by(7) {
            let byte = self.byte()?;
            value |= u64::from(byte & 0x7f) << shift;
            if byte & 0x80 == 0 {
                return Ok(value);
            }
        }
        Err(invalid("varuint overflow"))
    }

    fn varbytes(&mut self, max_len: usize) -> Result<&'a [u8], NotaryError> {
        let len = usize::try_from(self.varuint()?).map_err(|_| invalid("length"))?;
        if len > max_len {
            return Err(invalid("oversized field"));
        }
        self.take(len)
    }
}

fn invalid(what: &str) -> NotaryError {
    NotaryError::InvalidProof(format!("malformed {what}"))
}

fn write_varuint(out: &mut Vec<u8>, mut value: u64) {
    loop {
        let byte = (value & 0x7f) as u8;
        value >>= 7;
        if value == 0 {
            out.push(byte);
            return;
        }
        out.push(byte | 0x80);
    }
}

fn write_varbytes(out: &mut Vec<u8>, bytes: &[u8]) {
    write_varuint(out, bytes.len() as u64);
    out.extend_from_slice(bytes);
}
