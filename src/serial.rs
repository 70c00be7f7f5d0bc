//! Binary encoding of [`Rule`](crate::Rule) trees.
//!
//! Rules are normally exchanged as JSON. This module adds a compact, checked
//! binary envelope for storing rule trees in caches and blobs. The format is a
//! 32-byte fixed header followed by a bincode-encoded payload.
//!
//! ## Wire Format
//!
//! ```text
//! Offset  Size  Field
//! 0       4     Magic bytes: b"RKIT"
//! 4       2     Format version (u16, little-endian)
//! 6       2     Engine version (u16, little-endian)
//! 8       4     Flags (u32, reserved)
//! 12      4     Payload length in bytes (u32, little-endian)
//! 16      16    BLAKE3 hash of the payload (truncated to 16 bytes)
//! 32..    var   Bincode-encoded payload
//! ```
//!
//! ## Versioning
//!
//! The format version in the header must match exactly, otherwise decoding
//! fails with [`DeserializeError::IncompatibleVersion`]. The engine version is
//! informational only.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::types::{Literal, Operator, Quantifier, Reducer, Rule, Selector};

// ---------------------------------------------------------------------------
// Constants
// ---------------------------------------------------------------------------

const MAGIC: &[u8; 4] = b"RKIT";
const FORMAT_VERSION: u16 = 1;
const ENGINE_VERSION: u16 = 1;
const HEADER_SIZE: usize = 32;

// ---------------------------------------------------------------------------
// Error types
// ---------------------------------------------------------------------------

/// Errors that can occur when encoding a [`Rule`](crate::Rule) to bytes.
#[derive(Debug, Error)]
pub enum SerializeError {
    #[error("failed to encode rule: {0}")]
    Encode(#[from] bincode::error::EncodeError),

    #[error("rule payload of {0} bytes exceeds the 4 GiB format limit")]
    TooLarge(usize),
}

/// Errors that can occur when decoding a [`Rule`](crate::Rule) from bytes.
#[derive(Debug, Error)]
pub enum DeserializeError {
    #[error("not a rulekit binary: invalid magic bytes")]
    BadMagic,

    #[error("incompatible format version: blob is v{blob}, engine supports v{supported}")]
    IncompatibleVersion { blob: u16, supported: u16 },

    #[error("integrity check failed: BLAKE3 checksum mismatch")]
    ChecksumMismatch,

    #[error("payload length mismatch: expected {expected} bytes, got {actual}")]
    LengthMismatch { expected: u32, actual: usize },

    #[error("failed to decode payload: {0}")]
    Decode(#[from] bincode::error::DecodeError),

    #[error("validation failed: {0}")]
    Validation(String),
}

// ---------------------------------------------------------------------------
// Serialized type hierarchy
// ---------------------------------------------------------------------------

#[derive(Debug, Serialize, Deserialize)]
struct SerializedEnvelope {
    metadata: RuleMetadata,
    root: SerializedRule,
}

#[derive(Debug, Serialize, Deserialize)]
struct RuleMetadata {
    node_count: usize,
    depth: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct SerializedRule {
    member_name: Option<String>,
    operator: String,
    target_value: SerializedLiteral,
    rules: Vec<SerializedRule>,
    inputs: Vec<SerializedLiteral>,
    filter: Option<Box<SerializedRule>>,
    selector: Option<SerializedSelector>,
    declared_type: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct SerializedSelector {
    member_name: Option<String>,
    operator: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
enum SerializedLiteral {
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    Str(String),
}

// ---------------------------------------------------------------------------
// Literal conversion
// ---------------------------------------------------------------------------

fn serialize_literal(literal: &Literal) -> SerializedLiteral {
    match literal {
        Literal::Null => SerializedLiteral::Null,
        Literal::Bool(v) => SerializedLiteral::Bool(*v),
        Literal::Int(v) => SerializedLiteral::Int(*v),
        Literal::Float(v) => SerializedLiteral::Float(*v),
        Literal::String(v) => SerializedLiteral::Str(v.clone()),
    }
}

fn deserialize_literal(literal: SerializedLiteral) -> Literal {
    match literal {
        SerializedLiteral::Null => Literal::Null,
        SerializedLiteral::Bool(v) => Literal::Bool(v),
        SerializedLiteral::Int(v) => Literal::Int(v),
        SerializedLiteral::Float(v) => Literal::Float(v),
        SerializedLiteral::Str(v) => Literal::String(v),
    }
}

// ---------------------------------------------------------------------------
// Rule <-> SerializedRule
// ---------------------------------------------------------------------------

fn serialize_rule(rule: &Rule) -> SerializedRule {
    SerializedRule {
        member_name: rule.member_name.clone(),
        operator: rule.operator.clone(),
        target_value: serialize_literal(&rule.target_value),
        rules: rule.rules.iter().map(serialize_rule).collect(),
        inputs: rule.inputs.iter().map(serialize_literal).collect(),
        filter: rule
            .enumerable_filter
            .as_deref()
            .map(|f| Box::new(serialize_rule(f))),
        selector: rule
            .enumerable_value_expression
            .as_ref()
            .map(|s| SerializedSelector {
                member_name: s.member_name.clone(),
                operator: s.operator.clone(),
            }),
        declared_type: rule.declared_type.clone(),
    }
}

fn deserialize_rule(rule: SerializedRule) -> Rule {
    Rule {
        member_name: rule.member_name,
        operator: rule.operator,
        target_value: deserialize_literal(rule.target_value),
        rules: rule.rules.into_iter().map(deserialize_rule).collect(),
        inputs: rule.inputs.into_iter().map(deserialize_literal).collect(),
        enumerable_filter: rule.filter.map(|f| Box::new(deserialize_rule(*f))),
        enumerable_value_expression: rule.selector.map(|s| Selector {
            member_name: s.member_name,
            operator: s.operator,
        }),
        declared_type: rule.declared_type,
    }
}

fn count_nodes(rule: &SerializedRule) -> usize {
    1 + rule.rules.iter().map(count_nodes).sum::<usize>()
        + rule.filter.as_deref().map_or(0, count_nodes)
}

fn depth(rule: &SerializedRule) -> usize {
    let children = rule.rules.iter().map(depth).max().unwrap_or(0);
    let filter = rule.filter.as_deref().map_or(0, depth);
    1 + children.max(filter)
}

// ---------------------------------------------------------------------------
// Validation
// ---------------------------------------------------------------------------

fn validate(envelope: &SerializedEnvelope) -> Result<(), DeserializeError> {
    let node_count = count_nodes(&envelope.root);
    if envelope.metadata.node_count != node_count {
        return Err(DeserializeError::Validation(format!(
            "metadata says {} nodes but payload has {node_count}",
            envelope.metadata.node_count
        )));
    }
    let actual_depth = depth(&envelope.root);
    if envelope.metadata.depth != actual_depth {
        return Err(DeserializeError::Validation(format!(
            "metadata says depth {} but payload has depth {actual_depth}",
            envelope.metadata.depth
        )));
    }
    validate_rule(&envelope.root)
}

fn validate_rule(rule: &SerializedRule) -> Result<(), DeserializeError> {
    match Operator::parse(&rule.operator) {
        Operator::Logical(op) if rule.rules.is_empty() => {
            return Err(DeserializeError::Validation(format!(
                "empty {} combinator",
                op.name()
            )));
        }
        Operator::Quantifier(Quantifier::All) if rule.rules.is_empty() => {
            return Err(DeserializeError::Validation(
                "All quantifier without a child rule".to_owned(),
            ));
        }
        Operator::Compare(_) | Operator::Logical(_) | Operator::Quantifier(_) => {}
        _ if rule.selector.is_some() => {
            return Err(DeserializeError::Validation(format!(
                "selector attached to non-comparison operator '{}'",
                rule.operator
            )));
        }
        _ => {}
    }
    if let Some(selector) = &rule.selector {
        if Reducer::parse(&selector.operator).is_none() {
            return Err(DeserializeError::Validation(format!(
                "unknown selector operator '{}'",
                selector.operator
            )));
        }
    }
    for child in rule.rules.iter().chain(rule.filter.as_deref()) {
        validate_rule(child)?;
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Header I/O
// ---------------------------------------------------------------------------

fn write_header(buf: &mut Vec<u8>, payload: &[u8]) -> Result<(), SerializeError> {
    let hash = blake3::hash(payload);
    let payload_len =
        u32::try_from(payload.len()).map_err(|_| SerializeError::TooLarge(payload.len()))?;

    buf.extend_from_slice(MAGIC);
    buf.extend_from_slice(&FORMAT_VERSION.to_le_bytes());
    buf.extend_from_slice(&ENGINE_VERSION.to_le_bytes());
    buf.extend_from_slice(&0u32.to_le_bytes()); // flags (reserved)
    buf.extend_from_slice(&payload_len.to_le_bytes());
    buf.extend_from_slice(&hash.as_bytes()[..16]);
    Ok(())
}

#[allow(clippy::cast_possible_truncation)] // HEADER_SIZE is 32
fn read_header(bytes: &[u8]) -> Result<(u16, u32, [u8; 16]), DeserializeError> {
    if bytes.len() < HEADER_SIZE {
        return Err(DeserializeError::LengthMismatch {
            expected: HEADER_SIZE as u32,
            actual: bytes.len(),
        });
    }
    if &bytes[0..4] != MAGIC {
        return Err(DeserializeError::BadMagic);
    }

    let format_version = u16::from_le_bytes([bytes[4], bytes[5]]);
    // bytes[6..8] engine version, bytes[8..12] flags
    let payload_len = u32::from_le_bytes([bytes[12], bytes[13], bytes[14], bytes[15]]);

    let mut hash = [0u8; 16];
    hash.copy_from_slice(&bytes[16..32]);
    Ok((format_version, payload_len, hash))
}

// ---------------------------------------------------------------------------
// Public encode/decode
// ---------------------------------------------------------------------------

pub(crate) fn encode(rule: &Rule) -> Result<Vec<u8>, SerializeError> {
    let root = serialize_rule(rule);
    let envelope = SerializedEnvelope {
        metadata: RuleMetadata {
            node_count: count_nodes(&root),
            depth: depth(&root),
        },
        root,
    };
    let payload = bincode::serde::encode_to_vec(&envelope, bincode::config::standard())?;

    let mut buf = Vec::with_capacity(HEADER_SIZE + payload.len());
    write_header(&mut buf, &payload)?;
    buf.extend_from_slice(&payload);
    Ok(buf)
}

pub(crate) fn decode(bytes: &[u8]) -> Result<Rule, DeserializeError> {
    let (format_version, payload_len, stored_hash) = read_header(bytes)?;
    if format_version != FORMAT_VERSION {
        return Err(DeserializeError::IncompatibleVersion {
            blob: format_version,
            supported: FORMAT_VERSION,
        });
    }

    let payload = usize::try_from(payload_len)
        .ok()
        .and_then(|len| bytes.get(HEADER_SIZE..HEADER_SIZE.checked_add(len)?))
        .ok_or(DeserializeError::LengthMismatch {
            expected: payload_len,
            actual: bytes.len() - HEADER_SIZE,
        })?;

    if blake3::hash(payload).as_bytes()[..16] != stored_hash {
        return Err(DeserializeError::ChecksumMismatch);
    }

    let (envelope, _): (SerializedEnvelope, usize) =
        bincode::serde::decode_from_slice(payload, bincode::config::standard())?;
    validate(&envelope)?;
    Ok(deserialize_rule(envelope.root))
}

impl Rule {
    /// Encode this rule tree into the checked binary envelope.
    ///
    /// # Errors
    ///
    /// Returns [`SerializeError`] if encoding fails.
    pub fn to_bytes(&self) -> Result<Vec<u8>, SerializeError> {
        encode(self)
    }

    /// Decode a rule tree previously produced by [`to_bytes`](Self::to_bytes).
    ///
    /// # Errors
    ///
    /// Returns [`DeserializeError`] on format, integrity, or validation
    /// failure.
    pub fn from_bytes(bytes: &[u8]) -> Result<Rule, DeserializeError> {
        decode(bytes)
    }
}

// ---------------------------------------------------------------------------
// Unit tests
// ---------------------------------------------------------------------------
