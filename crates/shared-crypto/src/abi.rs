//! # Solidity ABI Codec
//!
//! The subset of the contract ABI the channel needs:
//!
//! - type strings such as `tuple(address to, uint256 amount)[][]`, including
//!   component names so JSON objects map onto tuples by field
//! - head/tail encoding (`abi.encode`) and decoding
//! - conversion between JSON state blobs and tokens
//! - function selectors for commitment calldata
//!
//! Signed integers are not supported; no channel encoding uses them.

use crate::hashing::keccak256;
use primitive_types::U256;
use serde_json::{Map, Value};
use shared_types::{amount_from_json, amount_to_json, Address};
use thiserror::Error;

/// ABI codec errors.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AbiError {
    /// The type string could not be parsed.
    #[error("Invalid ABI type `{input}`: {reason}")]
    InvalidType {
        /// The type string
        input: String,
        /// What went wrong
        reason: String,
    },

    /// A JSON value does not fit the ABI type.
    #[error("Value does not match ABI type {expected}: {found}")]
    ValueMismatch {
        /// The expected ABI type
        expected: String,
        /// The offending value (abbreviated)
        found: String,
    },

    /// Encoded data is shorter than its declared layout.
    #[error("Encoded data too short: need {needed} bytes at offset {offset}, have {available}")]
    OutOfBounds {
        /// Offset of the read
        offset: usize,
        /// Bytes required
        needed: usize,
        /// Bytes present
        available: usize,
    },

    /// Encoded data violates the ABI (bad bool, oversized length, bad UTF-8).
    #[error("Malformed encoded data: {0}")]
    Malformed(String),
}

/// One component of a tuple type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TupleComponent {
    /// Field name, when the type string gives one.
    pub name: Option<String>,
    /// Component type.
    pub kind: ParamType,
}

/// A parsed ABI type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParamType {
    /// `address`
    Address,
    /// `uintN`
    Uint(usize),
    /// `bool`
    Bool,
    /// `bytesN` (1..=32)
    FixedBytes(usize),
    /// `bytes`
    Bytes,
    /// `string`
    String,
    /// `T[]`
    Array(Box<ParamType>),
    /// `T[k]`
    FixedArray(Box<ParamType>, usize),
    /// `tuple(...)` or `(...)`
    Tuple(Vec<TupleComponent>),
}

/// An ABI value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Token {
    /// `address`
    Address(Address),
    /// `uintN`
    Uint(U256),
    /// `bool`
    Bool(bool),
    /// `bytesN`
    FixedBytes(Vec<u8>),
    /// `bytes`
    Bytes(Vec<u8>),
    /// `string`
    String(String),
    /// `T[]`
    Array(Vec<Token>),
    /// `T[k]`
    FixedArray(Vec<Token>),
    /// `tuple(...)`
    Tuple(Vec<Token>),
}

// =============================================================================
// TYPE PARSING
// =============================================================================

struct TypeParser<'a> {
    input: &'a str,
    bytes: &'a [u8],
    pos: usize,
}

impl<'a> TypeParser<'a> {
    fn new(input: &'a str) -> Self {
        Self {
            input,
            bytes: input.as_bytes(),
            pos: 0,
        }
    }

    fn error(&self, reason: &str) -> AbiError {
        AbiError::InvalidType {
            input: self.input.trim().to_string(),
            reason: format!("{} at position {}", reason, self.pos),
        }
    }

    fn skip_ws(&mut self) {
        while self.pos < self.bytes.len() && self.bytes[self.pos].is_ascii_whitespace() {
            self.pos += 1;
        }
    }

    fn peek(&self) -> Option<u8> {
        self.bytes.get(self.pos).copied()
    }

    fn ident(&mut self) -> &'a str {
        let start = self.pos;
        while self.pos < self.bytes.len()
            && (self.bytes[self.pos].is_ascii_alphanumeric() || self.bytes[self.pos] == b'_')
        {
            self.pos += 1;
        }
        &self.input[start..self.pos]
    }

    fn parse_type(&mut self) -> Result<ParamType, AbiError> {
        self.skip_ws();
        let mut kind = if self.peek() == Some(b'(') {
            self.parse_components()?
        } else {
            let word = self.ident();
            if word == "tuple" {
                self.parse_components()?
            } else {
                self.elementary(word)?
            }
        };

        while self.peek() == Some(b'[') {
            self.pos += 1;
            let start = self.pos;
            while self.peek().map_or(false, |b| b.is_ascii_digit()) {
                self.pos += 1;
            }
            let digits = &self.input[start..self.pos];
            if self.peek() != Some(b']') {
                return Err(self.error("expected `]`"));
            }
            self.pos += 1;
            kind = if digits.is_empty() {
                ParamType::Array(Box::new(kind))
            } else {
                let len = digits
                    .parse()
                    .map_err(|_| self.error("bad fixed array length"))?;
                ParamType::FixedArray(Box::new(kind), len)
            };
        }
        Ok(kind)
    }

    fn parse_components(&mut self) -> Result<ParamType, AbiError> {
        if self.peek() != Some(b'(') {
            return Err(self.error("expected `(`"));
        }
        self.pos += 1;
        let mut components = Vec::new();
        self.skip_ws();
        if self.peek() == Some(b')') {
            self.pos += 1;
            return Ok(ParamType::Tuple(components));
        }
        loop {
            let kind = self.parse_type()?;
            self.skip_ws();
            let name = match self.peek() {
                Some(b) if b.is_ascii_alphabetic() || b == b'_' => Some(self.ident().to_string()),
                _ => None,
            };
            components.push(TupleComponent { name, kind });
            self.skip_ws();
            match self.peek() {
                Some(b',') => self.pos += 1,
                Some(b')') => {
                    self.pos += 1;
                    return Ok(ParamType::Tuple(components));
                }
                _ => return Err(self.error("expected `,` or `)`")),
            }
        }
    }

    fn elementary(&self, word: &str) -> Result<ParamType, AbiError> {
        match word {
            "address" => Ok(ParamType::Address),
            "bool" => Ok(ParamType::Bool),
            "string" => Ok(ParamType::String),
            "bytes" => Ok(ParamType::Bytes),
            "uint" => Ok(ParamType::Uint(256)),
            "" => Err(self.error("expected a type")),
            _ => {
                if let Some(bits) = word.strip_prefix("uint") {
                    match bits.parse::<usize>() {
                        Ok(n) if n > 0 && n <= 256 && n % 8 == 0 => Ok(ParamType::Uint(n)),
                        _ => Err(self.error("bad uint width")),
                    }
                } else if let Some(len) = word.strip_prefix("bytes") {
                    match len.parse::<usize>() {
                        Ok(n) if (1..=32).contains(&n) => Ok(ParamType::FixedBytes(n)),
                        _ => Err(self.error("bad bytesN width")),
                    }
                } else {
                    Err(self.error(&format!("unsupported type `{}`", word)))
                }
            }
        }
    }
}

impl ParamType {
    /// Parse a type string such as `tuple(address[] a, uint256 b)`.
    pub fn parse(input: &str) -> Result<Self, AbiError> {
        let mut parser = TypeParser::new(input);
        let kind = parser.parse_type()?;
        parser.skip_ws();
        if parser.pos != parser.bytes.len() {
            return Err(parser.error("trailing input"));
        }
        Ok(kind)
    }

    /// Whether values of this type are encoded out-of-line.
    pub fn is_dynamic(&self) -> bool {
        match self {
            ParamType::Bytes | ParamType::String | ParamType::Array(_) => true,
            ParamType::FixedArray(inner, _) => inner.is_dynamic(),
            ParamType::Tuple(components) => components.iter().any(|c| c.kind.is_dynamic()),
            _ => false,
        }
    }

    /// Canonical signature form (`(address[],uint256)`), as used in selectors.
    pub fn canonical(&self) -> String {
        match self {
            ParamType::Address => "address".into(),
            ParamType::Uint(bits) => format!("uint{}", bits),
            ParamType::Bool => "bool".into(),
            ParamType::FixedBytes(n) => format!("bytes{}", n),
            ParamType::Bytes => "bytes".into(),
            ParamType::String => "string".into(),
            ParamType::Array(inner) => format!("{}[]", inner.canonical()),
            ParamType::FixedArray(inner, n) => format!("{}[{}]", inner.canonical(), n),
            ParamType::Tuple(components) => {
                let inner: Vec<String> = components.iter().map(|c| c.kind.canonical()).collect();
                format!("({})", inner.join(","))
            }
        }
    }

    fn static_size(&self) -> usize {
        match self {
            ParamType::FixedArray(inner, n) => inner.static_size() * n,
            ParamType::Tuple(components) => components.iter().map(|c| c.kind.static_size()).sum(),
            _ => 32,
        }
    }
}

// =============================================================================
// ENCODING
// =============================================================================

fn word_from_usize(value: usize) -> [u8; 32] {
    let mut word = [0u8; 32];
    U256::from(value).to_big_endian(&mut word);
    word
}

fn pad_right(data: &[u8]) -> Vec<u8> {
    let mut out = data.to_vec();
    let rem = out.len() % 32;
    if rem != 0 {
        out.resize(out.len() + 32 - rem, 0);
    }
    out
}

impl Token {
    fn is_dynamic(&self) -> bool {
        match self {
            Token::Bytes(_) | Token::String(_) | Token::Array(_) => true,
            Token::FixedArray(items) | Token::Tuple(items) => items.iter().any(Token::is_dynamic),
            _ => false,
        }
    }

    fn encode_inner(&self) -> Vec<u8> {
        match self {
            Token::Address(address) => address.to_word().to_vec(),
            Token::Uint(value) => {
                let mut word = [0u8; 32];
                value.to_big_endian(&mut word);
                word.to_vec()
            }
            Token::Bool(flag) => word_from_usize(usize::from(*flag)).to_vec(),
            Token::FixedBytes(bytes) => pad_right(bytes),
            Token::Bytes(bytes) => {
                let mut out = word_from_usize(bytes.len()).to_vec();
                out.extend(pad_right(bytes));
                out
            }
            Token::String(s) => Token::Bytes(s.as_bytes().to_vec()).encode_inner(),
            Token::Array(items) => {
                let mut out = word_from_usize(items.len()).to_vec();
                out.extend(encode(items));
                out
            }
            Token::FixedArray(items) | Token::Tuple(items) => encode(items),
        }
    }

    /// The value as a `U256`, if it is one.
    pub fn as_uint(&self) -> Option<U256> {
        match self {
            Token::Uint(value) => Some(*value),
            _ => None,
        }
    }

    /// The value as an address, if it is one.
    pub fn as_address(&self) -> Option<Address> {
        match self {
            Token::Address(address) => Some(*address),
            _ => None,
        }
    }

    /// Elements of an array, fixed array or tuple.
    pub fn as_list(&self) -> Option<&[Token]> {
        match self {
            Token::Array(items) | Token::FixedArray(items) | Token::Tuple(items) => Some(items),
            _ => None,
        }
    }
}

/// `abi.encode(tokens...)`: head/tail encoding of a token sequence.
pub fn encode(tokens: &[Token]) -> Vec<u8> {
    let encoded: Vec<(bool, Vec<u8>)> = tokens
        .iter()
        .map(|t| (t.is_dynamic(), t.encode_inner()))
        .collect();
    let head_len: usize = encoded
        .iter()
        .map(|(dynamic, bytes)| if *dynamic { 32 } else { bytes.len() })
        .sum();

    let mut head = Vec::with_capacity(head_len);
    let mut tail = Vec::new();
    for (dynamic, bytes) in encoded {
        if dynamic {
            head.extend_from_slice(&word_from_usize(head_len + tail.len()));
            tail.extend(bytes);
        } else {
            head.extend(bytes);
        }
    }
    head.extend(tail);
    head
}

/// First four bytes of keccak-256 of a canonical function signature.
pub fn function_selector(signature: &str) -> [u8; 4] {
    let hash = keccak256(signature.as_bytes());
    let mut selector = [0u8; 4];
    selector.copy_from_slice(&hash.0[..4]);
    selector
}

/// Calldata for `signature` with `args`.
pub fn encode_call(signature: &str, args: &[Token]) -> Vec<u8> {
    let mut data = function_selector(signature).to_vec();
    data.extend(encode(args));
    data
}

// =============================================================================
// DECODING
// =============================================================================

fn slice(data: &[u8], offset: usize, needed: usize) -> Result<&[u8], AbiError> {
    let end = offset.checked_add(needed).ok_or(AbiError::OutOfBounds {
        offset,
        needed,
        available: data.len(),
    })?;
    data.get(offset..end).ok_or(AbiError::OutOfBounds {
        offset,
        needed,
        available: data.len(),
    })
}

fn read_word(data: &[u8], offset: usize) -> Result<U256, AbiError> {
    Ok(U256::from_big_endian(slice(data, offset, 32)?))
}

fn read_usize(data: &[u8], offset: usize) -> Result<usize, AbiError> {
    let value = read_word(data, offset)?;
    if value > U256::from(data.len()) {
        return Err(AbiError::Malformed(format!(
            "offset or length {} exceeds data length {}",
            value,
            data.len()
        )));
    }
    Ok(value.as_usize())
}

fn decode_sequence(types: &[&ParamType], data: &[u8]) -> Result<Vec<Token>, AbiError> {
    let mut tokens = Vec::with_capacity(types.len());
    let mut offset = 0;
    for kind in types {
        if kind.is_dynamic() {
            let pointer = read_usize(data, offset)?;
            tokens.push(decode_at(kind, &data[pointer..])?);
            offset += 32;
        } else {
            let size = kind.static_size();
            tokens.push(decode_at(kind, slice(data, offset, size)?)?);
            offset += size;
        }
    }
    Ok(tokens)
}

fn decode_at(kind: &ParamType, data: &[u8]) -> Result<Token, AbiError> {
    match kind {
        ParamType::Address => {
            let word = slice(data, 0, 32)?;
            let mut address = [0u8; 20];
            address.copy_from_slice(&word[12..]);
            Ok(Token::Address(Address(address)))
        }
        ParamType::Uint(_) => Ok(Token::Uint(read_word(data, 0)?)),
        ParamType::Bool => {
            let value = read_word(data, 0)?;
            if value.is_zero() {
                Ok(Token::Bool(false))
            } else if value == U256::one() {
                Ok(Token::Bool(true))
            } else {
                Err(AbiError::Malformed("bool word is neither 0 nor 1".into()))
            }
        }
        ParamType::FixedBytes(n) => Ok(Token::FixedBytes(slice(data, 0, 32)?[..*n].to_vec())),
        ParamType::Bytes => {
            let len = read_usize(data, 0)?;
            Ok(Token::Bytes(slice(data, 32, len)?.to_vec()))
        }
        ParamType::String => {
            let len = read_usize(data, 0)?;
            let bytes = slice(data, 32, len)?.to_vec();
            String::from_utf8(bytes)
                .map(Token::String)
                .map_err(|_| AbiError::Malformed("string is not UTF-8".into()))
        }
        ParamType::Array(inner) => {
            let len = read_usize(data, 0)?;
            let types = vec![inner.as_ref(); len];
            Ok(Token::Array(decode_sequence(&types, &data[32..])?))
        }
        ParamType::FixedArray(inner, len) => {
            let types = vec![inner.as_ref(); *len];
            Ok(Token::FixedArray(decode_sequence(&types, data)?))
        }
        ParamType::Tuple(components) => {
            let types: Vec<&ParamType> = components.iter().map(|c| &c.kind).collect();
            Ok(Token::Tuple(decode_sequence(&types, data)?))
        }
    }
}

/// `abi.decode(data, (types...))`.
pub fn decode(types: &[ParamType], data: &[u8]) -> Result<Vec<Token>, AbiError> {
    let refs: Vec<&ParamType> = types.iter().collect();
    decode_sequence(&refs, data)
}

// =============================================================================
// JSON CONVERSION
// =============================================================================

fn mismatch(kind: &ParamType, value: &Value) -> AbiError {
    let mut found = value.to_string();
    found.truncate(80);
    AbiError::ValueMismatch {
        expected: kind.canonical(),
        found,
    }
}

fn hex_bytes(kind: &ParamType, value: &Value) -> Result<Vec<u8>, AbiError> {
    let s = value.as_str().ok_or_else(|| mismatch(kind, value))?;
    hex::decode(s.strip_prefix("0x").unwrap_or(s)).map_err(|_| mismatch(kind, value))
}

fn list<'v>(kind: &ParamType, value: &'v Value) -> Result<&'v Vec<Value>, AbiError> {
    value.as_array().ok_or_else(|| mismatch(kind, value))
}

/// Convert a JSON value into a token of type `kind`.
///
/// Tuples accept an object keyed by component name or a positional array.
pub fn tokenize(kind: &ParamType, value: &Value) -> Result<Token, AbiError> {
    match kind {
        ParamType::Address => value
            .as_str()
            .and_then(|s| s.parse::<Address>().ok())
            .map(Token::Address)
            .ok_or_else(|| mismatch(kind, value)),
        ParamType::Uint(_) => amount_from_json(value)
            .map(Token::Uint)
            .map_err(|_| mismatch(kind, value)),
        ParamType::Bool => value
            .as_bool()
            .map(Token::Bool)
            .ok_or_else(|| mismatch(kind, value)),
        ParamType::FixedBytes(n) => {
            let bytes = hex_bytes(kind, value)?;
            if bytes.len() != *n {
                return Err(mismatch(kind, value));
            }
            Ok(Token::FixedBytes(bytes))
        }
        ParamType::Bytes => hex_bytes(kind, value).map(Token::Bytes),
        ParamType::String => value
            .as_str()
            .map(|s| Token::String(s.to_string()))
            .ok_or_else(|| mismatch(kind, value)),
        ParamType::Array(inner) => list(kind, value)?
            .iter()
            .map(|item| tokenize(inner, item))
            .collect::<Result<_, _>>()
            .map(Token::Array),
        ParamType::FixedArray(inner, len) => {
            let items = list(kind, value)?;
            if items.len() != *len {
                return Err(mismatch(kind, value));
            }
            items
                .iter()
                .map(|item| tokenize(inner, item))
                .collect::<Result<_, _>>()
                .map(Token::FixedArray)
        }
        ParamType::Tuple(components) => {
            let tokens = match value {
                Value::Object(map) => components
                    .iter()
                    .map(|c| {
                        let field = c
                            .name
                            .as_ref()
                            .and_then(|name| map.get(name))
                            .ok_or_else(|| mismatch(kind, value))?;
                        tokenize(&c.kind, field)
                    })
                    .collect::<Result<Vec<_>, _>>()?,
                Value::Array(items) if items.len() == components.len() => components
                    .iter()
                    .zip(items)
                    .map(|(c, item)| tokenize(&c.kind, item))
                    .collect::<Result<Vec<_>, _>>()?,
                _ => return Err(mismatch(kind, value)),
            };
            Ok(Token::Tuple(tokens))
        }
    }
}

/// Convert a token of type `kind` back into JSON.
///
/// Tuples whose components are all named become objects; amounts become
/// `{"_hex": ..}` objects.
pub fn detokenize(kind: &ParamType, token: &Token) -> Result<Value, AbiError> {
    let wrong = || AbiError::Malformed(format!("token does not match {}", kind.canonical()));
    match (kind, token) {
        (ParamType::Address, Token::Address(address)) => Ok(Value::String(address.to_hex())),
        (ParamType::Uint(_), Token::Uint(value)) => Ok(amount_to_json(value)),
        (ParamType::Bool, Token::Bool(flag)) => Ok(Value::Bool(*flag)),
        (ParamType::FixedBytes(_), Token::FixedBytes(bytes))
        | (ParamType::Bytes, Token::Bytes(bytes)) => {
            Ok(Value::String(format!("0x{}", hex::encode(bytes))))
        }
        (ParamType::String, Token::String(s)) => Ok(Value::String(s.clone())),
        (ParamType::Array(inner), Token::Array(items))
        | (ParamType::FixedArray(inner, _), Token::FixedArray(items)) => items
            .iter()
            .map(|item| detokenize(inner, item))
            .collect::<Result<Vec<_>, _>>()
            .map(Value::Array),
        (ParamType::Tuple(components), Token::Tuple(items)) if components.len() == items.len() => {
            let values = components
                .iter()
                .zip(items)
                .map(|(c, item)| detokenize(&c.kind, item))
                .collect::<Result<Vec<_>, _>>()?;
            if components.iter().all(|c| c.name.is_some()) {
                let mut map = Map::new();
                for (c, v) in components.iter().zip(values) {
                    if let Some(name) = &c.name {
                        map.insert(name.clone(), v);
                    }
                }
                Ok(Value::Object(map))
            } else {
                Ok(Value::Array(values))
            }
        }
        _ => Err(wrong()),
    }
}

/// `abi.encode([encoding], [value])` for a JSON value.
pub fn encode_value(encoding: &str, value: &Value) -> Result<Vec<u8>, AbiError> {
    let kind = ParamType::parse(encoding)?;
    Ok(encode(&[tokenize(&kind, value)?]))
}

/// Inverse of [`encode_value`].
pub fn decode_value(encoding: &str, data: &[u8]) -> Result<Value, AbiError> {
    let kind = ParamType::parse(encoding)?;
    let token = decode(std::slice::from_ref(&kind), data)?
        .pop()
        .ok_or_else(|| AbiError::Malformed("empty decode result".into()))?;
    detokenize(&kind, &token)
}
