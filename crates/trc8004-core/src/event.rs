//! Event decoding: from opaque receipt logs to typed registry events.
//!
//! Each log entry's first topic is matched against a static table of event
//! signatures. On a match, indexed fields are read from the remaining topics
//! and non-indexed fields from the ABI-encoded data payload, in declaration
//! order. Entries that match nothing are skipped.
//!
//! Decoding is lazy and per-entry: [`EventDecoder::decode`] returns an
//! iterator that can be cloned to restart, and a malformed entry yields an
//! `Err` item without affecting its neighbours.

use std::fmt;

use crate::digest::keccak256;
use crate::error::DecodeError;
use crate::receipt::{LogEntry, TransactionReceipt};
use crate::types::{Address, Word};

/// The ABI type of an event field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ParamKind {
    /// Unsigned integer of the given bit width.
    Uint(u16),
    /// Chain address.
    Address,
    /// Fixed 32-byte value (hashes, request ids).
    Bytes32,
    /// Dynamic UTF-8 string.
    String,
}

impl ParamKind {
    /// The canonical ABI type name used in signatures.
    pub fn abi_name(self) -> String {
        match self {
            Self::Uint(bits) => format!("uint{bits}"),
            Self::Address => "address".into(),
            Self::Bytes32 => "bytes32".into(),
            Self::String => "string".into(),
        }
    }
}

/// One declared field of an event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EventParam {
    pub name: &'static str,
    pub kind: ParamKind,
    pub indexed: bool,
}

impl EventParam {
    pub const fn indexed(name: &'static str, kind: ParamKind) -> Self {
        Self {
            name,
            kind,
            indexed: true,
        }
    }

    pub const fn data(name: &'static str, kind: ParamKind) -> Self {
        Self {
            name,
            kind,
            indexed: false,
        }
    }
}

/// An event's name and field layout.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EventSignature {
    pub name: &'static str,
    pub params: &'static [EventParam],
}

impl EventSignature {
    /// The canonical signature string, e.g. `AgentRegistered(uint256,address,string)`.
    pub fn signature(&self) -> String {
        let types: Vec<String> = self.params.iter().map(|p| p.kind.abi_name()).collect();
        format!("{}({})", self.name, types.join(","))
    }

    /// The first topic of every log emitting this event.
    pub fn topic(&self) -> Word {
        keccak256(self.signature().as_bytes()).to_word()
    }

    fn indexed_count(&self) -> usize {
        self.params.iter().filter(|p| p.indexed).count()
    }

    /// Decode a log entry already known to carry this event.
    fn decode_log(&self, log: &LogEntry, log_index: usize) -> Result<DecodedEvent, DecodeError> {
        let expected = 1 + self.indexed_count();
        if log.topics.len() != expected {
            return Err(DecodeError::TopicCount {
                event: self.name,
                expected,
                got: log.topics.len(),
            });
        }

        let mut topics = log.topics[1..].iter();
        let mut head = 0usize;
        let mut fields = Vec::with_capacity(self.params.len());

        for param in self.params {
            let value = if param.indexed {
                // Length was checked above.
                let topic = topics.next().copied().unwrap_or(Word::ZERO);
                match param.kind {
                    // Indexed dynamic values are stored as their hash.
                    ParamKind::String => DecodedValue::Hash(topic),
                    kind => self.decode_static(kind, &topic, param.name)?,
                }
            } else {
                let word = self.data_word(&log.data, head, param.name)?;
                let value = match param.kind {
                    ParamKind::String => self.decode_string(&log.data, &word, param.name)?,
                    kind => self.decode_static(kind, &word, param.name)?,
                };
                head += 32;
                value
            };
            fields.push((param.name, value));
        }

        Ok(DecodedEvent {
            name: self.name,
            log_index,
            contract: log.address,
            fields,
        })
    }

    fn decode_static(
        &self,
        kind: ParamKind,
        word: &Word,
        field: &'static str,
    ) -> Result<DecodedValue, DecodeError> {
        match kind {
            ParamKind::Uint(_) => word
                .to_u128()
                .map(DecodedValue::Uint)
                .ok_or(DecodeError::IntegerOverflow {
                    event: self.name,
                    field,
                }),
            ParamKind::Address => Ok(DecodedValue::Address(Address::from_word(word))),
            ParamKind::Bytes32 => Ok(DecodedValue::Hash(*word)),
            ParamKind::String => Err(DecodeError::BadOffset {
                event: self.name,
                field,
            }),
        }
    }

    fn data_word(&self, data: &[u8], at: usize, field: &'static str) -> Result<Word, DecodeError> {
        let slice = at
            .checked_add(32)
            .and_then(|end| data.get(at..end))
            .ok_or(DecodeError::DataTooShort {
                event: self.name,
                field,
            })?;
        let mut word = [0u8; 32];
        word.copy_from_slice(slice);
        Ok(Word(word))
    }

    fn decode_string(
        &self,
        data: &[u8],
        offset_word: &Word,
        field: &'static str,
    ) -> Result<DecodedValue, DecodeError> {
        let bad_offset = DecodeError::BadOffset {
            event: self.name,
            field,
        };

        let offset = offset_word
            .to_u128()
            .and_then(|o| usize::try_from(o).ok())
            .ok_or_else(|| bad_offset.clone())?;
        let len_word = self
            .data_word(data, offset, field)
            .map_err(|_| bad_offset.clone())?;
        let len = len_word
            .to_u128()
            .and_then(|l| usize::try_from(l).ok())
            .ok_or_else(|| bad_offset.clone())?;

        let start = offset.checked_add(32).ok_or_else(|| bad_offset.clone())?;
        let end = start.checked_add(len).ok_or(bad_offset)?;
        let bytes = data.get(start..end).ok_or(DecodeError::DataTooShort {
            event: self.name,
            field,
        })?;

        String::from_utf8(bytes.to_vec())
            .map(DecodedValue::String)
            .map_err(|_| DecodeError::InvalidString {
                event: self.name,
                field,
            })
    }
}

use ParamKind::{Address as Addr, Bytes32, String as Str, Uint};

/// The identity, validation and reputation registry events.
pub const KNOWN_EVENTS: &[EventSignature] = &[
    EventSignature {
        name: "AgentRegistered",
        params: &[
            EventParam::indexed("agentId", Uint(256)),
            EventParam::indexed("owner", Addr),
            EventParam::data("tokenURI", Str),
        ],
    },
    EventSignature {
        name: "AgentWalletSet",
        params: &[
            EventParam::indexed("agentId", Uint(256)),
            EventParam::indexed("wallet", Addr),
        ],
    },
    EventSignature {
        name: "ValidationRequested",
        params: &[
            EventParam::indexed("requestId", Bytes32),
            EventParam::indexed("agentId", Uint(256)),
            EventParam::indexed("validator", Addr),
            EventParam::data("requestURI", Str),
            EventParam::data("requestDataHash", Bytes32),
        ],
    },
    EventSignature {
        name: "ValidationCompleted",
        params: &[
            EventParam::indexed("requestId", Bytes32),
            EventParam::data("resultURI", Str),
            EventParam::data("resultHash", Bytes32),
        ],
    },
    EventSignature {
        name: "ValidationRejected",
        params: &[
            EventParam::indexed("requestId", Bytes32),
            EventParam::data("resultURI", Str),
            EventParam::data("reasonHash", Bytes32),
        ],
    },
    EventSignature {
        name: "ValidationCancelled",
        params: &[EventParam::indexed("requestId", Bytes32)],
    },
    EventSignature {
        name: "FeedbackGiven",
        params: &[
            EventParam::indexed("agentId", Uint(256)),
            EventParam::indexed("client", Addr),
            EventParam::data("feedbackIndex", Uint(256)),
            EventParam::data("sentiment", Uint(8)),
        ],
    },
    EventSignature {
        name: "FeedbackRevoked",
        params: &[
            EventParam::indexed("agentId", Uint(256)),
            EventParam::indexed("feedbackIndex", Uint(256)),
        ],
    },
    EventSignature {
        name: "ResponseAppended",
        params: &[
            EventParam::indexed("agentId", Uint(256)),
            EventParam::indexed("feedbackIndex", Uint(256)),
            EventParam::data("responseText", Str),
        ],
    },
];

/// A decoded field value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DecodedValue {
    Uint(u128),
    Address(Address),
    Hash(Word),
    String(String),
}

impl DecodedValue {
    pub fn as_uint(&self) -> Option<u128> {
        match self {
            Self::Uint(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_address(&self) -> Option<&Address> {
        match self {
            Self::Address(a) => Some(a),
            _ => None,
        }
    }

    pub fn as_hash(&self) -> Option<&Word> {
        match self {
            Self::Hash(h) => Some(h),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::String(s) => Some(s),
            _ => None,
        }
    }
}

impl fmt::Display for DecodedValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Uint(v) => write!(f, "{v}"),
            Self::Address(a) => write!(f, "{a}"),
            Self::Hash(h) => write!(f, "0x{}", h.to_hex()),
            Self::String(s) => write!(f, "{s:?}"),
        }
    }
}

/// A typed event extracted from one log entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecodedEvent {
    pub name: &'static str,
    /// Position of the source entry within the receipt's logs.
    pub log_index: usize,
    /// The contract that emitted the entry.
    pub contract: Address,
    /// Field values in declaration order.
    pub fields: Vec<(&'static str, DecodedValue)>,
}

impl DecodedEvent {
    pub fn get(&self, field: &str) -> Option<&DecodedValue> {
        self.fields
            .iter()
            .find(|(name, _)| *name == field)
            .map(|(_, value)| value)
    }

    pub fn uint(&self, field: &str) -> Option<u128> {
        self.get(field).and_then(DecodedValue::as_uint)
    }

    pub fn address(&self, field: &str) -> Option<&Address> {
        self.get(field).and_then(DecodedValue::as_address)
    }

    pub fn hash(&self, field: &str) -> Option<&Word> {
        self.get(field).and_then(DecodedValue::as_hash)
    }

    pub fn string(&self, field: &str) -> Option<&str> {
        self.get(field).and_then(DecodedValue::as_str)
    }
}

/// Matches log entries against a table of event signatures.
#[derive(Debug, Clone)]
pub struct EventDecoder {
    entries: Vec<(Word, EventSignature)>,
}

impl EventDecoder {
    /// Create a decoder for the given signatures.
    pub fn new(signatures: impl IntoIterator<Item = EventSignature>) -> Self {
        Self {
            entries: signatures.into_iter().map(|s| (s.topic(), s)).collect(),
        }
    }

    /// A decoder for [`KNOWN_EVENTS`].
    pub fn standard() -> Self {
        Self::new(KNOWN_EVENTS.iter().copied())
    }

    /// Add a signature to the table.
    pub fn with_signature(mut self, signature: EventSignature) -> Self {
        self.entries.push((signature.topic(), signature));
        self
    }

    /// Find the signature whose hash is `topic`.
    pub fn lookup(&self, topic: &Word) -> Option<&EventSignature> {
        self.entries
            .iter()
            .find(|(t, _)| t == topic)
            .map(|(_, sig)| sig)
    }

    /// Decode a single log entry.
    ///
    /// Returns `None` when the entry matches no known signature.
    pub fn decode_log(
        &self,
        log: &LogEntry,
        log_index: usize,
    ) -> Option<Result<DecodedEvent, DecodeError>> {
        let signature = self.lookup(log.signature_topic()?)?;
        Some(signature.decode_log(log, log_index))
    }

    /// Decode every matching entry of `receipt`, in log order.
    ///
    /// When `expected_contract` is given, entries emitted by other contracts
    /// are skipped.
    pub fn decode<'a>(
        &'a self,
        receipt: &'a TransactionReceipt,
        expected_contract: Option<&'a Address>,
    ) -> DecodedEvents<'a> {
        DecodedEvents {
            decoder: self,
            logs: receipt.logs.iter().enumerate(),
            expected_contract,
        }
    }
}

impl Default for EventDecoder {
    fn default() -> Self {
        Self::standard()
    }
}

/// Lazy iterator over the decoded events of one receipt.
#[derive(Debug, Clone)]
pub struct DecodedEvents<'a> {
    decoder: &'a EventDecoder,
    logs: std::iter::Enumerate<std::slice::Iter<'a, LogEntry>>,
    expected_contract: Option<&'a Address>,
}

impl<'a> DecodedEvents<'a> {
    /// The first event named `name`.
    ///
    /// Decode failures of other events are ignored.
    pub fn first_named(self, name: &str) -> Option<Result<DecodedEvent, DecodeError>> {
        for item in self {
            match item {
                Ok(event) if event.name == name => return Some(Ok(event)),
                Err(e) if e.event() == name => return Some(Err(e)),
                _ => continue,
            }
        }
        None
    }
}

impl<'a> Iterator for DecodedEvents<'a> {
    type Item = Result<DecodedEvent, DecodeError>;

    fn next(&mut self) -> Option<Self::Item> {
        for (index, log) in self.logs.by_ref() {
            if let Some(expected) = self.expected_contract {
                if !log.address.same_account(expected) {
                    continue;
                }
            }
            if let Some(result) = self.decoder.decode_log(log, index) {
                return Some(result);
            }
        }
        None
    }
}
