use std::fmt;

use alloy::primitives::{Address, B256, Bytes, I256, U256};
use alloy::sol_types::SolValue;

use super::abi::{ContractAbi, ContractEvent, FunctionParam};
use crate::error::{HarnessError, HarnessResult};
use crate::transport::RawLog;

/// A decoded event emitted by a state-changing call
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EventLogEntry {
    pub event_name: String,
    /// Parameter name to rendered value, in declaration order
    pub args: Vec<(String, String)>,
}

impl EventLogEntry {
    #[cfg(test)]
    pub fn arg(&self, name: &str) -> Option<&str> {
        self.args
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, v)| v.as_str())
    }
}

impl fmt::Display for EventLogEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.event_name)?;
        if self.args.is_empty() {
            return Ok(());
        }
        let rendered: Vec<String> = self
            .args
            .iter()
            .map(|(name, value)| format!("{}: {}", name, value))
            .collect();
        write!(f, " {{ {} }}", rendered.join(", "))
    }
}

/// Encode a list of string values against their ABI parameter types
pub fn encode_params(params: &[FunctionParam], values: &[String]) -> HarnessResult<Vec<u8>> {
    if params.len() != values.len() {
        return Err(HarnessError::InvalidArgument(format!(
            "expected {} argument(s), got {}",
            params.len(),
            values.len()
        )));
    }

    let head_len = 32 * params.len();
    let mut head = Vec::with_capacity(head_len);
    let mut tail = Vec::new();

    for (param, value) in params.iter().zip(values) {
        match encode_dynamic(&param.param_type, value)? {
            Some(encoded) => {
                head.extend(U256::from(head_len + tail.len()).abi_encode());
                tail.extend(encoded);
            }
            None => head.extend(encode_static(&param.param_type, value)?),
        }
    }

    head.extend(tail);
    Ok(head)
}

/// Encode call data for a function call
pub fn encode_call(
    selector: [u8; 4],
    params: &[FunctionParam],
    values: &[String],
) -> HarnessResult<Bytes> {
    let mut calldata = selector.to_vec();
    calldata.extend(encode_params(params, values)?);
    Ok(calldata.into())
}

fn encode_static(param_type: &str, value: &str) -> HarnessResult<Vec<u8>> {
    let invalid =
        |what: &str| HarnessError::InvalidArgument(format!("'{}' is not a valid {}", value, what));

    match param_type {
        "address" => {
            let addr: Address = value.parse().map_err(|_| invalid("address"))?;
            Ok(addr.abi_encode())
        }
        "bool" => match value.to_lowercase().as_str() {
            "true" | "1" => Ok(true.abi_encode()),
            "false" | "0" => Ok(false.abi_encode()),
            _ => Err(invalid("bool")),
        },
        "bytes32" => {
            let bytes: B256 = value.parse().map_err(|_| invalid("bytes32"))?;
            Ok(bytes.abi_encode())
        }
        t if t.starts_with("uint") => {
            let num = parse_uint(value).ok_or_else(|| invalid(t))?;
            Ok(num.abi_encode())
        }
        t if t.starts_with("int") => {
            let num = I256::from_dec_str(value).map_err(|_| invalid(t))?;
            Ok(num.to_be_bytes::<32>().to_vec())
        }
        _ => Err(HarnessError::InvalidArgument(format!(
            "unsupported parameter type: {}",
            param_type
        ))),
    }
}

/// Tail encoding for `string`/`bytes`; `None` for static types
fn encode_dynamic(param_type: &str, value: &str) -> HarnessResult<Option<Vec<u8>>> {
    let data = match param_type {
        "string" => value.as_bytes().to_vec(),
        "bytes" => hex::decode(value.strip_prefix("0x").unwrap_or(value))
            .map_err(|_| {
                HarnessError::InvalidArgument(format!("'{}' is not valid hex bytes", value))
            })?,
        _ => return Ok(None),
    };

    let mut encoded = U256::from(data.len()).abi_encode();
    let padded = data.len().div_ceil(32) * 32;
    encoded.extend(&data);
    encoded.resize(32 + padded, 0);
    Ok(Some(encoded))
}

fn parse_uint(value: &str) -> Option<U256> {
    if value.starts_with("0x") {
        value.parse().ok()
    } else {
        U256::from_str_radix(value, 10).ok()
    }
}

/// Decode a raw log with the contract ABI; unmatched logs are kept raw
pub fn decode_log(abi: &ContractAbi, log: &RawLog) -> EventLogEntry {
    let event = log.topics.first().and_then(|topic| abi.event_by_topic(topic));

    match event.and_then(|event| decode_event(event, log)) {
        Some(entry) => entry,
        None => {
            let mut args: Vec<(String, String)> = log
                .topics
                .iter()
                .enumerate()
                .map(|(i, topic)| (format!("topic{}", i), format!("{:?}", topic)))
                .collect();
            args.push(("data".to_string(), format!("0x{}", hex::encode(&log.data))));
            EventLogEntry {
                event_name: "Unknown".to_string(),
                args,
            }
        }
    }
}

fn decode_event(event: &ContractEvent, log: &RawLog) -> Option<EventLogEntry> {
    let mut topics = log.topics.iter().skip(1);
    let mut offset = 0;
    let mut args = Vec::with_capacity(event.inputs.len());

    for input in &event.inputs {
        let value = if input.indexed {
            let topic = topics.next()?;
            if is_dynamic(&input.param_type) {
                // Indexed dynamic values are only available as their hash
                format!("{:?}", topic)
            } else {
                decode_word(&input.param_type, topic.as_slice())
            }
        } else {
            let (value, consumed) = decode_value(&input.param_type, &log.data, offset).ok()?;
            offset += consumed;
            value
        };
        args.push((input.name.clone(), value));
    }

    Some(EventLogEntry {
        event_name: event.name.clone(),
        args,
    })
}

fn is_dynamic(param_type: &str) -> bool {
    matches!(param_type, "string" | "bytes")
        || param_type.ends_with(']')
        || param_type.starts_with("tuple")
}

fn decode_word(param_type: &str, word: &[u8]) -> String {
    match param_type {
        "address" => format!("{:?}", Address::from_slice(&word[12..32])),
        "bool" => (word[31] != 0).to_string(),
        t if t.starts_with("uint") => U256::from_be_slice(word).to_string(),
        t if t.starts_with("int") => I256::from_raw(U256::from_be_slice(word)).to_string(),
        _ => format!("0x{}", hex::encode(word)),
    }
}

/// Decode one head slot at `offset`, following offsets for dynamic types
fn decode_value(param_type: &str, data: &[u8], offset: usize) -> HarnessResult<(String, usize)> {
    let word = data
        .get(offset..offset + 32)
        .ok_or_else(|| {
            HarnessError::InvalidArgument(format!("insufficient data for {}", param_type))
        })?;

    match param_type {
        "string" | "bytes" => {
            let start = U256::from_be_slice(word).saturating_to::<usize>();
            let len_word = data
                .get(start..start.saturating_add(32))
                .ok_or_else(|| {
                    HarnessError::InvalidArgument(format!("bad offset for {}", param_type))
                })?;
            let len = U256::from_be_slice(len_word).saturating_to::<usize>();
            let body = data
                .get(start + 32..(start + 32).saturating_add(len))
                .ok_or_else(|| {
                    HarnessError::InvalidArgument(format!("bad length for {}", param_type))
                })?;
            let rendered = if param_type == "string" {
                String::from_utf8_lossy(body).to_string()
            } else {
                format!("0x{}", hex::encode(body))
            };
            Ok((rendered, 32))
        }
        _ => Ok((decode_word(param_type, word), 32)),
    }
}
