use alloy::primitives::{B256, keccak256};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::{HarnessError, HarnessResult};

/// Callable surface of a compiled contract
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ContractAbi {
    pub constructor: Option<Vec<FunctionParam>>,
    pub functions: Vec<ContractFunction>,
    pub events: Vec<ContractEvent>,
}

/// Represents a contract function from the ABI
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ContractFunction {
    pub name: String,
    pub inputs: Vec<FunctionParam>,
    pub outputs: Vec<FunctionParam>,
    pub state_mutability: String,
}

/// Represents an event declared in the ABI
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ContractEvent {
    pub name: String,
    pub inputs: Vec<FunctionParam>,
    pub anonymous: bool,
}

/// Represents a function or event parameter
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FunctionParam {
    pub name: String,
    pub param_type: String,
    pub components: Option<Vec<FunctionParam>>,
    #[serde(default)]
    pub indexed: bool,
}

impl ContractAbi {
    /// Find a function by name and argument count
    pub fn function(&self, name: &str, arity: usize) -> Option<&ContractFunction> {
        self.functions
            .iter()
            .find(|f| f.name == name && f.inputs.len() == arity)
    }

    /// Find the event whose topic matches `topic0`
    pub fn event_by_topic(&self, topic0: &B256) -> Option<&ContractEvent> {
        self.events
            .iter()
            .filter(|e| !e.anonymous)
            .find(|e| &e.topic() == topic0)
    }
}

impl ContractFunction {
    pub fn is_payable(&self) -> bool {
        self.state_mutability == "payable"
    }

    pub fn selector(&self) -> [u8; 4] {
        let hash = keccak256(function_signature(self).as_bytes());
        [hash[0], hash[1], hash[2], hash[3]]
    }
}

impl ContractEvent {
    pub fn signature(&self) -> String {
        let params: Vec<String> = self.inputs.iter().map(encode_param_type).collect();
        format!("{}({})", self.name, params.join(","))
    }

    pub fn topic(&self) -> B256 {
        keccak256(self.signature().as_bytes())
    }
}

/// Parse an ABI JSON array into functions, events and the constructor
pub fn parse_abi(abi_json: &Value) -> HarnessResult<ContractAbi> {
    let abi_array = abi_json
        .as_array()
        .ok_or_else(|| HarnessError::invalid_argument("ABI must be a JSON array"))?;

    let mut abi = ContractAbi::default();

    for item in abi_array {
        let Some(item_type) = item.get("type").and_then(|t| t.as_str()) else {
            continue;
        };

        match item_type {
            "constructor" => {
                abi.constructor = Some(parse_params(item.get("inputs")));
            }
            "function" => {
                let Some(name) = item.get("name").and_then(|n| n.as_str()) else {
                    continue;
                };
                let state_mutability = item
                    .get("stateMutability")
                    .and_then(|v| v.as_str())
                    .or_else(|| {
                        // Pre-0.4.16 compilers only emit `payable`/`constant`
                        match item.get("payable").and_then(|p| p.as_bool()) {
                            Some(true) => Some("payable"),
                            _ => None,
                        }
                    })
                    .unwrap_or("nonpayable")
                    .to_string();

                abi.functions.push(ContractFunction {
                    name: name.to_string(),
                    inputs: parse_params(item.get("inputs")),
                    outputs: parse_params(item.get("outputs")),
                    state_mutability,
                });
            }
            "event" => {
                let Some(name) = item.get("name").and_then(|n| n.as_str()) else {
                    continue;
                };
                abi.events.push(ContractEvent {
                    name: name.to_string(),
                    inputs: parse_params(item.get("inputs")),
                    anonymous: item
                        .get("anonymous")
                        .and_then(|a| a.as_bool())
                        .unwrap_or(false),
                });
            }
            _ => {}
        }
    }

    Ok(abi)
}

fn parse_params(params: Option<&Value>) -> Vec<FunctionParam> {
    params
        .and_then(|p| p.as_array())
        .map(|arr| {
            arr.iter()
                .filter_map(|param| {
                    let name = param
                        .get("name")
                        .and_then(|n| n.as_str())
                        .unwrap_or("")
                        .to_string();

                    let param_type = param.get("type").and_then(|t| t.as_str())?.to_string();

                    let components = param.get("components").and_then(|c| {
                        if c.is_array() {
                            Some(parse_params(Some(c)))
                        } else {
                            None
                        }
                    });

                    let indexed = param
                        .get("indexed")
                        .and_then(|i| i.as_bool())
                        .unwrap_or(false);

                    Some(FunctionParam {
                        name,
                        param_type,
                        components,
                        indexed,
                    })
                })
                .collect()
        })
        .unwrap_or_default()
}

/// Parse ABI from a string
#[cfg(test)]
pub fn parse_abi_string(abi_str: &str) -> HarnessResult<ContractAbi> {
    let abi_json: Value = serde_json::from_str(abi_str).map_err(HarnessError::invalid_argument)?;
    parse_abi(&abi_json)
}

/// Get function signature string (for selector calculation)
pub fn function_signature(func: &ContractFunction) -> String {
    let params: Vec<String> = func.inputs.iter().map(encode_param_type).collect();
    format!("{}({})", func.name, params.join(","))
}

fn encode_param_type(param: &FunctionParam) -> String {
    match &param.components {
        Some(components) if param.param_type.starts_with("tuple") => {
            let inner: Vec<String> = components.iter().map(encode_param_type).collect();
            // Keep array suffixes such as `tuple[]`
            let suffix = param.param_type.trim_start_matches("tuple");
            format!("({}){}", inner.join(","), suffix)
        }
        _ => param.param_type.clone(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const CAMPAIGNS_ABI: &str = r#"[
        {
            "type": "constructor",
            "inputs": [],
            "stateMutability": "nonpayable"
        },
        {
            "type": "function",
            "name": "newCampaign",
            "inputs": [{"name": "target", "type": "uint256"}],
            "outputs": [],
            "stateMutability": "nonpayable"
        },
        {
            "type": "function",
            "name": "newCampaign",
            "inputs": [
                {"name": "target", "type": "uint256"},
                {"name": "deadline", "type": "uint256"}
            ],
            "outputs": [],
            "stateMutability": "nonpayable"
        },
        {
            "constant": false,
            "type": "function",
            "name": "donate",
            "inputs": [{"name": "campaignId", "type": "uint256"}],
            "outputs": [],
            "payable": true
        },
        {
            "type": "event",
            "name": "DonationReceived",
            "anonymous": false,
            "inputs": [
                {"name": "campaignId", "type": "uint256", "indexed": true},
                {"name": "donor", "type": "address", "indexed": true},
                {"name": "amount", "type": "uint256", "indexed": false},
                {"name": "total", "type": "uint256", "indexed": false}
            ]
        }
    ]"#;

    #[test]
    fn test_parse_campaigns_abi() {
        let abi = parse_abi_string(CAMPAIGNS_ABI).unwrap();
        assert_eq!(abi.functions.len(), 3);
        assert_eq!(abi.events.len(), 1);
        assert!(abi.constructor.as_ref().unwrap().is_empty());

        let timed = abi.function("newCampaign", 2).unwrap();
        assert_eq!(function_signature(timed), "newCampaign(uint256,uint256)");
        assert!(abi.function("newCampaign", 3).is_none());

        // Legacy `payable: true` marks the function payable
        assert!(abi.function("donate", 1).unwrap().is_payable());
    }

    #[test]
    fn test_event_topic_lookup() {
        let abi = parse_abi_string(CAMPAIGNS_ABI).unwrap();
        let event = &abi.events[0];
        assert_eq!(
            event.signature(),
            "DonationReceived(uint256,address,uint256,uint256)"
        );
        assert!(event.inputs[0].indexed);
        assert!(!event.inputs[2].indexed);

        let topic = keccak256("DonationReceived(uint256,address,uint256,uint256)");
        assert_eq!(abi.event_by_topic(&topic).unwrap().name, "DonationReceived");
        assert!(abi.event_by_topic(&B256::ZERO).is_none());
    }

    #[test]
    fn test_function_selector() {
        let func = ContractFunction {
            name: "transfer".to_string(),
            inputs: vec![
                FunctionParam {
                    name: "to".to_string(),
                    param_type: "address".to_string(),
                    components: None,
                    indexed: false,
                },
                FunctionParam {
                    name: "amount".to_string(),
                    param_type: "uint256".to_string(),
                    components: None,
                    indexed: false,
                },
            ],
            outputs: vec![],
            state_mutability: "nonpayable".to_string(),
        };

        assert_eq!(function_signature(&func), "transfer(address,uint256)");
        assert_eq!(func.selector(), [0xa9, 0x05, 0x9c, 0xbb]);
    }
}
