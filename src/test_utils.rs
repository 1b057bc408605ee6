//! Shared fixtures for unit tests

use ethers::abi::Abi;
use ethers::signers::LocalWallet;
use ethers::types::Address;

pub const ERC20_ABI: &str = r#"[
    {
        "type": "constructor",
        "stateMutability": "nonpayable",
        "inputs": [{ "name": "supply", "type": "uint256" }]
    },
    {
        "type": "function",
        "name": "balanceOf",
        "stateMutability": "view",
        "inputs": [{ "name": "owner", "type": "address" }],
        "outputs": [{ "name": "", "type": "uint256" }]
    },
    {
        "type": "function",
        "name": "transfer",
        "stateMutability": "nonpayable",
        "inputs": [
            { "name": "to", "type": "address" },
            { "name": "amount", "type": "uint256" }
        ],
        "outputs": [{ "name": "", "type": "bool" }]
    },
    {
        "type": "function",
        "name": "transfer",
        "stateMutability": "nonpayable",
        "inputs": [
            { "name": "to", "type": "address" },
            { "name": "amount", "type": "uint256" },
            { "name": "memo", "type": "bytes" }
        ],
        "outputs": [{ "name": "", "type": "bool" }]
    },
    {
        "type": "function",
        "name": "metadata",
        "stateMutability": "view",
        "inputs": [],
        "outputs": [
            { "name": "name", "type": "string" },
            { "name": "decimals", "type": "uint8" }
        ]
    },
    {
        "type": "event",
        "name": "Transfer",
        "anonymous": false,
        "inputs": [
            { "name": "from", "type": "address", "indexed": true },
            { "name": "to", "type": "address", "indexed": true },
            { "name": "value", "type": "uint256", "indexed": false }
        ]
    }
]"#;

/// Well-known test private key (DO NOT use on mainnet)
pub const TEST_PRIVKEY: &str =
    "4c0883a69102937d6231471b5dbb6204fe5129617082792ae468d01a3f362318";

pub fn erc20_abi() -> Abi {
    serde_json::from_str(ERC20_ABI).unwrap()
}

pub fn empty_abi() -> Abi {
    serde_json::from_str("[]").unwrap()
}

pub fn token_address() -> Address {
    "0xa0b86991c6218b36c1d19d4a2e9eb0ce3606eb48".parse().unwrap()
}

pub fn holder() -> Address {
    "0x000000000000000000000000000000000000dead".parse().unwrap()
}

pub fn test_wallet() -> LocalWallet {
    TEST_PRIVKEY.parse().unwrap()
}
