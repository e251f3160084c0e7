//! Minimal Solidity ABI codec for the campaign and NFT contracts.
//!
//! Only the shapes those contracts use are supported: `uint256`, `bool`,
//! `address`, `string`, `address[]` and `uint256[]`.

use thiserror::Error;

use crate::error::ValidationError;

const WORD: usize = 32;

/// First four bytes of keccak-256 over the canonical signature
pub mod selectors {
    pub type Selector = [u8; 4];

    /// campaignCount()
    pub const CAMPAIGN_COUNT: Selector = [0x72, 0x74, 0xe3, 0x0d];
    /// campaigns(uint256)
    pub const CAMPAIGNS: Selector = [0x14, 0x19, 0x61, 0xbc];
    /// getCampaignStatus(uint256)
    pub const GET_CAMPAIGN_STATUS: Selector = [0x6c, 0x19, 0xe0, 0x04];
    /// getCampaignDonors(uint256)
    pub const GET_CAMPAIGN_DONORS: Selector = [0x20, 0x9b, 0x7d, 0x5f];
    /// donations(uint256,address)
    pub const DONATIONS: Selector = [0xee, 0x15, 0x54, 0xa3];
    /// totalFundsRaised()
    pub const TOTAL_FUNDS_RAISED: Selector = [0x42, 0x7c, 0x0c, 0x7f];
    /// donate(uint256)
    pub const DONATE: Selector = [0xf1, 0x4f, 0xaf, 0x6f];
    /// withdrawFunds(uint256)
    pub const WITHDRAW_FUNDS: Selector = [0x15, 0x5d, 0xd5, 0xee];
    /// createCampaign(string,uint256,uint256,string,string)
    pub const CREATE_CAMPAIGN: Selector = [0x4b, 0x2a, 0xaf, 0xcc];
    /// getDonorNFTs(address)
    pub const GET_DONOR_NFTS: Selector = [0xa7, 0xf5, 0xb5, 0x1b];
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum AbiError {
    #[error("response too short: need {needed} bytes, have {available}")]
    OutOfBounds { needed: usize, available: usize },

    #[error("value does not fit in {0}")]
    Overflow(&'static str),

    #[error("invalid bool word")]
    InvalidBool,

    #[error("string is not valid UTF-8")]
    InvalidUtf8,

    #[error("invalid hex payload: {0}")]
    InvalidHex(String),
}

/// Argument of an outgoing call
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Token {
    Uint(u128),
    Address([u8; 20]),
    String(String),
}

fn uint_word(value: u128) -> [u8; WORD] {
    let mut word = [0u8; WORD];
    word[16..].copy_from_slice(&value.to_be_bytes());
    word
}

fn padded_len(len: usize) -> usize {
    len.div_ceil(WORD) * WORD
}

/// Encode calldata: selector followed by the head/tail argument layout
pub fn encode_call(selector: selectors::Selector, args: &[Token]) -> Vec<u8> {
    let mut head = Vec::with_capacity(args.len() * WORD);
    let mut tail = Vec::new();
    let head_size = args.len() * WORD;

    for arg in args {
        match arg {
            Token::Uint(value) => head.extend_from_slice(&uint_word(*value)),
            Token::Address(address) => {
                let mut word = [0u8; WORD];
                word[12..].copy_from_slice(address);
                head.extend_from_slice(&word);
            }
            Token::String(text) => {
                head.extend_from_slice(&uint_word((head_size + tail.len()) as u128));
                let bytes = text.as_bytes();
                tail.extend_from_slice(&uint_word(bytes.len() as u128));
                tail.extend_from_slice(bytes);
                tail.resize(tail.len() + padded_len(bytes.len()) - bytes.len(), 0);
            }
        }
    }

    let mut out = Vec::with_capacity(4 + head.len() + tail.len());
    out.extend_from_slice(&selector);
    out.extend_from_slice(&head);
    out.extend_from_slice(&tail);
    out
}

/// `0x`-prefixed lowercase hex
pub fn to_hex(bytes: &[u8]) -> String {
    format!("0x{}", hex::encode(bytes))
}

pub fn from_hex(data: &str) -> Result<Vec<u8>, AbiError> {
    let stripped = data.strip_prefix("0x").unwrap_or(data);
    hex::decode(stripped).map_err(|e| AbiError::InvalidHex(e.to_string()))
}

/// Quantity as used by JSON-RPC (`0x0`, `0x1bc16d674ec80000`)
pub fn to_quantity(value: u128) -> String {
    format!("0x{:x}", value)
}

pub fn parse_quantity(value: &str) -> Result<u128, AbiError> {
    let stripped = value.strip_prefix("0x").unwrap_or(value);
    if stripped.is_empty() {
        return Ok(0);
    }
    u128::from_str_radix(stripped, 16).map_err(|e| AbiError::InvalidHex(e.to_string()))
}

pub fn is_address(value: &str) -> bool {
    parse_address(value).is_ok()
}

pub fn parse_address(value: &str) -> Result<[u8; 20], ValidationError> {
    let invalid = || ValidationError::InvalidAddress(value.to_string());
    let stripped = value.strip_prefix("0x").ok_or_else(invalid)?;
    if stripped.len() != 40 {
        return Err(invalid());
    }
    let bytes = hex::decode(stripped).map_err(|_| invalid())?;
    let mut address = [0u8; 20];
    address.copy_from_slice(&bytes);
    Ok(address)
}

/// Reader over ABI-encoded return data
pub struct Decoder<'a> {
    data: &'a [u8],
}

impl<'a> Decoder<'a> {
    pub fn new(data: &'a [u8]) -> Self {
        Self { data }
    }

    fn word_at(&self, offset: usize) -> Result<&'a [u8], AbiError> {
        let end = offset.checked_add(WORD).ok_or(AbiError::Overflow("usize"))?;
        self.data.get(offset..end).ok_or(AbiError::OutOfBounds {
            needed: end,
            available: self.data.len(),
        })
    }

    fn uint_at(&self, offset: usize) -> Result<u128, AbiError> {
        let word = self.word_at(offset)?;
        if word[..16].iter().any(|b| *b != 0) {
            return Err(AbiError::Overflow("u128"));
        }
        let mut low = [0u8; 16];
        low.copy_from_slice(&word[16..]);
        Ok(u128::from_be_bytes(low))
    }

    fn usize_at(&self, offset: usize) -> Result<usize, AbiError> {
        usize::try_from(self.uint_at(offset)?).map_err(|_| AbiError::Overflow("usize"))
    }

    fn address_at(&self, offset: usize) -> Result<String, AbiError> {
        let word = self.word_at(offset)?;
        Ok(to_hex(&word[12..]))
    }

    /// Head word `index` as an unsigned integer
    pub fn uint(&self, index: usize) -> Result<u128, AbiError> {
        self.uint_at(index * WORD)
    }

    pub fn u64(&self, index: usize) -> Result<u64, AbiError> {
        u64::try_from(self.uint(index)?).map_err(|_| AbiError::Overflow("u64"))
    }

    pub fn i64(&self, index: usize) -> Result<i64, AbiError> {
        i64::try_from(self.uint(index)?).map_err(|_| AbiError::Overflow("i64"))
    }

    pub fn bool(&self, index: usize) -> Result<bool, AbiError> {
        match self.uint(index) {
            Ok(0) => Ok(false),
            Ok(1) => Ok(true),
            Ok(_) | Err(AbiError::Overflow(_)) => Err(AbiError::InvalidBool),
            Err(e) => Err(e),
        }
    }

    pub fn address(&self, index: usize) -> Result<String, AbiError> {
        self.address_at(index * WORD)
    }

    /// Dynamic `string` whose offset sits in head word `index`
    pub fn string(&self, index: usize) -> Result<String, AbiError> {
        let offset = self.usize_at(index * WORD)?;
        let len = self.usize_at(offset)?;
        let start = offset + WORD;
        let end = start.checked_add(len).ok_or(AbiError::Overflow("usize"))?;
        let bytes = self.data.get(start..end).ok_or(AbiError::OutOfBounds {
            needed: end,
            available: self.data.len(),
        })?;
        String::from_utf8(bytes.to_vec()).map_err(|_| AbiError::InvalidUtf8)
    }

    fn array_bounds(&self, index: usize) -> Result<(usize, usize), AbiError> {
        let offset = self.usize_at(index * WORD)?;
        let len = self.usize_at(offset)?;
        Ok((offset + WORD, len))
    }

    pub fn address_array(&self, index: usize) -> Result<Vec<String>, AbiError> {
        let (start, len) = self.array_bounds(index)?;
        (0..len).map(|i| self.address_at(start + i * WORD)).collect()
    }

    pub fn uint_array(&self, index: usize) -> Result<Vec<u128>, AbiError> {
        let (start, len) = self.array_bounds(index)?;
        (0..len).map(|i| self.uint_at(start + i * WORD)).collect()
    }
}
