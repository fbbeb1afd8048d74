/// Minimal Solidity ABI support for the registry contract
///
/// Covers what the registry needs: calls whose arguments are all `string`,
/// `bool` returns, and the `getProof` struct return
/// `(string, string, string, uint256, address)`.
use crate::error::{RegistryError, RegistryResult};
use sha3::{Digest, Keccak256};

const WORD: usize = 32;

/// First four bytes of the Keccak-256 hash of a function signature
pub fn selector(signature: &str) -> [u8; 4] {
    let hash = Keccak256::digest(signature.as_bytes());
    [hash[0], hash[1], hash[2], hash[3]]
}

/// Encode a call to `signature` whose arguments are all strings
pub fn encode_string_call(signature: &str, args: &[&str]) -> Vec<u8> {
    let mut head = Vec::with_capacity(args.len() * WORD);
    let mut tail = Vec::new();

    for arg in args {
        head.extend_from_slice(&uint_word((args.len() * WORD + tail.len()) as u64));
        tail.extend_from_slice(&uint_word(arg.len() as u64));
        tail.extend_from_slice(arg.as_bytes());
        tail.resize(tail.len() + padding(arg.len()), 0);
    }

    let mut out = selector(signature).to_vec();
    out.extend_from_slice(&head);
    out.extend_from_slice(&tail);
    out
}

/// Decode a single `bool` return value
pub fn decode_bool(data: &[u8]) -> RegistryResult<bool> {
    let word = word_at(data, 0)?;
    if word[..WORD - 1].iter().any(|b| *b != 0) || word[WORD - 1] > 1 {
        return Err(RegistryError::Abi("bool return value out of range".to_string()));
    }
    Ok(word[WORD - 1] == 1)
}

/// Fields of the on-chain `Proof` struct
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProofTuple {
    pub title: String,
    pub license: String,
    pub twitter_handle: String,
    /// Saturated to `u64::MAX` if the stored value is larger
    pub timestamp: u64,
    pub creator: String,
}

/// Decode the return data of `getProof(string)`
pub fn decode_proof(data: &[u8]) -> RegistryResult<ProofTuple> {
    // A struct with dynamic members is returned behind one offset word
    let base = read_offset(data, 0)?;

    Ok(ProofTuple {
        title: read_string(data, base, 0)?,
        license: read_string(data, base, WORD)?,
        twitter_handle: read_string(data, base, 2 * WORD)?,
        timestamp: read_u64_saturating(word_at(data, base + 3 * WORD)?),
        creator: read_address(word_at(data, base + 4 * WORD)?),
    })
}

/// Decode `0x`-prefixed hex return data from a JSON-RPC response
pub fn decode_hex(data: &str) -> RegistryResult<Vec<u8>> {
    let stripped = data.strip_prefix("0x").unwrap_or(data);
    hex::decode(stripped).map_err(|e| RegistryError::Abi(format!("Invalid hex return data: {}", e)))
}

fn uint_word(value: u64) -> [u8; WORD] {
    let mut word = [0u8; WORD];
    word[WORD - 8..].copy_from_slice(&value.to_be_bytes());
    word
}

fn padding(len: usize) -> usize {
    (WORD - len % WORD) % WORD
}

fn word_at(data: &[u8], offset: usize) -> RegistryResult<&[u8]> {
    offset
        .checked_add(WORD)
        .and_then(|end| data.get(offset..end))
        .ok_or_else(|| {
            RegistryError::Abi(format!(
                "return data too short: need word at {}, have {} bytes",
                offset,
                data.len()
            ))
        })
}

fn read_offset(data: &[u8], offset: usize) -> RegistryResult<usize> {
    let word = word_at(data, offset)?;
    if word[..WORD - 8].iter().any(|b| *b != 0) {
        return Err(RegistryError::Abi("offset out of range".to_string()));
    }
    let mut bytes = [0u8; 8];
    bytes.copy_from_slice(&word[WORD - 8..]);
    usize::try_from(u64::from_be_bytes(bytes))
        .map_err(|_| RegistryError::Abi("offset out of range".to_string()))
}

/// Read a string whose offset (relative to `base`) sits at `base + head`
fn read_string(data: &[u8], base: usize, head: usize) -> RegistryResult<String> {
    let start = base
        .checked_add(read_offset(data, base + head)?)
        .ok_or_else(|| RegistryError::Abi("string offset overflow".to_string()))?;
    let len = read_offset(data, start)?;
    let bytes = data
        .get(start + WORD..)
        .and_then(|rest| rest.get(..len))
        .ok_or_else(|| RegistryError::Abi("string runs past end of return data".to_string()))?;
    String::from_utf8(bytes.to_vec())
        .map_err(|e| RegistryError::Abi(format!("string is not UTF-8: {}", e)))
}

fn read_u64_saturating(word: &[u8]) -> u64 {
    if word[..WORD - 8].iter().any(|b| *b != 0) {
        return u64::MAX;
    }
    let mut bytes = [0u8; 8];
    bytes.copy_from_slice(&word[WORD - 8..]);
    u64::from_be_bytes(bytes)
}

fn read_address(word: &[u8]) -> String {
    format!("0x{}", hex::encode(&word[WORD - 20..]))
}
