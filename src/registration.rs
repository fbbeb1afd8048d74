/// Unsigned `registerProof` calls for an external wallet to sign
use crate::{
    content::{content_digest, is_digest},
    error::{RegistryError, RegistryResult},
    sources::{abi, ContractConfig},
};
use serde::{Deserialize, Serialize};

/// Write entry point of the registry contract
pub const REGISTER_PROOF: &str = "registerProof(string,string,string,string)";

/// What a writer wants registered
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RegistrationRequest {
    /// Full body to hash; takes the place of `hash`
    #[serde(default)]
    pub content: Option<String>,
    /// Precomputed digest, used when `content` is absent
    #[serde(default)]
    pub hash: Option<String>,
    pub title: String,
    #[serde(default)]
    pub license: String,
    #[serde(default)]
    pub handle: String,
}

/// Transaction fields a wallet needs to submit the registration
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PreparedRegistration {
    pub to: String,
    /// `0x`-prefixed calldata
    pub data: String,
    pub hash: String,
    pub chain_id: u64,
}

impl RegistrationRequest {
    /// Resolve the digest this request registers
    ///
    /// When both `content` and `hash` are given they must agree.
    pub fn digest(&self) -> RegistryResult<String> {
        let provided = self
            .hash
            .as_deref()
            .map(str::trim)
            .filter(|h| !h.is_empty());

        if let Some(hash) = provided {
            if !is_digest(hash) {
                return Err(RegistryError::InvalidFormat(
                    "hash must be 0x followed by 64 hex digits".to_string(),
                ));
            }
        }

        match (&self.content, provided) {
            (Some(content), Some(hash)) => {
                let computed = content_digest(content);
                if !computed.eq_ignore_ascii_case(hash) {
                    return Err(RegistryError::Validation(
                        "hash does not match content".to_string(),
                    ));
                }
                Ok(computed)
            }
            (Some(content), None) => Ok(content_digest(content)),
            (None, Some(hash)) => Ok(hash.to_ascii_lowercase()),
            (None, None) => Err(RegistryError::EmptyInput(
                "either content or hash is required".to_string(),
            )),
        }
    }
}

/// Encode the `registerProof` call for `request` against `contract`
pub fn prepare_registration(
    request: &RegistrationRequest,
    contract: &ContractConfig,
) -> RegistryResult<PreparedRegistration> {
    let title = request.title.trim();
    if title.is_empty() {
        return Err(RegistryError::EmptyInput("title cannot be blank".to_string()));
    }

    let hash = request.digest()?;
    let handle = request.handle.trim();
    let handle = handle.strip_prefix('@').unwrap_or(handle);

    let calldata = abi::encode_string_call(
        REGISTER_PROOF,
        &[&hash, title, request.license.trim(), handle],
    );

    Ok(PreparedRegistration {
        to: contract.contract_address.clone(),
        data: format!("0x{}", hex::encode(calldata)),
        hash,
        chain_id: contract.chain_id,
    })
}
