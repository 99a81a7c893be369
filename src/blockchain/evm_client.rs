// src/blockchain/evm_client.rs
//! EVM JSON-RPC client for read-only contract calls.
//!
//! The trust engine never sends transactions: every interaction with an
//! identity contract is an `eth_call` against the latest block.

use crate::error::RegistryError;
use ethers::providers::{Http, Middleware, Provider};
use ethers_contract::BaseContract;
use ethers_core::{
    abi::{Abi, Detokenize, Tokenize},
    types::{transaction::eip2718::TypedTransaction, Address, Bytes, TransactionRequest},
};
use std::sync::Arc;

/// Thin wrapper over an HTTP provider.
///
/// Cheap to clone; clones share the underlying connection pool.
#[derive(Clone, Debug)]
pub struct EvmClient {
    /// RPC provider
    provider: Arc<Provider<Http>>,
}

impl EvmClient {
    /// Creates a client for `rpc_url`. No request is made until the first call.
    ///
    /// # Errors
    /// Returns [`RegistryError::InvalidEndpoint`] if the URL cannot be parsed.
    pub fn new(rpc_url: &str) -> Result<Self, RegistryError> {
        let provider = Provider::<Http>::try_from(rpc_url)
            .map_err(|e| RegistryError::InvalidEndpoint(format!("{}: {}", rpc_url, e)))?;
        Ok(Self {
            provider: Arc::new(provider),
        })
    }

    /// Loads a contract ABI from its JSON description.
    pub fn load_abi(abi: &[u8]) -> Result<BaseContract, RegistryError> {
        Abi::load(abi)
            .map(BaseContract::from)
            .map_err(|e| RegistryError::Abi(e.to_string()))
    }

    /// Calls a view function on a contract.
    ///
    /// # Returns
    /// - `Ok(Some(value))` with the decoded return value
    /// - `Ok(None)` if the call returned no data, i.e. no contract is deployed
    ///   at `contract_address`
    ///
    /// # Errors
    /// Returns an error if:
    /// - The parameters cannot be ABI encoded
    /// - The RPC request fails or the call reverts
    /// - The return data cannot be decoded into `R`
    pub async fn query_contract<R: Detokenize>(
        &self,
        contract_address: Address,
        abi: &BaseContract,
        method: &'static str,
        params: impl Tokenize,
    ) -> Result<Option<R>, RegistryError> {
        let data = abi.encode(method, params).map_err(|e| RegistryError::Encode {
            method,
            reason: e.to_string(),
        })?;
        let call: TypedTransaction = TransactionRequest::new().to(contract_address).data(data).into();

        let output: Bytes = self
            .provider
            .call(&call, None)
            .await
            .map_err(|e| RegistryError::Rpc {
                method,
                reason: e.to_string(),
            })?;
        if output.is_empty() {
            return Ok(None);
        }

        abi.decode_output(method, output)
            .map(Some)
            .map_err(|e| RegistryError::Decode {
                method,
                reason: e.to_string(),
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rejects_unparseable_endpoint() {
        assert!(matches!(
            EvmClient::new("not a url"),
            Err(RegistryError::InvalidEndpoint(_))
        ));
    }

    #[test]
    fn test_loads_claim_holder_abi() {
        let abi = EvmClient::load_abi(include_bytes!("../abi/ClaimHolder.json")).unwrap();
        assert!(abi.abi().function("getKeyPurpose").is_ok());
        assert!(abi.abi().function("getClaim").is_ok());
    }
}
