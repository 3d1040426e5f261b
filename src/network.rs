use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NativeCurrency {
    pub name: String,
    pub symbol: String,
    pub decimals: u8,
}

/// The `wallet_addEthereumChain` payload. Field names follow the wallet's
/// camelCase wire format.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NetworkDescriptor {
    /// Chain identifier as a hexadecimal string, e.g. `0x7a69`.
    pub chain_id: String,
    pub chain_name: String,
    pub native_currency: NativeCurrency,
    pub rpc_urls: Vec<String>,
}

impl NetworkDescriptor {
    pub fn new(
        chain_id: &str,
        chain_name: &str,
        native_currency: NativeCurrency,
        rpc_url: String,
    ) -> Self {
        Self {
            chain_id: chain_id.to_string(),
            chain_name: chain_name.to_string(),
            native_currency,
            rpc_urls: vec![rpc_url],
        }
    }

    /// The params array for the registration request.
    pub fn add_chain_params(&self) -> serde_json::Value {
        serde_json::json!([self])
    }
}

/// Builds an RPC endpoint from page-origin pieces. `protocol` carries its
/// trailing colon, as `Location::protocol` reports it.
pub fn rpc_url(protocol: &str, hostname: &str, port: u16) -> String {
    format!("{protocol}//{hostname}:{port}")
}

/// Same derivation against the current page. `None` outside a browser
/// context.
pub fn page_rpc_url(port: u16) -> Option<String> {
    let location = web_sys::window()?.location();
    let protocol = location.protocol().ok()?;
    let hostname = location.hostname().ok()?;
    Some(rpc_url(&protocol, &hostname, port))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rpc_url_keeps_protocol_colon() {
        assert_eq!(rpc_url("https:", "example.com", 8545), "https://example.com:8545");
        assert_eq!(rpc_url("http:", "localhost", 9650), "http://localhost:9650");
    }

    #[test]
    fn descriptor_serializes_in_wire_shape() {
        let descriptor = NetworkDescriptor::new(
            "0x7a69",
            "Localnet",
            NativeCurrency { name: "Ether".into(), symbol: "ETH".into(), decimals: 18 },
            rpc_url("http:", "localhost", 8545),
        );
        let value = serde_json::to_value(&descriptor).unwrap();
        assert_eq!(value["chainId"], "0x7a69");
        assert_eq!(value["chainName"], "Localnet");
        assert_eq!(value["nativeCurrency"]["symbol"], "ETH");
        assert_eq!(value["nativeCurrency"]["decimals"], 18);
        assert_eq!(value["rpcUrls"][0], "http://localhost:8545");
    }

    #[test]
    fn add_chain_params_wraps_in_array() {
        let descriptor = NetworkDescriptor::new(
            "0x1",
            "Mainnet",
            NativeCurrency { name: "Ether".into(), symbol: "ETH".into(), decimals: 18 },
            "https://rpc.example.com:443".into(),
        );
        let params = descriptor.add_chain_params();
        assert!(params.is_array());
        assert_eq!(params[0]["chainId"], "0x1");
    }
}
