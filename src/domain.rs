use std::{fmt::Display, str::FromStr};

use ethers::types::U256;
use serde::{de::Error, Deserialize, Deserializer, Serialize, Serializer};
use thiserror::Error;

/// A wallet address as handed out by the injected provider. The original
/// casing is preserved so the rendered form matches what the wallet shows.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Address(String);

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum AddressError {
    #[error("Address must start with 0x")]
    MissingPrefix,

    #[error("Address must hold 20 bytes of hex")]
    Length,

    #[error("Address contains non-hexadecimal characters")]
    Encoding,
}

impl Address {
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Badge form: first six characters, an ellipsis, last four.
    pub fn short(&self) -> String {
        format!("{}...{}", &self.0[..6], &self.0[self.0.len() - 4..])
    }
}

impl FromStr for Address {
    type Err = AddressError;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let digits = s.strip_prefix("0x").ok_or(AddressError::MissingPrefix)?;
        if digits.len() != 40 {
            return Err(AddressError::Length);
        }
        if !digits.bytes().all(|b| b.is_ascii_hexdigit()) {
            return Err(AddressError::Encoding);
        }
        Ok(Self(s.to_string()))
    }
}

impl Display for Address {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl Serialize for Address {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&self.0)
    }
}

impl<'de> Deserialize<'de> for Address {
    fn deserialize<D>(deserializer: D) -> Result<Address, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;

        s.parse::<Address>().map_err(D::Error::custom)
    }
}

#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("Not a hexadecimal quantity: {0}")]
pub struct QuantityError(pub String);

/// Converts a hexadecimal wei quantity to a decimal ether string, truncated
/// to four fractional digits.
pub fn format_wei_hex(value: &str) -> Result<String, QuantityError> {
    let digits = value.strip_prefix("0x").unwrap_or(value);
    let wei =
        U256::from_str_radix(digits, 16).map_err(|_| QuantityError(value.to_string()))?;
    let ether = wei / U256::exp10(18);
    let frac = (wei % U256::exp10(18)) / U256::exp10(14);
    Ok(format!("{ether}.{:04}", frac.as_u64()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn address_roundtrip_and_badge() {
        let address: Address = "0xABCDEF1234567890000000000000000000000000".parse().unwrap();
        assert_eq!(address.as_str(), "0xABCDEF1234567890000000000000000000000000");
        assert_eq!(address.short(), "0xABCD...0000");
    }

    #[test]
    fn address_rejects_bad_input() {
        assert_eq!(
            "ABCDEF1234567890000000000000000000000000".parse::<Address>(),
            Err(AddressError::MissingPrefix)
        );
        assert_eq!("0xABCDEF".parse::<Address>(), Err(AddressError::Length));
        assert_eq!(
            "0xZZCDEF1234567890000000000000000000000000".parse::<Address>(),
            Err(AddressError::Encoding)
        );
    }

    #[test]
    fn one_ether_formats_as_one() {
        assert_eq!(format_wei_hex("0xDE0B6B3A7640000").unwrap(), "1.0000");
    }

    #[test]
    fn zero_wei_formats_as_zero() {
        assert_eq!(format_wei_hex("0x0").unwrap(), "0.0000");
    }

    #[test]
    fn fractional_digits_truncate() {
        let wei = U256::from_dec_str("1234567890123456789").unwrap();
        assert_eq!(format_wei_hex(&format!("{wei:#x}")).unwrap(), "1.2345");
    }

    #[test]
    fn large_balances_keep_integer_part() {
        let wei = U256::from_dec_str("123456000000000000000000").unwrap();
        assert_eq!(format_wei_hex(&format!("{wei:#x}")).unwrap(), "123456.0000");
    }

    #[test]
    fn garbage_quantity_is_an_error() {
        assert!(format_wei_hex("0xnope").is_err());
        assert!(format_wei_hex("").is_err());
    }
}
