//! Redacting string wrapper for relayer signing keys.
//!
//! Keys are read from configuration and only exposed at the point a signer is
//! constructed. The wrapper zeroes its buffer on drop and never prints or
//! serializes the underlying value.

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use zeroize::Zeroizing;

const REDACTED: &str = "***REDACTED***";

#[derive(Clone)]
pub struct SecretString(Zeroizing<String>);

impl SecretString {
	pub fn new(s: String) -> Self {
		Self(Zeroizing::new(s))
	}

	/// Exposes the secret to a closure, keeping the exposed scope small.
	pub fn with_exposed<F, R>(&self, f: F) -> R
	where
		F: FnOnce(&str) -> R,
	{
		f(&self.0)
	}

	pub fn is_empty(&self) -> bool {
		self.0.trim().is_empty()
	}
}

impl fmt::Debug for SecretString {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		write!(f, "SecretString({})", REDACTED)
	}
}

impl fmt::Display for SecretString {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(REDACTED)
	}
}

impl From<String> for SecretString {
	fn from(s: String) -> Self {
		Self::new(s)
	}
}

impl From<&str> for SecretString {
	fn from(s: &str) -> Self {
		Self::new(s.to_string())
	}
}

impl Serialize for SecretString {
	fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
	where
		S: Serializer,
	{
		serializer.serialize_str(REDACTED)
	}
}

impl<'de> Deserialize<'de> for SecretString {
	fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
	where
		D: Deserializer<'de>,
	{
		String::deserialize(deserializer).map(SecretString::new)
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn test_secret_never_printed() {
		let secret = SecretString::from("0xac0974bec39a17e36ba4a6b4d238ff944bacb478");
		assert_eq!(format!("{:?}", secret), "SecretString(***REDACTED***)");
		assert_eq!(format!("{}", secret), "***REDACTED***");
		assert_eq!(
			serde_json::to_string(&secret).unwrap(),
			"\"***REDACTED***\""
		);
	}

	#[test]
	fn test_with_exposed() {
		let secret = SecretString::from("my-key");
		assert_eq!(secret.with_exposed(|s| s.len()), 6);
		assert!(!secret.is_empty());
		assert!(SecretString::from("  ").is_empty());
	}
}
