//! Shape-tolerant extraction of refreshed secrets from the refresh endpoint's JSON body.
//!
//! Each secret is looked up through an ordered list of JSON pointers; the first pointer that
//! resolves to a string wins, even when later pointers also resolve.

// crates.io
use serde_json::Value;
// self
use crate::{_prelude::*, auth::TokenPair, error::RefreshFailure};

/// Pointers tried, in order, for the new access token.
pub const ACCESS_TOKEN_POINTERS: &[&str] = &["/accessToken", "/token", "/data/accessToken"];
/// Pointers tried, in order, for a rotated refresh token.
pub const REFRESH_TOKEN_POINTERS: &[&str] = &["/refreshToken", "/data/refreshToken"];

/// Parses a refresh response body into a token pair.
///
/// An empty access token counts as missing. An empty or absent refresh token yields
/// `refresh_token: None`.
pub fn extract_token_pair(body: &[u8]) -> Result<TokenPair, RefreshFailure> {
	let mut deserializer = serde_json::Deserializer::from_slice(body);
	let value: Value = serde_path_to_error::deserialize(&mut deserializer)
		.map_err(|e| RefreshFailure::Parse(Arc::new(e)))?;
	let access = first_string(&value, ACCESS_TOKEN_POINTERS)
		.filter(|token| !token.is_empty())
		.ok_or(RefreshFailure::MissingAccessToken)?;
	let refresh = first_string(&value, REFRESH_TOKEN_POINTERS).filter(|token| !token.is_empty());

	Ok(match refresh {
		Some(refresh) => TokenPair::new(access, refresh),
		None => TokenPair::access_only(access),
	})
}

fn first_string<'a>(value: &'a Value, pointers: &[&str]) -> Option<&'a str> {
	pointers.iter().find_map(|pointer| value.pointer(pointer).and_then(Value::as_str))
}

#[cfg(test)]
mod tests {
	// self
	use super::*;

	fn access(body: &str) -> Option<String> {
		extract_token_pair(body.as_bytes()).ok().map(|pair| pair.access_token.expose().to_owned())
	}

	#[test]
	fn flat_and_enveloped_shapes_are_accepted() {
		assert_eq!(access(r#"{"accessToken":"T2"}"#).as_deref(), Some("T2"));
		assert_eq!(access(r#"{"token":"T3"}"#).as_deref(), Some("T3"));
		assert_eq!(access(r#"{"data":{"accessToken":"T4"}}"#).as_deref(), Some("T4"));
	}

	#[test]
	fn first_declared_pointer_wins() {
		assert_eq!(
			access(r#"{"data":{"accessToken":"nested"},"token":"flat","accessToken":"primary"}"#)
				.as_deref(),
			Some("primary")
		);
		assert_eq!(
			access(r#"{"data":{"accessToken":"nested"},"token":"flat"}"#).as_deref(),
			Some("flat")
		);
	}

	#[test]
	fn null_and_non_string_values_are_skipped() {
		assert_eq!(
			access(r#"{"accessToken":null,"token":42,"data":{"accessToken":"T5"}}"#).as_deref(),
			Some("T5")
		);
	}

	#[test]
	fn empty_access_token_counts_as_missing() {
		let err = extract_token_pair(br#"{"accessToken":"","token":"later"}"#)
			.expect_err("Empty access tokens must be rejected.");

		assert!(matches!(err, RefreshFailure::MissingAccessToken));
	}

	#[test]
	fn rotated_refresh_token_is_optional() {
		let pair = extract_token_pair(br#"{"data":{"accessToken":"A","refreshToken":"R"}}"#)
			.expect("Enveloped pair should parse.");

		assert_eq!(pair, TokenPair::new("A", "R"));

		let pair = extract_token_pair(br#"{"accessToken":"A","refreshToken":""}"#)
			.expect("Empty refresh token should be ignored.");

		assert_eq!(pair, TokenPair::access_only("A"));
	}

	#[test]
	fn malformed_json_is_a_parse_failure() {
		let err = extract_token_pair(b"<html>").expect_err("Non-JSON bodies must be rejected.");

		assert!(matches!(err, RefreshFailure::Parse(_)));
	}
}
