mod common;

// crates.io
use serde_json::json;
use time::{Duration, OffsetDateTime};
// self
use common::*;
use gateway_auth::{
	error::ConfigError,
	token::{InvalidReason, TokenValidator, ValidationOutcome},
};

fn exp_in(lifetime: Duration) -> i64 {
	(OffsetDateTime::now_utc() + lifetime).unix_timestamp()
}

#[test]
fn valid_token_yields_client_id_claim() {
	let token = mint_valid("gw-admin");

	match validator().validate(&token) {
		ValidationOutcome::Valid(claims) => {
			assert_eq!(claims.client_id.as_str(), "gw-admin");
			assert!(claims.expires_at.is_some_and(|at| at > OffsetDateTime::now_utc()));
		},
		other => panic!("Unexpected outcome: {other:?}."),
	}
}

#[test]
fn expired_token_is_expired_not_invalid() {
	assert_eq!(validator().validate(&mint_expired("gw-admin")), ValidationOutcome::Expired);
}

#[test]
fn foreign_signature_is_invalid() {
	let token = sign_with(
		FOREIGN_SIGNING_KEY,
		&json!({ "clientId": "gw-admin", "exp": exp_in(Duration::hours(1)) }),
	);

	assert_eq!(validator().validate(&token), ValidationOutcome::Invalid(InvalidReason::Signature));
}

#[test]
fn expired_foreign_token_reports_the_signature() {
	let token = sign_with(
		FOREIGN_SIGNING_KEY,
		&json!({ "clientId": "gw-admin", "exp": exp_in(-Duration::hours(1)) }),
	);

	assert_eq!(validator().validate(&token), ValidationOutcome::Invalid(InvalidReason::Signature));
}

#[test]
fn client_id_claim_must_be_a_string() {
	let validator = validator();
	let exp = exp_in(Duration::hours(1));
	let missing = sign_with(SIGNING_KEY, &json!({ "exp": exp }));
	let numeric = sign_with(SIGNING_KEY, &json!({ "clientId": 7, "exp": exp }));

	assert_eq!(
		validator.validate(&missing),
		ValidationOutcome::Invalid(InvalidReason::MissingClientId)
	);
	assert_eq!(
		validator.validate(&numeric),
		ValidationOutcome::Invalid(InvalidReason::NonStringClientId)
	);
}

#[test]
fn tokens_without_exp_are_invalid() {
	let token = sign_with(SIGNING_KEY, &json!({ "clientId": "gw-admin" }));

	assert!(matches!(
		validator().validate(&token),
		ValidationOutcome::Invalid(InvalidReason::MissingClaim { claim }) if claim == "exp"
	));
}

#[test]
fn leeway_accepts_recently_expired_tokens() {
	let validator = TokenValidator::from_key_material(VERIFYING_KEY)
		.expect("Fixture key should parse.")
		.with_leeway(120);
	let token = mint("gw-admin", -Duration::seconds(30));

	assert!(validator.validate(&token).is_valid());
}

#[test]
fn bare_base64_key_with_line_breaks_parses() {
	let wrapped = VERIFYING_KEY_B64
		.trim()
		.as_bytes()
		.chunks(40)
		.map(|chunk| std::str::from_utf8(chunk).expect("Base64 is ASCII."))
		.collect::<Vec<_>>()
		.join("\n");
	let validator =
		TokenValidator::from_key_material(&wrapped).expect("Bare base64 SPKI should parse.");

	assert!(validator.validate(&mint_valid("gw-courier")).is_valid());
}

#[test]
fn malformed_key_material_fails_fast() {
	let materials = [
		"",
		"not base64 at all!",
		"-----BEGIN PUBLIC KEY-----\nnot*base64\n-----END PUBLIC KEY-----",
	];

	for material in materials {
		assert!(
			matches!(TokenValidator::from_key_material(material), Err(ConfigError::KeyFormat { .. })),
			"Material {material:?} should be rejected."
		);
	}
}

#[test]
fn any_string_client_id_is_valid() {
	let validator = validator();
	let long = "x".repeat(300);

	for raw in ["alice smith", "svc:alice", "", long.as_str()] {
		match validator.validate(&mint_valid(raw)) {
			ValidationOutcome::Valid(claims) => assert_eq!(claims.client_id.as_str(), raw),
			other => panic!("Unexpected outcome for {raw:?}: {other:?}."),
		}
	}
}

#[test]
fn oversized_leeway_is_capped_at_one_day() {
	let validator = TokenValidator::from_key_material(VERIFYING_KEY)
		.expect("Fixture key should parse.")
		.with_leeway(u64::MAX);

	assert!(validator.validate(&mint("gw-admin", -Duration::hours(2))).is_valid());
	assert_eq!(validator.validate(&mint("gw-admin", -Duration::days(2))), ValidationOutcome::Expired);
}
