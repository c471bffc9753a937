use sealer::kdf::{KdfAlgorithm, KdfRegistry, KeyDerivationParams};
use sealer::tokens::encrypt_token_bundle_with;
use sealer::{
    decrypt_token_bundle, encrypt_token_bundle, validate_strength, AsyncSealer, SealError, Sealer,
    StrengthIssue, TokenSanitizer,
};
use serde_json::json;

const PASS: &[u8] = b"Tr0ub4dor&3xampleKey!";

fn light_sealer() -> Sealer {
    let registry = KdfRegistry::empty();
    registry
        .register(KeyDerivationParams {
            version: 2,
            algorithm: KdfAlgorithm::Argon2id,
            memory_cost: 64,
            time_cost: 1,
            parallelism: 1,
            output_length: 32,
        })
        .unwrap();
    Sealer::builder().registry(registry).build().unwrap()
}

#[test]
fn authorization_code_never_round_trips() {
    let sealer = light_sealer();
    let env = encrypt_token_bundle(&sealer, &json!({"accessToken": "a", "code": "one-time"}), PASS)
        .unwrap();
    let bundle = decrypt_token_bundle(&sealer, &env, PASS).unwrap();
    assert_eq!(bundle.get("accessToken"), Some(&json!("a")));
    assert!(!bundle.contains_key("code"));
}

#[test]
fn provider_bundle_keeps_everything_else() {
    let sealer = light_sealer();
    let tokens = json!({
        "access_token": "ya29.a0",
        "refresh_token": "1//0g",
        "scope": "https://www.googleapis.com/auth/calendar",
        "token_type": "Bearer",
        "expiry_date": 1_700_000_000_000u64,
        "code_verifier": "pkce-secret",
        "state": "csrf",
    });
    let env = encrypt_token_bundle(&sealer, &tokens, PASS).unwrap();
    let bundle = decrypt_token_bundle(&sealer, &env, PASS).unwrap();
    assert_eq!(bundle.len(), 5);
    assert!(!bundle.contains_key("code_verifier"));
    assert!(!bundle.contains_key("state"));
}

#[test]
fn custom_denylist_reaches_nested_fields() {
    let sealer = light_sealer();
    let sanitizer = TokenSanitizer::default().with_path("accounts[].password");
    let tokens = json!({
        "accounts": [
            {"user": "a@example.com", "password": "hunter2"},
            {"user": "b@example.com", "password": "hunter3"}
        ]
    });
    let env = encrypt_token_bundle_with(&sealer, &sanitizer, &tokens, PASS).unwrap();
    let raw: serde_json::Value = sealer::decrypt_structured(&sealer, &env, PASS).unwrap();
    for account in raw["accounts"].as_array().unwrap() {
        assert!(account.get("password").is_none());
        assert!(account.get("user").is_some());
    }
}

#[test]
fn scalar_bundle_is_invalid_input() {
    let sealer = light_sealer();
    assert!(matches!(
        encrypt_token_bundle(&sealer, &json!("just a token"), PASS),
        Err(SealError::InvalidInput(_))
    ));
}

#[test]
fn strength_report_lists_every_violation() {
    let report = validate_strength("short");
    assert!(!report.is_valid);
    assert!(report
        .issues
        .iter()
        .any(|i| matches!(i, StrengthIssue::TooShort { .. })));
    assert!(report.issues.contains(&StrengthIssue::MissingUppercase));
    assert!(report.issues.contains(&StrengthIssue::MissingDigit));
    assert!(report.issues.contains(&StrengthIssue::MissingSymbol));
}

#[tokio::test]
async fn async_facade_round_trips_bundles() {
    let sealer = AsyncSealer::new(light_sealer());
    let env = sealer
        .encrypt_token_bundle(json!({"access_token": "a", "code": "c"}), PASS, None)
        .await
        .unwrap();
    let bundle = sealer.decrypt_token_bundle(&env, PASS).await.unwrap();
    assert_eq!(bundle.get("access_token"), Some(&json!("a")));
    assert!(!bundle.contains_key("code"));
}

#[tokio::test]
async fn concurrent_callers_share_one_sealer() {
    let sealer = AsyncSealer::new(light_sealer());
    let tasks: Vec<_> = (0..8)
        .map(|i| {
            let sealer = sealer.clone();
            tokio::spawn(async move {
                let plaintext = format!("token-{i}");
                let env = sealer.encrypt(plaintext.as_bytes(), PASS, None).await?;
                let back = sealer.decrypt(&env, PASS).await?;
                assert_eq!(back.as_slice(), plaintext.as_bytes());
                Ok::<_, SealError>(())
            })
        })
        .collect();
    for task in tasks {
        task.await.unwrap().unwrap();
    }
    assert_eq!(sealer.sealer().cache().len(), 8);
}
