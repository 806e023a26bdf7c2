use std::time::{SystemTime, UNIX_EPOCH};

use top_core::{LoginRequest, OidcProvider, OidcProviderConfig, ProviderError};

fn default_provider() -> OidcProvider {
    OidcProvider::new(OidcProviderConfig::default()).unwrap()
}

fn custom_config() -> OidcProviderConfig {
    OidcProviderConfig::default()
        .issuer("https://proxy.aai.lifescience-ri.eu/")
        .user_domain("dkfz.de")
        .client_id("GHGA-Client")
        .valid_seconds(90 * 60)
}

fn now() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap()
        .as_secs()
}

#[tokio::test]
async fn create_default_provider() {
    let provider = default_provider();
    assert_eq!(provider.issuer(), "https://op.test");
    assert_eq!(provider.op_domain(), "op.test");
    assert_eq!(provider.user_domain(), "home.org");
    assert_eq!(provider.client_id(), "test-client");
    assert_eq!(provider.valid_seconds(), 3600);
    assert_eq!(provider.num_users(), 0);
    assert_eq!(provider.next_jti(), "test-1");
}

#[tokio::test]
async fn create_custom_provider() {
    let provider = OidcProvider::new(custom_config()).unwrap();
    assert_eq!(provider.issuer(), "https://proxy.aai.lifescience-ri.eu");
    assert_eq!(provider.op_domain(), "lifescience-ri.eu");
    assert_eq!(provider.user_domain(), "dkfz.de");
    assert_eq!(provider.client_id(), "GHGA-Client");
    assert_eq!(provider.valid_seconds(), 90 * 60);
    assert_eq!(provider.num_users(), 0);
    assert_eq!(provider.next_jti(), "test-1");
}

#[test]
fn invalid_configuration_is_rejected() {
    let bad = [
        OidcProviderConfig::default().issuer("op.test"),
        OidcProviderConfig::default().issuer("https://localhost"),
        OidcProviderConfig::default().issuer(""),
        OidcProviderConfig::default().user_domain("home"),
        OidcProviderConfig::default().user_domain("https://home.org"),
        OidcProviderConfig::default().valid_seconds(0),
        OidcProviderConfig::default().client_id(" "),
        OidcProviderConfig::default().redirect_url("not a url"),
    ];
    for config in bad {
        let err = OidcProvider::new(config.clone()).err();
        assert!(
            matches!(err, Some(ProviderError::Config(_))),
            "accepted {config:?}"
        );
    }
}

#[tokio::test]
async fn unknown_token_is_not_found() {
    let provider = default_provider();
    let err = provider.user_info("bad").unwrap_err();
    assert!(matches!(err, ProviderError::NotFound(_)));
}

#[tokio::test]
async fn user_info_for_default_token() {
    let provider = default_provider();

    let token = provider.login(&LoginRequest::new("John Doe")).unwrap();
    assert_eq!(token.matches('.').count(), 2);
    assert_eq!(provider.num_users(), 1);

    let user = provider.user_info(&token).unwrap();
    assert_eq!(user.name, "John Doe");
    assert_eq!(user.email, "john.doe@home.org");
    assert_eq!(user.sub, "id-of-john-doe@op.test");

    assert_eq!(provider.num_jobs(), 1);
    provider.reset().await;
    assert_eq!(provider.num_users(), 0);
    assert_eq!(provider.num_jobs(), 0);
    assert!(matches!(
        provider.user_info(&token),
        Err(ProviderError::NotFound(_))
    ));
}

#[tokio::test]
async fn user_info_for_custom_token_strips_title() {
    let provider = default_provider();

    let request = LoginRequest::new("Dr. Jane Roe")
        .email("jane@foo.edu")
        .sub("sub-of-jane");
    let token = provider.login(&request).unwrap();

    let user = provider.user_info(&token).unwrap();
    assert_eq!(user.name, "Jane Roe");
    assert_eq!(user.email, "jane@foo.edu");
    assert_eq!(user.sub, "sub-of-jane");

    provider.reset().await;
    assert_eq!(provider.num_jobs(), 0);
}

#[tokio::test]
async fn derived_identity_uses_stripped_name() {
    let provider = default_provider();
    let token = provider.login(&LoginRequest::new("  Prof. Max Power ")).unwrap();

    let user = provider.user_info(&token).unwrap();
    assert_eq!(user.name, "Max Power");
    assert_eq!(user.email, "max.power@home.org");
    assert_eq!(user.sub, "id-of-max-power@op.test");
    provider.reset().await;
}

#[tokio::test]
async fn user_info_for_default_token_of_custom_provider() {
    let provider = OidcProvider::new(custom_config()).unwrap();

    let token = provider.login(&LoginRequest::new("Frank Foo")).unwrap();
    let user = provider.user_info(&token).unwrap();
    assert_eq!(user.name, "Frank Foo");
    assert_eq!(user.email, "frank.foo@dkfz.de");
    assert_eq!(user.sub, "id-of-frank-foo@lifescience-ri.eu");

    provider.reset().await;
    assert_eq!(provider.num_users(), 0);
}

#[tokio::test]
async fn two_logins_give_distinct_tokens_and_serials() {
    let provider = default_provider();

    let token1 = provider.login(&LoginRequest::new("John Doe")).unwrap();
    assert_eq!(provider.next_jti(), "test-2");
    let token2 = provider.login(&LoginRequest::new("John Doe")).unwrap();
    assert_eq!(provider.next_jti(), "test-3");
    assert_ne!(token1, token2);
    assert_eq!(provider.num_users(), 2);

    let claims1 = provider.decode_and_validate_token(&token1).unwrap();
    let claims2 = provider.decode_and_validate_token(&token2).unwrap();
    assert_eq!(claims1["jti"], "test-1");
    assert_eq!(claims2["jti"], "test-2");

    assert_eq!(provider.num_jobs(), 2);
    provider.reset().await;
    assert_eq!(provider.num_users(), 0);
    assert_eq!(provider.num_jobs(), 0);
    assert_eq!(provider.next_jti(), "test-1");
}

#[tokio::test]
async fn issued_tokens_carry_exact_claims() {
    let provider = default_provider();

    let token = provider.login(&LoginRequest::new("John Doe")).unwrap();
    let claims = provider.decode_and_validate_token(&token).unwrap();
    let mut keys: Vec<&str> = claims.as_object().unwrap().keys().map(String::as_str).collect();
    keys.sort_unstable();
    assert_eq!(keys, ["aud", "client_id", "exp", "iat", "iss", "jti", "scope", "sub"]);
    assert_eq!(claims["client_id"], "test-client");
    assert_eq!(claims["aud"], serde_json::json!(["test-client"]));
    assert_eq!(claims["iss"], "https://op.test");
    assert_eq!(claims["jti"], "test-1");
    assert_eq!(claims["scope"], "openid profile email");
    assert_eq!(claims["sub"], "id-of-john-doe@op.test");
    let iat = claims["iat"].as_u64().unwrap();
    let exp = claims["exp"].as_u64().unwrap();
    assert_eq!(exp - iat, 3600);
    assert!(now() - iat < 5);

    let request = LoginRequest::new("Dr. Jane Roe")
        .email("jane@foo.edu")
        .sub("sub-of-jane")
        .valid_seconds(30.0);
    let token = provider.login(&request).unwrap();
    let claims = provider.decode_and_validate_token(&token).unwrap();
    assert_eq!(claims["jti"], "test-2");
    assert_eq!(claims["sub"], "sub-of-jane");
    let iat = claims["iat"].as_u64().unwrap();
    let exp = claims["exp"].as_u64().unwrap();
    assert_eq!(exp - iat, 30);

    provider.reset().await;
}

#[tokio::test]
async fn tokens_of_other_providers_are_rejected() {
    let provider = default_provider();
    let other = default_provider();

    let token = other.login(&LoginRequest::new("John Doe")).unwrap();
    assert!(matches!(
        provider.decode_and_validate_token(&token),
        Err(ProviderError::NotFound(_))
    ));
    assert!(matches!(
        provider.decode_and_validate_token("foo.bar.baz"),
        Err(ProviderError::NotFound(_))
    ));
    other.reset().await;
}

#[tokio::test]
async fn invalid_login_requests_are_rejected() {
    let provider = default_provider();

    let bad = [
        LoginRequest::new(""),
        LoginRequest::new("   "),
        LoginRequest::new("Dr."),
        LoginRequest::new("John Doe").email("not-an-email"),
        LoginRequest::new("John Doe").valid_seconds(0.0),
        LoginRequest::new("John Doe").valid_seconds(-5.0),
        LoginRequest::new("John Doe").valid_seconds(f64::NAN),
        LoginRequest::new("John Doe").valid_seconds(f64::INFINITY),
    ];
    for request in bad {
        let err = provider.login(&request).unwrap_err();
        assert!(
            matches!(err, ProviderError::InvalidInput(_)),
            "accepted {request:?}"
        );
    }
    assert_eq!(provider.num_users(), 0);
    assert_eq!(provider.num_jobs(), 0);
    assert_eq!(provider.next_jti(), "test-1");
}

#[tokio::test]
async fn lifetime_beyond_the_clock_range_is_rejected() {
    let provider = default_provider();

    for secs in [1.8446744073709e19, u64::MAX as f64 - 1.0] {
        let err = provider
            .login(&LoginRequest::new("John Doe").valid_seconds(secs))
            .unwrap_err();
        assert_eq!(
            err,
            ProviderError::InvalidInput("The expiration time is invalid.".into())
        );
    }
    assert_eq!(provider.num_users(), 0);
    assert_eq!(provider.num_jobs(), 0);
    assert_eq!(provider.next_jti(), "test-1");

    // The store stays usable after a rejected login.
    let token = provider.login(&LoginRequest::new("John Doe")).unwrap();
    assert_eq!(provider.user_info(&token).unwrap().name, "John Doe");
    provider.reset().await;
}

#[tokio::test]
async fn jwks_exposes_only_the_public_key() {
    let provider = default_provider();
    let jwks = serde_json::to_value(provider.jwks()).unwrap();

    let keys = jwks["keys"].as_array().unwrap();
    assert_eq!(keys.len(), 1);
    let key = &keys[0];
    assert_eq!(key["kty"], "EC");
    assert_eq!(key["crv"], "P-256");
    assert_eq!(key["kid"], "test");
    assert_eq!(key["use"], "sig");
    assert!(key["x"].as_str().unwrap().len() > 40);
    assert!(key["y"].as_str().unwrap().len() > 40);
    assert!(key.get("d").is_none());
}
