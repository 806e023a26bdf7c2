use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine};
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey};
use p256::elliptic_curve::sec1::ToEncodedPoint;
use p256::pkcs8::{EncodePrivateKey, LineEnding};
use p256::SecretKey;
use rand::rngs::OsRng;
use serde::Serialize;

use crate::error::ProviderError;

/// Key ID of the single signing key.
pub const KEY_ID: &str = "test";

/// Algorithm used to sign the access tokens.
pub const SIGNING_ALGORITHM: Algorithm = Algorithm::ES256;

/// EC P-256 key pair for token signing and JWKS publication.
///
/// Generated once per provider and never rotated.
pub struct SigningKeyPair {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    /// Base64url-encoded affine x coordinate of the public point.
    x: String,
    /// Base64url-encoded affine y coordinate of the public point.
    y: String,
}

impl SigningKeyPair {
    /// Generate a new P-256 key pair.
    pub fn generate() -> Result<Self, ProviderError> {
        let secret_key = SecretKey::random(&mut OsRng);

        // jsonwebtoken wants the private key as PKCS8 PEM.
        let pkcs8_pem = secret_key
            .to_pkcs8_pem(LineEnding::LF)
            .map_err(|e| ProviderError::Internal(format!("failed to export EC key: {e}")))?;
        let encoding_key = EncodingKey::from_ec_pem(pkcs8_pem.as_bytes())
            .map_err(|e| ProviderError::Internal(format!("failed to load EC key: {e}")))?;

        let point = secret_key.public_key().to_encoded_point(false);
        let (Some(x), Some(y)) = (point.x(), point.y()) else {
            return Err(ProviderError::Internal(
                "public key is the identity point".into(),
            ));
        };
        let x = URL_SAFE_NO_PAD.encode(x);
        let y = URL_SAFE_NO_PAD.encode(y);

        let decoding_key = DecodingKey::from_ec_components(&x, &y)
            .map_err(|e| ProviderError::Internal(format!("failed to build decoding key: {e}")))?;

        Ok(Self {
            encoding_key,
            decoding_key,
            x,
            y,
        })
    }

    /// Returns the private key for signing. Never serialized.
    pub fn encoding_key(&self) -> &EncodingKey {
        &self.encoding_key
    }

    /// Returns the public key for verifying tokens.
    pub fn decoding_key(&self) -> &DecodingKey {
        &self.decoding_key
    }

    /// Returns the public key set (no private material).
    pub fn jwks(&self) -> Jwks<'_> {
        Jwks {
            keys: vec![Jwk {
                kty: "EC",
                crv: "P-256",
                alg: "ES256",
                r#use: "sig",
                kid: KEY_ID,
                x: &self.x,
                y: &self.y,
            }],
        }
    }
}

/// JSON Web Key Set body.
#[derive(Debug, Serialize)]
pub struct Jwks<'a> {
    pub keys: Vec<Jwk<'a>>,
}

/// A single public EC key in a JWKS.
#[derive(Debug, Serialize)]
pub struct Jwk<'a> {
    pub kty: &'a str,
    pub crv: &'a str,
    pub alg: &'a str,
    #[serde(rename = "use")]
    pub r#use: &'a str,
    pub kid: &'a str,
    pub x: &'a str,
    pub y: &'a str,
}
