use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use rsa::pkcs8::DecodePublicKey;
use rsa::{Pkcs1v15Encrypt, RsaPublicKey};

use crate::error::{ConfigError, GatewayError};

/// Parse the public key handed out by the developer portal. The portal gives
/// the bare base64 SPKI body; PEM armor lines and embedded whitespace are
/// tolerated since keys get pasted into env files in both shapes.
pub fn parse_public_key(raw: &str) -> Result<RsaPublicKey, ConfigError> {
    let body: String = raw
        .lines()
        .filter(|line| !line.starts_with("-----"))
        .flat_map(|line| line.split_whitespace())
        .collect();
    let der = STANDARD
        .decode(body.as_bytes())
        .map_err(|e| ConfigError::InvalidPublicKey(e.to_string()))?;
    RsaPublicKey::from_public_key_der(&der)
        .map_err(|e| ConfigError::InvalidPublicKey(e.to_string()))
}

/// Derive the bearer token for one request: RSA-encrypt the API key under
/// PKCS#1 v1.5 padding and base64 the ciphertext. The gateway wants a fresh
/// token on every call, so nothing here is cached. The padding is randomized;
/// two tokens for the same key pair will not match byte-for-byte.
pub fn derive_token(public_key: &RsaPublicKey, api_key: &str) -> Result<String, GatewayError> {
    let mut rng = rand::thread_rng();
    let encrypted = public_key
        .encrypt(&mut rng, Pkcs1v15Encrypt, api_key.as_bytes())
        .map_err(|e| GatewayError::Token(e.to_string()))?;
    Ok(STANDARD.encode(encrypted))
}

#[cfg(test)]
mod tests {
    use super::*;
    use rsa::pkcs8::EncodePublicKey;
    use rsa::RsaPrivateKey;

    fn test_keypair() -> (RsaPrivateKey, String) {
        let mut rng = rand::thread_rng();
        let private = RsaPrivateKey::new(&mut rng, 512).unwrap();
        let der = private.to_public_key().to_public_key_der().unwrap();
        (private, STANDARD.encode(der.as_bytes()))
    }

    #[test]
    fn token_round_trips_through_private_key() {
        let (private, key_body) = test_keypair();
        let public = parse_public_key(&key_body).unwrap();

        let token = derive_token(&public, "secret_api_key").unwrap();
        let ciphertext = STANDARD.decode(token).unwrap();
        let plaintext = private.decrypt(Pkcs1v15Encrypt, &ciphertext).unwrap();
        assert_eq!(plaintext, b"secret_api_key");
    }

    #[test]
    fn tokens_differ_between_calls() {
        // PKCS#1 v1.5 padding is randomized
        let (_, key_body) = test_keypair();
        let public = parse_public_key(&key_body).unwrap();
        let a = derive_token(&public, "secret_api_key").unwrap();
        let b = derive_token(&public, "secret_api_key").unwrap();
        assert_ne!(a, b);
    }

    #[test]
    fn parse_tolerates_pem_armor_and_line_breaks() {
        let (_, key_body) = test_keypair();
        let wrapped: Vec<String> = key_body
            .as_bytes()
            .chunks(60)
            .map(|c| String::from_utf8(c.to_vec()).unwrap())
            .collect();
        let pem = format!(
            "-----BEGIN PUBLIC KEY-----\n{}\n-----END PUBLIC KEY-----",
            wrapped.join("\n")
        );
        assert!(parse_public_key(&pem).is_ok());
    }

    #[test]
    fn parse_rejects_garbage() {
        assert!(matches!(
            parse_public_key("not a key"),
            Err(ConfigError::InvalidPublicKey(_))
        ));
        assert!(matches!(
            // valid base64, not a key
            parse_public_key("aGVsbG8gd29ybGQ="),
            Err(ConfigError::InvalidPublicKey(_))
        ));
    }
}
