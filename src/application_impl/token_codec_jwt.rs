use crate::application_port::{DecodeError, TokenCodec, TokenError};
use crate::domain_model::{ClaimSet, IssuedToken, UserId};
use crate::domain_port::Clock;
use chrono::DateTime;
use jsonwebtoken::errors::ErrorKind;
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation, decode, encode};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;

#[derive(Clone)]
pub struct JwtConfig {
    pub issuer: String,
    pub signing_key: Vec<u8>,
}

impl std::fmt::Debug for JwtConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("JwtConfig")
            .field("issuer", &self.issuer)
            .field("signing_key", &"<redacted>")
            .finish()
    }
}

#[derive(Debug, Serialize, Deserialize)]
struct Claims {
    sub: String, // user id as string
    exp: i64,
    iat: i64,
    iss: String,
    jti: String, // keeps tokens issued in the same second distinct
}

pub struct JwtHs256Codec {
    cfg: JwtConfig,
    clock: Arc<dyn Clock>,
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    validation: Validation,
}

impl JwtHs256Codec {
    pub fn new(cfg: JwtConfig, clock: Arc<dyn Clock>) -> Self {
        let mut validation = Validation::new(Algorithm::HS256);
        // Expiry is judged by the caller against the shared clock.
        validation.validate_exp = false;
        validation.set_required_spec_claims(&["exp", "sub", "iss"]);
        validation.set_issuer(&[cfg.issuer.clone()]);

        JwtHs256Codec {
            encoding_key: EncodingKey::from_secret(&cfg.signing_key),
            decoding_key: DecodingKey::from_secret(&cfg.signing_key),
            cfg,
            clock,
            validation,
        }
    }

    #[inline]
    fn gen_jti() -> String {
        uuid::Uuid::new_v4().to_string()
    }

    fn timestamp(secs: i64) -> Result<DateTime<chrono::Utc>, DecodeError> {
        DateTime::from_timestamp(secs, 0)
            .ok_or_else(|| DecodeError::Malformed(format!("timestamp out of range: {}", secs)))
    }
}

impl TokenCodec for JwtHs256Codec {
    fn encode(&self, subject: UserId, ttl: Duration) -> Result<IssuedToken, TokenError> {
        let ttl = chrono::Duration::from_std(ttl)
            .map_err(|e| TokenError::InternalError(format!("ttl out of range: {}", e)))?;
        let iat_dt = self.clock.now();
        let exp_dt = iat_dt + ttl;
        let claims = Claims {
            sub: subject.to_string(),
            exp: exp_dt.timestamp(),
            iat: iat_dt.timestamp(),
            iss: self.cfg.issuer.clone(),
            jti: Self::gen_jti(),
        };
        let token = encode(&Header::new(Algorithm::HS256), &claims, &self.encoding_key)
            .map_err(|e| TokenError::InternalError(e.to_string()))?;
        Ok(IssuedToken {
            token,
            expires_at: Self::timestamp(claims.exp)
                .map_err(|e| TokenError::InternalError(e.to_string()))?,
        })
    }

    fn decode(&self, token: &str) -> Result<ClaimSet, DecodeError> {
        let data = decode::<Claims>(token, &self.decoding_key, &self.validation).map_err(|e| {
            match e.kind() {
                ErrorKind::InvalidSignature => DecodeError::BadSignature,
                ErrorKind::InvalidAlgorithm => DecodeError::AlgorithmMismatch,
                _ => DecodeError::Malformed(e.to_string()),
            }
        })?;
        let claims = data.claims;
        let subject = claims
            .sub
            .parse::<UserId>()
            .map_err(|e| DecodeError::Malformed(format!("subject: {}", e)))?;

        Ok(ClaimSet {
            subject,
            issued_at: Self::timestamp(claims.iat)?,
            expires_at: Self::timestamp(claims.exp)?,
            token_id: claims.jti,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infra_memory::ManualClock;

    const SECRET: &[u8] = b"codec-test-secret";

    fn codec_with(secret: &[u8], clock: Arc<ManualClock>) -> JwtHs256Codec {
        JwtHs256Codec::new(
            JwtConfig {
                issuer: "keyward.test".to_string(),
                signing_key: secret.to_vec(),
            },
            clock,
        )
    }

    #[test]
    fn decode_returns_subject_and_expiry() {
        let clock = Arc::new(ManualClock::starting_now());
        let codec = codec_with(SECRET, clock.clone());

        let issued = codec.encode(UserId(42), Duration::from_secs(120)).unwrap();
        let claims = codec.decode(&issued.token).unwrap();

        assert_eq!(claims.subject, UserId(42));
        assert_eq!(claims.expires_at, issued.expires_at);
        assert_eq!(claims.expires_at.timestamp() - claims.issued_at.timestamp(), 120);
        assert!(!claims.is_expired(clock.now()));
    }

    #[test]
    fn tokens_issued_in_the_same_instant_differ() {
        let codec = codec_with(SECRET, Arc::new(ManualClock::starting_now()));
        let a = codec.encode(UserId(1), Duration::from_secs(60)).unwrap();
        let b = codec.encode(UserId(1), Duration::from_secs(60)).unwrap();
        assert_ne!(a.token, b.token);
    }

    #[test]
    fn expired_claims_still_decode() {
        let clock = Arc::new(ManualClock::starting_now());
        let codec = codec_with(SECRET, clock.clone());
        let issued = codec.encode(UserId(3), Duration::from_secs(5)).unwrap();

        clock.advance(chrono::Duration::seconds(30));

        let claims = codec.decode(&issued.token).unwrap();
        assert!(claims.is_expired(clock.now()));
    }

    #[test]
    fn zero_ttl_is_expired_at_issuance() {
        let clock = Arc::new(ManualClock::starting_now());
        let codec = codec_with(SECRET, clock.clone());
        let issued = codec.encode(UserId(3), Duration::ZERO).unwrap();

        let claims = codec.decode(&issued.token).unwrap();
        assert!(claims.is_expired(clock.now()));
    }

    #[test]
    fn wrong_secret_is_rejected() {
        let clock = Arc::new(ManualClock::starting_now());
        let issued = codec_with(b"one", clock.clone())
            .encode(UserId(5), Duration::from_secs(60))
            .unwrap();

        let err = codec_with(b"two", clock).decode(&issued.token).unwrap_err();
        assert_eq!(err, DecodeError::BadSignature);
    }

    #[test]
    fn tampered_payload_is_rejected() {
        let codec = codec_with(SECRET, Arc::new(ManualClock::starting_now()));
        let issued = codec.encode(UserId(5), Duration::from_secs(60)).unwrap();
        let other = codec.encode(UserId(6), Duration::from_secs(60)).unwrap();

        let parts: Vec<&str> = issued.token.split('.').collect();
        let other_parts: Vec<&str> = other.token.split('.').collect();
        let forged = format!("{}.{}.{}", parts[0], other_parts[1], parts[2]);

        assert_eq!(codec.decode(&forged).unwrap_err(), DecodeError::BadSignature);
    }

    #[test]
    fn other_algorithm_is_rejected() {
        let codec = codec_with(SECRET, Arc::new(ManualClock::starting_now()));
        let claims = Claims {
            sub: "9".to_string(),
            exp: chrono::Utc::now().timestamp() + 60,
            iat: chrono::Utc::now().timestamp(),
            iss: "keyward.test".to_string(),
            jti: "x".to_string(),
        };
        let token = encode(
            &Header::new(Algorithm::HS384),
            &claims,
            &EncodingKey::from_secret(SECRET),
        )
        .unwrap();

        assert_eq!(codec.decode(&token).unwrap_err(), DecodeError::AlgorithmMismatch);
    }

    #[test]
    fn garbage_is_malformed() {
        let codec = codec_with(SECRET, Arc::new(ManualClock::starting_now()));
        assert!(matches!(
            codec.decode("not-a-token"),
            Err(DecodeError::Malformed(_))
        ));
        assert!(matches!(codec.decode(""), Err(DecodeError::Malformed(_))));
    }

    #[test]
    fn non_numeric_subject_is_malformed() {
        let codec = codec_with(SECRET, Arc::new(ManualClock::starting_now()));
        let claims = Claims {
            sub: "admin".to_string(),
            exp: chrono::Utc::now().timestamp() + 60,
            iat: chrono::Utc::now().timestamp(),
            iss: "keyward.test".to_string(),
            jti: "x".to_string(),
        };
        let token = encode(
            &Header::new(Algorithm::HS256),
            &claims,
            &EncodingKey::from_secret(SECRET),
        )
        .unwrap();

        assert!(matches!(codec.decode(&token), Err(DecodeError::Malformed(_))));
    }
}
