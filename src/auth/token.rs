//! Token issuance and verification
//!
//! Tokens use JWS compact serialization:
//! `base64url(header).base64url(claims).base64url(signature)` without padding,
//! where the signature is an HMAC over `header.claims` under the process key.
//!
//! Verification is a pure function of the token, the key and the current
//! instant. It performs no I/O, so it is safe to call from any number of
//! concurrent requests.

use chrono::Duration;
use data_encoding::BASE64URL_NOPAD;
use hmac::{Hmac, Mac};
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use sha2::{Sha256, Sha384, Sha512};
use std::fmt;
use std::sync::Arc;

use super::algorithm::Algorithm;
use super::claims::Claims;
use super::clock::{Clock, SystemClock};
use super::error::{ConfigurationError, TokenError};
use super::key::SigningKey;

/// Default token lifetime (one hour)
pub const DEFAULT_TOKEN_TTL_SECONDS: i64 = 60 * 60;
/// Longest accepted token lifetime (30 days)
pub const MAX_TOKEN_TTL_SECONDS: i64 = 30 * 24 * 60 * 60;
/// Largest accepted expiry leeway (5 minutes)
pub const MAX_LEEWAY_SECONDS: i64 = 5 * 60;

/// Convert a configured lifetime, rejecting values outside `1..=MAX_TOKEN_TTL_SECONDS`
pub fn token_lifetime(seconds: i64) -> Result<Duration, ConfigurationError> {
    match Duration::try_seconds(seconds) {
        Some(ttl) if (1..=MAX_TOKEN_TTL_SECONDS).contains(&seconds) => Ok(ttl),
        _ => Err(ConfigurationError::InvalidLifetime {
            seconds,
            maximum: MAX_TOKEN_TTL_SECONDS,
        }),
    }
}

/// Convert a configured leeway, rejecting values outside `0..=MAX_LEEWAY_SECONDS`
pub fn expiry_leeway(seconds: i64) -> Result<Duration, ConfigurationError> {
    match Duration::try_seconds(seconds) {
        Some(leeway) if (0..=MAX_LEEWAY_SECONDS).contains(&seconds) => Ok(leeway),
        _ => Err(ConfigurationError::InvalidLeeway {
            seconds,
            maximum: MAX_LEEWAY_SECONDS,
        }),
    }
}

/// Opaque signed session token
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignedToken(String);

impl SignedToken {
    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_string(self) -> String {
        self.0
    }
}

impl fmt::Display for SignedToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Debug, Serialize, Deserialize)]
struct Header {
    alg: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    typ: Option<String>,
}

/// HMAC state keyed once at construction and cloned per operation
#[derive(Clone)]
enum KeyedMac {
    Hs256(Hmac<Sha256>),
    Hs384(Hmac<Sha384>),
    Hs512(Hmac<Sha512>),
}

impl KeyedMac {
    fn new(algorithm: Algorithm, key: &SigningKey) -> Result<Self, ConfigurationError> {
        let key = key.expose();
        let keyed = match algorithm {
            Algorithm::HS256 => Hmac::<Sha256>::new_from_slice(key).map(KeyedMac::Hs256),
            Algorithm::HS384 => Hmac::<Sha384>::new_from_slice(key).map(KeyedMac::Hs384),
            Algorithm::HS512 => Hmac::<Sha512>::new_from_slice(key).map(KeyedMac::Hs512),
        };
        keyed.map_err(|_| ConfigurationError::InvalidKey)
    }

    fn sign(&self, input: &[u8]) -> Vec<u8> {
        match self.clone() {
            KeyedMac::Hs256(mut mac) => {
                mac.update(input);
                mac.finalize().into_bytes().to_vec()
            }
            KeyedMac::Hs384(mut mac) => {
                mac.update(input);
                mac.finalize().into_bytes().to_vec()
            }
            KeyedMac::Hs512(mut mac) => {
                mac.update(input);
                mac.finalize().into_bytes().to_vec()
            }
        }
    }

    /// Constant-time comparison against `signature`
    fn verify(&self, input: &[u8], signature: &[u8]) -> bool {
        match self.clone() {
            KeyedMac::Hs256(mut mac) => {
                mac.update(input);
                mac.verify_slice(signature).is_ok()
            }
            KeyedMac::Hs384(mut mac) => {
                mac.update(input);
                mac.verify_slice(signature).is_ok()
            }
            KeyedMac::Hs512(mut mac) => {
                mac.update(input);
                mac.verify_slice(signature).is_ok()
            }
        }
    }
}

/// Issues and verifies session tokens.
///
/// Holds only immutable state: the keyed MAC, the pinned algorithm, the
/// token lifetime, the expiry leeway and a clock.
pub struct SessionAuthority {
    mac: KeyedMac,
    algorithm: Algorithm,
    encoded_header: String,
    ttl: Duration,
    leeway: Duration,
    clock: Arc<dyn Clock>,
}

impl fmt::Debug for SessionAuthority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SessionAuthority")
            .field("algorithm", &self.algorithm)
            .field("ttl", &self.ttl)
            .field("leeway", &self.leeway)
            .finish_non_exhaustive()
    }
}

impl SessionAuthority {
    /// Create an authority with the default lifetime, no leeway and the wall clock.
    pub fn new(key: &SigningKey, algorithm: Algorithm) -> Result<Self, ConfigurationError> {
        Self::with_options(
            key,
            algorithm,
            Duration::seconds(DEFAULT_TOKEN_TTL_SECONDS),
            Duration::zero(),
            Arc::new(SystemClock),
        )
    }

    /// Create a fully configured authority.
    ///
    /// `leeway` extends the accepted window past `expires_at` to absorb clock
    /// skew between instances. Both durations are range checked with
    /// [`token_lifetime`] and [`expiry_leeway`].
    pub fn with_options(
        key: &SigningKey,
        algorithm: Algorithm,
        ttl: Duration,
        leeway: Duration,
        clock: Arc<dyn Clock>,
    ) -> Result<Self, ConfigurationError> {
        let ttl = token_lifetime(ttl.num_seconds())?;
        let leeway = expiry_leeway(leeway.num_seconds())?;

        let header = Header {
            alg: algorithm.as_str().to_string(),
            typ: Some("JWT".to_string()),
        };
        // Header is a fixed two-field struct; serialization cannot fail.
        let header_json = serde_json::to_vec(&header).unwrap_or_default();

        Ok(Self {
            mac: KeyedMac::new(algorithm, key)?,
            algorithm,
            encoded_header: BASE64URL_NOPAD.encode(&header_json),
            ttl,
            leeway,
            clock,
        })
    }

    /// The only algorithm this authority signs with and accepts
    pub fn algorithm(&self) -> Algorithm {
        self.algorithm
    }

    /// Token lifetime
    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Mint a token for an identity the caller has already authenticated.
    ///
    /// `issued_at` is now and `expires_at` is now plus the configured lifetime.
    pub fn issue(&self, subject_id: i64, subject_email: &str) -> Result<SignedToken, TokenError> {
        let now = self.clock.now();
        let expires_at = now
            .checked_add_signed(self.ttl)
            .ok_or_else(|| TokenError::Encoding("expiry is out of range".to_string()))?;
        let claims = Claims {
            subject_id,
            subject_email: subject_email.to_string(),
            issued_at: now,
            expires_at,
        };
        self.sign_claims(&claims)
    }

    fn sign_claims(&self, claims: &Claims) -> Result<SignedToken, TokenError> {
        let claims_json =
            serde_json::to_vec(claims).map_err(|e| TokenError::Encoding(e.to_string()))?;
        let signing_input = format!(
            "{}.{}",
            self.encoded_header,
            BASE64URL_NOPAD.encode(&claims_json)
        );
        let signature = self.mac.sign(signing_input.as_bytes());

        Ok(SignedToken(format!(
            "{}.{}",
            signing_input,
            BASE64URL_NOPAD.encode(&signature)
        )))
    }

    /// Verify a token and return its claims.
    ///
    /// Checks, in order: structure, pinned algorithm, signature, expiry.
    /// The algorithm is checked before the signature so a token signed under
    /// another algorithm is reported as such rather than as a bad signature.
    /// Once the header and claims decode, everything after the second `.` is
    /// the signature segment, and any defect in it is a bad signature.
    pub fn verify(&self, token: &str) -> Result<Claims, TokenError> {
        if token.is_empty() {
            return Err(TokenError::Malformed);
        }

        let mut segments = token.splitn(3, '.');
        let (Some(header_b64), Some(claims_b64), Some(signature_b64)) =
            (segments.next(), segments.next(), segments.next())
        else {
            return Err(TokenError::Malformed);
        };

        let header: Header = decode_json_segment(header_b64)?;
        if header.alg != self.algorithm.as_str() {
            return Err(TokenError::UnsupportedAlgorithm(header.alg));
        }
        let claims_json = decode_segment(claims_b64)?;

        if signature_b64.is_empty() {
            return Err(TokenError::Malformed);
        }
        let signature =
            decode_segment(signature_b64).map_err(|_| TokenError::InvalidSignature)?;
        let signing_input = &token[..header_b64.len() + 1 + claims_b64.len()];
        if !self.mac.verify(signing_input.as_bytes(), &signature) {
            return Err(TokenError::InvalidSignature);
        }

        let claims: Claims =
            serde_json::from_slice(&claims_json).map_err(|_| TokenError::Malformed)?;
        let accepted_until = claims.expires_at.checked_add_signed(self.leeway);
        match accepted_until {
            Some(deadline) if self.clock.now() <= deadline => Ok(claims),
            _ => Err(TokenError::Expired),
        }
    }
}

fn decode_segment(segment: &str) -> Result<Vec<u8>, TokenError> {
    if segment.is_empty() {
        return Err(TokenError::Malformed);
    }
    BASE64URL_NOPAD
        .decode(segment.as_bytes())
        .map_err(|_| TokenError::Malformed)
}

fn decode_json_segment<T: DeserializeOwned>(segment: &str) -> Result<T, TokenError> {
    let bytes = decode_segment(segment)?;
    serde_json::from_slice(&bytes).map_err(|_| TokenError::Malformed)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::ManualClock;
    use chrono::{TimeZone, Utc};

    const SECRET: &str = "test-secret-with-at-least-thirty-two-bytes";

    fn authority_at(algorithm: Algorithm, secret: &str) -> (SessionAuthority, Arc<ManualClock>) {
        let clock = Arc::new(ManualClock::new(Utc.timestamp_opt(1_700_000_000, 0).unwrap()));
        let key = SigningKey::new(secret).unwrap();
        let authority = SessionAuthority::with_options(
            &key,
            algorithm,
            Duration::seconds(DEFAULT_TOKEN_TTL_SECONDS),
            Duration::zero(),
            clock.clone(),
        )
        .unwrap();
        (authority, clock)
    }

    fn authority() -> (SessionAuthority, Arc<ManualClock>) {
        authority_at(Algorithm::HS256, SECRET)
    }

    /// Re-encode a token after flipping one bit of its decoded signature
    fn flip_signature_bit(token: &str, bit: usize) -> String {
        let (signing_input, signature_b64) = token.rsplit_once('.').unwrap();
        let mut signature = BASE64URL_NOPAD.decode(signature_b64.as_bytes()).unwrap();
        let idx = (bit / 8) % signature.len();
        signature[idx] ^= 1 << (bit % 8);
        format!("{}.{}", signing_input, BASE64URL_NOPAD.encode(&signature))
    }

    /// Flip one of the low seven bits of the ASCII character at `index`
    fn flip_text_bit(token: &str, index: usize, bit: usize) -> String {
        let mut bytes = token.as_bytes().to_vec();
        bytes[index] ^= 1 << bit;
        String::from_utf8(bytes).unwrap()
    }

    #[test]
    fn test_issue_then_verify_returns_same_subject() {
        let (authority, _clock) = authority();
        let token = authority.issue(7, "a@b.com").unwrap();

        let claims = authority.verify(token.as_str()).unwrap();
        assert_eq!(claims.subject_id, 7);
        assert_eq!(claims.subject_email, "a@b.com");
        assert_eq!(claims.expires_at - claims.issued_at, Duration::seconds(3600));
    }

    #[test]
    fn test_token_has_three_segments_and_pinned_header() {
        let (authority, _clock) = authority();
        let token = authority.issue(1, "x@y.z").unwrap();

        let segments: Vec<&str> = token.as_str().split('.').collect();
        assert_eq!(segments.len(), 3);
        let header: serde_json::Value =
            serde_json::from_slice(&BASE64URL_NOPAD.decode(segments[0].as_bytes()).unwrap())
                .unwrap();
        assert_eq!(header["alg"], "HS256");
        assert_eq!(header["typ"], "JWT");
    }

    #[test]
    fn test_valid_at_3599_seconds() {
        let (authority, clock) = authority();
        let token = authority.issue(7, "a@b.com").unwrap();

        clock.advance(Duration::seconds(3599));
        let claims = authority.verify(token.as_str()).unwrap();
        assert_eq!(claims.subject_id, 7);
        assert_eq!(claims.subject_email, "a@b.com");
    }

    #[test]
    fn test_expired_past_3600_seconds() {
        let (authority, clock) = authority();
        let token = authority.issue(7, "a@b.com").unwrap();

        clock.advance(Duration::seconds(3601));
        assert_eq!(authority.verify(token.as_str()), Err(TokenError::Expired));
    }

    #[test]
    fn test_leeway_extends_window() {
        let clock = Arc::new(ManualClock::new(Utc.timestamp_opt(1_700_000_000, 0).unwrap()));
        let key = SigningKey::new(SECRET).unwrap();
        let authority = SessionAuthority::with_options(
            &key,
            Algorithm::HS256,
            Duration::seconds(60),
            Duration::seconds(5),
            clock.clone(),
        )
        .unwrap();
        let token = authority.issue(3, "c@d.com").unwrap();

        clock.advance(Duration::seconds(64));
        assert!(authority.verify(token.as_str()).is_ok());
        clock.advance(Duration::seconds(2));
        assert_eq!(authority.verify(token.as_str()), Err(TokenError::Expired));
    }

    #[test]
    fn test_empty_and_garbage_are_malformed() {
        let (authority, _clock) = authority();
        assert_eq!(authority.verify(""), Err(TokenError::Malformed));
        assert_eq!(authority.verify("not-a-token"), Err(TokenError::Malformed));
        assert_eq!(authority.verify("a.b"), Err(TokenError::Malformed));
        assert_eq!(authority.verify("a.b.c.d"), Err(TokenError::Malformed));
        assert_eq!(authority.verify("!!.??.**"), Err(TokenError::Malformed));
    }

    #[test]
    fn test_empty_signature_segment_is_malformed() {
        let (authority, _clock) = authority();
        let token = authority.issue(1, "x@y.z").unwrap();
        let (signing_input, _) = token.as_str().rsplit_once('.').unwrap();

        let stripped = format!("{}.", signing_input);
        assert_eq!(authority.verify(&stripped), Err(TokenError::Malformed));
    }

    #[test]
    fn test_lifetime_and_leeway_bounds() {
        assert_eq!(token_lifetime(3600), Ok(Duration::seconds(3600)));
        assert_eq!(token_lifetime(MAX_TOKEN_TTL_SECONDS), Ok(Duration::days(30)));
        for seconds in [0, -5, MAX_TOKEN_TTL_SECONDS + 1, i64::MAX, i64::MIN] {
            assert_eq!(
                token_lifetime(seconds),
                Err(ConfigurationError::InvalidLifetime {
                    seconds,
                    maximum: MAX_TOKEN_TTL_SECONDS
                })
            );
        }

        assert_eq!(expiry_leeway(0), Ok(Duration::zero()));
        assert_eq!(expiry_leeway(MAX_LEEWAY_SECONDS), Ok(Duration::minutes(5)));
        for seconds in [-1, MAX_LEEWAY_SECONDS + 1, 9_000_000_000_000_000, i64::MAX] {
            assert_eq!(
                expiry_leeway(seconds),
                Err(ConfigurationError::InvalidLeeway {
                    seconds,
                    maximum: MAX_LEEWAY_SECONDS
                })
            );
        }
    }

    #[test]
    fn test_authority_rejects_unusable_durations() {
        let key = SigningKey::new(SECRET).unwrap();
        let build = |ttl: Duration, leeway: Duration| {
            SessionAuthority::with_options(
                &key,
                Algorithm::HS256,
                ttl,
                leeway,
                Arc::new(ManualClock::new(Utc::now())),
            )
        };

        assert!(matches!(
            build(Duration::seconds(-5), Duration::zero()),
            Err(ConfigurationError::InvalidLifetime { seconds: -5, .. })
        ));
        assert!(matches!(
            build(Duration::zero(), Duration::zero()),
            Err(ConfigurationError::InvalidLifetime { seconds: 0, .. })
        ));
        assert!(matches!(
            build(Duration::days(365), Duration::zero()),
            Err(ConfigurationError::InvalidLifetime { .. })
        ));
        assert!(matches!(
            build(Duration::hours(1), Duration::seconds(-1)),
            Err(ConfigurationError::InvalidLeeway { seconds: -1, .. })
        ));
        assert!(matches!(
            build(Duration::hours(1), Duration::days(1)),
            Err(ConfigurationError::InvalidLeeway { .. })
        ));
        assert!(build(Duration::hours(1), Duration::seconds(30)).is_ok());
    }

    #[test]
    fn test_issue_fails_when_expiry_overflows() {
        let clock = Arc::new(ManualClock::new(chrono::DateTime::<Utc>::MAX_UTC));
        let authority = SessionAuthority::with_options(
            &SigningKey::new(SECRET).unwrap(),
            Algorithm::HS256,
            Duration::hours(1),
            Duration::zero(),
            clock,
        )
        .unwrap();

        assert!(matches!(authority.issue(7, "a@b.com"), Err(TokenError::Encoding(_))));
    }

    #[test]
    fn test_flipped_signature_bit_rejected() {
        let (authority, _clock) = authority();
        let token = authority.issue(7, "a@b.com").unwrap();

        let tampered = flip_signature_bit(token.as_str(), 0);
        assert_eq!(authority.verify(&tampered), Err(TokenError::InvalidSignature));
    }

    #[test]
    fn test_every_encoded_signature_bit_flip_rejected() {
        let (authority, _clock) = authority();
        let token = authority.issue(7, "a@b.com").unwrap();
        let signature_start = token.as_str().rfind('.').unwrap() + 1;

        for index in signature_start..token.as_str().len() {
            for bit in 0..7 {
                let tampered = flip_text_bit(token.as_str(), index, bit);
                assert_eq!(
                    authority.verify(&tampered),
                    Err(TokenError::InvalidSignature),
                    "char {} bit {}: {}",
                    index,
                    bit,
                    tampered
                );
            }
        }
    }

    #[test]
    fn test_extra_dot_in_signature_is_invalid_signature() {
        let (authority, _clock) = authority();
        let token = authority.issue(7, "a@b.com").unwrap();

        let extended = format!("{}.extra", token);
        assert_eq!(authority.verify(&extended), Err(TokenError::InvalidSignature));
    }

    #[test]
    fn test_swapped_claims_rejected() {
        let (authority, _clock) = authority();
        let victim = authority.issue(1, "victim@example.com").unwrap();
        let attacker = authority.issue(2, "attacker@example.com").unwrap();

        let victim_parts: Vec<&str> = victim.as_str().split('.').collect();
        let attacker_parts: Vec<&str> = attacker.as_str().split('.').collect();
        let forged = format!("{}.{}.{}", attacker_parts[0], victim_parts[1], attacker_parts[2]);

        assert_eq!(authority.verify(&forged), Err(TokenError::InvalidSignature));
    }

    #[test]
    fn test_forged_claims_with_extended_expiry_rejected() {
        let (authority, clock) = authority();
        let token = authority.issue(7, "a@b.com").unwrap();
        let parts: Vec<&str> = token.as_str().split('.').collect();

        let forged_claims = serde_json::json!({
            "id": 7,
            "email": "a@b.com",
            "iat": 1_700_000_000i64,
            "exp": 1_900_000_000i64,
        });
        let forged = format!(
            "{}.{}.{}",
            parts[0],
            BASE64URL_NOPAD.encode(forged_claims.to_string().as_bytes()),
            parts[2]
        );

        clock.advance(Duration::seconds(7200));
        assert_eq!(authority.verify(&forged), Err(TokenError::InvalidSignature));
    }

    #[test]
    fn test_other_secret_rejected() {
        let (authority, _clock) = authority();
        let (other, _other_clock) =
            authority_at(Algorithm::HS256, "a-completely-different-secret-of-length-32+");

        let token = other.issue(7, "a@b.com").unwrap();
        assert_eq!(authority.verify(token.as_str()), Err(TokenError::InvalidSignature));
    }

    #[test]
    fn test_other_algorithm_rejected() {
        let (hs256, _c1) = authority_at(Algorithm::HS256, SECRET);
        let (hs512, _c2) = authority_at(Algorithm::HS512, SECRET);

        let token = hs512.issue(7, "a@b.com").unwrap();
        assert_eq!(
            hs256.verify(token.as_str()),
            Err(TokenError::UnsupportedAlgorithm("HS512".to_string()))
        );

        let token = hs256.issue(7, "a@b.com").unwrap();
        assert_eq!(
            hs512.verify(token.as_str()),
            Err(TokenError::UnsupportedAlgorithm("HS256".to_string()))
        );
    }

    #[test]
    fn test_alg_none_rejected() {
        let (authority, _clock) = authority();
        let token = authority.issue(7, "a@b.com").unwrap();
        let parts: Vec<&str> = token.as_str().split('.').collect();

        let none_header = BASE64URL_NOPAD.encode(br#"{"alg":"none","typ":"JWT"}"#);
        let forged = format!("{}.{}.{}", none_header, parts[1], parts[2]);
        assert_eq!(
            authority.verify(&forged),
            Err(TokenError::UnsupportedAlgorithm("none".to_string()))
        );
    }

    #[test]
    fn test_each_algorithm_round_trips() {
        for algorithm in [Algorithm::HS256, Algorithm::HS384, Algorithm::HS512] {
            let (authority, _clock) = authority_at(algorithm, SECRET);
            let token = authority.issue(11, "alg@example.com").unwrap();
            assert_eq!(authority.verify(token.as_str()).unwrap().subject_id, 11);
        }
    }

    #[test]
    fn test_debug_omits_key() {
        let (authority, _clock) = authority();
        let debug = format!("{:?}", authority);
        assert!(debug.contains("HS256"));
        assert!(!debug.contains(SECRET));
    }
}
