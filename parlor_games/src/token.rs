//! Token protocol: opaque salted credentials embedded in every URL.
//!
//! Every credential in the system is a 20-hex-char digest derived from the
//! server key, the session salt and a purpose tag. Nothing secret is ever
//! stored: validation re-derives the expected token and compares in constant
//! time. Clients cache a composite restore code so a page reload can resume
//! a session without re-joining.

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::{fmt, str::FromStr};
use subtle::ConstantTimeEq;
use thiserror::Error;

/// Length of the server key in bytes.
pub const SERVER_KEY_LEN: usize = 32;

/// Length of a session salt in hex characters (8 random bytes).
pub const SALT_LEN: usize = 16;

/// Length of a derived token in hex characters.
pub const TOKEN_LEN: usize = 20;

pub type SessionId = i64;
pub type PlayerId = i64;

#[derive(Debug, Deserialize, Eq, Error, PartialEq, Serialize)]
pub enum TokenError {
    #[error("malformed token")]
    Malformed,
    #[error("bad token")]
    Forged,
}

/// Derive a 20-hex-char token from the server key, a purpose tag, the
/// session salt and the remaining identifying parts.
fn derive_token(key: &[u8; SERVER_KEY_LEN], tag: &[u8], salt: &str, parts: &[i64]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(tag);
    hasher.update(key);
    hasher.update(salt.as_bytes());
    for part in parts {
        hasher.update(part.to_string().as_bytes());
    }
    let mut token = hex::encode(hasher.finalize());
    token.truncate(TOKEN_LEN);
    token
}

#[must_use]
pub fn derive_mgmt_token(key: &[u8; SERVER_KEY_LEN], session_id: SessionId, salt: &str) -> String {
    derive_token(key, b"sessman", salt, &[session_id])
}

#[must_use]
pub fn derive_invite_token(
    key: &[u8; SERVER_KEY_LEN],
    session_id: SessionId,
    salt: &str,
) -> String {
    derive_token(key, b"session", salt, &[session_id])
}

#[must_use]
pub fn derive_player_token(
    key: &[u8; SERVER_KEY_LEN],
    session_id: SessionId,
    player_id: PlayerId,
    salt: &str,
) -> String {
    derive_token(key, b"player", salt, &[session_id, player_id])
}

/// Compare a presented token against the derived one without leaking
/// prefix-match timing.
pub fn verify_token(presented: &str, expected: &str) -> Result<(), TokenError> {
    if presented.len() != expected.len() {
        return Err(TokenError::Forged);
    }
    if presented.as_bytes().ct_eq(expected.as_bytes()).into() {
        Ok(())
    } else {
        Err(TokenError::Forged)
    }
}

fn is_hex_of_len(s: &str, len: usize) -> bool {
    s.len() == len && s.chars().all(|c| c.is_ascii_hexdigit() && !c.is_ascii_uppercase())
}

/// Shape check for a salt taken from a URL segment.
pub fn validate_salt(s: &str) -> Result<(), TokenError> {
    if is_hex_of_len(s, SALT_LEN) {
        Ok(())
    } else {
        Err(TokenError::Malformed)
    }
}

/// Shape check for a token taken from a URL segment.
pub fn validate_token_shape(s: &str) -> Result<(), TokenError> {
    if is_hex_of_len(s, TOKEN_LEN) {
        Ok(())
    } else {
        Err(TokenError::Malformed)
    }
}

fn parse_id(s: &str) -> Result<i64, TokenError> {
    if s.is_empty() || !s.chars().all(|c| c.is_ascii_digit()) {
        return Err(TokenError::Malformed);
    }
    s.parse().map_err(|_| TokenError::Malformed)
}

/// Shareable invitation: `sessionId:salt:invToken`.
///
/// Any holder may join the session. Shape is validated on parse, before any
/// storage lookup.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct InviteCode {
    pub session_id: SessionId,
    pub salt: String,
    pub token: String,
}

impl fmt::Display for InviteCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}:{}", self.session_id, self.salt, self.token)
    }
}

impl FromStr for InviteCode {
    type Err = TokenError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut parts = s.split(':');
        let (Some(id), Some(salt), Some(token), None) =
            (parts.next(), parts.next(), parts.next(), parts.next())
        else {
            return Err(TokenError::Malformed);
        };
        if !is_hex_of_len(salt, SALT_LEN) || !is_hex_of_len(token, TOKEN_LEN) {
            return Err(TokenError::Malformed);
        }
        Ok(Self {
            session_id: parse_id(id)?,
            salt: salt.to_string(),
            token: token.to_string(),
        })
    }
}

/// Client-cached composite credential:
/// `sessionId:playerId:salt:playerToken:invToken[:mgmtToken]`.
///
/// Replayed after a page reload to resume a session; the caller must still
/// confirm the session is live via the cheap existence check.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct RestoreCode {
    pub session_id: SessionId,
    pub player_id: PlayerId,
    pub salt: String,
    pub player_token: String,
    pub invite_token: String,
    pub mgmt_token: Option<String>,
}

impl RestoreCode {
    /// The invitation embedded in this restore code, used for the liveness
    /// check before resuming.
    #[must_use]
    pub fn invite(&self) -> InviteCode {
        InviteCode {
            session_id: self.session_id,
            salt: self.salt.clone(),
            token: self.invite_token.clone(),
        }
    }
}

impl fmt::Display for RestoreCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}:{}:{}:{}:{}",
            self.session_id, self.player_id, self.salt, self.player_token, self.invite_token
        )?;
        if let Some(mgmt) = &self.mgmt_token {
            write!(f, ":{mgmt}")?;
        }
        Ok(())
    }
}

impl FromStr for RestoreCode {
    type Err = TokenError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let parts: Vec<&str> = s.split(':').collect();
        if parts.len() != 5 && parts.len() != 6 {
            return Err(TokenError::Malformed);
        }
        let (id, player_id, salt, player_token, invite_token) =
            (parts[0], parts[1], parts[2], parts[3], parts[4]);
        if !is_hex_of_len(salt, SALT_LEN)
            || !is_hex_of_len(player_token, TOKEN_LEN)
            || !is_hex_of_len(invite_token, TOKEN_LEN)
        {
            return Err(TokenError::Malformed);
        }
        let mgmt_token = match parts.get(5) {
            Some(mgmt) if is_hex_of_len(mgmt, TOKEN_LEN) => Some((*mgmt).to_string()),
            Some(_) => return Err(TokenError::Malformed),
            None => None,
        };
        Ok(Self {
            session_id: parse_id(id)?,
            player_id: parse_id(player_id)?,
            salt: salt.to_string(),
            player_token: player_token.to_string(),
            invite_token: invite_token.to_string(),
            mgmt_token,
        })
    }
}

/// Generate a fresh session salt: 8 random bytes, hex-encoded.
#[must_use]
pub fn generate_salt(rng: &mut impl rand::Rng) -> String {
    let bytes: [u8; SALT_LEN / 2] = rng.random();
    hex::encode(bytes)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::{SeedableRng, rngs::StdRng};

    const KEY: [u8; SERVER_KEY_LEN] = [7; SERVER_KEY_LEN];

    #[test]
    fn tokens_are_twenty_hex_chars() {
        let salt = generate_salt(&mut StdRng::seed_from_u64(1));
        assert_eq!(salt.len(), SALT_LEN);
        for token in [
            derive_mgmt_token(&KEY, 3, &salt),
            derive_invite_token(&KEY, 3, &salt),
            derive_player_token(&KEY, 3, 12, &salt),
        ] {
            assert!(is_hex_of_len(&token, TOKEN_LEN), "bad token {token}");
        }
    }

    #[test]
    fn distinct_purposes_yield_distinct_tokens() {
        let salt = "00112233445566aa";
        assert_ne!(
            derive_mgmt_token(&KEY, 1, salt),
            derive_invite_token(&KEY, 1, salt)
        );
        assert_ne!(
            derive_invite_token(&KEY, 1, salt),
            derive_player_token(&KEY, 1, 0, salt)
        );
        assert_ne!(
            derive_invite_token(&KEY, 1, salt),
            derive_invite_token(&KEY, 2, salt)
        );
    }

    #[test]
    fn verify_rejects_forgeries() {
        let salt = "00112233445566aa";
        let real = derive_invite_token(&KEY, 1, salt);
        assert!(verify_token(&real, &real).is_ok());
        let fake = derive_invite_token(&[8; SERVER_KEY_LEN], 1, salt);
        assert_eq!(verify_token(&fake, &real), Err(TokenError::Forged));
        assert_eq!(verify_token("short", &real), Err(TokenError::Forged));
    }

    #[test]
    fn invite_code_round_trip() {
        let code = InviteCode {
            session_id: 42,
            salt: "0123456789abcdef".to_string(),
            token: "0123456789abcdef0123".to_string(),
        };
        let parsed: InviteCode = code.to_string().parse().unwrap();
        assert_eq!(parsed, code);
    }

    #[test]
    fn invite_code_rejects_bad_shapes() {
        for bad in [
            "",
            "42",
            "42:0123456789abcdef",
            "x:0123456789abcdef:0123456789abcdef0123",
            "42:0123456789ABCDEF:0123456789abcdef0123",
            "42:0123456789abcde:0123456789abcdef0123",
            "42:0123456789abcdef:0123456789abcdef012",
            "42:0123456789abcdef:0123456789abcdef0123:extra",
        ] {
            assert!(bad.parse::<InviteCode>().is_err(), "accepted {bad:?}");
        }
    }

    #[test]
    fn restore_code_round_trip_with_and_without_mgmt() {
        let mut code = RestoreCode {
            session_id: 7,
            player_id: 2,
            salt: "0123456789abcdef".to_string(),
            player_token: "aaaaaaaaaaaaaaaaaaaa".to_string(),
            invite_token: "bbbbbbbbbbbbbbbbbbbb".to_string(),
            mgmt_token: None,
        };
        let parsed: RestoreCode = code.to_string().parse().unwrap();
        assert_eq!(parsed, code);

        code.mgmt_token = Some("cccccccccccccccccccc".to_string());
        let parsed: RestoreCode = code.to_string().parse().unwrap();
        assert_eq!(parsed, code);
        assert_eq!(parsed.invite().session_id, 7);
    }

    #[test]
    fn restore_code_rejects_bad_mgmt_segment() {
        let s = "7:2:0123456789abcdef:aaaaaaaaaaaaaaaaaaaa:bbbbbbbbbbbbbbbbbbbb:nothex";
        assert!(s.parse::<RestoreCode>().is_err());
    }
}
