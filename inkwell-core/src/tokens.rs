// Inkwell - A multi-user blogging platform built with Rust
// Copyright (C) 2025 Inkwell Project Contributors
//
// This program is free software: you can redistribute it and/or modify
// it under the terms of the GNU Affero General Public License as
// published by the Free Software Foundation, either version 3 of the
// License, or (at your option) any later version.
//
// This program is distributed in the hope that it will be useful,
// but WITHOUT ANY WARRANTY; without even the implied warranty of
// MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the
// GNU Affero General Public License for more details.
//
// You should have received a copy of the GNU Affero General Public License
// along with this program.  If not, see <https://www.gnu.org/licenses/>.

use anyhow::{Context, Result};
use chrono::{Duration, Utc};
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};

pub const DEFAULT_TOKEN_TTL_SECS: i64 = 3600;

/// What a token authorises its bearer to do.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TokenAction {
    Confirm,
    Reset,
}

#[derive(Debug, Serialize, Deserialize)]
struct TokenClaims {
    action: TokenAction,
    uid: i64,
    iat: i64,
    exp: i64,
}

/// Issues and checks signed, time-limited tokens for account
/// confirmation and password resets.
#[derive(Clone)]
pub struct TokenSigner {
    encoding: EncodingKey,
    decoding: DecodingKey,
}

impl std::fmt::Debug for TokenSigner {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenSigner").finish_non_exhaustive()
    }
}

impl TokenSigner {
    pub fn new(secret: &str) -> Self {
        Self {
            encoding: EncodingKey::from_secret(secret.as_bytes()),
            decoding: DecodingKey::from_secret(secret.as_bytes()),
        }
    }

    pub fn generate(&self, action: TokenAction, user_id: i64, ttl: Duration) -> Result<String> {
        let now = Utc::now();
        let claims = TokenClaims {
            action,
            uid: user_id,
            iat: now.timestamp(),
            exp: (now + ttl).timestamp(),
        };

        jsonwebtoken::encode(&Header::new(Algorithm::HS256), &claims, &self.encoding)
            .context("Failed to sign token")
    }

    pub fn generate_default(&self, action: TokenAction, user_id: i64) -> Result<String> {
        self.generate(action, user_id, Duration::seconds(DEFAULT_TOKEN_TTL_SECS))
    }

    /// User id carried by a valid, unexpired token for `action`.
    pub fn decode(&self, token: &str, action: TokenAction) -> Option<i64> {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.leeway = 0;

        let data = jsonwebtoken::decode::<TokenClaims>(token, &self.decoding, &validation).ok()?;
        (data.claims.action == action).then_some(data.claims.uid)
    }

    pub fn verify(&self, token: &str, action: TokenAction, user_id: i64) -> bool {
        self.decode(token, action) == Some(user_id)
    }
}
