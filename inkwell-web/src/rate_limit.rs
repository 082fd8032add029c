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

use axum::{
    extract::{Request, State},
    http::Method,
    middleware::Next,
    response::{IntoResponse, Response},
};
use governor::{
    clock::DefaultClock,
    state::{InMemoryState, NotKeyed},
    Quota, RateLimiter,
};
use std::{num::NonZeroU32, sync::Arc};

use crate::error::AppError;

pub type SharedRateLimiter = Arc<RateLimiter<NotKeyed, InMemoryState, DefaultClock>>;

/// Create a rate limiter for login attempts. Zero is treated as one.
pub fn create_login_rate_limiter(max_attempts: u32) -> SharedRateLimiter {
    let per_minute = NonZeroU32::new(max_attempts).unwrap_or(NonZeroU32::MIN);
    Arc::new(RateLimiter::direct(Quota::per_minute(per_minute)))
}

/// Throttles login form submissions. Other requests pass through.
pub async fn login_rate_limit_middleware(
    State(limiter): State<SharedRateLimiter>,
    request: Request,
    next: Next,
) -> Response {
    if request.method() == Method::POST && limiter.check().is_err() {
        tracing::warn!("Rate limit exceeded for login");
        return AppError::too_many_requests("Too many login attempts, try again in a minute")
            .into_response();
    }
    next.run(request).await
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_create_login_rate_limiter() {
        let limiter = create_login_rate_limiter(5);

        for _ in 0..5 {
            assert!(limiter.check().is_ok());
        }

        assert!(limiter.check().is_err());
    }

    #[test]
    fn test_create_login_rate_limiter_with_zero() {
        let limiter = create_login_rate_limiter(0);

        assert!(limiter.check().is_ok());
        assert!(limiter.check().is_err());
    }
}
