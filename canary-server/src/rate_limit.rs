// Copyright 2026 Canary Contributors
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! A best-effort process-wide token bucket. `RATE_LIMIT_REQUESTS` /
//! `RATE_LIMIT_WINDOW` are carried as configuration even though
//! per-client policy and auth are out of scope; on burst this logs
//! and lets the request through rather than rejecting it.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use axum::extract::{Request, State};
use axum::middleware::Next;
use axum::response::Response;

pub struct TokenBucket {
    tokens: AtomicU64,
    capacity: f64,
    refill_rate: f64,
    last_refill_ms: AtomicU64,
    start: Instant,
}

impl TokenBucket {
    pub fn new(capacity: u32, window: Duration) -> Self {
        let refill_rate = capacity as f64 / window.as_secs_f64().max(1.0);
        Self {
            tokens: AtomicU64::new((capacity as u64) * 1000),
            capacity: capacity as f64,
            refill_rate,
            last_refill_ms: AtomicU64::new(0),
            start: Instant::now(),
        }
    }

    fn refill(&self) {
        let now_ms = self.start.elapsed().as_millis() as u64;
        let last_ms = self.last_refill_ms.swap(now_ms, Ordering::Relaxed);
        let elapsed_secs = now_ms.saturating_sub(last_ms) as f64 / 1000.0;
        if elapsed_secs <= 0.0 {
            return;
        }
        let current = self.tokens.load(Ordering::Relaxed) as f64 / 1000.0;
        let refilled = (current + elapsed_secs * self.refill_rate).min(self.capacity);
        self.tokens.store((refilled * 1000.0) as u64, Ordering::Relaxed);
    }

    /// Returns `true` if a token was available and consumed.
    pub fn try_acquire(&self) -> bool {
        self.refill();
        let current = self.tokens.load(Ordering::Relaxed) as f64 / 1000.0;
        if current < 1.0 {
            return false;
        }
        self.tokens.store(((current - 1.0) * 1000.0) as u64, Ordering::Relaxed);
        true
    }
}

pub async fn rate_limit_middleware(
    State(bucket): State<Arc<TokenBucket>>,
    request: Request,
    next: Next,
) -> Response {
    if !bucket.try_acquire() {
        tracing::warn!("rate limit burst exceeded, allowing request through");
    }
    next.run(request).await
}
