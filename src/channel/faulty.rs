//! Seeded transport fault injection.
//!
//! `FaultyChannel` wraps another channel and, per command, may drop the
//! request before it reaches the store or discard the reply after the store
//! applied it. Decisions come from a `ChaCha8Rng`, so a seed replays the exact
//! same fault sequence for the same command sequence.

use super::{ChannelError, CommandChannel};
use crate::redis::{Command, RespValue};
use async_trait::async_trait;
use parking_lot::Mutex;
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use tracing::debug;

/// Per-command fault probabilities, each in `[0.0, 1.0]`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FaultConfig {
    /// Request never reaches the store
    pub drop_request: f64,
    /// Store applies the command but the reply is lost
    pub lose_response: f64,
}

impl FaultConfig {
    pub fn none() -> Self {
        FaultConfig {
            drop_request: 0.0,
            lose_response: 0.0,
        }
    }

    pub fn lossy() -> Self {
        FaultConfig {
            drop_request: 0.05,
            lose_response: 0.05,
        }
    }

    pub fn chaos() -> Self {
        FaultConfig {
            drop_request: 0.15,
            lose_response: 0.15,
        }
    }

    fn sanitized(self) -> Self {
        let clamp = |p: f64| if p.is_nan() { 0.0 } else { p.clamp(0.0, 1.0) };
        FaultConfig {
            drop_request: clamp(self.drop_request),
            lose_response: clamp(self.lose_response),
        }
    }
}

impl Default for FaultConfig {
    fn default() -> Self {
        Self::none()
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FaultStats {
    /// Commands that reached the inner channel
    pub forwarded: u64,
    pub requests_dropped: u64,
    pub responses_lost: u64,
}

impl FaultStats {
    pub fn injected(&self) -> u64 {
        self.requests_dropped + self.responses_lost
    }
}

struct FaultState {
    rng: ChaCha8Rng,
    stats: FaultStats,
}

pub struct FaultyChannel<C> {
    inner: C,
    config: FaultConfig,
    state: Mutex<FaultState>,
}

impl<C: CommandChannel> FaultyChannel<C> {
    pub fn new(inner: C, config: FaultConfig, seed: u64) -> Self {
        FaultyChannel {
            inner,
            config: config.sanitized(),
            state: Mutex::new(FaultState {
                rng: ChaCha8Rng::seed_from_u64(seed),
                stats: FaultStats::default(),
            }),
        }
    }

    pub fn stats(&self) -> FaultStats {
        self.state.lock().stats
    }

    pub fn inner(&self) -> &C {
        &self.inner
    }
}

#[async_trait]
impl<C: CommandChannel> CommandChannel for FaultyChannel<C> {
    async fn execute(&self, command: Command) -> Result<RespValue, ChannelError> {
        // Both rolls happen on every call so the stream stays aligned per command
        let (drop_request, lose_response) = {
            let mut state = self.state.lock();
            let drop_request = state.rng.gen_bool(self.config.drop_request);
            let lose_response = state.rng.gen_bool(self.config.lose_response);
            if drop_request {
                state.stats.requests_dropped += 1;
            } else {
                state.stats.forwarded += 1;
            }
            (drop_request, lose_response)
        };

        if drop_request {
            debug!(command = command.name(), "fault: request dropped");
            return Err(ChannelError::NotSent);
        }

        let reply = self.inner.execute(command.clone()).await?;
        if lose_response {
            self.state.lock().stats.responses_lost += 1;
            debug!(command = command.name(), "fault: reply lost");
            return Err(ChannelError::ResponseLost);
        }
        Ok(reply)
    }
}
