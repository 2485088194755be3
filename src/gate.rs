//! Deletion safety latch.
//!
//! An extra confirmation layer sitting in front of permanent deletes,
//! independent of whatever token a `DeletePlan` already carries. Issues
//! short, human-typable tokens with a TTL; one-shot consumption once
//! verified. Falls back to accepting a plan's own 32-hex-char uuid
//! token when no internal token has been issued.

use rand::Rng;
use std::sync::Mutex;
use std::time::{Duration, Instant};

use crate::error::GateError;

#[derive(Debug, Clone)]
pub struct DeletionGateConfig {
    pub enabled: bool,
    pub require_validation_mode: bool,
    pub require_token: bool,
    pub token_ttl_seconds: u64,
    pub allow_plan_uuid_token: bool,
}

impl Default for DeletionGateConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            require_validation_mode: false,
            require_token: true,
            token_ttl_seconds: 900,
            allow_plan_uuid_token: true,
        }
    }
}

#[derive(Debug, Default)]
struct GateState {
    active_token: Option<String>,
    expires_at: Option<Instant>,
    reason: String,
}

/// Mutex-guarded so a single gate instance can be shared across threads
/// (e.g. a long-lived CLI session or a server handling one request at a
/// time).
pub struct DeletionGate {
    config: DeletionGateConfig,
    state: Mutex<GateState>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TokenStatus {
    pub has_token: bool,
    pub valid: bool,
    pub expires_in_secs: u64,
    pub reason: String,
}

impl DeletionGate {
    pub fn new(config: DeletionGateConfig) -> Self {
        Self {
            config,
            state: Mutex::new(GateState::default()),
        }
    }

    /// Issue a fresh six-character uppercase hex token, replacing any
    /// currently active one.
    pub fn issue_token(&self, reason: &str) -> String {
        let bytes: [u8; 3] = rand::rng().random();
        let token: String = bytes.iter().map(|b| format!("{b:02X}")).collect();

        let ttl = self.config.token_ttl_seconds.max(10);
        let mut state = self.state.lock().expect("gate mutex poisoned");
        state.active_token = Some(token.clone());
        state.expires_at = Some(Instant::now() + Duration::from_secs(ttl));
        state.reason = reason.trim().to_string();
        token
    }

    pub fn token_status(&self) -> TokenStatus {
        let state = self.state.lock().expect("gate mutex poisoned");
        let valid = state.active_token.is_some()
            && state.expires_at.map(|exp| Instant::now() < exp).unwrap_or(false);
        let expires_in_secs = if valid {
            state
                .expires_at
                .map(|exp| exp.saturating_duration_since(Instant::now()).as_secs())
                .unwrap_or(0)
        } else {
            0
        };
        TokenStatus {
            has_token: state.active_token.is_some(),
            valid,
            expires_in_secs,
            reason: state.reason.clone(),
        }
    }

    /// Check a caller-supplied token against the active internal token,
    /// falling back to the plan-uuid acceptance rule when no internal
    /// token is active.
    pub fn verify_token(&self, token: Option<&str>) -> bool {
        let Some(token) = token else { return false };
        let token = token.trim();
        let state = self.state.lock().expect("gate mutex poisoned");

        if let Some(active) = &state.active_token {
            let not_expired = state.expires_at.map(|exp| Instant::now() < exp).unwrap_or(false);
            if !not_expired {
                return false;
            }
            return token.to_uppercase() == *active;
        }

        if self.config.allow_plan_uuid_token {
            return is_uuid_hex(token);
        }

        false
    }

    pub fn clear_token(&self) {
        let mut state = self.state.lock().expect("gate mutex poisoned");
        state.active_token = None;
        state.expires_at = None;
        state.reason.clear();
    }

    /// Check whether a deletion is currently allowed. Raises without
    /// touching the filesystem; the internal token is consumed
    /// one-shot only on success.
    pub fn assert_allowed(&self, validation_mode: bool, token: Option<&str>) -> Result<(), GateError> {
        if !self.config.enabled {
            return Ok(());
        }

        if self.config.require_validation_mode && !validation_mode {
            return Err(GateError::ValidationModeRequired);
        }

        if self.config.require_token {
            if !self.verify_token(token) {
                return Err(GateError::InvalidToken);
            }
            let had_internal_token = self.state.lock().expect("gate mutex poisoned").active_token.is_some();
            if had_internal_token {
                self.clear_token();
            }
        }

        Ok(())
    }
}

fn is_uuid_hex(token: &str) -> bool {
    token.len() == 32 && token.chars().all(|c| c.is_ascii_hexdigit())
}
