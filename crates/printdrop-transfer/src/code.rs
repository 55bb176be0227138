// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Transfer code issuance.

use rand::Rng;
use tracing::{debug, warn};

use printdrop_core::error::{PrintdropError, Result};
use printdrop_core::types::TransferCode;

/// Smallest issued code. Issued codes never start with a zero.
pub const CODE_MIN: u32 = 100_000;
/// Largest issued code.
pub const CODE_MAX: u32 = 999_999;

/// Draws before giving up on finding a free code.
const MAX_ATTEMPTS: usize = 10_000;

/// Pick a random code not currently in use.
///
/// `in_use` is asked about each candidate; collisions are resampled.
pub fn issue_code(in_use: impl Fn(&TransferCode) -> bool) -> Result<TransferCode> {
    let mut rng = rand::rng();
    for attempt in 0..MAX_ATTEMPTS {
        let code = TransferCode::from_number(rng.random_range(CODE_MIN..=CODE_MAX))?;
        if !in_use(&code) {
            if attempt > 0 {
                debug!(attempt, "transfer code collision resolved");
            }
            return Ok(code);
        }
    }
    warn!(attempts = MAX_ATTEMPTS, "no free transfer code found");
    Err(PrintdropError::Server("no free transfer code available".into()))
}
