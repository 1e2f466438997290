//! Owner / non-owner role.

use serde::Serialize;

/// Whether the connected signer owns the mint contract.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct Role {
    pub is_owner: bool,
}

impl Role {
    pub fn from_addresses(signer: &str, owner: &str) -> Self {
        Self {
            is_owner: addresses_match(signer, owner),
        }
    }
}

/// Case-insensitive hex address comparison (checksummed vs. lowercase forms).
pub fn addresses_match(a: &str, b: &str) -> bool {
    let a = a.trim();
    let b = b.trim();
    !a.is_empty() && a.eq_ignore_ascii_case(b)
}
