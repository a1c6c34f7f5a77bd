/// Identity components derived from a row's locator URL. Any component may
/// be absent; callers treat "absent" as "leave the existing value untouched",
/// never as "blank it out".
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TokenKey {
    pub chain: Option<String>,
    pub contract: Option<String>,
    pub token_id: Option<String>,
}

impl TokenKey {
    /// The string identity used for matching: `contract + "_" + token_id`.
    /// `chain` is display metadata and never participates.
    pub fn identity(&self) -> Option<String> {
        match (&self.contract, &self.token_id) {
            (Some(contract), Some(token_id)) => Some(format!("{contract}_{token_id}")),
            _ => None,
        }
    }
}

impl std::fmt::Display for TokenKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{}/{}/{}",
            self.chain.as_deref().unwrap_or("-"),
            self.contract.as_deref().unwrap_or("-"),
            self.token_id.as_deref().unwrap_or("-"),
        )
    }
}

/// Derive (chain, contract, token_id) from a slash-delimited locator.
///
/// The components occupy fixed split positions 4, 5, 6 — the shape of a
/// marketplace asset URL like `https://host/assets/<chain>/<contract>/<id>`.
/// The token id is normalized through a float parse so identifiers supplied
/// as `"7.0"` compare equal to `"7"`. Total: a locator that is absent,
/// too short, or carries a non-numeric id yields all-absent, never an error.
pub fn parse_locator(locator: &str) -> TokenKey {
    let parts: Vec<&str> = locator.split('/').collect();
    if parts.len() < 7 {
        return TokenKey::default();
    }

    let token_id = match parts[6].trim().parse::<f64>() {
        Ok(n) if n.is_finite() => format!("{}", n.trunc() as i64),
        _ => return TokenKey::default(),
    };

    TokenKey {
        chain: Some(parts[4].to_string()),
        contract: Some(parts[5].to_string()),
        token_id: Some(token_id),
    }
}
