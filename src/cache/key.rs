//! Deterministic cache keys for filter requests

use serde::Serialize;
use sha2::{Digest, Sha256};

use crate::filter::{CampaignKind, FilterSpec, SendMode};

/// Hex characters kept from the digest
const KEY_LEN: usize = 32;

#[derive(Serialize)]
struct KeyMaterial<'a> {
    table: &'a str,
    filters: Vec<&'a FilterSpec>,
    campaign: &'a str,
    mode: &'static str,
}

/// Hash of the table, the filters and the mode flags.
///
/// Filters are sorted (by column, then group tag, then value) before
/// serialization, so the same set of filters gives the same key regardless of
/// the order they were submitted in.
pub fn generate_key(
    table: &str,
    filters: &[FilterSpec],
    campaign: &CampaignKind,
    mode: SendMode,
) -> String {
    let mut sorted: Vec<&FilterSpec> = filters.iter().collect();
    sorted.sort_by(|a, b| {
        a.column
            .cmp(&b.column)
            .then_with(|| a.group.cmp(&b.group))
            .then_with(|| a.value.to_string().cmp(&b.value.to_string()))
    });

    let material = KeyMaterial {
        table,
        filters: sorted,
        campaign: campaign.as_str(),
        mode: mode.suffix(),
    };
    // Serializing borrowed strings and JSON values cannot fail
    let canonical = serde_json::to_string(&material).unwrap_or_default();

    let digest = Sha256::digest(canonical.as_bytes());
    let mut key = hex::encode(digest);
    key.truncate(KEY_LEN);
    key
}
