//! Canonical redeemer purposes.
//!
//! Each backend spells redeemer purposes its own way. Everything is folded
//! into [`RedeemerTag`]; purposes nobody recognizes are dropped.

use tracing::debug;

use crate::{EvalRedeemer, EvalReport, ExUnits, RedeemerTag};

/// Maps a backend purpose spelling onto the canonical tag.
pub fn normalize_purpose(purpose: &str) -> Option<RedeemerTag> {
    let purpose = purpose.trim().to_ascii_lowercase();
    let purpose = purpose.strip_prefix("redeemer_purpose_").unwrap_or(&purpose);

    match purpose {
        "spend" | "spending" => Some(RedeemerTag::Spend),
        "mint" | "minting" => Some(RedeemerTag::Mint),
        "cert" | "certificate" | "certifying" | "publish" => Some(RedeemerTag::Cert),
        "reward" | "rewarding" | "withdraw" | "withdrawal" => Some(RedeemerTag::Reward),
        "vote" | "voting" => Some(RedeemerTag::Vote),
        "propose" | "proposal" | "proposing" => Some(RedeemerTag::Propose),
        _ => None,
    }
}

/// Splits a `purpose:index` key, as used by Blockfrost and Ogmios style
/// evaluation results.
pub fn parse_keyed_purpose(key: &str) -> Option<(RedeemerTag, u32)> {
    let (purpose, index) = key.split_once(':')?;
    let tag = normalize_purpose(purpose)?;
    let index = index.trim().parse().ok()?;

    Some((tag, index))
}

/// Builds a report from raw `(purpose, index, units)` entries, skipping
/// unrecognized purposes.
pub fn normalize<I, S>(entries: I) -> EvalReport
where
    I: IntoIterator<Item = (S, u32, ExUnits)>,
    S: AsRef<str>,
{
    entries
        .into_iter()
        .filter_map(|(purpose, index, ex_units)| {
            let purpose = purpose.as_ref();

            match normalize_purpose(purpose) {
                Some(tag) => Some(EvalRedeemer {
                    tag,
                    index,
                    ex_units,
                }),
                None => {
                    debug!(purpose, index, "dropping redeemer with unknown purpose");
                    None
                }
            }
        })
        .collect()
}
