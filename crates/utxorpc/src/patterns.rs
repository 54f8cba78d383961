//! `SearchUtxos` predicates.

use pallas::interop::utxorpc::spec as u5c;

use u5c::{
    cardano::{AddressPattern, AssetPattern, TxOutputPattern},
    query::{any_utxo_pattern::UtxoPattern, AnyUtxoPattern, SearchUtxosRequest, UtxoPredicate},
};

use connector_core::{Address, Unit};

/// Outputs locked at exactly `address`.
pub fn at_address(address: &Address) -> TxOutputPattern {
    TxOutputPattern {
        address: Some(AddressPattern {
            exact_address: address.as_bytes().to_vec().into(),
            ..Default::default()
        }),
        ..Default::default()
    }
}

/// Outputs holding `unit`, matched by its `policy ++ name` subject.
///
/// Lovelace has no subject and yields a pattern without an asset criterion.
pub fn holding(unit: &Unit) -> TxOutputPattern {
    TxOutputPattern {
        asset: asset(unit),
        ..Default::default()
    }
}

/// Outputs at `address` holding `unit`.
pub fn at_address_holding(address: &Address, unit: &Unit) -> TxOutputPattern {
    TxOutputPattern {
        asset: asset(unit),
        ..at_address(address)
    }
}

fn asset(unit: &Unit) -> Option<AssetPattern> {
    match unit {
        Unit::Lovelace => None,
        Unit::Asset { policy, name } => Some(AssetPattern {
            asset_name: [policy.as_slice(), name.as_slice()].concat().into(),
            ..Default::default()
        }),
    }
}

pub fn search_request(
    pattern: TxOutputPattern,
    start_token: Option<String>,
    max_items: usize,
) -> SearchUtxosRequest {
    SearchUtxosRequest {
        predicate: Some(UtxoPredicate {
            r#match: Some(AnyUtxoPattern {
                utxo_pattern: Some(UtxoPattern::Cardano(pattern)),
                ..Default::default()
            }),
            ..Default::default()
        }),
        max_items: i32::try_from(max_items).unwrap_or(i32::MAX),
        start_token: start_token.unwrap_or_default(),
        ..Default::default()
    }
}

/// The output pattern carried by a search request, if any.
pub fn pattern_of(request: &SearchUtxosRequest) -> Option<&TxOutputPattern> {
    let pattern = request.predicate.as_ref()?.r#match.as_ref()?;

    match pattern.utxo_pattern.as_ref()? {
        UtxoPattern::Cardano(x) => Some(x),
        #[allow(unreachable_patterns)]
        _ => None,
    }
}
