use connector_core::{
    config::{BlockfrostConfig, KupmiosConfig, MaestroConfig, Network, UtxorpcConfig},
    ErrorKind, Provider, Unit,
};

use super::*;
use crate::config::ProviderConfig;

fn utxorpc_config() -> ProviderConfig {
    ProviderConfig::Utxorpc(UtxorpcConfig {
        url: "http://localhost:50051".into(),
        api_key: Some("dmtr_utxorpc1xyz".into()),
        network: Network::Preview,
    })
}

#[test]
fn http_backends_connect_without_io() {
    let blockfrost = ProviderBackend::connect(&ProviderConfig::Blockfrost(BlockfrostConfig {
        network: Network::Preprod,
        project_id: "preprodABC".into(),
        base_url: None,
        submit_endpoints: vec![],
    }))
    .unwrap();

    assert_eq!(blockfrost.name(), "blockfrost");
    assert_eq!(blockfrost.network(), Network::Preprod);

    let maestro = ProviderBackend::connect(&ProviderConfig::Maestro(MaestroConfig {
        network: Network::Mainnet,
        api_key: "key".into(),
        base_url: None,
    }))
    .unwrap();

    assert_eq!(maestro.name(), "maestro");
    assert_eq!(maestro.network(), Network::Mainnet);

    let kupmios = ProviderBackend::connect(&ProviderConfig::Kupmios(KupmiosConfig {
        kupo_url: "http://localhost:1442".into(),
        ogmios_url: "ws://localhost:1337".into(),
        network: Network::Preview,
    }))
    .unwrap();

    assert_eq!(kupmios.name(), "kupmios");
    assert_eq!(kupmios.network(), Network::Preview);
}

#[test]
fn unresolvable_base_url_fails_to_connect() {
    let result = ProviderBackend::connect(&ProviderConfig::Maestro(MaestroConfig {
        network: Network::Custom(42),
        api_key: "key".into(),
        base_url: None,
    }));

    let Err(err) = result else {
        panic!("a custom network has no maestro endpoint");
    };

    assert_eq!(err.kind(), ErrorKind::InvalidInput);
}

#[tokio::test]
async fn utxorpc_channel_is_lazy() {
    let adapter = ProviderBackend::connect(&utxorpc_config()).unwrap();

    assert_eq!(adapter.name(), "utxorpc");
    assert_eq!(adapter.network(), Network::Preview);

    // both fail on input validation, before the channel is ever used
    let err = adapter.utxos_by_address("not-an-address").await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::InvalidAddress);

    let err = adapter.utxo_by_unit(&Unit::Lovelace).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::InvalidUnit);

    let err = adapter
        .delegation(connector_testing::STAKE_ADDRESS)
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::NotImplemented);
}
