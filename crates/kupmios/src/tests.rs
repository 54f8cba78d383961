use std::{
    collections::HashMap,
    sync::{
        atomic::{AtomicUsize, Ordering},
        Mutex,
    },
    time::Duration,
};

use serde_json::json;

use connector_core::{DatumOption, ErrorKind, RedeemerTag, ScriptLanguage};
use connector_testing::{
    lovelace_utxo, tx_sequence_to_hash, TestAddress, TestAsset, ToyCancelToken, STAKE_ADDRESS,
    UNIT_DATUM_HEX,
};

use super::*;

#[derive(Default)]
struct FakeKupo {
    matches: HashMap<String, Vec<Match>>,
    datums: HashMap<String, String>,
    scripts: HashMap<String, KupoScript>,
    confirm_after: usize,
    queries: Mutex<Vec<String>>,
    tx_calls: AtomicUsize,
}

impl KupoApi for FakeKupo {
    async fn matches(&self, pattern: &Pattern, filter: &MatchFilter) -> Result<Vec<Match>, ApiError> {
        let pattern = pattern.to_string();

        self.queries
            .lock()
            .unwrap()
            .push(format!("{pattern}?{}", filter.to_query()));

        if let Some(found) = self.matches.get(&pattern) {
            return Ok(found.clone());
        }

        if let Some(tx) = pattern.strip_prefix("*@") {
            let calls = self.tx_calls.fetch_add(1, Ordering::SeqCst) + 1;

            if calls < self.confirm_after {
                return Ok(vec![]);
            }

            let mut item = kupo_match(&TestAddress::Alice, 0, 0, json!({ "coins": 1 }));
            item.transaction_id = tx.to_string();
            return Ok(vec![item]);
        }

        Ok(vec![])
    }

    async fn datum(&self, hash: &str) -> Result<Option<KupoDatum>, ApiError> {
        Ok(self.datums.get(hash).map(|x| KupoDatum { datum: x.clone() }))
    }

    async fn script(&self, hash: &str) -> Result<Option<KupoScript>, ApiError> {
        Ok(self.scripts.get(hash).cloned())
    }
}

#[derive(Default)]
struct FakeOgmios {
    results: HashMap<&'static str, Json>,
    errors: HashMap<&'static str, (i64, String, Option<Json>)>,
    calls: Mutex<Vec<(String, Option<Json>)>>,
}

impl FakeOgmios {
    fn params_of(&self, method: &str) -> Option<Json> {
        self.calls
            .lock()
            .unwrap()
            .iter()
            .find(|(x, _)| x == method)
            .and_then(|(_, params)| params.clone())
    }
}

impl OgmiosApi for FakeOgmios {
    async fn call(&self, method: &str, params: Option<Json>) -> Result<Json, ApiError> {
        self.calls.lock().unwrap().push((method.to_string(), params));

        if let Some((code, message, data)) = self.errors.get(method) {
            return Err(ApiError::rpc(*code, message.clone(), data.clone()));
        }

        self.results
            .get(method)
            .cloned()
            .ok_or_else(|| ApiError::rpc(-32601, "method not found", None))
    }
}

fn kupo_match(address: &TestAddress, sequence: u64, index: u32, value: Json) -> Match {
    serde_json::from_value(json!({
        "transaction_index": 0,
        "transaction_id": tx_sequence_to_hash(sequence).to_string(),
        "output_index": index,
        "address": address.as_str(),
        "value": value,
        "datum_hash": null,
        "script_hash": null,
        "created_at": { "slot_no": 1200, "header_hash": "00".repeat(32) },
        "spent_at": null
    }))
    .unwrap()
}

fn holding(asset: &TestAsset, quantity: u64) -> Json {
    json!({
        "coins": 1500000,
        "assets": { (asset.dotted_hex()): quantity }
    })
}

fn provider(kupo: FakeKupo, ogmios: FakeOgmios) -> Kupmios<FakeKupo, FakeOgmios> {
    Kupmios::new(kupo, ogmios, Network::Mainnet)
}

fn kupo_only(kupo: FakeKupo) -> Kupmios<FakeKupo, FakeOgmios> {
    provider(kupo, FakeOgmios::default())
}

fn ogmios_only(ogmios: FakeOgmios) -> Kupmios<FakeKupo, FakeOgmios> {
    provider(FakeKupo::default(), ogmios)
}

#[tokio::test]
async fn address_matches_are_unspent_only() {
    let alice = TestAddress::Alice;

    let kupo = FakeKupo {
        matches: HashMap::from([(
            alice.as_str().to_string(),
            vec![
                kupo_match(&alice, 1, 0, json!({ "coins": 2000000 })),
                kupo_match(&alice, 2, 1, json!({ "ada": { "lovelace": 3000000 } })),
            ],
        )]),
        ..Default::default()
    };

    let provider = kupo_only(kupo);

    let batch = provider.utxos_by_address(alice.as_str()).await.unwrap();

    assert_eq!(batch.len(), 2);
    assert!(batch.warnings.is_empty());
    assert_eq!(batch.utxos[1].output.value().coin, 3_000_000);

    let queries = provider.kupo().queries.lock().unwrap().clone();
    assert_eq!(queries, vec![format!("{}?unspent", alice.as_str())]);
}

#[tokio::test]
async fn inline_datum_is_resolved_through_kupo() {
    let bob = TestAddress::Bob;
    let hash = Datum::decode_hex(UNIT_DATUM_HEX).unwrap().hash();

    let mut item = kupo_match(&bob, 3, 0, json!({ "coins": 2000000 }));
    item.datum_hash = Some(hash.to_string());
    item.datum_type = Some("inline".into());

    let kupo = FakeKupo {
        matches: HashMap::from([(bob.as_str().to_string(), vec![item])]),
        datums: HashMap::from([(hash.to_string(), UNIT_DATUM_HEX.to_string())]),
        ..Default::default()
    };

    let batch = kupo_only(kupo).utxos_by_address(bob.as_str()).await.unwrap();

    assert!(batch.warnings.is_empty());
    assert!(matches!(
        batch.utxos[0].output.datum(),
        Some(DatumOption::Inline(_))
    ));
}

#[tokio::test]
async fn unavailable_datum_falls_back_to_hash() {
    let bob = TestAddress::Bob;

    let mut item = kupo_match(&bob, 3, 0, json!({ "coins": 2000000 }));
    item.datum_hash = Some("33".repeat(32));
    item.datum_type = Some("inline".into());

    let kupo = FakeKupo {
        matches: HashMap::from([(bob.as_str().to_string(), vec![item])]),
        ..Default::default()
    };

    let batch = kupo_only(kupo).utxos_by_address(bob.as_str()).await.unwrap();

    assert_eq!(batch.len(), 1);
    assert_eq!(batch.warnings.len(), 1);
    assert_eq!(
        batch.utxos[0].output.datum(),
        Some(&DatumOption::Hash(DatumHash::new([0x33; 32])))
    );
}

#[tokio::test]
async fn reference_scripts_are_best_effort() {
    let carol = TestAddress::Carol;
    let script = Script::new(ScriptLanguage::PlutusV2, vec![0x46, 0x01, 0x00, 0x00, 0x22, 0x49, 0x99]);

    let mut known = kupo_match(&carol, 4, 0, json!({ "coins": 9000000 }));
    known.script_hash = Some(script.hash().to_string());

    let mut unknown = kupo_match(&carol, 4, 1, json!({ "coins": 9000000 }));
    unknown.script_hash = Some("44".repeat(28));

    let kupo = FakeKupo {
        matches: HashMap::from([(carol.as_str().to_string(), vec![known, unknown])]),
        scripts: HashMap::from([(
            script.hash().to_string(),
            KupoScript {
                language: "plutus:v2".into(),
                script: hex::encode(&script.bytes),
            },
        )]),
        ..Default::default()
    };

    let batch = kupo_only(kupo).utxos_by_address(carol.as_str()).await.unwrap();

    assert_eq!(batch.len(), 2);
    assert_eq!(batch.utxos[0].output.script_ref(), Some(&script));
    assert_eq!(batch.utxos[1].output.script_ref(), None);

    assert_eq!(batch.warnings.len(), 1);
    assert_eq!(batch.warnings[0].subject, batch.utxos[1].input.to_string());
}

#[tokio::test]
async fn broken_match_is_skipped_with_warning() {
    let dave = TestAddress::Dave;

    let mut broken = kupo_match(&dave, 5, 0, json!({ "coins": 1 }));
    broken.address = "not-an-address".into();

    let kupo = FakeKupo {
        matches: HashMap::from([(
            dave.as_str().to_string(),
            vec![broken, kupo_match(&dave, 5, 1, json!({ "coins": 1 }))],
        )]),
        ..Default::default()
    };

    let batch = kupo_only(kupo).utxos_by_address(dave.as_str()).await.unwrap();

    assert_eq!(batch.len(), 1);
    assert_eq!(batch.utxos[0].input, TxoRef(tx_sequence_to_hash(5), 1));
    assert_eq!(batch.warnings.len(), 1);
    assert!(batch.warnings[0].message.starts_with("skipped"));
}

#[tokio::test]
async fn unit_quantity_is_checked_client_side() {
    let eve = TestAddress::Eve;

    let kupo = FakeKupo {
        matches: HashMap::from([(
            eve.as_str().to_string(),
            vec![
                kupo_match(&eve, 6, 0, holding(&TestAsset::Snek, 25)),
                kupo_match(&eve, 6, 1, json!({ "coins": 1000000 })),
            ],
        )]),
        ..Default::default()
    };

    let provider = kupo_only(kupo);

    let batch = provider
        .utxos_with_unit(eve.as_str(), &TestAsset::Snek.unit())
        .await
        .unwrap();

    assert_eq!(batch.len(), 1);
    assert_eq!(batch.utxos[0].output.value().quantity_of(&TestAsset::Snek.unit()), 25);

    let queries = provider.kupo().queries.lock().unwrap().clone();
    assert!(queries[0].contains(&format!("policy_id={}", TestAsset::Snek.policy_hex())));
}

#[tokio::test]
async fn unit_matches_decide_ambiguity() {
    let kupo = FakeKupo {
        matches: HashMap::from([
            (
                TestAsset::Hosky.dotted_hex(),
                vec![
                    kupo_match(&TestAddress::Alice, 7, 0, holding(&TestAsset::Hosky, 1)),
                    kupo_match(&TestAddress::Bob, 8, 0, holding(&TestAsset::Hosky, 1)),
                ],
            ),
            (
                TestAsset::Discovery.dotted_hex(),
                vec![kupo_match(&TestAddress::Carol, 9, 3, holding(&TestAsset::Discovery, 1))],
            ),
        ]),
        ..Default::default()
    };

    let provider = kupo_only(kupo);

    let err = provider.utxo_by_unit(&TestAsset::Hosky.unit()).await.unwrap_err();
    assert!(err.is_ambiguous());

    let err = provider.utxo_by_unit(&TestAsset::Snek.unit()).await.unwrap_err();
    assert!(err.is_not_found());

    let err = provider.utxo_by_unit(&Unit::Lovelace).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::InvalidUnit);

    let utxo = provider.utxo_by_unit(&TestAsset::Discovery.unit()).await.unwrap();
    assert_eq!(utxo.input, TxoRef(tx_sequence_to_hash(9), 3));
}

#[tokio::test]
async fn undecodable_value_fails_unit_lookup() {
    let snek = TestAsset::Snek;

    let mut broken = kupo_match(&TestAddress::Bob, 15, 0, json!({ "coins": 1 }));
    broken.value = serde_json::from_value(json!({
        "coins": 1,
        "assets": { "not-a-unit": 1 }
    }))
    .unwrap();

    let kupo = FakeKupo {
        matches: HashMap::from([(
            snek.dotted_hex(),
            vec![kupo_match(&TestAddress::Alice, 14, 0, holding(&snek, 1)), broken],
        )]),
        ..Default::default()
    };

    let err = kupo_only(kupo).utxo_by_unit(&snek.unit()).await.unwrap_err();

    assert_eq!(err.kind(), ErrorKind::DecodeFailed);
}

#[tokio::test]
async fn output_refs_skip_missing_and_duplicates() {
    let alice = TestAddress::Alice;
    let tx = tx_sequence_to_hash(10);
    let missing = tx_sequence_to_hash(16);

    let kupo = FakeKupo {
        matches: HashMap::from([(
            format!("*@{tx}"),
            vec![
                kupo_match(&alice, 10, 0, json!({ "coins": 1 })),
                kupo_match(&alice, 10, 2, json!({ "coins": 1 })),
                kupo_match(&alice, 10, 3, json!({ "coins": 1 })),
            ],
        )]),
        confirm_after: usize::MAX,
        ..Default::default()
    };

    let provider = kupo_only(kupo);

    let refs = vec![
        TxoRef(tx, 2),
        TxoRef(tx, 0),
        TxoRef(tx, 2),
        TxoRef(tx, 1),
        TxoRef(missing, 0),
    ];

    let batch = provider.utxos_by_output_ref(&refs).await.unwrap();

    let found: Vec<_> = batch.utxos.iter().map(|x| x.input).collect();
    assert_eq!(found, refs[..2].to_vec());

    let mut queries = provider.kupo().queries.lock().unwrap().clone();
    let mut expected = vec![format!("*@{tx}?"), format!("*@{missing}?")];
    queries.sort();
    expected.sort();
    assert_eq!(queries, expected);
}

#[tokio::test]
async fn output_refs_sharing_a_tx_take_one_query() {
    let carol = TestAddress::Carol;
    let tx = tx_sequence_to_hash(17);

    let kupo = FakeKupo {
        matches: HashMap::from([(
            format!("*@{tx}"),
            (0..4)
                .map(|i| kupo_match(&carol, 17, i, json!({ "coins": 1 })))
                .collect(),
        )]),
        ..Default::default()
    };

    let provider = kupo_only(kupo);

    let refs = vec![TxoRef(tx, 3), TxoRef(tx, 0), TxoRef(tx, 1)];

    let batch = provider.utxos_by_output_ref(&refs).await.unwrap();

    let found: Vec<_> = batch.utxos.iter().map(|x| x.input).collect();
    assert_eq!(found, refs);
    assert_eq!(provider.kupo().queries.lock().unwrap().len(), 1);
}

#[tokio::test]
async fn delegation_queries_reward_summaries() {
    let stake = StakeAddress::parse(STAKE_ADDRESS).unwrap();
    let credential = hex::encode(stake.credential());

    let ogmios = FakeOgmios {
        results: HashMap::from([(
            api::REWARD_ACCOUNT_SUMMARIES,
            json!({
                (credential.clone()): {
                    "delegate": { "id": "pool1xyz" },
                    "rewards": { "ada": { "lovelace": 42 } }
                }
            }),
        )]),
        ..Default::default()
    };

    let provider = ogmios_only(ogmios);

    let delegation = provider.delegation(STAKE_ADDRESS).await.unwrap();

    assert!(delegation.active);
    assert_eq!(delegation.pool_id, "pool1xyz");
    assert_eq!(delegation.rewards, 42);

    let params = provider
        .ogmios()
        .params_of(api::REWARD_ACCOUNT_SUMMARIES)
        .unwrap();

    let side = if stake.is_script() { "scripts" } else { "keys" };
    assert_eq!(params[side], json!([credential]));

    let err = provider
        .delegation(TestAddress::Alice.as_str())
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::InvalidAddress);
}

#[tokio::test]
async fn unknown_account_is_undelegated() {
    let ogmios = FakeOgmios {
        results: HashMap::from([(api::REWARD_ACCOUNT_SUMMARIES, json!([]))]),
        ..Default::default()
    };

    let delegation = ogmios_only(ogmios).delegation(STAKE_ADDRESS).await.unwrap();

    assert_eq!(delegation, Delegation::undelegated());
}

#[tokio::test]
async fn chain_queries() {
    let block = "ab".repeat(32);

    let ogmios = FakeOgmios {
        results: HashMap::from([
            (api::NETWORK_TIP, json!({ "slot": 140000000, "id": block })),
            (api::BLOCK_HEIGHT, json!(11000000)),
            (api::EPOCH, json!(530)),
            (
                api::GENESIS_CONFIGURATION,
                json!({
                    "era": "shelley",
                    "startTime": "2022-10-25T00:00:00Z",
                    "networkMagic": 2,
                    "activeSlotsCoefficient": "1/20",
                    "securityParameter": 432,
                    "epochLength": 86400,
                    "slotsPerKesPeriod": 129600,
                    "maxKesEvolutions": 62,
                    "slotLength": { "milliseconds": 1000 },
                    "updateQuorum": 5,
                    "maxLovelaceSupply": 45000000000000000u64
                }),
            ),
        ]),
        ..Default::default()
    };

    let provider = ogmios_only(ogmios);

    let tip = provider.tip().await.unwrap();
    assert_eq!(tip.slot, 140_000_000);
    assert_eq!(tip.height, 11_000_000);
    assert_eq!(tip.hash.to_string(), block);

    assert_eq!(provider.current_epoch().await.unwrap(), 530);

    let genesis = provider.genesis_parameters().await.unwrap();
    assert_eq!(genesis.network_magic, 2);
    assert_eq!(genesis.system_start, 1_666_656_000);
    assert_eq!(
        provider.ogmios().params_of(api::GENESIS_CONFIGURATION),
        Some(json!({ "era": "shelley" }))
    );
}

#[tokio::test]
async fn rpc_failures_surface_as_provider_errors() {
    let ogmios = FakeOgmios {
        errors: HashMap::from([(
            api::PROTOCOL_PARAMETERS,
            (-32000, "node unreachable".to_string(), None),
        )]),
        ..Default::default()
    };

    let err = ogmios_only(ogmios).protocol_parameters().await.unwrap_err();

    assert_eq!(err.kind(), ErrorKind::ProviderInternal);
}

#[tokio::test]
async fn datums_and_scripts() {
    let script = Script::new(ScriptLanguage::Native, vec![0x82, 0x01, 0x80]);
    let datum_hash = DatumHash::new([7; 32]);

    let kupo = FakeKupo {
        datums: HashMap::from([(datum_hash.to_string(), UNIT_DATUM_HEX.to_string())]),
        scripts: HashMap::from([(
            script.hash().to_string(),
            KupoScript {
                language: "native".into(),
                script: hex::encode(&script.bytes),
            },
        )]),
        ..Default::default()
    };

    let provider = kupo_only(kupo);

    let datum = provider.datum(&datum_hash).await.unwrap();
    assert_eq!(hex::encode(datum.cbor()), UNIT_DATUM_HEX);

    let err = provider.datum(&DatumHash::new([8; 32])).await.unwrap_err();
    assert!(err.is_not_found());

    assert_eq!(provider.script_by_hash(&script.hash()).await.unwrap(), script);

    let err = provider
        .script_by_hash(&ScriptHash::new([0; 28]))
        .await
        .unwrap_err();
    assert!(err.is_not_found());
}

#[tokio::test(start_paused = true)]
async fn confirmation_waits_for_a_created_match() {
    let kupo = FakeKupo {
        confirm_after: 3,
        ..Default::default()
    };

    let provider = kupo_only(kupo);

    let confirmed = provider
        .await_confirmation(
            &tx_sequence_to_hash(11),
            Duration::from_secs(1),
            ToyCancelToken::new(Duration::from_secs(60)),
        )
        .await
        .unwrap();

    assert!(confirmed);
    assert_eq!(provider.kupo().tx_calls.load(Ordering::SeqCst), 3);
}

#[tokio::test(start_paused = true)]
async fn confirmation_honours_cancel() {
    let kupo = FakeKupo {
        confirm_after: usize::MAX,
        ..Default::default()
    };

    let err = kupo_only(kupo)
        .await_confirmation(
            &tx_sequence_to_hash(11),
            Duration::ZERO,
            ToyCancelToken::new(Duration::from_secs(12)),
        )
        .await
        .unwrap_err();

    assert!(err.is_cancelled());
}

#[tokio::test]
async fn submission() {
    let hash = tx_sequence_to_hash(12);

    let ogmios = FakeOgmios {
        results: HashMap::from([(
            api::SUBMIT_TRANSACTION,
            json!({ "transaction": { "id": hash.to_string() } }),
        )]),
        ..Default::default()
    };

    let provider = ogmios_only(ogmios);

    assert_eq!(provider.submit_tx(&[0x84, 0xa4]).await.unwrap(), hash);
    assert_eq!(
        provider.ogmios().params_of(api::SUBMIT_TRANSACTION),
        Some(json!({ "transaction": { "cbor": "84a4" } }))
    );

    let ogmios = FakeOgmios {
        errors: HashMap::from([(
            api::SUBMIT_TRANSACTION,
            (
                3117,
                "the transaction contains unknown inputs".to_string(),
                Some(json!({ "ledgerFailure": "BadInputsUTxO" })),
            ),
        )]),
        ..Default::default()
    };

    let err = ogmios_only(ogmios).submit_tx(&[0x84]).await.unwrap_err();
    assert!(matches!(err, Error::BadInputs(_)));
}

#[tokio::test]
async fn evaluation_sends_additional_utxos() {
    let ogmios = FakeOgmios {
        results: HashMap::from([(
            api::EVALUATE_TRANSACTION,
            json!([
                { "validator": { "purpose": "spend", "index": 0 }, "budget": { "memory": 1700, "cpu": 476468 } },
                { "validator": { "purpose": "withdraw", "index": 0 }, "budget": { "memory": 10, "cpu": 20 } }
            ]),
        )]),
        ..Default::default()
    };

    let provider = ogmios_only(ogmios);

    let extra = lovelace_utxo(TestAddress::Bob, 13, 1);

    let report = provider.evaluate_tx(&[0x84, 0xa0], &[extra.clone()]).await.unwrap();

    assert_eq!(report.len(), 2);
    assert_eq!(report.get(RedeemerTag::Spend, 0).unwrap().steps, 476468);
    assert!(report.get(RedeemerTag::Reward, 0).is_some());

    let params = provider.ogmios().params_of(api::EVALUATE_TRANSACTION).unwrap();
    assert_eq!(params["transaction"]["cbor"], "84a0");
    assert_eq!(params["additionalUtxo"][0]["index"], 1);
    assert_eq!(
        params["additionalUtxo"][0]["transaction"]["id"],
        extra.input.hash().to_string()
    );

    let ogmios = FakeOgmios {
        errors: HashMap::from([(
            api::EVALUATE_TRANSACTION,
            (3010, "script failure".to_string(), None),
        )]),
        ..Default::default()
    };

    let err = ogmios_only(ogmios).evaluate_tx(&[0x84], &[]).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::EvaluationFailed);
}
