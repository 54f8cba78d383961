use std::{
    sync::{
        atomic::{AtomicUsize, Ordering},
        Mutex,
    },
    time::Duration,
};

use futures_util::stream;
use tonic::Status;

use connector_core::{ErrorKind, ExUnits, RedeemerTag, Value};
use connector_testing::{
    lovelace_utxo, tx_sequence_to_hash, utxo_with_value, TestAddress, TestAsset, ToyCancelToken,
    MIN_UTXO_AMOUNT,
};

use super::*;

#[derive(Default)]
struct FakeNode {
    ledger: Vec<Utxo>,
    params: Option<u5c::cardano::PParams>,
    tip: Option<(u64, u64, TxHash)>,
    submit_error: Option<Status>,
    eval_errors: Vec<String>,
    eval_redeemers: Vec<u5c::cardano::Redeemer>,
    confirm_after: usize,
    searches: Mutex<Vec<u5c::query::SearchUtxosRequest>>,
    reads: Mutex<Vec<Vec<u5c::query::TxoRef>>>,
    submitted: Mutex<Vec<Vec<u8>>>,
    wait_calls: AtomicUsize,
}

fn any_utxo(utxo: &Utxo) -> u5c::query::AnyUtxoData {
    u5c::query::AnyUtxoData {
        txo_ref: Some(mapping::to_u5c_ref(&utxo.input)),
        native_bytes: utxo.output.encode().unwrap().into(),
        parsed_state: None,
    }
}

fn matches_pattern(utxo: &Utxo, pattern: &u5c::cardano::TxOutputPattern) -> bool {
    let address_ok = match &pattern.address {
        Some(x) if !x.exact_address.is_empty() => {
            utxo.output.address().as_bytes() == x.exact_address.as_ref()
        }
        _ => true,
    };

    let asset_ok = match &pattern.asset {
        Some(x) => utxo
            .output
            .value()
            .iter_assets()
            .any(|(policy, name, _)| {
                [policy.as_slice(), name.0.as_slice()].concat() == x.asset_name.as_ref()
            }),
        None => true,
    };

    address_ok && asset_ok
}

impl UtxorpcApi for FakeNode {
    async fn read_params(&self) -> Result<u5c::query::ReadParamsResponse, ApiError> {
        let params = self
            .params
            .clone()
            .ok_or_else(|| Status::unavailable("no params yet"))?;

        Ok(u5c::query::ReadParamsResponse {
            values: Some(u5c::query::AnyChainParams {
                params: Some(u5c::query::any_chain_params::Params::Cardano(params)),
            }),
            ledger_tip: None,
        })
    }

    async fn search_utxos(
        &self,
        request: u5c::query::SearchUtxosRequest,
    ) -> Result<u5c::query::SearchUtxosResponse, ApiError> {
        self.searches.lock().unwrap().push(request.clone());

        let pattern = patterns::pattern_of(&request)
            .cloned()
            .ok_or_else(|| Status::invalid_argument("criteria too broad"))?;

        let matching = self
            .ledger
            .iter()
            .filter(|x| matches_pattern(x, &pattern))
            .collect_vec();

        let start: usize = request.start_token.parse().unwrap_or(0);
        let size = request.max_items as usize;

        let items = matching.iter().skip(start).take(size).map(|x| any_utxo(x)).collect();

        let next_token = match start + size < matching.len() {
            true => (start + size).to_string(),
            false => String::new(),
        };

        Ok(u5c::query::SearchUtxosResponse {
            items,
            ledger_tip: None,
            next_token,
        })
    }

    async fn read_utxos(
        &self,
        keys: Vec<u5c::query::TxoRef>,
    ) -> Result<u5c::query::ReadUtxosResponse, ApiError> {
        self.reads.lock().unwrap().push(keys.clone());

        let wanted: Vec<TxoRef> = keys.iter().map(|x| mapping::txo_ref(x).unwrap()).collect();

        // answered in ledger order, not request order
        let items = self
            .ledger
            .iter()
            .filter(|x| wanted.contains(&x.input))
            .map(any_utxo)
            .collect();

        Ok(u5c::query::ReadUtxosResponse {
            items,
            ledger_tip: None,
        })
    }

    async fn read_tip(&self) -> Result<u5c::sync::ReadTipResponse, ApiError> {
        Ok(u5c::sync::ReadTipResponse {
            tip: self.tip.map(|_| u5c::sync::BlockRef::default()),
            ..Default::default()
        })
    }

    async fn fetch_block(
        &self,
        _block: u5c::sync::BlockRef,
    ) -> Result<u5c::sync::FetchBlockResponse, ApiError> {
        let (slot, height, hash) = self.tip.ok_or_else(|| Status::not_found("no block"))?;

        let header = u5c::cardano::BlockHeader {
            slot,
            height,
            hash: hash.to_vec().into(),
            ..Default::default()
        };

        let block = u5c::cardano::Block {
            header: Some(header),
            ..Default::default()
        };

        Ok(u5c::sync::FetchBlockResponse {
            block: vec![u5c::sync::AnyChainBlock {
                chain: Some(u5c::sync::any_chain_block::Chain::Cardano(block)),
                ..Default::default()
            }],
        })
    }

    async fn submit_tx(&self, tx: Vec<u8>) -> Result<u5c::submit::SubmitTxResponse, ApiError> {
        if let Some(status) = &self.submit_error {
            return Err(Status::new(status.code(), status.message()).into());
        }

        self.submitted.lock().unwrap().push(tx);

        Ok(u5c::submit::SubmitTxResponse {
            r#ref: vec![tx_sequence_to_hash(12).to_vec().into()],
        })
    }

    async fn wait_for_tx(&self, tx_hash: Vec<u8>) -> Result<StageStream, ApiError> {
        let calls = self.wait_calls.fetch_add(1, Ordering::SeqCst) + 1;

        let stage = match calls < self.confirm_after {
            true => u5c::submit::Stage::Mempool,
            false => u5c::submit::Stage::Confirmed,
        };

        let update = u5c::submit::WaitForTxResponse {
            stage: stage as i32,
            r#ref: tx_hash.into(),
        };

        Ok(stream::iter(vec![Ok::<_, ApiError>(update)]).boxed())
    }

    async fn eval_tx(&self, _tx: Vec<u8>) -> Result<u5c::submit::EvalTxResponse, ApiError> {
        let eval = u5c::cardano::TxEval {
            errors: self
                .eval_errors
                .iter()
                .map(|x| u5c::cardano::EvalError { msg: x.clone() })
                .collect(),
            redeemers: self.eval_redeemers.clone(),
            ..Default::default()
        };

        Ok(u5c::submit::EvalTxResponse {
            report: vec![u5c::submit::AnyChainEval {
                chain: Some(u5c::submit::any_chain_eval::Chain::Cardano(eval)),
            }],
        })
    }
}

fn utxorpc(node: FakeNode) -> Utxorpc<FakeNode> {
    Utxorpc::new(node, Network::Preprod)
}

fn asset_utxo(address: &TestAddress, sequence: u64, asset: &TestAsset, quantity: u64) -> Utxo {
    let mut value = Value::lovelace(MIN_UTXO_AMOUNT);
    value.add(&asset.unit(), quantity);

    utxo_with_value(address, TxoRef(tx_sequence_to_hash(sequence), 0), value)
}

#[tokio::test]
async fn address_search_walks_every_page() {
    let ledger = (0..103)
        .map(|x| lovelace_utxo(TestAddress::Alice, x, 0))
        .chain([lovelace_utxo(TestAddress::Bob, 500, 0)])
        .collect();

    let provider = utxorpc(FakeNode {
        ledger,
        ..Default::default()
    });

    let batch = provider
        .utxos_by_address(TestAddress::Alice.as_str())
        .await
        .unwrap();

    assert_eq!(batch.len(), 103);
    assert!(batch.warnings.is_empty());

    let searches = provider.api().searches.lock().unwrap();
    assert_eq!(searches.len(), 2);
    assert_eq!(searches[0].start_token, "");
    assert_eq!(searches[1].start_token, "100");
}

#[tokio::test]
async fn empty_address_is_not_an_error() {
    let batch = utxorpc(FakeNode::default())
        .utxos_by_address(TestAddress::Carol.as_str())
        .await
        .unwrap();

    assert!(batch.is_empty());
}

#[tokio::test]
async fn bad_address_is_rejected_before_searching() {
    let provider = utxorpc(FakeNode::default());

    let err = provider.utxos_by_address("addr1nope").await.unwrap_err();

    assert_eq!(err.kind(), ErrorKind::InvalidAddress);
    assert!(provider.api().searches.lock().unwrap().is_empty());
}

#[tokio::test]
async fn unit_search_combines_address_and_asset() {
    let ledger = vec![
        lovelace_utxo(TestAddress::Alice, 1, 0),
        asset_utxo(&TestAddress::Alice, 2, &TestAsset::Discovery, 1),
        asset_utxo(&TestAddress::Alice, 3, &TestAsset::Hosky, 50),
        asset_utxo(&TestAddress::Bob, 4, &TestAsset::Discovery, 1),
    ];

    let provider = utxorpc(FakeNode {
        ledger,
        ..Default::default()
    });

    let batch = provider
        .utxos_with_unit(TestAddress::Alice.as_str(), &TestAsset::Discovery.unit())
        .await
        .unwrap();

    assert_eq!(batch.len(), 1);
    assert_eq!(batch.utxos[0].input.hash(), &tx_sequence_to_hash(2));

    let everything = provider
        .utxos_with_unit(TestAddress::Alice.as_str(), &Unit::Lovelace)
        .await
        .unwrap();

    assert_eq!(everything.len(), 3);
}

#[tokio::test]
async fn unit_holder_rules() {
    let single = utxorpc(FakeNode {
        ledger: vec![
            lovelace_utxo(TestAddress::Alice, 1, 0),
            asset_utxo(&TestAddress::Bob, 2, &TestAsset::Discovery, 1),
        ],
        ..Default::default()
    });

    let utxo = single.utxo_by_unit(&TestAsset::Discovery.unit()).await.unwrap();
    assert_eq!(utxo.input.hash(), &tx_sequence_to_hash(2));

    let sample = single.api().searches.lock().unwrap()[0].max_items;
    assert_eq!(sample, 2);

    let err = single.utxo_by_unit(&TestAsset::Snek.unit()).await.unwrap_err();
    assert!(err.is_not_found());

    let err = single.utxo_by_unit(&Unit::Lovelace).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::InvalidUnit);

    let two_holders = utxorpc(FakeNode {
        ledger: vec![
            asset_utxo(&TestAddress::Alice, 1, &TestAsset::Discovery, 1),
            asset_utxo(&TestAddress::Bob, 2, &TestAsset::Discovery, 1),
        ],
        ..Default::default()
    });

    let err = two_holders
        .utxo_by_unit(&TestAsset::Discovery.unit())
        .await
        .unwrap_err();

    assert!(err.is_ambiguous());

    let same_holder_twice = utxorpc(FakeNode {
        ledger: vec![
            asset_utxo(&TestAddress::Alice, 1, &TestAsset::Discovery, 1),
            asset_utxo(&TestAddress::Alice, 2, &TestAsset::Discovery, 1),
        ],
        ..Default::default()
    });

    let err = same_holder_twice
        .utxo_by_unit(&TestAsset::Discovery.unit())
        .await
        .unwrap_err();

    assert!(err.is_ambiguous());
}

#[tokio::test]
async fn output_refs_come_back_in_request_order() {
    let ledger = vec![
        lovelace_utxo(TestAddress::Alice, 1, 0),
        lovelace_utxo(TestAddress::Alice, 1, 1),
        lovelace_utxo(TestAddress::Bob, 2, 0),
    ];

    let provider = utxorpc(FakeNode {
        ledger,
        ..Default::default()
    });

    let refs = [
        TxoRef(tx_sequence_to_hash(2), 0),
        TxoRef(tx_sequence_to_hash(1), 1),
        TxoRef(tx_sequence_to_hash(2), 0),
        TxoRef(tx_sequence_to_hash(9), 0),
    ];

    let batch = provider.utxos_by_output_ref(&refs).await.unwrap();

    let found = batch.utxos.iter().map(|x| x.input).collect_vec();
    assert_eq!(found, vec![refs[0], refs[1]]);

    // duplicates are not sent twice
    let reads = provider.api().reads.lock().unwrap();
    assert_eq!(reads.len(), 1);
    assert_eq!(reads[0].len(), 3);
}

#[tokio::test]
async fn no_refs_means_no_call() {
    let provider = utxorpc(FakeNode::default());

    let batch = provider.utxos_by_output_ref(&[]).await.unwrap();

    assert!(batch.is_empty());
    assert!(provider.api().reads.lock().unwrap().is_empty());
}

#[tokio::test]
async fn chain_queries() {
    let block = tx_sequence_to_hash(77);

    let provider = utxorpc(FakeNode {
        params: Some(u5c::cardano::PParams {
            min_fee_coefficient: 44,
            max_tx_size: 16_384,
            ..Default::default()
        }),
        tip: Some((140_000_000, 11_000_000, block)),
        ..Default::default()
    });

    let params = provider.protocol_parameters().await.unwrap();
    assert_eq!(params.min_fee_coefficient, 44);
    assert_eq!(params.max_tx_size, 16_384);

    let tip = provider.tip().await.unwrap();
    assert_eq!(tip.slot, 140_000_000);
    assert_eq!(tip.height, 11_000_000);
    assert_eq!(tip.hash, block);

    assert_eq!(provider.network(), Network::Preprod);
}

#[tokio::test]
async fn unavailable_node_surfaces_as_api_error() {
    let err = utxorpc(FakeNode::default())
        .protocol_parameters()
        .await
        .unwrap_err();

    assert!(matches!(err, Error::Api { status: 503, .. }));
}

#[tokio::test]
async fn missing_tip_is_not_found() {
    let err = utxorpc(FakeNode::default()).tip().await.unwrap_err();
    assert!(err.is_not_found());
}

#[tokio::test]
async fn unsupported_queries() {
    let provider = utxorpc(FakeNode::default());

    let kinds = [
        provider.genesis_parameters().await.unwrap_err().kind(),
        provider.current_epoch().await.unwrap_err().kind(),
        provider
            .delegation(connector_testing::STAKE_ADDRESS)
            .await
            .unwrap_err()
            .kind(),
        provider
            .datum(&pallas::crypto::hash::Hash::new([1; 32]))
            .await
            .unwrap_err()
            .kind(),
        provider
            .script_by_hash(&pallas::crypto::hash::Hash::new([1; 28]))
            .await
            .unwrap_err()
            .kind(),
    ];

    assert!(kinds.iter().all(|x| *x == ErrorKind::NotImplemented));
}

#[tokio::test]
async fn submission() {
    let provider = utxorpc(FakeNode::default());

    let hash = provider.submit_tx(&[0x84, 0xa4]).await.unwrap();

    assert_eq!(hash, tx_sequence_to_hash(12));
    assert_eq!(provider.api().submitted.lock().unwrap()[0], vec![0x84, 0xa4]);

    let rejected = utxorpc(FakeNode {
        submit_error: Some(Status::invalid_argument(
            "could not process tx at index 0: BadInputsUTxO",
        )),
        ..Default::default()
    });

    let err = rejected.submit_tx(&[0x84]).await.unwrap_err();
    assert!(matches!(err, Error::BadInputs(_)));
}

#[tokio::test]
async fn evaluation() {
    let redeemer = u5c::cardano::Redeemer {
        purpose: u5c::cardano::RedeemerPurpose::Spend as i32,
        index: 0,
        ex_units: Some(u5c::cardano::ExUnits {
            steps: 1_000,
            memory: 100,
        }),
        ..Default::default()
    };

    let provider = utxorpc(FakeNode {
        eval_redeemers: vec![redeemer],
        ..Default::default()
    });

    let report = provider.evaluate_tx(&[0x84], &[]).await.unwrap();

    assert_eq!(
        report.get(RedeemerTag::Spend, 0),
        Some(&ExUnits {
            mem: 100,
            steps: 1_000
        })
    );

    let extra = [lovelace_utxo(TestAddress::Alice, 1, 0)];
    let err = provider.evaluate_tx(&[0x84], &extra).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::InvalidInput);

    let failing = utxorpc(FakeNode {
        eval_errors: vec!["validator crashed".into()],
        ..Default::default()
    });

    let err = failing.evaluate_tx(&[0x84], &[]).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::EvaluationFailed);
}

#[tokio::test(start_paused = true)]
async fn confirmation_waits_for_confirmed_stage() {
    let provider = utxorpc(FakeNode {
        confirm_after: 3,
        ..Default::default()
    });

    let confirmed = provider
        .await_confirmation(
            &tx_sequence_to_hash(11),
            Duration::from_secs(1),
            ToyCancelToken::new(Duration::from_secs(60)),
        )
        .await
        .unwrap();

    assert!(confirmed);
    assert_eq!(provider.api().wait_calls.load(Ordering::SeqCst), 3);
}

#[tokio::test(start_paused = true)]
async fn confirmation_honours_cancel() {
    let provider = utxorpc(FakeNode {
        confirm_after: usize::MAX,
        ..Default::default()
    });

    let err = provider
        .await_confirmation(
            &tx_sequence_to_hash(11),
            Duration::ZERO,
            ToyCancelToken::new(Duration::from_secs(10)),
        )
        .await
        .unwrap_err();

    assert!(err.is_cancelled());
}

#[test]
fn grpc_codes_map_to_error_kinds() {
    let kind = |status: Status| Error::from(ApiError::from(status)).kind();

    assert_eq!(kind(Status::not_found("utxo")), ErrorKind::NotFound);
    assert_eq!(kind(Status::resource_exhausted("slow down")), ErrorKind::RateLimited);
    assert_eq!(kind(Status::internal("boom")), ErrorKind::ProviderInternal);

    let err = Error::from(ApiError::from(Status::unauthenticated("bad key")));
    assert!(matches!(err, Error::Api { status: 401, .. }));
}
