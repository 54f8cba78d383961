//! Aggregation of paginated and fan-out backend calls.

use std::future::Future;

use futures_util::{stream, StreamExt};
use itertools::Itertools;
use tracing::debug;

use crate::{Error, TxHash, TxoRef, UtxoBatch};

/// Page size requested from page-number paginated backends. A shorter page
/// marks the end of the data.
pub const PAGE_SIZE: usize = 100;

/// Upper bound on concurrent per-key requests.
pub const MAX_CONCURRENT_FETCHES: usize = 10;

/// One page of a cursor paginated response.
#[derive(Debug, Clone)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub next: Option<String>,
}

impl<T> Page<T> {
    pub fn last(items: Vec<T>) -> Self {
        Self { items, next: None }
    }
}

/// Walks `page=1,2,...` until a page shorter than [`PAGE_SIZE`].
///
/// A not-found answer ends the walk; on the first page that means the
/// collection is empty.
pub async fn walk_pages<T, F, Fut>(mut fetch: F) -> Result<Vec<T>, Error>
where
    F: FnMut(u32) -> Fut,
    Fut: Future<Output = Result<Vec<T>, Error>>,
{
    let mut out = Vec::new();
    let mut page = 1u32;

    loop {
        let items = match fetch(page).await {
            Ok(items) => items,
            Err(err) if err.is_not_found() => {
                debug!(page, "page not found, ending walk");
                break;
            }
            Err(err) => return Err(err.context(format!("page {page}"))),
        };

        let len = items.len();
        out.extend(items);

        if len < PAGE_SIZE {
            break;
        }

        page += 1;
    }

    Ok(out)
}

/// Follows opaque continuation tokens until one is absent or empty.
pub async fn walk_cursor<T, F, Fut>(mut fetch: F) -> Result<Vec<T>, Error>
where
    F: FnMut(Option<String>) -> Fut,
    Fut: Future<Output = Result<Page<T>, Error>>,
{
    let mut out = Vec::new();
    let mut cursor: Option<String> = None;
    let mut first = true;

    loop {
        let page = match fetch(cursor.clone()).await {
            Ok(page) => page,
            Err(err) if first && err.is_not_found() => break,
            Err(err) => return Err(err),
        };

        first = false;
        out.extend(page.items);

        match page.next {
            Some(next) if !next.is_empty() && Some(&next) != cursor.as_ref() => {
                cursor = Some(next)
            }
            _ => break,
        }
    }

    Ok(out)
}

/// Runs `fetch` for every key with at most `limit` requests in flight.
///
/// Results keep the order of `keys`. Keys answered with not-found are left
/// out; any other error aborts the remaining requests. Dropping the returned
/// future drops every pending request.
pub async fn fan_out<K, T, F, Fut>(keys: Vec<K>, limit: usize, fetch: F) -> Result<Vec<(K, T)>, Error>
where
    K: Clone + std::fmt::Display,
    F: Fn(K) -> Fut,
    Fut: Future<Output = Result<T, Error>>,
{
    let mut pending = stream::iter(keys)
        .map(|key| {
            let fut = fetch(key.clone());
            async move { (key, fut.await) }
        })
        .buffered(limit.max(1));

    let mut out = Vec::new();

    while let Some((key, result)) = pending.next().await {
        match result {
            Ok(value) => out.push((key, value)),
            Err(err) if err.is_not_found() => debug!(%key, "skipping key not found"),
            Err(err) => return Err(err.context(key)),
        }
    }

    Ok(out)
}

/// Resolves output references by fetching each distinct transaction's
/// outputs once and picking the requested indices.
pub async fn resolve_output_refs<F, Fut>(refs: &[TxoRef], fetch_outputs: F) -> Result<UtxoBatch, Error>
where
    F: Fn(TxHash) -> Fut,
    Fut: Future<Output = Result<UtxoBatch, Error>>,
{
    let hashes = refs.iter().map(|x| x.0).unique().collect_vec();

    let fetched = fan_out(hashes, MAX_CONCURRENT_FETCHES, fetch_outputs).await?;

    let mut batch = UtxoBatch::default();
    let mut outputs = Vec::new();

    for (_, tx_batch) in fetched {
        outputs.extend(tx_batch.utxos);
        batch.warnings.extend(tx_batch.warnings);
    }

    for txo in refs.iter().unique() {
        if let Some(utxo) = outputs.iter().find(|x| &x.input == txo) {
            batch.utxos.push(utxo.clone());
        }
    }

    Ok(batch)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::{
        atomic::{AtomicUsize, Ordering},
        Arc,
    };

    use pallas::crypto::hash::Hash;

    use crate::{Address, Output, Utxo, Value};

    fn utxo(hash: TxHash, index: u32) -> Utxo {
        let address =
            Address::parse("addr1vx2fxv2umyhttkxyxp8x0dlpdt3k6cwng5pxj3jhsydzers66hrl8").unwrap();

        Utxo::new(
            TxoRef(hash, index),
            Output::PreAlonzo {
                address,
                value: Value::lovelace(1_000_000 + index as u64),
            },
        )
    }

    #[tokio::test]
    async fn page_walk_collects_every_page_in_order() {
        let total = 2 * PAGE_SIZE + 7;

        let items = walk_pages(|page| async move {
            let start = (page as usize - 1) * PAGE_SIZE;
            let end = (start + PAGE_SIZE).min(total);
            Ok((start..end).collect::<Vec<_>>())
        })
        .await
        .unwrap();

        assert_eq!(items, (0..total).collect::<Vec<_>>());
    }

    #[tokio::test]
    async fn page_walk_treats_first_page_404_as_empty() {
        let items: Vec<u32> = walk_pages(|_| async { Err(Error::NotFound("address".into())) })
            .await
            .unwrap();

        assert!(items.is_empty());
    }

    #[tokio::test]
    async fn page_walk_stops_on_exact_multiple() {
        let calls = Arc::new(AtomicUsize::new(0));

        let items = walk_pages(|page| {
            calls.fetch_add(1, Ordering::SeqCst);
            async move {
                match page {
                    1 => Ok(vec![0u8; PAGE_SIZE]),
                    _ => Ok(vec![]),
                }
            }
        })
        .await
        .unwrap();

        assert_eq!(items.len(), PAGE_SIZE);
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn page_walk_propagates_other_errors() {
        let result: Result<Vec<u8>, _> = walk_pages(|page| async move {
            match page {
                1 => Ok(vec![0u8; PAGE_SIZE]),
                _ => Err(Error::RateLimited),
            }
        })
        .await;

        assert!(matches!(result, Err(Error::RateLimited)));
    }

    #[tokio::test]
    async fn cursor_walk_follows_tokens() {
        let items = walk_cursor(|cursor| async move {
            match cursor.as_deref() {
                None => Ok(Page {
                    items: vec![1, 2],
                    next: Some("a".into()),
                }),
                Some("a") => Ok(Page {
                    items: vec![3],
                    next: Some("b".into()),
                }),
                Some("b") => Ok(Page {
                    items: vec![4],
                    next: Some(String::new()),
                }),
                Some(_) => unreachable!(),
            }
        })
        .await
        .unwrap();

        assert_eq!(items, vec![1, 2, 3, 4]);
    }

    #[tokio::test]
    async fn fan_out_is_bounded() {
        let in_flight = Arc::new(AtomicUsize::new(0));
        let peak = Arc::new(AtomicUsize::new(0));

        let keys: Vec<u32> = (0..50).collect();

        let results = fan_out(keys, 4, |key| {
            let in_flight = in_flight.clone();
            let peak = peak.clone();

            async move {
                let now = in_flight.fetch_add(1, Ordering::SeqCst) + 1;
                peak.fetch_max(now, Ordering::SeqCst);
                tokio::task::yield_now().await;
                in_flight.fetch_sub(1, Ordering::SeqCst);
                Ok(key * 2)
            }
        })
        .await
        .unwrap();

        assert_eq!(results.len(), 50);
        assert!(peak.load(Ordering::SeqCst) <= 4);
        assert_eq!(results[10], (10, 20));
    }

    #[tokio::test]
    async fn output_refs_skip_missing_transactions() {
        let a = Hash::new([1u8; 32]);
        let b = Hash::new([2u8; 32]);
        let missing = Hash::new([3u8; 32]);

        let refs = vec![
            TxoRef(a, 0),
            TxoRef(a, 2),
            TxoRef(b, 1),
            TxoRef(missing, 0),
            TxoRef(a, 9),
            TxoRef(a, 0),
        ];

        let calls = Arc::new(AtomicUsize::new(0));

        let batch = resolve_output_refs(&refs, |hash| {
            calls.fetch_add(1, Ordering::SeqCst);
            async move {
                if hash == missing {
                    return Err(Error::NotFound(hash.to_string()));
                }

                Ok(UtxoBatch::from((0..3).map(|i| utxo(hash, i)).collect::<Vec<_>>()))
            }
        })
        .await
        .unwrap();

        assert_eq!(calls.load(Ordering::SeqCst), 3);

        let found: Vec<_> = batch.utxos.iter().map(|x| x.input).collect();
        assert_eq!(found, vec![TxoRef(a, 0), TxoRef(a, 2), TxoRef(b, 1)]);
    }

    #[tokio::test]
    async fn output_refs_abort_on_failure() {
        let refs = vec![TxoRef(Hash::new([1u8; 32]), 0), TxoRef(Hash::new([2u8; 32]), 0)];

        let result = resolve_output_refs(&refs, |_| async { Err(Error::ProviderInternal("boom".into())) }).await;

        assert!(matches!(result, Err(Error::ProviderInternal(_))));
    }
}
