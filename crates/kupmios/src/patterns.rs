//! Kupo match patterns, as they appear in `/matches/{pattern}`.

use std::fmt;

use connector_core::{TxHash, TxoIdx, Unit};

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Pattern {
    Address(String),
    Asset(AssetPattern),
    OutputRef(OutputRefPattern),
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AssetPattern {
    policy: String,
    name: AssetNamePattern,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum AssetNamePattern {
    Any,
    Exact(String),
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct OutputRefPattern {
    index: OutputIndexPattern,
    tx_id: TxHash,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum OutputIndexPattern {
    Any,
    Exact(TxoIdx),
}

impl Pattern {
    pub fn address(address: &str) -> Self {
        Pattern::Address(address.to_string())
    }

    /// `None` for lovelace, which Kupo can't match on.
    pub fn asset(unit: &Unit) -> Option<Self> {
        let policy = unit.policy()?;

        let name = match unit.name_hex() {
            x if x.is_empty() => AssetNamePattern::Any,
            x => AssetNamePattern::Exact(x),
        };

        Some(Pattern::Asset(AssetPattern {
            policy: policy.to_string(),
            name,
        }))
    }

    pub fn output(tx_id: TxHash, index: TxoIdx) -> Self {
        Pattern::OutputRef(OutputRefPattern {
            index: OutputIndexPattern::Exact(index),
            tx_id,
        })
    }

    /// Every output of a transaction.
    pub fn transaction(tx_id: TxHash) -> Self {
        Pattern::OutputRef(OutputRefPattern {
            index: OutputIndexPattern::Any,
            tx_id,
        })
    }
}

impl fmt::Display for Pattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Pattern::Address(x) => f.write_str(x),
            Pattern::Asset(AssetPattern { policy, name }) => match name {
                AssetNamePattern::Any => write!(f, "{policy}.*"),
                AssetNamePattern::Exact(name) => write!(f, "{policy}.{name}"),
            },
            Pattern::OutputRef(OutputRefPattern { index, tx_id }) => match index {
                OutputIndexPattern::Any => write!(f, "*@{tx_id}"),
                OutputIndexPattern::Exact(index) => write!(f, "{index}@{tx_id}"),
            },
        }
    }
}

/// Query string flags for `/matches`.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct MatchFilter {
    pub unspent: bool,
    pub policy_id: Option<String>,
    pub asset_name: Option<String>,
}

impl MatchFilter {
    pub fn unspent() -> Self {
        Self {
            unspent: true,
            ..Default::default()
        }
    }

    pub fn with_unit(mut self, unit: &Unit) -> Self {
        if let Some(policy) = unit.policy() {
            self.policy_id = Some(policy.to_string());

            let name = unit.name_hex();
            self.asset_name = (!name.is_empty()).then_some(name);
        }

        self
    }

    pub fn to_query(&self) -> String {
        let mut parts = vec![];

        if self.unspent {
            parts.push("unspent".to_string());
        }

        if let Some(policy) = &self.policy_id {
            parts.push(format!("policy_id={policy}"));
        }

        if let Some(name) = &self.asset_name {
            parts.push(format!("asset_name={name}"));
        }

        parts.join("&")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use connector_testing::{tx_sequence_to_hash, TestAsset};

    #[test]
    fn patterns_render_like_kupo_expects() {
        let tx = tx_sequence_to_hash(1);

        assert_eq!(Pattern::output(tx, 3).to_string(), format!("3@{tx}"));
        assert_eq!(Pattern::transaction(tx).to_string(), format!("*@{tx}"));

        assert_eq!(
            Pattern::asset(&TestAsset::Snek.unit()).unwrap().to_string(),
            TestAsset::Snek.dotted_hex()
        );

        let policy_only = Unit::asset(TestAsset::Hosky.policy(), vec![]);
        assert_eq!(
            Pattern::asset(&policy_only).unwrap().to_string(),
            format!("{}.*", TestAsset::Hosky.policy_hex())
        );

        assert_eq!(Pattern::asset(&Unit::Lovelace), None);
    }

    #[test]
    fn filter_query() {
        assert_eq!(MatchFilter::unspent().to_query(), "unspent");

        let query = MatchFilter::unspent()
            .with_unit(&TestAsset::Hosky.unit())
            .to_query();

        assert_eq!(
            query,
            format!(
                "unspent&policy_id={}&asset_name={}",
                TestAsset::Hosky.policy_hex(),
                hex::encode(TestAsset::Hosky.name())
            )
        );
    }
}
