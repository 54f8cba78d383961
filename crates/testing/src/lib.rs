use std::{str::FromStr, time::Duration};

use pallas::crypto::hash::{Hash, Hasher};

use connector_core::*;

pub mod pages;

#[derive(Clone)]
pub enum TestAddress {
    Alice,
    Bob,
    Carol,
    Dave,
    Eve,
    Custom(String),
}

pub const ADDRESS_TEST_VECTORS: [&str; 5] = [
    // a Shelley address with both payment and stake parts
    "addr1q9dhugez3ka82k2kgh7r2lg0j7aztr8uell46kydfwu3vk6n8w2cdu8mn2ha278q6q25a9rc6gmpfeekavuargcd32vsvxhl7e",
    // a Shelley address with only payment part
    "addr1vx2fxv2umyhttkxyxp8x0dlpdt3k6cwng5pxj3jhsydzers66hrl8",
    // a Shelley script address
    "addr1w9jx45flh83z6wuqypyash54mszwmdj8r64fydafxtfc6jgrw4rm3",
    // a preprod address with both payment and stake parts
    "addr_test1qruhen60uwzpwnnr7gjs50z2v8u9zyfw6zunet4k42zrpr54mrlv55f93rs6j48wt29w90hlxt4rvpvshe55k5r9mpvqjv2wt4",
    // a Byron address
    "37btjrVyb4KDXBNC4haBVPCrro8AQPHwvCMp3RFhhSVWwfFmZ6wwzSK6JK1hY6wHNmtrpTf1kdbva8TCneM2YsiXT7mrzT21EacHnPpz5YyUdj64na",
];

pub const STAKE_ADDRESS: &str = "stake178phkx6acpnf78fuvxn0mkew3l0fd058hzquvz7w36x4gtcccycj5";

impl TestAddress {
    pub fn ordinal(&self) -> usize {
        match self {
            TestAddress::Alice => 0,
            TestAddress::Bob => 1,
            TestAddress::Carol => 2,
            TestAddress::Dave => 3,
            TestAddress::Eve => 4,
            TestAddress::Custom(_) => 5,
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            TestAddress::Custom(addr) => addr,
            x => ADDRESS_TEST_VECTORS[x.ordinal()],
        }
    }

    pub fn to_address(&self) -> Address {
        Address::from_str(self.as_str()).unwrap()
    }
}

impl From<&str> for TestAddress {
    fn from(value: &str) -> Self {
        TestAddress::Custom(value.to_owned())
    }
}

impl From<String> for TestAddress {
    fn from(value: String) -> Self {
        TestAddress::Custom(value)
    }
}

impl From<&TestAddress> for TestAddress {
    fn from(value: &TestAddress) -> Self {
        value.clone()
    }
}

pub enum TestAsset {
    Hosky,
    Snek,
    /// the `DiscoveryValidator` token used across backend fixtures
    Discovery,
    Custom(&'static str, &'static str),
}

impl TestAsset {
    pub fn policy_hex(&self) -> &str {
        match self {
            TestAsset::Hosky => "a0028f350aaabe0545fdcb56b039bfb08e4bb4d8c4d7c3c7d481c235",
            TestAsset::Snek => "279c909f348e533da5808898f87f9a14bb2c3dfbbacccd631d927a3f",
            TestAsset::Discovery => "4a83e031d4c37fc7ca6177a2f3581a8eec2ce155da91f59cfdb3bb28",
            TestAsset::Custom(policy, _) => policy,
        }
    }

    pub fn ticker(&self) -> &str {
        match self {
            TestAsset::Hosky => "HOSKY",
            TestAsset::Snek => "SNEK",
            TestAsset::Discovery => "DiscoveryValidator",
            TestAsset::Custom(_, name) => name,
        }
    }

    pub fn name(&self) -> &[u8] {
        self.ticker().as_bytes()
    }

    pub fn policy(&self) -> PolicyId {
        Hash::from_str(self.policy_hex()).unwrap()
    }

    pub fn unit(&self) -> Unit {
        Unit::asset(self.policy(), self.name().to_vec())
    }

    /// Concatenated `policy ++ name` hex.
    pub fn unit_hex(&self) -> String {
        encode_unit(&self.policy(), &hex::encode(self.name()))
    }

    /// Dotted `policy.name` hex.
    pub fn dotted_hex(&self) -> String {
        self.unit().to_dotted()
    }
}

pub const MIN_UTXO_AMOUNT: u64 = 1_111_111;

/// `constr 0 []`
pub const UNIT_DATUM_HEX: &str = "d87980";

pub fn tx_sequence_to_hash(sequence: u64) -> TxHash {
    let mut hasher = Hasher::<256>::new();
    hasher.input(&sequence.to_le_bytes());
    hasher.finalize()
}

pub fn utxo_with_value(address: impl Into<TestAddress>, txo: TxoRef, value: Value) -> Utxo {
    let address: TestAddress = address.into();

    Utxo::new(
        txo,
        Output::PreAlonzo {
            address: address.to_address(),
            value,
        },
    )
}

pub fn lovelace_utxo(address: impl Into<TestAddress>, sequence: u64, index: u32) -> Utxo {
    utxo_with_value(
        address,
        TxoRef(tx_sequence_to_hash(sequence), index),
        Value::lovelace(MIN_UTXO_AMOUNT),
    )
}

pub fn utxo_with_inline_datum(address: impl Into<TestAddress>, txo: TxoRef) -> Utxo {
    let address: TestAddress = address.into();

    let output = builder::OutputBuilder::new(address.to_address(), Value::lovelace(MIN_UTXO_AMOUNT))
        .inline_datum_hex(Some(UNIT_DATUM_HEX))
        .and_then(|x| x.build())
        .unwrap();

    Utxo::new(txo, output)
}

/// Cancel token that fires once a deadline, set on creation, passes.
#[derive(Clone)]
pub struct ToyCancelToken {
    deadline: tokio::time::Instant,
}

impl ToyCancelToken {
    pub fn new(duration: Duration) -> Self {
        Self {
            deadline: tokio::time::Instant::now() + duration,
        }
    }
}

impl CancelToken for ToyCancelToken {
    async fn cancelled(&self) {
        tokio::time::sleep_until(self.deadline).await;
    }
}
