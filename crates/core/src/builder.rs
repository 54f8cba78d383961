//! Era-aware assembly of canonical outputs from backend material.

use crate::{Address, Cbor, Datum, DatumHash, DatumOption, Error, Output, Script, Value};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputEra {
    PreAlonzo,
    PostAlonzo,
}

/// An output needs the post-Alonzo shape iff it carries any datum or a
/// reference script.
pub fn decide_era(has_datum_hash: bool, has_inline_datum: bool, has_script: bool) -> OutputEra {
    if has_datum_hash || has_inline_datum || has_script {
        OutputEra::PostAlonzo
    } else {
        OutputEra::PreAlonzo
    }
}

#[derive(Debug, Clone)]
pub struct OutputBuilder {
    address: Address,
    value: Value,
    datum_hash: Option<DatumHash>,
    inline_datum: Option<Cbor>,
    script_ref: Option<Script>,
}

impl OutputBuilder {
    pub fn new(address: Address, value: Value) -> Self {
        Self {
            address,
            value,
            datum_hash: None,
            inline_datum: None,
            script_ref: None,
        }
    }

    pub fn datum_hash(mut self, hash: Option<DatumHash>) -> Self {
        self.datum_hash = hash;
        self
    }

    /// Raw CBOR of an inline datum. Takes precedence over the datum hash.
    pub fn inline_datum(mut self, cbor: Option<Cbor>) -> Self {
        self.inline_datum = cbor;
        self
    }

    pub fn inline_datum_hex(self, cbor: Option<&str>) -> Result<Self, Error> {
        let cbor = cbor.map(hex::decode).transpose()?;
        Ok(self.inline_datum(cbor))
    }

    pub fn datum_hash_hex(self, hash: Option<&str>) -> Result<Self, Error> {
        let hash = hash.map(crate::parse_hash::<32>).transpose()?;
        Ok(self.datum_hash(hash))
    }

    pub fn script_ref(mut self, script: Option<Script>) -> Self {
        self.script_ref = script;
        self
    }

    pub fn era(&self) -> OutputEra {
        decide_era(
            self.datum_hash.is_some(),
            self.inline_datum.is_some(),
            self.script_ref.is_some(),
        )
    }

    pub fn build(self) -> Result<Output, Error> {
        match self.era() {
            OutputEra::PreAlonzo => Ok(Output::PreAlonzo {
                address: self.address,
                value: self.value,
            }),
            OutputEra::PostAlonzo => {
                let datum = match (self.inline_datum, self.datum_hash) {
                    (Some(cbor), _) => DatumOption::Inline(Datum::decode(cbor)?),
                    (None, Some(hash)) => DatumOption::Hash(hash),
                    (None, None) => DatumOption::None,
                };

                Ok(Output::PostAlonzo {
                    address: self.address,
                    value: self.value,
                    datum,
                    script_ref: self.script_ref,
                })
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ScriptLanguage;
    use pallas::crypto::hash::Hash;
    use proptest::prelude::*;

    const ADDRESS: &str = "addr1vx2fxv2umyhttkxyxp8x0dlpdt3k6cwng5pxj3jhsydzers66hrl8";

    fn address() -> Address {
        Address::parse(ADDRESS).unwrap()
    }

    #[test]
    fn plain_output_is_pre_alonzo() {
        let output = OutputBuilder::new(address(), Value::lovelace(1_000_000))
            .build()
            .unwrap();

        assert!(matches!(output, Output::PreAlonzo { .. }));
        assert!(output.datum().is_none());
    }

    #[test]
    fn inline_datum_wins_over_hash() {
        let output = OutputBuilder::new(address(), Value::lovelace(1_000_000))
            .datum_hash(Some(Hash::new([9u8; 32])))
            .inline_datum(Some(vec![0xd8, 0x79, 0x80]))
            .build()
            .unwrap();

        assert!(matches!(output.datum(), Some(DatumOption::Inline(_))));
    }

    #[test]
    fn undecodable_inline_datum_fails() {
        let result = OutputBuilder::new(address(), Value::lovelace(1_000_000))
            .inline_datum(Some(vec![0xff]))
            .build();

        assert!(matches!(result, Err(Error::DecodeFailed(_))));
    }

    #[test]
    fn script_alone_forces_post_alonzo() {
        let script = Script::new(ScriptLanguage::PlutusV2, vec![0x41, 0x01]);

        let output = OutputBuilder::new(address(), Value::lovelace(1_000_000))
            .script_ref(Some(script.clone()))
            .build()
            .unwrap();

        assert_eq!(output.datum(), Some(&DatumOption::None));
        assert_eq!(output.script_ref(), Some(&script));
    }

    proptest! {
        #[test]
        fn era_decision_is_total(hash in any::<bool>(), inline in any::<bool>(), script in any::<bool>()) {
            let builder = OutputBuilder::new(address(), Value::lovelace(1))
                .datum_hash(hash.then(|| Hash::new([1u8; 32])))
                .inline_datum(inline.then(|| vec![0xd8, 0x79, 0x80]))
                .script_ref(script.then(|| Script::new(ScriptLanguage::Native, vec![0x82, 0x01, 0x80])));

            let output = builder.build().unwrap();

            prop_assert_eq!(output.is_post_alonzo(), hash || inline || script);

            match output.datum() {
                None => prop_assert!(!hash && !inline && !script),
                Some(DatumOption::Inline(_)) => prop_assert!(inline),
                Some(DatumOption::Hash(_)) => prop_assert!(hash && !inline),
                Some(DatumOption::None) => prop_assert!(!hash && !inline && script),
            }
        }
    }
}
