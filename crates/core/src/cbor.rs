//! Canonical CBOR for outputs.
//!
//! Post-Alonzo outputs use the Babbage map form, pre-Alonzo outputs the
//! legacy `[address, value]` array. Decoding accepts any era and routes the
//! pieces back through the [`OutputBuilder`], so two encodings of the same
//! logical output converge to the same bytes.

use std::convert::Infallible;

use pallas::{
    codec::minicbor::{self, data::Tag, encode::Write, Encode, Encoder},
    ledger::{
        primitives::conway::{DatumOption as LedgerDatum, ScriptRef},
        traverse::{Era, MultiEraOutput},
    },
};

use crate::{
    builder::OutputBuilder, Address, AssetName, Cbor, DatumOption, Error, Output, Script,
    ScriptLanguage, Value,
};

const ENCODED_CBOR_TAG: u64 = 24;

type EncodeResult<W> = Result<(), minicbor::encode::Error<<W as Write>::Error>>;

impl<C> Encode<C> for Value {
    fn encode<W: Write>(&self, e: &mut Encoder<W>, _ctx: &mut C) -> EncodeResult<W> {
        if !self.has_assets() {
            e.u64(self.coin)?;
            return Ok(());
        }

        e.array(2)?;
        e.u64(self.coin)?;
        e.map(self.assets().len() as u64)?;

        for (policy, names) in self.assets() {
            e.bytes(policy.as_ref())?;
            e.map(names.len() as u64)?;

            for (AssetName(name), quantity) in names {
                e.bytes(name)?;
                e.u64(*quantity)?;
            }
        }

        Ok(())
    }
}

fn script_ref_cbor(script: &Script) -> Result<Cbor, minicbor::encode::Error<Infallible>> {
    let mut e = Encoder::new(Vec::new());
    e.array(2)?;
    e.u8(script.language.tag())?;

    match script.language {
        ScriptLanguage::Native => e.writer_mut().extend_from_slice(&script.bytes),
        _ => {
            e.bytes(&script.bytes)?;
        }
    }

    Ok(e.into_writer())
}

impl<C> Encode<C> for Output {
    fn encode<W: Write>(&self, e: &mut Encoder<W>, ctx: &mut C) -> EncodeResult<W> {
        match self {
            Output::PreAlonzo { address, value } => {
                e.array(2)?;
                e.bytes(address.as_bytes())?;
                value.encode(e, ctx)?;
            }
            Output::PostAlonzo {
                address,
                value,
                datum,
                script_ref,
            } => {
                let len = 2 + u64::from(!datum.is_none()) + u64::from(script_ref.is_some());
                e.map(len)?;

                e.u8(0)?;
                e.bytes(address.as_bytes())?;

                e.u8(1)?;
                value.encode(e, ctx)?;

                match datum {
                    DatumOption::None => (),
                    DatumOption::Hash(hash) => {
                        e.u8(2)?;
                        e.array(2)?;
                        e.u8(0)?;
                        e.bytes(hash.as_ref())?;
                    }
                    DatumOption::Inline(datum) => {
                        e.u8(2)?;
                        e.array(2)?;
                        e.u8(1)?;
                        e.tag(Tag::new(ENCODED_CBOR_TAG))?;
                        e.bytes(datum.cbor())?;
                    }
                }

                if let Some(script) = script_ref {
                    let inner = script_ref_cbor(script)
                        .map_err(|err| minicbor::encode::Error::message(err.to_string()))?;

                    e.u8(3)?;
                    e.tag(Tag::new(ENCODED_CBOR_TAG))?;
                    e.bytes(&inner)?;
                }
            }
        }

        Ok(())
    }
}

fn script_from_ledger(script: ScriptRef) -> Script {
    match script {
        ScriptRef::NativeScript(x) => Script::new(ScriptLanguage::Native, x.raw_cbor().to_vec()),
        ScriptRef::PlutusV1Script(x) => Script::new(ScriptLanguage::PlutusV1, x.as_ref().to_vec()),
        ScriptRef::PlutusV2Script(x) => Script::new(ScriptLanguage::PlutusV2, x.as_ref().to_vec()),
        ScriptRef::PlutusV3Script(x) => Script::new(ScriptLanguage::PlutusV3, x.as_ref().to_vec()),
    }
}

fn value_from_ledger(output: &MultiEraOutput<'_>) -> Value {
    let ledger = output.value();
    let mut value = Value::lovelace(ledger.coin());

    for policy in ledger.assets() {
        for asset in policy.assets() {
            let quantity = asset.output_coin().unwrap_or_default();
            value.add_asset(*policy.policy(), AssetName(asset.name().to_vec()), quantity);
        }
    }

    value
}

impl TryFrom<&MultiEraOutput<'_>> for Output {
    type Error = Error;

    fn try_from(output: &MultiEraOutput<'_>) -> Result<Self, Self::Error> {
        let address = Address::from_bytes(&output.address()?.to_vec())?;
        let value = value_from_ledger(output);

        let builder = OutputBuilder::new(address, value);

        let builder = match output.datum() {
            Some(LedgerDatum::Hash(hash)) => builder.datum_hash(Some(hash)),
            Some(LedgerDatum::Data(data)) => builder.inline_datum(Some(data.raw_cbor().to_vec())),
            None => builder,
        };

        builder
            .script_ref(output.script_ref().map(script_from_ledger))
            .build()
    }
}

impl Output {
    pub fn encode(&self) -> Result<Cbor, Error> {
        Ok(minicbor::to_vec(self)?)
    }

    /// Decodes an output of any era into its canonical form.
    pub fn decode(cbor: &[u8]) -> Result<Self, Error> {
        let parsed = MultiEraOutput::decode(Era::Conway, cbor)
            .or_else(|_| MultiEraOutput::decode(Era::Byron, cbor))?;

        Output::try_from(&parsed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Datum;
    use pallas::crypto::hash::Hash;

    const ADDRESS: &str = "addr1vx2fxv2umyhttkxyxp8x0dlpdt3k6cwng5pxj3jhsydzers66hrl8";

    fn address() -> Address {
        Address::parse(ADDRESS).unwrap()
    }

    #[test]
    fn lovelace_only_output_uses_legacy_array() {
        let output = Output::PreAlonzo {
            address: address(),
            value: Value::lovelace(1_000_000),
        };

        let cbor = output.encode().unwrap();

        let mut expected = vec![0x82, 0x58, address().as_bytes().len() as u8];
        expected.extend_from_slice(address().as_bytes());
        expected.extend_from_slice(&[0x1a, 0x00, 0x0f, 0x42, 0x40]);

        assert_eq!(cbor, expected);
        assert_eq!(Output::decode(&cbor).unwrap(), output);
    }

    #[test]
    fn post_alonzo_output_survives_ledger_decoding() {
        let mut value = Value::lovelace(2_000_000);
        value.add_asset(Hash::new([3u8; 28]), AssetName(b"TOKEN".to_vec()), 42);

        let output = Output::PostAlonzo {
            address: address(),
            value,
            datum: DatumOption::Inline(Datum::decode(vec![0xd8, 0x79, 0x80]).unwrap()),
            script_ref: Some(Script::new(ScriptLanguage::PlutusV2, vec![0x4d, 0x01, 0x00, 0x00])),
        };

        let cbor = output.encode().unwrap();
        let decoded = Output::decode(&cbor).unwrap();

        assert_eq!(decoded, output);
        assert_eq!(decoded.encode().unwrap(), cbor);
    }

    #[test]
    fn map_form_without_extras_becomes_pre_alonzo() {
        let mut cbor = vec![0xa2, 0x00, 0x58, address().as_bytes().len() as u8];
        cbor.extend_from_slice(address().as_bytes());
        cbor.extend_from_slice(&[0x01, 0x1a, 0x00, 0x0f, 0x42, 0x40]);

        let decoded = Output::decode(&cbor).unwrap();

        assert!(matches!(decoded, Output::PreAlonzo { .. }));
        assert_eq!(decoded.value().coin, 1_000_000);
    }

    #[test]
    fn datum_hash_is_kept() {
        let output = Output::PostAlonzo {
            address: address(),
            value: Value::lovelace(1_500_000),
            datum: DatumOption::Hash(Hash::new([7u8; 32])),
            script_ref: None,
        };

        let decoded = Output::decode(&output.encode().unwrap()).unwrap();
        assert_eq!(decoded, output);
    }
}
