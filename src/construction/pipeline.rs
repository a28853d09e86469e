//! Construction stages
//!
//! preprocess → metadata → payloads → (external signing) → combine → hash →
//! submit, with parse available on both unsigned and signed transactions.
//! No stage keeps state between calls. `metadata` and `submit` need a node;
//! without one they fail before looking at the request.

use super::intent::{
    estimate_gas, gas_price, parse_operations, required_signers, ConstructionIntent,
};
use super::options::{
    default_gas_adjustment, ConstructionMetadata, ConstructionOptions, SignerData,
};
use crate::client::{ChainClient, Height};
use crate::codec::{decode_tx, encode_tx, hash_tx, StdSignDoc, StdSignature, StdTx};
use crate::config::ChainParameters;
use crate::core::coin::parse_amount;
use crate::core::{CoinSet, CurrencyRegistry, Dec, OperationMapper};
use crate::crypto::{address_from_public_key, public_key_from_hex, sha256, verify_signature};
use crate::error::ApiError;
use crate::types::{
    AccountIdentifier, Amount, ConstructionCombineRequest, ConstructionCombineResponse,
    ConstructionDeriveRequest, ConstructionDeriveResponse, ConstructionHashRequest,
    ConstructionMetadataRequest, ConstructionMetadataResponse, ConstructionParseRequest,
    ConstructionParseResponse, ConstructionPayloadsRequest, ConstructionPayloadsResponse,
    ConstructionPreprocessRequest, ConstructionPreprocessResponse, ConstructionSubmitRequest,
    Operation, OperationStatus, PublicKey, Signature, SigningPayload, TransactionIdentifier,
    TransactionIdentifierResponse,
};
use futures::future::try_join_all;
use num_traits::Zero;
use serde_json::{json, Map, Value};
use std::str::FromStr;

/// The only supported curve
pub const CURVE_SECP256K1: &str = "secp256k1";

/// The only supported signature type
pub const SIGNATURE_ECDSA: &str = "ecdsa";

/// Construction API over an optional node connection
pub struct ConstructionService<'a, C> {
    client: Option<&'a C>,
    params: &'a ChainParameters,
    registry: CurrencyRegistry,
    mapper: OperationMapper,
}

fn decode_hex(field: &str, value: &str) -> Result<Vec<u8>, ApiError> {
    hex::decode(value).map_err(|e| ApiError::InvalidTx(format!("{}: {}", field, e)))
}

fn decode_raw_tx(field: &str, value: &str) -> Result<(Vec<u8>, StdTx), ApiError> {
    let raw = decode_hex(field, value)?;
    let tx = decode_tx(&raw)?;
    Ok((raw, tx))
}

impl<'a, C: ChainClient> ConstructionService<'a, C> {
    /// `client` is `None` in offline mode
    pub fn new(client: Option<&'a C>, params: &'a ChainParameters) -> Self {
        Self {
            client,
            params,
            registry: CurrencyRegistry,
            mapper: OperationMapper::default(),
        }
    }

    fn online(&self) -> Result<&'a C, ApiError> {
        self.client.ok_or(ApiError::UnavailableOffline)
    }

    /// Account address of a public key
    pub fn derive(
        &self,
        request: &ConstructionDeriveRequest,
    ) -> Result<ConstructionDeriveResponse, ApiError> {
        let address = self.address_of(&request.public_key, "public_key")?;
        Ok(ConstructionDeriveResponse {
            account_identifier: AccountIdentifier::new(&address),
        })
    }

    fn address_of(&self, key: &PublicKey, field: &str) -> Result<String, ApiError> {
        if key.curve_type != CURVE_SECP256K1 {
            return Err(ApiError::UnsupportedCurveType(key.curve_type.clone()));
        }
        let public_key = public_key_from_hex(&key.hex_bytes).map_err(|e| {
            ApiError::InvalidPublicKey {
                field: format!("{}.hex_bytes", field),
                reason: e.to_string(),
            }
        })?;
        address_from_public_key(&public_key, &self.params.account_prefix).map_err(|e| {
            ApiError::InvalidPublicKey {
                field: format!("{}.hex_bytes", field),
                reason: e.to_string(),
            }
        })
    }

    /// Stage 1: operations to options
    pub fn preprocess(
        &self,
        request: &ConstructionPreprocessRequest,
    ) -> Result<ConstructionPreprocessResponse, ApiError> {
        let sends = parse_operations(&request.operations, &self.registry, self.params)?;
        let metadata = request.metadata.clone().unwrap_or_default();

        let memo = match metadata.get("memo") {
            None | Some(Value::Null) => String::new(),
            Some(Value::String(memo)) => memo.clone(),
            Some(_) => return Err(ApiError::InvalidOptions(vec!["memo".to_string()])),
        };
        let gas_adjustment = match metadata.get("gas_adjustment") {
            None | Some(Value::Null) => default_gas_adjustment(),
            Some(value) => value
                .as_str()
                .and_then(|s| Dec::from_str(s).ok())
                .or_else(|| value.as_f64().and_then(|f| Dec::from_f64(f).ok()))
                .ok_or_else(|| ApiError::InvalidOptions(vec!["gas_adjustment".to_string()]))?,
        };
        let suggested_fee_multiplier = match request.suggested_fee_multiplier {
            None => Dec::one(),
            Some(multiplier) => Dec::from_f64(multiplier).map_err(|_| {
                ApiError::InvalidOptions(vec!["suggested_fee_multiplier".to_string()])
            })?,
        };
        let max_fee = request
            .max_fee
            .as_ref()
            .map(|amounts| self.max_fee(amounts))
            .transpose()?;

        let options = ConstructionOptions {
            msgs: sends
                .iter()
                .map(|send| send.to_msg())
                .collect::<Result<Vec<_>, _>>()?,
            memo,
            gas_adjustment,
            suggested_fee_multiplier,
            max_fee,
        };

        Ok(ConstructionPreprocessResponse {
            options: Some(options.to_map()),
            required_public_keys: Some(
                required_signers(&sends)
                    .iter()
                    .map(|signer| AccountIdentifier::new(signer))
                    .collect(),
            ),
        })
    }

    fn max_fee(&self, amounts: &[Amount]) -> Result<CoinSet, ApiError> {
        let mut max_fee = CoinSet::new();
        for (i, amount) in amounts.iter().enumerate() {
            let invalid = |reason: String| ApiError::InvalidCurrencyAmount {
                field: format!("max_fee[{}]", i),
                reason,
            };
            let denom = self.registry.denom(&amount.currency).ok_or_else(|| {
                invalid(format!(
                    "unrecognized currency {} with {} decimals",
                    amount.currency.symbol, amount.currency.decimals
                ))
            })?;
            let value = parse_amount(&amount.value).map_err(|e| invalid(e.to_string()))?;
            if !max_fee.amount_of(denom).is_zero() {
                return Err(invalid(format!("duplicate currency {}", amount.currency.symbol)));
            }
            max_fee = max_fee.add(&CoinSet::single(denom, value));
        }
        Ok(max_fee)
    }

    /// Stage 2: options to signer and fee metadata
    pub async fn metadata(
        &self,
        request: &ConstructionMetadataRequest,
    ) -> Result<ConstructionMetadataResponse, ApiError> {
        let client = self.online()?;
        let options = ConstructionOptions::from_map(
            &request.options.clone().unwrap_or_default(),
            &self.params.account_prefix,
        )
        .map_err(ApiError::InvalidOptions)?;

        let sends = options
            .msgs
            .iter()
            .filter_map(|msg| msg.as_send().ok().flatten())
            .collect::<Vec<_>>();
        let signers = required_signers(&sends);
        let accounts = try_join_all(
            signers
                .iter()
                .map(|signer| client.account(signer, Height::Latest)),
        )
        .await?;
        let signers = accounts
            .into_iter()
            .zip(signers)
            .map(|(account, address)| SignerData {
                address,
                account_number: account.account_number,
                sequence: account.sequence,
            })
            .collect();

        let msg_types: Vec<&str> = options.msgs.iter().map(|m| m.kind.as_str()).collect();
        let gas_wanted = estimate_gas(&msg_types, self.params, &options.gas_adjustment);
        let gas_price = gas_price(
            self.params,
            &options.suggested_fee_multiplier,
            options.max_fee.as_ref(),
            gas_wanted,
        )
        .map_err(|_| ApiError::InvalidOptions(vec!["msgs".to_string()]))?;

        let intent = ConstructionIntent {
            msgs: sends,
            memo: options.memo,
            gas_wanted,
            gas_price,
            max_fee: options.max_fee,
            required_signers: Vec::new(),
        };
        let suggested_fee = self.amounts(&intent.fee(&self.params.fee_denom));
        log::debug!(
            "metadata: gas_wanted={} gas_price={}",
            intent.gas_wanted,
            intent.gas_price
        );

        let metadata = ConstructionMetadata {
            signers,
            gas_price: intent.gas_price,
            gas_wanted: intent.gas_wanted,
            memo: intent.memo,
        };
        Ok(ConstructionMetadataResponse {
            metadata: metadata.to_map(),
            suggested_fee: Some(suggested_fee),
        })
    }

    fn amounts(&self, coins: &CoinSet) -> Vec<Amount> {
        coins
            .iter()
            .filter_map(|(denom, amount)| {
                self.registry.currency(denom).map(|currency| Amount {
                    value: amount.to_string(),
                    currency,
                })
            })
            .collect()
    }

    /// Stage 3: unsigned transaction and one signing payload per signer
    pub fn payloads(
        &self,
        request: &ConstructionPayloadsRequest,
    ) -> Result<ConstructionPayloadsResponse, ApiError> {
        let sends = parse_operations(&request.operations, &self.registry, self.params)?;
        let metadata =
            ConstructionMetadata::from_map(&request.metadata.clone().unwrap_or_default())
                .map_err(ApiError::InvalidMetadata)?;
        let signers = required_signers(&sends);

        let signer_data = signers
            .iter()
            .map(|signer| {
                metadata
                    .signers
                    .iter()
                    .find(|data| &data.address == signer)
                    .ok_or_else(|| ApiError::InvalidMetadata(vec!["signers".to_string()]))
            })
            .collect::<Result<Vec<_>, _>>()?;

        let public_keys = request.public_keys.clone().unwrap_or_default();
        let key_addresses = public_keys
            .iter()
            .enumerate()
            .map(|(i, key)| self.address_of(key, &format!("public_keys[{}]", i)))
            .collect::<Result<Vec<_>, _>>()?;
        for signer in &signers {
            if !key_addresses.contains(signer) {
                return Err(ApiError::MissingPublicKey(signer.clone()));
            }
        }

        let intent = ConstructionIntent {
            msgs: sends,
            memo: metadata.memo,
            gas_wanted: metadata.gas_wanted,
            gas_price: metadata.gas_price,
            max_fee: None,
            required_signers: signers,
        };
        let tx = intent.unsigned_tx(&self.params.fee_denom)?;
        let raw = encode_tx(&tx)?;

        let payloads = intent
            .required_signers
            .iter()
            .zip(signer_data)
            .map(|(signer, data)| -> Result<SigningPayload, ApiError> {
                let doc = StdSignDoc::new(
                    &tx,
                    &self.params.chain_id,
                    data.account_number,
                    data.sequence,
                );
                Ok(SigningPayload {
                    account_identifier: Some(AccountIdentifier::new(signer)),
                    hex_bytes: hex::encode(sha256(&doc.sign_bytes()?)),
                    signature_type: Some(SIGNATURE_ECDSA.to_string()),
                })
            })
            .collect::<Result<Vec<_>, _>>()?;

        Ok(ConstructionPayloadsResponse {
            unsigned_transaction: hex::encode(raw),
            payloads,
        })
    }

    /// Stage 4: operations (and signers) of an unsigned or signed transaction
    pub fn parse(
        &self,
        request: &ConstructionParseRequest,
    ) -> Result<ConstructionParseResponse, ApiError> {
        let (_, tx) = decode_raw_tx("transaction", &request.transaction)?;
        let operations = self.tx_operations(&tx)?;

        let account_identifier_signers = if request.signed {
            let signers = tx
                .signatures
                .iter()
                .enumerate()
                .map(|(i, sig)| {
                    let key = PublicKey {
                        hex_bytes: sig.pub_key.clone(),
                        curve_type: CURVE_SECP256K1.to_string(),
                    };
                    self.address_of(&key, &format!("signatures[{}].pub_key", i))
                        .map(|address| AccountIdentifier::new(&address))
                })
                .collect::<Result<Vec<_>, _>>()?;
            Some(signers)
        } else {
            None
        };

        let metadata = if tx.memo.is_empty() {
            None
        } else {
            let mut map = Map::new();
            map.insert("memo".to_string(), json!(tx.memo));
            Some(map)
        };

        Ok(ConstructionParseResponse {
            operations,
            account_identifier_signers,
            metadata,
        })
    }

    fn tx_operations(&self, tx: &StdTx) -> Result<Vec<Operation>, ApiError> {
        let mut operations = Vec::new();
        for send in tx.sends()? {
            let next = operations.len() as i64;
            operations.extend(self.mapper.map_transfer(
                &send.from_address,
                &send.to_address,
                &send.amount,
                OperationStatus::Empty,
                next,
            ));
        }
        Ok(operations)
    }

    /// Stage 5: attach verified signatures in signer order
    pub fn combine(
        &self,
        request: &ConstructionCombineRequest,
    ) -> Result<ConstructionCombineResponse, ApiError> {
        let (_, mut tx) = decode_raw_tx("unsigned_transaction", &request.unsigned_transaction)?;
        if !tx.signatures.is_empty() {
            return Err(ApiError::InvalidTx("transaction is already signed".to_string()));
        }
        let signers = tx.signers()?;
        if request.signatures.len() != signers.len() {
            return Err(ApiError::InvalidSignature {
                index: request.signatures.len(),
                reason: format!(
                    "expected {} signatures, got {}",
                    signers.len(),
                    request.signatures.len()
                ),
            });
        }

        let mut ordered: Vec<Option<StdSignature>> = vec![None; signers.len()];
        for (i, signature) in request.signatures.iter().enumerate() {
            let (position, std_signature) = self.verify(i, signature, &signers)?;
            if ordered[position].is_some() {
                return Err(ApiError::InvalidSignature {
                    index: i,
                    reason: format!("duplicate signature for {}", signers[position]),
                });
            }
            ordered[position] = Some(std_signature);
        }
        tx.signatures = ordered.into_iter().flatten().collect();

        Ok(ConstructionCombineResponse {
            signed_transaction: hex::encode(encode_tx(&tx)?),
        })
    }

    /// Signer position and wire form of one verified signature
    fn verify(
        &self,
        index: usize,
        signature: &Signature,
        signers: &[String],
    ) -> Result<(usize, StdSignature), ApiError> {
        let invalid = |reason: String| ApiError::InvalidSignature { index, reason };

        if signature.signature_type != SIGNATURE_ECDSA {
            return Err(invalid(format!(
                "unsupported signature type {}",
                signature.signature_type
            )));
        }
        let address =
            self.address_of(&signature.public_key, &format!("signatures[{}].public_key", index))?;
        let position = signers
            .iter()
            .position(|signer| signer == &address)
            .ok_or_else(|| invalid(format!("{} is not a required signer", address)))?;

        let public_key = public_key_from_hex(&signature.public_key.hex_bytes)
            .map_err(|e| invalid(e.to_string()))?;
        let payload = hex::decode(&signature.signing_payload.hex_bytes)
            .map_err(|e| invalid(format!("signing payload: {}", e)))?;
        let bytes = hex::decode(&signature.hex_bytes).map_err(|e| invalid(e.to_string()))?;
        if !verify_signature(&public_key, &payload, &bytes).map_err(|e| invalid(e.to_string()))? {
            return Err(invalid("signature does not verify".to_string()));
        }

        Ok((
            position,
            StdSignature {
                pub_key: signature.public_key.hex_bytes.to_lowercase(),
                signature: hex::encode(bytes),
            },
        ))
    }

    /// Stage 6: identifier of a signed transaction
    pub fn hash(
        &self,
        request: &ConstructionHashRequest,
    ) -> Result<TransactionIdentifierResponse, ApiError> {
        let (raw, _) = decode_raw_tx("signed_transaction", &request.signed_transaction)?;
        Ok(TransactionIdentifierResponse {
            transaction_identifier: TransactionIdentifier { hash: hash_tx(&raw) },
            metadata: None,
        })
    }

    /// Stage 7: broadcast, returning the identifier reported by the node
    pub async fn submit(
        &self,
        request: &ConstructionSubmitRequest,
    ) -> Result<TransactionIdentifierResponse, ApiError> {
        let client = self.online()?;
        let (raw, _) = decode_raw_tx("signed_transaction", &request.signed_transaction)?;

        let result = client.broadcast(&raw).await?;
        log::info!("broadcast transaction {}", result.hash);

        Ok(TransactionIdentifierResponse {
            transaction_identifier: TransactionIdentifier { hash: result.hash },
            metadata: None,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::{ClientError, MemoryClient};
    use crate::core::Account;
    use crate::crypto::KeyPair;
    use crate::types::{Currency, NetworkIdentifier};

    fn key(seed: u8) -> KeyPair {
        KeyPair::from_private_key_hex(&format!("{:02x}", seed).repeat(32)).unwrap()
    }

    fn address(seed: u8) -> String {
        key(seed).address("kava").unwrap()
    }

    fn public_key(seed: u8) -> PublicKey {
        PublicKey {
            hex_bytes: key(seed).public_key_hex(),
            curve_type: CURVE_SECP256K1.to_string(),
        }
    }

    fn network() -> NetworkIdentifier {
        NetworkIdentifier {
            blockchain: "Kava".to_string(),
            network: "kava-test".to_string(),
        }
    }

    fn params() -> ChainParameters {
        ChainParameters::kava("kava-test")
    }

    fn client() -> MemoryClient {
        MemoryClient::new("kava-test")
            .with_account(Account::base(&address(1), 42, 7, "5000000ukava".parse().unwrap()))
            .with_account(Account::base(&address(3), 43, 0, "10hard".parse().unwrap()))
    }

    fn transfer_ops(coins: &str) -> Vec<Operation> {
        OperationMapper::default().map_transfer(
            &address(1),
            &address(2),
            &coins.parse().unwrap(),
            OperationStatus::Empty,
            0,
        )
    }

    fn preprocess_request(ops: Vec<Operation>) -> ConstructionPreprocessRequest {
        ConstructionPreprocessRequest {
            network_identifier: network(),
            operations: ops,
            metadata: None,
            max_fee: None,
            suggested_fee_multiplier: None,
        }
    }

    fn payloads_request(
        ops: Vec<Operation>,
        metadata: Map<String, Value>,
        keys: Vec<PublicKey>,
    ) -> ConstructionPayloadsRequest {
        ConstructionPayloadsRequest {
            network_identifier: network(),
            operations: ops,
            metadata: Some(metadata),
            public_keys: Some(keys),
        }
    }

    async fn run_to_payloads(
        service: &ConstructionService<'_, MemoryClient>,
        ops: Vec<Operation>,
        keys: Vec<PublicKey>,
    ) -> ConstructionPayloadsResponse {
        let pre = service.preprocess(&preprocess_request(ops.clone())).unwrap();
        let meta = service
            .metadata(&ConstructionMetadataRequest {
                network_identifier: network(),
                options: pre.options,
                public_keys: Some(keys.clone()),
            })
            .await
            .unwrap();
        service
            .payloads(&payloads_request(ops, meta.metadata, keys))
            .unwrap()
    }

    fn sign(payload: &SigningPayload, seed: u8) -> Signature {
        let bytes = hex::decode(&payload.hex_bytes).unwrap();
        Signature {
            signing_payload: payload.clone(),
            public_key: public_key(seed),
            signature_type: SIGNATURE_ECDSA.to_string(),
            hex_bytes: hex::encode(key(seed).sign(&bytes).unwrap()),
        }
    }

    #[test]
    fn test_derive() {
        let params = params();
        let service = ConstructionService::<MemoryClient>::new(None, &params);
        let response = service
            .derive(&ConstructionDeriveRequest {
                network_identifier: network(),
                public_key: public_key(1),
                metadata: None,
            })
            .unwrap();
        assert_eq!(response.account_identifier.address, address(1));

        let mut edwards = public_key(1);
        edwards.curve_type = "edwards25519".to_string();
        let result = service.derive(&ConstructionDeriveRequest {
            network_identifier: network(),
            public_key: edwards,
            metadata: None,
        });
        assert!(matches!(result, Err(ApiError::UnsupportedCurveType(_))));

        let mut garbage = public_key(1);
        garbage.hex_bytes = "02ff".to_string();
        let result = service.derive(&ConstructionDeriveRequest {
            network_identifier: network(),
            public_key: garbage,
            metadata: None,
        });
        assert!(matches!(result, Err(ApiError::InvalidPublicKey { .. })));
    }

    #[test]
    fn test_preprocess_without_operations() {
        let params = params();
        let service = ConstructionService::<MemoryClient>::new(None, &params);
        let result = service.preprocess(&preprocess_request(Vec::new()));
        assert_eq!(result.unwrap_err(), ApiError::NoOperations);
    }

    #[test]
    fn test_preprocess_options() {
        let params = params();
        let service = ConstructionService::<MemoryClient>::new(None, &params);
        let mut request = preprocess_request(transfer_ops("100ukava"));
        request.max_fee = Some(vec![Amount {
            value: "2500".to_string(),
            currency: Currency::new("KAVA", 6),
        }]);
        request.metadata = Some(
            json!({"memo": "invoice 7", "gas_adjustment": "1.2"})
                .as_object()
                .unwrap()
                .clone(),
        );

        let response = service.preprocess(&request).unwrap();
        let options = ConstructionOptions::from_map(&response.options.unwrap(), "kava").unwrap();
        assert_eq!(options.memo, "invoice 7");
        assert_eq!(options.suggested_fee_multiplier, Dec::one());
        assert_eq!(options.max_fee, Some("2500ukava".parse().unwrap()));
        assert_eq!(
            response.required_public_keys.unwrap(),
            vec![AccountIdentifier::new(&address(1))]
        );
    }

    #[test]
    fn test_preprocess_validates_max_fee() {
        let params = params();
        let service = ConstructionService::<MemoryClient>::new(None, &params);
        for (value, currency) in [
            ("2500", Currency::new("KAVA", 8)),
            ("2.5", Currency::new("KAVA", 6)),
            ("-1", Currency::new("KAVA", 6)),
        ] {
            let mut request = preprocess_request(transfer_ops("100ukava"));
            request.max_fee = Some(vec![Amount {
                value: value.to_string(),
                currency,
            }]);
            assert!(matches!(
                service.preprocess(&request),
                Err(ApiError::InvalidCurrencyAmount { .. })
            ));
        }
    }

    #[tokio::test]
    async fn test_offline_rejects_online_stages() {
        let params = params();
        let service = ConstructionService::<MemoryClient>::new(None, &params);

        // Rejected before the (empty) options are looked at
        let metadata = service
            .metadata(&ConstructionMetadataRequest {
                network_identifier: network(),
                options: None,
                public_keys: None,
            })
            .await;
        assert_eq!(metadata.unwrap_err(), ApiError::UnavailableOffline);

        let submit = service
            .submit(&ConstructionSubmitRequest {
                network_identifier: network(),
                signed_transaction: "zz".to_string(),
            })
            .await;
        assert_eq!(submit.unwrap_err(), ApiError::UnavailableOffline);
    }

    #[tokio::test]
    async fn test_metadata_reports_bad_options() {
        let client = client();
        let params = params();
        let service = ConstructionService::new(Some(&client), &params);

        let options = json!({"msgs": "send", "gas_adjustment": "1.0"})
            .as_object()
            .unwrap()
            .clone();
        let result = service
            .metadata(&ConstructionMetadataRequest {
                network_identifier: network(),
                options: Some(options),
                public_keys: None,
            })
            .await;
        match result {
            Err(ApiError::InvalidOptions(mut fields)) => {
                fields.sort();
                assert_eq!(fields, vec!["msgs", "suggested_fee_multiplier"]);
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_metadata_rejects_malformed_addresses_before_reading() {
        let client = client();
        let params = params();
        let service = ConstructionService::new(Some(&client), &params);

        let pre = service
            .preprocess(&preprocess_request(transfer_ops("100ukava")))
            .unwrap();
        let mut options = pre.options.unwrap();
        options["msgs"][0]["value"]["from_address"] =
            json!(format!("{} HTTP/1.1\r\nX-Injected: 1", address(1)));

        let result = service
            .metadata(&ConstructionMetadataRequest {
                network_identifier: network(),
                options: Some(options),
                public_keys: None,
            })
            .await;
        match result {
            Err(ApiError::InvalidOptions(fields)) => assert_eq!(fields, vec!["msgs"]),
            other => panic!("unexpected {:?}", other),
        }
        assert!(client.reads().await.is_empty());
    }

    #[tokio::test]
    async fn test_metadata_signers_and_fee() {
        let client = client();
        let params = params();
        let service = ConstructionService::new(Some(&client), &params);

        let pre = service
            .preprocess(&preprocess_request(transfer_ops("100ukava")))
            .unwrap();
        let meta = service
            .metadata(&ConstructionMetadataRequest {
                network_identifier: network(),
                options: pre.options,
                public_keys: None,
            })
            .await
            .unwrap();

        let metadata = ConstructionMetadata::from_map(&meta.metadata).unwrap();
        assert_eq!(metadata.gas_wanted, 100_000);
        assert_eq!(metadata.gas_price, Dec::from_str("0.001").unwrap());
        assert_eq!(
            metadata.signers,
            vec![SignerData {
                address: address(1),
                account_number: 42,
                sequence: 7,
            }]
        );
        let fee = meta.suggested_fee.unwrap();
        assert_eq!(fee[0].value, "100");
        assert_eq!(fee[0].currency.symbol, "KAVA");
    }

    #[tokio::test]
    async fn test_max_fee_caps_the_suggested_fee() {
        let client = client();
        let params = params();
        let service = ConstructionService::new(Some(&client), &params);

        let mut request = preprocess_request(transfer_ops("100ukava"));
        request.suggested_fee_multiplier = Some(10.0);
        request.max_fee = Some(vec![Amount {
            value: "333".to_string(),
            currency: Currency::new("KAVA", 6),
        }]);
        let pre = service.preprocess(&request).unwrap();
        let meta = service
            .metadata(&ConstructionMetadataRequest {
                network_identifier: network(),
                options: pre.options,
                public_keys: None,
            })
            .await
            .unwrap();

        assert_eq!(meta.suggested_fee.unwrap()[0].value, "333");
    }

    #[tokio::test]
    async fn test_metadata_chain_errors() {
        let client = client().failing_with(ClientError::Request("refused".to_string()));
        let params = params();
        let service = ConstructionService::new(Some(&client), &params);
        let pre = service
            .preprocess(&preprocess_request(transfer_ops("100ukava")))
            .unwrap();
        let result = service
            .metadata(&ConstructionMetadataRequest {
                network_identifier: network(),
                options: pre.options,
                public_keys: None,
            })
            .await;
        assert!(matches!(result, Err(ApiError::Chain(_))));
    }

    #[tokio::test]
    async fn test_parse_payloads_round_trip() {
        let client = client();
        let params = params();
        let service = ConstructionService::new(Some(&client), &params);

        for coins in ["1ukava", "750000ukava", "5hard,20ukava"] {
            let ops = transfer_ops(coins);
            let payloads = run_to_payloads(&service, ops.clone(), vec![public_key(1)]).await;
            assert_eq!(payloads.payloads.len(), 1);
            assert_eq!(
                payloads.payloads[0].account_identifier,
                Some(AccountIdentifier::new(&address(1)))
            );

            let parsed = service
                .parse(&ConstructionParseRequest {
                    network_identifier: network(),
                    signed: false,
                    transaction: payloads.unsigned_transaction,
                })
                .unwrap();
            assert_eq!(parsed.operations, ops);
            assert!(parsed.account_identifier_signers.is_none());
        }
    }

    #[tokio::test]
    async fn test_payloads_missing_public_key() {
        let client = client();
        let params = params();
        let service = ConstructionService::new(Some(&client), &params);
        let ops = transfer_ops("10ukava");
        let pre = service.preprocess(&preprocess_request(ops.clone())).unwrap();
        let meta = service
            .metadata(&ConstructionMetadataRequest {
                network_identifier: network(),
                options: pre.options,
                public_keys: None,
            })
            .await
            .unwrap();

        let none = service.payloads(&payloads_request(ops.clone(), meta.metadata.clone(), vec![]));
        assert_eq!(none.unwrap_err(), ApiError::MissingPublicKey(address(1)));

        let wrong = service.payloads(&payloads_request(ops, meta.metadata, vec![public_key(9)]));
        assert_eq!(wrong.unwrap_err(), ApiError::MissingPublicKey(address(1)));
    }

    #[tokio::test]
    async fn test_payloads_rejects_bad_metadata() {
        let client = client();
        let params = params();
        let service = ConstructionService::new(Some(&client), &params);
        let result = service.payloads(&payloads_request(
            transfer_ops("10ukava"),
            json!({"gas_price": "0.001"}).as_object().unwrap().clone(),
            vec![public_key(1)],
        ));
        match result {
            Err(ApiError::InvalidMetadata(fields)) => {
                assert_eq!(fields, vec!["signers", "gas_wanted"]);
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_combine_hash_submit() {
        let client = client();
        let params = params();
        let service = ConstructionService::new(Some(&client), &params);

        // Two signers: address(1) and address(3)
        let mut ops = transfer_ops("10ukava");
        ops.extend(OperationMapper::default().map_transfer(
            &address(3),
            &address(2),
            &"1hard".parse().unwrap(),
            OperationStatus::Empty,
            2,
        ));
        let payloads = run_to_payloads(&service, ops, vec![public_key(3), public_key(1)]).await;
        assert_eq!(payloads.payloads.len(), 2);

        // Signatures in reverse order still land in signer order
        let signatures = vec![
            sign(&payloads.payloads[1], 3),
            sign(&payloads.payloads[0], 1),
        ];
        let combine = |signatures: Vec<Signature>| {
            service.combine(&ConstructionCombineRequest {
                network_identifier: network(),
                unsigned_transaction: payloads.unsigned_transaction.clone(),
                signatures,
            })
        };
        let signed = combine(signatures.clone()).unwrap().signed_transaction;
        assert_eq!(combine(signatures).unwrap().signed_transaction, signed);

        let parsed = service
            .parse(&ConstructionParseRequest {
                network_identifier: network(),
                signed: true,
                transaction: signed.clone(),
            })
            .unwrap();
        assert_eq!(
            parsed.account_identifier_signers.unwrap(),
            vec![
                AccountIdentifier::new(&address(1)),
                AccountIdentifier::new(&address(3))
            ]
        );

        let hash_request = ConstructionHashRequest {
            network_identifier: network(),
            signed_transaction: signed.clone(),
        };
        let first = service.hash(&hash_request).unwrap().transaction_identifier;
        let second = service.hash(&hash_request).unwrap().transaction_identifier;
        assert_eq!(first, second);

        let submitted = service
            .submit(&ConstructionSubmitRequest {
                network_identifier: network(),
                signed_transaction: signed.clone(),
            })
            .await
            .unwrap();
        assert_eq!(submitted.transaction_identifier, first);
        assert_eq!(client.broadcasts().await, vec![hex::decode(&signed).unwrap()]);
    }

    #[tokio::test]
    async fn test_combine_rejects_bad_signatures() {
        let client = client();
        let params = params();
        let service = ConstructionService::new(Some(&client), &params);
        let payloads = run_to_payloads(&service, transfer_ops("10ukava"), vec![public_key(1)]).await;
        let combine = |signatures: Vec<Signature>| {
            service.combine(&ConstructionCombineRequest {
                network_identifier: network(),
                unsigned_transaction: payloads.unsigned_transaction.clone(),
                signatures,
            })
        };

        // Signed by a key that is not a signer
        let stranger = sign(&payloads.payloads[0], 9);
        assert!(matches!(
            combine(vec![stranger]),
            Err(ApiError::InvalidSignature { index: 0, .. })
        ));

        // Right key, wrong payload
        let mut tampered = sign(&payloads.payloads[0], 1);
        tampered.signing_payload.hex_bytes = hex::encode(sha256(b"something else"));
        assert!(matches!(
            combine(vec![tampered]),
            Err(ApiError::InvalidSignature { .. })
        ));

        assert!(matches!(combine(vec![]), Err(ApiError::InvalidSignature { .. })));

        let result = service.combine(&ConstructionCombineRequest {
            network_identifier: network(),
            unsigned_transaction: "00000002".to_string(),
            signatures: vec![],
        });
        assert!(matches!(result, Err(ApiError::InvalidTx(_))));
    }

    #[test]
    fn test_malformed_transactions_are_invalid_tx() {
        let params = params();
        let service = ConstructionService::<MemoryClient>::new(None, &params);
        for transaction in ["not hex", "0g", "", "ffffffff", "0000000a7b7d"] {
            let parsed = service.parse(&ConstructionParseRequest {
                network_identifier: network(),
                signed: false,
                transaction: transaction.to_string(),
            });
            assert!(
                matches!(parsed, Err(ApiError::InvalidTx(_))),
                "parse accepted {:?}",
                transaction
            );

            let hashed = service.hash(&ConstructionHashRequest {
                network_identifier: network(),
                signed_transaction: transaction.to_string(),
            });
            assert!(matches!(hashed, Err(ApiError::InvalidTx(_))));
        }
    }
}
