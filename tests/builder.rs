//! End-to-end builder scenarios: each drives a draft through the full
//! balancing loop and asserts against the decoded wire transaction.

use ballast::{
    BuiltTransaction, CoinSelector, DatumOption, Error, ExUnits, Input, LargestFirst, NetworkId,
    NoScripts, Output, ProtocolParams, RedeemerEval, RewardAccount, Script, ScriptKind, TxBuilder,
    TxEvaluator, Utxo, Value,
};
use pallas::crypto::hash::Hash;
use pallas::ledger::addresses::{
    Address, Network, ShelleyAddress, ShelleyDelegationPart, ShelleyPaymentPart,
};
use pallas::ledger::primitives::Fragment;
use pallas::ledger::primitives::conway::{self, NativeScript, RedeemerTag};

fn params() -> ProtocolParams {
    serde_json::from_value(serde_json::json!({
        "minFeeCoefficient": 44,
        "minFeeConstant": 155381,
        "coinsPerUtxoByte": 4310,
        "minFeeReferenceScripts": { "base": 15.0, "range": 25600, "multiplier": 1.2 },
        "scriptExecutionPrices": {
            "memory": { "numerator": 577, "denominator": 10000 },
            "cpu": { "numerator": 721, "denominator": 10000000 },
        },
        "maxExecutionUnitsPerTransaction": { "memory": 14000000, "cpu": 10000000000u64 },
        "maxTransactionSize": 16384,
        "maxValueSize": 5000,
        "collateralPercentage": 150,
        "maxCollateralInputs": 3,
        "stakeCredentialDeposit": 2000000,
        "stakePoolDeposit": 500000000,
        "delegateRepresentativeDeposit": 500000000,
        "governanceActionDeposit": 100000000000u64,
        "plutusCostModels": {
            "plutusV2": (0..175).map(|i| i * 2 + 1).collect::<Vec<i64>>(),
        },
    }))
    .expect("fixture params deserialize")
}

fn key_address(byte: u8) -> Address {
    Address::Shelley(ShelleyAddress::new(
        Network::Testnet,
        ShelleyPaymentPart::key_hash(Hash::from([byte; 28])),
        ShelleyDelegationPart::Null,
    ))
}

fn script_address(script_hash: Hash<28>) -> Address {
    Address::Shelley(ShelleyAddress::new(
        Network::Testnet,
        ShelleyPaymentPart::script_hash(script_hash),
        ShelleyDelegationPart::Null,
    ))
}

fn utxo(tx_byte: u8, index: u64, output: Output) -> Utxo {
    Utxo::new(Input::new(Hash::from([tx_byte; 32]), index), output)
}

fn decode(tx: &BuiltTransaction) -> conway::Tx<'_> {
    conway::Tx::decode_fragment(&tx.bytes).expect("built transaction decodes")
}

fn output_coin(output: &conway::TransactionOutput) -> u64 {
    match output {
        conway::TransactionOutput::PostAlonzo(inner) => match &inner.value {
            conway::Value::Coin(coin) => *coin,
            conway::Value::Multiasset(coin, _) => *coin,
        },
        conway::TransactionOutput::Legacy(_) => panic!("unexpected legacy output"),
    }
}

struct FixedEvaluator(Vec<RedeemerEval>);

impl TxEvaluator for FixedEvaluator {
    async fn evaluate(
        &self,
        _tx_cbor: &[u8],
        _resolved_utxos: &[Utxo],
    ) -> anyhow::Result<Vec<RedeemerEval>> {
        Ok(self.0.clone())
    }
}

// S1: plain payment with change.
#[tokio::test]
async fn simple_send_balances_with_change() {
    let alice = key_address(0xa1);
    let bob = key_address(0xb0);
    let wallet = vec![utxo(0x01, 0, Output::lovelace(bob.clone(), 10_000_000))];

    let tx = TxBuilder::new(NetworkId::Preview)
        .set_change_address(bob.clone())
        .set_utxos(wallet)
        .send_lovelace(alice.clone(), 2_000_000)
        .build(&params(), &LargestFirst, &NoScripts)
        .await
        .unwrap();

    let decoded = decode(&tx);
    let body = &decoded.transaction_body;

    assert_eq!(body.inputs.len(), 1);
    assert_eq!(body.outputs.len(), 2);
    assert!(body.script_data_hash.is_none());
    assert!((160_000..=200_000).contains(&body.fee), "fee {}", body.fee);

    // exact balance: input = alice + change + fee
    assert_eq!(output_coin(&body.outputs[0]), 2_000_000);
    assert_eq!(
        output_coin(&body.outputs[0]) + output_coin(&body.outputs[1]) + body.fee,
        10_000_000
    );
}

// S2: multi-asset send; leftover tokens ride the change output.
#[tokio::test]
async fn multi_asset_send_returns_leftover_tokens() {
    let policy = Hash::from([0xaa; 28]);
    let tok = ballast::primitives::value::asset_name(b"TOK");
    let alice = key_address(0xa1);
    let me = key_address(0x05);

    let wallet = vec![utxo(
        0x02,
        0,
        Output::new(
            me.clone(),
            Value::lovelace(5_000_000).with_asset(policy, tok.clone(), 100),
        ),
    )];

    let tx = TxBuilder::new(NetworkId::Preview)
        .set_change_address(me.clone())
        .set_utxos(wallet)
        .send_value(
            alice.clone(),
            Value::default().with_asset(policy, tok.clone(), 40),
        )
        .build(&params(), &LargestFirst, &NoScripts)
        .await
        .unwrap();

    let decoded = decode(&tx);
    let body = &decoded.transaction_body;
    assert_eq!(body.outputs.len(), 2);

    let (to_alice, change) = (&body.outputs[0], &body.outputs[1]);
    let conway::TransactionOutput::PostAlonzo(change) = change else {
        panic!("unexpected change shape");
    };
    let conway::Value::Multiasset(change_coin, change_assets) = &change.value else {
        panic!("change lost its assets");
    };
    assert_eq!(u64::from(change_assets[&policy][&tok]), 60);

    // alice's token-only payment was raised to its minimum lovelace,
    // and the books still balance
    let alice_coin = output_coin(to_alice);
    assert!(alice_coin > 0);
    assert_eq!(alice_coin + change_coin + body.fee, 5_000_000);
}

// S3: native-script mint via a reference input; no redeemers anywhere.
#[tokio::test]
async fn native_mint_needs_no_redeemer() {
    let native = NativeScript::InvalidBefore(0);
    let script = Script::new(ScriptKind::Native, native.encode_fragment().unwrap());
    let policy = script.hash();

    let alice = key_address(0xa1);
    let me = key_address(0x05);

    let wallet = vec![utxo(0x03, 0, Output::lovelace(me.clone(), 10_000_000))];
    let script_carrier = utxo(
        0x03,
        1,
        Output::lovelace(me.clone(), 2_000_000).with_script_ref(script),
    );

    let new_asset = ballast::primitives::value::asset_name(b"NEW");
    let tx = TxBuilder::new(NetworkId::Preview)
        .set_change_address(me.clone())
        .set_utxos(wallet)
        .add_reference_input(script_carrier)
        .mint_token(policy, b"NEW", 50, None)
        .unwrap()
        .send_value(
            alice.clone(),
            Value::default().with_asset(policy, new_asset.clone(), 50),
        )
        .build(&params(), &LargestFirst, &NoScripts)
        .await
        .unwrap();

    let decoded = decode(&tx);
    let body = &decoded.transaction_body;

    let mint = body.mint.as_ref().expect("mint map present");
    assert_eq!(i64::from(mint[&policy][&new_asset]), 50);

    assert!(decoded.transaction_witness_set.redeemer.is_none());
    assert!(body.script_data_hash.is_none());
    assert!(body.collateral.is_none());
    assert_eq!(body.reference_inputs.as_ref().map(|set| set.len()), Some(1));
}

// S4: Plutus spend with collateral and a real script data hash.
#[tokio::test]
async fn script_spend_prices_redeemer_and_collateral() {
    let script_bytes = hex::decode("4d01000033222220051200120011").unwrap();
    let script = Script::new(ScriptKind::PlutusV2, script_bytes.clone());
    let locked_at = script_address(script.hash());

    let datum = hex::decode("d87980").unwrap();
    let redeemer = hex::decode("d87980").unwrap();

    let locked = utxo(
        0x04,
        0,
        Output::lovelace(locked_at.clone(), 10_000_000)
            .with_datum(DatumOption::Inline(datum)),
    );

    let me = key_address(0x05);
    let collateral_addr = key_address(0xc0);
    let collateral = vec![utxo(0x04, 1, Output::lovelace(collateral_addr.clone(), 5_000_000))];

    let budget = ExUnits::new(1_000_000, 500_000_000);
    let evaluator = FixedEvaluator(vec![RedeemerEval {
        tag: RedeemerTag::Spend,
        index: 0,
        ex_units: budget,
    }]);

    let tx = TxBuilder::new(NetworkId::Preview)
        .set_change_address(me.clone())
        .set_collateral_change_address(collateral_addr.clone())
        .set_utxos(vec![])
        .set_collateral_utxos(collateral)
        .add_input(locked, Some(redeemer), None)
        .unwrap()
        .add_script(ScriptKind::PlutusV2, script_bytes)
        .build(&params(), &LargestFirst, &evaluator)
        .await
        .unwrap();

    let decoded = decode(&tx);
    let body = &decoded.transaction_body;

    // one spend redeemer, budget straight from the evaluator
    let redeemers = decoded
        .transaction_witness_set
        .redeemer
        .as_ref()
        .expect("redeemers present");
    let conway::Redeemers::List(list) = &**redeemers else {
        panic!("unexpected redeemer encoding");
    };
    assert_eq!(list.len(), 1);
    assert_eq!(list[0].tag, RedeemerTag::Spend);
    assert_eq!(list[0].index, 0);
    assert_eq!(list[0].ex_units.mem, budget.mem);
    assert_eq!(list[0].ex_units.steps, budget.steps);

    let hash = body.script_data_hash.expect("script data hash present");
    assert_ne!(hash, Hash::from([0u8; 32]));

    // collateral covers 150% of the fee, remainder returned
    let required = (body.fee * 150).div_ceil(100);
    assert_eq!(body.total_collateral, Some(required));
    assert_eq!(body.collateral.as_ref().map(|set| set.len()), Some(1));
    let collateral_return = body.collateral_return.as_ref().expect("collateral return");
    assert_eq!(output_coin(collateral_return), 5_000_000 - required);
}

// S5: reward withdrawal with a key credential.
#[tokio::test]
async fn withdrawal_adds_to_the_balance() {
    let me = key_address(0x05);
    let account = RewardAccount::from_key_hash(Network::Testnet, Hash::from([0x77; 28]));
    let wallet = vec![utxo(0x06, 0, Output::lovelace(me.clone(), 10_000_000))];

    let tx = TxBuilder::new(NetworkId::Preview)
        .set_change_address(me.clone())
        .set_utxos(wallet)
        .withdraw_rewards(account.clone(), 1_500_000, None)
        .unwrap()
        .build(&params(), &LargestFirst, &NoScripts)
        .await
        .unwrap();

    let decoded = decode(&tx);
    let body = &decoded.transaction_body;

    let withdrawals = body.withdrawals.as_ref().expect("withdrawals present");
    assert_eq!(withdrawals[&account.to_wire()], 1_500_000);
    assert!(decoded.transaction_witness_set.redeemer.is_none());

    // the withdrawn amount flows into change
    assert_eq!(
        output_coin(&body.outputs[0]) + body.fee,
        10_000_000 + 1_500_000
    );
}

// S6: the first change attempt lands under min-ADA and the loop has to
// absorb a second UTxO.
#[tokio::test]
async fn change_below_minimum_absorbs_another_utxo() {
    let alice = key_address(0xa1);
    let me = key_address(0x05);
    let p = params();

    // requirement on the first pass is payment + worst-case fee; the
    // larger UTxO barely clears it, leaving dust-level change
    let requirement = 2_000_000 + p.max_tx_fee().unwrap();
    let wallet = vec![
        utxo(0x07, 0, Output::lovelace(me.clone(), requirement + 1_000)),
        utxo(0x07, 1, Output::lovelace(me.clone(), 2_000_000)),
    ];

    let tx = TxBuilder::new(NetworkId::Preview)
        .set_change_address(me.clone())
        .set_utxos(wallet)
        .send_lovelace(alice.clone(), 2_000_000)
        .build(&p, &LargestFirst, &NoScripts)
        .await
        .unwrap();

    let decoded = decode(&tx);
    let body = &decoded.transaction_body;

    // both UTxOs were consumed and the change clears its minimum
    assert_eq!(body.inputs.len(), 2);
    let change = output_coin(&body.outputs[1]);
    assert!(change >= 900_000, "change {change} under min-ADA");
    assert_eq!(
        2_000_000 + change + body.fee,
        requirement + 1_000 + 2_000_000
    );
}

// Every output of a balanced transaction satisfies min-ADA.
#[tokio::test]
async fn outputs_meet_min_ada() {
    let alice = key_address(0xa1);
    let me = key_address(0x05);
    let p = params();
    let wallet = vec![utxo(0x08, 0, Output::lovelace(me.clone(), 50_000_000))];

    let tx = TxBuilder::new(NetworkId::Preview)
        .set_change_address(me.clone())
        .set_utxos(wallet)
        .send_lovelace(alice.clone(), 1)
        .build(&p, &LargestFirst, &NoScripts)
        .await
        .unwrap();

    let decoded = decode(&tx);
    for output in &decoded.transaction_body.outputs {
        let coin = output_coin(output);
        let size = output.encode_fragment().unwrap().len() as u64;
        assert!(coin >= (size + 160) * p.coins_per_utxo_byte);
    }
}

// Missing preconditions surface as missing-argument errors.
#[tokio::test]
async fn build_without_change_address_is_refused() {
    let result = TxBuilder::new(NetworkId::Preview)
        .set_utxos(vec![])
        .build(&params(), &LargestFirst, &NoScripts)
        .await;
    assert!(matches!(result, Err(Error::MissingArgument("change address"))));
}

#[tokio::test]
async fn script_spend_without_collateral_pool_is_refused() {
    let script_bytes = hex::decode("4d01000033222220051200120011").unwrap();
    let script = Script::new(ScriptKind::PlutusV2, script_bytes.clone());
    let locked = utxo(
        0x09,
        0,
        Output::lovelace(script_address(script.hash()), 10_000_000),
    );

    let result = TxBuilder::new(NetworkId::Preview)
        .set_change_address(key_address(0x05))
        .set_collateral_change_address(key_address(0xc0))
        .set_utxos(vec![])
        .add_input(locked, Some(hex::decode("d87980").unwrap()), None)
        .unwrap()
        .add_script(ScriptKind::PlutusV2, script_bytes)
        .build(&params(), &LargestFirst, &NoScripts)
        .await;

    assert!(matches!(result, Err(Error::MissingArgument("collateral utxos"))));
}

#[tokio::test]
async fn spending_from_script_without_redeemer_is_refused() {
    let locked = utxo(
        0x0a,
        0,
        Output::lovelace(script_address(Hash::from([9u8; 28])), 10_000_000),
    );

    let result = TxBuilder::new(NetworkId::Preview)
        .set_change_address(key_address(0x05))
        .add_input(locked, None, None);

    assert!(matches!(result, Err(Error::MissingRedeemer)));
}

// Draft persistence: a built transaction round-trips the EMIP-3 vault.
#[tokio::test]
async fn sealed_draft_round_trips() {
    let me = key_address(0x05);
    let wallet = vec![utxo(0x0b, 0, Output::lovelace(me.clone(), 10_000_000))];

    let tx = TxBuilder::new(NetworkId::Preview)
        .set_change_address(me.clone())
        .set_utxos(wallet)
        .send_lovelace(key_address(0xa1), 2_000_000)
        .build(&params(), &LargestFirst, &NoScripts)
        .await
        .unwrap();

    let sealed = ballast::emip3::encrypt(&tx.bytes, b"hunter2", [3u8; 32], [4u8; 12]);
    let opened = ballast::emip3::decrypt(&sealed, b"hunter2").unwrap();
    assert_eq!(opened, tx.bytes);
}

// Certificate helpers pull their deposit from the protocol parameters.
#[tokio::test]
async fn stake_registration_locks_the_deposit() {
    let me = key_address(0x05);
    let wallet = vec![utxo(0x0d, 0, Output::lovelace(me.clone(), 10_000_000))];

    let tx = TxBuilder::new(NetworkId::Preview)
        .set_change_address(me.clone())
        .set_utxos(wallet)
        .register_reward_address(ballast::Credential::Key(Hash::from([0x42; 28])), None)
        .unwrap()
        .build(&params(), &LargestFirst, &NoScripts)
        .await
        .unwrap();

    let decoded = decode(&tx);
    let body = &decoded.transaction_body;

    let certs = body.certificates.as_ref().expect("certificate present");
    assert!(matches!(certs[0], conway::Certificate::Reg(_, 2_000_000)));

    // the deposit left the balance
    assert_eq!(
        output_coin(&body.outputs[0]) + body.fee + 2_000_000,
        10_000_000
    );
}

// Proposals carry the governance action deposit and land in the body.
#[tokio::test]
async fn info_proposal_costs_the_action_deposit() {
    let me = key_address(0x05);
    let deposit = 100_000_000_000u64;
    let wallet = vec![utxo(
        0x0e,
        0,
        Output::lovelace(me.clone(), deposit + 10_000_000),
    )];
    let return_account = RewardAccount::from_key_hash(Network::Testnet, Hash::from([0x11; 28]));
    let anchor = conway::Anchor {
        url: "https://example.com/rationale.json".into(),
        content_hash: Hash::from([0x22; 32]),
    };

    let tx = TxBuilder::new(NetworkId::Preview)
        .set_change_address(me.clone())
        .set_utxos(wallet)
        .propose_info(return_account, anchor)
        .unwrap()
        .build(&params(), &LargestFirst, &NoScripts)
        .await
        .unwrap();

    let decoded = decode(&tx);
    let body = &decoded.transaction_body;

    let proposals = body.proposal_procedures.as_ref().expect("proposal present");
    assert_eq!(proposals[0].deposit, deposit);
    assert!(matches!(
        proposals[0].gov_action,
        conway::GovAction::Information
    ));

    assert_eq!(
        output_coin(&body.outputs[0]) + body.fee + deposit,
        deposit + 10_000_000
    );
}

// A key-credentialed DRep vote needs no redeemer.
#[tokio::test]
async fn drep_vote_lands_in_voting_procedures() {
    let me = key_address(0x05);
    let wallet = vec![utxo(0x0f, 0, Output::lovelace(me.clone(), 10_000_000))];
    let voter = conway::Voter::DRepKey(Hash::from([0x33; 28]));
    let action = conway::GovActionId {
        transaction_id: Hash::from([0x44; 32]),
        action_index: 0,
    };

    let tx = TxBuilder::new(NetworkId::Preview)
        .set_change_address(me.clone())
        .set_utxos(wallet)
        .vote(voter.clone(), action.clone(), conway::Vote::Yes, None, None)
        .unwrap()
        .build(&params(), &LargestFirst, &NoScripts)
        .await
        .unwrap();

    let decoded = decode(&tx);
    let votes = decoded
        .transaction_body
        .voting_procedures
        .as_ref()
        .expect("voting procedures present");
    assert!(matches!(
        votes[&voter][&action].vote,
        conway::Vote::Yes
    ));
    assert!(decoded.transaction_witness_set.redeemer.is_none());
}

// Unix-timestamp validity bounds go through the network's slot config.
#[tokio::test]
async fn validity_bounds_convert_through_slots() {
    let me = key_address(0x05);
    let wallet = vec![utxo(0x10, 0, Output::lovelace(me.clone(), 10_000_000))];

    // preview counts slots from 1666656000
    let tx = TxBuilder::new(NetworkId::Preview)
        .set_change_address(me.clone())
        .set_utxos(wallet)
        .set_invalid_before_ex(1_666_656_000 + 500)
        .unwrap()
        .set_invalid_after_ex(1_666_656_000 + 3_600)
        .unwrap()
        .build(&params(), &LargestFirst, &NoScripts)
        .await
        .unwrap();

    let decoded = decode(&tx);
    assert_eq!(decoded.transaction_body.validity_interval_start, Some(500));
    assert_eq!(decoded.transaction_body.ttl, Some(3_600));
}

// The selector contract holds for the shipped implementation.
#[test]
fn selector_partition_invariants() {
    let me = key_address(0x05);
    let available: Vec<_> = (0..5)
        .map(|i| utxo(0x0c, i, Output::lovelace(me.clone(), (i + 1) * 2_000_000)))
        .collect();
    let pre = vec![utxo(0x0c, 9, Output::lovelace(me.clone(), 1_000_000))];

    let selection = LargestFirst
        .select(pre.clone(), available.clone(), &Value::lovelace(6_000_000))
        .unwrap();

    // pre-selected survives, the target is covered, nothing is lost
    assert!(selection.selected.iter().any(|u| u.input == pre[0].input));
    let covered: u64 = selection.selected.iter().map(|u| u.coin()).sum();
    assert!(covered >= 6_000_000);

    let mut inputs: Vec<_> = selection
        .selected
        .iter()
        .chain(selection.remaining.iter())
        .map(|u| u.input.clone())
        .collect();
    inputs.sort();
    inputs.dedup();
    assert_eq!(inputs.len(), available.len() + pre.len());
}
