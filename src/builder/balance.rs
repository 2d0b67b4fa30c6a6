use std::cmp::Reverse;
use std::collections::{BTreeMap, BTreeSet};

use pallas::ledger::addresses::{Address, ShelleyPaymentPart};
use pallas::ledger::primitives::conway::RedeemerTag;
use tracing::{debug, trace};

use crate::builder::build::{BuiltTransaction, ScriptDataMode};
use crate::builder::staging::StagingTransaction;
use crate::error::Error;
use crate::evaluator::{RedeemerEval, TxEvaluator};
use crate::fee;
use crate::params::ProtocolParams;
use crate::primitives::{
    DatumOption, ExUnits, Hash, Input, Output, RedeemerPurpose, ScriptKind, Utxo, Value,
    ValueDelta,
};
use crate::script_data;
use crate::selection::CoinSelector;

/// Hard cap on outer balancing passes. A draft that keeps moving the
/// fee after this many rounds is oscillating, not converging.
pub const MAX_ITERS: u32 = 5;

/// Everything the balancing loop needs besides the draft itself.
pub(crate) struct BalanceContext<'a> {
    pub params: &'a ProtocolParams,
    pub change_address: &'a Address,
    pub collateral_address: Option<&'a Address>,
    pub change_datum: Option<&'a DatumOption>,
    /// Spendable pool, excluding anything already used as an input.
    pub available: Vec<Utxo>,
    pub collateral_pool: Vec<Utxo>,
    /// Resolution map for every input the draft may reference.
    pub resolved: BTreeMap<Input, Output>,
    /// Plutus languages flagged by witnesses and reference scripts.
    pub languages: BTreeSet<ScriptKind>,
    pub signer_padding: u64,
    pub minimum_fee: u64,
}

/// Drive the draft to a balanced fixed point and render the final
/// transaction.
pub(crate) async fn balance<S, E>(
    staging: &mut StagingTransaction,
    ctx: &mut BalanceContext<'_>,
    selector: &S,
    evaluator: &E,
) -> Result<BuiltTransaction, Error>
where
    S: CoinSelector,
    E: TxEvaluator,
{
    ctx.params.validate()?;

    for cert in &mut staging.certificates {
        cert.fill_deposit(ctx.params);
    }
    for proposal in &mut staging.proposals {
        proposal
            .deposit
            .get_or_insert(ctx.params.governance_action_deposit);
    }

    // every user output must stand on its own minimum lovelace
    for output in &mut staging.outputs {
        let min = fee::min_ada_for_output(output, ctx.params.coins_per_utxo_byte)?;
        if output.value.coin < min {
            output.value.coin = min;
        }
    }
    let user_outputs = staging.outputs.len();

    let has_witness = staging.has_witness_data();
    let needs_collateral = staging.needs_collateral();

    let views = if staging.redeemers.is_empty() {
        None
    } else {
        if ctx.languages.is_empty() {
            return Err(Error::IllegalState(
                "redeemers present but no script language is known; attach the script \
                 or its reference input"
                    .into(),
            ));
        }
        Some(script_data::language_views(
            &ctx.languages,
            &ctx.params.plutus_cost_models,
        )?)
    };

    // dummy fee: large enough that fee bytes have their final width
    let mut fee = ctx.params.max_tx_fee()?.max(ctx.minimum_fee);
    let mut converged = false;

    for pass in 1..=MAX_ITERS {
        staging.fee = Some(fee);

        if !staging.redeemers.is_empty() {
            evaluate_ex_units(staging, ctx, evaluator).await?;
        }

        select_inputs(staging, ctx, selector, user_outputs, fee)?;
        rebuild_change(staging, ctx, user_outputs, fee)?;
        if needs_collateral {
            rebuild_collateral(staging, ctx, fee)?;
        }

        let mode = if has_witness {
            ScriptDataMode::Dummy
        } else {
            ScriptDataMode::Absent
        };
        let built = staging.build_tx(&mode)?;

        let witnesses = estimate_witnesses(staging, &ctx.resolved) + ctx.signer_padding;
        let budgets: Vec<ExUnits> = staging
            .redeemers
            .values()
            .filter_map(|entry| entry.ex_units)
            .collect();
        let computed = fee::total_fee(
            built.bytes.len() as u64,
            witnesses,
            budgets.iter(),
            reference_script_bytes(staging, &ctx.resolved),
            ctx.params,
        )?
        .max(ctx.minimum_fee);

        if computed == fee {
            debug!(pass, fee, "balance converged");
            converged = true;
            break;
        }

        debug!(pass, previous = fee, computed, "fee moved, rebalancing");
        fee = computed;
    }

    if !converged {
        return Err(Error::BalancingDiverged(MAX_ITERS));
    }

    let mode = if has_witness {
        ScriptDataMode::Real(views.unwrap_or_default())
    } else {
        ScriptDataMode::Absent
    };
    staging.build_tx(&mode)
}

/// Saturate every redeemer budget, hand the draft to the evaluator and
/// write the measured budgets back by (tag, index).
async fn evaluate_ex_units<E: TxEvaluator>(
    staging: &mut StagingTransaction,
    ctx: &BalanceContext<'_>,
    evaluator: &E,
) -> Result<(), Error> {
    let max = ctx.params.max_execution_units_per_transaction;
    staging
        .redeemers
        .saturate_ex_units(ExUnits::new(max.memory, max.cpu));

    let tentative = staging.build_tx(&ScriptDataMode::Dummy)?;
    let utxos = staging.resolved_utxos(&ctx.resolved);
    let evals = evaluator
        .evaluate(&tentative.bytes, &utxos)
        .await
        .map_err(Error::Provider)?;

    apply_evaluations(staging, &evals)
}

fn apply_evaluations(
    staging: &mut StagingTransaction,
    evals: &[RedeemerEval],
) -> Result<(), Error> {
    let pointers: BTreeMap<(RedeemerTag, u32), RedeemerPurpose> = staging
        .canonical_redeemers()?
        .into_iter()
        .map(|(purpose, redeemer)| ((redeemer.tag, redeemer.index), purpose))
        .collect();

    for eval in evals {
        let purpose = pointers.get(&(eval.tag, eval.index)).ok_or_else(|| {
            Error::IllegalState("evaluator returned an unknown redeemer pointer".into())
        })?;
        let entry = staging
            .redeemers
            .get_mut(purpose)
            .ok_or_else(|| Error::IllegalState("redeemer vanished mid-balance".into()))?;
        entry.ex_units = Some(eval.ex_units);
        trace!(
            tag = ?eval.tag,
            index = eval.index,
            mem = eval.ex_units.mem,
            steps = eval.ex_units.steps,
            "budget measured"
        );
    }

    Ok(())
}

/// What the transaction must pay for, independent of its inputs.
fn requirement(
    staging: &StagingTransaction,
    user_outputs: usize,
    fee: u64,
) -> Result<Value, Error> {
    let mut delta = ValueDelta::default();
    for output in &staging.outputs[..user_outputs] {
        delta.add_value(&output.value);
    }
    delta.add_coin(fee);

    let deposits = staging.deposit_delta();
    if deposits >= 0 {
        delta.add_coin(deposits as u64);
    } else {
        delta.sub_coin(deposits.unsigned_abs());
    }

    delta.add_value(&staging.mint.burned());
    delta.sub_value(&staging.mint.minted());
    for amount in staging.withdrawals.values() {
        delta.sub_coin(*amount);
    }

    delta.surplus()
}

fn select_inputs<S: CoinSelector>(
    staging: &mut StagingTransaction,
    ctx: &mut BalanceContext<'_>,
    selector: &S,
    user_outputs: usize,
    fee: u64,
) -> Result<(), Error> {
    let target = requirement(staging, user_outputs, fee)?;
    let pre_selected = resolve_all(&staging.inputs, &ctx.resolved)?;

    let selection = selector.select(pre_selected, std::mem::take(&mut ctx.available), &target)?;

    staging.inputs = selection
        .selected
        .iter()
        .map(|utxo| utxo.input.clone())
        .collect();
    for utxo in selection.selected {
        ctx.resolved.entry(utxo.input).or_insert(utxo.output);
    }
    ctx.available = selection.remaining;

    Ok(())
}

/// Balance delta of the draft with its current inputs and fee; positive
/// components are change, a negative component is a funding failure.
fn change_delta(
    staging: &StagingTransaction,
    ctx: &BalanceContext<'_>,
    user_outputs: usize,
    fee: u64,
) -> Result<ValueDelta, Error> {
    let mut delta = ValueDelta::default();
    for utxo in resolve_all(&staging.inputs, &ctx.resolved)? {
        delta.add_value(utxo.value());
    }
    for amount in staging.withdrawals.values() {
        delta.add_coin(*amount);
    }
    delta.apply_mint(&staging.mint);

    for output in &staging.outputs[..user_outputs] {
        delta.sub_value(&output.value);
    }
    delta.sub_coin(fee);

    let deposits = staging.deposit_delta();
    if deposits >= 0 {
        delta.sub_coin(deposits as u64);
    } else {
        delta.add_coin(deposits.unsigned_abs());
    }

    Ok(delta)
}

/// Recompute the change outputs for the current fee, absorbing extra
/// UTxOs while the change cannot reach its own minimum lovelace.
fn rebuild_change(
    staging: &mut StagingTransaction,
    ctx: &mut BalanceContext<'_>,
    user_outputs: usize,
    fee: u64,
) -> Result<(), Error> {
    loop {
        let delta = change_delta(staging, ctx, user_outputs, fee)?;

        for (policy, names) in &delta.assets {
            for (name, quantity) in names {
                if *quantity < 0 {
                    return Err(Error::InsufficientFunds(format!(
                        "{}.{}",
                        policy,
                        hex::encode(name.as_slice())
                    )));
                }
            }
        }
        if delta.coin < 0 {
            return Err(Error::InsufficientFunds("lovelace".into()));
        }

        match split_change(&delta.surplus()?, ctx) {
            Ok(change) => {
                staging.outputs.truncate(user_outputs);
                staging.outputs.extend(change);
                return Ok(());
            }
            Err(Error::InsufficientFundsForChange) => {
                // absorb one more UTxO so the change can pay its own way
                if ctx.available.is_empty() {
                    return Err(Error::InsufficientFundsForChange);
                }
                ctx.available.sort_by_key(|utxo| Reverse(utxo.coin()));
                let utxo = ctx.available.remove(0);
                trace!(coin = utxo.coin(), "absorbing utxo for change");
                staging.inputs.push(utxo.input.clone());
                ctx.resolved.insert(utxo.input, utxo.output);
            }
            Err(other) => return Err(other),
        }
    }
}

/// Turn a surplus into one or more min-ADA-correct change outputs,
/// splitting the asset bundle whenever a single output's value would
/// exceed the protocol's value size limit.
fn split_change(surplus: &Value, ctx: &BalanceContext<'_>) -> Result<Vec<Output>, Error> {
    if surplus.is_zero() {
        return Ok(vec![]);
    }

    let make_output = |value: Value| {
        let mut output = Output::new(ctx.change_address.clone(), value);
        if let Some(datum) = ctx.change_datum {
            output.datum = Some(datum.clone());
        }
        output
    };

    if !surplus.has_assets() {
        let output = make_output(Value::lovelace(surplus.coin));
        let min = fee::min_ada_for_output(&output, ctx.params.coins_per_utxo_byte)?;
        if surplus.coin < min {
            return Err(Error::InsufficientFundsForChange);
        }
        return Ok(vec![output]);
    }

    // pack assets into chunks whose serialized value stays within the
    // per-output limit; coin width is measured at its worst case
    let mut chunks: Vec<Value> = vec![Value::default()];
    for (policy, name, quantity) in surplus.assets_iter() {
        let current = chunks.last_mut().expect("chunks start non-empty");
        let candidate = current
            .clone()
            .with_asset(*policy, name.clone(), quantity);
        let mut probe = candidate.clone();
        probe.coin = u64::MAX;
        if probe.wire_size()? <= ctx.params.max_value_size || current.is_zero() {
            *current = candidate;
        } else {
            chunks.push(Value::default().with_asset(*policy, name.clone(), quantity));
        }
    }

    // all chunks but the last are funded with exactly their minimum;
    // the last carries whatever coin is left
    let mut outputs = Vec::with_capacity(chunks.len());
    let mut remaining_coin = surplus.coin;
    let last = chunks.len() - 1;
    for (position, chunk) in chunks.into_iter().enumerate() {
        let mut output = make_output(chunk);
        let min = fee::min_ada_for_output(&output, ctx.params.coins_per_utxo_byte)?;
        let coin = if position == last { remaining_coin } else { min };
        if coin < min || remaining_coin < coin {
            return Err(Error::InsufficientFundsForChange);
        }
        remaining_coin -= coin;
        output.value.coin = coin;
        outputs.push(output);
    }

    Ok(outputs)
}

/// Pick pure-lovelace collateral, large first, and build the collateral
/// return.
fn rebuild_collateral(
    staging: &mut StagingTransaction,
    ctx: &mut BalanceContext<'_>,
    fee: u64,
) -> Result<(), Error> {
    let params = ctx.params;
    let required = collateral_amount(fee, params.collateral_percentage)?;

    let mut pool: Vec<&Utxo> = ctx
        .collateral_pool
        .iter()
        .filter(|utxo| utxo.is_pure_lovelace())
        .collect();
    pool.sort_by_key(|utxo| Reverse(utxo.coin()));

    let mut picked = 0usize;
    let mut total: u64 = 0;
    for utxo in &pool {
        if total >= required {
            break;
        }
        total = total.checked_add(utxo.coin()).ok_or(Error::IntegerOverflow)?;
        picked += 1;
    }
    if total < required {
        return Err(Error::InsufficientFunds("collateral".into()));
    }

    let address = ctx
        .collateral_address
        .ok_or(Error::MissingArgument("collateral change address"))?;

    // the return output must itself be a valid UTxO; pull further
    // collateral until its coin clears the minimum
    loop {
        if picked as u64 > params.max_collateral_inputs {
            return Err(Error::CollateralLimit {
                limit: params.max_collateral_inputs,
            });
        }

        let surplus = total - required;
        if surplus == 0 {
            staging.collateral_return = None;
            break;
        }

        let output = Output::lovelace(address.clone(), surplus);
        let min = fee::min_ada_for_output(&output, params.coins_per_utxo_byte)?;
        if surplus >= min {
            staging.collateral_return = Some(output);
            break;
        }

        let Some(extra) = pool.get(picked) else {
            return Err(Error::InsufficientFunds("collateral".into()));
        };
        total = total.checked_add(extra.coin()).ok_or(Error::IntegerOverflow)?;
        picked += 1;
    }

    if picked as u64 > params.max_collateral_inputs {
        return Err(Error::CollateralLimit {
            limit: params.max_collateral_inputs,
        });
    }

    staging.collateral_inputs = pool[..picked].iter().map(|utxo| utxo.input.clone()).collect();
    staging.total_collateral = Some(required);

    Ok(())
}

pub(crate) fn collateral_amount(fee: u64, percentage: u64) -> Result<u64, Error> {
    let numerator = (fee as u128)
        .checked_mul(percentage as u128)
        .ok_or(Error::IntegerOverflow)?;
    u64::try_from(numerator.div_ceil(100)).map_err(|_| Error::IntegerOverflow)
}

/// Distinct key-hash payment credentials across inputs and collateral,
/// plus any disclosed signers: the vkey witnesses the signed
/// transaction will carry.
fn estimate_witnesses(
    staging: &StagingTransaction,
    resolved: &BTreeMap<Input, Output>,
) -> u64 {
    let mut keys: BTreeSet<Hash<28>> = BTreeSet::new();

    for input in staging.inputs.iter().chain(staging.collateral_inputs.iter()) {
        let Some(output) = resolved.get(input) else {
            continue;
        };
        if let Address::Shelley(shelley) = &output.address {
            if let ShelleyPaymentPart::Key(hash) = shelley.payment() {
                keys.insert(*hash);
            }
        }
    }

    for signer in &staging.required_signers {
        keys.insert(*signer);
    }

    keys.len().max(1) as u64
}

/// Serialized bytes of every Plutus script carried as a reference
/// script by the draft's reference inputs.
fn reference_script_bytes(
    staging: &StagingTransaction,
    resolved: &BTreeMap<Input, Output>,
) -> u64 {
    staging
        .reference_inputs
        .iter()
        .filter_map(|input| resolved.get(input))
        .filter_map(|output| output.script_ref.as_ref())
        .filter(|script| script.kind.is_plutus())
        .map(|script| script.size())
        .sum()
}

fn resolve_all(
    inputs: &[Input],
    resolved: &BTreeMap<Input, Output>,
) -> Result<Vec<Utxo>, Error> {
    inputs
        .iter()
        .map(|input| {
            resolved
                .get(input)
                .map(|output| Utxo::new(input.clone(), output.clone()))
                .ok_or_else(|| {
                    Error::IllegalState(format!(
                        "input {}#{} has no resolved output",
                        input.tx_hash, input.index
                    ))
                })
        })
        .collect()
}
