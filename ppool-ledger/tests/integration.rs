//! Integration tests for ppool-ledger.
//!
//! These tests drive full deposit/withdraw/ragequit lifecycles through the
//! wallet facade and check the ledger invariants across replay.

use std::collections::BTreeSet;
use std::sync::Arc;

use ppool_common::{Commitment, FieldElement, HashError, HashOracle, PoseidonOracle, Scope};
use ppool_ledger::{AccountStatus, Error, Event, EventLog, SharedWallet, Wallet, WithdrawalEvent};
use proptest::prelude::*;

// === Test Fixtures ===

/// Cheap deterministic stand-in for Poseidon: a Horner-style mix of the inputs.
#[derive(Clone, Copy, Debug, Default)]
struct MixOracle;

impl HashOracle for MixOracle {
    fn hash(&self, inputs: &[FieldElement]) -> Result<FieldElement, HashError> {
        let base = FieldElement::from(0x1_0000_0001u64).0;
        let mut acc = FieldElement::from(inputs.len() as u64 + 17).0;
        for input in inputs {
            acc = acc * base + input.0;
            acc = acc * acc * acc + base;
        }
        Ok(FieldElement::from_fr(acc))
    }
}

fn fe(v: u64) -> FieldElement {
    FieldElement::from(v)
}

fn pool() -> Scope {
    Scope::from_label("0XBOW_ETH_ETHEREUM_POOL")
}

fn depositor() -> FieldElement {
    FieldElement::parse_padded("0xa11ce00000000000000000000000000000000001").unwrap()
}

// === Lifecycle ===

fn run_lifecycle<H: HashOracle + Clone>(oracle: H) {
    let scope = pool();
    let mut wallet = Wallet::new(oracle);

    let c0 = wallet.deposit(scope, depositor(), 100, fe(11), fe(21)).unwrap();
    let account = wallet.account(&scope, &c0).unwrap();
    assert_eq!(account.balance, 100);
    assert_eq!(account.initial_commitment, c0);
    assert_eq!(account.status(), AccountStatus::Funded);

    let c1 = wallet.withdraw(scope, c0, 40, fe(12), fe(22)).unwrap();
    let account = wallet.account(&scope, &c0).unwrap();
    assert_eq!(account.balance, 60);
    assert_eq!(account.latest_commitment, Some(c1));
    assert_eq!(account.withdrawals.len(), 1);
    assert_eq!(account.withdrawals[0].parent, c0);

    wallet.ragequit(scope, c0, 60).unwrap();
    let account = wallet.account(&scope, &c0).unwrap();
    assert_eq!(account.balance, 0);
    assert_eq!(account.latest_commitment, None);
    assert_eq!(account.ragequit.as_ref().unwrap().parent, c1);
    assert_eq!(account.status(), AccountStatus::RagequitClosed);

    let err = wallet.withdraw(scope, c0, 1, fe(13), fe(23)).unwrap_err();
    assert_eq!(
        err,
        Error::AccountClosed {
            initial_commitment: c0,
            status: AccountStatus::RagequitClosed
        }
    );
    assert_eq!(wallet.log().len(), 3);
}

#[test]
fn deposit_withdraw_ragequit_with_poseidon() {
    run_lifecycle(PoseidonOracle);
}

#[test]
fn deposit_withdraw_ragequit_with_fake_oracle() {
    run_lifecycle(MixOracle);
}

// === Replay ===

#[test]
fn replay_reproduces_state_across_scopes() {
    let a = pool();
    let b = Scope::from_label("0XBOW_USDC_ETHEREUM_POOL");
    let mut wallet = Wallet::new(MixOracle);

    let ca = wallet.deposit(a, depositor(), 500, fe(1), fe(2)).unwrap();
    let cb = wallet.deposit(b, depositor(), 70, fe(3), fe(4)).unwrap();
    wallet.withdraw(a, ca, 120, fe(5), fe(6)).unwrap();
    wallet.withdraw(b, cb, 70, fe(7), fe(8)).unwrap();
    wallet.withdraw(a, ca, 80, fe(9), fe(10)).unwrap();

    let json = wallet.export_json().unwrap();
    let rebuilt = Wallet::from_json(MixOracle, &json).unwrap();
    assert_eq!(rebuilt.state(), wallet.state());
    assert_eq!(
        rebuilt.account(&b, &cb).unwrap().status(),
        AccountStatus::Exhausted
    );
    assert_eq!(rebuilt.account(&a, &ca).unwrap().balance, 300);
}

#[test]
fn reordered_history_is_detected() {
    let scope = pool();
    let mut wallet = Wallet::new(MixOracle);
    let c0 = wallet.deposit(scope, depositor(), 100, fe(1), fe(2)).unwrap();
    wallet.withdraw(scope, c0, 10, fe(3), fe(4)).unwrap();
    wallet.withdraw(scope, c0, 10, fe(5), fe(6)).unwrap();

    let mut history = wallet.export_history();
    history.swap(1, 2);
    let err = Wallet::replay(MixOracle, &history).unwrap_err();
    assert!(matches!(err, Error::Replay { position: 1, .. }));
    assert_eq!(err.root().error_code(), "STALE_PARENT");
}

#[test]
fn tampered_amount_is_detected() {
    let scope = pool();
    let mut wallet = Wallet::new(MixOracle);
    let c0 = wallet.deposit(scope, depositor(), 100, fe(1), fe(2)).unwrap();
    wallet.withdraw(scope, c0, 90, fe(3), fe(4)).unwrap();

    let mut history = wallet.export_history();
    if let Event::Withdrawal(w) = &mut history[1] {
        w.amount = 900;
    }
    let err = Wallet::replay(MixOracle, &history).unwrap_err();
    assert_eq!(
        err.root(),
        &Error::InsufficientBalance {
            requested: 900,
            available: 100
        }
    );
}

#[test]
fn unknown_event_type_fails_import() {
    let json = format!(
        r#"[{{"type":"mint","scope":"{}","amount":1}}]"#,
        pool().as_field().to_hex()
    );
    let err = EventLog::from_json(&json).unwrap_err();
    assert!(matches!(err, Error::MalformedEvent { position: 0, .. }));
}

// === Double spend and uniqueness ===

#[test]
fn same_nullifier_cannot_fund_two_withdrawals() {
    let scope = pool();
    let mut wallet = Wallet::new(MixOracle);
    let c0 = wallet.deposit(scope, depositor(), 100, fe(1), fe(2)).unwrap();
    wallet.withdraw(scope, c0, 10, fe(3), fe(4)).unwrap();

    let err = wallet.withdraw(scope, c0, 10, fe(5), fe(4)).unwrap_err();
    assert_eq!(err, Error::NullifierReused { scope });
    assert_eq!(wallet.account(&scope, &c0).unwrap().balance, 90);
}

#[test]
fn replayed_withdrawal_event_fails() {
    let scope = pool();
    let mut wallet = Wallet::new(MixOracle);
    let c0 = wallet.deposit(scope, depositor(), 100, fe(1), fe(2)).unwrap();
    wallet.withdraw(scope, c0, 10, fe(3), fe(4)).unwrap();

    let mut history = wallet.export_history();
    let duplicate = history[1].clone();
    history.push(duplicate);
    assert!(Wallet::replay(MixOracle, &history).is_err());
}

#[test]
fn commitments_are_unique_within_scope() {
    let scope = pool();
    let mut wallet = Wallet::new(MixOracle);
    let mut seen = BTreeSet::new();
    for i in 0..5u64 {
        let c = wallet
            .deposit(scope, depositor(), 50, fe(100 + i), fe(200 + i))
            .unwrap();
        assert!(seen.insert(c));
        let w = wallet.withdraw(scope, c, 10, fe(300 + i), fe(400 + i)).unwrap();
        assert!(seen.insert(w));
    }
    let book = wallet.ledger().book(&scope).unwrap();
    let recorded: BTreeSet<Commitment> = book.commitments().copied().collect();
    assert_eq!(recorded, seen);
}

#[test]
fn same_inputs_in_other_scope_do_not_collide() {
    let mut wallet = Wallet::new(MixOracle);
    let a = wallet.deposit(pool(), depositor(), 1, fe(1), fe(2)).unwrap();
    let b = wallet
        .deposit(Scope::from_label("OTHER"), depositor(), 1, fe(1), fe(2))
        .unwrap();
    assert_ne!(a, b);
}

#[test]
fn explicit_parent_mismatch_is_rejected() {
    let scope = pool();
    let mut wallet = Wallet::new(MixOracle);
    let c0 = wallet.deposit(scope, depositor(), 100, fe(1), fe(2)).unwrap();
    let event = Event::Withdrawal(WithdrawalEvent {
        scope,
        initial_commitment: c0,
        amount: 10,
        secret: fe(3),
        nullifier: fe(4),
        parent: Some(Commitment(fe(77))),
    });
    let err = wallet.apply(event).unwrap_err();
    assert_eq!(
        err,
        Error::StaleParent {
            expected: Some(c0),
            got: Commitment(fe(77))
        }
    );
    assert_eq!(wallet.log().len(), 1);
}

// === Properties ===

proptest! {
    #[test]
    fn balance_invariant_holds(
        deposit in 1u64..10_000,
        requests in prop::collection::vec(0u64..4_000, 0..12),
    ) {
        let scope = pool();
        let mut wallet = Wallet::new(MixOracle);
        let c0 = wallet.deposit(scope, depositor(), deposit, fe(1), fe(2)).unwrap();

        let mut parents = BTreeSet::new();
        for (i, amount) in requests.into_iter().enumerate() {
            let i = i as u64;
            let before = wallet.account(&scope, &c0).unwrap().clone();
            match wallet.withdraw(scope, c0, amount, fe(1000 + i), fe(2000 + i)) {
                Ok(_) => {
                    let after = wallet.account(&scope, &c0).unwrap();
                    let last = after.withdrawals.last().unwrap();
                    prop_assert_eq!(Some(last.parent), before.latest_commitment);
                    prop_assert!(parents.insert(last.parent));
                    prop_assert_eq!(after.balance, before.balance - amount);
                }
                Err(Error::InsufficientBalance { requested, available }) => {
                    prop_assert_eq!(requested, amount);
                    prop_assert!(amount > available);
                }
                Err(Error::AccountClosed { status, .. }) => {
                    prop_assert_eq!(status, AccountStatus::Exhausted);
                }
                Err(other) => prop_assert!(false, "unexpected error {:?}", other),
            }
            let account = wallet.account(&scope, &c0).unwrap();
            prop_assert!(account.balance_is_consistent());
            prop_assert_eq!(account.deposit.amount - account.withdrawn_total(), account.balance);
        }

        let rebuilt = Wallet::replay(MixOracle, &wallet.export_history()).unwrap();
        prop_assert_eq!(rebuilt.state(), wallet.state());
    }
}

// === Shared wallet ===

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn scopes_progress_independently() {
    let wallet = Arc::new(SharedWallet::new(MixOracle));
    let mut handles = Vec::new();

    for s in 0..4u64 {
        let wallet = Arc::clone(&wallet);
        handles.push(tokio::spawn(async move {
            let scope = Scope::from_label(&format!("POOL_{}", s));
            let base = 1000 * (s + 1);
            let c0 = wallet
                .deposit(scope, depositor(), 100, fe(base), fe(base + 1))
                .await?;
            for i in 0..5u64 {
                wallet
                    .withdraw(scope, c0, 10, fe(base + 10 + i), fe(base + 20 + i))
                    .await?;
            }
            Ok::<_, Error>((scope, c0))
        }));
    }

    let mut opened = Vec::new();
    for handle in handles {
        opened.push(handle.await.unwrap().unwrap());
    }
    for (scope, c0) in &opened {
        let account = wallet.account(scope, c0).await.unwrap();
        assert_eq!(account.balance, 50);
        assert_eq!(account.withdrawals.len(), 5);
    }

    let history = wallet.export_history().await;
    assert_eq!(history.len(), 24);
    let rebuilt = Wallet::replay(MixOracle, &history).unwrap();
    assert_eq!(rebuilt.state(), wallet.snapshot().await.state());
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_withdrawals_on_one_scope_serialize() {
    let scope = pool();
    let wallet = Arc::new(SharedWallet::new(MixOracle));
    let c0 = wallet
        .deposit(scope, depositor(), 30, fe(1), fe(2))
        .await
        .unwrap();

    let mut handles = Vec::new();
    for i in 0..6u64 {
        let wallet = Arc::clone(&wallet);
        handles.push(tokio::spawn(async move {
            wallet
                .withdraw(scope, c0, 10, fe(100 + i), fe(200 + i))
                .await
        }));
    }
    let mut ok = 0;
    for handle in handles {
        if handle.await.unwrap().is_ok() {
            ok += 1;
        }
    }
    assert_eq!(ok, 3);

    let account = wallet.account(&scope, &c0).await.unwrap();
    assert_eq!(account.status(), AccountStatus::Exhausted);
    let parents: BTreeSet<_> = account.withdrawals.iter().map(|w| w.parent).collect();
    assert_eq!(parents.len(), 3);
}
