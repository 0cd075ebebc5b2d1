//! End-to-end scenarios through the ledger facade

use ledger_ops::{
    AccountId, BumpSequenceOp, BumpSequenceResultCode, Config, Ledger, MemoryStore, Metrics,
    Operation, OperationBody, OperationResult, SequenceNumber, SequenceRange, Transaction,
    TransactionResult, TransactionResultCode,
};
use rust_decimal::Decimal;
use std::sync::Arc;

struct Fixture {
    ledger: Ledger,
    metrics: Arc<Metrics>,
    source: AccountId,
    target: AccountId,
}

impl Fixture {
    fn new() -> Self {
        Self::with_version(Config::default().protocol.ledger_version)
    }

    fn with_version(ledger_version: u32) -> Self {
        let mut config = Config::default();
        config.protocol.ledger_version = ledger_version;
        // Ledger 0 gives fresh accounts sequence number 0
        config.protocol.initial_ledger_seq = 0;

        let metrics = Arc::new(Metrics::new().unwrap());
        let mut ledger = Ledger::with_store(Arc::new(MemoryStore::new()), config)
            .unwrap()
            .with_observer(metrics.clone());

        let source = AccountId::new("GSOURCE");
        let target = AccountId::new("GTARGET");
        ledger.create_account(source.clone(), Decimal::new(100, 0)).unwrap();
        ledger.create_account(target.clone(), Decimal::new(100, 0)).unwrap();

        Self {
            ledger,
            metrics,
            source,
            target,
        }
    }

    /// Force the target's sequence number through a committed bump
    fn set_target_seq(&mut self, seq: u64) {
        let op = self.bump(BumpSequenceOp::new(seq));
        assert!(self.apply(vec![op]).is_success());
        assert_eq!(self.target_seq(), seq);
    }

    /// Apply a transaction from the source carrying its next sequence number
    fn apply(&mut self, operations: Vec<Operation>) -> TransactionResult {
        let tx = self.tx(operations);
        self.ledger.apply_transaction(&tx).unwrap()
    }

    fn bump(&self, op: BumpSequenceOp) -> Operation {
        Operation::with_source(self.target.clone(), OperationBody::BumpSequence(op))
    }

    fn tx(&self, operations: Vec<Operation>) -> Transaction {
        let next = self.ledger.sequence_number(&self.source).unwrap().next().unwrap();
        Transaction::new(self.source.clone(), next, operations)
    }

    fn source_seq(&self) -> SequenceNumber {
        self.ledger.sequence_number(&self.source).unwrap()
    }

    fn target_seq(&self) -> u64 {
        self.ledger.sequence_number(&self.target).unwrap().value()
    }
}

fn code(result: Option<OperationResult>) -> Option<BumpSequenceResultCode> {
    result.and_then(|r| r.bump_sequence_code())
}

#[test]
fn test_in_range_bump_succeeds() {
    let mut f = Fixture::new();
    f.set_target_seq(100);

    let op = BumpSequenceOp::with_range(150u64, SequenceRange::new(90u64, 120u64));
    let op = f.bump(op);
    let result = f.apply(vec![op]);

    assert_eq!(result.code, TransactionResultCode::Success);
    assert_eq!(
        code(result.operation_results[0]),
        Some(BumpSequenceResultCode::Success)
    );
    assert_eq!(f.target_seq(), 150);
}

#[test]
fn test_out_of_range_bump_fails() {
    let mut f = Fixture::new();
    f.set_target_seq(130);
    let source_before = f.source_seq();

    let op = BumpSequenceOp::with_range(150u64, SequenceRange::new(90u64, 120u64));
    let op = f.bump(op);
    let result = f.apply(vec![op]);

    assert_eq!(result.code, TransactionResultCode::Failed);
    assert_eq!(
        code(result.operation_results[0]),
        Some(BumpSequenceResultCode::OutOfRange)
    );
    assert_eq!(f.target_seq(), 130);
    // Failed transactions roll back the source sequence consumption too
    assert_eq!(f.source_seq(), source_before);
    assert_eq!(f.metrics.outcome_count("op-bump-sequence", "out-of-range"), 1);
}

#[test]
fn test_earlier_operation_moves_sequence_out_of_range() {
    let mut f = Fixture::new();
    f.set_target_seq(100);

    // Both validate; the first bump pushes the target out of the second's window
    let first = f.bump(BumpSequenceOp::new(200u64));
    let second = f.bump(BumpSequenceOp::with_range(
        300u64,
        SequenceRange::new(90u64, 120u64),
    ));
    let result = f.apply(vec![first, second]);

    assert_eq!(result.code, TransactionResultCode::Failed);
    assert_eq!(
        code(result.operation_results[0]),
        Some(BumpSequenceResultCode::Success)
    );
    assert_eq!(
        code(result.operation_results[1]),
        Some(BumpSequenceResultCode::OutOfRange)
    );
    // All or nothing: the first bump is discarded as well
    assert_eq!(f.target_seq(), 100);
}

#[test]
fn test_self_bump_rejected() {
    let mut f = Fixture::new();
    let source_before = f.source_seq();

    let op = Operation::new(OperationBody::BumpSequence(BumpSequenceOp::new(
        u64::MAX - 10,
    )));
    let result = f.apply(vec![op]);

    assert_eq!(result.code, TransactionResultCode::Failed);
    assert_eq!(
        code(result.operation_results[0]),
        Some(BumpSequenceResultCode::NoSelfBump)
    );
    assert_eq!(f.source_seq(), source_before);
}

#[test]
fn test_not_supported_before_protocol_9() {
    let mut f = Fixture::with_version(8);
    let op = f.bump(BumpSequenceOp::new(500u64));
    let result = f.apply(vec![op]);

    assert_eq!(
        code(result.operation_results[0]),
        Some(BumpSequenceResultCode::NotSupportedYet)
    );
    assert_eq!(f.metrics.outcome_count("op-bump-sequence", "not-supported-yet"), 1);
}

#[test]
fn test_every_operation_is_validated() {
    let mut f = Fixture::new();
    let good = f.bump(BumpSequenceOp::new(500u64));
    let bad = f.bump(BumpSequenceOp::with_range(
        500u64,
        SequenceRange::new(10u64, 5u64),
    ));
    let result = f.apply(vec![good, bad]);

    assert_eq!(result.code, TransactionResultCode::Failed);
    // The valid operation never reached a terminal state
    assert_eq!(result.operation_results[0], None);
    assert_eq!(
        code(result.operation_results[1]),
        Some(BumpSequenceResultCode::InvalidRange)
    );
}

#[test]
fn test_missing_operation_source() {
    let mut f = Fixture::new();
    let op = Operation::with_source(
        AccountId::new("GGHOST"),
        OperationBody::BumpSequence(BumpSequenceOp::new(5u64)),
    );
    let result = f.apply(vec![op]);

    assert_eq!(result.code, TransactionResultCode::Failed);
    assert_eq!(result.operation_results[0], Some(OperationResult::NoAccount));
}

#[test]
fn test_bad_sequence_and_unknown_source() {
    let mut f = Fixture::new();
    let op = f.bump(BumpSequenceOp::new(5u64));

    let stale = Transaction::new(f.source.clone(), f.source_seq(), vec![op.clone()]);
    assert_eq!(
        f.ledger.apply_transaction(&stale).unwrap().code,
        TransactionResultCode::BadSeq
    );

    let unknown = Transaction::new(AccountId::new("GNOBODY"), 1u64, vec![op]);
    assert_eq!(
        f.ledger.apply_transaction(&unknown).unwrap().code,
        TransactionResultCode::NoAccount
    );
}

#[test]
fn test_replay_rejected_after_success() {
    let mut f = Fixture::new();
    let tx = f.tx(vec![f.bump(BumpSequenceOp::new(5u64))]);

    assert!(f.ledger.apply_transaction(&tx).unwrap().is_success());
    assert_eq!(
        f.ledger.apply_transaction(&tx).unwrap().code,
        TransactionResultCode::BadSeq
    );
}

#[test]
fn test_bump_invalidates_pending_transactions() {
    let mut f = Fixture::new();

    // A transaction signed in advance by the target
    let pending = Transaction::new(
        f.target.clone(),
        f.ledger.sequence_number(&f.target).unwrap().next().unwrap(),
        vec![Operation::with_source(
            f.source.clone(),
            OperationBody::BumpSequence(BumpSequenceOp::new(1u64)),
        )],
    );

    f.set_target_seq(u64::MAX / 2);

    assert_eq!(
        f.ledger.apply_transaction(&pending).unwrap().code,
        TransactionResultCode::BadSeq
    );
}

#[test]
fn test_accounts_from_keys() {
    let mut f = Fixture::new();
    let keyed = ledger_ops::crypto::KeyPair::from_seed(&[9u8; 32]).account_id();
    f.ledger.create_account(keyed.clone(), Decimal::ONE).unwrap();

    let op = Operation::with_source(
        keyed.clone(),
        OperationBody::BumpSequence(BumpSequenceOp::new(u64::MAX)),
    );
    assert!(f.apply(vec![op]).is_success());
    assert_eq!(f.ledger.sequence_number(&keyed).unwrap().value(), u64::MAX);
}
