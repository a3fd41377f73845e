//! Patch command tasks against the mock transport.

use insulinloop::app::events::AppEvent;
use insulinloop::app::ports::StoragePort;
use insulinloop::error::{PreconditionFailure, TaskError, TransportError};
use insulinloop::patch::PatchConfigStore;
use insulinloop::patch::TaskFunc;
use insulinloop::patch::transport::{
    BolusExDuration, BondState, BondingOption, PatchCommand, QuickBolus, ResponsePayload,
    ResultCode,
};

use crate::mocks::{PatchRig, Reply};

const MAC: &str = "A0:B1:C2:D3:E4:F5";

fn is_low_reservoir(c: &PatchCommand) -> bool {
    matches!(c, PatchCommand::SetLowReservoirAndExpireAlert { .. })
}

fn is_update_connection(c: &PatchCommand) -> bool {
    matches!(c, PatchCommand::UpdateConnection)
}

// ── Low reservoir ───────────────────────────────────────────

#[test]
fn low_reservoir_set_sends_one_command() {
    let rig = PatchRig::new();

    let r = rig
        .dispatcher
        .block_on(rig.tasks.low_reservoir.set(20, 6));

    assert_eq!(r, Ok(()));
    assert_eq!(
        rig.transport.sent(),
        vec![PatchCommand::SetLowReservoirAndExpireAlert {
            reservoir_units: 20,
            expire_alert_hours: 6,
        }]
    );
    assert_eq!(rig.sink.succeeded(TaskFunc::LowReservoir), 1);
}

#[test]
fn low_reservoir_is_idempotent() {
    let rig = PatchRig::new();
    for _ in 0..2 {
        let r = rig
            .dispatcher
            .block_on(rig.tasks.low_reservoir.set(20, 6));
        assert_eq!(r, Ok(()));
    }
    assert_eq!(rig.transport.sent_count(is_low_reservoir), 2);
}

#[test]
fn enqueue_reads_stored_thresholds() {
    let rig = PatchRig::new();
    rig.store
        .update(|c| {
            c.low_reservoir_alert_units = 25;
            c.expire_alert_hours = 8;
        })
        .unwrap();

    assert!(rig.tasks.low_reservoir.enqueue());
    rig.settle(20);

    assert_eq!(
        rig.transport.sent(),
        vec![PatchCommand::SetLowReservoirAndExpireAlert {
            reservoir_units: 25,
            expire_alert_hours: 8,
        }]
    );
}

#[test]
fn concurrent_enqueue_transmits_once() {
    let rig = PatchRig::new();
    rig.transport.reply.set(Reply::After(30));

    assert!(rig.tasks.low_reservoir.enqueue());
    rig.dispatcher.try_run_pending();
    assert!(!rig.tasks.low_reservoir.enqueue());
    rig.settle(80);

    assert_eq!(rig.transport.sent_count(is_low_reservoir), 1);
    assert_eq!(rig.sink.succeeded(TaskFunc::LowReservoir), 1);

    // Completed invocations no longer block the slot.
    assert!(rig.tasks.low_reservoir.enqueue());
    rig.settle(80);
    assert_eq!(rig.transport.sent_count(is_low_reservoir), 2);
}

#[test]
fn direct_calls_are_not_coalesced() {
    let rig = PatchRig::new();
    rig.transport.reply.set(Reply::After(10));

    let (a, b) = rig.dispatcher.block_on(futures_lite::future::zip(
        rig.tasks.low_reservoir.set(20, 6),
        rig.tasks.low_reservoir.set(20, 6),
    ));

    assert_eq!((a, b), (Ok(()), Ok(())));
    assert_eq!(rig.transport.sent_count(is_low_reservoir), 2);
}

// ── Failure kinds ───────────────────────────────────────────

#[test]
fn disconnected_patch_fails_before_transmitting() {
    let rig = PatchRig::new();
    rig.transport.connected.set(false);

    let r = rig
        .dispatcher
        .block_on(rig.tasks.low_reservoir.set(20, 6));

    assert_eq!(
        r,
        Err(TaskError::Precondition(PreconditionFailure::NotConnected))
    );
    assert!(rig.transport.sent().is_empty());
    assert_eq!(rig.sink.failed(TaskFunc::LowReservoir), 1);
}

#[test]
fn rejection_surfaces_result_code() {
    let rig = PatchRig::new();
    rig.transport.reject_next(ResultCode::InvalidParameter);

    let r = rig
        .dispatcher
        .block_on(rig.tasks.low_reservoir.set(20, 6));

    assert_eq!(
        r,
        Err(TaskError::Rejected {
            func: TaskFunc::LowReservoir,
            code: ResultCode::InvalidParameter,
        })
    );
}

#[test]
fn dropped_command_times_out() {
    let rig = PatchRig::new();
    rig.transport.reply.set(Reply::Drop);

    let r = rig
        .dispatcher
        .block_on(rig.tasks.low_reservoir.set(20, 6));

    assert_eq!(
        r,
        Err(TaskError::Timeout {
            func: TaskFunc::LowReservoir,
            after_ms: PatchRig::timing().command_timeout_ms,
        })
    );
    assert_eq!(
        rig.sink.count(|e| matches!(
            e,
            AppEvent::TaskFailed { error: TaskError::Timeout { .. }, .. }
        )),
        1
    );
}

#[test]
fn timed_out_enqueue_frees_the_slot() {
    let rig = PatchRig::new();
    rig.transport.reply.set(Reply::Drop);

    assert!(rig.tasks.update_connection.enqueue());
    rig.settle(PatchRig::timing().enqueue_timeout_ms + 100);
    assert_eq!(rig.sink.failed(TaskFunc::UpdateConnection), 1);

    rig.transport.reply.set(Reply::After(0));
    assert!(rig.tasks.update_connection.enqueue());
    rig.settle(20);

    assert_eq!(rig.transport.sent_count(is_update_connection), 2);
    assert_eq!(rig.sink.succeeded(TaskFunc::UpdateConnection), 1);
}

// ── Bonding ─────────────────────────────────────────────────

#[test]
fn bond_succeeds_after_bonded_state() {
    let rig = PatchRig::new();
    rig.transport
        .script_bond(&[BondState::Bonding, BondState::Bonding, BondState::Bonded]);

    let r = rig.dispatcher.block_on(rig.tasks.start_bond.start(MAC));

    assert_eq!(r, Ok(()));
    assert_eq!(
        rig.transport.sent(),
        vec![PatchCommand::StartBonding(BondingOption::Numeric)]
    );
    assert_eq!(rig.store.mac_address().as_str(), MAC);
    assert_eq!(rig.transport.mac.borrow().as_str(), MAC);
    assert_eq!(
        rig.sink.count(|e| matches!(e, AppEvent::PatchBonded { mac } if mac.as_str() == MAC)),
        1
    );

    // Durable: a fresh store over the same backend sees the MAC.
    let reloaded = PatchConfigStore::load(Box::new(rig.nvs.clone()));
    assert!(reloaded.get().is_bonded());
}

#[test]
fn bond_rolls_back_when_unbonded() {
    let rig = PatchRig::new();
    rig.transport
        .script_bond(&[BondState::Bonding, BondState::None, BondState::Bonded]);

    let r = rig.dispatcher.block_on(rig.tasks.start_bond.start(MAC));

    assert_eq!(r, Err(TaskError::Unbonded));
    assert!(rig.store.mac_address().is_empty());
    assert!(rig.transport.mac.borrow().is_empty());
    assert_eq!(rig.sink.count(|e| matches!(e, AppEvent::PatchBonded { .. })), 0);
    let reloaded = PatchConfigStore::load(Box::new(rig.nvs.clone()));
    assert!(!reloaded.get().is_bonded());
}

#[test]
fn bond_rolls_back_on_rejection() {
    let rig = PatchRig::new();
    rig.transport.reject_next(ResultCode::Failed);

    let r = rig.dispatcher.block_on(rig.tasks.start_bond.start(MAC));

    assert!(matches!(r, Err(TaskError::Rejected { .. })));
    assert!(rig.store.mac_address().is_empty());
}

#[test]
fn bond_rolls_back_on_timeout() {
    let rig = PatchRig::new();

    let r = rig.dispatcher.block_on(rig.tasks.start_bond.start(MAC));

    assert_eq!(
        r,
        Err(TaskError::Timeout {
            func: TaskFunc::StartBond,
            after_ms: PatchRig::timing().bond_timeout_ms,
        })
    );
    assert!(rig.store.mac_address().is_empty());
    assert!(rig.transport.mac.borrow().is_empty());
}

#[test]
fn cancelled_bond_rolls_back() {
    let rig = PatchRig::new();
    rig.transport.script_bond(&[BondState::Bonding]);

    assert!(rig.tasks.start_bond.enqueue(MAC));
    rig.settle(20);
    assert_eq!(rig.store.mac_address().as_str(), MAC);

    assert!(rig.tasks.start_bond.cancel());
    rig.dispatcher.try_run_pending();

    assert!(rig.store.mac_address().is_empty());
    assert!(rig.transport.mac.borrow().is_empty());
    assert!(!rig.tasks.start_bond.cancel());
}

#[test]
fn invalid_mac_is_rejected_without_staging() {
    let rig = PatchRig::new();

    let r = rig
        .dispatcher
        .block_on(rig.tasks.start_bond.start("not-a-mac"));

    assert!(matches!(r, Err(TaskError::InvalidArgument(_))));
    assert!(rig.transport.sent().is_empty());
    assert!(rig.transport.mac.borrow().is_empty());
    assert!(!rig.tasks.start_bond.enqueue("A0:B1"));
}

#[test]
fn bond_precondition_leaves_identity_untouched() {
    let rig = PatchRig::new();
    rig.transport.script_bond(&[BondState::Bonded]);
    rig.dispatcher
        .block_on(rig.tasks.start_bond.start(MAC))
        .unwrap();

    rig.transport.connected.set(false);
    let r = rig
        .dispatcher
        .block_on(rig.tasks.start_bond.start("11:22:33:44:55:66"));

    assert_eq!(
        r,
        Err(TaskError::Precondition(PreconditionFailure::NotConnected))
    );
    assert_eq!(rig.store.mac_address().as_str(), MAC);
}

#[test]
fn failed_persist_is_reported_and_rolled_back() {
    use insulinloop::app::ports::StorageError;

    struct ReadOnly;
    impl StoragePort for ReadOnly {
        fn read(&self, _: &str, _: &str, _: &mut [u8]) -> Result<usize, StorageError> {
            Err(StorageError::NotFound)
        }
        fn write(&mut self, _: &str, _: &str, _: &[u8]) -> Result<(), StorageError> {
            Err(StorageError::IoError)
        }
        fn delete(&mut self, _: &str, _: &str) -> Result<(), StorageError> {
            Ok(())
        }
        fn exists(&self, _: &str, _: &str) -> bool {
            false
        }
    }

    let store = PatchConfigStore::load(Box::new(ReadOnly));
    assert!(store.stage_mac(MAC).is_ok());
    assert!(store.commit_mac().is_err());
    store.rollback_mac();
    assert!(store.mac_address().is_empty());
}

// ── Quick bolus ─────────────────────────────────────────────

fn minutes(m: u16) -> Option<BolusExDuration> {
    BolusExDuration::from_minutes(m)
}

#[test]
fn bolus_variant_follows_dose_magnitudes() {
    let cases = [
        (1.5, 0.0, None, QuickBolus::Immediate { dose_u: 1.5 }),
        (
            0.0,
            2.0,
            minutes(60),
            QuickBolus::Extended {
                dose_u: 2.0,
                duration: BolusExDuration::from_minutes(60).unwrap(),
            },
        ),
        (
            1.0,
            2.0,
            minutes(90),
            QuickBolus::Combined {
                now_dose_u: 1.0,
                ext_dose_u: 2.0,
                duration: BolusExDuration::from_minutes(90).unwrap(),
            },
        ),
    ];
    for (now, ext, duration, expected) in cases {
        let rig = PatchRig::new();
        let r = rig
            .dispatcher
            .block_on(rig.tasks.quick_bolus.start(now, ext, duration));

        assert_eq!(r, Ok(expected));
        assert_eq!(rig.transport.sent(), vec![PatchCommand::StartBolus(expected)]);
        assert_eq!(
            rig.sink
                .count(|e| matches!(e, AppEvent::QuickBolusStarted(b) if *b == expected)),
            1
        );
    }
}

#[test]
fn accepted_bolus_refreshes_connection() {
    let rig = PatchRig::new();

    rig.dispatcher
        .block_on(rig.tasks.quick_bolus.start(1.0, 0.0, None))
        .unwrap();
    rig.settle(20);

    assert_eq!(rig.transport.sent_count(is_update_connection), 1);
    assert_eq!(
        rig.sink.count(|e| matches!(e, AppEvent::ConnectionUpdated(_))),
        1
    );
}

#[test]
fn rejected_bolus_does_not_refresh_connection() {
    let rig = PatchRig::new();
    rig.transport.reject_next(ResultCode::Busy);

    let r = rig
        .dispatcher
        .block_on(rig.tasks.quick_bolus.start(1.0, 0.0, None));
    rig.settle(20);

    assert!(matches!(r, Err(TaskError::Rejected { .. })));
    assert_eq!(rig.transport.sent_count(is_update_connection), 0);
}

#[test]
fn bolus_requires_activated_patch() {
    let rig = PatchRig::new();
    rig.transport.activated.set(false);

    let r = rig
        .dispatcher
        .block_on(rig.tasks.quick_bolus.start(1.0, 0.0, None));

    assert_eq!(
        r,
        Err(TaskError::Precondition(PreconditionFailure::NotActivated))
    );
    assert!(rig.transport.sent().is_empty());
}

#[test]
fn bolus_without_dose_is_invalid() {
    let rig = PatchRig::new();

    let r = rig
        .dispatcher
        .block_on(rig.tasks.quick_bolus.start(0.0, 0.0, None));

    assert!(matches!(r, Err(TaskError::InvalidArgument(_))));
    assert!(rig.transport.sent().is_empty());
    assert_eq!(rig.sink.failed(TaskFunc::StartQuickBolus), 1);
}

// ── Link errors ─────────────────────────────────────────────

#[test]
fn send_error_is_surfaced_and_reported() {
    let rig = PatchRig::new();
    rig.transport.fail_next_send(TransportError::Disconnected);

    let r = rig.dispatcher.block_on(rig.tasks.low_reservoir.set(20, 6));

    assert_eq!(r, Err(TaskError::Transport(TransportError::Disconnected)));
    assert_eq!(rig.sink.failed(TaskFunc::LowReservoir), 1);
    assert_eq!(rig.sink.succeeded(TaskFunc::LowReservoir), 0);
}

#[test]
fn closed_bond_stream_rolls_back() {
    let rig = PatchRig::new();
    rig.transport.script_bond(&[BondState::Bonding]);
    rig.transport.fail_bond_stream(TransportError::StreamClosed);

    let r = rig.dispatcher.block_on(rig.tasks.start_bond.start(MAC));

    assert_eq!(r, Err(TaskError::Transport(TransportError::StreamClosed)));
    assert!(rig.store.mac_address().is_empty());
    assert!(rig.transport.mac.borrow().is_empty());
    assert_eq!(rig.sink.failed(TaskFunc::StartBond), 1);
    assert_eq!(rig.sink.count(|e| matches!(e, AppEvent::PatchBonded { .. })), 0);
    let reloaded = PatchConfigStore::load(Box::new(rig.nvs.clone()));
    assert!(!reloaded.get().is_bonded());
}

#[test]
fn connection_refresh_rejects_unexpected_payload() {
    let rig = PatchRig::new();
    rig.transport.reply_next(ResponsePayload::Empty);

    let r = rig.dispatcher.block_on(rig.tasks.update_connection.update());

    assert!(matches!(r, Err(TaskError::Transport(TransportError::Io(_)))));
    assert_eq!(rig.sink.failed(TaskFunc::UpdateConnection), 1);
    assert_eq!(
        rig.sink.count(|e| matches!(e, AppEvent::ConnectionUpdated(_))),
        0
    );
}

#[test]
fn repeated_enqueue_and_cancel_without_driving() {
    let rig = PatchRig::new();

    for _ in 0..40 {
        assert!(rig.tasks.start_bond.enqueue(MAC));
        assert!(rig.tasks.start_bond.cancel());
    }
    rig.dispatcher.try_run_pending();

    assert!(rig.transport.sent().is_empty());
    assert!(rig.store.mac_address().is_empty());
    assert!(rig.tasks.low_reservoir.enqueue());
    rig.settle(20);
    assert_eq!(rig.sink.succeeded(TaskFunc::LowReservoir), 1);
}

// ── Context ─────────────────────────────────────────────────

#[test]
fn context_rejects_zero_deadline() {
    use std::rc::Rc;

    use insulinloop::adapters::NvsAdapter;
    use insulinloop::app::ports::{ConfigError, EventSink};
    use insulinloop::patch::{TaskContext, TaskDispatcher};

    use crate::mocks::{MockTransport, RecordingSink};

    let sink: Rc<dyn EventSink> = Rc::new(RecordingSink::new());
    let mut timing = PatchRig::timing();
    timing.enqueue_timeout_ms = 0;

    let ctx = TaskContext::new(
        Rc::new(MockTransport::default()),
        Rc::new(TaskDispatcher::new()),
        Rc::new(PatchConfigStore::load(Box::new(NvsAdapter::new()))),
        sink,
        timing,
    );

    assert!(matches!(ctx, Err(ConfigError::ValidationFailed(_))));
}
