//! Integration tests for probe → init → suspend/resume → remove.
//!
//! Drives a real `DeviceHandle` against the mock bus, sink and line, and
//! asserts on the exact register traffic.

use sx93xx::app::events::KeyEvent;
use sx93xx::config::RegisterWrite;
use sx93xx::sx9310::*;
use sx93xx::{ConfigError, DeviceConfig, Error, LifecycleState, ResourceError, StateError};

use crate::mock_hw::{BusOp, Rig};

fn three_write_config() -> DeviceConfig {
    let mut c = DeviceConfig::default();
    c.program.clear();
    for (reg, value) in [(0x10, 0x01), (0x11, 0x02), (0x12, 0x03)] {
        c.program.push(RegisterWrite::new(reg, value)).unwrap();
    }
    c
}

// ── Reset-then-armed sequence ────────────────────────────────

#[test]
fn probe_runs_reset_program_calibrate_arm() {
    let rig = Rig::new();
    let dev = rig.probe(three_write_config()).unwrap();

    assert_eq!(
        rig.bus.log(),
        vec![
            BusOp::Write(REG_SOFT_RESET, SOFT_RESET_VALUE),
            BusOp::Write(0x10, 0x01),
            BusOp::Write(0x11, 0x02),
            BusOp::Write(0x12, 0x03),
            BusOp::Write(REG_IRQ_SRC, CALIBRATE_VALUE),
            BusOp::Read(REG_IRQ_SRC),
        ]
    );
    assert_eq!(*rig.delay.ms.lock().unwrap(), vec![300, 100]);
    assert_eq!(dev.state(), LifecycleState::Armed);
    assert!(dev.irq_enabled());
    assert!(rig.line.is_enabled());
    assert!(rig.line.is_registered());
    assert_eq!(dev.cycle_count(), 0);
}

#[test]
fn settle_delays_follow_config() {
    let rig = Rig::new();
    let mut c = three_write_config();
    c.reset_settle_ms = 5;
    c.calibration_settle_ms = 1;
    let _dev = rig.probe(c).unwrap();
    assert_eq!(*rig.delay.ms.lock().unwrap(), vec![5, 1]);
}

#[test]
fn program_failure_stops_writes_and_degrades() {
    let rig = Rig::new();
    // write 0 = soft reset, write 2 = program entry 2
    rig.bus.state().fail_write_at = Some(2);
    let dev = rig.probe(three_write_config()).unwrap();

    assert_eq!(
        rig.bus.log(),
        vec![
            BusOp::Write(REG_SOFT_RESET, SOFT_RESET_VALUE),
            BusOp::Write(0x10, 0x01),
        ]
    );
    assert_eq!(dev.state(), LifecycleState::Degraded);
    assert!(!dev.irq_enabled());
    assert!(!rig.line.is_enabled());
    assert_eq!(rig.sink.events(), vec![KeyEvent::press(KEY_0)]);
}

#[test]
fn discard_read_failure_degrades_with_fail_safe() {
    let rig = Rig::new();
    // the discard read is the only register read during init
    rig.bus.state().fail_reads_of = Some(REG_IRQ_SRC);
    let dev = rig.probe(three_write_config()).unwrap();

    assert_eq!(dev.state(), LifecycleState::Degraded);
    assert!(!dev.irq_enabled());
    assert!(!rig.line.is_enabled());
    assert_eq!(rig.sink.events(), vec![KeyEvent::press(KEY_0)]);
}

#[test]
fn degraded_device_recovers_through_init() {
    let rig = Rig::new();
    rig.bus.state().fail_write_at = Some(0);
    let dev = rig.probe(three_write_config()).unwrap();
    assert_eq!(dev.state(), LifecycleState::Degraded);

    // interrupts stay masked until init succeeds
    assert!(!rig.line.fire());

    dev.init().unwrap();
    assert_eq!(dev.state(), LifecycleState::Armed);
    assert!(rig.line.is_enabled());
}

#[test]
fn invalid_config_touches_nothing() {
    let rig = Rig::new();
    let mut c = DeviceConfig::default();
    c.buttons.clear();
    let err = rig.probe(c).err().unwrap();
    assert_eq!(err, Error::Config(ConfigError::NoButtons));
    assert!(rig.bus.log().is_empty());
    assert!(!rig.line.is_registered());
}

#[test]
fn busy_irq_line_fails_probe() {
    let rig = Rig::new();
    rig.line.state.lock().unwrap().refuse_register = true;
    let err = rig.probe(DeviceConfig::default()).err().unwrap();
    assert_eq!(err, Error::Resource(ResourceError::IrqRegistration));
    assert!(rig.bus.log().is_empty());
}

// ── Manual calibration ───────────────────────────────────────

#[test]
fn calibration_is_idempotent() {
    let rig = Rig::new();
    let dev = rig.probe(three_write_config()).unwrap();
    rig.bus.clear_log();

    dev.calibrate().unwrap();
    dev.calibrate().unwrap();
    assert_eq!(
        rig.bus.log(),
        vec![
            BusOp::Write(REG_IRQ_SRC, CALIBRATE_VALUE),
            BusOp::Write(REG_IRQ_SRC, CALIBRATE_VALUE),
        ]
    );
    assert_eq!(dev.state(), LifecycleState::Armed);
}

#[test]
fn calibration_surface() {
    let rig = Rig::new();
    let dev = rig.probe(three_write_config()).unwrap();
    rig.bus.set_reg(REG_IRQ_SRC, 0x41);
    assert_eq!(dev.calibration_status().unwrap(), 0x41);

    rig.bus.clear_log();
    dev.set_calibration(0).unwrap();
    assert!(rig.bus.log().is_empty());
    dev.set_calibration(7).unwrap();
    assert_eq!(rig.bus.log(), vec![BusOp::Write(REG_IRQ_SRC, CALIBRATE_VALUE)]);
}

#[test]
fn calibration_status_failure_reports_without_fail_safe() {
    let rig = Rig::new();
    let dev = rig.probe(three_write_config()).unwrap();
    rig.bus.state().fail_reads_of = Some(REG_IRQ_SRC);

    let err = dev.calibration_status().unwrap_err();
    assert!(matches!(err, Error::Bus(e) if e.reg() == REG_IRQ_SRC));
    assert!(rig.sink.events().is_empty());
    assert_eq!(rig.sink.syncs(), 0);
    assert_eq!(dev.state(), LifecycleState::Armed);
}

#[test]
fn calibrate_write_failure_forces_touch_without_state_change() {
    let rig = Rig::new();
    let dev = rig.probe(three_write_config()).unwrap();
    // 5 writes so far: reset, 3 program, calibrate
    rig.bus.state().fail_write_at = Some(5);
    assert!(matches!(dev.calibrate(), Err(Error::Bus(_))));
    assert_eq!(dev.state(), LifecycleState::Armed);
    assert_eq!(rig.sink.events(), vec![KeyEvent::press(KEY_0)]);
}

// ── Suspend / resume ─────────────────────────────────────────

#[test]
fn suspend_masks_and_resume_reinitializes() {
    let rig = Rig::new();
    let dev = rig.probe(three_write_config()).unwrap();

    dev.suspend().unwrap();
    assert_eq!(dev.state(), LifecycleState::Suspended);
    assert!(!dev.irq_enabled());
    assert!(!rig.line.fire());

    rig.bus.clear_log();
    dev.resume().unwrap();
    let log = rig.bus.log();
    assert_eq!(log[0], BusOp::Read(REG_IRQ_SRC));
    assert_eq!(log[1], BusOp::Write(REG_SOFT_RESET, SOFT_RESET_VALUE));
    assert_eq!(log.last(), Some(&BusOp::Read(REG_IRQ_SRC)));
    assert_eq!(dev.state(), LifecycleState::Armed);
    assert!(dev.irq_enabled());
    assert_eq!(dev.cycle_count(), 1);
}

#[test]
fn operations_in_wrong_state_are_rejected() {
    let rig = Rig::new();
    let dev = rig.probe(three_write_config()).unwrap();

    assert_eq!(
        dev.resume(),
        Err(Error::State(StateError {
            op: "resume",
            state: LifecycleState::Armed
        }))
    );

    dev.suspend().unwrap();
    rig.bus.clear_log();
    assert!(matches!(dev.calibrate(), Err(Error::State(_))));
    assert!(matches!(dev.suspend(), Err(Error::State(_))));
    assert!(rig.bus.log().is_empty());
    assert_eq!(dev.state(), LifecycleState::Suspended);
}

// ── Removal ──────────────────────────────────────────────────

#[test]
fn remove_releases_line_and_returns_peripherals() {
    let rig = Rig::new();
    let dev = rig.probe(three_write_config()).unwrap();
    let (bus, sink, line) = dev.remove().unwrap();

    assert!(!rig.line.is_registered());
    assert!(!rig.line.fire());
    assert_eq!(bus.log().len(), 6);
    assert!(sink.events().is_empty());
    assert!(!line.is_enabled());
}
