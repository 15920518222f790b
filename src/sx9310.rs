//! SX9310 register map and reference values.
//!
//! Only the registers the core touches directly, plus the ones written by
//! the reference register program in [`DeviceConfig::default`](crate::config::DeviceConfig).

// ── Status / control ──────────────────────────────────────────
pub const REG_IRQ_SRC: u8 = 0x00;
pub const REG_STAT0: u8 = 0x01;
pub const REG_STAT1: u8 = 0x02;
pub const REG_IRQ_MSK: u8 = 0x03;
pub const REG_IRQ_FUNC: u8 = 0x04;

// ── Proximity sensing control ─────────────────────────────────
pub const REG_PROX_CTRL0: u8 = 0x10;
pub const REG_PROX_CTRL1: u8 = 0x11;
pub const REG_PROX_CTRL2: u8 = 0x12;
pub const REG_PROX_CTRL3: u8 = 0x13;
pub const REG_PROX_CTRL4: u8 = 0x14;
pub const REG_PROX_CTRL5: u8 = 0x15;
pub const REG_PROX_CTRL6: u8 = 0x16;
pub const REG_PROX_CTRL7: u8 = 0x17;
pub const REG_PROX_CTRL8: u8 = 0x18;
pub const REG_PROX_CTRL9: u8 = 0x19;
pub const REG_PROX_CTRL10: u8 = 0x1a;
pub const REG_PROX_CTRL11: u8 = 0x1b;
pub const REG_PROX_CTRL12: u8 = 0x1c;
pub const REG_PROX_CTRL13: u8 = 0x1d;
pub const REG_PROX_CTRL14: u8 = 0x1e;
pub const REG_PROX_CTRL15: u8 = 0x1f;
pub const REG_PROX_CTRL16: u8 = 0x20;
pub const REG_PROX_CTRL17: u8 = 0x21;
pub const REG_PROX_CTRL18: u8 = 0x22;
pub const REG_PROX_CTRL19: u8 = 0x23;

// ── SAR control ───────────────────────────────────────────────
pub const REG_SAR_CTRL0: u8 = 0x2a;
pub const REG_SAR_CTRL1: u8 = 0x2b;
pub const REG_SAR_CTRL2: u8 = 0x2c;

pub const REG_SOFT_RESET: u8 = 0x7f;
pub const SOFT_RESET_VALUE: u8 = 0xde;

/// Writing all-ones into the IRQ source register starts an offset
/// compensation pass.
pub const CALIBRATE_VALUE: u8 = 0xff;

// ── IRQ source bits ───────────────────────────────────────────
pub const IRQ_TXEN: u8 = 0;
pub const IRQ_CONV: u8 = 3;
pub const IRQ_COMP: u8 = 4;
pub const IRQ_RELEASE: u8 = 5;
pub const IRQ_TOUCH: u8 = 6;
pub const IRQ_RESET: u8 = 7;

// ── STAT0 per-sensor touch flags ──────────────────────────────
pub const TOUCH_CS0: u8 = 0x01;
pub const TOUCH_CS1: u8 = 0x02;
pub const TOUCH_CS2: u8 = 0x04;
pub const TOUCH_CS3: u8 = 0x08;

// ── Input key codes used by the reference button table ────────
pub const KEY_0: u16 = 11;
pub const KEY_1: u16 = 2;
pub const KEY_2: u16 = 3;
pub const KEY_3: u16 = 4;
