//! Adapters: concrete implementations of the port traits.
//!
//! | Adapter    | Implements          | Connects to                    |
//! |------------|---------------------|--------------------------------|
//! | `i2c`      | RegisterTransport   | `embedded_hal::i2c::I2c` bus   |
//! | `gpio`     | InterruptSource     | Active-low NIRQ `InputPin`     |
//! | `log_sink` | EventSink           | `log` facade                   |

pub mod gpio;
pub mod i2c;
pub mod log_sink;
