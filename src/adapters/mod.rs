//! Adapters: concrete implementations of the port traits.
//!
//! | Adapter        | Implements            | Connects to                  |
//! |----------------|-----------------------|------------------------------|
//! | `i2c`          | BusReader             | Sensor controller over I2C   |
//! | `sim`          | BusReader             | Scripted garage cycle        |
//! | `log_sink`     | Camera                | Log output (no camera)       |
//! |                | AuditHooks            | Log output                   |
//! |                | StatusReporter        | Log output                   |
//! |                | ParkingTelemetrySink  | Log output                   |
//! | `config_file`  | ConfigPort            | JSON file on disk            |
//! | `time`         | -                     | Host monotonic clock         |

pub mod config_file;
pub mod i2c;
pub mod log_sink;
pub mod sim;
pub mod time;
