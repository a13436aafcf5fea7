//! Adapters: concrete implementations of the port traits.
//!
//! | Adapter      | Implements            | Connects to                  |
//! |--------------|-----------------------|------------------------------|
//! | `device_id`  | (identity)            | host name                    |
//! | `file_store` | StatePort             | postcard blob on disk / RAM  |
//! | `hardware`   | SensorPort            | any sensor half              |
//! |              | ActuatorPort          | any actuator half            |
//! | `pulse`      | ActuatorPort          | embedded-hal `OutputPin`     |
//! | `sysfs`      | SensorPort, OutputPin | text value files             |
//! | `terminal`   | Renderer              | ANSI terminal                |
//! | `time`       | Clock, DelayNs        | `std::time`                  |
//! | `udp`        | Transport             | UDP broadcast socket         |

pub mod device_id;
pub mod file_store;
pub mod hardware;
pub mod pulse;
pub mod sysfs;
pub mod terminal;
pub mod time;
pub mod udp;
