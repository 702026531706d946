//! System-wide constants for the netclear engine.

/// Default ceiling on clearing rounds before the controller gives up.
pub const DEFAULT_MAX_ROUNDS: u32 = 10_000;

/// Default amount added to a selected seller's price each round.
pub const DEFAULT_PRICE_INCREMENT: f64 = 1.0;

/// Price assigned to a seller whose description carries none.
pub const DEFAULT_PRICE: f64 = 0.0;

/// Domain separator for the final price digest.
pub const PRICE_ROOT_DOMAIN: &[u8] = b"netclear:price_root:v1:";

/// Version string.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Engine name.
pub const ENGINE_NAME: &str = "netclear";
