pub mod address;
pub mod fixed;
pub mod partial;
pub mod platform;
pub mod position;

pub use address::{Address, ParseAddressError};
pub use fixed::{FIXED_DECIMALS, FIXED_ONE, MAX_TOKEN_DECIMALS, Ratio, Usd, mul_div_floor};
pub use partial::{DataWarning, PartialResult, WarningKind};
pub use platform::{Accrual, Platform};
pub use position::{Position, RewardEvent, Token, Window, WindowError};

/// Seconds in a day, the default KPI reference period.
pub const ONE_DAY_SECS: i64 = 24 * 60 * 60;
