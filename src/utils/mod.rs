// Utility modules
// Author: kelexine (https://github.com/kelexine)

pub mod logging;
pub mod retry;
