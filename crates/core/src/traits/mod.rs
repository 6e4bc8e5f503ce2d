//! Platform service abstractions injected into the control core.
//!
//! The core never talks to hardware directly: time and persistent storage
//! are supplied by the surrounding platform through these traits. Mock
//! implementations live next to the traits so the whole core is testable
//! on the host.

mod flash;
mod time;

pub use flash::{FlashError, FlashInterface, FlashResult, MockFlash, MOCK_FLASH_CAPACITY};
pub use time::{MockTime, TimeSource};
