#![no_std]

#[macro_use]
pub extern crate alloc;

#[cfg(feature = "std")]
extern crate std;

pub mod address;
pub mod error;
pub mod flags;
pub mod interpreter;
pub mod signature;
pub mod utils;
pub mod verifier;
pub mod verify;
pub mod witness;

pub use address::*;
pub use error::*;
pub use flags::*;
pub use signature::*;
pub use utils::*;
pub use verifier::*;
pub use verify::*;
pub use witness::*;
