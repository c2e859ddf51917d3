#![allow(clippy::pedantic)]
#![allow(clippy::nursery)]
#![deny(clippy::unwrap_used)]
#![allow(clippy::missing_errors_doc)]

pub mod api;
pub mod cart;
pub mod constants;
pub mod profile;

pub use crate::api::*;
pub use crate::cart::*;
pub use crate::constants::*;
pub use crate::profile::*;
