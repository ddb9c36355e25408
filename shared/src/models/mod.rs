//! Domain models for the Course Platform

mod certificate;
mod course;
mod email;
mod finance;
mod notify;
mod payment;
mod profile;
mod support;
mod upload;

pub use certificate::*;
pub use course::*;
pub use email::*;
pub use finance::*;
pub use notify::*;
pub use payment::*;
pub use profile::*;
pub use support::*;
pub use upload::*;
