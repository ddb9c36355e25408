//! Business logic services

pub mod auth;
pub mod certificate;
pub mod content;
pub mod course;
pub mod email_inbound;
pub mod enrollment;
pub mod finance;
pub mod notification;
pub mod passcode;
pub mod payment;
pub mod profile;
pub mod progress;
pub mod realtime;
pub mod support;
pub mod upload;
pub mod video;
