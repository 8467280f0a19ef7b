//#![warn(missing_docs)]

#![cfg_attr(not(feature = "std"), no_std)]
extern crate alloc;

pub mod clock;

pub mod tlv;

pub mod name;

pub mod packet;

pub mod sign;

pub mod transport;

pub mod tables;

pub mod node;

pub mod platform;
