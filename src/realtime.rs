pub mod channel;
pub(crate) mod socket;
