pub mod live;
pub mod order;
pub mod subscription;
pub mod transport;
