pub mod codec;
pub mod packet;
