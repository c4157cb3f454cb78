pub mod container;
pub mod packet;
pub mod wav;

pub use container::{ContainerFactory, ContainerWriter};
pub use packet::{RtpHeader, RtpPacket};
pub use wav::{WavContainer, WavContainerFactory};
