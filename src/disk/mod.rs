pub mod block_device;
pub mod ram_disk;
pub mod types;

pub use block_device::BlockDevice;
pub use ram_disk::RamDisk;
pub use types::{Block, BLOCK_COUNT, BLOCK_SIZE, IMAGE_SIZE};
