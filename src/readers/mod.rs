pub mod concurrent_reader;
pub mod partition_reader;
pub mod table_reader;

pub use concurrent_reader::{ConcurrentReader, FileResult};
pub use partition_reader::PartitionReader;
pub use table_reader::TableReader;
