mod elasticsearch;
mod memory;

pub use elasticsearch::{ElasticsearchIndex, map_reqwest_error, parse_search_response};
pub use memory::MemoryIndex;
