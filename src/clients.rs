pub mod search;
pub mod text_generation;

pub use search::{CompanyLookup, CustomSearchClient, SearchConfig};
pub use text_generation::{ChatCompletionClient, Prompt, TextGenerationConfig, TextGenerator};
