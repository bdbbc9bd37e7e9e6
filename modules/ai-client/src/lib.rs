pub mod claude;
pub mod error;
mod http;
pub mod openai;
pub mod traits;
pub mod util;

pub use claude::Claude;
pub use error::{AiError, Result};
pub use openai::OpenAi;
pub use traits::{Completion, CompletionRequest, ResponseFormat};
pub use util::{extract_json_object, truncate_to_char_boundary};
