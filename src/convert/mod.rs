pub mod cancel;
pub mod driver;
pub mod extract;
pub mod output;
pub mod poll;
pub mod types;

pub use cancel::CancelToken;
pub use driver::{Converter, build_prompt, fence_language, parse_reply};
pub use extract::{ExtractError, ExtractionMode, extract_payload};
pub use output::{read_steps, write_steps};
pub use poll::wait_for_run;
pub use types::{ConversionOutcome, ConvertError, ConvertOptions, ConvertResult, PollOptions};
