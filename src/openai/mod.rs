mod core;

pub use self::core::{
    Completion, LanguageModel, Message, OpenAI, Role, Usage, completion, parse_completion,
};
