mod parse;
mod types;

pub use self::types::Message;
