pub mod chat_completion_request;
#[allow(clippy::module_inception)]
pub mod openai;
