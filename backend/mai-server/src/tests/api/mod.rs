mod chat_completion_request;
mod error;
