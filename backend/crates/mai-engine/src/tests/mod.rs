mod engine_state;
mod server_status;
