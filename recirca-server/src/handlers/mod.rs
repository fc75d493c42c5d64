pub mod request_handlers;
