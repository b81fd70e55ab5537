pub mod remote_write_handler;
