pub mod connection;

pub use connection::{
    connect_any, dispatch, establish, read_loop, resolve, ConnectionInfo, ReadOutcome,
    DEFAULT_HOST, DEFAULT_PORT,
};
