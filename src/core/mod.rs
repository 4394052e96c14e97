pub mod chord;
pub mod history;
pub mod looper;
pub mod message;
pub mod note;
pub mod session;
pub mod ticker;
pub mod transport;
pub mod viewport;
