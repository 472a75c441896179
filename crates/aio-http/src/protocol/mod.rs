//! Protocol types shared by the parser, the session and the handler.
//!
//! - [`RequestHeader`]: the parsed request head
//! - [`SessionInitError`], [`SessionError`], [`ParseError`], [`ResponseError`]:
//!   error types for each boundary of the session
//! - [`CloseReason`]: why a session ended

mod request;
pub use request::RequestHeader;

mod error;
pub use error::BufferModeError;
pub use error::CloseReason;
pub use error::ParseError;
pub use error::ResponseError;
pub use error::SessionError;
pub use error::SessionInitError;
