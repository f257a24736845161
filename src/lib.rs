//! Sluice - Template Engine
//!
//! A Liquid template engine. Templates are compiled once and may be rendered
//! any number of times, from any number of threads.
//!
//! ```
//! use sluice::{Engine, Store};
//!
//! let engine = Engine::default();
//! let template = engine
//!     .compile("{% for name in names %}hello, {{ name }}!{% unless forloop.last %} {% endunless %}{% endfor %}")
//!     .unwrap();
//! let store = Store::new().with_must("names", vec!["taylor", "jordan"]);
//!
//! assert_eq!(engine.render(&template, &store).unwrap(), "hello, taylor! hello, jordan!");
//! ```
mod access;
mod compile;
mod engine;
mod filter;
mod include;
mod log;
mod options;
mod outcome;
mod region;
mod render;
mod store;
mod syntax;
mod tag;

pub use access::{Accessor, Binding, JsonAccessor};
pub use compile::{compile, Template};
pub use engine::Engine;
pub use filter::{Arguments, Filter};
pub use include::Resolver;
pub use log::{Error, ErrorKind, Pointer, Visual};
pub use options::{Options, Trimming};
pub use outcome::{BoxFuture, Outcome};
pub use region::Region;
pub use render::{
    render,
    sink::{Async, BufferedSink, Destination, Io, Sink},
    Completion, Context, Encoder, Html, Verbatim,
};
pub use store::Store;
pub use syntax::{Builder, Marker};
pub use tag::{Tag, TagKind};
