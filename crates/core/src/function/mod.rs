//! Function identity, deferred calls and their transportable descriptors.
//!
//! A callable crosses the isolation boundary as a [`SerializedFunctionCall`]:
//! the id it was registered under plus data-only parameters. The receiving
//! side turns the id back into code through its own [`FunctionRegistry`].

mod call;
mod descriptor;
mod id;
mod registry;
mod serializer;

pub use call::{CallParam, Callee, FunctionCall};
pub use descriptor::{Parameter, SerializedFunctionCall};
pub use id::FunctionId;
pub use registry::{FunctionBody, FunctionRef, FunctionRegistry, Invocation};
pub use serializer::FunctionCallSerializer;
