pub mod builtins;
pub mod config;
pub mod error;
pub mod function;
pub mod task;

pub use config::PoolConfig;
pub use error::FunctionError;
pub use function::{
    CallParam, Callee, FunctionCall, FunctionCallSerializer, FunctionId, FunctionRef,
    FunctionRegistry, Invocation, Parameter, SerializedFunctionCall,
};
pub use task::{ProcessParams, SerializedEnvironment, SerializedOperation, TaskDefinition};

pub use serde_json::{json, Value};
