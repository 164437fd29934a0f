pub mod debug;
pub mod error;
pub mod grad;
pub mod graph;
pub mod graphviz;
pub mod inplace;
pub mod loader;
pub mod operator;
pub mod ops;
pub mod registry;
pub mod schema;
pub mod shape_inference;
pub mod validator;

pub use error::OpError;
pub use grad::{ForwardOp, GradOpMaker};
pub use graph::{
    AttrKind, AttrValue, AttributeMap, DataType, OpDesc, Place, ProgramDesc, VarDesc,
    grad_var_name,
};
pub use graphviz::program_to_dot;
pub use inplace::InplaceInferer;
pub use loader::{load_program_from_path, parse_program};
pub use operator::{ExecutionContext, InferShapeContext, KernelKey, Operator};
pub use registry::{OpInfo, OpRegistry};
pub use schema::{OpProto, OpProtoMaker};
pub use validator::{ProgramValidator, ValidationArtifacts, ValidatorOptions};
