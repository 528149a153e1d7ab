pub mod trace_session;

pub use trace_session::{
    SessionError, TraceSessionActor, TraceSessionArguments, TraceSessionMsg,
};
