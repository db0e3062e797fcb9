pub mod consultation;
pub mod switchboard;

pub use consultation::{
    ConsultationAgent, ConsultationBrief, RECORD_DECISION_TOOL, record_decision_tool,
};
pub use switchboard::{DEFAULT_GREETING, SwitchboardAgent};
