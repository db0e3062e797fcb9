pub mod agents;
pub mod directory;
pub mod notify;
pub mod platform;
pub mod router;
pub mod session;
pub mod sweeper;
pub mod transfer;

// Re-export commonly used types for convenience
pub use agents::{ConsultationAgent, SwitchboardAgent};
pub use directory::{DirectoryClient, DirectoryError, DirectoryResult};
pub use notify::{EmailSender, NotificationResult, SmsSender};
pub use platform::{MediaPlatform, Participant, ParticipantKind, PlatformError, PlatformResult};
pub use router::{CallRouter, CallerInfo, RoomStats};
pub use session::{
    AgentTools, ConversationalSession, SessionError, SessionHandle, SessionLauncher, SessionResult,
};
pub use transfer::{TransferOutcome, TransferStatus, WarmTransferOrchestrator};
