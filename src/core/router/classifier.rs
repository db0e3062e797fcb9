//! Telephony participant classification
//!
//! Deciding whether a participant is a phone caller is a heuristic over free-form
//! metadata, identity and display name. A negative answer means "could not
//! confirm", never "confirmed not telephony".

use crate::core::platform::{Participant, ParticipantKind};

pub trait TelephonyClassifier: Send + Sync {
    fn is_telephony(&self, participant: &Participant) -> bool;
}

const METADATA_MARKERS: &[&str] = &["sip", "twilio", "phone", "caller", "call", "tel:"];
const IDENTITY_MARKERS: &[&str] = &["sip:", "sip_", "tel:", "phone:", "caller:", "call-"];
const NAME_MARKERS: &[&str] = &["sip", "phone", "caller", "call"];

fn contains_marker(field: &str, markers: &[&str]) -> bool {
    if field.is_empty() {
        return false;
    }
    let lower = field.to_lowercase();
    markers.iter().any(|marker| lower.contains(marker))
}

/// Keyword heuristic over metadata, then identity, then display name
#[derive(Debug, Clone, Copy, Default)]
pub struct MarkerClassifier;

impl TelephonyClassifier for MarkerClassifier {
    fn is_telephony(&self, participant: &Participant) -> bool {
        contains_marker(&participant.metadata, METADATA_MARKERS)
            || contains_marker(&participant.identity, IDENTITY_MARKERS)
            || contains_marker(&participant.name, NAME_MARKERS)
    }
}

/// Trusts the platform's participant kind, falling back to [`MarkerClassifier`]
///
/// Agents are never telephony even when their names mention calls.
#[derive(Debug, Clone, Copy, Default)]
pub struct SipKindClassifier {
    fallback: MarkerClassifier,
}

impl TelephonyClassifier for SipKindClassifier {
    fn is_telephony(&self, participant: &Participant) -> bool {
        match participant.kind {
            ParticipantKind::Sip => true,
            ParticipantKind::Agent => false,
            _ => self.fallback.is_telephony(participant),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_participant_is_not_confirmed() {
        assert!(!MarkerClassifier.is_telephony(&Participant::default()));
    }

    #[test]
    fn test_metadata_marker_takes_precedence() {
        let participant = Participant::new("agent-7")
            .with_name("Reception Bot")
            .with_metadata(r#"{"source":"twilio"}"#);
        assert!(MarkerClassifier.is_telephony(&participant));
    }

    #[test]
    fn test_identity_markers() {
        assert!(MarkerClassifier.is_telephony(&Participant::new("sip_+15551234567")));
        assert!(MarkerClassifier.is_telephony(&Participant::new("caller:abc")));
        assert!(MarkerClassifier.is_telephony(&Participant::new("call-42")));
        assert!(!MarkerClassifier.is_telephony(&Participant::new("alice")));
    }

    #[test]
    fn test_name_markers() {
        let participant = Participant::new("p1").with_name("Phone +46701234567");
        assert!(MarkerClassifier.is_telephony(&participant));
    }

    #[test]
    fn test_sip_kind_classifier() {
        let classifier = SipKindClassifier::default();
        assert!(classifier.is_telephony(&Participant::new("x").with_kind(ParticipantKind::Sip)));
        assert!(!classifier.is_telephony(
            &Participant::new("switchboard-agent")
                .with_name("Call agent")
                .with_kind(ParticipantKind::Agent)
        ));
        assert!(classifier.is_telephony(&Participant::new("sip_+15550001111")));
    }
}
