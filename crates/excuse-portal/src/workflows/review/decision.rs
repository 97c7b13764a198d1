use std::fmt;

use super::ReviewError;
use crate::api::{UpdateCommitteeDecision, UpdateDecision};
use crate::domain::{
    CommitteeDecision, EmployeeDecision, ExcuseId, ExcuseRequest, Signature, SignatureId,
    MAX_SIGNATURES,
};

pub const EMPLOYEE_CHOICES: &[EmployeeDecision] = &[
    EmployeeDecision::Approved,
    EmployeeDecision::Rejected,
    EmployeeDecision::Committee,
];

pub const COMMITTEE_CHOICES: &[CommitteeDecision] =
    &[CommitteeDecision::Approved, CommitteeDecision::Rejected];

/// Where an excuse sits in the review lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DecisionPhase {
    AwaitingEmployee,
    AwaitingCommittee,
    Finalized,
}

impl DecisionPhase {
    /// The committee phase opens as soon as the employee decision is locked,
    /// whatever its value.
    pub fn derive(employee: EmployeeDecision, committee: CommitteeDecision) -> Self {
        match (employee.is_locked(), committee.is_locked()) {
            (false, _) => DecisionPhase::AwaitingEmployee,
            (true, false) => DecisionPhase::AwaitingCommittee,
            (true, true) => DecisionPhase::Finalized,
        }
    }

    pub fn of(excuse: &ExcuseRequest) -> Self {
        Self::derive(excuse.employee_decision, excuse.committee_decision)
    }

    pub const fn label(self) -> &'static str {
        match self {
            DecisionPhase::AwaitingEmployee => "awaiting_employee",
            DecisionPhase::AwaitingCommittee => "awaiting_committee",
            DecisionPhase::Finalized => "finalized",
        }
    }
}

impl fmt::Display for DecisionPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EmployeePanel {
    Editable { choices: &'static [EmployeeDecision] },
    Locked(EmployeeDecision),
}

/// A chosen signatory rendered as a read-only badge.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignatureBadge {
    pub id: SignatureId,
    pub name: String,
    pub position: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CommitteePanel {
    /// Not rendered at all until the employee decision is locked.
    Hidden,
    Editable {
        choices: &'static [CommitteeDecision],
        max_signatures: usize,
    },
    Locked {
        decision: CommitteeDecision,
        comment: String,
        signatures: Vec<SignatureBadge>,
    },
}

/// What the admin detail screen shows for one excuse.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecisionView {
    pub id: ExcuseId,
    pub phase: DecisionPhase,
    pub employee: EmployeePanel,
    pub committee: CommitteePanel,
}

impl DecisionView {
    pub fn for_excuse(excuse: &ExcuseRequest, signatures: &[Signature]) -> Self {
        let phase = DecisionPhase::of(excuse);

        let employee = match phase {
            DecisionPhase::AwaitingEmployee => EmployeePanel::Editable {
                choices: EMPLOYEE_CHOICES,
            },
            _ => EmployeePanel::Locked(excuse.employee_decision),
        };

        let committee = match phase {
            DecisionPhase::AwaitingEmployee => CommitteePanel::Hidden,
            DecisionPhase::AwaitingCommittee => CommitteePanel::Editable {
                choices: COMMITTEE_CHOICES,
                max_signatures: signature_cap(signatures),
            },
            DecisionPhase::Finalized => CommitteePanel::Locked {
                decision: excuse.committee_decision,
                comment: excuse.committee_comment.clone(),
                signatures: excuse
                    .committee_signatures
                    .iter()
                    .map(|id| badge(id, signatures))
                    .collect(),
            },
        };

        Self {
            id: excuse.id.clone(),
            phase,
            employee,
            committee,
        }
    }

    /// A save action is offered while any phase is still open.
    pub fn can_save(&self) -> bool {
        self.phase != DecisionPhase::Finalized
    }
}

fn badge(id: &SignatureId, signatures: &[Signature]) -> SignatureBadge {
    match signatures.iter().find(|signature| &signature.id == id) {
        Some(signature) => SignatureBadge {
            id: id.clone(),
            name: signature.name.clone(),
            position: signature.position.clone(),
        },
        None => SignatureBadge {
            id: id.clone(),
            name: id.0.clone(),
            position: String::new(),
        },
    }
}

fn signature_cap(signatures: &[Signature]) -> usize {
    signatures.len().min(MAX_SIGNATURES)
}

/// Phase-two form contents.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CommitteeInput {
    pub decision: Option<CommitteeDecision>,
    pub comment: String,
    pub signatures: Vec<SignatureId>,
}

/// Check a phase-one save and build the request for it.
pub fn plan_employee_decision(
    excuse: &ExcuseRequest,
    choice: Option<EmployeeDecision>,
) -> Result<UpdateDecision, ReviewError> {
    if excuse.employee_decision.is_locked() {
        return Err(ReviewError::PhaseLocked {
            id: excuse.id.clone(),
            phase: "employee",
        });
    }

    match choice {
        Some(decision) if decision.is_locked() => Ok(UpdateDecision {
            id: excuse.id.clone(),
            decision,
        }),
        _ => Err(ReviewError::NoSelection),
    }
}

/// Check a phase-two save and build the request for it. Duplicate
/// signatures collapse; every id must name a known signature.
pub fn plan_committee_decision(
    excuse: &ExcuseRequest,
    input: &CommitteeInput,
    available: &[Signature],
) -> Result<UpdateCommitteeDecision, ReviewError> {
    match DecisionPhase::of(excuse) {
        DecisionPhase::AwaitingEmployee => {
            return Err(ReviewError::CommitteeNotReady {
                id: excuse.id.clone(),
            })
        }
        DecisionPhase::Finalized => {
            return Err(ReviewError::PhaseLocked {
                id: excuse.id.clone(),
                phase: "committee",
            })
        }
        DecisionPhase::AwaitingCommittee => {}
    }

    let decision = match input.decision {
        Some(decision) if decision.is_locked() => decision,
        _ => return Err(ReviewError::NoSelection),
    };

    let mut chosen: Vec<SignatureId> = Vec::with_capacity(input.signatures.len());
    for id in &input.signatures {
        if chosen.contains(id) {
            continue;
        }
        if !available.iter().any(|signature| &signature.id == id) {
            return Err(ReviewError::UnknownSignature(id.clone()));
        }
        chosen.push(id.clone());
    }

    let max = signature_cap(available);
    if chosen.len() > max {
        return Err(ReviewError::TooManySignatures {
            chosen: chosen.len(),
            max,
        });
    }

    Ok(UpdateCommitteeDecision {
        id: excuse.id.clone(),
        decision,
        comment: input.comment.trim().to_string(),
        signatures: chosen,
    })
}
