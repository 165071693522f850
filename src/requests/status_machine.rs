use crate::auth::models::{Identity, Role};
use crate::requests::error::LifecycleError;
use crate::requests::models::{HelpRequest, RequestEvent, RequestStatus, Transition};

/// Transition table and actor rules for help requests
pub struct StatusMachine;

impl StatusMachine {
    /// Where `event` takes a request in state `from`, if anywhere
    ///
    /// # Valid Transitions
    /// - Submitted → Assigned (accept)
    /// - Assigned → InProgress (start)
    /// - InProgress → Completed (finish)
    /// - Submitted, Assigned → Cancelled (cancel)
    /// - Completed, Cancelled → nothing
    pub fn target(from: RequestStatus, event: RequestEvent) -> Option<RequestStatus> {
        match (from, event) {
            (RequestStatus::Submitted, RequestEvent::Accept) => Some(RequestStatus::Assigned),
            (RequestStatus::Assigned, RequestEvent::Start) => Some(RequestStatus::InProgress),
            (RequestStatus::InProgress, RequestEvent::Finish) => Some(RequestStatus::Completed),
            (RequestStatus::Submitted | RequestStatus::Assigned, RequestEvent::Cancel) => {
                Some(RequestStatus::Cancelled)
            }
            _ => None,
        }
    }

    /// Check if a status transition is valid
    pub fn is_valid_transition(from: RequestStatus, to: RequestStatus) -> bool {
        RequestEvent::ALL
            .iter()
            .any(|event| Self::target(from, *event) == Some(to))
    }

    pub fn transition(
        from: RequestStatus,
        event: RequestEvent,
    ) -> Result<RequestStatus, LifecycleError> {
        Self::target(from, event).ok_or(LifecycleError::IllegalTransition { from, event })
    }

    /// Plans `event` on `request` by `actor`.
    ///
    /// The state is checked before the actor. Whether an accepting volunteer
    /// is within range is checked by the caller.
    pub fn plan(
        request: &HelpRequest,
        event: RequestEvent,
        actor: Identity,
    ) -> Result<Transition, LifecycleError> {
        let to = Self::transition(request.status, event)?;
        let is_assignee = request.assigned_volunteer_id == Some(actor.user_id);

        let allowed = match event {
            RequestEvent::Accept => actor.role == Role::Volunteer,
            RequestEvent::Start => actor.role == Role::Volunteer && is_assignee,
            RequestEvent::Finish => {
                actor.role == Role::Moderator || (actor.role == Role::Volunteer && is_assignee)
            }
            RequestEvent::Cancel => {
                actor.role == Role::Moderator
                    || (actor.role == Role::Beneficiary
                        && request.beneficiary_id == actor.user_id)
            }
        };
        if !allowed {
            return Err(LifecycleError::NotAllowed(format!(
                "{} {} may not {} this request",
                actor.role, actor.user_id, event
            )));
        }

        let assigned_volunteer_id = match event {
            RequestEvent::Accept => Some(actor.user_id),
            _ => request.assigned_volunteer_id,
        };

        Ok(Transition {
            request_id: request.id,
            from: request.status,
            to,
            assigned_volunteer_id,
            actor_id: actor.user_id,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use uuid::Uuid;

    const BENEFICIARY: Identity = Identity {
        user_id: 1,
        role: Role::Beneficiary,
    };
    const VOLUNTEER: Identity = Identity {
        user_id: 2,
        role: Role::Volunteer,
    };
    const OTHER_VOLUNTEER: Identity = Identity {
        user_id: 3,
        role: Role::Volunteer,
    };
    const MODERATOR: Identity = Identity {
        user_id: 4,
        role: Role::Moderator,
    };

    fn request(status: RequestStatus, assigned: Option<i32>) -> HelpRequest {
        HelpRequest {
            id: Uuid::new_v4(),
            beneficiary_id: BENEFICIARY.user_id,
            category_id: None,
            description: "Pharmacy run".into(),
            latitude: 50.45,
            longitude: 30.52,
            address_name: None,
            radius_km: 5.0,
            status,
            assigned_volunteer_id: assigned,
            active_to: None,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn happy_path() {
        assert_eq!(
            StatusMachine::target(RequestStatus::Submitted, RequestEvent::Accept),
            Some(RequestStatus::Assigned)
        );
        assert_eq!(
            StatusMachine::target(RequestStatus::Assigned, RequestEvent::Start),
            Some(RequestStatus::InProgress)
        );
        assert_eq!(
            StatusMachine::target(RequestStatus::InProgress, RequestEvent::Finish),
            Some(RequestStatus::Completed)
        );
    }

    #[test]
    fn cancel_only_before_work_starts() {
        assert!(StatusMachine::is_valid_transition(
            RequestStatus::Submitted,
            RequestStatus::Cancelled
        ));
        assert!(StatusMachine::is_valid_transition(
            RequestStatus::Assigned,
            RequestStatus::Cancelled
        ));
        assert!(!StatusMachine::is_valid_transition(
            RequestStatus::InProgress,
            RequestStatus::Cancelled
        ));
    }

    #[test]
    fn no_skipping_states() {
        assert!(!StatusMachine::is_valid_transition(
            RequestStatus::Submitted,
            RequestStatus::InProgress
        ));
        assert!(!StatusMachine::is_valid_transition(
            RequestStatus::Submitted,
            RequestStatus::Completed
        ));
        assert!(!StatusMachine::is_valid_transition(
            RequestStatus::Assigned,
            RequestStatus::Completed
        ));
    }

    #[test]
    fn accept_assigns_the_volunteer() {
        let plan = StatusMachine::plan(
            &request(RequestStatus::Submitted, None),
            RequestEvent::Accept,
            VOLUNTEER,
        )
        .unwrap();
        assert_eq!(plan.to, RequestStatus::Assigned);
        assert_eq!(plan.assigned_volunteer_id, Some(VOLUNTEER.user_id));
    }

    #[test]
    fn only_the_assignee_starts() {
        let assigned = request(RequestStatus::Assigned, Some(VOLUNTEER.user_id));
        assert!(StatusMachine::plan(&assigned, RequestEvent::Start, VOLUNTEER).is_ok());
        assert!(matches!(
            StatusMachine::plan(&assigned, RequestEvent::Start, OTHER_VOLUNTEER),
            Err(LifecycleError::NotAllowed(_))
        ));
        assert!(matches!(
            StatusMachine::plan(&assigned, RequestEvent::Start, MODERATOR),
            Err(LifecycleError::NotAllowed(_))
        ));
    }

    #[test]
    fn assignee_or_moderator_finishes() {
        let in_progress = request(RequestStatus::InProgress, Some(VOLUNTEER.user_id));
        assert!(StatusMachine::plan(&in_progress, RequestEvent::Finish, VOLUNTEER).is_ok());
        assert!(StatusMachine::plan(&in_progress, RequestEvent::Finish, MODERATOR).is_ok());
        assert!(matches!(
            StatusMachine::plan(&in_progress, RequestEvent::Finish, OTHER_VOLUNTEER),
            Err(LifecycleError::NotAllowed(_))
        ));
        assert!(matches!(
            StatusMachine::plan(&in_progress, RequestEvent::Finish, BENEFICIARY),
            Err(LifecycleError::NotAllowed(_))
        ));
    }

    #[test]
    fn owner_or_moderator_cancels() {
        let submitted = request(RequestStatus::Submitted, None);
        assert!(StatusMachine::plan(&submitted, RequestEvent::Cancel, BENEFICIARY).is_ok());
        assert!(StatusMachine::plan(&submitted, RequestEvent::Cancel, MODERATOR).is_ok());

        let stranger = Identity {
            user_id: 99,
            role: Role::Beneficiary,
        };
        assert!(matches!(
            StatusMachine::plan(&submitted, RequestEvent::Cancel, stranger),
            Err(LifecycleError::NotAllowed(_))
        ));
    }

    #[test]
    fn wrong_state_wins_over_wrong_actor() {
        let completed = request(RequestStatus::Completed, Some(VOLUNTEER.user_id));
        assert!(matches!(
            StatusMachine::plan(&completed, RequestEvent::Cancel, OTHER_VOLUNTEER),
            Err(LifecycleError::IllegalTransition { .. })
        ));
    }

    mod properties {
        use super::*;
        use proptest::prelude::*;

        fn status() -> impl Strategy<Value = RequestStatus> {
            prop::sample::select(RequestStatus::ALL.to_vec())
        }

        fn event() -> impl Strategy<Value = RequestEvent> {
            prop::sample::select(RequestEvent::ALL.to_vec())
        }

        proptest! {
            #[test]
            fn terminal_states_accept_nothing(status in status(), event in event()) {
                if status.is_terminal() {
                    prop_assert!(StatusMachine::target(status, event).is_none());
                }
            }

            #[test]
            fn transitions_never_go_back_to_submitted(status in status(), event in event()) {
                prop_assert_ne!(StatusMachine::target(status, event), Some(RequestStatus::Submitted));
            }

            #[test]
            fn illegal_pairs_are_rejected_for_every_actor(
                status in status(),
                event in event(),
                actor_id in 1i32..10,
                role in prop::sample::select(Role::ALL.to_vec()),
            ) {
                let actor = Identity { user_id: actor_id, role };
                let result = StatusMachine::plan(&request(status, Some(actor_id)), event, actor);
                if StatusMachine::target(status, event).is_none() {
                    let is_illegal = matches!(result, Err(LifecycleError::IllegalTransition { .. }));
                    prop_assert!(is_illegal);
                }
            }

            #[test]
            fn planned_transitions_follow_the_table(
                status in status(),
                event in event(),
            ) {
                if let Ok(plan) = StatusMachine::plan(&request(status, Some(VOLUNTEER.user_id)), event, MODERATOR) {
                    prop_assert_eq!(plan.from, status);
                    prop_assert!(StatusMachine::is_valid_transition(plan.from, plan.to));
                }
            }
        }
    }
}
