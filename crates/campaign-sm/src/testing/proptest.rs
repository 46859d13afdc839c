//! Property-based testing macros for state machines.

/// Property: the same state and event always yield the same result.
#[macro_export]
macro_rules! prop_deterministic {
    ($sm_type:ty, $create_fn:expr, $get_state_fn:expr, $config:expr, $state_strategy:expr, $event_strategy:expr) => {
        proptest::proptest! {
            #[test]
            fn state_machine_is_deterministic(
                state in $state_strategy,
                event in $event_strategy,
            ) {
                use $crate::state_machine::StateMachine;

                let mut sm1: $sm_type = $create_fn(state.clone());
                let mut sm2: $sm_type = $create_fn(state);

                let result1 = sm1.process_event($config, event.clone());
                let result2 = sm2.process_event($config, event);

                match (result1, result2) {
                    (Ok(out1), Ok(out2)) => {
                        proptest::prop_assert_eq!($get_state_fn(&sm1), $get_state_fn(&sm2));
                        proptest::prop_assert_eq!(out1.duties, out2.duties);
                    }
                    (Err(_), Err(_)) => {}
                    _ => {
                        proptest::prop_assert!(false, "Inconsistent results: one succeeded, one failed");
                    }
                }
            }
        }
    };
}

/// Property: terminal states reject every event.
#[macro_export]
macro_rules! prop_terminal_states_reject {
    ($sm_type:ty, $create_fn:expr, $config:expr, $terminal_states:expr, $event_strategy:expr) => {
        proptest::proptest! {
            #[test]
            fn terminal_states_reject_all_events(
                terminal_state in $terminal_states,
                event in $event_strategy,
            ) {
                use $crate::state_machine::StateMachine;

                let mut sm: $sm_type = $create_fn(terminal_state);
                let result = sm.process_event($config, event);

                proptest::prop_assert!(
                    result.is_err(),
                    "Terminal states should return error, got: {:?}",
                    result
                );
            }
        }
    };
}

/// Property: an accepted event changes the state or emits a duty, a rejected one changes nothing.
#[macro_export]
macro_rules! prop_no_silent_acceptance {
    ($sm_type:ty, $create_fn:expr, $get_state_fn:expr, $config:expr, $state_strategy:expr, $event_strategy:expr) => {
        proptest::proptest! {
            #[test]
            fn events_transition_or_error(
                state in $state_strategy,
                event in $event_strategy,
            ) {
                use $crate::state_machine::StateMachine;

                let initial_state = state.clone();
                let mut sm: $sm_type = $create_fn(state);

                let result = sm.process_event($config, event);
                let final_state = $get_state_fn(&sm).clone();

                match result {
                    Ok(output) => {
                        let state_changed = initial_state != final_state;
                        let has_output = !output.duties.is_empty();

                        proptest::prop_assert!(
                            state_changed || has_output,
                            "Event was accepted but nothing happened"
                        );
                    }
                    Err(_) => {
                        proptest::prop_assert_eq!(
                            &initial_state,
                            &final_state,
                            "State changed despite error"
                        );
                    }
                }
            }
        }
    };
}
