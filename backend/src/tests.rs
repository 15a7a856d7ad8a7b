#[cfg(test)]
mod tests {
    use shared::error::ErrorCode;
    use shared::events::{ElectionEvent, GroupEvent};
    use shared::lifecycle::{self, ElectionPhase};
    use shared::models::*;
    use shared::object_id::ObjectId;

    use crate::config::Config;
    use crate::hub::Hub;
    use crate::routes::{app, AppState};
    use crate::store::Page;

    fn state() -> AppState {
        AppState::new(Config::default())
    }

    fn seed_group(state: &AppState) -> Group {
        state
            .groups
            .create(CreateGroupRequest {
                name: "Lunch crew".into(),
                description: "Weekly meal decisions".into(),
                creator_id: "tester".into(),
            })
            .unwrap()
    }

    fn seed_choice(state: &AppState, group_id: &ObjectId, name: &str) -> MealChoice {
        state
            .meal_choices
            .create(CreateMealChoiceRequest {
                group_id: group_id.clone(),
                name: name.into(),
                description: None,
                image_url: None,
                menu_url: None,
            })
            .unwrap()
    }

    fn seed_account(state: &AppState, group_id: &ObjectId, first_name: &str) -> Account {
        state
            .accounts
            .create(CreateAccountRequest {
                first_name: first_name.into(),
                last_name: "Tester".into(),
                email: format!("{first_name}@example.com"),
                phone_number: "5550100".into(),
                group_id: Some(group_id.clone()),
            })
            .unwrap()
    }

    fn create_election(state: &AppState, group_id: &ObjectId, rounds: i32) -> Election {
        state
            .coordinator
            .create(CreateElectionRequest {
                group_id: group_id.clone(),
                rounds,
            })
            .unwrap()
    }

    fn vote(election: &Election, voter: &ObjectId, candidate: &ObjectId) -> Vote {
        Vote {
            election_id: election.id.clone(),
            group_id: election.group_id.clone(),
            voter_id: voter.clone(),
            candidate_id: candidate.clone(),
        }
    }

    // --- store behavior ---

    #[test]
    fn test_scan_excludes_soft_deleted() {
        let state = state();
        let group = seed_group(&state);
        let kept = seed_group(&state);

        assert!(state.groups.soft_delete(&group.id).unwrap());
        let listed = state.groups.list(Page::default()).unwrap();
        assert_eq!(listed.len(), 1);
        assert_eq!(listed[0].id, kept.id);

        assert!(state.groups.get(&group.id).unwrap().is_none());
        assert!(!state.groups.exists(&group.id).unwrap());
        assert_eq!(state.groups.count().unwrap(), 1);

        // deleting twice reports absence
        assert!(!state.groups.soft_delete(&group.id).unwrap());
    }

    #[test]
    fn test_scan_orders_newest_first() {
        let state = state();
        let first = seed_group(&state);
        let second = seed_group(&state);
        let third = seed_group(&state);

        let listed = state.groups.list(Page::default()).unwrap();
        let ids: Vec<_> = listed.iter().map(|g| g.id.clone()).collect();
        assert_eq!(ids, vec![third.id, second.id, first.id]);
    }

    #[test]
    fn test_scan_clamps_limit_and_offset() {
        let state = state();
        for _ in 0..3 {
            seed_group(&state);
        }

        // limits outside [0, 1000] clamp to the ceiling
        assert_eq!(state.groups.list(Page { limit: -5, offset: 0 }).unwrap().len(), 3);
        assert_eq!(state.groups.list(Page { limit: 5000, offset: 0 }).unwrap().len(), 3);
        assert_eq!(state.groups.list(Page { limit: 2, offset: 0 }).unwrap().len(), 2);

        // out-of-range offsets reset to zero
        assert_eq!(state.groups.list(Page { limit: 1000, offset: 99 }).unwrap().len(), 3);
        assert_eq!(state.groups.list(Page { limit: 1000, offset: -1 }).unwrap().len(), 3);
        assert_eq!(state.groups.list(Page { limit: 1000, offset: 1 }).unwrap().len(), 2);
    }

    #[test]
    fn test_replace_keeps_creation_time() {
        use crate::store::Collection;

        let rows: Collection<Group> = Collection::new();
        let group = Group {
            id: ObjectId::generate(),
            name: "Lunch crew".into(),
            description: String::new(),
            creator_id: "tester".into(),
        };
        rows.insert(group.clone()).unwrap();
        let (created, updated) = rows.timestamps(&group.id).unwrap().unwrap();
        assert_eq!(created, updated);

        let mut renamed = group.clone();
        renamed.name = "Dinner crew".into();
        assert!(rows.replace(renamed).unwrap());

        let (created_after, updated_after) = rows.timestamps(&group.id).unwrap().unwrap();
        assert_eq!(created, created_after);
        assert!(updated_after >= updated);

        // replacing a missing record is a no-op
        let stray = Group {
            id: ObjectId::generate(),
            name: "Stray".into(),
            description: String::new(),
            creator_id: "tester".into(),
        };
        assert!(!rows.replace(stray).unwrap());
    }

    // --- coordinator state machine ---

    #[test]
    fn test_create_requires_existing_group() {
        let state = state();
        let err = state
            .coordinator
            .create(CreateElectionRequest {
                group_id: ObjectId::generate(),
                rounds: 2,
            })
            .unwrap_err();
        assert_eq!(err.code, ErrorCode::Validation);
        assert!(state.coordinator.list(Page::default()).unwrap().is_empty());
    }

    #[test]
    fn test_create_validates_rounds() {
        let state = state();
        let group = seed_group(&state);
        let err = state
            .coordinator
            .create(CreateElectionRequest {
                group_id: group.id,
                rounds: 4,
            })
            .unwrap_err();
        assert_eq!(err.code, ErrorCode::Validation);
        assert!(state.coordinator.list(Page::default()).unwrap().is_empty());
    }

    #[test]
    fn test_full_election_run() {
        let state = state();
        let group = seed_group(&state);
        let meal_a = seed_choice(&state, &group.id, "Pizza");
        let meal_b = seed_choice(&state, &group.id, "Sushi");

        let election = create_election(&state, &group.id, 2);
        assert!(!election.is_active);
        assert_eq!(election.current_round, None);

        let election = state.coordinator.start(&election.id).unwrap();
        assert!(election.is_active);
        assert_eq!(election.current_round, Some(0));

        let round = state
            .coordinator
            .advance_round(&election.id, Some(meal_a.id.clone()))
            .unwrap();
        assert_eq!(round.rounds, 0);
        assert_eq!(round.winner, Some(meal_a.id.clone()));
        assert_eq!(round.election_id, election.id);

        let election = state.coordinator.get(&election.id).unwrap();
        assert!(election.is_active);
        assert_eq!(election.current_round, Some(1));

        let round = state
            .coordinator
            .advance_round(&election.id, Some(meal_b.id.clone()))
            .unwrap();
        assert_eq!(round.rounds, 1);
        assert_eq!(round.winner, Some(meal_b.id));

        let election = state.coordinator.get(&election.id).unwrap();
        assert!(!election.is_active);
        assert!(!election.stopped_halfway);
        assert_eq!(election.current_round, Some(2));
        assert_eq!(lifecycle::phase(&election), ElectionPhase::Completed);

        let history = state.rounds.list_for_election(&election.id).unwrap();
        assert_eq!(history.len(), 2);
        assert_eq!(history[0].rounds, 0);
        assert_eq!(history[1].rounds, 1);

        // no further rounds once completed
        let err = state.coordinator.advance_round(&election.id, None).unwrap_err();
        assert_eq!(err.code, ErrorCode::Conflict);
    }

    #[test]
    fn test_start_conflicts_with_active_election() {
        let state = state();
        let group = seed_group(&state);
        let running = create_election(&state, &group.id, 2);
        let queued = create_election(&state, &group.id, 1);

        state.coordinator.start(&running.id).unwrap();
        let err = state.coordinator.start(&queued.id).unwrap_err();
        assert_eq!(err.code, ErrorCode::Conflict);

        // the pre-existing active election is untouched
        let running = state.coordinator.get(&running.id).unwrap();
        assert!(running.is_active);
        assert_eq!(running.current_round, Some(0));
        let queued = state.coordinator.get(&queued.id).unwrap();
        assert!(!queued.is_active);
        assert_eq!(queued.current_round, None);
    }

    #[test]
    fn test_start_missing_election_not_found() {
        let state = state();
        let err = state.coordinator.start(&ObjectId::generate()).unwrap_err();
        assert_eq!(err.code, ErrorCode::NotFound);
    }

    #[test]
    fn test_advance_requires_active() {
        let state = state();
        let group = seed_group(&state);
        let election = create_election(&state, &group.id, 2);

        let err = state.coordinator.advance_round(&election.id, None).unwrap_err();
        assert_eq!(err.code, ErrorCode::Conflict);
        assert!(state.rounds.list(Page::default()).unwrap().is_empty());

        state.coordinator.start(&election.id).unwrap();
        state.coordinator.stop_halfway(&election.id).unwrap();
        let err = state.coordinator.advance_round(&election.id, None).unwrap_err();
        assert_eq!(err.code, ErrorCode::Conflict);
        assert!(state.rounds.list(Page::default()).unwrap().is_empty());
    }

    #[test]
    fn test_stop_halfway_idempotent() {
        let state = state();
        let group = seed_group(&state);
        let election = create_election(&state, &group.id, 3);
        state.coordinator.start(&election.id).unwrap();

        let stopped = state.coordinator.stop_halfway(&election.id).unwrap();
        assert!(stopped.stopped_halfway);
        assert!(!stopped.is_active);
        assert!(lifecycle::invariants_hold(&stopped));

        let again = state.coordinator.stop_halfway(&election.id).unwrap();
        assert_eq!(again, stopped);

        // a pending election cannot be stopped
        let pending = create_election(&state, &group.id, 1);
        let err = state.coordinator.stop_halfway(&pending.id).unwrap_err();
        assert_eq!(err.code, ErrorCode::Conflict);
    }

    #[test]
    fn test_start_zero_rounds_completes_immediately() {
        let state = state();
        let group = seed_group(&state);
        let election = create_election(&state, &group.id, 0);

        let election = state.coordinator.start(&election.id).unwrap();
        assert!(!election.is_active);
        assert_eq!(election.current_round, Some(0));
        assert_eq!(lifecycle::phase(&election), ElectionPhase::Completed);

        // the group is free to run another election right away
        let next = create_election(&state, &group.id, 1);
        assert!(state.coordinator.start(&next.id).is_ok());
    }

    #[test]
    fn test_election_scan_filters() {
        let state = state();
        let group_a = seed_group(&state);
        let group_b = seed_group(&state);
        let one = create_election(&state, &group_a.id, 1);
        let _two = create_election(&state, &group_a.id, 2);
        let three = create_election(&state, &group_b.id, 2);
        state.coordinator.start(&one.id).unwrap();

        let active = state
            .coordinator
            .scan(
                &ElectionScan { is_active: Some(true), ..Default::default() },
                Page::default(),
            )
            .unwrap();
        assert_eq!(active.len(), 1);
        assert_eq!(active[0].id, one.id);

        let by_group = state
            .coordinator
            .scan(
                &ElectionScan {
                    group_id: Some(group_b.id.to_string()),
                    ..Default::default()
                },
                Page::default(),
            )
            .unwrap();
        assert_eq!(by_group.len(), 1);
        assert_eq!(by_group[0].id, three.id);

        let combined = state
            .coordinator
            .scan(
                &ElectionScan {
                    rounds: Some(2),
                    group_id: Some(group_a.id.to_string()),
                    ..Default::default()
                },
                Page::default(),
            )
            .unwrap();
        assert_eq!(combined.len(), 1);
        assert_eq!(combined[0].rounds, 2);
        assert_eq!(combined[0].group_id, group_a.id);
    }

    #[test]
    fn test_update_rejects_active_election() {
        let state = state();
        let group = seed_group(&state);
        let election = create_election(&state, &group.id, 2);
        state.coordinator.start(&election.id).unwrap();

        let err = state
            .coordinator
            .update(UpdateElectionRequest {
                id: election.id.clone(),
                group_id: group.id.clone(),
                rounds: 3,
            })
            .unwrap_err();
        assert_eq!(err.code, ErrorCode::Conflict);

        let unchanged = state.coordinator.get(&election.id).unwrap();
        assert_eq!(unchanged.rounds, 2);
    }

    #[test]
    fn test_delete_is_soft() {
        let state = state();
        let group = seed_group(&state);
        let election = create_election(&state, &group.id, 1);

        state.coordinator.delete(&election.id).unwrap();
        let err = state.coordinator.get(&election.id).unwrap_err();
        assert_eq!(err.code, ErrorCode::NotFound);
        assert!(state.coordinator.list(Page::default()).unwrap().is_empty());

        let err = state.coordinator.delete(&election.id).unwrap_err();
        assert_eq!(err.code, ErrorCode::NotFound);
    }

    // --- vote ledger ---

    #[test]
    fn test_votes_tally_to_plurality_winner() {
        let state = state();
        let group = seed_group(&state);
        let pizza = seed_choice(&state, &group.id, "Pizza");
        let sushi = seed_choice(&state, &group.id, "Sushi");
        let election = create_election(&state, &group.id, 1);
        let election = state.coordinator.start(&election.id).unwrap();

        let voters: Vec<ObjectId> = (0..3).map(|_| ObjectId::generate()).collect();
        let outcome = state
            .coordinator
            .record_vote(&vote(&election, &voters[0], &pizza.id))
            .unwrap();
        assert_eq!(outcome.progress.round, 0);
        assert_eq!(outcome.progress.votes_cast, 1);
        assert_eq!(outcome.progress.expected_voters, None);
        assert!(outcome.closed.is_none());

        state
            .coordinator
            .record_vote(&vote(&election, &voters[1], &sushi.id))
            .unwrap();
        state
            .coordinator
            .record_vote(&vote(&election, &voters[2], &pizza.id))
            .unwrap();

        let round = state.coordinator.close_round(&election.id).unwrap();
        assert_eq!(round.winner, Some(pizza.id));
        assert_eq!(round.rounds, 0);

        let election = state.coordinator.get(&election.id).unwrap();
        assert_eq!(lifecycle::phase(&election), ElectionPhase::Completed);
    }

    #[test]
    fn test_round_auto_closes_when_all_members_voted() {
        let state = state();
        let group = seed_group(&state);
        let pizza = seed_choice(&state, &group.id, "Pizza");
        let _sushi = seed_choice(&state, &group.id, "Sushi");
        let ann = seed_account(&state, &group.id, "ann");
        let bob = seed_account(&state, &group.id, "bob");

        let election = create_election(&state, &group.id, 1);
        let election = state.coordinator.start(&election.id).unwrap();

        let outcome = state
            .coordinator
            .record_vote(&vote(&election, &ann.id, &pizza.id))
            .unwrap();
        assert_eq!(outcome.progress.expected_voters, Some(2));
        assert!(outcome.closed.is_none());

        let outcome = state
            .coordinator
            .record_vote(&vote(&election, &bob.id, &pizza.id))
            .unwrap();
        let round = outcome.closed.expect("final vote closes the round");
        assert_eq!(round.winner, Some(pizza.id));

        let election = state.coordinator.get(&election.id).unwrap();
        assert!(!election.is_active);
        assert_eq!(lifecycle::phase(&election), ElectionPhase::Completed);
    }

    #[test]
    fn test_vote_rejects_unknown_candidate() {
        let state = state();
        let group = seed_group(&state);
        let _pizza = seed_choice(&state, &group.id, "Pizza");
        let election = create_election(&state, &group.id, 1);
        let election = state.coordinator.start(&election.id).unwrap();

        let err = state
            .coordinator
            .record_vote(&vote(&election, &ObjectId::generate(), &ObjectId::generate()))
            .unwrap_err();
        assert_eq!(err.code, ErrorCode::Validation);

        let round = state.coordinator.close_round(&election.id).unwrap();
        assert_eq!(round.winner, None);
    }

    #[test]
    fn test_vote_requires_active_election() {
        let state = state();
        let group = seed_group(&state);
        let pizza = seed_choice(&state, &group.id, "Pizza");
        let election = create_election(&state, &group.id, 1);

        let err = state
            .coordinator
            .record_vote(&vote(&election, &ObjectId::generate(), &pizza.id))
            .unwrap_err();
        assert_eq!(err.code, ErrorCode::Conflict);
    }

    #[test]
    fn test_revote_replaces_earlier_ballot() {
        let state = state();
        let group = seed_group(&state);
        let pizza = seed_choice(&state, &group.id, "Pizza");
        let sushi = seed_choice(&state, &group.id, "Sushi");
        let election = create_election(&state, &group.id, 1);
        let election = state.coordinator.start(&election.id).unwrap();

        let ann = ObjectId::generate();
        let bob = ObjectId::generate();
        state.coordinator.record_vote(&vote(&election, &ann, &pizza.id)).unwrap();
        state.coordinator.record_vote(&vote(&election, &bob, &sushi.id)).unwrap();
        let outcome = state
            .coordinator
            .record_vote(&vote(&election, &ann, &sushi.id))
            .unwrap();
        assert_eq!(outcome.progress.votes_cast, 2);

        let round = state.coordinator.close_round(&election.id).unwrap();
        assert_eq!(round.winner, Some(sushi.id));
    }

    #[test]
    fn test_votes_attributed_to_current_round() {
        let state = state();
        let group = seed_group(&state);
        let pizza = seed_choice(&state, &group.id, "Pizza");
        let sushi = seed_choice(&state, &group.id, "Sushi");
        let election = create_election(&state, &group.id, 2);
        let election = state.coordinator.start(&election.id).unwrap();

        state
            .coordinator
            .record_vote(&vote(&election, &ObjectId::generate(), &pizza.id))
            .unwrap();
        let first = state.coordinator.close_round(&election.id).unwrap();
        assert_eq!(first.rounds, 0);
        assert_eq!(first.winner, Some(pizza.id));

        // a vote arriving after the close belongs to the new round
        let outcome = state
            .coordinator
            .record_vote(&vote(&election, &ObjectId::generate(), &sushi.id))
            .unwrap();
        assert_eq!(outcome.progress.round, 1);
        assert_eq!(outcome.progress.votes_cast, 1);

        let second = state.coordinator.close_round(&election.id).unwrap();
        assert_eq!(second.rounds, 1);
        assert_eq!(second.winner, Some(sushi.id));
    }

    // --- broadcast hub ---

    #[test]
    fn test_broadcast_reaches_topic_members_only() {
        let hub: Hub<String> = Hub::new();
        let topic_x = ObjectId::generate();
        let topic_y = ObjectId::generate();

        let (a, mut rx_a) = hub.connect().unwrap();
        let (b, mut rx_b) = hub.connect().unwrap();
        let (c, mut rx_c) = hub.connect().unwrap();
        let (d, mut rx_d) = hub.connect().unwrap();

        hub.join(&topic_x, &a).unwrap();
        hub.join(&topic_x, &b).unwrap();
        hub.join(&topic_x, &c).unwrap();
        hub.join(&topic_y, &d).unwrap();

        let delivered = hub.publish(&topic_x, "vote".to_string()).unwrap();
        assert_eq!(delivered, 3);

        assert_eq!(rx_a.try_recv().ok(), Some("vote".to_string()));
        assert_eq!(rx_b.try_recv().ok(), Some("vote".to_string()));
        assert_eq!(rx_c.try_recv().ok(), Some("vote".to_string()));
        assert!(rx_d.try_recv().is_err());
        assert!(rx_b.try_recv().is_err());
    }

    #[test]
    fn test_publish_order_preserved_per_topic() {
        let hub: Hub<u32> = Hub::new();
        let topic = ObjectId::generate();
        let (a, mut rx_a) = hub.connect().unwrap();
        let (b, mut rx_b) = hub.connect().unwrap();
        hub.join(&topic, &a).unwrap();
        hub.join(&topic, &b).unwrap();

        for n in 0..5 {
            hub.publish(&topic, n).unwrap();
        }
        for rx in [&mut rx_a, &mut rx_b] {
            for n in 0..5 {
                assert_eq!(rx.try_recv().ok(), Some(n));
            }
        }
    }

    #[test]
    fn test_duplicate_join_keeps_single_membership() {
        let hub: Hub<u32> = Hub::new();
        let topic = ObjectId::generate();
        let (a, mut rx_a) = hub.connect().unwrap();

        hub.join(&topic, &a).unwrap();
        hub.join(&topic, &a).unwrap();
        assert_eq!(hub.member_count(&topic).unwrap(), 1);

        hub.publish(&topic, 7).unwrap();
        assert_eq!(rx_a.try_recv().ok(), Some(7));
        assert!(rx_a.try_recv().is_err());
    }

    #[test]
    fn test_leave_stops_delivery() {
        let hub: Hub<u32> = Hub::new();
        let topic = ObjectId::generate();
        let (a, mut rx_a) = hub.connect().unwrap();
        let (b, mut rx_b) = hub.connect().unwrap();
        hub.join(&topic, &a).unwrap();
        hub.join(&topic, &b).unwrap();

        hub.leave(&topic, &a).unwrap();
        assert_eq!(hub.member_count(&topic).unwrap(), 1);

        hub.publish(&topic, 1).unwrap();
        assert!(rx_a.try_recv().is_err());
        assert_eq!(rx_b.try_recv().ok(), Some(1));
    }

    #[test]
    fn test_send_to_dead_connection_is_dropped() {
        let hub: Hub<u32> = Hub::new();
        let topic = ObjectId::generate();
        let (a, rx_a) = hub.connect().unwrap();
        let (b, mut rx_b) = hub.connect().unwrap();
        hub.join(&topic, &a).unwrap();
        hub.join(&topic, &b).unwrap();

        drop(rx_a);
        let delivered = hub.publish(&topic, 9).unwrap();
        assert_eq!(delivered, 1);
        assert_eq!(rx_b.try_recv().ok(), Some(9));

        // stale membership is only cleared by an explicit leave
        assert_eq!(hub.member_count(&topic).unwrap(), 2);
    }

    // --- realtime channels ---

    fn drain_votes(events: Vec<ElectionEvent>) -> Vec<ElectionEvent> {
        events
            .into_iter()
            .filter(|event| matches!(event, ElectionEvent::Vote { .. }))
            .collect()
    }

    #[test]
    fn test_join_requires_active_election() {
        let state = state();
        let group = seed_group(&state);
        let election = create_election(&state, &group.id, 1);

        let (client, _rx) = state.election_channel.connect().unwrap();
        let err = state
            .election_channel
            .join_election(&client, &election.id, &group.id)
            .unwrap_err();
        assert_eq!(err.code, ErrorCode::Conflict);

        let err = state
            .election_channel
            .join_election(&client, &ObjectId::generate(), &group.id)
            .unwrap_err();
        assert_eq!(err.code, ErrorCode::NotFound);

        state.coordinator.start(&election.id).unwrap();
        state
            .election_channel
            .join_election(&client, &election.id, &group.id)
            .unwrap();
    }

    #[test]
    fn test_vote_event_fans_out_to_topic() {
        let state = state();
        let group = seed_group(&state);
        let pizza = seed_choice(&state, &group.id, "Pizza");
        let election = create_election(&state, &group.id, 1);
        let election = state.coordinator.start(&election.id).unwrap();

        let other_group = seed_group(&state);
        let other = create_election(&state, &other_group.id, 1);
        // the other group's election runs concurrently on its own topic
        state.coordinator.start(&other.id).unwrap();

        let (a, mut rx_a) = state.election_channel.connect().unwrap();
        let (b, mut rx_b) = state.election_channel.connect().unwrap();
        let (c, mut rx_c) = state.election_channel.connect().unwrap();
        let (d, mut rx_d) = state.election_channel.connect().unwrap();
        state.election_channel.join_election(&a, &election.id, &group.id).unwrap();
        state.election_channel.join_election(&b, &election.id, &group.id).unwrap();
        state.election_channel.join_election(&c, &election.id, &group.id).unwrap();
        state.election_channel.join_election(&d, &other.id, &other_group.id).unwrap();

        let voter = ObjectId::generate();
        state
            .election_channel
            .vote(vote(&election, &voter, &pizza.id))
            .unwrap();

        for rx in [&mut rx_b, &mut rx_c] {
            let mut events = Vec::new();
            while let Ok(event) = rx.try_recv() {
                events.push(event);
            }
            let votes = drain_votes(events);
            assert_eq!(votes.len(), 1);
            assert_eq!(
                votes[0],
                ElectionEvent::Vote {
                    election_id: election.id.clone(),
                    group_id: group.id.clone(),
                    voter_id: voter.clone(),
                    candidate_id: pizza.id.clone(),
                }
            );
        }

        // the sender observes its own vote; the other topic sees nothing
        let mut sender_events = Vec::new();
        while let Ok(event) = rx_a.try_recv() {
            sender_events.push(event);
        }
        assert_eq!(drain_votes(sender_events).len(), 1);

        let mut other_events = Vec::new();
        while let Ok(event) = rx_d.try_recv() {
            other_events.push(event);
        }
        assert!(drain_votes(other_events).is_empty());
    }

    #[test]
    fn test_duplicate_join_still_emits_event() {
        let state = state();
        let group = seed_group(&state);
        let election = create_election(&state, &group.id, 1);
        state.coordinator.start(&election.id).unwrap();

        let (client, mut rx) = state.election_channel.connect().unwrap();
        state.election_channel.join_election(&client, &election.id, &group.id).unwrap();
        state.election_channel.join_election(&client, &election.id, &group.id).unwrap();

        assert_eq!(state.coordinator.hub().member_count(&election.id).unwrap(), 1);

        let mut joined = 0;
        while let Ok(event) = rx.try_recv() {
            if matches!(event, ElectionEvent::Joined { .. }) {
                joined += 1;
            }
        }
        assert_eq!(joined, 2);
    }

    #[test]
    fn test_transitions_reach_subscribers() {
        let state = state();
        let group = seed_group(&state);
        let pizza = seed_choice(&state, &group.id, "Pizza");
        let election = create_election(&state, &group.id, 1);
        let election = state.coordinator.start(&election.id).unwrap();

        let (client, mut rx) = state.election_channel.connect().unwrap();
        state.election_channel.join_election(&client, &election.id, &group.id).unwrap();

        state
            .coordinator
            .advance_round(&election.id, Some(pizza.id.clone()))
            .unwrap();

        let mut advanced = None;
        while let Ok(event) = rx.try_recv() {
            if let ElectionEvent::RoundAdvanced { round, winner, completed, .. } = event {
                advanced = Some((round, winner, completed));
            }
        }
        assert_eq!(advanced, Some((0, Some(pizza.id), true)));
    }

    #[test]
    fn test_subscription_drop_leaves_topic() {
        let state = state();
        let group = seed_group(&state);
        let election = create_election(&state, &group.id, 1);
        state.coordinator.start(&election.id).unwrap();

        let mut subscription = state
            .election_channel
            .subscribe(&election.id, &group.id)
            .unwrap();
        let client_id = subscription.client_id().to_string();
        assert_eq!(state.coordinator.hub().member_count(&election.id).unwrap(), 1);
        assert_eq!(state.coordinator.hub().connected_count().unwrap(), 1);
        assert!(state.coordinator.hub().is_member(&election.id, &client_id).unwrap());

        // the joiner observes its own joined event
        assert!(matches!(
            subscription.try_next(),
            Some(ElectionEvent::Joined { .. })
        ));

        drop(subscription);
        assert_eq!(state.coordinator.hub().member_count(&election.id).unwrap(), 0);
        assert_eq!(state.coordinator.hub().connected_count().unwrap(), 0);
        assert!(!state.coordinator.hub().is_member(&election.id, &client_id).unwrap());
    }

    #[test]
    fn test_group_count_broadcast_reaches_all_clients() {
        let state = state();
        seed_group(&state);
        seed_group(&state);

        let (_a, mut rx_a) = state.group_channel.connect().unwrap();
        let (b, mut rx_b) = state.group_channel.connect().unwrap();
        let room = ObjectId::generate();
        state.group_channel.join_room(&room, &b).unwrap();

        let count = state.group_channel.request_group_count().unwrap();
        assert_eq!(count, 2);

        // the count reaches every connected client, roomed or not
        assert_eq!(rx_a.try_recv().ok(), Some(GroupEvent::GroupCount { count: 2 }));
        assert_eq!(rx_b.try_recv().ok(), Some(GroupEvent::GroupCount { count: 2 }));
    }

    // --- HTTP surface ---

    use rocket::http::{ContentType, Status};
    use rocket::local::asynchronous::Client;
    use serde_json::json;

    async fn client() -> Client {
        Client::tracked(app(state())).await.expect("valid rocket instance")
    }

    fn app_state(client: &Client) -> &AppState {
        client.rocket().state::<AppState>().expect("managed state")
    }

    #[rocket::async_test]
    async fn test_http_election_crud() {
        let client = client().await;
        let group = seed_group(app_state(&client));

        // create
        let response = client
            .post("/api/election")
            .header(ContentType::JSON)
            .body(json!({ "groupId": group.id.as_str(), "rounds": 2 }).to_string())
            .dispatch()
            .await;
        assert_eq!(response.status(), Status::Ok);
        let election: Election = response.into_json().await.unwrap();
        assert!(!election.is_active);
        assert_eq!(election.rounds, 2);

        // get one
        let response = client
            .get(format!("/api/election/{}", election.id))
            .dispatch()
            .await;
        assert_eq!(response.status(), Status::Ok);

        // malformed id is a client error
        let response = client.get("/api/election/not-a-real-id").dispatch().await;
        assert_eq!(response.status(), Status::BadRequest);

        // unknown group is a client error and persists nothing
        let response = client
            .post("/api/election")
            .header(ContentType::JSON)
            .body(
                json!({ "groupId": "aaaaaaaaaaaaaaaaaaaaaaaa", "rounds": 1 }).to_string(),
            )
            .dispatch()
            .await;
        assert_eq!(response.status(), Status::BadRequest);

        // list without filters
        let response = client.get("/api/election").dispatch().await;
        let listed: GetAllResponse<Election> = response.into_json().await.unwrap();
        assert_eq!(listed.total, 1);

        // filtered scan
        let response = client
            .get(format!("/api/election?groupId={}&isActive=false", group.id))
            .dispatch()
            .await;
        let listed: GetAllResponse<Election> = response.into_json().await.unwrap();
        assert_eq!(listed.total, 1);
        let response = client.get("/api/election?isActive=true").dispatch().await;
        let listed: GetAllResponse<Election> = response.into_json().await.unwrap();
        assert_eq!(listed.total, 0);

        // start, then updates must go through transitions
        let response = client
            .post(format!("/api/election/{}/start", election.id))
            .dispatch()
            .await;
        assert_eq!(response.status(), Status::Ok);
        let started: Election = response.into_json().await.unwrap();
        assert!(started.is_active);
        assert_eq!(started.current_round, Some(0));

        let response = client
            .put("/api/election")
            .header(ContentType::JSON)
            .body(
                json!({
                    "id": election.id.as_str(),
                    "groupId": group.id.as_str(),
                    "rounds": 3
                })
                .to_string(),
            )
            .dispatch()
            .await;
        assert_eq!(response.status(), Status::Conflict);

        // starting again conflicts
        let response = client
            .post(format!("/api/election/{}/start", election.id))
            .dispatch()
            .await;
        assert_eq!(response.status(), Status::Conflict);

        // stop, delete, and the record is gone
        let response = client
            .post(format!("/api/election/{}/stop", election.id))
            .dispatch()
            .await;
        assert_eq!(response.status(), Status::Ok);
        let response = client
            .delete(format!("/api/election/{}", election.id))
            .dispatch()
            .await;
        assert_eq!(response.status(), Status::Ok);
        let response = client
            .get(format!("/api/election/{}", election.id))
            .dispatch()
            .await;
        assert_eq!(response.status(), Status::NotFound);
    }

    #[rocket::async_test]
    async fn test_http_vote_and_advance() {
        let client = client().await;
        let state = app_state(&client);
        let group = seed_group(state);
        let pizza = seed_choice(state, &group.id, "Pizza");
        let election = create_election(state, &group.id, 1);
        state.coordinator.start(&election.id).unwrap();

        let response = client
            .post(format!("/api/election/{}/vote", election.id))
            .header(ContentType::JSON)
            .body(
                json!({
                    "groupId": group.id.as_str(),
                    "voterId": ObjectId::generate().as_str(),
                    "candidateId": pizza.id.as_str()
                })
                .to_string(),
            )
            .dispatch()
            .await;
        assert_eq!(response.status(), Status::Ok);

        let response = client
            .post(format!("/api/election/{}/close", election.id))
            .dispatch()
            .await;
        assert_eq!(response.status(), Status::Ok);
        let round: ElectionRound = response.into_json().await.unwrap();
        assert_eq!(round.winner, Some(pizza.id));
        assert_eq!(round.rounds, 0);

        // the election completed; further closes conflict
        let response = client
            .post(format!("/api/election/{}/close", election.id))
            .dispatch()
            .await;
        assert_eq!(response.status(), Status::Conflict);
    }

    #[rocket::async_test]
    async fn test_http_round_crud_validates_group() {
        let client = client().await;
        let group = seed_group(app_state(&client));

        // groupId must be a well-formed 24-character id
        let response = client
            .post("/api/electionround")
            .header(ContentType::JSON)
            .body(
                json!({
                    "electionId": ObjectId::generate().as_str(),
                    "groupId": "short",
                    "winner": null,
                    "rounds": 0
                })
                .to_string(),
            )
            .dispatch()
            .await;
        assert_eq!(response.status(), Status::UnprocessableEntity);

        // and reference an existing group
        let response = client
            .post("/api/electionround")
            .header(ContentType::JSON)
            .body(
                json!({
                    "electionId": ObjectId::generate().as_str(),
                    "groupId": "aaaaaaaaaaaaaaaaaaaaaaaa",
                    "winner": null,
                    "rounds": 0
                })
                .to_string(),
            )
            .dispatch()
            .await;
        assert_eq!(response.status(), Status::BadRequest);

        let response = client
            .post("/api/electionround")
            .header(ContentType::JSON)
            .body(
                json!({
                    "electionId": ObjectId::generate().as_str(),
                    "groupId": group.id.as_str(),
                    "winner": null,
                    "rounds": 0
                })
                .to_string(),
            )
            .dispatch()
            .await;
        assert_eq!(response.status(), Status::Ok);
        let round: ElectionRound = response.into_json().await.unwrap();

        let response = client.get("/api/electionround").dispatch().await;
        let listed: GetAllResponse<ElectionRound> = response.into_json().await.unwrap();
        assert_eq!(listed.total, 1);

        let response = client
            .delete(format!("/api/electionround/{}", round.id))
            .dispatch()
            .await;
        assert_eq!(response.status(), Status::Ok);
        let response = client
            .get(format!("/api/electionround/{}", round.id))
            .dispatch()
            .await;
        assert_eq!(response.status(), Status::NotFound);
    }

    #[rocket::async_test]
    async fn test_http_group_count() {
        let client = client().await;
        seed_group(app_state(&client));

        let response = client.get("/api/group/count").dispatch().await;
        assert_eq!(response.status(), Status::Ok);
        let count: usize = response.into_json().await.unwrap();
        assert_eq!(count, 1);
    }
}
